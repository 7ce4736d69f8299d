use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use spdlog::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;

use crate::admission::AdmissionControl;
use crate::compiler::ContentCompiler;
use crate::config::Config;
use crate::http::reader::{self, ReadError};
use crate::http::response::Response;
use crate::router::Router;
use crate::snapshot::ContentStore;
use crate::tls;

const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(5);
const SAMPLE_INTERVAL: Duration = Duration::from_secs(10);
const SAMPLE_HISTORY: usize = 360;

/// Brings up the whole service: initial compile (fatal if there is nothing
/// to serve), TLS acceptor, the periodic compile and sampler tasks, then the
/// accept loop, one task per connection.
pub async fn server_run(config: Config) -> io::Result<()> {
    let store = Arc::new(ContentStore::new());
    let mut compiler = ContentCompiler::new(
        config.paths.posts_dir.clone(),
        config.paths.template_path.clone(),
        config.content.recent_posts_count,
        config.content.post_titles_count,
    );

    // No template means nothing to serve at all; only at startup is that
    // fatal. Later cycles log and keep the last good snapshot.
    compiler.run_cycle(&store)?;
    info!("initial content snapshot published");

    let acceptor = tls::make_acceptor(&config.tls.cert_path, &config.tls.key_path)?;
    let listener =
        TcpListener::bind((config.server.address.as_str(), config.server.port)).await?;
    info!("listening on {}:{}", config.server.address, config.server.port);

    let admission = Arc::new(AdmissionControl::new(
        Duration::from_secs(config.admission.window_secs),
        config.admission.max_per_window,
    ));
    let router = Arc::new(Router::new(store.clone(), config.paths.public_dir.clone()));
    let active = Arc::new(AtomicUsize::new(0));

    let refresh = Duration::from_secs(config.content.refresh_secs.max(1));
    let compile_store = store.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh);
        ticker.tick().await; // the immediate first tick; startup already compiled
        loop {
            ticker.tick().await;
            match compiler.run_cycle(&compile_store) {
                Ok(true) => info!("published new content snapshot"),
                Ok(false) => {}
                Err(e) => error!("content compilation failed: {}", e),
            }
        }
    });

    let gauge = active.clone();
    tokio::spawn(async move {
        let mut history: VecDeque<usize> = VecDeque::with_capacity(SAMPLE_HISTORY);
        let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);
        loop {
            ticker.tick().await;
            let current = gauge.load(Ordering::Relaxed);
            if history.len() == SAMPLE_HISTORY {
                history.pop_front();
            }
            history.push_back(current);
            let peak = history.iter().copied().max().unwrap_or(0);
            debug!("active connections: {} (peak over window: {})", current, peak);
        }
    });

    loop {
        let (socket, peer) = listener.accept().await?;
        let acceptor = acceptor.clone();
        let admission = admission.clone();
        let router = router.clone();
        let active = active.clone();

        tokio::spawn(async move {
            active.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = handle_connection(socket, peer, acceptor, admission, router).await {
                debug!("connection from {} ended: {}", peer, e);
            }
            active.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

async fn handle_connection(
    socket: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    admission: Arc<AdmissionControl>,
    router: Arc<Router>,
) -> io::Result<()> {
    let mut stream = match timeout(HANDSHAKE_DEADLINE, acceptor.accept(socket)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            debug!("TLS handshake with {} failed: {}", peer, e);
            return Ok(());
        }
        Err(_) => {
            debug!("TLS handshake with {} timed out", peer);
            return Ok(());
        }
    };

    // The denial is an HTTP response, so it has to come after the handshake.
    if !admission.allowed(peer.ip()) {
        Response::forbidden().write_to(&mut stream).await?;
        return stream.shutdown().await;
    }

    serve_one(&mut stream, &router).await?;
    stream.shutdown().await
}

/// One request, one response, close. Protocol errors get a best-effort
/// status line and never propagate past the connection.
async fn serve_one<S>(stream: &mut S, router: &Router) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match reader::read_request(stream, reader::READ_DEADLINE).await {
        Ok(req) => router.respond(&req, stream).await,
        Err(ReadError::Closed) => Ok(()),
        Err(e) => {
            warn!("rejected request: {}", e.describe());
            Response::bad_request(e.describe()).write_to(stream).await
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::test_data::{TempSite, POST_SOURCE};

    use super::*;

    fn router_for(site: &TempSite) -> Router {
        let store = Arc::new(ContentStore::new());
        let mut compiler =
            ContentCompiler::new(site.posts_dir(), site.template_path(), 20, 40);
        compiler.run_cycle(&store).unwrap();
        Router::new(store, site.public_dir())
    }

    #[tokio::test]
    async fn test_serve_one_round_trip() {
        let site = TempSite::new();
        site.write_post("hello.blog", POST_SOURCE);
        let router = router_for(&site);

        let (mut client, mut server) = tokio::io::duplex(64 * 1024);
        client
            .write_all(b"GET /posts/hello.blog HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();

        serve_one(&mut server, &router).await.unwrap();
        drop(server);

        let mut wire = String::new();
        client.read_to_string(&mut wire).await.unwrap();
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("Hello world"));
        assert!(wire.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn test_serve_one_rejects_malformed_start_line() {
        let site = TempSite::new();
        let router = router_for(&site);

        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_all(b"GET /\r\n\r\n").await.unwrap();

        serve_one(&mut server, &router).await.unwrap();
        drop(server);

        let mut wire = String::new();
        client.read_to_string(&mut wire).await.unwrap();
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_serve_one_rejects_oversized_headers() {
        let site = TempSite::new();
        let router = router_for(&site);

        let (mut client, mut server) = tokio::io::duplex(16 * 1024);
        let long = vec![b'a'; reader::MAX_HEADER_BYTES + reader::CHUNK_BYTES];
        client.write_all(&long).await.unwrap();

        serve_one(&mut server, &router).await.unwrap();
        drop(server);

        let mut wire = String::new();
        client.read_to_string(&mut wire).await.unwrap();
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(wire.contains("headers too long"));
    }
}
