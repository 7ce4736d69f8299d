use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::http::request::{Method, Request};

/// Hard ceiling on accumulated header bytes before the blank line.
pub const MAX_HEADER_BYTES: usize = 1500;
/// Hard ceiling on a declared body.
pub const MAX_BODY_BYTES: usize = 16 * 1024;
/// Socket reads happen in chunks of this size, each under its own deadline.
pub const CHUNK_BYTES: usize = 1024;
/// Default per-chunk read deadline.
pub const READ_DEADLINE: Duration = Duration::from_secs(5);

/// Why a request attempt ended without a complete request.
///
/// Everything here terminates only the connection, never the process. All
/// variants except `Closed` still get a best-effort status line.
#[derive(Debug)]
pub enum ReadError {
    Stream(io::Error),
    TimedOut,
    Closed,
    HeadersTooLong,
    BodyTooLong,
    MalformedStartLine,
}

impl ReadError {
    pub fn describe(&self) -> &'static str {
        match self {
            ReadError::Stream(_) => "stream error",
            ReadError::TimedOut => "read deadline exceeded",
            ReadError::Closed => "peer closed early",
            ReadError::HeadersTooLong => "headers too long",
            ReadError::BodyTooLong => "body too long",
            ReadError::MalformedStartLine => "malformed start line",
        }
    }
}

/// Reads exactly one request off the stream.
///
/// Headers accumulate in chunked reads until the first `\r\n\r\n`; the
/// per-chunk deadline is renewed on every read. A GET is complete the moment
/// the boundary arrives — no body read is attempted even if a length header
/// is present. Any other method reads until the declared `Content-Length` is
/// satisfied and stops exactly there, so a well-behaved client never waits
/// out a final empty read, and a client that declared more than it sends
/// runs into the deadline instead of hanging the connection.
pub async fn read_request<S>(stream: &mut S, deadline: Duration) -> Result<Request, ReadError>
where
    S: AsyncRead + Unpin,
{
    // AwaitingHeaders
    let mut buf: Vec<u8> = Vec::with_capacity(CHUNK_BYTES);
    let headers_end = loop {
        if let Some(pos) = find_headers_end(&buf) {
            if pos > MAX_HEADER_BYTES {
                return Err(ReadError::HeadersTooLong);
            }
            break pos;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Err(ReadError::HeadersTooLong);
        }
        if read_chunk(stream, &mut buf, deadline).await? == 0 {
            return Err(ReadError::Closed);
        }
    };

    let header_bytes = &buf[..headers_end];
    let (method, path, query) = parse_start_line(header_bytes)?;

    // BodyKnownLength | BodyNone
    let content_length = if method.has_body() {
        let len = content_length(header_bytes);
        if len > MAX_BODY_BYTES {
            return Err(ReadError::BodyTooLong);
        }
        len
    } else {
        0
    };

    let body = if content_length == 0 {
        vec![]
    } else {
        let mut body: Vec<u8> = buf[headers_end + 4..].to_vec();
        body.truncate(content_length);
        while body.len() < content_length {
            if read_chunk(stream, &mut body, deadline).await? == 0 {
                return Err(ReadError::Closed);
            }
            body.truncate(content_length);
        }
        body
    };

    // Complete
    Ok(Request {
        method,
        path,
        query,
        content_length,
        body,
    })
}

async fn read_chunk<S>(stream: &mut S, buf: &mut Vec<u8>, deadline: Duration) -> Result<usize, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut chunk = [0u8; CHUNK_BYTES];
    match timeout(deadline, stream.read(&mut chunk)).await {
        Ok(Ok(n)) => {
            buf.extend_from_slice(&chunk[..n]);
            Ok(n)
        }
        Ok(Err(e)) => Err(ReadError::Stream(e)),
        Err(_) => Err(ReadError::TimedOut),
    }
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_start_line(header_bytes: &[u8]) -> Result<(Method, String, Option<String>), ReadError> {
    let headers = String::from_utf8_lossy(header_bytes);
    let start_line = headers.split("\r\n").next().unwrap_or("");

    let mut tokens = start_line.split(' ').filter(|t| !t.is_empty());
    let method_token = tokens.next().ok_or(ReadError::MalformedStartLine)?;
    let target = tokens.next().ok_or(ReadError::MalformedStartLine)?;
    let _version = tokens.next().ok_or(ReadError::MalformedStartLine)?;

    let method = Method::from_token(method_token).ok_or(ReadError::MalformedStartLine)?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    };

    Ok((method, path, query))
}

/// Locates `Content-Length` in the raw header bytes, case-insensitively.
/// Absent or unparseable means no body.
fn content_length(header_bytes: &[u8]) -> usize {
    let headers = String::from_utf8_lossy(header_bytes);
    for line in headers.split("\r\n").skip(1) {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse().unwrap_or(0);
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    const TEST_DEADLINE: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_simple_get() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client
            .write_all(b"GET /posts/hello.blog HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();

        let req = read_request(&mut server, TEST_DEADLINE).await.unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/posts/hello.blog");
        assert_eq!(req.query, None);
        assert!(req.body.is_empty());
    }

    #[tokio::test]
    async fn test_query_split_from_path() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client
            .write_all(b"GET /?page=2 HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let req = read_request(&mut server, TEST_DEADLINE).await.unwrap();
        assert_eq!(req.path, "/");
        assert_eq!(req.query.as_deref(), Some("page=2"));
    }

    #[tokio::test]
    async fn test_get_never_waits_for_a_body() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        // Erroneous length header on a GET; no body follows and the
        // connection stays open. The reader must complete anyway.
        client
            .write_all(b"GET / HTTP/1.1\r\nContent-Length: 5\r\n\r\n")
            .await
            .unwrap();

        let req = read_request(&mut server, TEST_DEADLINE).await.unwrap();
        assert_eq!(req.method, Method::Get);
        assert!(req.body.is_empty());
        drop(client);
    }

    #[tokio::test]
    async fn test_post_reads_exact_body() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client
            .write_all(b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello")
            .await
            .unwrap();

        let req = read_request(&mut server, TEST_DEADLINE).await.unwrap();
        assert_eq!(req.content_length, 5);
        assert_eq!(req.body, b"hello");
    }

    #[tokio::test]
    async fn test_post_body_split_across_writes() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client
            .write_all(b"POST /x HTTP/1.1\r\ncontent-length: 8\r\n\r\nfour")
            .await
            .unwrap();

        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.write_all(b"more").await.unwrap();
            client
        });

        let req = read_request(&mut server, TEST_DEADLINE).await.unwrap();
        assert_eq!(req.body, b"fourmore");
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_post_without_length_has_no_body() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client
            .write_all(b"POST /x HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();

        let req = read_request(&mut server, TEST_DEADLINE).await.unwrap();
        assert_eq!(req.content_length, 0);
        assert!(req.body.is_empty());
        drop(client);
    }

    #[tokio::test]
    async fn test_headers_too_long() {
        let (mut client, mut server) = tokio::io::duplex(8192);
        let long = vec![b'a'; MAX_HEADER_BYTES + CHUNK_BYTES];
        client.write_all(&long).await.unwrap();

        let err = read_request(&mut server, TEST_DEADLINE).await.unwrap_err();
        assert!(matches!(err, ReadError::HeadersTooLong));
        drop(client);
    }

    #[tokio::test]
    async fn test_malformed_start_line() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_all(b"GET /\r\n\r\n").await.unwrap();

        let err = read_request(&mut server, TEST_DEADLINE).await.unwrap_err();
        assert!(matches!(err, ReadError::MalformedStartLine));
    }

    #[tokio::test]
    async fn test_unknown_method_rejected() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_all(b"BREW / HTTP/1.1\r\n\r\n").await.unwrap();

        let err = read_request(&mut server, TEST_DEADLINE).await.unwrap_err();
        assert!(matches!(err, ReadError::MalformedStartLine));
    }

    #[tokio::test]
    async fn test_declared_body_too_long() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client
            .write_all(b"POST /x HTTP/1.1\r\nContent-Length: 99999\r\n\r\n")
            .await
            .unwrap();

        let err = read_request(&mut server, TEST_DEADLINE).await.unwrap_err();
        assert!(matches!(err, ReadError::BodyTooLong));
        drop(client);
    }

    #[tokio::test]
    async fn test_underfed_body_hits_deadline() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        // Declares 10 bytes, sends 3, keeps the connection open.
        client
            .write_all(b"POST /x HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
            .await
            .unwrap();

        let err = read_request(&mut server, TEST_DEADLINE).await.unwrap_err();
        assert!(matches!(err, ReadError::TimedOut));
        drop(client);
    }

    #[tokio::test]
    async fn test_peer_close_before_headers() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_all(b"GET / HT").await.unwrap();
        drop(client);

        let err = read_request(&mut server, TEST_DEADLINE).await.unwrap_err();
        assert!(matches!(err, ReadError::Closed));
    }
}
