use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::{Response, StatusCode};
use crate::mime;

pub const STREAM_CHUNK_BYTES: usize = 1024;
pub const STATIC_CACHE_CONTROL: &str = "max-age=604800";

/// Serves a file from the public document root.
///
/// The caller has already rejected `/..` paths, so a simple join is safe.
/// Symlinks resolve exactly one level: a link to a link is a 404, never
/// followed further. A directory without a trailing slash is normalized with
/// a 301; with the slash it redirects to its index document. File bytes go
/// out in fixed-size chunks after a head that declares the full length.
pub async fn serve<S>(stream: &mut S, public_dir: &Path, url_path: &str) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let rel = url_path.trim_start_matches('/');
    let fs_path = public_dir.join(rel);

    let fs_path = match resolve_symlink_once(&fs_path).await {
        Ok(path) => path,
        Err(_) => return Response::not_found().write_to(stream).await,
    };

    let meta = match fs::metadata(&fs_path).await {
        Ok(meta) => meta,
        Err(_) => return Response::not_found().write_to(stream).await,
    };

    if meta.is_dir() {
        let response = if url_path.ends_with('/') {
            Response::redirect(StatusCode::Found, &format!("{}index.html", url_path))
        } else {
            Response::redirect(StatusCode::MovedPermanently, &format!("{}/", url_path))
        };
        return response.write_to(stream).await;
    }

    let mut file = match fs::File::open(&fs_path).await {
        Ok(file) => file,
        Err(_) => return Response::not_found().write_to(stream).await,
    };

    let head = Response::new(StatusCode::Ok)
        .header("Content-Type", mime::content_type_for(url_path))
        .header("Cache-Control", STATIC_CACHE_CONTROL);
    head.write_head_to(stream, meta.len() as usize).await?;

    let mut chunk = [0u8; STREAM_CHUNK_BYTES];
    loop {
        let n = file.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        stream.write_all(&chunk[..n]).await?;
    }
    stream.flush().await
}

/// One level of symlink resolution. The bound is deliberate: a chain of two
/// links is an error, not something to follow.
async fn resolve_symlink_once(path: &Path) -> io::Result<PathBuf> {
    let meta = fs::symlink_metadata(path).await?;
    if !meta.file_type().is_symlink() {
        return Ok(path.to_path_buf());
    }

    let target = fs::read_link(path).await?;
    let target = if target.is_absolute() {
        target
    } else {
        path.parent().unwrap_or(Path::new("")).join(target)
    };

    let target_meta = fs::symlink_metadata(&target).await?;
    if target_meta.file_type().is_symlink() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "symlink points at another symlink",
        ));
    }

    Ok(target)
}
