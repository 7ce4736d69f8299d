use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// Status codes this server actually emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    MovedPermanently,
    Found,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::MovedPermanently => 301,
            StatusCode::Found => 302,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
        }
    }
}

/// A response ready to be written. Header order is kept as inserted.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Response {
            status,
            headers: vec![],
            body: vec![],
        }
    }

    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Response::new(StatusCode::Ok)
            .header("Content-Type", "text/html")
            .body(body)
    }

    pub fn not_found() -> Self {
        Response::new(StatusCode::NotFound)
            .header("Content-Type", "text/html")
            .body("not found")
    }

    pub fn unauthorized() -> Self {
        Response::new(StatusCode::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Response::new(StatusCode::Forbidden)
    }

    pub fn bad_request(reason: &str) -> Self {
        Response::new(StatusCode::BadRequest)
            .header("Content-Type", "text/plain")
            .body(reason.to_string())
    }

    pub fn redirect(status: StatusCode, location: &str) -> Self {
        Response::new(status).header("Location", location)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub async fn write_to<S>(&self, stream: &mut S) -> io::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        let head = self.head(self.body.len());
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(&self.body).await?;
        stream.flush().await
    }

    /// Head only, with an explicit length — for bodies streamed separately
    /// (static files).
    pub async fn write_head_to<S>(&self, stream: &mut S, content_length: usize) -> io::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        stream.write_all(self.head(content_length).as_bytes()).await
    }

    fn head(&self, content_length: usize) -> String {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.reason_phrase()
        );
        for (key, value) in &self.headers {
            head += &format!("{}: {}\r\n", key, value);
        }
        head += &format!("Content-Length: {}\r\n", content_length);
        head += "Connection: close\r\n";
        // Every response, whatever branch produced it, gets a filler header
        // of random length so the encrypted response size does not reveal
        // which branch ran.
        head += &format!("X-Pad: {}\r\n", filler_value());
        head += "\r\n";
        head
    }
}

/// Uniform length in 1..=32, content from the fast-rng uuid pool.
fn filler_value() -> String {
    let id = Uuid::new_v4();
    let len = 1 + (id.as_bytes()[0] as usize) % 32;
    let hex = id.simple().to_string();
    hex[..len].to_string()
}
