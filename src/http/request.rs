/// HTTP request methods the reader recognizes on the start line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl Method {
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "HEAD" => Some(Method::Head),
            "OPTIONS" => Some(Method::Options),
            "PATCH" => Some(Method::Patch),
            _ => None,
        }
    }

    /// GET carries no body, whatever the headers claim.
    pub fn has_body(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

/// One fully framed request off the wire: start line plus exactly the body
/// bytes the headers promised.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub content_length: usize,
    pub body: Vec<u8>,
}

impl Request {
    pub fn page(&self) -> usize {
        match &self.query {
            Some(query) => crate::query_string::QueryString::from(query).get_page(),
            None => 0,
        }
    }
}
