//! HTTP-shaped responses for file delivery and rendered pages.
//!
//! No server is involved: callers (tests, the CLI `get` command, or an
//! embedding web framework) read the status, headers and body directly.

use crate::cache_tags::{CACHE_TAGS_HEADER, CacheTags};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    cache_tags: CacheTags,
}

impl Response {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            cache_tags: CacheTags::new(),
        }
    }

    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::new(Status::Ok)
        }
    }

    /// Set a header, replacing any existing value (names are case-insensitive).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn cache_tags(&self) -> &CacheTags {
        &self.cache_tags
    }

    /// Attach cache tags and mirror them into the cache-tags header.
    /// An empty set removes the header.
    pub fn with_cache_tags(mut self, tags: CacheTags) -> Self {
        self.headers
            .retain(|(n, _)| !n.eq_ignore_ascii_case(CACHE_TAGS_HEADER));
        if !tags.is_empty() {
            self.headers
                .push((CACHE_TAGS_HEADER.to_string(), tags.header_value()));
        }
        self.cache_tags = tags;
        self
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
