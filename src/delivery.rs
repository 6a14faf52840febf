//! Serve originals and image-style derivatives through the access check.
//!
//! Request paths mirror the URLs [`UrlGenerator`] builds:
//!
//! ```text
//! /files/image-test.png                                   original, public
//! /system/files/image-test.png                            original, private
//! /files/styles/large/public/image-test.png?itok=…        derivative, public
//! /system/files/styles/large/private/image-test.png?itok=… derivative, private
//! ```
//!
//! Checks run in a fixed order, and a derivative is only generated once all
//! of them pass:
//!
//! | Check | Failure |
//! |---|---|
//! | path parses | 404 |
//! | style exists | 404 |
//! | `itok` matches (when `require_token`) | 403 |
//! | account may read the original | 403, no cache tags |
//! | source file exists | 404 |
//! | derivative generated | 500 |
//!
//! A denied response never carries a style cache tag: the style was never
//! applied for that requester.

use crate::access::{Account, FileAccess};
use crate::cache_tags::{self, CacheTags};
use crate::derivative::{DerivativeError, TOKEN_PARAM, UrlGenerator, decode_path};
use crate::file::{FileUri, StorageScheme};
use crate::imaging::ImageBackend;
use crate::response::{Response, Status};
use crate::store::DerivativeStore;
use std::path::Path;

/// Cache lifetime for public files: two weeks.
const PUBLIC_CACHE_CONTROL: &str = "public, max-age=1209600";
const PRIVATE_CACHE_CONTROL: &str = "private";

/// A parsed delivery path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRequest {
    Original(FileUri),
    Derivative {
        style: String,
        uri: FileUri,
        token: Option<String>,
    },
}

impl FileRequest {
    /// Parse `path?query` against the URL layout of `urls`. Path segments
    /// are percent-decoded after the query is split off.
    pub fn parse(path_and_query: &str, urls: &UrlGenerator) -> Option<Self> {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path_and_query, None),
        };

        // Longest prefix wins, so nested URL paths cannot shadow each other.
        let (scheme, rest) = StorageScheme::ALL
            .iter()
            .filter_map(|&scheme| {
                let prefix = urls.url_path(scheme).trim_end_matches('/');
                path.strip_prefix(prefix)
                    .and_then(|r| r.strip_prefix('/'))
                    .map(|r| (prefix.len(), scheme, r))
            })
            .max_by_key(|(len, _, _)| *len)
            .map(|(_, scheme, rest)| (scheme, rest))?;

        match rest.strip_prefix("styles/") {
            Some(styled) => {
                let mut parts = styled.splitn(3, '/');
                let style = decode_path(parts.next()?).filter(|s| !s.is_empty())?;
                let path_scheme: StorageScheme = parts.next()?.parse().ok()?;
                if path_scheme != scheme {
                    return None;
                }
                let uri = FileUri::new(scheme, &decode_path(parts.next()?)?).ok()?;
                Some(FileRequest::Derivative {
                    style,
                    uri,
                    token: query.and_then(token_from_query),
                })
            }
            None => FileUri::new(scheme, &decode_path(rest)?)
                .ok()
                .map(FileRequest::Original),
        }
    }

    /// The original file, which access checks run against.
    pub fn original(&self) -> &FileUri {
        match self {
            FileRequest::Original(uri) | FileRequest::Derivative { uri, .. } => uri,
        }
    }
}

fn token_from_query(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == TOKEN_PARAM)
        .map(|(_, v)| v.to_string())
}

/// `Content-Type` for a file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

fn cache_control(scheme: StorageScheme) -> &'static str {
    if scheme.requires_authorization() {
        PRIVATE_CACHE_CONTROL
    } else {
        PUBLIC_CACHE_CONTROL
    }
}

/// Answers file requests for one site.
pub struct FileDelivery<'a, B: ImageBackend> {
    urls: &'a UrlGenerator,
    store: &'a DerivativeStore<B>,
    access: &'a dyn FileAccess,
    require_token: bool,
}

impl<'a, B: ImageBackend> FileDelivery<'a, B> {
    pub fn new(
        urls: &'a UrlGenerator,
        store: &'a DerivativeStore<B>,
        access: &'a dyn FileAccess,
        require_token: bool,
    ) -> Self {
        Self {
            urls,
            store,
            access,
            require_token,
        }
    }

    pub fn handle(&self, path_and_query: &str, account: &Account) -> Response {
        let Some(request) = FileRequest::parse(path_and_query, self.urls) else {
            log::debug!("no file route for {path_and_query}");
            return Response::new(Status::NotFound);
        };

        if let FileRequest::Derivative { style, uri, token } = &request {
            if !self.urls.styles().contains(style) {
                return Response::new(Status::NotFound);
            }
            if self.require_token && !self.urls.verify_token(style, uri, token.as_deref()) {
                log::warn!("rejected derivative {style} of {uri}: bad or missing token");
                return Response::new(Status::Forbidden);
            }
        }

        let original = request.original();
        if !self.access.can_read(original, account) {
            log::warn!("denied {} read of {original}", account.name());
            return Response::new(Status::Forbidden);
        }

        match &request {
            FileRequest::Original(uri) => self.serve_original(uri),
            FileRequest::Derivative { style, uri, .. } => self.serve_derivative(style, uri),
        }
    }

    fn serve_original(&self, uri: &FileUri) -> Response {
        let path = self.store.source_path(uri);
        match std::fs::read(&path) {
            Ok(body) => file_response(body, &path, uri.scheme(), CacheTags::new()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Response::new(Status::NotFound),
            Err(e) => {
                log::error!("reading {}: {e}", path.display());
                Response::new(Status::InternalServerError)
            }
        }
    }

    fn serve_derivative(&self, style: &str, uri: &FileUri) -> Response {
        let derivative = match self.store.ensure(style, uri) {
            Ok(d) => d,
            Err(DerivativeError::SourceNotFound(_) | DerivativeError::UnknownStyle(_)) => {
                return Response::new(Status::NotFound);
            }
            Err(e) => {
                log::error!("generating {style} derivative of {uri}: {e}");
                return Response::new(Status::InternalServerError);
            }
        };
        match std::fs::read(&derivative.path) {
            Ok(body) => {
                let tags: CacheTags = [cache_tags::style_tag(style)].into_iter().collect();
                file_response(body, &derivative.path, uri.scheme(), tags)
            }
            Err(e) => {
                log::error!("reading {}: {e}", derivative.path.display());
                Response::new(Status::InternalServerError)
            }
        }
    }
}

fn file_response(body: Vec<u8>, path: &Path, scheme: StorageScheme, tags: CacheTags) -> Response {
    Response::ok(body)
        .with_header("Content-Type", content_type(path))
        .with_header("Cache-Control", cache_control(scheme))
        .with_cache_tags(tags)
}
