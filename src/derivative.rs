//! URLs for original files and their image-style derivatives.
//!
//! Every URL is built from `[files]` config. Public and private files differ
//! only in the path prefix; the private prefix is served by
//! [`FileDelivery`](crate::delivery::FileDelivery), which runs the access
//! check before any bytes (or derivatives) are produced.
//!
//! ```text
//! public://photos/dawn.png
//!   original    /files/photos/dawn.png
//!   derivative  /files/styles/large/public/photos/dawn.png?itok=1a2b3c4d
//!
//! private://photos/dawn.png
//!   original    /system/files/photos/dawn.png
//!   derivative  /system/files/styles/large/private/photos/dawn.png?itok=…
//! ```
//!
//! Path segments are percent-encoded, so a file named `a?b.png` or
//! `my photo.png` keeps its whole name in the URL and never splits a
//! `srcset` candidate. [`FileRequest::parse`](crate::delivery::FileRequest::parse)
//! decodes them again.
//!
//! The `itok` token is a truncated SHA-256 over the secret, style and URI. It
//! is deterministic: asking for the same derivative URL any number of times,
//! from any thread, yields the same bytes.

use crate::config::FilesConfig;
use crate::file::{FileUri, SourceImage, StorageScheme};
use crate::imaging::{BackendError, Dimensions};
use crate::style::StyleCatalog;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Query parameter carrying the derivative token.
pub const TOKEN_PARAM: &str = "itok";

#[derive(Error, Debug)]
pub enum DerivativeError {
    #[error("unknown image style: {0}")]
    UnknownStyle(String),
    #[error("source image not found: {0}")]
    SourceNotFound(FileUri),
    #[error("image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes escaped inside one URL path segment. `,` is escaped because it
/// separates `srcset` candidates.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b',')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode every `/`-separated segment of `path`.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of [`encode_path`]. `None` when the bytes are not UTF-8.
pub fn decode_path(path: &str) -> Option<String> {
    percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Turns stored images into URLs and predicts derivative sizes.
pub trait DerivativeService: Sync {
    /// URL of the untouched file.
    fn original_url(&self, image: &SourceImage) -> String;

    /// URL of `image` processed by `style`.
    fn derivative_url(&self, image: &SourceImage, style: &str) -> Result<String, DerivativeError>;

    /// Size of the `style` derivative of an image of `dims`.
    fn transform_dimensions(
        &self,
        style: &str,
        dims: Dimensions,
    ) -> Result<Dimensions, DerivativeError>;
}

/// `itok` value for a derivative: first 8 hex chars of SHA-256.
pub fn derivative_token(secret: &str, style: &str, uri: &FileUri) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b"\0");
    hasher.update(style.as_bytes());
    hasher.update(b"\0");
    hasher.update(uri.to_string().as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..8].to_string()
}

/// Path of a derivative relative to its scheme root:
/// `styles/<style>/<scheme>/<target>`.
pub fn derivative_relative_path(style: &str, uri: &FileUri) -> String {
    format!("styles/{style}/{}/{}", uri.scheme(), uri.target())
}

/// The stock [`DerivativeService`], driven by config.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    files: FilesConfig,
    secret: String,
    styles: StyleCatalog,
}

impl UrlGenerator {
    pub fn new(files: FilesConfig, secret: impl Into<String>, styles: StyleCatalog) -> Self {
        Self {
            files,
            secret: secret.into(),
            styles,
        }
    }

    pub fn files(&self) -> &FilesConfig {
        &self.files
    }

    pub fn styles(&self) -> &StyleCatalog {
        &self.styles
    }

    pub fn token(&self, style: &str, uri: &FileUri) -> String {
        derivative_token(&self.secret, style, uri)
    }

    pub fn verify_token(&self, style: &str, uri: &FileUri, token: Option<&str>) -> bool {
        token.is_some_and(|t| t == self.token(style, uri))
    }

    /// URL path prefix (without base URL) for a scheme.
    pub fn url_path(&self, scheme: StorageScheme) -> &str {
        match scheme {
            StorageScheme::Public => &self.files.public_url_path,
            StorageScheme::Private => &self.files.private_url_path,
        }
    }

    fn prefix(&self, scheme: StorageScheme) -> String {
        format!(
            "{}{}",
            self.files.base_url.trim_end_matches('/'),
            self.url_path(scheme).trim_end_matches('/')
        )
    }
}

impl DerivativeService for UrlGenerator {
    fn original_url(&self, image: &SourceImage) -> String {
        format!(
            "{}/{}",
            self.prefix(image.uri.scheme()),
            encode_path(image.uri.target())
        )
    }

    fn derivative_url(&self, image: &SourceImage, style: &str) -> Result<String, DerivativeError> {
        if !self.styles.contains(style) {
            return Err(DerivativeError::UnknownStyle(style.to_string()));
        }
        let scheme = image.uri.scheme();
        Ok(format!(
            "{}/styles/{}/{scheme}/{}?{TOKEN_PARAM}={}",
            self.prefix(scheme),
            encode_path(style),
            encode_path(image.uri.target()),
            self.token(style, &image.uri)
        ))
    }

    fn transform_dimensions(
        &self,
        style: &str,
        dims: Dimensions,
    ) -> Result<Dimensions, DerivativeError> {
        self.styles
            .get(style)
            .map(|s| s.transform_dimensions(dims))
            .ok_or_else(|| DerivativeError::UnknownStyle(style.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SECRET, test_image, url_generator};

    #[test]
    fn public_original_url() {
        assert_eq!(
            url_generator().original_url(&test_image("public")),
            "/files/image-test.png"
        );
    }

    #[test]
    fn private_original_url() {
        assert_eq!(
            url_generator().original_url(&test_image("private")),
            "/system/files/image-test.png"
        );
    }

    #[test]
    fn derivative_url_carries_style_scheme_and_token() {
        let urls = url_generator();
        let image = test_image("public");
        let url = urls.derivative_url(&image, "large").unwrap();
        let token = derivative_token(SECRET, "large", &image.uri);
        assert_eq!(
            url,
            format!("/files/styles/large/public/image-test.png?itok={token}")
        );
        assert_eq!(token.len(), 8);
    }

    #[test]
    fn private_derivative_url_uses_private_prefix() {
        let url = url_generator()
            .derivative_url(&test_image("private"), "thumbnail")
            .unwrap();
        assert!(url.starts_with("/system/files/styles/thumbnail/private/image-test.png?itok="));
    }

    #[test]
    fn base_url_is_prepended_without_double_slash() {
        let files = FilesConfig {
            base_url: "https://example.com/".into(),
            ..FilesConfig::default()
        };
        let urls = UrlGenerator::new(files, SECRET, crate::test_helpers::stock_catalog());
        assert_eq!(
            urls.original_url(&test_image("public")),
            "https://example.com/files/image-test.png"
        );
    }

    #[test]
    fn reserved_characters_are_escaped_per_segment() {
        let urls = url_generator();
        let image = SourceImage::new("public://dir one/a?b#c,d.png".parse().unwrap(), None);
        assert_eq!(
            urls.original_url(&image),
            "/files/dir%20one/a%3Fb%23c%2Cd.png"
        );
        let url = urls.derivative_url(&image, "large").unwrap();
        let (path, query) = url.split_once('?').unwrap();
        assert_eq!(path, "/files/styles/large/public/dir%20one/a%3Fb%23c%2Cd.png");
        assert!(query.starts_with("itok="));
        assert!(!url.contains(' '));
    }

    #[test]
    fn decode_path_reverses_encode_path() {
        for raw in ["plain.png", "my photo.png", "a?b.png", "x#y/é 100%.jpg"] {
            assert_eq!(decode_path(&encode_path(raw)).as_deref(), Some(raw));
        }
        assert_eq!(decode_path("%FF"), None);
    }

    #[test]
    fn unknown_style_is_error() {
        let err = url_generator()
            .derivative_url(&test_image("public"), "poster")
            .unwrap_err();
        assert!(matches!(err, DerivativeError::UnknownStyle(s) if s == "poster"));
    }

    #[test]
    fn derivative_url_is_deterministic_across_threads() {
        let urls = url_generator();
        let image = test_image("public");
        let (a, b) = std::thread::scope(|s| {
            let a = s.spawn(|| urls.derivative_url(&image, "large").unwrap());
            let b = s.spawn(|| urls.derivative_url(&image, "large").unwrap());
            (a.join().unwrap(), b.join().unwrap())
        });
        assert_eq!(a, b);
    }

    #[test]
    fn token_depends_on_secret_style_and_uri() {
        let uri: FileUri = "public://a.png".parse().unwrap();
        let other: FileUri = "public://b.png".parse().unwrap();
        let base = derivative_token("s", "large", &uri);
        assert_ne!(base, derivative_token("t", "large", &uri));
        assert_ne!(base, derivative_token("s", "medium", &uri));
        assert_ne!(base, derivative_token("s", "large", &other));
    }

    #[test]
    fn verify_token_requires_exact_match() {
        let urls = url_generator();
        let uri = test_image("public").uri;
        let good = urls.token("large", &uri);
        assert!(urls.verify_token("large", &uri, Some(&good)));
        assert!(!urls.verify_token("large", &uri, Some("deadbeef")));
        assert!(!urls.verify_token("large", &uri, None));
    }

    #[test]
    fn transform_dimensions_follows_style() {
        let urls = url_generator();
        assert_eq!(
            urls.transform_dimensions("thumbnail", Dimensions::new(400, 200))
                .unwrap(),
            Dimensions::new(100, 50)
        );
        assert!(
            urls.transform_dimensions("poster", Dimensions::new(1, 1))
                .is_err()
        );
    }
}
