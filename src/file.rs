//! Stored files: scheme-qualified URIs and the images a field references.
//!
//! A file is addressed as `<scheme>://<target>`, e.g. `public://2026-10/dawn.png`.
//! The scheme decides where the bytes live and whether reading them needs an
//! authorization check:
//!
//! | Scheme | Served by | Access |
//! |---|---|---|
//! | `public` | static files path | anyone |
//! | `private` | the delivery layer | checked per account |

use crate::imaging::Dimensions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FileUriError {
    #[error("missing scheme in file URI: {0}")]
    MissingScheme(String),
    #[error("unknown storage scheme: {0}")]
    UnknownScheme(String),
    #[error("invalid file target: {0}")]
    InvalidTarget(String),
}

/// Where a file is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScheme {
    Public,
    Private,
}

impl StorageScheme {
    pub const ALL: [StorageScheme; 2] = [StorageScheme::Public, StorageScheme::Private];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageScheme::Public => "public",
            StorageScheme::Private => "private",
        }
    }

    /// Whether reads must pass an account check.
    pub fn requires_authorization(self) -> bool {
        matches!(self, StorageScheme::Private)
    }
}

impl fmt::Display for StorageScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageScheme {
    type Err = FileUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(StorageScheme::Public),
            "private" => Ok(StorageScheme::Private),
            other => Err(FileUriError::UnknownScheme(other.to_string())),
        }
    }
}

/// A scheme-qualified file reference such as `private://photos/dawn.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileUri {
    scheme: StorageScheme,
    target: String,
}

impl FileUri {
    /// Build a URI from parts, validating the target.
    pub fn new(scheme: StorageScheme, target: &str) -> Result<Self, FileUriError> {
        let target = target.trim_start_matches('/');
        validate_target(target)?;
        Ok(Self {
            scheme,
            target: target.to_string(),
        })
    }

    pub fn scheme(&self) -> StorageScheme {
        self.scheme
    }

    /// Path relative to the scheme root, using `/` separators.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// File name component of the target.
    pub fn file_name(&self) -> &str {
        self.target.rsplit('/').next().unwrap_or(&self.target)
    }
}

/// Reject empty targets and anything that could climb out of the scheme root.
fn validate_target(target: &str) -> Result<(), FileUriError> {
    if target.is_empty()
        || target.contains('\\')
        || target
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(FileUriError::InvalidTarget(target.to_string()));
    }
    Ok(())
}

impl FromStr for FileUri {
    type Err = FileUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, target) = s
            .split_once("://")
            .ok_or_else(|| FileUriError::MissingScheme(s.to_string()))?;
        FileUri::new(scheme.parse()?, target)
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.target)
    }
}

/// A stored image as referenced by an image field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub uri: FileUri,
    /// Original pixel size, when known. Drives fallback `width`/`height`.
    pub dimensions: Option<Dimensions>,
}

impl SourceImage {
    pub fn new(uri: FileUri, dimensions: Option<Dimensions>) -> Self {
        Self { uri, dimensions }
    }
}

/// One value of an image field: the file plus its text alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageItem {
    pub image: SourceImage,
    pub alt: String,
    pub title: Option<String>,
}

impl ImageItem {
    pub fn new(image: SourceImage, alt: impl Into<String>) -> Self {
        Self {
            image,
            alt: alt.into(),
            title: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_public_uri() {
        let uri: FileUri = "public://2026-10/dawn.png".parse().unwrap();
        assert_eq!(uri.scheme(), StorageScheme::Public);
        assert_eq!(uri.target(), "2026-10/dawn.png");
        assert_eq!(uri.file_name(), "dawn.png");
        assert_eq!(uri.to_string(), "public://2026-10/dawn.png");
    }

    #[test]
    fn parse_private_uri() {
        let uri: FileUri = "private://image-test.png".parse().unwrap();
        assert_eq!(uri.scheme(), StorageScheme::Private);
        assert!(uri.scheme().requires_authorization());
    }

    #[test]
    fn public_scheme_needs_no_authorization() {
        assert!(!StorageScheme::Public.requires_authorization());
    }

    #[test]
    fn missing_scheme_is_error() {
        assert_eq!(
            "dawn.png".parse::<FileUri>(),
            Err(FileUriError::MissingScheme("dawn.png".into()))
        );
    }

    #[test]
    fn unknown_scheme_is_error() {
        assert_eq!(
            "temporary://dawn.png".parse::<FileUri>(),
            Err(FileUriError::UnknownScheme("temporary".into()))
        );
    }

    #[test]
    fn parent_segments_rejected() {
        assert!("public://../etc/passwd".parse::<FileUri>().is_err());
        assert!("public://a/./b.png".parse::<FileUri>().is_err());
        assert!("public://a//b.png".parse::<FileUri>().is_err());
        assert!("public://".parse::<FileUri>().is_err());
    }

    #[test]
    fn leading_slashes_are_trimmed() {
        let uri = FileUri::new(StorageScheme::Public, "/a/b.png").unwrap();
        assert_eq!(uri.target(), "a/b.png");
    }
}
