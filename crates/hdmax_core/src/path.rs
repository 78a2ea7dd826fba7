//! Scene paths and interned-style name tokens.

use std::fmt;
use std::sync::Arc;

/// Absolute path of a prim in the scene, e.g. `/World/Forest/Trees`.
///
/// Cheap to clone; the empty path stands for "no prim".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SdfPath(Arc<str>);

impl SdfPath {
    /// Create a path from its string form.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    /// The empty path.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if this is the empty path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String form of the path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component (`Trees` for `/World/Forest/Trees`).
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for SdfPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SdfPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for SdfPath {
    fn from(path: String) -> Self {
        Self(Arc::from(path))
    }
}

/// A primvar or schema name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(Arc<str>);

impl Token {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
