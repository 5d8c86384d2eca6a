use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A script resource produced by a bundler and loaded on demand
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkPath(String);

impl ChunkPath {
    /// Create a chunk path; empty strings are not chunk paths
    pub fn new(path: impl Into<String>) -> Option<Self> {
        let path = path.into();
        if path.is_empty() {
            None
        } else {
            Some(Self(path))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ChunkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChunkPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for ChunkPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A plausible input for a chunk-mapping function
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateParameter {
    Integer(i64),
    Text(String),
}

impl CandidateParameter {
    /// Render as a JavaScript argument: integers bare, strings quoted
    #[must_use]
    pub fn to_js_argument(&self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            // JSON string literals are valid JavaScript string literals
            Self::Text(value) => {
                serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
            }
        }
    }
}

impl fmt::Display for CandidateParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
        }
    }
}

/// Byte range of a located node inside a source artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn range(self) -> Range<usize> {
        self.start..self.end
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Bundling toolchain a pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toolchain {
    NextJs,
    Webpack,
    Vite,
    Modern,
}

impl Toolchain {
    pub fn as_str(self) -> &'static str {
        match self {
            Toolchain::NextJs => "nextjs",
            Toolchain::Webpack => "webpack",
            Toolchain::Vite => "vite",
            Toolchain::Modern => "modern",
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognised chunk-loading shape and its located payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkLoadingPattern {
    /// `self.__BUILD_MANIFEST = function(..){..}(..)`; payload is the invocation text
    NextManifestFunction { invocation: String },

    /// `self.__BUILD_MANIFEST = {..}`; payload is the object literal text
    NextManifestObject { object: String },

    /// Single-parameter chunk lookup function
    WebpackRuntime { function: Span },

    /// Vite dependency array literal
    ViteManifest { deps: Span },

    /// `return o.p + "" + {..}`; payload is the raw mapping text between the braces
    ModernChunkMap { mapping: String },

    /// Module named by `require("..")` or an `import .. from ".."` declaration
    ModuleReference { specifier: String },
}

impl ChunkLoadingPattern {
    #[must_use]
    pub const fn toolchain(&self) -> Toolchain {
        match self {
            Self::NextManifestFunction { .. } | Self::NextManifestObject { .. } => Toolchain::NextJs,
            Self::WebpackRuntime { .. } | Self::ModuleReference { .. } => Toolchain::Webpack,
            Self::ViteManifest { .. } => Toolchain::Vite,
            Self::ModernChunkMap { .. } => Toolchain::Modern,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NextManifestFunction { .. } => "next_manifest_function",
            Self::NextManifestObject { .. } => "next_manifest_object",
            Self::WebpackRuntime { .. } => "webpack_runtime",
            Self::ViteManifest { .. } => "vite_manifest",
            Self::ModernChunkMap { .. } => "modern_chunk_map",
            Self::ModuleReference { .. } => "module_reference",
        }
    }
}
