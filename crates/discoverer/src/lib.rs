//! # Chunkscout Discoverer
//!
//! Static discovery of lazily-loaded chunks in bundled JavaScript.
//!
//! Given the text of an entry script, the discoverer finds the runtime code a
//! bundler emits to resolve chunk names (Next.js build manifests, webpack
//! chunk-mapping functions and module references, Vite dependency maps,
//! "modern" chunk maps) and reproduces the paths those routines would request,
//! without loading the application.
//!
//! ## Architecture
//!
//! ```text
//! Entry script text
//!     │
//!     ├──> Tree-sitter Parsing → SourceArtifact (fail closed on syntax errors)
//!     │
//!     ├──> Fingerprinting → ChunkLoadingPattern[]
//!     │
//!     ├──> Per pattern (evaluating ones in a fresh Sandbox)
//!     │    ├─> Next.js manifest: evaluate payload, flatten array properties
//!     │    ├─> Webpack runtime: isolate function → infer params → evaluate each
//!     │    ├─> Module references: require("..") / import .. from ".."
//!     │    ├─> Vite deps: isolate array → keep .js/.mjs entries
//!     │    └─> Modern map: literal pair values → "<value>.modern.js"
//!     │
//!     └──> Merge
//!          ├─> Drop denylisted built-ins
//!          ├─> Vite wins when it found anything
//!          └─> Emit BTreeSet<ChunkPath>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chunkscout_discoverer::{discover_chunks, DiscoveryConfig};
//!
//! let source = r#"self.__BUILD_MANIFEST = { "/": ["static/chunks/0.js"] };"#;
//! let chunks = discover_chunks(source, &DiscoveryConfig::new(3000));
//!
//! for chunk in &chunks {
//!     println!("{chunk}");
//! }
//! ```

mod config;
mod discoverer;
mod error;
mod fetch;
mod source;
mod types;
mod visitor;

pub mod evaluator;
pub mod fingerprint;
pub mod inference;
pub mod isolator;
pub mod manifest;
pub mod sandbox;

pub use config::{DiscoveryConfig, SandboxLimits};
pub use discoverer::{discover_chunks, ChunkDiscoverer, Discovery, DENYLIST};
pub use error::{DiscoveryError, EvaluationFailure, EvaluationOutcome, Result};
pub use fetch::{discover_chunks_from_url, fetch_source};
pub use source::SourceArtifact;
pub use types::{CandidateParameter, ChunkLoadingPattern, ChunkPath, Span, Toolchain};
