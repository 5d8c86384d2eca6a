use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::evaluator;
use crate::fingerprint;
use crate::inference;
use crate::isolator;
use crate::manifest;
use crate::sandbox::Sandbox;
use crate::source::SourceArtifact;
use crate::types::{ChunkLoadingPattern, ChunkPath, Span, Toolchain};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Platform built-ins and build-tool packages that are never chunks
pub const DENYLIST: &[&str] = &[
    "buffer",
    "crypto",
    "events",
    "fs",
    "http",
    "https",
    "os",
    "path",
    "querystring",
    "stream",
    "string_decoder",
    "url",
    "util",
    "zlib",
    "next/dist/compiled/@ampproject/toolbox-optimizer",
    "critters",
];

/// Suffix appended to every value of a modern chunk map
const MODERN_CHUNK_SUFFIX: &str = ".modern.js";

/// Result of one discovery call
#[derive(Debug, Clone, Default, Serialize)]
pub struct Discovery {
    /// Final chunk set after filtering and toolchain precedence
    pub chunks: BTreeSet<ChunkPath>,

    /// Filtered chunks found per toolchain, before precedence
    pub contributions: BTreeMap<Toolchain, BTreeSet<ChunkPath>>,

    /// Number of chunk-loading patterns detected
    pub patterns: usize,

    /// Whether Vite chunks replaced every other contribution
    pub vite_authoritative: bool,
}

impl Discovery {
    fn merge(contributions: BTreeMap<Toolchain, BTreeSet<ChunkPath>>, patterns: usize) -> Self {
        let vite = contributions
            .get(&Toolchain::Vite)
            .filter(|chunks| !chunks.is_empty());

        let (chunks, vite_authoritative) = match vite {
            Some(vite) => (vite.clone(), true),
            None => (contributions.values().flatten().cloned().collect(), false),
        };

        Self {
            chunks,
            contributions,
            patterns,
            vite_authoritative,
        }
    }

    #[must_use]
    pub fn into_chunks(self) -> BTreeSet<ChunkPath> {
        self.chunks
    }
}

/// Runs every detector over an entry script and merges their findings
#[derive(Debug, Clone)]
pub struct ChunkDiscoverer {
    config: DiscoveryConfig,
}

impl ChunkDiscoverer {
    /// Create a discoverer; the configuration is validated up front
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        config.validate().map_err(DiscoveryError::invalid_config)?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discover chunks in source text. Unparseable text yields an empty result.
    pub fn discover(&self, source: &str) -> Discovery {
        match SourceArtifact::parse(source) {
            Ok(artifact) => self.discover_artifact(&artifact),
            Err(err) => {
                log::warn!("Chunk discovery skipped: {err}");
                Discovery::default()
            }
        }
    }

    /// Discover chunks in an already parsed artifact
    pub fn discover_artifact(&self, artifact: &SourceArtifact) -> Discovery {
        let patterns = fingerprint::classify(artifact);
        let mut contributions: BTreeMap<Toolchain, BTreeSet<ChunkPath>> = BTreeMap::new();

        for pattern in &patterns {
            let toolchain = pattern.toolchain();
            let found: BTreeSet<ChunkPath> = self
                .extract(artifact, pattern)
                .into_iter()
                .filter(|path| is_valid_chunk(toolchain, path))
                .filter_map(ChunkPath::new)
                .collect();
            log::debug!("{} pattern yielded {} chunks", pattern.name(), found.len());
            contributions.entry(toolchain).or_default().extend(found);
        }

        let discovery = Discovery::merge(contributions, patterns.len());
        if discovery.vite_authoritative {
            log::debug!("Vite chunks found, discarding other toolchains");
        }
        log::info!(
            "Discovered {} chunks from {} patterns",
            discovery.chunks.len(),
            discovery.patterns
        );
        discovery
    }

    /// Raw strings produced by one pattern's extractor
    fn extract(&self, artifact: &SourceArtifact, pattern: &ChunkLoadingPattern) -> Vec<String> {
        match pattern {
            ChunkLoadingPattern::NextManifestFunction { invocation } => self
                .with_sandbox(pattern, |sandbox| {
                    manifest::extract_from_function(sandbox, invocation)
                }),
            ChunkLoadingPattern::NextManifestObject { object } => self
                .with_sandbox(pattern, |sandbox| manifest::extract_from_object(sandbox, object)),
            ChunkLoadingPattern::WebpackRuntime { function } => self
                .with_sandbox(pattern, |sandbox| {
                    self.extract_webpack(artifact, *function, sandbox)
                }),
            ChunkLoadingPattern::ViteManifest { deps } => match isolator::isolate(artifact, *deps) {
                Some(array) => self.with_sandbox(pattern, |sandbox| {
                    evaluator::evaluate_string_list(sandbox, &array)
                }),
                None => Vec::new(),
            },
            ChunkLoadingPattern::ModernChunkMap { mapping } => {
                manifest::extract_modern_chunk_map(mapping)
                    .into_iter()
                    .map(|name| format!("{name}{MODERN_CHUNK_SUFFIX}"))
                    .collect()
            }
            ChunkLoadingPattern::ModuleReference { specifier } => vec![specifier.clone()],
        }
    }

    /// Run one extractor in its own fresh sandbox
    fn with_sandbox(
        &self,
        pattern: &ChunkLoadingPattern,
        run: impl FnOnce(&mut Sandbox) -> Vec<String>,
    ) -> Vec<String> {
        match Sandbox::acquire(&self.config.sandbox) {
            Ok(mut sandbox) => run(&mut sandbox),
            Err(err) => {
                log::warn!("No sandbox for {} pattern: {err}", pattern.name());
                Vec::new()
            }
        }
    }

    fn extract_webpack(&self, artifact: &SourceArtifact, span: Span, sandbox: &mut Sandbox) -> Vec<String> {
        let Some(function) = isolator::isolate(artifact, span) else {
            return Vec::new();
        };
        let candidates = match inference::infer_params(&function, self.config.bruteforce_limit) {
            Ok(candidates) => candidates,
            Err(err) => {
                log::debug!("Parameter inference failed for webpack function at {span:?}: {err}");
                return Vec::new();
            }
        };
        log::debug!(
            "Evaluating webpack function at {span:?} with {} candidates",
            candidates.len()
        );

        evaluator::evaluate_candidates(sandbox, &function, &candidates)
            .into_iter()
            .map(ChunkPath::into_string)
            .collect()
    }
}

/// Per-toolchain validity filter plus the shared denylist
fn is_valid_chunk(toolchain: Toolchain, path: &str) -> bool {
    if path.is_empty() || DENYLIST.contains(&path) {
        return false;
    }
    match toolchain {
        Toolchain::Webpack => !path.contains("undefined"),
        // Vite dependency lists also carry stylesheets
        Toolchain::Vite => path.ends_with(".js") || path.ends_with(".mjs"),
        Toolchain::NextJs | Toolchain::Modern => true,
    }
}

/// Discover the chunks referenced by one entry script.
///
/// Never fails: invalid configuration or unparseable source give an empty set.
pub fn discover_chunks(source: &str, config: &DiscoveryConfig) -> BTreeSet<ChunkPath> {
    match ChunkDiscoverer::new(config.clone()) {
        Ok(discoverer) => discoverer.discover(source).into_chunks(),
        Err(err) => {
            log::warn!("Chunk discovery skipped: {err}");
            BTreeSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(paths: &[&str]) -> BTreeSet<ChunkPath> {
        paths.iter().filter_map(|p| ChunkPath::new(*p)).collect()
    }

    #[test]
    fn test_validity_filters() {
        assert!(!is_valid_chunk(Toolchain::NextJs, "crypto"));
        assert!(!is_valid_chunk(Toolchain::Vite, "critters"));
        assert!(is_valid_chunk(Toolchain::NextJs, "crypto.js"));
        assert!(!is_valid_chunk(Toolchain::Webpack, "static/undefined.js"));
        assert!(!is_valid_chunk(Toolchain::Vite, "assets/index.css"));
        assert!(is_valid_chunk(Toolchain::Vite, "assets/index.mjs"));
        assert!(!is_valid_chunk(Toolchain::Modern, ""));
    }

    #[test]
    fn test_merge_prefers_non_empty_vite() {
        let mut contributions = BTreeMap::new();
        contributions.insert(Toolchain::Webpack, set(&["w.js"]));
        contributions.insert(Toolchain::Vite, set(&["v.js"]));

        let discovery = Discovery::merge(contributions, 2);
        assert!(discovery.vite_authoritative);
        assert_eq!(discovery.chunks, set(&["v.js"]));
    }

    #[test]
    fn test_merge_ignores_empty_vite() {
        let mut contributions = BTreeMap::new();
        contributions.insert(Toolchain::Webpack, set(&["w.js"]));
        contributions.insert(Toolchain::NextJs, set(&["n.js", "w.js"]));
        contributions.insert(Toolchain::Vite, BTreeSet::new());

        let discovery = Discovery::merge(contributions, 3);
        assert!(!discovery.vite_authoritative);
        assert_eq!(discovery.chunks, set(&["n.js", "w.js"]));
    }

    #[test]
    fn test_denylisted_manifest_entries_removed() {
        let config = DiscoveryConfig::new(10);
        let chunks = discover_chunks(
            r#"self.__BUILD_MANIFEST = { "/": ["fs", "critters", "static/chunks/a.js"] };"#,
            &config,
        );
        assert_eq!(chunks, set(&["static/chunks/a.js"]));
    }

    #[test]
    fn test_module_references_pass_denylist() {
        let config = DiscoveryConfig::new(10);
        let source = r#"
import a from "./lazy-a.js";
import { readFile } from "fs";
var b = require("./lazy-b.js");
var c = require("crypto");
"#;
        let discovery = ChunkDiscoverer::new(config).unwrap().discover(source);
        assert_eq!(discovery.chunks, set(&["./lazy-a.js", "./lazy-b.js"]));
        assert_eq!(discovery.patterns, 4);
    }

    #[test]
    fn test_invalid_config_yields_empty() {
        let mut config = DiscoveryConfig::new(10);
        config.sandbox.timeout_ms = 0;
        assert!(ChunkDiscoverer::new(config.clone()).is_err());
        assert!(discover_chunks(r#"self.__BUILD_MANIFEST = { "/": ["a.js"] };"#, &config).is_empty());
    }
}
