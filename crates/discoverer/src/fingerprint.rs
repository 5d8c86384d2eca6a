//! Recognition of the chunk-loading shapes emitted by known bundlers.

use crate::source::SourceArtifact;
use crate::types::{ChunkLoadingPattern, Span};
use crate::visitor::{
    self, binary_operator, is_logical_operator, string_value, unwrap_parens, SyntaxKind, Visitor,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

/// Global property Next.js assigns its build manifest to
const NEXT_MANIFEST_OBJECT: &str = "self";
const NEXT_MANIFEST_PROPERTY: &str = "__BUILD_MANIFEST";

/// Name Vite gives its preload dependency helper
const VITE_MAP_DEPS: &str = "__vite__mapDeps";

const REQUIRE: &str = "require";

/// `return <base>.p + "" + { <mapping> }`
static MODERN_CHUNK_MAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"return\s+[A-Za-z_$][\w$]*\.p\s*\+\s*""\s*\+\s*\{([^}]*)\}"#)
        .expect("modern chunk map regex")
});

/// Classify an artifact against all known shapes.
///
/// Matches are not exclusive; every match is returned. The Next.js object
/// form is only reported when no function form matched.
pub fn classify(artifact: &SourceArtifact) -> Vec<ChunkLoadingPattern> {
    let mut detector = PatternDetector::new(artifact);
    visitor::walk(artifact.root(), &mut detector);

    let mut patterns = if detector.next_functions.is_empty() {
        detector.next_objects
    } else {
        detector.next_functions
    };
    patterns.append(&mut detector.runtime);
    patterns.append(&mut detector.module_refs);
    patterns.extend(modern_chunk_maps(artifact.text()));

    for pattern in &patterns {
        log::debug!("Detected {} pattern", pattern.name());
    }
    patterns
}

/// Parse and classify raw source; unparseable text yields no patterns
pub fn classify_source(text: &str) -> Vec<ChunkLoadingPattern> {
    match SourceArtifact::parse(text) {
        Ok(artifact) => classify(&artifact),
        Err(err) => {
            log::debug!("Fingerprinting skipped: {err}");
            Vec::new()
        }
    }
}

/// Textual check for the modern chunk map idiom
fn modern_chunk_maps(text: &str) -> Vec<ChunkLoadingPattern> {
    MODERN_CHUNK_MAP
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|mapping| ChunkLoadingPattern::ModernChunkMap {
            mapping: mapping.as_str().to_string(),
        })
        .collect()
}

struct PatternDetector<'a> {
    source: &'a str,
    next_functions: Vec<ChunkLoadingPattern>,
    next_objects: Vec<ChunkLoadingPattern>,
    /// Webpack and Vite matches in document order
    runtime: Vec<ChunkLoadingPattern>,
    /// Distinct `require`/`import` specifiers in document order
    module_refs: Vec<ChunkLoadingPattern>,
}

impl<'a> PatternDetector<'a> {
    fn new(artifact: &'a SourceArtifact) -> Self {
        Self {
            source: artifact.text(),
            next_functions: Vec::new(),
            next_objects: Vec::new(),
            runtime: Vec::new(),
            module_refs: Vec::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }

    fn is_build_manifest_target(&self, left: Node<'_>) -> bool {
        if SyntaxKind::of(left) != SyntaxKind::MemberExpression {
            return false;
        }
        let object = left.child_by_field_name("object").map(unwrap_parens);
        let property = left.child_by_field_name("property");
        matches!(
            (object, property),
            (Some(object), Some(property))
                if SyntaxKind::of(object) == SyntaxKind::Identifier
                    && self.text(object) == NEXT_MANIFEST_OBJECT
                    && self.text(property) == NEXT_MANIFEST_PROPERTY
        )
    }

    fn push_vite_deps(&mut self, array: Node<'_>) {
        let deps = ChunkLoadingPattern::ViteManifest {
            deps: Span::from(array.byte_range()),
        };
        if !self.runtime.contains(&deps) {
            self.runtime.push(deps);
        }
    }

    fn push_module_reference(&mut self, specifier: Node<'_>) {
        let reference = ChunkLoadingPattern::ModuleReference {
            specifier: string_value(specifier, self.source),
        };
        if !self.module_refs.contains(&reference) {
            self.module_refs.push(reference);
        }
    }

    fn is_require_call(&self, call: Node<'_>) -> bool {
        call.child_by_field_name("function")
            .is_some_and(|callee| {
                SyntaxKind::of(callee) == SyntaxKind::Identifier && self.text(callee) == REQUIRE
            })
    }
}

impl<'tree> Visitor<'tree> for PatternDetector<'_> {
    fn visit_assignment(&mut self, node: Node<'tree>, parent: Option<Node<'tree>>) {
        if !is_top_level_expression(parent) {
            return;
        }
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return;
        };
        if !self.is_build_manifest_target(left) {
            return;
        }

        let right = unwrap_parens(right);
        match SyntaxKind::of(right) {
            SyntaxKind::CallExpression => {
                let invokes_function = right
                    .child_by_field_name("function")
                    .map(unwrap_parens)
                    .is_some_and(|callee| SyntaxKind::of(callee) == SyntaxKind::FunctionExpression);
                if invokes_function {
                    self.next_functions
                        .push(ChunkLoadingPattern::NextManifestFunction {
                            invocation: self.text(right).to_string(),
                        });
                }
            }
            SyntaxKind::Object => {
                self.next_objects.push(ChunkLoadingPattern::NextManifestObject {
                    object: self.text(right).to_string(),
                });
            }
            _ => {}
        }
    }

    fn visit_function(&mut self, node: Node<'tree>, _parent: Option<Node<'tree>>) {
        let Some(parameter) = single_parameter(node) else {
            return;
        };
        let parameter = self.text(parameter);
        let is_lookup = returned_expressions(node)
            .into_iter()
            .any(|expr| self.is_indexed_concatenation(expr, parameter));
        if is_lookup {
            self.runtime.push(ChunkLoadingPattern::WebpackRuntime {
                function: Span::from(node.byte_range()),
            });
        }
    }

    fn visit_declarator(&mut self, node: Node<'tree>, _parent: Option<Node<'tree>>) {
        let is_map_deps = node
            .child_by_field_name("name")
            .is_some_and(|name| self.text(name) == VITE_MAP_DEPS);
        if !is_map_deps {
            return;
        }
        if let Some(array) = node
            .child_by_field_name("value")
            .and_then(|value| self.find_cached_deps_array(value))
        {
            self.push_vite_deps(array);
        }
    }

    fn visit_call(&mut self, node: Node<'tree>, _parent: Option<Node<'tree>>) {
        let Some(arguments) = node.child_by_field_name("arguments") else {
            return;
        };
        let mut cursor = arguments.walk();
        let args: Vec<_> = arguments
            .named_children(&mut cursor)
            .filter(|arg| arg.kind() != "comment")
            .map(unwrap_parens)
            .collect();
        if let [specifier] = args.as_slice() {
            if SyntaxKind::of(*specifier) == SyntaxKind::String && self.is_require_call(node) {
                self.push_module_reference(*specifier);
            }
            return;
        }
        if args.len() < 2 {
            return;
        }
        if is_dynamic_import_thunk(args[0]) && SyntaxKind::of(args[1]) == SyntaxKind::Array {
            self.push_vite_deps(args[1]);
        }
    }

    fn visit_import(&mut self, node: Node<'tree>, _parent: Option<Node<'tree>>) {
        if let Some(source) = node
            .child_by_field_name("source")
            .filter(|source| SyntaxKind::of(*source) == SyntaxKind::String)
        {
            self.push_module_reference(source);
        }
    }
}

impl PatternDetector<'_> {
    /// Webpack shape: `base + ... + lookup[param] + ...`, with the lookup
    /// possibly behind a `||`/`??` fallback
    fn is_indexed_concatenation(&self, expr: Node<'_>, parameter: &str) -> bool {
        let expr = unwrap_parens(expr);
        SyntaxKind::of(expr) == SyntaxKind::BinaryExpression
            && binary_operator(expr, self.source) == Some("+")
            && self.contains_indexed_lookup(expr, parameter)
    }

    fn contains_indexed_lookup(&self, node: Node<'_>, parameter: &str) -> bool {
        let node = unwrap_parens(node);
        match SyntaxKind::of(node) {
            SyntaxKind::SubscriptExpression => node
                .child_by_field_name("index")
                .map(unwrap_parens)
                .is_some_and(|index| {
                    SyntaxKind::of(index) == SyntaxKind::Identifier && self.text(index) == parameter
                }),
            SyntaxKind::BinaryExpression => {
                let concat_or_fallback = binary_operator(node, self.source)
                    .is_some_and(|op| op == "+" || is_logical_operator(op));
                concat_or_fallback
                    && ["left", "right"].iter().any(|field| {
                        node.child_by_field_name(field)
                            .is_some_and(|side| self.contains_indexed_lookup(side, parameter))
                    })
            }
            _ => false,
        }
    }

    /// Vite's helper caches its dependency list as `m.f = [...]`
    fn find_cached_deps_array<'tree>(&self, root: Node<'tree>) -> Option<Node<'tree>> {
        let mut cursor = root.walk();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if SyntaxKind::of(node) == SyntaxKind::AssignmentExpression {
                let cached = node
                    .child_by_field_name("left")
                    .filter(|left| SyntaxKind::of(*left) == SyntaxKind::MemberExpression)
                    .and_then(|left| left.child_by_field_name("property"))
                    .is_some_and(|property| self.text(property) == "f");
                if let Some(right) = node.child_by_field_name("right").map(unwrap_parens) {
                    if cached && SyntaxKind::of(right) == SyntaxKind::Array {
                        return Some(right);
                    }
                }
            }
            stack.extend(node.named_children(&mut cursor).collect::<Vec<_>>().into_iter().rev());
        }
        None
    }
}

/// The lone plain identifier parameter of a function
fn single_parameter(function: Node<'_>) -> Option<Node<'_>> {
    if let Some(parameter) = function.child_by_field_name("parameter") {
        return (SyntaxKind::of(parameter) == SyntaxKind::Identifier).then_some(parameter);
    }
    let parameters = function.child_by_field_name("parameters")?;
    let mut cursor = parameters.walk();
    let named: Vec<_> = parameters
        .named_children(&mut cursor)
        .filter(|param| param.kind() != "comment")
        .collect();
    match named.as_slice() {
        [only] if SyntaxKind::of(*only) == SyntaxKind::Identifier => Some(*only),
        _ => None,
    }
}

/// Expressions a function can return, not looking inside nested functions
fn returned_expressions(function: Node<'_>) -> Vec<Node<'_>> {
    let Some(body) = function.child_by_field_name("body") else {
        return Vec::new();
    };
    if SyntaxKind::of(body) != SyntaxKind::StatementBlock {
        return vec![body];
    }

    let mut returned = Vec::new();
    let mut cursor = body.walk();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        match SyntaxKind::of(node) {
            kind if kind.is_function() => continue,
            SyntaxKind::ReturnStatement => {
                let mut inner = node.walk();
                let expr = node
                    .named_children(&mut inner)
                    .find(|child| child.kind() != "comment");
                returned.extend(expr);
            }
            _ => stack.extend(node.named_children(&mut cursor).collect::<Vec<_>>()),
        }
    }
    returned
}

/// `() => import("./chunk.js")`
fn is_dynamic_import_thunk(node: Node<'_>) -> bool {
    if SyntaxKind::of(node) != SyntaxKind::ArrowFunction {
        return false;
    }
    node.child_by_field_name("body")
        .map(unwrap_parens)
        .filter(|body| SyntaxKind::of(*body) == SyntaxKind::CallExpression)
        .and_then(|call| call.child_by_field_name("function"))
        .is_some_and(|callee| SyntaxKind::of(callee) == SyntaxKind::Import)
}

/// An expression statement directly under the program, possibly as one
/// member of a comma sequence
fn is_top_level_expression(parent: Option<Node<'_>>) -> bool {
    let mut current = parent;
    while let Some(node) = current {
        match SyntaxKind::of(node) {
            SyntaxKind::SequenceExpression => current = visitor::semantic_parent(node),
            SyntaxKind::ExpressionStatement => {
                return node
                    .parent()
                    .is_some_and(|program| SyntaxKind::of(program) == SyntaxKind::Program);
            }
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(code: &str) -> Vec<&'static str> {
        classify_source(code).iter().map(ChunkLoadingPattern::name).collect()
    }

    #[test]
    fn test_next_function_takes_precedence_over_object() {
        let code = r#"
self.__BUILD_MANIFEST = { "/": ["a.js"] };
self.__BUILD_MANIFEST = function (a) { return { "/": [a] }; }("b.js");
"#;
        assert_eq!(names(code), vec!["next_manifest_function"]);
    }

    #[test]
    fn test_next_function_payload_is_invocation() {
        let code = "self.__BUILD_MANIFEST=function(s){return{\"/\":[s]}}(\"x.js\"),self.__BUILD_MANIFEST_CB&&self.__BUILD_MANIFEST_CB();";
        let patterns = classify_source(code);
        assert_eq!(
            patterns,
            vec![ChunkLoadingPattern::NextManifestFunction {
                invocation: "function(s){return{\"/\":[s]}}(\"x.js\")".to_string()
            }]
        );
    }

    #[test]
    fn test_next_object_form() {
        let patterns = classify_source("self.__BUILD_MANIFEST = { \"/\": [\"a.js\"] };");
        assert_eq!(
            patterns,
            vec![ChunkLoadingPattern::NextManifestObject {
                object: "{ \"/\": [\"a.js\"] }".to_string()
            }]
        );
    }

    #[test]
    fn test_nested_manifest_assignment_ignored() {
        let code = "function f() { self.__BUILD_MANIFEST = { \"/\": [\"a.js\"] }; }";
        assert!(names(code).is_empty());
    }

    #[test]
    fn test_webpack_runtime_shapes() {
        let code = r#"
var a = function (e) { return "" + { 1: "x" }[e] + ".js"; };
var b = (e) => p + ({ 1: "y" }[e] || e) + ".js";
function c(e) { if (e) { return "static/" + m[e]; } return null; }
function notLookup(e) { return "static/" + e + ".js"; }
function twoParams(e, t) { return "" + m[e]; }
"#;
        assert_eq!(
            names(code),
            vec!["webpack_runtime", "webpack_runtime", "webpack_runtime"]
        );
    }

    #[test]
    fn test_webpack_span_covers_function() {
        let code = "var u = function (e) { return \"\" + { 1: \"x\" }[e] + \".js\"; };";
        let artifact = SourceArtifact::parse(code).unwrap();
        let patterns = classify(&artifact);
        let ChunkLoadingPattern::WebpackRuntime { function } = patterns[0] else {
            panic!("expected webpack pattern, got {patterns:?}");
        };
        assert!(artifact.span_text(function).unwrap().starts_with("function (e)"));
        assert!(artifact.span_text(function).unwrap().ends_with('}'));
    }

    #[test]
    fn test_vite_map_deps_and_preload_call() {
        let code = r#"
const __vite__mapDeps = (i, m = __vite__mapDeps, d = (m.f || (m.f = ["assets/a.js", "assets/b.css"]))) => i.map((i) => d[i]);
const r = () => __vitePreload(() => import("./c.js"), ["assets/c.js"]);
"#;
        let artifact = SourceArtifact::parse(code).unwrap();
        let texts: Vec<_> = classify(&artifact)
            .into_iter()
            .filter_map(|pattern| match pattern {
                ChunkLoadingPattern::ViteManifest { deps } => {
                    artifact.span_text(deps).map(str::to_string)
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![r#"["assets/a.js", "assets/b.css"]"#, r#"["assets/c.js"]"#]
        );
    }

    #[test]
    fn test_require_and_import_specifiers() {
        let code = r#"
import a from "./lazy-a.js";
import "./side-effect.js";
var b = require("./lazy-b.js");
var again = require("./lazy-b.js");
var dynamic = require(name);
var twoArgs = require("./c.js", 1);
var notRequire = load("./d.js");
"#;
        let specifiers: Vec<String> = classify_source(code)
            .into_iter()
            .filter_map(|pattern| match pattern {
                ChunkLoadingPattern::ModuleReference { specifier } => Some(specifier),
                _ => None,
            })
            .collect();
        assert_eq!(
            specifiers,
            vec!["./lazy-a.js", "./side-effect.js", "./lazy-b.js"]
        );
    }

    #[test]
    fn test_modern_chunk_map_regex() {
        let code = r#"function u(e) { return o.p + "" + {1: "a", 2: "b"}[e] + ".js"; }"#;
        let patterns = classify_source(code);
        assert!(patterns.contains(&ChunkLoadingPattern::ModernChunkMap {
            mapping: r#"1: "a", 2: "b""#.to_string()
        }));
        // the same function is also a webpack-style lookup
        assert!(patterns
            .iter()
            .any(|p| matches!(p, ChunkLoadingPattern::WebpackRuntime { .. })));
    }

    #[test]
    fn test_modern_regex_requires_double_quotes() {
        assert!(names("function test() { return o.p + '' + { invalid: 'format' }; }").is_empty());
    }

    #[test]
    fn test_unparseable_source_fails_closed() {
        assert!(classify_source("self.__BUILD_MANIFEST = {").is_empty());
    }
}
