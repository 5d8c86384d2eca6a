use crate::evaluator::evaluate_manifest;
use crate::sandbox::Sandbox;
use crate::source::SourceArtifact;
use crate::visitor::{integer_value, string_value, unwrap_parens, SyntaxKind};

/// Chunks listed by a `self.__BUILD_MANIFEST = function(..){..}(..)` payload
pub fn extract_from_function(sandbox: &mut Sandbox, invocation: &str) -> Vec<String> {
    let wrapped = format!("(function () {{ return {invocation}; }})()");
    evaluate_manifest(sandbox, &wrapped)
}

/// Chunks listed by a `self.__BUILD_MANIFEST = {..}` payload
pub fn extract_from_object(sandbox: &mut Sandbox, object: &str) -> Vec<String> {
    evaluate_manifest(sandbox, &format!("({object})"))
}

/// Literal values of a modern chunk map body (`0: "a", 1: "b"`).
///
/// Each pair is read on its own; a non-literal value drops only that entry.
/// Numbers are rendered the way JavaScript stringifies integers.
pub fn extract_modern_chunk_map(mapping: &str) -> Vec<String> {
    let artifact = match SourceArtifact::parse_expression(&format!("{{{mapping}}}")) {
        Ok(artifact) => artifact,
        Err(err) => {
            log::debug!("Modern chunk map unreadable: {err}");
            return Vec::new();
        }
    };
    let text = artifact.text();
    let Some(object) = artifact
        .root()
        .named_child(0)
        .and_then(|statement| statement.named_child(0))
        .map(unwrap_parens)
        .filter(|node| SyntaxKind::of(*node) == SyntaxKind::Object)
    else {
        return Vec::new();
    };

    let mut cursor = object.walk();
    let values: Vec<String> = object
        .named_children(&mut cursor)
        .filter(|child| SyntaxKind::of(*child) == SyntaxKind::Pair)
        .filter_map(|pair| pair.child_by_field_name("value").map(unwrap_parens))
        .filter_map(|value| match SyntaxKind::of(value) {
            SyntaxKind::String => Some(string_value(value, text)),
            SyntaxKind::Number => {
                let raw = &text[value.byte_range()];
                Some(integer_value(raw).map_or_else(|| raw.to_string(), |n| n.to_string()))
            }
            _ => None,
        })
        .collect();
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SandboxLimits;

    fn sandbox() -> Sandbox {
        Sandbox::acquire(&SandboxLimits::default()).unwrap()
    }

    #[test]
    fn test_function_manifest() {
        let mut sandbox = sandbox();
        let chunks = extract_from_function(
            &mut sandbox,
            r#"function (a, b) { return { "/": [a], "/about": [a, b], __rewrites: { beforeFiles: [] } }; }("x.js", "y.js")"#,
        );
        assert_eq!(chunks, vec!["x.js", "x.js", "y.js"]);
    }

    #[test]
    fn test_invalid_function_manifest() {
        let mut sandbox = sandbox();
        assert!(extract_from_function(
            &mut sandbox,
            "function() { return { invalid: 'object' }; }()"
        )
        .is_empty());
        assert!(extract_from_function(&mut sandbox, "function() { throw 1; }()").is_empty());
    }

    #[test]
    fn test_object_manifest() {
        let mut sandbox = sandbox();
        let chunks = extract_from_object(&mut sandbox, r#"{ "/": ["a.js"], "/b": ["b.js"] }"#);
        assert_eq!(chunks, vec!["a.js", "b.js"]);
        assert!(extract_from_object(&mut sandbox, "{ invalid: 'object' }").is_empty());
    }

    #[test]
    fn test_modern_map_literal_values() {
        assert_eq!(
            extract_modern_chunk_map(r#"0: "chunk1", 1: 'chunk2', "2": 0x10"#),
            vec!["chunk1", "chunk2", "16"]
        );
    }

    #[test]
    fn test_modern_map_keeps_literals_beside_expressions() {
        assert_eq!(extract_modern_chunk_map(r#"0: "a", 1: n, 2: "c" + x"#), vec!["a"]);
        assert!(extract_modern_chunk_map("0: ").is_empty());
    }
}
