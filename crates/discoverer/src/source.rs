use crate::error::{DiscoveryError, Result};
use crate::types::Span;
use tree_sitter::{Node, Parser, Tree};

/// A parsed entry script: raw text plus its syntax tree.
///
/// The JavaScript grammar accepts both the module and the script goal, so one
/// parse covers both. Any error or missing node rejects the artifact.
pub struct SourceArtifact {
    text: String,
    tree: Tree,
}

impl SourceArtifact {
    /// Parse source text
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .map_err(|e| DiscoveryError::tree_sitter(format!("Failed to set language: {e}")))?;

        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| DiscoveryError::parse("Parser produced no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(DiscoveryError::parse(describe_first_error(root)));
        }

        Ok(Self { text, tree })
    }

    /// Parse a standalone expression fragment (function or literal) by
    /// wrapping it in parentheses
    pub fn parse_expression(fragment: &str) -> Result<Self> {
        Self::parse(format!("({fragment})"))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by a node
    #[must_use]
    pub fn node_text(&self, node: Node<'_>) -> &str {
        &self.text[node.byte_range()]
    }

    /// Source text covered by a span, if the span lies inside the artifact
    #[must_use]
    pub fn span_text(&self, span: Span) -> Option<&str> {
        self.text.get(span.range())
    }
}

fn describe_first_error(root: Node<'_>) -> String {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let position = node.start_position();
            return format!(
                "syntax error at line {}, column {}",
                position.row + 1,
                position.column + 1
            );
        }
        if node.has_error() {
            stack.extend(node.children(&mut cursor).collect::<Vec<_>>().into_iter().rev());
        }
    }
    "syntax error".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_script_and_module_code() {
        assert!(SourceArtifact::parse("var a = 1; function f(x) { return x; }").is_ok());
        assert!(SourceArtifact::parse("import a from './a.js'; export default a;").is_ok());
    }

    #[test]
    fn test_rejects_invalid_code() {
        let err = SourceArtifact::parse("function (( {").err().unwrap();
        assert!(matches!(err, DiscoveryError::ParseError(_)));
        assert!(SourceArtifact::parse("invalid code").is_err());
    }

    #[test]
    fn test_expression_fragment() {
        let artifact = SourceArtifact::parse_expression("function (e) { return e + 1; }").unwrap();
        assert_eq!(artifact.text(), "(function (e) { return e + 1; })");
    }

    #[test]
    fn test_span_text() {
        let artifact = SourceArtifact::parse("var abc = 1;").unwrap();
        assert_eq!(artifact.span_text(Span::new(4, 7)), Some("abc"));
        assert_eq!(artifact.span_text(Span::new(4, 700)), None);
    }
}
