use crate::source::SourceArtifact;
use crate::types::Span;
use crate::visitor::SyntaxKind;

/// Standalone source text for a located function or array literal.
///
/// Returns the exact text of the node covering `span`. `None` when the span
/// does not line up with such a node; callers treat that as "no chunks from
/// this pattern".
pub fn isolate(artifact: &SourceArtifact, span: Span) -> Option<String> {
    if span.is_empty() || span.end > artifact.text().len() {
        log::debug!("Isolation span {span:?} outside artifact");
        return None;
    }

    let mut node = artifact.root().descendant_for_byte_range(span.start, span.end)?;
    // Wrapper nodes may share the same range; prefer the outermost match
    while let Some(parent) = node.parent() {
        if parent.byte_range() != span.range() {
            break;
        }
        node = parent;
    }
    while node.byte_range() == span.range() && !is_isolatable(SyntaxKind::of(node)) {
        node = node.named_child(0)?;
    }

    if node.byte_range() != span.range() || !is_isolatable(SyntaxKind::of(node)) {
        log::debug!(
            "Span {span:?} resolves to `{}`, not a function or array",
            node.kind()
        );
        return None;
    }

    Some(artifact.node_text(node).to_string())
}

fn is_isolatable(kind: SyntaxKind) -> bool {
    kind.is_function() || kind == SyntaxKind::Array
}
