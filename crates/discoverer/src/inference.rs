//! Static inference of the inputs a chunk-mapping function expects.

use crate::error::Result;
use crate::source::SourceArtifact;
use crate::types::CandidateParameter;
use crate::visitor::{
    self, binary_operator, integer_value, is_field, is_logical_operator, string_value,
    unwrap_parens, SyntaxKind, Visitor,
};
use std::collections::HashSet;
use tree_sitter::Node;

/// Propose candidate arguments for a single-parameter function.
///
/// Candidates come from object keys and comparison operands in traversal
/// order. When the parameter flows straight into a concatenation (or a
/// `lookup || param` fallback) every integer in `0..bruteforce_limit` is
/// appended. With nothing found and no brute force, `[0]` is returned so the
/// function is still invoked once.
pub fn infer_params(function_text: &str, bruteforce_limit: u32) -> Result<Vec<CandidateParameter>> {
    let artifact = SourceArtifact::parse_expression(function_text)?;
    let mut collector = CandidateCollector::new(artifact.text());
    visitor::walk(artifact.root(), &mut collector);

    let needs_bruteforce = collector.needs_bruteforce;
    let mut candidates = collector.candidates;
    if needs_bruteforce {
        for value in 0..i64::from(bruteforce_limit) {
            candidates.push(CandidateParameter::Integer(value));
        }
    } else if candidates.is_empty() {
        candidates.push(CandidateParameter::Integer(0));
    }

    log::trace!(
        "Inferred {} candidates (bruteforce: {needs_bruteforce})",
        candidates.len()
    );
    Ok(candidates.into_vec())
}

/// Insertion-ordered set of candidates
#[derive(Default)]
struct CandidateSet {
    ordered: Vec<CandidateParameter>,
    seen: HashSet<CandidateParameter>,
}

impl CandidateSet {
    fn push(&mut self, candidate: CandidateParameter) {
        if self.seen.insert(candidate.clone()) {
            self.ordered.push(candidate);
        }
    }

    fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }

    fn into_vec(self) -> Vec<CandidateParameter> {
        self.ordered
    }
}

struct CandidateCollector<'a> {
    source: &'a str,
    candidates: CandidateSet,
    needs_bruteforce: bool,
}

impl<'a> CandidateCollector<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            candidates: CandidateSet::default(),
            needs_bruteforce: false,
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }

    fn literal_value(&self, node: Node<'_>) -> Option<CandidateParameter> {
        match SyntaxKind::of(node) {
            SyntaxKind::String => Some(CandidateParameter::Text(string_value(node, self.source))),
            SyntaxKind::Number => integer_value(self.text(node)).map(CandidateParameter::Integer),
            _ => None,
        }
    }
}

impl<'tree> Visitor<'tree> for CandidateCollector<'_> {
    fn visit_literal(&mut self, node: Node<'tree>, parent: Option<Node<'tree>>) {
        let Some(parent) = parent else {
            return;
        };
        let is_candidate = match SyntaxKind::of(parent) {
            SyntaxKind::Pair => is_field(parent, "key", node),
            SyntaxKind::BinaryExpression => binary_operator(parent, self.source)
                .is_some_and(|op| op != "+" && !is_logical_operator(op)),
            _ => false,
        };
        if is_candidate {
            if let Some(candidate) = self.literal_value(node) {
                self.candidates.push(candidate);
            }
        }
    }

    fn visit_identifier(&mut self, node: Node<'tree>, parent: Option<Node<'tree>>) {
        let Some(parent) = parent else {
            return;
        };
        match (SyntaxKind::of(node), SyntaxKind::of(parent)) {
            (SyntaxKind::PropertyIdentifier, SyntaxKind::Pair) if is_field(parent, "key", node) => {
                self.candidates
                    .push(CandidateParameter::Text(self.text(node).to_string()));
            }
            (SyntaxKind::ShorthandProperty, SyntaxKind::Object) => {
                self.candidates
                    .push(CandidateParameter::Text(self.text(node).to_string()));
            }
            (SyntaxKind::Identifier, SyntaxKind::BinaryExpression) => {
                if binary_operator(parent, self.source) == Some("+") {
                    self.needs_bruteforce = true;
                }
            }
            _ => {}
        }
    }

    fn visit_binary(&mut self, node: Node<'tree>, _parent: Option<Node<'tree>>) {
        if !binary_operator(node, self.source).is_some_and(is_logical_operator) {
            return;
        }
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left").map(unwrap_parens),
            node.child_by_field_name("right").map(unwrap_parens),
        ) else {
            return;
        };
        let (left, right) = (SyntaxKind::of(left), SyntaxKind::of(right));
        if (left.is_member_access() && right == SyntaxKind::Identifier)
            || (right.is_member_access() && left == SyntaxKind::Identifier)
        {
            self.needs_bruteforce = true;
        }
    }
}
