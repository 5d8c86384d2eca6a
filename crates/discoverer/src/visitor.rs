//! Typed traversal over tree-sitter JavaScript nodes.
//!
//! Node kinds the detectors care about are folded into the closed
//! [`SyntaxKind`] enum once; detectors implement [`Visitor`] and receive one
//! callback per kind family instead of inspecting kind strings themselves.

use tree_sitter::Node;

/// JavaScript node kinds relevant to chunk discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    Program,
    ExpressionStatement,
    SequenceExpression,
    AssignmentExpression,
    VariableDeclarator,
    CallExpression,
    Import,
    ImportStatement,
    FunctionExpression,
    FunctionDeclaration,
    ArrowFunction,
    FormalParameters,
    StatementBlock,
    ReturnStatement,
    BinaryExpression,
    MemberExpression,
    SubscriptExpression,
    ParenthesizedExpression,
    Object,
    Pair,
    ShorthandProperty,
    Array,
    String,
    Number,
    Identifier,
    PropertyIdentifier,
    Other,
}

impl SyntaxKind {
    /// Classify a node. Anonymous tokens (keywords, punctuation) are `Other`.
    pub fn of(node: Node<'_>) -> Self {
        if !node.is_named() {
            return SyntaxKind::Other;
        }
        match node.kind() {
            "program" => SyntaxKind::Program,
            "expression_statement" => SyntaxKind::ExpressionStatement,
            "sequence_expression" => SyntaxKind::SequenceExpression,
            "assignment_expression" => SyntaxKind::AssignmentExpression,
            "variable_declarator" => SyntaxKind::VariableDeclarator,
            "call_expression" => SyntaxKind::CallExpression,
            "import" => SyntaxKind::Import,
            "import_statement" => SyntaxKind::ImportStatement,
            "function_expression" | "function" | "generator_function" => {
                SyntaxKind::FunctionExpression
            }
            "function_declaration" | "generator_function_declaration" => {
                SyntaxKind::FunctionDeclaration
            }
            "arrow_function" => SyntaxKind::ArrowFunction,
            "formal_parameters" => SyntaxKind::FormalParameters,
            "statement_block" => SyntaxKind::StatementBlock,
            "return_statement" => SyntaxKind::ReturnStatement,
            "binary_expression" => SyntaxKind::BinaryExpression,
            "member_expression" => SyntaxKind::MemberExpression,
            "subscript_expression" => SyntaxKind::SubscriptExpression,
            "parenthesized_expression" => SyntaxKind::ParenthesizedExpression,
            "object" => SyntaxKind::Object,
            "pair" => SyntaxKind::Pair,
            "shorthand_property_identifier" => SyntaxKind::ShorthandProperty,
            "array" => SyntaxKind::Array,
            "string" => SyntaxKind::String,
            "number" => SyntaxKind::Number,
            "identifier" => SyntaxKind::Identifier,
            "property_identifier" => SyntaxKind::PropertyIdentifier,
            _ => SyntaxKind::Other,
        }
    }

    pub fn is_function(self) -> bool {
        matches!(
            self,
            SyntaxKind::FunctionExpression
                | SyntaxKind::FunctionDeclaration
                | SyntaxKind::ArrowFunction
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(self, SyntaxKind::String | SyntaxKind::Number)
    }

    /// Dotted or computed property access
    pub fn is_member_access(self) -> bool {
        matches!(
            self,
            SyntaxKind::MemberExpression | SyntaxKind::SubscriptExpression
        )
    }
}

/// One handler per node-kind family; all default to no-ops.
///
/// `parent` is the nearest ancestor that is not a parenthesized expression.
pub trait Visitor<'tree> {
    fn visit_literal(&mut self, _node: Node<'tree>, _parent: Option<Node<'tree>>) {}

    fn visit_identifier(&mut self, _node: Node<'tree>, _parent: Option<Node<'tree>>) {}

    fn visit_binary(&mut self, _node: Node<'tree>, _parent: Option<Node<'tree>>) {}

    fn visit_function(&mut self, _node: Node<'tree>, _parent: Option<Node<'tree>>) {}

    fn visit_call(&mut self, _node: Node<'tree>, _parent: Option<Node<'tree>>) {}

    fn visit_assignment(&mut self, _node: Node<'tree>, _parent: Option<Node<'tree>>) {}

    fn visit_declarator(&mut self, _node: Node<'tree>, _parent: Option<Node<'tree>>) {}

    fn visit_import(&mut self, _node: Node<'tree>, _parent: Option<Node<'tree>>) {}
}

/// Walk every node below `root` in document order.
///
/// Iterative so that deeply nested minified bundles cannot exhaust the stack.
pub fn walk<'tree, V: Visitor<'tree>>(root: Node<'tree>, visitor: &mut V) {
    let mut cursor = root.walk();
    loop {
        dispatch(cursor.node(), visitor);

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn dispatch<'tree, V: Visitor<'tree>>(node: Node<'tree>, visitor: &mut V) {
    match SyntaxKind::of(node) {
        kind if kind.is_literal() => visitor.visit_literal(node, semantic_parent(node)),
        SyntaxKind::Identifier | SyntaxKind::PropertyIdentifier | SyntaxKind::ShorthandProperty => {
            visitor.visit_identifier(node, semantic_parent(node));
        }
        SyntaxKind::BinaryExpression => visitor.visit_binary(node, semantic_parent(node)),
        SyntaxKind::FunctionExpression
        | SyntaxKind::FunctionDeclaration
        | SyntaxKind::ArrowFunction => visitor.visit_function(node, semantic_parent(node)),
        SyntaxKind::CallExpression => visitor.visit_call(node, semantic_parent(node)),
        SyntaxKind::AssignmentExpression => visitor.visit_assignment(node, semantic_parent(node)),
        SyntaxKind::VariableDeclarator => visitor.visit_declarator(node, semantic_parent(node)),
        SyntaxKind::ImportStatement => visitor.visit_import(node, semantic_parent(node)),
        _ => {}
    }
}

/// Nearest ancestor that is not a parenthesized expression
pub fn semantic_parent(node: Node<'_>) -> Option<Node<'_>> {
    let mut parent = node.parent()?;
    while SyntaxKind::of(parent) == SyntaxKind::ParenthesizedExpression {
        parent = parent.parent()?;
    }
    Some(parent)
}

/// Strip any number of wrapping parentheses
pub fn unwrap_parens(mut node: Node<'_>) -> Node<'_> {
    while SyntaxKind::of(node) == SyntaxKind::ParenthesizedExpression {
        match node.named_child(0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Whether `child` is the node stored in `parent`'s `field`, ignoring parentheses
pub fn is_field(parent: Node<'_>, field: &str, child: Node<'_>) -> bool {
    parent
        .child_by_field_name(field)
        .map(unwrap_parens)
        .is_some_and(|node| node.id() == child.id())
}

/// Operator token of a binary expression
pub fn binary_operator<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name("operator")
        .map(|op| &source[op.byte_range()])
}

/// Logical operators are binary expressions in this grammar
pub fn is_logical_operator(op: &str) -> bool {
    matches!(op, "&&" | "||" | "??")
}

/// Decoded value of a string literal node
pub fn string_value(node: Node<'_>, source: &str) -> String {
    let mut value = String::new();
    let mut cursor = node.walk();
    for part in node.named_children(&mut cursor) {
        let text = &source[part.byte_range()];
        match part.kind() {
            "escape_sequence" => decode_escape(text, &mut value),
            _ => value.push_str(text),
        }
    }
    value
}

fn decode_escape(escape: &str, out: &mut String) {
    let body = escape.strip_prefix('\\').unwrap_or(escape);
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return;
    };
    let rest = chars.as_str();
    let decoded = match first {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'v' => Some('\u{b}'),
        '0' if rest.is_empty() => Some('\0'),
        'x' => u32::from_str_radix(rest, 16).ok().and_then(char::from_u32),
        'u' => {
            let hex = rest.trim_start_matches('{').trim_end_matches('}');
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        }
        // Line continuation
        '\n' | '\r' | '\u{2028}' | '\u{2029}' => return,
        other => Some(other),
    };
    if let Some(ch) = decoded {
        out.push(ch);
    }
}

/// Integer value of a numeric literal, if it has one
pub fn integer_value(text: &str) -> Option<i64> {
    let cleaned = text.replace('_', "");
    let lower = cleaned.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(octal) = lower.strip_prefix("0o") {
        i64::from_str_radix(octal, 8).ok()
    } else if let Some(binary) = lower.strip_prefix("0b") {
        i64::from_str_radix(binary, 2).ok()
    } else {
        lower.parse::<i64>().ok()
    }
}
