//! Thread-local tree-sitter parser for Python.

use std::cell::RefCell;

use tree_sitter::{Node, Parser, Tree, TreeCursor};

use crate::AnalysisError;

thread_local! {
    static PYTHON_PARSER: RefCell<Result<Parser, AnalysisError>> = RefCell::new({
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map(|()| parser)
            .map_err(|e| AnalysisError::Grammar(e.to_string()))
    });
}

pub(crate) fn parse(code: &str) -> Result<Tree, AnalysisError> {
    PYTHON_PARSER.with(|cell| match &mut *cell.borrow_mut() {
        Ok(parser) => parser.parse(code, None).ok_or(AnalysisError::NoTree),
        Err(e) => Err(e.clone()),
    })
}

pub(crate) fn node_text<'a>(node: &Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

/// Pre-order walk over every node, stopping early when `visit` returns `false`.
pub(crate) fn walk<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>) -> bool) {
    let mut cursor: TreeCursor<'t> = root.walk();
    loop {
        if !visit(cursor.node()) {
            return;
        }
        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// The first ERROR or MISSING node in document order.
pub(crate) fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut found = None;
    walk(root, |node| {
        if node.is_error() || node.is_missing() {
            found = Some(node);
            false
        } else {
            true
        }
    });
    found
}
