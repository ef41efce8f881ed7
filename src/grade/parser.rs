#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Tree-sitter parser wrapper for Python source code.

use std::fmt::{Display, Formatter};

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Language, Node, Query, QueryCursor, StreamingIterator, Tree};

/// Returns the compiled tree-sitter Python language.
fn python_language() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

/// The first syntax problem found in a parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    /// Error class, e.g. `SyntaxError` or `IndentationError`.
    pub kind:    String,
    /// 1-based line.
    pub line:    usize,
    /// 1-based column.
    pub column:  usize,
    /// Short description of the problem.
    pub message: String,
}

impl Display for SyntaxIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (line {}, column {})",
            self.kind, self.message, self.line, self.column
        )
    }
}

/// A struct that wraps a tree-sitter parser object and source code.
#[derive(Clone)]
pub struct Parser {
    /// The source code being parsed.
    code: String,
    /// The parse tree.
    tree: Tree,
    /// The tree-sitter Python grammar language.
    lang: Language,
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("lines", &self.line_count())
            .finish_non_exhaustive()
    }
}

impl Parser {
    /// Returns a new parser object.
    ///
    /// * `source_code`: the source code to be parsed
    pub fn new(source_code: impl Into<String>) -> Result<Self> {
        let source_code = source_code.into();
        let mut parser = tree_sitter::Parser::new();
        let language = python_language();

        parser
            .set_language(&language)
            .with_context(|| "Failed to load Python grammar")?;
        let tree = parser
            .parse(source_code.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing Python code"))?;

        Ok(Self {
            code: source_code,
            tree,
            lang: language,
        })
    }

    /// Returns the parse tree's root node.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Returns the first error or missing node in source order, if any.
    pub fn first_syntax_issue(&self) -> Option<SyntaxIssue> {
        let root = self.root_node();
        if !root.has_error() {
            return None;
        }
        find_issue(root, self.code.as_bytes())
    }

    /// Returns how many times the query's first pattern matches.
    ///
    /// * `q`: the tree-sitter query to be applied
    pub fn count_matches(&self, q: &str) -> Result<usize> {
        let query = Query::new(&self.lang, q)
            .with_context(|| format!("Failed to compile tree-sitter query: {q}"))?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, self.tree.root_node(), self.code.as_bytes());

        let mut count = 0;
        while matches.next().is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Returns the total number of lines in the source code.
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}

/// Depth-first search for the first `ERROR` or `MISSING` node.
fn find_issue(node: Node<'_>, source: &[u8]) -> Option<SyntaxIssue> {
    if node.is_missing() {
        let pos = node.start_position();
        return Some(SyntaxIssue {
            kind:    "SyntaxError".into(),
            line:    pos.row + 1,
            column:  pos.column + 1,
            message: format!("expected `{}`", node.kind()),
        });
    }
    if node.is_error() {
        let pos = node.start_position();
        let snippet = node
            .utf8_text(source)
            .ok()
            .and_then(|text| text.lines().next())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| format!(" near `{text}`"))
            .unwrap_or_default();
        return Some(SyntaxIssue {
            kind:    "SyntaxError".into(),
            line:    pos.row + 1,
            column:  pos.column + 1,
            message: format!("invalid syntax{snippet}"),
        });
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(|child| find_issue(child, source))
}
