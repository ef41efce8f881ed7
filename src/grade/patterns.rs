#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Detectors for the structural elements a syntax check can require.

use std::{fmt::Display, str::FromStr, sync::LazyLock};

use anyhow::Result;
use regex::Regex;

use super::parser::Parser;

/// Tree-sitter query matching function definitions.
/// * `name`: function name
/// * `definition`: the whole definition
pub const FUNCTION_DEFINITION_QUERY: &str = include_str!("queries/function_definition.scm");

/// Tree-sitter query matching while loops.
/// * `condition`: loop condition
/// * `loop`: the whole statement
pub const WHILE_STATEMENT_QUERY: &str = include_str!("queries/while_statement.scm");

/// Tree-sitter query matching for loops.
/// * `target`: loop variable(s)
/// * `iterable`: iterated expression
/// * `loop`: the whole statement
pub const FOR_STATEMENT_QUERY: &str = include_str!("queries/for_statement.scm");

/// Tree-sitter query matching if statements.
/// * `condition`: branch condition
/// * `branch`: the whole statement
pub const IF_STATEMENT_QUERY: &str = include_str!("queries/if_statement.scm");

/// A Python construct a criterion can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PythonElement {
    /// `def name(...):`
    FunctionDefinition,
    /// `while cond:`
    WhileLoop,
    /// `for x in xs:`
    ForLoop,
    /// `if cond:`
    IfStatement,
}

impl PythonElement {
    /// Every known element.
    pub const ALL: [PythonElement; 4] = [
        PythonElement::FunctionDefinition,
        PythonElement::WhileLoop,
        PythonElement::ForLoop,
        PythonElement::IfStatement,
    ];

    /// Query whose matches prove the element is present.
    fn query(self) -> &'static str {
        match self {
            PythonElement::FunctionDefinition => FUNCTION_DEFINITION_QUERY,
            PythonElement::WhileLoop => WHILE_STATEMENT_QUERY,
            PythonElement::ForLoop => FOR_STATEMENT_QUERY,
            PythonElement::IfStatement => IF_STATEMENT_QUERY,
        }
    }

    /// Returns true if the parsed code contains this element.
    pub fn is_present(self, parser: &Parser) -> Result<bool> {
        Ok(parser.count_matches(self.query())? > 0)
    }
}

impl FromStr for PythonElement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "function" | "function_definition" | "def" => Ok(PythonElement::FunctionDefinition),
            "while_loop" | "while" => Ok(PythonElement::WhileLoop),
            "for_loop" | "for" => Ok(PythonElement::ForLoop),
            "if_statement" | "if" | "conditional" => Ok(PythonElement::IfStatement),
            other => Err(other.to_string()),
        }
    }
}

impl Display for PythonElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PythonElement::FunctionDefinition => "function",
            PythonElement::WhileLoop => "while_loop",
            PythonElement::ForLoop => "for_loop",
            PythonElement::IfStatement => "if_statement",
        };
        f.write_str(name)
    }
}

/// Compiles one of the fixed micro:bit patterns.
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("built-in micro:bit pattern must compile")
}

/// `import microbit`, `from microbit import ...`.
static MICROBIT_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^\s*(?:from\s+microbit\s+import\b|import\s+microbit\b)"));

/// `display.show(...)`, `display.scroll(...)`, `display.set_pixel(...)`.
static MICROBIT_DISPLAY: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\bdisplay\s*\.\s*(?:show|scroll|set_pixel)\s*\("));

/// `button_a.is_pressed()`, `button_b.was_pressed()`, `get_presses()`.
static MICROBIT_BUTTON: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\bbutton_[ab]\s*\.\s*(?:is_pressed|was_pressed|get_presses)\s*\(")
});

/// The fixed checklist for micro:bit programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MicrobitElement {
    /// The hardware module is imported.
    Import,
    /// The LED display is driven.
    Display,
    /// A button is read.
    ButtonPress,
}

impl MicrobitElement {
    /// Every element, in the order they are reported.
    pub const ALL: [MicrobitElement; 3] =
        [MicrobitElement::Import, MicrobitElement::Display, MicrobitElement::ButtonPress];

    /// Returns true if `code` contains this element.
    pub fn is_present(self, code: &str) -> bool {
        let re = match self {
            MicrobitElement::Import => &*MICROBIT_IMPORT,
            MicrobitElement::Display => &*MICROBIT_DISPLAY,
            MicrobitElement::ButtonPress => &*MICROBIT_BUTTON,
        };
        re.is_match(code)
    }
}

impl Display for MicrobitElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MicrobitElement::Import => "import microbit",
            MicrobitElement::Display => "display call",
            MicrobitElement::ButtonPress => "button press",
        };
        f.write_str(name)
    }
}
