//! Grammar symbols.

use cocor_core::Position;
use indexmap::IndexSet;

use super::node::NodeId;

/// Stable index of a symbol in the grammar store's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymId(pub usize);

/// What a symbol is: terminal, pragma, or non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymKind {
    Terminal,
    Pragma,
    Nonterminal,
}

/// How a terminal is recognised by the generated scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Declared by a literal with a fixed spelling.
    FixedToken,
    /// Declared by a structure (class, iteration, ...).
    ClassToken,
    /// A literal recognised by keyword lookup after a class token matched.
    LitToken,
    /// A class token some literal was carved out of.
    ClassLitToken,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::FixedToken => "fixedToken",
            TokenKind::ClassToken => "classToken",
            TokenKind::LitToken => "litToken",
            TokenKind::ClassLitToken => "classLitToken",
        }
    }
}

/// A named grammar symbol.
///
/// `n` is dense within the symbol's kind. Terminal numbers never change
/// after creation; pragma numbers are assigned once, above the terminals,
/// by `Tab::renumber_pragmas`.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymKind,
    pub n: usize,
    pub name: String,
    /// Source line of the declaration.
    pub line: u32,
    pub token_kind: TokenKind,

    /// Root of the syntax graph (non-terminals).
    pub graph: Option<NodeId>,
    /// True when the symbol derives the empty string.
    pub deletable: bool,
    /// True once `first` is valid.
    pub first_ready: bool,
    /// Terminal numbers that may begin a derivation.
    pub first: IndexSet<usize>,
    /// Terminal numbers that may follow a derivation.
    pub follow: IndexSet<usize>,
    /// Non-terminal numbers whose follow still has to flow into this one.
    pub nts: IndexSet<usize>,

    /// Position of the attribute declaration, if any.
    pub attr_pos: Option<Position>,
    /// Position of the semantic action attached to the declaration.
    pub sem_pos: Option<Position>,
    /// Return type of the attributed production.
    pub ret_type: Option<String>,
    /// Name of the return variable.
    pub ret_var: Option<String>,
}

impl Symbol {
    pub fn new(kind: SymKind, name: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            n: 0,
            name: name.into(),
            line,
            token_kind: TokenKind::FixedToken,
            graph: None,
            deletable: false,
            first_ready: false,
            first: IndexSet::new(),
            follow: IndexSet::new(),
            nts: IndexSet::new(),
            attr_pos: None,
            sem_pos: None,
            ret_type: None,
            ret_var: None,
        }
    }
}
