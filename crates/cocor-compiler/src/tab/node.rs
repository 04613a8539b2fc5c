//! Syntax-graph nodes.
//!
//! Nodes live in one growable vector owned by the grammar store; `next`,
//! `down` and `sub` are stable indices into it. A walk of a sequence ends
//! at `next == None` or at a node with `up == true` (the link then points
//! back out of the substructure).

use cocor_core::Position;
use indexmap::IndexSet;

use super::symbol::SymId;

/// Stable index of a node in the grammar store's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Stable index of a character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Terminal symbol.
    T,
    /// Pragma.
    Pr,
    /// Non-terminal symbol.
    Nt,
    /// Character class (token graphs only).
    Clas,
    /// Single code point (token graphs only).
    Chr,
    /// Weak terminal.
    Wt,
    /// ANY: matches every still-uncovered terminal.
    Any,
    /// Empty alternative.
    Eps,
    /// SYNC anchor for error recovery.
    Sync,
    /// Semantic action.
    Sem,
    /// Head of an alternative.
    Alt,
    /// Iteration `{ ... }`.
    Iter,
    /// Option `[ ... ]`.
    Opt,
    /// Resolver guard.
    Rslv,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::T => "t   ",
            NodeKind::Pr => "pr  ",
            NodeKind::Nt => "nt  ",
            NodeKind::Clas => "clas",
            NodeKind::Chr => "chr ",
            NodeKind::Wt => "wt  ",
            NodeKind::Any => "any ",
            NodeKind::Eps => "eps ",
            NodeKind::Sync => "sync",
            NodeKind::Sem => "sem ",
            NodeKind::Alt => "alt ",
            NodeKind::Iter => "iter",
            NodeKind::Opt => "opt ",
            NodeKind::Rslv => "rslv",
        }
    }
}

/// Whether a scanner transition is part of the token proper or of a
/// `CONTEXT(...)` appendix that must not be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransKind {
    #[default]
    Normal,
    Context,
}

/// The operand a node is created with: a symbol, a sub-graph to wrap, a
/// code point / class index, or nothing.
#[derive(Debug, Clone, Copy)]
pub enum NodeArg {
    Sym(SymId),
    Sub(NodeId),
    Val(u32),
    None,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub next: Option<NodeId>,
    /// Next alternative under an `Alt`.
    pub down: Option<NodeId>,
    /// Child body under `Alt`/`Iter`/`Opt`.
    pub sub: Option<NodeId>,
    /// True when `next` leaves the substructure this node sits in.
    pub up: bool,
    pub sym: Option<SymId>,
    /// Code point for `Chr`, class index for `Clas`.
    pub val: u32,
    pub code: TransKind,
    /// Terminal set of `Any` and `Sync` nodes, filled by analysis.
    pub set: IndexSet<usize>,
    /// Attribute or semantic-action region.
    pub pos: Option<Position>,
    pub ret_var: Option<String>,
    pub line: u32,
    /// Scanner DFA state this node was numbered into.
    pub state: Option<usize>,
}

impl Node {
    pub fn new(kind: NodeKind, sym: Option<SymId>, line: u32) -> Self {
        Self {
            kind,
            next: None,
            down: None,
            sub: None,
            up: false,
            sym,
            val: 0,
            code: TransKind::Normal,
            set: IndexSet::new(),
            pos: None,
            ret_var: None,
            line,
            state: None,
        }
    }
}
