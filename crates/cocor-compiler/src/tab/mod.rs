//! The grammar store.
//!
//! Owns the symbols, the syntax-graph nodes, the character classes and the
//! literal table, and provides the graph constructors the meta-parser
//! builds productions with. Set computations and grammar checks live in
//! `analyze`; both are `impl Tab` blocks over the same arenas.

pub mod node;
pub mod symbol;

#[cfg(test)]
mod tab_tests;

use std::path::PathBuf;

use cocor_core::{CharSet, COCO_WCHAR_MAX, Position};
use indexmap::IndexMap;

use crate::diagnostics::Diagnostics;
use crate::trace::Trace;

pub use node::{ClassId, Node, NodeArg, NodeId, NodeKind, TransKind};
pub use symbol::{SymId, SymKind, Symbol, TokenKind};

/// A named, immutable character class.
#[derive(Debug, Clone)]
pub struct CharClass {
    pub n: usize,
    pub name: String,
    pub set: CharSet,
}

/// Transient builder pair for a syntax-graph fragment: `l` is the head,
/// `r` anchors the list of open ends. Never stored past construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Graph {
    pub l: Option<NodeId>,
    pub r: Option<NodeId>,
}

impl Graph {
    pub fn from_node(p: NodeId) -> Self {
        Self {
            l: Some(p),
            r: Some(p),
        }
    }
}

pub struct Tab {
    symbols: Vec<Symbol>,
    pub terminals: Vec<SymId>,
    pub pragmas: Vec<SymId>,
    pub nonterminals: Vec<SymId>,

    pub nodes: Vec<Node>,
    dummy_node: NodeId,

    pub classes: Vec<CharClass>,
    dummy_name: u32,

    /// Literal spelling (with quotes) to the symbol it declares.
    pub literals: IndexMap<String, SymId>,

    pub eof_sy: SymId,
    pub gram_sy: Option<SymId>,
    pub no_sym: Option<SymId>,

    /// Union of every SYNC set; seeds error recovery in generated parsers.
    pub all_sync_sets: indexmap::IndexSet<usize>,
    /// Code points the generated scanner skips between tokens.
    pub ignored: CharSet,

    pub sem_decl_pos: Option<Position>,
    pub using_pos: Option<Position>,

    /// Debug-trace-table switches; each drives one dump.
    pub ddt: [bool; 10],
    pub ns_name: Option<String>,
    pub check_eof: bool,

    pub src_name: PathBuf,
    pub src_dir: PathBuf,
    pub frame_dir: Option<PathBuf>,
    pub out_dir: PathBuf,
}

impl Tab {
    pub fn new() -> Self {
        let mut tab = Self {
            symbols: Vec::new(),
            terminals: Vec::new(),
            pragmas: Vec::new(),
            nonterminals: Vec::new(),
            nodes: Vec::new(),
            dummy_node: NodeId(0),
            classes: Vec::new(),
            dummy_name: 'A' as u32,
            literals: IndexMap::new(),
            eof_sy: SymId(0),
            gram_sy: None,
            no_sym: None,
            all_sync_sets: indexmap::IndexSet::new(),
            ignored: CharSet::new(),
            sem_decl_pos: None,
            using_pos: None,
            ddt: [false; 10],
            ns_name: None,
            check_eof: false,
            src_name: PathBuf::new(),
            src_dir: PathBuf::new(),
            frame_dir: None,
            out_dir: PathBuf::new(),
        };
        let mut sink = Diagnostics::new();
        tab.eof_sy = tab.new_sym(SymKind::Terminal, "EOF", 0, &mut sink);
        tab.dummy_node = tab.new_node(NodeKind::Eps, NodeArg::None, 0);
        tab
    }

    // ------------------------------------------------------------------
    // Symbol list management
    // ------------------------------------------------------------------

    pub fn sym(&self, id: SymId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn sym_mut(&mut self, id: SymId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    pub fn new_sym(
        &mut self,
        kind: SymKind,
        name: &str,
        line: u32,
        errors: &mut Diagnostics,
    ) -> SymId {
        let mut name = name.to_string();
        if name.len() == 2 && name.starts_with('"') {
            errors.error("empty token not allowed").emit();
            name = "???".into();
        }
        let mut sym = Symbol::new(kind, name, line);
        let id = SymId(self.symbols.len());
        match kind {
            SymKind::Terminal => {
                sym.n = self.terminals.len();
                self.terminals.push(id);
            }
            SymKind::Pragma => {
                // Numbered later, above the terminals.
                self.pragmas.push(id);
            }
            SymKind::Nonterminal => {
                sym.n = self.nonterminals.len();
                self.nonterminals.push(id);
            }
        }
        self.symbols.push(sym);
        id
    }

    pub fn find_sym(&self, name: &str) -> Option<SymId> {
        self.terminals
            .iter()
            .chain(self.nonterminals.iter())
            .copied()
            .find(|&id| self.sym(id).name == name)
    }

    /// Pragmas get the numbers above `no_sym`, in declaration order.
    pub fn renumber_pragmas(&mut self) {
        let mut n = self.terminals.len();
        for i in 0..self.pragmas.len() {
            let id = self.pragmas[i];
            self.symbols[id.0].n = n;
            n += 1;
        }
    }

    // ------------------------------------------------------------------
    // Syntax graph management
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn new_node(&mut self, kind: NodeKind, arg: NodeArg, line: u32) -> NodeId {
        let mut node = match arg {
            NodeArg::Sym(sym) => Node::new(kind, Some(sym), line),
            _ => Node::new(kind, None, line),
        };
        match arg {
            NodeArg::Sub(sub) => node.sub = Some(sub),
            NodeArg::Val(val) => node.val = val,
            _ => {}
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Reclaims the node arena once the scanner has been built; the
    /// production phase starts over with a fresh dummy node.
    pub fn delete_nodes(&mut self) {
        self.nodes.clear();
        self.dummy_node = self.new_node(NodeKind::Eps, NodeArg::None, 0);
    }

    pub fn make_first_alt(&mut self, g: &mut Graph) {
        let sub = g.l;
        let alt = self.new_node(NodeKind::Alt, NodeArg::None, 0);
        self.node_mut(alt).sub = sub;
        if let Some(sub) = sub {
            self.node_mut(alt).line = self.node(sub).line;
        }
        if let Some(r) = g.r {
            self.node_mut(r).up = true;
        }
        self.node_mut(alt).next = g.r;
        g.l = Some(alt);
        g.r = Some(alt);
    }

    /// Appends `g2` as a further alternative; the result is in `g1`.
    pub fn make_alternative(&mut self, g1: &mut Graph, g2: &mut Graph) {
        let sub = g2.l;
        let alt = self.new_node(NodeKind::Alt, NodeArg::None, 0);
        self.node_mut(alt).sub = sub;
        if let Some(sub) = sub {
            self.node_mut(alt).line = self.node(sub).line;
        }
        self.node_mut(alt).up = true;
        if let Some(r) = g2.r {
            self.node_mut(r).up = true;
        }
        g2.l = Some(alt);

        let mut p = g1.l;
        while let Some(id) = p {
            match self.node(id).down {
                Some(down) => p = Some(down),
                None => {
                    self.node_mut(id).down = g2.l;
                    break;
                }
            }
        }

        // Append the new alternative to g1's end list, then g2's end list
        // behind it.
        let mut p = g1.r;
        while let Some(id) = p {
            match self.node(id).next {
                Some(next) => p = Some(next),
                None => {
                    self.node_mut(id).next = g2.l;
                    break;
                }
            }
        }
        self.node_mut(alt).next = g2.r;
    }

    /// Chains `g2` behind `g1`; the result is in `g1`.
    pub fn make_sequence(&mut self, g1: &mut Graph, g2: &mut Graph) {
        let Some(r1) = g1.r else {
            *g1 = *g2;
            return;
        };
        let mut p = self.node(r1).next; // end list minus the anchor
        self.node_mut(r1).next = g2.l;
        while let Some(id) = p {
            let q = self.node(id).next;
            self.node_mut(id).next = g2.l;
            p = q;
        }
        g1.r = g2.r;
    }

    pub fn make_iteration(&mut self, g: &mut Graph) {
        let sub = g.l;
        let iter = self.new_node(NodeKind::Iter, NodeArg::None, 0);
        self.node_mut(iter).sub = sub;
        if let Some(r) = g.r {
            self.node_mut(r).up = true;
        }
        let mut p = g.r;
        g.l = Some(iter);
        g.r = Some(iter);
        while let Some(id) = p {
            let q = self.node(id).next;
            self.node_mut(id).next = Some(iter);
            p = q;
        }
    }

    pub fn make_option(&mut self, g: &mut Graph) {
        let sub = g.l;
        let opt = self.new_node(NodeKind::Opt, NodeArg::None, 0);
        self.node_mut(opt).sub = sub;
        if let Some(r) = g.r {
            self.node_mut(r).up = true;
        }
        self.node_mut(opt).next = g.r;
        g.l = Some(opt);
        g.r = Some(opt);
    }

    /// Clears the open-end list; the fragment becomes a finished graph.
    pub fn finish(&mut self, g: &mut Graph) {
        let mut p = g.r;
        while let Some(id) = p {
            let q = self.node(id).next;
            self.node_mut(id).next = None;
            p = q;
        }
    }

    /// Builds a chain of `Chr` nodes for a quoted literal.
    pub fn str_to_graph(&mut self, quoted: &str, errors: &mut Diagnostics) -> Graph {
        let s = match Self::unescape(Self::strip_quotes(quoted)) {
            Ok(s) => s,
            Err(msg) => {
                errors.error(msg).emit();
                String::new()
            }
        };
        if s.is_empty() {
            errors.error("empty token not allowed").emit();
        }
        let mut r = self.dummy_node;
        for c in s.chars() {
            let p = self.new_node(NodeKind::Chr, NodeArg::Val(c as u32), 0);
            self.node_mut(r).next = Some(p);
            r = p;
        }
        let mut g = Graph::default();
        g.r = Some(r);
        g.l = self.node(self.dummy_node).next;
        let dummy = self.dummy_node;
        self.node_mut(dummy).next = None;
        g
    }

    /// Marks every scanner transition of the graph as a context move.
    pub fn set_context_trans(&mut self, mut p: Option<NodeId>) {
        while let Some(id) = p {
            let kind = self.node(id).kind;
            match kind {
                NodeKind::Chr | NodeKind::Clas => self.node_mut(id).code = TransKind::Context,
                NodeKind::Opt | NodeKind::Iter => self.set_context_trans(self.node(id).sub),
                NodeKind::Alt => {
                    self.set_context_trans(self.node(id).sub);
                    self.set_context_trans(self.node(id).down);
                }
                _ => {}
            }
            if self.node(id).up {
                break;
            }
            p = self.node(id).next;
        }
    }

    // ---------------- graph deletability -----------------------------

    pub fn del_graph(&self, p: Option<NodeId>) -> bool {
        match p {
            None => true,
            Some(id) => self.del_node(id) && self.del_graph(self.node(id).next),
        }
    }

    /// Like `del_graph`, but a substructure ends where `up` is set.
    pub fn del_sub_graph(&self, p: Option<NodeId>) -> bool {
        match p {
            None => true,
            Some(id) => {
                self.del_node(id) && (self.node(id).up || self.del_sub_graph(self.node(id).next))
            }
        }
    }

    pub fn del_node(&self, id: NodeId) -> bool {
        let node = self.node(id);
        match node.kind {
            NodeKind::Nt => node.sym.is_some_and(|s| self.sym(s).deletable),
            NodeKind::Alt => {
                self.del_sub_graph(node.sub)
                    || node.down.is_some() && self.del_sub_graph(node.down)
            }
            NodeKind::Iter
            | NodeKind::Opt
            | NodeKind::Sem
            | NodeKind::Eps
            | NodeKind::Sync
            | NodeKind::Rslv => true,
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Character class management
    // ------------------------------------------------------------------

    pub fn new_char_class(&mut self, name: &str, set: CharSet) -> ClassId {
        let name = if name == "#" {
            let generated = format!("#{}", char::from_u32(self.dummy_name).unwrap_or('?'));
            self.dummy_name += 1;
            generated
        } else {
            name.to_string()
        };
        let id = ClassId(self.classes.len());
        self.classes.push(CharClass {
            n: id.0,
            name,
            set,
        });
        id
    }

    pub fn find_char_class_by_name(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .map(ClassId)
    }

    pub fn find_char_class_by_set(&self, set: &CharSet) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| &c.set == set)
            .map(ClassId)
    }

    pub fn char_class_set(&self, n: u32) -> &CharSet {
        &self.classes[n as usize].set
    }

    // ------------------------------------------------------------------
    // String handling
    // ------------------------------------------------------------------

    /// The text between a literal's quotes; tolerant of truncated tokens
    /// produced during error recovery.
    pub fn strip_quotes(s: &str) -> &str {
        if s.len() >= 2 { &s[1..s.len() - 1] } else { "" }
    }

    fn hex_to_char(hex: &str) -> Result<char, &'static str> {
        const BAD: &str = "bad escape sequence in string or character";
        let val = u32::from_str_radix(hex, 16).map_err(|_| BAD)?;
        if val > COCO_WCHAR_MAX {
            return Err(BAD);
        }
        char::from_u32(val).ok_or(BAD)
    }

    /// Resolves backslash escapes. The inverse of `escape` for
    /// well-formed inputs; malformed escapes are rejected.
    pub fn unescape(s: &str) -> Result<String, &'static str> {
        const BAD: &str = "bad escape sequence in string or character";
        let chars: Vec<char> = s.chars().collect();
        let mut buf = String::with_capacity(chars.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] != '\\' {
                buf.push(chars[i]);
                i += 1;
                continue;
            }
            if i + 1 >= chars.len() {
                return Err(BAD);
            }
            match chars[i + 1] {
                'u' | 'x' => {
                    if i + 6 > chars.len() {
                        return Err(BAD);
                    }
                    let hex: String = chars[i + 2..i + 6].iter().collect();
                    buf.push(Self::hex_to_char(&hex)?);
                    i += 6;
                }
                c => {
                    buf.push(match c {
                        '\\' => '\\',
                        '\'' => '\'',
                        '"' => '"',
                        'r' => '\r',
                        'n' => '\n',
                        't' => '\t',
                        'v' => '\u{000B}',
                        '0' => '\0',
                        'b' => '\u{0008}',
                        'f' => '\u{000C}',
                        'a' => '\u{0007}',
                        _ => return Err(BAD),
                    });
                    i += 2;
                }
            }
        }
        Ok(buf)
    }

    pub fn char_to_hex(ch: u32) -> String {
        format!("\\u{ch:04X}")
    }

    pub fn escape(s: &str) -> String {
        let mut buf = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '\\' => buf.push_str("\\\\"),
                '\'' => buf.push_str("\\'"),
                '"' => buf.push_str("\\\""),
                '\t' => buf.push_str("\\t"),
                '\r' => buf.push_str("\\r"),
                '\n' => buf.push_str("\\n"),
                ' '..='\u{007F}' => buf.push(c),
                _ => buf.push_str(&Self::char_to_hex(c as u32)),
            }
        }
        buf
    }

    // ------------------------------------------------------------------
    // Trace switches and options
    // ------------------------------------------------------------------

    /// Parses a `-trace` switch string or an in-grammar `$...` pragma.
    /// Digits name a flag directly; the letters are mnemonic aliases.
    pub fn set_ddt(&mut self, s: &str) {
        for ch in s.to_uppercase().chars() {
            match ch {
                '0'..='9' => self.ddt[ch as usize - '0' as usize] = true,
                'A' => self.ddt[0] = true, // trace automaton
                'F' => self.ddt[1] = true, // first/follow sets
                'G' => self.ddt[2] = true, // syntax graph
                'I' => self.ddt[3] = true, // trace FIRST computation
                'J' => self.ddt[4] = true, // ANY and SYNC sets
                'P' => self.ddt[8] = true, // statistics
                'S' => self.ddt[6] = true, // symbol table
                'X' => self.ddt[7] = true, // cross reference
                _ => {}
            }
        }
    }

    /// Handles a `$name=value` option pragma.
    pub fn set_option(&mut self, s: &str) {
        let Some((name, value)) = s.split_once('=') else {
            return;
        };
        match name {
            "$namespace" => {
                if self.ns_name.is_none() {
                    self.ns_name = Some(value.to_string());
                }
            }
            "$checkEOF" => self.check_eof = value == "true",
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Trace dumps
    // ------------------------------------------------------------------

    fn name_col(name: &str) -> String {
        Trace::format_string(name, -14)
    }

    fn kind_col(kind: SymKind) -> &'static str {
        match kind {
            SymKind::Terminal => "t   ",
            SymKind::Pragma => "pr  ",
            SymKind::Nonterminal => "nt  ",
        }
    }

    fn num(p: Option<NodeId>) -> usize {
        p.map(|id| id.0).unwrap_or(0)
    }

    fn print_sym(&self, id: SymId, trace: &mut Trace) {
        let sym = self.sym(id);
        trace.write_w(&sym.n.to_string(), 3);
        trace.write(" ");
        trace.write(&Self::name_col(&sym.name));
        trace.write(" ");
        trace.write(Self::kind_col(sym.kind));
        trace.write(if sym.attr_pos.is_none() {
            " false "
        } else {
            " true  "
        });
        if sym.kind == SymKind::Nonterminal {
            trace.write_w(&Self::num(sym.graph).to_string(), 5);
            trace.write(if sym.deletable { " true  " } else { " false " });
        } else {
            trace.write("            ");
        }
        trace.write_w(&sym.line.to_string(), 5);
        trace.write_line(&format!(" {}", sym.token_kind.name()));
    }

    pub fn print_symbol_table(&self, trace: &mut Trace) {
        trace.write_line("Symbol Table:");
        trace.write_line("------------");
        trace.newline();
        trace.write_line(" nr name           typ  hasAt graph  del   line tokenKind");

        for &id in &self.terminals {
            self.print_sym(id, trace);
        }
        for &id in &self.pragmas {
            self.print_sym(id, trace);
        }
        for &id in &self.nonterminals {
            self.print_sym(id, trace);
        }

        trace.newline();
        trace.write_line("Literal Tokens:");
        trace.write_line("--------------");
        for (literal, &id) in &self.literals {
            trace.write_line(&format!("_{} = {}.", self.sym(id).name, literal));
        }
        trace.newline();
    }

    /// Prints the terminals of `set`, wrapping at 80 columns.
    pub fn print_set(&self, set: &indexmap::IndexSet<usize>, indent: usize, trace: &mut Trace) {
        let mut col = indent;
        for &id in &self.terminals {
            let sym = self.sym(id);
            if !set.contains(&sym.n) {
                continue;
            }
            let len = sym.name.len();
            if col + len >= 80 {
                trace.newline();
                trace.write(&" ".repeat(indent));
                col = indent;
            }
            trace.write(&sym.name);
            trace.write(" ");
            col += len + 1;
        }
        if col == indent {
            trace.write("-- empty set --");
        }
        trace.newline();
    }

    fn ptr(p: Option<NodeId>, up: bool) -> String {
        let nr = Self::num(p).to_string();
        if up { format!("-{nr}") } else { nr }
    }

    fn pos_col(pos: Option<Position>) -> String {
        match pos {
            None => "     ".into(),
            Some(pos) => Trace::format_string(&pos.beg.to_string(), 5),
        }
    }

    pub fn print_nodes(&self, trace: &mut Trace) {
        trace.write_line("Graph nodes:");
        trace.write_line("----------------------------------------------------");
        trace.write_line("   n type name          next  down   sub   pos  line");
        trace.write_line("                               val  code");
        trace.write_line("----------------------------------------------------");

        for (n, node) in self.nodes.iter().enumerate() {
            trace.write_w(&n.to_string(), 4);
            trace.write(&format!(" {} ", node.kind.name()));
            if let Some(sym) = node.sym {
                trace.write(&Self::name_col(&self.sym(sym).name));
                trace.write(" ");
            } else if node.kind == NodeKind::Clas {
                trace.write(&Self::name_col(&self.classes[node.val as usize].name));
                trace.write(" ");
            } else {
                trace.write("               ");
            }
            trace.write_w(&Self::ptr(node.next, node.up), 5);
            trace.write(" ");

            match node.kind {
                NodeKind::T | NodeKind::Nt | NodeKind::Wt => {
                    trace.write("             ");
                    trace.write(&Self::pos_col(node.pos));
                }
                NodeKind::Chr => {
                    trace.write_w(&node.val.to_string(), 5);
                    trace.write(" ");
                    trace.write_w(&((node.code == TransKind::Context) as u8).to_string(), 5);
                    trace.write("       ");
                }
                NodeKind::Clas => {
                    trace.write("      ");
                    trace.write_w(&((node.code == TransKind::Context) as u8).to_string(), 5);
                    trace.write("       ");
                }
                NodeKind::Alt | NodeKind::Iter | NodeKind::Opt => {
                    trace.write_w(&Self::ptr(node.down, false), 5);
                    trace.write(" ");
                    trace.write_w(&Self::ptr(node.sub, false), 5);
                    trace.write("       ");
                }
                NodeKind::Sem => {
                    trace.write("             ");
                    trace.write(&Self::pos_col(node.pos));
                }
                _ => trace.write("                  "),
            }
            trace.write_line(&format!("{:5}", node.line));
        }
        trace.newline();
    }

    fn ch_repr(ch: u32) -> String {
        match char::from_u32(ch) {
            Some(c) if c >= ' ' && (c as u32) < 127 && c != '\'' && c != '\\' => {
                format!("'{c}'")
            }
            _ => ch.to_string(),
        }
    }

    pub fn write_char_set(&self, set: &CharSet, trace: &mut Trace) {
        for r in set.ranges() {
            if r.from < r.to {
                trace.write(&format!(
                    "{}..{} ",
                    Self::ch_repr(r.from),
                    Self::ch_repr(r.to)
                ));
            } else {
                trace.write(&format!("{} ", Self::ch_repr(r.from)));
            }
        }
    }

    pub fn write_char_classes(&self, trace: &mut Trace) {
        for c in &self.classes {
            trace.write_w(&format!("{}: ", c.name), -10);
            self.write_char_set(&c.set, trace);
            trace.newline();
        }
        trace.newline();
    }

    /// Cross-reference listing: definition lines (negated) and use lines
    /// per symbol, ordered by name.
    pub fn print_xref(&self, trace: &mut Trace) {
        let mut xref: IndexMap<String, Vec<i64>> = IndexMap::new();
        for &id in &self.nonterminals {
            let sym = self.sym(id);
            xref.entry(sym.name.clone())
                .or_default()
                .push(-(sym.line as i64));
        }
        for node in &self.nodes {
            if matches!(node.kind, NodeKind::T | NodeKind::Wt | NodeKind::Nt) {
                if let Some(sym) = node.sym {
                    xref.entry(self.sym(sym).name.clone())
                        .or_default()
                        .push(node.line as i64);
                }
            }
        }
        xref.sort_keys();

        trace.newline();
        trace.write_line("Cross reference list:");
        trace.write_line("--------------------");
        trace.newline();
        for (name, lines) in &xref {
            trace.write("  ");
            trace.write_w(name, -12);
            let mut col = 14;
            for line in lines {
                if col + 5 >= 80 {
                    trace.newline();
                    trace.write(&" ".repeat(14));
                    col = 14;
                }
                trace.write_w(&line.to_string(), 5);
                col += 5;
            }
            trace.newline();
        }
        trace.newline();
    }
}

impl Default for Tab {
    fn default() -> Self {
        Self::new()
    }
}
