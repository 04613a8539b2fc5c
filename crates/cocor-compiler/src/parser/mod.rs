//! Recursive-descent parser for the grammar-description language.
//!
//! One method per meta-grammar production. Error recovery follows Wirth:
//! `expect_weak` discards tokens until a follow marker, `weak_separator`
//! resynchronises separator-style repetitions, and a minimum error
//! distance of two tokens suppresses cascades. Pragmas never reach the
//! productions; `get` consumes them out-of-band and forwards them to the
//! grammar store's trace-switch and option setters.

#[cfg(test)]
mod parser_tests;

use cocor_core::{CharSet, Position};

use crate::diagnostics::Diagnostics;
use crate::dfa::Dfa;
use crate::scan::{Scanner, Token, kinds};
use crate::tab::{Graph, NodeArg, NodeId, NodeKind, SymId, SymKind, Tab, TokenKind};
use crate::trace::Trace;
use crate::Result;

const MIN_ERR_DIST: usize = 2;

/// How a token declaration names its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymInfoKind {
    Id,
    Str,
}

struct SymInfo {
    name: String,
    kind: SymInfoKind,
}

/// Tracks whether a token expression is a single literal string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenString {
    Unset,
    Single(String),
    Structured,
}

pub struct Parser {
    pub scanner: Scanner,
    pub tab: Tab,
    pub dfa: Dfa,
    pub errors: Diagnostics,
    pub trace: Trace,

    /// Last recognised token.
    t: Token,
    /// Lookahead token.
    la: Token,
    err_dist: usize,

    pub gen_scanner: bool,
    token_string: TokenString,
    /// `Some(grammar_ok)` once analysis has run.
    pub grammar_checked: Option<bool>,
    /// Print progress lines the way the command-line tool does.
    pub verbose: bool,
}

impl Parser {
    pub fn new(scanner: Scanner, tab: Tab, trace: Trace) -> Self {
        Self {
            scanner,
            tab,
            dfa: Dfa::new(),
            errors: Diagnostics::new(),
            trace,
            t: Token::default(),
            la: Token::default(),
            err_dist: MIN_ERR_DIST,
            gen_scanner: true,
            token_string: TokenString::Unset,
            grammar_checked: None,
            verbose: false,
        }
    }

    pub fn parse(&mut self) -> Result<()> {
        self.la = Token::default();
        self.get()?;
        self.coco()?;
        self.expect(kinds::EOF)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Error reporting and recovery
    // ------------------------------------------------------------------

    fn syn_err(&mut self, n: usize) {
        if self.err_dist >= MIN_ERR_DIST {
            self.errors
                .error(syn_err_msg(n))
                .at(self.la.line, self.la.col)
                .span(self.la.pos, self.la.pos + self.la.val.len())
                .emit();
        }
        self.err_dist = 0;
    }

    fn sem_err(&mut self, msg: impl Into<String>) {
        if self.err_dist >= MIN_ERR_DIST {
            self.errors
                .error(msg)
                .at(self.t.line, self.t.col)
                .span(self.t.pos, self.t.pos + self.t.val.len())
                .emit();
        }
        self.err_dist = 0;
    }

    fn get(&mut self) -> Result<()> {
        loop {
            self.t = self.la.clone();
            self.la = self.scanner.scan()?;
            if self.la.kind <= kinds::MAX_T {
                self.err_dist += 1;
                break;
            }
            if self.la.kind == kinds::DDT_PRAGMA {
                self.tab.set_ddt(&self.la.val);
            }
            if self.la.kind == kinds::OPTION_PRAGMA {
                self.tab.set_option(&self.la.val);
            }
            self.la = self.t.clone();
        }
        Ok(())
    }

    fn expect(&mut self, n: usize) -> Result<()> {
        if self.la.kind == n {
            self.get()?;
        } else {
            self.syn_err(n);
        }
        Ok(())
    }

    fn start_of(&self, s: usize) -> bool {
        FOLLOW_SETS[s][self.la.kind]
    }

    /// A weak terminal: on mismatch, discard until the follow marker.
    fn expect_weak(&mut self, n: usize, follow: usize) -> Result<()> {
        if self.la.kind == n {
            self.get()?;
        } else {
            self.syn_err(n);
            while !self.start_of(follow) {
                self.get()?;
            }
        }
        Ok(())
    }

    /// Recovery for separator-style repetitions; returns whether the
    /// caller should keep iterating.
    fn weak_separator(&mut self, n: usize, sy_fol: usize, rep_fol: usize) -> Result<bool> {
        let mut kind = self.la.kind;
        if kind == n {
            self.get()?;
            return Ok(true);
        }
        if self.start_of(rep_fol) {
            return Ok(false);
        }
        self.syn_err(n);
        while !(FOLLOW_SETS[sy_fol][kind] || FOLLOW_SETS[rep_fol][kind] || FOLLOW_SETS[0][kind]) {
            self.get()?;
            kind = self.la.kind;
        }
        Ok(self.start_of(sy_fol))
    }

    // ------------------------------------------------------------------
    // Coco = [UsingDirectives] "COMPILER" ident ... "END" ident "."
    // ------------------------------------------------------------------

    fn coco(&mut self) -> Result<()> {
        if self.start_of(1) {
            self.get()?;
            let beg = self.t.pos;
            while self.start_of(1) {
                self.get()?;
            }
            self.tab.using_pos = Some(Position::new(beg, self.la.pos, 0, 0));
        }

        self.expect(kinds::COMPILER)?;
        self.gen_scanner = true;
        self.tab.ignored = CharSet::new();
        self.expect(kinds::IDENT)?;
        let gram_name = self.t.val.clone();
        let beg = self.la.pos;
        while self.start_of(2) {
            self.get()?;
        }
        self.tab.sem_decl_pos = Some(Position::new(beg, self.la.pos, 0, 0));

        if self.la.kind == kinds::IGNORECASE {
            self.get()?;
            self.dfa.ignore_case = true;
        }
        if self.la.kind == kinds::CHARACTERS {
            self.get()?;
            while self.la.kind == kinds::IDENT {
                self.set_decl()?;
            }
        }
        if self.la.kind == kinds::TOKENS {
            self.get()?;
            while matches!(self.la.kind, kinds::IDENT | kinds::STRING | kinds::CHAR) {
                self.token_decl(SymKind::Terminal)?;
            }
        }
        if self.la.kind == kinds::PRAGMAS {
            self.get()?;
            while matches!(self.la.kind, kinds::IDENT | kinds::STRING | kinds::CHAR) {
                self.token_decl(SymKind::Pragma)?;
            }
        }
        while self.la.kind == kinds::COMMENTS {
            self.get()?;
            let mut nested = false;
            self.expect(kinds::FROM)?;
            let g1 = self.token_expr()?;
            self.expect(kinds::TO)?;
            let g2 = self.token_expr()?;
            if self.la.kind == kinds::NESTED {
                self.get()?;
                nested = true;
            }
            self.dfa
                .new_comment(&self.tab, g1.l, g2.l, nested, &mut self.errors);
        }
        while self.la.kind == kinds::IGNORE {
            self.get()?;
            let s = self.set()?;
            self.tab.ignored.union(&s);
        }

        while self.la.kind != kinds::EOF && self.la.kind != kinds::PRODUCTIONS {
            self.syn_err(45);
            self.get()?;
        }
        self.expect(kinds::PRODUCTIONS)?;
        if self.gen_scanner {
            self.dfa.make_deterministic(&mut self.tab, &mut self.errors)?;
        }
        self.tab.delete_nodes();

        while self.la.kind == kinds::IDENT {
            self.production()?;
        }

        self.expect(kinds::END)?;
        self.expect(kinds::IDENT)?;
        if gram_name != self.t.val {
            self.sem_err(format!("'{}' name does not match grammar name", self.t.val));
        }
        self.tab.gram_sy = self.tab.find_sym(&gram_name);
        match self.tab.gram_sy {
            None => self.sem_err("missing production for grammar name"),
            Some(gram) => {
                if self.tab.sym(gram).attr_pos.is_some() {
                    self.sem_err("grammar symbol must not have attributes");
                }
            }
        }

        // noSym gets the highest terminal number; pragmas follow it.
        let no_sym = self.tab.new_sym(SymKind::Terminal, "???", 0, &mut self.errors);
        self.tab.no_sym = Some(no_sym);
        self.tab.setup_anys();
        self.tab.renumber_pragmas();

        if self.tab.ddt[2] {
            self.tab.print_nodes(&mut self.trace);
        }
        if self.errors.error_count() == 0 {
            if self.verbose {
                println!("checking");
            }
            self.tab.comp_symbol_sets(&mut self.errors, &mut self.trace);
            if self.tab.ddt[7] {
                self.tab.print_xref(&mut self.trace);
            }
            let ok = self.tab.grammar_ok(&mut self.errors);
            self.grammar_checked = Some(ok);
        }
        if self.tab.ddt[6] {
            self.tab.print_symbol_table(&mut self.trace);
        }
        self.expect(kinds::DOT)?;
        Ok(())
    }

    fn production(&mut self) -> Result<()> {
        self.get()?;
        let name = self.t.val.clone();
        let found = self.tab.find_sym(&name);
        let undef = found.is_none();
        let sym = match found {
            None => self
                .tab
                .new_sym(SymKind::Nonterminal, &name, self.t.line, &mut self.errors),
            Some(sym) => {
                if self.tab.sym(sym).kind == SymKind::Nonterminal {
                    if self.tab.sym(sym).graph.is_some() {
                        self.sem_err(format!("'{name}' name declared twice"));
                    }
                } else {
                    self.sem_err("this symbol kind not allowed on left side of production");
                }
                self.tab.sym_mut(sym).line = self.t.line;
                sym
            }
        };

        let no_attrs = self.tab.sym(sym).attr_pos.is_none();
        self.tab.sym_mut(sym).attr_pos = None;
        let no_ret = self.tab.sym(sym).ret_var.is_none();
        self.tab.sym_mut(sym).ret_var = None;

        if matches!(self.la.kind, kinds::LT | kinds::LT_DOT) {
            self.attr_decl(sym)?;
        }
        if !undef {
            let symb = self.tab.sym(sym);
            if no_attrs != symb.attr_pos.is_none() || no_ret != symb.ret_var.is_none() {
                self.sem_err("attribute mismatch between declaration and use of this symbol");
            }
        }
        if self.la.kind == kinds::LPAREN_DOT {
            let pos = self.sem_text()?;
            self.tab.sym_mut(sym).sem_pos = Some(pos);
        }
        self.expect_weak(kinds::EQ, 3)?;
        let mut g = self.expression()?;
        self.tab.sym_mut(sym).graph = g.l;
        self.tab.finish(&mut g);
        self.expect_weak(kinds::DOT, 4)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn set_decl(&mut self) -> Result<()> {
        self.expect(kinds::IDENT)?;
        let name = self.t.val.clone();
        let dup = self.tab.find_char_class_by_name(&name).is_some();
        if dup {
            self.sem_err(format!("'{name}' name declared twice"));
        }
        self.expect(kinds::EQ)?;
        let s = self.set()?;
        if s.elements() == 0 {
            self.sem_err("character set must not be empty");
        }
        // Duplicates are reported but not inserted; the first definition
        // stays in effect.
        if !dup {
            self.tab.new_char_class(&name, s);
        }
        self.expect(kinds::DOT)?;
        Ok(())
    }

    fn token_decl(&mut self, kind: SymKind) -> Result<()> {
        let s = self.sym_info()?;
        let sym = match self.tab.find_sym(&s.name) {
            Some(existing) => {
                self.sem_err(format!("'{}' name declared twice", s.name));
                existing
            }
            None => {
                let id = self
                    .tab
                    .new_sym(kind, &s.name, self.t.line, &mut self.errors);
                self.tab.sym_mut(id).token_kind = TokenKind::FixedToken;
                id
            }
        };
        self.token_string = TokenString::Unset;

        while !self.start_of(5) {
            self.syn_err(46);
            self.get()?;
        }

        if self.la.kind == kinds::EQ {
            self.get()?;
            let mut g = self.token_expr()?;
            self.expect(kinds::DOT)?;
            if s.kind == SymInfoKind::Str {
                self.sem_err("a literal must not be declared with a structure");
            }
            self.tab.finish(&mut g);
            let ts = std::mem::replace(&mut self.token_string, TokenString::Unset);
            match ts {
                TokenString::Unset | TokenString::Structured => {
                    self.dfa
                        .convert_to_states(&mut self.tab, g.l, sym, &mut self.errors);
                }
                TokenString::Single(lit) => {
                    // The token expression is a single string.
                    if self.tab.literals.contains_key(&lit) {
                        self.sem_err("token string declared twice");
                    }
                    self.tab.literals.insert(lit.clone(), sym);
                    self.dfa
                        .match_literal(&mut self.tab, &lit, sym, &mut self.errors);
                }
            }
        } else if self.start_of(6) {
            if s.kind == SymInfoKind::Id {
                self.gen_scanner = false;
            } else {
                let name = self.tab.sym(sym).name.clone();
                self.dfa
                    .match_literal(&mut self.tab, &name, sym, &mut self.errors);
            }
        } else {
            self.syn_err(47);
        }

        if self.la.kind == kinds::LPAREN_DOT {
            let pos = self.sem_text()?;
            self.tab.sym_mut(sym).sem_pos = Some(pos);
            if kind != SymKind::Pragma {
                self.sem_err("semantic action not allowed here");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Character sets
    // ------------------------------------------------------------------

    fn set(&mut self) -> Result<CharSet> {
        let mut s = self.sim_set()?;
        while matches!(self.la.kind, kinds::PLUS | kinds::MINUS) {
            if self.la.kind == kinds::PLUS {
                self.get()?;
                let s2 = self.sim_set()?;
                s.union(&s2);
            } else {
                self.get()?;
                let s2 = self.sim_set()?;
                s.subtract(&s2);
            }
        }
        Ok(s)
    }

    fn sim_set(&mut self) -> Result<CharSet> {
        let mut s = CharSet::new();
        match self.la.kind {
            kinds::IDENT => {
                self.get()?;
                match self.tab.find_char_class_by_name(&self.t.val) {
                    None => {
                        let name = self.t.val.clone();
                        self.sem_err(format!("undefined name '{name}'"));
                    }
                    Some(c) => {
                        let class_set = self.tab.classes[c.0].set.clone();
                        s.union(&class_set);
                    }
                }
            }
            kinds::STRING => {
                self.get()?;
                let quoted = self.t.val.clone();
                match Tab::unescape(Tab::strip_quotes(&quoted)) {
                    Ok(name) => {
                        for c in name.chars() {
                            let c = if self.dfa.ignore_case {
                                c.to_lowercase().next().unwrap_or(c)
                            } else {
                                c
                            };
                            s.set(c as u32);
                        }
                    }
                    Err(msg) => self.sem_err(msg),
                }
            }
            kinds::CHAR => {
                let n1 = self.char_val()?;
                s.set(n1);
                if self.la.kind == kinds::DOTDOT {
                    self.get()?;
                    let n2 = self.char_val()?;
                    for i in n1..=n2 {
                        s.set(i);
                    }
                }
            }
            kinds::ANY => {
                self.get()?;
                s.fill();
            }
            _ => self.syn_err(53),
        }
        Ok(s)
    }

    fn char_val(&mut self) -> Result<u32> {
        self.expect(kinds::CHAR)?;
        let quoted = self.t.val.clone();
        let mut n = 0u32;
        match Tab::unescape(Tab::strip_quotes(&quoted)) {
            Ok(s) => {
                let mut it = s.chars();
                match (it.next(), it.next()) {
                    (Some(c), None) => n = c as u32,
                    _ => self.sem_err("unacceptable character value"),
                }
            }
            Err(msg) => self.sem_err(msg),
        }
        if self.dfa.ignore_case && (65..=90).contains(&n) {
            n += 32; // to lowercase
        }
        Ok(n)
    }

    fn sym_info(&mut self) -> Result<SymInfo> {
        let mut s = SymInfo {
            name: "???".into(),
            kind: SymInfoKind::Id,
        };
        if self.la.kind == kinds::IDENT {
            self.get()?;
            s.kind = SymInfoKind::Id;
            s.name = self.t.val.clone();
        } else if matches!(self.la.kind, kinds::STRING | kinds::CHAR) {
            if self.la.kind == kinds::STRING {
                self.get()?;
                s.name = self.t.val.clone();
            } else {
                self.get()?;
                let inner = Tab::strip_quotes(&self.t.val);
                s.name = format!("\"{inner}\"");
            }
            s.kind = SymInfoKind::Str;
            if self.dfa.ignore_case {
                s.name = s.name.to_lowercase();
            }
            if s.name.contains(' ') {
                self.sem_err("literal tokens must not contain blanks");
            }
        } else {
            self.syn_err(54);
        }
        Ok(s)
    }

    // ------------------------------------------------------------------
    // Token expressions
    // ------------------------------------------------------------------

    fn token_expr(&mut self) -> Result<Graph> {
        let mut g = self.token_term()?;
        let mut first = true;
        while self.weak_separator(kinds::BAR, 7, 8)? {
            let mut g2 = self.token_term()?;
            if first {
                self.tab.make_first_alt(&mut g);
                first = false;
            }
            self.tab.make_alternative(&mut g, &mut g2);
        }
        Ok(g)
    }

    fn token_term(&mut self) -> Result<Graph> {
        let mut g = self.token_factor()?;
        while self.start_of(7) {
            let mut g2 = self.token_factor()?;
            self.tab.make_sequence(&mut g, &mut g2);
        }
        if self.la.kind == kinds::CONTEXT {
            self.get()?;
            self.expect(kinds::LPAREN)?;
            let mut g2 = self.token_expr()?;
            self.tab.set_context_trans(g2.l);
            self.dfa.has_ctx_moves = true;
            self.tab.make_sequence(&mut g, &mut g2);
            self.expect(kinds::RPAREN)?;
        }
        Ok(g)
    }

    fn token_factor(&mut self) -> Result<Graph> {
        let mut g: Option<Graph> = None;
        match self.la.kind {
            kinds::IDENT | kinds::STRING | kinds::CHAR => {
                let s = self.sym_info()?;
                if s.kind == SymInfoKind::Id {
                    let c = match self.tab.find_char_class_by_name(&s.name) {
                        Some(c) => c,
                        None => {
                            self.sem_err(format!("undefined name '{}'", s.name));
                            self.tab.new_char_class(&s.name, CharSet::new())
                        }
                    };
                    let p = self.tab.new_node(NodeKind::Clas, NodeArg::Val(c.0 as u32), 0);
                    g = Some(Graph::from_node(p));
                    self.token_string = TokenString::Structured;
                } else {
                    g = Some(self.tab.str_to_graph(&s.name, &mut self.errors));
                    self.token_string = if self.token_string == TokenString::Unset {
                        TokenString::Single(s.name)
                    } else {
                        TokenString::Structured
                    };
                }
            }
            kinds::LPAREN => {
                self.get()?;
                g = Some(self.token_expr()?);
                self.expect(kinds::RPAREN)?;
            }
            kinds::LBRACK => {
                self.get()?;
                let mut gg = self.token_expr()?;
                self.expect(kinds::RBRACK)?;
                self.tab.make_option(&mut gg);
                g = Some(gg);
                self.token_string = TokenString::Structured;
            }
            kinds::LBRACE => {
                self.get()?;
                let mut gg = self.token_expr()?;
                self.expect(kinds::RBRACE)?;
                self.tab.make_iteration(&mut gg);
                g = Some(gg);
                self.token_string = TokenString::Structured;
            }
            _ => self.syn_err(62),
        }
        Ok(match g {
            Some(g) => g,
            // invalid start of TokenFactor
            None => Graph::from_node(self.tab.new_node(NodeKind::Eps, NodeArg::None, 0)),
        })
    }

    // ------------------------------------------------------------------
    // Productions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> Result<Graph> {
        let mut g = self.term()?;
        let mut first = true;
        while self.weak_separator(kinds::BAR, 16, 17)? {
            let mut g2 = self.term()?;
            if first {
                self.tab.make_first_alt(&mut g);
                first = false;
            }
            self.tab.make_alternative(&mut g, &mut g2);
        }
        Ok(g)
    }

    fn term(&mut self) -> Result<Graph> {
        let mut g: Option<Graph> = None;
        if self.start_of(18) {
            let mut rslv = false;
            if self.la.kind == kinds::IF {
                let node = self.tab.new_node(NodeKind::Rslv, NodeArg::None, self.la.line);
                let pos = self.resolver()?;
                self.tab.node_mut(node).pos = Some(pos);
                g = Some(Graph::from_node(node));
                rslv = true;
            }
            let mut g2 = self.factor()?;
            if rslv {
                if let Some(g1) = &mut g {
                    self.tab.make_sequence(g1, &mut g2);
                }
            } else {
                g = Some(g2);
            }
            while self.start_of(19) {
                let mut g2 = self.factor()?;
                if let Some(g1) = &mut g {
                    self.tab.make_sequence(g1, &mut g2);
                }
            }
        } else if self.start_of(20) {
            g = Some(Graph::from_node(
                self.tab.new_node(NodeKind::Eps, NodeArg::None, 0),
            ));
        } else {
            self.syn_err(55);
        }
        Ok(match g {
            Some(g) => g,
            // invalid start of Term
            None => Graph::from_node(self.tab.new_node(NodeKind::Eps, NodeArg::None, 0)),
        })
    }

    fn factor(&mut self) -> Result<Graph> {
        let mut g: Option<Graph> = None;
        match self.la.kind {
            kinds::IDENT | kinds::STRING | kinds::CHAR | kinds::WEAK => {
                let mut weak = false;
                if self.la.kind == kinds::WEAK {
                    self.get()?;
                    weak = true;
                }
                let s = self.sym_info()?;
                let mut sym = self.tab.find_sym(&s.name);
                if sym.is_none() && s.kind == SymInfoKind::Str {
                    sym = self.tab.literals.get(&s.name).copied();
                }
                let undef = sym.is_none();
                let sym = match sym {
                    Some(sym) => sym,
                    None => {
                        if s.kind == SymInfoKind::Id {
                            // forward non-terminal
                            self.tab
                                .new_sym(SymKind::Nonterminal, &s.name, 0, &mut self.errors)
                        } else if self.gen_scanner {
                            let id = self.tab.new_sym(
                                SymKind::Terminal,
                                &s.name,
                                self.t.line,
                                &mut self.errors,
                            );
                            let name = self.tab.sym(id).name.clone();
                            self.dfa
                                .match_literal(&mut self.tab, &name, id, &mut self.errors);
                            id
                        } else {
                            // undefined string in a hand-written scanner
                            self.sem_err(format!("undefined string '{}' in production", s.name));
                            self.tab.eof_sy // dummy
                        }
                    }
                };

                let sym_kind = self.tab.sym(sym).kind;
                if !matches!(sym_kind, SymKind::Terminal | SymKind::Nonterminal) {
                    self.sem_err("this symbol kind is not allowed in production");
                }
                let node_kind = if weak {
                    if sym_kind == SymKind::Terminal {
                        NodeKind::Wt
                    } else {
                        self.sem_err("only terminals may be weak");
                        node_kind_for(sym_kind)
                    }
                } else {
                    node_kind_for(sym_kind)
                };

                let p = self.tab.new_node(node_kind, NodeArg::Sym(sym), self.t.line);
                g = Some(Graph::from_node(p));

                if matches!(self.la.kind, kinds::LT | kinds::LT_DOT) {
                    self.attribs(p)?;
                    if s.kind != SymInfoKind::Id {
                        self.sem_err("a literal must not have attributes");
                    }
                }
                let (pos, ret_var) = {
                    let n = self.tab.node(p);
                    (n.pos, n.ret_var.clone())
                };
                if undef {
                    let symm = self.tab.sym_mut(sym);
                    symm.attr_pos = pos;
                    symm.ret_var = ret_var;
                } else {
                    let symb = self.tab.sym(sym);
                    if pos.is_none() != symb.attr_pos.is_none()
                        || ret_var.is_none() != symb.ret_var.is_none()
                    {
                        self.sem_err("attribute mismatch between declaration and use of this symbol");
                    }
                }
            }
            kinds::LPAREN => {
                self.get()?;
                g = Some(self.expression()?);
                self.expect(kinds::RPAREN)?;
            }
            kinds::LBRACK => {
                self.get()?;
                let mut gg = self.expression()?;
                self.expect(kinds::RBRACK)?;
                self.tab.make_option(&mut gg);
                g = Some(gg);
            }
            kinds::LBRACE => {
                self.get()?;
                let mut gg = self.expression()?;
                self.expect(kinds::RBRACE)?;
                self.tab.make_iteration(&mut gg);
                g = Some(gg);
            }
            kinds::LPAREN_DOT => {
                let pos = self.sem_text()?;
                let p = self.tab.new_node(NodeKind::Sem, NodeArg::None, 0);
                self.tab.node_mut(p).pos = Some(pos);
                g = Some(Graph::from_node(p));
            }
            kinds::ANY => {
                self.get()?;
                // the ANY set is filled in by setup_anys
                let p = self.tab.new_node(NodeKind::Any, NodeArg::None, self.t.line);
                g = Some(Graph::from_node(p));
            }
            kinds::SYNC => {
                self.get()?;
                let p = self.tab.new_node(NodeKind::Sync, NodeArg::None, 0);
                g = Some(Graph::from_node(p));
            }
            _ => self.syn_err(56),
        }
        Ok(match g {
            Some(g) => g,
            // invalid start of Factor
            None => Graph::from_node(self.tab.new_node(NodeKind::Eps, NodeArg::None, 0)),
        })
    }

    fn resolver(&mut self) -> Result<Position> {
        self.expect(kinds::IF)?;
        self.expect(kinds::LPAREN)?;
        let beg = self.la.pos;
        let col = self.la.col;
        let line = self.la.line;
        self.condition()?;
        Ok(Position::new(beg, self.t.pos, col, line))
    }

    fn condition(&mut self) -> Result<()> {
        while self.start_of(29) {
            if self.la.kind == kinds::LPAREN {
                self.get()?;
                self.condition()?;
            } else {
                self.get()?;
            }
        }
        self.expect(kinds::RPAREN)?;
        Ok(())
    }

    fn sem_text(&mut self) -> Result<Position> {
        self.expect(kinds::LPAREN_DOT)?;
        let beg = self.la.pos;
        let col = self.la.col;
        let line = self.la.line;
        while self.start_of(14) {
            if self.start_of(15) {
                self.get()?;
            } else if self.la.kind == kinds::BAD_STRING {
                self.get()?;
                self.sem_err("bad string in semantic action");
            } else {
                self.get()?;
                self.sem_err("missing end of previous semantic action");
            }
        }
        self.expect(kinds::DOT_RPAREN)?;
        Ok(Position::new(beg, self.t.pos, col, line))
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    fn type_name(&mut self) -> Result<()> {
        self.expect(kinds::IDENT)?;
        while matches!(self.la.kind, kinds::DOT | kinds::LT | kinds::LBRACK) {
            if self.la.kind == kinds::DOT {
                self.get()?;
                self.expect(kinds::IDENT)?;
            } else if self.la.kind == kinds::LBRACK {
                self.get()?;
                self.expect(kinds::RBRACK)?;
            } else {
                self.get()?;
                self.type_name()?;
                while self.la.kind == kinds::COMMA {
                    self.get()?;
                    self.type_name()?;
                }
                self.expect(kinds::GT)?;
            }
        }
        Ok(())
    }

    /// Attribute declaration on the left side of a production.
    fn attr_decl(&mut self, sym: SymId) -> Result<()> {
        if self.la.kind == kinds::LT {
            self.get()?;
            if matches!(self.la.kind, kinds::CARET | kinds::OUT) {
                self.get()?;
                let beg = self.la.pos;
                self.type_name()?;
                let ret_type = self.scanner.get_string(beg, self.la.pos)?;
                self.tab.sym_mut(sym).ret_type = Some(ret_type);
                self.expect(kinds::IDENT)?;
                self.tab.sym_mut(sym).ret_var = Some(self.t.val.clone());
                if self.la.kind == kinds::GT {
                    self.get()?;
                } else if self.la.kind == kinds::COMMA {
                    self.get()?;
                    let beg = self.la.pos;
                    let col = self.la.col;
                    let line = self.la.line;
                    while self.start_of(9) {
                        self.get()?;
                    }
                    self.expect(kinds::GT)?;
                    if self.t.pos > beg {
                        self.tab.sym_mut(sym).attr_pos =
                            Some(Position::new(beg, self.t.pos, col, line));
                    }
                } else {
                    self.syn_err(48);
                }
            } else if self.start_of(10) {
                let beg = self.la.pos;
                let col = self.la.col;
                let line = self.la.line;
                if self.start_of(11) {
                    self.get()?;
                    while self.start_of(9) {
                        self.get()?;
                    }
                }
                self.expect(kinds::GT)?;
                if self.t.pos > beg {
                    self.tab.sym_mut(sym).attr_pos = Some(Position::new(beg, self.t.pos, col, line));
                }
            } else {
                self.syn_err(49);
            }
        } else if self.la.kind == kinds::LT_DOT {
            self.get()?;
            if matches!(self.la.kind, kinds::CARET | kinds::OUT) {
                self.get()?;
                let beg = self.la.pos;
                self.type_name()?;
                let ret_type = self.scanner.get_string(beg, self.la.pos)?;
                self.tab.sym_mut(sym).ret_type = Some(ret_type);
                self.expect(kinds::IDENT)?;
                self.tab.sym_mut(sym).ret_var = Some(self.t.val.clone());
                if self.la.kind == kinds::DOT_GT {
                    self.get()?;
                } else if self.la.kind == kinds::COMMA {
                    self.get()?;
                    let beg = self.la.pos;
                    let col = self.la.col;
                    let line = self.la.line;
                    while self.start_of(12) {
                        self.get()?;
                    }
                    self.expect(kinds::DOT_GT)?;
                    if self.t.pos > beg {
                        self.tab.sym_mut(sym).attr_pos =
                            Some(Position::new(beg, self.t.pos, col, line));
                    }
                } else {
                    self.syn_err(50);
                }
            } else if self.start_of(10) {
                let beg = self.la.pos;
                let col = self.la.col;
                let line = self.la.line;
                if self.start_of(13) {
                    self.get()?;
                    while self.start_of(12) {
                        self.get()?;
                    }
                }
                self.expect(kinds::DOT_GT)?;
                if self.t.pos > beg {
                    self.tab.sym_mut(sym).attr_pos = Some(Position::new(beg, self.t.pos, col, line));
                }
            } else {
                self.syn_err(51);
            }
        } else {
            self.syn_err(52);
        }
        Ok(())
    }

    /// Attributes at a symbol occurrence inside a production.
    fn attribs(&mut self, p: NodeId) -> Result<()> {
        if self.la.kind == kinds::LT {
            self.get()?;
            if matches!(self.la.kind, kinds::CARET | kinds::OUT) {
                self.get()?;
                let beg = self.la.pos;
                while self.start_of(21) {
                    if self.start_of(22) {
                        self.get()?;
                    } else if matches!(self.la.kind, kinds::LBRACK | kinds::LPAREN) {
                        self.bracketed()?;
                    } else {
                        self.get()?;
                        self.sem_err("bad string in attributes");
                    }
                }
                let ret_var = self.scanner.get_string(beg, self.la.pos)?;
                self.tab.node_mut(p).ret_var = Some(ret_var);
                if self.la.kind == kinds::GT {
                    self.get()?;
                } else if self.la.kind == kinds::COMMA {
                    self.get()?;
                    let beg = self.la.pos;
                    let col = self.la.col;
                    let line = self.la.line;
                    while self.start_of(9) {
                        if self.start_of(23) {
                            self.get()?;
                        } else {
                            self.get()?;
                            self.sem_err("bad string in attributes");
                        }
                    }
                    self.expect(kinds::GT)?;
                    if self.t.pos > beg {
                        self.tab.node_mut(p).pos = Some(Position::new(beg, self.t.pos, col, line));
                    }
                } else {
                    self.syn_err(57);
                }
            } else if self.start_of(10) {
                let beg = self.la.pos;
                let col = self.la.col;
                let line = self.la.line;
                if self.start_of(11) {
                    if self.start_of(24) {
                        self.get()?;
                    } else {
                        self.get()?;
                        self.sem_err("bad string in attributes");
                    }
                    while self.start_of(9) {
                        if self.start_of(23) {
                            self.get()?;
                        } else {
                            self.get()?;
                            self.sem_err("bad string in attributes");
                        }
                    }
                }
                self.expect(kinds::GT)?;
                if self.t.pos > beg {
                    self.tab.node_mut(p).pos = Some(Position::new(beg, self.t.pos, col, line));
                }
            } else {
                self.syn_err(58);
            }
        } else if self.la.kind == kinds::LT_DOT {
            self.get()?;
            if matches!(self.la.kind, kinds::CARET | kinds::OUT) {
                self.get()?;
                let beg = self.la.pos;
                while self.start_of(25) {
                    if self.start_of(26) {
                        self.get()?;
                    } else if matches!(self.la.kind, kinds::LBRACK | kinds::LPAREN) {
                        self.bracketed()?;
                    } else {
                        self.get()?;
                        self.sem_err("bad string in attributes");
                    }
                }
                let ret_var = self.scanner.get_string(beg, self.la.pos)?;
                self.tab.node_mut(p).ret_var = Some(ret_var);
                if self.la.kind == kinds::DOT_GT {
                    self.get()?;
                } else if self.la.kind == kinds::COMMA {
                    self.get()?;
                    let beg = self.la.pos;
                    let col = self.la.col;
                    let line = self.la.line;
                    while self.start_of(12) {
                        if self.start_of(27) {
                            self.get()?;
                        } else {
                            self.get()?;
                            self.sem_err("bad string in attributes");
                        }
                    }
                    self.expect(kinds::DOT_GT)?;
                    if self.t.pos > beg {
                        self.tab.node_mut(p).pos = Some(Position::new(beg, self.t.pos, col, line));
                    }
                } else {
                    self.syn_err(59);
                }
            } else if self.start_of(10) {
                let beg = self.la.pos;
                let col = self.la.col;
                let line = self.la.line;
                if self.start_of(13) {
                    if self.start_of(28) {
                        self.get()?;
                    } else {
                        self.get()?;
                        self.sem_err("bad string in attributes");
                    }
                    while self.start_of(12) {
                        if self.start_of(27) {
                            self.get()?;
                        } else {
                            self.get()?;
                            self.sem_err("bad string in attributes");
                        }
                    }
                }
                self.expect(kinds::DOT_GT)?;
                if self.t.pos > beg {
                    self.tab.node_mut(p).pos = Some(Position::new(beg, self.t.pos, col, line));
                }
            } else {
                self.syn_err(60);
            }
        } else {
            self.syn_err(61);
        }
        Ok(())
    }

    fn bracketed(&mut self) -> Result<()> {
        if self.la.kind == kinds::LPAREN {
            self.get()?;
            while self.start_of(29) {
                if matches!(self.la.kind, kinds::LBRACK | kinds::LPAREN) {
                    self.bracketed()?;
                } else {
                    self.get()?;
                }
            }
            self.expect(kinds::RPAREN)?;
        } else if self.la.kind == kinds::LBRACK {
            self.get()?;
            while self.start_of(30) {
                if matches!(self.la.kind, kinds::LBRACK | kinds::LPAREN) {
                    self.bracketed()?;
                } else {
                    self.get()?;
                }
            }
            self.expect(kinds::RBRACK)?;
        } else {
            self.syn_err(63);
        }
        Ok(())
    }
}

fn node_kind_for(kind: SymKind) -> NodeKind {
    match kind {
        SymKind::Terminal => NodeKind::T,
        SymKind::Pragma => NodeKind::Pr,
        SymKind::Nonterminal => NodeKind::Nt,
    }
}

fn syn_err_msg(n: usize) -> String {
    let msg = match n {
        0 => "EOF expected",
        1 => "ident expected",
        2 => "number expected",
        3 => "string expected",
        4 => "badString expected",
        5 => "char expected",
        6 => "\"COMPILER\" expected",
        7 => "\"IGNORECASE\" expected",
        8 => "\"CHARACTERS\" expected",
        9 => "\"TOKENS\" expected",
        10 => "\"PRAGMAS\" expected",
        11 => "\"COMMENTS\" expected",
        12 => "\"FROM\" expected",
        13 => "\"TO\" expected",
        14 => "\"NESTED\" expected",
        15 => "\"IGNORE\" expected",
        16 => "\"PRODUCTIONS\" expected",
        17 => "\"=\" expected",
        18 => "\".\" expected",
        19 => "\"END\" expected",
        20 => "\"+\" expected",
        21 => "\"-\" expected",
        22 => "\"..\" expected",
        23 => "\"ANY\" expected",
        24 => "\"<\" expected",
        25 => "\"^\" expected",
        26 => "\"out\" expected",
        27 => "\">\" expected",
        28 => "\",\" expected",
        29 => "\"<.\" expected",
        30 => "\".>\" expected",
        31 => "\"[\" expected",
        32 => "\"]\" expected",
        33 => "\"|\" expected",
        34 => "\"WEAK\" expected",
        35 => "\"(\" expected",
        36 => "\")\" expected",
        37 => "\"{\" expected",
        38 => "\"}\" expected",
        39 => "\"SYNC\" expected",
        40 => "\"IF\" expected",
        41 => "\"CONTEXT\" expected",
        42 => "\"(.\" expected",
        43 => "\".)\" expected",
        44 => "??? expected",
        45 => "this symbol not expected in Coco",
        46 => "this symbol not expected in TokenDecl",
        47 => "invalid TokenDecl",
        48 | 49 | 50 | 51 | 52 => "invalid AttrDecl",
        53 => "invalid SimSet",
        54 => "invalid Sym",
        55 => "invalid Term",
        56 => "invalid Factor",
        57 | 58 | 59 | 60 | 61 => "invalid Attribs",
        62 => "invalid TokenFactor",
        63 => "invalid Bracketed",
        _ => return format!("error {n}"),
    };
    msg.to_string()
}

const T: bool = true;
const X: bool = false;

/// Follow sets of the meta-grammar, indexed by set number and token kind.
#[rustfmt::skip]
const FOLLOW_SETS: [[bool; 46]; 31] = [
    [T, T, X, T, X, T, X, X, X, X, T, T, X, X, X, T, T, T, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X],
    [X, T, T, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, T, T, T, X, X, X, X, X, T, T, T, X, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [T, T, X, T, X, T, X, X, X, X, T, T, X, X, X, T, T, T, T, X, X, X, X, T, X, X, X, X, X, X, X, T, X, T, T, T, X, T, X, T, T, X, T, X, X, X],
    [T, T, X, T, X, T, X, X, X, X, T, T, X, X, X, T, T, T, X, T, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X],
    [T, T, X, T, X, T, X, X, X, X, T, T, X, X, X, T, T, T, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X],
    [X, T, X, T, X, T, X, X, X, X, T, T, X, X, X, T, T, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X],
    [X, T, X, T, X, T, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X, T, X, T, X, X, X, X, X, X, X, X],
    [X, X, X, X, X, X, X, X, X, X, X, T, X, T, T, T, T, X, T, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X, T, X, T, X, X, X, X, X, X, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, X, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, X, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, T, X],
    [X, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, X, T, X],
    [X, T, X, T, X, T, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X, X, T, X, X, X, X, X, X, X, T, T, T, T, T, T, T, T, T, T, X, T, X, X, X],
    [X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X, T, X, T, X, X, X, X, X, X, X],
    [X, T, X, T, X, T, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X, X, X, X, X, T, X, X, T, T, X, T, X, T, T, X, T, X, X, X],
    [X, T, X, T, X, T, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X, X, X, X, X, T, X, X, T, T, X, T, X, T, X, X, T, X, X, X],
    [X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, T, X, X, X, X, X, X, X, X, X, X, X, X, X, T, T, X, X, T, X, T, X, X, X, X, X, X, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, X, T, T, X, T, T, T, X, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, X, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, T, X, X, T, T, T, X, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, X, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, T, T, T, T, T, T, T, T, X],
    [X, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, X, T, T, T, T, T, T, T, T, T, T, T, T, X],
];
