//! Symbol set computations.
//!
//! Five fixed points, run in this order by `comp_symbol_sets`:
//! deletability, FIRST, ANY narrowing, FOLLOW (two passes), SYNC.
//! Traversals carry a per-call visited set keyed by node index so cyclic
//! graphs terminate.

pub mod checks;


use indexmap::IndexSet;

use crate::diagnostics::Diagnostics;
use crate::tab::{NodeId, NodeKind, SymId, Tab};
use crate::trace::Trace;

/// The node fields a traversal needs, copied out so the arena can be
/// mutated while walking.
#[derive(Clone, Copy)]
pub(crate) struct NodeView {
    pub kind: NodeKind,
    pub next: Option<NodeId>,
    pub down: Option<NodeId>,
    pub sub: Option<NodeId>,
    pub sym: Option<SymId>,
    pub up: bool,
}

impl Tab {
    pub(crate) fn view(&self, id: NodeId) -> NodeView {
        let n = self.node(id);
        NodeView {
            kind: n.kind,
            next: n.next,
            down: n.down,
            sub: n.sub,
            sym: n.sym,
            up: n.up,
        }
    }

    // ------------------------------------------------------------------
    // FIRST
    // ------------------------------------------------------------------

    fn first0(&self, p: Option<NodeId>, mark: &mut IndexSet<usize>) -> IndexSet<usize> {
        let mut fs = IndexSet::new();
        let mut p = p;
        while let Some(id) = p {
            if mark.contains(&id.0) {
                break;
            }
            mark.insert(id.0);
            let v = self.view(id);
            match v.kind {
                NodeKind::Nt => {
                    if let Some(sym) = v.sym {
                        if self.sym(sym).first_ready {
                            fs.extend(self.sym(sym).first.iter().copied());
                        } else {
                            let sub = self.first0(self.sym(sym).graph, mark);
                            fs.extend(sub);
                        }
                    }
                }
                NodeKind::T | NodeKind::Wt => {
                    if let Some(sym) = v.sym {
                        fs.insert(self.sym(sym).n);
                    }
                }
                NodeKind::Any => {
                    fs.extend(self.node(id).set.iter().copied());
                }
                NodeKind::Alt => {
                    fs.extend(self.first0(v.sub, mark));
                    fs.extend(self.first0(v.down, mark));
                }
                NodeKind::Iter | NodeKind::Opt => {
                    fs.extend(self.first0(v.sub, mark));
                }
                _ => {}
            }
            if !self.del_node(id) {
                break;
            }
            p = v.next;
        }
        fs
    }

    /// Terminal numbers that may begin a derivation of the graph at `p`.
    pub fn first(&self, p: Option<NodeId>) -> IndexSet<usize> {
        self.first0(p, &mut IndexSet::new())
    }

    pub fn comp_first_sets(&mut self, trace: &mut Trace) {
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            let sym = self.sym_mut(id);
            sym.first.clear();
            sym.first_ready = false;
        }
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            let first = self.first(self.sym(id).graph);
            if self.ddt[3] {
                trace.newline();
                trace.write_line(&format!("First: {}", self.sym(id).name));
                self.print_set(&first, 0, trace);
            }
            let sym = self.sym_mut(id);
            sym.first = first;
            sym.first_ready = true;
        }
    }

    // ------------------------------------------------------------------
    // FOLLOW
    // ------------------------------------------------------------------

    fn comp_follow(&mut self, p: Option<NodeId>, cur_nt: usize, visited: &mut IndexSet<usize>) {
        let mut p = p;
        while let Some(id) = p {
            if visited.contains(&id.0) {
                break;
            }
            visited.insert(id.0);
            let v = self.view(id);
            match v.kind {
                NodeKind::Nt => {
                    let s = self.first(v.next);
                    if let Some(sym) = v.sym {
                        self.sym_mut(sym).follow.extend(s);
                        if self.del_graph(v.next) {
                            self.sym_mut(sym).nts.insert(cur_nt);
                        }
                    }
                }
                NodeKind::Opt | NodeKind::Iter => self.comp_follow(v.sub, cur_nt, visited),
                NodeKind::Alt => {
                    self.comp_follow(v.sub, cur_nt, visited);
                    self.comp_follow(v.down, cur_nt, visited);
                }
                _ => {}
            }
            p = v.next;
        }
    }

    fn complete(&mut self, sym: SymId, cur_sy: SymId, visited: &mut IndexSet<usize>) {
        let n = self.sym(sym).n;
        if visited.contains(&n) {
            return;
        }
        visited.insert(n);
        for i in 0..self.nonterminals.len() {
            let s = self.nonterminals[i];
            let s_n = self.sym(s).n;
            if self.sym(sym).nts.contains(&s_n) {
                self.complete(s, cur_sy, visited);
                let follow: Vec<usize> = self.sym(s).follow.iter().copied().collect();
                self.sym_mut(sym).follow.extend(follow);
                if sym == cur_sy {
                    self.sym_mut(sym).nts.swap_remove(&s_n);
                }
            }
        }
    }

    pub fn comp_follow_sets(&mut self) {
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            let sym = self.sym_mut(id);
            sym.follow.clear();
            sym.nts.clear();
        }
        let eof_n = self.sym(self.eof_sy).n;
        if let Some(gram) = self.gram_sy {
            self.sym_mut(gram).follow.insert(eof_n);
        }

        let mut visited = IndexSet::new();
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            let cur_nt = self.sym(id).n;
            self.comp_follow(self.sym(id).graph, cur_nt, &mut visited);
        }
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            let mut visited = IndexSet::new();
            self.complete(id, id, &mut visited);
        }
    }

    // ------------------------------------------------------------------
    // ANY
    // ------------------------------------------------------------------

    /// The ANY node a parser would reach first from `p`, if any.
    fn leading_any(&self, p: Option<NodeId>) -> Option<NodeId> {
        let id = p?;
        let v = self.view(id);
        let mut a = match v.kind {
            NodeKind::Any => Some(id),
            NodeKind::Alt => self
                .leading_any(v.sub)
                .or_else(|| self.leading_any(v.down)),
            NodeKind::Opt | NodeKind::Iter => self.leading_any(v.sub),
            _ => None,
        };
        if a.is_none() && self.del_node(id) && !v.up {
            a = self.leading_any(v.next);
        }
        a
    }

    fn subtract_from_any(&mut self, any: NodeId, taken: &IndexSet<usize>) {
        let set = &mut self.node_mut(any).set;
        for n in taken {
            set.swap_remove(n);
        }
    }

    /// Narrows ANY sets: each catch-all keeps only the terminals no
    /// sibling or successor already claims.
    fn find_as(&mut self, p: Option<NodeId>) {
        let mut p = p;
        while let Some(id) = p {
            let v = self.view(id);
            match v.kind {
                NodeKind::Opt | NodeKind::Iter => {
                    self.find_as(v.sub);
                    if let Some(a) = self.leading_any(v.sub) {
                        let taken = self.first(v.next);
                        self.subtract_from_any(a, &taken);
                    }
                }
                NodeKind::Alt => {
                    // Inside an alternation the ANY of a branch loses the
                    // FIRSTs of the branches declared before it.
                    let mut s1: IndexSet<usize> = IndexSet::new();
                    let mut q = Some(id);
                    while let Some(qid) = q {
                        let qv = self.view(qid);
                        self.find_as(qv.sub);
                        if let Some(a) = self.leading_any(qv.sub) {
                            let mut taken = self.first(qv.down);
                            taken.extend(s1.iter().copied());
                            self.subtract_from_any(a, &taken);
                        } else {
                            s1.extend(self.first(qv.sub));
                        }
                        q = qv.down;
                    }
                }
                _ => {}
            }

            // Terminals of a deletable predecessor must leave the ANY set
            // too: [a] ANY, {a|b} ANY, (a|) ANY, A ANY with deletable A.
            if self.del_node(id) {
                if let Some(a) = self.leading_any(v.next) {
                    let q = if v.kind == NodeKind::Nt {
                        v.sym.and_then(|s| self.sym(s).graph)
                    } else {
                        v.sub
                    };
                    let taken = self.first(q);
                    self.subtract_from_any(a, &taken);
                }
            }

            if v.up {
                break;
            }
            p = v.next;
        }
    }

    pub fn comp_any_sets(&mut self) {
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            self.find_as(self.sym(id).graph);
        }
    }

    /// Seeds every ANY node with all terminals except EOF; `find_as`
    /// narrows the sets afterwards.
    pub fn setup_anys(&mut self) {
        let eof_n = self.sym(self.eof_sy).n;
        let all: IndexSet<usize> = (0..self.terminals.len()).filter(|&n| n != eof_n).collect();
        for node in &mut self.nodes {
            if node.kind == NodeKind::Any {
                node.set = all.clone();
            }
        }
    }

    // ------------------------------------------------------------------
    // Expected sets
    // ------------------------------------------------------------------

    /// Terminals acceptable at `p`: FIRST, plus the follow of the current
    /// production when the rest is deletable.
    pub fn expected(&self, p: Option<NodeId>, cur_sy: SymId) -> IndexSet<usize> {
        let mut s = self.first(p);
        if self.del_graph(p) {
            s.extend(self.sym(cur_sy).follow.iter().copied());
        }
        s
    }

    /// Like `expected`, but treats a resolver as accepting nothing.
    pub fn expected0(&self, p: Option<NodeId>, cur_sy: SymId) -> IndexSet<usize> {
        match p {
            Some(id) if self.node(id).kind == NodeKind::Rslv => IndexSet::new(),
            _ => self.expected(p, cur_sy),
        }
    }

    // ------------------------------------------------------------------
    // SYNC
    // ------------------------------------------------------------------

    fn comp_sync(&mut self, p: Option<NodeId>, cur_sy: SymId, visited: &mut IndexSet<usize>) {
        let mut p = p;
        while let Some(id) = p {
            if visited.contains(&id.0) {
                break;
            }
            visited.insert(id.0);
            let v = self.view(id);
            match v.kind {
                NodeKind::Sync => {
                    let mut s = self.expected(v.next, cur_sy);
                    s.insert(self.sym(self.eof_sy).n);
                    self.all_sync_sets.extend(s.iter().copied());
                    self.node_mut(id).set = s;
                }
                NodeKind::Alt => {
                    self.comp_sync(v.sub, cur_sy, visited);
                    self.comp_sync(v.down, cur_sy, visited);
                }
                NodeKind::Opt | NodeKind::Iter => self.comp_sync(v.sub, cur_sy, visited),
                _ => {}
            }
            p = v.next;
        }
    }

    pub fn comp_sync_sets(&mut self) {
        self.all_sync_sets = IndexSet::from([self.sym(self.eof_sy).n]);
        let mut visited = IndexSet::new();
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            self.comp_sync(self.sym(id).graph, id, &mut visited);
        }
    }

    // ------------------------------------------------------------------
    // Deletability
    // ------------------------------------------------------------------

    pub fn comp_deletable_symbols(&mut self, errors: &mut Diagnostics) {
        loop {
            let mut changed = false;
            for i in 0..self.nonterminals.len() {
                let id = self.nonterminals[i];
                let sym = self.sym(id);
                if !sym.deletable && sym.graph.is_some() && self.del_graph(sym.graph) {
                    self.sym_mut(id).deletable = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            if self.sym(id).deletable {
                errors
                    .warning(format!(" {} deletable", self.sym(id).name))
                    .emit();
            }
        }
    }

    // ------------------------------------------------------------------
    // Driver
    // ------------------------------------------------------------------

    pub fn comp_symbol_sets(&mut self, errors: &mut Diagnostics, trace: &mut Trace) {
        self.comp_deletable_symbols(errors);
        self.comp_first_sets(trace);
        self.comp_any_sets();
        self.comp_follow_sets();
        self.comp_sync_sets();

        if self.ddt[1] {
            trace.newline();
            trace.write_line("First & follow symbols:");
            trace.write_line("----------------------");
            trace.newline();
            for i in 0..self.nonterminals.len() {
                let id = self.nonterminals[i];
                trace.write_line(&self.sym(id).name.clone());
                trace.write("first:   ");
                let first = self.sym(id).first.clone();
                self.print_set(&first, 10, trace);
                trace.write("follow:  ");
                let follow = self.sym(id).follow.clone();
                self.print_set(&follow, 10, trace);
                trace.newline();
            }
        }

        if self.ddt[4] {
            trace.newline();
            trace.write_line("ANY and SYNC sets:");
            trace.write_line("-----------------");
            for i in 0..self.nodes.len() {
                let (kind, line, set) = {
                    let node = &self.nodes[i];
                    (node.kind, node.line, node.set.clone())
                };
                if matches!(kind, NodeKind::Any | NodeKind::Sync) {
                    trace.write("Line: ");
                    trace.write_w(&line.to_string(), 4);
                    trace.write(" Node: ");
                    trace.write_w(&i.to_string(), 4);
                    trace.write(&format!(" {}: ", kind.name().trim_end()));
                    self.print_set(&set, 11, trace);
                }
            }
        }
    }
}
