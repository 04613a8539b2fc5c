//! Grammar checks.
//!
//! Completeness, circularity and derivability gate the rest: only when all
//! three pass are reachability, resolver placement and LL(1) conditions
//! examined. Everything here reports through the diagnostics collection;
//! nothing aborts the run.

use indexmap::IndexSet;

use crate::diagnostics::Diagnostics;
use crate::tab::{NodeId, NodeKind, SymId, Tab};

impl Tab {
    pub fn grammar_ok(&mut self, errors: &mut Diagnostics) -> bool {
        let ok = self.nts_complete(errors)
            && self.no_circular_productions(errors)
            && self.all_nt_to_term(errors);
        if ok {
            self.all_nt_reached(errors);
            self.check_resolvers(errors);
            self.check_ll1(errors);
        }
        ok
    }

    // ---------------- every non-terminal has a production --------------

    fn nts_complete(&self, errors: &mut Diagnostics) -> bool {
        let mut complete = true;
        for &id in &self.nonterminals {
            if self.sym(id).graph.is_none() {
                complete = false;
                errors
                    .error(format!("  No production for {}", self.sym(id).name))
                    .emit();
            }
        }
        complete
    }

    // ---------------- circular productions ------------------------------

    /// Non-terminals a production can derive to as its whole expansion.
    fn get_singles(&self, p: Option<NodeId>, singles: &mut Vec<SymId>) {
        let Some(id) = p else { return };
        let v = self.view(id);
        match v.kind {
            NodeKind::Nt => {
                if v.up || self.del_graph(v.next) {
                    if let Some(sym) = v.sym {
                        singles.push(sym);
                    }
                }
            }
            NodeKind::Alt | NodeKind::Iter | NodeKind::Opt => {
                if v.up || self.del_graph(v.next) {
                    self.get_singles(v.sub, singles);
                    if v.kind == NodeKind::Alt {
                        self.get_singles(v.down, singles);
                    }
                }
            }
            _ => {}
        }
        if !v.up && self.del_node(id) {
            self.get_singles(v.next, singles);
        }
    }

    /// Repeatedly drops head-to-tail pairs that cannot sit on a cycle;
    /// whatever remains is a true cycle.
    fn no_circular_productions(&self, errors: &mut Diagnostics) -> bool {
        let mut pairs: Vec<(SymId, SymId)> = Vec::new();
        for &id in &self.nonterminals {
            let mut singles = Vec::new();
            self.get_singles(self.sym(id).graph, &mut singles);
            pairs.extend(singles.into_iter().map(|s| (id, s)));
        }

        loop {
            let dead = pairs.iter().position(|&(left, right)| {
                let on_right_side = pairs.iter().any(|&(_, r)| left == r);
                let on_left_side = pairs.iter().any(|&(l, _)| right == l);
                !(on_left_side && on_right_side)
            });
            match dead {
                Some(i) => {
                    pairs.remove(i);
                }
                None => break,
            }
        }

        let ok = pairs.is_empty();
        for (left, right) in pairs {
            errors
                .error(format!(
                    " {} --> {}",
                    self.sym(left).name,
                    self.sym(right).name
                ))
                .emit();
        }
        ok
    }

    // ---------------- derivability to terminal strings ------------------

    fn is_term(&self, p: Option<NodeId>, mark: &IndexSet<usize>) -> bool {
        let mut p = p;
        while let Some(id) = p {
            let v = self.view(id);
            if v.kind == NodeKind::Nt
                && v.sym.is_none_or(|s| !mark.contains(&self.sym(s).n))
            {
                return false;
            }
            if v.kind == NodeKind::Alt
                && !self.is_term(v.sub, mark)
                && (v.down.is_none() || !self.is_term(v.down, mark))
            {
                return false;
            }
            if v.up {
                break;
            }
            p = v.next;
        }
        true
    }

    fn all_nt_to_term(&self, errors: &mut Diagnostics) -> bool {
        let mut mark: IndexSet<usize> = IndexSet::new();
        loop {
            let mut changed = false;
            for &id in &self.nonterminals {
                let n = self.sym(id).n;
                if !mark.contains(&n) && self.is_term(self.sym(id).graph, &mark) {
                    mark.insert(n);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        let mut ok = true;
        for &id in &self.nonterminals {
            if !mark.contains(&self.sym(id).n) {
                ok = false;
                errors
                    .error(format!(
                        "  {} cannot be derived to terminals",
                        self.sym(id).name
                    ))
                    .emit();
            }
        }
        ok
    }

    // ---------------- reachability --------------------------------------

    fn mark_reached_nts(&self, p: Option<NodeId>, visited: &mut IndexSet<usize>) {
        let mut p = p;
        while let Some(id) = p {
            let v = self.view(id);
            match v.kind {
                NodeKind::Nt => {
                    if let Some(sym) = v.sym {
                        let n = self.sym(sym).n;
                        if !visited.contains(&n) {
                            visited.insert(n);
                            self.mark_reached_nts(self.sym(sym).graph, visited);
                        }
                    }
                }
                NodeKind::Alt | NodeKind::Iter | NodeKind::Opt => {
                    self.mark_reached_nts(v.sub, visited);
                    if v.kind == NodeKind::Alt {
                        self.mark_reached_nts(v.down, visited);
                    }
                }
                _ => {}
            }
            if v.up {
                break;
            }
            p = v.next;
        }
    }

    fn all_nt_reached(&self, errors: &mut Diagnostics) -> bool {
        let Some(gram) = self.gram_sy else {
            return true;
        };
        let mut visited: IndexSet<usize> = IndexSet::from([self.sym(gram).n]);
        self.mark_reached_nts(self.sym(gram).graph, &mut visited);

        let mut ok = true;
        for &id in &self.nonterminals {
            if !visited.contains(&self.sym(id).n) {
                ok = false;
                errors
                    .warning(format!(" {} cannot be reached", self.sym(id).name))
                    .emit();
            }
        }
        ok
    }

    // ---------------- LL(1) conditions -----------------------------------

    fn ll1_error(
        &self,
        cur_sy: SymId,
        cond: u32,
        sym: Option<SymId>,
        errors: &mut Diagnostics,
    ) {
        let mut s = format!("  LL1 warning in {}: ", self.sym(cur_sy).name);
        if let Some(sym) = sym {
            s.push_str(&format!("{} is ", self.sym(sym).name));
        }
        s.push_str(match cond {
            1 => "start of several alternatives",
            2 => "start & successor of deletable structure",
            3 => "an ANY node that matches no symbol",
            _ => "contents of [...] or {...} must not be deletable",
        });
        errors.warning(s).emit();
    }

    fn check_overlap(
        &self,
        cur_sy: SymId,
        s1: &IndexSet<usize>,
        s2: &IndexSet<usize>,
        cond: u32,
        errors: &mut Diagnostics,
    ) {
        for &id in &self.terminals {
            let n = self.sym(id).n;
            if s1.contains(&n) && s2.contains(&n) {
                self.ll1_error(cur_sy, cond, Some(id), errors);
            }
        }
    }

    fn check_alts(&self, p: Option<NodeId>, cur_sy: SymId, errors: &mut Diagnostics) {
        let mut p = p;
        while let Some(id) = p {
            let v = self.view(id);
            match v.kind {
                NodeKind::Alt => {
                    let mut q = Some(id);
                    let mut s1: IndexSet<usize> = IndexSet::new();
                    while let Some(qid) = q {
                        let qv = self.view(qid);
                        let s2 = self.expected0(qv.sub, cur_sy);
                        self.check_overlap(cur_sy, &s1, &s2, 1, errors);
                        s1.extend(s2);
                        self.check_alts(qv.sub, cur_sy, errors);
                        q = qv.down;
                    }
                }
                NodeKind::Opt | NodeKind::Iter => {
                    if self.del_sub_graph(v.sub) {
                        self.ll1_error(cur_sy, 4, None, errors);
                    } else {
                        let s1 = self.expected0(v.sub, cur_sy);
                        let s2 = self.expected(v.next, cur_sy);
                        self.check_overlap(cur_sy, &s1, &s2, 2, errors);
                    }
                    self.check_alts(v.sub, cur_sy, errors);
                }
                NodeKind::Any => {
                    if self.node(id).set.is_empty() {
                        self.ll1_error(cur_sy, 3, None, errors);
                    }
                }
                _ => {}
            }
            if v.up {
                break;
            }
            p = v.next;
        }
    }

    fn check_ll1(&self, errors: &mut Diagnostics) {
        for &id in &self.nonterminals {
            self.check_alts(self.sym(id).graph, id, errors);
        }
    }

    // ---------------- resolver placement ---------------------------------

    fn res_err(&self, p: NodeId, msg: &str, errors: &mut Diagnostics) {
        let node = self.node(p);
        let col = node.pos.map(|pos| pos.col).unwrap_or(0);
        errors.warning(msg).at(node.line, col).emit();
    }

    fn check_res(
        &self,
        p: Option<NodeId>,
        cur_sy: SymId,
        mut rslv_allowed: bool,
        errors: &mut Diagnostics,
    ) {
        let mut p = p;
        while let Some(id) = p {
            let v = self.view(id);
            match v.kind {
                NodeKind::Alt => {
                    let mut expected: IndexSet<usize> = IndexSet::new();
                    let mut q = Some(id);
                    while let Some(qid) = q {
                        let qv = self.view(qid);
                        expected.extend(self.expected0(qv.sub, cur_sy));
                        q = qv.down;
                    }

                    let mut so_far: IndexSet<usize> = IndexSet::new();
                    let mut q = Some(id);
                    while let Some(qid) = q {
                        let qv = self.view(qid);
                        if let Some(sub) = qv.sub {
                            if self.node(sub).kind == NodeKind::Rslv {
                                let fs = self.expected(self.node(sub).next, cur_sy);
                                if fs.iter().any(|n| so_far.contains(n)) {
                                    self.res_err(
                                        sub,
                                        "Warning: Resolver will never be evaluated. \
                                         Place it at previous conflicting alternative.",
                                        errors,
                                    );
                                }
                                if !fs.iter().any(|n| expected.contains(n)) {
                                    self.res_err(
                                        sub,
                                        "Warning: Misplaced resolver: no LL(1) conflict.",
                                        errors,
                                    );
                                }
                            } else {
                                so_far.extend(self.expected(qv.sub, cur_sy));
                            }
                        }
                        self.check_res(qv.sub, cur_sy, true, errors);
                        q = qv.down;
                    }
                }
                NodeKind::Iter | NodeKind::Opt => {
                    if let Some(sub) = v.sub {
                        if self.node(sub).kind == NodeKind::Rslv {
                            let fs = self.first(self.node(sub).next);
                            let fs_next = self.expected(v.next, cur_sy);
                            if !fs.iter().any(|n| fs_next.contains(n)) {
                                self.res_err(
                                    sub,
                                    "Warning: Misplaced resolver: no LL(1) conflict.",
                                    errors,
                                );
                            }
                        }
                    }
                    self.check_res(v.sub, cur_sy, true, errors);
                }
                NodeKind::Rslv => {
                    if !rslv_allowed {
                        self.res_err(id, "Warning: Misplaced resolver: no alternative.", errors);
                    }
                }
                _ => {}
            }
            if v.up {
                break;
            }
            p = v.next;
            rslv_allowed = false;
        }
    }

    fn check_resolvers(&self, errors: &mut Diagnostics) {
        for &id in &self.nonterminals {
            self.check_res(self.sym(id).graph, id, false, errors);
        }
    }
}
