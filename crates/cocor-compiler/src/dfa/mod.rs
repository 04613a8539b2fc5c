//! Scanner automaton construction.
//!
//! Token syntax graphs become an NFA (`convert_to_states`), literals are
//! folded into it (`match_literal`), and `make_deterministic` turns the
//! whole machine into a DFA: overlapping actions are split until disjoint,
//! multi-target actions are melted into subset states, redundant states are
//! eliminated, and shifts with a common target are recombined.

#[cfg(test)]
mod dfa_tests;

use std::collections::BTreeSet;

use cocor_core::CharSet;

use crate::diagnostics::Diagnostics;
use crate::tab::{NodeId, NodeKind, SymId, Tab, TransKind};
use crate::trace::Trace;
use crate::{Error, Result};

/// A comment form the generated scanner skips. Registration order is
/// preserved; the scanner probes each in turn.
#[derive(Debug, Clone)]
pub struct Comment {
    pub start: String,
    pub stop: String,
    pub nested: bool,
}

/// What an action matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionKind {
    /// A single code point (`sym` is the code point).
    Chr,
    /// A character class (`sym` is the class index).
    Clas,
}

/// A transition group of one state: an input set, a transition code, and
/// the target states, kept sorted by state number and deduplicated.
#[derive(Debug, Clone)]
pub struct Action {
    pub kind: ActionKind,
    pub sym: u32,
    pub tc: TransKind,
    pub targets: Vec<usize>,
}

impl Action {
    pub fn new(kind: ActionKind, sym: u32, tc: TransKind) -> Self {
        Self {
            kind,
            sym,
            tc,
            targets: Vec::new(),
        }
    }

    pub fn add_target(&mut self, state: usize) {
        match self.targets.binary_search(&state) {
            Ok(_) => {}
            Err(i) => self.targets.insert(i, state),
        }
    }

    pub fn add_targets(&mut self, other: &Action) {
        for &t in &other.targets {
            self.add_target(t);
        }
        if other.tc == TransKind::Context {
            self.tc = TransKind::Context;
        }
    }

    /// The input set this action fires on.
    pub fn symbols(&self, tab: &Tab) -> CharSet {
        match self.kind {
            ActionKind::Clas => tab.char_class_set(self.sym).clone(),
            ActionKind::Chr => {
                let mut s = CharSet::new();
                s.set(self.sym);
                s
            }
        }
    }

    /// Re-keys the action to the input set `s`: a singleton becomes a
    /// `Chr` action, anything larger a (possibly fresh) character class.
    pub fn shift_with(&mut self, s: &CharSet, tab: &mut Tab) {
        if s.elements() == 1 {
            self.kind = ActionKind::Chr;
            if let Some(first) = s.first() {
                self.sym = first;
            }
        } else {
            let class = tab
                .find_char_class_by_set(s)
                .unwrap_or_else(|| tab.new_char_class("#", s.clone()));
            self.kind = ActionKind::Clas;
            self.sym = class.0 as u32;
        }
    }
}

/// One scanner state. States keep allocation order; the order is part of
/// the deterministic output contract.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub actions: Vec<Action>,
    /// The token this state accepts, if any.
    pub end_of: Option<SymId>,
    /// True when the state lies inside a context-sensitive appendix.
    pub ctx: bool,
}

impl State {
    /// Inserts keeping char actions before class actions, stable within a
    /// kind.
    pub fn add_action(&mut self, act: Action) {
        let i = self.actions.partition_point(|a| a.kind <= act.kind);
        self.actions.insert(i, act);
    }

    fn melt_with(&mut self, other: &State) {
        for action in &other.actions {
            let mut a = Action::new(action.kind, action.sym, action.tc);
            a.add_targets(action);
            self.add_action(a);
        }
    }
}

/// Binds a set of NFA state numbers to the DFA state representing it
/// during subset construction.
#[derive(Debug, Clone)]
struct Melted {
    set: BTreeSet<usize>,
    state: usize,
}

pub struct Dfa {
    pub states: Vec<State>,
    /// Highest state number before melting started.
    last_sim_state: usize,
    melted: Vec<Melted>,
    pub comments: Vec<Comment>,
    pub ignore_case: bool,
    pub has_ctx_moves: bool,
    /// Set when the automaton may have become non-deterministic again
    /// (a literal added after determinisation).
    pub dirty: bool,
    cur_sy: Option<SymId>,
}

impl Dfa {
    pub fn new() -> Self {
        Self {
            states: vec![State::default()], // the dedicated initial state
            last_sim_state: 0,
            melted: Vec::new(),
            comments: Vec::new(),
            ignore_case: false,
            has_ctx_moves: false,
            dirty: false,
            cur_sy: None,
        }
    }

    fn new_state(&mut self) -> usize {
        self.states.push(State::default());
        self.states.len() - 1
    }

    fn new_transition(
        &mut self,
        from: usize,
        to: usize,
        kind: ActionKind,
        sym: u32,
        tc: TransKind,
        errors: &mut Diagnostics,
    ) {
        if to == 0 {
            errors.error("token must not start with an iteration").emit();
        }
        let mut a = Action::new(kind, sym, tc);
        a.add_target(to);
        self.states[from].add_action(a);
    }

    // ------------------------------------------------------------------
    // NFA construction from token graphs
    // ------------------------------------------------------------------

    /// Assigns a state to every node of the token graph rooted at `p` and
    /// derives the transitions.
    pub fn convert_to_states(
        &mut self,
        tab: &mut Tab,
        p: Option<NodeId>,
        sym: SymId,
        errors: &mut Diagnostics,
    ) {
        self.cur_sy = Some(sym);
        if tab.del_graph(p) {
            errors.error("token might be empty").emit();
        }
        self.number_nodes(tab, p, Some(0), false);
        let mut marked = BTreeSet::new();
        self.find_trans(tab, p, true, &mut marked, errors);
        if let Some(id) = p {
            if tab.node(id).kind == NodeKind::Iter {
                let mut stepped = BTreeSet::new();
                self.step(tab, 0, Some(id), &mut stepped, errors);
            }
        }
    }

    /// The state a transition into `p` ends in; the end of the graph gets
    /// a fresh accepting state.
    fn the_state(&mut self, tab: &Tab, p: Option<NodeId>) -> usize {
        match p {
            None => {
                let state = self.new_state();
                self.states[state].end_of = self.cur_sy;
                state
            }
            Some(id) => tab.node(id).state.unwrap_or(0),
        }
    }

    /// Numbering rules: the first node shares the initial state; every
    /// node after `chr`/`clas`/`opt`/`alt` content gets a fresh state; an
    /// iteration gets a fresh state when it starts a substructure or
    /// follows another iteration (`renum_iter`), and otherwise shares, so
    /// a token opening with an iteration loops back to the initial state
    /// and is rejected by `new_transition`.
    fn number_nodes(
        &mut self,
        tab: &mut Tab,
        p: Option<NodeId>,
        state: Option<usize>,
        renum_iter: bool,
    ) {
        let Some(id) = p else { return };
        if tab.node(id).state.is_some() {
            return; // already visited
        }
        let state = match state {
            Some(state) if !(tab.node(id).kind == NodeKind::Iter && renum_iter) => state,
            _ => self.new_state(),
        };
        tab.node_mut(id).state = Some(state);
        if tab.del_graph(Some(id)) {
            if let Some(sym) = self.cur_sy {
                self.states[state].end_of = Some(sym);
            }
        }

        let (kind, next, sub, down) = {
            let n = tab.node(id);
            (n.kind, n.next, n.sub, n.down)
        };
        match kind {
            NodeKind::Clas | NodeKind::Chr => {
                self.number_nodes(tab, next, None, false);
            }
            NodeKind::Opt => {
                self.number_nodes(tab, next, None, false);
                self.number_nodes(tab, sub, Some(state), true);
            }
            NodeKind::Iter => {
                self.number_nodes(tab, next, Some(state), true);
                self.number_nodes(tab, sub, Some(state), true);
            }
            NodeKind::Alt => {
                self.number_nodes(tab, next, None, false);
                self.number_nodes(tab, sub, Some(state), true);
                self.number_nodes(tab, down, Some(state), renum_iter);
            }
            _ => {}
        }
    }

    /// Emits the transitions consumable at `p`'s group from state `from`:
    /// a `chr`/`clas` shifts into its successor's state, an iteration adds
    /// its back edge, and deletable structure is stepped through.
    fn step(
        &mut self,
        tab: &Tab,
        from: usize,
        p: Option<NodeId>,
        stepped: &mut BTreeSet<usize>,
        errors: &mut Diagnostics,
    ) {
        let Some(id) = p else { return };
        stepped.insert(id.0);
        let node = tab.node(id);
        let (kind, next, sub, down, val, code, state) = (
            node.kind,
            node.next,
            node.sub,
            node.down,
            node.val,
            node.code,
            node.state,
        );
        match kind {
            NodeKind::Clas | NodeKind::Chr => {
                let action_kind = if kind == NodeKind::Clas {
                    ActionKind::Clas
                } else {
                    ActionKind::Chr
                };
                let to = self.the_state(tab, next);
                self.new_transition(from, to, action_kind, val, code, errors);
            }
            NodeKind::Alt => {
                self.step(tab, from, sub, stepped, errors);
                self.step(tab, from, down, stepped, errors);
            }
            NodeKind::Iter => {
                if tab.del_sub_graph(sub) {
                    errors
                        .error("contents of {...} must not be deletable")
                        .emit();
                    return;
                }
                if let Some(next_id) = next {
                    if !stepped.contains(&next_id.0) {
                        self.step(tab, from, Some(next_id), stepped, errors);
                    }
                }
                self.step(tab, from, sub, stepped, errors);
                if state != Some(from) {
                    let mut fresh = BTreeSet::new();
                    if let Some(own) = state {
                        self.step(tab, own, Some(id), &mut fresh, errors);
                    }
                }
            }
            NodeKind::Opt => {
                if let Some(next_id) = next {
                    if !stepped.contains(&next_id.0) {
                        self.step(tab, from, Some(next_id), stepped, errors);
                    }
                }
                self.step(tab, from, sub, stepped, errors);
            }
            _ => {}
        }
    }

    /// Walks every group of equally-numbered nodes once and lets `step`
    /// emit its transitions.
    fn find_trans(
        &mut self,
        tab: &Tab,
        p: Option<NodeId>,
        start: bool,
        marked: &mut BTreeSet<usize>,
        errors: &mut Diagnostics,
    ) {
        let Some(id) = p else { return };
        if marked.contains(&id.0) {
            return;
        }
        marked.insert(id.0);
        if start {
            // start of a group of equally numbered nodes
            let mut stepped = BTreeSet::new();
            if let Some(state) = tab.node(id).state {
                self.step(tab, state, Some(id), &mut stepped, errors);
            }
        }
        let (kind, next, sub, down) = {
            let n = tab.node(id);
            (n.kind, n.next, n.sub, n.down)
        };
        match kind {
            NodeKind::Clas | NodeKind::Chr => {
                self.find_trans(tab, next, true, marked, errors);
            }
            NodeKind::Opt => {
                self.find_trans(tab, next, true, marked, errors);
                self.find_trans(tab, sub, false, marked, errors);
            }
            NodeKind::Iter => {
                self.find_trans(tab, next, false, marked, errors);
                self.find_trans(tab, sub, false, marked, errors);
            }
            NodeKind::Alt => {
                self.find_trans(tab, sub, false, marked, errors);
                self.find_trans(tab, down, false, marked, errors);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------

    fn find_action(&self, state: usize, ch: u32, tab: &Tab) -> Option<usize> {
        self.states[state].actions.iter().position(|a| match a.kind {
            ActionKind::Chr => ch == a.sym,
            ActionKind::Clas => tab.char_class_set(a.sym).get(ch),
        })
    }

    /// Folds the quoted literal `s` into the automaton and attaches `sym`
    /// as its token, demoting class tokens where the literal is carved out
    /// of one.
    pub fn match_literal(
        &mut self,
        tab: &mut Tab,
        s: &str,
        sym: SymId,
        errors: &mut Diagnostics,
    ) {
        let unescaped = match Tab::unescape(Tab::strip_quotes(s)) {
            Ok(s) => s,
            Err(msg) => {
                errors.error(msg).emit();
                return;
            }
        };
        let chars: Vec<char> = unescaped.chars().collect();
        let len = chars.len();

        // Try to match against the existing machine.
        let mut state = 0usize;
        let mut i = 0usize;
        let mut matched_action: Option<(usize, usize)> = None; // (state, action)
        while i < len {
            match self.find_action(state, chars[i] as u32, tab) {
                Some(a) => {
                    matched_action = Some((state, a));
                    state = self.states[state].actions[a].targets[0];
                    i += 1;
                }
                None => break,
            }
        }

        // Not fully recognised, or recognised into a non-final state: build
        // the literal as a fresh chr chain from the start state and let the
        // next determinisation merge the shared prefix.
        if i != len || self.states[state].end_of.is_none() {
            state = 0;
            i = 0;
            matched_action = None;
            self.dirty = true;
            while i < len {
                let to = self.new_state();
                self.new_transition(
                    state,
                    to,
                    ActionKind::Chr,
                    chars[i] as u32,
                    TransKind::Normal,
                    errors,
                );
                state = to;
                i += 1;
            }
        }

        match self.states[state].end_of {
            None => self.states[state].end_of = Some(sym),
            Some(matched_sym) => {
                let matched_kind = tab.sym(matched_sym).token_kind;
                let context_hit = matched_action
                    .map(|(s, a)| self.states[s].actions[a].tc == TransKind::Context)
                    .unwrap_or(false);
                if matched_kind == crate::tab::TokenKind::FixedToken || context_hit {
                    // A fixed token, or a token whose appendix would be cut
                    // off: the two spellings collide.
                    errors
                        .error(format!(
                            "tokens {} and {} cannot be distinguished",
                            tab.sym(sym).name,
                            tab.sym(matched_sym).name
                        ))
                        .emit();
                } else {
                    tab.sym_mut(matched_sym).token_kind = crate::tab::TokenKind::ClassLitToken;
                    tab.sym_mut(sym).token_kind = crate::tab::TokenKind::LitToken;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Determinisation
    // ------------------------------------------------------------------

    pub fn make_deterministic(&mut self, tab: &mut Tab, errors: &mut Diagnostics) -> Result<()> {
        self.last_sim_state = self.states.len() - 1;
        self.find_ctx_states();
        for state in 0..self.states.len() {
            self.make_unique(state, tab);
        }
        let mut state = 0;
        while state < self.states.len() {
            self.melt_states(state, tab, errors)?;
            state += 1;
        }
        self.delete_redundant_states()?;
        self.combine_shifts(tab);
        self.dirty = false;
        Ok(())
    }

    /// Marks every target of a context transition.
    fn find_ctx_states(&mut self) {
        let mut ctx_targets = Vec::new();
        for state in &self.states {
            for a in &state.actions {
                if a.tc == TransKind::Context {
                    ctx_targets.extend(a.targets.iter().copied());
                }
            }
        }
        for t in ctx_targets {
            self.states[t].ctx = true;
        }
    }

    fn overlap(&self, a: &Action, b: &Action, tab: &Tab) -> bool {
        match (a.kind, b.kind) {
            (ActionKind::Chr, ActionKind::Chr) => a.sym == b.sym,
            (ActionKind::Chr, ActionKind::Clas) => tab.char_class_set(b.sym).get(a.sym),
            (ActionKind::Clas, ActionKind::Chr) => tab.char_class_set(a.sym).get(b.sym),
            (ActionKind::Clas, ActionKind::Clas) => {
                tab.char_class_set(a.sym).intersects(tab.char_class_set(b.sym))
            }
        }
    }

    /// Splits the overlapping pair `(a, b)` of `state` so that no input
    /// fires both.
    fn split_actions(&mut self, state: usize, a: usize, b: usize, tab: &mut Tab) {
        let seta = self.states[state].actions[a].symbols(tab);
        let setb = self.states[state].actions[b].symbols(tab);

        if seta == setb {
            let action_b = self.states[state].actions[b].clone();
            self.states[state].actions[a].add_targets(&action_b);
            self.states[state].actions.remove(b);
        } else if seta.includes(&setb) {
            let mut setc = seta.clone();
            setc.subtract(&setb);
            let action_a = self.states[state].actions[a].clone();
            self.states[state].actions[b].add_targets(&action_a);
            self.states[state].actions[a].shift_with(&setc, tab);
        } else if setb.includes(&seta) {
            let mut setc = setb.clone();
            setc.subtract(&seta);
            let action_b = self.states[state].actions[b].clone();
            self.states[state].actions[a].add_targets(&action_b);
            self.states[state].actions[b].shift_with(&setc, tab);
        } else {
            let mut setc = seta.clone();
            setc.intersect(&setb);
            let mut rest_a = seta;
            rest_a.subtract(&setc);
            let mut rest_b = setb;
            rest_b.subtract(&setc);

            let mut c = Action::new(ActionKind::Chr, 0, TransKind::Normal);
            let action_a = self.states[state].actions[a].clone();
            let action_b = self.states[state].actions[b].clone();
            c.add_targets(&action_a);
            c.add_targets(&action_b);
            self.states[state].actions[a].shift_with(&rest_a, tab);
            self.states[state].actions[b].shift_with(&rest_b, tab);
            c.shift_with(&setc, tab);
            self.states[state].add_action(c);
        }
    }

    /// Repeats splitting until no two actions of `state` overlap.
    fn make_unique(&mut self, state: usize, tab: &mut Tab) {
        loop {
            let mut changed = false;
            'outer: for a in 0..self.states[state].actions.len() {
                for b in a + 1..self.states[state].actions.len() {
                    let overlap = {
                        let actions = &self.states[state].actions;
                        self.overlap(&actions[a], &actions[b], tab)
                    };
                    if overlap {
                        self.split_actions(state, a, b, tab);
                        changed = true;
                        break 'outer;
                    }
                }
            }
            if !changed {
                return;
            }
        }
    }

    fn melted_set(&self, nr: usize) -> Result<&BTreeSet<usize>> {
        self.melted
            .iter()
            .find(|m| m.state == nr)
            .map(|m| &m.set)
            .ok_or_else(|| Error::Internal(format!("compiler error: no melted set for state {nr}")))
    }

    /// Union of the NFA states behind an action's targets, with the merged
    /// accepting symbol and context flag.
    fn get_target_states(
        &self,
        tab: &Tab,
        action: &Action,
        errors: &mut Diagnostics,
    ) -> Result<(BTreeSet<usize>, Option<SymId>, bool)> {
        let mut targets = BTreeSet::new();
        let mut end_of: Option<SymId> = None;
        let mut ctx = false;
        for &t in &action.targets {
            if t <= self.last_sim_state {
                targets.insert(t);
            } else {
                targets.extend(self.melted_set(t)?.iter().copied());
            }
            if let Some(e) = self.states[t].end_of {
                match end_of {
                    None => end_of = Some(e),
                    Some(prev) if prev == e => {}
                    Some(prev) => {
                        errors
                            .error(format!(
                                "Tokens {} and {} cannot be distinguished",
                                tab.sym(prev).name,
                                tab.sym(e).name
                            ))
                            .emit();
                    }
                }
            }
            if self.states[t].ctx {
                ctx = true;
            }
        }
        Ok((targets, end_of, ctx))
    }

    /// Replaces every multi-target action of `state` with a single target
    /// to a melted state.
    fn melt_states(&mut self, state: usize, tab: &mut Tab, errors: &mut Diagnostics) -> Result<()> {
        for i in 0..self.states[state].actions.len() {
            if self.states[state].actions[i].targets.len() <= 1 {
                continue;
            }
            let action = self.states[state].actions[i].clone();
            let (targets, end_of, ctx) = self.get_target_states(tab, &action, errors)?;

            let melt_state = match self.melted.iter().find(|m| m.set == targets) {
                Some(m) => m.state,
                None => {
                    let s = self.new_state();
                    self.states[s].end_of = end_of;
                    self.states[s].ctx = ctx;
                    for &t in &action.targets {
                        let source = self.states[t].clone();
                        self.states[s].melt_with(&source);
                    }
                    self.make_unique(s, tab);
                    self.melted.push(Melted {
                        set: targets,
                        state: s,
                    });
                    s
                }
            };
            self.states[state].actions[i].targets = vec![melt_state];
        }
        Ok(())
    }

    fn find_used_states(&self, state: usize, used: &mut Vec<bool>) {
        if used[state] {
            return;
        }
        used[state] = true;
        for a in &self.states[state].actions {
            for &t in &a.targets {
                self.find_used_states(t, used);
            }
        }
    }

    /// Drops unreachable states, collapses equal accepting end states, and
    /// renumbers densely.
    fn delete_redundant_states(&mut self) -> Result<()> {
        let n = self.states.len();
        let mut used = vec![false; n];
        self.find_used_states(0, &mut used);
        // One mapping slot per state, including the last one.
        let mut new_state: Vec<Option<usize>> = vec![None; n];

        // Equal final states collapse onto the first representative; the
        // initial state can never be final.
        for s1 in 1..n {
            if used[s1]
                && self.states[s1].end_of.is_some()
                && self.states[s1].actions.is_empty()
                && !self.states[s1].ctx
            {
                for s2 in s1 + 1..n {
                    if used[s2]
                        && self.states[s1].end_of == self.states[s2].end_of
                        && self.states[s2].actions.is_empty()
                        && !self.states[s2].ctx
                    {
                        used[s2] = false;
                        new_state[s2] = Some(s1);
                    }
                }
            }
        }

        // Reroute edges into collapsed states.
        for state in 0..n {
            if !used[state] {
                continue;
            }
            for a in 0..self.states[state].actions.len() {
                for t in 0..self.states[state].actions[a].targets.len() {
                    let target = self.states[state].actions[a].targets[t];
                    if !used[target] {
                        let redirected = new_state[target].ok_or_else(|| {
                            Error::Internal(format!(
                                "compiler error: dropped state {target} has no replacement"
                            ))
                        })?;
                        self.states[state].actions[a].targets[t] = redirected;
                    }
                }
            }
        }

        // Compact and renumber densely; state 0 stays first.
        let mut mapping: Vec<Option<usize>> = vec![None; n];
        let mut compacted = Vec::with_capacity(n);
        for (old, state) in self.states.drain(..).enumerate() {
            if used[old] {
                mapping[old] = Some(compacted.len());
                compacted.push(state);
            }
        }
        for state in &mut compacted {
            for a in &mut state.actions {
                for t in &mut a.targets {
                    *t = mapping[*t].ok_or_else(|| {
                        Error::Internal(format!("compiler error: unmapped target state {t}"))
                    })?;
                }
            }
        }
        self.states = compacted;
        self.melted.clear();
        Ok(())
    }

    /// Merges actions of a state that shift to the same target with the
    /// same transition code.
    fn combine_shifts(&mut self, tab: &mut Tab) {
        for state in 0..self.states.len() {
            let mut a = 0;
            while a < self.states[state].actions.len() {
                let mut b = a + 1;
                while b < self.states[state].actions.len() {
                    let same = {
                        let actions = &self.states[state].actions;
                        actions[a].targets == actions[b].targets && actions[a].tc == actions[b].tc
                    };
                    if same {
                        let mut seta = self.states[state].actions[a].symbols(tab);
                        let setb = self.states[state].actions[b].symbols(tab);
                        seta.union(&setb);
                        self.states[state].actions[a].shift_with(&seta, tab);
                        self.states[state].actions.remove(b);
                    } else {
                        b += 1;
                    }
                }
                a += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Flattens a comment delimiter graph to its spelling.
    fn comment_str(&self, tab: &Tab, p: Option<NodeId>, errors: &mut Diagnostics) -> String {
        let mut s = String::new();
        let mut p = p;
        while let Some(id) = p {
            let node = tab.node(id);
            match node.kind {
                NodeKind::Chr => {
                    s.push(char::from_u32(node.val).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                NodeKind::Clas => {
                    let set = tab.char_class_set(node.val);
                    if set.elements() != 1 {
                        errors
                            .error("character set contains more than 1 character")
                            .emit();
                    }
                    if let Some(first) = set.first() {
                        s.push(char::from_u32(first).unwrap_or(char::REPLACEMENT_CHARACTER));
                    }
                }
                _ => {
                    errors.error("comment delimiters may not be structured").emit();
                }
            }
            p = node.next;
        }
        if s.is_empty() || s.chars().count() > 2 {
            errors
                .error("comment delimiters must be 1 or 2 characters long")
                .emit();
            s = "?".into();
        }
        s
    }

    pub fn new_comment(
        &mut self,
        tab: &Tab,
        from: Option<NodeId>,
        to: Option<NodeId>,
        nested: bool,
        errors: &mut Diagnostics,
    ) {
        let start = self.comment_str(tab, from, errors);
        let stop = self.comment_str(tab, to, errors);
        self.comments.push(Comment {
            start,
            stop,
            nested,
        });
    }

    // ------------------------------------------------------------------
    // Trace dump
    // ------------------------------------------------------------------

    pub fn print_states(&self, tab: &Tab, trace: &mut Trace) {
        trace.newline();
        trace.write_line("---------- states ----------");
        for (nr, state) in self.states.iter().enumerate() {
            match state.end_of {
                None => trace.write("               "),
                Some(sym) => {
                    trace.write(&format!("E({})", Trace::format_string(&tab.sym(sym).name, -12)))
                }
            }
            trace.write_w(&format!("{nr}:"), 3);
            if state.actions.is_empty() {
                trace.newline();
            }
            let mut first = true;
            for action in &state.actions {
                if first {
                    trace.write(" ");
                    first = false;
                } else {
                    trace.write("                    ");
                }
                match action.kind {
                    ActionKind::Clas => trace.write(&tab.classes[action.sym as usize].name),
                    ActionKind::Chr => trace.write(&Tab::escape(
                        &char::from_u32(action.sym)
                            .unwrap_or(char::REPLACEMENT_CHARACTER)
                            .to_string(),
                    )),
                }
                for &t in &action.targets {
                    trace.write(&format!(" {t}"));
                }
                if action.tc == TransKind::Context {
                    trace.write_line(" context");
                } else {
                    trace.newline();
                }
            }
        }
        trace.newline();
        trace.write_line("---------- character classes ----------");
        tab.write_char_classes(trace);
    }
}

impl Default for Dfa {
    fn default() -> Self {
        Self::new()
    }
}
