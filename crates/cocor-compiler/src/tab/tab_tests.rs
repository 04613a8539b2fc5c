use cocor_core::CharSet;

use super::*;
use crate::diagnostics::Diagnostics;

fn tab() -> (Tab, Diagnostics) {
    (Tab::new(), Diagnostics::new())
}

#[test]
fn eof_is_the_first_terminal() {
    let (tab, _) = tab();
    assert_eq!(tab.terminals.len(), 1);
    assert_eq!(tab.sym(tab.eof_sy).name, "EOF");
    assert_eq!(tab.sym(tab.eof_sy).n, 0);
}

#[test]
fn symbol_numbers_are_dense_per_kind() {
    let (mut tab, mut errors) = tab();
    let a = tab.new_sym(SymKind::Terminal, "a", 1, &mut errors);
    let b = tab.new_sym(SymKind::Terminal, "b", 2, &mut errors);
    let p = tab.new_sym(SymKind::Pragma, "opt", 3, &mut errors);
    let x = tab.new_sym(SymKind::Nonterminal, "X", 4, &mut errors);
    let y = tab.new_sym(SymKind::Nonterminal, "Y", 5, &mut errors);

    assert_eq!(tab.sym(a).n, 1);
    assert_eq!(tab.sym(b).n, 2);
    assert_eq!(tab.sym(x).n, 0);
    assert_eq!(tab.sym(y).n, 1);

    // pragmas are numbered above all terminals, after noSym exists
    let no_sym = tab.new_sym(SymKind::Terminal, "???", 0, &mut errors);
    tab.renumber_pragmas();
    assert_eq!(tab.sym(no_sym).n, 3);
    assert_eq!(tab.sym(p).n, 4);
    assert!(errors.is_empty());
}

#[test]
fn empty_literal_is_rejected() {
    let (mut tab, mut errors) = tab();
    let sym = tab.new_sym(SymKind::Terminal, "\"\"", 1, &mut errors);
    assert_eq!(tab.sym(sym).name, "???");
    assert_eq!(errors.error_count(), 1);
}

#[test]
fn find_sym_searches_terminals_then_nonterminals() {
    let (mut tab, mut errors) = tab();
    let a = tab.new_sym(SymKind::Terminal, "a", 1, &mut errors);
    let x = tab.new_sym(SymKind::Nonterminal, "X", 2, &mut errors);
    tab.new_sym(SymKind::Pragma, "pragma", 3, &mut errors);
    assert_eq!(tab.find_sym("a"), Some(a));
    assert_eq!(tab.find_sym("X"), Some(x));
    assert_eq!(tab.find_sym("pragma"), None);
    assert_eq!(tab.find_sym("missing"), None);
}

#[test]
fn str_to_graph_builds_a_chr_chain() {
    let (mut tab, mut errors) = tab();
    let g = tab.str_to_graph("\"ab\"", &mut errors);
    let l = g.l.unwrap();
    assert_eq!(tab.node(l).kind, NodeKind::Chr);
    assert_eq!(tab.node(l).val, 'a' as u32);
    let second = tab.node(l).next.unwrap();
    assert_eq!(tab.node(second).val, 'b' as u32);
    assert_eq!(g.r, Some(second));
    assert!(errors.is_empty());

    let mut empty = Diagnostics::new();
    tab.str_to_graph("\"\"", &mut empty);
    assert_eq!(empty.error_count(), 1);
}

#[test]
fn sequence_links_open_ends() {
    let (mut tab, mut errors) = tab();
    let mut g1 = tab.str_to_graph("\"a\"", &mut errors);
    let mut g2 = tab.str_to_graph("\"b\"", &mut errors);
    let a = g1.l.unwrap();
    let b = g2.l.unwrap();
    tab.make_sequence(&mut g1, &mut g2);
    assert_eq!(tab.node(a).next, Some(b));
    assert_eq!(g1.r, Some(b));
}

#[test]
fn alternative_chains_via_down() {
    let (mut tab, mut errors) = tab();
    let mut g1 = tab.str_to_graph("\"a\"", &mut errors);
    let mut g2 = tab.str_to_graph("\"b\"", &mut errors);
    tab.make_first_alt(&mut g1);
    let alt1 = g1.l.unwrap();
    assert_eq!(tab.node(alt1).kind, NodeKind::Alt);

    tab.make_alternative(&mut g1, &mut g2);
    let alt2 = tab.node(alt1).down.unwrap();
    assert_eq!(tab.node(alt2).kind, NodeKind::Alt);
    assert!(tab.node(alt2).up);

    tab.finish(&mut g1);
    // both branches terminate their substructure
    let a = tab.node(alt1).sub.unwrap();
    let b = tab.node(alt2).sub.unwrap();
    assert!(tab.node(a).up || tab.node(a).next.is_none());
    assert!(tab.node(b).up || tab.node(b).next.is_none());
}

#[test]
fn iteration_loops_back() {
    let (mut tab, mut errors) = tab();
    let mut g = tab.str_to_graph("\"x\"", &mut errors);
    let x = g.l.unwrap();
    tab.make_iteration(&mut g);
    let iter = g.l.unwrap();
    assert_eq!(tab.node(iter).kind, NodeKind::Iter);
    assert_eq!(tab.node(iter).sub, Some(x));
    // the body's open end loops back to the iteration node
    assert_eq!(tab.node(x).next, Some(iter));
    assert!(tab.node(x).up);
}

#[test]
fn deletability_of_structures() {
    let (mut tab, mut errors) = tab();
    let mut g = tab.str_to_graph("\"x\"", &mut errors);
    let x = g.l.unwrap();
    assert!(!tab.del_node(x));

    tab.make_option(&mut g);
    let opt = g.l.unwrap();
    assert!(tab.del_node(opt));

    let eps = tab.new_node(NodeKind::Eps, NodeArg::None, 0);
    assert!(tab.del_node(eps));
    assert!(tab.del_graph(Some(eps)));
    assert!(tab.del_graph(None));
}

#[test]
fn context_trans_marks_scanner_nodes() {
    let (mut tab, mut errors) = tab();
    let g = tab.str_to_graph("\"ab\"", &mut errors);
    tab.set_context_trans(g.l);
    let a = g.l.unwrap();
    let b = tab.node(a).next.unwrap();
    assert_eq!(tab.node(a).code, TransKind::Context);
    assert_eq!(tab.node(b).code, TransKind::Context);
}

#[test]
fn dummy_class_names_are_monotone() {
    let (mut tab, _) = tab();
    let c1 = tab.new_char_class("#", CharSet::new());
    let c2 = tab.new_char_class("#", CharSet::new());
    let named = tab.new_char_class("digit", CharSet::new());
    assert_eq!(tab.classes[c1.0].name, "#A");
    assert_eq!(tab.classes[c2.0].name, "#B");
    assert_eq!(tab.classes[named.0].name, "digit");
    assert_eq!(tab.find_char_class_by_name("digit"), Some(named));
}

#[test]
fn find_char_class_by_set_compares_values() {
    let (mut tab, _) = tab();
    let mut s = CharSet::new();
    s.set('a' as u32);
    let c = tab.new_char_class("small", s.clone());
    assert_eq!(tab.find_char_class_by_set(&s), Some(c));
    let mut other = CharSet::new();
    other.set('b' as u32);
    assert_eq!(tab.find_char_class_by_set(&other), None);
}

#[test]
fn unescape_resolves_standard_escapes() {
    assert_eq!(Tab::unescape(r"a\nb\tc").unwrap(), "a\nb\tc");
    assert_eq!(Tab::unescape(r"\\").unwrap(), "\\");
    assert_eq!(Tab::unescape(r"\'").unwrap(), "'");
    assert_eq!(Tab::unescape(r#"\""#).unwrap(), "\"");
    assert_eq!(Tab::unescape(r"A").unwrap(), "A");
    assert_eq!(Tab::unescape(r"\x0041").unwrap(), "A");
    assert_eq!(Tab::unescape(r"\0").unwrap(), "\0");
}

#[test]
fn unescape_rejects_malformed_sequences() {
    assert!(Tab::unescape(r"\q").is_err());
    assert!(Tab::unescape(r"\u00").is_err());
    assert!(Tab::unescape(r"\uZZZZ").is_err());
    assert!(Tab::unescape("\\").is_err());
    // beyond the BMP
    assert!(Tab::unescape(r"\uD800").is_err());
}

#[test]
fn escape_round_trips_well_formed_literals() {
    for s in [r"a\nb", r"\\", r"\'", r"\t", r"hello", r"\u00FF"] {
        let unescaped = Tab::unescape(s).unwrap();
        assert_eq!(Tab::escape(&unescaped), s, "round trip of {s}");
    }
}

#[test]
fn ddt_letters_match_digits() {
    let (mut by_letter, _) = tab();
    let (mut by_digit, _) = tab();
    by_letter.set_ddt("AGS");
    by_digit.set_ddt("026");
    assert_eq!(by_letter.ddt, by_digit.ddt);

    let (mut all, _) = tab();
    all.set_ddt("afgijpsx");
    for i in [0, 1, 2, 3, 4, 6, 7, 8] {
        assert!(all.ddt[i], "flag {i}");
    }
    assert!(!all.ddt[5]);
}

#[test]
fn options_set_namespace_and_check_eof() {
    let (mut tab, _) = tab();
    tab.set_option("$namespace=My.Grammar");
    tab.set_option("$namespace=Other");
    assert_eq!(tab.ns_name.as_deref(), Some("My.Grammar"));
    tab.set_option("$checkEOF=true");
    assert!(tab.check_eof);
    tab.set_option("$checkEOF=false");
    assert!(!tab.check_eof);
}

#[test]
fn delete_nodes_resets_the_arena() {
    let (mut tab, mut errors) = tab();
    tab.str_to_graph("\"abc\"", &mut errors);
    assert!(tab.nodes.len() > 1);
    tab.delete_nodes();
    assert_eq!(tab.nodes.len(), 1); // fresh dummy node only
}
