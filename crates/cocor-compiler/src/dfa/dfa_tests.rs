use indoc::indoc;

use super::*;
use crate::pipeline::{Compilation, Compiler};
use crate::tab::TokenKind;

fn compile(src: &str) -> Compilation {
    Compiler::from_source("test.atg", src).run().unwrap()
}

fn messages(out: &Compilation) -> Vec<String> {
    out.diagnostics.iter().map(|d| d.message.clone()).collect()
}

/// Runs `input` through the automaton from the initial state; returns the
/// accepting symbol when every character shifted and the final state
/// accepts.
fn walk(out: &Compilation, input: &str) -> Option<String> {
    let mut state = 0usize;
    for c in input.chars() {
        let action = out.dfa.states[state]
            .actions
            .iter()
            .find(|a| match a.kind {
                ActionKind::Chr => a.sym == c as u32,
                ActionKind::Clas => out.tab.char_class_set(a.sym).get(c as u32),
            })?;
        state = *action.targets.first()?;
    }
    let sym = out.dfa.states[state].end_of?;
    Some(out.tab.sym(sym).name.clone())
}

const HELLO: &str = indoc! {r#"
    COMPILER G
    CHARACTERS
      letter = 'a'..'z'.
    TOKENS
      ident = letter {letter}.
    PRODUCTIONS
      G = ident.
    END G.
"#};

#[test]
fn hello_grammar_builds_a_two_state_machine() {
    let out = compile(HELLO);
    assert!(out.is_valid());
    assert!(out.diagnostics.is_empty(), "got {:?}", messages(&out));

    assert_eq!(out.dfa.states.len(), 2);
    let accepting: Vec<_> = out
        .dfa
        .states
        .iter()
        .filter(|s| s.end_of.is_some())
        .collect();
    assert_eq!(accepting.len(), 1, "exactly one accepting state for ident");

    assert_eq!(walk(&out, "a").as_deref(), Some("ident"));
    assert_eq!(walk(&out, "hello").as_deref(), Some("ident"));
    assert_eq!(walk(&out, "a9"), None);
    assert_eq!(walk(&out, ""), None);
}

#[test]
fn determinised_states_have_disjoint_actions() {
    let out = compile(indoc! {r#"
        COMPILER G
        CHARACTERS
          letter = 'a'..'z'.
          digit = '0'..'9'.
          hex = '0'..'9' + 'a'..'f'.
        TOKENS
          ident = letter {letter | digit}.
          number = digit {digit}.
          hexnum = "0x" hex {hex}.
        PRODUCTIONS
          G = ident | number | hexnum.
        END G.
    "#});
    assert!(out.is_valid(), "got {:?}", messages(&out));

    for (nr, state) in out.dfa.states.iter().enumerate() {
        for i in 0..state.actions.len() {
            for j in i + 1..state.actions.len() {
                let a = state.actions[i].symbols(&out.tab);
                let b = state.actions[j].symbols(&out.tab);
                assert!(
                    !a.intersects(&b),
                    "state {nr}: actions {i} and {j} overlap"
                );
            }
        }
    }

    assert_eq!(walk(&out, "abc").as_deref(), Some("ident"));
    assert_eq!(walk(&out, "42").as_deref(), Some("number"));
    assert_eq!(walk(&out, "0xff").as_deref(), Some("hexnum"));
    // "0x" alone is only a number prefix followed by nothing valid
    assert_eq!(walk(&out, "0x"), None);
    assert_eq!(walk(&out, "0").as_deref(), Some("number"));
}

#[test]
fn literal_carved_out_of_a_class_token_demotes_both() {
    let out = compile(indoc! {r#"
        COMPILER G
        CHARACTERS
          letter = 'a'..'z'.
        TOKENS
          ident = letter {letter}.
        PRODUCTIONS
          G = "if" ident.
        END G.
    "#});
    assert!(out.is_valid(), "got {:?}", messages(&out));

    let ident = out.tab.find_sym("ident").unwrap();
    let if_sym = out.tab.find_sym("\"if\"").unwrap();
    assert_eq!(out.tab.sym(ident).token_kind, TokenKind::ClassLitToken);
    assert_eq!(out.tab.sym(if_sym).token_kind, TokenKind::LitToken);
    // the machine itself still recognises the spelling as an ident
    assert_eq!(walk(&out, "if").as_deref(), Some("ident"));
}

#[test]
fn literal_declared_first_extends_the_machine() {
    let out = compile(indoc! {r#"
        COMPILER G
        TOKENS
          begin = "begin".
        PRODUCTIONS
          G = begin.
        END G.
    "#});
    assert!(out.is_valid(), "got {:?}", messages(&out));
    assert_eq!(walk(&out, "begin").as_deref(), Some("begin"));
    assert_eq!(walk(&out, "beg"), None);
    let begin = out.tab.find_sym("begin").unwrap();
    assert_eq!(out.tab.sym(begin).token_kind, TokenKind::FixedToken);
    assert_eq!(out.tab.literals.get("\"begin\""), Some(&begin));
}

#[test]
fn shared_prefixes_merge_during_determinisation() {
    let out = compile(indoc! {r#"
        COMPILER G
        TOKENS
          t1 = "then".
          t2 = "them".
        PRODUCTIONS
          G = t1 | t2.
        END G.
    "#});
    assert!(out.is_valid(), "got {:?}", messages(&out));
    assert_eq!(walk(&out, "then").as_deref(), Some("t1"));
    assert_eq!(walk(&out, "them").as_deref(), Some("t2"));
    assert_eq!(walk(&out, "the"), None);

    // the shared prefix occupies one path: t-h-e plus the two tails and
    // the initial state
    assert_eq!(out.dfa.states.len(), 6);
}

#[test]
fn indistinguishable_fixed_tokens_are_an_error() {
    let out = compile(indoc! {r#"
        COMPILER G
        TOKENS
          t1 = "if".
          t2 = "if".
        PRODUCTIONS
          G = t1.
        END G.
    "#});
    assert!(!out.is_valid());
    let msgs = messages(&out);
    assert!(
        msgs.iter().any(|m| m.contains("token string declared twice")),
        "got {msgs:?}"
    );
    assert!(
        msgs.iter()
            .any(|m| m.contains("tokens t2 and t1 cannot be distinguished")),
        "got {msgs:?}"
    );
}

#[test]
fn deletable_token_graphs_are_rejected() {
    let out = compile(indoc! {r#"
        COMPILER G
        CHARACTERS
          letter = 'a'..'z'.
        TOKENS
          tok = [letter].
        PRODUCTIONS
          G = tok.
        END G.
    "#});
    assert!(
        messages(&out)
            .iter()
            .any(|m| m.contains("token might be empty")),
        "got {:?}",
        messages(&out)
    );
}

#[test]
fn deletable_iteration_bodies_are_rejected() {
    let out = compile(indoc! {r#"
        COMPILER G
        CHARACTERS
          letter = 'a'..'z'.
        TOKENS
          tok = letter {[letter]}.
        PRODUCTIONS
          G = tok.
        END G.
    "#});
    assert!(
        messages(&out)
            .iter()
            .any(|m| m.contains("contents of {...} must not be deletable")),
        "got {:?}",
        messages(&out)
    );
}

#[test]
fn token_opening_with_an_iteration_is_rejected() {
    let out = compile(indoc! {r#"
        COMPILER G
        CHARACTERS
          letter = 'a'..'z'.
          digit = '0'..'9'.
        TOKENS
          tok = {digit} letter.
        PRODUCTIONS
          G = tok.
        END G.
    "#});
    assert!(
        messages(&out)
            .iter()
            .any(|m| m.contains("token must not start with an iteration")),
        "got {:?}",
        messages(&out)
    );
}

#[test]
fn context_transition_marks_states() {
    let out = compile(indoc! {r#"
        COMPILER G
        CHARACTERS
          digit = '0'..'9'.
        TOKENS
          number = digit {digit}.
          range = digit {digit} CONTEXT ("..").
        PRODUCTIONS
          G = number | range.
        END G.
    "#});
    assert!(out.dfa.has_ctx_moves);
    assert!(
        out.dfa.states.iter().any(|s| s.ctx),
        "some state sits inside the context appendix"
    );
    // "12.." is a range whose appendix is pushed back by the scanner
    assert_eq!(walk(&out, "12..").as_deref(), Some("range"));
    assert_eq!(walk(&out, "12").as_deref(), Some("number"));
}

#[test]
fn comments_keep_registration_order() {
    let out = compile(indoc! {r#"
        COMPILER G
        COMMENTS FROM "/*" TO "*/" NESTED
        COMMENTS FROM "//" TO '\n'
        PRODUCTIONS
          G = "a".
        END G.
    "#});
    assert!(out.is_valid(), "got {:?}", messages(&out));
    let comments = &out.dfa.comments;
    assert_eq!(comments.len(), 2);
    assert_eq!((comments[0].start.as_str(), comments[0].stop.as_str()), ("/*", "*/"));
    assert!(comments[0].nested);
    assert_eq!((comments[1].start.as_str(), comments[1].stop.as_str()), ("//", "\n"));
    assert!(!comments[1].nested);
}

#[test]
fn long_comment_delimiters_are_rejected() {
    let out = compile(indoc! {r#"
        COMPILER G
        COMMENTS FROM "/**" TO "*/"
        PRODUCTIONS
          G = "a".
        END G.
    "#});
    assert!(
        messages(&out)
            .iter()
            .any(|m| m.contains("comment delimiters must be 1 or 2 characters long")),
        "got {:?}",
        messages(&out)
    );
}

#[test]
fn ignore_case_folds_literals() {
    let out = compile(indoc! {r#"
        COMPILER G
        IGNORECASE
        TOKENS
          if_ = "IF".
        PRODUCTIONS
          G = if_.
        END G.
    "#});
    assert!(out.is_valid(), "got {:?}", messages(&out));
    // the literal is declared folded, so the machine matches "if"
    assert_eq!(walk(&out, "if").as_deref(), Some("if_"));
    assert!(out.tab.literals.contains_key("\"if\""));
}
