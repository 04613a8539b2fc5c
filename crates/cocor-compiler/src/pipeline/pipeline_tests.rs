use std::fs;

use indoc::indoc;

use super::*;
use crate::emit::{Generator, ParserEmitter};

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
fn a_clean_grammar_produces_no_diagnostics_and_no_trace() {
    let out = Compiler::from_source("hello.atg", HELLO).run().unwrap();
    assert!(out.is_valid());
    assert_eq!(out.error_count(), 0);
    assert!(out.diagnostics.is_empty());
    assert_eq!(out.trace_path, None);
}

#[test]
fn grammar_errors_block_analysis_and_generation() {
    let out = Compiler::from_source(
        "bad.atg",
        indoc! {r#"
            COMPILER G
            TOKENS
              tok = "".
            PRODUCTIONS
              G = tok.
            END G.
        "#},
    )
    .run()
    .unwrap();
    assert!(!out.is_valid());
    assert!(out.error_count() > 0);
    assert!(!out.grammar_ok);
}

#[test]
fn bom_prefixed_grammars_compile() {
    let source = format!("\u{FEFF}{HELLO}");
    let out = Compiler::from_source("bom.atg", source).run().unwrap();
    assert!(out.is_valid());
}

#[test]
fn crlf_line_endings_compile() {
    let source = HELLO.replace('\n', "\r\n");
    let out = Compiler::from_source("crlf.atg", source).run().unwrap();
    assert!(out.is_valid());
}

#[test]
fn missing_grammar_file_is_fatal() {
    let result = Compiler::new("/nonexistent/definitely-missing.atg").run();
    assert!(result.is_err());
}

#[test]
fn compiles_from_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.atg");
    fs::write(&path, HELLO).unwrap();
    let out = Compiler::new(&path).run().unwrap();
    assert!(out.is_valid());
}

#[test]
fn trace_switches_produce_the_requested_dumps() {
    let dir = tempfile::tempdir().unwrap();
    let out = Compiler::from_source("traced.atg", HELLO)
        .out_dir(dir.path())
        .trace_switches("ASP")
        .run()
        .unwrap();
    assert!(out.is_valid());
    let path = out.trace_path.expect("trace written");
    assert_eq!(path, dir.path().join("trace.txt"));
    let trace = fs::read_to_string(path).unwrap();
    assert!(trace.contains("---------- states ----------"));
    assert!(trace.contains("Symbol Table:"));
    assert!(trace.contains("Statistics:"));
    assert!(trace.contains("terminals"));
}

#[test]
fn namespace_and_check_eof_reach_the_grammar_store() {
    let out = Compiler::from_source("ns.atg", HELLO)
        .namespace("My.Gen")
        .run()
        .unwrap();
    assert_eq!(out.tab.ns_name.as_deref(), Some("My.Gen"));
}

#[test]
fn emitters_drive_frame_files_through_the_generator() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("Parser.frame"),
        "// parser for -->grammar\n-->end",
    )
    .unwrap();

    struct Backend;
    impl ParserEmitter for Backend {
        fn write_parser(&mut self, tab: &crate::tab::Tab) -> crate::Result<()> {
            let mut generator = Generator::new(tab);
            generator.open_frame("Parser.frame")?;
            generator.open_gen("parser.rs")?;
            generator.copy_frame_part("-->grammar")?;
            let gram = tab.gram_sy.map(|id| tab.sym(id).name.clone());
            generator.write(gram.as_deref().unwrap_or("?"))?;
            generator.copy_frame_part("-->end")?;
            generator.copy_frame_tail()?;
            generator.close()
        }
    }

    let out = Compiler::from_source("g.atg", HELLO)
        .frames_dir(dir.path())
        .out_dir(dir.path())
        .parser_emitter(Box::new(Backend))
        .run()
        .unwrap();
    assert!(out.is_valid());

    let generated = fs::read_to_string(dir.path().join("parser.rs")).unwrap();
    assert_eq!(generated, "// parser for G\n");
}

#[test]
fn emitters_are_skipped_when_the_grammar_is_broken() {
    struct Panicking;
    impl ParserEmitter for Panicking {
        fn write_parser(&mut self, _tab: &crate::tab::Tab) -> crate::Result<()> {
            panic!("must not emit for a broken grammar");
        }
    }

    let out = Compiler::from_source(
        "bad.atg",
        indoc! {r#"
            COMPILER G
            PRODUCTIONS
              G = Undefined.
            END G.
        "#},
    )
    .parser_emitter(Box::new(Panicking))
    .run()
    .unwrap();
    assert!(!out.is_valid());
}

#[test]
fn literals_referenced_in_productions_redeterminise_the_machine() {
    // ":=" only appears in the productions, after the TOKENS section was
    // already determinised; the pipeline must fold it in cleanly.
    let out = Compiler::from_source(
        "kw.atg",
        indoc! {r#"
            COMPILER G
            CHARACTERS
              letter = 'a'..'z'.
            TOKENS
              ident = letter {letter}.
            PRODUCTIONS
              G = ident ":=" ident.
            END G.
        "#},
    )
    .run()
    .unwrap();
    assert!(out.is_valid());
    assert!(!out.dfa.dirty);
    for (nr, state) in out.dfa.states.iter().enumerate() {
        for i in 0..state.actions.len() {
            for j in i + 1..state.actions.len() {
                let a = state.actions[i].symbols(&out.tab);
                let b = state.actions[j].symbols(&out.tab);
                assert!(!a.intersects(&b), "state {nr} has overlapping actions");
            }
        }
    }
}
