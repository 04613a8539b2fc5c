use super::{Scanner, kinds};
use crate::Error;

fn scanner(src: &str) -> Scanner {
    Scanner::from_bytes(src.as_bytes().to_vec()).unwrap()
}

fn all_kinds(src: &str) -> Vec<usize> {
    let mut s = scanner(src);
    let mut out = Vec::new();
    loop {
        let t = s.scan().unwrap();
        if t.kind == kinds::EOF {
            break;
        }
        out.push(t.kind);
    }
    out
}

#[test]
fn keywords_are_promoted_from_identifiers() {
    assert_eq!(
        all_kinds("COMPILER CHARACTERS TOKENS PRAGMAS COMMENTS FROM TO NESTED IGNORE"),
        vec![6, 8, 9, 10, 11, 12, 13, 14, 15]
    );
    assert_eq!(
        all_kinds("PRODUCTIONS END ANY WEAK SYNC IF CONTEXT IGNORECASE out"),
        vec![16, 19, 23, 34, 39, 40, 41, 7, 26]
    );
    assert_eq!(all_kinds("compiler ANYX"), vec![kinds::IDENT, kinds::IDENT]);
}

#[test]
fn punctuation_uses_longest_match() {
    assert_eq!(
        all_kinds("= . .. .> .) < <. ( (. > , [ ] | ) { } + - ^"),
        vec![17, 18, 22, 30, 43, 24, 29, 35, 42, 27, 28, 31, 32, 33, 36, 37, 38, 20, 21, 25]
    );
    // '.' followed by something else stays a plain dot
    assert_eq!(all_kinds(".x"), vec![kinds::DOT, kinds::IDENT]);
    // '(' then separated '.' are two tokens
    assert_eq!(all_kinds("( ."), vec![kinds::LPAREN, kinds::DOT]);
}

#[test]
fn idents_numbers_strings_chars() {
    let mut s = scanner("foo _bar9 42 \"str\\n\" 'c' '\\n'");
    let tokens: Vec<(usize, String)> = std::iter::from_fn(|| {
        let t = s.scan().unwrap();
        (t.kind != kinds::EOF).then_some((t.kind, t.val))
    })
    .collect();
    assert_eq!(
        tokens,
        vec![
            (kinds::IDENT, "foo".into()),
            (kinds::IDENT, "_bar9".into()),
            (kinds::NUMBER, "42".into()),
            (kinds::STRING, "\"str\\n\"".into()),
            (kinds::CHAR, "'c'".into()),
            (kinds::CHAR, "'\\n'".into()),
        ]
    );
}

#[test]
fn string_with_newline_is_a_bad_string() {
    // the unterminated tail quote has no transition at all
    assert_eq!(all_kinds("\"abc\nx\""), vec![
        kinds::BAD_STRING,
        kinds::IDENT,
        kinds::NO_SYM
    ]);
}

#[test]
fn unknown_character_yields_no_sym() {
    assert_eq!(all_kinds("@ x"), vec![kinds::NO_SYM, kinds::IDENT]);
}

#[test]
fn line_and_column_tracking() {
    let mut s = scanner("a\nbb\r\nc\rd");
    let a = s.scan().unwrap();
    let bb = s.scan().unwrap();
    let c = s.scan().unwrap();
    let d = s.scan().unwrap();
    assert_eq!((a.line, a.col), (1, 1));
    assert_eq!((bb.line, bb.col), (2, 1));
    assert_eq!((c.line, c.col), (3, 1));
    // isolated \r is folded to a newline
    assert_eq!((d.line, d.col), (4, 1));
}

#[test]
fn line_comments_are_skipped() {
    let mut s = scanner("a // rest of line\nb");
    assert_eq!(s.scan().unwrap().val, "a");
    let b = s.scan().unwrap();
    assert_eq!(b.val, "b");
    assert_eq!(b.line, 2);
}

#[test]
fn block_comments_nest() {
    let mut s = scanner("/* a /* b */ c */ x");
    let x = s.scan().unwrap();
    assert_eq!((x.kind, x.val.as_str()), (kinds::IDENT, "x"));
    // an unbalanced open comment is not a comment at all
    assert_eq!(all_kinds("/ y"), vec![kinds::NO_SYM, kinds::IDENT]);
}

#[test]
fn comment_newlines_keep_line_numbers() {
    let mut s = scanner("/* one\ntwo\nthree */ x");
    let x = s.scan().unwrap();
    assert_eq!(x.line, 3);
}

#[test]
fn pragmas_scan_as_their_own_kinds() {
    let mut s = scanner("$09AX $namespace=My.Ns ident");
    let ddt = s.scan().unwrap();
    assert_eq!((ddt.kind, ddt.val.as_str()), (kinds::DDT_PRAGMA, "$09AX"));
    let opt = s.scan().unwrap();
    assert_eq!(
        (opt.kind, opt.val.as_str()),
        (kinds::OPTION_PRAGMA, "$namespace=My.Ns")
    );
    assert_eq!(s.scan().unwrap().kind, kinds::IDENT);
}

#[test]
fn peek_skips_pragmas_and_reset_rewinds() {
    let mut s = scanner("a $0 b c");
    assert_eq!(s.peek().unwrap().val, "a");
    assert_eq!(s.peek().unwrap().val, "b"); // pragma skipped
    assert_eq!(s.peek().unwrap().val, "c");
    s.reset_peek();
    assert_eq!(s.peek().unwrap().val, "a");

    // scan still sees every token, pragma included
    assert_eq!(s.scan().unwrap().val, "a");
    assert_eq!(s.scan().unwrap().kind, kinds::DDT_PRAGMA);
    assert_eq!(s.scan().unwrap().val, "b");
    // peeking restarts after the consumed token
    assert_eq!(s.peek().unwrap().val, "c");
}

#[test]
fn bom_switches_to_utf8() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("grüße".as_bytes());
    let mut s = Scanner::from_bytes(bytes).unwrap();
    let t = s.scan().unwrap();
    assert_eq!((t.kind, t.val.as_str()), (kinds::IDENT, "gr"));
}

#[test]
fn broken_bom_is_fatal() {
    let bytes = vec![0xEF, 0xBB, 0x00, b'x'];
    match Scanner::from_bytes(bytes) {
        Err(Error::IllegalByteOrderMark) => {}
        other => panic!("expected BOM error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn token_positions_are_byte_offsets() {
    let mut s = scanner("ab cd");
    let ab = s.scan().unwrap();
    let cd = s.scan().unwrap();
    assert_eq!((ab.pos, ab.char_pos), (0, 0));
    assert_eq!((cd.pos, cd.char_pos), (3, 3));
}
