use super::*;

#[test]
fn counts_by_severity() {
    let mut diags = Diagnostics::new();
    diags.error("empty token not allowed").at(3, 7).emit();
    diags.warning(" Expr deletable").emit();
    diags.error("undefined name 'digit'").at(9, 1).emit();

    assert_eq!(diags.len(), 3);
    assert_eq!(diags.error_count(), 2);
    assert_eq!(diags.warning_count(), 1);
    assert!(diags.has_errors());
    assert!(!diags.is_empty());
}

#[test]
fn plain_format_matches_classic_stream() {
    let mut diags = Diagnostics::new();
    diags.error("\".\" expected").at(2, 14).emit();
    diags.warning(" Stmt deletable").emit();

    let out = diags.printer().render();
    assert_eq!(out, "-- line 2 col 14: \".\" expected\n Stmt deletable\n");
}

#[test]
fn annotated_rendering_points_at_the_span() {
    let src = "COMPILER G\nPRODUCTIONS\nG = x.\nEND G.\n";
    let pos = src.find('x').unwrap();
    let mut diags = Diagnostics::new();
    diags
        .error("undefined string 'x' in production")
        .at(3, 5)
        .span(pos, pos + 1)
        .emit();

    let out = diags.printer().source(src).path("g.atg").render();
    assert!(out.contains("undefined string 'x' in production"));
    assert!(out.contains("g.atg"));
    assert!(out.contains("G = x."));
}

#[test]
fn spanless_messages_fall_back_to_plain_lines() {
    let src = "COMPILER G\n";
    let mut diags = Diagnostics::new();
    diags.warning(" A cannot be reached").emit();
    let out = diags.printer().source(src).render();
    assert_eq!(out, " A cannot be reached\n");
}

#[test]
fn plain_stream_snapshot() {
    let mut diags = Diagnostics::new();
    diags.error("\"}\" expected").at(12, 3).emit();
    diags.error("token might be empty").at(4, 9).emit();
    diags.warning(" Expr deletable").emit();
    insta::assert_snapshot!(diags.printer().render(), @r#"
    -- line 12 col 3: "}" expected
    -- line 4 col 9: token might be empty
     Expr deletable
    "#);
}

#[test]
fn diagnostics_serialize_for_tooling() {
    let mut diags = Diagnostics::new();
    diags
        .error("empty token not allowed")
        .at(3, 7)
        .span(10, 15)
        .emit();
    let value = serde_json::to_value(diags.iter().collect::<Vec<_>>()).unwrap();
    assert_eq!(value[0]["severity"], "Error");
    assert_eq!(value[0]["line"], 3);
    assert_eq!(value[0]["message"], "empty token not allowed");
}

#[test]
fn extend_merges_collections() {
    let mut a = Diagnostics::new();
    a.error("first").emit();
    let mut b = Diagnostics::new();
    b.warning("second").emit();
    a.extend(b);
    assert_eq!(a.len(), 2);
    assert_eq!(a.error_count(), 1);
}
