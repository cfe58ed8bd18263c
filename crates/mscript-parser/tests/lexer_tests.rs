use mscript_parser::{parse_script, ParseError, Symbol};

fn symbols(src: &str) -> Vec<Symbol> {
    parse_script(src)
        .expect("lexing failed")
        .into_iter()
        .map(|e| e.symbol)
        .collect()
}

#[test]
fn test_two_char_operators() {
    assert_eq!(
        symbols("== != <> <= >= => -> .. ... ?= ??"),
        vec![
            Symbol::DoubleEqual,
            Symbol::NotEqual,
            Symbol::NotEqual2,
            Symbol::LessEqual,
            Symbol::GreaterEqual,
            Symbol::Arrow,
            Symbol::Cast,
            Symbol::TwoDots,
            Symbol::ThreeDots,
            Symbol::QuestionEqual,
            Symbol::DoubleQuestion,
            Symbol::Eof,
        ]
    );
}

#[test]
fn test_keywords_and_identifiers() {
    let els = parse_script("if iffy while this").unwrap();
    assert_eq!(els[0].symbol, Symbol::KwIf);
    assert_eq!(els[1].symbol, Symbol::Identifier);
    assert_eq!(els[1].data.as_str(), Some("iffy"));
    assert_eq!(els[2].symbol, Symbol::KwWhile);
    assert_eq!(els[3].symbol, Symbol::KwThis);
}

#[test]
fn test_string_escapes() {
    let els = parse_script(r#""a\"b\nA""#).unwrap();
    assert_eq!(els[0].symbol, Symbol::String);
    assert_eq!(els[0].data.as_str(), Some("a\"b\nA"));
}

#[test]
fn test_unknown_character_reports_position() {
    let err = parse_script("x = 1\ny = `2`").unwrap_err();
    assert_eq!(
        err,
        ParseError::UnknownCharacter {
            ch: '`',
            line: 2,
            column: 5
        }
    );
}

#[test]
fn test_comment_runs_to_end_of_line() {
    assert_eq!(
        symbols("a # b c d\nb"),
        vec![
            Symbol::Identifier,
            Symbol::Separator,
            Symbol::Identifier,
            Symbol::Eof
        ]
    );
}

#[test]
fn test_element_display() {
    let els = parse_script("foo(1, \"x\")").unwrap();
    let shown: Vec<String> = els.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        shown,
        vec!["identifier(\"foo\")", "(", "number(1)", ",", "string(\"x\")", ")", "<eof>"]
    );
}
