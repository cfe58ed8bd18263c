use crate::symbol::{Element, Symbol};
use mscript_types::Value;
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct ScriptLexer;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{line}:{column}: unknown character '{ch}'")]
    UnknownCharacter { ch: char, line: usize, column: usize },

    #[error("{line}:{column}: invalid string literal: {message}")]
    InvalidString {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("unexpected end of input")]
    UnexpectedEnd,
}

/// Splits source text into elements. The list always ends with `Eof`.
pub fn parse_script(source: &str) -> Result<Vec<Element>, ParseError> {
    let mut pairs = ScriptLexer::parse(Rule::script, source).map_err(|e| {
        let pos = match e.location {
            InputLocation::Pos(p) => p,
            InputLocation::Span((p, _)) => p,
        };
        unknown_character(source, pos)
    })?;

    let script = pairs.next().ok_or(ParseError::UnexpectedEnd)?;
    let mut out = Vec::new();
    for pair in script.into_inner() {
        match pair.as_rule() {
            Rule::EOI => break,
            _ => out.push(build_element(pair)?),
        }
    }
    out.push(Element::bare(Symbol::Eof));
    Ok(out)
}

fn unknown_character(source: &str, pos: usize) -> ParseError {
    match source.get(pos..).and_then(|rest| rest.chars().next()) {
        Some(ch) => {
            let (line, column) = line_col(source, pos);
            ParseError::UnknownCharacter { ch, line, column }
        }
        None => ParseError::UnexpectedEnd,
    }
}

fn line_col(source: &str, pos: usize) -> (usize, usize) {
    let before = &source[..pos.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0) + 1;
    (line, column)
}

fn build_element(pair: Pair<Rule>) -> Result<Element, ParseError> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::separator => Ok(Element::bare(Symbol::Separator)),
        Rule::number => Ok(Element::new(Symbol::Number, parse_number(text))),
        Rule::string => {
            let decoded: String = serde_json::from_str(text).map_err(|e| {
                let (line, column) = pair.as_span().start_pos().line_col();
                ParseError::InvalidString {
                    message: e.to_string(),
                    line,
                    column,
                }
            })?;
            Ok(Element::new(Symbol::String, Value::from(decoded)))
        }
        Rule::word => {
            let symbol = Symbol::keyword(text).unwrap_or(Symbol::Identifier);
            Ok(Element::new(symbol, Value::from(text)))
        }
        Rule::symbol => {
            let (line, column) = pair.as_span().start_pos().line_col();
            Symbol::operator(text)
                .map(Element::bare)
                .ok_or(ParseError::UnknownCharacter {
                    ch: text.chars().next().unwrap_or('?'),
                    line,
                    column,
                })
        }
        _ => {
            let (line, column) = pair.as_span().start_pos().line_col();
            Err(ParseError::UnknownCharacter {
                ch: text.chars().next().unwrap_or('?'),
                line,
                column,
            })
        }
    }
}

/// Integer unless a fraction or exponent is present (or the digits overflow)
fn parse_number(text: &str) -> Value {
    let is_float = text.contains(['.', 'e', 'E']);
    if !is_float {
        if let Ok(i) = text.parse::<i64>() {
            return Value::int(i);
        }
    }
    Value::float(text.parse::<f64>().unwrap_or(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(src: &str) -> Vec<Symbol> {
        parse_script(src).unwrap().into_iter().map(|e| e.symbol).collect()
    }

    #[test]
    fn test_number_kinds() {
        let els = parse_script("12 1.5 2e3 99999999999999999999").unwrap();
        assert!(els[0].data.as_number().unwrap().is_int());
        assert!(!els[1].data.as_number().unwrap().is_int());
        assert_eq!(els[2].data.get_number(), 2000.0);
        assert!(!els[3].data.as_number().unwrap().is_int());
    }

    #[test]
    fn test_range_does_not_eat_dots() {
        assert_eq!(
            symbols("1..5"),
            vec![Symbol::Number, Symbol::TwoDots, Symbol::Number, Symbol::Eof]
        );
    }

    #[test]
    fn test_newline_is_separator() {
        assert_eq!(
            symbols("a\r\nb\rc # note\n"),
            vec![
                Symbol::Identifier,
                Symbol::Separator,
                Symbol::Identifier,
                Symbol::Separator,
                Symbol::Identifier,
                Symbol::Separator,
                Symbol::Eof
            ]
        );
    }
}
