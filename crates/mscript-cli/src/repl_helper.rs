use mscript_parser::Symbol;
use nu_ansi_term::{Color, Style};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;

/// Console line helper: completes known names and colors the input
pub struct ReplHelper {
    names: Vec<String>,
}

impl ReplHelper {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Replaces the completion candidates (globals and console bindings)
    pub fn set_names(&mut self, names: Vec<String>) {
        self.names = names;
    }
}

impl Helper for ReplHelper {}

/// Start of the identifier that ends at `pos`
fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(pos)
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = word_start(line, pos);
        let prefix = &line[start..pos];
        if prefix.is_empty() {
            return Ok((pos, Vec::new()));
        }
        let candidates = self
            .names
            .iter()
            .filter(|n| n.starts_with(prefix))
            .map(|n| Pair {
                display: n.clone(),
                replacement: n.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let prefix = &line[word_start(line, pos)..pos];
        if prefix.len() < 2 {
            return None;
        }
        let mut matches = self.names.iter().filter(|n| n.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only[prefix.len()..].to_string()),
            _ => None,
        }
    }
}

/// Colors keywords, numbers and string literals
pub fn highlight_code(line: &str) -> String {
    let mut out = String::with_capacity(line.len() * 2);
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            let text: String = chars[start..i].iter().collect();
            out.push_str(&Color::Green.paint(text).to_string());
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                // Stop before a `..` range operator
                if chars[i] == '.' && chars.get(i + 1) == Some(&'.') {
                    break;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            out.push_str(&Color::Yellow.paint(text).to_string());
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            if Symbol::keyword(&text).is_some() {
                out.push_str(&Style::new().bold().fg(Color::Purple).paint(text).to_string());
            } else {
                out.push_str(&text);
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned(highlight_code(line))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, forced: bool) -> bool {
        forced
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(Color::DarkGray.paint(hint).to_string())
    }
}

impl Validator for ReplHelper {}
