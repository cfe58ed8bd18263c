//! Token symbols and the keyword table

use mscript_types::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Identifier,
    Number,
    String,

    // ===== Operators =====
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    Equal,
    DoubleEqual,
    NotEqual,
    NotEqual2,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Arrow,
    Cast,
    TwoDots,
    ThreeDots,
    QuestionEqual,
    DoubleQuestion,

    // ===== Punctuation =====
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Question,
    Exclamation,
    Dollar,
    At,

    // ===== Keywords =====
    KwExec,
    KwWith,
    KwObject,
    KwReturn,
    KwBreak,
    KwIf,
    KwElse,
    KwTrue,
    KwFalse,
    KwNull,
    KwUndefined,
    KwOr,
    KwAnd,
    KwNot,
    KwWhile,
    KwFor,
    KwSwitch,
    KwConstexpr,
    KwThis,

    /// Line break; statements are separated by these
    Separator,
    Eof,
}

const KEYWORDS: &[(&str, Symbol)] = &[
    ("exec", Symbol::KwExec),
    ("with", Symbol::KwWith),
    ("object", Symbol::KwObject),
    ("return", Symbol::KwReturn),
    ("break", Symbol::KwBreak),
    ("if", Symbol::KwIf),
    ("else", Symbol::KwElse),
    ("true", Symbol::KwTrue),
    ("false", Symbol::KwFalse),
    ("null", Symbol::KwNull),
    ("undefined", Symbol::KwUndefined),
    ("or", Symbol::KwOr),
    ("and", Symbol::KwAnd),
    ("not", Symbol::KwNot),
    ("while", Symbol::KwWhile),
    ("for", Symbol::KwFor),
    ("switch", Symbol::KwSwitch),
    ("constexpr", Symbol::KwConstexpr),
    ("this", Symbol::KwThis),
];

const OPERATORS: &[(&str, Symbol)] = &[
    ("...", Symbol::ThreeDots),
    ("..", Symbol::TwoDots),
    ("==", Symbol::DoubleEqual),
    ("!=", Symbol::NotEqual),
    ("<>", Symbol::NotEqual2),
    ("<=", Symbol::LessEqual),
    (">=", Symbol::GreaterEqual),
    ("=>", Symbol::Arrow),
    ("->", Symbol::Cast),
    ("?=", Symbol::QuestionEqual),
    ("??", Symbol::DoubleQuestion),
    ("+", Symbol::Plus),
    ("-", Symbol::Minus),
    ("*", Symbol::Star),
    ("/", Symbol::Slash),
    ("%", Symbol::Percent),
    ("^", Symbol::Power),
    ("=", Symbol::Equal),
    ("<", Symbol::Less),
    (">", Symbol::Greater),
    ("(", Symbol::LeftParen),
    (")", Symbol::RightParen),
    ("[", Symbol::LeftBracket),
    ("]", Symbol::RightBracket),
    ("{", Symbol::LeftBrace),
    ("}", Symbol::RightBrace),
    (",", Symbol::Comma),
    (".", Symbol::Dot),
    (":", Symbol::Colon),
    (";", Symbol::Semicolon),
    ("?", Symbol::Question),
    ("!", Symbol::Exclamation),
    ("$", Symbol::Dollar),
    ("@", Symbol::At),
];

impl Symbol {
    pub fn keyword(word: &str) -> Option<Symbol> {
        KEYWORDS.iter().find(|(k, _)| *k == word).map(|(_, s)| *s)
    }

    pub fn operator(text: &str) -> Option<Symbol> {
        OPERATORS.iter().find(|(k, _)| *k == text).map(|(_, s)| *s)
    }

    /// Source text of fixed symbols, a descriptive name for the others
    pub fn as_str(&self) -> &'static str {
        if let Some((k, _)) = KEYWORDS.iter().chain(OPERATORS).find(|(_, s)| s == self) {
            return k;
        }
        match self {
            Symbol::Identifier => "identifier",
            Symbol::Number => "number",
            Symbol::String => "string",
            Symbol::Separator => "<separator>",
            Symbol::Eof => "<eof>",
            _ => "?",
        }
    }

    pub fn is_keyword(&self) -> bool {
        KEYWORDS.iter().any(|(_, s)| s == self)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lexer output unit
#[derive(Debug, Clone)]
pub struct Element {
    pub symbol: Symbol,
    pub data: Value,
}

impl Element {
    pub fn new(symbol: Symbol, data: Value) -> Self {
        Element { symbol, data }
    }

    pub fn bare(symbol: Symbol) -> Self {
        Element {
            symbol,
            data: Value::Undefined,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol {
            Symbol::Identifier | Symbol::Number | Symbol::String => {
                write!(f, "{}({})", self.symbol, self.data.stringify())
            }
            _ => write!(f, "{}", self.symbol),
        }
    }
}
