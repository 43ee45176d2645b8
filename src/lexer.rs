//! Tokenize TL schema source using PEST.
//!
//! The grammar (`tl.pest`) only classifies lexemes; it never rejects input.
//! Unrecognised characters come out as [`TokenKind::Punct`] and are reported
//! by the parser with their position. The stream always ends with exactly one
//! [`TokenKind::End`] token.

use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "tl.pest"]
struct TlTokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    /// Decimal digits, or the hex digits of a `#tag`.
    Number,
    Hash,
    Colon,
    Bang,
    Question,
    LAngle,
    RAngle,
    Equals,
    Semicolon,
    LBrace,
    RBrace,
    Percent,
    /// Any other punctuation or stray character.
    Punct,
    /// `---functions---`, `---types---`.
    SectionMarker,
    /// Produced only if the tokenizer itself fails; carries the failure position.
    Invalid,
    End,
}

/// Source position: byte offset plus 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Split schema source into tokens, terminated by one `End` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    match TlTokenizer::parse(Rule::tokens, source) {
        Ok(pairs) => {
            for pair in pairs.flatten() {
                let kind = match pair.as_rule() {
                    Rule::section_marker => TokenKind::SectionMarker,
                    Rule::hash => TokenKind::Hash,
                    Rule::hex | Rule::number => TokenKind::Number,
                    Rule::ident => TokenKind::Ident,
                    Rule::punct => punct_kind(pair.as_str()),
                    Rule::other => TokenKind::Punct,
                    _ => continue,
                };
                tokens.push(Token {
                    kind,
                    text: pair.as_str().to_string(),
                    position: position_of(&pair.as_span().start_pos()),
                });
            }
            tokens.push(Token {
                kind: TokenKind::End,
                text: String::new(),
                position: end_position(source),
            });
        }
        Err(e) => {
            let (line, column) = match e.line_col {
                pest::error::LineColLocation::Pos(p) => p,
                pest::error::LineColLocation::Span(p, _) => p,
            };
            let offset = match e.location {
                pest::error::InputLocation::Pos(p) => p,
                pest::error::InputLocation::Span((p, _)) => p,
            };
            tracing::warn!(line, column, "tokenizer failed");
            tokens.push(Token {
                kind: TokenKind::Invalid,
                text: e.variant.message().to_string(),
                position: Position { offset, line, column },
            });
            tokens.push(Token {
                kind: TokenKind::End,
                text: String::new(),
                position: end_position(source),
            });
        }
    }
    tokens
}

fn punct_kind(s: &str) -> TokenKind {
    match s {
        ":" => TokenKind::Colon,
        "?" => TokenKind::Question,
        "!" => TokenKind::Bang,
        "<" => TokenKind::LAngle,
        ">" => TokenKind::RAngle,
        "=" => TokenKind::Equals,
        ";" => TokenKind::Semicolon,
        "{" => TokenKind::LBrace,
        "}" => TokenKind::RBrace,
        "%" => TokenKind::Percent,
        _ => TokenKind::Punct,
    }
}

fn position_of(pos: &pest::Position) -> Position {
    let (line, column) = pos.line_col();
    Position {
        offset: pos.pos(),
        line,
        column,
    }
}

fn end_position(source: &str) -> Position {
    let line = source.matches('\n').count() + 1;
    let column = source
        .rsplit('\n')
        .next()
        .map(|last| last.chars().count() + 1)
        .unwrap_or(1);
    Position {
        offset: source.len(),
        line,
        column,
    }
}

/// Token cursor with one token of lookahead. Never advances past `End`.
#[derive(Debug, Clone)]
pub struct Lexer {
    tokens: Vec<Token>,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            tokens: tokenize(source),
            pos: 0,
        }
    }

    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().map(|t| t.is(TokenKind::End)).unwrap_or(false) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::End,
                text: String::new(),
                position,
            });
        }
        Lexer { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &Token {
        // `pos` never exceeds the index of the trailing End token.
        &self.tokens[self.pos]
    }

    pub fn next_token(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !tok.is(TokenKind::End) {
            self.pos += 1;
        }
        tok
    }

    pub fn at_end(&self) -> bool {
        self.peek().is(TokenKind::End)
    }
}
