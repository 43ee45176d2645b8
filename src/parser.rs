//! Parse TL schema tokens into combinator declarations.
//!
//! Grammar (one statement per combinator):
//!
//! ```text
//! combinator := [ns '.'] name ['#' hex_tag] ['{' X ':' Type '}']* arg* '=' result_type ';'
//! arg        := identifier ':' ['flags.' N '?'] type_term
//! type_term  := '#' | '!' ident | '%' type_term | ident ['<' type_term '>']
//! ```
//!
//! A `---functions---` marker switches every following combinator to a
//! function; `---types---` switches back. The first syntax error aborts the
//! parse; there is no recovery.

use crate::ast::*;
use crate::error::{Result, TlError};
use crate::lexer::{Lexer, Token, TokenKind};

pub const FUNCTIONS_MARKER: &str = "---functions---";
pub const TYPES_MARKER: &str = "---types---";

pub struct Parser {
    lexer: Lexer,
    in_functions: bool,
}

/// Parse a whole schema into declarations, in source order.
pub fn parse(source: &str) -> Result<Vec<CombinatorDeclaration>> {
    let mut parser = Parser::new(source);
    let mut out = Vec::new();
    while let Some(decl) = parser.parse_combinator()? {
        out.push(decl);
    }
    Ok(out)
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Parser::from_lexer(Lexer::new(source))
    }

    pub fn from_lexer(lexer: Lexer) -> Self {
        Parser {
            lexer,
            in_functions: false,
        }
    }

    pub fn in_functions_section(&self) -> bool {
        self.in_functions
    }

    /// Parse the next combinator, or `None` at end of input.
    pub fn parse_combinator(&mut self) -> Result<Option<CombinatorDeclaration>> {
        loop {
            let tok = self.lexer.peek();
            match tok.kind {
                TokenKind::End => return Ok(None),
                TokenKind::SectionMarker => {
                    let tok = self.lexer.next_token();
                    match tok.text.as_str() {
                        FUNCTIONS_MARKER => self.in_functions = true,
                        TYPES_MARKER => self.in_functions = false,
                        _ => {
                            return Err(TlError::syntax(
                                tok.position.line,
                                tok.position.column,
                                format!("unknown section marker `{}`", tok.text),
                            ))
                        }
                    }
                }
                TokenKind::Semicolon => {
                    self.lexer.next_token();
                }
                TokenKind::Ident => break,
                _ => {
                    let tok = self.lexer.next_token();
                    return Err(unexpected(&tok, "combinator name"));
                }
            }
        }

        let name_tok = self.lexer.next_token();
        let (namespace, name) = split_namespace(&name_tok.text);

        let tag = if self.lexer.peek().is(TokenKind::Hash) {
            self.lexer.next_token();
            Some(self.parse_tag()?)
        } else {
            None
        };

        let mut generic_params = Vec::new();
        while self.lexer.peek().is(TokenKind::LBrace) {
            self.lexer.next_token();
            let param = self.expect(TokenKind::Ident, "generic parameter name")?;
            self.expect(TokenKind::Colon, "`:`")?;
            let constraint = self.expect(TokenKind::Ident, "generic parameter constraint")?;
            self.expect(TokenKind::RBrace, "`}`")?;
            generic_params.push(GenericParam {
                name: param.text,
                constraint: constraint.text,
            });
        }

        let mut arguments: Vec<Argument> = Vec::new();
        while self.lexer.peek().is(TokenKind::Ident) {
            let arg = self.parse_argument(&arguments, &generic_params)?;
            arguments.push(arg);
        }

        self.expect(TokenKind::Equals, "`=` or argument")?;
        let result = self.parse_type_term(&generic_params)?;
        self.expect(TokenKind::Semicolon, "`;`")?;

        let decl = CombinatorDeclaration {
            namespace,
            name,
            tag,
            generic_params,
            arguments,
            result,
            is_function: self.in_functions,
            position: name_tok.position,
        };
        tracing::debug!(
            combinator = %decl.qualified_name(),
            tag = ?decl.tag,
            args = decl.arguments.len(),
            function = decl.is_function,
            "parsed combinator"
        );
        Ok(Some(decl))
    }

    fn parse_tag(&mut self) -> Result<u32> {
        let tok = self.lexer.next_token();
        if !tok.is(TokenKind::Number) {
            return Err(unexpected(&tok, "hexadecimal constructor tag"));
        }
        if tok.text.len() > 8 {
            return Err(TlError::syntax(
                tok.position.line,
                tok.position.column,
                format!("constructor tag `{}` wider than 32 bits", tok.text),
            ));
        }
        u32::from_str_radix(&tok.text, 16).map_err(|_| {
            TlError::syntax(
                tok.position.line,
                tok.position.column,
                format!("invalid constructor tag `{}`", tok.text),
            )
        })
    }

    fn parse_argument(
        &mut self,
        previous: &[Argument],
        generics: &[GenericParam],
    ) -> Result<Argument> {
        let name_tok = self.lexer.next_token();
        if name_tok.text.contains('.') {
            return Err(TlError::syntax(
                name_tok.position.line,
                name_tok.position.column,
                format!("argument name `{}` may not be qualified", name_tok.text),
            ));
        }
        if previous.iter().any(|a| a.name == name_tok.text) {
            return Err(TlError::syntax(
                name_tok.position.line,
                name_tok.position.column,
                format!("duplicate argument `{}`", name_tok.text),
            ));
        }
        self.expect(TokenKind::Colon, "`:`")?;

        // `flags.N?Type` and a plain `Type` both start with an identifier; the
        // following `?` (one token of lookahead) decides which it was.
        if self.lexer.peek().is(TokenKind::Ident) {
            let first = self.lexer.next_token();
            if self.lexer.peek().is(TokenKind::Question) {
                self.lexer.next_token();
                let conditional = conditional_from(&first, previous)?;
                let type_term = self.parse_type_term(generics)?;
                if type_term.is_flags() {
                    return Err(TlError::syntax(
                        first.position.line,
                        first.position.column,
                        "a flags field cannot itself be conditional",
                    ));
                }
                return Ok(Argument {
                    name: name_tok.text,
                    type_term,
                    conditional: Some(conditional),
                });
            }
            let type_term = self.type_from_ident(&first)?;
            return Ok(Argument {
                name: name_tok.text,
                type_term,
                conditional: None,
            });
        }

        let type_term = self.parse_type_term(generics)?;
        Ok(Argument {
            name: name_tok.text,
            type_term,
            conditional: None,
        })
    }

    fn parse_type_term(&mut self, generics: &[GenericParam]) -> Result<TypeTerm> {
        let tok = self.lexer.next_token();
        match tok.kind {
            TokenKind::Hash => Ok(TypeTerm {
                namespace: None,
                identifier: "#".to_string(),
                generic_arg: None,
                bare: true,
                bang: false,
            }),
            TokenKind::Bang => {
                let ident = self.expect(TokenKind::Ident, "generic parameter after `!`")?;
                if !generics.iter().any(|g| g.name == ident.text) {
                    return Err(TlError::syntax(
                        ident.position.line,
                        ident.position.column,
                        format!("`!{}` does not name a generic parameter", ident.text),
                    ));
                }
                Ok(TypeTerm {
                    namespace: None,
                    identifier: ident.text,
                    generic_arg: None,
                    bare: true,
                    bang: true,
                })
            }
            TokenKind::Percent => {
                let mut inner = self.parse_type_term(generics)?;
                inner.bare = true;
                Ok(inner)
            }
            TokenKind::Ident => self.type_from_ident(&tok),
            _ => Err(unexpected(&tok, "type")),
        }
    }

    fn type_from_ident(&mut self, tok: &Token) -> Result<TypeTerm> {
        let mut term = TypeTerm::simple(&tok.text);
        if self.lexer.peek().is(TokenKind::LAngle) {
            self.lexer.next_token();
            let arg = self.parse_type_term(&[])?;
            self.expect(TokenKind::RAngle, "`>`")?;
            term.generic_arg = Some(Box::new(arg));
        } else if term.is_vector() {
            return Err(TlError::syntax(
                tok.position.line,
                tok.position.column,
                "vector type requires an element type `<T>`",
            ));
        }
        Ok(term)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        let tok = self.lexer.next_token();
        if tok.is(kind) {
            Ok(tok)
        } else {
            Err(unexpected(&tok, what))
        }
    }
}

fn conditional_from(tok: &Token, previous: &[Argument]) -> Result<Conditional> {
    let err = |message: String| TlError::syntax(tok.position.line, tok.position.column, message);
    let (field, bit) = tok
        .text
        .rsplit_once('.')
        .ok_or_else(|| err(format!("`{}` is not of the form flags.N", tok.text)))?;
    let bit: u8 = bit
        .parse()
        .map_err(|_| err(format!("`{}` is not a flag bit index", bit)))?;
    if bit >= 32 {
        return Err(err(format!("flag bit {} out of range (0..32)", bit)));
    }
    match previous.iter().find(|a| a.name == field) {
        Some(a) if a.type_term.is_flags() => Ok(Conditional {
            flags_field: field.to_string(),
            bit,
        }),
        Some(_) => Err(err(format!("`{}` is not a flags (`#`) field", field))),
        None => Err(err(format!("flags field `{}` is not declared before use", field))),
    }
}

fn unexpected(tok: &Token, expected: &str) -> TlError {
    let found = match tok.kind {
        TokenKind::End => "end of input".to_string(),
        TokenKind::Invalid => format!("invalid input ({})", tok.text),
        _ => format!("`{}`", tok.text),
    };
    TlError::syntax(
        tok.position.line,
        tok.position.column,
        format!("expected {}, found {}", expected, found),
    )
}
