// crates/arbor-core/src/expr/parser.rs
// ============================================================================
// Module: Expression Parser
// Description: Lexer and precedence-climbing parser for condition expressions.
// Purpose: Turn author-facing condition text into validated `Expr` trees.
// Dependencies: crate::expr, crate::value, thiserror
// ============================================================================

//! ## Overview
//! Parses the expression syntax used by breakpoint conditions, watch
//! expressions, and tree node payloads.
//!
//! ### Grammar (informal)
//! - **Literals**: `42`, `3.5`, `"text"`, `true`, `false`, `null`
//! - **Names**: `score` (variable read), `max(a, b)` (function call)
//! - **Unary**: `!a`, `not a`, `-a`
//! - **Binary** (loosest first): `||`/`or`, `&&`/`and`, `== !=`, `< <= > >=`,
//!   `+ -`, `* / %`
//! - **Parentheses**: `( ... )`
//!
//! Input is untrusted: the size limit is enforced before parsing, and the
//! nesting and tree-height limits while parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use super::BinaryOp;
use super::Expr;
use super::UnaryOp;
use crate::value::Value;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum allowed expression input size in bytes.
const MAX_EXPR_INPUT_BYTES: usize = 64 * 1024;
/// Maximum supported nesting depth for parenthesised or prefixed expressions.
const MAX_EXPR_NESTING: usize = 32;
/// Maximum height of a parsed expression tree; every operator, call, and
/// prefix adds one level.
pub const MAX_EXPR_HEIGHT: usize = 256;

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Errors raised while parsing an expression.
///
/// # Invariants
/// - Positions are byte offsets into the original input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input was empty or contained only whitespace.
    #[error("expression is empty")]
    EmptyInput,
    /// Input exceeded the size limit.
    #[error("expression exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual input length in bytes.
        actual_bytes: usize,
    },
    /// Input exceeded the nesting limit.
    #[error("expression nesting exceeds limit: depth {actual_depth} (max {max_depth}) at {position}")]
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max_depth: usize,
        /// Depth reached when the error occurred.
        actual_depth: usize,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Unexpected token encountered.
    #[error("unexpected token `{found}` at {position}, expected {expected}")]
    UnexpectedToken {
        /// Human-friendly expectation summary.
        expected: &'static str,
        /// The token actually seen.
        found: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// A string literal was not terminated.
    #[error("unterminated string starting at {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },
    /// Numeric literal failed to parse.
    #[error("invalid number `{raw}` at {position}")]
    InvalidNumber {
        /// The raw numeric text.
        raw: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Trailing input after a complete expression.
    #[error("unexpected trailing input at {position}")]
    TrailingInput {
        /// Byte offset where the unexpected input begins.
        position: usize,
    },
}

/// Parses an expression from source text.
///
/// # Errors
///
/// Returns [`ParseError`] for syntax issues, limit violations, or trailing input.
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    if input.len() > MAX_EXPR_INPUT_BYTES {
        return Err(ParseError::InputTooLarge {
            max_bytes: MAX_EXPR_INPUT_BYTES,
            actual_bytes: input.len(),
        });
    }
    let tokens = Lexer::new(input).lex()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression()?;
    parser.expect_eof()?;
    Ok(expr)
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Lexer token produced from expression input.
#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    /// Identifier token.
    Ident(&'a str),
    /// Numeric literal token.
    Number(f64),
    /// String literal token (escapes resolved).
    Str(String),
    /// `&&` or `and`.
    And,
    /// `||` or `or`.
    Or,
    /// `!` or `not`.
    Not,
    /// `+`.
    Plus,
    /// `-`.
    Minus,
    /// `*`.
    Star,
    /// `/`.
    Slash,
    /// `%`.
    Percent,
    /// `==`.
    EqEq,
    /// `!=`.
    NotEq,
    /// `<`.
    Lt,
    /// `<=`.
    Le,
    /// `>`.
    Gt,
    /// `>=`.
    Ge,
    /// Left parenthesis.
    LParen,
    /// Right parenthesis.
    RParen,
    /// Comma separator.
    Comma,
    /// End-of-input marker.
    Eof,
}

/// Token paired with its byte offset.
#[derive(Debug, Clone)]
struct SpannedToken<'a> {
    /// Token value.
    token: Token<'a>,
    /// Byte offset into the input.
    position: usize,
}

/// Lexer for expression text.
struct Lexer<'a> {
    /// Source input being tokenized.
    input: &'a str,
    /// Current byte offset into the input.
    offset: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
        }
    }

    /// Lexes the input into a sequence of tokens.
    fn lex(mut self) -> Result<Vec<SpannedToken<'a>>, ParseError> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while self.offset < bytes.len() {
            let ch = bytes[self.offset];
            let start = self.offset;
            let token = match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.offset += 1;
                    continue;
                }
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b',' => self.single(Token::Comma),
                b'+' => self.single(Token::Plus),
                b'-' => self.single(Token::Minus),
                b'*' => self.single(Token::Star),
                b'/' => self.single(Token::Slash),
                b'%' => self.single(Token::Percent),
                b'!' => self.with_eq(bytes, Token::Not, Token::NotEq),
                b'<' => self.with_eq(bytes, Token::Lt, Token::Le),
                b'>' => self.with_eq(bytes, Token::Gt, Token::Ge),
                b'=' => self.pair(bytes, b'=', Token::EqEq, "==")?,
                b'&' => self.pair(bytes, b'&', Token::And, "&&")?,
                b'|' => self.pair(bytes, b'|', Token::Or, "||")?,
                b'"' => self.string()?,
                b'0' ..= b'9' => self.number(bytes)?,
                b'a' ..= b'z' | b'A' ..= b'Z' | b'_' => {
                    self.consume_while(bytes, |b| b.is_ascii_alphanumeric() || b == b'_');
                    Self::keyword_or_ident(&self.input[start .. self.offset])
                }
                _ => {
                    let found = self.input[start ..].chars().next().unwrap_or('?').to_string();
                    return Err(ParseError::UnexpectedToken {
                        expected: "literal, name, or operator",
                        found,
                        position: start,
                    });
                }
            };
            tokens.push(SpannedToken {
                token,
                position: start,
            });
        }

        if tokens.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    /// Consumes a one-byte token.
    fn single(&mut self, token: Token<'a>) -> Token<'a> {
        self.offset += 1;
        token
    }

    /// Consumes a token that may be followed by `=`.
    fn with_eq(&mut self, bytes: &[u8], bare: Token<'a>, with_eq: Token<'a>) -> Token<'a> {
        if bytes.get(self.offset + 1) == Some(&b'=') {
            self.offset += 2;
            with_eq
        } else {
            self.offset += 1;
            bare
        }
    }

    /// Consumes a doubled operator such as `&&`.
    fn pair(
        &mut self,
        bytes: &[u8],
        second: u8,
        token: Token<'a>,
        expected: &'static str,
    ) -> Result<Token<'a>, ParseError> {
        if bytes.get(self.offset + 1) == Some(&second) {
            self.offset += 2;
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken {
                expected,
                found: char::from(bytes[self.offset]).to_string(),
                position: self.offset,
            })
        }
    }

    /// Consumes a numeric literal with an optional fractional part.
    fn number(&mut self, bytes: &[u8]) -> Result<Token<'a>, ParseError> {
        let start = self.offset;
        self.consume_while(bytes, |b| b.is_ascii_digit());
        if bytes.get(self.offset) == Some(&b'.')
            && bytes.get(self.offset + 1).is_some_and(u8::is_ascii_digit)
        {
            self.offset += 1;
            self.consume_while(bytes, |b| b.is_ascii_digit());
        }
        let raw = &self.input[start .. self.offset];
        raw.parse::<f64>().map(Token::Number).map_err(|_| ParseError::InvalidNumber {
            raw: raw.to_string(),
            position: start,
        })
    }

    /// Consumes a double-quoted string literal, resolving `\"`, `\\`, `\n`, and `\t`.
    fn string(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.offset;
        let input = self.input;
        let mut text = String::new();
        let mut chars = input[start + 1 ..].char_indices();
        while let Some((index, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.offset = start + 1 + index + 1;
                    return Ok(Token::Str(text));
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, other)) => text.push(other),
                    None => break,
                },
                other => text.push(other),
            }
        }
        Err(ParseError::UnterminatedString {
            position: start,
        })
    }

    /// Advances while the condition matches the current byte.
    fn consume_while<F>(&mut self, bytes: &[u8], condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = bytes.get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    /// Maps a slice to a keyword token or identifier token.
    fn keyword_or_ident(slice: &'a str) -> Token<'a> {
        match slice {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Ident(slice),
        }
    }
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// A parsed subexpression paired with its tree height.
type Parsed = (Expr, usize);

/// Precedence-climbing parser over the token stream.
struct Parser<'input> {
    /// Token stream with source positions.
    tokens: Vec<SpannedToken<'input>>,
    /// Current token index.
    index: usize,
    /// Current nesting depth.
    nesting: usize,
}

impl<'input> Parser<'input> {
    /// Creates a parser over the token stream.
    const fn new(tokens: Vec<SpannedToken<'input>>) -> Self {
        Self {
            tokens,
            index: 0,
            nesting: 0,
        }
    }

    /// Parses a full expression.
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(0).map(|(expr, _)| expr)
    }

    /// Parses binary operators whose precedence is at least `min_level`.
    fn parse_binary(&mut self, min_level: u8) -> Result<Parsed, ParseError> {
        let (mut lhs, mut height) = self.parse_unary()?;
        while let Some((op, level)) = binary_op(&self.current().token) {
            if level < min_level {
                break;
            }
            let position = self.current().position;
            self.advance();
            let (rhs, rhs_height) = self.parse_binary(level + 1)?;
            height = grow_height(height.max(rhs_height), position)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok((lhs, height))
    }

    /// Parses prefix operators.
    fn parse_unary(&mut self) -> Result<Parsed, ParseError> {
        let op = match self.current().token {
            Token::Not => UnaryOp::Not,
            Token::Minus => UnaryOp::Negate,
            _ => return self.parse_primary(),
        };
        let position = self.current().position;
        self.advance();
        self.with_nesting(position, |parser| {
            let (operand, height) = parser.parse_unary()?;
            let expr = Expr::Unary {
                op,
                operand: Box::new(operand),
            };
            Ok((expr, grow_height(height, position)?))
        })
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> Result<Parsed, ParseError> {
        let SpannedToken {
            token,
            position,
        } = self.current().clone();
        match token {
            Token::Number(number) => {
                self.advance();
                Ok((Expr::Literal(Value::Number(number)), 1))
            }
            Token::Str(text) => {
                self.advance();
                Ok((Expr::Literal(Value::String(text)), 1))
            }
            Token::Ident(name) => {
                self.advance();
                match name {
                    "true" => Ok((Expr::Literal(Value::Boolean(true)), 1)),
                    "false" => Ok((Expr::Literal(Value::Boolean(false)), 1)),
                    "null" => Ok((Expr::Literal(Value::Null), 1)),
                    _ if self.matches(&Token::LParen) => self.with_nesting(position, |parser| {
                        let (args, height) = parser.parse_argument_list()?;
                        let expr = Expr::Call {
                            name: name.to_string(),
                            args,
                        };
                        Ok((expr, grow_height(height, position)?))
                    }),
                    _ => Ok((Expr::Variable(name.to_string()), 1)),
                }
            }
            Token::LParen => {
                self.advance();
                self.with_nesting(position, |parser| {
                    let parsed = parser.parse_binary(0)?;
                    parser.expect(&Token::RParen, "`)`")?;
                    Ok(parsed)
                })
            }
            _ => Err(ParseError::UnexpectedToken {
                expected: "literal, name, or `(`",
                found: self.describe_current(),
                position,
            }),
        }
    }

    /// Parses a comma-separated argument list after `(`, returning the
    /// arguments and the tallest argument height.
    fn parse_argument_list(&mut self) -> Result<(Vec<Expr>, usize), ParseError> {
        let mut args = Vec::new();
        let mut height = 0;
        if self.matches(&Token::RParen) {
            return Ok((args, height));
        }

        loop {
            let (arg, arg_height) = self.parse_binary(0)?;
            args.push(arg);
            height = height.max(arg_height);
            if self.matches(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen, "`)` after arguments")?;
            break;
        }
        Ok((args, height))
    }

    /// Runs a parser step while enforcing the nesting limit.
    fn with_nesting<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let next_depth = self.nesting + 1;
        if next_depth > MAX_EXPR_NESTING {
            return Err(ParseError::NestingTooDeep {
                max_depth: MAX_EXPR_NESTING,
                actual_depth: next_depth,
                position,
            });
        }
        self.nesting = next_depth;
        let result = f(self);
        self.nesting = self.nesting.saturating_sub(1);
        result
    }

    /// Consumes the expected token or returns an error.
    fn expect(&mut self, token: &Token<'_>, expected: &'static str) -> Result<(), ParseError> {
        if self.matches(token) {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected,
                found: self.describe_current(),
                position: self.current().position,
            })
        }
    }

    /// Ensures the parser is at end-of-input.
    fn expect_eof(&self) -> Result<(), ParseError> {
        if matches!(self.current().token, Token::Eof) {
            Ok(())
        } else {
            Err(ParseError::TrailingInput {
                position: self.current().position,
            })
        }
    }

    /// Consumes the token if it matches the expected kind.
    fn matches(&mut self, kind: &Token<'_>) -> bool {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Returns the current token.
    fn current(&self) -> &SpannedToken<'input> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.index.min(last)]
    }

    /// Advances to the next token.
    const fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }

    /// Formats the current token for diagnostics.
    fn describe_current(&self) -> String {
        match &self.current().token {
            Token::Ident(name) => (*name).to_string(),
            Token::Number(number) => number.to_string(),
            Token::Str(text) => format!("\"{text}\""),
            Token::And => "&&".to_string(),
            Token::Or => "||".to_string(),
            Token::Not => "!".to_string(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::Percent => "%".to_string(),
            Token::EqEq => "==".to_string(),
            Token::NotEq => "!=".to_string(),
            Token::Lt => "<".to_string(),
            Token::Le => "<=".to_string(),
            Token::Gt => ">".to_string(),
            Token::Ge => ">=".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// Returns the height of a node over a child of height `child`.
///
/// # Errors
///
/// Returns [`ParseError::NestingTooDeep`] when the node would exceed
/// [`MAX_EXPR_HEIGHT`].
fn grow_height(child: usize, position: usize) -> Result<usize, ParseError> {
    let height = child + 1;
    if height > MAX_EXPR_HEIGHT {
        return Err(ParseError::NestingTooDeep {
            max_depth: MAX_EXPR_HEIGHT,
            actual_depth: height,
            position,
        });
    }
    Ok(height)
}

/// Maps a token to its binary operator and precedence level (higher binds tighter).
const fn binary_op(token: &Token<'_>) -> Option<(BinaryOp, u8)> {
    let entry = match token {
        Token::Or => (BinaryOp::Or, 0),
        Token::And => (BinaryOp::And, 1),
        Token::EqEq => (BinaryOp::Eq, 2),
        Token::NotEq => (BinaryOp::Ne, 2),
        Token::Lt => (BinaryOp::Lt, 3),
        Token::Le => (BinaryOp::Le, 3),
        Token::Gt => (BinaryOp::Gt, 3),
        Token::Ge => (BinaryOp::Ge, 3),
        Token::Plus => (BinaryOp::Add, 4),
        Token::Minus => (BinaryOp::Sub, 4),
        Token::Star => (BinaryOp::Mul, 5),
        Token::Slash => (BinaryOp::Div, 5),
        Token::Percent => (BinaryOp::Rem, 5),
        _ => return None,
    };
    Some(entry)
}
