// File: src/parser.rs
//
// Recursive descent parser for the parseq language.
// Transforms a sequence of tokens into a list of statements.
//
// Precedence, lowest to highest:
// - additive (+ -), left associative
// - multiplicative (* /), left associative
// - power (^), right associative
// - primary: literals, identifiers, unary minus, parentheses,
//   sequence literals, map(...) and reduce(...)
//
// The parser uses a single-token lookahead. All syntax errors are reported
// as SyntaxError; no semantic checks happen here. Expression trees deeper
// than the nesting limit are rejected while parsing, before evaluation or
// drop could recurse through them.

use std::sync::Arc;

use crate::ast::{BinaryOperator, Expr, Stmt};
use crate::config::DEFAULT_MAX_NESTING_DEPTH;
use crate::errors::SyntaxError;
use crate::lexer::{Token, TokenKind};

type ParseResult<T> = Result<T, SyntaxError>;

/// Parser maintains position in token stream and provides methods to parse statements and expressions
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Creates a new parser from a vector of tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens: split_signed_literals(tokens), pos: 0, depth: 0, max_depth: DEFAULT_MAX_NESTING_DEPTH }
    }

    /// Limit on how deeply expressions may nest
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// One level deeper into the expression tree; callers step back out
    /// with `self.depth -= 1` once the nested part is parsed
    fn enter(&mut self) -> ParseResult<()> {
        if self.depth >= self.max_depth {
            return Err(SyntaxError::new(format!(
                "expression nested too deeply (more than {} levels)",
                self.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Peek at the current token without consuming it
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    /// Consume and return the current token, then advance to the next
    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Description of the current token for error messages
    fn found(&self) -> String {
        match self.peek() {
            Some(token) => token.to_string(),
            None => "end of input".to_string(),
        }
    }

    fn error_here(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Error => {
                SyntaxError::new(format!("unrecognized character '{}'", token.text))
            }
            _ => SyntaxError::expected(expected, &self.found()),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.peek_is(kind) {
            Ok(self.advance().unwrap_or_else(|| Token::new(kind, "")))
        } else {
            Err(self.error_here(kind.describe()))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        self.expect(TokenKind::Identifier).map(|t| t.text)
    }

    /// Closing delimiter of a construct opened earlier
    fn expect_closing(&mut self, kind: TokenKind, opened: &str) -> ParseResult<()> {
        if self.peek_is(kind) {
            self.advance();
            Ok(())
        } else if self.peek().is_none() {
            Err(SyntaxError::new(format!("unmatched {}: expected {}, found end of input", opened, kind.describe())))
        } else {
            Err(self.error_here(kind.describe()))
        }
    }

    /// Parse the entire token stream into a vector of statements
    pub fn parse(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        // Common typo: `val x = ...` instead of `var x = ...`
        if self.peek().map_or(false, |t| t.kind == TokenKind::Identifier && t.text == "val") {
            return Err(SyntaxError::new("unknown statement 'val'")
                .with_hint("variables are declared with 'var'"));
        }

        match self.peek_kind() {
            Some(TokenKind::Var) => {
                self.advance();
                let name = self.expect_identifier()?;
                self.expect(TokenKind::Assign)?;
                let value = self.parse_expr()?;
                Ok(Stmt::VarDecl { name, value: Arc::new(value) })
            }
            Some(TokenKind::Out) => {
                self.advance();
                Ok(Stmt::Out(Arc::new(self.parse_expr()?)))
            }
            Some(TokenKind::Print) => {
                self.advance();
                let literal = self.expect(TokenKind::StringLiteral)?;
                Ok(Stmt::Print(unquote(&literal.text)))
            }
            Some(_) => Err(self.error_here("statement ('var', 'out' or 'print')")),
            None => Err(SyntaxError::expected("statement", "end of input")),
        }
    }

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        // Each operator adds a level to the left-deep tree
        let mut chained = 0;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOperator::Add,
                Some(TokenKind::Minus) => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, op, right);
        }

        self.depth -= chained;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_power()?;
        let mut chained = 0;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOperator::Multiply,
                Some(TokenKind::Slash) => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.parse_power()?;
            left = Expr::binary(left, op, right);
        }

        self.depth -= chained;
        Ok(left)
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;

        if self.peek_is(TokenKind::Caret) {
            self.advance();
            // Right associative: a^b^c == a^(b^c)
            self.enter()?;
            let exponent = self.parse_power()?;
            self.depth -= 1;
            return Ok(Expr::binary(base, BinaryOperator::Power, exponent));
        }

        Ok(base)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        self.enter()?;
        let expr = match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.advance();
                self.parse_negated()
            }
            Some(TokenKind::Number) => self.parse_number(),
            Some(TokenKind::Identifier) => Ok(Expr::Identifier(self.expect_identifier()?)),
            Some(TokenKind::LParen) => self.parse_parenthesized(),
            Some(TokenKind::LBrace) => self.parse_sequence(),
            Some(TokenKind::Map) => self.parse_map(),
            Some(TokenKind::Reduce) => self.parse_reduce(),
            _ => Err(self.error_here("expression")),
        };
        self.depth -= 1;
        expr
    }

    /// Operand of a unary minus: identifier, parenthesized expression or number
    fn parse_negated(&mut self) -> ParseResult<Expr> {
        match self.peek_kind() {
            Some(TokenKind::Number) => match self.parse_number()? {
                Expr::Number(value) => Ok(Expr::Number(-value)),
                other => Ok(Expr::UnaryMinus(Arc::new(other))),
            },
            Some(TokenKind::Identifier) => {
                Ok(Expr::UnaryMinus(Arc::new(Expr::Identifier(self.expect_identifier()?))))
            }
            Some(TokenKind::LParen) => Ok(Expr::UnaryMinus(Arc::new(self.parse_parenthesized()?))),
            _ => Err(self.error_here("identifier, number or '(' after unary '-'")),
        }
    }

    fn parse_number(&mut self) -> ParseResult<Expr> {
        let token = self.expect(TokenKind::Number)?;
        token
            .text
            .parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| SyntaxError::new(format!("malformed number '{}'", token.text)))
    }

    fn parse_parenthesized(&mut self) -> ParseResult<Expr> {
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expr()?;
        self.expect_closing(TokenKind::RParen, "'('")?;
        Ok(expr)
    }

    fn parse_sequence(&mut self) -> ParseResult<Expr> {
        self.expect(TokenKind::LBrace)?;
        let start = self.parse_expr()?;
        self.expect(TokenKind::Comma)?;
        let end = self.parse_expr()?;
        self.expect_closing(TokenKind::RBrace, "'{'")?;
        Ok(Expr::Sequence { start: Arc::new(start), end: Arc::new(end) })
    }

    fn parse_map(&mut self) -> ParseResult<Expr> {
        self.expect(TokenKind::Map)?;
        self.expect(TokenKind::LParen)?;
        let sequence = self.parse_expr()?;
        self.expect(TokenKind::Comma)?;
        let param = self.expect_identifier()?;
        self.expect(TokenKind::Arrow)?;
        let body = self.parse_expr()?;
        self.expect_closing(TokenKind::RParen, "'map('")?;
        Ok(Expr::Map { sequence: Arc::new(sequence), param, body: Arc::new(body) })
    }

    fn parse_reduce(&mut self) -> ParseResult<Expr> {
        self.expect(TokenKind::Reduce)?;
        self.expect(TokenKind::LParen)?;
        let sequence = self.parse_expr()?;
        self.expect(TokenKind::Comma)?;
        let neutral = self.parse_expr()?;
        self.expect(TokenKind::Comma)?;
        let accumulator = self.expect_identifier()?;
        let element = self.expect_identifier()?;
        self.expect(TokenKind::Arrow)?;
        let body = self.parse_expr()?;
        self.expect_closing(TokenKind::RParen, "'reduce('")?;
        Ok(Expr::Reduce {
            sequence: Arc::new(sequence),
            neutral: Arc::new(neutral),
            params: (accumulator, element),
            body: Arc::new(body),
        })
    }
}

/// Convenience entry point: tokens in, statements out
pub fn parse(tokens: Vec<Token>) -> ParseResult<Vec<Stmt>> {
    Parser::new(tokens).parse()
}

/// The tokenizer folds a leading sign into numbers, so `5-3` arrives as
/// `5` `-3`. A signed number directly after an operand is split back into
/// an operator and an unsigned literal.
fn split_signed_literals(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());

    for token in tokens {
        let follows_operand = matches!(
            out.last().map(|t| t.kind),
            Some(TokenKind::Number | TokenKind::Identifier | TokenKind::RParen | TokenKind::RBrace)
        );

        if token.kind == TokenKind::Number && follows_operand {
            let sign = match token.text.as_bytes().first() {
                Some(b'-') => Some(TokenKind::Minus),
                Some(b'+') => Some(TokenKind::Plus),
                _ => None,
            };
            if let Some(sign) = sign {
                let (symbol, digits) = token.text.split_at(1);
                out.push(Token::new(sign, symbol));
                out.push(Token::new(TokenKind::Number, digits));
                continue;
            }
        }

        out.push(token);
    }

    out
}

/// Strips the surrounding quotes of a string literal and decodes escapes
fn unquote(literal: &str) -> String {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);

    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            text.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => text.push('\n'),
            Some('t') => text.push('\t'),
            Some(other) => text.push(other),
            None => text.push('\\'),
        }
    }
    text
}
