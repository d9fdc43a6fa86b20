// File: src/lexer.rs
//
// Lexical analyzer (tokenizer) for the parseq language.
// Converts source text into an ordered vector of tokens for parsing.
//
// Tokenization is rule driven: at every position the ordered rule table is
// tried top to bottom and the first anchored pattern that matches wins.
// Keywords come before identifiers and `->` comes before signed numbers.
// Input that no rule accepts becomes a one-character Error token so that
// the parser, not the tokenizer, reports it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Var,
    Out,
    Print,
    Map,
    Reduce,

    // Punctuation
    Arrow,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,

    // Literals and names
    Number,
    Identifier,
    StringLiteral,

    /// A single character no rule accepted
    Error,
}

impl TokenKind {
    /// Short human-readable name used in parser messages
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Var => "'var'",
            TokenKind::Out => "'out'",
            TokenKind::Print => "'print'",
            TokenKind::Map => "'map'",
            TokenKind::Reduce => "'reduce'",
            TokenKind::Arrow => "'->'",
            TokenKind::Assign => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Caret => "'^'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Number => "number",
            TokenKind::Identifier => "identifier",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Error => "unrecognized character",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token { kind, text: text.into() }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::Number | TokenKind::Identifier | TokenKind::StringLiteral => {
                write!(f, "{} '{}'", self.kind.describe(), self.text)
            }
            TokenKind::Error => write!(f, "unrecognized character '{}'", self.text),
            _ => write!(f, "{}", self.kind.describe()),
        }
    }
}

/// One entry of the rule table. `None` means the match is discarded.
struct Rule {
    kind: Option<TokenKind>,
    pattern: Regex,
}

fn rule(kind: Option<TokenKind>, pattern: &str) -> Rule {
    // Rule patterns are fixed literals exercised by the unit tests
    let pattern = Regex::new(&format!("^(?:{})", pattern)).expect("invalid lexer rule");
    Rule { kind, pattern }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(None, r"\s+"),
        rule(Some(TokenKind::Var), r"var\b"),
        rule(Some(TokenKind::Out), r"out\b"),
        rule(Some(TokenKind::Print), r"print\b"),
        rule(Some(TokenKind::Map), r"map\b"),
        rule(Some(TokenKind::Reduce), r"reduce\b"),
        rule(Some(TokenKind::Arrow), r"->"),
        rule(Some(TokenKind::Number), r"[+-]?(?:[0-9]+\.[0-9]*|[0-9]*\.[0-9]+|[0-9]+)"),
        rule(Some(TokenKind::Identifier), r"[A-Za-z_][A-Za-z0-9_]*"),
        rule(Some(TokenKind::StringLiteral), r#""(?:\\.|[^"\\])*""#),
        rule(Some(TokenKind::Assign), r"="),
        rule(Some(TokenKind::Plus), r"\+"),
        rule(Some(TokenKind::Minus), r"-"),
        rule(Some(TokenKind::Star), r"\*"),
        rule(Some(TokenKind::Slash), r"/"),
        rule(Some(TokenKind::Caret), r"\^"),
        rule(Some(TokenKind::LParen), r"\("),
        rule(Some(TokenKind::RParen), r"\)"),
        rule(Some(TokenKind::LBrace), r"\{"),
        rule(Some(TokenKind::RBrace), r"\}"),
        rule(Some(TokenKind::Comma), r","),
    ]
});

/// Tokenizes parseq source code into a vector of tokens.
///
/// Never fails. Whitespace is skipped, and any character that no rule
/// matches is emitted as a [`TokenKind::Error`] token of exactly that
/// character.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let rest = &source[pos..];

        let matched = RULES.iter().find_map(|rule| {
            rule.pattern
                .find(rest)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| (rule.kind, m.as_str()))
        });

        match matched {
            Some((kind, text)) => {
                if let Some(kind) = kind {
                    tokens.push(Token::new(kind, text));
                }
                pos += text.len();
            }
            None => {
                // `rest` is non-empty here, so there is always a first char
                let ch = rest.chars().next().unwrap_or_default();
                tokens.push(Token::new(TokenKind::Error, ch.to_string()));
                pos += ch.len_utf8().max(1);
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_before_identifiers() {
        assert_eq!(
            kinds("var out print map reduce variable output mapper"),
            vec![
                TokenKind::Var,
                TokenKind::Out,
                TokenKind::Print,
                TokenKind::Map,
                TokenKind::Reduce,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("42 3.14 5. .5 -7 +2");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["42", "3.14", "5.", ".5", "-7", "+2"]);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_arrow_wins_over_minus() {
        assert_eq!(
            kinds("x -> x"),
            vec![TokenKind::Identifier, TokenKind::Arrow, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("= + - * / ^ ( ) { } ,"),
            vec![
                TokenKind::Assign,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Caret,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Comma,
            ]
        );
    }

    #[test]
    fn test_string_literal_keeps_quotes() {
        let tokens = tokenize(r#"print "say \"hi\"""#);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].text, r#""say \"hi\"""#);
    }

    #[test]
    fn test_unrecognized_characters_become_error_tokens() {
        let tokens = tokenize("out 1 ; @");
        assert_eq!(tokens[2], Token::new(TokenKind::Error, ";"));
        assert_eq!(tokens[3], Token::new(TokenKind::Error, "@"));
    }

    #[test]
    fn test_unterminated_string_is_not_a_literal() {
        let tokens = tokenize("\"abc");
        assert_eq!(tokens[0], Token::new(TokenKind::Error, "\""));
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_multibyte_error_token() {
        let tokens = tokenize("λ");
        assert_eq!(tokens, vec![Token::new(TokenKind::Error, "λ")]);
    }

    #[test]
    fn test_whitespace_only() {
        assert!(tokenize(" \n\t ").is_empty());
    }
}
