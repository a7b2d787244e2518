//! Onyx Lexer
//!
//! Tokenizes Onyx source text. Uses the `logos` crate for the token automaton;
//! quoted strings and block comments are scanned by callbacks so that
//! interpolation braces and unterminated literals are handled in one place.

pub mod literal;

use logos::Logos;
use smol_str::SmolStr;
use std::fmt;
use std::ops::Range;

/// Source span representing a byte range in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `next` begins exactly where this span ends (no whitespace or
    /// comment in between).
    pub fn touches(self, next: Span) -> bool {
        self.end == next.start
    }

    fn shifted(self, offset: usize) -> Span {
        Span::new(self.start + offset, self.end + offset)
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// A token with its kind and source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The slice of `source` this token was lexed from.
    pub fn text<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.span.start..self.span.end)
    }
}

/// Callback for `/* ... */`: consumes input up to the first `*/`.
fn block_comment_callback(lex: &mut logos::Lexer<TokenKind>) -> Option<SmolStr> {
    let remainder = lex.remainder();
    match remainder.find("*/") {
        Some(end_idx) => {
            lex.bump(end_idx + 2);
            Some(SmolStr::new(lex.slice()))
        }
        None => {
            lex.bump(remainder.len());
            None
        }
    }
}

fn double_string_callback(lex: &mut logos::Lexer<TokenKind>) -> Option<SmolStr> {
    quoted_callback(lex, literal::scan_double_quoted)
}

fn single_string_callback(lex: &mut logos::Lexer<TokenKind>) -> Option<SmolStr> {
    quoted_callback(lex, |rest| literal::scan_quoted(rest, b'\''))
}

fn byte_string_callback(lex: &mut logos::Lexer<TokenKind>) -> Option<SmolStr> {
    quoted_callback(lex, |rest| literal::scan_quoted(rest, b'"'))
}

/// Runs a string scanner over the remainder. An unterminated literal swallows
/// the rest of the input so the error span reaches end-of-input.
fn quoted_callback(
    lex: &mut logos::Lexer<TokenKind>,
    scan: impl Fn(&str) -> Option<usize>,
) -> Option<SmolStr> {
    match scan(lex.remainder()) {
        Some(len) => {
            lex.bump(len);
            Some(SmolStr::new(lex.slice()))
        }
        None => {
            let len = lex.remainder().len();
            lex.bump(len);
            None
        }
    }
}

/// All token types in the Onyx language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    // ========== Keywords ==========
    #[token("op")]
    Op,
    #[token("profile")]
    Profile,
    #[token("fn")]
    Fn,
    #[token("let")]
    Let,
    #[token("use")]
    Use,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("match")]
    Match,
    #[token("run")]
    Run,
    #[token("with")]
    With,
    #[token("zip")]
    Zip,
    #[token("path")]
    Path,
    #[token("emit")]
    Emit,
    #[token("env")]
    Env,
    #[token("in")]
    In,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // ========== Operators ==========
    #[token("|>")]
    PipeArrow,
    #[token("||")]
    PipePipe,
    #[token("|")]
    Bar,
    #[token("&&")]
    AmpAmp,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("!")]
    Bang,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("~=")]
    TildeEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,

    // Special
    #[token("=>")]
    FatArrow,
    #[token("->")]
    Arrow,
    #[token("..")]
    DotDot,
    #[token("..=")]
    DotDotEq,
    #[token("::")]
    ColonColon,
    #[token(".")]
    Dot,

    // ========== Delimiters ==========
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    // ========== Literals ==========
    /// Integer literal (decimal, hex, octal, binary). Never carries a sign.
    #[regex(r"[0-9]+", |lex| SmolStr::new(lex.slice()))]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| SmolStr::new(lex.slice()))]
    #[regex(r"0[oO][0-7]+", |lex| SmolStr::new(lex.slice()))]
    #[regex(r"0[bB][01]+", |lex| SmolStr::new(lex.slice()))]
    Integer(SmolStr),

    /// Float literal: needs a fractional part or an exponent
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| SmolStr::new(lex.slice()))]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| SmolStr::new(lex.slice()))]
    Float(SmolStr),

    /// Duration literal: `250ms`, `1.5s`, `2m`, `1h`
    #[regex(r"[0-9]+(\.[0-9]+)?(ms|s|m|h)", |lex| SmolStr::new(lex.slice()))]
    Duration(SmolStr),

    /// Size literal: `512kb`, `1.5mb`, `2gb`, `1tb`
    #[regex(r"[0-9]+(\.[0-9]+)?(kb|mb|gb|tb)", |lex| SmolStr::new(lex.slice()))]
    Size(SmolStr),

    /// Double-quoted string, quotes included; may contain `${...}`
    #[token("\"", double_string_callback)]
    InterpolatedString(SmolStr),

    /// Single-quoted string, quotes included
    #[token("'", single_string_callback)]
    SimpleString(SmolStr),

    /// Byte string `b"..."`, prefix and quotes included
    #[token("b\"", byte_string_callback)]
    ByteString(SmolStr),

    // ========== Identifiers ==========
    #[regex(r"[_a-zA-Z][_a-zA-Z0-9]*", |lex| SmolStr::new(lex.slice()))]
    Identifier(SmolStr),

    // ========== Comments ==========
    #[regex(r"//[^\n]*", |lex| SmolStr::new(lex.slice()))]
    LineComment(SmolStr),

    #[token("/*", block_comment_callback)]
    BlockComment(SmolStr),

    // ========== Error ==========
    /// Lexer error - unrecognized or unterminated input
    Error,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Op => write!(f, "'op'"),
            TokenKind::Profile => write!(f, "'profile'"),
            TokenKind::Fn => write!(f, "'fn'"),
            TokenKind::Let => write!(f, "'let'"),
            TokenKind::Use => write!(f, "'use'"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::Else => write!(f, "'else'"),
            TokenKind::Match => write!(f, "'match'"),
            TokenKind::Run => write!(f, "'run'"),
            TokenKind::With => write!(f, "'with'"),
            TokenKind::Zip => write!(f, "'zip'"),
            TokenKind::Path => write!(f, "'path'"),
            TokenKind::Emit => write!(f, "'emit'"),
            TokenKind::Env => write!(f, "'env'"),
            TokenKind::In => write!(f, "'in'"),
            TokenKind::True => write!(f, "'true'"),
            TokenKind::False => write!(f, "'false'"),
            TokenKind::Null => write!(f, "'null'"),
            TokenKind::PipeArrow => write!(f, "'|>'"),
            TokenKind::PipePipe => write!(f, "'||'"),
            TokenKind::Bar => write!(f, "'|'"),
            TokenKind::AmpAmp => write!(f, "'&&'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::LtEq => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::GtEq => write!(f, "'>='"),
            TokenKind::TildeEq => write!(f, "'~='"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::FatArrow => write!(f, "'=>'"),
            TokenKind::Arrow => write!(f, "'->'"),
            TokenKind::DotDot => write!(f, "'..'"),
            TokenKind::DotDotEq => write!(f, "'..='"),
            TokenKind::ColonColon => write!(f, "'::'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Integer(s) => write!(f, "integer `{}`", s),
            TokenKind::Float(s) => write!(f, "float `{}`", s),
            TokenKind::Duration(s) => write!(f, "duration `{}`", s),
            TokenKind::Size(s) => write!(f, "size `{}`", s),
            TokenKind::InterpolatedString(_) | TokenKind::SimpleString(_) => {
                write!(f, "string literal")
            }
            TokenKind::ByteString(_) => write!(f, "byte string literal"),
            TokenKind::Identifier(s) => write!(f, "identifier `{}`", s),
            TokenKind::LineComment(_) => write!(f, "comment"),
            TokenKind::BlockComment(_) => write!(f, "block comment"),
            TokenKind::Error => write!(f, "invalid token"),
        }
    }
}

impl TokenKind {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Op
                | TokenKind::Profile
                | TokenKind::Fn
                | TokenKind::Let
                | TokenKind::Use
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::Match
                | TokenKind::Run
                | TokenKind::With
                | TokenKind::Zip
                | TokenKind::Path
                | TokenKind::Emit
                | TokenKind::Env
                | TokenKind::In
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// Keywords that open a declaration
    pub fn is_declaration_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Op | TokenKind::Profile | TokenKind::Fn | TokenKind::Let | TokenKind::Use
        )
    }

    /// Check if this token is a literal (`true`/`false`/`null` included)
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Integer(_)
                | TokenKind::Float(_)
                | TokenKind::Duration(_)
                | TokenKind::Size(_)
                | TokenKind::InterpolatedString(_)
                | TokenKind::SimpleString(_)
                | TokenKind::ByteString(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// Integer and float tokens, the ones a prefix `-` may fold into
    pub fn is_signable_number(&self) -> bool {
        matches!(self, TokenKind::Integer(_) | TokenKind::Float(_))
    }

    /// Check if this token is a comment
    pub fn is_comment(&self) -> bool {
        matches!(self, TokenKind::LineComment(_) | TokenKind::BlockComment(_))
    }

    /// Check if this token is trivia. Whitespace is never tokenized, so only
    /// comments qualify.
    pub fn is_trivia(&self) -> bool {
        self.is_comment()
    }
}

/// Lexer error type with the offending span and what was expected instead
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, span: Span },

    #[error("unterminated string literal, expected a closing {quote}")]
    UnterminatedString { quote: char, span: Span },

    #[error("unterminated block comment, expected a closing '*/'")]
    UnterminatedBlockComment { span: Span },

    #[error("invalid escape sequence '{sequence}', expected {expected}")]
    InvalidEscape {
        sequence: String,
        expected: &'static str,
        span: Span,
    },

    #[error("invalid {kind} literal '{text}': {reason}")]
    InvalidNumber {
        kind: &'static str,
        text: String,
        reason: String,
        span: Span,
    },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span, .. }
            | LexError::UnterminatedBlockComment { span }
            | LexError::InvalidEscape { span, .. }
            | LexError::InvalidNumber { span, .. } => *span,
        }
    }

    /// Errors after which no later token position can be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LexError::UnterminatedString { .. } | LexError::UnterminatedBlockComment { .. }
        )
    }

    /// Classify a slice that logos rejected.
    fn from_rejected(text: &str, span: Span) -> LexError {
        if text.starts_with("/*") {
            LexError::UnterminatedBlockComment { span }
        } else if text.starts_with('\'') {
            LexError::UnterminatedString { quote: '\'', span }
        } else if text.starts_with('"') || text.starts_with("b\"") {
            LexError::UnterminatedString { quote: '"', span }
        } else {
            LexError::UnexpectedCharacter {
                ch: text.chars().next().unwrap_or('?'),
                span,
            }
        }
    }
}

/// Lexer for Onyx source code
pub struct Lexer<'src> {
    source: &'src str,
    offset: usize,
    inner: logos::Lexer<'src, TokenKind>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'src str) -> Self {
        Self::with_offset(source, 0)
    }

    /// Lex a fragment of a larger file; every span is shifted by `offset`.
    pub fn with_offset(source: &'src str, offset: usize) -> Self {
        Self {
            source,
            offset,
            inner: TokenKind::lexer(source),
        }
    }

    /// Tokenize the entire source into a vector of tokens
    pub fn tokenize(self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        for (result, range) in self.inner.spanned() {
            let span = Span::from(range.clone()).shifted(self.offset);
            match result {
                Ok(kind) => tokens.push(Token::new(kind, span)),
                Err(()) => {
                    let text = self.source.get(range).unwrap_or_default();
                    errors.push(LexError::from_rejected(text, span));
                    tokens.push(Token::new(TokenKind::Error, span));
                }
            }
        }

        (tokens, errors)
    }

    /// Tokenize, dropping comments
    pub fn tokenize_filtered(self) -> (Vec<Token>, Vec<LexError>) {
        let (tokens, errors) = self.tokenize();
        let filtered: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        (filtered, errors)
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = std::result::Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|result| {
            let range = self.inner.span();
            let span = Span::from(range.clone()).shifted(self.offset);
            match result {
                Ok(kind) => Ok(Token::new(kind, span)),
                Err(()) => Err(LexError::from_rejected(
                    self.source.get(range).unwrap_or_default(),
                    span,
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(source).tokenize_filtered();
        assert!(errors.is_empty(), "Errors: {:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords() {
        let tokens = kinds("op profile fn let use if else match run with zip path emit env in");
        assert_eq!(tokens.len(), 15);
        assert_eq!(tokens[0], TokenKind::Op);
        assert_eq!(tokens[1], TokenKind::Profile);
        assert_eq!(tokens[8], TokenKind::Run);
        assert_eq!(tokens[11], TokenKind::Path);
        assert_eq!(tokens[14], TokenKind::In);
        assert!(tokens.iter().all(|t| t.is_keyword()));
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let tokens = kinds("runner paths emitter");
        assert!(matches!(&tokens[0], TokenKind::Identifier(s) if s == "runner"));
        assert!(matches!(&tokens[1], TokenKind::Identifier(s) if s == "paths"));
        assert!(matches!(&tokens[2], TokenKind::Identifier(s) if s == "emitter"));
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("|> || | && == != ! <= >= ~= -> => .. ..= :: .");
        assert_eq!(
            tokens,
            vec![
                TokenKind::PipeArrow,
                TokenKind::PipePipe,
                TokenKind::Bar,
                TokenKind::AmpAmp,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Bang,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::TildeEq,
                TokenKind::Arrow,
                TokenKind::FatArrow,
                TokenKind::DotDot,
                TokenKind::DotDotEq,
                TokenKind::ColonColon,
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn test_integers() {
        let tokens = kinds("42 0xFF 0o17 0b1010");
        assert!(matches!(&tokens[0], TokenKind::Integer(s) if s == "42"));
        assert!(matches!(&tokens[1], TokenKind::Integer(s) if s == "0xFF"));
        assert!(matches!(&tokens[2], TokenKind::Integer(s) if s == "0o17"));
        assert!(matches!(&tokens[3], TokenKind::Integer(s) if s == "0b1010"));
    }

    #[test]
    fn test_minus_is_always_separate() {
        let tokens = kinds("-1 a-1");
        assert_eq!(tokens[0], TokenKind::Minus);
        assert!(matches!(&tokens[1], TokenKind::Integer(s) if s == "1"));
        assert!(matches!(&tokens[2], TokenKind::Identifier(_)));
        assert_eq!(tokens[3], TokenKind::Minus);
        assert!(matches!(&tokens[4], TokenKind::Integer(s) if s == "1"));
    }

    #[test]
    fn test_floats() {
        let tokens = kinds("3.14 3.14e2 1e-3");
        assert!(matches!(&tokens[0], TokenKind::Float(s) if s == "3.14"));
        assert!(matches!(&tokens[1], TokenKind::Float(s) if s == "3.14e2"));
        assert!(matches!(&tokens[2], TokenKind::Float(s) if s == "1e-3"));
    }

    #[test]
    fn test_duration_and_size_suffixes() {
        let tokens = kinds("10s 250ms 1.5m 2h 5kb 1.5mb 3gb 1tb");
        assert!(matches!(&tokens[0], TokenKind::Duration(s) if s == "10s"));
        assert!(matches!(&tokens[1], TokenKind::Duration(s) if s == "250ms"));
        assert!(matches!(&tokens[2], TokenKind::Duration(s) if s == "1.5m"));
        assert!(matches!(&tokens[3], TokenKind::Duration(s) if s == "2h"));
        assert!(matches!(&tokens[4], TokenKind::Size(s) if s == "5kb"));
        assert!(matches!(&tokens[5], TokenKind::Size(s) if s == "1.5mb"));
        assert!(matches!(&tokens[6], TokenKind::Size(s) if s == "3gb"));
        assert!(matches!(&tokens[7], TokenKind::Size(s) if s == "1tb"));
    }

    #[test]
    fn test_suffix_requires_adjacency() {
        let tokens = kinds("10 s");
        assert!(matches!(&tokens[0], TokenKind::Integer(s) if s == "10"));
        assert!(matches!(&tokens[1], TokenKind::Identifier(s) if s == "s"));
    }

    #[test]
    fn test_range_after_integer() {
        let tokens = kinds("1..5 1..=5");
        assert!(matches!(&tokens[0], TokenKind::Integer(s) if s == "1"));
        assert_eq!(tokens[1], TokenKind::DotDot);
        assert!(matches!(&tokens[2], TokenKind::Integer(s) if s == "5"));
        assert_eq!(tokens[4], TokenKind::DotDotEq);
    }

    #[test]
    fn test_strings() {
        let tokens = kinds(r#"'simple' "interpolated" b"bytes""#);
        assert!(matches!(&tokens[0], TokenKind::SimpleString(s) if s == "'simple'"));
        assert!(matches!(&tokens[1], TokenKind::InterpolatedString(s) if s == "\"interpolated\""));
        assert!(matches!(&tokens[2], TokenKind::ByteString(s) if s == "b\"bytes\""));
    }

    #[test]
    fn test_interpolation_with_nested_braces_and_quotes() {
        let source = r#""total: ${ {a: "}"}.a } done" x"#;
        let tokens = kinds(source);
        assert_eq!(tokens.len(), 2);
        assert!(matches!(&tokens[0], TokenKind::InterpolatedString(s) if s == r#""total: ${ {a: "}"}.a } done""#));
        assert!(matches!(&tokens[1], TokenKind::Identifier(s) if s == "x"));
    }

    #[test]
    fn test_comment_in_interpolation_does_not_close_it() {
        let tokens = kinds("\"a${ x // }\n }b\" y");
        assert_eq!(tokens.len(), 2);
        assert!(matches!(&tokens[1], TokenKind::Identifier(s) if s == "y"));
    }

    #[test]
    fn test_deeply_nested_strings_are_one_token() {
        let levels = 20_000;
        let source = format!("{}1{}", "\"${".repeat(levels), "}\"".repeat(levels));
        let (tokens, errors) = Lexer::new(&source).tokenize();
        assert!(errors.is_empty(), "Errors: {:?}", errors);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].span, Span::new(0, source.len()));
    }

    #[test]
    fn test_escaped_quote_does_not_close_string() {
        let tokens = kinds(r#""say \"hi\"" next"#);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_comments() {
        let source = "a // line\n/* block\n comment */ b";
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 4);
        assert!(tokens[1].kind.is_comment());
        assert!(matches!(&tokens[2].kind, TokenKind::BlockComment(s) if s == "/* block\n comment */"));

        assert_eq!(kinds(source).len(), 2);
    }

    #[test]
    fn test_block_comment_ends_at_first_close() {
        let tokens = kinds("/* a /* b */ c */");
        assert!(matches!(&tokens[0], TokenKind::Identifier(s) if s == "c"));
        assert_eq!(tokens[1], TokenKind::Star);
        assert_eq!(tokens[2], TokenKind::Slash);
    }

    #[test]
    fn test_unterminated_string() {
        let source = "let a = \"open";
        let (_, errors) = Lexer::new(source).tokenize();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_fatal());
        assert_eq!(
            errors[0],
            LexError::UnterminatedString {
                quote: '"',
                span: Span::new(8, source.len()),
            }
        );
    }

    #[test]
    fn test_unterminated_interpolation() {
        let (_, errors) = Lexer::new("\"a ${ b \"").tokenize();
        assert!(matches!(errors[0], LexError::UnterminatedString { .. }));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (_, errors) = Lexer::new("a /* never closed").tokenize();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0],
            LexError::UnterminatedBlockComment {
                span: Span::new(2, 17)
            }
        );
    }

    #[test]
    fn test_error_token_for_invalid_char() {
        let (tokens, errors) = Lexer::new("a ; b").tokenize();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LexError::UnexpectedCharacter { ch: ';', .. }));
        assert!(!errors[0].is_fatal());
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_with_offset_shifts_spans() {
        let (tokens, _) = Lexer::with_offset("a + b", 10).tokenize();
        assert_eq!(tokens[0].span, Span::new(10, 11));
        assert_eq!(tokens[2].span, Span::new(14, 15));
    }

    #[test]
    fn test_span_correctness() {
        let source = "emit.json(x)";
        let (tokens, _) = Lexer::new(source).tokenize();
        assert_eq!(tokens[0].span, Span::new(0, 4));
        assert!(tokens[0].span.touches(tokens[1].span));
        assert!(tokens[2].span.touches(tokens[3].span));
        assert_eq!(tokens[2].text(source), Some("json"));
    }

    #[test]
    fn test_lexer_is_restartable() {
        let source = "op get = http.get \"/users\"";
        let first = Lexer::new(source).tokenize();
        let second = Lexer::new(source).tokenize();
        assert_eq!(first, second);
    }

    #[test]
    fn test_iterator_matches_tokenize() {
        let source = "let x = [1, 2]";
        let collected: Vec<Token> = Lexer::new(source).filter_map(Result::ok).collect();
        let (tokens, _) = Lexer::new(source).tokenize();
        assert_eq!(collected, tokens);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(TokenKind::LBrace.to_string(), "'{'");
        assert_eq!(TokenKind::Identifier("x".into()).to_string(), "identifier `x`");
        assert_eq!(TokenKind::PipeArrow.to_string(), "'|>'");
    }
}
