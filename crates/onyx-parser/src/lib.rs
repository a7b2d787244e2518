//! Onyx Language Parser
//!
//! Recursive descent parser that produces an AST from the token stream.
//! Binary operators are parsed by precedence climbing; everything else is one
//! function per construct. Errors are collected rather than returned, and the
//! parser skips to the next statement boundary after each one so a single run
//! reports every independent problem in a file.

mod decl;
mod expr;
mod pattern;
pub mod report;
mod run;

use miette::Diagnostic;
use onyx_ast::*;
use onyx_lexer::{LexError, Lexer, Token, TokenKind};
use thiserror::Error;
use tracing::{debug, warn};

/// Nesting limit used by [`parse`]. A debug build parsing this deep stays
/// within the 2 MiB stack of a spawned thread.
pub const DEFAULT_MAX_DEPTH: usize = 48;

/// Parser error type. Every variant carries the span it refers to.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, found {found}")]
    #[diagnostic(code(onyx::parse::unexpected_token))]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of input: expected {expected}")]
    #[diagnostic(code(onyx::parse::unexpected_eof))]
    UnexpectedEof { expected: String, span: Span },

    #[error("missing operand after '{operator}': expected an expression, found {found}")]
    #[diagnostic(code(onyx::parse::missing_operand))]
    MissingOperand {
        operator: String,
        found: String,
        span: Span,
    },

    #[error("unclosed {delimiter}: expected {expected}, found {found}")]
    #[diagnostic(
        code(onyx::parse::unclosed_delimiter),
        help("every opening {delimiter} needs a matching close")
    )]
    UnclosedDelimiter {
        delimiter: &'static str,
        expected: String,
        found: String,
        open_span: Span,
        span: Span,
    },

    #[error("invalid pattern: {hint}")]
    #[diagnostic(code(onyx::parse::invalid_pattern))]
    InvalidPattern { hint: String, span: Span },

    #[error("ambiguous {construct}: {hint}")]
    #[diagnostic(
        code(onyx::parse::ambiguous),
        help("a '{{' followed by `key:` starts an object literal; anything else starts a block")
    )]
    Ambiguous {
        construct: &'static str,
        hint: String,
        span: Span,
    },

    #[error("nesting exceeds the maximum depth of {limit}")]
    #[diagnostic(
        code(onyx::parse::too_deep),
        help("move inner parts into `let` bindings")
    )]
    NestingTooDeep { limit: usize, span: Span },

    #[error("{0}")]
    #[diagnostic(code(onyx::lex))]
    Lex(#[from] LexError),
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::MissingOperand { span, .. }
            | ParseError::UnclosedDelimiter { span, .. }
            | ParseError::InvalidPattern { span, .. }
            | ParseError::Ambiguous { span, .. }
            | ParseError::NestingTooDeep { span, .. } => *span,
            ParseError::Lex(e) => e.span(),
        }
    }
}

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Parser settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Deepest allowed nesting of expressions, blocks and patterns
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParserConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Where error recovery may stop skipping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    TopLevel,
    Block,
    RunBlock,
}

/// Parser state
pub struct Parser<'src> {
    source: &'src str,
    /// Absolute offset of `source` in the file (non-zero for interpolations)
    offset: usize,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    config: ParserConfig,
    errors: Vec<ParseError>,
    /// Set when lexing hit an error that leaves no safe place to resume
    aborted: bool,
}

impl<'src> Parser<'src> {
    /// Create a new parser from source code
    pub fn new(source: &'src str) -> Self {
        Self::with_config(source, ParserConfig::default())
    }

    pub fn with_config(source: &'src str, config: ParserConfig) -> Self {
        Self::fragment(source, 0, 0, config)
    }

    /// Parser over part of a file, starting at `depth` levels of nesting.
    fn fragment(source: &'src str, offset: usize, depth: usize, config: ParserConfig) -> Self {
        let lexer = Lexer::with_offset(source, offset);
        let (tokens, lex_errors) = lexer.tokenize_filtered();
        let aborted = lex_errors.iter().any(LexError::is_fatal);

        Self {
            source,
            offset,
            // Rejected characters were already reported by the lexer
            tokens: tokens
                .into_iter()
                .filter(|t| t.kind != TokenKind::Error)
                .collect(),
            pos: 0,
            depth,
            config,
            errors: lex_errors.into_iter().map(ParseError::Lex).collect(),
            aborted,
        }
    }

    /// Parse the entire program
    pub fn parse_program(&mut self) -> Program {
        let span = Span::new(self.offset, self.offset + self.source.len());

        if self.aborted {
            warn!(
                "abandoning parse after {} lexical error(s) with no safe resume point",
                self.errors.len()
            );
            return Program {
                items: Vec::new(),
                span,
            };
        }

        let mut items = Vec::new();
        while !self.is_eof() {
            let start = self.pos;
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.errors.push(e);
                    self.recover(start, Boundary::TopLevel);
                }
            }
        }

        Program { items, span }
    }

    /// Parse a source that must hold exactly one expression
    pub fn parse_single_expression(&mut self) -> ParseResult<Expr> {
        if self.aborted {
            return Err(self.unexpected("expression"));
        }
        let expr = self.parse_expression()?;
        if !self.is_eof() {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    // ========================================================================
    // Token Navigation
    // ========================================================================

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<&TokenKind> {
        self.current().map(|t| &t.kind)
    }

    fn current_span(&self) -> Span {
        self.current().map(|t| t.span).unwrap_or_else(|| self.eof_span())
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_else(|| Span::new(self.offset, self.offset))
    }

    fn eof_span(&self) -> Span {
        let end = self.offset + self.source.len();
        Span::new(end, end)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<&Token> {
        if !self.is_eof() {
            self.pos += 1;
        }
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek_nth_kind(1)
    }

    fn peek_nth_kind(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    /// Description of the current token for error messages
    fn found(&self) -> String {
        self.current_kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        if self.is_eof() {
            ParseError::UnexpectedEof {
                expected: expected.into(),
                span: self.eof_span(),
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.into(),
                found: self.found(),
                span: self.current_span(),
            }
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Span> {
        if self.check(&kind) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    /// Expect the closer matching a delimiter opened at `open`.
    fn expect_closing(&mut self, open: Span, close: TokenKind, expected: &str) -> ParseResult<Span> {
        if self.check(&close) {
            let span = self.current_span();
            self.advance();
            return Ok(span);
        }
        let delimiter = match close {
            TokenKind::RParen => "parenthesis",
            TokenKind::RBracket => "bracket",
            TokenKind::RBrace => "brace",
            _ => "parameter list",
        };
        Err(ParseError::UnclosedDelimiter {
            delimiter,
            expected: expected.to_string(),
            found: self.found(),
            open_span: open,
            span: self.current_span(),
        })
    }

    fn parse_identifier(&mut self, expected: &str) -> ParseResult<Ident> {
        let span = self.current_span();
        match self.current_kind() {
            Some(TokenKind::Identifier(s)) => {
                let name = s.clone();
                self.advance();
                Ok(Spanned::new(name, span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Comma-separated items up to `close`, the opener already consumed.
    /// Returns the items and the span of the closer.
    fn parse_delimited<T>(
        &mut self,
        open: Span,
        close: TokenKind,
        allow_trailing: bool,
        mut item: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<(Vec<T>, Span)> {
        let mut items = Vec::new();
        if !self.check(&close) {
            loop {
                items.push(item(self)?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
                if allow_trailing && self.check(&close) {
                    break;
                }
            }
        }
        let expected = format!("',' or {}", close);
        let close_span = self.expect_closing(open, close, &expected)?;
        Ok((items, close_span))
    }

    /// Run `f` one nesting level deeper, failing once the limit is reached.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= self.config.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.config.max_depth,
                span: self.current_span(),
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ========================================================================
    // Error Recovery
    // ========================================================================

    /// Skip to the next statement boundary: a declaration keyword outside any
    /// brackets, or the `}` closing the enclosing block. Always consumes at
    /// least one token when the failed item consumed none.
    fn recover(&mut self, item_start: usize, boundary: Boundary) {
        let mut must_skip = self.pos == item_start;
        let mut depth = 0usize;
        while let Some(kind) = self.current_kind() {
            if depth == 0 && !must_skip {
                if kind.is_declaration_keyword() && !self.at_step_start() {
                    break;
                }
                if boundary != Boundary::TopLevel && *kind == TokenKind::RBrace {
                    break;
                }
                if boundary == Boundary::RunBlock && self.at_step_start() {
                    break;
                }
            }
            match kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            must_skip = false;
            self.advance();
        }

        debug!(
            "recovered at {:?} after skipping from token {}",
            self.current_span(),
            item_start
        );
    }

    // ========================================================================
    // Items and Blocks
    // ========================================================================

    fn parse_item(&mut self) -> ParseResult<Item> {
        match self.parse_declaration()? {
            Some(decl) => Ok(Item::Decl(decl)),
            None => Ok(Item::Expr(self.parse_expression()?)),
        }
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        self.nested(Self::parse_block_inner)
    }

    fn parse_block_inner(&mut self) -> ParseResult<Block> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            let start = self.pos;
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.errors.push(e);
                    self.recover(start, Boundary::Block);
                }
            }
        }

        let close = self.expect_closing(open, TokenKind::RBrace, "'}'")?;
        Ok(Block {
            items,
            span: open.merge(close),
        })
    }
}

/// Parse a complete source file with the default configuration.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    parse_with_config(source, ParserConfig::default())
}

pub fn parse_with_config(source: &str, config: ParserConfig) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::with_config(source, config);
    let program = parser.parse_program();
    debug!(
        "parsed {} bytes into {} items with {} diagnostics",
        source.len(),
        program.items.len(),
        parser.errors.len()
    );
    (program, parser.into_errors())
}

/// Parse a source holding a single expression. The expression is `None` when
/// it could not be parsed; the diagnostics say why.
pub fn parse_expression(source: &str) -> (Option<Expr>, Vec<ParseError>) {
    let mut parser = Parser::new(source);
    match parser.parse_single_expression() {
        Ok(expr) => (Some(expr), parser.into_errors()),
        Err(e) => {
            let mut errors = parser.into_errors();
            errors.push(e);
            (None, errors)
        }
    }
}
