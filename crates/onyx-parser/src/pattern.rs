//! Patterns for `let` bindings and `match` arms.

use onyx_ast::*;
use onyx_lexer::TokenKind;

use crate::{ParseError, ParseResult, Parser};

impl<'src> Parser<'src> {
    pub(crate) fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        self.nested(Self::parse_pattern_inner)
    }

    fn parse_pattern_inner(&mut self) -> ParseResult<Pattern> {
        let start = self.current_span();

        match self.current_kind().cloned() {
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                let kind = if name == "_" {
                    PatternKind::Wildcard
                } else {
                    PatternKind::Ident(name)
                };
                Ok(Pattern { kind, span: start })
            }

            Some(TokenKind::DotDot | TokenKind::DotDotEq) => {
                let inclusive = self.check(&TokenKind::DotDotEq);
                self.advance();
                if !self.at_literal() {
                    return Err(self.invalid_pattern(start, "expected a literal after '..'"));
                }
                let end = self.parse_literal()?;
                let span = start.merge(end.span);
                Ok(Pattern {
                    kind: PatternKind::Range {
                        start: None,
                        end: Some(end),
                        inclusive,
                    },
                    span,
                })
            }

            Some(TokenKind::LBracket) => {
                self.advance();
                match self.parse_delimited(start, TokenKind::RBracket, true, Self::parse_pattern) {
                    Ok((elements, close)) => Ok(Pattern {
                        kind: PatternKind::Array(elements),
                        span: start.merge(close),
                    }),
                    Err(e) => Err(Self::widen_pattern_error(start, e)),
                }
            }

            Some(TokenKind::LBrace) => {
                self.advance();
                match self.parse_delimited(start, TokenKind::RBrace, true, Self::parse_field_pattern)
                {
                    Ok((fields, close)) => Ok(Pattern {
                        kind: PatternKind::Object(fields),
                        span: start.merge(close),
                    }),
                    Err(e) => Err(Self::widen_pattern_error(start, e)),
                }
            }

            _ if self.at_literal() => {
                let literal = self.parse_literal()?;
                if !matches!(
                    self.current_kind(),
                    Some(TokenKind::DotDot | TokenKind::DotDotEq)
                ) {
                    let span = literal.span;
                    return Ok(Pattern {
                        kind: PatternKind::Literal(literal),
                        span,
                    });
                }

                let inclusive = self.check(&TokenKind::DotDotEq);
                self.advance();
                let end = if self.at_literal() {
                    Some(self.parse_literal()?)
                } else {
                    None
                };
                Ok(Pattern {
                    span: start.merge(self.previous_span()),
                    kind: PatternKind::Range {
                        start: Some(literal),
                        end,
                        inclusive,
                    },
                })
            }

            _ => Err(self.invalid_pattern(start, format!("expected a pattern, found {}", self.found()))),
        }
    }

    /// `key` or `key: pattern`
    fn parse_field_pattern(&mut self) -> ParseResult<FieldPattern> {
        let key = self.parse_identifier("field name in object pattern")?;
        let pattern = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_pattern()?)
        } else {
            None
        };
        let span = match &pattern {
            Some(p) => key.span.merge(p.span),
            None => key.span,
        };
        Ok(FieldPattern { key, pattern, span })
    }

    fn invalid_pattern(&self, start: Span, hint: impl Into<String>) -> ParseError {
        ParseError::InvalidPattern {
            hint: hint.into(),
            span: start.merge(self.current_span()),
        }
    }

    /// Report a failure inside `[...]` or `{...}` against the whole pattern
    /// from its opening bracket.
    fn widen_pattern_error(start: Span, error: ParseError) -> ParseError {
        match error {
            ParseError::InvalidPattern { hint, span } => ParseError::InvalidPattern {
                hint,
                span: start.merge(span),
            },
            ParseError::NestingTooDeep { .. } | ParseError::Lex(_) => error,
            other => ParseError::InvalidPattern {
                hint: other.to_string(),
                span: start.merge(other.span()),
            },
        }
    }
}
