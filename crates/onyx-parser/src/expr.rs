//! Expression parsing: pipes, binary operators by precedence climbing, unary
//! and postfix forms, and every primary construct.

use onyx_ast::*;
use onyx_lexer::literal::{self, StringSegment};
use onyx_lexer::TokenKind;

use crate::{ParseError, ParseResult, Parser};

/// Binary operator for a token, if it is one
fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::In => BinaryOp::In,
        TokenKind::TildeEq => BinaryOp::Matches,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        _ => return None,
    })
}

impl<'src> Parser<'src> {
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.nested(Self::parse_pipe)
    }

    /// Pipe: `left |> right`, lowest precedence, left-associative
    fn parse_pipe(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_binary(0)?;

        while self.check(&TokenKind::PipeArrow) {
            self.advance();
            self.expect_operand("|>")?;
            let right = self.parse_binary(0)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Pipe {
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Binary operators with at least `min_prec` binding strength
    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some(op) = self.current_kind().and_then(binary_op) {
            if op.precedence() < min_prec {
                break;
            }
            self.advance();
            self.expect_operand(op.symbol())?;
            let right = self.parse_binary(op.precedence() + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current_kind() {
            Some(TokenKind::Bang) => UnaryOp::Not,
            Some(TokenKind::Minus) if !self.at_negative_number() => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let start = self.current_span();
        self.advance();
        self.expect_operand(op.symbol())?;

        let operand = self.nested(Self::parse_unary)?;
        let span = start.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        // `emit` takes its arguments only through `emit.format(...)`
        if matches!(expr.kind, ExprKind::Emit(_)) {
            return Ok(expr);
        }

        loop {
            match self.current_kind() {
                Some(TokenKind::Dot) => {
                    self.advance();
                    let field = self.parse_identifier("field name after '.'")?;
                    let span = expr.span.merge(field.span);
                    expr = Expr::new(
                        ExprKind::Field {
                            object: Box::new(expr),
                            field,
                        },
                        span,
                    );
                }
                Some(TokenKind::LBracket) => {
                    let open = self.current_span();
                    self.advance();
                    let index = self.parse_expression()?;
                    let close = self.expect_closing(open, TokenKind::RBracket, "']'")?;
                    let span = expr.span.merge(close);
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                Some(TokenKind::LParen) => {
                    let open = self.current_span();
                    self.advance();
                    let (args, close) =
                        self.parse_delimited(open, TokenKind::RParen, false, Self::parse_expression)?;
                    let span = expr.span.merge(close);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Each construct has its own method so this frame stays small; it sits
    /// on the stack once per level of nesting.
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.current_kind() {
            Some(kind) if kind.is_literal() => self.parse_literal_or_range(),
            Some(TokenKind::Minus) if self.at_negative_number() => self.parse_literal_or_range(),
            Some(TokenKind::DotDot | TokenKind::DotDotEq) => self.parse_open_range(),
            Some(TokenKind::Identifier(_)) => self.parse_ident_expr(),
            Some(TokenKind::Env) => self.parse_env(),
            Some(TokenKind::LParen) => self.parse_paren(),
            Some(TokenKind::LBracket) => self.parse_array(),
            Some(TokenKind::LBrace) => self.parse_brace(),
            Some(TokenKind::If) => self.parse_if_expr(),
            Some(TokenKind::Match) => self.parse_match_expr(),
            Some(TokenKind::Bar | TokenKind::PipePipe) => self.parse_lambda(),
            Some(TokenKind::Run) => self.parse_run_expr(),
            Some(TokenKind::Emit) => self.parse_emit(),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `..end` or `..=end`
    fn parse_open_range(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        let inclusive = self.check(&TokenKind::DotDotEq);
        self.advance();
        if !self.at_integer() {
            return Err(self.unexpected("integer literal after '..'"));
        }
        let end = self.parse_literal()?;
        let span = start.merge(end.span);
        let range = RangeExpr {
            start: None,
            end: Some(end),
            inclusive,
        };
        Ok(Expr::new(ExprKind::Range(Box::new(range)), span))
    }

    fn parse_ident_expr(&mut self) -> ParseResult<Expr> {
        let name = self.parse_identifier("expression")?;
        Ok(Expr::new(ExprKind::Ident(name.node), name.span))
    }

    /// `env.NAME`
    fn parse_env(&mut self) -> ParseResult<Expr> {
        let start = self.expect(TokenKind::Env)?;
        self.expect(TokenKind::Dot)?;
        let name = self.parse_identifier("environment variable name after 'env.'")?;
        let span = start.merge(name.span);
        Ok(Expr::new(ExprKind::Env(name), span))
    }

    fn parse_paren(&mut self) -> ParseResult<Expr> {
        let open = self.expect(TokenKind::LParen)?;
        let inner = self.parse_expression()?;
        let close = self.expect_closing(open, TokenKind::RParen, "')'")?;
        Ok(Expr::new(ExprKind::Paren(Box::new(inner)), open.merge(close)))
    }

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let open = self.expect(TokenKind::LBracket)?;
        let (elements, close) =
            self.parse_delimited(open, TokenKind::RBracket, true, Self::parse_expression)?;
        Ok(Expr::new(ExprKind::Array(elements), open.merge(close)))
    }

    /// An object literal when `{` is followed by `key:`, otherwise a block.
    /// The block shares this expression's nesting level.
    fn parse_brace(&mut self) -> ParseResult<Expr> {
        if self.at_object_start() {
            let object = self.parse_object(true)?;
            let span = object.span;
            Ok(Expr::new(ExprKind::Object(object), span))
        } else {
            let block = self.parse_block_inner()?;
            let span = block.span;
            Ok(Expr::new(ExprKind::Block(block), span))
        }
    }

    fn parse_if_expr(&mut self) -> ParseResult<Expr> {
        let if_expr = self.parse_if()?;
        let span = if_expr.span;
        Ok(Expr::new(ExprKind::If(Box::new(if_expr)), span))
    }

    fn parse_match_expr(&mut self) -> ParseResult<Expr> {
        let match_expr = self.parse_match()?;
        let span = match_expr.span;
        Ok(Expr::new(ExprKind::Match(match_expr), span))
    }

    fn parse_run_expr(&mut self) -> ParseResult<Expr> {
        let run = self.parse_run()?;
        let span = run.span();
        Ok(Expr::new(ExprKind::Run(Box::new(run)), span))
    }

    // ========================================================================
    // Operands and lookahead
    // ========================================================================

    /// Whether the current token can begin an expression
    fn at_expression_start(&self) -> bool {
        match self.current_kind() {
            Some(kind) => {
                kind.is_literal()
                    || matches!(
                        kind,
                        TokenKind::Identifier(_)
                            | TokenKind::Env
                            | TokenKind::LParen
                            | TokenKind::LBracket
                            | TokenKind::LBrace
                            | TokenKind::If
                            | TokenKind::Match
                            | TokenKind::Bar
                            | TokenKind::PipePipe
                            | TokenKind::Run
                            | TokenKind::Emit
                            | TokenKind::DotDot
                            | TokenKind::DotDotEq
                            | TokenKind::Minus
                            | TokenKind::Bang
                    )
            }
            None => false,
        }
    }

    /// The right-hand side of `operator` must be present
    fn expect_operand(&self, operator: &str) -> ParseResult<()> {
        if self.at_expression_start() {
            return Ok(());
        }
        Err(ParseError::MissingOperand {
            operator: operator.to_string(),
            found: self.found(),
            span: self.current_span(),
        })
    }

    /// `-` written directly against a number is part of the literal
    pub(crate) fn at_negative_number(&self) -> bool {
        self.check(&TokenKind::Minus)
            && self.peek_kind().is_some_and(TokenKind::is_signable_number)
            && self
                .tokens
                .get(self.pos + 1)
                .is_some_and(|next| self.current_span().touches(next.span))
    }

    fn at_integer(&self) -> bool {
        match self.current_kind() {
            Some(TokenKind::Integer(_)) => true,
            Some(TokenKind::Minus) => {
                self.at_negative_number() && matches!(self.peek_kind(), Some(TokenKind::Integer(_)))
            }
            _ => false,
        }
    }

    /// A literal token, or `-` fused to a number
    pub(crate) fn at_literal(&self) -> bool {
        self.current_kind().is_some_and(TokenKind::is_literal) || self.at_negative_number()
    }

    /// `{` followed by `key:` (identifier or string key)
    fn at_object_start(&self) -> bool {
        self.check(&TokenKind::LBrace)
            && matches!(
                self.peek_kind(),
                Some(
                    TokenKind::Identifier(_)
                        | TokenKind::InterpolatedString(_)
                        | TokenKind::SimpleString(_)
                )
            )
            && matches!(self.peek_nth_kind(2), Some(TokenKind::Colon))
    }

    /// An object in a position where only an object may follow: `{ key: ...`
    /// or `{}`.
    pub(crate) fn at_optional_object(&self) -> bool {
        self.at_object_start()
            || (self.check(&TokenKind::LBrace) && self.peek_kind() == Some(&TokenKind::RBrace))
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn parse_literal_or_range(&mut self) -> ParseResult<Expr> {
        if matches!(
            self.current_kind(),
            Some(TokenKind::InterpolatedString(_) | TokenKind::SimpleString(_))
        ) {
            return self.parse_string_expr();
        }

        let literal = self.parse_literal()?;
        let is_range_op = matches!(
            self.current_kind(),
            Some(TokenKind::DotDot | TokenKind::DotDotEq)
        );

        if literal.kind.as_integer().is_none() || !is_range_op {
            let span = literal.span;
            return Ok(Expr::new(ExprKind::Literal(literal), span));
        }

        let inclusive = self.check(&TokenKind::DotDotEq);
        self.advance();
        let end = if self.at_integer() {
            Some(self.parse_literal()?)
        } else {
            None
        };
        let span = literal.span.merge(self.previous_span());
        let range = RangeExpr {
            start: Some(literal),
            end,
            inclusive,
        };
        Ok(Expr::new(ExprKind::Range(Box::new(range)), span))
    }

    /// A single literal token, with a fused leading `-` for numbers
    pub(crate) fn parse_literal(&mut self) -> ParseResult<Literal> {
        let start = self.current_span();
        let negative = self.at_negative_number();
        if negative {
            self.advance();
        }
        let span = start.merge(self.current_span());
        let signed = |raw: &SmolStr| {
            if negative {
                SmolStr::new(format!("-{}", raw))
            } else {
                raw.clone()
            }
        };

        let kind = match self.current_kind().cloned() {
            Some(TokenKind::Integer(raw)) => {
                let raw = signed(&raw);
                let value = literal::parse_integer(&raw, span)?;
                LiteralKind::Integer { raw, value }
            }
            Some(TokenKind::Float(raw)) => {
                let raw = signed(&raw);
                let value = literal::parse_float(&raw, span)?;
                LiteralKind::Float { raw, value }
            }
            Some(TokenKind::Duration(raw)) => {
                let (value, unit) = literal::parse_duration(&raw, span)?;
                LiteralKind::Duration { raw, value, unit }
            }
            Some(TokenKind::Size(raw)) => {
                let (value, unit) = literal::parse_size(&raw, span)?;
                LiteralKind::Size { raw, value, unit }
            }
            Some(TokenKind::InterpolatedString(_) | TokenKind::SimpleString(_)) => {
                return Ok(self.parse_string_literal("string")?.into());
            }
            Some(TokenKind::ByteString(raw)) => {
                LiteralKind::ByteString(literal::decode_byte_string(&raw, span)?)
            }
            Some(TokenKind::True) => LiteralKind::Bool(true),
            Some(TokenKind::False) => LiteralKind::Bool(false),
            Some(TokenKind::Null) => LiteralKind::Null,
            _ => return Err(self.unexpected("literal")),
        };

        self.advance();
        Ok(Literal { kind, span })
    }

    fn parse_string_expr(&mut self) -> ParseResult<Expr> {
        let string = self.parse_string_literal("string")?;
        let span = string.span;
        Ok(Expr::new(ExprKind::Literal(string.into()), span))
    }

    /// A `"..."` or `'...'` string, with `${...}` parts parsed as expressions
    pub(crate) fn parse_string_literal(&mut self, expected: &str) -> ParseResult<StringLiteral> {
        let span = self.current_span();
        let literal = match self.current_kind().cloned() {
            Some(TokenKind::InterpolatedString(raw)) => {
                let mut parts = Vec::new();
                for segment in literal::split_interpolated(&raw, span)? {
                    parts.push(match segment {
                        StringSegment::Text(text) => StringPart::Text(text.into()),
                        StringSegment::Interpolation { source, offset } => {
                            StringPart::Interpolation(Box::new(self.parse_interpolation(source, offset)?))
                        }
                    });
                }
                StringLiteral {
                    parts,
                    quote: QuoteStyle::Double,
                    span,
                }
            }
            Some(TokenKind::SimpleString(raw)) => {
                let text = literal::decode_simple_string(&raw, span)?;
                let parts = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![StringPart::Text(text.into())]
                };
                StringLiteral {
                    parts,
                    quote: QuoteStyle::Single,
                    span,
                }
            }
            _ => return Err(self.unexpected(expected)),
        };
        self.advance();
        Ok(literal)
    }

    /// Parse the inside of `${...}` with a parser of its own over the
    /// fragment. Nesting already spent counts against the fragment.
    fn parse_interpolation(&mut self, source: &str, offset: usize) -> ParseResult<Expr> {
        let mut sub = Parser::fragment(source, offset, self.depth, self.config);
        let result = if sub.is_eof() && !sub.aborted {
            Err(ParseError::UnexpectedToken {
                expected: "expression inside '${...}'".to_string(),
                found: "'}'".to_string(),
                span: Span::new(offset.saturating_sub(2), offset + source.len() + 1),
            })
        } else {
            sub.parse_single_expression()
        };
        self.errors.append(&mut sub.errors);
        result
    }

    // ========================================================================
    // Compound expressions
    // ========================================================================

    /// `{ key: value, ... }`. With `from_lookahead` the brace was classified
    /// as an object only by its first key, and a body that stops looking
    /// like an object is reported as ambiguous.
    pub(crate) fn parse_object(&mut self, from_lookahead: bool) -> ParseResult<ObjectLit> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            fields.push(self.parse_field()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        if from_lookahead && !self.check(&TokenKind::RBrace) && !self.is_eof() {
            return Err(ParseError::Ambiguous {
                construct: "object literal or block",
                hint: format!(
                    "'{{' was read as an object literal, but {} follows a field where ',' or '}}' was expected",
                    self.found()
                ),
                span: open.merge(self.current_span()),
            });
        }

        let close = self.expect_closing(open, TokenKind::RBrace, "',' or '}'")?;
        Ok(ObjectLit {
            fields,
            span: open.merge(close),
        })
    }

    fn parse_field(&mut self) -> ParseResult<Field> {
        let key = match self.current_kind() {
            Some(TokenKind::Identifier(_)) => FieldKey::Ident(self.parse_identifier("field name")?),
            Some(TokenKind::InterpolatedString(_) | TokenKind::SimpleString(_)) => {
                FieldKey::String(self.parse_string_literal("field name")?)
            }
            _ => return Err(self.unexpected("field name")),
        };
        self.expect(TokenKind::Colon)?;
        let value = self.parse_expression()?;
        let span = key.span().merge(value.span);
        Ok(Field { key, value, span })
    }

    /// `if cond { ... } else if ... else { ... }`
    fn parse_if(&mut self) -> ParseResult<IfExpr> {
        let start = self.expect(TokenKind::If)?;
        let condition = self.parse_expression()?;
        let then_branch = self.parse_block()?;

        let else_branch = if self.check(&TokenKind::Else) {
            self.advance();
            if self.check(&TokenKind::If) {
                Some(ElseBranch::If(Box::new(self.nested(Self::parse_if)?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };

        Ok(IfExpr {
            condition: Box::new(condition),
            then_branch,
            else_branch,
            span: start.merge(self.previous_span()),
        })
    }

    fn parse_match(&mut self) -> ParseResult<MatchExpr> {
        let start = self.expect(TokenKind::Match)?;
        let subject = self.parse_expression()?;
        let open = self.expect(TokenKind::LBrace)?;
        let (arms, close) =
            self.parse_delimited(open, TokenKind::RBrace, true, Self::parse_match_arm)?;

        Ok(MatchExpr {
            subject: Box::new(subject),
            arms,
            span: start.merge(close),
        })
    }

    fn parse_match_arm(&mut self) -> ParseResult<MatchArm> {
        let pattern = self.parse_pattern()?;
        let guard = if self.check(&TokenKind::If) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::FatArrow)?;
        let body = self.parse_expression()?;
        let span = pattern.span.merge(body.span);

        Ok(MatchArm {
            pattern,
            guard,
            body,
            span,
        })
    }

    /// `|a, b| body` or `|| body`; the body extends as far as an expression can
    fn parse_lambda(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        let params = if self.check(&TokenKind::PipePipe) {
            self.advance();
            Vec::new()
        } else {
            let open = self.expect(TokenKind::Bar)?;
            let (params, _) = self.parse_delimited(open, TokenKind::Bar, false, |p| {
                p.parse_identifier("lambda parameter")
            })?;
            params
        };

        self.expect_operand("|")?;
        let body = self.parse_expression()?;
        let span = start.merge(body.span);
        Ok(Expr::new(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// `emit`, `emit.format` or `emit.format(args)`, each piece written with
    /// no space before it
    fn parse_emit(&mut self) -> ParseResult<Expr> {
        let emit = self.expect(TokenKind::Emit)?;
        let mut span = emit;
        let mut format = None;
        let mut args = None;

        if self.check(&TokenKind::Dot) && emit.touches(self.current_span()) {
            self.advance();
            let name = self.parse_identifier("output format after 'emit.'")?;
            span = span.merge(name.span);

            if self.check(&TokenKind::LParen) && name.span.touches(self.current_span()) {
                let open = self.current_span();
                self.advance();
                let (list, close) =
                    self.parse_delimited(open, TokenKind::RParen, false, Self::parse_expression)?;
                span = span.merge(close);
                args = Some(list);
            }
            format = Some(name);
        } else if self.check(&TokenKind::LParen) && emit.touches(self.current_span()) {
            return Err(ParseError::UnexpectedToken {
                expected: "'.' and an output format before emit arguments, as in `emit.json(...)`"
                    .to_string(),
                found: self.found(),
                span: self.current_span(),
            });
        }

        let emit = EmitExpr { format, args, span };
        Ok(Expr::new(ExprKind::Emit(Box::new(emit)), span))
    }
}
