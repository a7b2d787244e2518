//! `run` expressions: inline invocations with variations, and run blocks of
//! named steps and paths.

use onyx_ast::*;
use onyx_lexer::TokenKind;

use crate::{Boundary, ParseResult, Parser};

impl<'src> Parser<'src> {
    pub(crate) fn parse_run(&mut self) -> ParseResult<RunExpr> {
        let start = self.expect(TokenKind::Run)?;
        if self.check(&TokenKind::LBrace) {
            Ok(RunExpr::Block(self.parse_run_block(start)?))
        } else {
            Ok(RunExpr::Inline(self.parse_inline_run(start)?))
        }
    }

    /// `run target {args}? (with zip? {variations})?`
    fn parse_inline_run(&mut self, start: Span) -> ParseResult<InlineRun> {
        let target = self.parse_identifier("operation or function name after 'run'")?;
        let args = if self.at_optional_object() {
            Some(self.parse_object(false)?)
        } else {
            None
        };

        let with = if self.check(&TokenKind::With) {
            let with_start = self.current_span();
            self.advance();
            let mode = if self.check(&TokenKind::Zip) {
                self.advance();
                VariationMode::Zip
            } else {
                VariationMode::Product
            };
            let variations = self.parse_object(false)?;
            Some(WithClause {
                mode,
                span: with_start.merge(variations.span),
                variations,
            })
        } else {
            None
        };

        Ok(InlineRun {
            target,
            args,
            with,
            span: start.merge(self.previous_span()),
        })
    }

    fn parse_run_block(&mut self, start: Span) -> ParseResult<RunBlock> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            let item_start = self.pos;
            match self.parse_run_item() {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.errors.push(e);
                    self.recover(item_start, Boundary::RunBlock);
                }
            }
        }

        let close = self.expect_closing(open, TokenKind::RBrace, "'}'")?;
        Ok(RunBlock {
            items,
            span: start.merge(close),
        })
    }

    fn parse_run_item(&mut self) -> ParseResult<RunItem> {
        if self.check(&TokenKind::Path)
            && self.peek_kind() == Some(&TokenKind::Colon)
            && self.peek_nth_kind(3) == Some(&TokenKind::Arrow)
        {
            return Ok(RunItem::Path(self.parse_run_path()?));
        }
        if self.at_step_start() {
            return Ok(RunItem::Step(self.parse_run_step()?));
        }
        match self.parse_declaration()? {
            Some(decl) => Ok(RunItem::Decl(decl)),
            None => Err(self.unexpected("run step, path or declaration")),
        }
    }

    /// A step name followed by `:`
    pub(crate) fn at_step_start(&self) -> bool {
        matches!(
            self.current_kind(),
            Some(TokenKind::Identifier(_) | TokenKind::Profile | TokenKind::Run | TokenKind::Path)
        ) && self.peek_kind() == Some(&TokenKind::Colon)
    }

    /// `name: operation {args}?`
    fn parse_run_step(&mut self) -> ParseResult<RunStep> {
        let name = self.parse_step_name()?;
        self.expect(TokenKind::Colon)?;
        let operation = self.parse_identifier("operation name")?;
        let args = if self.check(&TokenKind::LBrace) {
            Some(self.parse_object(false)?)
        } else {
            None
        };
        let span = name.span.merge(self.previous_span());
        Ok(RunStep {
            name,
            operation,
            args,
            span,
        })
    }

    /// Step names are identifiers, plus `profile`, `run` and `path`, which
    /// only name things here. Paths refer to steps by plain identifier.
    fn parse_step_name(&mut self) -> ParseResult<Ident> {
        let span = self.current_span();
        let name = match self.current_kind() {
            Some(TokenKind::Identifier(name)) => name.clone(),
            Some(TokenKind::Profile) => SmolStr::new("profile"),
            Some(TokenKind::Run) => SmolStr::new("run"),
            Some(TokenKind::Path) => SmolStr::new("path"),
            _ => return Err(self.unexpected("step name")),
        };
        self.advance();
        Ok(Spanned::new(name, span))
    }

    /// `path: a -> b -> c`
    fn parse_run_path(&mut self) -> ParseResult<RunPath> {
        let start = self.expect(TokenKind::Path)?;
        self.expect(TokenKind::Colon)?;
        let mut chain = vec![self.parse_identifier("step name in path")?];
        while self.check(&TokenKind::Arrow) {
            self.advance();
            chain.push(self.parse_identifier("step name after '->'")?);
        }
        Ok(RunPath {
            chain,
            span: start.merge(self.previous_span()),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{parse, ParseError};
    use onyx_ast::*;
    use pretty_assertions::assert_eq;

    fn run_expr(source: &str) -> RunExpr {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "Errors: {:?}", errors);
        match program.items.into_iter().next() {
            Some(Item::Expr(Expr {
                kind: ExprKind::Run(run),
                ..
            })) => *run,
            other => panic!("expected run expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inline_run() {
        let RunExpr::Inline(run) = run_expr("run getUser { id: 1 }") else {
            panic!("expected inline run");
        };
        assert_eq!(run.target.node, "getUser");
        assert!(run.args.is_some());
        assert!(run.with.is_none());
    }

    #[test]
    fn test_parse_inline_run_with_variations() {
        let RunExpr::Inline(run) =
            run_expr("run login with { user: ['a', 'b'], pass: ['x', 'y'] }")
        else {
            panic!("expected inline run");
        };
        assert!(run.args.is_none());
        let with = run.with.expect("with clause");
        assert_eq!(with.mode, VariationMode::Product);
        assert_eq!(with.variations.fields.len(), 2);

        let RunExpr::Inline(run) = run_expr("run login {} with zip { user: ['a'] }") else {
            panic!("expected inline run");
        };
        assert_eq!(run.with.map(|w| w.mode), Some(VariationMode::Zip));
    }

    #[test]
    fn test_parse_run_block() {
        let source = "run {\n  login: signIn { user: 'a' }\n  profile: getProfile\n  run: logout\n  path: login -> fetch -> done\n  let limit = 3\n}";
        let RunExpr::Block(block) = run_expr(source) else {
            panic!("expected run block");
        };
        assert_eq!(block.items.len(), 5);
        let names: Vec<_> = block.steps().map(|s| s.name.node.as_str()).collect();
        assert_eq!(names, vec!["login", "profile", "run"]);
        let RunItem::Path(path) = &block.items[3] else {
            panic!("expected path, got {:?}", block.items[3]);
        };
        assert_eq!(path.chain.len(), 3);
        assert!(matches!(block.items[4], RunItem::Decl(Decl::Let(_))));
        assert_eq!(block.span, Span::new(0, source.len()));
    }

    #[test]
    fn test_path_as_step_name() {
        let RunExpr::Block(block) = run_expr("run { path: getPath }") else {
            panic!("expected run block");
        };
        let step = block.steps().next().expect("one step");
        assert_eq!(step.name.node, "path");
        assert_eq!(step.operation.node, "getPath");
    }

    #[test]
    fn test_path_links_are_plain_identifiers() {
        let (_, errors) = parse("run {\n  a: x\n  path: a -> profile -> run\n}");
        assert!(!errors.is_empty());
        assert!(matches!(
            &errors[0],
            ParseError::UnexpectedToken { expected, found, .. }
                if expected == "step name after '->'" && found == "'profile'"
        ));
    }

    #[test]
    fn test_run_block_recovers_at_next_step() {
        let (program, errors) = parse("run {\n  a: 1\n  b: fetch\n}");
        assert_eq!(errors.len(), 1, "Errors: {:?}", errors);
        let Some(Item::Expr(Expr { kind: ExprKind::Run(run), .. })) = program.items.first() else {
            panic!("expected run expression");
        };
        let RunExpr::Block(block) = run.as_ref() else {
            panic!("expected run block");
        };
        assert_eq!(block.steps().count(), 1);
    }

    #[test]
    fn test_run_requires_target() {
        let (_, errors) = parse("run 42");
        assert!(matches!(
            &errors[0],
            ParseError::UnexpectedToken { expected, .. } if expected.contains("after 'run'")
        ));
    }
}
