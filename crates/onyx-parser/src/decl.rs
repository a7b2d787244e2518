//! Declarations: `op`, `profile`, `fn`, `let` and `use`.

use onyx_ast::*;
use onyx_lexer::TokenKind;

use crate::{ParseResult, Parser};

impl<'src> Parser<'src> {
    /// A declaration if one starts here, `None` when the current token is not
    /// a declaration keyword
    pub(crate) fn parse_declaration(&mut self) -> ParseResult<Option<Decl>> {
        let decl = match self.current_kind() {
            Some(TokenKind::Op) => Decl::Op(self.parse_op()?),
            Some(TokenKind::Profile) => Decl::Profile(self.parse_profile()?),
            Some(TokenKind::Fn) => Decl::Function(self.parse_function()?),
            Some(TokenKind::Let) => Decl::Let(self.parse_let()?),
            Some(TokenKind::Use) => Decl::Use(self.parse_use()?),
            _ => return Ok(None),
        };
        Ok(Some(decl))
    }

    /// `op name = protocol.method "target" "query"? {metadata}?`
    fn parse_op(&mut self) -> ParseResult<OpDecl> {
        let start = self.expect(TokenKind::Op)?;
        let name = self.parse_identifier("operation name")?;
        self.expect(TokenKind::Eq)?;
        let protocol = self.parse_identifier("protocol name")?;
        self.expect(TokenKind::Dot)?;
        let method = self.parse_identifier("method name")?;
        let target = self.parse_string_literal("request target string")?;

        let query = match self.current_kind() {
            Some(TokenKind::InterpolatedString(_) | TokenKind::SimpleString(_)) => {
                Some(self.parse_string_literal("query string")?)
            }
            _ => None,
        };
        let metadata = if self.at_optional_object() {
            Some(self.parse_object(false)?)
        } else {
            None
        };

        Ok(OpDecl {
            name,
            protocol,
            method,
            target,
            query,
            metadata,
            span: start.merge(self.previous_span()),
        })
    }

    /// `profile name { key: value, ... }`
    fn parse_profile(&mut self) -> ParseResult<ProfileDecl> {
        let start = self.expect(TokenKind::Profile)?;
        let name = self.parse_identifier("profile name")?;
        let fields = self.parse_object(false)?;
        let span = start.merge(fields.span);
        Ok(ProfileDecl { name, fields, span })
    }

    /// `fn name(params) = expr` or `fn name(params) { ... }`
    fn parse_function(&mut self) -> ParseResult<FunctionDecl> {
        let start = self.expect(TokenKind::Fn)?;
        let name = self.parse_identifier("function name")?;
        let open = self.expect(TokenKind::LParen)?;
        let (params, _) = self.parse_delimited(open, TokenKind::RParen, false, |p| {
            p.parse_identifier("parameter name")
        })?;

        let body = match self.current_kind() {
            Some(TokenKind::Eq) => {
                self.advance();
                FunctionBody::Expression(Box::new(self.parse_expression()?))
            }
            Some(TokenKind::LBrace) => FunctionBody::Block(self.parse_block()?),
            _ => return Err(self.unexpected("'=' or '{' to start the function body")),
        };

        Ok(FunctionDecl {
            name,
            params,
            body,
            span: start.merge(self.previous_span()),
        })
    }

    /// `let pattern = expr`
    fn parse_let(&mut self) -> ParseResult<LetDecl> {
        let start = self.expect(TokenKind::Let)?;
        let pattern = self.parse_pattern()?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expression()?;
        let span = start.merge(value.span);
        Ok(LetDecl {
            pattern,
            value,
            span,
        })
    }

    /// `use a::b::*`, `use a::{b, c}`, `use a::b` or `use <expr>`, each with
    /// an optional block body
    fn parse_use(&mut self) -> ParseResult<UseDecl> {
        let start = self.expect(TokenKind::Use)?;

        let is_path = matches!(self.current_kind(), Some(TokenKind::Identifier(_)))
            && self.peek_kind() == Some(&TokenKind::ColonColon);
        let target = if is_path {
            self.parse_use_path()?
        } else {
            UseTarget::Expr(Box::new(self.parse_expression()?))
        };

        let body = if self.check(&TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(UseDecl {
            target,
            body,
            span: start.merge(self.previous_span()),
        })
    }

    fn parse_use_path(&mut self) -> ParseResult<UseTarget> {
        let mut path = vec![self.parse_identifier("module name")?];

        while self.check(&TokenKind::ColonColon) {
            self.advance();
            match self.current_kind() {
                Some(TokenKind::Star) => {
                    self.advance();
                    return Ok(UseTarget::Glob { path });
                }
                Some(TokenKind::LBrace) => {
                    let open = self.current_span();
                    self.advance();
                    if self.check(&TokenKind::RBrace) {
                        return Err(self.unexpected("name to import"));
                    }
                    let (names, _) = self.parse_delimited(open, TokenKind::RBrace, false, |p| {
                        p.parse_identifier("name to import")
                    })?;
                    return Ok(UseTarget::Group { path, names });
                }
                _ => path.push(self.parse_identifier("module name, '*' or '{' after '::'")?),
            }
        }

        Ok(UseTarget::Path(path))
    }
}

#[cfg(test)]
mod tests {
    use crate::{parse, ParseError};
    use onyx_ast::*;
    use pretty_assertions::assert_eq;

    fn single_decl(source: &str) -> Decl {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "Errors: {:?}", errors);
        assert_eq!(program.items.len(), 1, "Items: {:?}", program.items);
        match program.items.into_iter().next() {
            Some(Item::Decl(decl)) => decl,
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_op_minimal() {
        let Decl::Op(op) = single_decl(r#"op health = http.get "/health""#) else {
            panic!("expected op");
        };
        assert_eq!(op.name.node, "health");
        assert_eq!(op.protocol.node, "http");
        assert_eq!(op.method.node, "get");
        assert_eq!(op.target.as_plain(), Some("/health"));
        assert!(op.query.is_none());
        assert!(op.metadata.is_none());
    }

    #[test]
    fn test_parse_op_with_query_and_metadata() {
        let source = r#"op search = http.get "/items" "q=${term}" { timeout: 5s, retries: 3 }"#;
        let Decl::Op(op) = single_decl(source) else {
            panic!("expected op");
        };
        assert!(op.query.as_ref().is_some_and(StringLiteral::is_interpolated));
        let metadata = op.metadata.expect("metadata");
        assert_eq!(metadata.fields.len(), 2);
        assert!(metadata.get("timeout").is_some());
        assert_eq!(op.span, Span::new(0, source.len()));
    }

    #[test]
    fn test_op_with_empty_metadata() {
        let Decl::Op(op) = single_decl(r#"op ping = http.head "/" {}"#) else {
            panic!("expected op");
        };
        assert_eq!(op.metadata.map(|m| m.fields.len()), Some(0));
    }

    #[test]
    fn test_op_missing_target() {
        let (_, errors) = parse("op broken = http.get");
        assert!(matches!(
            &errors[0],
            ParseError::UnexpectedEof { expected, .. } if expected == "request target string"
        ));
    }

    #[test]
    fn test_parse_profile() {
        let source = "profile staging {\n  base_url: 'https://staging.example.com',\n  'x-team': env.TEAM,\n}";
        let Decl::Profile(profile) = single_decl(source) else {
            panic!("expected profile");
        };
        assert_eq!(profile.name.node, "staging");
        assert_eq!(profile.fields.fields.len(), 2);
        assert!(profile.fields.get("x-team").is_some());
    }

    #[test]
    fn test_parse_function_forms() {
        let Decl::Function(f) = single_decl("fn add(a, b) = a + b") else {
            panic!("expected function");
        };
        assert_eq!(f.params.len(), 2);
        assert!(matches!(f.body, FunctionBody::Expression(_)));

        let Decl::Function(f) = single_decl("fn check() {\n  let r = run health\n  r.status == 200\n}") else {
            panic!("expected function");
        };
        assert!(f.params.is_empty());
        let FunctionBody::Block(block) = &f.body else {
            panic!("expected block body");
        };
        assert_eq!(block.items.len(), 2);
    }

    #[test]
    fn test_function_rejects_trailing_comma() {
        let (_, errors) = parse("fn f(a,) = a");
        assert!(matches!(&errors[0], ParseError::UnexpectedToken { found, .. } if found == "')'"));
    }

    #[test]
    fn test_function_without_body() {
        let (_, errors) = parse("fn f(a) a");
        assert!(matches!(
            &errors[0],
            ParseError::UnexpectedToken { expected, .. } if expected.contains("function body")
        ));
    }

    #[test]
    fn test_parse_let_with_block_value() {
        let Decl::Let(decl) = single_decl("let total = {\n  let a = 1\n  a + 1\n}") else {
            panic!("expected let");
        };
        assert!(matches!(decl.value.kind, ExprKind::Block(_)));
    }

    #[test]
    fn test_parse_use_shapes() {
        let Decl::Use(u) = single_decl("use auth::tokens::*") else {
            panic!("expected use");
        };
        assert!(matches!(&u.target, UseTarget::Glob { path } if path.len() == 2));

        let Decl::Use(u) = single_decl("use auth::{login, logout}") else {
            panic!("expected use");
        };
        assert!(matches!(&u.target, UseTarget::Group { path, names } if path.len() == 1 && names.len() == 2));

        let Decl::Use(u) = single_decl("use auth::tokens") else {
            panic!("expected use");
        };
        assert!(matches!(&u.target, UseTarget::Path(path) if path.len() == 2));

        let Decl::Use(u) = single_decl("use 'shared.onyx'") else {
            panic!("expected use");
        };
        assert!(matches!(u.target, UseTarget::Expr(_)));
    }

    #[test]
    fn test_parse_use_with_body() {
        let Decl::Use(u) = single_decl("use profiles::staging {\n  run health\n}") else {
            panic!("expected use");
        };
        assert!(u.body.is_some_and(|b| b.items.len() == 1));
    }

    #[test]
    fn test_use_group_requires_names() {
        let (_, errors) = parse("use auth::{}");
        assert!(matches!(&errors[0], ParseError::UnexpectedToken { found, .. } if found == "'}'"));
    }
}
