//! Source printing for the AST.
//!
//! Renders a tree back to Onyx source. Numeric literals keep their original
//! spelling, strings are re-escaped, and no parentheses are added beyond the
//! `Paren` nodes already present, so printing and re-parsing yields the same
//! structure.

use std::fmt;

use crate::*;

/// Print an entire program, one item per line
pub fn print_program(program: &Program) -> String {
    let mut printer = Printer::new();
    for (i, item) in program.items.iter().enumerate() {
        if i > 0 {
            printer.out.push('\n');
        }
        printer.print_item(item);
    }
    printer.out
}

pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::new();
    printer.print_expr(expr);
    printer.out
}

pub fn print_pattern(pattern: &Pattern) -> String {
    let mut printer = Printer::new();
    printer.print_pattern(pattern);
    printer.out
}

pub fn print_literal(literal: &Literal) -> String {
    let mut printer = Printer::new();
    printer.print_literal(literal);
    printer.out
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_program(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_expr(self))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_pattern(self))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_literal(self))
    }
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push(' ');
        }
    }

    fn print_separated<T>(&mut self, items: &[T], sep: &str, mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(sep);
            }
            each(self, item);
        }
    }

    fn print_ident_path(&mut self, path: &[Ident]) {
        self.print_separated(path, "::", |p, ident| p.out.push_str(&ident.node));
    }

    // ========================================================================
    // Items
    // ========================================================================

    fn print_item(&mut self, item: &Item) {
        match item {
            Item::Decl(decl) => self.print_decl(decl),
            Item::Expr(expr) => self.print_expr(expr),
        }
    }

    fn print_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Op(op) => {
                self.out.push_str("op ");
                self.out.push_str(&op.name.node);
                self.out.push_str(" = ");
                self.out.push_str(&op.protocol.node);
                self.out.push('.');
                self.out.push_str(&op.method.node);
                self.out.push(' ');
                self.print_string(&op.target);
                if let Some(query) = &op.query {
                    self.out.push(' ');
                    self.print_string(query);
                }
                if let Some(metadata) = &op.metadata {
                    self.out.push(' ');
                    self.print_object(metadata);
                }
            }
            Decl::Profile(profile) => {
                self.out.push_str("profile ");
                self.out.push_str(&profile.name.node);
                self.out.push(' ');
                self.print_object(&profile.fields);
            }
            Decl::Function(func) => {
                self.out.push_str("fn ");
                self.out.push_str(&func.name.node);
                self.out.push('(');
                self.print_separated(&func.params, ", ", |p, param| p.out.push_str(&param.node));
                self.out.push(')');
                match &func.body {
                    FunctionBody::Expression(expr) => {
                        self.out.push_str(" = ");
                        self.print_expr(expr);
                    }
                    FunctionBody::Block(block) => {
                        self.out.push(' ');
                        self.print_block(block);
                    }
                }
            }
            Decl::Let(decl) => {
                self.out.push_str("let ");
                self.print_pattern(&decl.pattern);
                self.out.push_str(" = ");
                self.print_expr(&decl.value);
            }
            Decl::Use(decl) => {
                self.out.push_str("use ");
                match &decl.target {
                    UseTarget::Glob { path } => {
                        self.print_ident_path(path);
                        self.out.push_str("::*");
                    }
                    UseTarget::Group { path, names } => {
                        self.print_ident_path(path);
                        self.out.push_str("::{");
                        self.print_separated(names, ", ", |p, name| p.out.push_str(&name.node));
                        self.out.push('}');
                    }
                    UseTarget::Path(path) => self.print_ident_path(path),
                    UseTarget::Expr(expr) => self.print_expr(expr),
                }
                if let Some(body) = &decl.body {
                    self.out.push(' ');
                    self.print_block(body);
                }
            }
        }
    }

    fn print_block(&mut self, block: &Block) {
        if block.items.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.indent += 2;
        for item in &block.items {
            self.write_indent();
            self.print_item(item);
            self.out.push('\n');
        }
        self.indent -= 2;
        self.write_indent();
        self.out.push('}');
    }

    fn print_object(&mut self, object: &ObjectLit) {
        self.out.push('{');
        self.print_separated(&object.fields, ", ", |p, field| {
            match &field.key {
                FieldKey::Ident(ident) => p.out.push_str(&ident.node),
                FieldKey::String(s) => p.print_string(s),
            }
            p.out.push_str(": ");
            p.print_expr(&field.value);
        });
        self.out.push('}');
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn print_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Pipe { left, right } => {
                self.print_expr(left);
                self.out.push_str(" |> ");
                self.print_expr(right);
            }
            ExprKind::Binary { op, left, right } => {
                self.print_expr(left);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.print_expr(right);
            }
            ExprKind::Unary { op, operand } => {
                self.out.push_str(op.symbol());
                // `- 1` must not print as `-1`, which reads back as a literal
                if *op == UnaryOp::Neg && is_number(operand) {
                    self.out.push(' ');
                }
                self.print_expr(operand);
            }
            ExprKind::Call { callee, args } => {
                self.print_expr(callee);
                self.out.push('(');
                self.print_separated(args, ", ", Self::print_expr);
                self.out.push(')');
            }
            ExprKind::Field { object, field } => {
                self.print_expr(object);
                self.out.push('.');
                self.out.push_str(&field.node);
            }
            ExprKind::Index { object, index } => {
                self.print_expr(object);
                self.out.push('[');
                self.print_expr(index);
                self.out.push(']');
            }
            ExprKind::Literal(literal) => self.print_literal(literal),
            ExprKind::Ident(name) => self.out.push_str(name),
            ExprKind::Env(name) => {
                self.out.push_str("env.");
                self.out.push_str(&name.node);
            }
            ExprKind::Paren(inner) => {
                self.out.push('(');
                self.print_expr(inner);
                self.out.push(')');
            }
            ExprKind::Array(elements) => {
                self.out.push('[');
                self.print_separated(elements, ", ", Self::print_expr);
                self.out.push(']');
            }
            ExprKind::Object(object) => self.print_object(object),
            ExprKind::Block(block) => self.print_block(block),
            ExprKind::If(if_expr) => self.print_if(if_expr),
            ExprKind::Match(match_expr) => {
                self.out.push_str("match ");
                self.print_expr(&match_expr.subject);
                self.out.push_str(" {\n");
                self.indent += 2;
                for arm in &match_expr.arms {
                    self.write_indent();
                    self.print_pattern(&arm.pattern);
                    if let Some(guard) = &arm.guard {
                        self.out.push_str(" if ");
                        self.print_expr(guard);
                    }
                    self.out.push_str(" => ");
                    self.print_expr(&arm.body);
                    self.out.push_str(",\n");
                }
                self.indent -= 2;
                self.write_indent();
                self.out.push('}');
            }
            ExprKind::Lambda { params, body } => {
                self.out.push('|');
                self.print_separated(params, ", ", |p, param| p.out.push_str(&param.node));
                self.out.push_str("| ");
                self.print_expr(body);
            }
            ExprKind::Run(run) => self.print_run(run),
            ExprKind::Emit(emit) => {
                self.out.push_str("emit");
                if let Some(format) = &emit.format {
                    self.out.push('.');
                    self.out.push_str(&format.node);
                    if let Some(args) = &emit.args {
                        self.out.push('(');
                        self.print_separated(args, ", ", Self::print_expr);
                        self.out.push(')');
                    }
                }
            }
            ExprKind::Range(range) => {
                if let Some(start) = &range.start {
                    self.print_literal(start);
                }
                self.out.push_str(if range.inclusive { "..=" } else { ".." });
                if let Some(end) = &range.end {
                    self.print_literal(end);
                }
            }
        }
    }

    fn print_if(&mut self, if_expr: &IfExpr) {
        self.out.push_str("if ");
        self.print_expr(&if_expr.condition);
        self.out.push(' ');
        self.print_block(&if_expr.then_branch);
        match &if_expr.else_branch {
            Some(ElseBranch::Block(block)) => {
                self.out.push_str(" else ");
                self.print_block(block);
            }
            Some(ElseBranch::If(nested)) => {
                self.out.push_str(" else ");
                self.print_if(nested);
            }
            None => {}
        }
    }

    fn print_run(&mut self, run: &RunExpr) {
        match run {
            RunExpr::Inline(inline) => {
                self.out.push_str("run ");
                self.out.push_str(&inline.target.node);
                if let Some(args) = &inline.args {
                    self.out.push(' ');
                    self.print_object(args);
                }
                if let Some(with) = &inline.with {
                    self.out.push_str(" with ");
                    if with.mode == VariationMode::Zip {
                        self.out.push_str("zip ");
                    }
                    self.print_object(&with.variations);
                }
            }
            RunExpr::Block(block) => {
                if block.items.is_empty() {
                    self.out.push_str("run {}");
                    return;
                }
                self.out.push_str("run {\n");
                self.indent += 2;
                for item in &block.items {
                    self.write_indent();
                    match item {
                        RunItem::Step(step) => {
                            self.out.push_str(&step.name.node);
                            self.out.push_str(": ");
                            self.out.push_str(&step.operation.node);
                            if let Some(args) = &step.args {
                                self.out.push(' ');
                                self.print_object(args);
                            }
                        }
                        RunItem::Path(path) => {
                            self.out.push_str("path: ");
                            self.print_separated(&path.chain, " -> ", |p, name| {
                                p.out.push_str(&name.node)
                            });
                        }
                        RunItem::Decl(decl) => self.print_decl(decl),
                    }
                    self.out.push('\n');
                }
                self.indent -= 2;
                self.write_indent();
                self.out.push('}');
            }
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn print_literal(&mut self, literal: &Literal) {
        match &literal.kind {
            LiteralKind::Null => self.out.push_str("null"),
            LiteralKind::Bool(value) => self.out.push_str(if *value { "true" } else { "false" }),
            LiteralKind::Integer { raw, .. }
            | LiteralKind::Float { raw, .. }
            | LiteralKind::Duration { raw, .. }
            | LiteralKind::Size { raw, .. } => self.out.push_str(raw),
            LiteralKind::String(s) => self.print_string(s),
            LiteralKind::ByteString(bytes) => {
                self.out.push_str("b\"");
                for &byte in bytes {
                    match byte {
                        b'\\' => self.out.push_str("\\\\"),
                        b'"' => self.out.push_str("\\\""),
                        0x20..=0x7e => self.out.push(char::from(byte)),
                        _ => self.out.push_str(&format!("\\x{:02x}", byte)),
                    }
                }
                self.out.push('"');
            }
        }
    }

    fn print_string(&mut self, s: &StringLiteral) {
        let quote = match s.quote {
            QuoteStyle::Double => '"',
            QuoteStyle::Single => '\'',
        };
        self.out.push(quote);
        for part in &s.parts {
            match part {
                StringPart::Text(text) => self.print_escaped(text, quote),
                StringPart::Interpolation(expr) => {
                    self.out.push_str("${");
                    self.print_expr(expr);
                    self.out.push('}');
                }
            }
        }
        self.out.push(quote);
    }

    fn print_escaped(&mut self, text: &str, quote: char) {
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                '\0' => self.out.push_str("\\0"),
                c if c == quote => {
                    self.out.push('\\');
                    self.out.push(c);
                }
                // A literal `${` would read back as an interpolation
                '$' if quote == '"' && chars.peek() == Some(&'{') => self.out.push_str("\\x24"),
                c if c.is_control() => self.out.push_str(&format!("\\u{{{:x}}}", u32::from(c))),
                c => self.out.push(c),
            }
        }
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    fn print_pattern(&mut self, pattern: &Pattern) {
        match &pattern.kind {
            PatternKind::Ident(name) => self.out.push_str(name),
            PatternKind::Literal(literal) => self.print_literal(literal),
            PatternKind::Wildcard => self.out.push('_'),
            PatternKind::Array(elements) => {
                self.out.push('[');
                self.print_separated(elements, ", ", Self::print_pattern);
                self.out.push(']');
            }
            PatternKind::Object(fields) => {
                self.out.push('{');
                self.print_separated(fields, ", ", |p, field| {
                    p.out.push_str(&field.key.node);
                    if let Some(sub) = &field.pattern {
                        p.out.push_str(": ");
                        p.print_pattern(sub);
                    }
                });
                self.out.push('}');
            }
            PatternKind::Range {
                start,
                end,
                inclusive,
            } => {
                if let Some(start) = start {
                    self.print_literal(start);
                }
                self.out.push_str(if *inclusive { "..=" } else { ".." });
                if let Some(end) = end {
                    self.print_literal(end);
                }
            }
        }
    }
}

fn is_number(expr: &Expr) -> bool {
    matches!(
        &expr.kind,
        ExprKind::Literal(Literal {
            kind: LiteralKind::Integer { .. } | LiteralKind::Float { .. },
            ..
        })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lit(kind: LiteralKind) -> Expr {
        Expr::new(ExprKind::Literal(Literal { kind, span: Span::dummy() }), Span::dummy())
    }

    fn int(raw: &str, value: i64) -> Expr {
        lit(LiteralKind::Integer {
            raw: raw.into(),
            value,
        })
    }

    #[test]
    fn test_print_keeps_integer_spelling() {
        assert_eq!(print_expr(&int("0xFF", 255)), "0xFF");
    }

    #[test]
    fn test_print_unary_minus_before_number_keeps_space() {
        let expr = Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(int("1", 1)),
            },
            Span::dummy(),
        );
        assert_eq!(print_expr(&expr), "- 1");
    }

    #[test]
    fn test_print_string_escapes() {
        let s = StringLiteral {
            parts: vec![StringPart::Text("say \"hi\"\n${x}".into())],
            quote: QuoteStyle::Double,
            span: Span::dummy(),
        };
        assert_eq!(print_expr(&lit(LiteralKind::String(s))), r#""say \"hi\"\n\x24{x}""#);
    }

    #[test]
    fn test_print_byte_string() {
        let expr = lit(LiteralKind::ByteString(vec![b'o', b'k', 0, b'"']));
        assert_eq!(print_expr(&expr), r#"b"ok\x00\"""#);
    }

    #[test]
    fn test_print_empty_block() {
        let expr = Expr::new(
            ExprKind::Block(Block {
                items: vec![],
                span: Span::dummy(),
            }),
            Span::dummy(),
        );
        assert_eq!(expr.to_string(), "{}");
    }
}
