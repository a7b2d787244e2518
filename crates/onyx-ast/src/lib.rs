//! Onyx Abstract Syntax Tree
//!
//! Defines all AST node types for the Onyx API-test language. Every node owns
//! its children and carries the span of the text it was parsed from.

pub mod matching;
pub mod printer;

// Re-export common types for use by other crates
pub use onyx_lexer::literal::{DurationUnit, SizeUnit};
pub use onyx_lexer::Span;
pub use smol_str::SmolStr;

/// A spanned value - wraps any value with source location info
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self {
            node,
            span: Span::dummy(),
        }
    }
}

/// Identifier (operation names, step names, bindings, fields)
pub type Ident = Spanned<SmolStr>;

// ============================================================================
// Program Structure
// ============================================================================

/// A complete Onyx source file
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

/// A top-level item or block statement
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Decl(Decl),
    Expr(Expr),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Decl(decl) => decl.span(),
            Item::Expr(expr) => expr.span,
        }
    }
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Op(OpDecl),
    Profile(ProfileDecl),
    Function(FunctionDecl),
    Let(LetDecl),
    Use(UseDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Op(d) => d.span,
            Decl::Profile(d) => d.span,
            Decl::Function(d) => d.span,
            Decl::Let(d) => d.span,
            Decl::Use(d) => d.span,
        }
    }
}

/// `op name = protocol.method "target" "query"? {metadata}?`
#[derive(Debug, Clone, PartialEq)]
pub struct OpDecl {
    pub name: Ident,
    pub protocol: Ident,
    pub method: Ident,
    pub target: StringLiteral,
    pub query: Option<StringLiteral>,
    pub metadata: Option<ObjectLit>,
    pub span: Span,
}

/// `profile name { key: value, ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDecl {
    pub name: Ident,
    pub fields: ObjectLit,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: FunctionBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// `fn f(x) { ... }`
    Block(Block),
    /// `fn f(x) = expr`
    Expression(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetDecl {
    pub pattern: Pattern,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseDecl {
    pub target: UseTarget,
    pub body: Option<Block>,
    pub span: Span,
}

/// Exactly one shape per `use`
#[derive(Debug, Clone, PartialEq)]
pub enum UseTarget {
    /// `a::b::*`
    Glob { path: Vec<Ident> },
    /// `a::b::{c, d}`
    Group { path: Vec<Ident>, names: Vec<Ident> },
    /// `a::b::c` (two or more segments)
    Path(Vec<Ident>),
    /// Anything else, e.g. `use "shared.onyx"` or `use helpers`
    Expr(Box<Expr>),
}

// ============================================================================
// Blocks and objects
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub items: Vec<Item>,
    pub span: Span,
}

impl Block {
    /// The expression whose value the block evaluates to, if it ends in one
    pub fn tail(&self) -> Option<&Expr> {
        match self.items.last() {
            Some(Item::Expr(expr)) => Some(expr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLit {
    pub fields: Vec<Field>,
    pub span: Span,
}

impl ObjectLit {
    pub fn get(&self, key: &str) -> Option<&Expr> {
        self.fields
            .iter()
            .find(|field| field.key.name() == Some(key))
            .map(|field| &field.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: FieldKey,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKey {
    Ident(Ident),
    String(StringLiteral),
}

impl FieldKey {
    /// The key text, when it is statically known
    pub fn name(&self) -> Option<&str> {
        match self {
            FieldKey::Ident(ident) => Some(ident.node.as_str()),
            FieldKey::String(s) => s.as_plain(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            FieldKey::Ident(ident) => ident.span,
            FieldKey::String(s) => s.span,
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `left |> right`
    Pipe {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Field {
        object: Box<Expr>,
        field: Ident,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Literal(Literal),
    Ident(SmolStr),
    /// `env.NAME`
    Env(Ident),
    Paren(Box<Expr>),
    Array(Vec<Expr>),
    Object(ObjectLit),
    Block(Block),
    If(Box<IfExpr>),
    Match(MatchExpr),
    /// `|a, b| body`
    Lambda {
        params: Vec<Ident>,
        body: Box<Expr>,
    },
    Run(Box<RunExpr>),
    Emit(Box<EmitExpr>),
    Range(Box<RangeExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Logical
    Or,
    And,

    // Equality
    Eq,
    NotEq,

    // Comparison
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    /// `~=`
    Matches,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::In => "in",
            BinaryOp::Matches => "~=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    /// Binding strength; higher binds tighter. Pipe sits below all of these.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Eq | BinaryOp::NotEq => 4,
            BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq
            | BinaryOp::In
            | BinaryOp::Matches => 5,
            BinaryOp::Add | BinaryOp::Sub => 6,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Box<Expr>,
    pub then_branch: Block,
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    Block(Block),
    If(Box<IfExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpr {
    pub subject: Box<Expr>,
    /// In source order; the first arm that matches (and whose guard passes) wins
    pub arms: Vec<MatchArm>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunExpr {
    /// `run target {args}? with zip? {variations}?`
    Inline(InlineRun),
    /// `run { step: op ... path: a -> b ... }`
    Block(RunBlock),
}

impl RunExpr {
    pub fn span(&self) -> Span {
        match self {
            RunExpr::Inline(run) => run.span,
            RunExpr::Block(block) => block.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineRun {
    pub target: Ident,
    pub args: Option<ObjectLit>,
    pub with: Option<WithClause>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    pub mode: VariationMode,
    pub variations: ObjectLit,
    pub span: Span,
}

/// How the axes of a `with` clause combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariationMode {
    /// Cartesian product across axes
    #[default]
    Product,
    /// `with zip`: positional pairing
    Zip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunBlock {
    pub items: Vec<RunItem>,
    pub span: Span,
}

impl RunBlock {
    pub fn steps(&self) -> impl Iterator<Item = &RunStep> {
        self.items.iter().filter_map(|item| match item {
            RunItem::Step(step) => Some(step),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunItem {
    Step(RunStep),
    Path(RunPath),
    Decl(Decl),
}

/// `name: operation {args}?`
#[derive(Debug, Clone, PartialEq)]
pub struct RunStep {
    pub name: Ident,
    pub operation: Ident,
    pub args: Option<ObjectLit>,
    pub span: Span,
}

/// `path: a -> b -> c`
#[derive(Debug, Clone, PartialEq)]
pub struct RunPath {
    pub chain: Vec<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmitExpr {
    /// `json` in `emit.json`; `None` for the default format
    pub format: Option<Ident>,
    /// `Some` only when an argument list was written, even if empty
    pub args: Option<Vec<Expr>>,
    pub span: Span,
}

/// Integer range; bounds are always integer literals
#[derive(Debug, Clone, PartialEq)]
pub struct RangeExpr {
    pub start: Option<Literal>,
    pub end: Option<Literal>,
    pub inclusive: bool,
}

// ============================================================================
// Literals
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub span: Span,
}

/// Numeric literals keep their source spelling in `raw` so they print back
/// unchanged (`0xFF` stays `0xFF`).
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralKind {
    Null,
    Bool(bool),
    Integer {
        raw: SmolStr,
        value: i64,
    },
    Float {
        raw: SmolStr,
        value: f64,
    },
    String(StringLiteral),
    ByteString(Vec<u8>),
    Duration {
        raw: SmolStr,
        value: f64,
        unit: DurationUnit,
    },
    Size {
        raw: SmolStr,
        value: f64,
        unit: SizeUnit,
    },
}

impl LiteralKind {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            LiteralKind::Integer { value, .. } => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub parts: Vec<StringPart>,
    pub quote: QuoteStyle,
    pub span: Span,
}

impl StringLiteral {
    /// The text of a string without interpolation
    pub fn as_plain(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [] => Some(""),
            [StringPart::Text(text)] => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_interpolated(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, StringPart::Interpolation(_)))
    }
}

impl From<StringLiteral> for Literal {
    fn from(s: StringLiteral) -> Self {
        Literal {
            span: s.span,
            kind: LiteralKind::String(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    /// Decoded text (escapes already applied)
    Text(SmolStr),
    /// `${ expr }`
    Interpolation(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `"..."`, interpolating
    Double,
    /// `'...'`
    Single,
}

// ============================================================================
// Patterns
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// Irrefutable binding
    Ident(SmolStr),
    Literal(Literal),
    /// `_`
    Wildcard,
    /// Positional, fixed arity
    Array(Vec<Pattern>),
    Object(Vec<FieldPattern>),
    Range {
        start: Option<Literal>,
        end: Option<Literal>,
        inclusive: bool,
    },
}

/// `key` or `key: pattern` inside an object pattern
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPattern {
    pub key: Ident,
    /// `None` binds the field's value to a variable named after the key
    pub pattern: Option<Pattern>,
    pub span: Span,
}

impl Pattern {
    /// Names this pattern binds, in source order
    pub fn bindings(&self) -> Vec<&SmolStr> {
        let mut names = Vec::new();
        self.collect_bindings(&mut names);
        names
    }

    fn collect_bindings<'a>(&'a self, names: &mut Vec<&'a SmolStr>) {
        match &self.kind {
            PatternKind::Ident(name) => names.push(name),
            PatternKind::Array(elements) => {
                for element in elements {
                    element.collect_bindings(names);
                }
            }
            PatternKind::Object(fields) => {
                for field in fields {
                    match &field.pattern {
                        Some(pattern) => pattern.collect_bindings(names),
                        None => names.push(&field.key.node),
                    }
                }
            }
            PatternKind::Literal(_) | PatternKind::Wildcard | PatternKind::Range { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_literal_converts_with_its_span() {
        let string = StringLiteral {
            parts: vec![StringPart::Text("hi".into())],
            quote: QuoteStyle::Single,
            span: Span::new(3, 7),
        };
        let literal = Literal::from(string.clone());
        assert_eq!(literal.span, Span::new(3, 7));
        assert_eq!(literal.kind, LiteralKind::String(string));
    }

    #[test]
    fn test_large_expression_payloads_are_boxed() {
        // Parser frames hold many `Expr` temporaries per level of nesting
        assert!(std::mem::size_of::<Expr>() <= 128, "{}", std::mem::size_of::<Expr>());
    }
}
