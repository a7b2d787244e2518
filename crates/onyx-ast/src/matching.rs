//! Structural matching of values against patterns.
//!
//! The parser evaluates nothing, but the order in which `match` arms are tried
//! is part of the tree's contract: arms are tried top to bottom and the first
//! one whose pattern matches and whose guard passes wins. [`MatchExpr::select_arm`]
//! encodes that rule for values that can be written down as literals.

use crate::*;

/// A value shaped like an Onyx literal
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<MatchValue>),
    Object(Vec<(SmolStr, MatchValue)>),
}

impl MatchValue {
    /// Durations become seconds and sizes become bytes. Interpolated strings
    /// have no static value.
    pub fn from_literal(literal: &Literal) -> Option<MatchValue> {
        let value = match &literal.kind {
            LiteralKind::Null => MatchValue::Null,
            LiteralKind::Bool(b) => MatchValue::Bool(*b),
            LiteralKind::Integer { value, .. } => MatchValue::Int(*value),
            LiteralKind::Float { value, .. } => MatchValue::Float(*value),
            LiteralKind::String(s) => MatchValue::Str(s.as_plain()?.to_string()),
            LiteralKind::ByteString(bytes) => MatchValue::Bytes(bytes.clone()),
            LiteralKind::Duration { value, unit, .. } => MatchValue::Float(value * unit.seconds()),
            LiteralKind::Size { value, unit, .. } => MatchValue::Float(value * unit.bytes() as f64),
        };
        Some(value)
    }

    /// Static value of a literal-only expression (literals, arrays, objects,
    /// parentheses).
    pub fn from_expr(expr: &Expr) -> Option<MatchValue> {
        match &expr.kind {
            ExprKind::Literal(literal) => MatchValue::from_literal(literal),
            ExprKind::Paren(inner) => MatchValue::from_expr(inner),
            ExprKind::Array(elements) => elements
                .iter()
                .map(MatchValue::from_expr)
                .collect::<Option<Vec<_>>>()
                .map(MatchValue::Array),
            ExprKind::Object(object) => object
                .fields
                .iter()
                .map(|field| {
                    let key = SmolStr::new(field.key.name()?);
                    Some((key, MatchValue::from_expr(&field.value)?))
                })
                .collect::<Option<Vec<_>>>()
                .map(MatchValue::Object),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            MatchValue::Int(i) => Some(*i as f64),
            MatchValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Equality with integers and floats compared numerically
    fn loosely_eq(&self, other: &MatchValue) -> bool {
        match (self, other) {
            (MatchValue::Int(a), MatchValue::Int(b)) => a == b,
            (MatchValue::Array(a), MatchValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_eq(y))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => self == other,
            },
        }
    }
}

impl Pattern {
    pub fn matches(&self, value: &MatchValue) -> bool {
        match &self.kind {
            PatternKind::Wildcard | PatternKind::Ident(_) => true,
            PatternKind::Literal(literal) => {
                MatchValue::from_literal(literal).is_some_and(|expected| expected.loosely_eq(value))
            }
            PatternKind::Array(elements) => match value {
                MatchValue::Array(items) => {
                    items.len() == elements.len()
                        && elements.iter().zip(items).all(|(p, v)| p.matches(v))
                }
                _ => false,
            },
            PatternKind::Object(fields) => match value {
                MatchValue::Object(entries) => fields.iter().all(|field| {
                    let Some((_, found)) = entries.iter().find(|(k, _)| *k == field.key.node)
                    else {
                        return false;
                    };
                    field.pattern.as_ref().map_or(true, |p| p.matches(found))
                }),
                _ => false,
            },
            PatternKind::Range {
                start,
                end,
                inclusive,
            } => {
                let Some(n) = value.as_number() else {
                    return false;
                };
                let bound = |lit: &Literal| MatchValue::from_literal(lit).and_then(|v| v.as_number());
                let above_start = match start {
                    Some(lit) => bound(lit).is_some_and(|lo| n >= lo),
                    None => true,
                };
                let below_end = match end {
                    Some(lit) => bound(lit).is_some_and(|hi| if *inclusive { n <= hi } else { n < hi }),
                    None => true,
                };
                above_start && below_end
            }
        }
    }
}

impl MatchExpr {
    /// Index of the arm that handles `subject`. `guard` is consulted only for
    /// arms whose pattern already matched; a `false` falls through to later arms.
    pub fn select_arm(
        &self,
        subject: &MatchValue,
        mut guard: impl FnMut(&Expr) -> bool,
    ) -> Option<usize> {
        self.arms.iter().position(|arm| {
            arm.pattern.matches(subject) && arm.guard.as_ref().map_or(true, &mut guard)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int_lit(value: i64) -> Literal {
        Literal {
            kind: LiteralKind::Integer {
                raw: value.to_string().into(),
                value,
            },
            span: Span::dummy(),
        }
    }

    fn pattern(kind: PatternKind) -> Pattern {
        Pattern {
            kind,
            span: Span::dummy(),
        }
    }

    fn range(start: i64, end: i64) -> Pattern {
        pattern(PatternKind::Range {
            start: Some(int_lit(start)),
            end: Some(int_lit(end)),
            inclusive: false,
        })
    }

    fn arm(pattern: Pattern, guard: Option<Expr>) -> MatchArm {
        MatchArm {
            pattern,
            guard,
            body: Expr::new(ExprKind::Literal(int_lit(0)), Span::dummy()),
            span: Span::dummy(),
        }
    }

    fn match_expr(arms: Vec<MatchArm>) -> MatchExpr {
        MatchExpr {
            subject: Box::new(Expr::new(ExprKind::Ident("x".into()), Span::dummy())),
            arms,
            span: Span::dummy(),
        }
    }

    #[test]
    fn test_range_bounds() {
        assert!(range(1, 3).matches(&MatchValue::Int(1)));
        assert!(!range(1, 3).matches(&MatchValue::Int(3)));
        let inclusive = pattern(PatternKind::Range {
            start: None,
            end: Some(int_lit(3)),
            inclusive: true,
        });
        assert!(inclusive.matches(&MatchValue::Int(3)));
        assert!(inclusive.matches(&MatchValue::Int(-10)));
    }

    #[test]
    fn test_first_matching_arm_wins() {
        let expr = match_expr(vec![
            arm(range(1, 3), None),
            arm(range(4, 6), None),
            arm(pattern(PatternKind::Wildcard), None),
        ]);
        assert_eq!(expr.select_arm(&MatchValue::Int(5), |_| true), Some(1));
        assert_eq!(expr.select_arm(&MatchValue::Int(9), |_| true), Some(2));
    }

    #[test]
    fn test_failed_guard_falls_through() {
        let guard = Expr::new(ExprKind::Ident("never".into()), Span::dummy());
        let expr = match_expr(vec![
            arm(pattern(PatternKind::Ident("n".into())), Some(guard)),
            arm(pattern(PatternKind::Wildcard), None),
        ]);
        let mut consulted = 0;
        let selected = expr.select_arm(&MatchValue::Int(5), |_| {
            consulted += 1;
            false
        });
        assert_eq!(selected, Some(1));
        assert_eq!(consulted, 1);
    }

    #[test]
    fn test_object_pattern_binds_and_matches() {
        let p = pattern(PatternKind::Object(vec![
            FieldPattern {
                key: Ident::dummy("status".into()),
                pattern: Some(pattern(PatternKind::Literal(int_lit(200)))),
                span: Span::dummy(),
            },
            FieldPattern {
                key: Ident::dummy("body".into()),
                pattern: None,
                span: Span::dummy(),
            },
        ]));
        let ok = MatchValue::Object(vec![
            ("status".into(), MatchValue::Int(200)),
            ("body".into(), MatchValue::Null),
        ]);
        let missing = MatchValue::Object(vec![("status".into(), MatchValue::Int(200))]);
        assert!(p.matches(&ok));
        assert!(!p.matches(&missing));
        assert_eq!(p.bindings(), vec![&SmolStr::new("body")]);
    }

    #[test]
    fn test_array_pattern_is_fixed_arity() {
        let p = pattern(PatternKind::Array(vec![
            pattern(PatternKind::Ident("a".into())),
            pattern(PatternKind::Wildcard),
        ]));
        assert!(p.matches(&MatchValue::Array(vec![MatchValue::Int(1), MatchValue::Null])));
        assert!(!p.matches(&MatchValue::Array(vec![MatchValue::Int(1)])));
    }
}
