//! Display implementations for expressions.

use std::fmt;

use num_traits::Signed;

use super::number::format_rational;
use super::{Expr, Op};
use crate::set::{IndexDomain, IndexExpression, SetExpr, SetKind};

const ATOM: u8 = 11;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Compound { op, .. } => match op {
            Op::IfThenElse | Op::Lambda => 1,
            Op::Implies | Op::Equivalence => 2,
            Op::Or => 3,
            Op::And => 4,
            Op::Not => 5,
            Op::Equal | Op::NotEqual | Op::In => 6,
            Op::Union | Op::Intersection | Op::SetDifference => 7,
            Op::Plus | Op::Minus => 8,
            Op::Times | Op::Divide => 9,
            Op::Exponentiation => 10,
            _ => ATOM,
        },
        Expr::Number(n) if n.is_negative() => 8,
        _ => ATOM,
    }
}

fn write_prec(f: &mut fmt::Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    if precedence(expr) < min {
        write!(f, "(")?;
        write_expr(f, expr)?;
        write!(f, ")")
    } else {
        write_expr(f, expr)
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    args: &[Expr],
    separator: &str,
    min: u8,
) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        write_prec(f, arg, min)?;
    }
    Ok(())
}

fn write_expr(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Bool(value) => write!(f, "{}", value),
        Expr::Number(value) => write!(f, "{}", format_rational(value)),
        Expr::Var(name) | Expr::Const(name) => write!(f, "{}", name),
        Expr::RandomValue { functor, args } => {
            write!(f, "{}", functor)?;
            if !args.is_empty() {
                write!(f, "(")?;
                write_joined(f, args, ", ", 0)?;
                write!(f, ")")?;
            }
            Ok(())
        }
        Expr::Bracket(inner) => write!(f, "[ {} ]", inner),
        Expr::Set(set) => write!(f, "{}", set),
        Expr::Compound { op, args } => write_compound(f, *op, args),
    }
}

fn write_compound(f: &mut fmt::Formatter<'_>, op: Op, args: &[Expr]) -> fmt::Result {
    match (op, args) {
        (Op::IfThenElse, [c, t, e]) => {
            write!(f, "if ")?;
            write_prec(f, c, 2)?;
            write!(f, " then ")?;
            write_prec(f, t, 0)?;
            write!(f, " else ")?;
            write_prec(f, e, 0)
        }
        (Op::Not, [a]) => {
            write!(f, "not ")?;
            write_prec(f, a, 7)
        }
        (Op::And, [_, _, ..]) => write_joined(f, args, " and ", 5),
        (Op::Or, [_, _, ..]) => write_joined(f, args, " or ", 4),
        (Op::Plus, [_, _, ..]) => write_joined(f, args, " + ", 9),
        (Op::Times, [_, _, ..]) => write_joined(f, args, " * ", 10),
        (Op::Union, [_, _, ..]) => write_joined(f, args, " union ", 8),
        (Op::Implies | Op::Equivalence, [a, b]) => {
            write_prec(f, a, 3)?;
            write!(f, " {} ", op.symbol())?;
            write_prec(f, b, 2)
        }
        (Op::Equal | Op::NotEqual | Op::In, [a, b]) => {
            write_prec(f, a, 7)?;
            write!(f, " {} ", op.symbol())?;
            write_prec(f, b, 7)
        }
        (Op::Intersection | Op::SetDifference, [a, b]) => {
            write_prec(f, a, 8)?;
            write!(f, " {} ", op.symbol())?;
            write_prec(f, b, 8)
        }
        (Op::Minus, [a, b]) => {
            write_prec(f, a, 8)?;
            write!(f, " - ")?;
            write_prec(f, b, 9)
        }
        (Op::Divide, [a, b]) => {
            write_prec(f, a, 9)?;
            write!(f, " / ")?;
            write_prec(f, b, 10)
        }
        (Op::Exponentiation, [a, b]) => {
            write_prec(f, a, ATOM)?;
            write!(f, " ^ ")?;
            write_prec(f, b, ATOM)
        }
        (Op::Cardinality, [a]) => write!(f, "| {} |", a),
        (Op::Product, [a]) => write!(f, "product({})", a),
        (Op::Neighbors, [a]) => write!(f, "Neigh({})", a),
        (Op::Tuple, _) => {
            write!(f, "(")?;
            write_joined(f, args, ", ", 0)?;
            write!(f, ")")
        }
        (Op::MessageTo, [target, source]) => {
            write!(f, "message to ")?;
            write_prec(f, target, ATOM)?;
            write!(f, " from ")?;
            write_prec(f, source, ATOM)
        }
        (Op::PreviousMessageTo, [target, source]) => {
            write!(f, "previous message to ")?;
            write_prec(f, target, ATOM)?;
            write!(f, " from ")?;
            write_prec(f, source, ATOM)
        }
        (Op::Lambda, [parameter, body]) => write!(f, "lambda {} : {}", parameter, body),
        (Op::LambdaApplication, [lambda, argument]) => {
            write_prec(f, lambda, ATOM)?;
            write!(f, "({})", argument)
        }
        _ => {
            let name = match op {
                Op::And => "and",
                Op::Or => "or",
                Op::Plus => "plus",
                Op::Times => "times",
                Op::Union => "union",
                other => other.symbol(),
            };
            write!(f, "{}(", name)?;
            write_joined(f, args, ", ", 0)?;
            write!(f, ")")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self)
    }
}

impl fmt::Display for IndexExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)?;
        match &self.domain {
            Some(IndexDomain::Sort(sort)) => write!(f, " in {}", sort),
            Some(IndexDomain::Set(set)) => write!(f, " in {}", set),
            None => Ok(()),
        }
    }
}

impl fmt::Display for SetExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self.kind() {
            SetKind::UniSet => ("{", "}"),
            SetKind::MultiSet => ("{{", "}}"),
        };
        match self {
            SetExpr::Extensional { elements, .. } => {
                if elements.is_empty() {
                    return write!(f, "{} {}", open, close);
                }
                write!(f, "{} ", open)?;
                write_joined(f, elements, ", ", 0)?;
                write!(f, " {}", close)
            }
            SetExpr::Intensional {
                indices,
                head,
                condition,
                ..
            } => {
                write!(f, "{} ( on ", open)?;
                for (i, index) in indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", index)?;
                }
                write!(f, " ) {}", head)?;
                if condition != &Expr::TRUE {
                    write!(f, " | {}", condition)?;
                }
                write!(f, " {}", close)
            }
        }
    }
}
