//! Exact arithmetic on conditional-free leaves.

use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::error::{IrError, Result};
use crate::expr::number::pow_rational;
use crate::expr::{Expr, Op};

/// Folds an arithmetic operator applied to leaves.
pub(crate) fn fold(op: Op, leaves: Vec<Expr>) -> Result<Expr> {
    if let Some(flag) = leaves.iter().find(|leaf| leaf.as_bool().is_some()) {
        return Err(IrError::IllegalArgument(format!(
            "boolean {} used as a number in {}",
            flag,
            op.symbol()
        )));
    }
    match (op, leaves.as_slice()) {
        (Op::Plus, _) => Ok(fold_sum(leaves)),
        (Op::Times, _) => Ok(fold_product(leaves)),
        (Op::Minus, [a, b]) => Ok(fold_minus(a, b)),
        (Op::Divide, [a, b]) => fold_divide(a, b),
        (Op::Exponentiation, [a, b]) => fold_pow(a, b),
        _ => Err(IrError::IllegalArgument(format!(
            "{} expects two arguments, got {}",
            op.symbol(),
            leaves.len()
        ))),
    }
}

fn fold_sum(leaves: Vec<Expr>) -> Expr {
    let mut total = BigRational::zero();
    let mut rest = Vec::new();
    let mut pending = leaves;
    while let Some(leaf) = pending.pop() {
        match leaf {
            Expr::Number(n) => total += n,
            Expr::Compound { op: Op::Plus, args } => pending.extend(args),
            other => rest.push(other),
        }
    }
    rest.reverse();
    if rest.is_empty() {
        return Expr::Number(total);
    }
    if !total.is_zero() {
        rest.push(Expr::Number(total));
    }
    if rest.len() == 1 {
        rest.pop().unwrap_or_else(Expr::zero)
    } else {
        Expr::plus(rest)
    }
}

fn fold_product(leaves: Vec<Expr>) -> Expr {
    let mut coefficient = BigRational::one();
    let mut rest = Vec::new();
    let mut pending = leaves;
    while let Some(leaf) = pending.pop() {
        match leaf {
            Expr::Number(n) => coefficient *= n,
            Expr::Compound {
                op: Op::Times,
                args,
            } => pending.extend(args),
            other => rest.push(other),
        }
    }
    if coefficient.is_zero() {
        return Expr::zero();
    }
    rest.reverse();
    if rest.is_empty() {
        return Expr::Number(coefficient);
    }
    if !coefficient.is_one() {
        rest.insert(0, Expr::Number(coefficient));
    }
    if rest.len() == 1 {
        rest.pop().unwrap_or_else(Expr::one)
    } else {
        Expr::times(rest)
    }
}

fn fold_minus(a: &Expr, b: &Expr) -> Expr {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => Expr::Number(x - y),
        (_, Some(y)) if y.is_zero() => a.clone(),
        _ if a == b => Expr::zero(),
        _ => Expr::minus(a.clone(), b.clone()),
    }
}

fn fold_divide(a: &Expr, b: &Expr) -> Result<Expr> {
    match (a.as_number(), b.as_number()) {
        (_, Some(y)) if y.is_zero() => Err(IrError::DivisionByZero(format!("{} / {}", a, b))),
        (Some(x), Some(y)) => Ok(Expr::Number(x / y)),
        (Some(x), None) if x.is_zero() => Ok(Expr::zero()),
        (None, Some(y)) => Ok(fold_product(vec![Expr::Number(y.recip()), a.clone()])),
        _ => Ok(Expr::divide(a.clone(), b.clone())),
    }
}

fn fold_pow(a: &Expr, b: &Expr) -> Result<Expr> {
    if let Some(exponent) = b.as_number().filter(|e| e.is_integer()) {
        if exponent.is_zero() {
            return Ok(Expr::one());
        }
        if exponent.is_one() {
            return Ok(a.clone());
        }
        if let Some(base) = a.as_number() {
            return pow_rational(base, exponent.numer())
                .map(Expr::Number)
                .ok_or_else(|| IrError::DivisionByZero(format!("{} ^ {}", a, b)));
        }
    }
    if a.is_one() {
        return Ok(Expr::one());
    }
    Ok(Expr::pow(a.clone(), b.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_folding() {
        assert_eq!(
            fold(Op::Plus, vec![Expr::ratio(6, 10), Expr::ratio(4, 10)]).unwrap(),
            Expr::one()
        );
        assert_eq!(
            fold(Op::Times, vec![Expr::ratio(2, 10), Expr::int(2)]).unwrap(),
            Expr::ratio(2, 5)
        );
        assert_eq!(
            fold(Op::Exponentiation, vec![Expr::ratio(2, 5), Expr::int(2)]).unwrap(),
            Expr::ratio(4, 25)
        );
        assert_eq!(
            fold(Op::Divide, vec![Expr::ratio(92, 1000), Expr::ratio(412, 1000)]).unwrap(),
            Expr::ratio(23, 103)
        );
    }

    #[test]
    fn test_zero_annihilates_symbolic_factors() {
        let symbolic = Expr::cardinality(Expr::constant("People"));
        assert_eq!(
            fold(Op::Times, vec![symbolic.clone(), Expr::zero()]).unwrap(),
            Expr::zero()
        );
        assert_eq!(
            fold(Op::Times, vec![symbolic.clone(), Expr::one()]).unwrap(),
            symbolic
        );
        assert_eq!(
            fold(Op::Plus, vec![Expr::zero(), symbolic.clone()]).unwrap(),
            symbolic
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            fold(Op::Divide, vec![Expr::one(), Expr::zero()]),
            Err(IrError::DivisionByZero(_))
        ));
        assert!(matches!(
            fold(Op::Plus, vec![Expr::TRUE, Expr::one()]),
            Err(IrError::IllegalArgument(_))
        ));
    }
}
