//! Symbolic expressions.
//!
//! Every formula, potential, message and set manipulated by the rewriters is
//! an [`Expr`]. Compound nodes carry an [`Op`] tag instead of a functor name;
//! the textual form (`if p(X) then 0.6 else 0.4`) only exists for display.

mod analysis;
mod display;
pub mod number;
mod substitution;

pub use substitution::fresh_variable;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::set::{IndexExpression, SetExpr, SetKind};

/// Operator tag of a compound expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Op {
    // Logic
    Not,
    And,
    Or,
    Implies,
    Equivalence,
    Equal,
    NotEqual,
    IfThenElse,
    // Arithmetic
    Plus,
    Minus,
    Times,
    Divide,
    Exponentiation,
    // Sets
    Union,
    Intersection,
    SetDifference,
    In,
    Cardinality,
    Product,
    // Message passing
    Tuple,
    MessageTo,
    PreviousMessageTo,
    Neighbors,
    Lambda,
    LambdaApplication,
}

impl Op {
    /// Printed operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Not => "not",
            Op::And => "and",
            Op::Or => "or",
            Op::Implies => "=>",
            Op::Equivalence => "<=>",
            Op::Equal => "=",
            Op::NotEqual => "!=",
            Op::IfThenElse => "if . then . else .",
            Op::Plus => "+",
            Op::Minus => "-",
            Op::Times => "*",
            Op::Divide => "/",
            Op::Exponentiation => "^",
            Op::Union => "union",
            Op::Intersection => "intersection",
            Op::SetDifference => "\\",
            Op::In => "in",
            Op::Cardinality => "| . |",
            Op::Product => "product",
            Op::Tuple => "( . )",
            Op::MessageTo => "message to . from .",
            Op::PreviousMessageTo => "previous message to . from .",
            Op::Neighbors => "Neigh",
            Op::Lambda => "lambda",
            Op::LambdaApplication => "( . )( . )",
        }
    }

    /// Operators producing a truth value.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Op::Not
                | Op::And
                | Op::Or
                | Op::Implies
                | Op::Equivalence
                | Op::Equal
                | Op::NotEqual
                | Op::In
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Op::Plus | Op::Minus | Op::Times | Op::Divide | Op::Exponentiation
        )
    }

    pub fn is_set_operator(&self) -> bool {
        matches!(self, Op::Union | Op::Intersection | Op::SetDifference)
    }
}

/// Immutable symbolic expression tree.
///
/// Structural equality and the derived ordering are syntactic; they are used
/// for duplicate removal and for stable iteration orders.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Boolean constant.
    Bool(bool),
    /// Exact rational number.
    Number(BigRational),
    /// Logical variable ranging over the elements of a sort (`X`, `Y'`).
    Var(String),
    /// Constant symbol (`a`, `bob`) or sort name.
    Const(String),
    /// Value of a random variable at a binding: `p(X)`, `r`.
    RandomValue { functor: String, args: Vec<Expr> },
    /// Reference to a random variable or factor: `[ p(X) ]`.
    Bracket(Box<Expr>),
    /// Operator application.
    Compound { op: Op, args: Vec<Expr> },
    /// Extensional or intensional set.
    Set(Box<SetExpr>),
}

impl Expr {
    pub const TRUE: Expr = Expr::Bool(true);
    pub const FALSE: Expr = Expr::Bool(false);

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Expr::Const(name.into())
    }

    pub fn bool(value: bool) -> Self {
        Expr::Bool(value)
    }

    pub fn int(value: i64) -> Self {
        Expr::Number(BigRational::from_integer(BigInt::from(value)))
    }

    /// Rational `numer / denom`; `denom` must be non-zero.
    pub fn ratio(numer: i64, denom: i64) -> Self {
        Expr::Number(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    pub fn number(value: BigRational) -> Self {
        Expr::Number(value)
    }

    pub fn zero() -> Self {
        Expr::Number(BigRational::zero())
    }

    pub fn one() -> Self {
        Expr::Number(BigRational::one())
    }

    /// Random variable value `functor(args)`.
    pub fn rv(functor: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::RandomValue {
            functor: functor.into(),
            args,
        }
    }

    pub fn bracket(inner: Expr) -> Self {
        Expr::Bracket(Box::new(inner))
    }

    /// Random variable reference `[ functor(args) ]`.
    pub fn rv_ref(functor: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::bracket(Expr::rv(functor, args))
    }

    pub fn compound(op: Op, args: Vec<Expr>) -> Self {
        Expr::Compound { op, args }
    }

    pub fn not(arg: Expr) -> Self {
        Expr::compound(Op::Not, vec![arg])
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::compound(Op::And, vec![left, right])
    }

    /// Conjunction of all arguments; `true` when empty.
    pub fn and_all(args: Vec<Expr>) -> Self {
        match args.len() {
            0 => Expr::TRUE,
            1 => args.into_iter().next().unwrap_or(Expr::TRUE),
            _ => Expr::compound(Op::And, args),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::compound(Op::Or, vec![left, right])
    }

    /// Disjunction of all arguments; `false` when empty.
    pub fn or_all(args: Vec<Expr>) -> Self {
        match args.len() {
            0 => Expr::FALSE,
            1 => args.into_iter().next().unwrap_or(Expr::FALSE),
            _ => Expr::compound(Op::Or, args),
        }
    }

    pub fn implies(premise: Expr, conclusion: Expr) -> Self {
        Expr::compound(Op::Implies, vec![premise, conclusion])
    }

    pub fn equivalent(left: Expr, right: Expr) -> Self {
        Expr::compound(Op::Equivalence, vec![left, right])
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::compound(Op::Equal, vec![left, right])
    }

    pub fn neq(left: Expr, right: Expr) -> Self {
        Expr::compound(Op::NotEqual, vec![left, right])
    }

    pub fn ite(condition: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Expr::compound(Op::IfThenElse, vec![condition, then_branch, else_branch])
    }

    pub fn plus(args: Vec<Expr>) -> Self {
        Expr::compound(Op::Plus, args)
    }

    pub fn times(args: Vec<Expr>) -> Self {
        Expr::compound(Op::Times, args)
    }

    pub fn minus(left: Expr, right: Expr) -> Self {
        Expr::compound(Op::Minus, vec![left, right])
    }

    pub fn divide(numerator: Expr, denominator: Expr) -> Self {
        Expr::compound(Op::Divide, vec![numerator, denominator])
    }

    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Expr::compound(Op::Exponentiation, vec![base, exponent])
    }

    pub fn union(args: Vec<Expr>) -> Self {
        Expr::compound(Op::Union, args)
    }

    pub fn intersection(left: Expr, right: Expr) -> Self {
        Expr::compound(Op::Intersection, vec![left, right])
    }

    pub fn set_difference(left: Expr, right: Expr) -> Self {
        Expr::compound(Op::SetDifference, vec![left, right])
    }

    pub fn is_in(element: Expr, set: Expr) -> Self {
        Expr::compound(Op::In, vec![element, set])
    }

    pub fn cardinality(set: Expr) -> Self {
        Expr::compound(Op::Cardinality, vec![set])
    }

    pub fn product(set: Expr) -> Self {
        Expr::compound(Op::Product, vec![set])
    }

    pub fn tuple(args: Vec<Expr>) -> Self {
        Expr::compound(Op::Tuple, args)
    }

    /// `message to target from source`
    pub fn message_to(target: Expr, source: Expr) -> Self {
        Expr::compound(Op::MessageTo, vec![target, source])
    }

    /// `previous message to target from source`
    pub fn previous_message_to(target: Expr, source: Expr) -> Self {
        Expr::compound(Op::PreviousMessageTo, vec![target, source])
    }

    /// `Neigh(reference)`
    pub fn neighbors(reference: Expr) -> Self {
        Expr::compound(Op::Neighbors, vec![reference])
    }

    /// `lambda parameter : body`, where the parameter is a random variable value.
    pub fn lambda(parameter: Expr, body: Expr) -> Self {
        Expr::compound(Op::Lambda, vec![parameter, body])
    }

    /// `(lambda)(argument)`
    pub fn apply_lambda(lambda: Expr, argument: Expr) -> Self {
        Expr::compound(Op::LambdaApplication, vec![lambda, argument])
    }

    pub fn set(set: SetExpr) -> Self {
        Expr::Set(Box::new(set))
    }

    /// Extensional uniset `{ e1, ..., en }`.
    pub fn uniset(elements: Vec<Expr>) -> Self {
        Expr::set(SetExpr::Extensional {
            kind: SetKind::UniSet,
            elements,
        })
    }

    /// Extensional multiset `{{ e1, ..., en }}`.
    pub fn multiset(elements: Vec<Expr>) -> Self {
        Expr::set(SetExpr::Extensional {
            kind: SetKind::MultiSet,
            elements,
        })
    }

    /// The empty uniset `{ }`.
    pub fn empty_set() -> Self {
        Expr::uniset(Vec::new())
    }

    /// `{{ (on indices) head | condition }}`
    pub fn intensional_multiset(indices: Vec<IndexExpression>, head: Expr, condition: Expr) -> Self {
        Expr::set(SetExpr::Intensional {
            kind: SetKind::MultiSet,
            indices,
            head,
            condition,
        })
    }

    /// `{ (on indices) head | condition }`
    pub fn intensional_uniset(indices: Vec<IndexExpression>, head: Expr, condition: Expr) -> Self {
        Expr::set(SetExpr::Intensional {
            kind: SetKind::UniSet,
            indices,
            head,
            condition,
        })
    }

    // ---- inspection -------------------------------------------------------

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Expr::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&BigRational> {
        match self {
            Expr::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_number().is_some_and(|n| n.is_zero())
    }

    pub fn is_one(&self) -> bool {
        self.as_number().is_some_and(|n| n.is_one())
    }

    /// Logical variables and constants: the things equality literals relate.
    pub fn is_term(&self) -> bool {
        matches!(self, Expr::Var(_) | Expr::Const(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Expr::Var(_))
    }

    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Expr::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn op(&self) -> Option<Op> {
        match self {
            Expr::Compound { op, .. } => Some(*op),
            _ => None,
        }
    }

    pub fn has_op(&self, expected: Op) -> bool {
        self.op() == Some(expected)
    }

    /// Arguments of a compound expression with the given operator.
    pub fn args_of(&self, expected: Op) -> Option<&[Expr]> {
        match self {
            Expr::Compound { op, args } if *op == expected => Some(args),
            _ => None,
        }
    }

    /// `(condition, then, else)` of a conditional.
    pub fn ite_parts(&self) -> Option<(&Expr, &Expr, &Expr)> {
        match self.args_of(Op::IfThenElse) {
            Some([condition, then_branch, else_branch]) => {
                Some((condition, then_branch, else_branch))
            }
            _ => None,
        }
    }

    pub fn is_conditional(&self) -> bool {
        self.ite_parts().is_some()
    }

    pub fn as_set(&self) -> Option<&SetExpr> {
        match self {
            Expr::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn bracket_content(&self) -> Option<&Expr> {
        match self {
            Expr::Bracket(inner) => Some(inner),
            _ => None,
        }
    }

    /// `[ p(..) ]`
    pub fn is_random_variable_reference(&self) -> bool {
        matches!(self.bracket_content(), Some(Expr::RandomValue { .. }))
    }

    pub fn is_random_value(&self) -> bool {
        matches!(self, Expr::RandomValue { .. })
    }

    /// `(target, source)` of `message to target from source`.
    pub fn message_parts(&self) -> Option<(&Expr, &Expr)> {
        match self.args_of(Op::MessageTo) {
            Some([target, source]) => Some((target, source)),
            _ => None,
        }
    }

    /// `(target, source)` of `previous message to target from source`.
    pub fn previous_message_parts(&self) -> Option<(&Expr, &Expr)> {
        match self.args_of(Op::PreviousMessageTo) {
            Some([target, source]) => Some((target, source)),
            _ => None,
        }
    }

    /// Whether the expression denotes a set, syntactically.
    pub fn is_set_expression(&self) -> bool {
        match self {
            Expr::Set(_) => true,
            Expr::Compound { op, .. } if op.is_set_operator() => true,
            _ => match self.ite_parts() {
                Some((_, then_branch, else_branch)) => {
                    then_branch.is_set_expression() && else_branch.is_set_expression()
                }
                None => false,
            },
        }
    }

    /// Syntactically empty: `{ }`, `{{ }}` or `union()`.
    pub fn is_empty_set(&self) -> bool {
        match self {
            Expr::Set(set) => set.is_empty_extensional(),
            _ => self.args_of(Op::Union).is_some_and(|args| args.is_empty()),
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Bool(_) | Expr::Number(_) | Expr::Var(_) | Expr::Const(_) => Vec::new(),
            Expr::RandomValue { args, .. } | Expr::Compound { args, .. } => args.iter().collect(),
            Expr::Bracket(inner) => vec![inner.as_ref()],
            Expr::Set(set) => set.children(),
        }
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Bool(value)
    }
}

impl From<BigRational> for Expr {
    fn from(value: BigRational) -> Self {
        Expr::Number(value)
    }
}
