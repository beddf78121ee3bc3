//! Extensional and intensional sets.
//!
//! Sets come in two kinds ([`SetKind::UniSet`], [`SetKind::MultiSet`]) and two
//! shapes:
//!
//! ```text
//! Extensional  { a, b, c }            {{ a, a, b }}
//! Intensional  { (on X in People) f(X) | X != bob }
//! ```
//!
//! An intensional multiset does not guarantee that distinct index bindings
//! produce distinct elements; callers that need uniqueness must establish it.
//! The operations on sets (union, difference, membership, ...) live in
//! [`algebra`]; intensional simplification and standardizing apart in
//! [`intensional`].

pub mod algebra;
pub mod intensional;

use serde::{Deserialize, Serialize};

use crate::expr::Expr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SetKind {
    UniSet,
    MultiSet,
}

/// Domain of an index: a sort name or another set.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexDomain {
    Sort(String),
    Set(Expr),
}

/// `X`, `X in People` or `F in S` inside `(on ...)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexExpression {
    pub index: Expr,
    pub domain: Option<IndexDomain>,
}

impl IndexExpression {
    /// Untyped index variable.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            index: Expr::var(name),
            domain: None,
        }
    }

    /// Index ranging over a sort.
    pub fn in_sort(name: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            index: Expr::var(name),
            domain: Some(IndexDomain::Sort(sort.into())),
        }
    }

    /// Index ranging over the elements of a set expression.
    pub fn in_set(name: impl Into<String>, set: Expr) -> Self {
        Self {
            index: Expr::var(name),
            domain: Some(IndexDomain::Set(set)),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.index.variable_name()
    }

    pub fn sort(&self) -> Option<&str> {
        match &self.domain {
            Some(IndexDomain::Sort(sort)) => Some(sort),
            _ => None,
        }
    }

    pub fn domain_set(&self) -> Option<&Expr> {
        match &self.domain {
            Some(IndexDomain::Set(set)) => Some(set),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SetExpr {
    Extensional {
        kind: SetKind,
        elements: Vec<Expr>,
    },
    Intensional {
        kind: SetKind,
        indices: Vec<IndexExpression>,
        head: Expr,
        condition: Expr,
    },
}

impl SetExpr {
    pub fn kind(&self) -> SetKind {
        match self {
            SetExpr::Extensional { kind, .. } | SetExpr::Intensional { kind, .. } => *kind,
        }
    }

    pub fn is_multiset(&self) -> bool {
        self.kind() == SetKind::MultiSet
    }

    pub fn is_extensional(&self) -> bool {
        matches!(self, SetExpr::Extensional { .. })
    }

    pub fn is_intensional(&self) -> bool {
        matches!(self, SetExpr::Intensional { .. })
    }

    /// Elements of an extensional set.
    pub fn elements(&self) -> Option<&[Expr]> {
        match self {
            SetExpr::Extensional { elements, .. } => Some(elements),
            SetExpr::Intensional { .. } => None,
        }
    }

    pub fn is_empty_extensional(&self) -> bool {
        self.elements().is_some_and(|elements| elements.is_empty())
    }

    /// Extensional set with exactly one element.
    pub fn is_singleton(&self) -> bool {
        self.elements().is_some_and(|elements| elements.len() == 1)
    }

    pub fn indices(&self) -> &[IndexExpression] {
        match self {
            SetExpr::Intensional { indices, .. } => indices,
            SetExpr::Extensional { .. } => &[],
        }
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indices()
            .iter()
            .filter_map(|index| index.name().map(str::to_string))
            .collect()
    }

    pub fn empty(kind: SetKind) -> Self {
        SetExpr::Extensional {
            kind,
            elements: Vec::new(),
        }
    }

    pub fn singleton(kind: SetKind, element: Expr) -> Self {
        SetExpr::Extensional {
            kind,
            elements: vec![element],
        }
    }

    pub(crate) fn children(&self) -> Vec<&Expr> {
        match self {
            SetExpr::Extensional { elements, .. } => elements.iter().collect(),
            SetExpr::Intensional {
                indices,
                head,
                condition,
                ..
            } => {
                let mut children: Vec<&Expr> = indices
                    .iter()
                    .filter_map(IndexExpression::domain_set)
                    .collect();
                children.push(head);
                children.push(condition);
                children
            }
        }
    }
}
