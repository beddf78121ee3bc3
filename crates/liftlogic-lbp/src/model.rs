//! First-order probabilistic models.
//!
//! A [`Model`] is a list of parfactors over boolean random variables. Each
//! parfactor is a set of bracketed potentials: an extensional set
//! (`{ [if epidemic then 0.1 else 0.9] }`) or an intensional multiset
//! (`{{ ( on X in People ) [if sick(X) then 0.4 else 0.6] | X != bob }}`).
//! Models are immutable once built and may be shared by concurrent queries.

use std::sync::Arc;

use liftlogic_ir::{
    Context, DomainInfo, DomainRegistry, Expr, IndexDomain, RandomVariableSignature, SetExpr,
    SignatureRegistry, Vocabulary,
};
use crate::error::{LbpError, Result};

#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    vocabulary: Arc<Vocabulary>,
    parfactors: Vec<Expr>,
}

impl Model {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn parfactors(&self) -> &[Expr] {
        &self.parfactors
    }

    /// Root context of every query on this model.
    pub fn context(&self) -> Context {
        Context::new(Arc::clone(&self.vocabulary))
    }

    pub fn is_random_variable(&self, value: &Expr) -> bool {
        self.vocabulary.signatures.validate(value).is_ok()
    }

    /// All factors of the model as one set expression.
    pub fn factors(&self) -> Expr {
        match self.parfactors.len() {
            0 => Expr::empty_set(),
            1 => self.parfactors[0].clone(),
            _ => Expr::union(self.parfactors.clone()),
        }
    }

    /// The same model with the size of `sort` set or replaced.
    pub fn with_sort_size(&self, sort: &str, size: usize) -> Result<Model> {
        let mut vocabulary = (*self.vocabulary).clone();
        if vocabulary.domains.contains(sort) {
            vocabulary.domains.set_size(sort, size)?;
        } else {
            vocabulary.domains.register(DomainInfo::finite(sort, size))?;
        }
        Ok(Model {
            name: self.name.clone(),
            vocabulary: Arc::new(vocabulary),
            parfactors: self.parfactors.clone(),
        })
    }

    /// The model extended with the observation that `random_value` is
    /// `observed`, as a deterministic factor.
    pub fn with_evidence(&self, random_value: &Expr, observed: bool) -> Result<Model> {
        self.vocabulary.signatures.validate(random_value)?;
        let (then_weight, else_weight) = if observed { (1, 0) } else { (0, 1) };
        let factor = Expr::bracket(Expr::ite(
            random_value.clone(),
            Expr::int(then_weight),
            Expr::int(else_weight),
        ));
        let mut parfactors = self.parfactors.clone();
        parfactors.push(Expr::multiset(vec![factor]));
        Ok(Model {
            name: format!("{} | {} = {}", self.name, random_value, observed),
            vocabulary: Arc::clone(&self.vocabulary),
            parfactors,
        })
    }
}

/// Builder collecting sorts, random variable declarations and parfactors.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    domains: DomainRegistry,
    signatures: SignatureRegistry,
    parfactors: Vec<Expr>,
    error: Option<LbpError>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domains: DomainRegistry::new(),
            signatures: SignatureRegistry::new(),
            parfactors: Vec::new(),
            error: None,
        }
    }

    pub fn sort(mut self, domain: DomainInfo) -> Self {
        if let Err(e) = self.domains.register(domain) {
            self.error.get_or_insert(e.into());
        }
        self
    }

    /// Declares a boolean random variable with the given argument sorts.
    pub fn random_variable<I, S>(mut self, name: &str, arg_sorts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signatures
            .register(RandomVariableSignature::new(name, arg_sorts));
        self
    }

    pub fn parfactor(mut self, parfactor: Expr) -> Self {
        self.parfactors.push(parfactor);
        self
    }

    pub fn build(self) -> Result<Model> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let vocabulary = Vocabulary::new(self.domains, self.signatures);
        for parfactor in &self.parfactors {
            validate_parfactor(parfactor, &vocabulary)?;
        }
        Ok(Model {
            name: self.name,
            vocabulary: Arc::new(vocabulary),
            parfactors: self.parfactors,
        })
    }
}

fn validate_parfactor(parfactor: &Expr, vocabulary: &Vocabulary) -> Result<()> {
    let set = parfactor.as_set().ok_or_else(|| {
        LbpError::InvalidModel(format!("parfactor {} is not a set of factors", parfactor))
    })?;
    let factors: Vec<&Expr> = match set {
        SetExpr::Extensional { elements, .. } => elements.iter().collect(),
        SetExpr::Intensional {
            indices,
            head,
            condition,
            ..
        } => {
            if !set.is_multiset() {
                return Err(LbpError::InvalidModel(format!(
                    "intensional parfactor {} must be a multiset",
                    parfactor
                )));
            }
            for index in indices {
                match &index.domain {
                    Some(IndexDomain::Sort(sort)) if !vocabulary.domains.contains(sort) => {
                        return Err(LbpError::InvalidModel(format!(
                            "index {} of {} ranges over undeclared sort {}",
                            index, parfactor, sort
                        )))
                    }
                    Some(IndexDomain::Set(_)) => {
                        return Err(LbpError::InvalidModel(format!(
                            "index {} of {} must range over a sort",
                            index, parfactor
                        )))
                    }
                    _ => {}
                }
            }
            if condition.contains_random_values() {
                return Err(LbpError::InvalidModel(format!(
                    "condition of {} mentions random variables",
                    parfactor
                )));
            }
            vec![head]
        }
    };
    for factor in factors {
        let potential = match factor {
            Expr::Bracket(potential) if !potential.is_random_value() => potential,
            other => {
                return Err(LbpError::InvalidModel(format!(
                    "{} is not a bracketed potential",
                    other
                )))
            }
        };
        for value in potential.random_values() {
            vocabulary.signatures.validate(&value)?;
        }
    }
    Ok(())
}
