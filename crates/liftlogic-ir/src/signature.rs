//! Random variable signatures.

use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::expr::Expr;

/// Signature of a boolean random variable: its name and argument sorts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomVariableSignature {
    pub name: String,
    pub arg_sorts: Vec<String>,
}

impl RandomVariableSignature {
    pub fn new<I, S>(name: impl Into<String>, arg_sorts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RandomVariableSignature {
            name: name.into(),
            arg_sorts: arg_sorts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.arg_sorts.len()
    }
}

/// Registry of random variable signatures
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureRegistry {
    signatures: Vec<RandomVariableSignature>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signature, replacing any previous one with the same name
    pub fn register(&mut self, signature: RandomVariableSignature) {
        self.signatures.retain(|existing| existing.name != signature.name);
        self.signatures.push(signature);
    }

    pub fn get(&self, name: &str) -> Option<&RandomVariableSignature> {
        self.signatures.iter().find(|sig| sig.name == name)
    }

    pub fn all(&self) -> &[RandomVariableSignature] {
        &self.signatures
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sort of argument `position` of random variable `name`.
    pub fn arg_sort(&self, name: &str, position: usize) -> Option<&str> {
        self.get(name)
            .and_then(|sig| sig.arg_sorts.get(position))
            .map(String::as_str)
    }

    /// Check that a random variable value is declared with the right arity.
    pub fn validate(&self, value: &Expr) -> Result<(), IrError> {
        match value {
            Expr::RandomValue { functor, args } => {
                let sig = self
                    .get(functor)
                    .ok_or_else(|| IrError::UndeclaredRandomVariable {
                        name: functor.clone(),
                    })?;
                if sig.arity() != args.len() {
                    return Err(IrError::ArityMismatch {
                        name: functor.clone(),
                        expected: sig.arity(),
                        actual: args.len(),
                    });
                }
                if let Some(bad) = args.iter().find(|arg| !arg.is_term()) {
                    return Err(IrError::IllegalArgument(format!(
                        "argument {} of {} is not a variable or constant",
                        bad, functor
                    )));
                }
                Ok(())
            }
            other => Err(IrError::IllegalArgument(format!(
                "{} is not a random variable value",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_arity() {
        let sig = RandomVariableSignature::new("friends", ["People", "People"]);
        assert_eq!(sig.arity(), 2);
        let nullary = RandomVariableSignature::new("r", Vec::<String>::new());
        assert_eq!(nullary.arity(), 0);
    }

    #[test]
    fn test_registry_lookup_and_validation() {
        let mut registry = SignatureRegistry::new();
        registry.register(RandomVariableSignature::new("p", ["People"]));
        assert_eq!(registry.arg_sort("p", 0), Some("People"));
        assert_eq!(registry.arg_sort("p", 1), None);

        assert!(registry
            .validate(&Expr::rv("p", vec![Expr::var("X")]))
            .is_ok());
        assert!(matches!(
            registry.validate(&Expr::rv("p", vec![])),
            Err(IrError::ArityMismatch { expected: 1, actual: 0, .. })
        ));
        assert!(matches!(
            registry.validate(&Expr::rv("q", vec![])),
            Err(IrError::UndeclaredRandomVariable { .. })
        ));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = SignatureRegistry::new();
        registry.register(RandomVariableSignature::new("p", ["People"]));
        registry.register(RandomVariableSignature::new("p", ["Cities"]));
        assert_eq!(registry.all().len(), 1);
        assert_eq!(registry.arg_sort("p", 0), Some("Cities"));
    }
}
