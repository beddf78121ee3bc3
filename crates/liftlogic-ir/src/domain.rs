//! Sorts that logical variables range over.
//!
//! This module provides:
//! - Sort metadata (name, optional size, known constants)
//! - A registry mapping sort names to their metadata
//!
//! A sort without a known size keeps its cardinality symbolic (`| People |`)
//! in lifted computations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::IrError;

/// Sort used for indices whose sort cannot be inferred.
pub const UNIVERSE: &str = "Universe";

/// Metadata for one sort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    /// Sort name (e.g., "People", "Universe")
    pub name: String,
    /// Number of elements (None when left symbolic)
    pub size: Option<usize>,
    /// Constants known to belong to the sort
    pub constants: Vec<String>,
}

impl DomainInfo {
    /// Sort of unknown size.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            constants: Vec::new(),
        }
    }

    /// Sort with a fixed number of elements.
    pub fn finite(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size: Some(size),
            constants: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_constants<I, S>(mut self, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constants.extend(constants.into_iter().map(Into::into));
        self
    }

    /// Whether the declared constants fit in the declared size.
    pub fn is_consistent(&self) -> bool {
        self.size.map_or(true, |size| self.constants.len() <= size)
    }
}

/// Registry of sorts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainRegistry {
    domains: HashMap<String, DomainInfo>,
}

impl Default for DomainRegistry {
    /// Registry holding only [`UNIVERSE`], of unknown size.
    fn default() -> Self {
        let mut domains = HashMap::new();
        domains.insert(UNIVERSE.to_string(), DomainInfo::new(UNIVERSE));
        Self { domains }
    }
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sort. Fails if a sort with the same name exists,
    /// except for replacing the default [`UNIVERSE`] entry.
    pub fn register(&mut self, domain: DomainInfo) -> Result<(), IrError> {
        if !domain.is_consistent() {
            return Err(IrError::IllegalArgument(format!(
                "sort {} declares {} constants but has size {:?}",
                domain.name,
                domain.constants.len(),
                domain.size
            )));
        }
        match self.domains.get(&domain.name) {
            Some(existing) if existing != &DomainInfo::new(UNIVERSE) => {
                Err(IrError::DomainAlreadyExists { name: domain.name })
            }
            _ => {
                self.domains.insert(domain.name.clone(), domain);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&DomainInfo> {
        self.domains.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.domains.contains_key(name)
    }

    /// Size of a sort, if both the sort and its size are known.
    pub fn size_of(&self, name: &str) -> Option<usize> {
        self.domains.get(name).and_then(|domain| domain.size)
    }

    /// Override the size of an existing sort.
    pub fn set_size(&mut self, name: &str, size: usize) -> Result<(), IrError> {
        let domain = self
            .domains
            .get_mut(name)
            .ok_or_else(|| IrError::DomainNotFound {
                name: name.to_string(),
            })?;
        domain.size = Some(size);
        Ok(())
    }

    /// Sort names in lexicographic order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.domains.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_universe() {
        let registry = DomainRegistry::new();
        assert!(registry.contains(UNIVERSE));
        assert_eq!(registry.size_of(UNIVERSE), None);
    }

    #[test]
    fn test_register_and_override_universe() {
        let mut registry = DomainRegistry::new();
        registry.register(DomainInfo::finite(UNIVERSE, 2)).unwrap();
        assert_eq!(registry.size_of(UNIVERSE), Some(2));

        registry.register(DomainInfo::new("People")).unwrap();
        assert!(matches!(
            registry.register(DomainInfo::new("People")),
            Err(IrError::DomainAlreadyExists { .. })
        ));
        assert_eq!(registry.names(), vec!["People", UNIVERSE]);
    }

    #[test]
    fn test_set_size() {
        let mut registry = DomainRegistry::new();
        registry.set_size(UNIVERSE, 3).unwrap();
        assert_eq!(registry.size_of(UNIVERSE), Some(3));
        assert!(matches!(
            registry.set_size("Cities", 3),
            Err(IrError::DomainNotFound { .. })
        ));
    }

    #[test]
    fn test_inconsistent_constants_rejected() {
        let mut registry = DomainRegistry::new();
        let sort = DomainInfo::finite("Coins", 1).with_constants(["heads", "tails"]);
        assert!(registry.register(sort).is_err());
    }
}
