use std::collections::BTreeSet;

use tracing::trace;

use crate::error::{Result, SimError};

/// Scenario-wide registry guaranteeing every named entity a unique name.
/// Names are released when their entity is destroyed and may be reused.
#[derive(Debug, Default)]
pub struct NameManager {
    names: BTreeSet<String>,
}

impl NameManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(SimError::InvalidConfig("entity names cannot be empty".into()));
        }
        if !self.names.insert(name.to_string()) {
            return Err(SimError::DuplicateName(name.to_string()));
        }
        trace!(name, "name registered");
        Ok(())
    }

    pub fn release(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_rejected_until_released() {
        let mut n = NameManager::new();
        n.register("auv").unwrap();
        assert!(matches!(n.register("auv"), Err(SimError::DuplicateName(_))));
        assert!(n.release("auv"));
        n.register("auv").unwrap();
        assert!(n.register("").is_err());
    }
}
