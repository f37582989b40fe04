use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use thiserror::Error;

use crate::agent::{Agent, SharedAgent};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("agent with id '{0}' already registered")]
    DuplicateAgent(String),

    #[error("invalid agent id: {0}")]
    InvalidAgentId(String),
}

/// Concurrent map from agent id to its executable handle.
///
/// Lookup is lazy: a plan may reference an id that is only registered (or
/// already unregistered) by the time its task executes; the executor fails
/// that task at execution time.
pub struct AgentRegistry {
    agents: DashMap<String, SharedAgent>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
        }
    }

    pub fn register<A>(&self, agent_id: impl Into<String>, agent: A) -> Result<(), RegistryError>
    where
        A: Agent + 'static,
    {
        self.register_shared(agent_id, Arc::new(agent))
    }

    pub fn register_shared(
        &self,
        agent_id: impl Into<String>,
        agent: SharedAgent,
    ) -> Result<(), RegistryError> {
        let agent_id = agent_id.into();
        let agent_id = agent_id.trim();

        if agent_id.is_empty() {
            return Err(RegistryError::InvalidAgentId(
                "agent id cannot be empty".to_string(),
            ));
        }

        match self.agents.entry(agent_id.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateAgent(agent_id.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(agent);
                tracing::info!(agent_id, "registered agent");
                Ok(())
            }
        }
    }

    pub fn get(&self, agent_id: &str) -> Option<SharedAgent> {
        self.agents
            .get(agent_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    pub fn unregister(&self, agent_id: &str) -> bool {
        let removed = self.agents.remove(agent_id).is_some();
        if removed {
            tracing::info!(agent_id, "unregistered agent");
        }
        removed
    }

    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use orchestration_core::{AgentRunError, Parameters};

    struct StubAgent;

    #[async_trait]
    impl Agent for StubAgent {
        async fn run(
            &self,
            _task_type: &str,
            _parameters: &Parameters,
        ) -> Result<Value, AgentRunError> {
            Ok(json!("ok"))
        }
    }

    #[test]
    fn register_and_get() {
        let registry = AgentRegistry::new();

        assert!(registry.register("worker", StubAgent).is_ok());
        assert!(registry.get("worker").is_some());
        assert!(registry.get("unknown").is_none());
        assert!(registry.contains("worker"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = AgentRegistry::new();

        registry.register("dup", StubAgent).unwrap();
        let duplicate = registry.register("dup", StubAgent);

        assert!(matches!(duplicate, Err(RegistryError::DuplicateAgent(id)) if id == "dup"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let registry = AgentRegistry::new();

        let result = registry.register("  ", StubAgent);

        assert!(matches!(result, Err(RegistryError::InvalidAgentId(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_removes_agent() {
        let registry = AgentRegistry::new();
        registry.register("worker", StubAgent).unwrap();

        assert!(registry.unregister("worker"));
        assert!(!registry.unregister("worker"));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn agent_ids_are_sorted() {
        let registry = AgentRegistry::new();
        registry.register("zeta", StubAgent).unwrap();
        registry.register("alpha", StubAgent).unwrap();

        assert_eq!(registry.agent_ids(), vec!["alpha", "zeta"]);
    }
}
