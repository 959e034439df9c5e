//! Agent registry with two-phase construction.
//!
//! Phase one registers agent specs; phase two binds handoff edges between
//! already-registered agents. This lets mutually-referencing agents be
//! declared in any order while keeping every edge checked eagerly. `seal`
//! closes the registry; a sealed registry rejects all further mutation.

use std::collections::HashMap;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{AgentHandle, AgentSpec};

/// Registry of agents and their declared handoff edges.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentSpec>,
    handoffs: Vec<Vec<usize>>,
    by_name: HashMap<String, usize>,
    sealed: bool,
}

impl AgentRegistry {
    /// An empty, unsealed registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent spec and obtain its handle.
    ///
    /// # Errors
    /// - `EngineError::RegistrySealed` after `seal`
    /// - `EngineError::DuplicateAgent` when the name is taken
    pub fn register(&mut self, spec: AgentSpec) -> EngineResult<AgentHandle> {
        if self.sealed {
            return Err(EngineError::RegistrySealed);
        }
        if self.by_name.contains_key(&spec.name) {
            return Err(EngineError::DuplicateAgent(spec.name));
        }

        let index = self.agents.len();
        let handle = AgentHandle::new(index, spec.name.clone());
        self.by_name.insert(spec.name.clone(), index);
        self.agents.push(spec);
        self.handoffs.push(Vec::new());
        Ok(handle)
    }

    /// Bind the handoff targets of `from`, replacing any earlier binding.
    ///
    /// Duplicate targets collapse to one edge, first occurrence wins the
    /// position.
    ///
    /// # Errors
    /// - `EngineError::RegistrySealed` after `seal`
    /// - `EngineError::AgentNotFound` when `from` is not from this registry
    /// - `EngineError::InvalidHandoff` on a self-edge
    /// - `EngineError::UnknownTarget` when a target is not registered
    pub fn set_handoffs(
        &mut self,
        from: &AgentHandle,
        targets: &[AgentHandle],
    ) -> EngineResult<()> {
        if self.sealed {
            return Err(EngineError::RegistrySealed);
        }
        let from_index = self.check(from)?;

        let mut edges = Vec::with_capacity(targets.len());
        for target in targets {
            let target_index = self.check_target(from, target)?;
            if target_index == from_index {
                return Err(EngineError::InvalidHandoff {
                    from: from.name().to_string(),
                    to: target.name().to_string(),
                    reason: "an agent cannot hand off to itself".to_string(),
                });
            }
            if !edges.contains(&target_index) {
                edges.push(target_index);
            }
        }

        self.handoffs[from_index] = edges;
        Ok(())
    }

    /// Close the registry. All later `register`/`set_handoffs` calls fail.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether `seal` has been called.
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Handle for a registered agent by name.
    ///
    /// # Errors
    /// `EngineError::AgentNotFound` when no agent has that name.
    pub fn get(&self, name: &str) -> EngineResult<AgentHandle> {
        self.by_name
            .get(name)
            .map(|&index| AgentHandle::new(index, name))
            .ok_or_else(|| EngineError::AgentNotFound(name.to_string()))
    }

    /// Spec of a registered agent.
    pub fn spec(&self, handle: &AgentHandle) -> EngineResult<&AgentSpec> {
        let index = self.check(handle)?;
        Ok(&self.agents[index])
    }

    /// Declared handoff targets of an agent, in binding order.
    pub fn handoff_targets(&self, handle: &AgentHandle) -> EngineResult<Vec<AgentHandle>> {
        let index = self.check(handle)?;
        Ok(self.handoffs[index]
            .iter()
            .map(|&t| AgentHandle::new(t, self.agents[t].name.clone()))
            .collect())
    }

    /// Whether `from` declared an edge to the named agent.
    pub fn allows_handoff(&self, from: &AgentHandle, to_name: &str) -> bool {
        let Ok(from_index) = self.check(from) else {
            return false;
        };
        self.handoffs[from_index]
            .iter()
            .any(|&t| self.agents[t].name == to_name)
    }

    /// Resolve a dispatch-time handoff request against the declared edges.
    ///
    /// # Errors
    /// - `EngineError::InvalidHandoff` when the agent names itself
    /// - `EngineError::UnknownTarget` when the edge was never declared
    pub fn resolve_handoff(
        &self,
        from: &AgentHandle,
        to_name: &str,
    ) -> EngineResult<AgentHandle> {
        let from_index = self.check(from)?;
        if to_name == from.name() {
            return Err(EngineError::InvalidHandoff {
                from: from.name().to_string(),
                to: to_name.to_string(),
                reason: "an agent cannot hand off to itself".to_string(),
            });
        }
        self.handoffs[from_index]
            .iter()
            .find(|&&t| self.agents[t].name == to_name)
            .map(|&t| AgentHandle::new(t, to_name))
            .ok_or_else(|| EngineError::UnknownTarget {
                agent: from.name().to_string(),
                target: to_name.to_string(),
            })
    }

    /// All registered agents in registration order.
    pub fn agents(&self) -> Vec<AgentHandle> {
        self.agents
            .iter()
            .enumerate()
            .map(|(index, spec)| AgentHandle::new(index, spec.name.clone()))
            .collect()
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no agents are registered.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Validate a handle came from this registry.
    fn check(&self, handle: &AgentHandle) -> EngineResult<usize> {
        let index = handle.index();
        if self
            .agents
            .get(index)
            .is_some_and(|spec| spec.name == handle.name())
        {
            Ok(index)
        } else {
            Err(EngineError::AgentNotFound(handle.name().to_string()))
        }
    }

    /// Like `check`, but reports a foreign handle as an unknown target.
    fn check_target(&self, from: &AgentHandle, target: &AgentHandle) -> EngineResult<usize> {
        let index = target.index();
        if self
            .agents
            .get(index)
            .is_some_and(|spec| spec.name == target.name())
        {
            Ok(index)
        } else {
            Err(EngineError::UnknownTarget {
                agent: from.name().to_string(),
                target: target.name().to_string(),
            })
        }
    }
}
