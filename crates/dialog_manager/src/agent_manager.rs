//! One processor per agent

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dialog_core::Config;
use dialog_llm::BackendResolver;
use dialog_processor::CommandProcessor;
use dialog_timeline::Timeline;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::agent::{Agent, AgentInput};
use crate::error::{DialogError, Result};
use crate::response::Response;
use crate::{DialogManager, ProcessorHandle};

#[derive(Default)]
struct AgentState {
    agents: Vec<Arc<Agent>>,
    processors: HashMap<String, ProcessorHandle>,
    active: Option<Arc<Agent>>,
}

/// Keeps one [`CommandProcessor`] per agent id.
///
/// Agents handed to [`new`](Self::new) are only registered. A processor is
/// created by [`prepare_agent`](Self::prepare_agent), which seeds a fresh
/// timeline from the agent's content and resolves a backend for it.
pub struct AgentDialogManager {
    id: Uuid,
    model_name: Option<String>,
    config: Config,
    resolver: Arc<BackendResolver>,
    state: RwLock<AgentState>,
}

impl AgentDialogManager {
    pub fn new<I, A>(
        agents: I,
        model_name: Option<String>,
        config: Config,
        resolver: Arc<BackendResolver>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<AgentInput>,
    {
        let id = Uuid::new_v4();
        let mut state = AgentState::default();
        for input in agents {
            let agent = input.into().into_agent()?;
            agent.register_with(id);
            state.agents.push(agent);
        }
        log::debug!("Agent manager {} registered {} agents", id, state.agents.len());

        Ok(Self {
            id,
            model_name,
            config,
            resolver,
            state: RwLock::new(state),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Create the agent's processor if it has none yet, and make the agent
    /// active. Calling this again returns the same processor.
    pub async fn prepare_agent(&self, agent: &Arc<Agent>) -> Result<ProcessorHandle> {
        if let Some(handle) = self.activate_prepared(agent).await {
            return Ok(handle);
        }

        // Model selection may prompt the user, so it runs without the state lock.
        let requested = self.model_name.as_deref().or(self.config.model.as_deref());
        let model = self.resolver.resolve_model_ref(requested)?;
        let backend = self.resolver.initialize(&model)?;

        let mut timeline = Timeline::new();
        timeline
            .load(agent.content().clone())
            .map_err(|source| DialogError::AgentInitialization {
                id: agent.id().to_string(),
                source,
            })?;

        let mut state = self.state.write().await;
        if let Some(handle) = state.processors.get(agent.id()).cloned() {
            state.active = Some(agent.clone());
            return Ok(handle);
        }

        let processor = CommandProcessor::new(backend, &self.config)
            .with_timeline(timeline)
            .with_resolver(self.resolver.clone());
        log::info!("Prepared agent {} with {}", agent.id(), model);

        let handle = Arc::new(Mutex::new(processor));
        state.processors.insert(agent.id().to_string(), handle.clone());
        state.active = Some(agent.clone());
        Ok(handle)
    }

    async fn activate_prepared(&self, agent: &Arc<Agent>) -> Option<ProcessorHandle> {
        let mut state = self.state.write().await;
        let handle = state.processors.get(agent.id()).cloned()?;
        state.active = Some(agent.clone());
        Some(handle)
    }

    /// Send `input` to a prepared agent and make it active.
    pub async fn message(&self, agent: &Arc<Agent>, input: &str) -> Result<Response> {
        let handle = {
            let mut state = self.state.write().await;
            let handle = state
                .processors
                .get(agent.id())
                .cloned()
                .ok_or_else(|| DialogError::AgentNotPrepared(agent.id().to_string()))?;
            state.active = Some(agent.clone());
            handle
        };

        let mut processor = handle.lock().await;
        Ok(Response::new(processor.process_single_message(input).await))
    }

    /// Register and prepare each agent. An id that is already registered
    /// keeps its existing agent.
    pub async fn add_agents<I, A>(&self, agents: I) -> Result<Vec<Arc<Agent>>>
    where
        I: IntoIterator<Item = A>,
        A: Into<AgentInput>,
    {
        let mut added = Vec::new();
        for input in agents {
            let candidate = input.into().into_agent()?;
            let agent = {
                let mut state = self.state.write().await;
                match state.agents.iter().find(|existing| existing.id() == candidate.id()) {
                    Some(existing) => existing.clone(),
                    None => {
                        candidate.register_with(self.id);
                        state.agents.push(candidate.clone());
                        candidate
                    }
                }
            };
            self.prepare_agent(&agent).await?;
            added.push(agent);
        }
        Ok(added)
    }

    pub async fn get_agents(&self) -> Vec<Arc<Agent>> {
        self.state.read().await.agents.clone()
    }

    pub async fn find_agent(&self, id: &str) -> Option<Arc<Agent>> {
        self.state
            .read()
            .await
            .agents
            .iter()
            .find(|agent| agent.id() == id)
            .cloned()
    }

    pub async fn active_agent(&self) -> Option<Arc<Agent>> {
        self.state.read().await.active.clone()
    }

    pub async fn get_active_processor(&self) -> Option<ProcessorHandle> {
        let state = self.state.read().await;
        state
            .active
            .as_ref()
            .and_then(|agent| state.processors.get(agent.id()).cloned())
    }
}

#[async_trait]
impl DialogManager for AgentDialogManager {
    type Target = Arc<Agent>;

    async fn message(&self, target: &Arc<Agent>, input: &str) -> Result<Response> {
        AgentDialogManager::message(self, target, input).await
    }
}
