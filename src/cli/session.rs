//! Connections shared by the commands of one invocation

use anyhow::Result;

use crate::storage::{Config, DraftStore, GatewayClient, SolverClient, StateStore};

pub struct Session {
    pub config: Config,
    state: StateStore<GatewayClient>,
    solver: SolverClient,
}

impl Session {
    pub fn open(config: Config) -> Self {
        let gateway = GatewayClient::new(
            config.gateway_url.clone(),
            config.token.clone(),
            config.app_identifier.clone(),
            config.timeout(),
        );
        let solver = SolverClient::new(config.solver_url.clone(), config.timeout());
        tracing::debug!(gateway = %config.gateway_url, solver = %config.solver_url, "session opened");

        Self {
            config,
            state: StateStore::new(gateway),
            solver,
        }
    }

    pub fn state(&mut self) -> &mut StateStore<GatewayClient> {
        &mut self.state
    }

    pub fn gateway(&self) -> &GatewayClient {
        self.state.gateway()
    }

    /// State store and solver together, for planning calls
    pub fn planner(&mut self) -> (&mut StateStore<GatewayClient>, &SolverClient) {
        (&mut self.state, &self.solver)
    }

    pub fn drafts(&self) -> Result<DraftStore> {
        Ok(DraftStore::new(self.config.whatif_draft_path()?))
    }
}
