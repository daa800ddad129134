// src/state.rs

use axum::extract::FromRef;

use crate::{
    ai::SharedGenerator, config::Config, session::SessionRegistry, store::SharedStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Config,
    pub sessions: SessionRegistry,
    /// `None` when no API key is configured.
    pub generator: Option<SharedGenerator>,
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
