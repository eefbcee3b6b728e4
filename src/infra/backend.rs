//! Selects and wires the post store and auth client from settings.

use std::sync::Arc;

use tracing::info;

use crate::application::repos::{AuthClient, PostStore};
use crate::config::{BackendSettings, DemoSettings};

use super::error::InfraError;
use super::memory::{MemoryAuthClient, MemoryPostStore};
use super::rest::{RestAuthClient, RestPostStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Demo,
    Remote,
}

#[derive(Clone)]
pub struct Backend {
    pub kind: BackendKind,
    pub store: Arc<dyn PostStore>,
    pub auth: Arc<dyn AuthClient>,
}

/// Build the remote adapters when a backend URL is configured, otherwise
/// the seeded in-memory demo.
pub fn connect(backend: &BackendSettings, demo: &DemoSettings) -> Result<Backend, InfraError> {
    let Some(url) = backend.url.as_ref() else {
        info!("no backend url configured; using the in-memory demo store");
        let store: Arc<dyn PostStore> = Arc::new(MemoryPostStore::seeded());
        let auth: Arc<dyn AuthClient> = Arc::new(MemoryAuthClient::new([(
            demo.email.clone(),
            demo.password.clone(),
        )]));
        return Ok(Backend {
            kind: BackendKind::Demo,
            store,
            auth,
        });
    };

    if backend.anon_key.is_empty() {
        return Err(InfraError::configuration(
            "backend anon key is not configured",
        ));
    }

    let auth = RestAuthClient::new(url, &backend.anon_key)?;
    let store = RestPostStore::new(url, &backend.anon_key, auth.session_changes())?
        .with_poll_interval(backend.poll_interval)
        .with_increment_rpc(backend.increment_rpc.clone());
    info!(backend = %url, "connected to remote post store");

    Ok(Backend {
        kind: BackendKind::Remote,
        store: Arc::new(store),
        auth: Arc::new(auth),
    })
}
