use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::Endpoint;

use super::Store;

struct State {
    services: Vec<Endpoint>,
    rr_index: HashMap<String, usize>,
}

/// Process-local registry backend. Holds every endpoint in an ordered
/// `Vec` guarded by a single reader/writer lock, plus a round-robin
/// cursor per service name.
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                services: Vec::new(),
                rr_index: HashMap::new(),
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn register(&self, name: &str, address: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .services
            .iter()
            .any(|svc| svc.name == name && svc.address == address)
        {
            return Err(Error::AlreadyExists);
        }

        state.services.push(Endpoint::new(name, address));
        Ok(())
    }

    async fn deregister(&self, name: &str, address: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let pos = state
            .services
            .iter()
            .position(|svc| svc.name == name && svc.address == address)
            .ok_or(Error::NotFound)?;

        state.services.remove(pos);
        if !state.services.iter().any(|svc| svc.name == name) {
            state.rr_index.remove(name);
        }
        Ok(())
    }

    async fn find_service_by_name(&self, name: &str) -> Result<String> {
        let mut state = self.state.write().await;
        let active: Vec<&Endpoint> = state
            .services
            .iter()
            .filter(|svc| svc.name == name && svc.active)
            .collect();

        if active.is_empty() {
            return Err(Error::NotFound);
        }

        let cursor = *state.rr_index.get(name).unwrap_or(&0);
        let idx = cursor % active.len();
        let address = active[idx].address.clone();

        state.rr_index.insert(name.to_string(), (cursor + 1) % active.len());
        Ok(address)
    }

    async fn list_services(&self) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state
            .services
            .iter()
            .map(|svc| svc.name.clone())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn list_addrs(&self, name: &str) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let addrs: Vec<String> = state
            .services
            .iter()
            .filter(|svc| svc.name == name)
            .map(|svc| svc.address.clone())
            .collect();

        if addrs.is_empty() {
            return Err(Error::NotFound);
        }
        Ok(addrs)
    }

    async fn list_all(&self) -> Result<Vec<(String, String)>> {
        let state = self.state.read().await;
        Ok(state
            .services
            .iter()
            .map(|svc| (svc.name.clone(), svc.address.clone()))
            .collect())
    }

    async fn activate(&self, name: &str, address: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let svc = state
            .services
            .iter_mut()
            .find(|svc| svc.name == name && svc.address == address)
            .ok_or(Error::NotFound)?;
        svc.active = true;
        Ok(())
    }

    async fn deactivate(&self, name: &str, address: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let svc = state
            .services
            .iter_mut()
            .find(|svc| svc.name == name && svc.address == address)
            .ok_or(Error::NotFound)?;
        svc.active = false;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.services.clear();
        state.rr_index.clear();
        Ok(())
    }
}
