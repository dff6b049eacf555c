pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;

/// Capability set implemented by every registry backend.
///
/// Two concrete implementations are provided: [`memory::InMemoryStore`]
/// (process-local, no persistence) and [`sqlite::SqliteStore`] (durable,
/// backed by a SQLite table). Both honor the same (name, address)
/// uniqueness invariant and the same round-robin lookup semantics.
#[async_trait]
pub trait Store: Send + Sync {
    /// Register a new endpoint as active. Fails with `AlreadyExists` if
    /// the (name, address) pair is already present.
    async fn register(&self, name: &str, address: &str) -> Result<()>;

    /// Remove an endpoint. Fails with `NotFound` if the pair is absent.
    async fn deregister(&self, name: &str, address: &str) -> Result<()>;

    /// Return one active address for `name`, rotating the round-robin
    /// cursor. Fails with `NotFound` if no active endpoint exists.
    async fn find_service_by_name(&self, name: &str) -> Result<String>;

    /// All distinct service names currently registered.
    async fn list_services(&self) -> Result<Vec<String>>;

    /// All addresses (active and inactive) registered for `name`.
    /// Fails with `NotFound` if no endpoint is registered under `name`.
    async fn list_addrs(&self, name: &str) -> Result<Vec<String>>;

    /// Every (name, address) pair currently registered, for supervisor
    /// startup recovery.
    async fn list_all(&self) -> Result<Vec<(String, String)>>;

    /// Mark an endpoint active. Idempotent. Fails with `NotFound` if
    /// the pair is absent.
    async fn activate(&self, name: &str, address: &str) -> Result<()>;

    /// Mark an endpoint inactive. Idempotent. Fails with `NotFound` if
    /// the pair is absent.
    async fn deactivate(&self, name: &str, address: &str) -> Result<()>;

    /// Release any resources held by the store. Further operations
    /// after `close` are not guaranteed to succeed.
    async fn close(&self) -> Result<()>;
}
