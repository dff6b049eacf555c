//! Registry store and registration bus: the authoritative in-process
//! data structure mapping service names to their endpoints, and the
//! channel that announces new registrations to the health supervisor.

pub mod bus;
pub mod cancel;
pub mod error;
pub mod model;
pub mod store;

pub use bus::{registration_bus, Registration, RegistrationBusRx, RegistrationBusTx};
pub use cancel::{NoopProbeCanceller, ProbeCanceller};
pub use error::{Error, Result};
pub use model::Endpoint;
pub use store::memory::InMemoryStore;
pub use store::sqlite::SqliteStore;
pub use store::Store;
