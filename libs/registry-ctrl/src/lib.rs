//! Thin orchestration layer between the front-ends and the registry
//! store: validates nothing itself (front-ends do that), translates
//! store-level errors to the controller's error taxonomy, and
//! publishes newly registered endpoints on the registration bus.

pub mod error;

use std::sync::Arc;

use registry_core::{NoopProbeCanceller, ProbeCanceller, RegistrationBusTx, Store};

pub use error::{Error, Result};

pub struct Controller {
    store: Arc<dyn Store>,
    bus: RegistrationBusTx,
    probe_canceller: Arc<dyn ProbeCanceller>,
}

impl Controller {
    /// Build a controller with no health supervisor wired in; operator
    /// deregistration will wait out the stale probe task's next cycle
    /// instead of cancelling it immediately.
    pub fn new(store: Arc<dyn Store>, bus: RegistrationBusTx) -> Self {
        Self::with_probe_canceller(store, bus, Arc::new(NoopProbeCanceller))
    }

    pub fn with_probe_canceller(
        store: Arc<dyn Store>,
        bus: RegistrationBusTx,
        probe_canceller: Arc<dyn ProbeCanceller>,
    ) -> Self {
        Self {
            store,
            bus,
            probe_canceller,
        }
    }

    pub async fn register(&self, name: &str, address: &str) -> Result<()> {
        self.store.register(name, address).await.map_err(|e| {
            if matches!(e, registry_core::Error::AlreadyExists) {
                tracing::debug!(name, address, "service already registered");
            } else {
                tracing::error!(name, address, error = %e, "error registering service");
            }
            Error::from(e)
        })?;

        self.bus.publish(name, address);
        tracing::debug!(name, address, "registered service");
        Ok(())
    }

    pub async fn deregister(&self, name: &str, address: &str) -> Result<()> {
        self.store.deregister(name, address).await.map_err(|e| {
            if !matches!(e, registry_core::Error::NotFound) {
                tracing::error!(name, address, error = %e, "error deregistering service");
            }
            Error::from(e)
        })?;

        self.probe_canceller.cancel_probe(name, address);
        Ok(())
    }

    pub async fn find_service_by_name(&self, name: &str) -> Result<String> {
        self.store.find_service_by_name(name).await.map_err(|e| {
            if !matches!(e, registry_core::Error::NotFound) {
                tracing::error!(name, error = %e, "error finding service");
            }
            Error::from(e)
        })
    }

    pub async fn list_services(&self) -> Result<Vec<String>> {
        self.store.list_services().await.map_err(|e| {
            tracing::error!(error = %e, "error listing services");
            Error::from(e)
        })
    }

    pub async fn list_addrs(&self, name: &str) -> Result<Vec<String>> {
        self.store.list_addrs(name).await.map_err(|e| {
            if !matches!(e, registry_core::Error::NotFound) {
                tracing::error!(name, error = %e, "error listing addrs");
            }
            Error::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::{registration_bus, InMemoryStore};
    use std::sync::Mutex;

    fn make_controller() -> (Controller, registry_core::RegistrationBusRx) {
        let (tx, rx) = registration_bus(8);
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        (Controller::new(store, tx), rx)
    }

    #[derive(Default)]
    struct SpyCanceller {
        cancelled: Mutex<Vec<(String, String)>>,
    }

    impl ProbeCanceller for SpyCanceller {
        fn cancel_probe(&self, name: &str, address: &str) {
            self.cancelled
                .lock()
                .unwrap()
                .push((name.to_string(), address.to_string()));
        }
    }

    #[tokio::test]
    async fn register_publishes_on_bus() {
        let (ctrl, mut rx) = make_controller();
        ctrl.register("svc", "a1").await.unwrap();

        let reg = rx.recv().await.unwrap();
        assert_eq!(reg.name, "svc");
        assert_eq!(reg.address, "a1");
    }

    #[tokio::test]
    async fn duplicate_register_maps_to_already_exists() {
        let (ctrl, _rx) = make_controller();
        ctrl.register("svc", "a1").await.unwrap();
        assert!(matches!(
            ctrl.register("svc", "a1").await,
            Err(Error::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn deregister_absent_maps_to_not_found() {
        let (ctrl, _rx) = make_controller();
        assert!(matches!(
            ctrl.deregister("svc", "a1").await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn find_service_round_trips_through_controller() {
        let (ctrl, _rx) = make_controller();
        ctrl.register("svc", "a1").await.unwrap();
        assert_eq!(ctrl.find_service_by_name("svc").await.unwrap(), "a1");
    }

    #[tokio::test]
    async fn successful_deregister_cancels_the_probe_task() {
        let (tx, _rx) = registration_bus(8);
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let spy = Arc::new(SpyCanceller::default());
        let ctrl = Controller::with_probe_canceller(store, tx, spy.clone());

        ctrl.register("svc", "a1").await.unwrap();
        ctrl.deregister("svc", "a1").await.unwrap();

        assert_eq!(
            *spy.cancelled.lock().unwrap(),
            vec![("svc".to_string(), "a1".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_deregister_does_not_cancel_a_probe_task() {
        let (tx, _rx) = registration_bus(8);
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let spy = Arc::new(SpyCanceller::default());
        let ctrl = Controller::with_probe_canceller(store, tx, spy.clone());

        assert!(ctrl.deregister("svc", "a1").await.is_err());
        assert!(spy.cancelled.lock().unwrap().is_empty());
    }
}
