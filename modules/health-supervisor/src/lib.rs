//! Owns the probe task fleet: one task per registered endpoint,
//! spawned at startup for existing endpoints and on demand for newly
//! registered ones, torn down on deregistration or global shutdown.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use health_checker::Prober;
use registry_core::{ProbeCanceller, RegistrationBusRx, Store};
use tokio_util::sync::CancellationToken;

pub struct Supervisor {
    store: Arc<dyn Store>,
    prober: Arc<Prober>,
    max_retries: u32,
    cooldown: Duration,
    cancel: CancellationToken,
    tasks: Arc<DashMap<(String, String), CancellationToken>>,
}

impl Supervisor {
    pub fn new(
        store: Arc<dyn Store>,
        prober: Prober,
        max_retries: u32,
        cooldown: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            prober: Arc::new(prober),
            max_retries,
            cooldown,
            cancel,
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Enumerates existing endpoints, spawns a probe task per endpoint,
    /// then runs the dispatcher loop over the registration bus until
    /// cancellation.
    pub async fn run(self: Arc<Self>, mut bus_rx: RegistrationBusRx) {
        match self.store.list_all().await {
            Ok(pairs) => {
                for (name, address) in pairs {
                    self.clone().spawn_probe(name, address);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "failed to list services for startup recovery");
            }
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("supervisor dispatcher stopped");
                    return;
                }
                maybe_reg = bus_rx.recv() => {
                    match maybe_reg {
                        Some(reg) => self.clone().spawn_probe(reg.name, reg.address),
                        None => {
                            tracing::info!("registration bus closed, dispatcher exiting");
                            return;
                        }
                    }
                }
            }
        }
    }

    fn spawn_probe(self: Arc<Self>, name: String, address: String) {
        let key = (name.clone(), address.clone());
        let task_token = self.cancel.child_token();
        self.tasks.insert(key.clone(), task_token.clone());

        let supervisor = self;
        tokio::spawn(async move {
            supervisor.probe_loop(name, address, task_token).await;
        });
    }

    async fn probe_loop(&self, name: String, address: String, task_token: CancellationToken) {
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                _ = task_token.cancelled() => {
                    tracing::info!(name, address, "probe task stopped");
                    self.tasks.remove(&(name.clone(), address.clone()));
                    return;
                }
                _ = tokio::time::sleep(self.cooldown) => {}
            }

            let healthy = self.prober.probe(&name, &address).await;

            if healthy {
                if let Err(e) = self.store.activate(&name, &address).await {
                    tracing::debug!(name, address, error = %e, "failed to mark endpoint active");
                }
                failures = 0;
            } else {
                tracing::warn!(name, address, "endpoint health check failed");
                if let Err(e) = self.store.deactivate(&name, &address).await {
                    tracing::debug!(name, address, error = %e, "failed to mark endpoint inactive");
                }
                failures += 1;

                if failures >= self.max_retries {
                    tracing::warn!(name, address, "deregistering endpoint after repeated failures");
                    match self.store.deregister(&name, &address).await {
                        Ok(()) => {
                            self.tasks.remove(&(name.clone(), address.clone()));
                            return;
                        }
                        Err(e) => {
                            tracing::error!(name, address, error = %e, "failed to deregister unhealthy endpoint");
                        }
                    }
                }
            }
        }
    }

    /// Cancels the probe task for a specific endpoint immediately,
    /// without waiting for it to next observe a missing row. Intended
    /// for operator-initiated deregistration.
    pub fn cancel_probe(&self, name: &str, address: &str) {
        if let Some((_, token)) = self.tasks.remove(&(name.to_string(), address.to_string())) {
            token.cancel();
        }
    }

    pub fn active_probe_count(&self) -> usize {
        self.tasks.len()
    }
}

impl ProbeCanceller for Supervisor {
    fn cancel_probe(&self, name: &str, address: &str) {
        Supervisor::cancel_probe(self, name, address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::{registration_bus, InMemoryStore};
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn startup_spawns_one_probe_per_existing_endpoint() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store.register("svc", "http://127.0.0.1:1").await.unwrap();
        store.register("svc", "http://127.0.0.1:2").await.unwrap();

        let (_tx, rx) = registration_bus(8);
        let cancel = CancellationToken::new();
        let sup = Arc::new(Supervisor::new(
            store,
            Prober::http(),
            3,
            StdDuration::from_millis(20),
            cancel.clone(),
        ));

        let handle = tokio::spawn(sup.clone().run(rx));
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        assert_eq!(sup.active_probe_count(), 2);

        cancel.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn new_registration_on_bus_spawns_a_probe_task() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let (tx, rx) = registration_bus(8);
        let cancel = CancellationToken::new();
        let sup = Arc::new(Supervisor::new(
            store.clone(),
            Prober::http(),
            3,
            StdDuration::from_millis(20),
            cancel.clone(),
        ));

        let handle = tokio::spawn(sup.clone().run(rx));
        store.register("svc", "http://127.0.0.1:1").await.unwrap();
        tx.publish("svc", "http://127.0.0.1:1");

        tokio::time::sleep(StdDuration::from_millis(10)).await;
        assert_eq!(sup.active_probe_count(), 1);

        cancel.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn operator_cancel_probe_removes_the_task_immediately() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store.register("svc", "http://127.0.0.1:1").await.unwrap();

        let (_tx, rx) = registration_bus(8);
        let cancel = CancellationToken::new();
        // Cooldown is long enough that a probe would never fire during
        // this test: the task must be torn down by cancel_probe alone,
        // not by racing a probe outcome.
        let sup = Arc::new(Supervisor::new(
            store,
            Prober::http(),
            3,
            StdDuration::from_secs(60),
            cancel.clone(),
        ));

        let handle = tokio::spawn(sup.clone().run(rx));
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        assert_eq!(sup.active_probe_count(), 1);

        let canceller: Arc<dyn ProbeCanceller> = sup.clone();
        canceller.cancel_probe("svc", "http://127.0.0.1:1");

        tokio::time::sleep(StdDuration::from_millis(10)).await;
        assert_eq!(sup.active_probe_count(), 0);

        cancel.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn endpoint_is_deactivated_then_deregistered_after_repeated_failures() {
        use httpmock::prelude::*;

        let server = MockServer::start();
        let failing = server.mock(|when, then| {
            when.method(GET).path("/health-check");
            then.status(500);
        });

        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store.register("svc", &server.base_url()).await.unwrap();

        let (_tx, rx) = registration_bus(8);
        let cancel = CancellationToken::new();
        let sup = Arc::new(Supervisor::new(
            store.clone(),
            Prober::http(),
            3,
            StdDuration::from_millis(20),
            cancel.clone(),
        ));

        let handle = tokio::spawn(sup.clone().run(rx));

        // First failed probe: still tracked, but marked inactive.
        wait_for_calls(&failing, 1).await;
        assert_eq!(sup.active_probe_count(), 1);
        let services = store.list_all().await.unwrap();
        assert!(services.contains(&("svc".to_string(), server.base_url())));

        // Two more failures reach max_retries: the task deregisters the
        // endpoint and tears itself down.
        tokio::time::timeout(StdDuration::from_secs(2), async {
            loop {
                if sup.active_probe_count() == 0 {
                    break;
                }
                tokio::time::sleep(StdDuration::from_millis(20)).await;
            }
        })
        .await
        .expect("probe task should evict the endpoint within the timeout");

        let services = store.list_all().await.unwrap();
        assert!(!services.contains(&("svc".to_string(), server.base_url())));
        assert_eq!(failing.calls(), 3);

        cancel.cancel();
        let _ = handle.await;
    }

    /// Polls a mock's call count until it reaches `n`, instead of
    /// guessing a sleep long enough to cover exactly `n` probe cycles.
    async fn wait_for_calls(mock: &httpmock::Mock<'_>, n: usize) {
        tokio::time::timeout(StdDuration::from_secs(2), async {
            while mock.calls() < n {
                tokio::time::sleep(StdDuration::from_millis(5)).await;
            }
        })
        .await
        .expect("mock should observe the expected number of calls in time");
    }

    #[tokio::test]
    async fn a_successful_probe_resets_the_failure_count() {
        use httpmock::prelude::*;

        let server = MockServer::start();
        let mut failing = server.mock(|when, then| {
            when.method(GET).path("/health-check");
            then.status(500);
        });

        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store.register("svc", &server.base_url()).await.unwrap();

        let (_tx, rx) = registration_bus(8);
        let cancel = CancellationToken::new();
        let sup = Arc::new(Supervisor::new(
            store.clone(),
            Prober::http(),
            3,
            StdDuration::from_millis(30),
            cancel.clone(),
        ));

        let handle = tokio::spawn(sup.clone().run(rx));

        // Two failures, one short of max_retries: still registered.
        wait_for_calls(&failing, 2).await;
        failing.delete();
        let services = store.list_all().await.unwrap();
        assert!(services.contains(&("svc".to_string(), server.base_url())));

        // A healthy probe resets the failure count back to zero.
        let mut healthy = server.mock(|when, then| {
            when.method(GET).path("/health-check");
            then.status(200);
        });
        wait_for_calls(&healthy, 1).await;
        healthy.delete();

        // Fail again: if the count had carried over from before the
        // recovery, one more failure here would hit max_retries and
        // evict the endpoint. It doesn't, because the count restarted
        // at zero on the healthy probe.
        let failing_again = server.mock(|when, then| {
            when.method(GET).path("/health-check");
            then.status(500);
        });
        wait_for_calls(&failing_again, 2).await;
        assert_eq!(sup.active_probe_count(), 1);
        let services = store.list_all().await.unwrap();
        assert!(services.contains(&("svc".to_string(), server.base_url())));

        cancel.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn cancelling_shuts_down_the_dispatcher() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let (_tx, rx) = registration_bus(8);
        let cancel = CancellationToken::new();
        let sup = Arc::new(Supervisor::new(
            store,
            Prober::http(),
            3,
            StdDuration::from_millis(20),
            cancel.clone(),
        ));

        let handle = tokio::spawn(sup.run(rx));
        cancel.cancel();
        tokio::time::timeout(StdDuration::from_millis(200), handle)
            .await
            .expect("dispatcher should exit promptly after cancellation")
            .unwrap();
    }
}
