use tokio::sync::mpsc;

/// A freshly registered (name, address) pair, announced to the health
/// supervisor.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub address: String,
}

/// The producing half of the registration bus. Publish is always
/// non-blocking: if the channel is full the pair is dropped and a
/// warning is logged. The supervisor's startup enumeration is the
/// backstop that eventually picks up anything lost this way.
#[derive(Clone)]
pub struct RegistrationBusTx {
    tx: mpsc::Sender<Registration>,
}

impl RegistrationBusTx {
    /// Publish a new registration without blocking. Never fails the
    /// caller: a full channel only produces a warning log line.
    pub fn publish(&self, name: &str, address: &str) {
        let reg = Registration {
            name: name.to_string(),
            address: address.to_string(),
        };
        if let Err(mpsc::error::TrySendError::Full(reg)) = self.tx.try_send(reg) {
            tracing::warn!(
                name = %reg.name,
                address = %reg.address,
                "registration bus full, dropping new-address event"
            );
        }
    }
}

/// The consuming half of the registration bus, owned by the
/// supervisor's dispatcher task.
pub struct RegistrationBusRx {
    rx: mpsc::Receiver<Registration>,
}

impl RegistrationBusRx {
    pub async fn recv(&mut self) -> Option<Registration> {
        self.rx.recv().await
    }
}

/// Construct a bounded registration bus with the given channel capacity.
pub fn registration_bus(capacity: usize) -> (RegistrationBusTx, RegistrationBusRx) {
    let (tx, rx) = mpsc::channel(capacity);
    (RegistrationBusTx { tx }, RegistrationBusRx { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let (tx, mut rx) = registration_bus(4);
        tx.publish("svc", "a1");

        let reg = rx.recv().await.unwrap();
        assert_eq!(reg.name, "svc");
        assert_eq!(reg.address, "a1");
    }

    #[tokio::test]
    async fn overflow_is_dropped_not_blocking() {
        let (tx, mut rx) = registration_bus(1);
        tx.publish("svc", "a1");
        // Channel is now full; this publish must not block and must be dropped.
        tx.publish("svc", "a2");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.address, "a1");
    }
}
