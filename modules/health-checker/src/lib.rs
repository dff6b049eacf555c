//! Single-shot endpoint health probing. Two transports are supported;
//! the choice is made once at process startup and is the same for
//! every probed endpoint (see `accept-req` / `checker.req`).

use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A probe result: no detail beyond healthy/unhealthy crosses this
/// boundary, by design (§7: the prober never raises to the caller).
pub type Healthy = bool;

/// Polymorphic over transport, chosen at construction.
pub enum Prober {
    Http(HttpProber),
    Grpc(GrpcProber),
}

impl Prober {
    pub fn http() -> Self {
        Prober::Http(HttpProber::new())
    }

    pub fn grpc() -> Self {
        Prober::Grpc(GrpcProber::new())
    }

    pub async fn probe(&self, name: &str, address: &str) -> Healthy {
        match self {
            Prober::Http(p) => p.probe(address).await,
            Prober::Grpc(p) => p.probe(name, address).await,
        }
    }
}

pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .expect("reqwest client builds with default TLS backend");
        Self { client }
    }

    async fn probe(&self, address: &str) -> bool {
        let url = format!("{address}/health-check");
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::debug!(address, error = %e, "http probe failed");
                false
            }
        }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GrpcProber;

impl GrpcProber {
    pub fn new() -> Self {
        Self
    }

    async fn probe(&self, name: &str, address: &str) -> bool {
        let target = address
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let endpoint = match tonic::transport::Endpoint::from_shared(format!("http://{target}")) {
            Ok(ep) => ep.timeout(PROBE_TIMEOUT).connect_timeout(PROBE_TIMEOUT),
            Err(e) => {
                tracing::debug!(address, error = %e, "invalid grpc target");
                return false;
            }
        };

        let channel = match tokio::time::timeout(PROBE_TIMEOUT, endpoint.connect()).await {
            Ok(Ok(channel)) => channel,
            Ok(Err(e)) => {
                tracing::debug!(address, error = %e, "grpc probe failed to connect");
                return false;
            }
            Err(_) => {
                tracing::debug!(address, "grpc probe connect timed out");
                return false;
            }
        };

        let mut client = tonic_health::pb::health_client::HealthClient::new(channel);
        let req = tonic_health::pb::HealthCheckRequest {
            service: name.to_string(),
        };

        match tokio::time::timeout(PROBE_TIMEOUT, client.check(req)).await {
            Ok(Ok(resp)) => {
                resp.into_inner().status() == tonic_health::pb::health_check_response::ServingStatus::Serving
            }
            Ok(Err(e)) => {
                tracing::debug!(address, error = %e, "grpc health check failed");
                false
            }
            Err(_) => {
                tracing::debug!(address, "grpc health check timed out");
                false
            }
        }
    }
}

impl Default for GrpcProber {
    fn default() -> Self {
        Self::new()
    }
}
