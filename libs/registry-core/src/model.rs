use chrono::{DateTime, Utc};

/// A single registered service endpoint.
///
/// `created_at`/`updated_at` are only populated by the durable backend;
/// the in-memory backend leaves them `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub address: String,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            active: true,
            created_at: None,
            updated_at: None,
        }
    }
}
