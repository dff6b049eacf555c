pub mod config;
pub mod logging;
pub mod signals;

pub use config::{AcceptReq, CheckerConfig, Config, Db, ServerConfig};
pub use signals::wait_for_shutdown;
