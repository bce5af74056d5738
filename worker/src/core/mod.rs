pub mod cancellation;
pub mod config;
pub mod constants;
pub mod logging;

pub use cancellation::CancellationSignal;
pub use config::{ConfigOverrides, Oauth2Config, WorkerConfig};
