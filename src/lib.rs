pub mod client;
pub mod config;
pub mod derive;
pub mod error;
pub mod logging;
pub mod models;
pub mod poller;
pub mod render;
pub mod store;

pub use client::{DataClient, FleetSource};
pub use config::{Cli, Config};
pub use derive::Stats;
pub use error::{ConfigError, FetchError};
pub use models::{Device, LogEntry};
pub use poller::Poller;
pub use store::{Applied, FetchStatus, Store, ViewState};
