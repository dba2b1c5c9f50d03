//! Orchestration of the progress engine over a [`econ_db::ProgressStore`],
//! with env configuration, tracing setup and metrics counters.

pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod tracing;

pub use config::{Environment, ServiceConfig};
pub use error::{CommitError, ServiceError};
pub use service::{CommitReceipt, ProfileOverview, ProgressService, connect};
