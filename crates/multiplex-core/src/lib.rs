pub mod admission;
pub mod config;
pub mod error;
pub mod fanout;
pub mod models;
pub mod registry;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod traits;

#[cfg(test)]
mod testutil;

pub use config::ServiceConfig;
pub use error::AppError;
pub use models::{FetchResult, LinkSet, ResultSet};
pub use service::{JobEvent, JobReporter, JobService, PollOutcome, TracingJobReporter};
pub use traits::Fetcher;
