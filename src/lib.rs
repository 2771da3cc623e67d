//! Play lifecycle and intervention engine: natural-language trading plays backed by a
//! single order, monitored tick by tick until a stop, target, timeout or completion.

pub mod adaptation;
pub mod broker;
pub mod clock;
pub mod completion;
pub mod config;
pub mod error;
pub mod executor;
pub mod feed;
pub mod intervention;
pub mod parser;
pub mod performance;
pub mod plan;
pub mod report;
pub mod risk;
pub mod state;
pub mod types;
pub mod utils;

pub use error::{PlayError, Result};
pub use executor::{AllPlaysSummary, MonitorOutcome, PlayExecutor, PlaySummary};
