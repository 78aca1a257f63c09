// Public modules
pub mod types;
pub mod config;
pub mod formatting;
pub mod prometheus;
pub mod metrics;
pub mod collector;
pub mod report;
pub mod notification;
pub mod pipeline;

// Re-export commonly used items
pub use types::*;
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use formatting::format_value;
pub use prometheus::{PrometheusClient, QueryClient, QueryError, QueryResponse};
pub use metrics::*;
pub use collector::{fold_results, AggregationOutcome, AggregationStats, Aggregator, AggregatorSettings, Slot};
pub use report::{ClusterReport, FieldTable, ReportBook};
pub use notification::*;
pub use pipeline::{run_report, RunSummary};
