// Query battery and runtime discovery
pub mod specs;
pub mod status;
pub mod node_groups;

// Re-export commonly used items
pub use specs::{static_specs, FieldTarget, MetricSpec};
pub use status::InstanceStatus;
pub use node_groups::{discover, discovery_query, node_group_specs, SubMetric, SUB_METRICS};
