// Notification envelope, rendering and delivery
pub mod template;
pub mod render;
pub mod delivery;

// Re-export commonly used items
pub use template::{AlertTemplate, TemplateError};
pub use render::{payload_labels, render_message, ReportRenderer};
pub use delivery::{
    deliver_all, DeliveryError, DeliveryResponse, DeliverySink, DeliverySummary, WebhookSink,
};
