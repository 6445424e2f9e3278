//! Observability for the publishing core
//!
//! - Structured JSON logging with explicit severities
//! - Typed lifecycle events
//! - Monotonic counter metrics

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::MetricsRegistry;
