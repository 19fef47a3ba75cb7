//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Whatever metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Structured logging via the tracing stack
//! - Connection ID flows through all lifecycle events
//! - Metrics are cheap (atomic increments through the metrics facade);
//!   exposition is the embedding application's concern

pub mod logging;
pub mod metrics;
