//! Metrics collection.
//!
//! # Metrics
//! - `socket_connections_accepted_total` (counter): connections accepted
//!   by the listening endpoint
//! - `socket_ownership_transfers_total` (counter): completed ownership
//!   handoffs
//! - `socket_instrumented_connects_total` (counter): connects made through
//!   the substitute variant
//! - `socket_accept_finalize_failures_total` (counter): accepted
//!   connections discarded because the fix-up step failed
//! - `socket_resource_release_failures_total` (counter): native release
//!   errors (non-fatal)
//!
//! # Design Decisions
//! - Low-overhead metric updates through the `metrics` facade
//! - Exposition is the embedding application's concern; no exporter here

use metrics::describe_counter;

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        "socket_connections_accepted_total",
        "Connections accepted by the listening endpoint"
    );
    describe_counter!(
        "socket_ownership_transfers_total",
        "Completed connection ownership transfers"
    );
    describe_counter!(
        "socket_instrumented_connects_total",
        "Connects made through the instrumented variant"
    );
    describe_counter!(
        "socket_accept_finalize_failures_total",
        "Accepted connections discarded because the accept fix-up failed"
    );
    describe_counter!(
        "socket_resource_release_failures_total",
        "Native resource release errors"
    );
}
