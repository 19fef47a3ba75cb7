//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → conn.rs (state machine, accept fix-up, ownership handoff)
//!     → impls.rs (platform / instrumented variants)
//!     → Hand off to the application
//!
//! Connection States:
//!     Unconnected → Connected → Closed
//! ```
//!
//! # Design Decisions
//! - Exactly one implementation object owns a live resource at any time
//! - The native layer is a trait seam (native.rs) so the state machine is
//!   testable without touching real descriptors
//! - Bounded accept queue prevents resource exhaustion

pub mod conn;
pub mod impls;
pub mod listener;
pub mod native;
