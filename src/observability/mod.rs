//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine operations produce:
//!     → tracing events inside the client's span (structured fields)
//!     → metrics.rs (counters, histograms via the `metrics` facade)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, text or JSON), installed by the binary
//!     → any `metrics` recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a global subscriber or recorder
//! - Without a recorder, metric calls are no-ops

pub mod logging;
pub mod metrics;
