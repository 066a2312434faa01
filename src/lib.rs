//! Store-Ordering Probe
//!
//! Empirically measures whether two threads observe store ordering
//! consistently on the host hardware/compiler pair. A writer thread stores a
//! data value and then a flag, both relaxed; a reader thread spins on the
//! flag and checks whether the data store was already visible when the flag
//! was. Every violation is tallied and reported at the end of the run.
//!
//! # Modules
//!
//! - [`shared`] - Cache-line-aligned flag cell and data buffer
//! - [`harness`] - Worker loops, per-iteration rendezvous, probe report
//! - [`error`] - Fatal setup error types
//! - [`logging`] - tracing subscriber setup

pub mod error;
pub mod harness;
pub mod logging;
pub mod shared;

// Convenient re-exports at crate root
pub use error::HarnessError;
pub use harness::{DEFAULT_ITERS, ProbeReport, StoreOrderHarness};
pub use shared::{CACHELINE_SIZE, DATA_BUF_ALIGN, DataBuffer, FlagCell};
