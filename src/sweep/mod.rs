//! Sweep protocol parsing and session management
//!
//! This module provides:
//! - Wire-line classification for the analyzer's `;`-delimited protocol
//! - Frame assembly (coarse/fine sample sequences plus peak annotations)
//! - A polling session that buffers lines until the end-of-sweep sentinel

pub mod frame;
pub mod protocol;
pub mod session;

pub use frame::{PeakAnnotations, SweepFrame};
pub use protocol::{Sample, SweepLine};
pub use session::{SweepSession, TickOutcome};
