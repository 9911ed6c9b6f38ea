//! Submix graph
//!
//! Voices are mixed into submixes, submixes into their parents, and the
//! master submix produces the device output.

mod error;
mod graph;

pub use error::{SubmixError, SubmixResult};
pub use graph::{SubmixGraph, MASTER_SUBMIX_NAME};
