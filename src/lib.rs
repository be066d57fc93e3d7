//! Vatio - energy attribution for sampled CPU profiles
//!
//! This library attributes power measured by an external sensor to the
//! call-tree nodes of a CPU profile: it validates that the power series
//! covers the profile, aligns both onto one microsecond timeline, integrates
//! power over every sampling interval and reports self and inclusive energy
//! per node.

pub mod cli;
pub mod config;
pub mod coverage;
pub mod cpu_profile;
pub mod csv_output;
pub mod diagnostics;
pub mod energy_attribution;
pub mod error;
pub mod pipeline;
pub mod power_profile;
pub mod report;
pub mod sink;
pub mod source;
pub mod text_output;
pub mod timeline;

pub use error::{EngineError, Result};
pub use timeline::{Micros, TimeSpan};
