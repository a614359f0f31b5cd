//! # Engine Module
//!
//! This module implements the stateful solver for the coupled neutronics and hydrodynamics
//! problem. The core models describe a snapshot of the assembly; the engine advances it.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Solver, hydrodynamics and step-control parameters with
//!   their historical defaults
//! - **State Tracking** ([`state`]) - Transport and control state carried between cycles
//! - **Diagnostics** ([`diagnostics`]) - Non-finite value reports and warning throttling
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-specific error types
//! - **Tasks** ([`tasks`]) - Transport solve, hydro substep, stability control and the
//!   critical geometry search
//!
//! Every task runs on the calling thread and receives its state by `&mut`; there are no
//! globals.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod progress;
pub mod state;
pub mod tasks;
