//! # Workflows Module
//!
//! High-level entry points that tie the engine tasks together into complete runs.
//!
//! - **Transient simulation** ([`simulate`]) - The cycle loop of transport solve, hydro
//!   substeps and step control, with an optional critical geometry search beforehand
//! - **Energy deposition** ([`deposition`]) - Point-kinetics energy release per substep and
//!   its distribution over the zones
//!
//! Results leave a workflow through the [`simulate::CycleObserver`] trait and the returned
//! [`simulate::SimulationResult`]; workflows never write files themselves.

pub mod deposition;
pub mod simulate;
