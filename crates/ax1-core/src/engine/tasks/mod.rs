//! Numerical tasks executed within a simulation cycle.
//!
//! Each submodule owns one stage of the coupled problem: the S4 sweep and the eigenvalue
//! iterations built on it, the Lagrangian hydrodynamics substep, the time-step controller
//! and the critical geometry search. Tasks mutate only the state they are handed and
//! report numerical failure through [`EngineError`](crate::engine::error::EngineError).

pub mod geometry_search;
pub mod hydro;
pub mod stability;
pub(crate) mod sweep;
pub mod transport;
