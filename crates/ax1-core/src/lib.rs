//! # AX-1 Core Library
//!
//! A library for coupled neutronics and hydrodynamics transients in a one-dimensional
//! spherical assembly, in the tradition of the AX-1 fast-reactor excursion code.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Passive data models (`ZoneState`, `Material`,
//!   `FluxField`, `Assembly`), pure physics kernels (S4 quadrature, equation of state,
//!   shell geometry, artificial viscosity) and I/O for material libraries and CSV output.
//!
//! - **[`engine`]: The Logic Core.** The stateful solver. It holds the S4 transport
//!   solver for k and α eigenvalues, the Lagrangian hydrodynamics substep, the stability and
//!   step-size controller, and the critical geometry search.
//!
//! - **[`workflows`]: The Public API.** Runs a complete transient from an initialised
//!   assembly and a validated configuration, streaming per-cycle records to an observer.

pub mod core;
pub mod engine;
pub mod workflows;
