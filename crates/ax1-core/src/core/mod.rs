//! # Core Module
//!
//! The stateless foundation of the library: assembly data models, pure physics kernels, and
//! file I/O.
//!
//! ## Architecture
//!
//! - **Assembly Representation** ([`models`]) - Zone mesh, materials and neutron flux
//! - **Physics Kernels** ([`physics`]) - S4 quadrature, equation of state, shell geometry and
//!   artificial viscosity
//! - **File I/O** ([`io`]) - Material libraries and CSV output
//!
//! Nothing here owns solver state. Iteration, convergence and step control live in
//! [`crate::engine`].

pub mod io;
pub mod models;
pub mod physics;
