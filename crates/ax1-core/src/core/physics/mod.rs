//! # Physics Kernels
//!
//! Stateless numerical building blocks shared by the transport and hydrodynamics engines.
//!
//! - [`quadrature`] - The five-component S4 angular set for spherical geometry
//! - [`eos`] - Linear equation of state and the quadratic specific-heat law
//! - [`geometry`] - Spherical shell areas and volumes
//! - [`viscosity`] - Von Neumann–Richtmyer artificial viscosity
//!
//! All functions here are pure and operate in the AX-1 unit system (μs, cm, g/cm³,
//! megabar, keV, 10¹² erg), in which the hydrodynamic equations need no conversion factors.

pub mod eos;
pub mod geometry;
pub mod quadrature;
pub mod viscosity;
