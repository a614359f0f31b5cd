//! # Assembly Models
//!
//! Passive data describing a spherically symmetric assembly and its neutron flux.
//!
//! - [`zone`] - The radial zone mesh with every hydrodynamic field ([`zone::ZoneState`])
//! - [`material`] - Equation of state, heat capacity and multigroup cross sections
//! - [`flux`] - Angular (S4 components per boundary) and scalar group flux
//! - [`assembly`] - Validated construction of a complete assembly from input tables
//!
//! These types carry no solver behaviour. The engines in [`crate::engine`] mutate them in
//! place, one owner at a time.

pub mod assembly;
pub mod flux;
pub mod material;
pub mod zone;
