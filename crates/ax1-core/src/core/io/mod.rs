//! File formats consumed and produced by the library.
//!
//! - [`library`] - TOML material definitions (equation of state, heat capacity, cross sections)
//! - [`output`] - CSV time-series and spatial-profile writers

pub mod library;
pub mod output;
