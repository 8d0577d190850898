//! imagen-batch library crate.
//!
//! Exposes the Imagen job client and its configuration for the binary and
//! for integration testing.

pub mod config;
pub mod imagen;
