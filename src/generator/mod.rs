//! Script generator – turn a built registry into Gmsh input.
//!
//! This module provides:
//! - [`geo`] – Generate `.geo` script text from a [`crate::registry::Registry`].

pub mod geo;

pub use geo::{GeoOptions, generate_geo_script};
