//! Block-structured hexahedral geometry for Gmsh.
//!
//! This crate builds trees of cuboid blocks (`Block`, regular grids via
//! `Matrix`, layered stacks via `Layer`), deduplicates shared entities
//! through a registry, and generates Gmsh `.geo` scripts with named
//! physical groups for downstream boundary-condition tagging.
//!
//! The binary `blockmesh` reads a JSON input document and writes the
//! generated script.

pub mod block;
pub mod generator;
pub mod layer;
pub mod matrix;
pub mod model;
pub mod parser;
pub mod registry;
pub mod transform;
