//! Layered half-space: a stack of slabs along Z over a rectangular
//! footprint.
//!
//! A layer is the simplest grid shape: one cell in X and Y, one cell (or
//! subdivided run of cells) per entry of the height row. Per-layer zones
//! and meshing maps are indexed by the height entries as given and follow
//! subdivision like matrix maps do.

use crate::block::Block;
use crate::matrix::{CoordinateRow, MapSpec, MatrixParams, RowItem};
use crate::model::{CoordinateSystem, StructureSpec};
use crate::transform::Transform;
use anyhow::Result;

/// Construction parameters for a layered block stack.
#[derive(Debug, Clone)]
pub struct LayerParams {
    /// Footprint side lengths, centered on the origin.
    pub lx: f64,
    pub ly: f64,
    /// Z coordinate row; layers stack bottom-up from `heights.start`.
    pub heights: CoordinateRow,
    pub transforms: Vec<Transform>,
    pub zone_map: MapSpec<Option<String>>,
    pub structure_map: MapSpec<Option<StructureSpec>>,
    pub quadrate_map: MapSpec<bool>,
    pub do_register_map: MapSpec<bool>,
}

impl Default for LayerParams {
    fn default() -> Self {
        Self {
            lx: 1.0,
            ly: 1.0,
            heights: CoordinateRow::increment(0.0, vec![RowItem::Coordinate(1.0)]),
            transforms: Vec::new(),
            zone_map: MapSpec::default(),
            structure_map: MapSpec::default(),
            quadrate_map: MapSpec::default(),
            do_register_map: MapSpec::Uniform(true),
        }
    }
}

impl LayerParams {
    pub fn build(self) -> Result<Block> {
        let rows = [
            CoordinateRow::value(-0.5 * self.lx, vec![RowItem::Coordinate(0.5 * self.lx)]),
            CoordinateRow::value(-0.5 * self.ly, vec![RowItem::Coordinate(0.5 * self.ly)]),
            self.heights,
        ];
        MatrixParams {
            rows,
            coordinate_system: CoordinateSystem::Cartesian,
            transforms: self.transforms,
            do_register_map: self.do_register_map,
            structure_map: self.structure_map,
            quadrate_map: self.quadrate_map,
            boolean_level_map: MapSpec::default(),
            zone_map: self.zone_map,
        }
        .build()
    }
}
