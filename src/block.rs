//! The basic building block of the geometry: a cuboid with 8 corner points,
//! 12 edge curves, 6 boundary surfaces and 1 volume.
//!
//! Corner numbering (Y up, Z towards the viewer):
//!
//! ```text
//! NZ plane:   P1 P0     Z plane:   P5 P4
//!             P2 P3                P6 P7
//! ```
//!
//! Curves run in the X, Y and Z directions by the right-hand rule; surfaces
//! are ordered NX, X, NY, Y, NZ, Z (N = negative direction). Blocks form a
//! tree: children are registered before their parent and cut holes into the
//! parent volume.

use crate::model::{Arrangement, Curve, Point, StructureSpec, Vec3};
use crate::registry::{Registry, SurfaceStructure, volumes_groups_surfaces};
use crate::transform::{Transform, transform_point};
use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Connectivity tables
// ────────────────────────────────────────────────────────────────────────────

/// (start, end) corner indices of the 12 edge curves: X1..X4, Y1..Y4, Z1..Z4.
pub const CURVES_POINTS: [[usize; 2]; 12] = [
    [1, 0],
    [5, 4],
    [6, 7],
    [2, 3],
    [3, 0],
    [2, 1],
    [6, 5],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Curve indices of each surface loop: NX, X, NY, Y, NZ, Z.
pub const SURFACES_CURVES: [[usize; 4]; 6] = [
    [5, 9, 6, 10],
    [4, 11, 7, 8],
    [10, 2, 11, 3],
    [0, 8, 1, 9],
    [0, 5, 3, 4],
    [7, 2, 6, 1],
];

/// Loop orientation of each curve within [`SURFACES_CURVES`].
pub const SURFACES_CURVES_SIGNS: [[i32; 4]; 6] = [
    [1, 1, -1, -1],
    [-1, 1, 1, -1],
    [1, 1, -1, -1],
    [1, 1, -1, -1],
    [-1, -1, 1, 1],
    [-1, -1, 1, 1],
];

/// Transfinite corner indices of each surface.
pub const SURFACES_POINTS: [[usize; 4]; 6] = [
    [1, 5, 6, 2],
    [0, 3, 7, 4],
    [3, 2, 6, 7],
    [0, 4, 5, 1],
    [0, 1, 2, 3],
    [4, 7, 6, 5],
];

pub const DEFAULT_SURFACE_ZONES: [&str; 6] = ["NX", "X", "NY", "Y", "NZ", "Z"];
pub const DEFAULT_VOLUME_ZONE: &str = "V";

// ────────────────────────────────────────────────────────────────────────────
// Structure type
// ────────────────────────────────────────────────────────────────────────────

/// Left/Right triangle arrangement of the X, Y and Z surface pairs of a
/// structured block, encoded as three letters.
///
/// The arrangement fixes the corner permutation handed to the transfinite
/// volume directive; only the four self-consistent combinations exist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StructureType {
    Lll,
    Rrl,
    Lrr,
    Rlr,
}

impl Default for StructureType {
    fn default() -> Self {
        StructureType::Lll
    }
}

impl StructureType {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "LLL" => Ok(StructureType::Lll),
            "RRL" => Ok(StructureType::Rrl),
            "LRR" => Ok(StructureType::Lrr),
            "RLR" => Ok(StructureType::Rlr),
            "RLL" | "LRL" | "LLR" | "RRR" => {
                bail!("Structure type {} has no consistent corner permutation", s)
            }
            other => bail!("Invalid structure type: {}", other),
        }
    }

    /// Per-surface arrangement in NX, X, NY, Y, NZ, Z order.
    pub fn arrangements(&self) -> [Arrangement; 6] {
        use Arrangement::*;
        match self {
            StructureType::Lll => [Left; 6],
            StructureType::Rrl => [Right, Right, Right, Right, Left, Left],
            StructureType::Lrr => [Left, Left, Right, Right, Right, Right],
            StructureType::Rlr => [Right, Right, Left, Left, Right, Right],
        }
    }

    /// Corner permutation for the transfinite volume directive.
    pub fn volume_points(&self) -> [usize; 8] {
        match self {
            StructureType::Lll => [0, 1, 2, 3, 4, 5, 6, 7],
            StructureType::Rrl => [2, 3, 0, 1, 6, 7, 4, 5],
            StructureType::Lrr => [1, 2, 3, 0, 5, 6, 7, 4],
            StructureType::Rlr => [3, 0, 1, 2, 7, 4, 5, 6],
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block
// ────────────────────────────────────────────────────────────────────────────

/// Default corners: the `[-1, 1]^3` cube in corner order.
pub fn default_points() -> Vec<Point> {
    [
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
    ]
    .into_iter()
    .map(Point::new)
    .collect()
}

/// Corners of an axis-aligned cuboid with side lengths `lx`, `ly`, `lz`
/// centered on the origin.
pub fn box_points(lx: f64, ly: f64, lz: f64) -> Vec<Point> {
    let (a, b, c) = (0.5 * lx, 0.5 * ly, 0.5 * lz);
    [
        [a, b, -c],
        [-a, b, -c],
        [-a, -b, -c],
        [a, -b, -c],
        [a, b, c],
        [-a, b, c],
        [-a, -b, c],
        [a, -b, c],
    ]
    .into_iter()
    .map(Point::new)
    .collect()
}

/// Construction parameters for [`Block::new`]. Empty collections fall back
/// to defaults (unit-ish cube corners, straight edges, side zone names).
#[derive(Debug, Clone)]
pub struct BlockParams {
    pub points: Vec<Point>,
    pub curves: Vec<Curve>,
    pub surface_zones: Vec<String>,
    pub volume_zone: String,
    pub do_register: bool,
    pub do_unregister: bool,
    pub transforms: Vec<Transform>,
    /// Transfinite spec per direction (X, Y, Z).
    pub structure: Option<[Option<StructureSpec>; 3]>,
    pub quadrate: bool,
    pub boolean_level: Option<i32>,
    pub structure_type: StructureType,
    pub children: Vec<Block>,
    pub children_transforms: Vec<Vec<Transform>>,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            curves: Vec::new(),
            surface_zones: DEFAULT_SURFACE_ZONES.map(String::from).to_vec(),
            volume_zone: DEFAULT_VOLUME_ZONE.to_string(),
            do_register: true,
            do_unregister: false,
            transforms: Vec::new(),
            structure: None,
            quadrate: false,
            boolean_level: None,
            structure_type: StructureType::default(),
            children: Vec::new(),
            children_transforms: Vec::new(),
        }
    }
}

/// Registry tags assigned to a block during registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRegistration {
    pub point_tags: [u32; 8],
    /// Signed: negative when the registry curve runs opposite to the block
    /// edge direction.
    pub curve_tags: [i32; 12],
    pub surface_tags: [u32; 6],
    pub outer_loop: u32,
    pub volume: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub points: Vec<Point>,
    pub curves: Vec<Curve>,
    pub surface_zones: Vec<String>,
    pub volume_zone: String,
    pub do_register: bool,
    pub do_unregister: bool,
    pub transforms: Vec<Transform>,
    pub structure: Option<[Option<StructureSpec>; 3]>,
    pub quadrate: bool,
    pub boolean_level: Option<i32>,
    pub structure_type: StructureType,
    pub children: Vec<Block>,
    pub children_transforms: Vec<Vec<Transform>>,
    pub registration: Option<BlockRegistration>,
}

impl Block {
    pub fn new(params: BlockParams) -> Result<Self> {
        let points = if params.points.is_empty() {
            default_points()
        } else {
            params.points
        };
        ensure!(points.len() == 8, "Block needs 8 corner points, got {}", points.len());
        let curves = if params.curves.is_empty() {
            (0..12).map(|_| Curve::line()).collect()
        } else {
            params.curves
        };
        ensure!(curves.len() == 12, "Block needs 12 curves, got {}", curves.len());
        ensure!(
            params.surface_zones.len() == 6,
            "Block needs 6 surface zones, got {}",
            params.surface_zones.len()
        );
        let mut children_transforms = params.children_transforms;
        ensure!(
            children_transforms.len() <= params.children.len(),
            "More children transform lists ({}) than children ({})",
            children_transforms.len(),
            params.children.len()
        );
        children_transforms.resize(params.children.len(), Vec::new());
        Ok(Self {
            points,
            curves,
            surface_zones: params.surface_zones,
            volume_zone: params.volume_zone,
            do_register: params.do_register,
            do_unregister: params.do_unregister,
            transforms: params.transforms,
            structure: params.structure,
            quadrate: params.quadrate,
            boolean_level: params.boolean_level,
            structure_type: params.structure_type,
            children: params.children,
            children_transforms,
            registration: None,
        })
    }

    pub fn add_child(&mut self, child: Block, transforms: Vec<Transform>) {
        self.children.push(child);
        self.children_transforms.push(transforms);
    }

    /// Walk the block tree depth-first, self before children.
    pub fn walk<'a, F: FnMut(&'a Block)>(&'a self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Number of blocks in this tree, including self.
    pub fn count_blocks(&self) -> usize {
        1 + self.children.iter().map(Block::count_blocks).sum::<usize>()
    }

    fn corner_snapshot(&self) -> [Vec3; 8] {
        let mut corners = [[0.0; 3]; 8];
        for (c, p) in corners.iter_mut().zip(self.points.iter()) {
            *c = p.coordinates;
        }
        corners
    }

    /// Apply the transform chain: children first (their per-child transforms,
    /// then this block's full chain), then this block's own points and curve
    /// interior points. `parent_corners` resolves block-local coordinates.
    pub fn transform(
        &mut self,
        inherited: &[Transform],
        parent_corners: Option<&[Vec3; 8]>,
    ) -> Result<()> {
        let full: Vec<Transform> = self
            .transforms
            .iter()
            .chain(inherited.iter())
            .cloned()
            .collect();
        let own_corners = self.corner_snapshot();
        let children_transforms = std::mem::take(&mut self.children_transforms);
        for (child, slot) in self.children.iter_mut().zip(children_transforms.iter()) {
            let mut chain = slot.clone();
            chain.extend(full.iter().cloned());
            child.transform(&chain, Some(&own_corners))?;
        }
        self.children_transforms = children_transforms;
        for p in &mut self.points {
            transform_point(p, &full, parent_corners)?;
        }
        for c in &mut self.curves {
            for p in &mut c.points {
                transform_point(p, &full, parent_corners)?;
            }
        }
        Ok(())
    }

    /// Registrations of all registered volumes in this subtree, descending
    /// through register-skipping roots (e.g. a grid root) but not into
    /// registered blocks' own children.
    fn registered_volume_surfaces(&self, out: &mut Vec<Vec<u32>>) {
        for child in &self.children {
            match &child.registration {
                Some(reg) if reg.volume.is_some() => out.push(reg.surface_tags.to_vec()),
                _ => child.registered_volume_surfaces(out),
            }
        }
    }

    /// Register this block tree: children first, then self.
    pub fn register(&mut self, registry: &mut Registry) -> Result<()> {
        for child in &mut self.children {
            child.register(registry)?;
        }
        if !self.do_register || self.registration.is_some() {
            return Ok(());
        }

        let mut point_tags = [0u32; 8];
        for (tag, p) in point_tags.iter_mut().zip(self.points.iter()) {
            *tag = registry.register_point(p)?;
        }

        let mut curve_tags = [0i32; 12];
        for i in 0..12 {
            let c = &self.curves[i];
            let mut chain = Vec::with_capacity(c.points.len() + 2);
            chain.push(point_tags[CURVES_POINTS[i][0]]);
            for p in &c.points {
                chain.push(registry.register_point(p)?);
            }
            chain.push(point_tags[CURVES_POINTS[i][1]]);
            let (tag, sign) = registry.register_curve(c.kind, chain, c.zone.clone())?;
            curve_tags[i] = tag as i32 * sign;
        }

        let mut surface_tags = [0u32; 6];
        for s in 0..6 {
            let signed: Vec<i32> = (0..4)
                .map(|j| curve_tags[SURFACES_CURVES[s][j]] * SURFACES_CURVES_SIGNS[s][j])
                .collect();
            let curve_loop = registry.register_curve_loop(signed);
            surface_tags[s] =
                registry.register_surface(curve_loop, Some(self.surface_zones[s].clone()));
        }

        let outer_loop = registry.register_surface_loop(surface_tags.to_vec());
        let mut loops = vec![outer_loop];
        let mut child_volumes = Vec::new();
        self.registered_volume_surfaces(&mut child_volumes);
        for group in volumes_groups_surfaces(&child_volumes) {
            loops.push(registry.register_surface_loop(group));
        }
        let volume = registry.add_volume(loops, self.volume_zone.clone());

        if let Some(directions) = &self.structure {
            for (i, tag) in curve_tags.iter().enumerate() {
                if let Some(spec) = directions[i / 4] {
                    registry.set_curve_structure(tag.unsigned_abs(), spec);
                }
            }
            let arrangements = self.structure_type.arrangements();
            for s in 0..6 {
                registry.set_surface_structure(
                    surface_tags[s],
                    SurfaceStructure {
                        corners: SURFACES_POINTS[s].map(|p| point_tags[p]),
                        arrangement: arrangements[s],
                    },
                );
            }
            let permutation = self.structure_type.volume_points();
            registry.set_volume_structure(volume, permutation.map(|p| point_tags[p]));
        }
        if self.quadrate {
            for &s in &surface_tags {
                registry.recombine_surface(s);
            }
        }

        self.registration = Some(BlockRegistration {
            point_tags,
            curve_tags,
            surface_tags,
            outer_loop,
            volume: Some(volume),
        });
        Ok(())
    }

    /// Unregister volumes marked `do_unregister`, children first.
    pub fn unregister(&mut self, registry: &mut Registry) {
        for child in &mut self.children {
            child.unregister(registry);
        }
        if !self.do_unregister {
            return;
        }
        if let Some(reg) = &self.registration {
            if let Some(volume) = reg.volume {
                registry.unregister_volume(volume);
            }
        }
    }
}
