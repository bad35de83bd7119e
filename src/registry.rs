//! Entity registry – tag assignment and deduplication.
//!
//! Every geometric entity created while registering blocks goes through the
//! registry. Points are deduplicated by quantized coordinates, curves by
//! their point chain (orientation-insensitively), loops and surfaces by
//! their constituents. Adjacent blocks therefore share tags and the
//! generated geometry is conformal.

use crate::model::{Arrangement, CoordinateSystem, CurveKind, Point, StructureSpec, Vec3};
use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Points closer than this (per axis) are considered the same point.
pub const POINT_TOLERANCE: f64 = 1e-8;

// ────────────────────────────────────────────────────────────────────────────
// Registered entities
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegPoint {
    pub tag: u32,
    pub coordinates: Vec3,
    pub mesh_size: Option<f64>,
    pub zone: Option<String>,
}

/// A registered curve. `point_tags` is the full chain: start corner,
/// interior points, end corner. Stored in canonical orientation (smaller
/// endpoint tag first); users that need the opposite direction reference the
/// curve with a negative sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegCurve {
    pub tag: u32,
    pub kind: CurveKind,
    pub point_tags: Vec<u32>,
    pub zone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegCurveLoop {
    pub tag: u32,
    /// Signed curve tags, in loop order.
    pub curves: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegSurface {
    pub tag: u32,
    pub curve_loop: u32,
    /// True when all loop curves are straight lines.
    pub plane: bool,
    pub zone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegSurfaceLoop {
    pub tag: u32,
    pub surfaces: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegVolume {
    pub tag: u32,
    /// Outer surface loop first, hole loops after.
    pub surface_loops: Vec<u32>,
    pub zone: String,
    /// Unregistered volumes stay in the tag space but are excluded from the
    /// generated script and from physical grouping.
    pub live: bool,
}

/// Transfinite corner points and triangle arrangement of a surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceStructure {
    pub corners: [u32; 4],
    pub arrangement: Arrangement,
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    pub points: Vec<RegPoint>,
    pub curves: Vec<RegCurve>,
    pub curve_loops: Vec<RegCurveLoop>,
    pub surfaces: Vec<RegSurface>,
    pub surface_loops: Vec<RegSurfaceLoop>,
    pub volumes: Vec<RegVolume>,

    /// Transfinite directives, keyed by entity tag.
    pub curve_structures: BTreeMap<u32, StructureSpec>,
    pub surface_structures: BTreeMap<u32, SurfaceStructure>,
    pub volume_structures: BTreeMap<u32, [u32; 8]>,
    /// Surfaces whose triangles are recombined into quadrangles.
    pub recombined_surfaces: BTreeSet<u32>,

    point_index: HashMap<String, u32>,
    curve_index: HashMap<String, u32>,
    curve_loop_index: HashMap<String, u32>,
    surface_index: HashMap<u32, u32>,
    surface_loop_index: HashMap<String, u32>,
}

fn quantize(coordinates: Vec3) -> String {
    let q = |x: f64| (x / POINT_TOLERANCE).round() as i64;
    format!(
        "{}|{}|{}",
        q(coordinates[0]),
        q(coordinates[1]),
        q(coordinates[2])
    )
}

fn join_tags(tags: &[u32]) -> String {
    tags.iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a point, deduplicating by quantized coordinates.
    ///
    /// The point must already be cartesian; a point still carrying another
    /// coordinate system means the transform pass was skipped.
    pub fn register_point(&mut self, point: &Point) -> Result<u32> {
        if point.coordinate_system != CoordinateSystem::Cartesian {
            bail!(
                "Point {:?} not converted to cartesian before registration",
                point.coordinates
            );
        }
        let key = quantize(point.coordinates);
        if let Some(&tag) = self.point_index.get(&key) {
            return Ok(tag);
        }
        let tag = self.points.len() as u32 + 1;
        self.points.push(RegPoint {
            tag,
            coordinates: point.coordinates,
            mesh_size: point.mesh_size,
            zone: point.zone.clone(),
        });
        self.point_index.insert(key, tag);
        Ok(tag)
    }

    /// Register a curve given its full point chain (start, interior…, end).
    ///
    /// Returns `(tag, sign)`: `sign` is -1 when an existing curve with the
    /// opposite orientation was reused.
    pub fn register_curve(
        &mut self,
        kind: CurveKind,
        point_tags: Vec<u32>,
        zone: Option<String>,
    ) -> Result<(u32, i32)> {
        if point_tags.len() < 2 {
            bail!("Curve needs at least two points, got {:?}", point_tags);
        }
        let reversed = point_tags[0] > point_tags[point_tags.len() - 1];
        let canonical: Vec<u32> = if reversed {
            // The arc center of a circle arc is orientation-independent and
            // stays in place; everything else reverses with the chain.
            if kind == CurveKind::CircleArc {
                let mut c = point_tags.clone();
                c.reverse();
                c
            } else {
                point_tags.iter().rev().copied().collect()
            }
        } else {
            point_tags.clone()
        };
        let key = format!("{:?}:{}", kind, join_tags(&canonical));
        if let Some(&tag) = self.curve_index.get(&key) {
            return Ok((tag, if reversed { -1 } else { 1 }));
        }
        let tag = self.curves.len() as u32 + 1;
        self.curves.push(RegCurve {
            tag,
            kind,
            point_tags: canonical,
            zone,
        });
        self.curve_index.insert(key, tag);
        Ok((tag, if reversed { -1 } else { 1 }))
    }

    /// Register a curve loop from signed curve tags, deduplicating by the
    /// set of curves regardless of start curve and winding.
    pub fn register_curve_loop(&mut self, curves: Vec<i32>) -> u32 {
        let mut abs: Vec<u32> = curves.iter().map(|c| c.unsigned_abs()).collect();
        abs.sort_unstable();
        let key = join_tags(&abs);
        if let Some(&tag) = self.curve_loop_index.get(&key) {
            return tag;
        }
        let tag = self.curve_loops.len() as u32 + 1;
        self.curve_loops.push(RegCurveLoop { tag, curves });
        self.curve_loop_index.insert(key, tag);
        tag
    }

    /// Register a surface bounded by one curve loop.
    pub fn register_surface(&mut self, curve_loop: u32, zone: Option<String>) -> u32 {
        if let Some(&tag) = self.surface_index.get(&curve_loop) {
            return tag;
        }
        let plane = self.curve_loops[curve_loop as usize - 1]
            .curves
            .iter()
            .all(|c| self.curves[c.unsigned_abs() as usize - 1].kind == CurveKind::Line);
        let tag = self.surfaces.len() as u32 + 1;
        self.surfaces.push(RegSurface {
            tag,
            curve_loop,
            plane,
            zone,
        });
        self.surface_index.insert(curve_loop, tag);
        tag
    }

    pub fn register_surface_loop(&mut self, surfaces: Vec<u32>) -> u32 {
        let mut sorted = surfaces.clone();
        sorted.sort_unstable();
        let key = join_tags(&sorted);
        if let Some(&tag) = self.surface_loop_index.get(&key) {
            return tag;
        }
        let tag = self.surface_loops.len() as u32 + 1;
        self.surface_loops.push(RegSurfaceLoop { tag, surfaces });
        self.surface_loop_index.insert(key, tag);
        tag
    }

    /// Volumes are never deduplicated; every registration creates a new tag.
    pub fn add_volume(&mut self, surface_loops: Vec<u32>, zone: String) -> u32 {
        let tag = self.volumes.len() as u32 + 1;
        self.volumes.push(RegVolume {
            tag,
            surface_loops,
            zone,
            live: true,
        });
        tag
    }

    /// Drop a volume from the output. Its surfaces stay registered so that
    /// neighbors remain valid.
    pub fn unregister_volume(&mut self, tag: u32) -> bool {
        match self.volumes.get_mut(tag as usize - 1) {
            Some(v) if v.live => {
                v.live = false;
                true
            }
            _ => false,
        }
    }

    // ── Structured meshing directives ──────────────────────────────────────

    /// Record a transfinite directive for a curve. Shared curves keep the
    /// first directive they were given.
    pub fn set_curve_structure(&mut self, tag: u32, spec: StructureSpec) {
        self.curve_structures.entry(tag).or_insert(spec);
    }

    pub fn set_surface_structure(&mut self, tag: u32, structure: SurfaceStructure) {
        self.surface_structures.entry(tag).or_insert(structure);
    }

    pub fn set_volume_structure(&mut self, tag: u32, corners: [u32; 8]) {
        self.volume_structures.entry(tag).or_insert(corners);
    }

    pub fn recombine_surface(&mut self, tag: u32) {
        self.recombined_surfaces.insert(tag);
    }

    pub fn recombine_all_surfaces(&mut self) {
        for s in &self.surfaces {
            self.recombined_surfaces.insert(s.tag);
        }
    }

    // ── Queries ────────────────────────────────────────────────────────────

    pub fn live_volumes(&self) -> impl Iterator<Item = &RegVolume> {
        self.volumes.iter().filter(|v| v.live)
    }

    /// Group live volume tags by zone name, in tag order.
    ///
    /// Every live volume lands in exactly one group; same-named zones from
    /// different block sub-trees merge into a single group.
    pub fn volumes_by_zone(&self) -> IndexMap<String, Vec<u32>> {
        let mut groups: IndexMap<String, Vec<u32>> = IndexMap::new();
        for v in self.live_volumes() {
            groups.entry(v.zone.clone()).or_default().push(v.tag);
        }
        groups
    }

    /// How many live volumes use each surface.
    pub fn surface_use_counts(&self) -> BTreeMap<u32, u32> {
        let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
        for v in self.live_volumes() {
            for &sl in &v.surface_loops {
                for &s in &self.surface_loops[sl as usize - 1].surfaces {
                    *counts.entry(s).or_default() += 1;
                }
            }
        }
        counts
    }

    /// Surfaces on the outer boundary: used by exactly one live volume.
    pub fn boundary_surfaces(&self) -> Vec<u32> {
        self.surface_use_counts()
            .into_iter()
            .filter_map(|(s, n)| (n == 1).then_some(s))
            .collect()
    }

    /// All point tags on a surface (loop curves' chains, deduplicated).
    pub fn surface_point_tags(&self, surface: u32) -> Vec<u32> {
        let mut tags = BTreeSet::new();
        let loop_tag = self.surfaces[surface as usize - 1].curve_loop;
        for c in &self.curve_loops[loop_tag as usize - 1].curves {
            for &p in &self.curves[c.unsigned_abs() as usize - 1].point_tags {
                tags.insert(p);
            }
        }
        tags.into_iter().collect()
    }

    fn surface_centroid(&self, surface: u32) -> Vec3 {
        let tags = self.surface_point_tags(surface);
        let mut c = [0.0; 3];
        for &t in &tags {
            let p = &self.points[t as usize - 1].coordinates;
            for i in 0..3 {
                c[i] += p[i];
            }
        }
        let n = tags.len().max(1) as f64;
        [c[0] / n, c[1] / n, c[2] / n]
    }

    /// Classify boundary surfaces into the six axis-aligned side groups
    /// (NX, X, NY, Y, NZ, Z) by comparing surface centroids against the
    /// bounding box of all boundary points.
    pub fn six_side_groups(&self) -> IndexMap<&'static str, Vec<u32>> {
        const SIDES: [&str; 6] = ["NX", "X", "NY", "Y", "NZ", "Z"];
        let mut groups: IndexMap<&'static str, Vec<u32>> =
            SIDES.iter().map(|&s| (s, Vec::new())).collect();
        let boundary = self.boundary_surfaces();
        if boundary.is_empty() {
            return groups;
        }
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for &s in &boundary {
            for &t in &self.surface_point_tags(s) {
                let p = self.points[t as usize - 1].coordinates;
                for i in 0..3 {
                    min[i] = min[i].min(p[i]);
                    max[i] = max[i].max(p[i]);
                }
            }
        }
        for &s in &boundary {
            let c = self.surface_centroid(s);
            // Distance from the centroid to each of the six box faces.
            let distances = [
                (c[0] - min[0]).abs(),
                (max[0] - c[0]).abs(),
                (c[1] - min[1]).abs(),
                (max[1] - c[1]).abs(),
                (c[2] - min[2]).abs(),
                (max[2] - c[2]).abs(),
            ];
            let side = distances
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap_or(0);
            groups[SIDES[side]].push(s);
        }
        groups
    }

    pub fn stats(&self) -> String {
        format!(
            "{} points, {} curves, {} surfaces, {} volumes ({} live)",
            self.points.len(),
            self.curves.len(),
            self.surfaces.len(),
            self.volumes.len(),
            self.live_volumes().count()
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Hole grouping
// ────────────────────────────────────────────────────────────────────────────

/// Group volumes that share surfaces into connected components and return,
/// per component, the surfaces used by exactly one volume of the component
/// (its outer boundary). Used to build the inner surface loops that cut
/// child volumes out of a parent volume.
pub fn volumes_groups_surfaces(volumes_surfaces: &[Vec<u32>]) -> Vec<Vec<u32>> {
    let n = volumes_surfaces.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        if parent[i] != i {
            let root = find(parent, parent[i]);
            parent[i] = root;
        }
        parent[i]
    }

    let mut surface_owner: HashMap<u32, usize> = HashMap::new();
    for (i, surfaces) in volumes_surfaces.iter().enumerate() {
        for &s in surfaces {
            match surface_owner.get(&s) {
                Some(&j) => {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    if ri != rj {
                        parent[ri] = rj;
                    }
                }
                None => {
                    surface_owner.insert(s, i);
                }
            }
        }
    }

    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        components.entry(root).or_default().push(i);
    }

    let mut groups = Vec::new();
    for (_, members) in components {
        let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
        for &m in &members {
            for &s in &volumes_surfaces[m] {
                *counts.entry(s).or_default() += 1;
            }
        }
        let boundary: Vec<u32> = counts
            .into_iter()
            .filter_map(|(s, c)| (c == 1).then_some(s))
            .collect();
        if !boundary.is_empty() {
            groups.push(boundary);
        }
    }
    groups
}
