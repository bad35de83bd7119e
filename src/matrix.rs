//! Regular grids of blocks.
//!
//! A matrix expands three coordinate rows (X, Y, Z) into a grid of child
//! blocks under a register-skipping root. Row items may subdivide an
//! interval evenly or grade it by a Beta-distribution CDF; per-cell property
//! maps are given in pre-subdivision indexing and re-indexed through the
//! new-to-old map produced by the expansion.

use crate::block::{Block, BlockParams, DEFAULT_VOLUME_ZONE};
use crate::model::{CoordinateSystem, Point, StructureSpec};
use crate::transform::Transform;
use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Coordinate rows
// ────────────────────────────────────────────────────────────────────────────

/// How row items are interpreted: absolute coordinates or deltas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Value,
    Increment,
}

/// One item of a coordinate row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowItem {
    /// A single grid plane at (or displaced by) `coordinate`.
    Coordinate(f64),
    /// `"c:n"` – n planes evenly spaced towards `coordinate`
    /// (n - 1 intervals).
    Split { coordinate: f64, n: u32 },
    /// `"c:n:a:b"` – n intervals towards `coordinate`, widths distributed by
    /// the CDF of a Beta(a, b) distribution.
    Graded { coordinate: f64, n: u32, a: f64, b: f64 },
}

/// A coordinate row: interpretation kind, start plane, items.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateRow {
    pub kind: RowKind,
    pub start: f64,
    pub items: Vec<RowItem>,
}

impl CoordinateRow {
    pub fn value(start: f64, items: Vec<RowItem>) -> Self {
        Self {
            kind: RowKind::Value,
            start,
            items,
        }
    }

    pub fn increment(start: f64, items: Vec<RowItem>) -> Self {
        Self {
            kind: RowKind::Increment,
            start,
            items,
        }
    }

    /// Expand the row into grid planes plus the map from new interval index
    /// to the item that produced it.
    pub fn expand(&self) -> Result<(Vec<f64>, Vec<usize>)> {
        ensure!(!self.items.is_empty(), "Empty coordinate row");
        let mut planes = vec![self.start];
        let mut interval_items = Vec::new();
        let mut cur = self.start;
        for (item_i, item) in self.items.iter().enumerate() {
            match *item {
                RowItem::Coordinate(c) => {
                    let dc = match self.kind {
                        RowKind::Value => c - cur,
                        RowKind::Increment => c,
                    };
                    cur += dc;
                    planes.push(cur);
                    interval_items.push(item_i);
                }
                RowItem::Split { coordinate, n } => {
                    ensure!(n >= 2, "Split item needs at least 2 planes, got {}", n);
                    let target = match self.kind {
                        RowKind::Value => coordinate,
                        RowKind::Increment => cur + coordinate,
                    };
                    let from = cur;
                    for k in 1..n {
                        let x = from + (target - from) * k as f64 / (n - 1) as f64;
                        planes.push(x);
                        interval_items.push(item_i);
                    }
                    cur = target;
                }
                RowItem::Graded { coordinate, n, a, b } => {
                    let dc = match self.kind {
                        RowKind::Value => coordinate - cur,
                        RowKind::Increment => coordinate,
                    };
                    let deltas = beta_graded_deltas(dc, n, a, b)
                        .with_context(|| format!("Graded row item {}", item_i))?;
                    for d in deltas {
                        cur += d;
                        planes.push(cur);
                        interval_items.push(item_i);
                    }
                }
            }
        }
        Ok((planes, interval_items))
    }
}

/// Subdivide a span `dc` into `n` interval widths distributed by the CDF of
/// a Beta(a, b) distribution, integrated numerically over 10 000
/// subintervals. The widths sum back to `dc`.
pub fn beta_graded_deltas(dc: f64, n: u32, a: f64, b: f64) -> Result<Vec<f64>> {
    const NT: usize = 10_000;
    ensure!(n >= 1, "Graded item needs at least 1 interval");
    ensure!(a > 0.0 && b > 0.0, "Beta parameters must be positive: a={}, b={}", a, b);
    let dt = 1.0 / (NT as f64 - 1.0);
    let mut total = 0.0;
    // Open interval: the integrand may be singular at 0 and 1.
    for i in 1..NT - 1 {
        let t = i as f64 * dt;
        total += t.powf(a - 1.0) * (1.0 - t).powf(b - 1.0) * dt;
    }
    let mut deltas = Vec::with_capacity(n as usize);
    let mut prev = 0.0;
    for i in 0..n {
        let u = (i + 1) as f64 / n as f64;
        let nu = (u * NT as f64).ceil() as usize;
        ensure!(nu >= 2, "Graded item too fine: n={}", n);
        let du = u / (nu as f64 - 1.0);
        let hi = if u == 1.0 { nu - 1 } else { nu };
        let mut partial = 0.0;
        for k in 1..hi {
            let x = k as f64 * du;
            partial += x.powf(a - 1.0) * (1.0 - x).powf(b - 1.0) * du;
        }
        let x = partial / total;
        deltas.push((x - prev) * dc);
        prev = x;
    }
    let sum: f64 = deltas.iter().sum();
    if (sum - dc).abs() > 1e-6 * dc.abs().max(1.0) {
        bail!("Graded widths {} do not close the span {}", sum, dc);
    }
    Ok(deltas)
}

// ────────────────────────────────────────────────────────────────────────────
// Per-cell maps
// ────────────────────────────────────────────────────────────────────────────

/// A per-cell property: a single value broadcast to every cell, or one value
/// per *pre-subdivision* cell, re-indexed to the expanded grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapSpec<T> {
    PerCell(Vec<T>),
    Uniform(T),
}

impl<T: Default> Default for MapSpec<T> {
    fn default() -> Self {
        MapSpec::Uniform(T::default())
    }
}

impl<T: Clone> MapSpec<T> {
    /// Resolve to one value per new cell. `new2old` maps new global cell
    /// indices to old ones; `old_cells` is the pre-subdivision cell count.
    pub fn resolve(&self, new2old: &[usize], old_cells: usize) -> Result<Vec<T>> {
        match self {
            MapSpec::Uniform(v) => Ok(vec![v.clone(); new2old.len()]),
            MapSpec::PerCell(values) => {
                ensure!(
                    values.len() == old_cells,
                    "Map covers {} cells, grid has {}",
                    values.len(),
                    old_cells
                );
                Ok(new2old.iter().map(|&old| values[old].clone()).collect())
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Matrix
// ────────────────────────────────────────────────────────────────────────────

/// Construction parameters for a grid of blocks.
#[derive(Debug, Clone)]
pub struct MatrixParams {
    /// X, Y and Z coordinate rows.
    pub rows: [CoordinateRow; 3],
    /// Coordinate system the grid corners are expressed in.
    pub coordinate_system: CoordinateSystem,
    pub transforms: Vec<Transform>,
    pub do_register_map: MapSpec<bool>,
    /// Transfinite spec applied to all three directions of a cell.
    pub structure_map: MapSpec<Option<StructureSpec>>,
    pub quadrate_map: MapSpec<bool>,
    pub boolean_level_map: MapSpec<Option<i32>>,
    pub zone_map: MapSpec<Option<String>>,
}

impl Default for MatrixParams {
    fn default() -> Self {
        Self {
            rows: [
                CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
                CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
                CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
            ],
            coordinate_system: CoordinateSystem::Cartesian,
            transforms: Vec::new(),
            do_register_map: MapSpec::Uniform(true),
            structure_map: MapSpec::default(),
            quadrate_map: MapSpec::default(),
            boolean_level_map: MapSpec::default(),
            zone_map: MapSpec::default(),
        }
    }
}

impl MatrixParams {
    /// Expand the grid into a block tree: a register-skipping root whose
    /// children are the cell blocks, in x-fastest global index order.
    pub fn build(self) -> Result<Block> {
        let (xs, x_items) = self.rows[0].expand().context("X row")?;
        let (ys, y_items) = self.rows[1].expand().context("Y row")?;
        let (zs, z_items) = self.rows[2].expand().context("Z row")?;
        let (nx, ny, nz) = (xs.len() - 1, ys.len() - 1, zs.len() - 1);
        let old_counts = (
            self.rows[0].items.len(),
            self.rows[1].items.len(),
            self.rows[2].items.len(),
        );
        let old_cells = old_counts.0 * old_counts.1 * old_counts.2;

        let mut new2old = Vec::with_capacity(nx * ny * nz);
        for zi in 0..nz {
            for yi in 0..ny {
                for xi in 0..nx {
                    let old =
                        (z_items[zi] * old_counts.1 + y_items[yi]) * old_counts.0 + x_items[xi];
                    new2old.push(old);
                }
            }
        }

        let do_register = self.do_register_map.resolve(&new2old, old_cells)?;
        let structure = self.structure_map.resolve(&new2old, old_cells)?;
        let quadrate = self.quadrate_map.resolve(&new2old, old_cells)?;
        let boolean_level = self.boolean_level_map.resolve(&new2old, old_cells)?;
        let zone = self.zone_map.resolve(&new2old, old_cells)?;

        log::debug!(
            "Matrix grid {}x{}x{} = {} cells (from {} input cells)",
            nx,
            ny,
            nz,
            nx * ny * nz,
            old_cells
        );

        let system = self.coordinate_system;
        let mut children = Vec::with_capacity(nx * ny * nz);
        for zi in 0..nz {
            let (z0, z1) = (zs[zi], zs[zi + 1]);
            for yi in 0..ny {
                let (y0, y1) = (ys[yi], ys[yi + 1]);
                for xi in 0..nx {
                    let (x0, x1) = (xs[xi], xs[xi + 1]);
                    let gi = (zi * ny + yi) * nx + xi;
                    let corners = [
                        [x1, y1, z0],
                        [x0, y1, z0],
                        [x0, y0, z0],
                        [x1, y0, z0],
                        [x1, y1, z1],
                        [x0, y1, z1],
                        [x0, y0, z1],
                        [x1, y0, z1],
                    ]
                    .into_iter()
                    .map(|mut c| {
                        system.deg2rad(&mut c);
                        Point::with_system(c, system)
                    })
                    .collect();
                    children.push(Block::new(BlockParams {
                        points: corners,
                        do_register: do_register[gi],
                        structure: structure[gi].map(|s| [Some(s); 3]),
                        quadrate: quadrate[gi],
                        boolean_level: boolean_level[gi],
                        volume_zone: zone[gi]
                            .clone()
                            .unwrap_or_else(|| DEFAULT_VOLUME_ZONE.to_string()),
                        ..BlockParams::default()
                    })?);
                }
            }
        }

        Block::new(BlockParams {
            do_register: false,
            transforms: self.transforms,
            children,
            ..BlockParams::default()
        })
    }
}
