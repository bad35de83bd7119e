//! Helper functions for parsing input document values (corner point specs,
//! coordinate rows, transforms, structure triples, include references).

use crate::matrix::{CoordinateRow, MapSpec, RowItem, RowKind};
use crate::model::{CoordinateSystem, Curve, CurveKind, MeshGrading, Point, StructureSpec};
use crate::transform::Transform;
use anyhow::{Result, anyhow, bail, ensure};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_json::Value;

// ────────────────────────────────────────────────────────────────────────────
// Coordinate systems and points
// ────────────────────────────────────────────────────────────────────────────

pub fn coordinate_system_from_name(name: &str) -> Result<CoordinateSystem> {
    match name {
        "cartesian" => Ok(CoordinateSystem::Cartesian),
        "cylindrical" => Ok(CoordinateSystem::Cylindrical),
        "spherical" => Ok(CoordinateSystem::Spherical),
        "block" => Ok(CoordinateSystem::Block),
        other => bail!("Unknown coordinate system: {}", other),
    }
}

fn point_from_numbers(numbers: &[f64], system: CoordinateSystem) -> Result<Point> {
    ensure!(
        numbers.len() == 3 || numbers.len() == 4,
        "Point needs 3 coordinates (plus optional mesh size), got {:?}",
        numbers
    );
    let mut coordinates = [numbers[0], numbers[1], numbers[2]];
    system.deg2rad(&mut coordinates);
    let mut point = Point::with_system(coordinates, system);
    point.mesh_size = numbers.get(3).copied();
    Ok(point)
}

fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn numbers_of(value: &Value) -> Option<Vec<f64>> {
    value
        .as_array()?
        .iter()
        .map(as_f64)
        .collect::<Option<Vec<f64>>>()
}

/// Parse the corner point specification of a block. Accepted forms:
///
/// - a number – cube side length;
/// - `[lx, ly, lz]` – box side lengths;
/// - `[l, "system"]` / `[lx, ly, lz, "system"]` – with a coordinate system;
/// - `[lx, ly, lz, mesh_size]` – with a characteristic length;
/// - 8 explicit `[x, y, z]` / `[x, y, z, mesh_size]` entries, with an
///   optional trailing coordinate system name.
pub fn parse_points_spec(value: &Value) -> Result<Vec<Point>> {
    if let Some(side) = value.as_f64() {
        return Ok(crate::block::box_points(side, side, side));
    }
    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("Invalid points spec: {}", value))?;
    // Compact forms: a flat list of numbers with an optional trailing name.
    let trailing_name = entries.last().and_then(|v| v.as_str());
    let flat: Option<Vec<f64>> = entries
        .iter()
        .take(entries.len() - trailing_name.is_some() as usize)
        .map(as_f64)
        .collect();
    if let Some(numbers) = flat {
        let system = match trailing_name {
            Some(name) => coordinate_system_from_name(name)?,
            None => CoordinateSystem::Cartesian,
        };
        let (mut points, mesh_size) = match numbers.len() {
            1 => (crate::block::box_points(numbers[0], numbers[0], numbers[0]), None),
            3 => (crate::block::box_points(numbers[0], numbers[1], numbers[2]), None),
            4 if trailing_name.is_none() => (
                crate::block::box_points(numbers[0], numbers[1], numbers[2]),
                Some(numbers[3]),
            ),
            _ => bail!("Invalid points spec: {}", value),
        };
        for p in &mut points {
            p.coordinate_system = system;
            p.mesh_size = mesh_size;
            system.deg2rad(&mut p.coordinates);
        }
        return Ok(points);
    }
    // Explicit corner form.
    let system = match trailing_name {
        Some(name) => coordinate_system_from_name(name)?,
        None => CoordinateSystem::Cartesian,
    };
    let corner_entries = &entries[..entries.len() - trailing_name.is_some() as usize];
    ensure!(
        corner_entries.len() == 8,
        "Block needs 8 corner points, got {}",
        corner_entries.len()
    );
    corner_entries
        .iter()
        .map(|entry| {
            let numbers = numbers_of(entry)
                .ok_or_else(|| anyhow!("Invalid corner point entry: {}", entry))?;
            point_from_numbers(&numbers, system)
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Coordinate rows
// ────────────────────────────────────────────────────────────────────────────

/// Parse a `"c:n"` or `"c:n:a:b"` row item.
pub fn parse_row_item_str(s: &str) -> Result<RowItem> {
    let parts: Vec<&str> = s.split(':').collect();
    let coordinate: f64 = parts[0]
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid row item coordinate: {}", s))?;
    match parts.len() {
        2 => {
            let n: u32 = parts[1]
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid row item count: {}", s))?;
            Ok(RowItem::Split { coordinate, n })
        }
        4 => {
            let n: u32 = parts[1]
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid row item count: {}", s))?;
            let a: f64 = parts[2]
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid grading parameter: {}", s))?;
            let b: f64 = parts[3]
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid grading parameter: {}", s))?;
            Ok(RowItem::Graded { coordinate, n, a, b })
        }
        _ => bail!("Invalid row item: {}", s),
    }
}

/// Parse one coordinate row: `[("value"|"increment")?, (start)?, items…]`.
/// A missing kind defaults to `value`, a missing start to `0`.
pub fn parse_row(value: &Value) -> Result<CoordinateRow> {
    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("Coordinate row must be an array: {}", value))?;
    let mut index = 0;
    let kind = match entries.first().and_then(|v| v.as_str()) {
        Some("value") => {
            index += 1;
            RowKind::Value
        }
        Some("increment") => {
            index += 1;
            RowKind::Increment
        }
        // A leading string that is not a row kind is a row item.
        _ => RowKind::Value,
    };
    let start = match entries.get(index).and_then(as_f64) {
        Some(s) if index < entries.len() => {
            index += 1;
            s
        }
        _ => 0.0,
    };
    let mut items = Vec::new();
    for entry in &entries[index..] {
        if let Some(c) = entry.as_f64() {
            items.push(RowItem::Coordinate(c));
        } else if let Some(s) = entry.as_str() {
            items.push(parse_row_item_str(s)?);
        } else {
            bail!("Invalid row item: {}", entry);
        }
    }
    ensure!(!items.is_empty(), "Coordinate row has no items: {}", value);
    Ok(CoordinateRow { kind, start, items })
}

/// Parse a grid `points` argument: three coordinate rows plus an optional
/// coordinate system name row.
pub fn parse_grid_rows(values: &[Value]) -> Result<([CoordinateRow; 3], CoordinateSystem)> {
    let mut rows = Vec::new();
    let mut system = CoordinateSystem::Cartesian;
    for value in values {
        if let Some(name) = value.as_str() {
            system = coordinate_system_from_name(name)?;
        } else {
            rows.push(parse_row(value)?);
        }
    }
    let [x, y, z]: [CoordinateRow; 3] = rows
        .try_into()
        .map_err(|rows: Vec<CoordinateRow>| {
            anyhow!(
                "Grid needs exactly 3 coordinate rows (X, Y, Z), got {}",
                rows.len()
            )
        })?;
    Ok(([x, y, z], system))
}

// ────────────────────────────────────────────────────────────────────────────
// Transforms
// ────────────────────────────────────────────────────────────────────────────

/// Raw transform entry from input: a shorthand number list or a named form.
///
/// Shorthands: 3 numbers translate, 4 numbers rotate around the origin
/// (direction + angle), 7 numbers rotate (origin + direction + angle).
/// Angles are degrees.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransformSpec {
    Shorthand(Vec<f64>),
    Named(NamedTransformSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum NamedTransformSpec {
    Translate {
        delta: [f64; 3],
    },
    Rotate {
        #[serde(default)]
        origin: [f64; 3],
        direction: [f64; 3],
        angle: f64,
    },
}

pub fn parse_transforms(specs: &[TransformSpec]) -> Result<Vec<Transform>> {
    specs
        .iter()
        .map(|spec| match spec {
            TransformSpec::Shorthand(numbers) => match numbers.len() {
                3 => Ok(Transform::Translate {
                    delta: [numbers[0], numbers[1], numbers[2]],
                }),
                4 => Ok(Transform::Rotate {
                    origin: [0.0; 3],
                    direction: [numbers[0], numbers[1], numbers[2]],
                    angle: numbers[3].to_radians(),
                }),
                7 => Ok(Transform::Rotate {
                    origin: [numbers[0], numbers[1], numbers[2]],
                    direction: [numbers[3], numbers[4], numbers[5]],
                    angle: numbers[6].to_radians(),
                }),
                n => bail!("Transform shorthand needs 3, 4 or 7 numbers, got {}", n),
            },
            TransformSpec::Named(NamedTransformSpec::Translate { delta }) => {
                Ok(Transform::Translate { delta: *delta })
            }
            TransformSpec::Named(NamedTransformSpec::Rotate {
                origin,
                direction,
                angle,
            }) => Ok(Transform::Rotate {
                origin: *origin,
                direction: *direction,
                angle: angle.to_radians(),
            }),
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Curves
// ────────────────────────────────────────────────────────────────────────────

/// Raw curve entry: a bare kind name or a full form with interior points.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CurveArg {
    Name(String),
    Full(CurveFull),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurveFull {
    #[serde(default)]
    pub kind: CurveKind,
    #[serde(default)]
    pub points: Vec<Vec<f64>>,
    #[serde(default)]
    pub coordinate_system: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
}

fn curve_kind_from_name(name: &str) -> Result<CurveKind> {
    match name {
        "line" => Ok(CurveKind::Line),
        "circle_arc" => Ok(CurveKind::CircleArc),
        "spline" => Ok(CurveKind::Spline),
        other => bail!("Unknown curve kind: {}", other),
    }
}

pub fn parse_curves(args: &[CurveArg]) -> Result<Vec<Curve>> {
    args.iter()
        .map(|arg| match arg {
            CurveArg::Name(name) => Ok(Curve {
                kind: curve_kind_from_name(name)?,
                points: Vec::new(),
                zone: None,
            }),
            CurveArg::Full(full) => {
                let system = match &full.coordinate_system {
                    Some(name) => coordinate_system_from_name(name)?,
                    None => CoordinateSystem::Cartesian,
                };
                let points = full
                    .points
                    .iter()
                    .map(|numbers| point_from_numbers(numbers, system))
                    .collect::<Result<Vec<Point>>>()?;
                Ok(Curve {
                    kind: full.kind,
                    points,
                    zone: full.zone.clone(),
                })
            }
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Structure triples
// ────────────────────────────────────────────────────────────────────────────

fn grading_from_value(value: &Value) -> Result<MeshGrading> {
    if let Some(n) = value.as_u64() {
        return match n {
            0 => Ok(MeshGrading::Progression),
            1 => Ok(MeshGrading::Bump),
            other => bail!("Unknown mesh grading: {}", other),
        };
    }
    match value.as_str() {
        Some("progression") => Ok(MeshGrading::Progression),
        Some("bump") => Ok(MeshGrading::Bump),
        _ => bail!("Unknown mesh grading: {}", value),
    }
}

/// Parse a `[n_points, grading, coef]` structure triple.
pub fn parse_structure_triple(value: &Value) -> Result<StructureSpec> {
    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("Invalid structure triple: {}", value))?;
    ensure!(
        entries.len() == 3,
        "Structure triple needs [n_points, grading, coef], got {}",
        value
    );
    let n_points = entries[0]
        .as_u64()
        .ok_or_else(|| anyhow!("Invalid structure node count: {}", entries[0]))?
        as u32;
    ensure!(n_points >= 2, "Structure needs at least 2 nodes, got {}", n_points);
    let grading = grading_from_value(&entries[1])?;
    let coef = entries[2]
        .as_f64()
        .ok_or_else(|| anyhow!("Invalid structure coefficient: {}", entries[2]))?;
    Ok(StructureSpec {
        n_points,
        grading,
        coef,
    })
}

fn is_flat_triple(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|a| a.iter().all(|v| !v.is_array() && !v.is_null()))
}

/// Parse a block `structure` argument: a single triple applied to all three
/// directions, or one entry (triple or null) per direction.
pub fn parse_structure_arg(value: &Value) -> Result<[Option<StructureSpec>; 3]> {
    if is_flat_triple(value) {
        let spec = parse_structure_triple(value)?;
        return Ok([Some(spec); 3]);
    }
    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("Invalid structure argument: {}", value))?;
    ensure!(
        entries.len() == 3,
        "Per-direction structure needs 3 entries, got {}",
        entries.len()
    );
    let mut directions = [None; 3];
    for (direction, entry) in directions.iter_mut().zip(entries.iter()) {
        if !entry.is_null() {
            *direction = Some(parse_structure_triple(entry)?);
        }
    }
    Ok(directions)
}

/// Parse a grid structure map: null, one triple for every cell, or one
/// entry (triple or null) per pre-subdivision cell.
pub fn parse_structure_map(value: &Value) -> Result<MapSpec<Option<StructureSpec>>> {
    if value.is_null() {
        return Ok(MapSpec::Uniform(None));
    }
    if is_flat_triple(value) {
        return Ok(MapSpec::Uniform(Some(parse_structure_triple(value)?)));
    }
    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("Invalid structure map: {}", value))?;
    let cells = entries
        .iter()
        .map(|entry| {
            if entry.is_null() {
                Ok(None)
            } else {
                parse_structure_triple(entry).map(Some)
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(MapSpec::PerCell(cells))
}

// ────────────────────────────────────────────────────────────────────────────
// Includes
// ────────────────────────────────────────────────────────────────────────────

/// Resolve an include reference like `"borehole"` to a full JSON path.
pub fn resolve_include_reference(reference: &str, base_dir: &Utf8Path) -> Utf8PathBuf {
    let mut candidate = Utf8PathBuf::from(reference);
    if !candidate.extension().is_some_and(|e| e == "json") {
        candidate.set_extension("json");
    }
    if candidate.is_absolute() {
        candidate
    } else {
        base_dir.join(candidate)
    }
}
