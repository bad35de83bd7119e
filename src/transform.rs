//! Point transforms and coordinate-system conversion.
//!
//! Blocks carry a chain of transforms that is applied to their corner points
//! and curve interior points during the transform pass, after the raw
//! coordinates have been converted to cartesian.

use crate::model::{CoordinateSystem, Point, Vec3};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// A rigid transform applied to points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum Transform {
    Translate {
        delta: Vec3,
    },
    /// Right-hand rotation by `angle` radians around the axis through
    /// `origin` along `direction`.
    Rotate {
        origin: Vec3,
        direction: Vec3,
        angle: f64,
    },
}

impl Transform {
    pub fn apply(&self, p: Vec3) -> Vec3 {
        match self {
            Transform::Translate { delta } => [p[0] + delta[0], p[1] + delta[1], p[2] + delta[2]],
            Transform::Rotate {
                origin,
                direction,
                angle,
            } => rotate(p, *origin, *direction, *angle),
        }
    }
}

/// Apply a transform chain left-to-right.
pub fn reduce_transforms(transforms: &[Transform], p: Vec3) -> Vec3 {
    transforms.iter().fold(p, |acc, t| t.apply(acc))
}

/// Rodrigues rotation of `p` around the axis through `origin` along `axis`.
fn rotate(p: Vec3, origin: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if norm == 0.0 {
        return p;
    }
    let k = [axis[0] / norm, axis[1] / norm, axis[2] / norm];
    let v = [p[0] - origin[0], p[1] - origin[1], p[2] - origin[2]];
    let (sin, cos) = angle.sin_cos();
    let cross = [
        k[1] * v[2] - k[2] * v[1],
        k[2] * v[0] - k[0] * v[2],
        k[0] * v[1] - k[1] * v[0],
    ];
    let dot = k[0] * v[0] + k[1] * v[1] + k[2] * v[2];
    let mut out = [0.0; 3];
    for i in 0..3 {
        out[i] = origin[i] + v[i] * cos + cross[i] * sin + k[i] * dot * (1.0 - cos);
    }
    out
}

/// Local coordinates of the 8 block corners, in the block corner order
/// (P0..P3 on the NZ plane, P4..P7 on the Z plane).
const CORNER_SIGNS: [[f64; 3]; 8] = [
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
];

/// Convert raw point coordinates to cartesian.
///
/// Block-local coordinates need the parent's 8 corner coordinates; a
/// block-local point without a parent is an error.
pub fn to_cartesian(
    coordinates: Vec3,
    system: CoordinateSystem,
    parent_corners: Option<&[Vec3; 8]>,
) -> Result<Vec3> {
    match system {
        CoordinateSystem::Cartesian => Ok(coordinates),
        CoordinateSystem::Cylindrical => {
            let [r, phi, z] = coordinates;
            Ok([r * phi.cos(), r * phi.sin(), z])
        }
        CoordinateSystem::Spherical => {
            let [r, phi, theta] = coordinates;
            Ok([
                r * theta.sin() * phi.cos(),
                r * theta.sin() * phi.sin(),
                r * theta.cos(),
            ])
        }
        CoordinateSystem::Block => {
            let Some(corners) = parent_corners else {
                bail!("The parent must exist with block coordinate system");
            };
            let [u, v, w] = coordinates;
            let mut out = [0.0; 3];
            for (corner, signs) in corners.iter().zip(CORNER_SIGNS.iter()) {
                let weight =
                    (1.0 + u * signs[0]) * (1.0 + v * signs[1]) * (1.0 + w * signs[2]) / 8.0;
                for i in 0..3 {
                    out[i] += weight * corner[i];
                }
            }
            Ok(out)
        }
    }
}

/// Convert a point to cartesian in place, then run the transform chain on it.
pub fn transform_point(
    point: &mut Point,
    transforms: &[Transform],
    parent_corners: Option<&[Vec3; 8]>,
) -> Result<()> {
    let cartesian = to_cartesian(point.coordinates, point.coordinate_system, parent_corners)?;
    point.coordinates = reduce_transforms(transforms, cartesian);
    point.coordinate_system = CoordinateSystem::Cartesian;
    Ok(())
}
