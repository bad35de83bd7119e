use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// GeoDoc – binary serialization wrapper
// ────────────────────────────────────────────────────────────────────────────

/// A fully built geometry scene (the registry after all blocks were
/// registered), wrapped for binary save/load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoDoc {
    pub registry: crate::registry::Registry,
}

impl GeoDoc {
    /// Save the GeoDoc to a binary file with magic bytes and versioning.
    pub fn save_to_binary<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        std::io::Write::write_all(&mut writer, b"BLOCKMESH")?;
        std::io::Write::write_all(&mut writer, &1u32.to_le_bytes())?;
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())?;
        Ok(())
    }

    /// Load a GeoDoc from a binary file, checking magic bytes and version.
    pub fn load_from_binary<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        let mut magic = [0u8; 9];
        std::io::Read::read_exact(&mut reader, &mut magic)?;
        if &magic != b"BLOCKMESH" {
            anyhow::bail!("Invalid magic bytes: expected 'BLOCKMESH'");
        }
        let mut version_bytes = [0u8; 4];
        std::io::Read::read_exact(&mut reader, &mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);
        if version != 1 {
            anyhow::bail!("Unsupported version: {}", version);
        }
        let doc: GeoDoc =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        Ok(doc)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Coordinates
// ────────────────────────────────────────────────────────────────────────────

pub type Vec3 = [f64; 3];

/// Coordinate system a point's raw coordinates are expressed in.
///
/// All points are converted to cartesian during the transform pass, before
/// registration. Angular components are stored in radians (input is parsed
/// from degrees).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSystem {
    Cartesian,
    /// `[r, phi, z]`
    Cylindrical,
    /// `[r, phi, theta]` – azimuth `phi`, polar angle `theta` from the Z axis.
    Spherical,
    /// Local block coordinates in `[-1, 1]^3`, interpolated trilinearly
    /// within the 8 corners of the parent block.
    Block,
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        CoordinateSystem::Cartesian
    }
}

impl CoordinateSystem {
    /// Convert the angular components of raw coordinates in this system
    /// from degrees to radians. Cartesian and block coordinates have none.
    pub fn deg2rad(&self, coordinates: &mut Vec3) {
        match self {
            CoordinateSystem::Cylindrical => coordinates[1] = coordinates[1].to_radians(),
            CoordinateSystem::Spherical => {
                coordinates[1] = coordinates[1].to_radians();
                coordinates[2] = coordinates[2].to_radians();
            }
            CoordinateSystem::Cartesian | CoordinateSystem::Block => {}
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Point / Curve
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub coordinates: Vec3,
    #[serde(default)]
    pub coordinate_system: CoordinateSystem,
    /// Characteristic mesh length attached to the point, if any.
    #[serde(default)]
    pub mesh_size: Option<f64>,
    #[serde(default)]
    pub zone: Option<String>,
}

impl Point {
    pub fn new(coordinates: Vec3) -> Self {
        Self {
            coordinates,
            coordinate_system: CoordinateSystem::Cartesian,
            mesh_size: None,
            zone: None,
        }
    }

    pub fn with_system(coordinates: Vec3, coordinate_system: CoordinateSystem) -> Self {
        Self {
            coordinates,
            coordinate_system,
            mesh_size: None,
            zone: None,
        }
    }
}

/// Kind of an edge curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// Straight line between the two corner points.
    Line,
    /// Circular arc; the single interior point is the arc center.
    CircleArc,
    /// Spline through the interior points.
    Spline,
}

impl Default for CurveKind {
    fn default() -> Self {
        CurveKind::Line
    }
}

/// An edge curve of a block. The two corner endpoints are implied by the
/// block connectivity; `points` holds only interior points (arc center,
/// spline knots).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curve {
    #[serde(default)]
    pub kind: CurveKind,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub zone: Option<String>,
}

impl Curve {
    pub fn line() -> Self {
        Self {
            kind: CurveKind::Line,
            points: Vec::new(),
            zone: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Structured meshing directives
// ────────────────────────────────────────────────────────────────────────────

/// Node distribution along a transfinite curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MeshGrading {
    /// Geometric progression with the given ratio.
    Progression,
    /// Nodes clustered towards (coef > 1) or away from (coef < 1) the middle.
    Bump,
}

/// Transfinite node count and grading for one curve direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StructureSpec {
    pub n_points: u32,
    pub grading: MeshGrading,
    pub coef: f64,
}

impl StructureSpec {
    pub fn progression(n_points: u32, coef: f64) -> Self {
        Self {
            n_points,
            grading: MeshGrading::Progression,
            coef,
        }
    }

    pub fn bump(n_points: u32, coef: f64) -> Self {
        Self {
            n_points,
            grading: MeshGrading::Bump,
            coef,
        }
    }
}

/// Triangle arrangement of a transfinite surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Arrangement {
    Left,
    Right,
}

impl Arrangement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arrangement::Left => "Left",
            Arrangement::Right => "Right",
        }
    }
}
