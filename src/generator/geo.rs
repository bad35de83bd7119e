//! Generate a Gmsh `.geo` script from a built registry.
//!
//! The output targets the built-in geometry kernel and is byte-stable for a
//! given input: entities are written in tag order, physical groups in zone
//! insertion order.

use crate::model::MeshGrading;
use crate::registry::Registry;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct GeoOptions {
    /// Name written into the script header.
    pub model_name: String,
    /// Emit one physical surface per boundary surface (`S0..Sn`) instead of
    /// the six side groups.
    pub all_boundaries: bool,
}

/// Format a coordinate or coefficient without trailing zeros.
fn fmt(x: f64) -> String {
    format!("{}", x)
}

fn join<T: ToString>(tags: impl IntoIterator<Item = T>) -> String {
    tags.into_iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate the `.geo` script text for a registry.
pub fn generate_geo_script(registry: &Registry, options: &GeoOptions) -> String {
    let mut out = String::with_capacity(4096);
    if options.model_name.is_empty() {
        out.push_str("// Generated by blockmesh\n");
    } else {
        out.push_str(&format!("// {} (generated by blockmesh)\n", options.model_name));
    }
    out.push_str("SetFactory(\"Built-in\");\n");

    // Points
    if !registry.points.is_empty() {
        out.push('\n');
    }
    for p in &registry.points {
        let [x, y, z] = p.coordinates;
        match p.mesh_size {
            Some(lc) => out.push_str(&format!(
                "Point({}) = {{{}, {}, {}, {}}};\n",
                p.tag,
                fmt(x),
                fmt(y),
                fmt(z),
                fmt(lc)
            )),
            None => out.push_str(&format!(
                "Point({}) = {{{}, {}, {}}};\n",
                p.tag,
                fmt(x),
                fmt(y),
                fmt(z)
            )),
        }
    }

    // Curves
    if !registry.curves.is_empty() {
        out.push('\n');
    }
    for c in &registry.curves {
        let keyword = match c.kind {
            crate::model::CurveKind::Line => "Line",
            crate::model::CurveKind::CircleArc => "Circle",
            crate::model::CurveKind::Spline => "Spline",
        };
        out.push_str(&format!(
            "{}({}) = {{{}}};\n",
            keyword,
            c.tag,
            join(c.point_tags.iter())
        ));
    }

    // Curve loops and surfaces
    if !registry.curve_loops.is_empty() {
        out.push('\n');
    }
    for cl in &registry.curve_loops {
        out.push_str(&format!(
            "Curve Loop({}) = {{{}}};\n",
            cl.tag,
            join(cl.curves.iter())
        ));
    }
    for s in &registry.surfaces {
        let keyword = if s.plane { "Plane Surface" } else { "Surface" };
        out.push_str(&format!("{}({}) = {{{}}};\n", keyword, s.tag, s.curve_loop));
    }

    // Surface loops and volumes
    if !registry.surface_loops.is_empty() {
        out.push('\n');
    }
    for sl in &registry.surface_loops {
        out.push_str(&format!(
            "Surface Loop({}) = {{{}}};\n",
            sl.tag,
            join(sl.surfaces.iter())
        ));
    }
    for v in registry.live_volumes() {
        out.push_str(&format!(
            "Volume({}) = {{{}}};\n",
            v.tag,
            join(v.surface_loops.iter())
        ));
    }

    // Structured meshing directives. Curves with identical specs share one
    // directive line.
    if !registry.curve_structures.is_empty() {
        out.push('\n');
        let mut grouped: BTreeMap<(u32, u8, u64), Vec<u32>> = BTreeMap::new();
        for (&tag, spec) in &registry.curve_structures {
            let grading = match spec.grading {
                MeshGrading::Progression => 0u8,
                MeshGrading::Bump => 1u8,
            };
            grouped
                .entry((spec.n_points, grading, spec.coef.to_bits()))
                .or_default()
                .push(tag);
        }
        for ((n_points, grading, coef_bits), tags) in grouped {
            let keyword = if grading == 0 { "Progression" } else { "Bump" };
            out.push_str(&format!(
                "Transfinite Curve {{{}}} = {} Using {} {};\n",
                join(tags),
                n_points,
                keyword,
                fmt(f64::from_bits(coef_bits))
            ));
        }
    }
    for (tag, structure) in &registry.surface_structures {
        out.push_str(&format!(
            "Transfinite Surface {{{}}} = {{{}}} {};\n",
            tag,
            join(structure.corners.iter()),
            structure.arrangement.as_str()
        ));
    }
    for (tag, corners) in &registry.volume_structures {
        out.push_str(&format!(
            "Transfinite Volume{{{}}} = {{{}}};\n",
            tag,
            join(corners.iter())
        ));
    }
    if !registry.recombined_surfaces.is_empty() {
        out.push_str(&format!(
            "Recombine Surface {{{}}};\n",
            join(registry.recombined_surfaces.iter())
        ));
    }

    // Physical groups: every live volume lands in exactly one zone group;
    // same-named zones merge across the whole tree.
    let volume_groups = registry.volumes_by_zone();
    if !volume_groups.is_empty() {
        out.push('\n');
    }
    for (zone, tags) in &volume_groups {
        out.push_str(&format!(
            "Physical Volume(\"{}\") = {{{}}};\n",
            zone,
            join(tags.iter())
        ));
    }
    if options.all_boundaries {
        for (i, s) in registry.boundary_surfaces().into_iter().enumerate() {
            out.push_str(&format!("Physical Surface(\"S{}\") = {{{}}};\n", i, s));
        }
    } else {
        for (side, tags) in registry.six_side_groups() {
            if !tags.is_empty() {
                out.push_str(&format!(
                    "Physical Surface(\"{}\") = {{{}}};\n",
                    side,
                    join(tags.iter())
                ));
            }
        }
    }

    out
}
