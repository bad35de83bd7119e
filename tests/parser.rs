use anyhow::Result;
use blockmesh::parser::{ContentSource, InputParser};
use blockmesh::registry::Registry;
use camino::Utf8Path;
use std::collections::HashMap;

struct MemSource {
    files: HashMap<String, String>,
}

impl MemSource {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl ContentSource for MemSource {
    fn read_to_string(&mut self, path: &Utf8Path) -> Result<String> {
        self.files
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("not found: {}", path))
    }

    fn exists(&mut self, path: &Utf8Path) -> bool {
        self.files.contains_key(path.as_str())
    }
}

#[test]
fn block_document_with_box_points_and_zone() {
    let input = r#"{
  "metadata": {"class_name": "Block"},
  "arguments": {"points": [2, 2, 2], "zone": "Environment"}
}"#;
    let source = MemSource::new(&[("input.json", input)]);
    let mut parser = InputParser::new("", source);
    let block = parser.parse_input_file("input.json").expect("parse");
    assert_eq!(block.volume_zone, "Environment");
    assert_eq!(block.points[0].coordinates, [1.0, 1.0, -1.0]);
    assert_eq!(block.points[6].coordinates, [-1.0, -1.0, 1.0]);
}

#[test]
fn included_child_is_resolved_and_placed() {
    let input = r#"{
  "metadata": {"class_name": "Block"},
  "arguments": {
    "points": [4, 4, 4],
    "zone": "Environment",
    "children": [{"include": "borehole", "transforms": [[1, 0, 0]]}]
  }
}"#;
    let borehole = r#"{
  "metadata": {"class_name": "Block"},
  "arguments": {"points": [1, 1, 2], "zone": "Borehole1"}
}"#;
    let source = MemSource::new(&[("input.json", input), ("borehole.json", borehole)]);
    let mut parser = InputParser::new("", source);
    let mut root = parser.parse_input_file("input.json").expect("parse");
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].volume_zone, "Borehole1");

    root.transform(&[], None).expect("transform");
    // The include placement transform shifts the child along X.
    assert_eq!(root.children[0].points[0].coordinates, [1.5, 0.5, -1.0]);

    let mut registry = Registry::new();
    root.register(&mut registry).expect("register");
    root.unregister(&mut registry);
    let groups = registry.volumes_by_zone();
    assert_eq!(groups["Borehole1"], vec![1]);
    assert_eq!(groups["Environment"], vec![2]);
    // The borehole is carved out of the environment volume.
    assert_eq!(registry.volumes[1].surface_loops.len(), 2);
}

#[test]
fn inline_children_build_recursively() {
    let input = r#"{
  "metadata": {"class_name": "Block"},
  "arguments": {
    "points": [4, 4, 4],
    "children": [
      {"metadata": {"class_name": "Block"}, "arguments": {"points": 1, "zone": "Core"}}
    ]
  }
}"#;
    let source = MemSource::new(&[("input.json", input)]);
    let mut parser = InputParser::new("", source);
    let root = parser.parse_input_file("input.json").expect("parse");
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].volume_zone, "Core");
}

#[test]
fn matrix_document_builds_a_grid() {
    let input = r#"{
  "metadata": {"class_name": "Matrix"},
  "arguments": {
    "points": [["value", 0, 1, 2], [0, 1], [0, 1]],
    "zone_map": ["A", "B"],
    "structure_map": [3, 0, 1.0],
    "quadrate_map": true
  }
}"#;
    let source = MemSource::new(&[("input.json", input)]);
    let mut parser = InputParser::new("", source);
    let root = parser.parse_input_file("input.json").expect("parse");
    assert!(!root.do_register);
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].volume_zone, "A");
    assert_eq!(root.children[1].volume_zone, "B");
    assert!(root.children.iter().all(|c| c.quadrate));
    assert!(root.children.iter().all(|c| c.structure.is_some()));
}

#[test]
fn layer_document_builds_a_stack() {
    let input = r#"{
  "metadata": {"class_name": "Layer"},
  "arguments": {
    "lx": 1,
    "ly": 1,
    "heights": ["increment", 0, 1, 1],
    "zone_map": ["Lower", "Upper"]
  }
}"#;
    let source = MemSource::new(&[("input.json", input)]);
    let mut parser = InputParser::new("", source);
    let root = parser.parse_input_file("input.json").expect("parse");
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].volume_zone, "Lower");
    assert_eq!(root.children[1].volume_zone, "Upper");
}

#[test]
fn unknown_class_name_is_rejected() {
    let input = r#"{"metadata": {"class_name": "Cone"}, "arguments": {}}"#;
    let source = MemSource::new(&[("input.json", input)]);
    let mut parser = InputParser::new("", source);
    let err = parser.parse_input_file("input.json").unwrap_err();
    assert!(err.to_string().contains("Unknown class name"), "{}", err);
}

#[test]
fn include_cycles_are_detected() {
    let a = r#"{
  "metadata": {"class_name": "Block"},
  "arguments": {"children": [{"include": "b"}]}
}"#;
    let b = r#"{
  "metadata": {"class_name": "Block"},
  "arguments": {"children": [{"include": "a"}]}
}"#;
    let source = MemSource::new(&[("a.json", a), ("b.json", b)]);
    let mut parser = InputParser::new("", source);
    let err = parser.parse_input_file("a.json").unwrap_err();
    assert!(err.to_string().contains("Include cycle"), "{}", err);
}

#[test]
fn missing_include_is_reported() {
    let input = r#"{
  "metadata": {"class_name": "Block"},
  "arguments": {"children": [{"include": "nowhere"}]}
}"#;
    let source = MemSource::new(&[("input.json", input)]);
    let mut parser = InputParser::new("", source);
    let err = parser.parse_input_file("input.json").unwrap_err();
    assert!(err.to_string().contains("nowhere"), "{}", err);
}

#[test]
fn explicit_corner_points_with_mesh_size() {
    let input = r#"{
  "metadata": {"class_name": "Block"},
  "arguments": {
    "points": [
      [1, 1, -1, 0.1], [-1, 1, -1, 0.1], [-1, -1, -1, 0.1], [1, -1, -1, 0.1],
      [1, 1, 1, 0.1], [-1, 1, 1, 0.1], [-1, -1, 1, 0.1], [1, -1, 1, 0.1]
    ]
  }
}"#;
    let source = MemSource::new(&[("input.json", input)]);
    let mut parser = InputParser::new("", source);
    let root = parser.parse_input_file("input.json").expect("parse");
    assert_eq!(root.points[0].mesh_size, Some(0.1));
}

#[test]
fn cylindrical_corners_convert_degrees() {
    let input = r#"{
  "metadata": {"class_name": "Block"},
  "arguments": {
    "points": [
      [2, 45, -1], [2, 135, -1], [1, 135, -1], [1, 45, -1],
      [2, 45, 1], [2, 135, 1], [1, 135, 1], [1, 45, 1],
      "cylindrical"
    ]
  }
}"#;
    let source = MemSource::new(&[("input.json", input)]);
    let mut parser = InputParser::new("", source);
    let mut root = parser.parse_input_file("input.json").expect("parse");
    assert_eq!(
        root.points[0].coordinate_system,
        blockmesh::model::CoordinateSystem::Cylindrical
    );
    assert!((root.points[0].coordinates[1] - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    root.transform(&[], None).expect("transform");
    let p0 = root.points[0].coordinates;
    let expected = 2.0 * std::f64::consts::FRAC_PI_4.cos();
    assert!((p0[0] - expected).abs() < 1e-12);
    assert!((p0[1] - expected).abs() < 1e-12);
}
