use blockmesh::matrix::{
    CoordinateRow, MapSpec, MatrixParams, RowItem, beta_graded_deltas,
};
use blockmesh::parser::helpers::{parse_grid_rows, parse_row};
use blockmesh::registry::Registry;
use serde_json::json;

#[test]
fn value_row_expands_planes_and_interval_map() {
    let row = CoordinateRow::value(
        0.0,
        vec![
            RowItem::Coordinate(1.0),
            RowItem::Split {
                coordinate: 2.0,
                n: 3,
            },
        ],
    );
    let (planes, items) = row.expand().expect("expand");
    assert_eq!(planes, vec![0.0, 1.0, 1.5, 2.0]);
    // First interval from item 0, the two subdivided ones from item 1.
    assert_eq!(items, vec![0, 1, 1]);
}

#[test]
fn increment_row_accumulates_deltas() {
    let row = CoordinateRow::increment(1.0, vec![RowItem::Coordinate(2.0), RowItem::Coordinate(3.0)]);
    let (planes, items) = row.expand().expect("expand");
    assert_eq!(planes, vec![1.0, 3.0, 6.0]);
    assert_eq!(items, vec![0, 1]);
}

#[test]
fn uniform_beta_grading_splits_evenly() {
    let deltas = beta_graded_deltas(1.0, 4, 1.0, 1.0).expect("deltas");
    assert_eq!(deltas.len(), 4);
    let sum: f64 = deltas.iter().sum();
    assert!((sum - 1.0).abs() < 1e-6);
    for d in &deltas {
        assert!((d - 0.25).abs() < 1e-2, "expected near-uniform widths, got {:?}", deltas);
    }
}

#[test]
fn skewed_beta_grading_grows_towards_the_end() {
    // Beta(2, 1) has density proportional to x: later intervals are wider.
    let deltas = beta_graded_deltas(1.0, 4, 2.0, 1.0).expect("deltas");
    assert!(deltas.windows(2).all(|w| w[0] < w[1]), "{:?}", deltas);
    let sum: f64 = deltas.iter().sum();
    assert!((sum - 1.0).abs() < 1e-6);
}

#[test]
fn graded_row_closes_the_span() {
    let row = CoordinateRow::value(
        0.0,
        vec![RowItem::Graded {
            coordinate: 10.0,
            n: 5,
            a: 1.0,
            b: 2.0,
        }],
    );
    let (planes, items) = row.expand().expect("expand");
    assert_eq!(planes.len(), 6);
    assert_eq!(items, vec![0; 5]);
    assert!((planes.last().unwrap() - 10.0).abs() < 1e-6);
    // Beta(1, 2) clusters towards the start.
    assert!(planes[1] - planes[0] > planes[5] - planes[4]);
}

#[test]
fn map_spec_reindexes_through_new_to_old() {
    let map = MapSpec::PerCell(vec!["a", "b"]);
    let resolved = map.resolve(&[0, 0, 1], 2).expect("resolve");
    assert_eq!(resolved, vec!["a", "a", "b"]);
    assert!(map.resolve(&[0, 0, 1], 3).is_err());
    let uniform = MapSpec::Uniform("x");
    assert_eq!(uniform.resolve(&[0, 1], 2).unwrap(), vec!["x", "x"]);
}

#[test]
fn row_parsing_accepts_kind_start_and_string_items() {
    let row = parse_row(&json!(["value", 0, 1, "2:3"])).expect("row");
    let (planes, _) = row.expand().expect("expand");
    assert_eq!(planes, vec![0.0, 1.0, 1.5, 2.0]);

    let row = parse_row(&json!(["increment", 0, "1:2:2:1"])).expect("graded row");
    let (planes, _) = row.expand().expect("expand");
    assert_eq!(planes.len(), 3);
    assert!((planes.last().unwrap() - 1.0).abs() < 1e-6);

    assert!(parse_row(&json!([])).is_err());
    assert!(parse_row(&json!(["value", 0, "1:2:3"])).is_err());
}

#[test]
fn grid_rows_take_an_optional_coordinate_system() {
    let (rows, system) = parse_grid_rows(&[
        json!(["value", 0, 1]),
        json!(["value", 0, 1]),
        json!(["value", 0, 1]),
        json!("cylindrical"),
    ])
    .expect("rows");
    assert_eq!(system, blockmesh::model::CoordinateSystem::Cylindrical);
    assert_eq!(rows[0].items.len(), 1);
    assert!(parse_grid_rows(&[json!(["value", 0, 1])]).is_err());
}

#[test]
fn matrix_builds_cells_in_x_fastest_order() {
    let params = MatrixParams {
        rows: [
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0), RowItem::Coordinate(2.0)]),
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
        ],
        zone_map: MapSpec::PerCell(vec![Some("Left".to_string()), Some("Right".to_string())]),
        ..MatrixParams::default()
    };
    let root = params.build().expect("build");
    assert!(!root.do_register);
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].volume_zone, "Left");
    assert_eq!(root.children[1].volume_zone, "Right");
    // Cell 0 spans x in [0, 1]: P0 is the (x1, y1, z0) corner.
    assert_eq!(root.children[0].points[0].coordinates, [1.0, 1.0, 0.0]);
    assert_eq!(root.children[0].points[2].coordinates, [0.0, 0.0, 0.0]);
    assert_eq!(root.children[0].points[4].coordinates, [1.0, 1.0, 1.0]);
    assert_eq!(root.children[1].points[2].coordinates, [1.0, 0.0, 0.0]);
}

#[test]
fn subdivided_cells_inherit_the_source_cell_properties() {
    let params = MatrixParams {
        rows: [
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
            CoordinateRow::value(
                0.0,
                vec![
                    RowItem::Split {
                        coordinate: 1.0,
                        n: 3,
                    },
                    RowItem::Coordinate(2.0),
                ],
            ),
        ],
        zone_map: MapSpec::PerCell(vec![Some("Lower".to_string()), Some("Upper".to_string())]),
        ..MatrixParams::default()
    };
    let root = params.build().expect("build");
    // The first input cell splits into two; the second stays whole.
    assert_eq!(root.children.len(), 3);
    let zones: Vec<_> = root.children.iter().map(|c| c.volume_zone.as_str()).collect();
    assert_eq!(zones, vec!["Lower", "Lower", "Upper"]);
}

#[test]
fn adjacent_matrix_cells_share_entities_when_registered() {
    let params = MatrixParams {
        rows: [
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0), RowItem::Coordinate(2.0)]),
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
        ],
        ..MatrixParams::default()
    };
    let mut root = params.build().expect("build");
    root.transform(&[], None).expect("transform");
    let mut registry = Registry::new();
    root.register(&mut registry).expect("register");
    assert_eq!(registry.points.len(), 12);
    assert_eq!(registry.curves.len(), 20);
    assert_eq!(registry.surfaces.len(), 11);
    assert_eq!(registry.volumes.len(), 2);
}

#[test]
fn cylindrical_grid_rows_are_given_in_degrees() {
    let params = MatrixParams {
        rows: [
            CoordinateRow::value(1.0, vec![RowItem::Coordinate(2.0)]),
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(90.0)]),
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
        ],
        coordinate_system: blockmesh::model::CoordinateSystem::Cylindrical,
        ..MatrixParams::default()
    };
    let mut root = params.build().expect("build");
    root.transform(&[], None).expect("transform");
    // P0 is the (r=2, phi=90 deg, z=0) corner.
    let p0 = root.children[0].points[0].coordinates;
    assert!(p0[0].abs() < 1e-12, "{:?}", p0);
    assert!((p0[1] - 2.0).abs() < 1e-12, "{:?}", p0);
    assert!(p0[2].abs() < 1e-12, "{:?}", p0);
}

#[test]
fn do_register_map_skips_cells() {
    let params = MatrixParams {
        rows: [
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0), RowItem::Coordinate(2.0)]),
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
            CoordinateRow::value(0.0, vec![RowItem::Coordinate(1.0)]),
        ],
        do_register_map: MapSpec::PerCell(vec![true, false]),
        ..MatrixParams::default()
    };
    let mut root = params.build().expect("build");
    root.transform(&[], None).expect("transform");
    let mut registry = Registry::new();
    root.register(&mut registry).expect("register");
    assert_eq!(registry.volumes.len(), 1);
    assert_eq!(registry.points.len(), 8);
}
