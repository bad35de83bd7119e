use blockmesh::block::{Block, BlockParams, box_points};
use blockmesh::model::{CoordinateSystem, Point};
use blockmesh::parser::parse_transforms;
use blockmesh::parser::helpers::TransformSpec;
use blockmesh::transform::{Transform, reduce_transforms, to_cartesian};

fn close(a: [f64; 3], b: [f64; 3]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-12)
}

#[test]
fn translate_and_rotate() {
    let t = Transform::Translate {
        delta: [1.0, 2.0, 3.0],
    };
    assert!(close(t.apply([0.0; 3]), [1.0, 2.0, 3.0]));

    let r = Transform::Rotate {
        origin: [0.0; 3],
        direction: [0.0, 0.0, 1.0],
        angle: std::f64::consts::FRAC_PI_2,
    };
    assert!(close(r.apply([1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]));

    // Rotation about a displaced axis.
    let r = Transform::Rotate {
        origin: [1.0, 0.0, 0.0],
        direction: [0.0, 0.0, 1.0],
        angle: std::f64::consts::PI,
    };
    assert!(close(r.apply([2.0, 0.0, 0.0]), [0.0, 0.0, 0.0]));
}

#[test]
fn chains_apply_left_to_right() {
    let chain = vec![
        Transform::Translate {
            delta: [1.0, 0.0, 0.0],
        },
        Transform::Rotate {
            origin: [0.0; 3],
            direction: [0.0, 0.0, 1.0],
            angle: std::f64::consts::FRAC_PI_2,
        },
    ];
    // Translate first, then rotate: [0,0,0] -> [1,0,0] -> [0,1,0].
    assert!(close(reduce_transforms(&chain, [0.0; 3]), [0.0, 1.0, 0.0]));
}

#[test]
fn cylindrical_and_spherical_to_cartesian() {
    let c = to_cartesian(
        [2.0, std::f64::consts::FRAC_PI_2, 3.0],
        CoordinateSystem::Cylindrical,
        None,
    )
    .unwrap();
    assert!(c[0].abs() < 1e-12);
    assert!((c[1] - 2.0).abs() < 1e-12);
    assert!((c[2] - 3.0).abs() < 1e-12);

    let s = to_cartesian(
        [1.0, 0.0, std::f64::consts::FRAC_PI_2],
        CoordinateSystem::Spherical,
        None,
    )
    .unwrap();
    assert!((s[0] - 1.0).abs() < 1e-12 && s[1].abs() < 1e-12 && s[2].abs() < 1e-12);
}

#[test]
fn block_coordinates_interpolate_within_parent_corners() {
    let corners: [[f64; 3]; 8] = [
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
    ];
    let center = to_cartesian([0.0; 3], CoordinateSystem::Block, Some(&corners)).unwrap();
    assert!(close(center, [0.0; 3]));
    let corner = to_cartesian([1.0, 1.0, -1.0], CoordinateSystem::Block, Some(&corners)).unwrap();
    assert!(close(corner, [1.0, 1.0, -1.0]));
    // Halfway towards P0 on the NZ plane.
    let mid = to_cartesian([0.5, 0.5, -1.0], CoordinateSystem::Block, Some(&corners)).unwrap();
    assert!(close(mid, [0.5, 0.5, -1.0]));
}

#[test]
fn block_coordinates_without_parent_fail() {
    assert!(to_cartesian([0.0; 3], CoordinateSystem::Block, None).is_err());
}

#[test]
fn child_in_block_coordinates_resolves_against_parent() {
    let child_points: Vec<Point> = [
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
    ]
    .into_iter()
    .map(|c| Point::with_system(c, CoordinateSystem::Block))
    .collect();
    let child = Block::new(BlockParams {
        points: child_points,
        ..BlockParams::default()
    })
    .expect("child");
    // Parent spans [-2, 2]^3, so child local ±0.5 maps to cartesian ±1.
    let mut parent = Block::new(BlockParams {
        points: box_points(4.0, 4.0, 4.0),
        children: vec![child],
        ..BlockParams::default()
    })
    .expect("parent");
    parent.transform(&[], None).expect("transform");
    let p0 = parent.children[0].points[0].coordinates;
    assert!(close(p0, [1.0, 1.0, -1.0]));
    assert_eq!(
        parent.children[0].points[0].coordinate_system,
        CoordinateSystem::Cartesian
    );
}

#[test]
fn per_child_transforms_compose_with_parent_chain() {
    let child = Block::new(BlockParams::default()).expect("child");
    let mut parent = Block::new(BlockParams {
        transforms: vec![Transform::Translate {
            delta: [0.0, 0.0, 10.0],
        }],
        children: vec![child],
        children_transforms: vec![vec![Transform::Translate {
            delta: [5.0, 0.0, 0.0],
        }]],
        ..BlockParams::default()
    })
    .expect("parent");
    parent.transform(&[], None).expect("transform");
    // Child P0 starts at [1,1,-1]: slot transform shifts x by 5, the
    // parent chain lifts z by 10.
    assert!(close(parent.children[0].points[0].coordinates, [6.0, 1.0, 9.0]));
    assert!(close(parent.points[0].coordinates, [1.0, 1.0, 9.0]));
}

#[test]
fn shorthand_specs_parse_with_degrees() {
    let specs: Vec<TransformSpec> = serde_json::from_value(serde_json::json!([
        [1, 2, 3],
        [0, 0, 1, 90],
        [1, 0, 0, 0, 0, 1, 180],
        {"name": "rotate", "direction": [0, 0, 1], "angle": 90}
    ]))
    .expect("specs");
    let transforms = parse_transforms(&specs).expect("parse");
    assert_eq!(transforms.len(), 4);
    match &transforms[1] {
        Transform::Rotate { origin, angle, .. } => {
            assert!(close(*origin, [0.0; 3]));
            assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        }
        other => panic!("expected rotation, got {:?}", other),
    }
    match &transforms[2] {
        Transform::Rotate { origin, angle, .. } => {
            assert!(close(*origin, [1.0, 0.0, 0.0]));
            assert!((angle - std::f64::consts::PI).abs() < 1e-12);
        }
        other => panic!("expected rotation, got {:?}", other),
    }
    let bad: Vec<TransformSpec> =
        serde_json::from_value(serde_json::json!([[1, 2]])).expect("specs");
    assert!(parse_transforms(&bad).is_err());
}
