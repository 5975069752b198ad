mod common;

use common::{assert_close, assert_vec_close};
use deferred_ngin::{
    cgmath::{InnerSpace, Vector3},
    config::TangentPolicy,
    data_structures::{
        model::{DeferredVertex, Triangle, Vertex, build_vertices, tangent_basis},
        shapes,
    },
    error::{RenderError, ResourceKind},
};

fn right_triangle(uvs: [[f32; 2]; 3]) -> [Vertex; 3] {
    let n = [0.0, 0.0, 1.0];
    [
        Vertex::new([0.0, 0.0, 0.0], n, uvs[0]),
        Vertex::new([1.0, 0.0, 0.0], n, uvs[1]),
        Vertex::new([0.0, 1.0, 0.0], n, uvs[2]),
    ]
}

#[test]
fn vertex_layout_is_fourteen_floats() {
    assert_eq!(std::mem::size_of::<DeferredVertex>(), 14 * 4);
}

#[test]
fn tangent_follows_u_and_bitangent_follows_v() {
    let [a, b, c] = right_triangle([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    let basis = tangent_basis(&a, &b, &c, TangentPolicy::Fallback);
    assert!(!basis.degenerate);
    assert_vec_close(basis.tangent, Vector3::unit_x());
    assert_vec_close(basis.bitangent, Vector3::unit_y());
}

#[test]
fn tangent_is_scaled_by_uv_density() {
    // u runs twice as fast along x, so the tangent halves
    let [a, b, c] = right_triangle([[0.0, 0.0], [2.0, 0.0], [0.0, 1.0]]);
    let basis = tangent_basis(&a, &b, &c, TangentPolicy::Fallback);
    assert_vec_close(basis.tangent, Vector3::new(0.5, 0.0, 0.0));
}

#[test]
fn degenerate_uvs_fall_back_to_an_orthonormal_basis() {
    let [a, b, c] = right_triangle([[0.5, 0.5]; 3]);
    let basis = tangent_basis(&a, &b, &c, TangentPolicy::Fallback);
    assert!(basis.degenerate);
    let normal = Vector3::unit_z();
    assert_close(basis.tangent.magnitude(), 1.0);
    assert_close(basis.bitangent.magnitude(), 1.0);
    assert_close(basis.tangent.dot(normal), 0.0);
    assert_close(basis.bitangent.dot(normal), 0.0);
    assert_close(basis.tangent.dot(basis.bitangent), 0.0);
}

#[test]
fn propagate_keeps_non_finite_values() {
    let [a, b, c] = right_triangle([[0.5, 0.5]; 3]);
    let basis = tangent_basis(&a, &b, &c, TangentPolicy::Propagate);
    assert!(basis.degenerate);
    assert!(!basis.tangent.x.is_finite() || !basis.tangent.y.is_finite());
}

#[test]
fn reject_names_the_offending_triangle() {
    let (mut vertices, triangles) = shapes::quad();
    vertices[3].uv = vertices[0].uv;
    vertices[2].uv = vertices[0].uv;
    let result = build_vertices(&vertices, &triangles, TangentPolicy::Reject);
    assert!(matches!(
        result,
        Err(RenderError::DegenerateGeometry { triangle: 0 })
    ));
}

#[test]
fn out_of_range_index_is_reported() {
    let (vertices, _) = shapes::quad();
    let result = build_vertices(&vertices, &[Triangle([0, 1, 9])], TangentPolicy::Fallback);
    match result {
        Err(RenderError::ResourceNotFound { kind, name }) => {
            assert_eq!(kind, ResourceKind::Vertex);
            assert_eq!(name, "9");
        }
        other => panic!("expected a missing vertex, got {other:?}"),
    }
}

#[test]
fn cube_expands_to_per_triangle_vertices() {
    let (vertices, triangles) = shapes::cube();
    assert_eq!(vertices.len(), 24);
    assert_eq!(triangles.len(), 12);

    let expanded = build_vertices(&vertices, &triangles, TangentPolicy::Reject)
        .expect("cube has no degenerate faces");
    assert_eq!(expanded.len(), 36);
    for v in &expanded {
        let n = Vector3::from(v.normal);
        let t = Vector3::from(v.tangent);
        let b = Vector3::from(v.bitangent);
        assert_close(n.dot(t), 0.0);
        assert_close(n.dot(b), 0.0);
        // u x v == n on every face
        assert_vec_close(t.cross(b).normalize(), n);
    }
}

#[test]
fn cube_winds_counter_clockwise_from_outside() {
    let (vertices, triangles) = shapes::cube();
    for Triangle([a, b, c]) in triangles {
        let p = |i: u32| Vector3::from(vertices[i as usize].position);
        let face = (p(b) - p(a)).cross(p(c) - p(a));
        let normal = Vector3::from(vertices[a as usize].normal);
        assert!(face.dot(normal) > 0.0);
    }
}

#[test]
fn triangles_sharing_an_edge_get_parallel_tangents() {
    let n = [0.0, 0.0, 1.0];
    let (quad, quad_triangles) = shapes::quad();
    // parallelogram with unit-square UVs, so u and v stay continuous across
    // the shared diagonal
    let sheared = vec![
        Vertex::new([0.0, 0.0, 0.0], n, [0.0, 0.0]),
        Vertex::new([2.0, 0.0, 0.0], n, [1.0, 0.0]),
        Vertex::new([3.0, 1.0, 0.0], n, [1.0, 1.0]),
        Vertex::new([1.0, 1.0, 0.0], n, [0.0, 1.0]),
    ];

    for vertices in [quad, sheared] {
        let [t0, t1] = [quad_triangles[0], quad_triangles[1]].map(|Triangle([a, b, c])| {
            let basis = tangent_basis(
                &vertices[a as usize],
                &vertices[b as usize],
                &vertices[c as usize],
                TangentPolicy::Fallback,
            );
            assert!(!basis.degenerate);
            basis.tangent
        });
        assert_vec_close(t0.normalize(), t1.normalize());
    }
}
