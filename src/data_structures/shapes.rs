//! Unit primitives in the `(vertices, triangles)` form [`Mesh::new`] takes.
//!
//! [`Mesh::new`]: crate::data_structures::model::Mesh::new

use cgmath::Vector3;

use crate::data_structures::model::{Triangle, Vertex};

/// Axis-aligned cube of edge length 1 centred on the origin, wound
/// counter-clockwise when seen from outside. Each face maps the full UV square.
pub fn cube() -> (Vec<Vertex>, Vec<Triangle>) {
    // (normal, u axis, v axis) with u x v == normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut triangles = Vec::with_capacity(12);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        let (n, u, v) = (Vector3::from(normal), Vector3::from(u), Vector3::from(v));
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (n + u * su + v * sv) * 0.5;
            vertices.push(Vertex::new(
                p.into(),
                normal,
                [(su + 1.0) * 0.5, (sv + 1.0) * 0.5],
            ));
        }
        triangles.push(Triangle([base, base + 1, base + 2]));
        triangles.push(Triangle([base, base + 2, base + 3]));
    }
    (vertices, triangles)
}

/// Unit quad in the XY plane facing +Z.
pub fn quad() -> (Vec<Vertex>, Vec<Triangle>) {
    let normal = [0.0, 0.0, 1.0];
    let vertices = vec![
        Vertex::new([-0.5, -0.5, 0.0], normal, [0.0, 0.0]),
        Vertex::new([0.5, -0.5, 0.0], normal, [1.0, 0.0]),
        Vertex::new([0.5, 0.5, 0.0], normal, [1.0, 1.0]),
        Vertex::new([-0.5, 0.5, 0.0], normal, [0.0, 1.0]),
    ];
    (vertices, vec![Triangle([0, 1, 2]), Triangle([0, 2, 3])])
}
