mod common;

use common::assert_vec_close;
use deferred_ngin::{
    cgmath::{Deg, Matrix4, Quaternion, Rotation3, SquareMatrix, Vector3, Vector4},
    data_structures::{
        instance::{InstanceRaw, ModelInstance},
        scene::{MaterialId, MeshId},
    },
};

fn instance() -> ModelInstance {
    ModelInstance::new(MeshId(0), MaterialId(0))
}

#[test]
fn new_instance_has_identity_transform() {
    assert_eq!(instance().transform(), Matrix4::identity());
    assert_eq!(std::mem::size_of::<InstanceRaw>(), 64);
}

#[test]
fn transform_scales_then_rotates_then_translates() {
    let inst = instance()
        .with_position(Vector3::new(1.0, 2.0, 3.0))
        .with_rotation(Quaternion::from_angle_y(Deg(90.0)))
        .with_scale(Vector3::new(2.0, 2.0, 2.0));
    let p = inst.transform() * Vector4::new(1.0, 0.0, 0.0, 1.0);
    assert_vec_close(p.truncate(), Vector3::new(1.0, 2.0, 1.0));
}

#[test]
fn transform_is_cached_until_a_setter_runs() {
    let mut inst = instance();
    assert!(inst.is_dirty());
    inst.transform();
    inst.transform();
    assert_eq!(inst.rebuilds(), 1);
    assert!(!inst.is_dirty());

    inst.set_position(Vector3::new(0.0, 1.0, 0.0));
    assert!(inst.is_dirty());
    let moved = inst.transform() * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert_vec_close(moved.truncate(), Vector3::new(0.0, 1.0, 0.0));
    assert_eq!(inst.rebuilds(), 2);
}

#[test]
fn raw_matches_transform() {
    let inst = instance().with_position(Vector3::new(4.0, 5.0, 6.0));
    let raw = inst.to_raw();
    let expected: [[f32; 4]; 4] = inst.transform().into();
    assert_eq!(raw.model, expected);
    assert_eq!(raw.model[3], [4.0, 5.0, 6.0, 1.0]);
}

#[test]
fn changing_mesh_or_material_keeps_the_transform() {
    let mut inst = instance().with_position(Vector3::new(1.0, 0.0, 0.0));
    inst.transform();
    inst.set_mesh(MeshId(3));
    inst.set_material(MaterialId(2));
    assert_eq!(inst.mesh(), MeshId(3));
    assert_eq!(inst.material(), MaterialId(2));
    assert!(!inst.is_dirty());
}
