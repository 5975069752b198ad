mod common;

use common::assert_close;
use deferred_ngin::{
    cgmath::{Deg, Vector3},
    data_structures::light::{
        Attenuation, KIND_AMBIENT, KIND_DIRECTIONAL, KIND_NONE, KIND_POINT, KIND_SPOT, Light,
        LightBatch, LightRaw, MAX_LIGHTS, batch_count, pack_batches,
    },
};

#[test]
fn records_match_shader_layout() {
    assert_eq!(std::mem::size_of::<LightRaw>(), 80);
    assert_eq!(
        std::mem::size_of::<LightBatch>(),
        MAX_LIGHTS * 80 + 16 + 16
    );
}

#[test]
fn ambient_only_sets_colour() {
    let raw = Light::ambient([1.0, 0.5, 0.25], 0.1).to_raw();
    assert_eq!(raw.kind, KIND_AMBIENT);
    assert_eq!(raw.color, [1.0, 0.5, 0.25, 0.1]);
    assert_eq!(raw.position, [0.0; 4]);
    assert_eq!(raw.direction, [0.0; 4]);
    assert_eq!(raw.constant, 0.0);
}

#[test]
fn directional_direction_is_normalized() {
    let raw = Light::directional([1.0; 3], 1.0, Vector3::new(0.0, -3.0, 4.0)).to_raw();
    assert_eq!(raw.kind, KIND_DIRECTIONAL);
    assert_close(raw.direction[1], -0.6);
    assert_close(raw.direction[2], 0.8);
    assert_eq!(raw.direction[3], 0.0);
}

#[test]
fn point_uses_default_attenuation() {
    let raw = Light::point([1.0; 3], 2.0, Vector3::new(1.0, 2.0, 3.0)).to_raw();
    assert_eq!(raw.kind, KIND_POINT);
    assert_eq!(raw.position, [1.0, 2.0, 3.0, 1.0]);
    assert_eq!(
        (raw.constant, raw.linear, raw.quadratic),
        (1.0, 0.045, 0.0075)
    );
}

#[test]
fn spot_cutoffs_are_cosines() {
    let raw = Light::spot(
        [1.0; 3],
        1.0,
        Vector3::new(0.0, 5.0, 0.0),
        Vector3::new(0.0, -1.0, 0.0),
        Deg(12.5),
        Deg(17.5),
    )
    .to_raw();
    assert_eq!(raw.kind, KIND_SPOT);
    assert_close(raw.cutoff_inner, 12.5f32.to_radians().cos());
    assert_close(raw.cutoff_outer, 17.5f32.to_radians().cos());
    assert!(raw.cutoff_inner > raw.cutoff_outer);
}

#[test]
fn rewriting_a_record_clears_stale_fields() {
    let mut raw = Light::point([1.0; 3], 1.0, Vector3::new(9.0, 9.0, 9.0)).to_raw();
    Light::ambient([1.0; 3], 0.5).write_into(&mut raw);
    assert_eq!(raw.position, [0.0; 4]);
    assert_eq!(raw.quadratic, 0.0);
}

#[test]
fn attenuation_falls_off_with_distance() {
    let att = Attenuation::default();
    assert_close(att.factor(0.0), 1.0);
    assert_close(att.factor(10.0), 1.0 / (1.0 + 0.45 + 0.75));
}

#[test]
fn batches_split_in_order() {
    let lights: Vec<Light> = (0..1025)
        .map(|i| Light::ambient([1.0; 3], i as f32))
        .collect();
    let batches = pack_batches(&lights, Vector3::new(0.0, 0.0, 2.0), MAX_LIGHTS);
    assert_eq!(batches.len(), 3);
    assert_eq!(
        batches.iter().map(LightBatch::len).collect::<Vec<_>>(),
        vec![512, 512, 1]
    );
    assert_eq!(batches[1].lights()[0].color[3], 512.0);
    assert_eq!(batches[2].lights()[0].color[3], 1024.0);
    assert_eq!(batches[2].lights[1].kind, KIND_NONE);
    assert_eq!(batches[0].view_direction, [0.0, 0.0, 1.0, 0.0]);
}

#[test]
fn capacity_is_clamped() {
    let lights = vec![Light::ambient([1.0; 3], 1.0); 3];
    assert_eq!(pack_batches(&lights, Vector3::unit_z(), 0).len(), 3);
    assert_eq!(pack_batches(&lights, Vector3::unit_z(), 10_000).len(), 1);
    assert_eq!(batch_count(0, 16), 0);
    assert_eq!(batch_count(17, 16), 2);
    assert_eq!(batch_count(513, usize::MAX), 2);
}

#[test]
fn no_lights_means_no_batches() {
    assert!(pack_batches(&[], Vector3::unit_z(), 4).is_empty());
}
