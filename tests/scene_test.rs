use deferred_ngin::{
    cgmath::Vector3,
    data_structures::{
        instance::ModelInstance,
        light::Light,
        material::Material,
        scene::{InstanceId, MaterialId, MeshId, Scene},
    },
};

fn scene_with(materials: &[usize]) -> Scene {
    let mut scene = Scene::new();
    let count = materials.iter().max().map_or(0, |m| m + 1);
    for _ in 0..count {
        scene.add_material(Material::new());
    }
    for &material in materials {
        scene.add_instance(ModelInstance::new(MeshId(0), MaterialId(material)));
    }
    scene
}

#[test]
fn groups_follow_first_use_and_keep_member_order() {
    // A B A C B
    let scene = scene_with(&[0, 1, 0, 2, 1]);
    let groups: Vec<(MaterialId, Vec<InstanceId>)> = scene
        .groups()
        .into_iter()
        .map(|g| (g.material, g.instances))
        .collect();
    assert_eq!(
        groups,
        vec![
            (MaterialId(0), vec![InstanceId(0), InstanceId(2)]),
            (MaterialId(1), vec![InstanceId(1), InstanceId(4)]),
            (MaterialId(2), vec![InstanceId(3)]),
        ]
    );
}

#[test]
fn empty_scene_has_no_groups() {
    assert!(Scene::new().groups().is_empty());
}

#[test]
fn materials_without_instances_form_no_group() {
    let mut scene = scene_with(&[1]);
    scene.add_material(Material::new());
    assert_eq!(scene.materials().count(), 3);
    assert_eq!(scene.groups().len(), 1);
}

#[test]
fn regrouping_after_material_change() {
    let mut scene = scene_with(&[0, 1]);
    scene
        .instance_mut(InstanceId(1))
        .expect("instance 1")
        .set_material(MaterialId(0));
    let groups = scene.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].instances, vec![InstanceId(0), InstanceId(1)]);
}

#[test]
fn lookups_out_of_range_are_none() {
    let scene = scene_with(&[0]);
    assert!(scene.material(MaterialId(5)).is_none());
    assert!(scene.instance(InstanceId(5)).is_none());
}

#[test]
fn lights_keep_insertion_order() {
    let mut scene = Scene::new();
    scene.add_light(Light::ambient([1.0; 3], 0.1));
    scene.add_light(Light::point([1.0; 3], 1.0, Vector3::new(0.0, 1.0, 0.0)));
    assert_eq!(scene.lights().len(), 2);
    assert!(matches!(scene.lights()[0], Light::Ambient { .. }));

    if let Light::Point { position, .. } = &mut scene.lights_mut()[1] {
        position.y = 3.0;
    }
    assert!(matches!(
        scene.lights()[1],
        Light::Point { position, .. } if position.y == 3.0
    ));
}
