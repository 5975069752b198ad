use deferred_ngin::{
    data_structures::texture::{SizeMemo, bottom_up},
    pipelines::geometry::{GBUFFER_BYTES_PER_SAMPLE, GBufferSlot},
    resources::texture::cube_face_names,
};

#[test]
fn first_size_always_allocates() {
    let memo = SizeMemo::default();
    assert!(memo.needs_resize(800, 600));
    assert_eq!(memo.size(), None);
}

#[test]
fn same_size_is_kept() {
    let mut memo = SizeMemo::default();
    memo.record(800, 600);
    assert!(!memo.needs_resize(800, 600));
    assert!(memo.needs_resize(800, 601));
    assert!(memo.needs_resize(600, 800));
}

#[test]
fn zero_extents_become_one() {
    let mut memo = SizeMemo::default();
    memo.record(0, 0);
    assert_eq!(memo.size(), Some((1, 1)));
    assert!(!memo.needs_resize(1, 0));

    memo.clear();
    assert!(memo.needs_resize(1, 1));
}

#[test]
fn gbuffer_fits_one_sample_budget() {
    let bytes: u32 = GBufferSlot::ALL
        .iter()
        .map(|slot| slot.format().target_pixel_byte_cost().unwrap_or(0))
        .sum();
    assert!(bytes <= GBUFFER_BYTES_PER_SAMPLE);
    assert_eq!(GBufferSlot::Position.format(), wgpu::TextureFormat::Rgba32Float);
    assert_eq!(GBufferSlot::Normal.format(), wgpu::TextureFormat::Rgba32Float);
    assert_eq!(GBufferSlot::Albedo.format(), wgpu::TextureFormat::Rgba8Unorm);
}

#[test]
fn gbuffer_slots_are_indexed_in_output_order() {
    for (i, slot) in GBufferSlot::ALL.iter().enumerate() {
        assert_eq!(slot.index(), i);
    }
}

#[test]
fn cube_faces_follow_layer_order() {
    assert_eq!(
        cube_face_names("skybox/", "jpg"),
        [
            "skybox/right.jpg",
            "skybox/left.jpg",
            "skybox/bottom.jpg",
            "skybox/top.jpg",
            "skybox/front.jpg",
            "skybox/back.jpg",
        ]
        .map(String::from)
    );
}

#[test]
fn faces_are_uploaded_bottom_row_first() {
    let top = image::Rgba([255, 0, 0, 255]);
    let bottom = image::Rgba([0, 0, 255, 255]);
    let mut face = image::RgbaImage::new(1, 2);
    face.put_pixel(0, 0, top);
    face.put_pixel(0, 1, bottom);

    let flipped = bottom_up(&face);
    assert_eq!(flipped.dimensions(), (1, 2));
    assert_eq!(*flipped.get_pixel(0, 0), bottom);
    assert_eq!(*flipped.get_pixel(0, 1), top);
}
