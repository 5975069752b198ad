mod common;

use common::{assert_close, assert_vec_close};
use deferred_ngin::{
    camera::{Camera, CameraController, FAR_PLANE, InputState, PERSPECTIVE_NEAR, Projection},
    cgmath::{Deg, InnerSpace, Point3, Vector3, Vector4},
};
use winit::{event::MouseButton, keyboard::KeyCode};

#[test]
fn default_camera_looks_down_negative_z() {
    let mut camera = Camera::default();
    camera.update((800, 600));

    assert_vec_close(camera.forward(), Vector3::new(0.0, 0.0, -1.0));
    assert_vec_close(camera.right(), Vector3::new(1.0, 0.0, 0.0));
    assert_eq!(camera.size(), (800, 600));
    assert_eq!(camera.projection, Projection::Perspective { fovy: Deg(90.0) });
}

#[test]
fn derived_values_only_change_on_update() {
    let mut camera = Camera::default();
    camera.update((100, 100));
    let before = camera.view();

    camera.position = Point3::new(5.0, 0.0, 0.0);
    assert_eq!(camera.view(), before);

    camera.update((100, 100));
    assert_ne!(camera.view(), before);
}

#[test]
fn view_moves_camera_to_origin() {
    let mut camera = Camera::new((1.0, 2.0, 3.0), Deg(-90.0), Deg(0.0));
    camera.update((64, 64));
    let eye = camera.view() * Vector4::new(1.0, 2.0, 3.0, 1.0);
    assert_close(eye.x, 0.0);
    assert_close(eye.y, 0.0);
    assert_close(eye.z, 0.0);
}

#[test]
fn perspective_depth_spans_zero_to_one() {
    let mut camera = Camera::default();
    camera.update((64, 64));
    let clip = |z: f32| {
        let p = camera.projection_matrix() * camera.view() * Vector4::new(0.0, 0.0, z, 1.0);
        p.z / p.w
    };
    assert_close(clip(-PERSPECTIVE_NEAR), 0.0);
    assert!((clip(-FAR_PLANE) - 1.0).abs() < 1e-3);
    let mid = clip(-10.0);
    assert!(mid > 0.0 && mid < 1.0);
}

#[test]
fn orthographic_box_scales_with_zoom() {
    let mut camera =
        Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(0.0)).with_projection(Projection::Orthographic {
            zoom: 2.0,
        });
    camera.update((400, 200));
    // half width is 400 / 2 / 2 = 100 world units
    let p = camera.projection_matrix() * camera.view() * Vector4::new(100.0, 50.0, -5.0, 1.0);
    assert_close(p.x / p.w, 1.0);
    assert_close(p.y / p.w, 1.0);
}

#[test]
fn controller_moves_along_forward_and_sprints() {
    let mut camera = Camera::default();
    camera.update((64, 64));
    let controller = CameraController::default();
    let mut input = InputState::default();
    input.keys.insert(KeyCode::KeyW);

    controller.update_camera(&mut camera, &input, 1.0);
    assert_vec_close(
        Vector3::new(camera.position.x, camera.position.y, camera.position.z),
        Vector3::new(0.0, 0.0, -1.5),
    );

    input.keys.insert(KeyCode::ShiftLeft);
    controller.update_camera(&mut camera, &input, 1.0);
    assert_close(camera.position.z, -1.5 - 7.5);
}

#[test]
fn vertical_keys_use_world_up() {
    let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(45.0));
    camera.update((64, 64));
    let mut input = InputState::default();
    input.keys.insert(KeyCode::Space);
    CameraController::default().update_camera(&mut camera, &input, 2.0);
    assert_close(camera.position.y, 3.0);
    assert_close(camera.position.x, 0.0);
}

#[test]
fn mouse_look_needs_right_button_and_clamps_pitch() {
    let mut camera = Camera::default();
    camera.update((64, 64));
    let controller = CameraController::default();
    let mut input = InputState {
        mouse_delta: (10.0, -10_000.0),
        ..Default::default()
    };

    controller.update_camera(&mut camera, &input, 0.016);
    assert_eq!(camera.yaw, Deg(-90.0));
    assert_eq!(camera.pitch, Deg(0.0));

    input.buttons.insert(MouseButton::Right);
    controller.update_camera(&mut camera, &input, 0.016);
    assert_close(camera.yaw.0, -88.0);
    assert_close(camera.pitch.0, CameraController::PITCH_LIMIT);
}

#[test]
fn scroll_changes_field_of_view() {
    let mut camera = Camera::default();
    let input = InputState {
        scroll_delta: 10.0,
        ..Default::default()
    };
    CameraController::default().update_camera(&mut camera, &input, 0.016);
    assert_eq!(camera.projection, Projection::Perspective { fovy: Deg(80.0) });
}

#[test]
fn end_frame_keeps_held_keys() {
    let mut input = InputState::default();
    input.keys.insert(KeyCode::KeyA);
    input.mouse_delta = (3.0, 4.0);
    input.scroll_delta = 1.0;
    input.end_frame();
    assert!(input.is_pressed(KeyCode::KeyA));
    assert_eq!(input.mouse_delta, (0.0, 0.0));
    assert_eq!(input.scroll_delta, 0.0);
}

#[test]
fn basis_stays_orthonormal_over_all_yaw_and_pitch() {
    for yaw in (0..360).step_by(15) {
        for pitch in (-89..=89).step_by(7) {
            let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(yaw as f32), Deg(pitch as f32));
            camera.update((64, 64));
            assert_close(camera.forward().magnitude(), 1.0);
            assert_close(camera.right().magnitude(), 1.0);
            assert_close(camera.right().dot(camera.forward()), 0.0);
        }
    }
}
