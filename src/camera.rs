//! Camera model, its uniform block and a free-fly controller.
//!
//! [`Camera`] stores yaw/pitch/roll, position and a projection variant. The
//! derived vectors and matrices are only recomputed by [`Camera::update`];
//! reading them before the first update of a frame returns last frame's
//! values.

use std::collections::HashSet;

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3};
use winit::{event::MouseButton, keyboard::KeyCode};

/// wgpu clip space has z in `0..1` where cgmath produces `-1..1`.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);
pub const FAR_PLANE: f32 = 32767.0;
pub const PERSPECTIVE_NEAR: f32 = 0.1;
pub const ORTHOGRAPHIC_NEAR: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective { fovy: Deg<f32> },
    /// Pixels per world unit; the box spans the viewport divided by `zoom`.
    Orthographic { zoom: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective { fovy: Deg(90.0) }
    }
}

impl Projection {
    /// Projection matrix for a viewport, already mapped to wgpu depth range.
    pub fn matrix(&self, width: u32, height: u32) -> Matrix4<f32> {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let raw = match *self {
            Projection::Perspective { fovy } => {
                cgmath::perspective(fovy, w / h, PERSPECTIVE_NEAR, FAR_PLANE)
            }
            Projection::Orthographic { zoom } => {
                let (half_w, half_h) = (w / 2.0 / zoom, h / 2.0 / zoom);
                cgmath::ortho(-half_w, half_w, -half_h, half_h, ORTHOGRAPHIC_NEAR, FAR_PLANE)
            }
        };
        OPENGL_TO_WGPU_MATRIX * raw
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Deg<f32>,
    pub pitch: Deg<f32>,
    /// Tracked for callers but not applied to any matrix.
    pub roll: Deg<f32>,
    pub projection: Projection,
    size: (u32, u32),
    forward: Vector3<f32>,
    right: Vector3<f32>,
    view: Matrix4<f32>,
    proj: Matrix4<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(0.0))
    }
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, yaw: Deg<f32>, pitch: Deg<f32>) -> Self {
        Self {
            position: position.into(),
            yaw,
            pitch,
            roll: Deg(0.0),
            projection: Projection::default(),
            size: (0, 0),
            forward: Vector3::new(0.0, 0.0, -1.0),
            right: Vector3::new(1.0, 0.0, 0.0),
            view: Matrix4::identity(),
            proj: Matrix4::identity(),
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Recomputes forward, right, view and projection, in that order.
    pub fn update(&mut self, size: (u32, u32)) {
        self.size = size;
        let (yaw, pitch) = (Rad::from(self.yaw).0, Rad::from(self.pitch).0);
        self.forward = Vector3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.forward.cross(WORLD_UP).normalize();
        self.view = Matrix4::look_at_rh(self.position, self.position + self.forward, WORLD_UP);
        self.proj = self.projection.matrix(size.0, size.1);
    }

    /// Viewport size passed to the last `update`.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.proj
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view: self.view.into(),
            projection: self.proj.into(),
        }
    }
}

/// Camera block as laid out in the geometry shader (128 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        Self {
            view: identity,
            projection: identity,
        }
    }
}

/// Keyboard and mouse state for one frame, as delivered by the host.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub keys: HashSet<KeyCode>,
    pub buttons: HashSet<MouseButton>,
    /// Accumulated mouse motion since the previous frame.
    pub mouse_delta: (f64, f64),
    /// Accumulated scroll lines since the previous frame.
    pub scroll_delta: f32,
}

impl InputState {
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_held(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    /// Clears per-frame deltas; held keys and buttons persist.
    pub fn end_frame(&mut self) {
        self.mouse_delta = (0.0, 0.0);
        self.scroll_delta = 0.0;
    }
}

/// Free-fly movement: WASD along forward/right, Space/Ctrl along world up,
/// Shift to sprint, mouse look while the right button is held and scroll to
/// change field of view (or zoom).
#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    pub speed: f32,
    pub sprint: f32,
    /// Degrees per pixel of mouse motion.
    pub sensitivity: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            speed: 1.5,
            sprint: 5.0,
            sensitivity: 0.2,
        }
    }
}

impl CameraController {
    pub const PITCH_LIMIT: f32 = 89.0;

    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            speed,
            sensitivity,
            ..Default::default()
        }
    }

    /// Moves along the vectors from the camera's last `update`.
    pub fn update_camera(&self, camera: &mut Camera, input: &InputState, dt: f32) {
        let mut speed = self.speed * dt;
        if input.is_pressed(KeyCode::ShiftLeft) {
            speed *= self.sprint;
        }
        let (forward, right) = (camera.forward(), camera.right());
        let axes = [
            (KeyCode::KeyW, forward),
            (KeyCode::KeyS, -forward),
            (KeyCode::KeyD, right),
            (KeyCode::KeyA, -right),
            (KeyCode::Space, WORLD_UP),
            (KeyCode::ControlLeft, -WORLD_UP),
        ];
        for (key, direction) in axes {
            if input.is_pressed(key) {
                camera.position += direction * speed;
            }
        }

        if input.is_held(MouseButton::Right) {
            let (dx, dy) = input.mouse_delta;
            camera.yaw += Deg(dx as f32 * self.sensitivity);
            camera.pitch = Deg(
                (camera.pitch.0 - dy as f32 * self.sensitivity)
                    .clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT),
            );
        }

        if input.scroll_delta != 0.0 {
            match &mut camera.projection {
                Projection::Perspective { fovy } => {
                    fovy.0 = (fovy.0 - input.scroll_delta).clamp(1.0, 120.0);
                }
                Projection::Orthographic { zoom } => {
                    *zoom = (*zoom * 1.1f32.powf(input.scroll_delta)).max(0.01);
                }
            }
        }
    }
}
