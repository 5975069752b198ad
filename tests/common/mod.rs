#![allow(dead_code)]

use deferred_ngin::cgmath::{InnerSpace, Vector3};

pub const EPSILON: f32 = 1e-4;

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {expected}, got {actual}"
    );
}

pub fn assert_vec_close(actual: Vector3<f32>, expected: Vector3<f32>) {
    assert!(
        (actual - expected).magnitude() < EPSILON,
        "expected {expected:?}, got {actual:?}"
    );
}

/// Compares a read-back texel against an expected colour with 8-bit slack.
pub fn assert_texel(actual: [f32; 4], expected: [f32; 4]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            (a - e).abs() <= 2.0 / 255.0,
            "expected texel {expected:?}, got {actual:?}"
        );
    }
}

#[cfg(feature = "integration-tests")]
pub mod gpu {
    use deferred_ngin::{context::Context, data_structures::texture::read_texels};

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("test runtime")
            .block_on(future)
    }

    /// Headless context, or `None` when the machine has no usable adapter.
    pub fn headless(width: u32, height: u32) -> Option<Context> {
        let _ = env_logger::builder().is_test(true).try_init();
        match block_on(Context::headless(width, height)) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                println!("Skipping GPU test: {e}");
                None
            }
        }
    }

    pub fn frame_target(ctx: &Context) -> wgpu::Texture {
        ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test frame"),
            size: wgpu::Extent3d {
                width: ctx.config.width,
                height: ctx.config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ctx.format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    pub fn read(ctx: &Context, texture: &wgpu::Texture) -> Vec<[f32; 4]> {
        block_on(read_texels(&ctx.device, &ctx.queue, texture))
            .expect("readback")
    }

    pub fn texel_at(texels: &[[f32; 4]], width: u32, x: u32, y: u32) -> [f32; 4] {
        texels[(y * width + x) as usize]
    }
}
