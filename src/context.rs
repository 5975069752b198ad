use std::sync::Arc;

use winit::window::Window;

use crate::{error::RenderError, pipelines::geometry::GBUFFER_BYTES_PER_SAMPLE};

/// Device, queue and (for windowed use) the surface the renderer presents to.
///
/// Headless contexts have no window or surface. `config` still describes
/// the output size and format so passes can be built the same way.
#[derive(Debug)]
pub struct Context {
    pub window: Option<Arc<Window>>,
    pub surface: Option<wgpu::Surface<'static>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
}

impl Context {
    /// Format of offscreen output when there is no surface.
    pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::Device(format!("cannot create surface: {e}")))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::Device(format!("no suitable adapter: {e}")))?;
        let (device, queue) = request_device(&adapter).await?;

        let caps = surface.get_capabilities(&adapter);
        // Colours are written in linear space and stored as is, so prefer a
        // non-sRGB surface to match the offscreen targets.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| RenderError::Device("surface reports no formats".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "surface configured: {}x{} {:?}",
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            window: Some(window),
            surface: Some(surface),
            device,
            queue,
            config,
        })
    }

    /// Context without a window, for offscreen rendering and tests.
    pub async fn headless(width: u32, height: u32) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .map_err(|e| RenderError::Device(format!("no suitable adapter: {e}")))?;
        let (device, queue) = request_device(&adapter).await?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: Self::HEADLESS_FORMAT,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        Ok(Self {
            window: None,
            surface: None,
            device,
            queue,
            config,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Records the new size and reconfigures the surface. Zero extents are
    /// ignored (minimized windows report them).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    pub fn reconfigure(&self) {
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }

    pub fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// The G-buffer writes six colour targets at once, which needs more bytes
/// per sample than the default limits allow.
async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), RenderError> {
    let info = adapter.get_info();
    log::info!("using adapter \"{}\" ({:?})", info.name, info.backend);

    let supported = adapter.limits();
    if supported.max_color_attachments < 6
        || supported.max_color_attachment_bytes_per_sample < GBUFFER_BYTES_PER_SAMPLE
    {
        return Err(RenderError::Device(format!(
            "adapter supports {} colour attachments and {} bytes per sample; the G-buffer needs 6 and {}",
            supported.max_color_attachments,
            supported.max_color_attachment_bytes_per_sample,
            GBUFFER_BYTES_PER_SAMPLE
        )));
    }
    let required_limits = wgpu::Limits {
        max_color_attachment_bytes_per_sample: GBUFFER_BYTES_PER_SAMPLE,
        ..wgpu::Limits::default()
    };

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Deferred Renderer Device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            ..Default::default()
        })
        .await
        .map_err(|e| RenderError::Device(format!("cannot create device: {e}")))?;
    device.on_uncaptured_error(Arc::new(|e| {
        log::error!("uncaptured wgpu error: {e}");
    }));
    Ok((device, queue))
}
