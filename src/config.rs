//! Renderer configuration.
//!
//! There is no configuration file: hosts build a [`RendererConfig`] in code,
//! optionally starting from [`RendererConfig::from_env`] which applies a few
//! explicit overrides useful while debugging.

use crate::data_structures::light::MAX_LIGHTS;

/// How shader compile and link diagnostics are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderPolicy {
    /// Diagnostics abort construction.
    #[default]
    Strict,
    /// Diagnostics are logged; the program is kept but marked invalid and
    /// every draw that would use it is skipped.
    Lenient,
}

/// What to do when a triangle's UV determinant is (close to) zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TangentPolicy {
    /// Build an orthonormal basis around the face normal and log a warning.
    #[default]
    Fallback,
    /// Fail mesh construction with `RenderError::DegenerateGeometry`.
    Reject,
    /// Keep whatever the division produces, including non-finite values.
    Propagate,
}

/// Final pass selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Composite,
    /// 2x4 mosaic of the intermediate attachments.
    Debug,
}

impl OutputMode {
    pub fn toggled(self) -> Self {
        match self {
            OutputMode::Composite => OutputMode::Debug,
            OutputMode::Debug => OutputMode::Composite,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub shader_policy: ShaderPolicy,
    pub tangent_policy: TangentPolicy,
    /// Lights uploaded per lighting draw, clamped to `1..=MAX_LIGHTS`.
    pub lights_per_batch: usize,
    pub output: OutputMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shader_policy: ShaderPolicy::Strict,
            tangent_policy: TangentPolicy::Fallback,
            lights_per_batch: MAX_LIGHTS,
            output: OutputMode::Composite,
        }
    }
}

impl RendererConfig {
    pub const ENV_SHADER_POLICY: &'static str = "DEFERRED_SHADER_POLICY";
    pub const ENV_DEBUG: &'static str = "DEFERRED_DEBUG";
    pub const ENV_LIGHTS_PER_BATCH: &'static str = "DEFERRED_LIGHTS_PER_BATCH";

    /// Default configuration with overrides read from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup. Unknown values are
    /// ignored with a warning so a typo never changes behaviour silently.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(Self::ENV_SHADER_POLICY) {
            match value.trim().to_ascii_lowercase().as_str() {
                "strict" => self.shader_policy = ShaderPolicy::Strict,
                "lenient" => self.shader_policy = ShaderPolicy::Lenient,
                other => log::warn!("ignoring {}={other}", Self::ENV_SHADER_POLICY),
            }
        }
        if let Some(value) = lookup(Self::ENV_DEBUG) {
            match value.trim() {
                "1" | "true" | "on" => self.output = OutputMode::Debug,
                "0" | "false" | "off" => self.output = OutputMode::Composite,
                other => log::warn!("ignoring {}={other}", Self::ENV_DEBUG),
            }
        }
        if let Some(value) = lookup(Self::ENV_LIGHTS_PER_BATCH) {
            match value.trim().parse::<usize>() {
                Ok(n) => self.lights_per_batch = n,
                Err(_) => log::warn!("ignoring {}={value}", Self::ENV_LIGHTS_PER_BATCH),
            }
        }
        self
    }

    pub fn with_shader_policy(mut self, policy: ShaderPolicy) -> Self {
        self.shader_policy = policy;
        self
    }

    pub fn with_tangent_policy(mut self, policy: TangentPolicy) -> Self {
        self.tangent_policy = policy;
        self
    }

    pub fn with_lights_per_batch(mut self, lights: usize) -> Self {
        self.lights_per_batch = lights;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Batch capacity actually used by the lighting pass.
    pub fn batch_capacity(&self) -> usize {
        self.lights_per_batch.clamp(1, MAX_LIGHTS)
    }
}
