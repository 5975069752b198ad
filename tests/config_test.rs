use std::collections::HashMap;

use deferred_ngin::{
    config::{OutputMode, RendererConfig, ShaderPolicy, TangentPolicy},
    data_structures::light::MAX_LIGHTS,
};

fn with_env(pairs: &[(&str, &str)]) -> RendererConfig {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    RendererConfig::default().with_overrides(|key| env.get(key).cloned())
}

#[test]
fn defaults() {
    let config = RendererConfig::default();
    assert_eq!(config.shader_policy, ShaderPolicy::Strict);
    assert_eq!(config.tangent_policy, TangentPolicy::Fallback);
    assert_eq!(config.output, OutputMode::Composite);
    assert_eq!(config.batch_capacity(), MAX_LIGHTS);
}

#[test]
fn overrides_apply() {
    let config = with_env(&[
        (RendererConfig::ENV_SHADER_POLICY, "Lenient"),
        (RendererConfig::ENV_DEBUG, "1"),
        (RendererConfig::ENV_LIGHTS_PER_BATCH, " 8 "),
    ]);
    assert_eq!(config.shader_policy, ShaderPolicy::Lenient);
    assert_eq!(config.output, OutputMode::Debug);
    assert_eq!(config.lights_per_batch, 8);
}

#[test]
fn unknown_values_are_ignored() {
    let config = with_env(&[
        (RendererConfig::ENV_SHADER_POLICY, "sloppy"),
        (RendererConfig::ENV_DEBUG, "maybe"),
        (RendererConfig::ENV_LIGHTS_PER_BATCH, "many"),
    ]);
    assert_eq!(config, RendererConfig::default());
}

#[test]
fn batch_capacity_is_clamped() {
    let config = RendererConfig::default().with_lights_per_batch(0);
    assert_eq!(config.batch_capacity(), 1);
    let config = config.with_lights_per_batch(100_000);
    assert_eq!(config.batch_capacity(), MAX_LIGHTS);
}

#[test]
fn output_mode_toggles() {
    assert_eq!(OutputMode::Composite.toggled(), OutputMode::Debug);
    assert_eq!(OutputMode::Debug.toggled().toggled(), OutputMode::Debug);
}
