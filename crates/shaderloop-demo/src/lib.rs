//! Shared startup for the preset binaries.

use std::process::ExitCode;

use shaderloop_engine::device::GpuInit;
use shaderloop_engine::logging::{init_logging, LoggingConfig};
use shaderloop_engine::presets::Preset;
use shaderloop_engine::window::{Runtime, RuntimeConfig};

/// Opens a window running `preset` and blocks until it closes.
pub fn launch(preset: Preset) -> ExitCode {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: format!("shaderloop: {}", preset.name()),
        shaders: preset.source(),
        ..RuntimeConfig::default()
    };

    // Shader output is already display-referred; an sRGB target would encode it twice.
    let gpu_init = GpuInit {
        prefer_srgb: false,
        ..GpuInit::default()
    };

    log::info!("starting preset `{}`", preset.name());

    match Runtime::run(config, gpu_init) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("shaderloop failed: {err:#}");
            eprintln!("shaderloop failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
