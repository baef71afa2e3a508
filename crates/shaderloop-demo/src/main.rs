use std::process::ExitCode;

use shaderloop_engine::presets::Preset;

fn main() -> ExitCode {
    shaderloop_demo::launch(Preset::Gradient)
}
