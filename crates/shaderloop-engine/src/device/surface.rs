use winit::dpi::PhysicalSize;

use super::SurfaceErrorAction;

/// Picks the swapchain format whose sRGB-ness matches `prefer_srgb`.
///
/// Among matching formats the 8-bit BGRA/RGBA ones come first, since every
/// backend (the GL fallback included) presents them. If nothing matches, the
/// surface's first format is used and the mismatch is logged.
pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let matching = |f: &&wgpu::TextureFormat| f.is_srgb() == prefer_srgb;
    let eight_bit = |f: &&wgpu::TextureFormat| {
        matches!(
            f.remove_srgb_suffix(),
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Rgba8Unorm
        )
    };

    let chosen = formats
        .iter()
        .filter(matching)
        .find(eight_bit)
        .or_else(|| formats.iter().find(matching))
        .copied();

    if chosen.is_none() {
        if let Some(first) = formats.first() {
            log::warn!(
                "surface offers no {} format; using {first:?}",
                if prefer_srgb { "sRGB" } else { "non-sRGB" }
            );
            return Some(*first);
        }
    }

    chosen
}

/// The requested alpha mode if the surface supports it, else the surface's first.
pub(crate) fn choose_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| supported.contains(m))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Records `new_size` and reconfigures the swapchain to it.
///
/// A surface cannot be configured at 0x0; configuration then waits for the
/// next non-empty size. Returns whether the swapchain was reconfigured.
pub(crate) fn apply_resize(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    size: &mut PhysicalSize<u32>,
    new_size: PhysicalSize<u32>,
) -> bool {
    *size = new_size;
    if new_size.width == 0 || new_size.height == 0 {
        log::debug!("surface is empty; configuration deferred");
        return false;
    }

    config.width = new_size.width;
    config.height = new_size.height;
    surface.configure(device, config);
    true
}

/// What a frame should do after failing to acquire a surface texture.
pub(crate) fn surface_error_action(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}
