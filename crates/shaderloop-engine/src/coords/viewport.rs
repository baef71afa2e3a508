/// Default upper bound for the device pixel ratio used when sizing the surface.
pub const DEFAULT_DEVICE_PIXEL_RATIO_CAP: f64 = 2.0;

/// Viewport sizing policy.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportConfig {
    /// Oversampling limit; always `>= 1`.
    pub device_pixel_ratio_cap: f64,
}

impl ViewportConfig {
    /// Creates a config, clamping the cap to at least 1 (non-finite caps become 1).
    pub fn new(device_pixel_ratio_cap: f64) -> Self {
        let cap = if device_pixel_ratio_cap.is_finite() {
            device_pixel_ratio_cap.max(1.0)
        } else {
            1.0
        };
        Self {
            device_pixel_ratio_cap: cap,
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_PIXEL_RATIO_CAP)
    }
}

/// Snapshot of the drawing surface, polled once per tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceMetrics {
    /// Width in logical pixels.
    pub logical_width: f64,
    /// Height in logical pixels.
    pub logical_height: f64,
    /// Physical pixels per logical pixel reported by the platform.
    pub device_pixel_ratio: f64,
}

impl SurfaceMetrics {
    #[inline]
    pub const fn new(logical_width: f64, logical_height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            logical_width,
            logical_height,
            device_pixel_ratio,
        }
    }
}

/// GPU viewport transform in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ViewportRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewportRect {
    /// Rectangle covering `(0, 0, width, height)`.
    #[inline]
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clips the rectangle to a `width` x `height` render target.
    pub fn clamped_to(self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }
}

/// Result of [`Viewport::sync`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ViewportSync {
    /// Whether the surface was resized by this call.
    pub changed: bool,
    pub width: u32,
    pub height: u32,
}

/// Something whose backing store follows the viewport's pixel size.
pub trait SurfaceTarget {
    fn resize_surface(&mut self, width: u32, height: u32);
}

/// Device pixel ratio clamped to `[1, cap]`. Non-finite ratios count as 1.
pub fn effective_pixel_ratio(device_pixel_ratio: f64, cap: f64) -> f64 {
    if !device_pixel_ratio.is_finite() {
        return 1.0;
    }
    device_pixel_ratio.clamp(1.0, cap.max(1.0))
}

/// Physical pixel size for `metrics` under `config`:
/// `floor(logical * clamp(dpr, 1, cap))` on each axis.
pub fn target_size(metrics: SurfaceMetrics, config: ViewportConfig) -> (u32, u32) {
    let ratio = effective_pixel_ratio(metrics.device_pixel_ratio, config.device_pixel_ratio_cap);
    // `as` saturates: negative and NaN sizes become 0.
    let width = (metrics.logical_width * ratio).floor() as u32;
    let height = (metrics.logical_height * ratio).floor() as u32;
    (width, height)
}

/// Tracks the drawable size and the GPU viewport transform.
///
/// A fresh viewport has no size, so the first [`sync`](Self::sync) always
/// configures the surface.
#[derive(Debug, Clone)]
pub struct Viewport {
    config: ViewportConfig,
    width: u32,
    height: u32,
    transform: ViewportRect,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            width: 0,
            height: 0,
            transform: ViewportRect::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> ViewportConfig {
        self.config
    }

    /// Currently configured drawable size in physical pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Viewport transform to apply to every render pass.
    #[inline]
    pub fn transform(&self) -> ViewportRect {
        self.transform
    }

    /// Recomputes the pixel size and, only if it changed, resizes `target` and
    /// resets the transform to cover the whole surface.
    pub fn sync<T>(&mut self, target: &mut T, metrics: SurfaceMetrics) -> ViewportSync
    where
        T: SurfaceTarget + ?Sized,
    {
        let (width, height) = target_size(metrics, self.config);
        let changed = (width, height) != (self.width, self.height);

        if changed {
            log::debug!(
                "viewport {}x{} -> {}x{} (dpr {:.2})",
                self.width,
                self.height,
                width,
                height,
                metrics.device_pixel_ratio
            );
            target.resize_surface(width, height);
            self.width = width;
            self.height = height;
            self.transform = ViewportRect::full(width, height);
        }

        ViewportSync {
            changed,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSurface {
        resizes: Vec<(u32, u32)>,
    }

    impl SurfaceTarget for RecordingSurface {
        fn resize_surface(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }
    }

    // ── target_size ───────────────────────────────────────────────────────

    #[test]
    fn ratio_below_cap_is_used_as_is() {
        let m = SurfaceMetrics::new(800.0, 600.0, 1.5);
        assert_eq!(target_size(m, ViewportConfig::new(2.0)), (1200, 900));
    }

    #[test]
    fn ratio_above_cap_is_clamped() {
        let m = SurfaceMetrics::new(800.0, 600.0, 3.0);
        assert_eq!(target_size(m, ViewportConfig::new(2.0)), (1600, 1200));
    }

    #[test]
    fn ratio_below_one_is_raised_to_one() {
        let m = SurfaceMetrics::new(800.0, 600.0, 0.5);
        assert_eq!(target_size(m, ViewportConfig::default()), (800, 600));
    }

    #[test]
    fn fractional_sizes_are_floored() {
        let m = SurfaceMetrics::new(333.0, 101.0, 1.25);
        // 416.25 x 126.25
        assert_eq!(target_size(m, ViewportConfig::default()), (416, 126));
    }

    #[test]
    fn non_finite_ratio_counts_as_one() {
        let m = SurfaceMetrics::new(640.0, 480.0, f64::NAN);
        assert_eq!(target_size(m, ViewportConfig::default()), (640, 480));
    }

    #[test]
    fn cap_is_never_below_one() {
        assert_eq!(ViewportConfig::new(0.25).device_pixel_ratio_cap, 1.0);
        assert_eq!(ViewportConfig::new(f64::INFINITY).device_pixel_ratio_cap, 1.0);
    }

    // ── sync ──────────────────────────────────────────────────────────────

    #[test]
    fn first_sync_configures_surface() {
        let mut surface = RecordingSurface::default();
        let mut vp = Viewport::new(ViewportConfig::new(2.0));

        let s = vp.sync(&mut surface, SurfaceMetrics::new(800.0, 600.0, 1.5));

        assert_eq!(
            s,
            ViewportSync {
                changed: true,
                width: 1200,
                height: 900
            }
        );
        assert_eq!(surface.resizes, vec![(1200, 900)]);
        assert_eq!(vp.transform(), ViewportRect::full(1200, 900));
    }

    #[test]
    fn sync_is_idempotent() {
        let mut surface = RecordingSurface::default();
        let mut vp = Viewport::new(ViewportConfig::default());
        let m = SurfaceMetrics::new(800.0, 600.0, 1.0);

        vp.sync(&mut surface, m);
        let transform = vp.transform();
        let second = vp.sync(&mut surface, m);

        assert!(!second.changed);
        assert_eq!((second.width, second.height), (800, 600));
        assert_eq!(surface.resizes.len(), 1);
        assert_eq!(vp.transform(), transform);
    }

    #[test]
    fn resize_reconfigures_once() {
        let mut surface = RecordingSurface::default();
        let mut vp = Viewport::new(ViewportConfig::default());

        vp.sync(&mut surface, SurfaceMetrics::new(800.0, 600.0, 1.0));
        vp.sync(&mut surface, SurfaceMetrics::new(1024.0, 768.0, 1.0));
        vp.sync(&mut surface, SurfaceMetrics::new(1024.0, 768.0, 1.0));

        assert_eq!(surface.resizes, vec![(800, 600), (1024, 768)]);
        assert_eq!(vp.size(), (1024, 768));
        assert_eq!(vp.transform(), ViewportRect::full(1024, 768));
    }

    #[test]
    fn pixel_ratio_change_alone_triggers_resize() {
        let mut surface = RecordingSurface::default();
        let mut vp = Viewport::new(ViewportConfig::default());

        vp.sync(&mut surface, SurfaceMetrics::new(800.0, 600.0, 1.0));
        let s = vp.sync(&mut surface, SurfaceMetrics::new(800.0, 600.0, 2.0));

        assert!(s.changed);
        assert_eq!(vp.size(), (1600, 1200));
    }

    // ── ViewportRect ──────────────────────────────────────────────────────

    #[test]
    fn clamped_rect_fits_target() {
        let r = ViewportRect::full(1200, 900).clamped_to(1000, 1000);
        assert_eq!(r, ViewportRect::full(1000, 900));
    }

    #[test]
    fn zero_sized_rect_is_empty() {
        assert!(ViewportRect::full(0, 600).is_empty());
        assert!(!ViewportRect::full(1, 1).is_empty());
    }
}
