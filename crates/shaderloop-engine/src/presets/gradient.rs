//! Cosine palette gradient.

/// Per-channel phase offsets of the palette.
pub const PHASE: [f32; 3] = [0.0, 2.0, 4.0];

/// RGB at `uv` for `time` seconds.
pub fn shade(uv: [f32; 2], time: f32) -> [f32; 3] {
    let swizzle = [uv[0], uv[1], uv[0]];
    std::array::from_fn(|i| 0.5 + 0.5 * (time + swizzle[i] + PHASE[i]).cos())
}
