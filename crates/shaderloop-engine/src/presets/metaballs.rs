//! Five-ball metaball field.

pub const BALL_COUNT: usize = 5;
pub const RADIUS: f32 = 0.09;

/// Dark blue fill outside the blobs.
pub const BACKGROUND: [f32; 3] = [0.02, 0.02, 0.05];

/// Center of ball `i` in aspect-corrected space (x in `[0, aspect]`, y in `[0, 1]`).
pub fn ball_center(i: usize, aspect: f32, time: f32) -> [f32; 2] {
    let fi = i as f32;
    [
        0.5 * aspect + 0.35 * aspect * (time * (0.6 + 0.13 * fi) + fi * 1.7).sin(),
        0.5 + 0.35 * (time * (0.7 + 0.11 * fi) + fi * 2.3).cos(),
    ]
}

/// Summed inverse-square field at `p`; the blob surface sits at 1.0.
pub fn field(p: [f32; 2], aspect: f32, time: f32) -> f32 {
    (0..BALL_COUNT)
        .map(|i| {
            let c = ball_center(i, aspect, time);
            let (dx, dy) = (p[0] - c[0], p[1] - c[1]);
            RADIUS * RADIUS / (dx * dx + dy * dy).max(1e-4)
        })
        .sum()
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// RGB at `uv` for a surface of the given aspect ratio.
pub fn shade(uv: [f32; 2], aspect: f32, time: f32) -> [f32; 3] {
    let f = field([uv[0] * aspect, uv[1]], aspect, time);
    let edge = smoothstep(0.95, 1.05, f);
    let phase = [0.0, 2.0, 4.0];
    std::array::from_fn(|i| {
        let tint = 0.5 + 0.5 * (time * 0.5 + f + phase[i]).cos();
        BACKGROUND[i] + (tint - BACKGROUND[i]) * edge
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{wgsl_const, METABALLS_FRAGMENT_WGSL};

    #[test]
    fn ball_center_is_inside_the_blob() {
        let aspect = 16.0 / 9.0;
        for i in 0..BALL_COUNT {
            let c = ball_center(i, aspect, 3.0);
            assert!(field(c, aspect, 3.0) > 1.05);
        }
    }

    #[test]
    fn mirror_matches_the_shipped_shader() {
        assert_eq!(wgsl_const(METABALLS_FRAGMENT_WGSL, "RADIUS"), [RADIUS]);
        assert_eq!(wgsl_const(METABALLS_FRAGMENT_WGSL, "BALL_COUNT"), [BALL_COUNT as f32]);

        assert!(METABALLS_FRAGMENT_WGSL.contains("0.5 * aspect + 0.35 * aspect * sin(t * (0.6 + 0.13 * fi) + fi * 1.7)"));
        assert!(METABALLS_FRAGMENT_WGSL.contains("0.5 + 0.35 * cos(t * (0.7 + 0.11 * fi) + fi * 2.3)"));
        assert!(METABALLS_FRAGMENT_WGSL.contains("smoothstep(0.95, 1.05, density)"));
        assert!(METABALLS_FRAGMENT_WGSL.contains("vec3<f32>(0.02, 0.02, 0.05)"));
    }

    #[test]
    fn centers_stay_on_screen() {
        let aspect = 1.5;
        for step in 0..200 {
            let t = step as f32 * 0.25;
            for i in 0..BALL_COUNT {
                let [x, y] = ball_center(i, aspect, t);
                assert!((0.0..=aspect).contains(&x));
                assert!((0.0..=1.0).contains(&y));
            }
        }
    }

    #[test]
    fn far_from_every_ball_is_background() {
        // Every center lies within 0.35 of the screen middle, so a point well
        // outside the screen sees only a weak field.
        let aspect = 1.0;
        let rgb = shade([-3.0, -3.0], aspect, 0.0);
        assert_eq!(rgb, BACKGROUND);
    }
}
