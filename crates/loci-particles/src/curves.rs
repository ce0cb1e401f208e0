//! Interpolation helpers and the eased life-progress lookup table

use std::sync::OnceLock;

/// Number of entries in the ease lookup table
pub const EASE_LUT_SIZE: usize = 256;

/// Linear interpolation between two floats
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Quadratic ease-in-out on [0, 1]
pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        let k = -2.0 * t + 2.0;
        1.0 - k * k / 2.0
    }
}

fn ease_table() -> &'static [f32; EASE_LUT_SIZE] {
    static TABLE: OnceLock<[f32; EASE_LUT_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0; EASE_LUT_SIZE];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = ease_in_out_quad(i as f32 / (EASE_LUT_SIZE - 1) as f32);
        }
        table
    })
}

/// Table-driven `ease_in_out_quad`. Input is clamped, NaN maps to 0.
pub fn ease_lookup(t: f32) -> f32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let idx = (t * (EASE_LUT_SIZE - 1) as f32).round() as usize;
    ease_table()[idx.min(EASE_LUT_SIZE - 1)]
}
