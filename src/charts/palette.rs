//! Color scales used by the charts.

use plotters::style::RGBColor;

/// Viridis anchor colors, dark to bright.
const SEQUENTIAL: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

const NEGATIVE: (u8, u8, u8) = (59, 76, 192);
const NEUTRAL: (u8, u8, u8) = (242, 242, 242);
const POSITIVE: (u8, u8, u8) = (180, 4, 38);

/// Fill for undefined (NaN) correlation cells.
pub const UNDEFINED: RGBColor = RGBColor(160, 160, 160);

fn lerp(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> RGBColor {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Sequential scale; `t` is clamped to [0, 1].
pub fn sequential(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let segments = (SEQUENTIAL.len() - 1) as f64;
    let scaled = t * segments;
    let index = (scaled.floor() as usize).min(SEQUENTIAL.len() - 2);
    lerp(SEQUENTIAL[index], SEQUENTIAL[index + 1], scaled - index as f64)
}

/// Position of `value` within `[min, max]`, 0.5 for a degenerate range.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.5
    }
}

/// Diverging blue-white-red scale over [-1, 1]; NaN maps to grey.
pub fn diverging(r: f64) -> RGBColor {
    if r.is_nan() {
        return UNDEFINED;
    }
    let r = r.clamp(-1.0, 1.0);
    if r < 0.0 {
        lerp(NEUTRAL, NEGATIVE, -r)
    } else {
        lerp(NEUTRAL, POSITIVE, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_endpoints() {
        assert_eq!(sequential(0.0), RGBColor(68, 1, 84));
        assert_eq!(sequential(1.0), RGBColor(253, 231, 37));
        assert_eq!(sequential(-3.0), sequential(0.0));
        assert_eq!(sequential(f64::NAN), sequential(0.0));
    }

    #[test]
    fn test_diverging_scale() {
        assert_eq!(diverging(-1.0), RGBColor(59, 76, 192));
        assert_eq!(diverging(0.0), RGBColor(242, 242, 242));
        assert_eq!(diverging(1.0), RGBColor(180, 4, 38));
        assert_eq!(diverging(f64::NAN), UNDEFINED);
    }

    #[test]
    fn test_normalize_degenerate_range() {
        assert_eq!(normalize(3.0, 3.0, 3.0), 0.5);
        assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
    }
}
