use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            to_rgb(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sequential ramp for efficiency bands
// ---------------------------------------------------------------------------

/// Light end of the band ramp (near-white purple).
const RAMP_LOW: (f32, f32, f32) = (1.0, 0.969, 0.984);
/// Dark end of the band ramp (deep blue).
const RAMP_HIGH: (f32, f32, f32) = (0.008, 0.220, 0.345);

/// `n` colours running from light to dark blue, mixed in linear RGB.
pub fn sequential_ramp(n: usize) -> Vec<RGBColor> {
    let low: LinSrgb = Srgb::new(RAMP_LOW.0, RAMP_LOW.1, RAMP_LOW.2).into_linear();
    let high: LinSrgb = Srgb::new(RAMP_HIGH.0, RAMP_HIGH.1, RAMP_HIGH.2).into_linear();
    match n {
        0 => Vec::new(),
        1 => vec![to_rgb(Srgb::from_linear(high))],
        _ => (0..n)
            .map(|i| {
                let t = i as f32 / (n - 1) as f32;
                to_rgb(Srgb::from_linear(low.mix(high, t)))
            })
            .collect(),
    }
}

fn to_rgb(c: Srgb) -> RGBColor {
    let c: Srgb<u8> = c.into_format();
    RGBColor(c.red, c.green, c.blue)
}
