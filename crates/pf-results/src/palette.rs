//! Display colors for stored polars.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `h` in [0, 1), `s` and `v` in [0, 1].
    fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let sector = (h * 6.0).floor();
        let f = h * 6.0 - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - f * s);
        let t = v * (1.0 - (1.0 - f) * s);
        let (r, g, b) = match sector as i64 % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        let to_u8 = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(to_u8(r), to_u8(g), to_u8(b))
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

const BASE_PALETTE: [Color; 10] = [
    Color::rgb(31, 119, 180),
    Color::rgb(255, 127, 14),
    Color::rgb(44, 160, 44),
    Color::rgb(214, 39, 40),
    Color::rgb(148, 103, 189),
    Color::rgb(140, 86, 75),
    Color::rgb(227, 119, 194),
    Color::rgb(127, 127, 127),
    Color::rgb(188, 189, 34),
    Color::rgb(23, 190, 207),
];

/// Golden-ratio conjugate, spreads generated hues evenly.
const HUE_STEP: f64 = 0.618_033_988_749_895;

/// Bound on generated candidates once the base palette is exhausted.
const MAX_GENERATED: usize = 4096;

/// First color not present in `used`: the base palette, then generated hues.
pub fn pick_color<'a>(used: impl IntoIterator<Item = &'a Color>) -> Color {
    let used: std::collections::HashSet<Color> = used.into_iter().copied().collect();
    if let Some(c) = BASE_PALETTE.iter().find(|c| !used.contains(c)) {
        return *c;
    }
    let mut hue = 0.0_f64;
    for k in 0..MAX_GENERATED {
        hue = (hue + HUE_STEP).fract();
        let value = 0.95 - 0.25 * ((k / 16) % 3) as f64;
        let candidate = Color::from_hsv(hue, 0.7, value);
        if !used.contains(&candidate) {
            return candidate;
        }
    }
    Color::from_hsv(hue, 0.7, 0.6)
}
