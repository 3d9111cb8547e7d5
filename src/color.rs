use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Country colours for the bar variant
// ---------------------------------------------------------------------------

/// Maps country names to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a String>) -> Self {
        let keys: Vec<&String> = keys.into_iter().collect();
        let mapping = keys
            .iter()
            .zip(generate_palette(keys.len()))
            .map(|(k, c)| ((*k).clone(), c))
            .collect();
        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, key: &str) -> Color32 {
        self.mapping
            .get(key)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Log-scaled rate colour scale
// ---------------------------------------------------------------------------

/// Sequential ramp, dark (low) to bright (high).
const RAMP: [(f32, f32, f32); 5] = [
    (0.267, 0.005, 0.329),
    (0.231, 0.322, 0.545),
    (0.129, 0.569, 0.549),
    (0.369, 0.788, 0.384),
    (0.992, 0.906, 0.145),
];

/// Logarithmic scale over a fixed domain; values outside are clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogScale {
    pub min: f64,
    pub max: f64,
}

/// Domain of the mortality-rate encoding (per 100k).
pub const RATE_DOMAIN: LogScale = LogScale {
    min: 0.01,
    max: 1000.0,
};

impl LogScale {
    /// Clamp `value` into the domain. Non-positive values map to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() || value <= self.min {
            self.min
        } else {
            value.min(self.max)
        }
    }

    /// Position of `value` along the scale in `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        let lo = self.min.log10();
        let hi = self.max.log10();
        (self.clamp(value).log10() - lo) / (hi - lo)
    }

    /// log10 of the clamped value, for log-height bars.
    pub fn log_value(&self, value: f64) -> f64 {
        self.clamp(value).log10()
    }

    /// Decade ticks inside the domain (0.01, 0.1, …, 1000).
    pub fn decades(&self) -> Vec<f64> {
        let lo = self.min.log10().ceil() as i32;
        let hi = self.max.log10().floor() as i32;
        (lo..=hi).map(|e| 10f64.powi(e)).collect()
    }

    pub fn color(&self, value: f64) -> Color32 {
        ramp_color(self.normalize(value) as f32)
    }
}

/// Interpolate the ramp in linear RGB at `t` in `[0, 1]`.
pub fn ramp_color(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let segments = (RAMP.len() - 1) as f32;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(RAMP.len() - 2);
    let local = pos - i as f32;

    let (r0, g0, b0) = RAMP[i];
    let (r1, g1, b1) = RAMP[i + 1];
    let a: LinSrgb = Srgb::new(r0, g0, b0).into_linear();
    let b: LinSrgb = Srgb::new(r1, g1, b1).into_linear();
    let mixed: Srgb = Srgb::from_linear(a.mix(b, local));
    to_color32(mixed)
}

/// Human label for a rate tick.
pub fn format_rate(value: f64) -> String {
    if value >= 1.0 {
        format!("{value:.0}")
    } else {
        let digits = (-value.log10() - 1e-9).ceil().max(1.0) as usize;
        format!("{value:.digits$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_clamps_to_domain() {
        assert!(RATE_DOMAIN.normalize(0.0).abs() < 1e-12);
        assert!(RATE_DOMAIN.normalize(0.001).abs() < 1e-12);
        assert!((RATE_DOMAIN.normalize(5000.0) - 1.0).abs() < 1e-12);
        assert!((RATE_DOMAIN.normalize(1.0) - 0.4).abs() < 1e-12);
        assert_eq!(RATE_DOMAIN.color(1e-9), RATE_DOMAIN.color(0.01));
        assert_eq!(RATE_DOMAIN.color(1e9), RATE_DOMAIN.color(1000.0));
    }

    #[test]
    fn decades_span_domain() {
        let decades = RATE_DOMAIN.decades();
        let expected = [0.01, 0.1, 1.0, 10.0, 100.0, 1000.0];
        assert_eq!(decades.len(), expected.len());
        for (d, e) in decades.iter().zip(expected) {
            assert!((d - e).abs() < 1e-12 * e);
        }
    }

    #[test]
    fn ramp_endpoints() {
        // 0.267 * 255 ≈ 68, 0.992 * 255 ≈ 253
        assert!((ramp_color(0.0).r() as i32 - 68).abs() <= 1);
        assert!((ramp_color(1.0).r() as i32 - 253).abs() <= 1);
        assert_ne!(ramp_color(0.3), ramp_color(0.7));
    }

    #[test]
    fn palette_gives_distinct_country_colors() {
        let countries: Vec<String> = ["Austria", "Spain", "Turkey"].map(String::from).into();
        let map = ColorMap::new(&countries);
        assert_ne!(map.color_for("Austria"), map.color_for("Spain"));
        assert_eq!(map.color_for("Narnia"), Color32::GRAY);
    }

    #[test]
    fn rate_labels() {
        assert_eq!(format_rate(0.01), "0.01");
        assert_eq!(format_rate(0.1), "0.1");
        assert_eq!(format_rate(100.0), "100");
    }
}
