use crate::graph::Rgb;
use serde::{Deserialize, Serialize};

/// Parameters of the column color ramp: fixed hue and saturation, lightness
/// spread over the columns with `lightness_margin` kept free at both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub hue: f64,
    pub saturation: f64,
    pub lightness_margin: f64,
    pub new_node_color: Rgb,
}

impl Theme {
    pub fn journey_blue() -> Self {
        Self {
            hue: 217.0,
            saturation: 0.6,
            lightness_margin: 0.2,
            new_node_color: [102, 153, 204],
        }
    }

    pub fn grayscale() -> Self {
        Self {
            hue: 0.0,
            saturation: 0.0,
            lightness_margin: 0.15,
            new_node_color: [160, 160, 160],
        }
    }

    /// Exactly `columns` colors, darkest first.
    pub fn ramp(&self, columns: usize) -> Vec<Rgb> {
        if columns == 0 {
            return Vec::new();
        }
        let margin = self.lightness_margin.clamp(0.0, 0.5);
        let step = (1.0 - 2.0 * margin) / columns as f64;
        (0..columns)
            .map(|idx| hsl_to_rgb(self.hue / 360.0, self.saturation, margin + idx as f64 * step))
            .collect()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::journey_blue()
    }
}

/// `h`, `s` and `l` all in `0..=1`.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    };
    [to_byte(r), to_byte(g), to_byte(b)]
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

fn to_byte(channel: f64) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}
