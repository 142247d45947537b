use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt::Display, str::FromStr};

/// An sRGB color with 8-bit channels
///
/// Serialized as the space-separated triple `"R G B"`, the form the styling
/// layer drops straight into `rgb(var(--accent))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channels = s
            .split_whitespace()
            .map(|part| {
                part.parse::<u8>()
                    .map_err(|_| format!("invalid color channel '{}'", part))
            })
            .collect::<Result<Vec<u8>, String>>()?;

        match channels.as_slice() {
            [r, g, b] => Ok(Rgb::new(*r, *g, *b)),
            _ => Err(format!("expected three channels, got {}", channels.len())),
        }
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb::new(r, g, b)
    }
}

/// Channel extrema of a normalized sRGB pixel
///
/// Shared by the full RGB → HSL conversion and the per-pixel filter of the
/// dominant-hue extractor, which needs lightness and delta before deciding
/// whether hue is worth computing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Chroma {
    r: f64,
    g: f64,
    b: f64,
    max: f64,
    pub lightness: f64,
    pub delta: f64,
}

impl Chroma {
    pub fn of(rgb: Rgb) -> Self {
        let r = f64::from(rgb.r) / 255.0;
        let g = f64::from(rgb.g) / 255.0;
        let b = f64::from(rgb.b) / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);

        Self {
            r,
            g,
            b,
            max,
            lightness: (max + min) / 2.0,
            delta: max - min,
        }
    }

    /// Saturation in [0, 1]
    pub fn saturation(&self) -> f64 {
        if self.delta == 0.0 {
            return 0.0;
        }
        self.delta / (1.0 - (2.0 * self.lightness - 1.0).abs())
    }

    /// Hue as a fraction of a full turn, in [0, 1)
    pub fn hue_turns(&self) -> f64 {
        let Self { r, g, b, max, delta, .. } = *self;
        if delta == 0.0 {
            return 0.0;
        }

        if max == r {
            ((g - b) / delta + if g < b { 6.0 } else { 0.0 }) / 6.0
        } else if max == g {
            ((b - r) / delta + 2.0) / 6.0
        } else {
            ((r - g) / delta + 4.0) / 6.0
        }
    }
}

/// HSL color: hue in degrees, saturation and lightness in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub const fn new(h: f64, s: f64, l: f64) -> Self {
        Self { h, s, l }
    }

    /// Converts to sRGB.
    ///
    /// Hue wraps into [0, 360); saturation and lightness are clamped to
    /// [0, 100]. Channels are rounded to the nearest integer.
    pub fn to_rgb(self) -> Rgb {
        let h = self.h.rem_euclid(360.0) / 360.0;
        let s = self.s.clamp(0.0, 100.0) / 100.0;
        let l = self.l.clamp(0.0, 100.0) / 100.0;

        if s == 0.0 {
            let v = to_channel(l);
            return Rgb::new(v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        Rgb::new(
            to_channel(hue_to_rgb(p, q, h + 1.0 / 3.0)),
            to_channel(hue_to_rgb(p, q, h)),
            to_channel(hue_to_rgb(p, q, h - 1.0 / 3.0)),
        )
    }
}

impl From<Rgb> for Hsl {
    fn from(rgb: Rgb) -> Self {
        let chroma = Chroma::of(rgb);
        Hsl::new(
            chroma.hue_turns() * 360.0,
            chroma.saturation() * 100.0,
            chroma.lightness * 100.0,
        )
    }
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_channel(unit: f64) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}
