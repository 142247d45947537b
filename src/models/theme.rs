use serde::{de, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use crate::error::{AppError, AppResult};
use crate::models::Rgb;

/// Fallback background when a theme carries no image of its own
pub const DEFAULT_BACKGROUND_URL: &str = "/bg.png";

/// Named step of the tonal ramp, darkest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PaletteSlot {
    Midnight,
    Deep,
    Dark,
    Surface,
    Card,
    Elevated,
    Border,
    BorderLight,
    Muted,
    Subtle,
    Text,
    TextLight,
    Light,
}

impl PaletteSlot {
    pub const COUNT: usize = 13;

    /// All slots in ramp order
    pub const ALL: [PaletteSlot; Self::COUNT] = [
        PaletteSlot::Midnight,
        PaletteSlot::Deep,
        PaletteSlot::Dark,
        PaletteSlot::Surface,
        PaletteSlot::Card,
        PaletteSlot::Elevated,
        PaletteSlot::Border,
        PaletteSlot::BorderLight,
        PaletteSlot::Muted,
        PaletteSlot::Subtle,
        PaletteSlot::Text,
        PaletteSlot::TextLight,
        PaletteSlot::Light,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaletteSlot::Midnight => "midnight",
            PaletteSlot::Deep => "deep",
            PaletteSlot::Dark => "dark",
            PaletteSlot::Surface => "surface",
            PaletteSlot::Card => "card",
            PaletteSlot::Elevated => "elevated",
            PaletteSlot::Border => "border",
            PaletteSlot::BorderLight => "border-light",
            PaletteSlot::Muted => "muted",
            PaletteSlot::Subtle => "subtle",
            PaletteSlot::Text => "text",
            PaletteSlot::TextLight => "text-light",
            PaletteSlot::Light => "light",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Display for PaletteSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaletteSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaletteSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| format!("unknown palette slot '{}'", s))
    }
}

impl Serialize for PaletteSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaletteSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// The 13-step tonal ramp
///
/// Always holds a color for every slot; serialized as a JSON object keyed by
/// slot name in ramp order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; PaletteSlot::COUNT],
}

impl Palette {
    /// Builds a palette by computing each slot's color
    pub fn from_fn(f: impl FnMut(PaletteSlot) -> Rgb) -> Self {
        Self {
            colors: PaletteSlot::ALL.map(f),
        }
    }

    pub fn get(&self, slot: PaletteSlot) -> Rgb {
        self.colors[slot.index()]
    }

    pub fn set(&mut self, slot: PaletteSlot, color: Rgb) {
        self.colors[slot.index()] = color;
    }

    /// Slots and their colors in ramp order
    pub fn iter(&self) -> impl Iterator<Item = (PaletteSlot, Rgb)> + '_ {
        PaletteSlot::ALL.into_iter().zip(self.colors.iter().copied())
    }
}

impl Serialize for Palette {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PaletteSlot::COUNT))?;
        for (slot, color) in self.iter() {
            map.serialize_entry(slot.as_str(), &color)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Palette {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<PaletteSlot, Rgb>::deserialize(deserializer)?;

        if let Some(missing) = PaletteSlot::ALL
            .into_iter()
            .find(|slot| !entries.contains_key(slot))
        {
            return Err(de::Error::custom(format!(
                "palette is missing slot '{}'",
                missing
            )));
        }

        Ok(Palette::from_fn(|slot| entries[&slot]))
    }
}

/// The application's visual skin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeData {
    /// Background image as a `data:` URL, or `None` for the bundled default
    pub bg_image_data_url: Option<String>,
    pub accent_rgb: Rgb,
    pub accent_light_rgb: Rgb,
    pub palette: Palette,
}

const DEFAULT_PALETTE: [Rgb; PaletteSlot::COUNT] = [
    Rgb::new(8, 15, 12),
    Rgb::new(12, 22, 18),
    Rgb::new(16, 29, 23),
    Rgb::new(24, 45, 35),
    Rgb::new(28, 51, 41),
    Rgb::new(34, 61, 48),
    Rgb::new(43, 77, 60),
    Rgb::new(58, 99, 80),
    Rgb::new(74, 115, 96),
    Rgb::new(106, 148, 128),
    Rgb::new(143, 181, 162),
    Rgb::new(188, 216, 202),
    Rgb::new(220, 238, 228),
];

impl Default for ThemeData {
    /// The stock teal theme
    fn default() -> Self {
        Self {
            bg_image_data_url: None,
            accent_rgb: Rgb::new(16, 185, 129),
            accent_light_rgb: Rgb::new(110, 231, 183),
            palette: Palette {
                colors: DEFAULT_PALETTE,
            },
        }
    }
}

impl ThemeData {
    /// CSS custom properties that skin the UI, in application order
    pub fn css_variables(&self) -> Vec<(String, String)> {
        let mut vars = Vec::with_capacity(PaletteSlot::COUNT + 3);
        vars.push(("--accent".to_string(), self.accent_rgb.to_string()));
        vars.push((
            "--accent-light".to_string(),
            self.accent_light_rgb.to_string(),
        ));

        for (slot, color) in self.palette.iter() {
            vars.push((format!("--fr-{}", slot), color.to_string()));
        }

        let bg_url = match &self.bg_image_data_url {
            Some(data_url) => format!("url(\"{}\")", data_url),
            None => format!("url('{}')", DEFAULT_BACKGROUND_URL),
        };
        vars.push(("--bg-url".to_string(), bg_url));

        vars
    }

    /// Renders the custom properties as a `:root` stylesheet
    pub fn to_stylesheet(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in self.css_variables() {
            css.push_str(&format!("  {}: {};\n", name, value));
        }
        css.push_str("}\n");
        css
    }
}

/// Partial edit of the active theme
///
/// Only the fields listed here may be changed; anything else in the request
/// body is rejected during deserialization. The background can only be
/// replaced by generating a new theme from an image.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ThemeUpdate {
    #[serde(default)]
    pub accent_rgb: Option<Rgb>,
    #[serde(default)]
    pub accent_light_rgb: Option<Rgb>,
    #[serde(default)]
    pub palette: BTreeMap<PaletteSlot, Rgb>,
    #[serde(default)]
    pub clear_background: bool,
}

impl ThemeUpdate {
    pub fn is_empty(&self) -> bool {
        self.accent_rgb.is_none()
            && self.accent_light_rgb.is_none()
            && self.palette.is_empty()
            && !self.clear_background
    }

    /// Produces the updated theme, leaving `theme` untouched
    pub fn apply(&self, theme: &ThemeData) -> AppResult<ThemeData> {
        if self.is_empty() {
            return Err(AppError::InvalidInput(
                "Theme update contains no fields".to_string(),
            ));
        }

        let mut updated = theme.clone();
        if let Some(accent) = self.accent_rgb {
            updated.accent_rgb = accent;
        }
        if let Some(accent_light) = self.accent_light_rgb {
            updated.accent_light_rgb = accent_light;
        }
        for (slot, color) in &self.palette {
            updated.palette.set(*slot, *color);
        }
        if self.clear_background {
            updated.bg_image_data_url = None;
        }

        Ok(updated)
    }
}
