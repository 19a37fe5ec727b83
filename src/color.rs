use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

use crate::config::ThemeConfig;
use crate::data::model::Era;
use crate::error::ThemeError;

pub type Rgb8 = Srgb<u8>;

const GRAY: Rgb8 = Srgb::new(128, 128, 128);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb8> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Srgb::new(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex(field: &str, value: &str) -> Result<Rgb8, ThemeError> {
    value.parse::<Rgb8>().map_err(|_| ThemeError::InvalidColor {
        field: field.to_string(),
        value: value.to_string(),
    })
}

pub fn to_hex(c: Rgb8) -> String {
    format!("#{:02x}{:02x}{:02x}", c.red, c.green, c.blue)
}

// ---------------------------------------------------------------------------
// Theme: era colours and fixed palettes, resolved once at startup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub pre: Rgb8,
    pub post: Rgb8,
    pub cutoff_line: Rgb8,
    pub cumulative: Rgb8,
    pub class_years: Vec<Rgb8>,
}

impl Theme {
    pub fn from_config(cfg: &ThemeConfig) -> Result<Self, ThemeError> {
        Ok(Theme {
            pre: parse_hex("pre", &cfg.pre)?,
            post: parse_hex("post", &cfg.post)?,
            cutoff_line: parse_hex("cutoff_line", &cfg.cutoff_line)?,
            cumulative: parse_hex("cumulative", &cfg.cumulative)?,
            class_years: cfg
                .class_years
                .iter()
                .enumerate()
                .map(|(i, c)| parse_hex(&format!("class_years[{i}]"), c))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn era_color(&self, era: Era) -> Rgb8 {
        match era {
            Era::Pre => self.pre,
            Era::Post => self.post,
        }
    }

    /// Colour of the `i`-th class-year layer, cycling through the palette.
    pub fn class_year_color(&self, i: usize) -> Rgb8 {
        if self.class_years.is_empty() {
            return GRAY;
        }
        self.class_years[i % self.class_years.len()]
    }
}

// ---------------------------------------------------------------------------
// Color mapping: group key → colour
// ---------------------------------------------------------------------------

/// Maps group keys (positions, sports) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Rgb8>,
    default_color: Rgb8,
}

impl ColorMap {
    /// Build a colour map for the given keys, in the order given.
    pub fn new(keys: &[String]) -> Self {
        let palette = generate_palette(keys.len());
        let mapping: BTreeMap<String, Rgb8> = keys
            .iter()
            .cloned()
            .zip(palette)
            .collect();

        ColorMap {
            mapping,
            default_color: GRAY,
        }
    }

    pub fn color_for(&self, key: &str) -> Rgb8 {
        self.mapping.get(key).copied().unwrap_or(self.default_color)
    }

    /// Return the legend entries (key → colour).
    pub fn legend_entries(&self) -> Vec<(String, Rgb8)> {
        self.mapping.iter().map(|(k, c)| (k.clone(), *c)).collect()
    }
}
