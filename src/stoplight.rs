//! Stoplight panel: a hand-authored per-class-year comparison of the two eras.
//!
//! The document is not tabular; it is deserialised directly and only a few
//! values are derived from it (intensity tiers, totals, peaks, changes).

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::Era;
use crate::error::StoplightError;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoplightDocument {
    pub pre_nil: EraLights,
    pub post_nil: EraLights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraLights {
    /// Display label, e.g. `"Pre-NIL (2019-2021)"`.
    pub era: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_transfers: Option<u64>,
    pub lights: Vec<Light>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub class_year: String,
    /// Slot in the stoplight frame, 0 = top.
    pub position: u32,
    pub base_color: String,
    pub count: u64,
    pub rate: f64,
    pub intensity: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_from_pre: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub highlight: bool,
}

impl EraLights {
    /// The stated total, or the sum of light counts when the document omits it.
    pub fn total(&self) -> u64 {
        self.total_transfers
            .unwrap_or_else(|| self.lights.iter().map(|l| l.count).sum())
    }

    /// Class year with the highest rate; the earliest light wins ties.
    pub fn peak(&self) -> Option<&Light> {
        self.lights
            .iter()
            .reduce(|best, l| if l.rate > best.rate { l } else { best })
    }

    pub fn light(&self, class_year: &str) -> Option<&Light> {
        self.lights.iter().find(|l| l.class_year == class_year)
    }
}

/// Load and parse the stoplight JSON document.
pub fn load_stoplight(path: &Path) -> Result<StoplightDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let doc: StoplightDocument = serde_json::from_str(&text)
        .with_context(|| format!("parsing stoplight document {}", path.display()))?;
    log::info!(
        "Loaded stoplight document: {} pre / {} post lights",
        doc.pre_nil.lights.len(),
        doc.post_nil.lights.len()
    );
    Ok(doc)
}

// ---------------------------------------------------------------------------
// Intensity tiers
// ---------------------------------------------------------------------------

/// Discrete brightness level of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntensityTier {
    VeryDim,
    Dim,
    Medium,
    Bright,
}

impl IntensityTier {
    /// Total over all inputs; NaN lands in `Bright` like any value that is
    /// not below a threshold.
    pub fn from_intensity(intensity: f64) -> Self {
        if intensity < 0.20 {
            IntensityTier::VeryDim
        } else if intensity < 0.25 {
            IntensityTier::Dim
        } else if intensity < 0.32 {
            IntensityTier::Medium
        } else {
            IntensityTier::Bright
        }
    }

    pub fn opacity(&self) -> f64 {
        match self {
            IntensityTier::VeryDim => 0.30,
            IntensityTier::Dim => 0.45,
            IntensityTier::Medium => 0.70,
            IntensityTier::Bright => 0.95,
        }
    }
}

/// Lights above this intensity get an outer glow.
pub const GLOW_THRESHOLD: f64 = 0.3;

// ---------------------------------------------------------------------------
// Derived panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LightView {
    pub class_year: String,
    pub era: Era,
    pub position: u32,
    pub base_color: String,
    pub count: u64,
    pub rate: f64,
    pub tier: IntensityTier,
    pub glowing: bool,
    pub change_from_pre: Option<f64>,
    pub highlight: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub pre_total: u64,
    pub post_total: u64,
    pub total_change_pct: Option<f64>,
    pub pre_peak: Option<String>,
    pub post_peak: Option<String>,
    /// Class year with the largest percentage increase.
    pub biggest_riser: Option<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoplightPanel {
    pub pre: Vec<LightView>,
    pub post: Vec<LightView>,
    pub comparison: Comparison,
}

/// `(post / pre - 1) * 100`, undefined for a zero baseline.
pub fn change_pct(pre: f64, post: f64) -> Option<f64> {
    (pre != 0.0).then(|| (post / pre - 1.0) * 100.0)
}

fn view(light: &Light, era: Era, change_from_pre: Option<f64>) -> LightView {
    LightView {
        class_year: light.class_year.clone(),
        era,
        position: light.position,
        base_color: light.base_color.clone(),
        count: light.count,
        rate: light.rate,
        tier: IntensityTier::from_intensity(light.intensity),
        glowing: light.intensity > GLOW_THRESHOLD,
        change_from_pre,
        highlight: light.highlight,
        description: light.description.clone(),
    }
}

/// Check the document and derive everything the panel displays.
///
/// Both eras must list the same class years. A post light without a stated
/// `change_from_pre` gets one computed from the two counts.
pub fn derive_panel(doc: &StoplightDocument) -> Result<StoplightPanel, StoplightError> {
    let (pre, post) = (&doc.pre_nil, &doc.post_nil);
    for era in [pre, post] {
        if era.lights.is_empty() {
            return Err(StoplightError::EmptyEra(era.era.clone()));
        }
    }
    for (a, b) in [(pre, post), (post, pre)] {
        if let Some(l) = a.lights.iter().find(|l| b.light(&l.class_year).is_none()) {
            return Err(StoplightError::UnmatchedClassYear(l.class_year.clone()));
        }
    }

    let pre_views: Vec<LightView> = pre.lights.iter().map(|l| view(l, Era::Pre, None)).collect();
    let post_views: Vec<LightView> = post
        .lights
        .iter()
        .map(|l| {
            let change = l.change_from_pre.or_else(|| {
                let before = pre.light(&l.class_year)?;
                change_pct(before.count as f64, l.count as f64)
            });
            view(l, Era::Post, change)
        })
        .collect();

    let biggest_riser = post_views
        .iter()
        .filter_map(|v| Some((v.class_year.clone(), v.change_from_pre?)))
        .reduce(|best, c| if c.1 > best.1 { c } else { best });

    let comparison = Comparison {
        pre_total: pre.total(),
        post_total: post.total(),
        total_change_pct: change_pct(pre.total() as f64, post.total() as f64),
        pre_peak: pre.peak().map(|l| l.class_year.clone()),
        post_peak: post.peak().map(|l| l.class_year.clone()),
        biggest_riser,
    };

    Ok(StoplightPanel {
        pre: pre_views,
        post: post_views,
        comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(class_year: &str, position: u32, count: u64, rate: f64) -> Light {
        Light {
            class_year: class_year.into(),
            position,
            base_color: "#28a745".into(),
            count,
            rate,
            intensity: rate,
            description: String::new(),
            change_from_pre: None,
            highlight: false,
        }
    }

    fn document() -> StoplightDocument {
        StoplightDocument {
            pre_nil: EraLights {
                era: "Pre-NIL (2019-2021)".into(),
                total_transfers: None,
                lights: vec![
                    light("Freshman", 0, 180, 0.12),
                    light("Sophomore", 1, 350, 0.23),
                    light("Junior", 2, 520, 0.35),
                    light("Senior", 3, 450, 0.30),
                ],
            },
            post_nil: EraLights {
                era: "Post-NIL (2021-2024)".into(),
                total_transfers: None,
                lights: vec![
                    light("Freshman", 0, 420, 0.18),
                    light("Sophomore", 1, 890, 0.38),
                    light("Junior", 2, 680, 0.29),
                    light("Senior", 3, 350, 0.15),
                ],
            },
        }
    }

    #[test]
    fn tiers_follow_fixed_thresholds() {
        assert_eq!(IntensityTier::from_intensity(0.0), IntensityTier::VeryDim);
        assert_eq!(IntensityTier::from_intensity(0.199), IntensityTier::VeryDim);
        assert_eq!(IntensityTier::from_intensity(0.20), IntensityTier::Dim);
        assert_eq!(IntensityTier::from_intensity(0.25), IntensityTier::Medium);
        assert_eq!(IntensityTier::from_intensity(0.3199), IntensityTier::Medium);
        assert_eq!(IntensityTier::from_intensity(0.32), IntensityTier::Bright);
        assert_eq!(IntensityTier::from_intensity(1.5), IntensityTier::Bright);
        assert_eq!(IntensityTier::Dim.opacity(), 0.45);
    }

    #[test]
    fn derives_comparison_panel() {
        let panel = derive_panel(&document()).unwrap();
        let c = &panel.comparison;
        assert_eq!((c.pre_total, c.post_total), (1500, 2340));
        assert_eq!(c.total_change_pct.map(f64::round), Some(56.0));
        assert_eq!(c.pre_peak.as_deref(), Some("Junior"));
        assert_eq!(c.post_peak.as_deref(), Some("Sophomore"));

        let (riser, pct) = c.biggest_riser.clone().unwrap();
        assert_eq!(riser, "Sophomore");
        assert_eq!(pct.round(), 154.0);

        let senior = &panel.post[3];
        assert!(senior.change_from_pre.unwrap() < 0.0);
        assert_eq!(senior.tier, IntensityTier::VeryDim);
        assert!(panel.pre.iter().all(|v| v.change_from_pre.is_none()));
        assert!(panel.post[1].glowing);
        assert!(!panel.post[2].glowing);
    }

    #[test]
    fn stated_change_is_kept() {
        let mut doc = document();
        doc.post_nil.lights[0].change_from_pre = Some(50.0);
        doc.post_nil.total_transfers = Some(9999);
        let panel = derive_panel(&doc).unwrap();
        assert_eq!(panel.post[0].change_from_pre, Some(50.0));
        assert_eq!(panel.comparison.post_total, 9999);
    }

    #[test]
    fn eras_must_list_the_same_class_years() {
        let mut doc = document();
        doc.post_nil.lights.pop();
        assert_eq!(
            derive_panel(&doc).unwrap_err(),
            StoplightError::UnmatchedClassYear("Senior".into())
        );

        let mut doc = document();
        doc.pre_nil.lights.clear();
        assert!(matches!(derive_panel(&doc), Err(StoplightError::EmptyEra(_))));
    }

    #[test]
    fn parses_generated_document_shape() {
        let doc: StoplightDocument = serde_json::from_str(
            r##"{
              "pre_nil": {"era": "Pre-NIL", "total_transfers": 10,
                "lights": [{"class_year": "Junior", "position": 2, "base_color": "#ffc107",
                            "count": 10, "rate": 1.0, "intensity": 1.0, "description": "x"}]},
              "post_nil": {"era": "Post-NIL", "total_transfers": 20,
                "lights": [{"class_year": "Junior", "position": 2, "base_color": "#ffc107",
                            "count": 20, "rate": 1.0, "intensity": 1.0, "description": "y",
                            "change_from_pre": 100.0, "highlight": true}]}
            }"##,
        )
        .unwrap();
        assert!(doc.post_nil.lights[0].highlight);
        assert_eq!(doc.pre_nil.total(), 10);
    }
}
