use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

use crate::data::model::{EmploymentType, ExperienceLevel, Facet, JobDataset};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Colour of anything without a mapping.
pub const DEFAULT_COLOR: Color32 = Color32::GRAY;

/// Cell colour used when a sequential scale cannot be built.
pub const FALLBACK_CELL_COLOR: Color32 = Color32::from_rgb(0xCC, 0xCC, 0xCC);

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Fixed colours for closed vocabularies
// ---------------------------------------------------------------------------

impl ExperienceLevel {
    pub fn color(&self) -> Color32 {
        match self {
            ExperienceLevel::Entry => Color32::from_rgb(0x4E, 0x9F, 0xDE),
            ExperienceLevel::Mid => Color32::from_rgb(0x3C, 0xB4, 0x8A),
            ExperienceLevel::Senior => Color32::from_rgb(0xE8, 0x8A, 0x2E),
            ExperienceLevel::Executive => Color32::from_rgb(0xC2, 0x4E, 0x8C),
            ExperienceLevel::Other(_) => DEFAULT_COLOR,
        }
    }
}

impl EmploymentType {
    pub fn color(&self) -> Color32 {
        match self {
            EmploymentType::FullTime => Color32::from_rgb(0x5B, 0x8F, 0xF9),
            EmploymentType::PartTime => Color32::from_rgb(0x61, 0xDD, 0xAA),
            EmploymentType::Contract => Color32::from_rgb(0xF6, 0xBD, 0x16),
            EmploymentType::Freelance => Color32::from_rgb(0xE8, 0x68, 0x4A),
            EmploymentType::Other(_) => DEFAULT_COLOR,
        }
    }
}

// ---------------------------------------------------------------------------
// Color mapping: open-ended category label → Color32
// ---------------------------------------------------------------------------

/// Maps the labels of one facet to distinct colours.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
}

impl ColorMap {
    /// Build a colour map from a facet's unique labels.
    pub fn new(unique_values: &BTreeSet<String>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values
            .iter()
            .cloned()
            .zip(palette)
            .collect();
        ColorMap { mapping }
    }

    /// Look up the colour for a label, [`DEFAULT_COLOR`] if unmapped.
    pub fn color_for(&self, value: &str) -> Color32 {
        self.mapping.get(value).copied().unwrap_or(DEFAULT_COLOR)
    }
}

/// Every chart resolves category colours through this one table, so the
/// same label is drawn in the same colour everywhere.
#[derive(Debug, Clone, Default)]
pub struct CategoryColors {
    open: BTreeMap<Facet, ColorMap>,
}

impl CategoryColors {
    pub fn for_dataset(dataset: &JobDataset) -> Self {
        let open = [Facet::Location, Facet::Industry, Facet::JobTitle]
            .into_iter()
            .filter_map(|f| dataset.unique_values.get(&f).map(|vals| (f, ColorMap::new(vals))))
            .collect();
        CategoryColors { open }
    }

    pub fn color_for(&self, facet: Facet, value: &str) -> Color32 {
        match facet {
            Facet::ExperienceLevel => ExperienceLevel::parse(value).color(),
            Facet::EmploymentType => EmploymentType::parse(value).color(),
            _ => self
                .open
                .get(&facet)
                .map_or(DEFAULT_COLOR, |m| m.color_for(value)),
        }
    }
}

// ---------------------------------------------------------------------------
// Sequential scale for heatmap cells
// ---------------------------------------------------------------------------

const SCALE_LOW: (f32, f32, f32) = (0.94, 0.97, 1.0);
const SCALE_HIGH: (f32, f32, f32) = (0.03, 0.19, 0.42);

/// Colour for `value` on a light-to-dark scale over `[min, max]`.
///
/// A non-finite value or domain yields [`FALLBACK_CELL_COLOR`]; a flat
/// domain maps everything to the middle of the scale.
pub fn sequential_color(value: f64, min: f64, max: f64) -> Color32 {
    match scale_position(value, min, max) {
        Some(t) => {
            let low = LinSrgb::new(SCALE_LOW.0, SCALE_LOW.1, SCALE_LOW.2);
            let high = LinSrgb::new(SCALE_HIGH.0, SCALE_HIGH.1, SCALE_HIGH.2);
            let mixed: Srgb = Srgb::from_linear(low.mix(high, t));
            to_color32(mixed)
        }
        None => {
            log::warn!("colour scale unavailable for {value} in [{min}, {max}]; using fallback");
            FALLBACK_CELL_COLOR
        }
    }
}

fn scale_position(value: f64, min: f64, max: f64) -> Option<f32> {
    if !value.is_finite() || !min.is_finite() || !max.is_finite() || max < min {
        return None;
    }
    if max == min {
        return Some(0.5);
    }
    Some((((value - min) / (max - min)).clamp(0.0, 1.0)) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(5);
        assert_eq!(p.len(), 5);
        let distinct: BTreeSet<[u8; 4]> = p.iter().map(|c| c.to_array()).collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn unmapped_labels_use_default() {
        let vals: BTreeSet<String> = ["Austin", "Berlin"].iter().map(|s| s.to_string()).collect();
        let map = ColorMap::new(&vals);
        assert_ne!(map.color_for("Austin"), DEFAULT_COLOR);
        assert_eq!(map.color_for("Tokyo"), DEFAULT_COLOR);
    }

    #[test]
    fn closed_vocabularies_have_fixed_colors() {
        let colors = CategoryColors::default();
        assert_eq!(
            colors.color_for(Facet::ExperienceLevel, "Senior-level"),
            ExperienceLevel::Senior.color()
        );
        assert_eq!(colors.color_for(Facet::ExperienceLevel, "Wizard"), DEFAULT_COLOR);
        assert_eq!(colors.color_for(Facet::Industry, "Retail"), DEFAULT_COLOR);
    }

    #[test]
    fn sequential_scale_darkens_with_value() {
        let lo = sequential_color(0.0, 0.0, 10.0);
        let hi = sequential_color(10.0, 0.0, 10.0);
        let sum = |c: Color32| c.r() as u32 + c.g() as u32 + c.b() as u32;
        assert!(sum(lo) > sum(hi));
    }

    #[test]
    fn broken_domains_fall_back() {
        assert_eq!(sequential_color(f64::NAN, 0.0, 1.0), FALLBACK_CELL_COLOR);
        assert_eq!(sequential_color(1.0, 5.0, 1.0), FALLBACK_CELL_COLOR);
        assert_ne!(sequential_color(3.0, 3.0, 3.0), FALLBACK_CELL_COLOR);
    }
}
