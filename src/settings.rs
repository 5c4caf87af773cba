use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::charts::TopN;
use crate::charts::breakdown::BreakdownSettings;
use crate::charts::distribution::DistributionSettings;
use crate::charts::timeline::TimelineSettings;
use crate::charts::trend_pulse::TrendPulseSettings;
use crate::data::payload::DISTRIBUTION_FACETS;

/// On-screen chart configuration, saved to and restored from JSON.
/// Missing fields take their defaults so older files keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub distribution: DistributionSettings,
    pub breakdown: BreakdownSettings,
    pub trend_pulse: TrendPulseSettings,
    pub timeline: TimelineSettings,
}

impl DashboardSettings {
    /// Defaults with every "top N" display limited to `n`.
    pub fn with_top_n(n: usize) -> Self {
        let top = TopN::Top(n).or_default_if_empty();
        let mut s = DashboardSettings::default();
        s.distribution.top_n = top;
        s.breakdown.top_n = top;
        s.trend_pulse.top_n = top;
        s
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        let settings: DashboardSettings = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        log::info!("Loaded chart settings from {}", path.display());
        Ok(settings.repaired())
    }

    /// Replace values no chart can show with their defaults.
    pub fn repaired(mut self) -> Self {
        if !DISTRIBUTION_FACETS.contains(&self.distribution.group_by) {
            log::warn!(
                "cannot group salaries by {}; using {}",
                self.distribution.group_by,
                DistributionSettings::default().group_by
            );
            self.distribution.group_by = DistributionSettings::default().group_by;
        }
        self.distribution.top_n = self.distribution.top_n.or_default_if_empty();
        self.breakdown.top_n = self.breakdown.top_n.or_default_if_empty();
        self.trend_pulse.top_n = self.trend_pulse.top_n.or_default_if_empty();
        self
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("Failed to serialise settings")?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write settings {}", path.display()))?;
        log::info!("Saved chart settings to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Granularity;
    use crate::charts::distribution::DistributionStyle;
    use crate::data::model::Facet;

    #[test]
    fn saved_settings_load_back() {
        let mut settings = DashboardSettings::with_top_n(5);
        settings.distribution.style = DistributionStyle::Density;
        settings.distribution.group_by = Facet::Industry;
        settings.timeline.granularity = Granularity::Weekly;
        settings.breakdown.top_n = TopN::All;

        let path = std::env::temp_dir().join("jobscope_settings_test.json");
        settings.save(&path).unwrap();
        let loaded = DashboardSettings::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let settings: DashboardSettings =
            serde_json::from_str(r#"{"timeline": {"granularity": "Quarterly"}}"#).unwrap();
        assert_eq!(settings.timeline.granularity, Granularity::Quarterly);
        assert_eq!(settings.distribution, DistributionSettings::default());
    }

    #[test]
    fn unusable_values_fall_back_to_defaults() {
        let text = r#"{
            "distribution": {"group_by": "Location", "top_n": {"Top": 0}},
            "breakdown": {"top_n": {"Top": 0}},
            "trend_pulse": {"top_n": "All"}
        }"#;
        let path = std::env::temp_dir().join("jobscope_settings_repair.json");
        fs::write(&path, text).unwrap();
        let loaded = DashboardSettings::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.distribution.group_by, Facet::ExperienceLevel);
        assert_eq!(loaded.distribution.top_n, TopN::default());
        assert_eq!(loaded.breakdown.top_n, TopN::default());
        assert_eq!(loaded.trend_pulse.top_n, TopN::All);
        assert_eq!(DashboardSettings::with_top_n(0).breakdown.top_n, TopN::default());
    }

    #[test]
    fn unreadable_files_are_errors() {
        let missing = std::env::temp_dir().join("jobscope_settings_missing.json");
        assert!(DashboardSettings::load(&missing).is_err());
    }
}
