use crate::types::Config;
use anyhow::{ensure, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config = Self::from_yaml(&contents)?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty file deserializes to unit, not to a mapping
        let config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse config")?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.detection.confidence_threshold;
        ensure!(
            (0.0..=1.0).contains(&threshold),
            "detection.confidence_threshold must be within [0, 1], got {}",
            threshold
        );
        ensure!(
            self.tracking.match_radius_px > 0.0,
            "tracking.match_radius_px must be positive"
        );
        ensure!(
            self.tracking.ghost_cleanup_seconds > 0.0,
            "tracking.ghost_cleanup_seconds must be positive"
        );
        ensure!(
            self.ownership.owner_search_radius_px > 0.0,
            "ownership.owner_search_radius_px must be positive"
        );
        ensure!(
            self.anomaly.owner_grace_period_seconds >= 0.0,
            "anomaly.owner_grace_period_seconds must not be negative"
        );
        ensure!(
            self.anomaly.unattended_threshold_seconds >= 0.0,
            "anomaly.unattended_threshold_seconds must not be negative"
        );
        ensure!(
            self.pipeline.event_bus_capacity > 0,
            "pipeline.event_bus_capacity must be positive"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{AlertPolicy, ClassGroup, Config, MatchStrategy};

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.detection.confidence_threshold, 0.5);
        assert_eq!(config.tracking.match_radius_px, 75.0);
        assert_eq!(config.ownership.owner_search_radius_px, 250.0);
        assert_eq!(config.tracking.ghost_cleanup_seconds, 3.0);
        assert_eq!(config.anomaly.owner_grace_period_seconds, 1.0);
        assert_eq!(config.anomaly.unattended_threshold_seconds, 2.0);
        assert_eq!(config.anomaly.alert_policy, AlertPolicy::OncePerEpisode);
        assert_eq!(config.tracking.match_strategy, MatchStrategy::FirstMatch);
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let yaml = "tracking:\n  match_radius_px: 40\nanomaly:\n  alert_policy: every_frame\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.tracking.match_radius_px, 40.0);
        assert_eq!(config.tracking.ghost_cleanup_seconds, 3.0);
        assert_eq!(config.anomaly.alert_policy, AlertPolicy::EveryFrame);
        assert_eq!(config.anomaly.unattended_threshold_seconds, 2.0);
    }

    #[test]
    fn test_class_groups_extendable_from_config() {
        let yaml = "detection:\n  class_groups:\n    person: person\n    briefcase: bag\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(
            config.detection.class_groups.get("briefcase"),
            Some(&ClassGroup::Bag)
        );
        assert!(!config.detection.class_groups.contains_key("backpack"));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Config::from_yaml("detection:\n  confidence_threshold: 1.5\n").is_err());
        assert!(Config::from_yaml("tracking:\n  match_radius_px: 0\n").is_err());
        assert!(Config::from_yaml("ownership:\n  owner_search_radius_px: -5\n").is_err());
        assert!(Config::from_yaml("pipeline:\n  event_bus_capacity: 0\n").is_err());
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = Config::from_yaml(include_str!("../config.yaml")).unwrap();
        assert_eq!(config.detection.class_groups.len(), 5);
        assert!(config.io.alerts_path.is_none());
    }
}
