//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - API endpoint and request timeout
//! - Countdown cadence and advance policy for check-in steps
//! - Breathing preset for the standalone exercise
//! - Optional custom step list for the quick check-in
//!
//! Configuration is stored at `~/.config/stillpoint/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, TimelineError};
use crate::session::SessionPlan;
use crate::timer::{AdvancePolicy, PhaseTimeline, StepList, DEFAULT_CADENCE_MS};

/// Backend API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Step countdown behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cadence_ms")]
    pub cadence_ms: u64,
    #[serde(default)]
    pub advance_policy: AdvancePolicy,
}

/// Standalone breathing exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathingConfig {
    #[serde(default = "default_breathing_preset")]
    pub preset: String,
    /// Cycles before the exercise ends on its own. 0 runs until interrupted.
    #[serde(default)]
    pub cycles: u32,
    /// Overrides `preset` when set.
    #[serde(default)]
    pub custom: Option<PhaseTimeline>,
}

/// Quick check-in wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinConfig {
    #[serde(default = "default_checkin_preset")]
    pub breathing_preset: String,
    /// Index of the breathing step; defaults to the last step.
    #[serde(default)]
    pub breathing_step: Option<usize>,
    #[serde(default)]
    pub custom_steps: Option<StepList>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/stillpoint/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub breathing: BreathingConfig,
    #[serde(default)]
    pub checkin: CheckinConfig,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_cadence_ms() -> u64 {
    DEFAULT_CADENCE_MS
}
fn default_breathing_preset() -> String {
    "exercise".into()
}
fn default_checkin_preset() -> String {
    "quick".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cadence_ms: default_cadence_ms(),
            advance_policy: AdvancePolicy::Auto,
        }
    }
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            preset: default_breathing_preset(),
            cycles: 0,
            custom: None,
        }
    }
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            breathing_preset: default_checkin_preset(),
            breathing_step: None,
            custom_steps: None,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                // Unset optional: accept JSON, fall back to a plain string.
                serde_json::Value::Null => serde_json::from_str(value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path` or create it with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key.
    ///
    /// The whole config is re-validated by deserializing it, so a value of
    /// the wrong shape leaves `self` untouched.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Timeline for the standalone breathing exercise.
    pub fn breathing_timeline(&self) -> Result<PhaseTimeline, TimelineError> {
        if let Some(custom) = &self.breathing.custom {
            custom.validate()?;
            return Ok(custom.clone());
        }
        PhaseTimeline::preset(&self.breathing.preset).ok_or_else(|| {
            TimelineError::InvalidTimeline(format!(
                "unknown breathing preset '{}'",
                self.breathing.preset
            ))
        })
    }

    /// The quick check-in plan with any configured overrides applied.
    pub fn session_plan(&self) -> Result<SessionPlan, TimelineError> {
        let mut plan = SessionPlan::quick_checkin();
        if let Some(steps) = &self.checkin.custom_steps {
            plan.steps = steps.clone();
            plan.breathing_step = steps.last_index();
        }
        if let Some(index) = self.checkin.breathing_step {
            plan.breathing_step = index;
        }
        plan.breathing_timeline = PhaseTimeline::preset(&self.checkin.breathing_preset)
            .ok_or_else(|| {
                TimelineError::InvalidTimeline(format!(
                    "unknown breathing preset '{}'",
                    self.checkin.breathing_preset
                ))
            })?;
        plan.policy = self.session.advance_policy;
        plan.cadence_ms = self.session.cadence_ms.max(1);
        plan.validate()?;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Step;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.api.base_url, "http://localhost:8000/api");
        assert_eq!(parsed.session.cadence_ms, 1000);
        assert_eq!(parsed.breathing.preset, "exercise");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("api.timeout_secs").as_deref(), Some("10"));
        assert_eq!(cfg.get("session.advance_policy").as_deref(), Some("auto"));
        assert!(cfg.get("api.missing_key").is_none());
        assert!(cfg.get("checkin.breathing_step").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("api.base_url", "https://example.test/api").unwrap();
        cfg.apply("session.cadence_ms", "250").unwrap();
        cfg.apply("session.advance_policy", "hold").unwrap();
        cfg.apply("checkin.breathing_step", "1").unwrap();

        assert_eq!(cfg.api.base_url, "https://example.test/api");
        assert_eq!(cfg.session.cadence_ms, 250);
        assert_eq!(cfg.session.advance_policy, AdvancePolicy::Hold);
        assert_eq!(cfg.checkin.breathing_step, Some(1));
    }

    #[test]
    fn apply_fills_unset_optional_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.apply(
            "breathing.custom",
            r#"{"phases":[{"name":"In","duration_ms":3000,"visual_target":150.0},{"name":"Out","duration_ms":5000,"visual_target":80.0}]}"#,
        )
        .unwrap();
        cfg.apply(
            "checkin.custom_steps",
            r#"{"steps":[{"title":"Mood","duration_ms":5000,"collects":"mood"},{"title":"Breathe","duration_ms":20000}]}"#,
        )
        .unwrap();

        let timeline = cfg.breathing_timeline().unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.rest_target, 100.0);
        assert_eq!(cfg.session_plan().unwrap().breathing_step, 1);

        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn unset_optionals_are_omitted_from_toml() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(!toml_str.contains("custom"));
        assert!(!toml_str.contains("breathing_step"));
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("api.nonexistent", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.apply("", "x"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn apply_rejects_bad_value_and_keeps_state() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("api.timeout_secs", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.apply("session.advance_policy", "sometimes").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.apply("breathing.preset", "home").unwrap();
        cfg.apply("breathing.cycles", "3").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.breathing.preset, "home");
        assert_eq!(loaded.breathing.cycles, 3);
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api = [").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn default_session_plan_is_quick_checkin() {
        let plan = Config::default().session_plan().unwrap();
        assert_eq!(plan, SessionPlan::quick_checkin());
    }

    #[test]
    fn custom_steps_put_breathing_last() {
        let mut cfg = Config::default();
        cfg.checkin.custom_steps = Some(
            StepList::new(vec![
                Step::new("Settle", 5_000),
                Step::new("Breathe", 30_000),
            ])
            .unwrap(),
        );
        let plan = cfg.session_plan().unwrap();
        assert_eq!(plan.breathing_step, 1);
        assert_eq!(plan.steps.len(), 2);
    }

    #[test]
    fn out_of_range_breathing_step_is_rejected() {
        let mut cfg = Config::default();
        cfg.checkin.breathing_step = Some(9);
        assert!(matches!(
            cfg.session_plan(),
            Err(TimelineError::InvalidStepList(_))
        ));
    }

    #[test]
    fn breathing_preset_lookup() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.breathing_timeline().unwrap(),
            PhaseTimeline::guided_exercise()
        );
        cfg.breathing.preset = "box".into();
        assert!(cfg.breathing_timeline().is_err());
    }
}
