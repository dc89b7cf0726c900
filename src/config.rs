//! Settings file: toggle hotkey, named profiles and profile history.
//!
//! The engine never reads or writes this file; the CLI loads a profile and
//! pushes it into the engine with [`Profile::to_params`].

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::{ClickerError, Result};
use crate::hotkey::HotkeySpec;
use crate::keys::parse_key_token;
use crate::params::{
    clamp_interval, clamp_seconds, Action, Burst, ClickMode, EngineParams, Point,
};

/// Most history entries kept in the settings file.
pub const MAX_HISTORY: usize = 10;

/// Deserialize a field, falling back to its default when the stored value
/// is not understood (an unknown enum name, a wrong type).
fn lenient<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Profiles map where an entry that is not a profile object is replaced by
/// the default profile.
fn lenient_profiles<'de, D>(de: D) -> std::result::Result<BTreeMap<String, Profile>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    let serde_json::Value::Object(entries) = value else {
        warn!("profiles is not an object; ignoring it");
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .map(|(name, raw)| {
            let profile = Profile::deserialize(raw).unwrap_or_else(|e| {
                warn!(profile = %name, error = %e, "unreadable profile replaced with defaults");
                Profile::default()
            });
            (name, profile)
        })
        .collect())
}

/// History list with unreadable entries dropped.
fn lenient_history<'de, D>(de: D) -> std::result::Result<Vec<HistoryEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    let serde_json::Value::Array(items) = value else {
        warn!("profiles_history is not a list; ignoring it");
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|raw| match HistoryEntry::deserialize(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "dropping unreadable history entry");
                None
            }
        })
        .collect())
}

/// Target-position strategy as stored in a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickModeKind {
    #[default]
    Follow,
    Fixed,
    RandomRect,
    Recorded,
}

/// Mode-specific coordinates. Missing values take the defaults used by
/// [`Profile::to_params`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClickParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<i32>,
}

/// One named set of engine parameters, in its persisted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(deserialize_with = "lenient")]
    pub button: Action,
    pub delay_ms: i64,
    /// Missing means "inferred from `burst1_sec`".
    #[serde(default)]
    pub burst1_enabled: Option<bool>,
    pub burst1_sec: i64,
    pub burst1_ms: i64,
    #[serde(default)]
    pub burst2_enabled: Option<bool>,
    pub burst2_sec: i64,
    pub burst2_ms: i64,
    pub normal_sec: i64,
    #[serde(deserialize_with = "lenient")]
    pub click_mode: ClickModeKind,
    #[serde(deserialize_with = "lenient")]
    pub click_params: ClickParams,
    pub key_to_repeat: Option<String>,
    pub key_sequence: Vec<String>,
    pub recorded_points: Vec<Point>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            button: Action::Left,
            delay_ms: 100,
            burst1_enabled: None,
            burst1_sec: 0,
            burst1_ms: 50,
            burst2_enabled: None,
            burst2_sec: 0,
            burst2_ms: 20,
            normal_sec: 0,
            click_mode: ClickModeKind::Follow,
            click_params: ClickParams::default(),
            key_to_repeat: None,
            key_sequence: Vec::new(),
            recorded_points: Vec::new(),
        }
    }
}

impl Profile {
    /// Fill in fields older files leave out and normalize key tokens.
    pub fn migrated(mut self) -> Self {
        self.burst1_enabled = Some(self.burst1_enabled.unwrap_or(self.burst1_sec > 0));
        self.burst2_enabled = Some(self.burst2_enabled.unwrap_or(self.burst2_sec > 0));
        self.key_sequence = self
            .key_sequence
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Convert to a clamped engine snapshot. Unusable key tokens are
    /// dropped.
    pub fn to_params(&self) -> EngineParams {
        let p = &self.click_params;
        let click_mode = match self.click_mode {
            ClickModeKind::Follow => ClickMode::Follow,
            ClickModeKind::Fixed => {
                ClickMode::Fixed(Point::new(p.x.unwrap_or(0), p.y.unwrap_or(0)))
            }
            ClickModeKind::RandomRect => ClickMode::RandomRect {
                x1: p.x1.unwrap_or(0),
                x2: p.x2.unwrap_or(100),
                y1: p.y1.unwrap_or(0),
                y2: p.y2.unwrap_or(100),
            },
            ClickModeKind::Recorded => ClickMode::Recorded,
        };

        let key_to_repeat = self
            .key_to_repeat
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .and_then(|t| match parse_key_token(t) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(error = %e, "ignoring key_to_repeat");
                    None
                }
            });

        let key_sequence = self
            .key_sequence
            .iter()
            .filter_map(|t| match parse_key_token(t) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(error = %e, "dropping key sequence token");
                    None
                }
            })
            .collect();

        EngineParams {
            action: self.button,
            delay_ms: clamp_interval(self.delay_ms),
            burst1: Burst {
                enabled: self.burst1_enabled.unwrap_or(self.burst1_sec > 0),
                duration_sec: clamp_seconds(self.burst1_sec),
                interval_ms: clamp_interval(self.burst1_ms),
            },
            burst2: Burst {
                enabled: self.burst2_enabled.unwrap_or(self.burst2_sec > 0),
                duration_sec: clamp_seconds(self.burst2_sec),
                interval_ms: clamp_interval(self.burst2_ms),
            },
            normal_duration_sec: clamp_seconds(self.normal_sec),
            click_mode,
            key_to_repeat,
            key_sequence,
            recorded_points: self.recorded_points.clone(),
        }
    }
}

/// A saved snapshot of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    /// Unix seconds.
    pub at: i64,
    #[serde(default)]
    pub data: Profile,
}

/// Contents of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hotkey: String,
    pub start_minimized: bool,
    #[serde(deserialize_with = "lenient_profiles")]
    pub profiles: BTreeMap<String, Profile>,
    pub last_profile: Option<String>,
    #[serde(deserialize_with = "lenient_history")]
    pub profiles_history: Vec<HistoryEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: "Ctrl+Alt".to_string(),
            start_minimized: false,
            profiles: BTreeMap::new(),
            last_profile: None,
            profiles_history: Vec::new(),
        }
    }
}

impl Config {
    /// Load and migrate a settings file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClickerError::config_load(path, e.to_string()))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ClickerError::config_load(path, e.to_string()))?;
        debug!(path, profiles = config.profiles.len(), "config loaded");
        Ok(config.migrated())
    }

    /// Load `path`, or return defaults when it does not exist yet.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            debug!(path, "no config file; using defaults");
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClickerError::config_save(path, e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ClickerError::config_save(path, e.to_string()))?;
        debug!(path, "config saved");
        Ok(())
    }

    /// Apply the migration rules to every profile and history entry.
    pub fn migrated(mut self) -> Self {
        self.profiles = std::mem::take(&mut self.profiles)
            .into_iter()
            .map(|(name, profile)| (name, profile.migrated()))
            .collect();

        let dangling = self
            .last_profile
            .as_ref()
            .is_some_and(|name| !self.profiles.contains_key(name));
        if dangling {
            warn!(profile = ?self.last_profile, "last profile no longer exists");
            self.last_profile = None;
        }

        let excess = self.profiles_history.len().saturating_sub(MAX_HISTORY);
        self.profiles_history.drain(..excess);
        for entry in &mut self.profiles_history {
            entry.data = std::mem::take(&mut entry.data).migrated();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.hotkey_spec()?;

        if let Some(name) = &self.last_profile {
            if !self.profiles.contains_key(name) {
                return Err(ClickerError::config_validation(format!(
                    "last_profile '{name}' does not exist"
                )));
            }
        }

        if self.profiles.keys().any(|name| name.trim().is_empty()) {
            return Err(ClickerError::config_validation(
                "profile names cannot be empty",
            ));
        }

        Ok(())
    }

    pub fn hotkey_spec(&self) -> Result<HotkeySpec> {
        self.hotkey.parse()
    }

    /// The stored hotkey, or the default combo when it does not parse.
    pub fn hotkey_or_default(&self) -> HotkeySpec {
        self.hotkey_spec().unwrap_or_else(|e| {
            warn!(error = %e, "keeping default hotkey");
            HotkeySpec::default()
        })
    }

    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ClickerError::ProfileNotFound(name.to_string()))
    }

    /// The last used profile, if any.
    pub fn active_profile(&self) -> Option<(&str, &Profile)> {
        let name = self.last_profile.as_deref()?;
        self.profiles.get(name).map(|p| (name, p))
    }

    /// Insert or replace a profile and make it the last used one.
    pub fn upsert_profile(&mut self, name: impl Into<String>, profile: Profile) {
        let name = name.into();
        self.profiles.insert(name.clone(), profile.migrated());
        self.last_profile = Some(name);
    }

    /// Append a history snapshot, keeping the newest [`MAX_HISTORY`].
    pub fn push_history(&mut self, name: impl Into<String>, profile: Profile, at: i64) {
        self.profiles_history.push(HistoryEntry {
            name: name.into(),
            at,
            data: profile.migrated(),
        });
        let excess = self.profiles_history.len().saturating_sub(MAX_HISTORY);
        self.profiles_history.drain(..excess);
    }
}

/// Parse a duration such as `500ms`, `2s`, `1m` or a bare millisecond count.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(ClickerError::invalid_duration(value, "empty duration"));
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    if number.is_empty() {
        return Err(ClickerError::invalid_duration(value, "missing number"));
    }
    let amount: u64 = number
        .parse()
        .map_err(|_| ClickerError::invalid_duration(value, "number out of range"))?;

    match unit.trim() {
        "" | "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
        other => Err(ClickerError::invalid_duration(
            value,
            format!("unknown unit '{other}'"),
        )),
    }
}
