//! Custom error types for autoclicker.
//!
//! This module provides structured error types using `thiserror`. Nothing in
//! the engine is fatal: these errors surface from parsing, configuration and
//! the input backends, and the engine degrades to "skip this tick" or "keep
//! the prior value" when it sees one.

use thiserror::Error;

/// Main error type for autoclicker operations.
#[derive(Error, Debug)]
pub enum ClickerError {
    /// The specified key token is invalid or unsupported.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Error parsing a hotkey combination.
    #[error("invalid hotkey '{spec}': {reason}")]
    InvalidHotkey { spec: String, reason: String },

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// Named profile does not exist in the configuration.
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// The OS refused a synthesized click, key press or pointer move.
    #[error("failed to {action}: {reason}")]
    InputFailed { action: String, reason: String },

    /// The input backend could not be created.
    #[error("input backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Error starting or running the global key hook.
    #[error("key hook error: {0}")]
    KeyHook(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for autoclicker operations.
pub type Result<T> = std::result::Result<T, ClickerError>;

impl ClickerError {
    /// Create a new InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidHotkey error.
    pub fn invalid_hotkey(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHotkey {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigValidation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Create a new ConfigLoad error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigSave error.
    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidDuration error.
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InputFailed error.
    pub fn input_failed(action: impl Into<String>, reason: impl ToString) -> Self {
        Self::InputFailed {
            action: action.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new BackendUnavailable error.
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable(message.into())
    }

    /// Create a new KeyHook error.
    pub fn key_hook(message: impl Into<String>) -> Self {
        Self::KeyHook(message.into())
    }
}
