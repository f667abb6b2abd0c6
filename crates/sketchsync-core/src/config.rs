//! Session configuration.

use crate::elements::SerializableColor;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one board session. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Board to join.
    pub board_id: String,
    /// Name shown next to this participant's cursor.
    pub display_name: String,
    pub cursor_color: SerializableColor,
    /// Eraser hit radius in board units.
    pub eraser_tolerance: f64,
    /// Maximum number of history snapshots; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Broadcast `cursor` frames on pointer move.
    pub emit_cursor: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board_id: String::new(),
            display_name: "Anonymous".to_string(),
            cursor_color: SerializableColor::new(0x1e, 0x88, 0xe5, 0xff),
            eraser_tolerance: 5.0,
            history_limit: None,
            emit_cursor: true,
        }
    }
}

impl SessionConfig {
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded config from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.eraser_tolerance.is_finite() || self.eraser_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "eraserTolerance must be a non-negative number, got {}",
                self.eraser_tolerance
            )));
        }
        if self.history_limit == Some(0) {
            return Err(ConfigError::Invalid("historyLimit must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = SessionConfig::from_json_str(r#"{"boardId": "b1"}"#).unwrap();
        assert_eq!(config.board_id, "b1");
        assert_eq!(config.eraser_tolerance, 5.0);
        assert_eq!(config.history_limit, None);
        assert!(config.emit_cursor);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            SessionConfig::from_json_str(r#"{"historyLimit": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SessionConfig::from_json_str(r#"{"eraserTolerance": -1}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SessionConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"boardId": "b2", "displayName": "ana", "cursorColor": "#ff0000", "historyLimit": 20}}"##
        )
        .unwrap();

        let config = SessionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.display_name, "ana");
        assert_eq!(config.cursor_color, SerializableColor::new(255, 0, 0, 255));
        assert_eq!(config.history_limit, Some(20));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SessionConfig::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
