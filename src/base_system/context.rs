//! Runtime configuration (`config.yml`) and defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, ConfigSpec, FieldMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 网络
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    // 保存
    #[serde(default)]
    pub save_path: String,
    #[serde(default = "default_true")]
    pub allow_overwrite_files: bool,

    // 界面
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            save_path: String::new(),
            allow_overwrite_files: default_true(),
            show_progress: default_true(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 5] = [
            FieldMeta {
                name: "request_timeout",
                description: "Timeout for each blocking read from the server, in seconds",
            },
            FieldMeta {
                name: "connect_timeout",
                description: "Timeout for establishing a connection, in seconds",
            },
            FieldMeta {
                name: "save_path",
                description: "Directory for downloaded .asf files (empty = current directory)",
            },
            FieldMeta {
                name: "allow_overwrite_files",
                description: "Overwrite an existing output file instead of failing that URL",
            },
            FieldMeta {
                name: "show_progress",
                description: "Show a progress bar on stderr while downloading",
            },
        ];
        &FIELDS
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout == 0 {
            return Err(ConfigError::Validation(
                "request_timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(self.save_path.trim())
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout.max(1))
    }
}

/// Makes `name` usable as a file name on every platform.
pub fn safe_fs_name(name: &str, replacement: char, max_len: usize) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|ch| match ch {
            ':' | '"' | '<' | '>' | '/' | '\\' | '|' | '?' | '*' => replacement,
            c if (c as u32) < 32 => replacement,
            _ => ch,
        })
        .collect();

    while cleaned.ends_with(' ') || cleaned.ends_with('.') {
        cleaned.pop();
    }
    if cleaned.is_empty() {
        cleaned.push_str("unnamed");
    }

    const RESERVED: [&str; 22] = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let stem = cleaned.split('.').next().unwrap_or_default().to_uppercase();
    if RESERVED.contains(&stem.as_str()) {
        cleaned.insert(0, '_');
    }

    if cleaned.len() > max_len {
        // 避免在多字节 UTF-8 字符中间截断
        let mut end = max_len;
        while end > 0 && !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
    }
    cleaned
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::config::{load_or_create, load_or_create_at};

    #[test]
    fn creates_commented_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg: Config = load_or_create(Some(dir.path())).unwrap();
        assert_eq!(cfg.request_timeout, 30);
        assert!(cfg.allow_overwrite_files);

        let written = std::fs::read_to_string(dir.path().join("config.yml")).unwrap();
        assert!(written.contains("# Timeout for each blocking read"));
        assert!(written.contains("request_timeout: 30"));
    }

    #[test]
    fn merges_user_values_and_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "request_timeout: 5\nsave_path: out\n").unwrap();

        let cfg: Config = load_or_create_at(&path).unwrap();
        assert_eq!(cfg.request_timeout, 5);
        assert_eq!(cfg.save_path, "out");
        assert_eq!(cfg.connect_timeout, 10);
        assert_eq!(cfg.default_save_dir(), PathBuf::from("out"));

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("show_progress: true"));
        assert!(rewritten.contains("request_timeout: 5"));
    }

    #[test]
    fn rejects_zero_timeout_and_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");

        std::fs::write(&path, "request_timeout: 0\n").unwrap();
        let err = load_or_create_at::<Config>(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "{err}");

        std::fs::write(&path, "request_timeout: [unclosed\n").unwrap();
        let err = load_or_create_at::<Config>(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn safe_fs_name_replaces_forbidden_characters() {
        assert_eq!(safe_fs_name("a:b?c.asf", '_', 120), "a_b_c.asf");
        assert_eq!(safe_fs_name("con.asf", '_', 120), "_con.asf");
        assert_eq!(safe_fs_name("...", '_', 120), "unnamed");
        assert_eq!(safe_fs_name("abcdef", '_', 3), "abc");
    }
}
