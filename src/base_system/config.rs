//! YAML config file handling: create with commented defaults, merge user
//! values over defaults, rewrite when fields are missing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid yaml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub description: &'static str,
}

pub trait ConfigSpec: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;

    fn fields() -> &'static [FieldMeta];

    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Loads `base_dir/FILE_NAME` (or `./FILE_NAME`), creating it when absent.
pub fn load_or_create<T: ConfigSpec>(base_dir: Option<&Path>) -> Result<T, ConfigError> {
    let path = base_dir
        .map(|dir| dir.join(T::FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(T::FILE_NAME));
    load_or_create_at(&path)
}

pub fn load_or_create_at<T: ConfigSpec>(path: &Path) -> Result<T, ConfigError> {
    ensure_parent(path)?;

    if !path.exists() {
        let config = T::default();
        write_with_comments(&config, path)?;
        return Ok(config);
    }

    let user_yaml = read_yaml(path)?;
    let missing = match &user_yaml {
        Value::Mapping(map) => T::fields()
            .iter()
            .any(|f| !map.contains_key(Value::String(f.name.to_string()))),
        _ => true,
    };

    let mut merged = serde_yaml::to_value(T::default())
        .map_err(|err| ConfigError::Validation(err.to_string()))?;
    merge_values(&mut merged, user_yaml);
    let config: T =
        serde_yaml::from_value(merged).map_err(|err| ConfigError::Validation(err.to_string()))?;
    config.validate()?;

    if missing {
        write_with_comments(&config, path)?;
    }
    Ok(config)
}

pub fn write_with_comments<T: ConfigSpec>(config: &T, path: &Path) -> Result<(), ConfigError> {
    ensure_parent(path)?;
    let yaml = generate_yaml_with_comments(config)?;
    fs::write(path, yaml).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn generate_yaml_with_comments<T: ConfigSpec>(config: &T) -> Result<String, ConfigError> {
    let Value::Mapping(mapping) =
        serde_yaml::to_value(config).map_err(|err| ConfigError::Validation(err.to_string()))?
    else {
        return Err(ConfigError::Validation(
            "config must serialize to a mapping".to_string(),
        ));
    };

    let mut lines = Vec::new();
    for field in T::fields() {
        if !field.description.is_empty() {
            lines.push(format!("# {}", field.description.replace('\n', "\n# ")));
        }
        let key = Value::String(field.name.to_string());
        let val = mapping.get(&key).cloned().unwrap_or(Value::Null);
        let entry = serde_yaml::to_string(&Mapping::from_iter([(key, val)]))
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        lines.push(entry.trim().to_string());
    }
    lines.push(String::new());
    Ok(lines.join("\n"))
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_values(default: &mut Value, user: Value) {
    match (default, user) {
        (Value::Mapping(dest), Value::Mapping(src)) => {
            for (key, user_val) in src {
                match dest.get_mut(&key) {
                    Some(dest_val) => merge_values(dest_val, user_val),
                    None => {
                        dest.insert(key, user_val);
                    }
                }
            }
        }
        // An empty file parses as null; keep the defaults.
        (_, Value::Null) => {}
        (dest, other) => *dest = other,
    }
}

fn ensure_parent(path: &Path) -> Result<(), ConfigError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
