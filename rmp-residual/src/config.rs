use crate::error::ResidualError;
use rmp_core::numeric::NumericPrecision;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

pub type ConfigMap = serde_json::Map<String, Value>;

/// Location of the motion policy parameters shipped with this crate.
pub const DEFAULT_POLICY_CONFIG: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/configs/xarm7_residual_config.yaml"
);

pub fn default_config() -> ConfigMap {
    let mut map = ConfigMap::new();
    map.insert("dtype".into(), json!(NumericPrecision::F32.as_str()));
    map.insert("offset".into(), json!(1e-3));
    map
}

/// Shallow merge: keys of `overrides` replace the ones in `defaults`, everything else is kept.
pub fn merge_config(defaults: &ConfigMap, overrides: &ConfigMap) -> ConfigMap {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualEnvConfig {
    pub dtype: NumericPrecision,
    pub offset: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_config_path: Option<PathBuf>,
    /// Options meant for the base environment, passed through untouched.
    #[serde(flatten)]
    pub extra: ConfigMap,
}

impl Default for ResidualEnvConfig {
    fn default() -> Self {
        Self {
            dtype: NumericPrecision::default(),
            offset: 1e-3,
            policy_config_path: None,
            extra: ConfigMap::new(),
        }
    }
}

impl ResidualEnvConfig {
    pub fn from_overrides(overrides: Option<ConfigMap>) -> Result<Self, ResidualError> {
        let merged = match overrides {
            Some(overrides) => merge_config(&default_config(), &overrides),
            None => default_config(),
        };
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ResidualError> {
        let overrides: Option<ConfigMap> = serde_yaml::from_str(yaml)?;
        Self::from_overrides(overrides)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ResidualError> {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        let overrides: Option<ConfigMap> = serde_yaml::from_reader(rdr)?;
        Self::from_overrides(overrides)
    }

    /// The merged mapping, always holding `dtype` and `offset`.
    pub fn to_map(&self) -> Result<ConfigMap, ResidualError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(ResidualError::InvalidConfig(serde::ser::Error::custom(
                format!("configuration serialized to {other} instead of a map"),
            ))),
        }
    }

    /// Path of the motion policy config. Fails if nothing exists there.
    pub fn policy_config_path(&self) -> Result<PathBuf, ResidualError> {
        let path = self
            .policy_config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_POLICY_CONFIG));
        if path.is_file() {
            Ok(path)
        } else {
            Err(ResidualError::PolicyConfigNotFound(path))
        }
    }

    /// Deserializes a base environment option out of the pass-through keys.
    pub fn extra_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, ResidualError> {
        Ok(serde_json::from_value(Value::Object(self.extra.clone()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win() {
        let mut overrides = ConfigMap::new();
        overrides.insert("offset".into(), json!(5e-3));
        overrides.insert("num_obstacles".into(), json!(3));
        let merged = merge_config(&default_config(), &overrides);
        assert_eq!(merged["dtype"], json!("float32"));
        assert_eq!(merged["offset"], json!(5e-3));
        assert_eq!(merged["num_obstacles"], json!(3));
    }

    #[test]
    fn yaml_overrides() {
        let config = ResidualEnvConfig::from_yaml_str("dtype: float64\nmax_steps: 20\n").unwrap();
        assert_eq!(config.dtype, NumericPrecision::F64);
        assert_eq!(config.offset, 1e-3);
        assert_eq!(config.extra["max_steps"], json!(20));
    }

    #[test]
    fn map_flattens_pass_through_keys() {
        let config = ResidualEnvConfig::from_yaml_str("offset: 0.01
max_steps: 20
").unwrap();
        let map = config.to_map().unwrap();
        assert_eq!(map["dtype"], json!("float32"));
        assert_eq!(map["offset"], json!(0.01));
        assert_eq!(map["max_steps"], json!(20));
        assert!(!map.contains_key("extra"));
        assert!(!map.contains_key("policy_config_path"));
    }
}
