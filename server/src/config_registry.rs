//! C3: the process-wide tunables (`max_retries`, `base_delay`), spec §4.3.
//!
//! Distinct from [`crate::config::Config`], which is loaded once at startup
//! from the environment. This registry is mutated at runtime over HTTP and
//! read continuously by every worker.

use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Float(f64),
}

impl ConfigValue {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ConfigValue::Int(v) if *v >= 0 => Some(*v as u32),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            ConfigValue::Int(v) => *v as f64,
            ConfigValue::Float(v) => *v,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Values {
    max_retries: u32,
    base_delay: f64,
}

impl Default for Values {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: 2.0,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConfigRegistry {
    values: Mutex<Values>,
}

impl ConfigRegistry {
    pub fn get(&self, key: &str) -> Result<ConfigValue, ConfigError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        match key {
            "max_retries" => Ok(ConfigValue::Int(values.max_retries as i64)),
            "base_delay" => Ok(ConfigValue::Float(values.base_delay)),
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    /// Set a key from a loosely-typed JSON value, returning the value as
    /// actually stored (after numeric coercion).
    pub fn set(&self, key: &str, value: &serde_json::Value) -> Result<ConfigValue, ConfigError> {
        let as_f64 = value.as_f64().ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "value must be a number".to_string(),
        })?;

        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        match key {
            "max_retries" => {
                if as_f64 < 0.0 || as_f64.fract() != 0.0 {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        reason: "max_retries must be a non-negative integer".to_string(),
                    });
                }
                values.max_retries = as_f64 as u32;
                Ok(ConfigValue::Int(values.max_retries as i64))
            }
            "base_delay" => {
                if as_f64 < 1.0 {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        reason: "base_delay must be >= 1".to_string(),
                    });
                }
                values.base_delay = as_f64;
                Ok(ConfigValue::Float(values.base_delay))
            }
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).max_retries
    }

    pub fn base_delay(&self) -> f64 {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).base_delay
    }
}
