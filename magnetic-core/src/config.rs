use embassy_time::Duration;
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown setting `{0}`")]
    UnknownKey(String),
    #[error("invalid value {value:?} for `{name}`")]
    InvalidValue { name: String, value: String },
    #[error("expected `name=value`, found {0:?}")]
    Malformed(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

macro_rules! init_config {
    ($($name:ident: $type:ty = $value:expr),*,) => {
        #[derive(Clone, Debug, PartialEq, Deserialize)]
        #[serde(default, deny_unknown_fields)]
        pub struct Config {
            $(
                pub $name: $type,
            )*
        }

        impl Default for Config {
            fn default() -> Self {
                Self {
                    $(
                        $name: $value,
                    )*
                }
            }
        }

        impl Config {
            /// Parses `value` into the setting called `name`.
            pub fn set(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
                match name {
                    $(
                        stringify!($name) => {
                            self.$name = value.trim().parse::<$type>().map_err(|_| {
                                ConfigError::InvalidValue {
                                    name: name.into(),
                                    value: value.into(),
                                }
                            })?;
                        }
                    )*
                    _ => return Err(ConfigError::UnknownKey(name.into())),
                }
                Ok(())
            }
        }
    };
}

init_config! {
    // acquisition
    receive_timeout_ms: u64 = 100,
    stop_timeout_ms: u64 = 500,
    log_level: String = String::from("info"),
    // project the raw field onto the horizontal plane before logging
    level_fields: bool = false,
    // calibration
    calibrate: bool = false,
    samples: usize = 0, // 0 runs until calibrated or stopped
    report_path: String = String::from("fields.csv"),
    dataset_path: String = String::new(),
    model_path: String = String::from("model.json"),
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Applies a comma separated `name=value` list, e.g. `calibrate=true,samples=500`.
    pub fn parse_overrides(&mut self, overrides: &str) -> Result<(), ConfigError> {
        for entry in overrides.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (name, value) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::Malformed(entry.into()))?;
            self.set(name.trim(), value)?;
        }
        Ok(())
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: "log_level".into(),
                value: self.log_level.clone(),
            })
    }
}
