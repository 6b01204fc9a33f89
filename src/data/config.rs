//! Normalized miner configuration.
//!
//! Each firmware family stores its configuration differently. `MinerConfig` is the
//! common shape; the `from_*` constructors read a family's native payload and never
//! fail, falling back to the default for any section they cannot read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerConfig {
    pub pools: Vec<PoolConfig>,
    pub fan_mode: FanMode,
    pub temperature: TemperatureConfig,
    pub mining_mode: MiningMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FanMode {
    /// Firmware-controlled fan speed
    Normal { minimum_fans: Option<u8> },
    /// Fixed fan speed, in percent
    Manual { speed: u8 },
}

impl Default for FanMode {
    fn default() -> Self {
        FanMode::Normal { minimum_fans: None }
    }
}

/// Temperatures in Celsius.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureConfig {
    pub target: Option<f64>,
    pub hot: Option<f64>,
    pub danger: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MiningMode {
    #[default]
    Normal,
    Sleep,
    PowerTuning { watts: u32 },
    HashrateTuning { terahash: f64 },
}

impl MinerConfig {
    /// Read the configuration embedded in an ePIC `summary` payload.
    pub fn from_epic(summary: &Value) -> Self {
        let pools = summary
            .get("StratumConfigs")
            .and_then(Value::as_array)
            .map(|configs| {
                configs
                    .iter()
                    .filter_map(|c| {
                        Some(PoolConfig {
                            url: c.get("pool")?.as_str()?.to_string(),
                            user: c
                                .get("login")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            password: c
                                .get("password")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let fan_conf = summary.pointer("/Fans/Fan Mode");
        let fan_mode = match fan_conf.and_then(|f| f.get("Manual")).and_then(Value::as_u64) {
            Some(speed) => FanMode::Manual {
                speed: speed.min(100) as u8,
            },
            None => FanMode::default(),
        };

        let temperature = TemperatureConfig {
            target: fan_conf
                .and_then(|f| f.pointer("/Auto/Target Temperature"))
                .and_then(Value::as_f64),
            hot: summary.pointer("/Misc/Critical Temp").and_then(Value::as_f64),
            danger: summary.pointer("/Misc/Shutdown Temp").and_then(Value::as_f64),
        };

        MinerConfig {
            pools,
            fan_mode,
            temperature,
            mining_mode: epic_mining_mode(summary),
        }
    }

    /// Read the configuration from an ESP-Miner `system/info` payload.
    pub fn from_espminer(info: &Value) -> Self {
        let pools = match (
            info.get("stratumURL").and_then(Value::as_str),
            info.get("stratumPort").and_then(Value::as_u64),
        ) {
            (Some(host), Some(port)) if !host.is_empty() => vec![PoolConfig {
                url: format!("stratum+tcp://{}:{}", host, port),
                user: info
                    .get("stratumUser")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                password: info
                    .get("stratumPassword")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }],
            _ => vec![],
        };

        let fan_mode = match info.get("autofanspeed").and_then(Value::as_u64) {
            Some(0) => FanMode::Manual {
                speed: info
                    .get("fanspeed")
                    .and_then(Value::as_u64)
                    .unwrap_or(100)
                    .min(100) as u8,
            },
            _ => FanMode::default(),
        };

        MinerConfig {
            pools,
            fan_mode,
            temperature: TemperatureConfig {
                target: info.get("temptarget").and_then(Value::as_f64),
                ..Default::default()
            },
            mining_mode: MiningMode::Normal,
        }
    }

    /// Encode as the settings body accepted by ESP-Miner's `PATCH /api/system`.
    pub fn as_espminer(&self) -> Value {
        let mut settings = Map::new();

        if let Some(pool) = self.pools.first() {
            if let Ok(url) = Url::parse(&pool.url) {
                if let Some(host) = url.host_str() {
                    settings.insert("stratumURL".into(), json!(host));
                }
                if let Some(port) = url.port() {
                    settings.insert("stratumPort".into(), json!(port));
                }
            }
            settings.insert("stratumUser".into(), json!(pool.user));
            settings.insert("stratumPassword".into(), json!(pool.password));
        }

        match self.fan_mode {
            FanMode::Normal { .. } => {
                settings.insert("autofanspeed".into(), json!(1));
            }
            FanMode::Manual { speed } => {
                settings.insert("autofanspeed".into(), json!(0));
                settings.insert("fanspeed".into(), json!(speed));
            }
        }

        if let Some(target) = self.temperature.target {
            settings.insert("temptarget".into(), json!(target));
        }

        Value::Object(settings)
    }
}

fn epic_mining_mode(summary: &Value) -> MiningMode {
    let Some(tune) = summary.get("PerpetualTune") else {
        return MiningMode::default();
    };
    if !tune.get("Running").and_then(Value::as_bool).unwrap_or(false) {
        return MiningMode::Normal;
    }
    let algorithm = tune.get("Algorithm");
    if let Some(watts) = algorithm
        .and_then(|a| a.pointer("/ChipTune/Target"))
        .and_then(Value::as_f64)
    {
        return MiningMode::PowerTuning {
            watts: watts.round() as u32,
        };
    }
    ["VoltageOptimizer", "BoardTune"]
        .iter()
        .find_map(|name| algorithm?.get(name)?.get("Target")?.as_f64())
        .map(|terahash| MiningMode::HashrateTuning { terahash })
        .unwrap_or(MiningMode::Normal)
}
