use crate::data::board::BoardData;
use crate::data::config::{FanMode, MinerConfig, MiningMode};
use crate::data::device::{DeviceInfo, HashAlgorithm, MinerFirmware, MinerModel};
use crate::data::fan::FanData;
use crate::data::hashrate::{HashRate, round_2};
use crate::data::message::MinerMessage;
use crate::miners::api::web::epic::EPicWebApi;
use crate::miners::api::{ApiClient, ApiError};
use crate::miners::backends::success_flag;
use crate::miners::backends::traits::{GetMinerData, MinerControl};
use crate::miners::collector::Responses;
use crate::miners::data::{
    DataField, DataLocation, DataValue, Endpoint, FieldError, FieldRegistry, FieldResult, as_bool,
    as_f64, as_str, as_u64, get_by_key, get_by_pointer,
};
use crate::settings::ClientSettings;
use async_trait::async_trait;
use macaddr::MacAddr;
use measurements::{Power, Temperature};
use serde_json::{Value, json};
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

const SUMMARY: Endpoint = Endpoint::web("summary");
const NETWORK: Endpoint = Endpoint::web("network");
const HASHRATE: Endpoint = Endpoint::web("hashrate");

static EPIC_REGISTRY: FieldRegistry = FieldRegistry::new(&[
    (DataField::Mac, DataLocation::new(get_mac, &[NETWORK])),
    (DataField::ApiVersion, DataLocation::unsupported()),
    (DataField::FirmwareVersion, DataLocation::new(get_fw_ver, &[SUMMARY])),
    (DataField::Hostname, DataLocation::new(get_hostname, &[SUMMARY])),
    (DataField::Hashrate, DataLocation::new(get_hashrate, &[SUMMARY])),
    (
        DataField::ExpectedHashrate,
        DataLocation::new(get_expected_hashrate, &[SUMMARY]),
    ),
    (
        DataField::Hashboards,
        DataLocation::new(get_hashboards, &[SUMMARY, HASHRATE]),
    ),
    (DataField::FluidTemperature, DataLocation::unsupported()),
    (DataField::Wattage, DataLocation::new(get_wattage, &[SUMMARY])),
    (DataField::WattageLimit, DataLocation::unsupported()),
    (DataField::Fans, DataLocation::new(get_fans, &[SUMMARY])),
    (DataField::PsuFans, DataLocation::unsupported()),
    (DataField::Errors, DataLocation::new(get_errors, &[SUMMARY])),
    (DataField::FaultLight, DataLocation::new(get_fault_light, &[SUMMARY])),
    (DataField::IsMining, DataLocation::unsupported()),
    (DataField::Uptime, DataLocation::new(get_uptime, &[SUMMARY])),
    (DataField::Config, DataLocation::new(get_config, &[SUMMARY])),
]);

/// A miner running ePIC firmware.
pub struct EPic<W = EPicWebApi> {
    ip: IpAddr,
    info: DeviceInfo,
    web: W,
}

impl EPic {
    pub fn new(ip: IpAddr, model: MinerModel, settings: &ClientSettings) -> Result<Self, ApiError> {
        let web = EPicWebApi::new(ip)?.with_settings(settings);
        Ok(Self::with_client(ip, model, web))
    }
}

impl<W: ApiClient> EPic<W> {
    /// Build on an existing transport.
    pub fn with_client(ip: IpAddr, model: MinerModel, web: W) -> Self {
        EPic {
            ip,
            info: DeviceInfo::new(model, MinerFirmware::EPic, HashAlgorithm::SHA256),
            web,
        }
    }

    async fn action(&self, command: &'static str, param: Option<Value>) -> bool {
        success_flag(command, self.web.send_action(command, param).await)
    }
}

impl<W: ApiClient + 'static> GetMinerData for EPic<W> {
    fn ip(&self) -> IpAddr {
        self.ip
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    fn registry(&self) -> &'static FieldRegistry {
        &EPIC_REGISTRY
    }

    fn api_client(&self) -> &dyn ApiClient {
        &self.web
    }
}

#[async_trait]
impl<W: ApiClient + 'static> MinerControl for EPic<W> {
    async fn restart_backend(&self) -> bool {
        self.action("softreboot", None).await
    }

    async fn stop_mining(&self) -> bool {
        self.action("miner", Some(json!("Stop"))).await
    }

    async fn resume_mining(&self) -> bool {
        self.action("miner", Some(json!("Autostart"))).await
    }

    async fn reboot(&self) -> bool {
        self.action("reboot", None).await
    }

    async fn set_fault_light(&self, on: bool) -> bool {
        self.action("identify", Some(json!(on))).await
    }

    async fn set_power_limit(&self, limit: Power) -> bool {
        let watts = limit.as_watts().round() as u32;
        self.action("perpetualtune", Some(json!(true))).await
            && self
                .action("perpetualtune/algo", Some(tune_param(&MiningMode::PowerTuning { watts })))
                .await
    }

    /// Sends each configured section as its own command, stopping at the first
    /// the miner refuses.
    async fn send_config(&self, config: &MinerConfig) -> bool {
        let mut commands: Vec<(&'static str, Value)> = vec![];
        if let Some(danger) = config.temperature.danger {
            commands.push(("shutdowntemp", json!(danger)));
        }
        match config.fan_mode {
            FanMode::Manual { speed } => commands.push(("fanspeed", json!({"Manual": speed}))),
            FanMode::Normal { .. } => {
                if let Some(target) = config.temperature.target {
                    commands.push((
                        "fanspeed",
                        json!({"Auto": {"Target Temperature": target, "Idle Speed": 100}}),
                    ));
                }
            }
        }
        match config.mining_mode {
            MiningMode::Normal => commands.push(("perpetualtune", json!(false))),
            MiningMode::Sleep => {}
            MiningMode::PowerTuning { .. } | MiningMode::HashrateTuning { .. } => {
                commands.push(("perpetualtune", json!(true)));
                commands.push(("perpetualtune/algo", tune_param(&config.mining_mode)));
            }
        }
        if !config.pools.is_empty() {
            let stratum: Vec<Value> = config
                .pools
                .iter()
                .map(|p| json!({"pool": p.url, "login": p.user, "password": p.password}))
                .collect();
            commands.push((
                "coin",
                json!({"coin": "Btc", "stratum_configs": stratum, "unique_id": false}),
            ));
        }

        for (command, param) in commands {
            if !self.action(command, Some(param)).await {
                return false;
            }
        }
        if matches!(config.mining_mode, MiningMode::Sleep) {
            return self.stop_mining().await;
        }
        true
    }
}

fn tune_param(mode: &MiningMode) -> Value {
    match mode {
        MiningMode::PowerTuning { watts } => json!({"algo": "ChipTune", "target": watts}),
        MiningMode::HashrateTuning { terahash } => {
            json!({"algo": "VoltageOptimizer", "target": terahash})
        }
        MiningMode::Normal | MiningMode::Sleep => Value::Null,
    }
}

/// The measured half of a board's `Hashrate: [measured, ideal percentage]`, in MH/s.
fn board_measured(hb: &Value) -> Result<f64, FieldError> {
    let pair = get_by_key(hb, "Hashrate")?;
    as_f64(pair.get(0).ok_or(FieldError::Missing("Hashrate[0]"))?, "Hashrate[0]")
}

fn board_ideal(hb: &Value) -> Result<f64, FieldError> {
    let pair = get_by_key(hb, "Hashrate")?;
    as_f64(pair.get(1).ok_or(FieldError::Missing("Hashrate[1]"))?, "Hashrate[1]")
}

fn reported_boards(summary: &Value) -> Result<&Vec<Value>, FieldError> {
    get_by_key(summary, "HBs")?
        .as_array()
        .ok_or_else(|| FieldError::Malformed("HBs is not a list".into()))
}

fn get_mac(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let network = r.get(NETWORK)?;
    let interfaces = network
        .as_object()
        .ok_or_else(|| FieldError::Malformed("network is not an object".into()))?;
    let mac = interfaces
        .values()
        .find_map(|iface| iface.get("mac_address")?.as_str())
        .ok_or(FieldError::Missing("mac_address"))?;
    mac.parse::<MacAddr>()
        .map(DataValue::Mac)
        .map_err(|_| FieldError::Malformed(format!("mac_address {mac}")))
}

fn get_hostname(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let hostname = as_str(get_by_key(r.get(SUMMARY)?, "Hostname")?, "Hostname")?;
    Ok(DataValue::Text(hostname.to_string()))
}

/// `"Software": "PowerPlay-BM v1.8.3"` carries the version as its second word.
fn get_fw_ver(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let software = as_str(get_by_key(r.get(SUMMARY)?, "Software")?, "Software")?;
    let version = software
        .split(' ')
        .nth(1)
        .ok_or_else(|| FieldError::Malformed(format!("Software {software:?}")))?;
    Ok(DataValue::Text(
        version.strip_prefix('v').unwrap_or(version).to_string(),
    ))
}

fn get_wattage(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let watts = as_f64(
        get_by_pointer(r.get(SUMMARY)?, "/Power Supply Stats/Input Power")?,
        "Input Power",
    )?;
    Ok(DataValue::Power(Power::from_watts(watts.round_ties_even())))
}

fn get_hashrate(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let mut total = 0.0;
    for hb in reported_boards(r.get(SUMMARY)?)? {
        total += board_measured(hb)?;
    }
    Ok(DataValue::Hashrate(HashRate::terahash(round_2(total / 1_000_000.0))))
}

/// Each board's measured hashrate scaled up by how far it is from ideal.
/// An ideal percentage of exactly 0 counts as 100%.
fn get_expected_hashrate(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let mut total = 0.0;
    for hb in reported_boards(r.get(SUMMARY)?)? {
        let measured = board_measured(hb)?;
        let ideal = board_ideal(hb)?;
        let ratio = if ideal == 0.0 { 1.0 } else { ideal / 100.0 };
        total += measured / ratio;
    }
    Ok(DataValue::Hashrate(HashRate::terahash(round_2(total / 1_000_000.0))))
}

fn get_hashboards(info: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let summary = r.get(SUMMARY)?;
    let chip_data = r
        .get(HASHRATE)?
        .as_array()
        .ok_or_else(|| FieldError::Malformed("hashrate is not a list".into()))?;

    let mut boards: Vec<BoardData> = (0..info.expected_hashboards())
        .map(|slot| BoardData::missing(slot, info.expected_chips()))
        .collect();

    // A summary without boards still yields the expected, all-missing slots.
    let Some(reported) = summary.get("HBs").and_then(Value::as_array) else {
        return Ok(DataValue::Hashboards(boards));
    };

    for hb in reported {
        let Some(index) = hb.get("Index").and_then(Value::as_u64) else {
            continue;
        };
        let Some(chips) = chip_data
            .iter()
            .find(|c| c.get("Index").and_then(Value::as_u64) == Some(index))
            .and_then(|c| c.get("Data")?.as_array())
        else {
            continue;
        };
        let Some(board) = boards.get_mut(index as usize) else {
            debug!(index, "board index outside expected slots");
            continue;
        };

        let Ok(num_chips) = u16::try_from(chips.len()) else {
            debug!(index, chips = chips.len(), "implausible chip count");
            continue;
        };
        board.missing = false;
        board.expected_chips = Some(num_chips);
        board.working_chips = Some(num_chips);
        board.hashrate = board_measured(hb)
            .ok()
            .map(|measured| HashRate::terahash(round_2(measured / 1_000_000.0)));
        board.board_temperature = hb
            .get("Temperature")
            .and_then(Value::as_f64)
            .map(Temperature::from_celsius);
    }

    Ok(DataValue::Hashboards(boards))
}

fn get_fans(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let fans = get_by_key(r.get(SUMMARY)?, "Fans Rpm")?
        .as_object()
        .ok_or_else(|| FieldError::Malformed("Fans Rpm is not an object".into()))?;
    Ok(DataValue::Fans(
        fans.values()
            .enumerate()
            .map(|(i, rpm)| match rpm.as_f64() {
                Some(rpm) => FanData::new(i as i16, rpm),
                None => FanData::unknown(i as i16),
            })
            .collect(),
    ))
}

/// Only the most recent error is exposed by the firmware.
fn get_errors(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let last_error = get_by_pointer(r.get(SUMMARY)?, "/Status/Last Error")?;
    let errors = match last_error {
        Value::Null => vec![],
        error => vec![MinerMessage::from_vendor_error(error)],
    };
    Ok(DataValue::Messages(errors))
}

fn get_fault_light(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let light = get_by_pointer(r.get(SUMMARY)?, "/Misc/Locate Miner State")?;
    Ok(DataValue::Flag(as_bool(light, "Locate Miner State")?))
}

fn get_uptime(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let uptime = as_u64(get_by_pointer(r.get(SUMMARY)?, "/Session/Uptime")?, "Uptime")?;
    Ok(DataValue::Duration(Duration::from_secs(uptime)))
}

fn get_config(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    Ok(DataValue::Config(MinerConfig::from_epic(r.get(SUMMARY)?)))
}
