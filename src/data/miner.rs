use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use macaddr::MacAddr;
use measurements::{Power, Temperature};

use super::{
    board::BoardData, config::MinerConfig, device::DeviceInfo, fan::FanData, hashrate::HashRate,
    message::MinerMessage,
};
use crate::miners::collector::Snapshot;
use crate::miners::data::{DataField, DataValue};

#[derive(Debug, Clone, PartialEq)]
pub struct MinerData {
    /// The schema version of this MinerData object, for use in external APIs
    pub schema_version: String,
    /// The time this data was gathered and constructed
    pub timestamp: u64,
    /// The IP address of the miner this data is for
    pub ip: IpAddr,
    /// The MAC address of the miner this data is for
    pub mac: Option<MacAddr>,
    /// Hardware information about this miner
    pub device_info: DeviceInfo,
    /// The network hostname of the miner
    pub hostname: Option<String>,
    /// The API version of the miner
    pub api_version: Option<String>,
    /// The firmware version of the miner
    pub firmware_version: Option<String>,
    /// The expected number of boards in the miner.
    pub expected_hashboards: Option<u8>,
    /// Per-hashboard data for this miner
    pub hashboards: Vec<BoardData>,
    /// The current hashrate of the miner
    pub hashrate: Option<HashRate>,
    /// The hashrate the miner should produce at its current settings
    pub expected_hashrate: Option<HashRate>,
    /// The total expected number of chips across all boards on this miner
    pub expected_chips: Option<u16>,
    /// The total number of working chips across all boards on this miner
    pub total_chips: Option<u16>,
    /// The expected number of fans on the miner
    pub expected_fans: Option<u8>,
    /// The current fan information for the miner
    pub fans: Vec<FanData>,
    /// The current PDU fan information for the miner
    pub psu_fans: Vec<FanData>,
    /// The environment temperature of the miner, such as air temperature or immersion fluid temperature
    pub fluid_temperature: Option<Temperature>,
    /// The current power consumption of the miner
    pub wattage: Option<Power>,
    /// The current power limit or power target of the miner
    pub wattage_limit: Option<Power>,
    /// The current efficiency in W/TH/s (J/TH) of the miner
    pub efficiency: Option<f64>,
    /// The state of the fault/alert light on the miner
    pub light_flashing: Option<bool>,
    /// Any message on the miner, including errors
    pub messages: Vec<MinerMessage>,
    /// The total uptime of the miner's system
    pub uptime: Option<Duration>,
    /// Whether the hashing process is currently running
    pub is_mining: Option<bool>,
    /// The current configuration of the miner
    pub config: Option<MinerConfig>,
}

impl MinerData {
    /// Assemble the data of one collection cycle.
    pub fn from_snapshot(ip: IpAddr, device_info: DeviceInfo, mut snapshot: Snapshot) -> Self {
        let hashboards = snapshot
            .take(DataField::Hashboards)
            .and_then(|v| match v {
                DataValue::Hashboards(boards) => Some(boards),
                _ => None,
            })
            .unwrap_or_default();

        let hashrate = snapshot
            .get(DataField::Hashrate)
            .and_then(DataValue::as_hashrate)
            .cloned();
        let wattage = snapshot.get(DataField::Wattage).and_then(DataValue::as_power);

        let efficiency = match (hashrate.clone(), wattage) {
            (Some(hr), Some(w)) if hr.value > 0.0 => Some(w / hr),
            _ => None,
        };

        let reported: Vec<&BoardData> = hashboards.iter().filter(|b| !b.missing).collect();
        let total_chips = if reported.is_empty() {
            None
        } else {
            Some(
                reported
                    .iter()
                    .filter_map(|b| b.working_chips)
                    .fold(0u16, u16::saturating_add),
            )
        };

        let hardware = device_info.hardware;
        let expected_chips = hardware
            .chips
            .zip(hardware.boards)
            .map(|(chips, boards)| chips * u16::from(boards));

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        MinerData {
            schema_version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            ip,
            mac: snapshot.get(DataField::Mac).and_then(DataValue::as_mac),
            hostname: text(&snapshot, DataField::Hostname),
            api_version: text(&snapshot, DataField::ApiVersion),
            firmware_version: text(&snapshot, DataField::FirmwareVersion),
            expected_hashboards: hardware.boards,
            hashboards,
            hashrate,
            expected_hashrate: snapshot
                .get(DataField::ExpectedHashrate)
                .and_then(DataValue::as_hashrate)
                .cloned(),
            expected_chips,
            total_chips,
            expected_fans: hardware.fans,
            fans: fans(&snapshot, DataField::Fans),
            psu_fans: fans(&snapshot, DataField::PsuFans),
            fluid_temperature: snapshot
                .get(DataField::FluidTemperature)
                .and_then(DataValue::as_temperature),
            wattage,
            wattage_limit: snapshot
                .get(DataField::WattageLimit)
                .and_then(DataValue::as_power),
            efficiency,
            light_flashing: snapshot.get(DataField::FaultLight).and_then(DataValue::as_flag),
            messages: snapshot
                .get(DataField::Errors)
                .and_then(DataValue::as_messages)
                .map(<[MinerMessage]>::to_vec)
                .unwrap_or_default(),
            uptime: snapshot.get(DataField::Uptime).and_then(DataValue::as_duration),
            is_mining: snapshot.get(DataField::IsMining).and_then(DataValue::as_flag),
            config: snapshot.take(DataField::Config).and_then(DataValue::into_config),
            device_info,
        }
    }
}

fn text(snapshot: &Snapshot, field: DataField) -> Option<String> {
    snapshot
        .get(field)
        .and_then(DataValue::as_text)
        .map(str::to_string)
}

fn fans(snapshot: &Snapshot, field: DataField) -> Vec<FanData> {
    snapshot
        .get(field)
        .and_then(DataValue::as_fans)
        .map(<[FanData]>::to_vec)
        .unwrap_or_default()
}
