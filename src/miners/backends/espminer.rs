use crate::data::board::BoardData;
use crate::data::config::MinerConfig;
use crate::data::device::{DeviceInfo, HashAlgorithm, MinerFirmware, MinerModel};
use crate::data::fan::FanData;
use crate::data::hashrate::{HashRate, HashRateUnit, round_2};
use crate::miners::api::web::esp_web_api::EspWebApi;
use crate::miners::api::{ApiClient, ApiError};
use crate::miners::backends::success_flag;
use crate::miners::backends::traits::{GetMinerData, MinerControl};
use crate::miners::collector::Responses;
use crate::miners::data::{
    DataField, DataLocation, DataValue, Endpoint, FieldError, FieldRegistry, FieldResult, as_f64,
    as_str, as_u64, get_by_key,
};
use crate::settings::ClientSettings;
use async_trait::async_trait;
use macaddr::MacAddr;
use measurements::{Power, Temperature};
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;

const SYSTEM_INFO: Endpoint = Endpoint::web("system/info");
const ASIC_INFO: Endpoint = Endpoint::web("system/asic");

// Errors, the fault light, power limits and PSU fans have no ESP-Miner
// counterpart and are not registered.
static ESP_REGISTRY: FieldRegistry = FieldRegistry::new(&[
    (DataField::Mac, DataLocation::new(get_mac, &[SYSTEM_INFO])),
    (DataField::Hostname, DataLocation::new(get_hostname, &[SYSTEM_INFO])),
    (
        DataField::FirmwareVersion,
        DataLocation::new(get_fw_ver, &[SYSTEM_INFO]),
    ),
    (DataField::Hashrate, DataLocation::new(get_hashrate, &[SYSTEM_INFO])),
    (
        DataField::ExpectedHashrate,
        DataLocation::new(get_expected_hashrate, &[SYSTEM_INFO]),
    ),
    (
        DataField::Hashboards,
        DataLocation::new(get_hashboards, &[SYSTEM_INFO, ASIC_INFO]),
    ),
    (DataField::FluidTemperature, DataLocation::unsupported()),
    (DataField::Wattage, DataLocation::new(get_wattage, &[SYSTEM_INFO])),
    (DataField::Fans, DataLocation::new(get_fans, &[SYSTEM_INFO])),
    (DataField::IsMining, DataLocation::new(get_is_mining, &[SYSTEM_INFO])),
    (DataField::Uptime, DataLocation::new(get_uptime, &[SYSTEM_INFO])),
    (DataField::Config, DataLocation::new(get_config, &[SYSTEM_INFO])),
]);

/// A BitAxe running stock ESP-Miner (AxeOS) firmware.
pub struct ESPMiner<W = EspWebApi> {
    ip: IpAddr,
    info: DeviceInfo,
    web: W,
}

impl ESPMiner {
    pub fn new(ip: IpAddr, model: MinerModel, settings: &ClientSettings) -> Result<Self, ApiError> {
        let web = EspWebApi::new(ip)?.with_settings(settings);
        Ok(Self::with_client(ip, model, web))
    }
}

impl<W: ApiClient> ESPMiner<W> {
    pub fn with_client(ip: IpAddr, model: MinerModel, web: W) -> Self {
        ESPMiner {
            ip,
            info: DeviceInfo::new(model, MinerFirmware::Stock, HashAlgorithm::SHA256),
            web,
        }
    }
}

impl<W: ApiClient + 'static> GetMinerData for ESPMiner<W> {
    fn ip(&self) -> IpAddr {
        self.ip
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    fn registry(&self) -> &'static FieldRegistry {
        &ESP_REGISTRY
    }

    fn api_client(&self) -> &dyn ApiClient {
        &self.web
    }
}

#[async_trait]
impl<W: ApiClient + 'static> MinerControl for ESPMiner<W> {
    async fn restart_backend(&self) -> bool {
        self.reboot().await
    }

    async fn stop_mining(&self) -> bool {
        false
    }

    async fn resume_mining(&self) -> bool {
        false
    }

    async fn reboot(&self) -> bool {
        success_flag(
            "system/restart",
            self.web.send_action("system/restart", None).await,
        )
    }

    async fn set_fault_light(&self, _on: bool) -> bool {
        false
    }

    async fn set_power_limit(&self, _limit: Power) -> bool {
        false
    }

    async fn send_config(&self, config: &MinerConfig) -> bool {
        success_flag(
            "system",
            self.web.send_action("system", Some(config.as_espminer())).await,
        )
    }
}

/// ESP-Miner reports hashrate in GH/s.
fn terahash(gigahash: f64) -> HashRate {
    let hr = HashRate {
        value: gigahash,
        unit: HashRateUnit::GigaHash,
        algo: String::from("SHA256"),
    }
    .as_unit(HashRateUnit::TeraHash);
    HashRate {
        value: round_2(hr.value),
        ..hr
    }
}

fn get_mac(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let mac = as_str(get_by_key(r.get(SYSTEM_INFO)?, "macAddr")?, "macAddr")?;
    mac.parse::<MacAddr>()
        .map(DataValue::Mac)
        .map_err(|_| FieldError::Malformed(format!("macAddr {mac}")))
}

fn get_hostname(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let hostname = as_str(get_by_key(r.get(SYSTEM_INFO)?, "hostname")?, "hostname")?;
    Ok(DataValue::Text(hostname.to_string()))
}

fn get_fw_ver(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let version = as_str(get_by_key(r.get(SYSTEM_INFO)?, "version")?, "version")?;
    Ok(DataValue::Text(
        version.strip_prefix('v').unwrap_or(version).to_string(),
    ))
}

fn get_hashrate(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let gh = as_f64(get_by_key(r.get(SYSTEM_INFO)?, "hashRate")?, "hashRate")?;
    Ok(DataValue::Hashrate(terahash(gh)))
}

fn get_expected_hashrate(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let gh = as_f64(
        get_by_key(r.get(SYSTEM_INFO)?, "expectedHashrate")?,
        "expectedHashrate",
    )?;
    Ok(DataValue::Hashrate(terahash(gh)))
}

/// The whole device is one board; the chip count comes from the ASIC endpoint.
fn get_hashboards(info: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let system = r.get(SYSTEM_INFO)?;
    let chips = r
        .get(ASIC_INFO)
        .ok()
        .or(Some(system))
        .and_then(|v| v.get("asicCount"))
        .and_then(Value::as_u64)
        .map(|n| n as u16);

    let board = BoardData {
        position: 0,
        hashrate: system
            .get("hashRate")
            .and_then(Value::as_f64)
            .map(terahash),
        board_temperature: system
            .get("temp")
            .and_then(Value::as_f64)
            .map(Temperature::from_celsius),
        expected_chips: info.expected_chips(),
        working_chips: chips,
        missing: false,
    };
    Ok(DataValue::Hashboards(vec![board]))
}

fn get_wattage(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let watts = as_f64(get_by_key(r.get(SYSTEM_INFO)?, "power")?, "power")?;
    Ok(DataValue::Power(Power::from_watts(watts.round())))
}

fn get_fans(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let rpm = get_by_key(r.get(SYSTEM_INFO)?, "fanrpm")?;
    let fan = match rpm.as_f64() {
        Some(rpm) => FanData::new(0, rpm),
        None => FanData::unknown(0),
    };
    Ok(DataValue::Fans(vec![fan]))
}

fn get_is_mining(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let gh = as_f64(get_by_key(r.get(SYSTEM_INFO)?, "hashRate")?, "hashRate")?;
    Ok(DataValue::Flag(gh > 0.0))
}

fn get_uptime(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    let secs = as_u64(get_by_key(r.get(SYSTEM_INFO)?, "uptimeSeconds")?, "uptimeSeconds")?;
    Ok(DataValue::Duration(Duration::from_secs(secs)))
}

fn get_config(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
    Ok(DataValue::Config(MinerConfig::from_espminer(r.get(SYSTEM_INFO)?)))
}
