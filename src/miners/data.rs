use crate::data::board::BoardData;
use crate::data::config::MinerConfig;
use crate::data::device::DeviceInfo;
use crate::data::fan::FanData;
use crate::data::hashrate::HashRate;
use crate::data::message::MinerMessage;
use crate::miners::collector::Responses;
use macaddr::MacAddr;
use measurements::{Power, Temperature};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString};

/// Represents the individual pieces of data that can be queried from a miner device.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Copy, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DataField {
    /// MAC address of the miner.
    Mac,
    /// Version of the miner's API.
    ApiVersion,
    /// Firmware version of the miner.
    FirmwareVersion,
    /// Hostname assigned to the miner.
    Hostname,
    /// Current hashrate reported by the miner.
    Hashrate,
    /// Hashrate the miner should be producing at its current settings.
    ExpectedHashrate,
    /// Details about the hashboards (e.g., temperatures, chips, etc.).
    Hashboards,
    /// Environment temperature, such as air or immersion fluid temperature.
    FluidTemperature,
    /// Current power consumption in watts.
    Wattage,
    /// Configured power limit in watts.
    WattageLimit,
    /// Fan speeds.
    Fans,
    /// PSU fan speeds.
    PsuFans,
    /// Errors reported by the miner.
    Errors,
    /// Whether the fault or alert light is flashing.
    FaultLight,
    /// Whether the miner is currently hashing.
    IsMining,
    /// Uptime of the mining process.
    Uptime,
    /// Normalized miner configuration.
    Config,
}

/// One distinct remote call against a device.
///
/// `group` names the transport the command travels over, `command` the call itself.
/// Equality is by value, so two fields naming the same endpoint share one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub group: &'static str,
    pub command: &'static str,
}

impl Endpoint {
    pub const WEB: &'static str = "web";

    /// An endpoint on the device's HTTP web API.
    pub const fn web(command: &'static str) -> Self {
        Endpoint {
            group: Self::WEB,
            command,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.command)
    }
}

/// A typed value produced by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Mac(MacAddr),
    Text(String),
    Hashrate(HashRate),
    Hashboards(Vec<BoardData>),
    Fans(Vec<FanData>),
    Messages(Vec<MinerMessage>),
    Temperature(Temperature),
    Power(Power),
    Duration(Duration),
    Flag(bool),
    Config(MinerConfig),
}

impl DataValue {
    pub fn as_mac(&self) -> Option<MacAddr> {
        match self {
            DataValue::Mac(mac) => Some(*mac),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_hashrate(&self) -> Option<&HashRate> {
        match self {
            DataValue::Hashrate(hr) => Some(hr),
            _ => None,
        }
    }

    pub fn as_hashboards(&self) -> Option<&[BoardData]> {
        match self {
            DataValue::Hashboards(boards) => Some(boards),
            _ => None,
        }
    }

    pub fn as_fans(&self) -> Option<&[FanData]> {
        match self {
            DataValue::Fans(fans) => Some(fans),
            _ => None,
        }
    }

    pub fn as_messages(&self) -> Option<&[MinerMessage]> {
        match self {
            DataValue::Messages(messages) => Some(messages),
            _ => None,
        }
    }

    pub fn as_temperature(&self) -> Option<Temperature> {
        match self {
            DataValue::Temperature(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_power(&self) -> Option<Power> {
        match self {
            DataValue::Power(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            DataValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            DataValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&MinerConfig> {
        match self {
            DataValue::Config(cfg) => Some(cfg),
            _ => None,
        }
    }

    pub fn into_config(self) -> Option<MinerConfig> {
        match self {
            DataValue::Config(cfg) => Some(cfg),
            _ => None,
        }
    }
}

/// Why a field has no value this cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// A declared endpoint could not be fetched.
    #[error("endpoint {0} unavailable")]
    Unavailable(Endpoint),
    /// The response did not contain the expected key or path.
    #[error("missing {0}")]
    Missing(&'static str),
    /// The response contained the path, but not in a usable shape.
    #[error("malformed {0}")]
    Malformed(String),
    /// The device family has no such signal.
    #[error("not supported by this miner")]
    Unsupported,
    /// The extractor read an endpoint it does not declare in the registry.
    #[error("endpoint {0} was not declared for this field")]
    Undeclared(Endpoint),
}

pub type FieldResult = Result<DataValue, FieldError>;

/// Computes one field from the responses of its declared endpoints.
///
/// Extractors are plain functions: they get the device's static metadata and a
/// read-only view of the cycle's responses, and never perform I/O themselves.
pub type Extractor = fn(&DeviceInfo, &Responses<'_>) -> FieldResult;

/// Where a field's data comes from and how to compute it.
#[derive(Clone, Copy)]
pub struct DataLocation {
    /// Function used to compute the field from the fetched responses.
    pub extractor: Extractor,
    /// Endpoints the extractor reads, possibly none for static fields.
    pub endpoints: &'static [Endpoint],
}

impl DataLocation {
    pub const fn new(extractor: Extractor, endpoints: &'static [Endpoint]) -> Self {
        DataLocation {
            extractor,
            endpoints,
        }
    }

    /// A field the family registers but has no signal for.
    pub const fn unsupported() -> Self {
        DataLocation {
            extractor: unsupported,
            endpoints: &[],
        }
    }
}

impl fmt::Debug for DataLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLocation")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

fn unsupported(_: &DeviceInfo, _: &Responses<'_>) -> FieldResult {
    Err(FieldError::Unsupported)
}

/// The static dispatch table of one device family.
#[derive(Debug)]
pub struct FieldRegistry {
    locations: &'static [(DataField, DataLocation)],
}

impl FieldRegistry {
    pub const fn new(locations: &'static [(DataField, DataLocation)]) -> Self {
        FieldRegistry { locations }
    }

    /// The location of a field, or `None` if this family does not register it.
    pub fn get(&self, field: DataField) -> Option<&DataLocation> {
        self.locations
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, location)| location)
    }

    /// All fields this family registers, in registry order.
    pub fn fields(&self) -> impl Iterator<Item = DataField> + '_ {
        self.locations.iter().map(|(f, _)| *f)
    }

    /// Determines the unique set of endpoints needed for the requested fields.
    ///
    /// Endpoints keep the order they are first needed in. Unregistered fields
    /// contribute nothing.
    pub fn required_endpoints(&self, fields: &[DataField]) -> Vec<Endpoint> {
        let mut seen = HashSet::new();
        fields
            .iter()
            .filter_map(|&field| self.get(field))
            .flat_map(|location| location.endpoints.iter().copied())
            .filter(|endpoint| seen.insert(*endpoint))
            .collect()
    }
}

/// Extracts a value from a JSON object using a key (flat lookup).
pub fn get_by_key<'a>(data: &'a Value, key: &'static str) -> Result<&'a Value, FieldError> {
    data.get(key).ok_or(FieldError::Missing(key))
}

/// Extracts a value from a JSON object using a JSON pointer path.
pub fn get_by_pointer<'a>(data: &'a Value, pointer: &'static str) -> Result<&'a Value, FieldError> {
    data.pointer(pointer).ok_or(FieldError::Missing(pointer))
}

pub fn as_f64(value: &Value, what: &str) -> Result<f64, FieldError> {
    value
        .as_f64()
        .ok_or_else(|| FieldError::Malformed(format!("{what}: expected number, got {value}")))
}

pub fn as_u64(value: &Value, what: &str) -> Result<u64, FieldError> {
    value.as_u64().ok_or_else(|| {
        FieldError::Malformed(format!("{what}: expected unsigned integer, got {value}"))
    })
}

pub fn as_str<'a>(value: &'a Value, what: &str) -> Result<&'a str, FieldError> {
    value
        .as_str()
        .ok_or_else(|| FieldError::Malformed(format!("{what}: expected string, got {value}")))
}

pub fn as_bool(value: &Value, what: &str) -> Result<bool, FieldError> {
    value
        .as_bool()
        .ok_or_else(|| FieldError::Malformed(format!("{what}: expected bool, got {value}")))
}
