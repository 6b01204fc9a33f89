//! Polls network-attached mining devices for telemetry and normalizes what they
//! report.
//!
//! Each firmware family declares, per [`DataField`], which endpoints it needs and
//! how to read the field out of their responses. [`DataCollector`] fetches each
//! endpoint once per cycle and runs the extractors, returning a [`Snapshot`] that
//! tolerates any field or endpoint failing.

pub mod data;
pub mod logging;
pub mod miners;
pub mod settings;

pub use miners::backends::traits::{GetMinerData, Miner, MinerControl};
pub use miners::collector::{DataCollector, Snapshot};
pub use miners::data::{DataField, DataValue, Endpoint, FieldError};
pub use miners::get_miner;
pub use settings::ClientSettings;
