use crate::data::config::MinerConfig;
use crate::data::device::DeviceInfo;
use crate::data::miner::MinerData;
use crate::miners::api::ApiClient;
use crate::miners::collector::{DataCollector, Snapshot};
use crate::miners::data::{DataField, DataValue, FieldRegistry};
use async_trait::async_trait;
use measurements::Power;
use std::net::IpAddr;

/// Trait that every miner backend must implement to provide miner data.
///
/// A backend only describes itself: its identity, its transport and the static
/// table of where each field comes from. Collection is shared.
#[async_trait]
pub trait GetMinerData: Send + Sync {
    fn ip(&self) -> IpAddr;

    /// Static capability metadata for this device.
    fn device_info(&self) -> &DeviceInfo;

    /// Returns the field registry of this miner's family.
    ///
    /// This associates each `DataField` with the endpoints it needs and the
    /// extractor that computes it.
    fn registry(&self) -> &'static FieldRegistry;

    fn api_client(&self) -> &dyn ApiClient;

    /// Collect the given fields in one cycle.
    async fn collect(&self, fields: &[DataField]) -> Snapshot {
        DataCollector::new(self).collect(fields).await
    }

    async fn collect_all(&self) -> Snapshot {
        DataCollector::new(self).collect_all().await
    }

    /// Query a single field, fetching only what that field needs.
    async fn get(&self, field: DataField) -> Option<DataValue> {
        self.collect(&[field]).await.take(field)
    }

    /// The current configuration, or an empty one if it cannot be read.
    async fn get_config(&self) -> MinerConfig {
        self.get(DataField::Config)
            .await
            .and_then(DataValue::into_config)
            .unwrap_or_default()
    }

    /// Asynchronously retrieves standardized information about a miner,
    /// returning it as a `MinerData` struct.
    async fn get_data(&self) -> MinerData {
        let snapshot = self.collect_all().await;
        MinerData::from_snapshot(self.ip(), self.device_info().clone(), snapshot)
    }
}

/// State-changing commands.
///
/// Every command reports plain success or failure. A transport error or a response
/// without a success flag is a failure, never an error.
#[async_trait]
pub trait MinerControl: Send + Sync {
    /// Restart the mining process without rebooting the control board.
    async fn restart_backend(&self) -> bool;

    async fn stop_mining(&self) -> bool;

    async fn resume_mining(&self) -> bool;

    async fn reboot(&self) -> bool;

    async fn set_fault_light(&self, on: bool) -> bool;

    async fn set_power_limit(&self, limit: Power) -> bool;

    async fn send_config(&self, config: &MinerConfig) -> bool;
}

/// A fully featured miner backend.
pub trait Miner: GetMinerData + MinerControl {}

impl<T: GetMinerData + MinerControl> Miner for T {}
