use crate::miners::api::ApiError;
use crate::miners::backends::traits::GetMinerData;
use crate::miners::data::{DataField, DataValue, Endpoint, FieldError, FieldResult};
use futures::future::join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use strum::IntoEnumIterator;
use tracing::{debug, warn};

/// Responses fetched during one collection cycle, keyed by endpoint.
///
/// Failed fetches are kept alongside successful ones so extractors can tell an
/// unavailable endpoint from one that was never requested.
pub type ResponseCache = HashMap<Endpoint, Result<Value, ApiError>>;

/// The view of the cycle's responses handed to one extractor.
///
/// Only the endpoints the field declared are readable.
pub struct Responses<'a> {
    cache: &'a ResponseCache,
    declared: &'static [Endpoint],
}

impl<'a> Responses<'a> {
    pub fn new(cache: &'a ResponseCache, declared: &'static [Endpoint]) -> Self {
        Self { cache, declared }
    }

    /// The payload fetched for `endpoint`.
    pub fn get(&self, endpoint: Endpoint) -> Result<&'a Value, FieldError> {
        if !self.declared.contains(&endpoint) {
            return Err(FieldError::Undeclared(endpoint));
        }
        match self.cache.get(&endpoint) {
            Some(Ok(value)) => Ok(value),
            _ => Err(FieldError::Unavailable(endpoint)),
        }
    }
}

/// The result of one collection cycle.
///
/// Every requested field the miner registers has an entry, holding either its value
/// or the reason it is absent. Fields the miner does not register have no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    fields: HashMap<DataField, FieldResult>,
}

impl Snapshot {
    /// The value of a field, or `None` if it could not be determined this cycle.
    pub fn get(&self, field: DataField) -> Option<&DataValue> {
        self.fields.get(&field)?.as_ref().ok()
    }

    /// The full outcome of a field, `None` if the miner does not register it.
    pub fn outcome(&self, field: DataField) -> Option<&FieldResult> {
        self.fields.get(&field)
    }

    pub fn take(&mut self, field: DataField) -> Option<DataValue> {
        self.fields.remove(&field)?.ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DataField, &FieldResult)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, field: DataField, outcome: FieldResult) {
        self.fields.insert(field, outcome);
    }
}

/// A utility for collecting structured miner data from an API backend.
///
/// Each call to [`DataCollector::collect`] is one cycle: it fetches every endpoint
/// the requested fields need exactly once, then runs each field's extractor against
/// those responses. Nothing is cached between cycles.
pub struct DataCollector<'a, M: GetMinerData + ?Sized> {
    /// Backend-specific data mapping logic.
    miner: &'a M,
}

impl<'a, M: GetMinerData + ?Sized> DataCollector<'a, M> {
    pub fn new(miner: &'a M) -> Self {
        Self { miner }
    }

    /// Collects **all** fields the miner supports.
    pub async fn collect_all(&self) -> Snapshot {
        self.collect(&DataField::iter().collect::<Vec<_>>()).await
    }

    /// Collects only the specified fields from the miner.
    ///
    /// This sends only the minimum required set of API commands. A failed command
    /// or extractor only affects the fields depending on it; partial results are
    /// returned as a normal snapshot.
    pub async fn collect(&self, fields: &[DataField]) -> Snapshot {
        let registry = self.miner.registry();
        let mut seen = HashSet::new();
        let fields: Vec<DataField> = fields.iter().copied().filter(|f| seen.insert(*f)).collect();

        let endpoints = registry.required_endpoints(&fields);
        debug!(?endpoints, "fetching");
        let cache = self.fetch(&endpoints).await;

        let info = self.miner.device_info();
        let mut snapshot = Snapshot::default();
        for field in fields {
            let Some(location) = registry.get(field) else {
                debug!(%field, "not registered for this miner");
                continue;
            };
            let responses = Responses::new(&cache, location.endpoints);
            let outcome = (location.extractor)(info, &responses);
            if let Err(e) = &outcome {
                debug!(%field, error = %e, "field absent");
            }
            snapshot.insert(field, outcome);
        }
        snapshot
    }

    /// Sends every endpoint concurrently, recording failures instead of stopping.
    async fn fetch(&self, endpoints: &[Endpoint]) -> ResponseCache {
        let api = self.miner.api_client();
        let responses = join_all(endpoints.iter().map(|&endpoint| async move {
            let response = api.send_command(endpoint).await;
            (endpoint, response)
        }))
        .await;

        responses
            .into_iter()
            .inspect(|(endpoint, response)| {
                if let Err(e) = response {
                    warn!(%endpoint, error = %e, "endpoint unavailable");
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::device::models::whatsminer::WhatsMinerModel;
    use crate::data::device::{DeviceInfo, HashAlgorithm, MinerFirmware, MinerModel};
    use crate::miners::api::ApiClient;
    use crate::miners::api::mock::MockApiClient;
    use crate::miners::data::{DataLocation, FieldRegistry, as_str, get_by_key};
    use async_trait::async_trait;
    use serde_json::json;
    use std::net::IpAddr;
    use std::time::Duration;

    const STATUS: Endpoint = Endpoint::web("status");
    const NETWORK: Endpoint = Endpoint::web("network");

    fn hostname(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
        let name = as_str(get_by_key(r.get(STATUS)?, "hostname")?, "hostname")?;
        Ok(DataValue::Text(name.to_string()))
    }

    fn firmware(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
        let fw = as_str(get_by_key(r.get(STATUS)?, "fw")?, "fw")?;
        Ok(DataValue::Text(fw.to_string()))
    }

    fn uptime(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
        let secs = get_by_key(r.get(STATUS)?, "uptime")?
            .as_u64()
            .ok_or_else(|| FieldError::Malformed("uptime".into()))?;
        Ok(DataValue::Duration(Duration::from_secs(secs)))
    }

    fn mac(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
        let mac = as_str(get_by_key(r.get(NETWORK)?, "mac")?, "mac")?;
        mac.parse()
            .map(DataValue::Mac)
            .map_err(|_| FieldError::Malformed(mac.to_string()))
    }

    fn sneaky(_: &DeviceInfo, r: &Responses<'_>) -> FieldResult {
        r.get(NETWORK)?;
        Ok(DataValue::Flag(true))
    }

    static REGISTRY: FieldRegistry = FieldRegistry::new(&[
        (DataField::Hostname, DataLocation::new(hostname, &[STATUS])),
        (DataField::FirmwareVersion, DataLocation::new(firmware, &[STATUS])),
        (DataField::Uptime, DataLocation::new(uptime, &[STATUS])),
        (DataField::Mac, DataLocation::new(mac, &[NETWORK])),
        (DataField::FaultLight, DataLocation::new(sneaky, &[STATUS])),
        (DataField::IsMining, DataLocation::unsupported()),
    ]);

    struct TestMiner<C> {
        info: DeviceInfo,
        api: C,
    }

    impl<C: ApiClient + 'static> GetMinerData for TestMiner<C> {
        fn ip(&self) -> IpAddr {
            IpAddr::from([10, 0, 0, 2])
        }

        fn device_info(&self) -> &DeviceInfo {
            &self.info
        }

        fn registry(&self) -> &'static FieldRegistry {
            &REGISTRY
        }

        fn api_client(&self) -> &dyn ApiClient {
            &self.api
        }
    }

    fn miner<C>(api: C) -> TestMiner<C> {
        TestMiner {
            info: DeviceInfo::new(
                MinerModel::WhatsMiner(WhatsMinerModel::M32V10),
                MinerFirmware::EPic,
                HashAlgorithm::SHA256,
            ),
            api,
        }
    }

    fn healthy() -> MockApiClient {
        MockApiClient::new()
            .with_response(STATUS, json!({"hostname": "rig-01", "fw": "1.2.3", "uptime": 3600}))
            .with_response(NETWORK, json!({"mac": "00:11:22:33:44:55"}))
    }

    #[tokio::test]
    async fn fields_sharing_an_endpoint_fetch_it_once() {
        let miner = miner(healthy());
        let snapshot = DataCollector::new(&miner)
            .collect(&[DataField::Hostname, DataField::FirmwareVersion, DataField::Uptime])
            .await;

        assert_eq!(miner.api.calls(), vec![STATUS]);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.get(DataField::Hostname).and_then(DataValue::as_text),
            Some("rig-01")
        );
        assert_eq!(
            snapshot.get(DataField::Uptime).and_then(DataValue::as_duration),
            Some(Duration::from_secs(3600))
        );
    }

    #[tokio::test]
    async fn distinct_endpoints_are_each_fetched() {
        let miner = miner(healthy());
        DataCollector::new(&miner).collect_all().await;

        let mut calls = miner.api.calls();
        calls.sort();
        assert_eq!(calls, vec![NETWORK, STATUS]);
    }

    #[tokio::test]
    async fn failed_endpoint_only_affects_its_dependents() {
        let api = MockApiClient::new()
            .with_response(STATUS, json!({"hostname": "rig-01", "fw": "1.2.3", "uptime": 3600}))
            .with_error(NETWORK, ApiError::Timeout);
        let miner = miner(api);
        let snapshot = DataCollector::new(&miner)
            .collect(&[DataField::Mac, DataField::Hostname])
            .await;

        assert_eq!(
            snapshot.outcome(DataField::Mac),
            Some(&Err(FieldError::Unavailable(NETWORK)))
        );
        assert!(snapshot.get(DataField::Hostname).is_some());
    }

    #[tokio::test]
    async fn every_endpoint_down_is_still_a_snapshot() {
        let api = MockApiClient::new()
            .with_error(STATUS, ApiError::Network("connection refused".into()))
            .with_error(NETWORK, ApiError::Network("connection refused".into()));
        let miner = miner(api);
        let snapshot = DataCollector::new(&miner).collect_all().await;

        assert_eq!(snapshot.len(), 6);
        assert!(snapshot.iter().all(|(_, outcome)| outcome.is_err()));
    }

    #[tokio::test]
    async fn malformed_payload_is_absent_for_that_field_only() {
        let api = MockApiClient::new()
            .with_response(STATUS, json!({"hostname": 42, "fw": "1.2.3", "uptime": "later"}));
        let miner = miner(api);
        let snapshot = DataCollector::new(&miner)
            .collect(&[DataField::Hostname, DataField::FirmwareVersion, DataField::Uptime])
            .await;

        assert!(matches!(
            snapshot.outcome(DataField::Hostname),
            Some(Err(FieldError::Malformed(_)))
        ));
        assert!(snapshot.get(DataField::Uptime).is_none());
        assert_eq!(
            snapshot.get(DataField::FirmwareVersion).and_then(DataValue::as_text),
            Some("1.2.3")
        );
    }

    #[tokio::test]
    async fn unregistered_field_is_absent_and_never_fetched() {
        let miner = miner(healthy());
        let collector = DataCollector::new(&miner);
        for _ in 0..3 {
            let snapshot = collector.collect(&[DataField::Hashboards]).await;
            assert!(snapshot.get(DataField::Hashboards).is_none());
            assert!(snapshot.outcome(DataField::Hashboards).is_none());
        }
        assert!(miner.api.calls().is_empty());
    }

    #[tokio::test]
    async fn static_field_runs_without_fetching() {
        let miner = miner(healthy());
        let snapshot = DataCollector::new(&miner).collect(&[DataField::IsMining]).await;

        assert!(miner.api.calls().is_empty());
        assert_eq!(
            snapshot.outcome(DataField::IsMining),
            Some(&Err(FieldError::Unsupported))
        );
    }

    #[tokio::test]
    async fn extractor_cannot_read_undeclared_endpoint() {
        let miner = miner(healthy());
        let snapshot = DataCollector::new(&miner)
            .collect(&[DataField::FaultLight, DataField::Mac])
            .await;

        assert_eq!(
            snapshot.outcome(DataField::FaultLight),
            Some(&Err(FieldError::Undeclared(NETWORK)))
        );
    }

    #[tokio::test]
    async fn duplicate_requests_collapse() {
        let miner = miner(healthy());
        let snapshot = DataCollector::new(&miner)
            .collect(&[DataField::Mac, DataField::Mac])
            .await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(miner.api.calls(), vec![NETWORK]);
    }

    #[tokio::test]
    async fn repeated_cycles_are_equal_and_fetch_fresh() {
        let miner = miner(healthy());
        let collector = DataCollector::new(&miner);
        let first = collector.collect_all().await;
        let second = collector.collect_all().await;

        assert_eq!(first, second);
        assert_eq!(miner.api.calls().len(), 4);
    }

    struct StalledApi;

    #[async_trait]
    impl ApiClient for StalledApi {
        async fn send_command(&self, _: Endpoint) -> Result<Value, ApiError> {
            std::future::pending().await
        }

        async fn send_action(
            &self,
            _: &'static str,
            _: Option<Value>,
        ) -> Result<Value, ApiError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancelled_cycle_yields_no_snapshot() {
        let miner = miner(StalledApi);
        let collector = DataCollector::new(&miner);
        let cycle = tokio::time::timeout(Duration::from_millis(50), collector.collect_all()).await;
        assert!(cycle.is_err());
    }
}
