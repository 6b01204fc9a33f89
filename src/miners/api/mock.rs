//! In-memory transport for tests. Records every call it receives.

use super::{ApiClient, ApiError};
use crate::miners::data::Endpoint;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct MockApiClient {
    responses: HashMap<Endpoint, Result<Value, ApiError>>,
    actions: HashMap<&'static str, Result<Value, ApiError>>,
    calls: Mutex<Vec<Endpoint>>,
    action_calls: Mutex<Vec<(&'static str, Option<Value>)>>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, endpoint: Endpoint, value: Value) -> Self {
        self.responses.insert(endpoint, Ok(value));
        self
    }

    pub fn with_error(mut self, endpoint: Endpoint, error: ApiError) -> Self {
        self.responses.insert(endpoint, Err(error));
        self
    }

    pub fn with_action(mut self, command: &'static str, result: Result<Value, ApiError>) -> Self {
        self.actions.insert(command, result);
        self
    }

    /// Endpoints fetched so far, in call order.
    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().unwrap().clone()
    }

    /// Actions sent so far, in call order.
    pub fn action_calls(&self) -> Vec<(&'static str, Option<Value>)> {
        self.action_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn send_command(&self, endpoint: Endpoint) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(endpoint);
        self.responses
            .get(&endpoint)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::Http(404)))
    }

    async fn send_action(
        &self,
        command: &'static str,
        param: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.action_calls.lock().unwrap().push((command, param));
        self.actions
            .get(command)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::Http(404)))
    }
}
