//! MockProvider - scripted provider that records every request

use super::{Provider, RpcRequest, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Responses are sticky per method until replaced. Unscripted methods fail
/// with EIP-1193 code 4200 (unsupported method).
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<HashMap<String, Result<Value, TransportError>>>,
    calls: Mutex<Vec<RpcRequest>>,
    flags: HashSet<String>,
}

impl MockProvider {
    pub fn new() -> Self { Self::default() }

    pub fn with_response(self, method: &str, value: Value) -> Self { self.respond(method, value); self }
    pub fn with_error(self, method: &str, error: TransportError) -> Self { self.fail(method, error); self }
    pub fn with_flag(mut self, name: &str) -> Self { self.flags.insert(name.into()); self }

    pub fn respond(&self, method: &str, value: Value) {
        if let Ok(mut responses) = self.responses.lock() { responses.insert(method.into(), Ok(value)); }
    }

    pub fn fail(&self, method: &str, error: TransportError) {
        if let Ok(mut responses) = self.responses.lock() { responses.insert(method.into(), Err(error)); }
    }

    pub fn calls(&self) -> Vec<RpcRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.method == method).count()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn request(&self, request: RpcRequest) -> Result<Value, TransportError> {
        let method = request.method.clone();
        self.calls.lock().map_err(|_| TransportError::Io("mock lock".into()))?.push(request);
        let responses = self.responses.lock().map_err(|_| TransportError::Io("mock lock".into()))?;
        responses
            .get(&method)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::rpc(4200, format!("unsupported method: {}", method))))
    }

    fn flag(&self, name: &str) -> bool { self.flags.contains(name) }
}
