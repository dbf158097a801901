//! Scripted in-memory supplier for tests and local runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::invoke::{ACTION_KEY, InvokeError, RemoteInvoker, SupplierMethod};

type Outcome = Result<Value, InvokeError>;

#[derive(Debug, Default)]
struct ScriptedState {
    queued: HashMap<String, VecDeque<Outcome>>,
    defaults: HashMap<String, Outcome>,
    calls: Vec<Value>,
    latency: Option<Duration>,
}

/// In-memory supplier that answers each action from a script.
///
/// Each action has a FIFO queue of outcomes; once it is drained the optional
/// default outcome for that action answers every further call.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSupplier {
    state: Arc<RwLock<ScriptedState>>,
}

impl ScriptedSupplier {
    /// Creates a supplier with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response body for the next call to `method`.
    pub async fn push_ok(&self, method: SupplierMethod, body: Value) {
        self.push(method, Ok(body)).await;
    }

    /// Queues a transport failure for the next call to `method`.
    pub async fn push_err(&self, method: SupplierMethod, error: InvokeError) {
        self.push(method, Err(error)).await;
    }

    async fn push(&self, method: SupplierMethod, outcome: Outcome) {
        self.state
            .write()
            .await
            .queued
            .entry(method.as_str().to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Sets the response used for `method` once its queue is empty.
    pub async fn set_default_ok(&self, method: SupplierMethod, body: Value) {
        self.state
            .write()
            .await
            .defaults
            .insert(method.as_str().to_string(), Ok(body));
    }

    /// Sets the failure used for `method` once its queue is empty.
    pub async fn set_default_err(&self, method: SupplierMethod, error: InvokeError) {
        self.state
            .write()
            .await
            .defaults
            .insert(method.as_str().to_string(), Err(error));
    }

    /// Delays every response by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = Some(latency);
    }

    /// Returns every payload received so far, oldest first.
    pub async fn calls(&self) -> Vec<Value> {
        self.state.read().await.calls.clone()
    }

    /// Returns how many calls were made for `method`.
    pub async fn call_count(&self, method: SupplierMethod) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|payload| payload[ACTION_KEY] == method.as_str())
            .count()
    }

    /// Clears every script and recorded call.
    pub async fn reset(&self) {
        *self.state.write().await = ScriptedState::default();
    }
}

#[async_trait]
impl RemoteInvoker for ScriptedSupplier {
    async fn invoke(&self, _function: &str, payload: Value) -> Result<Value, InvokeError> {
        let action = payload[ACTION_KEY].as_str().unwrap_or_default().to_string();

        let (outcome, latency) = {
            let mut state = self.state.write().await;
            state.calls.push(payload);
            let queued = state.queued.get_mut(&action).and_then(VecDeque::pop_front);
            let outcome = queued.or_else(|| state.defaults.get(&action).cloned());
            (outcome, state.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        outcome.unwrap_or_else(|| {
            Err(InvokeError::new(format!("no scripted response for {action}")))
        })
    }
}
