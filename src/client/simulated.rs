//! In-memory transport that replays scripted responses.
//!
//! Responses are queued per method and path. The last response queued for a
//! path keeps being returned once the earlier ones are used up, which lets a
//! polling loop observe a job settle in its final state.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::Credentials;
use super::transport::{Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A call observed by the simulated transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone)]
enum Scripted {
    Body(Value),
    Status { status: u16, body: String },
}

#[derive(Default)]
struct State {
    responses: HashMap<(Method, String), VecDeque<Scripted>>,
    calls: Vec<RecordedCall>,
}

#[derive(Clone, Default)]
pub struct SimulatedTransport {
    state: Arc<Mutex<State>>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_get(&self, path: &str, body: Value) -> &Self {
        self.push(Method::Get, path, Scripted::Body(body))
    }

    pub fn respond_post(&self, path: &str, body: Value) -> &Self {
        self.push(Method::Post, path, Scripted::Body(body))
    }

    /// Answer `method path` with a non-success status.
    pub fn fail(&self, method: Method, path: &str, status: u16, body: &str) -> &Self {
        self.push(
            method,
            path,
            Scripted::Status {
                status,
                body: body.to_string(),
            },
        )
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    fn push(&self, method: Method, path: &str, response: Scripted) -> &Self {
        self.lock()
            .responses
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(
        &self,
        method: Method,
        path: &str,
        body: Option<&str>,
        credentials: &Credentials,
    ) -> Result<Value, TransportError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.map(str::to_string),
            username: credentials.username().to_string(),
        });

        let scripted = match state.responses.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match scripted {
            Some(Scripted::Body(value)) => Ok(value),
            Some(Scripted::Status { status, body }) => Err(TransportError::Status { status, body }),
            None => Err(TransportError::Status {
                status: 404,
                body: format!("no scripted response for {method:?} {path}"),
            }),
        }
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn get_json(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<Value, TransportError> {
        self.answer(Method::Get, path, None, credentials)
    }

    async fn post_json(
        &self,
        path: &str,
        body: &str,
        credentials: &Credentials,
    ) -> Result<Value, TransportError> {
        self.answer(Method::Post, path, Some(body), credentials)
    }
}
