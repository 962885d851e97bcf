//! Test doubles for the transport and sleeper seams

use crate::api::{FetchError, JsonTransport};
use crate::collect::Sleeper;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Replays canned responses in order and remembers every requested path
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, FetchError>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<Result<Value, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl JsonTransport for ScriptedTransport {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        self.requests.lock().unwrap().push(path.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(FetchError::Transport {
                    url: path.to_string(),
                    message: "script exhausted".to_string(),
                })
            })
    }
}

/// Records requested sleeps without waiting
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub(crate) fn transport_error() -> FetchError {
    FetchError::Transport {
        url: "http://test".to_string(),
        message: "connection reset".to_string(),
    }
}

pub(crate) fn status_error(status: u16) -> FetchError {
    FetchError::Status {
        url: "http://test".to_string(),
        status,
    }
}

/// A page body with `count` records numbered from `first_id`
pub(crate) fn page(total: u64, first_id: u64, count: u64) -> Value {
    let data: Vec<Value> = (first_id..first_id + count)
        .map(|id| json!({"_id": id}))
        .collect();
    json!({"total": total, "data": data})
}
