//! In-memory transport that replays scripted responses

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use serde_json::Value;
use signage_e2e::{ApiResponse, E2eResult, Transport};

/// Recorded request
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// Replays queued responses per `(method, path)`; the last one repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: RefCell<HashMap<(&'static str, String), VecDeque<ApiResponse>>>,
    files: RefCell<HashMap<String, Vec<u8>>>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: &'static str, path: &str, responses: Vec<ApiResponse>) -> &Self {
        self.routes
            .borrow_mut()
            .insert((method, path.to_string()), responses.into());
        self
    }

    pub fn ok_json(&self, method: &'static str, path: &str, bodies: Vec<Value>) -> &Self {
        let responses = bodies
            .into_iter()
            .map(|b| ApiResponse::new(200, b.to_string()))
            .collect();
        self.on(method, path, responses)
    }

    pub fn file(&self, url: &str, raw: Vec<u8>) -> &Self {
        self.files.borrow_mut().insert(url.to_string(), raw);
        self
    }

    pub fn calls(&self, method: &str, path: &str) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .cloned()
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls(method, path).len()
    }

    fn respond(&self, method: &'static str, path: &str, body: Option<&Value>) -> ApiResponse {
        self.calls.borrow_mut().push(Call {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let mut routes = self.routes.borrow_mut();
        match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => ApiResponse::new(404, "{}"),
        }
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, path: &str, _query: &[(&str, String)]) -> E2eResult<ApiResponse> {
        Ok(self.respond("GET", path, None))
    }

    fn post(&self, path: &str, body: Option<&Value>) -> E2eResult<ApiResponse> {
        Ok(self.respond("POST", path, body))
    }

    fn put(&self, path: &str, body: &Value) -> E2eResult<ApiResponse> {
        Ok(self.respond("PUT", path, Some(body)))
    }

    fn download(&self, url: &str) -> E2eResult<Vec<u8>> {
        let raw = self.files.borrow().get(url).cloned();
        self.respond("DOWNLOAD", url, None);
        raw.ok_or_else(|| signage_e2e::E2eError::unexpected(format!("download of {}", url), 404))
    }
}
