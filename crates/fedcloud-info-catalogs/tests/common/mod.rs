// crates/fedcloud-info-catalogs/tests/common/mod.rs
// ============================================================================
// Module: Catalog Test Helpers
// Description: tiny_http stub server with request recording.
// Purpose: Stand in for remote catalogs in integration tests.
// Dependencies: tiny_http
// ============================================================================

//! Shared helpers for catalog integration tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;

use tiny_http::Request;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;

/// Request as seen by the stub.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// Path and query string.
    pub url: String,
    /// Value of the `X-API-Key` header, if sent.
    pub api_key: Option<String>,
}

/// Stub HTTP server answering every request through a handler.
pub struct StubServer {
    /// Shared server handle, unblocked on drop.
    server: Arc<Server>,
    /// Base URL (`http://127.0.0.1:<port>`).
    base: String,
    /// Recorded requests.
    requests: Arc<Mutex<Vec<Recorded>>>,
    /// Serving thread.
    handle: Option<JoinHandle<()>>,
}

impl StubServer {
    /// Starts a server whose handler maps a request URL to `(status, body)`.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> (u16, Vec<u8>) + Send + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    requests.lock().unwrap().push(record(&request));
                    let (status, body) = handler(request.url());
                    let response = Response::from_data(body).with_status_code(StatusCode(status));
                    let _ = request.respond(response);
                }
            })
        };
        Self {
            server,
            base: format!("http://{addr}"),
            requests,
            handle: Some(handle),
        }
    }

    /// Returns the base URL.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns an absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Captures the parts of a request the tests assert on.
fn record(request: &Request) -> Recorded {
    let api_key = request
        .headers()
        .iter()
        .find(|header| header.field.equiv("X-API-Key"))
        .map(|header| header.value.as_str().to_string());
    Recorded {
        url: request.url().to_string(),
        api_key,
    }
}
