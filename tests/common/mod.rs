//! Minimal scripted HTTP backend for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
    pub authorization: Option<String>,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }

    /// Query string with percent-escapes decoded
    pub fn query(&self) -> String {
        let raw = self.url.split_once('?').map(|(_, q)| q).unwrap_or("");
        urlencoding::decode(raw).unwrap().into_owned()
    }
}

pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Handler = dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync;

pub struct MockServer {
    pub url: String,
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let worker = Arc::clone(&server);
        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for mut request in worker.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let recorded = RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    body,
                    authorization: request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.as_str().to_string()),
                };
                log.lock().unwrap().push(recorded.clone());

                let reply = handler(&recorded);
                if let Some(delay) = reply.delay {
                    thread::sleep(delay);
                }
                let response = Response::from_string(reply.body)
                    .with_status_code(reply.status)
                    .with_header(Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap());
                let _ = request.respond(response);
            }
        });

        Self {
            url: format!("http://127.0.0.1:{}", port),
            server,
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until a request to `path` has been recorded
    pub fn wait_for(&self, method: &str, path: &str, timeout: Duration) -> Option<RecordedRequest> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(found) = self
                .requests()
                .into_iter()
                .find(|r| r.method == method && r.path() == path)
            {
                return Some(found);
            }
            thread::sleep(Duration::from_millis(20));
        }
        None
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

pub fn token_body(access: &str, refresh: &str, expires_in: u64) -> String {
    format!(
        r#"{{"data": {{"access_token": "{}", "refresh_token": "{}", "token_type": "Bearer", "expires_in": {}, "refresh_expires_in": 604800, "user": {{"id": 5, "email": "me@example.com", "display_name": "Me"}}}}}}"#,
        access, refresh, expires_in
    )
}
