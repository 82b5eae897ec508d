use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

/// Completion used by most tests; its headings match the digest sections.
#[allow(dead_code)]
pub const FOO_COMPLETION: &str = "Title: Foo\n\
Field or Topic: Testing\n\
Research Question: Does X work?\n\
Methodology: We use Y.\n\
Key Findings:\n\
- We find Z.\n\
- Z holds under load.\n\
Limitations: Small sample.\n\
Personal Takeaway: Try Z on cross-border storefronts.\n";

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum StubReply {
    Completion(String),
    Status(u16, String),
}

#[derive(Debug, Clone)]
pub struct StubRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct OpenAiStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl OpenAiStub {
    pub fn spawn(reply: StubReply) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start openai stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                if request.method() != &tiny_http::Method::Post || request.url() != "/v1/responses"
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_owned());

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                let Ok(parsed) = serde_json::from_str::<Value>(&body) else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid json").with_status_code(400),
                    );
                    continue;
                };
                if parsed.get("input").and_then(Value::as_str).is_none() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("missing input").with_status_code(400),
                    );
                    continue;
                }

                seen.lock().expect("stub request log").push(StubRequest {
                    authorization,
                    body: parsed.clone(),
                });

                let (status, response_body) = match &reply {
                    StubReply::Completion(text) => (
                        200,
                        serde_json::json!({
                            "id": "resp_stub",
                            "object": "response",
                            "model": parsed.get("model").cloned().unwrap_or(Value::String("stub-model".to_owned())),
                            "output": [
                                {
                                    "type": "message",
                                    "role": "assistant",
                                    "content": [
                                        { "type": "output_text", "text": text }
                                    ]
                                }
                            ]
                        }),
                    ),
                    StubReply::Status(status, message) => (
                        *status,
                        serde_json::json!({
                            "error": { "message": message, "type": "stub_error" }
                        }),
                    ),
                };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(response_body.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().expect("stub request log").clone()
    }
}

impl Drop for OpenAiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
