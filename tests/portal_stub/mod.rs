use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub const SESSION_COOKIE: &str = "MoodleSession=stub-session";
pub const SESSKEY: &str = "StubKey42";

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum PortalMode {
    /// Dashboard carries a sesskey and the service returns these events.
    LoggedIn { events: Value },
    /// Dashboard renders the anonymous login form.
    LoginPage,
    /// Service answers the batch with `error: true`.
    BatchError { message: String },
    /// Dashboard looks authenticated but carries no sesskey.
    TokenMissing,
}

#[derive(Debug, Clone)]
pub struct PortalStubConfig {
    pub mode: PortalMode,
    /// Delay before answering the landing page.
    pub landing_delay: Duration,
}

impl PortalStubConfig {
    pub fn new(mode: PortalMode) -> Self {
        Self {
            mode,
            landing_delay: Duration::ZERO,
        }
    }
}

pub struct PortalStub {
    pub base_url: String,
    landing_hits: Arc<AtomicUsize>,
    service_hits: Arc<AtomicUsize>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl PortalStub {
    pub fn spawn(config: PortalStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start portal stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let landing_hits = Arc::new(AtomicUsize::new(0));
        let service_hits = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let landing = Arc::clone(&landing_hits);
        let service = Arc::clone(&service_hits);
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

                let url = request.url().to_string();
                let path = url.split('?').next().unwrap_or(&url).to_string();
                let cookie_ok = request.headers().iter().any(|h| {
                    h.field.equiv("Cookie") && h.value.as_str() == SESSION_COOKIE
                });

                match (request.method(), path.as_str()) {
                    (tiny_http::Method::Get, "/my/") => {
                        landing.fetch_add(1, Ordering::SeqCst);
                        if !config.landing_delay.is_zero() {
                            thread::sleep(config.landing_delay);
                        }
                        let body = landing_page(&config.mode, cookie_ok);
                        let _ = request.respond(html_response(body));
                    }
                    (tiny_http::Method::Post, "/lib/ajax/service.php") => {
                        service.fetch_add(1, Ordering::SeqCst);
                        let mut body = String::new();
                        if request.as_reader().read_to_string(&mut body).is_err() {
                            let _ = request.respond(
                                tiny_http::Response::from_string("invalid request body")
                                    .with_status_code(400),
                            );
                            continue;
                        }
                        if !url.contains(&format!("sesskey={SESSKEY}")) {
                            let _ = request.respond(json_response(&serde_json::json!({
                                "error": "Invalid sesskey"
                            })));
                            continue;
                        }
                        let parsed: Value = match serde_json::from_str(&body) {
                            Ok(value) => value,
                            Err(_) => {
                                let _ = request.respond(
                                    tiny_http::Response::from_string("invalid json")
                                        .with_status_code(400),
                                );
                                continue;
                            }
                        };
                        let method = parsed
                            .pointer("/0/methodname")
                            .and_then(|v| v.as_str())
                            .unwrap_or("");
                        if method != "core_calendar_get_action_events_by_timesort" {
                            let _ = request.respond(
                                tiny_http::Response::from_string(format!(
                                    "unexpected methodname: {method}"
                                ))
                                .with_status_code(400),
                            );
                            continue;
                        }
                        let _ = request.respond(json_response(&service_reply(&config.mode)));
                    }
                    _ => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("not found").with_status_code(404),
                        );
                    }
                }
            }
        });

        Self {
            base_url,
            landing_hits,
            service_hits,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn landing_hits(&self) -> usize {
        self.landing_hits.load(Ordering::SeqCst)
    }

    pub fn service_hits(&self) -> usize {
        self.service_hits.load(Ordering::SeqCst)
    }
}

impl Drop for PortalStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn landing_page(mode: &PortalMode, cookie_ok: bool) -> String {
    if !cookie_ok || matches!(mode, PortalMode::LoginPage) {
        return r#"<!doctype html>
<html><body>
  <p>You are not logged in.</p>
  <form id="loginform" action="/login/index.php"><button>Log in</button></form>
</body></html>
"#
        .to_owned();
    }
    if matches!(mode, PortalMode::TokenMissing) {
        return "<!doctype html><html><body><h1>Dashboard</h1></body></html>\n".to_owned();
    }
    format!(
        r#"<!doctype html>
<html><head><script>M.cfg = {{"wwwroot":"http:\/\/stub","sesskey":"{SESSKEY}"}};</script></head>
<body><h1>Dashboard</h1></body></html>
"#
    )
}

fn service_reply(mode: &PortalMode) -> Value {
    match mode {
        PortalMode::LoggedIn { events } => serde_json::json!([{
            "error": false,
            "data": { "events": events },
        }]),
        PortalMode::BatchError { message } => serde_json::json!([{
            "error": true,
            "exception": { "message": message, "errorcode": "servicerequireslogin" },
        }]),
        PortalMode::LoginPage | PortalMode::TokenMissing => serde_json::json!([{
            "error": true,
        }]),
    }
}

fn html_response(body: String) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    tiny_http::Response::from_string(body).with_header(
        tiny_http::Header::from_bytes("Content-Type", "text/html; charset=utf-8")
            .expect("content-type header"),
    )
}

fn json_response(value: &Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    tiny_http::Response::from_string(value.to_string()).with_header(
        tiny_http::Header::from_bytes("Content-Type", "application/json")
            .expect("content-type header"),
    )
}

/// Two events relative to `now_secs`: one due within a day, one submitted next week.
#[allow(dead_code)]
pub fn sample_events(now_secs: i64) -> Value {
    serde_json::json!([
        {
            "id": 101,
            "name": "Lab 3 is due",
            "timesort": now_secs + 3 * 3600,
            "course": { "fullname": "WIA1002 Data Structures" },
            "action": { "url": "/mod/assign/view.php?id=9", "actionable": true },
            "viewurl": "/mod/assign/view.php?id=9"
        },
        {
            "id": 102,
            "name": "Essay draft is due",
            "timesort": now_secs + 7 * 24 * 3600 - 3600,
            "course": { "fullname": "GIG1013 Ethnic Relations" },
            "action": { "url": "https://stub.example/mod/assign/view.php?id=10", "actionable": false }
        }
    ])
}
