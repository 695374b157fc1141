//! Minimal HTTP/1.1 stand-in for the HubSpot pages API, for integration tests.
//!
//! Serves `GET /cms/v3/pages/site-pages` (paged listing),
//! `GET /cms/v3/pages/site-pages/{id}` and `PATCH /cms/v3/pages/site-pages/{id}`.
//! Every request must carry `Authorization: Bearer <token>`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const PAGES_PREFIX: &str = "/cms/v3/pages/site-pages";

#[derive(Debug, Default)]
pub struct ServerState {
    /// Page id -> content. Listing order is id order.
    pub pages: BTreeMap<String, String>,
    /// Remaining 503 responses per page id before it starts answering.
    pub flaky: HashMap<String, u32>,
    /// Page ids whose updates are rejected with 409.
    pub reject_updates: HashSet<String>,
    /// Every accepted update, in arrival order.
    pub updates: Vec<(String, String)>,
    /// Results per listing page.
    pub list_page_size: usize,
}

#[derive(Clone)]
pub struct CmsServer {
    pub base_url: String,
    pub state: Arc<Mutex<ServerState>>,
}

impl CmsServer {
    pub fn updates(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().updates.clone()
    }
}

/// Starts the server on an ephemeral port. It runs until the process exits.
pub fn start(token: &str, mut state: ServerState) -> CmsServer {
    if state.list_page_size == 0 {
        state.list_page_size = 2;
    }
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(state));
    let token = format!("Bearer {token}");
    let shared = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&shared);
            let token = token.clone();
            thread::spawn(move || handle(stream, &state, &token));
        }
    });
    CmsServer {
        base_url: format!("http://127.0.0.1:{port}"),
        state,
    }
}

struct Request {
    method: String,
    target: String,
    authorization: Option<String>,
    body: Vec<u8>,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let mut authorization = None;
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("authorization") {
                authorization = Some(value.trim().to_string());
            } else if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    Some(Request {
        method,
        target,
        authorization,
        body,
    })
}

fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}

fn handle(mut stream: TcpStream, state: &Mutex<ServerState>, token: &str) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    if req.authorization.as_deref() != Some(token) {
        respond(&mut stream, "401 Unauthorized", r#"{"message":"bad token"}"#);
        return;
    }
    let (path, query) = req.target.split_once('?').unwrap_or((req.target.as_str(), ""));
    let Some(rest) = path.strip_prefix(PAGES_PREFIX) else {
        respond(&mut stream, "404 Not Found", "{}");
        return;
    };
    let mut state = state.lock().unwrap();
    match (req.method.as_str(), rest.trim_start_matches('/')) {
        ("GET", "") => {
            let after = query
                .split('&')
                .find_map(|kv| kv.strip_prefix("after="))
                .and_then(|a| a.parse::<usize>().ok())
                .unwrap_or(0);
            let ids: Vec<&String> = state.pages.keys().collect();
            let end = (after + state.list_page_size).min(ids.len());
            let results: Vec<serde_json::Value> = ids[after.min(end)..end]
                .iter()
                .map(|id| serde_json::json!({ "id": id }))
                .collect();
            let mut body = serde_json::json!({ "results": results });
            if end < ids.len() {
                body["paging"] = serde_json::json!({ "next": { "after": end.to_string() } });
            }
            respond(&mut stream, "200 OK", &body.to_string());
        }
        ("GET", id) => {
            if let Some(left) = state.flaky.get_mut(id).filter(|n| **n > 0) {
                *left -= 1;
                respond(&mut stream, "503 Service Unavailable", "{}");
                return;
            }
            match state.pages.get(id) {
                Some(content) => {
                    let body = serde_json::json!({ "id": id, "content": content });
                    respond(&mut stream, "200 OK", &body.to_string());
                }
                None => respond(&mut stream, "404 Not Found", r#"{"message":"no such page"}"#),
            }
        }
        ("PATCH", id) => {
            if state.reject_updates.contains(id) {
                respond(&mut stream, "409 Conflict", r#"{"message":"conflict"}"#);
                return;
            }
            let parsed: serde_json::Value = match serde_json::from_slice(&req.body) {
                Ok(v) => v,
                Err(_) => {
                    respond(&mut stream, "400 Bad Request", "{}");
                    return;
                }
            };
            let content = parsed["content"].as_str().unwrap_or_default().to_string();
            state.pages.insert(id.to_string(), content.clone());
            state.updates.push((id.to_string(), content));
            respond(&mut stream, "200 OK", "{}");
        }
        _ => respond(&mut stream, "405 Method Not Allowed", "{}"),
    }
}
