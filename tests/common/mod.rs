#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Read;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, Server};

/// A small stand-in for the content service: the directory, lore sections,
/// per-channel posts and health, served over real HTTP on a loopback port.
pub struct FakeService {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

#[derive(Default)]
struct State {
    posts: HashMap<String, Vec<Value>>,
    next_id: usize,
}

const CHANNELS: [&str; 4] = ["mission-planning", "npcs", "world-lore", "learned-lore"];

pub fn spawn() -> FakeService {
    spawn_with(None)
}

/// Every request is answered with `status` and a `{"detail": ...}` body.
pub fn spawn_failing(status: u16, detail: &str) -> FakeService {
    spawn_with(Some((status, detail.to_string())))
}

/// A base URL nothing listens on.
pub fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    let port = listener.local_addr().expect("probe addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn spawn_with(failure: Option<(u16, String)>) -> FakeService {
    let server = Server::http("127.0.0.1:0").expect("start fake content service");
    let addr = server.server_addr().to_ip().expect("ip listener");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = requests.clone();

    thread::spawn(move || {
        let mut state = State::default();
        state.posts.insert(
            "mission-planning".into(),
            vec![json!({
                "id": "p1",
                "author": "Head DM",
                "created_at": "2026-01-01T12:00:00+00:00",
                "content": "Mission seed: **Dockside exchange**.",
                "tags": ["mission"]
            })],
        );
        state.next_id = 2;

        for mut req in server.incoming_requests() {
            log.lock().push(format!("{} {}", req.method(), req.url()));
            let (status, body) = match &failure {
                Some((status, detail)) => (*status, json!({ "detail": detail })),
                None => route(&mut state, &mut req),
            };
            respond(req, status, body);
        }
    });

    FakeService {
        base_url: format!("http://{addr}"),
        requests,
    }
}

fn route(state: &mut State, req: &mut Request) -> (u16, Value) {
    let path = req.url().split('?').next().unwrap_or("").to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let method = req.method().clone();
    match (method, segments.as_slice()) {
        (Method::Get, ["health"]) => (200, json!({ "status": "ok" })),
        (Method::Get, ["sections"]) => (
            200,
            json!([
                { "category": "DM Pit of Doom", "channels": [{ "id": "mission-planning", "name": "mission-planning" }] },
                { "category": "Lorewriter Hellscape", "channels": [{ "id": "npcs", "name": "npcs" }] },
                { "category": "Player Discoveries", "channels": [
                    { "id": "world-lore", "name": "world-lore" },
                    { "id": "learned-lore", "name": "learned-lore" }
                ] }
            ]),
        ),
        (Method::Get, ["lore", "sections"]) => (
            200,
            json!([
                { "id": "world-lore", "name": "world-lore" },
                { "id": "learned-lore", "name": "learned-lore" }
            ]),
        ),
        (Method::Get, ["sections", channel, "posts"]) => {
            if !CHANNELS.contains(channel) {
                return not_found();
            }
            let posts = state.posts.get(*channel).cloned().unwrap_or_default();
            (200, Value::Array(posts))
        }
        (Method::Post, ["sections", channel, "posts"]) => {
            if !CHANNELS.contains(channel) {
                return not_found();
            }
            let channel = channel.to_string();
            let mut raw = String::new();
            if req.as_reader().read_to_string(&mut raw).is_err() {
                return (400, json!({ "detail": "unreadable body" }));
            }
            let Ok(body) = serde_json::from_str::<Value>(&raw) else {
                return (422, json!({ "detail": [{ "msg": "body is not JSON" }] }));
            };
            let author = body["author"].as_str().unwrap_or("").trim().to_string();
            let content = body["content"].as_str().unwrap_or("").trim().to_string();
            if author.is_empty() || content.is_empty() {
                return (422, json!({ "detail": [{ "msg": "author and content are required" }] }));
            }
            let post = json!({
                "id": format!("p{}", state.next_id),
                "author": author,
                "created_at": "2026-01-02T08:30:00.000001+00:00",
                "content": content,
                "tags": body.get("tags").cloned().unwrap_or_else(|| json!([]))
            });
            state.next_id += 1;
            state.posts.entry(channel).or_default().push(post.clone());
            (200, post)
        }
        _ => (404, json!({ "detail": "Not Found" })),
    }
}

fn not_found() -> (u16, Value) {
    (404, json!({ "detail": "Section not found" }))
}

fn respond(req: Request, status: u16, body: Value) {
    let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("static header");
    let response = Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header);
    let _ = req.respond(response);
}
