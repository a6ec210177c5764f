use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tiny_http::{Header, Response, Server};

use super::http::error_detail;
use super::*;
use crate::direction::Direction;
use crate::session::SessionManager;

struct Captured {
    method: String,
    url: String,
    content_type: Option<String>,
    body: Value,
}

/// Serve exactly one request with the given status and body, reporting what
/// the client sent.
fn serve_once(status: u16, body: &'static str) -> (String, crossbeam_channel::Receiver<Captured>) {
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server
        .server_addr()
        .to_ip()
        .expect("test server listens on ip");
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let Ok(mut request) = server.recv() else {
            return;
        };
        let mut raw = String::new();
        request
            .as_reader()
            .read_to_string(&mut raw)
            .expect("read request body");
        let content_type = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Content-Type"))
            .map(|h| h.value.as_str().to_string());
        let _ = tx.send(Captured {
            method: request.method().to_string(),
            url: request.url().to_string(),
            content_type,
            body: serde_json::from_str(&raw).unwrap_or(Value::Null),
        });
        let header = Header::from_bytes(&b"Content-Type"[..], &b"text/plain; charset=utf-8"[..])
            .expect("static header");
        let _ = request.respond(
            Response::from_string(body)
                .with_status_code(status)
                .with_header(header),
        );
    });
    (format!("http://{addr}/translate"), rx)
}

const CHUNKED_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Transfer-Encoding: chunked\r\n\r\n";
const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

fn chunk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("{:x}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

/// Consume one request: headers, then `Content-Length` bytes of body.
fn read_request(stream: &mut TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while data.len() < header_end + body_len {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }
}

/// Hand-written HTTP/1.1 server for one connection. Writes `parts` with a
/// pause between each so they reach the client as separate reads. With
/// `stall` the socket is then held open and the returned receiver fires
/// when the client hangs up; otherwise the socket is closed right away.
fn serve_raw(parts: Vec<Vec<u8>>, stall: bool) -> (String, Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind raw server");
    let addr = listener.local_addr().expect("raw server addr");
    let (closed_tx, closed_rx) = unbounded();
    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        read_request(&mut stream);
        for part in parts {
            if stream.write_all(&part).and_then(|_| stream.flush()).is_err() {
                return;
            }
            thread::sleep(Duration::from_millis(20));
        }
        if !stall {
            return;
        }
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("set read timeout");
        let mut buf = [0u8; 256];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return
                }
                Err(_) => break,
            }
        }
        let _ = closed_tx.send(());
    });
    (format!("http://{addr}/translate"), closed_rx)
}

fn request(content: &str, direction: Direction) -> TranslateRequest {
    TranslateRequest {
        content: content.to_string(),
        direction,
    }
}

fn drain(source: &mut dyn ChunkSource, cancel: &CancelHandle) -> (String, ReadStep) {
    let mut text = String::new();
    loop {
        match source.read_step(cancel) {
            ReadStep::Chunk(chunk) => text.push_str(&chunk),
            other => return (text, other),
        }
    }
}

#[test]
fn successful_response_streams_body_text() {
    let (endpoint, captured) = serve_once(200, "## 方案\n**要点**");
    let transport = HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap();
    assert_eq!(transport.endpoint(), endpoint);
    let mut sessions = SessionManager::new(Direction::PmToDev);
    let cancel = sessions.begin().unwrap();

    let mut source = transport
        .open(&request("请评估此方案", Direction::DevToPm), &cancel)
        .expect("open stream");
    let (text, last) = drain(source.as_mut(), &cancel);

    assert_eq!(text, "## 方案\n**要点**");
    assert!(matches!(last, ReadStep::Done));

    let seen = captured.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.url, "/translate");
    assert!(seen
        .content_type
        .as_deref()
        .is_some_and(|v| v.starts_with("application/json")));
    assert_eq!(
        seen.body,
        serde_json::json!({"content": "请评估此方案", "direction": "dev_to_pm"})
    );
}

#[test]
fn error_status_uses_detail_from_body() {
    let (endpoint, _captured) = serve_once(500, r#"{"detail":"overloaded"}"#);
    let transport = HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap();
    let mut sessions = SessionManager::new(Direction::PmToDev);
    let cancel = sessions.begin().unwrap();

    let err = transport
        .open(&request("x", Direction::PmToDev), &cancel)
        .err()
        .expect("500 must not open a stream");
    assert_eq!(
        err,
        SessionError::Http {
            status: 500,
            message: "overloaded".to_string()
        }
    );
    assert_eq!(err.to_string(), "overloaded");
}

#[test]
fn error_status_without_json_falls_back_to_status_code() {
    let (endpoint, _captured) = serve_once(502, "<html>bad gateway</html>");
    let transport = HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap();
    let mut sessions = SessionManager::new(Direction::PmToDev);
    let cancel = sessions.begin().unwrap();

    let err = transport
        .open(&request("x", Direction::PmToDev), &cancel)
        .err()
        .expect("502 must not open a stream");
    assert_eq!(err.to_string(), "HTTP error! status: 502");
}

#[test]
fn connection_refused_is_a_request_error() {
    // Bind then drop to get a port nobody listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let transport =
        HttpTransport::new(format!("http://{addr}/translate"), Duration::from_secs(2)).unwrap();
    let mut sessions = SessionManager::new(Direction::PmToDev);
    let cancel = sessions.begin().unwrap();

    let err = transport
        .open(&request("x", Direction::PmToDev), &cancel)
        .err()
        .expect("nothing is listening");
    assert!(matches!(err, SessionError::Request(_)));
}

#[test]
fn cancelled_handle_stops_reading() {
    let (endpoint, _captured) = serve_once(200, "never read");
    let transport = HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap();
    let mut sessions = SessionManager::new(Direction::PmToDev);
    let cancel = sessions.begin().unwrap();

    let mut source = transport
        .open(&request("x", Direction::PmToDev), &cancel)
        .expect("open stream");
    cancel.cancel();
    assert!(matches!(source.read_step(&cancel), ReadStep::Cancelled));
}

#[test]
fn error_detail_handles_shapes() {
    assert_eq!(error_detail(r#"{"detail":"bad"}"#).as_deref(), Some("bad"));
    assert_eq!(
        error_detail(r#"{"detail":[{"msg":"field required"}]}"#).as_deref(),
        Some(r#"[{"msg":"field required"}]"#)
    );
    assert_eq!(error_detail(r#"{"detail":null}"#), None);
    assert_eq!(error_detail(r#"{"detail":""}"#), None);
    assert_eq!(error_detail(r#"{"detail":false}"#), None);
    assert_eq!(error_detail(r#"{"detail":0}"#), None);
    assert_eq!(error_detail(r#"{"detail":0.0}"#), None);
    assert_eq!(error_detail(r#"{"detail":429}"#).as_deref(), Some("429"));
    assert_eq!(error_detail(r#"{"error":"bad"}"#), None);
    assert_eq!(error_detail("not json"), None);
}

#[test]
fn chunked_body_split_inside_a_character_decodes_in_order() {
    // "你好" is e4 bd a0 e5 a5 bd; every chunk boundary cuts a character.
    let mut first = CHUNKED_HEAD.to_vec();
    first.extend(chunk(&[0xe4, 0xbd]));
    let mut last = chunk(&[0xa5, 0xbd]);
    last.extend_from_slice(LAST_CHUNK);
    let (endpoint, _closed) = serve_raw(vec![first, chunk(&[0xa0, 0xe5]), last], false);
    let transport = HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap();
    let mut sessions = SessionManager::new(Direction::PmToDev);
    let cancel = sessions.begin().unwrap();

    let mut source = transport
        .open(&request("x", Direction::PmToDev), &cancel)
        .expect("open stream");
    let (text, last) = drain(source.as_mut(), &cancel);

    assert_eq!(text, "你好");
    assert!(matches!(last, ReadStep::Done));
}

#[test]
fn body_cut_before_final_chunk_is_a_stream_error() {
    let mut first = CHUNKED_HEAD.to_vec();
    first.extend(chunk(b"hello"));
    let (endpoint, _closed) = serve_raw(vec![first], false);
    let transport = HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap();
    let mut sessions = SessionManager::new(Direction::PmToDev);
    let cancel = sessions.begin().unwrap();

    let mut source = transport
        .open(&request("x", Direction::PmToDev), &cancel)
        .expect("open stream");
    let (text, last) = drain(source.as_mut(), &cancel);

    assert_eq!(text, "hello");
    assert!(matches!(last, ReadStep::Failed(SessionError::Stream(_))));
}

#[test]
fn cancel_aborts_a_stalled_read_and_closes_the_connection() {
    let mut first = CHUNKED_HEAD.to_vec();
    first.extend(chunk(b"hello"));
    let (endpoint, closed) = serve_raw(vec![first], true);
    let transport = HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap();
    let mut sessions = SessionManager::new(Direction::PmToDev);
    let cancel = sessions.begin().unwrap();

    let mut source = transport
        .open(&request("x", Direction::PmToDev), &cancel)
        .expect("open stream");
    match source.read_step(&cancel) {
        ReadStep::Chunk(text) => assert_eq!(text, "hello"),
        other => panic!("expected first chunk, got {other:?}"),
    }

    let (done_tx, done_rx) = unbounded();
    let worker_cancel = cancel.clone();
    thread::spawn(move || {
        let _ = done_tx.send(source.read_step(&worker_cancel));
    });
    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    cancel.cancel();

    let step = done_rx
        .recv_timeout(Duration::from_secs(1))
        .expect("blocked read returns after cancel");
    assert!(matches!(step, ReadStep::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(1));
    closed
        .recv_timeout(Duration::from_secs(2))
        .expect("server sees the connection close");
}

#[test]
fn cancel_while_waiting_for_headers_returns_promptly() {
    let (endpoint, _closed) = serve_raw(Vec::new(), true);
    let transport = HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap();
    let mut sessions = SessionManager::new(Direction::PmToDev);
    let cancel = sessions.begin().unwrap();

    let (done_tx, done_rx) = unbounded();
    let worker_cancel = cancel.clone();
    thread::spawn(move || {
        let opened = transport.open(&request("x", Direction::PmToDev), &worker_cancel);
        let _ = done_tx.send(opened.is_err());
    });
    thread::sleep(Duration::from_millis(50));
    cancel.cancel();

    let failed = done_rx
        .recv_timeout(Duration::from_secs(1))
        .expect("open returns after cancel");
    assert!(failed);
}
