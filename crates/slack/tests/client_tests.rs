//! HTTP client tests against a local mock server
//!
//! Each scripted response is served on its own connection, so every request
//! the client makes shows up as one entry in the recorded request heads.

use slack::{SlackApi, SlackClient, SlackError};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct MockServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Serve `responses` in order, one connection each, then stop
    fn start(responses: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut head = String::new();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                    head.push_str(&line);
                }
                log.lock().unwrap().push(head);
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{}/api", port),
            requests,
            handle,
        }
    }

    /// Wait for the server to finish and return the request heads it saw
    fn finish(self) -> Vec<String> {
        self.handle.join().unwrap();
        let requests = self.requests.lock().unwrap();
        requests.clone()
    }
}

fn response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}

fn request_line(head: &str) -> &str {
    head.lines().next().unwrap_or_default()
}

#[test]
fn test_successful_call_sends_token_and_params() {
    let server = MockServer::start(vec![response(
        "200 OK",
        &[],
        r#"{"ok": true, "members": []}"#,
    )]);
    let client = SlackClient::with_base_url("xoxb-test", server.base_url.clone());

    let body = client
        .call(
            "users.list",
            &[
                ("include_locale", "true".to_string()),
                ("cursor", "abc".to_string()),
            ],
        )
        .unwrap();
    assert_eq!(body["ok"], true);

    let requests = server.finish();
    assert_eq!(requests.len(), 1);
    let line = request_line(&requests[0]);
    assert!(line.starts_with("GET /api/users.list?"), "{}", line);
    assert!(line.contains("include_locale=true"), "{}", line);
    assert!(line.contains("cursor=abc"), "{}", line);
    assert!(!line.contains("xoxb-test"), "token leaked into URL: {}", line);
    assert!(
        requests[0]
            .to_lowercase()
            .contains("authorization: bearer xoxb-test")
    );
}

#[test]
fn test_rate_limit_waits_then_retries_identical_request() {
    let server = MockServer::start(vec![
        response("429 Too Many Requests", &[("Retry-After", "2")], ""),
        response("200 OK", &[], r#"{"ok": true, "team": {"id": "T1"}}"#),
    ]);
    let client = SlackClient::with_base_url("xoxb-test", server.base_url.clone());

    let started = Instant::now();
    let body = client
        .call("team.info", &[("team", "T1".to_string())])
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(body["team"]["id"], "T1");

    let requests = server.finish();
    assert_eq!(requests.len(), 2);
    assert_eq!(request_line(&requests[0]), request_line(&requests[1]));
}

#[test]
fn test_body_over_ten_mib_is_read_in_full() {
    let members: Vec<String> = (0..60_000)
        .map(|i| format!(r#"{{"id": "U{:06}", "real_name": "{}"}}"#, i, "x".repeat(160)))
        .collect();
    let body = format!(r#"{{"ok": true, "members": [{}]}}"#, members.join(","));
    assert!(body.len() > 10 * 1024 * 1024);

    let server = MockServer::start(vec![response("200 OK", &[], &body)]);
    let client = SlackClient::with_base_url("xoxb-test", server.base_url.clone());

    let result = client.call("users.list", &[]).unwrap();
    let members = result["members"].as_array().unwrap();
    assert_eq!(members.len(), 60_000);
    assert_eq!(members[59_999]["id"], "U059999");
    server.finish();
}

#[test]
fn test_server_error_is_fatal() {
    let server = MockServer::start(vec![response(
        "500 Internal Server Error",
        &[],
        "upstream exploded",
    )]);
    let client = SlackClient::with_base_url("xoxb-test", server.base_url.clone());

    let err = client.call("emoji.list", &[]).unwrap_err();
    match err {
        SlackError::Status {
            method,
            status,
            body,
        } => {
            assert_eq!(method, "emoji.list");
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(server.finish().len(), 1);
}

#[test]
fn test_not_ok_body_is_fatal() {
    let server = MockServer::start(vec![response(
        "200 OK",
        &[],
        r#"{"ok": false, "error": "not_authed"}"#,
    )]);
    let client = SlackClient::with_base_url("xoxb-test", server.base_url.clone());

    let err = client.call("team.info", &[]).unwrap_err();
    assert!(matches!(
        &err,
        SlackError::NotOk { method, error } if method == "team.info" && error == "not_authed"
    ));
    assert!(err.to_string().contains("not_authed"));
    server.finish();
}

#[test]
fn test_non_json_body_is_fatal() {
    let server = MockServer::start(vec![response("200 OK", &[], "<html></html>")]);
    let client = SlackClient::with_base_url("xoxb-test", server.base_url.clone());

    let err = client.call("team.info", &[]).unwrap_err();
    assert!(matches!(err, SlackError::Decode { .. }));
    server.finish();
}
