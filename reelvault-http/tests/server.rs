use std::net::SocketAddr;
use std::time::Duration;

use reelvault_http::{HttpServer, Method, Outcome, Router, ServerConfig};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn sample_router() -> Router {
    let mut router = Router::new();
    router.register(Method::Get, "/", |_req| Outcome::Json(json!({"abc": "def"})));
    router.register(Method::Get, "/fail", |_req| {
        Outcome::ServerError("handler failed".to_string())
    });
    router
}

fn start_server(session_timeout: Duration) -> SocketAddr {
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap())
        .with_session_timeout(session_timeout);
    let server = HttpServer::bind(config, sample_router()).unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn send_and_collect(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

/// Read exactly one response (head plus Content-Length body) off the stream.
async fn read_response(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8(buffer[..pos].to_vec()).unwrap();
            let content_length: usize = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse().ok())
                        .flatten()
                })
                .unwrap_or(0);
            let total = pos + 4 + content_length;
            while buffer.len() < total {
                let read = stream.read(&mut chunk).await.unwrap();
                assert!(read > 0, "stream closed mid-response");
                buffer.extend_from_slice(&chunk[..read]);
            }
            assert_eq!(buffer.len(), total);
            return String::from_utf8(buffer).unwrap();
        }
        let read = stream.read(&mut chunk).await.unwrap();
        assert!(read > 0, "stream closed before response head");
        buffer.extend_from_slice(&chunk[..read]);
    }
}

fn header_value<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response.lines().find_map(|line| {
        let (header, value) = line.split_once(':')?;
        header.eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

#[tokio::test]
async fn get_root_returns_json_payload() {
    let addr = start_server(ServerConfig::DEFAULT_SESSION_TIMEOUT);
    let response =
        send_and_collect(addr, "GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header_value(&response, "content-type"), Some("application/json"));
    assert!(response.ends_with(r#"{"abc":"def"}"#));
}

#[tokio::test]
async fn unknown_route_returns_404_naming_the_path() {
    let addr = start_server(ServerConfig::DEFAULT_SESSION_TIMEOUT);
    let response = send_and_collect(
        addr,
        "GET /unknown HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(header_value(&response, "content-type"), Some("text/html"));
    assert!(response.contains("Route /unknown is not found."));
}

#[tokio::test]
async fn failing_handler_returns_500() {
    let addr = start_server(ServerConfig::DEFAULT_SESSION_TIMEOUT);
    let response = send_and_collect(
        addr,
        "GET /fail HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(response.contains("handler failed"));
}

#[tokio::test]
async fn head_mirrors_get_with_empty_body() {
    let addr = start_server(ServerConfig::DEFAULT_SESSION_TIMEOUT);
    let get =
        send_and_collect(addr, "GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    let head =
        send_and_collect(addr, "HEAD / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;

    assert_eq!(get.lines().next(), head.lines().next());
    assert_eq!(
        header_value(&get, "content-length"),
        header_value(&head, "content-length")
    );
    assert_eq!(
        header_value(&get, "content-type"),
        header_value(&head, "content-type")
    );
    // Identical headers, no body after the blank line.
    assert!(head.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn keep_alive_serves_sequential_requests_on_one_connection() {
    let addr = start_server(ServerConfig::DEFAULT_SESSION_TIMEOUT);
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: test\r\n\r\n")
        .await
        .unwrap();
    let first = read_response(&mut stream).await;
    assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header_value(&first, "connection"), Some("keep-alive"));

    stream
        .write_all(b"GET /unknown HTTP/1.1\r\nHost: test\r\n\r\n")
        .await
        .unwrap();
    let second = read_response(&mut stream).await;
    assert!(second.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn http10_connection_closes_after_response() {
    let addr = start_server(ServerConfig::DEFAULT_SESSION_TIMEOUT);
    // No Connection header: HTTP/1.0 defaults to close, so read_to_end
    // finishes once the single response is written.
    let response = send_and_collect(addr, "GET / HTTP/1.0\r\nHost: test\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    assert_eq!(header_value(&response, "connection"), Some("close"));
}

#[tokio::test]
async fn idle_session_times_out_with_no_response() {
    let addr = start_server(Duration::from_millis(200));
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server should close the idle connection")
        .unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn malformed_request_tears_down_session_without_response() {
    let addr = start_server(ServerConfig::DEFAULT_SESSION_TIMEOUT);
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"garbage\r\n\r\n").await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server should drop the session")
        .unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn sessions_are_isolated() {
    let addr = start_server(ServerConfig::DEFAULT_SESSION_TIMEOUT);

    // Kill one session with garbage, then verify the acceptor still serves.
    let mut broken = TcpStream::connect(addr).await.unwrap();
    broken.write_all(b"garbage\r\n\r\n").await.unwrap();

    let response =
        send_and_collect(addr, "GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
}
