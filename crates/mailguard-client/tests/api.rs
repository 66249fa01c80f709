//! Integration tests for the REST client and push channels.
//!
//! These tests serve canned responses from an in-process listener, so no
//! MailGuard server is needed.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mailguard_client::{ApiClient, ChannelEvent, ClientConfig, Error, PushChannel, Transport};
use mailguard_core::{
    EmailId, MailView, OutgoingAttachment, OutgoingEmail, ProcessingStatus, PushEvent, ViewState,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const PAGE_JSON: &str = r#"{
    "emails": [
        {"id": 2, "sender": "b@y.com", "recipients": ["a@x.com"], "status": "flagged",
         "flagged": true, "timestamp": "2024-05-01T10:00:00", "detection_results": [{"pattern_type": "ssn"}]},
        {"id": 1, "sender": "c@z.com", "recipients": ["a@x.com"], "status": null}
    ],
    "total": 2, "page": 1, "per_page": 50, "pages": 1
}"#;

fn response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Reads one request (head and body) from `stream`.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        let Some(head_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let head = text[..head_end].to_ascii_lowercase();
        let body = &buf[head_end + 4..];
        if let Some(len) = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            if body.len() >= len {
                break;
            }
        } else if head.contains("transfer-encoding: chunked") {
            if body.ends_with(b"0\r\n\r\n") {
                break;
            }
        } else {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serves `responses` in order, one per connection, and returns the
/// requests received.
async fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for response in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut stream).await);
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
        requests
    });
    (base, handle)
}

fn api(base: &str) -> ApiClient {
    let config = ClientConfig::builder().api_url(base).build().unwrap();
    ApiClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_list_emails_sends_query_and_decodes_page() {
    let (base, server) = serve(vec![response("200 OK", "application/json", PAGE_JSON)]).await;

    let mut state = ViewState::new(MailView::Admin, 50);
    state.set_filters(true, Some(ProcessingStatus::Flagged));
    let page = api(&base).list_emails(&state.query()).await.unwrap();

    assert_eq!(page.emails.len(), 2);
    assert_eq!(page.emails[0].id, EmailId(2));
    assert_eq!(page.emails[1].status, ProcessingStatus::Processed);
    assert_eq!(page.page_count(), 1);

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with(
        "GET /api/emails?page=1&per_page=50&flagged=true&status=flagged&view=admin "
    ));
}

#[tokio::test]
async fn test_non_json_response_is_rejected() {
    let (base, _server) = serve(vec![response(
        "200 OK",
        "text/html; charset=utf-8",
        "<html>proxy login</html>",
    )])
    .await;

    let query = ViewState::new(MailView::Inbox, 100).query();
    let err = api(&base).list_emails(&query).await.unwrap_err();
    assert!(matches!(err, Error::InvalidContentType(ref ct) if ct.starts_with("text/html")));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (base, _server) = serve(vec![response(
        "500 Internal Server Error",
        "application/json",
        r#"{"error": "database locked"}"#,
    )])
    .await;

    let err = api(&base).stats().await.unwrap_err();
    match err {
        Error::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("database locked"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_stats() {
    let body = r#"{"total": 12, "flagged": 3, "blocked": 1, "quarantined": 2, "avg_processing_time_ms": 4.25}"#;
    let (base, _server) = serve(vec![response("200 OK", "application/json", body)]).await;

    let stats = api(&base).stats().await.unwrap();
    assert_eq!(stats.total, 12);
    assert_eq!(stats.quarantined, 2);
    assert!((stats.avg_processing_time_ms - 4.25).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_send_email_multipart() {
    let (base, server) = serve(vec![response(
        "200 OK",
        "application/json",
        r#"{"success": true, "message": "Email sent successfully"}"#,
    )])
    .await;

    let email = OutgoingEmail::new("a@x.com", "Report", "See attached")
        .to("b@y.com")
        .attach(OutgoingAttachment::new("report.txt", b"hello".to_vec()));
    let receipt = api(&base).send_email(&email).await.unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.message.as_deref(), Some("Email sent successfully"));

    let request = &server.await.unwrap()[0];
    assert!(request.starts_with("POST /api/send-email "));
    assert!(request.contains("name=\"from\"\r\n\r\na@x.com"));
    assert!(request.contains("name=\"to\"\r\n\r\nb@y.com"));
    assert!(request.contains("name=\"attachment_0\"; filename=\"report.txt\""));
}

#[tokio::test]
async fn test_send_email_server_error() {
    let (base, _server) = serve(vec![response(
        "400 BAD REQUEST",
        "application/json",
        r#"{"error": "From and To email addresses are required"}"#,
    )])
    .await;

    let email = OutgoingEmail::new("a@x.com", "", "").to("b@y.com");
    let err = api(&base).send_email(&email).await.unwrap_err();
    assert!(matches!(err, Error::Server(ref m) if m == "From and To email addresses are required"));
}

#[tokio::test]
async fn test_download_attachment_to_dir() {
    let (base, server) = serve(vec![response(
        "200 OK",
        "application/octet-stream",
        "secret-bytes",
    )])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let path = api(&base)
        .download_attachment_to(7, dir.path(), "../../report.pdf")
        .await
        .unwrap();
    assert_eq!(path, dir.path().join("report.pdf"));
    assert_eq!(tokio::fs::read(&path).await.unwrap(), b"secret-bytes");

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("GET /api/attachments/7/download "));
}

#[tokio::test]
async fn test_download_missing_attachment() {
    let (base, _server) = serve(vec![response(
        "404 NOT FOUND",
        "application/json",
        r#"{"error": "Attachment file not found"}"#,
    )])
    .await;

    let err = api(&base).download_attachment(9).await.unwrap_err();
    assert_eq!(err.to_string(), "Attachment file not found");
}

async fn next_event(channel: &mut PushChannel) -> ChannelEvent {
    timeout(Duration::from_secs(5), channel.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_event_stream_channel() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        assert!(request.starts_with("GET /api/events/stream "));
        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\n\r\n";
        stream.write_all(head.as_bytes()).await.unwrap();
        stream
            .write_all(b"data: {\"type\": \"connected\", \"client_id\": \"c-1\"}\n\n: keepalive\n\n")
            .await
            .unwrap();
        stream
            .write_all(b"data: {\"type\": \"new_email\", \"data\": {\"id\": 5, \"sender\": \"b@y.com\", \"recipients\": [\"a@x.com\"]}}\n\n")
            .await
            .unwrap();
        // Hold the connection open until the client goes away.
        let mut sink = [0u8; 64];
        let _ = stream.read(&mut sink).await;
    });

    let config = ClientConfig::builder().api_url(&base).build().unwrap();
    let mut channel = PushChannel::open(&config).unwrap();

    assert_eq!(next_event(&mut channel).await, ChannelEvent::Opened);
    assert_eq!(
        next_event(&mut channel).await,
        ChannelEvent::Event(PushEvent::Connected {
            client_id: Some("c-1".into())
        })
    );
    let ChannelEvent::Event(PushEvent::NewEmail(record)) = next_event(&mut channel).await else {
        panic!("expected new_email");
    };
    assert_eq!(record.id, EmailId(5));
    channel.close().await;
}

#[tokio::test]
async fn test_socket_channel() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let text = |s: &str| Message::Text(s.to_string());

        ws.send(text(r#"0{"sid":"e1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#))
            .await
            .unwrap();
        assert_eq!(ws.next().await.unwrap().unwrap(), text("40"));
        ws.send(text(r#"40{"sid":"s1"}"#)).await.unwrap();
        ws.send(text(r#"42["connected",{"status":"connected","socket_id":"s1"}]"#))
            .await
            .unwrap();
        ws.send(text(r#"42["typing",{}]"#)).await.unwrap();
        ws.send(text(
            r#"42["new_email",{"id":8,"sender":"b@y.com","recipients":["a@x.com"],"status":"blocked"}]"#,
        ))
        .await
        .unwrap();
        ws.send(text("2")).await.unwrap();
        assert_eq!(ws.next().await.unwrap().unwrap(), text("3"));
        ws.send(text("41")).await.unwrap();
    });

    let config = ClientConfig::builder()
        .api_url(&base)
        .transport(Transport::Socket)
        .build()
        .unwrap();
    let mut channel = PushChannel::open(&config).unwrap();

    assert_eq!(next_event(&mut channel).await, ChannelEvent::Opened);
    assert_eq!(
        next_event(&mut channel).await,
        ChannelEvent::Event(PushEvent::Connected {
            client_id: Some("s1".into())
        })
    );
    let ChannelEvent::Event(PushEvent::NewEmail(record)) = next_event(&mut channel).await else {
        panic!("expected new_email");
    };
    assert_eq!(record.status, ProcessingStatus::Blocked);
    assert!(matches!(
        next_event(&mut channel).await,
        ChannelEvent::Event(PushEvent::Disconnect { .. })
    ));
    assert_eq!(next_event(&mut channel).await, ChannelEvent::Closed);
    server.await.unwrap();
}
