//! End-to-end poll against a local HTTP server serving canned Freshdesk responses.

use std::collections::HashMap;

use futures::StreamExt;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use freshdesk_connector::{
    load_credentials, ConnectorConfig, ConnectorError, Document, FreshdeskClient,
    TicketPollConnector,
};

struct Canned {
    status: u16,
    body: String,
    next_page: Option<u32>,
}

fn canned(status: u16, body: impl Into<String>) -> Canned {
    Canned {
        status,
        body: body.into(),
        next_page: None,
    }
}

/// Serve one canned response per entry, forwarding each raw request head.
async fn serve(responses: Vec<Canned>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for Canned { status, body, next_page } in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&buf).to_string());

            let reason = if status == 200 { "OK" } else { "Error" };
            let link = next_page
                .map(|page| {
                    format!(
                        "Link: <https://acme.freshdesk.com/api/v2/tickets?per_page=30&page={page}>; rel=\"next\"\r\n"
                    )
                })
                .unwrap_or_default();
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n{link}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    });

    (format!("http://{addr}"), rx)
}

fn connector(base_url: &str, batch_size: usize) -> TicketPollConnector<FreshdeskClient> {
    let mut creds = HashMap::new();
    creds.insert("freshdesk_domain".to_string(), "acme".to_string());
    creds.insert("freshdesk_api_key".to_string(), "secret".to_string());

    let mut config = ConnectorConfig::with_credentials(load_credentials(&creds));
    config.batch_size = batch_size;
    let client = FreshdeskClient::new(&config.credentials)
        .unwrap()
        .with_base_url(base_url);
    TicketPollConnector::new(config, client)
}

fn ticket_page(ids: std::ops::RangeInclusive<u64>) -> String {
    let tickets: Vec<_> = ids
        .map(|id| {
            json!({
                "id": id,
                "subject": format!("Issue {id}"),
                "status": 2,
                "priority": 1,
                "type": "Question",
                "due_by": "2000-01-01 00:00:00",
                "description": "<div>secret body</div>",
                "custom_fields": {"cf_plan": "gold"}
            })
        })
        .collect();
    serde_json::to_string(&tickets).unwrap()
}

#[tokio::test]
async fn polls_tickets_with_basic_auth_and_paging() {
    let (base_url, mut requests) =
        serve(vec![
            Canned {
                next_page: Some(2),
                ..canned(200, ticket_page(1..=30))
            },
            canned(200, ticket_page(31..=31)),
        ])
        .await;
    let connector = connector(&base_url, 30);

    let results: Vec<Result<Vec<Document>, ConnectorError>> =
        connector.poll_source(0, 0).collect().await;

    let sizes: Vec<usize> = results.iter().map(|r| r.as_ref().unwrap().len()).collect();
    assert_eq!(sizes, [30, 1]);

    let doc = &results[0].as_ref().unwrap()[0];
    assert_eq!(doc.id, "1");
    assert_eq!(doc.semantic_identifier, "Issue 1");
    assert_eq!(doc.metadata["status"], json!("Open"));
    assert_eq!(doc.metadata["is_overdue"], json!(true));
    assert_eq!(
        doc.sections[0].link,
        "https://acme.freshdesk.com/helpdesk/tickets/1"
    );
    assert!(!doc.sections[0].text.contains("secret body"));
    assert!(!doc.sections[0].text.contains("custom_fields"));

    let first = requests.recv().await.unwrap();
    assert!(first.starts_with("GET /api/v2/tickets?include=description&per_page=30&page=1 "));
    // base64("secret:x")
    assert!(first.to_lowercase().contains("authorization: basic c2vjcmv0ong="));
    let second = requests.recv().await.unwrap();
    assert!(second.contains("page=2"));
}

#[tokio::test]
async fn server_error_yields_no_documents() {
    let (base_url, _requests) = serve(vec![canned(500, "{\"code\":\"internal\"}")]).await;
    let connector = connector(&base_url, 30);

    let results: Vec<Result<Vec<Document>, ConnectorError>> =
        connector.poll_source(0, 0).collect().await;

    assert_eq!(results.len(), 1);
    match &results[0] {
        Err(ConnectorError::Http { status, body }) => {
            assert_eq!(*status, 500);
            assert!(body.contains("internal"));
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let (base_url, _requests) = serve(vec![canned(200, "<html>maintenance</html>")]).await;
    let connector = connector(&base_url, 30);

    let results: Vec<Result<Vec<Document>, ConnectorError>> =
        connector.poll_source(0, 0).collect().await;

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(ConnectorError::Parse(_))));
}

#[tokio::test]
async fn full_page_without_next_link_is_the_last() {
    let (base_url, mut requests) = serve(vec![canned(200, ticket_page(1..=30))]).await;
    let connector = connector(&base_url, 100);

    let results: Vec<Result<Vec<Document>, ConnectorError>> =
        connector.poll_source(0, 0).collect().await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap().len(), 30);
    assert!(requests.recv().await.unwrap().contains("page=1"));
    assert!(requests.recv().await.is_none());
}
