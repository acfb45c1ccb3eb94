#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use {
    fimoney_client::{
        CapabilityState, Dashboard, InvocationResult, QueryResult, ResourceResult, SessionStatus,
    },
    mockito::Matcher,
    serde_json::json,
};

async fn connected_gateway(server: &mut mockito::ServerGuard) -> Vec<mockito::Mock> {
    vec![
        server
            .mock("POST", "/connect")
            .match_body(Matcher::Json(json!({"server_url": "http://localhost:3000"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"connected"}"#)
            .create_async()
            .await,
        server
            .mock("GET", "/tools")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"name":"fetch_bank_transactions","description":"Bank transactions"},
                    {"name":"fetch_net_worth","description":"Net worth"}]"#,
            )
            .create_async()
            .await,
        server
            .mock("GET", "/resources")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"resources":[{"uri":"fi://profile","description":"Profile"}]}"#)
            .create_async()
            .await,
    ]
}

fn dashboard(server: &mockito::ServerGuard) -> Dashboard {
    Dashboard::over_http(&server.url(), Duration::from_secs(5), Vec::new()).unwrap()
}

#[tokio::test]
async fn full_session_against_http_gateway() {
    let mut server = mockito::Server::new_async().await;
    let _gateway = connected_gateway(&mut server).await;
    let call = server
        .mock("POST", "/tools/call")
        .match_body(Matcher::Json(json!({
            "tool_name": "fetch_net_worth",
            "arguments": {"currency": "INR"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"net_worth":120000}"#)
        .create_async()
        .await;
    let _read = server
        .mock("POST", "/resources/read")
        .match_body(Matcher::Json(json!({"resource_uri": "fi://profile"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"Asha"}"#)
        .create_async()
        .await;
    let _query = server
        .mock("POST", "/query")
        .match_body(Matcher::Json(json!({"query": "Show my net worth"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response":"Your net worth is 1,20,000 INR"}"#)
        .create_async()
        .await;
    let disconnect = server
        .mock("POST", "/disconnect")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail":"gateway crashed"}"#)
        .create_async()
        .await;

    let dashboard = dashboard(&server);
    dashboard.connect("http://localhost:3000").await.unwrap();

    let session = dashboard.snapshot();
    assert_eq!(session.status, SessionStatus::Connected);
    assert_eq!(session.server_url.as_deref(), Some("http://localhost:3000"));
    assert_eq!(dashboard.registry().state().await, CapabilityState::Fresh);
    let tools = dashboard.registry().get_tools().await;
    assert_eq!(tools[0].name, "fetch_bank_transactions");
    assert_eq!(tools[0].description, "Bank transactions");

    let result = dashboard
        .invoke("fetch_net_worth", r#"{"currency":"INR"}"#)
        .await;
    assert_eq!(result, InvocationResult::Success(json!({"net_worth": 120000})));
    call.assert_async().await;

    let read = dashboard.read("fi://profile").await;
    assert_eq!(read, ResourceResult::Success(json!({"name": "Asha"})));

    let answer = dashboard.ask("Show my net worth").await;
    assert_eq!(
        answer,
        QueryResult::Success("Your net worth is 1,20,000 INR".into())
    );

    dashboard.disconnect().await.unwrap();
    disconnect.assert_async().await;
    let session = dashboard.snapshot();
    assert_eq!(session.status, SessionStatus::Disconnected);
    assert_eq!(session.server_url, None);
    assert!(session.last_error.unwrap().contains("gateway crashed"));
    assert!(dashboard.registry().get_tools().await.is_empty());
}

#[tokio::test]
async fn gateway_rejecting_connect_leaves_connect_failed() {
    let mut server = mockito::Server::new_async().await;
    let _connect = server
        .mock("POST", "/connect")
        .with_status(502)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"MCP server unreachable"}"#)
        .create_async()
        .await;

    let dashboard = dashboard(&server);
    assert!(dashboard.connect("http://localhost:3000").await.is_err());

    let session = dashboard.snapshot();
    assert_eq!(session.status, SessionStatus::ConnectFailed);
    assert_eq!(session.server_url, None);
    assert!(session.last_error.unwrap().contains("MCP server unreachable"));

    // a failed session resets locally without contacting the gateway
    dashboard.disconnect().await.unwrap();
    assert_eq!(dashboard.snapshot().status, SessionStatus::Disconnected);
}

#[tokio::test]
async fn status_reporting_disconnected_drops_session() {
    let mut server = mockito::Server::new_async().await;
    let _gateway = connected_gateway(&mut server).await;
    let _status = server
        .mock("GET", "/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"connected":false}"#)
        .create_async()
        .await;

    let dashboard = dashboard(&server);
    dashboard.connect("http://localhost:3000").await.unwrap();
    let report = dashboard.session().status().await.unwrap();
    assert!(!report.connected);

    let session = dashboard.snapshot();
    assert_eq!(session.status, SessionStatus::Disconnected);
    assert_eq!(session.last_error.as_deref(), Some("session lost"));
    assert_eq!(dashboard.registry().state().await, CapabilityState::Empty);
}

#[tokio::test]
async fn unreachable_gateway_fails_connect() {
    let dashboard =
        Dashboard::over_http("http://127.0.0.1:1", Duration::from_secs(2), Vec::new()).unwrap();
    let err = dashboard.connect("http://localhost:3000").await.unwrap_err();
    assert!(err.to_string().starts_with("network unreachable"));
    assert_eq!(dashboard.snapshot().status, SessionStatus::ConnectFailed);
}
