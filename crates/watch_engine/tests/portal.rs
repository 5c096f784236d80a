use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use watch_core::NotificationItem;
use watch_engine::{parse_listing, CycleError, FailureKind, FeedSource, PortalClient, PortalSettings, Stage};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer) -> PortalSettings {
    PortalSettings::new(
        format!("{}/Login/SignIn", server.uri()),
        format!("{}/home/notices", server.uri()),
        "student",
        "secret",
    )
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/Login/SignIn"))
        .and(body_string_contains("user=student"))
        .and(body_string_contains("pass=secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": "/auth/complete" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/complete"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "sid=abc123; Path=/"))
        .mount(server)
        .await;
}

/// Runs a full login + fetch on a blocking thread, as the poller would.
async fn poll(settings: PortalSettings) -> Result<Vec<NotificationItem>, CycleError> {
    tokio::task::spawn_blocking(move || {
        let client = PortalClient::new(settings);
        let session = client.authenticate()?;
        client.fetch(&session)
    })
    .await
    .expect("blocking task")
}

#[tokio::test(flavor = "multi_thread")]
async fn logs_in_and_fetches_listing_with_session_cookie() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/home/notices"))
        .and(header("cookie", "sid=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1042, "tieuDe": "Exam schedule", "link": "https://news.example/1042" },
            { "id": "1041", "title": "Tuition", "summary": "Pay by Friday", "date": "2025-01-10" }
        ])))
        .mount(&server)
        .await;

    let items = poll(settings_for(&server)).await.expect("poll ok");
    assert_eq!(
        items,
        vec![
            NotificationItem {
                id: "1042".to_string(),
                title: "Exam schedule".to_string(),
                summary: String::new(),
                link: "https://news.example/1042".to_string(),
                date: String::new(),
            },
            NotificationItem {
                id: "1041".to_string(),
                title: "Tuition".to_string(),
                summary: "Pay by Friday".to_string(),
                link: String::new(),
                date: "2025-01-10".to_string(),
            },
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_login_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Login/SignIn"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = poll(settings_for(&server)).await.unwrap_err();
    assert_eq!(err.stage, Stage::Auth);
    assert_eq!(err.kind, FailureKind::AuthRejected);
}

#[tokio::test(flavor = "multi_thread")]
async fn login_reply_without_redirect_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Login/SignIn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "wrong password" })))
        .mount(&server)
        .await;

    let err = poll(settings_for(&server)).await.unwrap_err();
    assert_eq!(err.stage, Stage::Auth);
    assert_eq!(err.kind, FailureKind::AuthRejected);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_feed_is_a_fetch_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/home/notices"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = poll(settings_for(&server)).await.unwrap_err();
    assert_eq!(err.stage, Stage::Fetch);
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
}

#[tokio::test(flavor = "multi_thread")]
async fn html_instead_of_json_is_a_parse_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/home/notices"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>session expired</html>", "text/html"))
        .mount(&server)
        .await;

    let err = poll(settings_for(&server)).await.unwrap_err();
    assert!(err.is_parse_error());
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_feed_times_out() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/home/notices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let settings = PortalSettings {
        request_timeout: Duration::from_millis(100),
        ..settings_for(&server)
    };
    let err = poll(settings).await.unwrap_err();
    assert_eq!(err.stage, Stage::Fetch);
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[test]
fn listing_entry_without_id_is_malformed() {
    let err = parse_listing(r#"[{"id": 1}, {"title": "no id"}]"#).unwrap_err();
    assert_eq!(err.kind, FailureKind::Malformed);
    assert!(err.message.contains("entry 1"));
}

#[test]
fn listing_object_instead_of_array_is_malformed() {
    let err = parse_listing(r#"{"items": []}"#).unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn empty_listing_is_valid() {
    assert_eq!(parse_listing("[]").unwrap(), Vec::new());
}

#[test]
fn unknown_fields_and_nulls_are_tolerated() {
    let items = parse_listing(r#"[{"id": "77", "title": null, "extra": true}]"#).unwrap();
    assert_eq!(items, vec![NotificationItem::new("77")]);
}

#[test]
fn title_wins_over_tieu_de_when_both_are_present() {
    let items = parse_listing(
        r#"[{"id": 9, "title": "English", "tieuDe": "Tiếng Việt"}, {"id": 8, "title": null, "tieuDe": "Only local"}]"#,
    )
    .unwrap();
    assert_eq!(items[0].title, "English");
    assert_eq!(items[1].title, "Only local");
}
