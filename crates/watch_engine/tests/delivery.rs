use std::time::Duration;

use serde_json::json;
use watch_core::NotificationItem;
use watch_engine::{render_message, Batch, DeliveryAdapter, DeliveryError, LogDelivery, TelegramDelivery};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notice(id: &str, title: &str) -> NotificationItem {
    NotificationItem {
        id: id.to_string(),
        title: title.to_string(),
        summary: "Details inside".to_string(),
        link: format!("https://news.example/{id}"),
        date: "2025-02-01".to_string(),
    }
}

fn deliver_blocking(
    api_base: String,
    items: Vec<NotificationItem>,
) -> tokio::task::JoinHandle<Result<(), DeliveryError>> {
    tokio::task::spawn_blocking(move || {
        let telegram = TelegramDelivery::new("TOKEN", "4242", Duration::from_secs(5))?
            .with_api_base(api_base);
        telegram.deliver(Batch::from_items(&items))
    })
}

#[test]
fn message_contains_every_non_empty_field() {
    let text = render_message(&notice("9", "Exam room change"));
    assert_eq!(
        text,
        "📢 Exam room change\n\nDetails inside\n\n🔗 https://news.example/9\n📅 2025-02-01"
    );

    let bare = render_message(&NotificationItem::new("1").with_title("Only a title"));
    assert_eq!(bare, "📢 Only a title");
}

#[test]
fn log_delivery_accepts_both_batch_kinds() {
    watch_logging::initialize_for_tests();
    let items = vec![notice("2", "Second"), notice("1", "First")];
    assert!(LogDelivery.deliver(Batch::New(&items)).is_ok());
    assert!(LogDelivery.deliver(Batch::NothingNew).is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn telegram_sends_one_message_per_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botTOKEN/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": "4242" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(2)
        .mount(&server)
        .await;

    let items = vec![notice("11", "Eleven"), notice("10", "Ten")];
    let result = deliver_blocking(server.uri(), items).await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn telegram_sends_nothing_when_nothing_is_new() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(0)
        .mount(&server)
        .await;

    let result = deliver_blocking(server.uri(), Vec::new()).await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn telegram_reports_failed_sends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botTOKEN/sendMessage"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "ok": false, "description": "chat not found" })),
        )
        .mount(&server)
        .await;

    let items = vec![notice("3", "Three"), notice("2", "Two")];
    let err = deliver_blocking(server.uri(), items).await.unwrap().unwrap_err();
    match err {
        DeliveryError::Partial {
            failed,
            attempted,
            last,
        } => {
            assert_eq!(failed, 2);
            assert_eq!(attempted, 2);
            assert!(last.contains("chat not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
