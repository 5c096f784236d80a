use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use thiserror::Error;
use watch_core::NotificationItem;
use watch_logging::{watch_info, watch_warn};

/// What a cycle hands to the delivery side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Batch<'a> {
    NothingNew,
    /// New items, newest first.
    New(&'a [NotificationItem]),
}

impl<'a> Batch<'a> {
    pub fn from_items(items: &'a [NotificationItem]) -> Self {
        if items.is_empty() {
            Batch::NothingNew
        } else {
            Batch::New(items)
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to build delivery client: {0}")]
    Client(String),
    #[error("{failed} of {attempted} notifications could not be sent; last error: {last}")]
    Partial {
        failed: usize,
        attempted: usize,
        last: String,
    },
}

/// Renders and sends new items. Retry policy, if any, belongs to the adapter.
pub trait DeliveryAdapter {
    fn deliver(&self, batch: Batch<'_>) -> Result<(), DeliveryError>;
}

/// Writes new items to the log. Used when no chat channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

impl DeliveryAdapter for LogDelivery {
    fn deliver(&self, batch: Batch<'_>) -> Result<(), DeliveryError> {
        match batch {
            Batch::NothingNew => watch_info!("No new notifications"),
            Batch::New(items) => {
                for item in items {
                    watch_info!("[NEW] {} | {} | {}", item.id, item.title, item.link);
                }
            }
        }
        Ok(())
    }
}

/// Plain-text message body for one item.
pub fn render_message(item: &NotificationItem) -> String {
    let mut text = format!("📢 {}", item.title);
    if !item.summary.is_empty() {
        text.push_str("\n\n");
        text.push_str(&item.summary);
    }
    if !item.link.is_empty() {
        text.push_str("\n\n🔗 ");
        text.push_str(&item.link);
    }
    if !item.date.is_empty() {
        text.push_str("\n📅 ");
        text.push_str(&item.date);
    }
    text
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends one Telegram bot message per new item.
pub struct TelegramDelivery {
    api_base: String,
    token: String,
    chat_id: String,
    client: Client,
}

impl TelegramDelivery {
    pub const API_BASE: &'static str = "https://api.telegram.org";

    pub fn new(
        token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DeliveryError::Client(err.to_string()))?;
        Ok(Self {
            api_base: Self::API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            client,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send(&self, text: &str) -> Result<(), String> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = SendMessageBody {
            chat_id: &self.chat_id,
            text,
        };
        let res = self
            .client
            .post(url)
            .json(&body)
            .send()
            .map_err(|e| e.to_string())?;

        let status = res.status();
        let reply: serde_json::Value = res.json().map_err(|e| e.to_string())?;
        if !status.is_success() || !reply.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            let err = reply
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            return Err(format!("Telegram API error {status}: {err}"));
        }
        Ok(())
    }
}

impl DeliveryAdapter for TelegramDelivery {
    fn deliver(&self, batch: Batch<'_>) -> Result<(), DeliveryError> {
        let Batch::New(items) = batch else {
            return Ok(());
        };

        let mut failed = 0;
        let mut last = String::new();
        for item in items {
            match self.send(&render_message(item)) {
                Ok(()) => watch_info!("Sent notification {} to Telegram", item.id),
                Err(err) => {
                    watch_warn!("Telegram delivery of {} failed: {}", item.id, err);
                    failed += 1;
                    last = err;
                }
            }
        }

        if failed > 0 {
            return Err(DeliveryError::Partial {
                failed,
                attempted: items.len(),
                last,
            });
        }
        Ok(())
    }
}
