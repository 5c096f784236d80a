use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::Deserialize;
use watch_core::NotificationItem;
use watch_logging::{watch_debug, watch_info};

use crate::{CycleError, FailureKind, FeedSource, Stage};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct PortalSettings {
    pub login_url: String,
    pub feed_url: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl PortalSettings {
    pub fn new(
        login_url: impl Into<String>,
        feed_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            login_url: login_url.into(),
            feed_url: feed_url.into(),
            username: username.into(),
            password: password.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Logs into the student portal and reads its notification listing.
#[derive(Debug, Clone)]
pub struct PortalClient {
    settings: PortalSettings,
}

/// An authenticated cookie-carrying client, valid for one cycle.
pub struct PortalSession {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortalRecord {
    id: Option<RecordId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "tieuDe")]
    tieu_de: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Text(String),
    Number(serde_json::Number),
}

impl PortalClient {
    pub fn new(settings: PortalSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<Client, CycleError> {
        Client::builder()
            .cookie_store(true)
            .user_agent(self.settings.user_agent.clone())
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| CycleError::new(Stage::Auth, FailureKind::Network, err.to_string()))
    }
}

impl FeedSource for PortalClient {
    type Session = PortalSession;

    fn authenticate(&self) -> Result<PortalSession, CycleError> {
        let login_url = parse_url(Stage::Auth, &self.settings.login_url)?;
        let client = self.build_client()?;

        let form = [
            ("user", self.settings.username.as_str()),
            ("pass", self.settings.password.as_str()),
        ];
        let response = client
            .post(login_url.clone())
            .form(&form)
            .send()
            .map_err(|err| map_reqwest_error(Stage::Auth, err))?;
        let response = require_auth_success(response, "login")?;
        let body = response
            .text()
            .map_err(|err| map_reqwest_error(Stage::Auth, err))?;

        let reply: LoginReply = serde_json::from_str(&body).map_err(|err| {
            CycleError::new(
                Stage::Auth,
                FailureKind::AuthRejected,
                format!("login reply is not JSON: {err}"),
            )
        })?;
        let redirect = reply
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                CycleError::new(
                    Stage::Auth,
                    FailureKind::AuthRejected,
                    "login reply carried no redirect url",
                )
            })?;
        // The portal may answer with a path relative to the login page.
        let redirect_url = login_url.join(redirect.trim()).map_err(|err| {
            CycleError::new(Stage::Auth, FailureKind::InvalidUrl, err.to_string())
        })?;

        let response = client
            .get(redirect_url)
            .send()
            .map_err(|err| map_reqwest_error(Stage::Auth, err))?;
        require_auth_success(response, "auth redirect")?;

        watch_debug!("Portal session established for {}", self.settings.username);
        Ok(PortalSession { client })
    }

    fn fetch(&self, session: &PortalSession) -> Result<Vec<NotificationItem>, CycleError> {
        let feed_url = parse_url(Stage::Fetch, &self.settings.feed_url)?;
        let response = session
            .client
            .get(feed_url)
            .send()
            .map_err(|err| map_reqwest_error(Stage::Fetch, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CycleError::new(
                Stage::Fetch,
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response
            .text()
            .map_err(|err| map_reqwest_error(Stage::Fetch, err))?;
        let items = parse_listing(&body)?;
        watch_info!("Fetched {} notifications", items.len());
        Ok(items)
    }
}

/// Parses the portal's JSON notification array into items, in listing order.
///
/// Every entry needs an `id` (string or number). Missing display fields
/// become empty strings.
pub fn parse_listing(body: &str) -> Result<Vec<NotificationItem>, CycleError> {
    let records: Vec<PortalRecord> = serde_json::from_str(body).map_err(|err| {
        CycleError::new(Stage::Fetch, FailureKind::Malformed, err.to_string())
    })?;

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let id = match record.id {
                Some(RecordId::Text(text)) => text,
                Some(RecordId::Number(number)) => number.to_string(),
                None => {
                    return Err(CycleError::new(
                        Stage::Fetch,
                        FailureKind::Malformed,
                        format!("entry {index} has no id"),
                    ))
                }
            };
            Ok(NotificationItem {
                id,
                title: record.title.or(record.tieu_de).unwrap_or_default(),
                summary: record.summary.unwrap_or_default(),
                link: record.link.unwrap_or_default(),
                date: record.date.unwrap_or_default(),
            })
        })
        .collect()
}

fn parse_url(stage: Stage, raw: &str) -> Result<Url, CycleError> {
    Url::parse(raw).map_err(|err| CycleError::new(stage, FailureKind::InvalidUrl, err.to_string()))
}

fn require_auth_success(response: Response, step: &str) -> Result<Response, CycleError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CycleError::new(
            Stage::Auth,
            FailureKind::AuthRejected,
            format!("{step} answered {status}"),
        ))
    }
}

fn map_reqwest_error(stage: Stage, err: reqwest::Error) -> CycleError {
    if err.is_timeout() {
        return CycleError::new(stage, FailureKind::Timeout, err.to_string());
    }
    CycleError::new(stage, FailureKind::Network, err.to_string())
}
