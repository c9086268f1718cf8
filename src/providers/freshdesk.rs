use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::SecondsFormat;
use reqwest::header::{HeaderMap, LINK};
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::{TicketPage, TicketQuery, TicketSource};
use crate::config::Credentials;
use crate::error::ConnectorError;
use crate::model::ticket::Ticket;

/// Freshdesk only checks the API key; the password half of basic auth is a placeholder.
const PASSWORD_PLACEHOLDER: &str = "x";

pub struct FreshdeskClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl FreshdeskClient {
    pub fn new(credentials: &Credentials) -> Result<Self, ConnectorError> {
        let domain = credentials
            .domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ConnectorError::Config("freshdesk_domain is not set".into()))?;
        let api_key = credentials
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConnectorError::Config("freshdesk_api_key is not set".into()))?;

        let creds = format!("{api_key}:{PASSWORD_PLACEHOLDER}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: format!("https://{domain}.freshdesk.com"),
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }

    /// Point the client at another host, e.g. a local test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Agent-facing URL of a ticket.
pub fn ticket_link(domain: &str, id: u64) -> String {
    format!("https://{domain}.freshdesk.com/helpdesk/tickets/{id}")
}

/// Largest `per_page` the Freshdesk list endpoint honours.
pub const MAX_PER_PAGE: u32 = 100;

fn list_params(query: &TicketQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("include", "description".to_string()),
        ("per_page", query.per_page.clamp(1, MAX_PER_PAGE).to_string()),
        ("page", query.page.to_string()),
    ];
    if let Some(since) = query.updated_since {
        params.push((
            "updated_since",
            since.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }
    params
}

/// Freshdesk sends `Link: <...>; rel="next"` while more pages remain.
fn has_next_link(headers: &HeaderMap) -> bool {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|link| {
            link.split(';')
                .skip(1)
                .any(|param| matches!(param.trim(), "rel=\"next\"" | "rel=next"))
        })
}

#[async_trait]
impl TicketSource for FreshdeskClient {
    fn name(&self) -> &str {
        "Freshdesk"
    }

    async fn fetch_page(&self, query: &TicketQuery) -> Result<TicketPage, ConnectorError> {
        let url = format!("{}/api/v2/tickets", self.base_url);
        let params = list_params(query);

        debug!(page = query.page, per_page = query.per_page, "Fetching Freshdesk tickets");

        let resp = self
            .client
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), page = query.page, "Freshdesk ticket list request failed");
            return Err(ConnectorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let has_next = has_next_link(resp.headers());
        let tickets: Vec<Ticket> = resp.json().await.map_err(|e| {
            ConnectorError::Parse(format!("ticket list page {}: {e}", query.page))
        })?;

        Ok(TicketPage { tickets, has_next })
    }
}
