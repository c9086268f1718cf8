//! Poll-and-transform loop turning Freshdesk tickets into indexable documents.
//!
//! Tickets are fetched page by page and converted one at a time. Documents are
//! handed out in batches of `batch_size` through a lazy stream, so the first
//! batch is available before later pages are requested.

use std::collections::BTreeMap;

use async_stream::try_stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::model::document::{Document, DocumentSource, Section};
use crate::model::ticket::{status_label, Ticket};
use crate::providers::freshdesk::{ticket_link, FreshdeskClient};
use crate::providers::{TicketPage, TicketQuery, TicketSource};

pub type SecondsSinceUnixEpoch = i64;

/// Ticket fields never copied into section text.
pub const EXCLUDED_FIELDS: &[&str] = &[
    "spam",
    "email_config_id",
    "association_type",
    "custom_fields",
    "associated_ticket_count",
    "tags",
    "description",
    "internal_agent_id",
    "internal_group_id",
    "nr_due_by",
    "nr_escalated",
];

/// The only keys allowed in document metadata.
pub const METADATA_KEYS: &[&str] = &["id", "status", "priority", "type", "is_overdue"];

pub struct TicketPollConnector<S> {
    config: ConnectorConfig,
    source: S,
}

impl TicketPollConnector<FreshdeskClient> {
    pub fn from_config(config: ConnectorConfig) -> Result<Self, ConnectorError> {
        let source = FreshdeskClient::new(&config.credentials)?;
        Ok(Self::new(config, source))
    }
}

impl<S: TicketSource> TicketPollConnector<S> {
    pub fn new(config: ConnectorConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Fetch one page of tickets using the configured page size.
    pub async fn fetch_tickets(
        &self,
        page: u32,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<TicketPage, ConnectorError> {
        let query = TicketQuery {
            page,
            per_page: self.config.page_size.max(1),
            updated_since,
        };
        self.source.fetch_page(&query).await
    }

    /// A single section linking to the ticket, with the denylisted fields stripped.
    pub fn build_sections(&self, ticket: &Ticket) -> Result<Vec<Section>, ConnectorError> {
        let domain = self
            .config
            .credentials
            .domain
            .as_deref()
            .ok_or_else(|| ConnectorError::Config("freshdesk_domain is not set".into()))?;

        let visible: Map<String, Value> = ticket
            .fields()
            .iter()
            .filter(|(key, _)| !EXCLUDED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let text = serde_json::to_string(&visible)
            .map_err(|e| ConnectorError::Parse(format!("ticket serialization: {e}")))?;

        Ok(vec![Section {
            link: ticket_link(domain, ticket.id()?),
            text,
        }])
    }

    /// Convert one ticket, judging `is_overdue` against `now`.
    pub fn to_document(&self, ticket: &Ticket, now: DateTime<Utc>) -> Result<Document, ConnectorError> {
        let id = ticket.id()?;
        let sections = self.build_sections(ticket)?;
        let is_overdue = ticket.due_by()? < now;

        let status = ticket
            .status_code()
            .and_then(status_label)
            .map(Value::from);

        let candidates = [
            ("id", ticket.get("id").cloned()),
            ("status", status),
            ("priority", ticket.get("priority").cloned()),
            ("type", ticket.get("type").cloned()),
            ("is_overdue", Some(Value::Bool(is_overdue))),
        ];
        let metadata: BTreeMap<String, Value> = candidates
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect();

        let semantic_identifier = ticket
            .subject()
            .map(String::from)
            .unwrap_or_else(|| format!("Ticket #{id}"));

        Ok(Document {
            id: id.to_string(),
            sections,
            source: DocumentSource::Freshdesk,
            semantic_identifier,
            metadata,
        })
    }

    /// Fetch, transform and batch every ticket, following pages while Freshdesk
    /// advertises a next one. The stream ends after the first error.
    pub fn process_tickets(
        &self,
        start: SecondsSinceUnixEpoch,
        end: SecondsSinceUnixEpoch,
        now: DateTime<Utc>,
    ) -> impl Stream<Item = Result<Vec<Document>, ConnectorError>> + '_ {
        try_stream! {
            let window = self.window(start, end)?;
            if window.is_none() {
                debug!(start, end, "Time window not applied to Freshdesk poll");
            }

            let batch_size = self.config.batch_size.max(1);
            let max_pages = self.config.max_pages.max(1);
            let mut batch: Vec<Document> = Vec::with_capacity(batch_size);
            let mut total = 0usize;
            let mut page = 1;

            loop {
                let TicketPage { tickets, has_next } =
                    self.fetch_tickets(page, window.map(|(since, _)| since)).await?;
                debug!(source = self.source.name(), page, fetched = tickets.len(), has_next, "Fetched ticket page");

                for ticket in &tickets {
                    if let Some((_, until)) = window {
                        if ticket.updated_at().is_some_and(|updated| updated > until) {
                            continue;
                        }
                    }

                    batch.push(self.to_document(ticket, now)?);
                    total += 1;

                    if batch.len() >= batch_size {
                        yield std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                    }
                }

                if !has_next {
                    break;
                }
                if page >= max_pages {
                    if !batch.is_empty() {
                        yield std::mem::take(&mut batch);
                    }
                    warn!(max_pages, documents = total, "Freshdesk page limit reached with pages remaining");
                    Err::<(), _>(ConnectorError::PageLimit { max_pages })?;
                }
                page += 1;
            }

            if !batch.is_empty() {
                yield batch;
            }

            info!(documents = total, "Freshdesk poll finished");
        }
    }

    /// Poll every ticket. `start`/`end` only narrow the result when
    /// `filter_by_window` is enabled.
    pub fn poll_source(
        &self,
        start: SecondsSinceUnixEpoch,
        end: SecondsSinceUnixEpoch,
    ) -> impl Stream<Item = Result<Vec<Document>, ConnectorError>> + '_ {
        self.process_tickets(start, end, Utc::now())
    }

    fn window(
        &self,
        start: SecondsSinceUnixEpoch,
        end: SecondsSinceUnixEpoch,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, ConnectorError> {
        if !self.config.filter_by_window {
            return Ok(None);
        }
        let since = DateTime::from_timestamp(start, 0)
            .ok_or_else(|| ConnectorError::Config(format!("invalid window start: {start}")))?;
        let until = DateTime::from_timestamp(end, 0)
            .ok_or_else(|| ConnectorError::Config(format!("invalid window end: {end}")))?;
        Ok(Some((since, until)))
    }
}
