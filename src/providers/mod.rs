pub mod freshdesk;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ConnectorError;
use crate::model::ticket::Ticket;

/// One page request against the ticket list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQuery {
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub updated_since: Option<DateTime<Utc>>,
}

/// Tickets from one page, plus whether the API advertised another page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub has_next: bool,
}

#[async_trait]
pub trait TicketSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_page(&self, query: &TicketQuery) -> Result<TicketPage, ConnectorError>;
}
