use thiserror::Error;

/// Errors surfaced by a poll. The first one ends the batch stream.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Credentials or settings are unusable.
    #[error("Connector not configured: {0}")]
    Config(String),

    #[error("Freshdesk request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Freshdesk answered with a non-success status.
    #[error("Freshdesk API error: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Failed to parse Freshdesk response: {0}")]
    Parse(String),

    /// `max_pages` was reached while Freshdesk still advertised another page.
    #[error("Stopped after {max_pages} pages with more tickets remaining")]
    PageLimit { max_pages: u32 },

    #[error("Ticket {ticket} is missing field '{field}'")]
    MissingField { ticket: String, field: &'static str },

    #[error("Ticket {ticket} has an invalid due_by value: {value}")]
    DueDate { ticket: String, value: String },
}
