pub mod cli;
pub mod config;
pub mod connector;
pub mod error;
pub mod model;
pub mod providers;

pub use config::{load_credentials, ConnectorConfig, Credentials};
pub use connector::{SecondsSinceUnixEpoch, TicketPollConnector};
pub use error::ConnectorError;
pub use model::document::{Document, DocumentSource, Section};
pub use model::ticket::Ticket;
pub use providers::freshdesk::FreshdeskClient;
pub use providers::{TicketPage, TicketQuery, TicketSource};
