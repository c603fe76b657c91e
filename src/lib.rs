//! # desklink
//!
//! desklink is a typed async client for a helpdesk REST API: tickets,
//! worklogs, brands, agents, contacts, contact groups and custom field
//! options.
//!
//! ## Features
//!
//! - **Tolerant decoding**: fields the API sends as strings, numbers or
//!   nested objects depending on the endpoint decode to one stable type
//! - **Identity reconciliation**: entities keyed by `id` on one endpoint and
//!   `ticketId`/`brandId`/... on another resolve to one identifier
//! - **Lazy enumeration**: whole collections stream one page at a time,
//!   pausing when the rate limit is nearly spent, cancellable at any time
//! - **Typed errors**: every failure is a `DeskError` variant carrying the
//!   server's error body and, for 429s, the rate limit window
//! - **Security**: API keys are never logged or exposed in error messages
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error taxonomy with message sanitization
//! - [`decode`] - Tolerant field decoders and decode options
//! - [`identity`] - Dual-key identifier resolution
//! - [`rate_limit`] - Rate limit header parsing and wait heuristic
//! - [`classify`] - Status code to error mapping
//! - [`query`] - Per-resource query parameters
//! - [`api`] - Authenticated page and entity fetches
//! - [`paginate`] - Lazy, cancellable collection enumeration
//! - [`client`] - The [`HelpdeskClient`] facade
//! - [`models`] - Wire models
//!
//! ## Configuration
//!
//! - `HELPDESK_BASE_URL`: Base URL of the helpdesk
//! - `HELPDESK_API_KEY`: API key sent as `x-api-key`
//!
//! Optional:
//! - `HELPDESK_TIMEOUT_SECS`: Per-request timeout (default 30)
//! - `RUST_LOG`: Log level (e.g., `desklink=debug`)
//!
//! ## Example
//!
//! ```ignore
//! use desklink::{Config, HelpdeskClient, ListQuery, PaginateOptions, TicketQuery};
//! use futures::StreamExt;
//!
//! async fn example() -> Result<(), desklink::DeskError> {
//!     let client = HelpdeskClient::new(&Config::from_env()?)?;
//!
//!     let query = TicketQuery::new().with_status("Open").with_per_page(100);
//!     let mut tickets = client.tickets().stream(query, PaginateOptions::new());
//!     while let Some(ticket) = tickets.next().await {
//!         let ticket = ticket?;
//!         println!("{}\t{}", ticket.id, ticket.display_subject());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod classify;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod identity;
pub mod models;
pub mod paginate;
pub mod query;
pub mod rate_limit;

pub use api::ApiClient;
pub use client::{HelpdeskClient, Resource};
pub use config::Config;
pub use decode::DecodeOptions;
pub use error::{DeskError, ErrorCategory};
pub use models::Page;
pub use paginate::{PageSource, PaginateOptions, Progress};
pub use query::{
    AgentQuery, BrandQuery, ContactGroupQuery, ContactQuery, FieldOptionQuery, ListQuery, OrderBy,
    TicketQuery, WorklogQuery,
};
pub use rate_limit::RateLimitInfo;
