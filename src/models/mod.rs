//! Data models for the helpdesk API.
//!
//! This module contains the wire types returned by the API: the page and
//! error envelopes, and the ticket, worklog, brand, agent, contact and
//! field option entities.

mod common;
mod directory;
mod error_body;
mod ticket;

pub(crate) use common::ListEnvelope;
pub use common::Page;
pub use directory::*;
pub use error_body::*;
pub use ticket::*;
