//! Top-level helpdesk client.
//!
//! [`HelpdeskClient`] exposes one [`Resource`] per list endpoint. Every
//! resource shares the HTTP transport but records its own rate limit window;
//! [`HelpdeskClient::rate_limit`] reports the one that resets last.

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::DeskError;
use crate::models::{Agent, Brand, Contact, ContactGroup, FieldOption, Page, Ticket, UserBrand, Worklog};
use crate::paginate::{collect_all, paginate, ItemStream, PageSource, PaginateOptions};
use crate::query::{
    AgentQuery, BrandQuery, ContactGroupQuery, ContactQuery, FieldOptionQuery, ListQuery, TicketQuery,
    WorklogQuery,
};
use crate::rate_limit::{most_recent, RateLimitInfo};

/// One list endpoint, typed by its item and query parameter types.
pub struct Resource<T, Q> {
    api: ApiClient,
    path: &'static str,
    _marker: PhantomData<fn() -> (T, Q)>,
}

impl<T, Q> Clone for Resource<T, Q> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            path: self.path,
            _marker: PhantomData,
        }
    }
}

impl<T, Q> fmt::Debug for Resource<T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("path", &self.path).finish()
    }
}

impl<T, Q> Resource<T, Q>
where
    T: DeserializeOwned + Send + 'static,
    Q: ListQuery,
{
    /// Creates a resource with its own rate limit tracker.
    pub fn new(api: &ApiClient, path: &'static str) -> Self {
        Self {
            api: api.fork(),
            path,
            _marker: PhantomData,
        }
    }

    /// Endpoint path relative to the API base (e.g. `/tickets`).
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Fetches the single page `query` points at.
    pub async fn list(&self, query: &Q) -> Result<Page<T>, DeskError> {
        self.api.fetch_page(self.path, query).await
    }

    /// Streams the whole collection starting at `query`'s page.
    pub fn stream(&self, query: Q, options: PaginateOptions) -> ItemStream<T> {
        paginate(self.clone(), query, options)
    }

    /// Collects the whole collection into memory.
    pub async fn fetch_all(&self, query: Q, options: PaginateOptions) -> Result<Vec<T>, DeskError> {
        collect_all(self.clone(), query, options).await
    }

    /// Fetches one entity by id (`GET <path>/<id>`).
    ///
    /// # Errors
    ///
    /// Returns `DeskError::InvalidArgument` for non-positive ids, `NotFound`
    /// when the entity does not exist.
    pub async fn get(&self, id: i64) -> Result<T, DeskError> {
        ApiClient::validate_id(id, "id")?;
        self.api.fetch_one(&format!("{}/{}", self.path, id)).await
    }

    /// The latest rate limit window seen by this resource.
    pub fn rate_limit(&self) -> RateLimitInfo {
        self.api.rate_limit()
    }
}

#[async_trait]
impl<T, Q> PageSource for Resource<T, Q>
where
    T: DeserializeOwned + Send + 'static,
    Q: ListQuery,
{
    type Item = T;
    type Query = Q;

    async fn fetch_page(&self, query: &Q) -> Result<Page<T>, DeskError> {
        self.list(query).await
    }

    fn rate_limit(&self) -> RateLimitInfo {
        self.api.rate_limit()
    }
}

/// Typed client for the helpdesk REST API.
///
/// # Example
///
/// ```ignore
/// let client = HelpdeskClient::new(&Config::from_env()?)?;
///
/// let mut tickets = client
///     .tickets()
///     .stream(TicketQuery::new().with_status("Open"), PaginateOptions::new());
/// while let Some(ticket) = tickets.next().await {
///     println!("{}", ticket?.display_subject());
/// }
/// ```
#[derive(Clone, Debug)]
pub struct HelpdeskClient {
    api: ApiClient,
    tickets: Resource<Ticket, TicketQuery>,
    worklogs: Resource<Worklog, WorklogQuery>,
    brands: Resource<Brand, BrandQuery>,
    user_brands: Resource<UserBrand, BrandQuery>,
    agents: Resource<Agent, AgentQuery>,
    contacts: Resource<Contact, ContactQuery>,
    contact_groups: Resource<ContactGroup, ContactGroupQuery>,
    field_options: Resource<FieldOption, FieldOptionQuery>,
}

impl HelpdeskClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeskError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, DeskError> {
        Ok(Self::from_api(ApiClient::new(config)?))
    }

    /// Creates a client on top of an existing [`ApiClient`].
    pub fn from_api(api: ApiClient) -> Self {
        Self {
            tickets: Resource::new(&api, "/tickets"),
            worklogs: Resource::new(&api, "/tickets/worklogs"),
            brands: Resource::new(&api, "/brands"),
            user_brands: Resource::new(&api, "/user_brands"),
            agents: Resource::new(&api, "/agents"),
            contacts: Resource::new(&api, "/contacts"),
            contact_groups: Resource::new(&api, "/contact_groups"),
            field_options: Resource::new(&api, "/fields/options"),
            api,
        }
    }

    /// Tickets (`/tickets`).
    pub fn tickets(&self) -> &Resource<Ticket, TicketQuery> {
        &self.tickets
    }

    /// Time entries logged on tickets (`/tickets/worklogs`).
    pub fn worklogs(&self) -> &Resource<Worklog, WorklogQuery> {
        &self.worklogs
    }

    /// Brands (`/brands`).
    pub fn brands(&self) -> &Resource<Brand, BrandQuery> {
        &self.brands
    }

    /// Brands visible to the API key's user (`/user_brands`).
    pub fn user_brands(&self) -> &Resource<UserBrand, BrandQuery> {
        &self.user_brands
    }

    /// Agents (`/agents`).
    pub fn agents(&self) -> &Resource<Agent, AgentQuery> {
        &self.agents
    }

    /// Contacts (`/contacts`).
    pub fn contacts(&self) -> &Resource<Contact, ContactQuery> {
        &self.contacts
    }

    /// Contact groups (`/contact_groups`).
    pub fn contact_groups(&self) -> &Resource<ContactGroup, ContactGroupQuery> {
        &self.contact_groups
    }

    /// Custom field options (`/fields/options`).
    pub fn field_options(&self) -> &Resource<FieldOption, FieldOptionQuery> {
        &self.field_options
    }

    /// Fetches a single ticket.
    pub async fn get_ticket(&self, id: i64) -> Result<Ticket, DeskError> {
        self.tickets.get(id).await
    }

    /// Fetches a single agent.
    pub async fn get_agent(&self, id: i64) -> Result<Agent, DeskError> {
        self.agents.get(id).await
    }

    /// Fetches a single contact.
    pub async fn get_contact(&self, id: i64) -> Result<Contact, DeskError> {
        self.contacts.get(id).await
    }

    /// Fetches a single brand.
    pub async fn get_brand(&self, id: i64) -> Result<Brand, DeskError> {
        self.brands.get(id).await
    }

    /// The rate limit window with the furthest-future reset among all resources.
    pub fn rate_limit(&self) -> RateLimitInfo {
        most_recent([
            self.tickets.rate_limit(),
            self.worklogs.rate_limit(),
            self.brands.rate_limit(),
            self.user_brands.rate_limit(),
            self.agents.rate_limit(),
            self.contacts.rate_limit(),
            self.contact_groups.rate_limit(),
            self.field_options.rate_limit(),
        ])
    }

    /// The underlying API client.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Checks that the helpdesk is reachable and the API key is accepted by
    /// fetching a single ticket.
    ///
    /// # Errors
    ///
    /// Returns `DeskError::Config` describing which setting is probably wrong.
    pub async fn test_connection(&self) -> Result<(), DeskError> {
        tracing::debug!("Testing connection to helpdesk API");

        let result = self.tickets.list(&TicketQuery::new().with_per_page(1)).await;

        match result {
            Ok(_) => {
                tracing::info!("Connection test successful");
                Ok(())
            }
            Err(DeskError::AuthenticationFailed { .. }) => Err(DeskError::invalid_config(
                "connection test failed: authentication failed - verify HELPDESK_API_KEY is correct",
            )),
            Err(DeskError::AccessDenied { .. }) => Err(DeskError::invalid_config(
                "connection test failed: the API key may not read tickets",
            )),
            Err(DeskError::RequestTimedOut { duration, .. }) => Err(DeskError::invalid_config(format!(
                "connection test failed: timed out after {:?} - verify HELPDESK_BASE_URL is correct and the server is reachable",
                duration
            ))),
            Err(DeskError::NetworkFailure { source, .. }) => Err(DeskError::invalid_config(format!(
                "connection test failed: {} - verify HELPDESK_BASE_URL is correct",
                source
            ))),
            Err(DeskError::NotFound { .. }) => Err(DeskError::invalid_config(
                "connection test failed: API not found - verify HELPDESK_BASE_URL points at the helpdesk",
            )),
            Err(e) => Err(e),
        }
    }
}
