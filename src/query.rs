//! Query parameters for list endpoints.
//!
//! Each resource has its own parameter struct built with `with_*` methods.
//! They all embed [`Paging`] and implement [`ListQuery`], which is what the
//! fetcher and the enumerator work with.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// Largest page size the server accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Query key/value pairs, in the order they are sent.
pub type QueryPairs = Vec<(&'static str, String)>;

/// Paging options shared by every list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paging {
    /// 1-based page number.
    pub page: u32,

    /// Requested page size; clamped to `1..=MAX_PER_PAGE` when sent.
    pub per_page: u32,

    /// Ask the server to include the total record count.
    pub requires_counts: bool,
}

impl Paging {
    /// Paging starting at page 1 with the given page size.
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page,
            requires_counts: false,
        }
    }

    /// The page size actually sent to the server.
    pub fn effective_per_page(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    fn push_pairs(&self, pairs: &mut QueryPairs) {
        pairs.push(("page", self.page.max(1).to_string()));
        pairs.push(("perPage", self.effective_per_page().to_string()));
        if self.requires_counts {
            pairs.push(("requiresCounts", "true".to_string()));
        }
    }
}

/// Sort direction of an [`OrderBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// Sort field and direction, sent as `orderBy=<field> <direction>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field to sort on.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl OrderBy {
    /// Ascending order on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending order on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{} {}", self.field, direction)
    }
}

/// Common behavior of the per-resource parameter structs.
pub trait ListQuery: Clone + Send + Sync + 'static {
    /// Paging options.
    fn paging(&self) -> &Paging;

    /// Mutable paging options.
    fn paging_mut(&mut self) -> &mut Paging;

    /// Appends the resource-specific filter pairs.
    fn push_filters(&self, pairs: &mut QueryPairs);

    /// All query pairs: paging first, then filters. Each recognized option
    /// maps to exactly one key; unset options are omitted.
    fn to_query_pairs(&self) -> QueryPairs {
        let mut pairs = Vec::new();
        self.paging().push_pairs(&mut pairs);
        self.push_filters(&mut pairs);
        pairs
    }

    /// Current page number.
    fn page(&self) -> u32 {
        self.paging().page.max(1)
    }

    /// Page size sent to the server.
    fn per_page(&self) -> u32 {
        self.paging().effective_per_page()
    }

    /// Sets the page number.
    fn with_page(mut self, page: u32) -> Self {
        self.paging_mut().page = page;
        self
    }

    /// Sets the page size.
    fn with_per_page(mut self, per_page: u32) -> Self {
        self.paging_mut().per_page = per_page;
        self
    }

    /// Asks the server for the total record count.
    fn with_counts(mut self) -> Self {
        self.paging_mut().requires_counts = true;
        self
    }
}

fn push_opt<T: ToString>(pairs: &mut QueryPairs, key: &'static str, value: Option<&T>) {
    if let Some(value) = value {
        pairs.push((key, value.to_string()));
    }
}

fn push_time(pairs: &mut QueryPairs, key: &'static str, value: Option<&DateTime<Utc>>) {
    if let Some(ts) = value {
        pairs.push((key, ts.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
}

macro_rules! impl_list_query {
    ($ty:ty) => {
        impl ListQuery for $ty {
            fn paging(&self) -> &Paging {
                &self.paging
            }

            fn paging_mut(&mut self) -> &mut Paging {
                &mut self.paging
            }

            fn push_filters(&self, pairs: &mut QueryPairs) {
                self.filters(pairs);
            }
        }
    };
}

/// Parameters for `GET /tickets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQuery {
    paging: Paging,
    q: Option<String>,
    order_by: Option<OrderBy>,
    brand_id: Option<i64>,
    status: Option<String>,
    agent_id: Option<i64>,
    contact_id: Option<i64>,
    updated_since: Option<DateTime<Utc>>,
}

impl Default for TicketQuery {
    fn default() -> Self {
        Self {
            paging: Paging::new(50),
            q: None,
            order_by: None,
            brand_id: None,
            status: None,
            agent_id: None,
            contact_id: None,
            updated_since: None,
        }
    }
}

impl TicketQuery {
    /// Creates default parameters (page 1, 50 per page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text or structured filter expression.
    pub fn with_filter(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Sort order.
    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Only tickets of this brand.
    pub fn with_brand(mut self, brand_id: i64) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    /// Only tickets with this status name.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Only tickets assigned to this agent.
    pub fn with_agent(mut self, agent_id: i64) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    /// Only tickets raised by this contact.
    pub fn with_contact(mut self, contact_id: i64) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    /// Only tickets updated at or after this moment.
    pub fn with_updated_since(mut self, since: DateTime<Utc>) -> Self {
        self.updated_since = Some(since);
        self
    }

    fn filters(&self, pairs: &mut QueryPairs) {
        push_opt(pairs, "q", self.q.as_ref());
        push_opt(pairs, "orderBy", self.order_by.as_ref());
        push_opt(pairs, "brandId", self.brand_id.as_ref());
        push_opt(pairs, "status", self.status.as_ref());
        push_opt(pairs, "agentId", self.agent_id.as_ref());
        push_opt(pairs, "contactId", self.contact_id.as_ref());
        push_time(pairs, "updatedFrom", self.updated_since.as_ref());
    }
}

impl_list_query!(TicketQuery);

/// Parameters for `GET /tickets/worklogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklogQuery {
    paging: Paging,
    ticket_id: Option<i64>,
    agent_id: Option<i64>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl Default for WorklogQuery {
    fn default() -> Self {
        Self {
            paging: Paging::new(100),
            ticket_id: None,
            agent_id: None,
            from: None,
            to: None,
        }
    }
}

impl WorklogQuery {
    /// Creates default parameters (page 1, 100 per page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Only worklogs of this ticket.
    pub fn with_ticket(mut self, ticket_id: i64) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    /// Only worklogs of this agent.
    pub fn with_agent(mut self, agent_id: i64) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    /// Only worklogs logged within `[from, to]`.
    pub fn with_period(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    fn filters(&self, pairs: &mut QueryPairs) {
        push_opt(pairs, "ticketId", self.ticket_id.as_ref());
        push_opt(pairs, "agentId", self.agent_id.as_ref());
        push_time(pairs, "from", self.from.as_ref());
        push_time(pairs, "to", self.to.as_ref());
    }
}

impl_list_query!(WorklogQuery);

/// Parameters for `GET /agents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentQuery {
    paging: Paging,
    q: Option<String>,
    order_by: Option<OrderBy>,
    is_active: Option<bool>,
}

impl Default for AgentQuery {
    fn default() -> Self {
        Self {
            paging: Paging::new(100),
            q: None,
            order_by: None,
            is_active: None,
        }
    }
}

impl AgentQuery {
    /// Creates default parameters (page 1, 100 per page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text filter on name and email.
    pub fn with_filter(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Sort order.
    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Only active (or only inactive) agents.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    fn filters(&self, pairs: &mut QueryPairs) {
        push_opt(pairs, "q", self.q.as_ref());
        push_opt(pairs, "orderBy", self.order_by.as_ref());
        push_opt(pairs, "isActive", self.is_active.as_ref());
    }
}

impl_list_query!(AgentQuery);

/// Parameters for `GET /contacts`.
///
/// `q` takes a prebuilt filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactQuery {
    paging: Paging,
    q: Option<String>,
    order_by: Option<OrderBy>,
    group_id: Option<i64>,
}

impl Default for ContactQuery {
    fn default() -> Self {
        Self {
            paging: Paging::new(50),
            q: None,
            order_by: None,
            group_id: None,
        }
    }
}

impl ContactQuery {
    /// Creates default parameters (page 1, 50 per page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter expression.
    pub fn with_filter(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Sort order.
    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Only contacts of this contact group.
    pub fn with_group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    fn filters(&self, pairs: &mut QueryPairs) {
        push_opt(pairs, "q", self.q.as_ref());
        push_opt(pairs, "orderBy", self.order_by.as_ref());
        push_opt(pairs, "groupId", self.group_id.as_ref());
    }
}

impl_list_query!(ContactQuery);

/// Parameters for `GET /contact_groups`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactGroupQuery {
    paging: Paging,
    q: Option<String>,
    order_by: Option<OrderBy>,
}

impl Default for ContactGroupQuery {
    fn default() -> Self {
        Self {
            paging: Paging::new(100),
            q: None,
            order_by: None,
        }
    }
}

impl ContactGroupQuery {
    /// Creates default parameters (page 1, 100 per page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text filter on the group name.
    pub fn with_filter(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Sort order.
    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    fn filters(&self, pairs: &mut QueryPairs) {
        push_opt(pairs, "q", self.q.as_ref());
        push_opt(pairs, "orderBy", self.order_by.as_ref());
    }
}

impl_list_query!(ContactGroupQuery);

/// Parameters for `GET /brands` and `GET /user_brands`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandQuery {
    paging: Paging,
    q: Option<String>,
}

impl Default for BrandQuery {
    fn default() -> Self {
        Self {
            paging: Paging::new(10),
            q: None,
        }
    }
}

impl BrandQuery {
    /// Creates default parameters (page 1, 10 per page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text filter on the brand name.
    pub fn with_filter(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    fn filters(&self, pairs: &mut QueryPairs) {
        push_opt(pairs, "q", self.q.as_ref());
    }
}

impl_list_query!(BrandQuery);

/// Parameters for `GET /fields/options`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOptionQuery {
    paging: Paging,
    field_id: Option<i64>,
    q: Option<String>,
}

impl Default for FieldOptionQuery {
    fn default() -> Self {
        Self {
            paging: Paging::new(100),
            field_id: None,
            q: None,
        }
    }
}

impl FieldOptionQuery {
    /// Creates default parameters (page 1, 100 per page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Only options of this field.
    pub fn with_field(mut self, field_id: i64) -> Self {
        self.field_id = Some(field_id);
        self
    }

    /// Free-text filter on the option value.
    pub fn with_filter(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    fn filters(&self, pairs: &mut QueryPairs) {
        push_opt(pairs, "fieldId", self.field_id.as_ref());
        push_opt(pairs, "q", self.q.as_ref());
    }
}

impl_list_query!(FieldOptionQuery);
