//! Brand, agent, contact and field option models.
//!
//! Brands and user brands are keyed by `brandId` in list payloads and by
//! `id` when fetched individually; agents and contacts the other way round.

use serde::Deserialize;

use crate::decode::{flexible_int, flexible_int_list, flexible_string};
use crate::identity::{EntityId, IdentityKeys};

/// Identifier keys of [`Brand`] and [`UserBrand`]: `brandId`, falling back to `id`.
#[derive(Debug, Clone, Copy)]
pub struct BrandKeys;

impl IdentityKeys for BrandKeys {
    const PRIMARY: &'static str = "brandId";
    const FALLBACK: &'static str = "id";
}

/// Identifier keys of [`Agent`]: `id`, falling back to `agentId`.
#[derive(Debug, Clone, Copy)]
pub struct AgentKeys;

impl IdentityKeys for AgentKeys {
    const PRIMARY: &'static str = "id";
    const FALLBACK: &'static str = "agentId";
}

/// Identifier keys of [`Contact`]: `id`, falling back to `contactId`.
#[derive(Debug, Clone, Copy)]
pub struct ContactKeys;

impl IdentityKeys for ContactKeys {
    const PRIMARY: &'static str = "id";
    const FALLBACK: &'static str = "contactId";
}

/// A brand (support portal) configured on the helpdesk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    /// Brand id.
    #[serde(flatten)]
    pub id: EntityId<BrandKeys>,

    /// Name as sent by list endpoints.
    #[serde(default, deserialize_with = "flexible_string")]
    pub brand_name: Option<String>,

    /// Name as sent by single-fetch endpoints.
    #[serde(default, deserialize_with = "flexible_string")]
    pub name: Option<String>,

    /// Portal URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Whether this is the helpdesk's default brand.
    #[serde(default)]
    pub is_default: Option<bool>,
}

impl Brand {
    /// Returns the brand name, whichever key it arrived under.
    pub fn display_name(&self) -> &str {
        self.brand_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }
}

/// A brand the calling agent has access to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBrand {
    /// Brand id.
    #[serde(flatten)]
    pub id: EntityId<BrandKeys>,

    /// Brand name.
    #[serde(default, deserialize_with = "flexible_string")]
    pub name: Option<String>,

    /// Agent's role within the brand.
    #[serde(default, deserialize_with = "flexible_string")]
    pub role: Option<String>,
}

/// A helpdesk agent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Agent id.
    #[serde(flatten)]
    pub id: EntityId<AgentKeys>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Email address.
    #[serde(default)]
    pub email: Option<String>,

    /// Role name.
    #[serde(default, deserialize_with = "flexible_string")]
    pub role: Option<String>,

    /// Whether the agent account is active.
    #[serde(default)]
    pub is_active: Option<bool>,

    /// Groups the agent belongs to.
    #[serde(default, deserialize_with = "flexible_int_list")]
    pub group_ids: Vec<i64>,
}

impl Agent {
    /// Returns the display name, falling back to email or id.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// A customer contact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Contact id.
    #[serde(flatten)]
    pub id: EntityId<ContactKeys>,

    /// Full name.
    #[serde(default)]
    pub name: Option<String>,

    /// Email address.
    #[serde(default)]
    pub email: Option<String>,

    /// Phone number.
    #[serde(default, deserialize_with = "flexible_string")]
    pub phone: Option<String>,

    /// Company name.
    #[serde(default, deserialize_with = "flexible_string")]
    pub company: Option<String>,

    /// Contact group the contact belongs to.
    #[serde(default, deserialize_with = "flexible_int")]
    pub group_id: Option<i64>,
}

/// A group of contacts (typically one customer organization).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactGroup {
    /// Group id.
    #[serde(default, deserialize_with = "flexible_int")]
    pub id: Option<i64>,

    /// Group name.
    #[serde(default, deserialize_with = "flexible_string")]
    pub name: Option<String>,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// Number of contacts in the group.
    #[serde(default, deserialize_with = "flexible_int")]
    pub contact_count: Option<i64>,
}

/// One selectable option of a custom field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    /// Option id.
    #[serde(default, deserialize_with = "flexible_int")]
    pub id: Option<i64>,

    /// Field the option belongs to.
    #[serde(default, deserialize_with = "flexible_int")]
    pub field_id: Option<i64>,

    /// Option value; numeric and boolean options arrive unquoted.
    #[serde(default, deserialize_with = "flexible_string")]
    pub value: Option<String>,

    /// Sort position.
    #[serde(default, deserialize_with = "flexible_int")]
    pub position: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_list_and_detail_shapes() {
        let listed: Brand =
            serde_json::from_str(r#"{"id": 99, "brandId": 3, "brandName": "Acme"}"#).unwrap();
        assert_eq!(listed.id.get(), Some(3));
        assert_eq!(listed.display_name(), "Acme");

        let fetched: Brand = serde_json::from_str(r#"{"id": 3, "name": "Acme"}"#).unwrap();
        assert_eq!(fetched.id.get(), Some(3));
        assert_eq!(fetched.display_name(), "Acme");
    }

    #[test]
    fn test_user_brand_deserialize() {
        let brand: UserBrand =
            serde_json::from_str(r#"{"brandId": 4, "name": {"brandName": "Beta"}, "role": "Admin"}"#)
                .unwrap();
        assert_eq!(brand.id.get(), Some(4));
        assert_eq!(brand.name.as_deref(), Some("Beta"));
        assert_eq!(brand.role.as_deref(), Some("Admin"));
    }

    #[test]
    fn test_agent_fallback_id_and_display_name() {
        let agent: Agent = serde_json::from_str(
            r#"{"agentId": 12, "email": "jo@example.com", "role": {"name": "Tier 1"}, "groupIds": ["1", 2]}"#,
        )
        .unwrap();
        assert_eq!(agent.id.get(), Some(12));
        assert_eq!(agent.role.as_deref(), Some("Tier 1"));
        assert_eq!(agent.group_ids, vec![1, 2]);
        assert_eq!(agent.display_name(), "jo@example.com");
    }

    #[test]
    fn test_agent_display_name_falls_back_to_id() {
        let agent: Agent = serde_json::from_str(r#"{"id": 12}"#).unwrap();
        assert_eq!(agent.display_name(), "12");
    }

    #[test]
    fn test_contact_deserialize() {
        let contact: Contact = serde_json::from_str(
            r#"{"contactId": 8, "id": 5, "name": "Sam", "phone": 5551234, "company": {"name": "Initech"}, "groupId": "3"}"#,
        )
        .unwrap();
        assert_eq!(contact.id.get(), Some(5));
        assert_eq!(contact.phone.as_deref(), Some("5551234"));
        assert_eq!(contact.company.as_deref(), Some("Initech"));
        assert_eq!(contact.group_id, Some(3));
    }

    #[test]
    fn test_field_option_value_shapes() {
        let option: FieldOption =
            serde_json::from_str(r#"{"id": 1, "fieldId": "4", "value": true, "position": 2}"#)
                .unwrap();
        assert_eq!(option.value.as_deref(), Some("true"));
        assert_eq!(option.field_id, Some(4));
    }
}
