// Role-based access control - resource types, permissions and grant evaluation
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::login::UserDatabase;

/// Resource id or permission matching every value.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "GALLERYIMAGE_RESOURCE")]
    Gallery,
    #[serde(rename = "GALLERYIMAGE_IMAGE_RESOURCE")]
    Image,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Gallery => "GALLERYIMAGE_RESOURCE",
            ResourceType::Image => "GALLERYIMAGE_IMAGE_RESOURCE",
        }
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GALLERYIMAGE_RESOURCE" | "gallery" => Ok(ResourceType::Gallery),
            "GALLERYIMAGE_IMAGE_RESOURCE" | "image" => Ok(ResourceType::Image),
            other => Err(format!("unknown resource type {:?}", other)),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    View,
    Create,
    Modify,
    Delete,
    ManageGalleryImage,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::View => "VIEW",
            Permission::Create => "CREATE",
            Permission::Modify => "MODIFY",
            Permission::Delete => "DELETE",
            Permission::ManageGalleryImage => "MANAGE_GALLERY_IMAGE",
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VIEW" => Ok(Permission::View),
            "CREATE" => Ok(Permission::Create),
            "MODIFY" => Ok(Permission::Modify),
            "DELETE" => Ok(Permission::Delete),
            "MANAGE_GALLERY_IMAGE" => Ok(Permission::ManageGalleryImage),
            other => Err(format!("unknown permission {:?}", other)),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller of an operation. Anonymous callers hold no grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub username: Option<String>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }
}

/// One permission on one resource (or on all resources via `*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub resource_type: ResourceType,
    #[serde(default = "wildcard")]
    pub resource_id: String,
    #[serde(default = "wildcard")]
    pub permission: String,
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

impl Grant {
    pub fn new(resource_type: ResourceType, resource_id: &str, permission: &str) -> Self {
        Self {
            resource_type,
            resource_id: resource_id.to_string(),
            permission: permission.to_string(),
        }
    }

    /// A grant on `*` covers any id, but a grant on one id never satisfies a
    /// check made against `*`.
    pub fn allows(&self, resource_type: ResourceType, resource_id: &str, permission: Permission) -> bool {
        self.resource_type == resource_type
            && (self.resource_id == WILDCARD || self.resource_id == resource_id)
            && (self.permission == WILDCARD || self.permission == permission.as_str())
    }
}

/// Parses `TYPE[:ID[:PERMISSION]]`, with omitted parts meaning `*`.
impl FromStr for Grant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let resource_type = parts.next().unwrap_or_default().parse()?;
        let resource_id = parts.next().filter(|p| !p.is_empty()).unwrap_or(WILDCARD);
        let permission = parts.next().filter(|p| !p.is_empty()).unwrap_or(WILDCARD);
        if permission != WILDCARD {
            permission.parse::<Permission>()?;
        }
        Ok(Grant::new(resource_type, resource_id, permission))
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.resource_type, self.resource_id, self.permission)
    }
}

pub trait Authorizer: Send + Sync {
    fn is_authorized(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        permission: Permission,
        principal: &Principal,
    ) -> bool;
}

/// Authorizer backed by per-user grant lists.
#[derive(Debug, Clone, Default)]
pub struct GrantAuthorizer {
    grants: HashMap<String, Vec<Grant>>,
}

impl GrantAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_database(database: &UserDatabase) -> Self {
        Self {
            grants: database
                .users
                .iter()
                .map(|(username, user)| (username.clone(), user.grants.clone()))
                .collect(),
        }
    }

    pub fn with_grant(mut self, username: &str, grant: Grant) -> Self {
        self.grants.entry(username.to_string()).or_default().push(grant);
        self
    }
}

impl Authorizer for GrantAuthorizer {
    fn is_authorized(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        permission: Permission,
        principal: &Principal,
    ) -> bool {
        let allowed = principal
            .username
            .as_deref()
            .and_then(|username| self.grants.get(username))
            .is_some_and(|grants| {
                grants
                    .iter()
                    .any(|grant| grant.allows(resource_type, resource_id, permission))
            });

        if !allowed {
            tracing::debug!(
                "Denied {} on {}/{} for {:?}",
                permission,
                resource_type,
                resource_id,
                principal.username
            );
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_is_denied() {
        let authorizer = GrantAuthorizer::new().with_grant(
            "alice",
            Grant::new(ResourceType::Gallery, WILDCARD, WILDCARD),
        );
        assert!(!authorizer.is_authorized(
            ResourceType::Gallery,
            WILDCARD,
            Permission::View,
            &Principal::anonymous()
        ));
    }

    #[test]
    fn test_wildcard_grant_covers_specific_ids() {
        let authorizer = GrantAuthorizer::new().with_grant(
            "alice",
            Grant::new(ResourceType::Gallery, WILDCARD, "MODIFY"),
        );
        let alice = Principal::user("alice");
        assert!(authorizer.is_authorized(ResourceType::Gallery, "abc", Permission::Modify, &alice));
        assert!(authorizer.is_authorized(ResourceType::Gallery, WILDCARD, Permission::Modify, &alice));
        assert!(!authorizer.is_authorized(ResourceType::Gallery, "abc", Permission::Delete, &alice));
        assert!(!authorizer.is_authorized(ResourceType::Image, WILDCARD, Permission::Modify, &alice));
    }

    #[test]
    fn test_specific_grant_does_not_cover_wildcard_checks() {
        let authorizer = GrantAuthorizer::new().with_grant(
            "bob",
            Grant::new(ResourceType::Gallery, "abc", WILDCARD),
        );
        let bob = Principal::user("bob");
        assert!(authorizer.is_authorized(
            ResourceType::Gallery,
            "abc",
            Permission::ManageGalleryImage,
            &bob
        ));
        assert!(!authorizer.is_authorized(ResourceType::Gallery, "def", Permission::View, &bob));
        assert!(!authorizer.is_authorized(ResourceType::Gallery, WILDCARD, Permission::Create, &bob));
    }

    #[test]
    fn test_grant_parsing() {
        assert_eq!(
            "gallery".parse::<Grant>().unwrap(),
            Grant::new(ResourceType::Gallery, WILDCARD, WILDCARD)
        );
        assert_eq!(
            "GALLERYIMAGE_RESOURCE:abc:MANAGE_GALLERY_IMAGE"
                .parse::<Grant>()
                .unwrap(),
            Grant::new(ResourceType::Gallery, "abc", "MANAGE_GALLERY_IMAGE")
        );
        assert_eq!(
            "image::CREATE".parse::<Grant>().unwrap().to_string(),
            "GALLERYIMAGE_IMAGE_RESOURCE:*:CREATE"
        );
        assert!("album:*:VIEW".parse::<Grant>().is_err());
        assert!("image:*:FLY".parse::<Grant>().is_err());
    }

    #[test]
    fn test_grant_defaults_from_toml() {
        let grant: Grant = toml_edit::de::from_str(r#"resource_type = "GALLERYIMAGE_IMAGE_RESOURCE""#).unwrap();
        assert_eq!(grant, Grant::new(ResourceType::Image, WILDCARD, WILDCARD));
    }
}
