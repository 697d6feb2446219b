use serde::{Deserialize, Serialize};

use crate::{Permission, Role};

/// Identity of an authenticated operator as assigned by the auth backend.
///
/// Backends hand out numeric or string ids; both are kept in string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Authenticated identity plus its authorization attributes.
///
/// A principal is immutable within one credential generation: refresh and
/// re-login replace it wholesale rather than editing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: PrincipalId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Principal known only by the email it signed in with.
    ///
    /// Used when the login response carries no user object: the email doubles
    /// as id and display name, and no role or permission is granted.
    pub fn from_email(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: PrincipalId::new(email.clone()),
            name: email.clone(),
            email,
            role: None,
            permissions: Vec::new(),
        }
    }

    /// Whether this principal holds `role`. A principal without a role holds none.
    pub fn has_role(&self, role: &Role) -> bool {
        self.role.as_ref() == Some(role)
    }
}
