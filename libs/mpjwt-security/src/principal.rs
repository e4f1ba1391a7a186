//! Caller principal and role-set materialization.
//!
//! Authorization downstream works on a flat principal set: the token
//! principal, one group per token group, a `Roles` group, and exactly one
//! `CallerPrincipal` group naming who is making the call.

use std::collections::{BTreeSet, HashMap};

use crate::token::JsonWebToken;

/// Name of the group whose members are the application roles.
pub const ROLES_GROUP: &str = "Roles";

/// Name of the group marking the caller principal.
pub const CALLER_PRINCIPAL_GROUP: &str = "CallerPrincipal";

/// A member of the authenticated principal set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// The principal backed by the validated token.
    Token { name: String },
    /// A plain named principal, e.g. a role.
    Simple { name: String },
    /// A named group of principals.
    Group { name: String, members: Vec<Principal> },
}

impl Principal {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Token { name } | Self::Simple { name } | Self::Group { name, .. } => name,
        }
    }

    fn group(name: impl Into<String>, members: Vec<Principal>) -> Self {
        Self::Group {
            name: name.into(),
            members,
        }
    }

    fn is_group_named(&self, wanted: &str) -> bool {
        matches!(self, Self::Group { name, .. } if name == wanted)
    }
}

/// Extra roles granted to members of a group.
///
/// Mirrors a `group=role1,role2` properties mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMapping {
    mappings: HashMap<String, Vec<String>>,
}

impl RoleMapping {
    #[must_use]
    pub fn new(mappings: HashMap<String, Vec<String>>) -> Self {
        Self { mappings }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn roles_for<'a>(&'a self, group: &str) -> impl Iterator<Item = &'a String> {
        self.mappings.get(group).into_iter().flatten()
    }
}

/// Authenticated identity derived from a validated token.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CallerIdentity {
    name: String,
    principals: Vec<Principal>,
    roles: BTreeSet<String>,
    groups: BTreeSet<String>,
}

impl CallerIdentity {
    /// Caller name as resolved from the token.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full principal set.
    #[must_use]
    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    #[must_use]
    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    /// The `Roles` group consumed by authorization checks.
    #[must_use]
    pub fn role_group(&self) -> Option<&Principal> {
        self.find_group(ROLES_GROUP)
    }

    /// The group marking the caller principal.
    #[must_use]
    pub fn caller_group(&self) -> Option<&Principal> {
        self.find_group(CALLER_PRINCIPAL_GROUP)
    }

    #[must_use]
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    fn find_group(&self, name: &str) -> Option<&Principal> {
        self.principals.iter().find(|p| p.is_group_named(name))
    }
}

/// Build the caller identity for a validated token.
#[must_use]
pub fn materialize(token: &JsonWebToken, mapping: &RoleMapping) -> CallerIdentity {
    let token_principal = Principal::Token {
        name: token.name().to_owned(),
    };
    let groups = token.groups();

    let mut roles = token.roles();
    for group in &groups {
        roles.extend(mapping.roles_for(group).cloned());
    }

    let mut principals = vec![token_principal.clone()];
    principals.extend(
        groups
            .iter()
            .map(|group| Principal::group(group.clone(), Vec::new())),
    );
    principals.push(Principal::group(
        ROLES_GROUP,
        roles
            .iter()
            .map(|role| Principal::Simple { name: role.clone() })
            .collect(),
    ));

    // Runs after roles and groups so an existing caller group is kept as-is.
    if !principals
        .iter()
        .any(|p| p.is_group_named(CALLER_PRINCIPAL_GROUP))
    {
        principals.push(Principal::group(
            CALLER_PRINCIPAL_GROUP,
            vec![token_principal],
        ));
    }

    CallerIdentity {
        name: token.name().to_owned(),
        principals,
        roles,
        groups,
    }
}
