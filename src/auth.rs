use std::collections::HashSet;

/// The identity on whose behalf configuration schemas are built.
///
/// Only consulted to decide whether the "create a new field" choice is
/// offered; execution itself is not permission-checked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    name: String,
    permissions: HashSet<String>,
    admin: bool,
}

impl Actor {
    /// Creates an actor holding the given permissions
    pub fn new<I, S>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
            admin: false,
        }
    }

    /// Creates an actor holding every permission
    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: HashSet::new(),
            admin: true,
        }
    }

    /// Creates an actor without permissions
    pub fn anonymous() -> Self {
        Self::new("anonymous", Vec::<String>::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.admin || self.permissions.contains(permission)
    }

    /// Adds a permission, returns false if it was already held
    pub fn grant(&mut self, permission: impl Into<String>) -> bool {
        self.permissions.insert(permission.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        let actor = Actor::admin("root");
        assert!(actor.has_permission("administer node fields"));
    }

    #[test]
    fn test_explicit_permissions() {
        let mut actor = Actor::new("alice", ["administer transaction fields"]);
        assert!(actor.has_permission("administer transaction fields"));
        assert!(!actor.has_permission("administer node fields"));
        assert!(actor.grant("administer node fields"));
        assert!(!actor.grant("administer node fields"));
        assert!(actor.has_permission("administer node fields"));
    }
}
