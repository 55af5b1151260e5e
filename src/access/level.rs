//! Access levels and the fixed capability table.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Level carried by an explicit grant. Ownership is never a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum AccessLevel {
    /// Read-only.
    Viewer,
    /// May change title, body, color and status.
    Editor,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Viewer => "viewer",
            AccessLevel::Editor => "editor",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an [`AccessLevel`] from a form value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown access level '{0}' (expected 'viewer' or 'editor')")]
pub struct ParseAccessLevelError(pub String);

impl FromStr for AccessLevel {
    type Err = ParseAccessLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "viewer" => Ok(AccessLevel::Viewer),
            "editor" => Ok(AccessLevel::Editor),
            other => Err(ParseAccessLevelError(other.to_string())),
        }
    }
}

/// How a principal relates to a resource before flattening.
///
/// Owner wins structurally: a resolver builds `Owner` without ever looking at grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveAccess {
    /// Principal created the resource.
    Owner,
    /// Principal holds an explicit grant.
    Grant(AccessLevel),
}

impl EffectiveAccess {
    pub fn level(self) -> EffectiveLevel {
        match self {
            EffectiveAccess::Owner => EffectiveLevel::Owner,
            EffectiveAccess::Grant(AccessLevel::Editor) => EffectiveLevel::Editor,
            EffectiveAccess::Grant(AccessLevel::Viewer) => EffectiveLevel::Viewer,
        }
    }
}

impl From<EffectiveAccess> for EffectiveLevel {
    fn from(access: EffectiveAccess) -> Self {
        access.level()
    }
}

/// Flat effective level. Ordered `Viewer < Editor < Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum EffectiveLevel {
    Viewer,
    Editor,
    Owner,
}

impl EffectiveLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveLevel::Viewer => "viewer",
            EffectiveLevel::Editor => "editor",
            EffectiveLevel::Owner => "owner",
        }
    }

    /// Shorthand for [`authorize`].
    pub fn permits(self, action: Action) -> bool {
        authorize(self, action).is_allowed()
    }
}

impl fmt::Display for EffectiveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations gated by the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum Action {
    View,
    /// Title, body, color or status changes.
    Edit,
    /// Share, revoke, or open the share screen.
    Share,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Edit, Action::Share, Action::Delete];

    /// Map a form `intent` / `_action` discriminator onto an action.
    ///
    /// ```
    /// use taskgate::access::Action;
    /// assert_eq!(Action::from_intent("update-status"), Some(Action::Edit));
    /// assert_eq!(Action::from_intent("remove_access"), Some(Action::Share));
    /// assert_eq!(Action::from_intent("search_users"), None);
    /// ```
    pub fn from_intent(intent: &str) -> Option<Action> {
        match intent.trim() {
            "view" => Some(Action::View),
            "edit" | "update" | "update-status" => Some(Action::Edit),
            "share" | "share_task" | "revoke" | "remove_access" => Some(Action::Share),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }

    /// Lowest level allowed to perform this action.
    pub fn minimum_level(self) -> EffectiveLevel {
        match self {
            Action::View => EffectiveLevel::Viewer,
            Action::Edit => EffectiveLevel::Editor,
            Action::Share | Action::Delete => EffectiveLevel::Owner,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Share => "share",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Outcome of a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allow,
    Deny,
}

impl Authorization {
    pub fn is_allowed(self) -> bool {
        matches!(self, Authorization::Allow)
    }
}

/// The fixed capability table.
///
/// | action | owner | editor | viewer |
/// |---|---|---|---|
/// | view | ✓ | ✓ | ✓ |
/// | edit | ✓ | ✓ | ✗ |
/// | share / revoke | ✓ | ✗ | ✗ |
/// | delete | ✓ | ✗ | ✗ |
pub fn authorize(level: EffectiveLevel, action: Action) -> Authorization {
    if level >= action.minimum_level() {
        Authorization::Allow
    } else {
        Authorization::Deny
    }
}
