//! # Permission Gate
//!
//! The capability check consulted before any property is viewed or
//! edited. One gate value is embedded in class wrappers, item wrappers
//! and property views alike (composition, not inheritance), scoped to
//! what the holder exposes.
//!
//! ## Permission model
//!
//! - Item level: edit permission implies view permission
//!   (`view = View ∨ Edit`)
//! - Class level: the same rule with `Create` standing in for `Edit`
//! - Property level: `Edit` applies to existing items, `Create` to
//!   not-yet-created ones (no item id)

use crate::store::AuthorizationService;
use crate::types::{Action, WebError};

// =============================================================================
// SCOPE
// =============================================================================

/// What a gate guards.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GateScope {
    /// A whole record class.
    Class,
    /// One existing item.
    Item { id: String },
    /// One property, on an existing item or on the class (no id).
    Property { name: String, id: Option<String> },
}

// =============================================================================
// GATE
// =============================================================================

/// A scoped capability check against the authorization collaborator.
pub struct PermissionGate<'a> {
    auth: &'a dyn AuthorizationService,
    actor: &'a str,
    classname: String,
    scope: GateScope,
}

impl<'a> PermissionGate<'a> {
    /// A gate over a whole class.
    #[must_use]
    pub fn class_level(
        auth: &'a dyn AuthorizationService,
        actor: &'a str,
        classname: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            actor,
            classname: classname.into(),
            scope: GateScope::Class,
        }
    }

    /// A gate over one existing item.
    #[must_use]
    pub fn item_level(
        auth: &'a dyn AuthorizationService,
        actor: &'a str,
        classname: impl Into<String>,
        item: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            actor,
            classname: classname.into(),
            scope: GateScope::Item { id: item.into() },
        }
    }

    /// A gate over one property. `item` is `None` for class-level views
    /// (new-item forms).
    #[must_use]
    pub fn property_level(
        auth: &'a dyn AuthorizationService,
        actor: &'a str,
        classname: impl Into<String>,
        property: impl Into<String>,
        item: Option<String>,
    ) -> Self {
        Self {
            auth,
            actor,
            classname: classname.into(),
            scope: GateScope::Property {
                name: property.into(),
                id: item,
            },
        }
    }

    /// The class this gate guards.
    #[must_use]
    pub fn classname(&self) -> &str {
        &self.classname
    }

    fn query(&self, action: Action) -> bool {
        let (property, item) = match &self.scope {
            GateScope::Class => (None, None),
            GateScope::Item { id } => (None, Some(id.as_str())),
            GateScope::Property { name, id } => (Some(name.as_str()), id.as_deref()),
        };
        self.auth
            .has_permission(action, self.actor, &self.classname, property, item)
    }

    /// Whether the actor may modify what this gate guards. Class-level
    /// and new-item property gates check `Create`; everything existing
    /// checks `Edit`.
    #[must_use]
    pub fn is_edit_ok(&self) -> bool {
        let action = match &self.scope {
            GateScope::Class | GateScope::Property { id: None, .. } => Action::Create,
            GateScope::Item { .. } | GateScope::Property { id: Some(_), .. } => Action::Edit,
        };
        self.query(action)
    }

    /// Whether the actor may see what this gate guards. Edit permission
    /// implies view permission.
    #[must_use]
    pub fn is_view_ok(&self) -> bool {
        self.query(Action::View) || self.is_edit_ok()
    }

    /// Whether the actor may see but not modify.
    #[must_use]
    pub fn is_only_view_ok(&self) -> bool {
        self.is_view_ok() && !self.is_edit_ok()
    }

    /// Raise `Unauthorized` unless viewing is permitted.
    pub fn view_check(&self) -> Result<(), WebError> {
        if self.is_view_ok() {
            Ok(())
        } else {
            tracing::debug!(class = %self.classname, actor = %self.actor, "view denied");
            Err(WebError::Unauthorized {
                action: Action::View,
                classname: self.classname.clone(),
            })
        }
    }

    /// Raise `Unauthorized` unless editing is permitted.
    pub fn edit_check(&self) -> Result<(), WebError> {
        if self.is_edit_ok() {
            Ok(())
        } else {
            tracing::debug!(class = %self.classname, actor = %self.actor, "edit denied");
            Err(WebError::Unauthorized {
                action: Action::Edit,
                classname: self.classname.clone(),
            })
        }
    }
}

impl std::fmt::Debug for PermissionGate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("classname", &self.classname)
            .field("scope", &self.scope)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
