//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Warren web core:
//! - Property descriptors (`PropertyDescriptor`) — the closed set of
//!   property kinds a record class may declare
//! - Ordering specifications (`SortDirection`, `OrderSpec`)
//! - Filter specifications (`Filterspec`)
//! - Permission actions (`Action`)
//! - Error types (`WebError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module use `BTreeMap` keyed containers for
//! deterministic iteration, and implement `Ord`-friendly comparisons
//! where ordering matters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::store::Translator;

// =============================================================================
// PROPERTY DESCRIPTORS
// =============================================================================

/// The closed set of property kinds a record class may declare.
///
/// Reference kinds carry the name of the linked record class; all other
/// kinds are scalar. The set is closed: view dispatch matches exhaustively
/// over these variants, and the kinds are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyDescriptor {
    /// Free text.
    Text,
    /// Integer number.
    Number,
    /// Yes/no flag.
    Boolean,
    /// Point in time, stored in UTC.
    Date,
    /// Signed span of time.
    Duration,
    /// Write-only secret (passwords); never displayed.
    Secret,
    /// A single foreign id into the named class.
    Reference {
        /// The linked record class.
        class: String,
    },
    /// An ordered set of foreign ids into the named class.
    MultiReference {
        /// The linked record class.
        class: String,
    },
}

impl PropertyDescriptor {
    /// The linked class name for reference kinds, `None` for scalars.
    #[must_use]
    pub fn linked_class(&self) -> Option<&str> {
        match self {
            Self::Reference { class } | Self::MultiReference { class } => Some(class),
            _ => None,
        }
    }

    /// True for `Reference` and `MultiReference`.
    #[must_use]
    pub fn is_reference_kind(&self) -> bool {
        self.linked_class().is_some()
    }

    /// Stable kind name, used in log events.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Duration => "duration",
            Self::Secret => "secret",
            Self::Reference { .. } => "reference",
            Self::MultiReference { .. } => "multireference",
        }
    }
}

/// The property table of a record class: name → descriptor.
pub type PropertyTable = BTreeMap<String, PropertyDescriptor>;

// =============================================================================
// ORDERING & FILTERING
// =============================================================================

/// Direction of a sort or group specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending order (the `+` sign in serialized form, usually implied).
    #[default]
    Ascending,
    /// Descending order (the `-` sign in serialized form).
    Descending,
}

impl SortDirection {
    /// The sign character used when embedding the direction in a value.
    #[must_use]
    pub fn sign(self) -> &'static str {
        match self {
            Self::Ascending => "",
            Self::Descending => "-",
        }
    }
}

/// A sort or group specification: a direction plus an optional field.
///
/// `field == None` means "unspecified"; the direction is then meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Sort direction.
    pub direction: SortDirection,
    /// Property name to order by, if any.
    pub field: Option<String>,
}

impl OrderSpec {
    /// An ascending order on the given field.
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            direction: SortDirection::Ascending,
            field: Some(field.into()),
        }
    }

    /// A descending order on the given field.
    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            direction: SortDirection::Descending,
            field: Some(field.into()),
        }
    }

    /// True when no field was specified.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.field.is_none()
    }

    /// The serialized value form: the field name with a `-` prefix when
    /// descending (`-priority`, `activity`).
    #[must_use]
    pub fn to_value(&self) -> Option<String> {
        self.field
            .as_ref()
            .map(|f| format!("{}{}", self.direction.sign(), f))
    }
}

/// A filter specification: property name → required value(s).
///
/// Invariant: every key is a valid property name for the class the
/// specification was parsed against. The parser enforces this.
pub type Filterspec = BTreeMap<String, Vec<String>>;

// =============================================================================
// PERMISSION ACTIONS
// =============================================================================

/// The actions the authorization collaborator is queried about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read access to a class, item or property.
    View,
    /// Write access to an existing item or property.
    Edit,
    /// Permission to create new items of a class.
    Create,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Create => "create",
        };
        f.write_str(s)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the Warren web core.
///
/// A raised error aborts the remainder of the current render pass and
/// propagates to the top-level request handler; there is no partial-result
/// recovery inside the core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebError {
    /// Permission denied on a view/edit of a class or property.
    #[error("you are not allowed to {action} items of class {classname}")]
    Unauthorized {
        /// The denied action.
        action: Action,
        /// The class the action was attempted on.
        classname: String,
    },

    /// Template resolution failed after all fallbacks.
    #[error("no template file exists for templating \"{0}\"")]
    NoTemplate(String),

    /// An unknown property name was requested on a class.
    #[error("no such property \"{property}\" on {classname}")]
    MissingProperty {
        /// The class the property was looked up on.
        classname: String,
        /// The unknown property name.
        property: String,
    },

    /// Non-integer pagination values, an unresolvable classname, or any
    /// other request the core cannot act on. Fatal for the render.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A batch index at or beyond the window length.
    #[error("batch index {0} out of range")]
    IndexOutOfRange(isize),
}

impl WebError {
    /// Shorthand for an unresolvable classname.
    #[must_use]
    pub fn no_such_class(name: &str) -> Self {
        Self::MalformedRequest(format!("no class \"{name}\""))
    }

    /// The user-facing message, translated where a translation exists.
    ///
    /// Permission denials are the only messages shown verbatim to end
    /// users; the remaining variants surface through the host's error
    /// page and are translated there.
    #[must_use]
    pub fn localized(&self, translator: &dyn Translator) -> String {
        match self {
            Self::Unauthorized { action, classname } => {
                let template =
                    translator.gettext("you are not allowed to {action} items of class {class}");
                template
                    .replace("{action}", &action.to_string())
                    .replace("{class}", classname)
            }
            other => other.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
