//! # Property Views
//!
//! The render-variant family: one view type per property kind, selected
//! by [`PropertyView::dispatch`] from a property descriptor. The kinds
//! are mutually exclusive, so dispatch is a single exhaustive match.
//!
//! Every variant shares one capability interface ([`RenderVariant`]):
//! `plain()` for the permission-checked display string, `field()` for an
//! editable form fragment that falls back to `plain()` when editing is
//! not permitted, and the embedded permission gate. Kind-specific
//! operations (hyperlinking, menus, timezone localization) live on the
//! concrete view types.
//!
//! Views are ephemeral: created on each property access, discarded when
//! the render pass moves on. Nothing is cached across accesses.

mod datetime;
mod link;
mod scalar;
mod text;

pub use datetime::{DateView, DurationView};
pub use link::{MenuOptions, MultiReferenceView, ReferenceView};
pub use scalar::{BooleanView, NumberView, SecretView};
pub use text::TextView;

use crate::permissions::PermissionGate;
use crate::session::{InputBuilder, Session};
use crate::store::{RecordClass, find_sort_key, lookup_ids, sort_ids_by};
use crate::types::{PropertyDescriptor, WebError};
use crate::value::Value;

// =============================================================================
// CAPABILITY INTERFACE
// =============================================================================

/// The operations every render variant supports.
pub trait RenderVariant {
    /// The permission-checked display string; empty when the value is
    /// unset. Raises `Unauthorized` when viewing is denied.
    fn plain(&self) -> Result<String, WebError>;

    /// An editable form fragment, falling back to `plain()` when editing
    /// is not permitted.
    fn field(&self) -> Result<String, WebError>;

    /// The permission gate guarding this property.
    fn gate(&self) -> PermissionGate<'_>;

    /// Whether the underlying value is set.
    fn is_set(&self) -> bool;

    /// The stable form-field name derived from (classname, item id,
    /// property name).
    fn form_name(&self) -> &str;
}

// =============================================================================
// VIEW CORE
// =============================================================================

/// The state shared by every render variant: identity, raw value, and
/// access to the session's collaborators.
#[derive(Clone)]
pub(crate) struct ViewCore<'a> {
    pub(crate) session: &'a Session<'a>,
    pub(crate) classname: String,
    /// Empty for class-level (new item) views.
    pub(crate) item_id: String,
    pub(crate) name: String,
    pub(crate) form_name: String,
    pub(crate) descriptor: PropertyDescriptor,
    pub(crate) value: Option<Value>,
}

impl<'a> ViewCore<'a> {
    fn new(
        session: &'a Session<'a>,
        classname: &str,
        item_id: Option<&str>,
        descriptor: PropertyDescriptor,
        name: &str,
        value: Option<Value>,
        anonymous: bool,
    ) -> Self {
        let item_id = item_id.unwrap_or("").to_string();
        // The form name ties a submitted field back to (class, item,
        // property). Anonymous views drop the prefix so new-item forms
        // post bare property names.
        let form_name = if anonymous {
            name.to_string()
        } else {
            format!("{classname}{item_id}@{name}")
        };
        Self {
            session,
            classname: classname.to_string(),
            item_id,
            name: name.to_string(),
            form_name,
            descriptor,
            value,
        }
    }

    pub(crate) fn gate(&self) -> PermissionGate<'_> {
        let item = if self.item_id.is_empty() {
            None
        } else {
            Some(self.item_id.clone())
        };
        PermissionGate::property_level(
            self.session.auth,
            &self.session.actor,
            self.classname.clone(),
            self.name.clone(),
            item,
        )
    }

    pub(crate) fn view_check(&self) -> Result<(), WebError> {
        self.gate().view_check()
    }

    pub(crate) fn input(&self) -> InputBuilder {
        self.session.input_builder()
    }

    pub(crate) fn is_set(&self) -> bool {
        match &self.value {
            None => false,
            Some(Value::MultiReference(ids)) => !ids.is_empty(),
            Some(_) => true,
        }
    }

    /// The linked record class for reference kinds.
    pub(crate) fn linked_class(&self) -> Result<&'a dyn RecordClass, WebError> {
        let class = self.descriptor.linked_class().ok_or_else(|| {
            WebError::MalformedRequest(format!(
                "property \"{}\" has no linked class",
                self.name
            ))
        })?;
        self.session.store.get_class(class)
    }

    /// The unquoted display form of the raw value, empty when unset.
    pub(crate) fn raw_value(&self) -> String {
        match &self.value {
            Some(v) => v.display(),
            None => String::new(),
        }
    }

    /// HTML-quoted display form of the raw value, for element bodies.
    pub(crate) fn quoted_value(&self) -> String {
        crate::escape::html_quote(&self.raw_value())
    }

    /// The standard text-input `field()` shared by several scalar kinds.
    /// The value goes in raw; the input builder quotes attribute values.
    pub(crate) fn text_field(&self, size: usize, plain: &str) -> Result<String, WebError> {
        self.view_check()?;
        if self.gate().is_edit_ok() {
            Ok(self.input().text(&self.form_name, &self.raw_value(), size))
        } else {
            Ok(plain.to_string())
        }
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// A renderable view over one property's value, one variant per kind.
pub enum PropertyView<'a> {
    /// Free text.
    Text(TextView<'a>),
    /// Integer number.
    Number(NumberView<'a>),
    /// Yes/no flag.
    Boolean(BooleanView<'a>),
    /// Point in time.
    Date(DateView<'a>),
    /// Signed span of time.
    Duration(DurationView<'a>),
    /// Write-only secret.
    Secret(SecretView<'a>),
    /// Single foreign id.
    Reference(ReferenceView<'a>),
    /// Ordered foreign id list.
    MultiReference(MultiReferenceView<'a>),
}

impl<'a> PropertyView<'a> {
    /// Select the render variant for a property.
    ///
    /// Multi-reference values are canonicalized here: raw tokens are
    /// resolved to ids fail-tolerantly (malformed form input passes
    /// through unchanged) and the result is ordered by the linked
    /// class's menu ordering rule. Once dispatch returns, a
    /// multi-reference view never holds unresolved raw input.
    pub fn dispatch(
        session: &'a Session<'a>,
        classname: &str,
        item_id: Option<&str>,
        descriptor: &PropertyDescriptor,
        name: &str,
        value: Option<Value>,
        anonymous: bool,
    ) -> Result<Self, WebError> {
        let core = ViewCore::new(
            session,
            classname,
            item_id,
            descriptor.clone(),
            name,
            value,
            anonymous,
        );
        let view = match descriptor {
            PropertyDescriptor::Text => Self::Text(TextView::new(core)),
            PropertyDescriptor::Number => Self::Number(NumberView::new(core)),
            PropertyDescriptor::Boolean => Self::Boolean(BooleanView::new(core)),
            PropertyDescriptor::Date => Self::Date(DateView::new(core)),
            PropertyDescriptor::Duration => Self::Duration(DurationView::new(core)),
            PropertyDescriptor::Secret => Self::Secret(SecretView::new(core)),
            PropertyDescriptor::Reference { .. } => Self::Reference(ReferenceView::new(core)),
            PropertyDescriptor::MultiReference { .. } => {
                Self::MultiReference(MultiReferenceView::new(canonicalize_multi(core)?))
            }
        };
        Ok(view)
    }

    fn variant(&self) -> &dyn RenderVariant {
        match self {
            Self::Text(v) => v,
            Self::Number(v) => v,
            Self::Boolean(v) => v,
            Self::Date(v) => v,
            Self::Duration(v) => v,
            Self::Secret(v) => v,
            Self::Reference(v) => v,
            Self::MultiReference(v) => v,
        }
    }

    /// See [`RenderVariant::plain`].
    pub fn plain(&self) -> Result<String, WebError> {
        self.variant().plain()
    }

    /// See [`RenderVariant::field`].
    pub fn field(&self) -> Result<String, WebError> {
        self.variant().field()
    }

    /// See [`RenderVariant::gate`].
    #[must_use]
    pub fn gate(&self) -> PermissionGate<'_> {
        self.variant().gate()
    }

    /// See [`RenderVariant::is_set`].
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.variant().is_set()
    }

    /// See [`RenderVariant::form_name`].
    #[must_use]
    pub fn form_name(&self) -> &str {
        self.variant().form_name()
    }

    /// Whether the actor may see this property.
    #[must_use]
    pub fn is_view_ok(&self) -> bool {
        self.gate().is_view_ok()
    }

    /// Whether the actor may modify this property.
    #[must_use]
    pub fn is_edit_ok(&self) -> bool {
        self.gate().is_edit_ok()
    }
}

impl std::fmt::Debug for PropertyView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Duration(_) => "duration",
            Self::Secret(_) => "secret",
            Self::Reference(_) => "reference",
            Self::MultiReference(_) => "multireference",
        };
        f.debug_struct("PropertyView")
            .field("kind", &kind)
            .field("form_name", &self.form_name())
            .finish()
    }
}

/// Resolve and order a multi-reference value during construction.
fn canonicalize_multi<'a>(mut core: ViewCore<'a>) -> Result<ViewCore<'a>, WebError> {
    let Some(Value::MultiReference(tokens)) = core.value.take() else {
        core.value = Some(Value::MultiReference(Vec::new()));
        return Ok(core);
    };
    let class = core.linked_class()?;
    let mut ids = lookup_ids(class, &tokens, true);
    sort_ids_by(class, &mut ids, &find_sort_key(class));
    core.value = Some(Value::MultiReference(ids));
    Ok(core)
}

// =============================================================================
// TESTS
// =============================================================================
