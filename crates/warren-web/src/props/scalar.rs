//! Render variants for the simple scalar kinds: numbers, yes/no flags
//! and write-only secrets.

use crate::permissions::PermissionGate;
use crate::props::{RenderVariant, ViewCore};
use crate::types::WebError;
use crate::value::Value;

// =============================================================================
// NUMBER
// =============================================================================

/// Render variant for integer number properties.
pub struct NumberView<'a> {
    core: ViewCore<'a>,
}

impl<'a> NumberView<'a> {
    pub(crate) fn new(core: ViewCore<'a>) -> Self {
        Self { core }
    }

    /// An edit field with an explicit size.
    pub fn field_sized(&self, size: usize) -> Result<String, WebError> {
        self.core.text_field(size, &self.plain()?)
    }
}

impl RenderVariant for NumberView<'_> {
    fn plain(&self) -> Result<String, WebError> {
        self.core.view_check()?;
        Ok(self
            .core
            .value
            .as_ref()
            .map(|v| v.display())
            .unwrap_or_default())
    }

    fn field(&self) -> Result<String, WebError> {
        self.field_sized(30)
    }

    fn gate(&self) -> PermissionGate<'_> {
        self.core.gate()
    }

    fn is_set(&self) -> bool {
        self.core.is_set()
    }

    fn form_name(&self) -> &str {
        &self.core.form_name
    }
}

// =============================================================================
// BOOLEAN
// =============================================================================

/// Render variant for yes/no flag properties.
pub struct BooleanView<'a> {
    core: ViewCore<'a>,
}

impl<'a> BooleanView<'a> {
    pub(crate) fn new(core: ViewCore<'a>) -> Self {
        Self { core }
    }

    fn flag(&self) -> Option<bool> {
        match &self.core.value {
            Some(Value::Boolean(b)) => Some(*b),
            _ => None,
        }
    }
}

impl RenderVariant for BooleanView<'_> {
    fn plain(&self) -> Result<String, WebError> {
        self.core.view_check()?;
        Ok(match self.flag() {
            Some(true) => self.core.session.gettext("Yes"),
            Some(false) => self.core.session.gettext("No"),
            None => String::new(),
        })
    }

    /// A pair of labelled radio buttons; the set value is pre-checked.
    fn field(&self) -> Result<String, WebError> {
        self.core.view_check()?;
        if !self.gate().is_edit_ok() {
            return self.plain();
        }
        let input = self.core.input();
        let name = &self.core.form_name;
        let flag = self.flag();
        Ok(format!(
            "{}{}{}{}",
            input.radio(name, "yes", flag == Some(true)),
            self.core.session.gettext("Yes"),
            input.radio(name, "no", flag == Some(false)),
            self.core.session.gettext("No"),
        ))
    }

    fn gate(&self) -> PermissionGate<'_> {
        self.core.gate()
    }

    fn is_set(&self) -> bool {
        self.core.is_set()
    }

    fn form_name(&self) -> &str {
        &self.core.form_name
    }
}

// =============================================================================
// SECRET
// =============================================================================

/// Render variant for write-only secret properties. The stored value is
/// never echoed; display shows a localized marker and edit fields are
/// always empty password inputs.
pub struct SecretView<'a> {
    core: ViewCore<'a>,
}

impl<'a> SecretView<'a> {
    pub(crate) fn new(core: ViewCore<'a>) -> Self {
        Self { core }
    }

    /// An edit field with an explicit size.
    pub fn field_sized(&self, size: usize) -> Result<String, WebError> {
        self.core.view_check()?;
        if self.gate().is_edit_ok() {
            Ok(self.core.input().password(&self.core.form_name, size))
        } else {
            self.plain()
        }
    }

    /// A second, matching password field for change confirmation, named
    /// `@confirm@` + the primary field's form name. Empty when editing
    /// is not permitted.
    pub fn confirm(&self, size: usize) -> Result<String, WebError> {
        self.core.view_check()?;
        if self.gate().is_edit_ok() {
            let name = format!("@confirm@{}", self.core.form_name);
            Ok(self.core.input().password(&name, size))
        } else {
            Ok(String::new())
        }
    }
}

impl RenderVariant for SecretView<'_> {
    fn plain(&self) -> Result<String, WebError> {
        self.core.view_check()?;
        if self.core.is_set() {
            Ok(self.core.session.gettext("*encrypted*"))
        } else {
            Ok(String::new())
        }
    }

    fn field(&self) -> Result<String, WebError> {
        self.field_sized(30)
    }

    fn gate(&self) -> PermissionGate<'_> {
        self.core.gate()
    }

    fn is_set(&self) -> bool {
        self.core.is_set()
    }

    fn form_name(&self) -> &str {
        &self.core.form_name
    }
}

// =============================================================================
// TESTS
// =============================================================================
