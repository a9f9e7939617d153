//! Render variants for points in time and time spans.
//!
//! Dates are stored in UTC and localized only at display time, either to
//! the session's configured timezone or to an explicit per-view offset.

use crate::permissions::PermissionGate;
use crate::props::{RenderVariant, ViewCore};
use crate::types::WebError;
use crate::value::{Interval, Timestamp, Value};

// =============================================================================
// DATE
// =============================================================================

/// Render variant for date properties.
pub struct DateView<'a> {
    core: ViewCore<'a>,
    /// Display offset in whole hours east of UTC; the session's
    /// configured timezone when absent.
    offset: Option<i32>,
}

impl<'a> DateView<'a> {
    pub(crate) fn new(core: ViewCore<'a>) -> Self {
        Self { core, offset: None }
    }

    fn display_offset(&self) -> i32 {
        self.offset.unwrap_or_else(|| self.core.session.timezone())
    }

    fn timestamp(&self) -> Option<Timestamp> {
        match &self.core.value {
            Some(Value::Date(ts)) => Some(*ts),
            _ => None,
        }
    }

    fn localized_display(&self) -> String {
        match self.timestamp() {
            Some(ts) => ts.localized(self.display_offset()).to_string(),
            None => self
                .core
                .value
                .as_ref()
                .map(|v| v.display())
                .unwrap_or_default(),
        }
    }

    /// A copy whose value is the current moment, optionally shifted by a
    /// signed interval expression such as `"- 3d"` or `"+ 1w 2:00"`.
    pub fn now(&self, shift: Option<&str>) -> Result<DateView<'a>, WebError> {
        self.core.view_check()?;
        let mut ts = Timestamp::now();
        if let Some(spec) = shift {
            ts = ts.offset_by(Interval::parse(spec)?);
        }
        let mut core = self.core.clone();
        core.value = Some(Value::Date(ts));
        Ok(DateView {
            core,
            offset: self.offset,
        })
    }

    /// A copy rendered in an explicit timezone instead of the session's.
    #[must_use]
    pub fn local(&self, offset: i32) -> DateView<'a> {
        DateView {
            core: self.core.clone(),
            offset: Some(offset),
        }
    }

    /// The value relative to the current moment, as an interval. With
    /// `pretty` set the result reads like "3 days ago" or "tomorrow".
    pub fn reldate(&self, pretty: bool) -> Result<String, WebError> {
        self.core.view_check()?;
        let Some(ts) = self.timestamp() else {
            return Ok(String::new());
        };
        let delta = ts.since(Timestamp::now());
        if pretty {
            Ok(delta.pretty())
        } else {
            Ok(delta.to_string())
        }
    }

    /// An edit field with an explicit size. The edit value is shown in
    /// the display timezone, matching what `plain()` renders.
    pub fn field_sized(&self, size: usize) -> Result<String, WebError> {
        self.core.view_check()?;
        let display = self.localized_display();
        if self.core.gate().is_edit_ok() {
            Ok(self
                .core
                .input()
                .text(&self.core.form_name, &display, size))
        } else {
            Ok(display)
        }
    }
}

impl std::fmt::Debug for DateView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateView")
            .field("form_name", &self.core.form_name)
            .field("offset", &self.offset)
            .finish()
    }
}

impl RenderVariant for DateView<'_> {
    fn plain(&self) -> Result<String, WebError> {
        self.core.view_check()?;
        Ok(self.localized_display())
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
// DURATION
// =============================================================================

/// Render variant for signed time-span properties.
pub struct DurationView<'a> {
    core: ViewCore<'a>,
}

impl<'a> DurationView<'a> {
    pub(crate) fn new(core: ViewCore<'a>) -> Self {
        Self { core }
    }

    fn interval(&self) -> Option<Interval> {
        match &self.core.value {
            Some(Value::Duration(iv)) => Some(*iv),
            _ => None,
        }
    }

    /// The value as approximate prose ("3 days", "in 2 hours").
    pub fn pretty(&self) -> Result<String, WebError> {
        self.core.view_check()?;
        Ok(self.interval().map(|iv| iv.pretty()).unwrap_or_default())
    }

    /// An edit field with an explicit size.
    pub fn field_sized(&self, size: usize) -> Result<String, WebError> {
        self.core.text_field(size, &self.plain()?)
    }
}

impl RenderVariant for DurationView<'_> {
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
// TESTS
// =============================================================================
