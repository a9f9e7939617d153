//! Render variants for single and multi reference properties: label
//! resolution against the linked class, `<select>` menus, and the
//! struck-through placeholders shown for retired or vanished items.

use crate::escape::html_quote;
use crate::permissions::PermissionGate;
use crate::props::{RenderVariant, ViewCore};
use crate::store::{RecordClass, find_sort_key, is_item_id, lookup_keys};
use crate::types::{Filterspec, OrderSpec, WebError};
use crate::value::Value;
use crate::wrappers::ItemWrapper;

// =============================================================================
// MENU OPTIONS
// =============================================================================

/// Presentation knobs for reference `<select>` menus.
#[derive(Debug, Clone, Default)]
pub struct MenuOptions {
    /// Truncate option labels longer than this to `size - 3` plus `...`.
    pub size: Option<usize>,
    /// Visible rows for multi-selects; `min(option count, 7)` when absent.
    pub height: Option<usize>,
    /// Prefix each label with the linked item's designator.
    pub show_id: bool,
    /// Extra linked-class properties appended to each label.
    pub additional: Vec<String>,
    /// Restrict the option set to items matching this filter.
    pub conditions: Filterspec,
    /// Order options by this property instead of the default menu order.
    pub sort_on: Option<String>,
}

/// The ordered option ids for a menu: the linked class filtered by the
/// menu conditions, ordered by `sort_on` / `order` / label, with any
/// currently-selected ids the filter excluded re-inserted at the front.
fn menu_option_ids(
    class: &dyn RecordClass,
    selected: &[String],
    opts: &MenuOptions,
) -> Vec<String> {
    let sort = match &opts.sort_on {
        Some(prop) => OrderSpec::ascending(prop.clone()),
        None => OrderSpec::ascending(find_sort_key(class)),
    };
    let mut ids = class.filter(None, &opts.conditions, &sort, &OrderSpec::default());
    for id in selected.iter().rev() {
        if is_item_id(id) && !ids.contains(id) {
            ids.insert(0, id.clone());
        }
    }
    ids
}

/// One option's display label, truncated and HTML-quoted.
fn option_label(
    class: &dyn RecordClass,
    id: &str,
    label_property: &str,
    opts: &MenuOptions,
) -> String {
    let mut lab = class
        .get(id, label_property)
        .map(|v| v.display())
        .unwrap_or_default();
    // Truncation applies to the bare label; the designator prefix is
    // never cut short.
    if let Some(size) = opts.size {
        if lab.chars().count() > size {
            lab = lab
                .chars()
                .take(size.saturating_sub(3))
                .collect::<String>()
                + "...";
        }
    }
    if opts.show_id {
        lab = format!("{}{id}: {lab}", class.name());
    }
    if !opts.additional.is_empty() {
        let extras: Vec<String> = opts
            .additional
            .iter()
            .map(|prop| {
                class
                    .get(id, prop)
                    .map(|v| v.display())
                    .unwrap_or_default()
            })
            .collect();
        lab = format!("{lab} ({})", extras.join(", "));
    }
    html_quote(&lab)
}

fn format_option(id: &str, label: &str, selected: bool) -> String {
    if selected {
        format!("<option selected=\"selected\" value=\"{id}\">{label}</option>")
    } else {
        format!("<option value=\"{id}\">{label}</option>")
    }
}

/// The display label for one linked id: the item's label, struck through
/// when the item is retired, a struck designator when it is gone, and
/// the raw token when it never resolved to an id at all.
fn linked_label(class: &dyn RecordClass, id: &str) -> String {
    if !is_item_id(id) {
        return html_quote(id);
    }
    if !class.has_item(id) {
        return struck(&format!("{}{id}", class.name()));
    }
    let label = class
        .get(id, &class.label_property())
        .map(|v| v.display())
        .unwrap_or_default();
    if class.is_retired(id) {
        struck(&label)
    } else {
        html_quote(&label)
    }
}

fn struck(text: &str) -> String {
    format!("<strike>{}</strike>", html_quote(text))
}

// =============================================================================
// REFERENCE
// =============================================================================

/// Render variant for single-reference properties.
pub struct ReferenceView<'a> {
    core: ViewCore<'a>,
}

impl<'a> ReferenceView<'a> {
    pub(crate) fn new(mut core: ViewCore<'a>) -> Self {
        // "-1" is the form convention for "no selection".
        if matches!(&core.value, Some(Value::Reference(id)) if id == "-1") {
            core.value = None;
        }
        Self { core }
    }

    fn current_id(&self) -> Option<&str> {
        match &self.core.value {
            Some(Value::Reference(id)) => Some(id.as_str()),
            _ => None,
        }
    }

    /// An edit field with an explicit size. The edit value is the linked
    /// item's key when the class has one, so submissions stay readable.
    pub fn field_sized(&self, size: usize) -> Result<String, WebError> {
        self.core.view_check()?;
        let class = self.core.linked_class()?;
        let shown = match self.current_id() {
            Some(id) => match class.key_property() {
                Some(key) => lookup_keys(class, &key, &[id.to_string()])
                    .pop()
                    .unwrap_or_default(),
                None => id.to_string(),
            },
            None => String::new(),
        };
        if self.core.gate().is_edit_ok() {
            Ok(self.core.input().text(&self.core.form_name, &shown, size))
        } else {
            self.plain()
        }
    }

    /// A single-select `<option>` menu over the linked class. Falls back
    /// to `plain()` when editing is not permitted. The current value is
    /// always offered, even when the menu conditions exclude it.
    pub fn menu(&self, opts: &MenuOptions) -> Result<String, WebError> {
        self.core.view_check()?;
        if !self.core.gate().is_edit_ok() {
            return self.plain();
        }
        let class = self.core.linked_class()?;
        let current: Vec<String> = self.current_id().map(str::to_string).into_iter().collect();
        let label_property = class.label_property();

        let mut out = vec![format!("<select name=\"{}\">", self.core.form_name)];
        if current.is_empty() {
            out.push(format!(
                "<option selected=\"selected\" value=\"-1\">{}</option>",
                html_quote(&self.core.session.gettext("- no selection -"))
            ));
        }
        for id in menu_option_ids(class, &current, opts) {
            let label = option_label(class, &id, &label_property, opts);
            let selected = self.current_id() == Some(id.as_str());
            out.push(format_option(&id, &label, selected));
        }
        out.push("</select>".to_string());
        Ok(out.join("\n"))
    }

    /// The linked item wrapped for further property access, when set.
    pub fn item(&self) -> Result<Option<ItemWrapper<'a>>, WebError> {
        let Some(id) = self.current_id() else {
            return Ok(None);
        };
        let class = self.core.linked_class()?;
        if !class.has_item(id) {
            return Ok(None);
        }
        ItemWrapper::new(self.core.session, class.name(), id).map(Some)
    }
}

impl RenderVariant for ReferenceView<'_> {
    fn plain(&self) -> Result<String, WebError> {
        self.core.view_check()?;
        let Some(id) = self.current_id() else {
            return Ok(String::new());
        };
        let class = self.core.linked_class()?;
        Ok(linked_label(class, id))
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
// MULTI-REFERENCE
// =============================================================================

/// Render variant for multi-reference properties. Dispatch has already
/// resolved raw tokens fail-tolerantly and ordered the ids, so the held
/// sequence is canonical.
pub struct MultiReferenceView<'a> {
    core: ViewCore<'a>,
}

impl<'a> MultiReferenceView<'a> {
    pub(crate) fn new(core: ViewCore<'a>) -> Self {
        Self { core }
    }

    /// The canonical id sequence (unresolvable tokens included).
    #[must_use]
    pub fn ids(&self) -> &[String] {
        match &self.core.value {
            Some(Value::MultiReference(ids)) => ids,
            _ => &[],
        }
    }

    /// Number of linked ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    /// True when no ids are linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// Whether the given id is linked.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids().iter().any(|entry| entry == id)
    }

    /// The linked items wrapped for further property access, skipping
    /// tokens that never resolved to an id.
    pub fn items(&self) -> Result<Vec<ItemWrapper<'a>>, WebError> {
        let class = self.core.linked_class()?;
        self.ids()
            .iter()
            .filter(|id| is_item_id(id) && class.has_item(id))
            .map(|id| ItemWrapper::new(self.core.session, class.name(), id))
            .collect()
    }

    /// The id sequence in reverse order.
    #[must_use]
    pub fn reversed(&self) -> Vec<String> {
        self.ids().iter().rev().cloned().collect()
    }

    /// An edit field with an explicit size, holding the comma-joined key
    /// values (or raw ids when the linked class has no key).
    pub fn field_sized(&self, size: usize) -> Result<String, WebError> {
        self.core.view_check()?;
        if !self.core.gate().is_edit_ok() {
            return self.plain();
        }
        let class = self.core.linked_class()?;
        let shown = match class.key_property() {
            Some(key) => lookup_keys(class, &key, self.ids()).join(","),
            None => self.ids().join(","),
        };
        Ok(self.core.input().text(&self.core.form_name, &shown, size))
    }

    /// A multi-select `<option>` menu over the linked class. Selected
    /// ids the menu conditions exclude are always offered.
    pub fn menu(&self, opts: &MenuOptions) -> Result<String, WebError> {
        self.core.view_check()?;
        if !self.core.gate().is_edit_ok() {
            return self.plain();
        }
        let class = self.core.linked_class()?;
        let selected: Vec<String> = self
            .ids()
            .iter()
            .filter(|id| is_item_id(id))
            .cloned()
            .collect();
        let options = menu_option_ids(class, &selected, opts);
        let height = opts.height.unwrap_or_else(|| options.len().min(7));
        let label_property = class.label_property();

        let mut out = vec![format!(
            "<select multiple name=\"{}\" size=\"{height}\">",
            self.core.form_name
        )];
        for id in options {
            let label = option_label(class, &id, &label_property, opts);
            out.push(format_option(&id, &label, selected.contains(&id)));
        }
        out.push("</select>".to_string());
        Ok(out.join("\n"))
    }
}

impl RenderVariant for MultiReferenceView<'_> {
    fn plain(&self) -> Result<String, WebError> {
        self.core.view_check()?;
        let class = self.core.linked_class()?;
        let labels: Vec<String> = self
            .ids()
            .iter()
            .map(|id| linked_label(class, id))
            .collect();
        Ok(labels.join(", "))
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
