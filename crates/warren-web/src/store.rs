//! # Collaborator Interfaces
//!
//! Traits for the external services this core renders against: the
//! persistent item store, the authorization service, the translation
//! service, the full-text search index and the template source.
//!
//! The core never retries or times out a collaborator call; any blocking
//! happens inside the collaborator. Execution is single-threaded and
//! synchronous per request.
//!
//! This module also carries the id/key resolution helpers shared by the
//! view layer and the request parser (`lookup_ids`, `lookup_keys`,
//! `find_sort_key`).

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Action, Filterspec, OrderSpec, PropertyTable, WebError};
use crate::value::Value;

// =============================================================================
// ITEM STORE
// =============================================================================

/// One record class inside the item store.
pub trait RecordClass {
    /// The class name.
    fn name(&self) -> &str;

    /// The property table (name → descriptor) of this class.
    fn properties(&self) -> &PropertyTable;

    /// The value of `property` on `item`, `None` when unset or the item
    /// does not exist.
    fn get(&self, item: &str, property: &str) -> Option<Value>;

    /// All item ids of this class, in store order.
    fn list(&self) -> Vec<String>;

    /// The filtered, ordered id sequence for a listing query.
    ///
    /// `matches` restricts to a full-text result set when present.
    fn filter(
        &self,
        matches: Option<&BTreeSet<String>>,
        filterspec: &Filterspec,
        sort: &OrderSpec,
        group: &OrderSpec,
    ) -> Vec<String>;

    /// Resolve a key value to an item id.
    fn lookup(&self, key: &str) -> Option<String>;

    /// The property used as a human-readable label for items.
    fn label_property(&self) -> String;

    /// The designated key property, if the class has one.
    fn key_property(&self) -> Option<String>;

    /// Whether an item with this id exists (retired items included).
    fn has_item(&self, item: &str) -> bool;

    /// Whether the item is retired.
    fn is_retired(&self, item: &str) -> bool;
}

/// The persistent item store: a set of named record classes.
pub trait ClassStore {
    /// Look up a class by name.
    fn get_class(&self, name: &str) -> Result<&dyn RecordClass, WebError>;

    /// All class names, sorted.
    fn class_names(&self) -> Vec<String>;

    /// Whether a class with this name exists.
    fn has_class(&self, name: &str) -> bool {
        self.get_class(name).is_ok()
    }
}

// =============================================================================
// AUTHORIZATION / TRANSLATION / SEARCH / TEMPLATES
// =============================================================================

/// The external authorization decision service.
pub trait AuthorizationService {
    /// Whether `actor` may perform `action`, optionally narrowed to one
    /// property and/or one item of the class.
    fn has_permission(
        &self,
        action: Action,
        actor: &str,
        classname: &str,
        property: Option<&str>,
        item: Option<&str>,
    ) -> bool;
}

/// Localized-string lookup. Must be safe for concurrent reads if the
/// hosting server processes requests concurrently; this core does not
/// add its own synchronization.
pub trait Translator {
    /// The localized translation of `msgid`, or `msgid` itself when no
    /// translation exists.
    fn gettext(&self, msgid: &str) -> String;
}

/// Full-text search over a record class.
pub trait SearchIndex {
    /// The set of item ids matching all `tokens`.
    fn search(&self, tokens: &[String], class: &dyn RecordClass) -> BTreeSet<String>;
}

/// Raw template source access. Resolution fallbacks and caching live in
/// [`crate::context::TemplateCache`]; this trait is plain file access.
pub trait TemplateStore {
    /// The source of the template stored under `filename`, if present.
    fn load(&self, filename: &str) -> Option<String>;
}

// =============================================================================
// ID / KEY RESOLUTION HELPERS
// =============================================================================

static NUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("numeric id pattern"));

/// True when the token already looks like an item id.
#[must_use]
pub fn is_item_id(token: &str) -> bool {
    NUM_RE.is_match(token)
}

/// Resolve raw tokens to item ids via the class key lookup.
///
/// Numeric tokens pass through as ids. With `fail_ok`, unresolvable
/// tokens pass through unchanged so malformed form values can be
/// re-presented to the user; without it they are dropped.
#[must_use]
pub fn lookup_ids(class: &dyn RecordClass, tokens: &[String], fail_ok: bool) -> Vec<String> {
    let mut ids = Vec::with_capacity(tokens.len());
    for token in tokens {
        if is_item_id(token) {
            ids.push(token.clone());
            continue;
        }
        match class.lookup(token) {
            Some(id) => ids.push(id),
            None if fail_ok => {
                tracing::debug!(class = class.name(), %token, "passing through unresolved token");
                ids.push(token.clone());
            }
            None => {
                tracing::warn!(class = class.name(), %token, "dropping unresolved token");
            }
        }
    }
    ids
}

/// Map ids back to their `key` property values for display in editable
/// fields. Non-numeric entries are already key values and pass through;
/// ids whose item is gone keep the raw id.
#[must_use]
pub fn lookup_keys(class: &dyn RecordClass, key: &str, ids: &[String]) -> Vec<String> {
    ids.iter()
        .map(|entry| {
            if is_item_id(entry) {
                class
                    .get(entry, key)
                    .map(|v| v.display())
                    .unwrap_or_else(|| entry.clone())
            } else {
                entry.clone()
            }
        })
        .collect()
}

/// The ordering property for menus and resolved multi-reference lists:
/// an explicit `order` property when the class defines one, else the
/// class label property.
#[must_use]
pub fn find_sort_key(class: &dyn RecordClass) -> String {
    if class.properties().contains_key("order") {
        "order".to_string()
    } else {
        class.label_property()
    }
}

/// Sort ids in place by the given property's value. Entries with no
/// value (including passed-through unresolvable tokens) sort last, by
/// their raw text.
pub fn sort_ids_by(class: &dyn RecordClass, ids: &mut [String], sort_key: &str) {
    ids.sort_by(|a, b| {
        let va = class.get(a, sort_key);
        let vb = class.get(b, sort_key);
        match (va, vb) {
            (Some(x), Some(y)) => x.compare(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    });
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryClass;
    use crate::types::PropertyDescriptor;

    fn status_class() -> MemoryClass {
        let mut class = MemoryClass::new("status", "name");
        class.add_property("name", PropertyDescriptor::Text);
        class.add_property("order", PropertyDescriptor::Number);
        class.set_key_property("name");
        class.insert("1", &[("name", Value::Text("open".into())), ("order", Value::Number(2))]);
        class.insert("2", &[("name", Value::Text("closed".into())), ("order", Value::Number(1))]);
        class
    }

    #[test]
    fn lookup_ids_resolves_keys_and_passes_numbers() {
        let class = status_class();
        let tokens = vec!["open".to_string(), "2".to_string()];
        assert_eq!(lookup_ids(&class, &tokens, false), vec!["1", "2"]);
    }

    #[test]
    fn lookup_ids_fail_ok_passes_bad_tokens_through() {
        let class = status_class();
        let tokens = vec!["bug1".to_string(), "2".to_string()];
        let resolved = lookup_ids(&class, &tokens, true);
        assert_eq!(resolved, vec!["bug1", "2"]);
    }

    #[test]
    fn lookup_ids_strict_drops_bad_tokens() {
        let class = status_class();
        let tokens = vec!["bug1".to_string(), "2".to_string()];
        assert_eq!(lookup_ids(&class, &tokens, false), vec!["2"]);
    }

    #[test]
    fn find_sort_key_prefers_order() {
        let class = status_class();
        assert_eq!(find_sort_key(&class), "order");
        let mut plain = MemoryClass::new("kw", "name");
        plain.add_property("name", PropertyDescriptor::Text);
        assert_eq!(find_sort_key(&plain), "name");
    }

    #[test]
    fn sort_ids_by_order_property() {
        let class = status_class();
        let mut ids = vec!["1".to_string(), "2".to_string()];
        sort_ids_by(&class, &mut ids, "order");
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn lookup_keys_maps_ids_to_labels() {
        let class = status_class();
        let ids = vec!["1".to_string(), "stray".to_string()];
        assert_eq!(lookup_keys(&class, "name", &ids), vec!["open", "stray"]);
    }
}
