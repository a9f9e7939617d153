//! # In-Memory Collaborators
//!
//! Self-contained implementations of the collaborator traits, backed by
//! `BTreeMap`s. They power this crate's own tests and are handy for
//! embedders' unit tests; production hosts supply real implementations.

use std::collections::{BTreeMap, BTreeSet};

use crate::store::{
    AuthorizationService, ClassStore, RecordClass, SearchIndex, TemplateStore, Translator,
};
use crate::types::{Action, Filterspec, OrderSpec, PropertyTable, SortDirection, WebError};
use crate::value::Value;

// =============================================================================
// MEMORY CLASS
// =============================================================================

/// One in-memory record class.
#[derive(Debug, Clone, Default)]
pub struct MemoryClass {
    name: String,
    label: String,
    key: Option<String>,
    properties: PropertyTable,
    items: BTreeMap<String, BTreeMap<String, Value>>,
    retired: BTreeSet<String>,
}

impl MemoryClass {
    /// A new empty class with the given label property.
    #[must_use]
    pub fn new(name: impl Into<String>, label_property: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label_property.into(),
            ..Self::default()
        }
    }

    /// Declare a property.
    pub fn add_property(&mut self, name: impl Into<String>, descriptor: crate::types::PropertyDescriptor) {
        self.properties.insert(name.into(), descriptor);
    }

    /// Designate the key property used by `lookup`.
    pub fn set_key_property(&mut self, name: impl Into<String>) {
        self.key = Some(name.into());
    }

    /// Insert an item with the given property values.
    pub fn insert(&mut self, id: &str, values: &[(&str, Value)]) {
        let entry = self.items.entry(id.to_string()).or_default();
        for (name, value) in values {
            entry.insert((*name).to_string(), value.clone());
        }
    }

    /// Mark an item retired. Retired items keep their values but drop out
    /// of default listings.
    pub fn retire(&mut self, id: &str) {
        self.retired.insert(id.to_string());
    }

    fn matches_filterspec(&self, id: &str, filterspec: &Filterspec) -> bool {
        let Some(values) = self.items.get(id) else {
            return false;
        };
        for (prop, wanted) in filterspec {
            let ok = match values.get(prop) {
                Some(Value::MultiReference(held)) => held.iter().any(|v| wanted.contains(v)),
                Some(other) => wanted.contains(&other.display()),
                None => false,
            };
            if !ok {
                return false;
            }
        }
        true
    }

    fn order_key(&self, id: &str, spec: &OrderSpec) -> Option<Value> {
        spec.field
            .as_ref()
            .and_then(|field| self.get(id, field))
    }
}

/// Numeric-aware id ordering: shorter ids sort first, so "9" < "10".
fn id_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_keys(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> std::cmp::Ordering {
    let ord = match (a, b) {
        (Some(x), Some(y)) => x.compare(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    };
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}

impl RecordClass for MemoryClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &PropertyTable {
        &self.properties
    }

    fn get(&self, item: &str, property: &str) -> Option<Value> {
        self.items.get(item).and_then(|v| v.get(property)).cloned()
    }

    fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .items
            .keys()
            .filter(|id| !self.retired.contains(*id))
            .cloned()
            .collect();
        ids.sort_by(|a, b| id_order(a, b));
        ids
    }

    fn filter(
        &self,
        matches: Option<&BTreeSet<String>>,
        filterspec: &Filterspec,
        sort: &OrderSpec,
        group: &OrderSpec,
    ) -> Vec<String> {
        let mut ids: Vec<String> = self
            .list()
            .into_iter()
            .filter(|id| matches.is_none_or(|m| m.contains(id)))
            .filter(|id| self.matches_filterspec(id, filterspec))
            .collect();
        ids.sort_by(|a, b| {
            compare_keys(
                self.order_key(a, group).as_ref(),
                self.order_key(b, group).as_ref(),
                group.direction,
            )
            .then_with(|| {
                compare_keys(
                    self.order_key(a, sort).as_ref(),
                    self.order_key(b, sort).as_ref(),
                    sort.direction,
                )
            })
            .then_with(|| id_order(a, b))
        });
        ids
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let key_prop = self.key.as_ref()?;
        self.items
            .iter()
            .find(|(_, values)| {
                values
                    .get(key_prop)
                    .is_some_and(|v| v.display() == key)
            })
            .map(|(id, _)| id.clone())
    }

    fn label_property(&self) -> String {
        self.label.clone()
    }

    fn key_property(&self) -> Option<String> {
        self.key.clone()
    }

    fn has_item(&self, item: &str) -> bool {
        self.items.contains_key(item)
    }

    fn is_retired(&self, item: &str) -> bool {
        self.retired.contains(item)
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// An in-memory `ClassStore`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    classes: BTreeMap<String, MemoryClass>,
}

impl MemoryStore {
    /// A new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class.
    pub fn add_class(&mut self, class: MemoryClass) {
        self.classes.insert(class.name.clone(), class);
    }

    /// Mutable access to a class, for test setup.
    pub fn class_mut(&mut self, name: &str) -> Option<&mut MemoryClass> {
        self.classes.get_mut(name)
    }
}

impl ClassStore for MemoryStore {
    fn get_class(&self, name: &str) -> Result<&dyn RecordClass, WebError> {
        self.classes
            .get(name)
            .map(|c| c as &dyn RecordClass)
            .ok_or_else(|| WebError::no_such_class(name))
    }

    fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }
}

// =============================================================================
// AUTHORIZATION
// =============================================================================

/// Grants everything. The default in tests that are not about permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthorizationService for AllowAll {
    fn has_permission(
        &self,
        _action: Action,
        _actor: &str,
        _classname: &str,
        _property: Option<&str>,
        _item: Option<&str>,
    ) -> bool {
        true
    }
}

/// An explicit grant table: `(action, classname, property)`. A grant with
/// `property == None` covers the whole class. Item ids do not narrow
/// grants here; real hosts implement finer rules.
#[derive(Debug, Clone, Default)]
pub struct TableAuth {
    grants: BTreeSet<(Action, String, Option<String>)>,
}

impl TableAuth {
    /// An empty table (denies everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant an action on a whole class.
    pub fn grant_class(&mut self, action: Action, classname: &str) {
        self.grants.insert((action, classname.to_string(), None));
    }

    /// Grant an action on one property of a class.
    pub fn grant_property(&mut self, action: Action, classname: &str, property: &str) {
        self.grants
            .insert((action, classname.to_string(), Some(property.to_string())));
    }
}

impl AuthorizationService for TableAuth {
    fn has_permission(
        &self,
        action: Action,
        _actor: &str,
        classname: &str,
        property: Option<&str>,
        _item: Option<&str>,
    ) -> bool {
        if let Some(prop) = property {
            if self
                .grants
                .contains(&(action, classname.to_string(), Some(prop.to_string())))
            {
                return true;
            }
        }
        self.grants
            .contains(&(action, classname.to_string(), None))
    }
}

// =============================================================================
// TRANSLATION
// =============================================================================

/// Returns every msgid untranslated.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn gettext(&self, msgid: &str) -> String {
        msgid.to_string()
    }
}

/// A fixed msgid → translation table.
#[derive(Debug, Clone, Default)]
pub struct TableTranslator {
    entries: BTreeMap<String, String>,
}

impl TableTranslator {
    /// Register a translation.
    pub fn set(&mut self, msgid: &str, translation: &str) {
        self.entries
            .insert(msgid.to_string(), translation.to_string());
    }
}

impl Translator for TableTranslator {
    fn gettext(&self, msgid: &str) -> String {
        self.entries
            .get(msgid)
            .cloned()
            .unwrap_or_else(|| msgid.to_string())
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// Case-insensitive substring scan over a class's text properties. An
/// item matches when every token occurs in at least one text value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanIndex;

impl SearchIndex for ScanIndex {
    fn search(&self, tokens: &[String], class: &dyn RecordClass) -> BTreeSet<String> {
        let text_props: Vec<&String> = class
            .properties()
            .iter()
            .filter(|(_, d)| matches!(d, crate::types::PropertyDescriptor::Text))
            .map(|(name, _)| name)
            .collect();
        class
            .list()
            .into_iter()
            .filter(|id| {
                tokens.iter().all(|token| {
                    let needle = token.to_lowercase();
                    text_props.iter().any(|prop| {
                        class
                            .get(id, prop)
                            .is_some_and(|v| v.display().to_lowercase().contains(&needle))
                    })
                })
            })
            .collect()
    }
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// An in-memory template source: filename → source text.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    entries: BTreeMap<String, String>,
}

impl MemoryTemplates {
    /// Store a template under a filename such as `issue.index.html`.
    pub fn set(&mut self, filename: &str, source: &str) {
        self.entries
            .insert(filename.to_string(), source.to_string());
    }
}

impl TemplateStore for MemoryTemplates {
    fn load(&self, filename: &str) -> Option<String> {
        self.entries.get(filename).cloned()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyDescriptor;

    fn issue_store() -> MemoryStore {
        let mut issues = MemoryClass::new("issue", "title");
        issues.add_property("title", PropertyDescriptor::Text);
        issues.add_property("priority", PropertyDescriptor::Number);
        issues.insert("1", &[("title", Value::Text("crash on save".into())), ("priority", Value::Number(1))]);
        issues.insert("2", &[("title", Value::Text("typo in docs".into())), ("priority", Value::Number(3))]);
        issues.insert("3", &[("title", Value::Text("crash on load".into())), ("priority", Value::Number(2))]);
        let mut store = MemoryStore::new();
        store.add_class(issues);
        store
    }

    #[test]
    fn filter_by_spec_and_sort() {
        let store = issue_store();
        let class = store.get_class("issue").expect("class");
        let mut spec = Filterspec::new();
        spec.insert("title".into(), vec!["crash on save".into(), "crash on load".into()]);
        let ids = class.filter(None, &spec, &OrderSpec::descending("priority"), &OrderSpec::default());
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn retired_items_drop_out_of_listings() {
        let mut store = issue_store();
        store.class_mut("issue").expect("class").retire("2");
        let class = store.get_class("issue").expect("class");
        assert_eq!(class.list(), vec!["1", "3"]);
        assert!(class.has_item("2"));
        assert!(class.is_retired("2"));
    }

    #[test]
    fn scan_index_requires_all_tokens() {
        let store = issue_store();
        let class = store.get_class("issue").expect("class");
        let hits = ScanIndex.search(&["crash".into(), "save".into()], class);
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec!["1"]);
    }

    #[test]
    fn table_auth_property_and_class_grants() {
        let mut auth = TableAuth::new();
        auth.grant_class(Action::View, "issue");
        auth.grant_property(Action::Edit, "issue", "title");
        assert!(auth.has_permission(Action::View, "2", "issue", None, None));
        assert!(auth.has_permission(Action::View, "2", "issue", Some("priority"), None));
        assert!(auth.has_permission(Action::Edit, "2", "issue", Some("title"), None));
        assert!(!auth.has_permission(Action::Edit, "2", "issue", Some("priority"), None));
    }

    #[test]
    fn numeric_id_ordering() {
        let mut class = MemoryClass::new("msg", "id");
        class.add_property("id", PropertyDescriptor::Text);
        for id in ["9", "10", "2"] {
            class.insert(id, &[]);
        }
        assert_eq!(class.list(), vec!["2", "9", "10"]);
    }
}
