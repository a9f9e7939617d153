//! # Request State
//!
//! The parsed index arguments of one inbound request: columns, sort and
//! group order, filters, full-text search, pagination. Directive fields
//! are marked with `@` (current) or `:` (legacy); the marker is detected
//! in a first pass over the whole form and every directive is then read
//! under that one marker, so requests cannot mix the two dialects.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::batch::BatchWindow;
use crate::escape::{url_quote, url_unquote};
use crate::session::Session;
use crate::store::lookup_ids;
use crate::types::{Filterspec, OrderSpec, SortDirection, WebError};

/// The index directive names recognized after a marker character.
const DIRECTIVES: [&str; 10] = [
    "columns",
    "sort",
    "sortdir",
    "group",
    "groupdir",
    "filter",
    "search_text",
    "pagesize",
    "startwith",
    "template",
];

/// Full-text search terms: word characters, 2 to 25 long.
static SEARCH_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w{2,25}\b").expect("search token pattern"));

// =============================================================================
// RAW PARAMETERS
// =============================================================================

/// The decoded request parameters: name → submitted values, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    entries: BTreeMap<String, Vec<String>>,
}

impl RawParams {
    /// An empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a URL query string. Keys and values are percent-decoded;
    /// repeated keys accumulate.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (url_unquote(k), url_unquote(v)),
                None => (url_unquote(pair), String::new()),
            };
            params.append(&key, &value);
        }
        params
    }

    /// Add one value under a name.
    pub fn append(&mut self, name: &str, value: &str) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// Whether any value was submitted under this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The first submitted value under this name.
    #[must_use]
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values under this name, with single comma-separated values
    /// split into their parts. Empty parts are dropped.
    #[must_use]
    pub fn list_values(&self, name: &str) -> Vec<String> {
        let Some(values) = self.entries.get(name) else {
            return Vec::new();
        };
        values
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// =============================================================================
// OVERRIDES
// =============================================================================

/// Selective in-place changes to a parsed [`RequestState`]; `None` fields
/// are left alone.
#[derive(Debug, Clone, Default)]
pub struct StateOverrides {
    /// Replace the displayed columns.
    pub columns: Option<Vec<String>>,
    /// Replace the sort order.
    pub sort: Option<OrderSpec>,
    /// Replace the group order.
    pub group: Option<OrderSpec>,
    /// Replace the filtered property list.
    pub filter: Option<Vec<String>>,
    /// Replace the filter values.
    pub filterspec: Option<Filterspec>,
    /// Replace the full-text search string.
    pub search_text: Option<String>,
    /// Replace the page size.
    pub page_size: Option<usize>,
    /// Replace the pagination offset.
    pub start_offset: Option<usize>,
}

// =============================================================================
// REQUEST STATE
// =============================================================================

/// The index arguments of one request, parsed and validated.
///
/// Serializable so embedders can persist stored queries and restore them
/// later (alongside the URL form produced by [`Self::indexargs_url`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestState {
    /// The class the request addresses, if any.
    pub classname: Option<String>,
    /// The item the request addresses, if any.
    pub item_id: Option<String>,
    /// The template name (extension part).
    pub template: String,
    /// Columns to display on an index page.
    pub columns: Vec<String>,
    /// Sort order.
    pub sort: OrderSpec,
    /// Group order, applied before the sort order.
    pub group: OrderSpec,
    /// Properties being filtered on.
    pub filter: Vec<String>,
    /// Filter values per filtered property.
    pub filterspec: Filterspec,
    /// Full-text search string; empty means no search.
    pub search_text: String,
    /// Batch size for index pagination.
    pub page_size: usize,
    /// 0-based offset of the first displayed item.
    pub start_offset: usize,
    special_char: char,
}

impl RequestState {
    /// Parse the index arguments from the request parameters.
    ///
    /// Filtered property names must exist on the class; reference-kind
    /// filter values are resolved to ids fail-tolerantly, so unresolvable
    /// tokens survive into the filterspec rather than aborting the
    /// request. Non-integer pagination values are fatal.
    pub fn parse(
        session: &Session<'_>,
        classname: Option<&str>,
        form: &RawParams,
    ) -> Result<Self, WebError> {
        let sc = detect_marker(form);
        let key = |name: &str| format!("{sc}{name}");

        let columns = form.list_values(&key("columns"));
        let sort = parse_order(
            form.first_value(&key("sort")),
            form.contains(&key("sortdir")),
        );
        let group = parse_order(
            form.first_value(&key("group")),
            form.contains(&key("groupdir")),
        );
        let filter = form.list_values(&key("filter"));

        let mut filterspec = Filterspec::new();
        if let Some(classname) = classname {
            let class = session.store.get_class(classname)?;
            for name in &filter {
                let descriptor = class.properties().get(name).ok_or_else(|| {
                    WebError::MissingProperty {
                        classname: classname.to_string(),
                        property: name.clone(),
                    }
                })?;
                let values = form.list_values(name);
                if values.is_empty() {
                    continue;
                }
                let values = if descriptor.is_reference_kind() {
                    let linked = session
                        .store
                        .get_class(descriptor.linked_class().unwrap_or_default())?;
                    lookup_ids(linked, &values, true)
                } else {
                    values
                };
                filterspec.insert(name.clone(), values);
            }
        }

        let search_text = form
            .first_value(&key("search_text"))
            .unwrap_or_default()
            .to_string();
        let page_size = parse_count(form.first_value(&key("pagesize")), 50)?;
        let start_offset = parse_count(form.first_value(&key("startwith")), 0)?;
        let template = form
            .first_value(&key("template"))
            .unwrap_or("index")
            .to_string();

        Ok(Self {
            classname: classname.map(str::to_string),
            item_id: None,
            template,
            columns,
            sort,
            group,
            filter,
            filterspec,
            search_text,
            page_size,
            start_offset,
            special_char: sc,
        })
    }

    /// Address one item, for page titles.
    #[must_use]
    pub fn with_item(mut self, id: impl Into<String>) -> Self {
        self.item_id = Some(id.into());
        self
    }

    /// The marker character the request used (`@`, or `:` for legacy
    /// requests).
    #[must_use]
    pub fn special_char(&self) -> char {
        self.special_char
    }

    /// Whether a column is displayed. An empty column list displays
    /// everything.
    #[must_use]
    pub fn show_column(&self, name: &str) -> bool {
        self.columns.is_empty() || self.columns.iter().any(|c| c == name)
    }

    /// Apply selective overrides in place.
    pub fn update(&mut self, overrides: StateOverrides) {
        if let Some(columns) = overrides.columns {
            self.columns = columns;
        }
        if let Some(sort) = overrides.sort {
            self.sort = sort;
        }
        if let Some(group) = overrides.group {
            self.group = group;
        }
        if let Some(filter) = overrides.filter {
            self.filter = filter;
        }
        if let Some(filterspec) = overrides.filterspec {
            self.filterspec = filterspec;
        }
        if let Some(search_text) = overrides.search_text {
            self.search_text = search_text;
        }
        if let Some(page_size) = overrides.page_size {
            self.page_size = page_size;
        }
        if let Some(start_offset) = overrides.start_offset {
            self.start_offset = start_offset;
        }
    }

    /// Re-parse the index arguments from a URL query string, keeping the
    /// addressed class, item and template.
    pub fn reparse(&mut self, session: &Session<'_>, query: &str) -> Result<(), WebError> {
        let form = RawParams::from_query(query);
        let mut fresh = Self::parse(session, self.classname.as_deref(), &form)?;
        fresh.item_id = self.item_id.take();
        fresh.template = std::mem::take(&mut self.template);
        *self = fresh;
        Ok(())
    }

    /// The current index arguments as hidden form fields, so a submitted
    /// form returns to the same view.
    #[must_use]
    pub fn indexargs_form(&self, session: &Session<'_>) -> String {
        let sc = self.special_char;
        let input = session.input_builder();
        let mut fields = Vec::new();
        if !self.columns.is_empty() {
            fields.push(input.hidden(&format!("{sc}columns"), &self.columns.join(",")));
        }
        if let Some(sort) = self.sort.to_value() {
            fields.push(input.hidden(&format!("{sc}sort"), &sort));
        }
        if let Some(group) = self.group.to_value() {
            fields.push(input.hidden(&format!("{sc}group"), &group));
        }
        if !self.filter.is_empty() {
            fields.push(input.hidden(&format!("{sc}filter"), &self.filter.join(",")));
        }
        for (name, values) in &self.filterspec {
            fields.push(input.hidden(name, &values.join(",")));
        }
        if !self.search_text.is_empty() {
            fields.push(input.hidden(&format!("{sc}search_text"), &self.search_text));
        }
        fields.push(input.hidden(&format!("{sc}pagesize"), &self.page_size.to_string()));
        fields.push(input.hidden(&format!("{sc}startwith"), &self.start_offset.to_string()));
        fields.join("\n")
    }

    /// Embed the current index arguments in a URL. `extra` pairs come
    /// first and take precedence: an extra key naming a directive (with
    /// marker prefix) suppresses the current value, an extra key naming
    /// a filtered property suppresses that filterspec entry.
    #[must_use]
    pub fn indexargs_url(&self, base: &str, extra: &BTreeMap<String, String>) -> String {
        let sc = self.special_char;
        let mut parts: Vec<String> = extra
            .iter()
            .map(|(k, v)| format!("{k}={}", url_quote(v)))
            .collect();

        let overridden = |directive: &str| {
            extra.contains_key(&format!("@{directive}"))
                || extra.contains_key(&format!(":{directive}"))
        };

        if !self.columns.is_empty() && !overridden("columns") {
            parts.push(format!("{sc}columns={}", url_quote(&self.columns.join(","))));
        }
        if !overridden("sort") {
            if let Some(sort) = self.sort.to_value() {
                parts.push(format!("{sc}sort={}", url_quote(&sort)));
            }
        }
        if !overridden("group") {
            if let Some(group) = self.group.to_value() {
                parts.push(format!("{sc}group={}", url_quote(&group)));
            }
        }
        if !self.filter.is_empty() && !overridden("filter") {
            parts.push(format!("{sc}filter={}", url_quote(&self.filter.join(","))));
        }
        if !self.search_text.is_empty() && !overridden("search_text") {
            parts.push(format!("{sc}search_text={}", url_quote(&self.search_text)));
        }
        if !overridden("pagesize") {
            parts.push(format!("{sc}pagesize={}", self.page_size));
        }
        if !overridden("startwith") {
            parts.push(format!("{sc}startwith={}", self.start_offset));
        }
        for (name, values) in &self.filterspec {
            if !extra.contains_key(name) {
                parts.push(format!("{name}={}", url_quote(&values.join(","))));
            }
        }
        format!("{base}?{}", parts.join("&"))
    }

    /// A description of the request, for page titles.
    #[must_use]
    pub fn description(&self, session: &Session<'_>) -> String {
        let mut parts = vec![session.config.tracker_name.clone()];
        match (&self.classname, &self.item_id) {
            (Some(classname), Some(id)) => parts.push(format!("- {classname}{id}")),
            (Some(classname), None) => match self.template.as_str() {
                "item" => parts.push(format!("- new {classname}")),
                "index" => parts.push(format!("- {classname} index")),
                other => parts.push(format!("- {classname} {other}")),
            },
            (None, _) => parts.push("- home".to_string()),
        }
        parts.join(" ")
    }

    /// The batch over the current search: the addressed class filtered by
    /// the filterspec (and the full-text matches, when a search string is
    /// present), ordered by group then sort, windowed by the pagination
    /// arguments.
    pub fn batch<'a>(&self, session: &'a Session<'a>) -> Result<BatchWindow<'a>, WebError> {
        let classname = self.classname.as_deref().ok_or_else(|| {
            WebError::MalformedRequest("no class to batch over".to_string())
        })?;
        let class = session.store.get_class(classname)?;
        let matches = if self.search_text.is_empty() {
            None
        } else {
            let tokens: Vec<String> = SEARCH_TOKEN_RE
                .find_iter(&self.search_text)
                .map(|m| m.as_str().to_string())
                .collect();
            Some(session.search.search(&tokens, class))
        };
        let ids = class.filter(matches.as_ref(), &self.filterspec, &self.sort, &self.group);
        Ok(BatchWindow::new(
            session,
            Some(classname.to_string()),
            Rc::new(ids),
            self.page_size,
            self.start_offset,
            0,
            0,
        ))
    }
}

/// First pass: pick the request's marker character. `@` wins when a
/// request mixes both dialects.
fn detect_marker(form: &RawParams) -> char {
    let has = |sc: char| {
        DIRECTIVES
            .iter()
            .any(|d| form.contains(&format!("{sc}{d}")))
    };
    let at = has('@');
    let colon = has(':');
    if at && colon {
        tracing::warn!("request mixes '@' and ':' index directives, reading '@'");
    }
    if colon && !at { ':' } else { '@' }
}

/// A sort/group directive value: the field name, `-`-prefixed when
/// descending. A present `sortdir`/`groupdir` field forces descending.
fn parse_order(value: Option<&str>, force_descending: bool) -> OrderSpec {
    let Some(value) = value else {
        return OrderSpec::default();
    };
    let mut spec = match value.strip_prefix('-') {
        Some(field) => OrderSpec::descending(field),
        None => OrderSpec::ascending(value),
    };
    if force_descending {
        spec.direction = SortDirection::Descending;
    }
    spec
}

fn parse_count(value: Option<&str>, default: usize) -> Result<usize, WebError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            WebError::MalformedRequest(format!("expected a number, got \"{raw}\""))
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture, session};

    #[test]
    fn query_string_decoding() {
        let form = RawParams::from_query("@sort=-priority&title=hello%20world&title=again");
        assert_eq!(form.first_value("@sort"), Some("-priority"));
        assert_eq!(form.first_value("title"), Some("hello world"));
        assert_eq!(form.list_values("title"), vec!["hello world", "again"]);
    }

    #[test]
    fn list_values_split_commas() {
        let mut form = RawParams::new();
        form.append("@columns", "id,title, priority");
        assert_eq!(form.list_values("@columns"), vec!["id", "title", "priority"]);
    }

    #[test]
    fn parses_current_marker() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query("@sort=-priority&@group=status&@pagesize=25&@startwith=50");
        let state = RequestState::parse(&sess, Some("issue"), &form).expect("parse");
        assert_eq!(state.sort, OrderSpec::descending("priority"));
        assert_eq!(state.group, OrderSpec::ascending("status"));
        assert_eq!(state.page_size, 25);
        assert_eq!(state.start_offset, 50);
        assert_eq!(state.special_char(), '@');
    }

    #[test]
    fn parses_legacy_marker() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query(":sort=priority&:columns=id,title");
        let state = RequestState::parse(&sess, Some("issue"), &form).expect("parse");
        assert_eq!(state.sort, OrderSpec::ascending("priority"));
        assert_eq!(state.columns, vec!["id", "title"]);
        assert_eq!(state.special_char(), ':');
    }

    #[test]
    fn mixed_markers_read_current_only() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query("@sort=priority&:group=status");
        let state = RequestState::parse(&sess, Some("issue"), &form).expect("parse");
        assert_eq!(state.sort, OrderSpec::ascending("priority"));
        // The legacy directive is not read under the '@' marker.
        assert!(state.group.is_unset());
    }

    #[test]
    fn sortdir_forces_descending() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query("@sort=priority&@sortdir=1");
        let state = RequestState::parse(&sess, Some("issue"), &form).expect("parse");
        assert_eq!(state.sort, OrderSpec::descending("priority"));
    }

    #[test]
    fn filterspec_resolves_reference_tokens() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query("@filter=keywords,title&keywords=web,bogus&title=crash");
        let state = RequestState::parse(&sess, Some("issue"), &form).expect("parse");
        assert_eq!(state.filter, vec!["keywords", "title"]);
        // "web" resolves via the keyword key; "bogus" survives untouched.
        assert_eq!(state.filterspec["keywords"], vec!["2", "bogus"]);
        assert_eq!(state.filterspec["title"], vec!["crash"]);
    }

    #[test]
    fn unknown_filter_property_is_fatal() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query("@filter=flavour&flavour=mint");
        let err = RequestState::parse(&sess, Some("issue"), &form).expect_err("bad filter");
        assert_eq!(
            err,
            WebError::MissingProperty {
                classname: "issue".into(),
                property: "flavour".into()
            }
        );
    }

    #[test]
    fn non_integer_pagination_is_fatal() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query("@pagesize=lots");
        let err = RequestState::parse(&sess, Some("issue"), &form).expect_err("bad pagesize");
        assert!(matches!(err, WebError::MalformedRequest(_)));
    }

    #[test]
    fn indexargs_url_round_trips() {
        let fix = fixture();
        let sess = session(&fix);
        let form =
            RawParams::from_query("@sort=-priority&@filter=title&title=crash&@search_text=save");
        let state = RequestState::parse(&sess, Some("issue"), &form).expect("parse");

        let url = state.indexargs_url("issue", &BTreeMap::new());
        let (base, query) = url.split_once('?').expect("query");
        assert_eq!(base, "issue");

        let mut again = state.clone();
        again.reparse(&sess, query).expect("reparse");
        assert_eq!(again, state);
    }

    #[test]
    fn indexargs_url_extra_overrides() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query("@sort=priority&@startwith=20");
        let state = RequestState::parse(&sess, Some("issue"), &form).expect("parse");
        let mut extra = BTreeMap::new();
        extra.insert("@startwith".to_string(), "40".to_string());
        let url = state.indexargs_url("issue", &extra);
        assert!(url.contains("@startwith=40"));
        assert!(!url.contains("@startwith=20"));
        assert!(url.contains("@sort=priority"));
    }

    #[test]
    fn indexargs_form_emits_hidden_fields() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query("@sort=-priority&@filter=title&title=crash");
        let state = RequestState::parse(&sess, Some("issue"), &form).expect("parse");
        let html = state.indexargs_form(&sess);
        assert!(html.contains("name=\"@sort\" value=\"-priority\""));
        assert!(html.contains("name=\"title\" value=\"crash\""));
        assert!(html.contains("name=\"@pagesize\" value=\"50\""));
    }

    #[test]
    fn description_forms() {
        let fix = fixture();
        let sess = session(&fix);
        let empty = RawParams::new();
        let state = RequestState::parse(&sess, Some("issue"), &empty).expect("parse");
        assert_eq!(state.description(&sess), "Warren - issue index");
        let on_item = state.clone().with_item("12");
        assert_eq!(on_item.description(&sess), "Warren - issue12");
        let home = RequestState::parse(&sess, None, &empty).expect("parse");
        assert_eq!(home.description(&sess), "Warren - home");
    }

    #[test]
    fn batch_applies_search_and_filters() {
        let fix = fixture();
        let sess = session(&fix);
        let form = RawParams::from_query("@search_text=crash&@pagesize=10");
        let state = RequestState::parse(&sess, Some("issue"), &form).expect("parse");
        let batch = state.batch(&sess).expect("batch");
        // Issues 1 and 3 mention "crash".
        assert_eq!(batch.sequence_length(), 2);
    }
}
