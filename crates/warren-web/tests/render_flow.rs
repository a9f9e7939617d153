//! # Render Flow Tests
//!
//! End-to-end exercises over the public API: parse a request, batch the
//! results, render property views and assemble a full context, against
//! the in-memory collaborators.

use std::collections::BTreeMap;

use warren_web::memory::{
    AllowAll, IdentityTranslator, MemoryClass, MemoryStore, MemoryTemplates, ScanIndex, TableAuth,
};
use warren_web::{
    Action, BatchEntry, ClassWrapper, ContextSubject, PropertyDescriptor, PropertyView,
    RawParams, RenderConfig, RenderContext, RequestState, Session, TemplateCache, Value,
    WebError,
};

fn bug_store() -> MemoryStore {
    let mut severity = MemoryClass::new("severity", "name");
    severity.add_property("name", PropertyDescriptor::Text);
    severity.add_property("order", PropertyDescriptor::Number);
    severity.set_key_property("name");
    severity.insert("1", &[("name", Value::Text("critical".into())), ("order", Value::Number(1))]);
    severity.insert("2", &[("name", Value::Text("minor".into())), ("order", Value::Number(2))]);

    let mut bug = MemoryClass::new("bug", "title");
    bug.add_property("title", PropertyDescriptor::Text);
    bug.add_property("severity", PropertyDescriptor::Reference { class: "severity".into() });
    for (id, title, severity_id) in [
        ("10", "parser drops comments", "1"),
        ("11", "panic rendering menus", "1"),
        ("12", "typo in help text", "2"),
        ("13", "slow startup scan", "2"),
    ] {
        bug.insert(
            id,
            &[
                ("title", Value::Text(title.into())),
                ("severity", Value::Reference(severity_id.into())),
            ],
        );
    }

    let mut store = MemoryStore::new();
    store.add_class(severity);
    store.add_class(bug);
    store
}

struct Host {
    store: MemoryStore,
    auth: AllowAll,
    translator: IdentityTranslator,
    search: ScanIndex,
    config: RenderConfig,
}

impl Host {
    fn new() -> Self {
        Self {
            store: bug_store(),
            auth: AllowAll,
            translator: IdentityTranslator,
            search: ScanIndex,
            config: RenderConfig::default(),
        }
    }

    fn session(&self) -> Session<'_> {
        Session::new(
            &self.store,
            &self.auth,
            &self.translator,
            &self.search,
            &self.config,
            "1",
        )
    }
}

#[test]
fn index_request_batches_grouped_results() {
    let host = Host::new();
    let sess = host.session();
    let form = RawParams::from_query("@sort=title&@group=severity&@pagesize=10");
    let state = RequestState::parse(&sess, Some("bug"), &form).expect("parse");

    let mut batch = state.batch(&sess).expect("batch");
    assert_eq!(batch.sequence_length(), 4);

    // Grouped by severity, then sorted by title within each group.
    let mut rows = Vec::new();
    let mut headings = 0;
    for index in 0..batch.len() {
        let entry = batch.get(index as isize).expect("in range");
        if batch.propchanged("severity") {
            headings += 1;
        }
        let BatchEntry::Item(item) = entry else {
            unreachable!("batch knows the class");
        };
        rows.push(item.id().to_string());
    }
    assert_eq!(rows, vec!["11", "10", "13", "12"]);
    assert_eq!(headings, 2);
}

#[test]
fn search_narrows_the_batch() {
    let host = Host::new();
    let sess = host.session();
    let form = RawParams::from_query("@search_text=rendering+menus");
    let state = RequestState::parse(&sess, Some("bug"), &form).expect("parse");
    let batch = state.batch(&sess).expect("batch");
    assert_eq!(batch.sequence_length(), 1);
}

#[test]
fn filter_on_reference_accepts_key_values() {
    let host = Host::new();
    let sess = host.session();
    let form = RawParams::from_query("@filter=severity&severity=critical");
    let state = RequestState::parse(&sess, Some("bug"), &form).expect("parse");
    assert_eq!(state.filterspec["severity"], vec!["1"]);
    let batch = state.batch(&sess).expect("batch");
    assert_eq!(batch.sequence_length(), 2);
}

#[test]
fn pagination_survives_the_url_round_trip() {
    let host = Host::new();
    let sess = host.session();
    let form = RawParams::from_query("@sort=title&@pagesize=2");
    let state = RequestState::parse(&sess, Some("bug"), &form).expect("parse");

    let first = state.batch(&sess).expect("batch");
    let second = first.next().expect("second page");

    // Build the "next page" link the way an index template would.
    let mut extra = BTreeMap::new();
    extra.insert("@startwith".to_string(), second.first().to_string());
    let url = state.indexargs_url("bug", &extra);
    let (_, query) = url.split_once('?').expect("query");

    let mut again = state.clone();
    again.reparse(&sess, query).expect("reparse");
    assert_eq!(again.start_offset, second.first());
    let resumed = again.batch(&sess).expect("batch");
    assert_eq!(resumed.start(), second.start());
    assert_eq!(resumed.len(), second.len());
}

#[test]
fn designators_in_text_link_only_real_items() {
    let host = Host::new();
    let sess = host.session();
    let mut bug12 = None;
    let class = ClassWrapper::new(&sess, "bug").expect("class");
    if let Some(item) = class.item("12").expect("lookup") {
        bug12 = Some(item);
    }
    let bug12 = bug12.expect("bug 12 exists");

    // Render a text value mentioning one live and one dead designator.
    let view = PropertyView::dispatch(
        &sess,
        bug12.classname(),
        Some(bug12.id()),
        &PropertyDescriptor::Text,
        "title",
        Some(Value::Text("dup of bug11, not bug999".into())),
        false,
    )
    .expect("dispatch");
    let PropertyView::Text(text) = view else {
        unreachable!("wrong variant");
    };
    let html = text.hyperlinked().expect("hyperlinked");
    assert!(html.contains("<a href=\"bug11\">bug11</a>"));
    assert!(html.contains("not bug999"));
    assert!(!html.contains("href=\"bug999\""));
}

#[test]
fn full_context_assembly() {
    let host = Host::new();
    let sess = host.session();
    let mut templates = MemoryTemplates::default();
    templates.set("bug.index.html", "<html>bugs</html>");
    templates.set("_generic.item.html", "<html>generic</html>");
    let cache = TemplateCache::new(&templates);

    let form = RawParams::from_query("@template=index");
    let state = RequestState::parse(&sess, Some("bug"), &form).expect("parse");
    assert_eq!(state.description(&sess), "Warren - bug index");

    let ctx = RenderContext::build(&sess, &cache, state).expect("context");
    assert!(matches!(ctx.subject, ContextSubject::Class(_)));
    assert_eq!(ctx.template.filename, "bug.index.html");

    // Item pages fall back to the generic item template.
    let state = RequestState::parse(&sess, Some("bug"), &RawParams::from_query("@template=item"))
        .expect("parse")
        .with_item("12");
    let ctx = RenderContext::build(&sess, &cache, state).expect("context");
    assert!(matches!(ctx.subject, ContextSubject::Item(_)));
    assert_eq!(ctx.template.filename, "_generic.item.html");
}

#[test]
fn permissions_shape_rendered_fields() {
    let store = bug_store();
    let mut auth = TableAuth::new();
    auth.grant_class(Action::View, "bug");
    auth.grant_class(Action::View, "severity");
    let translator = IdentityTranslator;
    let search = ScanIndex;
    let config = RenderConfig::default();
    let sess = Session::new(&store, &auth, &translator, &search, &config, "9");

    let class = ClassWrapper::new(&sess, "bug").expect("class");
    let item = class.item("12").expect("lookup").expect("present");
    let title = item.property("title").expect("property");

    // View-only: plain renders, field degrades to the plain value.
    assert_eq!(title.plain().expect("plain"), "typo in help text");
    assert!(!title.is_edit_ok());
    assert_eq!(title.field().expect("field"), "typo in help text");

    // No grants at all: rendering is refused outright.
    let denied = TableAuth::new();
    let sess = Session::new(&store, &denied, &translator, &search, &config, "9");
    let item = ClassWrapper::new(&sess, "bug")
        .expect("class")
        .item("12")
        .expect("lookup")
        .expect("present");
    let title = item.property("title").expect("property");
    assert_eq!(
        title.plain().expect_err("denied"),
        WebError::Unauthorized {
            action: Action::View,
            classname: "bug".into()
        }
    );
}
