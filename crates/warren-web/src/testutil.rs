//! Shared test fixture: a small in-memory tracker with issues, statuses
//! and keywords, plus session constructors for the common permission
//! setups.

use crate::config::RenderConfig;
use crate::memory::{
    AllowAll, IdentityTranslator, MemoryClass, MemoryStore, ScanIndex, TableAuth,
};
use crate::props::{PropertyView, TextView};
use crate::session::Session;
use crate::types::{Action, PropertyDescriptor};
use crate::value::Value;

pub(crate) struct Fixture {
    pub(crate) store: MemoryStore,
    pub(crate) allow: AllowAll,
    pub(crate) viewer: TableAuth,
    pub(crate) denied: TableAuth,
    pub(crate) translator: IdentityTranslator,
    pub(crate) search: ScanIndex,
    pub(crate) config: RenderConfig,
}

/// Three issues, three statuses (one retired), two keywords.
pub(crate) fn fixture() -> Fixture {
    let mut status = MemoryClass::new("status", "name");
    status.add_property("name", PropertyDescriptor::Text);
    status.add_property("order", PropertyDescriptor::Number);
    status.set_key_property("name");
    status.insert("1", &[("name", Value::Text("open".into())), ("order", Value::Number(1))]);
    status.insert(
        "2",
        &[("name", Value::Text("in-progress".into())), ("order", Value::Number(2))],
    );
    status.insert("3", &[("name", Value::Text("closed".into())), ("order", Value::Number(3))]);
    status.retire("3");

    let mut keyword = MemoryClass::new("keyword", "name");
    keyword.add_property("name", PropertyDescriptor::Text);
    keyword.set_key_property("name");
    keyword.insert("1", &[("name", Value::Text("docs".into()))]);
    keyword.insert("2", &[("name", Value::Text("web".into()))]);

    let mut issue = MemoryClass::new("issue", "title");
    issue.add_property("title", PropertyDescriptor::Text);
    issue.add_property("priority", PropertyDescriptor::Number);
    issue.add_property("resolved", PropertyDescriptor::Boolean);
    issue.add_property("created", PropertyDescriptor::Date);
    issue.add_property("effort", PropertyDescriptor::Duration);
    issue.add_property("password", PropertyDescriptor::Secret);
    issue.add_property("status", PropertyDescriptor::Reference { class: "status".into() });
    issue.add_property(
        "keywords",
        PropertyDescriptor::MultiReference { class: "keyword".into() },
    );
    issue.insert(
        "1",
        &[
            ("title", Value::Text("crash on save".into())),
            ("priority", Value::Number(1)),
            ("status", Value::Reference("1".into())),
            ("keywords", Value::MultiReference(vec!["1".into()])),
        ],
    );
    issue.insert(
        "2",
        &[
            ("title", Value::Text("typo in docs".into())),
            ("priority", Value::Number(3)),
            ("status", Value::Reference("2".into())),
        ],
    );
    issue.insert(
        "3",
        &[
            ("title", Value::Text("crash on load".into())),
            ("priority", Value::Number(2)),
            ("status", Value::Reference("1".into())),
        ],
    );

    let mut store = MemoryStore::new();
    store.add_class(status);
    store.add_class(keyword);
    store.add_class(issue);

    let mut viewer = TableAuth::new();
    for class in ["issue", "status", "keyword"] {
        viewer.grant_class(Action::View, class);
    }

    let config = RenderConfig {
        timezone_offset: 2,
        ..RenderConfig::default()
    };

    Fixture {
        store,
        allow: AllowAll,
        viewer,
        denied: TableAuth::new(),
        translator: IdentityTranslator,
        search: ScanIndex,
        config,
    }
}

/// A session with every permission granted.
pub(crate) fn session(fix: &Fixture) -> Session<'_> {
    Session::new(
        &fix.store,
        &fix.allow,
        &fix.translator,
        &fix.search,
        &fix.config,
        "7",
    )
}

/// A session that may view everything but edit nothing.
pub(crate) fn read_only_session(fix: &Fixture) -> Session<'_> {
    Session::new(
        &fix.store,
        &fix.viewer,
        &fix.translator,
        &fix.search,
        &fix.config,
        "7",
    )
}

/// A session with no permissions at all.
pub(crate) fn denied_session(fix: &Fixture) -> Session<'_> {
    Session::new(
        &fix.store,
        &fix.denied,
        &fix.translator,
        &fix.search,
        &fix.config,
        "7",
    )
}

/// Dispatch a view over a property of issue 1.
pub(crate) fn dispatch_on_issue1<'a>(
    sess: &'a Session<'a>,
    descriptor: &PropertyDescriptor,
    name: &str,
    value: Option<Value>,
) -> PropertyView<'a> {
    PropertyView::dispatch(sess, "issue", Some("1"), descriptor, name, value, false)
        .expect("dispatch")
}

/// A text view over a property of issue 1.
pub(crate) fn text_view<'a>(
    sess: &'a Session<'a>,
    name: &str,
    value: Option<Value>,
) -> TextView<'a> {
    match dispatch_on_issue1(sess, &PropertyDescriptor::Text, name, value) {
        PropertyView::Text(view) => view,
        _ => unreachable!("expected a text view"),
    }
}
