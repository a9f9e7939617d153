//! # Render Context
//!
//! What a template sees when it renders: the fixed set of top-level
//! names (`context`, `request`, `db`, ...), the template cache with its
//! resolution fallback chain, and the small utility surface templates
//! call into.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::batch::BatchWindow;
use crate::config::RenderConfig;
use crate::escape;
use crate::request::RequestState;
use crate::session::Session;
use crate::store::{TemplateStore, Translator};
use crate::types::WebError;
use crate::wrappers::{ClassWrapper, ItemWrapper};

/// The fixed top-level names every rendering exposes.
pub const CONTEXT_KEYS: [&str; 10] = [
    "context",
    "request",
    "db",
    "config",
    "utils",
    "templates",
    "template",
    "true",
    "false",
    "i18n",
];

// =============================================================================
// TEMPLATE CACHE
// =============================================================================

/// One resolved template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateHandle {
    /// The filename the resolution settled on.
    pub filename: String,
    /// Content type guessed from the filename.
    pub content_type: String,
    /// The template source.
    pub source: String,
}

/// Template resolution and caching over a [`TemplateStore`].
///
/// Resolution for `(name, extension)` walks a fixed fallback chain:
/// `name.extension`, `name.extension.html`, `_generic.extension`,
/// `_generic.extension.html`. Without an extension only `name` and
/// `name.html` are tried; no generic fallback is possible. The first
/// hit wins; a cached handle is reused until its source changes.
pub struct TemplateCache<'a> {
    store: &'a dyn TemplateStore,
    cache: RefCell<BTreeMap<String, Rc<TemplateHandle>>>,
}

impl<'a> TemplateCache<'a> {
    /// A cache over the given template source.
    #[must_use]
    pub fn new(store: &'a dyn TemplateStore) -> Self {
        Self {
            store,
            cache: RefCell::new(BTreeMap::new()),
        }
    }

    /// Resolve a template. `name` defaults to `home`; a dotted `name`
    /// with no explicit extension is split at the first dot.
    pub fn get(
        &self,
        name: Option<&str>,
        extension: Option<&str>,
    ) -> Result<Rc<TemplateHandle>, WebError> {
        let mut name = name.unwrap_or("home");
        let mut extension = extension;
        if extension.is_none() {
            if let Some((stem, ext)) = name.split_once('.') {
                name = stem;
                extension = Some(ext);
            }
        }

        let candidates = match extension {
            Some(ext) => vec![
                format!("{name}.{ext}"),
                format!("{name}.{ext}.html"),
                format!("_generic.{ext}"),
                format!("_generic.{ext}.html"),
            ],
            None => vec![name.to_string(), format!("{name}.html")],
        };
        for filename in candidates {
            if let Some(source) = self.store.load(&filename) {
                return Ok(self.handle(filename, source));
            }
        }
        let label = match extension {
            Some(ext) => format!("{name}.{ext}"),
            None => name.to_string(),
        };
        Err(WebError::NoTemplate(label))
    }

    fn handle(&self, filename: String, source: String) -> Rc<TemplateHandle> {
        let mut cache = self.cache.borrow_mut();
        if let Some(cached) = cache.get(&filename) {
            if cached.source == source {
                return Rc::clone(cached);
            }
        }
        let handle = Rc::new(TemplateHandle {
            content_type: guess_content_type(&filename).to_string(),
            filename: filename.clone(),
            source,
        });
        cache.insert(filename, Rc::clone(&handle));
        handle
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("xml") => "text/xml",
        Some("csv") => "text/csv",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("txt") => "text/plain",
        _ => "text/html",
    }
}

// =============================================================================
// DATABASE WRAPPER
// =============================================================================

/// A designator: a class name directly followed by an item id.
static DESIGNATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<cl>[A-Za-z_]+)(?P<id>\d+)$").expect("designator pattern"));

/// One entry fetched through [`DatabaseWrapper`].
pub enum DatabaseEntry<'a> {
    /// A whole class, fetched by class name.
    Class(ClassWrapper<'a>),
    /// One item, fetched by designator.
    Item(ItemWrapper<'a>),
}

/// Template access to arbitrary store entries by class name or item
/// designator.
pub struct DatabaseWrapper<'a> {
    session: &'a Session<'a>,
}

impl<'a> DatabaseWrapper<'a> {
    /// Wrap the session's store.
    #[must_use]
    pub fn new(session: &'a Session<'a>) -> Self {
        Self { session }
    }

    /// Fetch `issue12` as the wrapped item, `issue` as the wrapped
    /// class. Unknown classes are a `MalformedRequest`.
    pub fn get(&self, name: &str) -> Result<DatabaseEntry<'a>, WebError> {
        if let Some(caps) = DESIGNATOR_RE.captures(name) {
            let classname = &caps["cl"];
            if self.session.store.has_class(classname) {
                return ItemWrapper::new(self.session, classname, &caps["id"])
                    .map(DatabaseEntry::Item);
            }
        }
        ClassWrapper::new(self.session, name).map(DatabaseEntry::Class)
    }
}

// =============================================================================
// UTILS
// =============================================================================

/// The utility surface exposed to templates as `utils`.
pub struct TemplatingUtils<'a> {
    session: &'a Session<'a>,
}

impl<'a> TemplatingUtils<'a> {
    /// Utilities bound to a session.
    #[must_use]
    pub fn new(session: &'a Session<'a>) -> Self {
        Self { session }
    }

    /// Window an arbitrary id sequence; see [`BatchWindow::new`].
    #[must_use]
    pub fn batch(
        &self,
        sequence: Rc<Vec<String>>,
        size: usize,
        offset: usize,
        orphan: usize,
        overlap: usize,
    ) -> BatchWindow<'a> {
        BatchWindow::new(self.session, None, sequence, size, offset, orphan, overlap)
    }

    /// URL-quote the supplied text.
    #[must_use]
    pub fn url_quote(&self, text: &str) -> String {
        escape::url_quote(text)
    }

    /// HTML-quote the supplied text.
    #[must_use]
    pub fn html_quote(&self, text: &str) -> String {
        escape::html_quote(text)
    }
}

// =============================================================================
// RENDER CONTEXT
// =============================================================================

/// What the rendering addresses: the home page, a class, or one item.
pub enum ContextSubject<'a> {
    /// No class: the tracker home page.
    Home,
    /// A class listing or new-item form.
    Class(ClassWrapper<'a>),
    /// One existing item.
    Item(ItemWrapper<'a>),
}

/// The assembled top-level namespace for one rendering.
pub struct RenderContext<'a> {
    /// The `context` name: what is being rendered.
    pub subject: ContextSubject<'a>,
    /// The `request` name: the parsed index arguments.
    pub request: RequestState,
    /// The `db` name.
    pub database: DatabaseWrapper<'a>,
    /// The `config` name.
    pub config: &'a RenderConfig,
    /// The `utils` name.
    pub utils: TemplatingUtils<'a>,
    /// The `templates` name: every template, by name.
    pub templates: &'a TemplateCache<'a>,
    /// The `template` name: the template this rendering runs.
    pub template: Rc<TemplateHandle>,
    /// The `i18n` name.
    pub i18n: &'a dyn Translator,
}

impl<'a> RenderContext<'a> {
    /// Assemble the context for a parsed request: resolve the template
    /// from the request's class and template name, and pick the subject
    /// (item when the request addresses one, else the class, else home).
    pub fn build(
        session: &'a Session<'a>,
        templates: &'a TemplateCache<'a>,
        request: RequestState,
    ) -> Result<Self, WebError> {
        let template = match request.classname.as_deref() {
            Some(classname) => templates.get(Some(classname), Some(&request.template))?,
            None => templates.get(None, None)?,
        };
        let subject = match (&request.classname, &request.item_id) {
            (Some(classname), Some(id)) => {
                ContextSubject::Item(ItemWrapper::new(session, classname, id)?)
            }
            (Some(classname), None) if session.store.has_class(classname) => {
                ContextSubject::Class(ClassWrapper::new(session, classname)?)
            }
            _ => ContextSubject::Home,
        };
        Ok(Self {
            subject,
            request,
            database: DatabaseWrapper::new(session),
            config: session.config,
            utils: TemplatingUtils::new(session),
            templates,
            template,
            i18n: session.translator,
        })
    }

    /// The fixed top-level names this context binds.
    #[must_use]
    pub fn key_names(&self) -> &'static [&'static str] {
        &CONTEXT_KEYS
    }
}

// =============================================================================
// TESTS
// =============================================================================
