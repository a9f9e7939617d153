//! # Render Session
//!
//! The per-request bundle of collaborators handed to every wrapper and
//! view. A `Session` is created fresh for each inbound request and never
//! shared or mutated across requests; the collaborators it borrows are
//! owned by the host.

use crate::config::{HtmlFlavor, RenderConfig};
use crate::request::RawParams;
use crate::store::{AuthorizationService, ClassStore, SearchIndex, Translator};
use std::fmt::Write;

// =============================================================================
// SESSION
// =============================================================================

/// Everything one request's render pass needs, in one place.
pub struct Session<'a> {
    /// The persistent item store.
    pub store: &'a dyn ClassStore,
    /// The authorization decision service.
    pub auth: &'a dyn AuthorizationService,
    /// Localized-string lookup.
    pub translator: &'a dyn Translator,
    /// Full-text search.
    pub search: &'a dyn SearchIndex,
    /// Presentation settings.
    pub config: &'a RenderConfig,
    /// The acting user's id.
    pub actor: String,
    /// The raw request parameters, used to seed class-level form values.
    pub form: RawParams,
}

impl<'a> Session<'a> {
    /// A session with no form data.
    pub fn new(
        store: &'a dyn ClassStore,
        auth: &'a dyn AuthorizationService,
        translator: &'a dyn Translator,
        search: &'a dyn SearchIndex,
        config: &'a RenderConfig,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            store,
            auth,
            translator,
            search,
            config,
            actor: actor.into(),
            form: RawParams::default(),
        }
    }

    /// Attach the request's raw parameters.
    #[must_use]
    pub fn with_form(mut self, form: RawParams) -> Self {
        self.form = form;
        self
    }

    /// Localize a msgid.
    #[must_use]
    pub fn gettext(&self, msgid: &str) -> String {
        self.translator.gettext(msgid)
    }

    /// The display timezone, whole hours east of UTC.
    #[must_use]
    pub fn timezone(&self) -> i32 {
        self.config.timezone_offset
    }

    /// The form-fragment builder for the configured markup dialect.
    #[must_use]
    pub fn input_builder(&self) -> InputBuilder {
        InputBuilder {
            flavor: self.config.html_flavor,
        }
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("actor", &self.actor).finish()
    }
}

// =============================================================================
// INPUT BUILDER
// =============================================================================

/// Builds `<input>` fragments in the configured markup dialect. Injected
/// into wrappers and views rather than inherited, so both class-level and
/// item-level accessors share one implementation.
#[derive(Debug, Clone, Copy)]
pub struct InputBuilder {
    flavor: HtmlFlavor,
}

impl InputBuilder {
    /// An `<input>` element with the given attributes, in order.
    /// Attribute values are HTML-quoted here.
    #[must_use]
    pub fn input(&self, attrs: &[(&str, &str)]) -> String {
        let mut out = String::from("<input");
        for (name, value) in attrs {
            let _ = write!(out, " {}=\"{}\"", name, crate::escape::html_quote(value));
        }
        match self.flavor {
            HtmlFlavor::Html4 => out.push('>'),
            HtmlFlavor::Xhtml => out.push_str("/>"),
        }
        out
    }

    /// A hidden field.
    #[must_use]
    pub fn hidden(&self, name: &str, value: &str) -> String {
        self.input(&[("type", "hidden"), ("name", name), ("value", value)])
    }

    /// A single-line text field.
    #[must_use]
    pub fn text(&self, name: &str, value: &str, size: usize) -> String {
        let size = size.to_string();
        self.input(&[("name", name), ("value", value), ("size", &size)])
    }

    /// A password field (no value echo).
    #[must_use]
    pub fn password(&self, name: &str, size: usize) -> String {
        let size = size.to_string();
        self.input(&[("type", "password"), ("name", name), ("size", &size)])
    }

    /// One radio button, optionally checked.
    #[must_use]
    pub fn radio(&self, name: &str, value: &str, checked: bool) -> String {
        if checked {
            self.input(&[
                ("type", "radio"),
                ("name", name),
                ("value", value),
                ("checked", "checked"),
            ])
        } else {
            self.input(&[("type", "radio"), ("name", name), ("value", value)])
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
