//! Text property rendering, including in-text hyperlinking of URLs,
//! email addresses and item designators.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::escape::html_quote;
use crate::permissions::PermissionGate;
use crate::props::{RenderVariant, ViewCore};
use crate::types::WebError;

/// One combined pattern with ordered alternatives: URL beats email beats
/// designator. The regex engine's leftmost-first alternation keeps the
/// precedence stable.
static HYPER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<url>\w{3,6}://\S+)|(?P<email>[-+=%/\w.]+@[\w.\-]+)|(?P<class>[A-Za-z_]+)\s?(?P<id>\d+)",
    )
    .expect("hyperlink pattern")
});

/// Render variant for text properties.
pub struct TextView<'a> {
    core: ViewCore<'a>,
}

impl<'a> TextView<'a> {
    pub(crate) fn new(core: ViewCore<'a>) -> Self {
        Self { core }
    }

    /// The display string with explicit escaping/hyperlinking control.
    /// Hyperlinking forces escaping, since the result embeds markup.
    pub fn plain_with(&self, escape: bool, hyperlink: bool) -> Result<String, WebError> {
        self.core.view_check()?;
        let Some(value) = &self.core.value else {
            return Ok(String::new());
        };
        let mut s = value.display();
        if escape || hyperlink {
            s = html_quote(&s);
        }
        if hyperlink {
            s = HYPER_RE
                .replace_all(&s, |caps: &Captures<'_>| self.hyper_repl(caps))
                .into_owned();
        }
        Ok(s)
    }

    /// `plain()` with URL/email/designator hyperlinking turned on.
    pub fn hyperlinked(&self) -> Result<String, WebError> {
        self.plain_with(false, true)
    }

    /// A multi-line edit field; read-only values render in a `<pre>`.
    pub fn multiline(&self, rows: usize, cols: usize) -> Result<String, WebError> {
        self.core.view_check()?;
        let value = self.core.quoted_value();
        if self.gate().is_edit_ok() {
            Ok(format!(
                "<textarea name=\"{}\" rows=\"{rows}\" cols=\"{cols}\">{value}</textarea>",
                self.core.form_name
            ))
        } else {
            Ok(format!("<pre>{}</pre>", self.plain()?))
        }
    }

    /// An edit field with an explicit size.
    pub fn field_sized(&self, size: usize) -> Result<String, WebError> {
        self.core.text_field(size, &self.core.raw_value())
    }

    /// The value as a spam-obscured email address: `name at domain ...`.
    pub fn email_obscured(&self) -> Result<String, WebError> {
        self.core.view_check()?;
        let Some(value) = &self.core.value else {
            return Ok(String::new());
        };
        let raw = value.display();
        let obscured = match raw.split_once('@') {
            Some((name, domain)) => {
                let name = name.replace('.', " ");
                // Drop the TLD.
                let parts: Vec<&str> = domain.split('.').collect();
                let domain = parts[..parts.len().saturating_sub(1)].join(" ");
                format!("{name} at {domain} ...")
            }
            None => raw.replace('.', " "),
        };
        Ok(html_quote(&obscured))
    }

    /// Build the replacement for one hyperlink match. Designators are
    /// only linked when the referenced class and item actually exist;
    /// otherwise the text stays plain.
    fn hyper_repl(&self, caps: &Captures<'_>) -> String {
        if let Some(url) = caps.name("url") {
            let url = url.as_str();
            return format!("<a href=\"{url}\">{url}</a>");
        }
        if let Some(email) = caps.name("email") {
            let email = email.as_str();
            return format!("<a href=\"mailto:{email}\">{email}</a>");
        }
        let classname = caps["class"].to_lowercase();
        let id = &caps["id"];
        let exists = self
            .core
            .session
            .store
            .get_class(&classname)
            .is_ok_and(|class| class.has_item(id));
        if exists {
            format!("<a href=\"{classname}{id}\">{classname}{id}</a>")
        } else {
            format!("{classname}{id}")
        }
    }
}

impl RenderVariant for TextView<'_> {
    fn plain(&self) -> Result<String, WebError> {
        self.plain_with(false, false)
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
