//! # Class and Item Wrappers
//!
//! Template-facing handles over the item store. A `ClassWrapper` exposes
//! a record class (listings, new-item forms seeded from posted values);
//! an `ItemWrapper` exposes one stored item. Both hand out
//! [`PropertyView`]s for property access and embed a permission gate
//! scoped to what they expose.

use crate::permissions::PermissionGate;
use crate::props::PropertyView;
use crate::session::Session;
use crate::store::{RecordClass, is_item_id};
use crate::types::{Filterspec, OrderSpec, PropertyDescriptor, WebError};
use crate::value::Value;

// =============================================================================
// CLASS WRAPPER
// =============================================================================

/// A record class as seen by templates.
pub struct ClassWrapper<'a> {
    session: &'a Session<'a>,
    class: &'a dyn RecordClass,
}

impl<'a> ClassWrapper<'a> {
    /// Wrap the named class. Unknown names are a `MalformedRequest`.
    pub fn new(session: &'a Session<'a>, classname: &str) -> Result<Self, WebError> {
        let class = session.store.get_class(classname)?;
        Ok(Self { session, class })
    }

    /// The class name, which is also the class designator.
    #[must_use]
    pub fn name(&self) -> &str {
        self.class.name()
    }

    /// The class-level permission gate (`Create` stands in for `Edit`).
    #[must_use]
    pub fn gate(&self) -> PermissionGate<'a> {
        PermissionGate::class_level(self.session.auth, &self.session.actor, self.class.name())
    }

    /// Whether the actor may see this class.
    #[must_use]
    pub fn is_view_ok(&self) -> bool {
        self.gate().is_view_ok()
    }

    /// Whether the actor may create items of this class.
    #[must_use]
    pub fn is_edit_ok(&self) -> bool {
        self.gate().is_edit_ok()
    }

    /// All property names, sorted.
    #[must_use]
    pub fn propnames(&self) -> Vec<String> {
        self.class.properties().keys().cloned().collect()
    }

    /// A class-level view of one property, for new-item forms. The value
    /// is seeded from the request's posted form when a matching field
    /// was submitted, so redisplayed forms keep the user's input.
    pub fn property(&self, name: &str) -> Result<PropertyView<'a>, WebError> {
        let descriptor = self.descriptor(name)?;
        let value = self.seed_value(name, &descriptor);
        PropertyView::dispatch(self.session, self.class.name(), None, &descriptor, name, value, true)
    }

    /// Class-level views of every property, in name order.
    pub fn properties(&self) -> Result<Vec<(String, PropertyView<'a>)>, WebError> {
        self.propnames()
            .into_iter()
            .map(|name| self.property(&name).map(|view| (name, view)))
            .collect()
    }

    /// All items of this class, wrapped.
    pub fn list(&self) -> Result<Vec<ItemWrapper<'a>>, WebError> {
        self.gate().view_check()?;
        self.class
            .list()
            .into_iter()
            .map(|id| ItemWrapper::new(self.session, self.class.name(), &id))
            .collect()
    }

    /// The filtered, ordered item sequence for a listing query.
    pub fn filter(
        &self,
        filterspec: &Filterspec,
        sort: &OrderSpec,
        group: &OrderSpec,
    ) -> Result<Vec<ItemWrapper<'a>>, WebError> {
        self.gate().view_check()?;
        self.class
            .filter(None, filterspec, sort, group)
            .into_iter()
            .map(|id| ItemWrapper::new(self.session, self.class.name(), &id))
            .collect()
    }

    /// Wrap one item by id or key value. `None` when nothing matches.
    pub fn item(&self, id_or_key: &str) -> Result<Option<ItemWrapper<'a>>, WebError> {
        let id = if is_item_id(id_or_key) {
            id_or_key.to_string()
        } else {
            match self.class.lookup(id_or_key) {
                Some(id) => id,
                None => return Ok(None),
            }
        };
        if !self.class.has_item(&id) {
            return Ok(None);
        }
        ItemWrapper::new(self.session, self.class.name(), &id).map(Some)
    }

    fn descriptor(&self, name: &str) -> Result<PropertyDescriptor, WebError> {
        self.class
            .properties()
            .get(name)
            .cloned()
            .ok_or_else(|| WebError::MissingProperty {
                classname: self.class.name().to_string(),
                property: name.to_string(),
            })
    }

    /// A posted form value for a bare property name, coerced toward the
    /// property kind. Coercion is lenient: values that do not parse stay
    /// text so the form can re-present them.
    fn seed_value(&self, name: &str, descriptor: &PropertyDescriptor) -> Option<Value> {
        match descriptor {
            PropertyDescriptor::MultiReference { .. } => {
                let tokens = self.session.form.list_values(name);
                if tokens.is_empty() {
                    None
                } else {
                    Some(Value::MultiReference(tokens))
                }
            }
            PropertyDescriptor::Reference { .. } => {
                let raw = self.session.form.first_value(name)?.trim().to_string();
                if raw.is_empty() {
                    None
                } else {
                    Some(Value::Reference(raw))
                }
            }
            PropertyDescriptor::Number => {
                let raw = self.session.form.first_value(name)?.trim().to_string();
                match raw.parse::<i64>() {
                    Ok(n) => Some(Value::Number(n)),
                    Err(_) if raw.is_empty() => None,
                    Err(_) => Some(Value::Text(raw)),
                }
            }
            PropertyDescriptor::Boolean => {
                let raw = self.session.form.first_value(name)?.trim().to_lowercase();
                match raw.as_str() {
                    "yes" | "true" | "1" => Some(Value::Boolean(true)),
                    "no" | "false" | "0" => Some(Value::Boolean(false)),
                    "" => None,
                    _ => Some(Value::Text(raw)),
                }
            }
            _ => {
                let raw = self.session.form.first_value(name)?;
                if raw.is_empty() {
                    None
                } else {
                    Some(Value::Text(raw.to_string()))
                }
            }
        }
    }
}

impl std::fmt::Debug for ClassWrapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassWrapper")
            .field("class", &self.class.name())
            .finish()
    }
}

// =============================================================================
// ITEM WRAPPER
// =============================================================================

/// One stored item as seen by templates.
pub struct ItemWrapper<'a> {
    session: &'a Session<'a>,
    class: &'a dyn RecordClass,
    id: String,
}

impl<'a> ItemWrapper<'a> {
    /// Wrap an item of the named class. The class must exist; the item id
    /// is taken as given (templates may render placeholders for items
    /// that have since vanished).
    pub fn new(
        session: &'a Session<'a>,
        classname: &str,
        id: &str,
    ) -> Result<Self, WebError> {
        let class = session.store.get_class(classname)?;
        Ok(Self {
            session,
            class,
            id: id.to_string(),
        })
    }

    /// The class name.
    #[must_use]
    pub fn classname(&self) -> &str {
        self.class.name()
    }

    /// The item id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The item designator, `classname` + `id` (`issue12`).
    #[must_use]
    pub fn designator(&self) -> String {
        format!("{}{}", self.class.name(), self.id)
    }

    /// Whether the item is retired.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.class.is_retired(&self.id)
    }

    /// The item-level permission gate.
    #[must_use]
    pub fn gate(&self) -> PermissionGate<'a> {
        PermissionGate::item_level(
            self.session.auth,
            &self.session.actor,
            self.class.name(),
            self.id.clone(),
        )
    }

    /// Whether the actor may see this item.
    #[must_use]
    pub fn is_view_ok(&self) -> bool {
        self.gate().is_view_ok()
    }

    /// Whether the actor may modify this item.
    #[must_use]
    pub fn is_edit_ok(&self) -> bool {
        self.gate().is_edit_ok()
    }

    /// An item-level view of one property, holding the stored value.
    pub fn property(&self, name: &str) -> Result<PropertyView<'a>, WebError> {
        let descriptor = self
            .class
            .properties()
            .get(name)
            .cloned()
            .ok_or_else(|| WebError::MissingProperty {
                classname: self.class.name().to_string(),
                property: name.to_string(),
            })?;
        let value = self.class.get(&self.id, name);
        PropertyView::dispatch(
            self.session,
            self.class.name(),
            Some(&self.id),
            &descriptor,
            name,
            value,
            false,
        )
    }

    /// The stored label-property value, unstyled. Empty when unset.
    #[must_use]
    pub fn label(&self) -> String {
        self.class
            .get(&self.id, &self.class.label_property())
            .map(|v| v.display())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ItemWrapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemWrapper")
            .field("designator", &self.designator())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
