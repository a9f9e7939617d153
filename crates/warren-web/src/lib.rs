//! # warren-web
//!
//! The web view layer for Warren - THE PRESENTATION.
//!
//! This crate turns stored tracker items into HTML fragments and parses
//! inbound request state back out of forms and URLs. It is the layer
//! between the item store and the template engine: wrappers and
//! property views on the way out, request-state parsing and pagination
//! on the way in.
//!
//! ## Architectural Constraints
//!
//! The core is a pure view layer:
//! - It never writes to the item store; rendering is read-only
//! - All collaborators (store, authorization, translation, search,
//!   templates) enter through traits; the crate owns no I/O
//! - Execution is single-threaded and synchronous per request; a
//!   [`session::Session`] is built per request and never shared
//! - Every property access is permission-checked at the point of
//!   rendering, never batched or cached

// =============================================================================
// MODULES
// =============================================================================

pub mod batch;
pub mod config;
pub mod context;
pub mod escape;
pub mod memory;
pub mod permissions;
pub mod props;
pub mod request;
pub mod session;
pub mod store;
pub mod types;
pub mod value;
pub mod wrappers;

#[cfg(test)]
mod testutil;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Action, Filterspec, OrderSpec, PropertyDescriptor, PropertyTable, SortDirection, WebError,
};
pub use value::{Interval, Timestamp, Value};

// =============================================================================
// RE-EXPORTS: View Layer
// =============================================================================

pub use context::{ContextSubject, RenderContext, TemplateCache, TemplateHandle};
pub use permissions::PermissionGate;
pub use props::{PropertyView, RenderVariant};
pub use session::Session;
pub use wrappers::{ClassWrapper, ItemWrapper};

// =============================================================================
// RE-EXPORTS: Request State & Pagination
// =============================================================================

pub use batch::{BatchEntry, BatchWindow};
pub use request::{RawParams, RequestState, StateOverrides};

// =============================================================================
// RE-EXPORTS: Collaborator Interfaces
// =============================================================================

pub use config::{HtmlFlavor, RenderConfig};
pub use store::{
    AuthorizationService, ClassStore, RecordClass, SearchIndex, TemplateStore, Translator,
};
