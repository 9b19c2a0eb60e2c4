//! Schema-driven intake form engine.
//!
//! The crate turns a declarative tree of [`FieldNode`]s into a live,
//! conditionally visible field set, keeps every answer in a flat
//! path-keyed [`FormStore`], and hands a nested snapshot of those answers to a
//! [`Dispatcher`] when the form is submitted.
//!
//! Module map:
//! - `schema`      : field tree (pure data) + lint
//! - `path`        : hierarchical field identifiers
//! - `value`       : field values and their empty/truthy semantics
//! - `store`       : register / read / write / watch / snapshot
//! - `render`      : recursive conditional renderer (+ `LiveForm`)
//! - `multiselect` : open/closed registry and selection toggling
//! - `outside`     : pointer bus + outside-click coordinator
//! - `submit`      : submission state machine
//! - `dispatch`    : dispatcher trait and the HTTP implementation
//! - `format`      : plain-text flattening of a snapshot
//! - `validation`  : advisory required-field checks
//! - `session`     : `FormSession`, the single entry point for hosts
//!
//! Typical usage:
//! ```ignore
//! let schema = FormSchema::from_json(include_str!("form.json"))?;
//! let dispatcher = Arc::new(HttpDispatcher::new("http://127.0.0.1:3000/api/send-email")?);
//! let mut session = FormSession::mount(schema, dispatcher)?;
//! session.write(&FieldPath::parse("hasInsurance")?, FieldValue::Bool(true));
//! for field in session.visible_fields() {
//!     println!("{} ({:?})", field.path, field.node.kind);
//! }
//! ```

pub mod dispatch;
pub mod errors;
pub mod format;
pub mod multiselect;
pub mod outside;
pub mod path;
pub mod render;
pub mod schema;
pub mod session;
pub mod store;
pub mod submit;
pub mod validation;
pub mod value;

pub use dispatch::{DispatchError, DispatchReceipt, Dispatcher, HttpDispatcher};
pub use errors::{IntakeError, Result};
pub use multiselect::{MultiSelectDisplay, OpenControlRegistry};
pub use outside::{Area, FormBoundary, OutsideClickCoordinator, OutsideClickGuard, PointerBus, PointerDown, Priority};
pub use path::FieldPath;
pub use render::{LiveForm, VisibleField, render_visible};
pub use schema::{Condition, FieldKind, FieldNode, FieldOption, FormSchema, SchemaIssue};
pub use session::FormSession;
pub use store::{FieldConstraints, FormStore};
pub use submit::{StatusKind, StatusMessage, SubmissionPipeline, SubmissionStatus, SubmitOutcome};
pub use value::FieldValue;
