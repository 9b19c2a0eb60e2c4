//! Form schema definition.
//!
//! The field tree is a closed set of variants selected by [`FieldKind`]
//! rather than a type per widget. Every operation on it (render, lint,
//! validate) is a single `match` over the kind, so adding a kind is checked
//! for exhaustiveness by the compiler.
//!
//! Schemas are plain JSON documents:
//! ```json
//! {
//!   "title": "Service Request",
//!   "fields": [
//!     { "id": "hasInsurance", "label": "Insured?", "type": "checkbox",
//!       "fields": [ { "id": "insurerName", "label": "Insurer", "type": "text" } ] },
//!     { "id": "urgency", "label": "Urgency", "type": "select",
//!       "options": [ { "value": "routine", "label": "Routine" },
//!                    { "value": "emergency", "label": "Emergency" } ],
//!       "fields": [ { "id": "dispatchTime", "label": "Dispatch time", "type": "date",
//!                     "condition": { "value": "emergency" } } ] }
//!   ]
//! }
//! ```
//!
//! Author mistakes (duplicate sibling ids, dangling triggers) are not fatal:
//! the renderer shows nothing for an unresolvable branch and [`FormSchema::lint`]
//! reports them.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::errors::{IntakeError, Result};
use crate::path::{FieldPath, validate_segment};

/// Supported field kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Number,
    Textarea,
    Select,
    Multiselect,
    Checkbox,
    Date,
    Section,
}

impl FieldKind {
    /// Kinds edited through a single-line or multi-line text editor.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Email
                | FieldKind::Tel
                | FieldKind::Number
                | FieldKind::Textarea
                | FieldKind::Date
        )
    }

    /// Kinds that read their `options`.
    pub fn has_options(self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Multiselect)
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Activation condition of a `select` child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub value: String,
}

/// Declarative description of one field (and its subtree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, rename = "fields", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldNode>,
}

impl FieldNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            options: Vec::new(),
            required: false,
            placeholder: None,
            condition: None,
            children: Vec::new(),
        }
    }

    pub fn options(mut self, options: impl IntoIterator<Item = FieldOption>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Bind this node to a parent select's option value.
    pub fn when(mut self, trigger: impl Into<String>) -> Self {
        self.condition = Some(Condition {
            value: trigger.into(),
        });
        self
    }

    pub fn child(mut self, child: FieldNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(&self) -> &[FieldNode] {
        &self.children
    }

    /// `section` always; `checkbox` / `select` only when they declare children.
    pub fn is_container(&self) -> bool {
        match self.kind {
            FieldKind::Section => true,
            FieldKind::Checkbox | FieldKind::Select => !self.children.is_empty(),
            _ => false,
        }
    }

    /// Trigger value this node declares as a select child.
    pub fn trigger(&self) -> Option<&str> {
        self.condition.as_ref().map(|c| c.value.as_str())
    }

    pub fn option_label(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }
}

/// Declarative schema for a whole form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldNode>,
}

/// Author mistakes found by [`FormSchema::lint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    DuplicateId { path: FieldPath },
    InvalidId { parent: Option<FieldPath>, id: String, reason: &'static str },
    MissingTrigger { path: FieldPath },
    DanglingTrigger { path: FieldPath, trigger: String },
    IgnoredOptions { path: FieldPath, kind: FieldKind },
    IgnoredChildren { path: FieldPath, kind: FieldKind },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::DuplicateId { path } => {
                write!(f, "{path}: id is used more than once among its siblings")
            }
            SchemaIssue::InvalidId { parent, id, reason } => match parent {
                Some(parent) => write!(f, "{parent}: child id {id:?} is invalid ({reason})"),
                None => write!(f, "top-level id {id:?} is invalid ({reason})"),
            },
            SchemaIssue::MissingTrigger { path } => {
                write!(f, "{path}: select child has no condition and will never be shown")
            }
            SchemaIssue::DanglingTrigger { path, trigger } => {
                write!(f, "{path}: trigger {trigger:?} matches no option of its select")
            }
            SchemaIssue::IgnoredOptions { path, kind } => {
                write!(f, "{path}: options are ignored for kind {kind}")
            }
            SchemaIssue::IgnoredChildren { path, kind } => {
                write!(f, "{path}: nested fields are ignored for kind {kind}")
            }
        }
    }
}

impl FormSchema {
    pub fn new(title: impl Into<String>, fields: Vec<FieldNode>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Fail fast on ids that cannot be composed into unambiguous paths.
    pub fn check_ids(&self) -> Result<()> {
        fn walk(nodes: &[FieldNode], parent: Option<&FieldPath>) -> Result<()> {
            for node in nodes {
                if let Err(reason) = validate_segment(&node.id) {
                    return Err(IntakeError::InvalidFieldId {
                        parent: parent.map(|p| p.to_string()).unwrap_or_default(),
                        id: node.id.clone(),
                        reason,
                    });
                }
                let path = FieldPath::compose(parent, &node.id);
                walk(&node.children, Some(&path))?;
            }
            Ok(())
        }
        walk(&self.fields, None)
    }

    /// Collect author mistakes. Never fails; callers decide how loud to be.
    pub fn lint(&self) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();
        lint_siblings(&self.fields, None, &mut issues);
        issues
    }

    /// Resolve a path back to its schema node.
    pub fn field_at(&self, path: &FieldPath) -> Option<&FieldNode> {
        let mut nodes = &self.fields;
        let mut found = None;
        for segment in path.segments() {
            let node = nodes.iter().find(|n| n.id == segment)?;
            nodes = &node.children;
            found = Some(node);
        }
        found
    }
}

fn lint_siblings(nodes: &[FieldNode], parent: Option<&FieldPath>, issues: &mut Vec<SchemaIssue>) {
    let mut seen = HashSet::new();
    for node in nodes {
        if let Err(reason) = validate_segment(&node.id) {
            issues.push(SchemaIssue::InvalidId {
                parent: parent.cloned(),
                id: node.id.clone(),
                reason,
            });
            continue;
        }
        let path = FieldPath::compose(parent, &node.id);
        if !seen.insert(node.id.as_str()) {
            issues.push(SchemaIssue::DuplicateId { path: path.clone() });
        }
        if !node.options.is_empty() && !node.kind.has_options() {
            issues.push(SchemaIssue::IgnoredOptions {
                path: path.clone(),
                kind: node.kind,
            });
        }
        match node.kind {
            FieldKind::Section | FieldKind::Checkbox => {}
            FieldKind::Select => {
                for child in &node.children {
                    let child_path = path.child(&child.id);
                    match child.trigger() {
                        None => issues.push(SchemaIssue::MissingTrigger { path: child_path }),
                        Some(trigger) if node.option_label(trigger).is_none() => {
                            issues.push(SchemaIssue::DanglingTrigger {
                                path: child_path,
                                trigger: trigger.to_string(),
                            })
                        }
                        Some(_) => {}
                    }
                }
            }
            kind => {
                if !node.children.is_empty() {
                    issues.push(SchemaIssue::IgnoredChildren {
                        path: path.clone(),
                        kind,
                    });
                }
            }
        }
        lint_siblings(&node.children, Some(&path), issues);
    }
}
