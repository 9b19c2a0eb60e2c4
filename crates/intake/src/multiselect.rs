//! Multi-select controls.
//!
//! Open/closed state lives in an [`OpenControlRegistry`], separate from the
//! form values: it is UI state and never reaches a snapshot. The registry is
//! shared with the outside-click listener, so it is cheap to clone and
//! internally synchronized.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::path::FieldPath;
use crate::schema::FieldNode;
use crate::store::FormStore;
use crate::value::FieldValue;

pub const PLACEHOLDER: &str = "Select options";

#[derive(Debug, Clone, Default)]
pub struct OpenControlRegistry {
    inner: Arc<Mutex<BTreeMap<FieldPath, bool>>>,
}

impl OpenControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<FieldPath, bool>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a control as closed. Leaves an existing entry untouched.
    pub fn register(&self, path: FieldPath) {
        self.lock().entry(path).or_insert(false);
    }

    /// Flip one control. Returns the new state.
    pub fn toggle_open(&self, path: &FieldPath) -> bool {
        let mut map = self.lock();
        let entry = map.entry(path.clone()).or_insert(false);
        *entry = !*entry;
        tracing::debug!(%path, open = *entry, "multiselect toggled");
        *entry
    }

    pub fn close(&self, path: &FieldPath) {
        if let Some(open) = self.lock().get_mut(path) {
            *open = false;
        }
    }

    /// Close every open control and return the paths that were open.
    pub fn close_all(&self) -> Vec<FieldPath> {
        let mut closed = Vec::new();
        for (path, open) in self.lock().iter_mut() {
            if *open {
                *open = false;
                closed.push(path.clone());
            }
        }
        closed
    }

    pub fn is_open(&self, path: &FieldPath) -> bool {
        self.lock().get(path).copied().unwrap_or(false)
    }
}

/// Add `value` to the selection, or remove it if already selected.
/// The order of the remaining items is preserved.
pub fn toggle_value(store: &mut FormStore, path: &FieldPath, value: &str) -> FieldValue {
    let mut selected = store.read(path).as_list().to_vec();
    match selected.iter().position(|s| s == value) {
        Some(idx) => {
            selected.remove(idx);
        }
        None => selected.push(value.to_string()),
    }
    let next = FieldValue::List(selected);
    store.write(path, next.clone());
    next
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRow {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

/// What a multi-select shows in its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiSelectDisplay {
    Closed { summary: String, is_placeholder: bool },
    Open { summary: String, options: Vec<OptionRow> },
}

impl MultiSelectDisplay {
    pub fn for_field(node: &FieldNode, selected: &[String], open: bool) -> Self {
        let summary = summary(selected.len());
        if !open {
            return MultiSelectDisplay::Closed {
                is_placeholder: selected.is_empty(),
                summary,
            };
        }
        let options = node
            .options
            .iter()
            .map(|o| OptionRow {
                value: o.value.clone(),
                label: o.label.clone(),
                checked: selected.contains(&o.value),
            })
            .collect();
        MultiSelectDisplay::Open { summary, options }
    }

    pub fn summary(&self) -> &str {
        match self {
            MultiSelectDisplay::Closed { summary, .. } | MultiSelectDisplay::Open { summary, .. } => {
                summary
            }
        }
    }
}

fn summary(count: usize) -> String {
    if count == 0 {
        PLACEHOLDER.to_string()
    } else {
        format!("{count} selected")
    }
}
