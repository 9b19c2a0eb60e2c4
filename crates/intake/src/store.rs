//! Path-keyed form state.
//!
//! The store is a flat map from [`FieldPath`] to [`FieldValue`]. Each entry
//! owns a `tokio::sync::watch` sender, so a `write` is visible to every
//! receiver before the call returns and the renderer can subscribe to the
//! exact paths it depends on.
//!
//! [`FormStore::snapshot`] rebuilds the nested object the dispatcher expects
//! by splitting paths on `.`. A path that holds a value and also has
//! descendants (a checkbox with nested fields) keeps its own value under
//! [`SELF_KEY`] inside its object, which keeps [`flatten`] an exact inverse.

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};
use tokio::sync::watch;

use crate::path::FieldPath;
use crate::schema::FieldKind;
use crate::value::FieldValue;

/// Key of a container's own value inside the snapshot object.
pub const SELF_KEY: &str = "@value";

/// Declared shape of a registered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldConstraints {
    pub kind: Option<FieldKind>,
    pub required: bool,
}

impl FieldConstraints {
    pub fn new(kind: FieldKind, required: bool) -> Self {
        Self {
            kind: Some(kind),
            required,
        }
    }
}

#[derive(Debug)]
struct Slot {
    tx: watch::Sender<FieldValue>,
    constraints: Option<FieldConstraints>,
    /// Registered or written; only present slots appear in snapshots.
    present: bool,
    written: bool,
}

impl Slot {
    fn new(initial: FieldValue) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx,
            constraints: None,
            present: false,
            written: false,
        }
    }

    fn kind(&self) -> Option<FieldKind> {
        self.constraints.and_then(|c| c.kind)
    }
}

#[derive(Debug, Default)]
pub struct FormStore {
    slots: BTreeMap<FieldPath, Slot>,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. Registering the same path again is a no-op.
    pub fn register(&mut self, path: FieldPath, constraints: FieldConstraints) {
        let slot = self
            .slots
            .entry(path)
            .or_insert_with(|| Slot::new(FieldValue::empty_for(constraints.kind)));
        if slot.constraints.is_none() {
            slot.constraints = Some(constraints);
        }
        slot.present = true;
        if !slot.written {
            let empty = FieldValue::empty_for(slot.kind());
            slot.tx.send_if_modified(|current| {
                if *current != empty {
                    *current = empty;
                    true
                } else {
                    false
                }
            });
        }
    }

    /// Current value, or the kind's empty value when nothing was written.
    pub fn read(&self, path: &FieldPath) -> FieldValue {
        match self.slots.get(path) {
            Some(slot) => slot.tx.borrow().clone(),
            None => FieldValue::empty_for(None),
        }
    }

    /// Replace the value at `path` and notify its watchers.
    ///
    /// Non-finite numbers are stored as text so the snapshot can carry them.
    pub fn write(&mut self, path: &FieldPath, value: FieldValue) {
        let value = value.normalized();
        let slot = self
            .slots
            .entry(path.clone())
            .or_insert_with(|| Slot::new(FieldValue::empty_for(None)));
        slot.present = true;
        slot.written = true;
        slot.tx.send_replace(value);
        tracing::trace!(%path, "field written");
    }

    /// Live view of one path. Watching does not make the path appear in snapshots.
    pub fn watch(&mut self, path: &FieldPath) -> watch::Receiver<FieldValue> {
        self.slots
            .entry(path.clone())
            .or_insert_with(|| Slot::new(FieldValue::empty_for(None)))
            .tx
            .subscribe()
    }

    pub fn constraints(&self, path: &FieldPath) -> Option<FieldConstraints> {
        self.slots.get(path).and_then(|s| s.constraints)
    }

    pub fn is_registered(&self, path: &FieldPath) -> bool {
        self.constraints(path).is_some()
    }

    /// Every present entry, keyed by path.
    pub fn entries(&self) -> BTreeMap<FieldPath, FieldValue> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.present)
            .map(|(path, slot)| (path.clone(), slot.tx.borrow().clone()))
            .collect()
    }

    /// Nested object of every present entry.
    pub fn snapshot(&self) -> JsonValue {
        let mut root = Map::new();
        for (path, slot) in self.slots.iter().filter(|(_, s)| s.present) {
            let segments: Vec<&str> = path.segments().collect();
            insert_nested(&mut root, &segments, slot.tx.borrow().to_json());
        }
        JsonValue::Object(root)
    }

    /// Drop all written values. Registrations survive; watchers see the empty value.
    pub fn reset(&mut self) {
        for slot in self.slots.values_mut() {
            slot.written = false;
            slot.present = slot.constraints.is_some();
            slot.tx.send_replace(FieldValue::empty_for(slot.kind()));
        }
        tracing::debug!("form state reset");
    }
}

fn insert_nested(map: &mut Map<String, JsonValue>, segments: &[&str], value: JsonValue) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        match map.get_mut(*head) {
            Some(JsonValue::Object(existing)) => {
                existing.insert(SELF_KEY.to_string(), value);
            }
            _ => {
                map.insert(head.to_string(), value);
            }
        }
        return;
    }
    let entry = map
        .entry(head.to_string())
        .or_insert_with(|| JsonValue::Object(Map::new()));
    if !entry.is_object() {
        let own = entry.take();
        let mut wrapped = Map::new();
        wrapped.insert(SELF_KEY.to_string(), own);
        *entry = JsonValue::Object(wrapped);
    }
    if let JsonValue::Object(child) = entry {
        insert_nested(child, rest, value);
    }
}

/// Inverse of [`FormStore::snapshot`]: split a nested object back into paths.
pub fn flatten(snapshot: &JsonValue) -> BTreeMap<FieldPath, FieldValue> {
    fn walk(
        map: &Map<String, JsonValue>,
        prefix: Option<&FieldPath>,
        out: &mut BTreeMap<FieldPath, FieldValue>,
    ) {
        for (key, value) in map {
            if key == SELF_KEY {
                if let (Some(own), Some(v)) = (prefix, FieldValue::from_json(value)) {
                    out.insert(own.clone(), v);
                }
                continue;
            }
            let path = FieldPath::compose(prefix, key);
            match value {
                JsonValue::Object(child) => walk(child, Some(&path), out),
                leaf => {
                    if let Some(v) = FieldValue::from_json(leaf) {
                        out.insert(path, v);
                    }
                }
            }
        }
    }

    let mut out = BTreeMap::new();
    if let JsonValue::Object(map) = snapshot {
        walk(map, None, &mut out);
    }
    out
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_path() -> impl Strategy<Value = FieldPath> {
        prop::collection::vec("[a-c]{1,2}", 1..=3).prop_map(|segments| {
            FieldPath::parse(&segments.join(".")).unwrap()
        })
    }

    fn arb_value() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            Just(FieldValue::Unset),
            ".{0,8}".prop_map(FieldValue::Text),
            any::<f64>().prop_map(FieldValue::Number),
            (-1_000_000i64..1_000_000).prop_map(|n| FieldValue::Number(n as f64)),
            any::<bool>().prop_map(FieldValue::Bool),
            prop::collection::vec("[a-z]{1,4}", 0..3).prop_map(FieldValue::List),
        ]
    }

    fn arb_kind() -> impl Strategy<Value = FieldKind> {
        prop_oneof![
            Just(FieldKind::Text),
            Just(FieldKind::Checkbox),
            Just(FieldKind::Multiselect),
            Just(FieldKind::Number),
        ]
    }

    proptest! {
        #[test]
        fn snapshot_flattens_back_to_entries(
            registrations in prop::collection::vec((arb_path(), arb_kind(), any::<bool>()), 0..4),
            writes in prop::collection::vec((arb_path(), arb_value()), 0..12),
        ) {
            let mut store = FormStore::new();
            for (path, kind, required) in registrations {
                store.register(path, FieldConstraints::new(kind, required));
            }
            for (path, value) in &writes {
                store.write(path, value.clone());
            }
            prop_assert_eq!(flatten(&store.snapshot()), store.entries());
        }

        #[test]
        fn written_numbers_read_back_or_become_text(n in any::<f64>()) {
            let mut store = FormStore::new();
            let path = FieldPath::root("budget");
            store.write(&path, FieldValue::Number(n));
            let expected = if n.is_finite() {
                FieldValue::Number(n)
            } else {
                FieldValue::Text(n.to_string())
            };
            prop_assert_eq!(store.read(&path), expected);
        }
    }
}
