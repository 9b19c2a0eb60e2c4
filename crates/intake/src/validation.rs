//! Advisory presence checks.
//!
//! Only visible fields are checked: a required field inside a collapsed
//! branch cannot be filled in, so it never blocks anything.

use crate::path::FieldPath;
use crate::render::render_visible;
use crate::schema::{FieldKind, FormSchema};
use crate::store::FormStore;

/// Visible required fields whose value is empty, in document order.
pub fn missing_required(schema: &FormSchema, store: &FormStore) -> Vec<FieldPath> {
    render_visible(&schema.fields, store)
        .into_iter()
        .filter(|f| f.node.required && f.node.kind != FieldKind::Section)
        .filter(|f| store.read(&f.path).is_empty())
        .map(|f| f.path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldNode;
    use crate::value::FieldValue;

    #[test]
    fn hidden_required_fields_are_not_reported() {
        let schema = FormSchema::new(
            "t",
            vec![
                FieldNode::new("name", "Name", FieldKind::Text).required(true),
                FieldNode::new("hasInsurance", "Insured?", FieldKind::Checkbox).child(
                    FieldNode::new("insurerName", "Insurer", FieldKind::Text).required(true),
                ),
            ],
        );
        let mut store = FormStore::new();
        assert_eq!(missing_required(&schema, &store), vec![FieldPath::root("name")]);

        store.write(&FieldPath::root("name"), FieldValue::text("Ada"));
        store.write(&FieldPath::root("hasInsurance"), FieldValue::Bool(true));
        assert_eq!(
            missing_required(&schema, &store),
            vec![FieldPath::parse("hasInsurance.insurerName").unwrap()]
        );
    }
}
