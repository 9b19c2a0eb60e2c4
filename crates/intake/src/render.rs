//! Conditional renderer.
//!
//! [`render_visible`] is the pure form: given the schema and the current
//! store it returns the visible fields in document order. [`LiveForm`] keeps a
//! materialized tree instead, with a watch receiver on every conditional
//! container, so a write only rebuilds the subtree under the field that
//! changed.

use std::sync::Arc;

use tokio::sync::watch;

use crate::path::FieldPath;
use crate::schema::{FieldKind, FieldNode, FormSchema};
use crate::store::FormStore;
use crate::value::FieldValue;

/// One visible field bound to its path.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleField<'a> {
    pub path: FieldPath,
    pub depth: usize,
    pub node: &'a FieldNode,
}

/// Indices of the children shown beneath `node` for the given value.
fn active_children(node: &FieldNode, value: &FieldValue) -> Vec<usize> {
    match node.kind {
        FieldKind::Section => (0..node.children.len()).collect(),
        FieldKind::Checkbox if value.is_truthy() => (0..node.children.len()).collect(),
        FieldKind::Select => {
            let selected = value.as_text();
            node.children
                .iter()
                .position(|child| child.trigger() == Some(selected.as_str()))
                .into_iter()
                .collect()
        }
        _ => Vec::new(),
    }
}

fn is_conditional(node: &FieldNode) -> bool {
    matches!(node.kind, FieldKind::Checkbox | FieldKind::Select) && !node.children.is_empty()
}

/// Visible fields of `fields` for the current store contents.
pub fn render_visible<'a>(fields: &'a [FieldNode], store: &FormStore) -> Vec<VisibleField<'a>> {
    fn walk<'a>(
        nodes: &'a [FieldNode],
        prefix: Option<&FieldPath>,
        depth: usize,
        store: &FormStore,
        out: &mut Vec<VisibleField<'a>>,
    ) {
        for node in nodes {
            let path = FieldPath::compose(prefix, &node.id);
            let active = if node.is_container() {
                active_children(node, &store.read(&path))
            } else {
                Vec::new()
            };
            out.push(VisibleField {
                path: path.clone(),
                depth,
                node,
            });
            for idx in active {
                walk(
                    std::slice::from_ref(&node.children[idx]),
                    Some(&path),
                    depth + 1,
                    store,
                    out,
                );
            }
        }
    }

    let mut out = Vec::new();
    walk(fields, None, 0, store, &mut out);
    out
}

#[derive(Debug)]
struct RenderedNode {
    index: usize,
    path: FieldPath,
    watcher: Option<watch::Receiver<FieldValue>>,
    active: Vec<usize>,
    children: Vec<RenderedNode>,
}

/// Materialized render tree, refreshed per changed container.
#[derive(Debug)]
pub struct LiveForm {
    schema: Arc<FormSchema>,
    roots: Vec<RenderedNode>,
}

impl LiveForm {
    pub fn mount(schema: Arc<FormSchema>, store: &mut FormStore) -> Self {
        let roots = (0..schema.fields.len())
            .map(|idx| build(&schema.fields, idx, None, store))
            .collect();
        Self { schema, roots }
    }

    /// Re-render the containers whose watched value changed since the last
    /// refresh. Returns their paths in document order.
    pub fn refresh(&mut self, store: &mut FormStore) -> Vec<FieldPath> {
        let schema = Arc::clone(&self.schema);
        let mut rerendered = Vec::new();
        refresh_nodes(&schema.fields, &mut self.roots, store, &mut rerendered);
        if !rerendered.is_empty() {
            tracing::debug!(count = rerendered.len(), "re-rendered conditional subtrees");
        }
        rerendered
    }

    /// Visible fields in document order.
    pub fn fields(&self) -> Vec<VisibleField<'_>> {
        fn walk<'a>(
            nodes: &'a [FieldNode],
            rendered: &[RenderedNode],
            depth: usize,
            out: &mut Vec<VisibleField<'a>>,
        ) {
            for r in rendered {
                let node = &nodes[r.index];
                out.push(VisibleField {
                    path: r.path.clone(),
                    depth,
                    node,
                });
                walk(&node.children, &r.children, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.schema.fields, &self.roots, 0, &mut out);
        out
    }
}

fn build(
    siblings: &[FieldNode],
    index: usize,
    prefix: Option<&FieldPath>,
    store: &mut FormStore,
) -> RenderedNode {
    let node = &siblings[index];
    let path = FieldPath::compose(prefix, &node.id);
    let watcher = is_conditional(node).then(|| store.watch(&path));
    let active = if node.is_container() {
        active_children(node, &store.read(&path))
    } else {
        Vec::new()
    };
    let children = active
        .iter()
        .map(|&idx| build(&node.children, idx, Some(&path), store))
        .collect();
    RenderedNode {
        index,
        path,
        watcher,
        active,
        children,
    }
}

fn refresh_nodes(
    siblings: &[FieldNode],
    rendered: &mut [RenderedNode],
    store: &mut FormStore,
    out: &mut Vec<FieldPath>,
) {
    for r in rendered.iter_mut() {
        let node = &siblings[r.index];
        let changed = r
            .watcher
            .as_mut()
            .map(|rx| rx.has_changed().unwrap_or(false))
            .unwrap_or(false);
        if changed {
            let value = match r.watcher.as_mut() {
                Some(rx) => rx.borrow_and_update().clone(),
                None => store.read(&r.path),
            };
            let active = active_children(node, &value);
            if active != r.active {
                r.children = active
                    .iter()
                    .map(|&idx| build(&node.children, idx, Some(&r.path), store))
                    .collect();
                r.active = active;
                out.push(r.path.clone());
                continue;
            }
        }
        refresh_nodes(&node.children, &mut r.children, store, out);
    }
}
