use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::dispatch::Dispatcher;
use crate::errors::Result;
use crate::multiselect::{self, MultiSelectDisplay, OpenControlRegistry};
use crate::outside::{FormBoundary, OutsideClickCoordinator, OutsideClickGuard, PointerBus, PointerDown};
use crate::path::FieldPath;
use crate::render::{LiveForm, VisibleField};
use crate::schema::{FieldKind, FormSchema, SchemaIssue};
use crate::store::{FieldConstraints, FormStore};
use crate::submit::{StatusMessage, SubmissionPipeline, SubmissionStatus, SubmitOutcome};
use crate::validation;
use crate::value::FieldValue;

/// One mounted form: schema, state, open controls and submission, owned together.
#[derive(Debug)]
pub struct FormSession {
    schema: Arc<FormSchema>,
    store: FormStore,
    live: LiveForm,
    registry: OpenControlRegistry,
    bus: PointerBus,
    boundary: FormBoundary,
    pipeline: SubmissionPipeline,
    issues: Vec<SchemaIssue>,
    _outside: OutsideClickGuard,
}

impl FormSession {
    pub fn mount(schema: FormSchema, dispatcher: Arc<dyn Dispatcher>) -> Result<Self> {
        Self::mount_with_bus(schema, dispatcher, PointerBus::new())
    }

    /// Mount on a host-provided pointer bus.
    pub fn mount_with_bus(
        schema: FormSchema,
        dispatcher: Arc<dyn Dispatcher>,
        bus: PointerBus,
    ) -> Result<Self> {
        let registry = OpenControlRegistry::new();
        let boundary = FormBoundary::new();
        let outside = OutsideClickCoordinator::mount(&bus, registry.clone(), boundary.clone());

        schema.check_ids()?;
        let issues = schema.lint();
        for issue in &issues {
            tracing::warn!(form = %schema.title, "{issue}");
        }

        let schema = Arc::new(schema);
        let mut store = FormStore::new();
        let live = LiveForm::mount(Arc::clone(&schema), &mut store);
        register_visible(&live, &mut store, &registry);
        tracing::info!(form = %schema.title, fields = live.fields().len(), "form mounted");

        Ok(Self {
            schema,
            store,
            live,
            registry,
            bus,
            boundary,
            pipeline: SubmissionPipeline::new(dispatcher),
            issues,
            _outside: outside,
        })
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn issues(&self) -> &[SchemaIssue] {
        &self.issues
    }

    pub fn store(&self) -> &FormStore {
        &self.store
    }

    pub fn visible_fields(&self) -> Vec<VisibleField<'_>> {
        self.live.fields()
    }

    pub fn read(&self, path: &FieldPath) -> FieldValue {
        self.store.read(path)
    }

    /// Write a value and re-render whatever depends on it.
    /// Returns the containers that were re-rendered.
    pub fn write(&mut self, path: &FieldPath, value: FieldValue) -> Vec<FieldPath> {
        self.store.write(path, value);
        self.sync()
    }

    fn sync(&mut self) -> Vec<FieldPath> {
        let rerendered = self.live.refresh(&mut self.store);
        if !rerendered.is_empty() {
            register_visible(&self.live, &mut self.store, &self.registry);
        }
        rerendered
    }

    /// Start over on the same schema: values are dropped, open controls close,
    /// and the visible tree falls back to its initial shape.
    pub fn reset(&mut self) -> Vec<FieldPath> {
        self.store.reset();
        self.registry.close_all();
        self.sync()
    }

    pub fn toggle_open(&self, path: &FieldPath) -> bool {
        self.registry.toggle_open(path)
    }

    pub fn close(&self, path: &FieldPath) {
        self.registry.close(path);
    }

    pub fn is_open(&self, path: &FieldPath) -> bool {
        self.registry.is_open(path)
    }

    pub fn toggle_option(&mut self, path: &FieldPath, value: &str) -> FieldValue {
        let next = multiselect::toggle_value(&mut self.store, path, value);
        self.sync();
        next
    }

    pub fn multiselect_display(&self, path: &FieldPath) -> Option<MultiSelectDisplay> {
        let node = self.schema.field_at(path)?;
        (node.kind == FieldKind::Multiselect).then(|| {
            MultiSelectDisplay::for_field(node, self.store.read(path).as_list(), self.is_open(path))
        })
    }

    pub fn boundary(&self) -> &FormBoundary {
        &self.boundary
    }

    /// Feed a pointer-down into the session's bus.
    pub fn pointer_down(&self, column: u16, row: u16) {
        self.bus.dispatch(&PointerDown::new(column, row));
    }

    pub fn snapshot(&self) -> JsonValue {
        self.store.snapshot()
    }

    pub fn missing_required(&self) -> Vec<FieldPath> {
        validation::missing_required(&self.schema, &self.store)
    }

    pub fn pipeline(&self) -> &SubmissionPipeline {
        &self.pipeline
    }

    /// Start a submission and return the snapshot to dispatch, or `None` if
    /// one is already in flight. Used by hosts that run the dispatch elsewhere.
    pub fn begin_submit(&self) -> Option<JsonValue> {
        self.pipeline.try_begin().then(|| self.store.snapshot())
    }

    pub async fn submit(&self) -> SubmitOutcome {
        self.pipeline.submit(&self.store).await
    }

    pub fn status(&self) -> SubmissionStatus {
        self.pipeline.status()
    }

    pub fn message(&self) -> Option<StatusMessage> {
        self.pipeline.message()
    }
}

fn register_visible(live: &LiveForm, store: &mut FormStore, registry: &OpenControlRegistry) {
    for field in live.fields() {
        if field.node.kind == FieldKind::Section || store.is_registered(&field.path) {
            continue;
        }
        store.register(
            field.path.clone(),
            FieldConstraints::new(field.node.kind, field.node.required),
        );
        if field.node.kind == FieldKind::Multiselect {
            registry.register(field.path);
        }
    }
}
