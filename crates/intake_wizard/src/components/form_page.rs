//! Interactive form page (logic and state; drawing lives in `form_view.rs`).
//!
//! The page owns a mounted [`FormSession`] and translates terminal input into
//! engine operations:
//! - focus moves over the visible, non-section fields plus the submit button
//! - text-like fields are edited through a `tui_input::Input`
//! - checkboxes toggle, selects cycle (including the empty choice)
//! - multiselects open into an option list with its own cursor
//! - every left click goes to the session's pointer bus first
//!
//! Submissions are started here and run on a spawned task. Completion comes
//! back as [`Action::SubmissionFinished`].

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use intake::{FieldKind, FieldNode, FieldPath, FieldValue, FormSession};
use tokio::sync::mpsc::UnboundedSender;
use tui_input::{Input, backend::crossterm::EventHandler};

use crate::{
    action::Action,
    components::{Component, form_view},
    tui::{EventResponse, Frame},
};

/// Something that can hold focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Focusable {
    Field(FieldPath),
    Submit,
}

/// What a clicked screen row refers to, recorded while drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTarget {
    Focus(usize),
    Option { focus: usize, option: usize },
}

pub struct FormPage {
    session: FormSession,
    focused: usize,
    editing: bool,
    input: Input,
    option_cursor: usize,
    scroll: usize,
    show_missing: bool,
    spinner: usize,
    rows: Vec<(u16, RowTarget)>,
    action_tx: Option<UnboundedSender<Action>>,
}

impl FormPage {
    pub fn new(session: FormSession) -> Self {
        Self {
            session,
            focused: 0,
            editing: false,
            input: Input::default(),
            option_cursor: 0,
            scroll: 0,
            show_missing: false,
            spinner: 0,
            rows: Vec::new(),
            action_tx: None,
        }
    }

    // --- Accessors used by the renderer --------------------------------------------------------

    pub(super) fn session(&self) -> &FormSession {
        &self.session
    }

    pub(super) fn focused_index(&self) -> usize {
        self.focused
    }

    pub(super) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(super) fn input(&self) -> &Input {
        &self.input
    }

    pub(super) fn option_cursor(&self) -> usize {
        self.option_cursor
    }

    pub(super) fn show_missing(&self) -> bool {
        self.show_missing
    }

    pub(super) fn spinner(&self) -> usize {
        self.spinner
    }

    pub(super) fn scroll(&self) -> usize {
        self.scroll
    }

    pub(super) fn set_scroll(&mut self, scroll: usize) {
        self.scroll = scroll;
    }

    pub(super) fn set_rows(&mut self, rows: Vec<(u16, RowTarget)>) {
        self.rows = rows;
    }

    /// Focus order: visible non-section fields, then the submit button.
    pub fn focusables(&self) -> Vec<Focusable> {
        self.session
            .visible_fields()
            .into_iter()
            .filter(|f| f.node.kind != FieldKind::Section)
            .map(|f| Focusable::Field(f.path))
            .chain(std::iter::once(Focusable::Submit))
            .collect()
    }

    pub fn focused(&self) -> Focusable {
        let items = self.focusables();
        items
            .get(self.focused)
            .cloned()
            .unwrap_or(Focusable::Submit)
    }

    fn focused_field(&self) -> Option<(FieldPath, FieldNode)> {
        match self.focused() {
            Focusable::Field(path) => {
                let node = self.session.schema().field_at(&path)?.clone();
                Some((path, node))
            }
            Focusable::Submit => None,
        }
    }

    // --- Navigation ----------------------------------------------------------------------------

    fn clamp_focus(&mut self) {
        let count = self.focusables().len();
        if self.focused >= count {
            self.focused = count.saturating_sub(1);
        }
    }

    fn leave_focused(&mut self) {
        if let Focusable::Field(path) = self.focused() {
            self.session.close(&path);
        }
        self.option_cursor = 0;
    }

    fn focus_next(&mut self) {
        self.leave_focused();
        let count = self.focusables().len();
        self.focused = (self.focused + 1) % count.max(1);
    }

    fn focus_prev(&mut self) {
        self.leave_focused();
        let count = self.focusables().len().max(1);
        self.focused = if self.focused == 0 {
            count - 1
        } else {
            self.focused - 1
        };
    }

    pub fn focus_index(&mut self, index: usize) {
        if index != self.focused {
            self.leave_focused();
            self.focused = index;
            self.clamp_focus();
        }
    }

    // --- Mutations -----------------------------------------------------------------------------

    fn write(&mut self, path: &FieldPath, value: FieldValue) {
        self.session.write(path, value);
        self.clamp_focus();
    }

    fn toggle_checkbox(&mut self, path: &FieldPath) {
        let next = !self.session.read(path).is_truthy();
        self.write(path, FieldValue::Bool(next));
    }

    fn cycle_select(&mut self, path: &FieldPath, node: &FieldNode, dir: i32) {
        // Position 0 is the empty "Select an option" choice.
        let mut choices = vec![String::new()];
        choices.extend(node.options.iter().map(|o| o.value.clone()));
        let current = self.session.read(path).as_text();
        let idx = choices.iter().position(|c| *c == current).unwrap_or(0) as i32;
        let next = (idx + dir).rem_euclid(choices.len() as i32) as usize;
        self.write(path, FieldValue::Text(choices[next].clone()));
    }

    fn toggle_option_at_cursor(&mut self, path: &FieldPath, node: &FieldNode) {
        if let Some(option) = node.options.get(self.option_cursor) {
            let value = option.value.clone();
            self.session.toggle_option(path, &value);
            self.clamp_focus();
        }
    }

    fn start_editing(&mut self, path: &FieldPath) {
        let current = match self.session.read(path) {
            FieldValue::Unset => String::new(),
            other => other.as_text(),
        };
        self.input = Input::default().with_value(current);
        self.editing = true;
    }

    fn cancel_editing(&mut self) {
        self.editing = false;
        self.input = Input::default();
    }

    fn commit_editing(&mut self) {
        if let Some((path, node)) = self.focused_field() {
            let raw = self.input.value().to_string();
            let value = parse_input(node.kind, raw);
            self.write(&path, value);
        }
        self.cancel_editing();
    }

    fn clear_form(&mut self) {
        self.session.reset();
        self.option_cursor = 0;
        self.show_missing = false;
        self.focus_index(0);
        tracing::info!("form cleared");
    }

    // --- Submission ----------------------------------------------------------------------------

    fn submit(&mut self) -> Option<Action> {
        self.show_missing = true;
        let missing = self.session.missing_required();
        if !missing.is_empty() {
            tracing::info!(missing = missing.len(), "submitting with empty required fields");
        }
        let snapshot = self.session.begin_submit()?;
        let pipeline = self.session.pipeline().clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            pipeline.dispatch(snapshot).await;
            if let Some(tx) = tx {
                let _ = tx.send(Action::SubmissionFinished);
            }
        });
        Some(Action::Update)
    }

    // --- Key handling --------------------------------------------------------------------------

    fn handle_editing_key(&mut self, key: KeyEvent) -> EventResponse<Action> {
        match key.code {
            KeyCode::Enter => self.commit_editing(),
            KeyCode::Esc => self.cancel_editing(),
            _ => {
                self.input.handle_event(&crossterm::event::Event::Key(key));
            }
        }
        EventResponse::Stop(Action::Update)
    }

    fn handle_open_multiselect_key(
        &mut self,
        key: KeyEvent,
        path: &FieldPath,
        node: &FieldNode,
    ) -> Option<EventResponse<Action>> {
        let last = node.options.len().saturating_sub(1);
        match key.code {
            KeyCode::Up => self.option_cursor = self.option_cursor.saturating_sub(1),
            KeyCode::Down => self.option_cursor = (self.option_cursor + 1).min(last),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_option_at_cursor(path, node),
            KeyCode::Esc => {
                self.session.close(path);
                self.option_cursor = 0;
            }
            _ => return None,
        }
        Some(EventResponse::Stop(Action::Update))
    }
}

/// Number inputs store a finite number when the text parses, otherwise the raw text.
pub fn parse_input(kind: FieldKind, raw: String) -> FieldValue {
    if kind == FieldKind::Number {
        if let Ok(n) = raw.trim().parse::<f64>() {
            if n.is_finite() {
                return FieldValue::Number(n);
            }
        }
    }
    FieldValue::Text(raw)
}

impl Component for FormPage {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(tx);
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        if self.editing {
            return Ok(Some(self.handle_editing_key(key)));
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(match key.code {
                KeyCode::Char('s') => Some(EventResponse::Stop(Action::Submit)),
                KeyCode::Char('r') => {
                    self.clear_form();
                    Some(EventResponse::Stop(Action::Update))
                }
                KeyCode::Char('c') => Some(EventResponse::Stop(Action::Quit)),
                _ => None,
            });
        }

        let focused = self.focused_field();
        if let Some((path, node)) = &focused {
            if node.kind == FieldKind::Multiselect && self.session.is_open(path) {
                if let Some(response) = self.handle_open_multiselect_key(key, path, node) {
                    return Ok(Some(response));
                }
            }
        }

        let response = match key.code {
            KeyCode::Up | KeyCode::BackTab => {
                self.focus_prev();
                EventResponse::Stop(Action::Update)
            }
            KeyCode::Down | KeyCode::Tab => {
                self.focus_next();
                EventResponse::Stop(Action::Update)
            }
            KeyCode::Home => {
                self.focus_index(0);
                EventResponse::Stop(Action::Update)
            }
            KeyCode::End => {
                let last = self.focusables().len().saturating_sub(1);
                self.focus_index(last);
                EventResponse::Stop(Action::Update)
            }
            KeyCode::Enter => match &focused {
                Some((path, node)) if node.kind.is_textual() => {
                    self.start_editing(path);
                    EventResponse::Stop(Action::Update)
                }
                Some((path, node)) if node.kind == FieldKind::Multiselect => {
                    self.option_cursor = 0;
                    self.session.toggle_open(path);
                    EventResponse::Stop(Action::Update)
                }
                _ => EventResponse::Stop(Action::Submit),
            },
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') => match &focused {
                Some((path, node)) => {
                    match node.kind {
                        FieldKind::Checkbox => self.toggle_checkbox(path),
                        FieldKind::Select => {
                            let dir = if key.code == KeyCode::Left { -1 } else { 1 };
                            self.cycle_select(path, node, dir);
                        }
                        FieldKind::Multiselect => {
                            self.option_cursor = 0;
                            self.session.toggle_open(path);
                        }
                        _ => return Ok(None),
                    }
                    EventResponse::Stop(Action::Update)
                }
                None if key.code == KeyCode::Char(' ') => EventResponse::Stop(Action::Submit),
                None => return Ok(None),
            },
            KeyCode::Esc | KeyCode::Char('q') => EventResponse::Stop(Action::Quit),
            _ => return Ok(None),
        };
        Ok(Some(response))
    }

    fn handle_mouse_events(&mut self, mouse: MouseEvent) -> Result<Option<EventResponse<Action>>> {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return Ok(None);
        }
        // Outside-click coordinator runs first and closes open controls.
        self.session.pointer_down(mouse.column, mouse.row);
        if self.editing {
            self.commit_editing();
        }

        let inside = self
            .session
            .boundary()
            .get()
            .is_some_and(|area| area.contains(mouse.column, mouse.row));
        if !inside {
            return Ok(Some(EventResponse::Stop(Action::Update)));
        }

        let target = self
            .rows
            .iter()
            .find(|(y, _)| *y == mouse.row)
            .map(|(_, target)| *target);
        match target {
            Some(RowTarget::Focus(index)) => self.focus_index(index),
            Some(RowTarget::Option { focus, option }) => {
                self.focus_index(focus);
                if let Some((path, node)) = self.focused_field() {
                    self.option_cursor = option;
                    self.toggle_option_at_cursor(&path, &node);
                }
            }
            None => {}
        }
        Ok(Some(EventResponse::Stop(Action::Update)))
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::Submit => Ok(self.submit()),
            Action::Tick => {
                if self.session.status().is_submitting() {
                    self.spinner = self.spinner.wrapping_add(1);
                }
                Ok(None)
            }
            Action::SubmissionFinished => {
                if let Some(message) = self.session.message() {
                    tracing::info!(kind = ?message.kind, "submission finished");
                }
                Ok(Some(Action::Update))
            }
            _ => Ok(None),
        }
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: ratatui::layout::Rect) -> Result<()> {
        form_view::render_form_page(self, f, area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crossterm::event::KeyEventState;
    use intake::{DispatchError, DispatchReceipt, Dispatcher, FieldOption, FormSchema};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Never;

    #[async_trait]
    impl Dispatcher for Never {
        async fn dispatch(&self, _: &serde_json::Value) -> Result<DispatchReceipt, DispatchError> {
            Err(DispatchError::Rejected {
                status: 503,
                body: String::new(),
            })
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: crossterm::event::KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn page() -> FormPage {
        let schema = FormSchema::new(
            "t",
            vec![
                FieldNode::new("hasInsurance", "Insured?", FieldKind::Checkbox)
                    .child(FieldNode::new("insurerName", "Insurer", FieldKind::Text)),
                FieldNode::new("services", "Services", FieldKind::Multiselect).options([
                    FieldOption::new("A", "Alpha"),
                    FieldOption::new("B", "Beta"),
                ]),
                FieldNode::new("crew", "Crew", FieldKind::Number),
            ],
        );
        FormPage::new(FormSession::mount(schema, Arc::new(Never)).unwrap())
    }

    #[test]
    fn space_on_checkbox_reveals_child_in_focus_order() {
        let mut page = page();
        assert_eq!(page.focusables().len(), 4);
        page.handle_key_events(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(page.focusables().len(), 5);
        page.handle_key_events(key(KeyCode::Down)).unwrap();
        assert_eq!(
            page.focused(),
            Focusable::Field(FieldPath::parse("hasInsurance.insurerName").unwrap())
        );
    }

    #[test]
    fn multiselect_opens_and_toggles_with_cursor() {
        let mut page = page();
        page.focus_index(1);
        let services = FieldPath::root("services");
        page.handle_key_events(key(KeyCode::Enter)).unwrap();
        assert!(page.session().is_open(&services));
        page.handle_key_events(key(KeyCode::Down)).unwrap();
        page.handle_key_events(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(page.session().read(&services), FieldValue::list(["B"]));
        page.handle_key_events(key(KeyCode::Esc)).unwrap();
        assert!(!page.session().is_open(&services));
    }

    #[test]
    fn editing_a_number_field_stores_a_number() {
        let mut page = page();
        page.focus_index(2);
        page.handle_key_events(key(KeyCode::Enter)).unwrap();
        for c in "12".chars() {
            page.handle_key_events(key(KeyCode::Char(c))).unwrap();
        }
        page.handle_key_events(key(KeyCode::Enter)).unwrap();
        assert_eq!(
            page.session().read(&FieldPath::root("crew")),
            FieldValue::Number(12.0)
        );
    }

    #[test]
    fn ctrl_r_clears_values_and_collapses_branches() {
        let mut page = page();
        page.handle_key_events(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(page.focusables().len(), 5);
        let ctrl_r = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..key(KeyCode::Char('r'))
        };
        page.handle_key_events(ctrl_r).unwrap();
        assert_eq!(page.focusables().len(), 4);
        assert_eq!(page.focused_index(), 0);
        assert_eq!(
            page.session().read(&FieldPath::root("hasInsurance")),
            FieldValue::Bool(false)
        );
    }

    #[test]
    fn parse_input_falls_back_to_text() {
        assert_eq!(parse_input(FieldKind::Number, "abc".into()), FieldValue::text("abc"));
        assert_eq!(parse_input(FieldKind::Number, "NaN".into()), FieldValue::text("NaN"));
        assert_eq!(parse_input(FieldKind::Number, "inf".into()), FieldValue::text("inf"));
        assert_eq!(parse_input(FieldKind::Number, "-infinity".into()), FieldValue::text("-infinity"));
        assert_eq!(parse_input(FieldKind::Text, "12".into()), FieldValue::text("12"));
    }

    #[test]
    fn click_outside_the_form_closes_the_dropdown() {
        let mut page = page();
        let services = FieldPath::root("services");
        page.session().toggle_open(&services);
        page.session().boundary().set(intake::Area::new(0, 0, 20, 10));
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 50,
            row: 2,
            modifiers: KeyModifiers::NONE,
        };
        page.handle_mouse_events(click).unwrap();
        assert!(!page.session().is_open(&services));
    }
}
