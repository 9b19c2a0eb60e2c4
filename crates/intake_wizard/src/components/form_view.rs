use color_eyre::Result;
use intake::{
    Area, FieldKind, FieldPath, MultiSelectDisplay, StatusKind, SubmissionStatus, VisibleField,
};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::form_page::{FormPage, RowTarget};
use crate::tui::Frame;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// One rendered row of the form panel.
#[derive(Debug, Clone)]
pub struct FormLine {
    pub line: Line<'static>,
    pub target: Option<RowTarget>,
    pub focused: bool,
}

impl FormLine {
    fn plain(line: Line<'static>) -> Self {
        Self {
            line,
            target: None,
            focused: false,
        }
    }
}

/// Vertical thumb position for a scrollbar track, or `None` if everything fits.
pub fn compute_scrollbar_thumb(
    total: usize,
    visible: usize,
    scroll: usize,
    track_height: u16,
) -> Option<usize> {
    if track_height == 0 || total == 0 || visible == 0 || total <= visible {
        return None;
    }
    let max_thumb_y = track_height.saturating_sub(1) as usize;
    let denom = total.saturating_sub(visible).max(1);
    let ratio = (scroll as f32) / (denom as f32);
    let thumb_y = (ratio * (max_thumb_y as f32)).round() as usize;
    Some(thumb_y.min(max_thumb_y))
}

/// Keep `focus_line` inside a window of `height` rows starting at `scroll`.
pub fn adjust_scroll(scroll: usize, focus_line: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    if focus_line < scroll {
        focus_line
    } else if focus_line >= scroll + height {
        focus_line + 1 - height
    } else {
        scroll
    }
}

fn value_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Black).bg(Color::White)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

fn label_span(field: &VisibleField<'_>, focused: bool) -> Span<'static> {
    let mut label = field.node.label.clone();
    if field.node.required {
        label.push('*');
    }
    let style = Style::default().fg(Color::White).add_modifier(if focused {
        Modifier::BOLD
    } else {
        Modifier::empty()
    });
    Span::styled(label, style)
}

/// Build the form panel's rows from the page state.
pub fn build_lines(page: &FormPage) -> Vec<FormLine> {
    let session = page.session();
    let missing: Vec<FieldPath> = if page.show_missing() {
        session.missing_required()
    } else {
        Vec::new()
    };
    let mut lines = Vec::new();

    if let Some(desc) = &session.schema().description {
        for l in desc.lines() {
            lines.push(FormLine::plain(Line::from(Span::styled(
                l.to_string(),
                Style::default().fg(Color::Gray),
            ))));
        }
        lines.push(FormLine::plain(Line::raw("")));
    }

    let mut focus_index = 0;
    for field in session.visible_fields() {
        let indent = "  ".repeat(field.depth);
        if field.node.kind == FieldKind::Section {
            lines.push(FormLine::plain(Line::from(vec![
                Span::raw(indent),
                Span::styled(
                    field.node.label.clone(),
                    Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                ),
            ])));
            continue;
        }

        let index = focus_index;
        focus_index += 1;
        let focused = index == page.focused_index();
        let value = session.read(&field.path);

        let mut spans = vec![Span::raw(indent.clone())];
        match field.node.kind {
            FieldKind::Checkbox => {
                let mark = if value.is_truthy() { "[x] " } else { "[ ] " };
                spans.push(Span::styled(mark, value_style(focused)));
                spans.push(label_span(&field, focused));
            }
            FieldKind::Select => {
                let selected = value.as_text();
                let shown = field
                    .node
                    .option_label(&selected)
                    .unwrap_or("Select an option")
                    .to_string();
                spans.push(label_span(&field, focused));
                spans.push(Span::raw(": "));
                spans.push(Span::styled(format!("< {shown} >"), value_style(focused)));
            }
            FieldKind::Multiselect => {
                spans.push(label_span(&field, focused));
                spans.push(Span::raw(": "));
                let display = session.multiselect_display(&field.path);
                let open = matches!(display, Some(MultiSelectDisplay::Open { .. }));
                let summary = display
                    .as_ref()
                    .map(|d| d.summary().to_string())
                    .unwrap_or_default();
                let chevron = if open { " ^" } else { " v" };
                spans.push(Span::styled(format!("{summary}{chevron}"), value_style(focused)));
            }
            _ => {
                spans.push(label_span(&field, focused));
                spans.push(Span::raw(": "));
                if focused && page.is_editing() {
                    spans.push(Span::styled(
                        format!("{}_", page.input().value()),
                        Style::default().fg(Color::Black).bg(Color::Yellow),
                    ));
                } else {
                    let text = value.as_text();
                    if text.is_empty() {
                        let placeholder = field.node.placeholder.clone().unwrap_or_default();
                        spans.push(Span::styled(placeholder, Style::default().fg(Color::DarkGray)));
                        if focused {
                            spans.push(Span::styled(" ", value_style(true)));
                        }
                    } else {
                        spans.push(Span::styled(text, value_style(focused)));
                    }
                }
            }
        }
        if missing.contains(&field.path) {
            spans.push(Span::styled("  required", Style::default().fg(Color::Red)));
        }
        lines.push(FormLine {
            line: Line::from(spans),
            target: Some(RowTarget::Focus(index)),
            focused,
        });

        if let Some(MultiSelectDisplay::Open { options, .. }) = session.multiselect_display(&field.path) {
            for (i, option) in options.iter().enumerate() {
                let mark = if option.checked { "[x] " } else { "[ ] " };
                let cursor = focused && i == page.option_cursor();
                let style = if cursor {
                    Style::default().fg(Color::Black).bg(Color::Gray)
                } else {
                    Style::default()
                };
                lines.push(FormLine {
                    line: Line::from(vec![
                        Span::raw(format!("{indent}    ")),
                        Span::styled(format!("{mark}{}", option.label), style),
                    ]),
                    target: Some(RowTarget::Option {
                        focus: index,
                        option: i,
                    }),
                    focused: cursor,
                });
            }
        }
    }

    lines.push(FormLine::plain(Line::raw("")));
    let focused = focus_index == page.focused_index();
    let label = if session.status().is_submitting() {
        format!("[ Submitting... {} ]", SPINNER[page.spinner() % SPINNER.len()])
    } else {
        "[ Submit ]".to_string()
    };
    let style = if focused {
        Style::default().fg(Color::Black).bg(Color::Blue)
    } else {
        Style::default().fg(Color::Blue)
    };
    lines.push(FormLine {
        line: Line::from(Span::styled(label, style.add_modifier(Modifier::BOLD))),
        target: Some(RowTarget::Focus(focus_index)),
        focused,
    });
    lines
}

fn status_line(page: &FormPage) -> Line<'static> {
    let session = page.session();
    if let SubmissionStatus::Submitting = session.status() {
        return Line::from(Span::styled(
            format!("{} Submitting...", SPINNER[page.spinner() % SPINNER.len()]),
            Style::default().fg(Color::Yellow),
        ));
    }
    match session.message() {
        Some(message) => {
            let color = match message.kind {
                StatusKind::Success => Color::Green,
                StatusKind::Error => Color::Red,
            };
            Line::from(Span::styled(message.text, Style::default().fg(color)))
        }
        None => Line::from(Span::styled(
            "Ctrl+S submit   Esc quit",
            Style::default().fg(Color::DarkGray),
        )),
    }
}

fn help_lines(page: &FormPage) -> Vec<Line<'static>> {
    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(k, Style::default().fg(Color::White)),
            Span::raw(": "),
            Span::raw(what),
        ])
        .fg(Color::DarkGray)
    };
    let mut lines = vec![
        key("Up/Down/Tab", "move"),
        key("Enter", "edit / open / submit"),
        key("Space", "toggle"),
        key("Left/Right", "change choice"),
        key("Ctrl+S", "submit"),
        key("Ctrl+R", "clear form"),
        key("Esc/q", "quit"),
        Line::raw(""),
    ];

    let session = page.session();
    let missing = session.missing_required();
    if !missing.is_empty() {
        lines.push(Line::from("Still empty:").style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)));
        for path in missing {
            let label = session
                .schema()
                .field_at(&path)
                .map(|n| n.label.clone())
                .unwrap_or_else(|| path.to_string());
            lines.push(Line::from(Span::styled(
                format!("• {label}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

/// Lay out header, form panel, side panel and status line, and record the
/// form panel as the session's boundary.
pub fn render_form_page(page: &mut FormPage, f: &mut Frame<'_>, area: Rect) -> Result<()> {
    let [header, body, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(5),
        Constraint::Length(1),
    ])
    .areas(area);
    let [form_area, side_area] =
        Layout::horizontal([Constraint::Percentage(68), Constraint::Percentage(32)]).areas(body);

    let title = page.session().schema().title.clone();
    f.render_widget(
        Paragraph::new(Line::from(title).bold()).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_set(symbols::border::PLAIN),
        ),
        header,
    );

    page.session().boundary().set(Area::new(
        form_area.x,
        form_area.y,
        form_area.width,
        form_area.height,
    ));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(symbols::border::ROUNDED)
        .title(" Form ");
    let inner = block.inner(form_area);
    f.render_widget(block, form_area);

    let lines = build_lines(page);
    let height = inner.height as usize;
    let focus_line = lines.iter().position(|l| l.focused).unwrap_or(0);
    let scroll = adjust_scroll(page.scroll(), focus_line, height).min(lines.len().saturating_sub(1));
    page.set_scroll(scroll);

    let window: Vec<&FormLine> = lines.iter().skip(scroll).take(height).collect();
    let rows = window
        .iter()
        .enumerate()
        .filter_map(|(i, l)| l.target.map(|t| (inner.y + i as u16, t)))
        .collect();
    page.set_rows(rows);

    let text = Text::from(window.iter().map(|l| l.line.clone()).collect::<Vec<_>>());
    let text_area = Rect {
        width: inner.width.saturating_sub(1),
        ..inner
    };
    f.render_widget(Paragraph::new(text), text_area);

    if let Some(thumb) = compute_scrollbar_thumb(lines.len(), height, scroll, inner.height) {
        let track = Rect {
            x: inner.x + inner.width.saturating_sub(1),
            y: inner.y,
            width: 1,
            height: inner.height,
        };
        let track_lines: Vec<Line> = (0..track.height as usize)
            .map(|i| {
                if i == thumb {
                    Line::from(Span::styled("█", Style::default().fg(Color::Gray)))
                } else {
                    Line::from(Span::styled("│", Style::default().fg(Color::DarkGray)))
                }
            })
            .collect();
        f.render_widget(Paragraph::new(Text::from(track_lines)), track);
    }

    f.render_widget(
        Paragraph::new(Text::from(help_lines(page)))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_set(symbols::border::ROUNDED)
                    .title(" Help "),
            ),
        side_area,
    );

    f.render_widget(Paragraph::new(status_line(page)), status);
    Ok(())
}
