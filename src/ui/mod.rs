use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph},
};

use crate::app::App;
use crate::models::{ComposerField, InputMode, NavigateFocus, Task};
use unicode_width::UnicodeWidthStr;

pub mod color_parser;
pub mod components;
pub mod popups;
pub mod theme;

use components::{truncate_to_width, wrap_description};
use popups::{render_alert_popup, render_delete_popup, render_help_popup, render_login_popup};

pub fn ui(f: &mut Frame, app: &mut App) {
    let tokens = theme::ThemeTokens::from_theme(&app.config.theme);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());
    let (main_area, status_area) = (chunks[0], chunks[1]);

    if app.is_authenticated() {
        render_dashboard(f, main_area, app, &tokens);
    } else {
        render_home(f, main_area, app, &tokens);
    }
    render_status_bar(f, status_area, app, &tokens);

    if app.show_login_popup {
        render_login_popup(f, app);
    }
    if app.show_delete_popup {
        render_delete_popup(f, app);
    }
    if app.show_help_popup {
        render_help_popup(f, app);
    }
    // Drawn last so it sits above everything it blocks.
    if let Some(message) = app.alert_message.as_deref() {
        render_alert_popup(f, app, message);
    }
}

fn render_home(f: &mut Frame, area: Rect, app: &App, tokens: &theme::ThemeTokens) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(tokens.ui_border_default));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let login_keys = app.config.keybindings.global.login.join(" / ");
    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome",
            Style::default()
                .fg(tokens.header)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if app.is_resolving() {
        lines.push(Line::from(Span::styled(
            "Checking login...",
            Style::default().fg(tokens.ui_muted),
        )));
    } else {
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{login_keys}]"),
                Style::default()
                    .fg(tokens.ui_border_focus)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Login / Register"),
        ]));
    }

    let top_pad = inner.height.saturating_sub(lines.len() as u16) / 2;
    let body_area = Rect {
        y: inner.y + top_pad,
        height: inner.height.saturating_sub(top_pad),
        ..inner
    };
    f.render_widget(
        Paragraph::new(Text::from(lines)).alignment(Alignment::Center),
        body_area,
    );
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &mut App, tokens: &theme::ThemeTokens) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let username = app
        .session
        .as_ref()
        .map(|session| session.username.as_str())
        .unwrap_or_default();
    let header = Paragraph::new(Line::from(Span::styled(
        format!("Hi, {username}, this is your todo list!"),
        Style::default()
            .fg(tokens.header)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(header, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);
    let lists = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[0]);

    render_task_list(f, lists[0], app, NavigateFocus::Pending, tokens);
    render_task_list(f, lists[1], app, NavigateFocus::Completed, tokens);
    render_composer(f, columns[1], app, tokens);
}

fn render_task_list(
    f: &mut Frame,
    area: Rect,
    app: &mut App,
    which: NavigateFocus,
    tokens: &theme::ThemeTokens,
) {
    let focused = app.input_mode == InputMode::Navigate && app.navigate_focus == which;
    let (title, accent) = match which {
        NavigateFocus::Pending => ("Pending", tokens.tasks_pending),
        NavigateFocus::Completed => ("Completed", tokens.tasks_done),
    };
    let border_color = if focused {
        tokens.ui_border_focus
    } else {
        tokens.ui_border_default
    };

    let tasks = match which {
        NavigateFocus::Pending => app.pending_tasks(),
        NavigateFocus::Completed => app.completed_tasks(),
    };
    let block = Block::default()
        .title(format!(" {title} ({}) ", tasks.len()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    let width = inner.width.saturating_sub(2).max(1) as usize;

    let items: Vec<ListItem> = if tasks.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            format!("No {} tasks.", title.to_lowercase()),
            Style::default().fg(tokens.ui_muted),
        )))]
    } else {
        tasks
            .iter()
            .map(|task| task_item(task, width, accent, tokens))
            .collect()
    };

    let mut list = List::new(items).block(block);
    if !tasks.is_empty() {
        list = list
            .highlight_style(
                Style::default()
                    .bg(tokens.ui_highlight)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
    }
    drop(tasks);

    let state = match which {
        NavigateFocus::Pending => &mut app.pending_state,
        NavigateFocus::Completed => &mut app.completed_state,
    };
    f.render_stateful_widget(list, area, state);
}

fn task_item<'t>(
    task: &Task,
    width: usize,
    accent: ratatui::style::Color,
    tokens: &theme::ThemeTokens,
) -> ListItem<'t> {
    let marker = if task.is_pending() { "[ ] " } else { "[x] " };
    let title_width = width.saturating_sub(marker.len());
    let mut lines = vec![Line::from(vec![
        Span::styled(marker, Style::default().fg(accent)),
        Span::styled(
            truncate_to_width(&task.title, title_width),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ])];
    let indent = " ".repeat(marker.len());
    for line in wrap_description(&task.description, title_width) {
        lines.push(Line::from(Span::styled(
            format!("{indent}{line}"),
            Style::default().fg(tokens.ui_muted),
        )));
    }
    ListItem::new(Text::from(lines))
}

fn render_composer(f: &mut Frame, area: Rect, app: &mut App, tokens: &theme::ThemeTokens) {
    let editing = app.input_mode == InputMode::Editing;
    let title = if app.editing_task.is_some() {
        " Edit Task "
    } else {
        " Add a New Task "
    };
    let outer = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if editing {
            tokens.ui_border_editing
        } else {
            tokens.ui_border_default
        }));
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let fields = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(inner);

    let active = |field: ComposerField| editing && app.composer_field == field;
    let title_active = active(ComposerField::Title);
    let description_active = active(ComposerField::Description);

    style_input(&mut app.title_input, "Title", title_active, tokens);
    style_input(
        &mut app.description_input,
        "Description",
        description_active,
        tokens,
    );
    f.render_widget(&app.title_input, fields[0]);
    f.render_widget(&app.description_input, fields[1]);
}

fn style_input(
    input: &mut tui_textarea::TextArea<'_>,
    label: &'static str,
    active: bool,
    tokens: &theme::ThemeTokens,
) {
    let border = if active {
        tokens.ui_border_editing
    } else {
        tokens.ui_border_default
    };
    input.set_block(
        Block::default()
            .title(format!(" {label} "))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    input.set_placeholder_style(Style::default().fg(tokens.ui_muted));
    input.set_cursor_line_style(Style::default());
    // Only the active field shows a cursor.
    if active {
        input.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
    } else {
        input.set_cursor_style(Style::default());
    }
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App, tokens: &theme::ThemeTokens) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let mode_label = if !app.is_authenticated() {
        "HOME"
    } else {
        match app.input_mode {
            InputMode::Navigate => match app.navigate_focus {
                NavigateFocus::Pending => "NAV:PENDING",
                NavigateFocus::Completed => "NAV:DONE",
            },
            InputMode::Editing => "EDIT",
        }
    };

    let mut left_spans = vec![Span::styled(
        format!(" {mode_label} "),
        Style::default()
            .fg(tokens.ui_border_focus)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(sync) = app.sync.as_ref() {
        left_spans.push(Span::styled(
            format!(" {} tasks", sync.tasks().len()),
            Style::default().fg(tokens.ui_muted),
        ));
    }
    let in_flight = app.sync.as_ref().map_or(0, |sync| sync.in_flight());
    if in_flight > 0 {
        left_spans.push(Span::styled(
            format!(" syncing ({in_flight})"),
            Style::default().fg(tokens.ui_muted),
        ));
    }

    let (message, color) = match app.toast_message.as_deref() {
        Some(toast) if !toast.is_empty() => {
            let color = if app.toast_is_error {
                tokens.ui_toast_error
            } else {
                tokens.ui_toast_info
            };
            (toast.to_string(), color)
        }
        _ => (
            format!("{}: help", app.config.keybindings.global.help.join(" / ")),
            tokens.ui_muted,
        ),
    };

    let min_left_width = 14u16;
    let max_right = area.width.saturating_sub(min_left_width) as usize;
    let message = truncate_to_width(&message, max_right);
    let right_width = UnicodeWidthStr::width(message.as_str()) as u16;

    let status_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(right_width)])
        .split(area);

    f.render_widget(Paragraph::new(Line::from(left_spans)), status_chunks[0]);
    let right = Paragraph::new(Line::from(Span::styled(
        message,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Right);
    f.render_widget(right, status_chunks[1]);
}
