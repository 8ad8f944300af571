use crate::app::App;
use crate::config::KeyBindings;
use crate::ui::components::{centered_rect, truncate_to_width};
use crate::ui::theme::ThemeTokens;
use chrono::Local;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

pub fn render_help_popup(f: &mut Frame, app: &App) {
    let tokens = ThemeTokens::from_theme(&app.config.theme);
    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(tokens.ui_border_default));
    let area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let inner_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .margin(2)
        .split(area);

    let key_width = 18usize;
    let mut lines = Vec::new();
    for section in help_sections(&app.config.keybindings) {
        lines.push(Line::from(Span::styled(
            section.title,
            Style::default()
                .fg(tokens.header)
                .add_modifier(Modifier::BOLD),
        )));
        for (keys, label) in section.entries {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<key_width$}", truncate_to_width(&keys, key_width)),
                    Style::default().fg(tokens.ui_border_focus),
                ),
                Span::raw(label),
            ]));
        }
        lines.push(Line::from(""));
    }

    f.render_widget(Paragraph::new(Text::from(lines)), inner_area[0]);
    f.render_widget(
        Paragraph::new("Esc / ?: close").style(Style::default().fg(tokens.ui_muted)),
        inner_area[1],
    );
}

struct HelpSection {
    title: &'static str,
    entries: Vec<(String, &'static str)>,
}

fn keys(bindings: &[String]) -> String {
    if bindings.is_empty() {
        return "-".to_string();
    }
    bindings.join(" / ")
}

fn help_sections(kb: &KeyBindings) -> Vec<HelpSection> {
    vec![
        HelpSection {
            title: "Global",
            entries: vec![
                (keys(&kb.global.login), "Login / Register (home)"),
                (keys(&kb.global.logout), "Logout"),
                (keys(&kb.global.refresh), "Refresh tasks"),
                (keys(&kb.global.compose), "Add a new task"),
                (keys(&kb.global.focus_next), "Switch list"),
                (keys(&kb.global.help), "Help"),
                (keys(&kb.global.quit), "Quit"),
            ],
        },
        HelpSection {
            title: "Lists",
            entries: vec![
                (keys(&kb.lists.up), "Move up"),
                (keys(&kb.lists.down), "Move down"),
                (keys(&kb.lists.complete), "Mark as complete"),
                (keys(&kb.lists.edit), "Edit task"),
                (keys(&kb.lists.delete), "Delete task"),
            ],
        },
        HelpSection {
            title: "Composer",
            entries: vec![
                (keys(&kb.composer.submit), "Save"),
                (keys(&kb.composer.cancel), "Cancel"),
                (keys(&kb.composer.next_field), "Next field"),
                (keys(&kb.composer.prev_field), "Previous field"),
                (keys(&kb.composer.clear), "Clear field"),
            ],
        },
    ]
}

pub fn render_login_popup(f: &mut Frame, app: &App) {
    let tokens = ThemeTokens::from_theme(&app.config.theme);
    let block = Block::default()
        .title(" Login / Register ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(tokens.ui_border_focus));
    let area = centered_rect(70, 40, f.area());
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let text_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(100)])
        .margin(2)
        .split(area);

    let muted = Style::default().fg(tokens.ui_muted);
    let mut lines = Vec::new();

    if let Some(display) = app.login_display.as_ref() {
        let remaining_seconds = display
            .expires_at
            .signed_duration_since(Local::now())
            .num_seconds()
            .max(0);
        let remaining_text = if remaining_seconds > 0 {
            format!(
                "Expires in {:02}m {:02}s",
                remaining_seconds / 60,
                remaining_seconds % 60
            )
        } else {
            "Login expired. Press Esc and try again.".to_string()
        };

        lines.push(Line::from("Finish logging in with your browser:"));
        lines.push(Line::from(Span::styled(
            display.login_url.as_str(),
            Style::default()
                .fg(tokens.ui_border_focus)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Waiting for the redirect back to {}", display.origin),
            muted,
        )));
        lines.push(Line::from(Span::styled(remaining_text, muted)));
    } else {
        lines.push(Line::from(Span::styled("Starting login...", muted)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[Enter] Open browser    [Esc] Cancel",
        muted,
    )));

    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
    f.render_widget(paragraph, text_area[0]);
}

pub fn render_delete_popup(f: &mut Frame, app: &App) {
    let tokens = ThemeTokens::from_theme(&app.config.theme);
    let block = Block::default()
        .title(" Delete this task? ")
        .borders(Borders::ALL)
        .style(Style::default().fg(tokens.ui_alert));
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let text_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .margin(2)
        .split(area);

    let title = app
        .delete_target
        .as_ref()
        .map(|task| task.title.as_str())
        .unwrap_or("<no task selected>");
    let width = text_area[0].width as usize;
    let body = Paragraph::new(format!(
        "Delete \"{}\"? (y)es / (n)o",
        truncate_to_width(title, width.saturating_sub(20))
    ))
    .style(Style::default().add_modifier(Modifier::BOLD))
    .wrap(Wrap { trim: true });

    let help_text = Paragraph::new("Enter/y: delete  Esc/n: cancel")
        .style(Style::default().fg(tokens.ui_muted));

    f.render_widget(body, text_area[0]);
    f.render_widget(help_text, text_area[1]);
}

pub fn render_alert_popup(f: &mut Frame, app: &App, message: &str) {
    let tokens = ThemeTokens::from_theme(&app.config.theme);
    let block = Block::default()
        .title(" Alert ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(tokens.ui_alert));
    let area = centered_rect(60, 25, f.area());
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let text_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .margin(2)
        .split(area);

    let body = Paragraph::new(message.to_string())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true });
    f.render_widget(body, text_area[0]);
    f.render_widget(
        Paragraph::new("Enter: OK").style(Style::default().fg(tokens.ui_muted)),
        text_area[1],
    );
}
