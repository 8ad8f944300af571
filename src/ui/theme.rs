use crate::config::Theme;
use crate::ui::color_parser::parse_color;
use ratatui::style::Color;

/// Resolved colors for one frame.
#[derive(Debug, Clone)]
pub struct ThemeTokens {
    pub ui_border_default: Color,
    pub ui_border_focus: Color,
    pub ui_border_editing: Color,
    pub header: Color,
    pub tasks_pending: Color,
    pub tasks_done: Color,
    pub ui_highlight: Color,
    pub ui_muted: Color,
    pub ui_toast_info: Color,
    pub ui_toast_error: Color,
    pub ui_alert: Color,
}

impl ThemeTokens {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            ui_border_default: parse_color(&theme.border_default),
            ui_border_focus: parse_color(&theme.border_focus),
            ui_border_editing: parse_color(&theme.border_editing),
            header: parse_color(&theme.header),
            tasks_pending: parse_color(&theme.pending),
            tasks_done: parse_color(&theme.completed),
            ui_highlight: parse_color(&theme.text_highlight),
            ui_muted: parse_color(&theme.muted),
            ui_toast_info: parse_color(&theme.toast_info),
            ui_toast_error: parse_color(&theme.toast_error),
            ui_alert: parse_color(&theme.alert),
        }
    }
}
