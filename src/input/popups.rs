use crate::{actions, app::App, config::key_match};
use crossterm::event::{KeyCode, KeyEvent};
use tracing::warn;

/// Returns true when an open popup consumed the key.
pub fn handle_popup_events(app: &mut App, key: KeyEvent) -> bool {
    if app.alert_message.is_some() {
        handle_alert_popup(app, key);
        return true;
    }
    if app.show_help_popup {
        if key.code == KeyCode::Esc || key_match(&key, &app.config.keybindings.global.help) {
            app.show_help_popup = false;
        }
        return true;
    }
    if app.show_delete_popup {
        handle_delete_popup(app, key);
        return true;
    }
    if app.show_login_popup {
        handle_login_popup(app, key);
        return true;
    }
    false
}

fn handle_alert_popup(app: &mut App, key: KeyEvent) {
    if key_match(&key, &app.config.keybindings.popup.confirm)
        || key_match(&key, &app.config.keybindings.popup.cancel)
    {
        app.alert_message = None;
    }
}

fn handle_delete_popup(app: &mut App, key: KeyEvent) {
    if key_match(&key, &app.config.keybindings.popup.confirm) {
        actions::confirm_delete(app);
    } else if key_match(&key, &app.config.keybindings.popup.cancel) {
        app.show_delete_popup = false;
        app.delete_target = None;
    }
}

fn handle_login_popup(app: &mut App, key: KeyEvent) {
    if key_match(&key, &app.config.keybindings.popup.confirm) {
        if let Some(display) = app.login_display.as_ref()
            && let Err(err) = open::that(&display.login_url)
        {
            warn!(%err, "failed to open browser");
        }
        return;
    }

    if key_match(&key, &app.config.keybindings.popup.cancel) {
        actions::cancel_login(app);
    }
}
