use crate::{actions, app::App, config::key_match};
use crossterm::event::KeyEvent;

pub fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let bindings = &app.config.keybindings.composer;

    if key_match(&key, &bindings.submit) {
        actions::submit_composer(app);
    } else if key_match(&key, &bindings.cancel) {
        actions::cancel_composer(app);
    } else if key_match(&key, &bindings.next_field) || key_match(&key, &bindings.prev_field) {
        // Two fields, so either direction lands on the other one.
        app.toggle_composer_field();
    } else if key_match(&key, &bindings.clear) {
        let input = app.active_input_mut();
        input.select_all();
        input.cut();
    } else {
        app.active_input_mut().input(key);
    }
}

