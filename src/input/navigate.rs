use crate::{actions, app::App, config::key_match};
use crossterm::event::KeyEvent;

/// Anonymous screen: only login, help and quit are live.
pub fn handle_home(app: &mut App, key: KeyEvent) {
    let bindings = &app.config.keybindings.global;
    if key_match(&key, &bindings.quit) {
        app.quit();
    } else if key_match(&key, &bindings.help) {
        app.show_help_popup = true;
    } else if key_match(&key, &bindings.login) {
        actions::begin_login(app);
    }
}

pub fn handle_dashboard(app: &mut App, key: KeyEvent) {
    let global = &app.config.keybindings.global;
    let lists = &app.config.keybindings.lists;

    // Logout is checked before quit so a shifted letter never falls through.
    if key_match(&key, &global.logout) {
        actions::logout(app);
    } else if key_match(&key, &global.quit) {
        app.quit();
    } else if key_match(&key, &global.help) {
        app.show_help_popup = true;
    } else if key_match(&key, &global.refresh) {
        actions::refresh(app);
    } else if key_match(&key, &global.compose) {
        app.begin_compose();
    } else if key_match(&key, &global.focus_next) {
        let focus = app.navigate_focus.toggle();
        app.set_focus(focus);
    } else if key_match(&key, &lists.up) {
        app.select_prev();
    } else if key_match(&key, &lists.down) {
        app.select_next();
    } else if key_match(&key, &lists.complete) {
        actions::complete_selected(app);
    } else if key_match(&key, &lists.edit) {
        actions::edit_selected(app);
    } else if key_match(&key, &lists.delete) {
        actions::request_delete(app);
    }
}
