use crate::{
    app::App,
    integrations::login,
    models::{InputMode, NavigateFocus},
    session::{self, RedirectParams},
};
use std::sync::Arc;
use tracing::{info, warn};

/// Validates redirect params; anonymous params leave the home screen as is.
pub fn accept_redirect(app: &mut App, params: RedirectParams) {
    match session::spawn_resolve(Arc::clone(&app.api), params) {
        Some(receiver) => {
            app.resolve_receiver = Some(receiver);
            app.toast("Checking login...");
        }
        None => info!("no completed login in redirect parameters"),
    }
}

pub fn begin_login(app: &mut App) {
    if app.login_receiver.is_some() {
        app.show_login_popup = true;
        return;
    }
    if app.is_resolving() {
        app.toast("Login check already running.");
        return;
    }

    let flow = match login::start_login_flow(&app.config.login) {
        Ok(flow) => flow,
        Err(err) => {
            warn!(%err, "could not start login");
            app.alert(err.to_string());
            return;
        }
    };

    let url = flow.display.login_url.clone();
    info!(%url, "redirecting to login");
    if app.config.login.open_browser
        && let Err(err) = open::that(&url)
    {
        warn!(%err, "failed to open browser");
        app.toast_error("Could not open a browser. Open the URL shown manually.");
    }

    app.login_display = Some(flow.display.clone());
    app.login_receiver = Some(login::spawn_login_poll(flow));
    app.show_login_popup = true;
}

/// Stops waiting for the callback. Dropping the poll releases the listener port.
pub fn cancel_login(app: &mut App) {
    app.login_receiver = None;
    app.login_display = None;
    app.show_login_popup = false;
    app.toast("Login cancelled.");
}

pub fn logout(app: &mut App) {
    info!("logging out");
    if let Err(err) = session::clear_local_tokens(&app.config.data.dir) {
        warn!(%err, "failed to clear stored token");
    }
    app.reset_to_anonymous();
    app.toast("Logged out.");
}

pub fn refresh(app: &mut App) {
    if let Some(sync) = app.sync.as_mut() {
        sync.sync();
        app.toast("Refreshing tasks...");
    }
}

/// Sends the composer content as a new task, or as an edit when a task was
/// loaded into it. An empty title raises an alert and sends nothing.
pub fn submit_composer(app: &mut App) {
    let title = app.composer_title();
    let description = app.composer_description();
    let editing = app.editing_task.clone();

    let Some(sync) = app.sync.as_mut() else {
        return;
    };

    let result = match editing {
        Some(task_id) => sync.update(task_id, &title, &description),
        None => sync.create(&title, &description),
    };

    match result {
        Ok(()) => {
            app.clear_composer();
            app.transition_to(InputMode::Navigate);
        }
        Err(err) => app.alert(err.to_string()),
    }
}

pub fn cancel_composer(app: &mut App) {
    app.clear_composer();
    app.transition_to(InputMode::Navigate);
}

pub fn complete_selected(app: &mut App) {
    if app.navigate_focus != NavigateFocus::Pending {
        app.toast("Task already completed.");
        return;
    }
    let Some(task) = app.selected_task() else {
        app.toast("No task selected.");
        return;
    };
    if let Some(sync) = app.sync.as_mut() {
        sync.complete(task.id);
    }
}

pub fn edit_selected(app: &mut App) {
    if app.navigate_focus != NavigateFocus::Pending {
        app.toast("Completed tasks cannot be edited.");
        return;
    }
    match app.selected_task() {
        Some(task) => app.begin_edit(&task),
        None => app.toast("No task selected."),
    }
}

pub fn request_delete(app: &mut App) {
    match app.selected_task() {
        Some(task) => {
            app.delete_target = Some(task);
            app.show_delete_popup = true;
        }
        None => app.toast("No task selected."),
    }
}

pub fn confirm_delete(app: &mut App) {
    app.show_delete_popup = false;
    if let Some(task) = app.delete_target.take()
        && let Some(sync) = app.sync.as_mut()
    {
        sync.remove(task.id);
    }
}
