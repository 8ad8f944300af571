use crate::{actions, app::App, integrations::login::LoginPollResult};
use chrono::Local;
use std::sync::mpsc::TryRecvError;
use tracing::warn;

/// Applies whatever finished since the last frame. Never blocks.
pub fn tick(app: &mut App) {
    handle_login_callback(app);
    handle_session_resolve(app);
    handle_task_sync(app);

    if let Some(expiry) = app.toast_expiry
        && Local::now() >= expiry
    {
        app.toast_expiry = None;
        app.toast_message = None;
    }
}

fn handle_login_callback(app: &mut App) {
    let result = {
        let Some(receiver) = app.login_receiver.as_ref() else {
            return;
        };
        receiver.try_recv()
    };

    match result {
        Ok(LoginPollResult::Redirect(params)) => {
            close_login(app);
            actions::accept_redirect(app, params);
            if app.resolve_receiver.is_none() {
                app.toast_error("Login was not completed.");
            }
        }
        Ok(LoginPollResult::Error(message)) => {
            close_login(app);
            app.toast_error(format!("Login failed: {message}"));
        }
        Err(TryRecvError::Empty) => {}
        Err(TryRecvError::Disconnected) => {
            close_login(app);
            app.toast_error("Login stopped.");
        }
    }
}

fn close_login(app: &mut App) {
    app.login_receiver = None;
    app.login_display = None;
    app.show_login_popup = false;
}

fn handle_session_resolve(app: &mut App) {
    let result = {
        let Some(receiver) = app.resolve_receiver.as_ref() else {
            return;
        };
        receiver.try_recv()
    };

    match result {
        Ok(Some(session)) => {
            app.resolve_receiver = None;
            app.toast(format!("Welcome, {}.", session.username));
            app.start_session(session);
        }
        Ok(None) => {
            app.resolve_receiver = None;
            app.toast_error("Could not verify login.");
        }
        Err(TryRecvError::Empty) => {}
        Err(TryRecvError::Disconnected) => {
            warn!("session check ended without a result");
            app.resolve_receiver = None;
        }
    }
}

fn handle_task_sync(app: &mut App) {
    let Some(sync) = app.sync.as_mut() else {
        return;
    };
    let notices = sync.poll();
    app.apply_notices(notices);
    app.clamp_selection();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::integrations::login::LoginPoll;
    use crate::models::TaskStatus;
    use crate::session::RedirectParams;
    use crate::test_helpers::FakeApi;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn tick_until(app: &mut App, done: impl Fn(&App) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(app) && Instant::now() < deadline {
            tick(app);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn login_redirect_resolves_session_and_loads_tasks() {
        let api = FakeApi::new()
            .with_user("42", "ada")
            .with_task("42", "1", "Buy milk", TaskStatus::Pending);
        let mut app = App::new(Config::default(), Arc::new(api));
        let (tx, rx) = mpsc::channel();
        app.login_receiver = Some(LoginPoll::from_receiver(rx));
        app.show_login_popup = true;
        tx.send(LoginPollResult::Redirect(RedirectParams::from_query(
            "logged_in=True&user_id=42",
        )))
        .expect("send redirect");

        tick_until(&mut app, |app| !app.pending_tasks().is_empty());

        assert!(!app.show_login_popup);
        assert_eq!(
            app.session.as_ref().map(|s| s.username.as_str()),
            Some("ada")
        );
        assert_eq!(app.pending_tasks()[0].title, "Buy milk");
        assert_eq!(app.pending_state.selected(), Some(0));
    }

    #[test]
    fn unknown_user_stays_on_home_screen() {
        let mut app = App::new(Config::default(), Arc::new(FakeApi::new()));
        actions::accept_redirect(
            &mut app,
            RedirectParams::from_query("logged_in=True&user_id=404"),
        );

        tick_until(&mut app, |app| !app.is_resolving());

        assert!(!app.is_authenticated());
        assert_eq!(app.toast_message.as_deref(), Some("Could not verify login."));
    }

    #[test]
    fn login_error_closes_popup() {
        let mut app = App::new(Config::default(), Arc::new(FakeApi::new()));
        let (tx, rx) = mpsc::channel();
        app.login_receiver = Some(LoginPoll::from_receiver(rx));
        app.show_login_popup = true;
        tx.send(LoginPollResult::Error("login timed out after 300s".to_string()))
            .expect("send error");

        tick(&mut app);

        assert!(app.login_receiver.is_none());
        assert!(!app.show_login_popup);
        assert_eq!(
            app.toast_message.as_deref(),
            Some("Login failed: login timed out after 300s")
        );
    }
}
