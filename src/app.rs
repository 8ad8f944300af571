use crate::config::Config;
use crate::integrations::backend::TaskApi;
use crate::integrations::login::{LoginDisplay, LoginPoll};
use crate::models::{ComposerField, InputMode, NavigateFocus, Session, Task, TaskId};
use crate::sync::{Notice, TaskSync};
use chrono::{DateTime, Duration, Local};
use ratatui::widgets::ListState;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use tracing::info;
use tui_textarea::{CursorMove, TextArea};

const PLACEHOLDER_TITLE: &str = "Task Title";
const PLACEHOLDER_DESCRIPTION: &str = "Task Description";
const TOAST_SECONDS: i64 = 4;

/// Everything the running client owns. Rendering and input handlers borrow it;
/// nothing lives outside it.
pub struct App<'a> {
    pub config: Config,
    pub api: Arc<dyn TaskApi>,
    pub input_mode: InputMode,
    pub navigate_focus: NavigateFocus,

    pub session: Option<Session>,
    pub sync: Option<TaskSync>,
    pub pending_state: ListState,
    pub completed_state: ListState,

    pub title_input: TextArea<'a>,
    pub description_input: TextArea<'a>,
    pub composer_field: ComposerField,
    pub editing_task: Option<TaskId>,

    pub resolve_receiver: Option<Receiver<Option<Session>>>,
    /// Dropping this stops the callback listener.
    pub login_receiver: Option<LoginPoll>,
    pub login_display: Option<LoginDisplay>,

    pub show_login_popup: bool,
    pub show_help_popup: bool,
    pub show_delete_popup: bool,
    pub delete_target: Option<Task>,
    /// Blocking notice; input is swallowed until it is dismissed.
    pub alert_message: Option<String>,

    pub toast_message: Option<String>,
    pub toast_is_error: bool,
    pub toast_expiry: Option<DateTime<Local>>,
    pub should_quit: bool,
}

impl<'a> App<'a> {
    pub fn new(config: Config, api: Arc<dyn TaskApi>) -> App<'a> {
        App {
            config,
            api,
            input_mode: InputMode::Navigate,
            navigate_focus: NavigateFocus::Pending,
            session: None,
            sync: None,
            pending_state: ListState::default(),
            completed_state: ListState::default(),
            title_input: new_input(PLACEHOLDER_TITLE, ""),
            description_input: new_input(PLACEHOLDER_DESCRIPTION, ""),
            composer_field: ComposerField::Title,
            editing_task: None,
            resolve_receiver: None,
            login_receiver: None,
            login_display: None,
            show_login_popup: false,
            show_help_popup: false,
            show_delete_popup: false,
            delete_target: None,
            alert_message: None,
            toast_message: None,
            toast_is_error: false,
            toast_expiry: None,
            should_quit: false,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_resolving(&self) -> bool {
        self.resolve_receiver.is_some()
    }

    /// Installs a confirmed session and kicks off the first full fetch.
    pub fn start_session(&mut self, session: Session) {
        info!(user_id = %session.user_id, "starting session");
        let mut sync = TaskSync::new(Arc::clone(&self.api), session.user_id.clone());
        sync.sync();
        self.sync = Some(sync);
        self.session = Some(session);
        self.navigate_focus = NavigateFocus::Pending;
        self.pending_state = ListState::default();
        self.completed_state = ListState::default();
    }

    /// Back to the state of a fresh start: no session, no tasks, no popups.
    pub fn reset_to_anonymous(&mut self) {
        let config = self.config.clone();
        let api = Arc::clone(&self.api);
        *self = App::new(config, api);
    }

    pub fn toast(&mut self, message: impl Into<String>) {
        self.set_toast(message.into(), false);
    }

    pub fn toast_error(&mut self, message: impl Into<String>) {
        self.set_toast(message.into(), true);
    }

    fn set_toast(&mut self, message: String, is_error: bool) {
        self.toast_message = Some(message);
        self.toast_is_error = is_error;
        self.toast_expiry = Some(Local::now() + Duration::seconds(TOAST_SECONDS));
    }

    /// Only one alert is shown at a time; a newer one replaces the old.
    pub fn alert(&mut self, message: impl Into<String>) {
        self.alert_message = Some(message.into());
    }

    pub fn apply_notices(&mut self, notices: Vec<Notice>) {
        for notice in notices {
            match notice {
                Notice::Alert(message) => self.alert(message),
                Notice::Toast(message) => self.toast_error(message),
            }
        }
    }

    pub fn transition_to(&mut self, mode: InputMode) {
        if mode == InputMode::Editing {
            self.composer_field = ComposerField::Title;
        }
        self.input_mode = mode;
    }

    pub fn pending_tasks(&self) -> Vec<&Task> {
        self.sync
            .as_ref()
            .map(|sync| sync.pending().collect())
            .unwrap_or_default()
    }

    pub fn completed_tasks(&self) -> Vec<&Task> {
        self.sync
            .as_ref()
            .map(|sync| sync.completed().collect())
            .unwrap_or_default()
    }

    pub fn selected_task(&self) -> Option<Task> {
        let (tasks, state) = match self.navigate_focus {
            NavigateFocus::Pending => (self.pending_tasks(), &self.pending_state),
            NavigateFocus::Completed => (self.completed_tasks(), &self.completed_state),
        };
        state.selected().and_then(|i| tasks.get(i).map(|task| (*task).clone()))
    }

    pub fn set_focus(&mut self, focus: NavigateFocus) {
        self.navigate_focus = focus;
        self.clamp_selection();
    }

    pub fn select_next(&mut self) {
        let len = self.focused_len();
        let state = self.focused_state_mut();
        if len == 0 {
            state.select(None);
            return;
        }
        let next = state.selected().map_or(0, |i| (i + 1).min(len - 1));
        state.select(Some(next));
    }

    pub fn select_prev(&mut self) {
        let len = self.focused_len();
        let state = self.focused_state_mut();
        if len == 0 {
            state.select(None);
            return;
        }
        let prev = state.selected().map_or(0, |i| i.saturating_sub(1));
        state.select(Some(prev));
    }

    /// Keeps both selections inside their lists after a snapshot replacement.
    pub fn clamp_selection(&mut self) {
        let pending_len = self.pending_tasks().len();
        let completed_len = self.completed_tasks().len();
        clamp(&mut self.pending_state, pending_len);
        clamp(&mut self.completed_state, completed_len);
    }

    fn focused_len(&self) -> usize {
        match self.navigate_focus {
            NavigateFocus::Pending => self.pending_tasks().len(),
            NavigateFocus::Completed => self.completed_tasks().len(),
        }
    }

    fn focused_state_mut(&mut self) -> &mut ListState {
        match self.navigate_focus {
            NavigateFocus::Pending => &mut self.pending_state,
            NavigateFocus::Completed => &mut self.completed_state,
        }
    }

    pub fn begin_compose(&mut self) {
        if self.editing_task.is_some() {
            self.clear_composer();
        }
        self.transition_to(InputMode::Editing);
    }

    /// Loads a task into the composer; submitting then edits instead of adding.
    pub fn begin_edit(&mut self, task: &Task) {
        self.title_input = new_input(PLACEHOLDER_TITLE, &task.title);
        self.description_input = new_input(PLACEHOLDER_DESCRIPTION, &task.description);
        self.editing_task = Some(task.id.clone());
        self.transition_to(InputMode::Editing);
    }

    pub fn clear_composer(&mut self) {
        self.title_input = new_input(PLACEHOLDER_TITLE, "");
        self.description_input = new_input(PLACEHOLDER_DESCRIPTION, "");
        self.editing_task = None;
        self.composer_field = ComposerField::Title;
    }

    pub fn composer_title(&self) -> String {
        self.title_input.lines().join(" ")
    }

    pub fn composer_description(&self) -> String {
        self.description_input.lines().join("\n")
    }

    pub fn active_input_mut(&mut self) -> &mut TextArea<'a> {
        match self.composer_field {
            ComposerField::Title => &mut self.title_input,
            ComposerField::Description => &mut self.description_input,
        }
    }

    pub fn toggle_composer_field(&mut self) {
        self.composer_field = match self.composer_field {
            ComposerField::Title => ComposerField::Description,
            ComposerField::Description => ComposerField::Title,
        };
    }
}

fn new_input<'a>(placeholder: &str, content: &str) -> TextArea<'a> {
    let mut input = TextArea::new(vec![content.to_string()]);
    input.set_placeholder_text(placeholder);
    input.move_cursor(CursorMove::End);
    input
}

fn clamp(state: &mut ListState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), len) if i >= len => state.select(Some(len - 1)),
        _ => {}
    }
}
