pub(crate) mod editing;
pub(crate) mod navigate;
pub(crate) mod popups;

use crate::{app::App, models::InputMode};
use crossterm::event::{self, Event, KeyEventKind};

pub fn handle_event(app: &mut App, event: Event) {
    match event {
        Event::Mouse(mouse_event) if app.is_authenticated() => match mouse_event.kind {
            event::MouseEventKind::ScrollUp => app.select_prev(),
            event::MouseEventKind::ScrollDown => app.select_next(),
            _ => {}
        },
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            if popups::handle_popup_events(app, key) {
                return;
            }
            if !app.is_authenticated() {
                navigate::handle_home(app, key);
                return;
            }
            match app.input_mode {
                InputMode::Navigate => navigate::handle_dashboard(app, key),
                InputMode::Editing => editing::handle_editing_mode(app, key),
            }
        }
        _ => {}
    }
}
