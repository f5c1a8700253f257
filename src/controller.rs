use std::time::Duration;
use tracing::trace;

use crate::domain::{AppConfig, ConsoleError, Message};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits up to the poll time for a terminal event. While the search box
    /// is active every key press is passed on unmapped.
    pub fn handle_event(&self, raw_keyevents: bool) -> Result<Option<Message>, ConsoleError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            if raw_keyevents {
                return Ok(Some(Message::RawKey(key)));
            }
            return Ok(self.handle_key(key));
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageDown | KeyCode::Char('n'), _) => Some(Message::NextPage),
            (KeyCode::PageUp | KeyCode::Char('p'), _) => Some(Message::PrevPage),
            (KeyCode::Home | KeyCode::Char('g'), _) => Some(Message::FirstPage),
            (KeyCode::End | KeyCode::Char('G'), _) => Some(Message::LastPage),
            (KeyCode::Char('+'), _) => Some(Message::CyclePageSize),
            (KeyCode::Enter | KeyCode::Char('s'), _) => Some(Message::SortSelected),
            (KeyCode::Char(c @ '1'..='9'), _) => c
                .to_digit(10)
                .map(|d| Message::SortColumn(d as usize - 1)),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('c'), _) => Some(Message::ClearSearch),
            (KeyCode::Char('r'), _) => Some(Message::Reload),
            (KeyCode::Char('d') | KeyCode::Delete, _) => Some(Message::Delete),
            (KeyCode::Char('y'), _) => Some(Message::Confirm),
            (KeyCode::Esc | KeyCode::Char('N'), _) => Some(Message::Exit),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn map(code: KeyCode) -> Option<Message> {
        Controller::new(&AppConfig::default()).handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn column_numbers_are_one_based() {
        assert_eq!(map(KeyCode::Char('1')), Some(Message::SortColumn(0)));
        assert_eq!(map(KeyCode::Char('9')), Some(Message::SortColumn(8)));
        assert_eq!(map(KeyCode::Char('0')), None);
    }

    #[test]
    fn navigation_and_actions() {
        assert_eq!(map(KeyCode::Char('q')), Some(Message::Quit));
        assert_eq!(map(KeyCode::PageDown), Some(Message::NextPage));
        assert_eq!(map(KeyCode::Char('/')), Some(Message::Search));
        assert_eq!(map(KeyCode::Char('d')), Some(Message::Delete));
        assert_eq!(map(KeyCode::Char('y')), Some(Message::Confirm));
        assert_eq!(map(KeyCode::Esc), Some(Message::Exit));
        assert_eq!(map(KeyCode::Char('+')), Some(Message::CyclePageSize));
    }

    #[test]
    fn control_c_quits() {
        let controller = Controller::new(&AppConfig::default());
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(controller.handle_key(key), Some(Message::Quit));
        assert_eq!(map(KeyCode::Char('c')), Some(Message::ClearSearch));
    }
}
