use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line editor for the search box.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize, // in chars, not bytes
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.clear_line(),
            (kc, km) => self.key(kc, km),
        }
    }

    /// Starts editing with `s` already typed in and the cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.clear();
        self.current_input = s.to_string();
        self.curser_pos = s.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.curser_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        trace!("Input finished: {}", self.current_input);
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            self.current_input.remove(self.getbytepos());
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            self.current_input.remove(self.getbytepos());
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.curser_pos = self.current_input.chars().count();
        self.get()
    }

    fn clear_line(&mut self) -> InputResult {
        self.current_input.clear();
        self.curser_pos = 0;
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.contains(KeyModifiers::CONTROL) {
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            self.current_input.insert(self.getbytepos(), chr);
            self.curser_pos += 1;
        }
        self.get()
    }

    fn getbytepos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(input: &mut Inputter, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(input: &mut Inputter, s: &str) {
        for c in s.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_and_editing() {
        let mut input = Inputter::default();
        type_str(&mut input, "bairu");
        press(&mut input, KeyCode::Left);
        type_str(&mut input, "r");
        assert_eq!(input.get().input, "bairru");

        press(&mut input, KeyCode::Home);
        press(&mut input, KeyCode::Delete);
        assert_eq!(input.get().input, "airru");

        press(&mut input, KeyCode::End);
        let result = press(&mut input, KeyCode::Backspace);
        assert_eq!(result.input, "airr");
        assert_eq!(result.curser_pos, 4);
        assert!(!result.finished);
    }

    #[test]
    fn multibyte_characters() {
        let mut input = Inputter::default();
        input.set("imobiliária");
        assert_eq!(input.get().curser_pos, 11);
        for _ in 0..3 {
            press(&mut input, KeyCode::Left);
        }
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.get().input, "imobiliria");
        press(&mut input, KeyCode::Backspace);
        type_str(&mut input, "á");
        assert_eq!(input.get().input, "imobilária");
    }

    #[test]
    fn enter_finishes_escape_cancels() {
        let mut input = Inputter::default();
        type_str(&mut input, "imob");
        let done = press(&mut input, KeyCode::Enter);
        assert!(done.finished && !done.canceled);
        assert_eq!(done.input, "imob");

        input.set("imob");
        let canceled = press(&mut input, KeyCode::Esc);
        assert!(canceled.finished && canceled.canceled);
        assert_eq!(canceled.input, "");
    }

    #[test]
    fn control_u_clears_line() {
        let mut input = Inputter::default();
        type_str(&mut input, "teste");
        let result = input.read(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(result.input, "");
        assert_eq!(result.curser_pos, 0);
    }
}
