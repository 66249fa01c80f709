//! Key bindings and the `:` command prompt.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::message::Command;

/// What a key press asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run a command.
    Run(Command),
    /// The prompt held something that is not a command.
    Invalid(String),
    /// Move the row selection by this many rows.
    Select(isize),
    /// Open the selected row.
    OpenSelected,
    /// Toggle between inbox and sent.
    NextView,
}

/// Input state: either single-key navigation or an open prompt.
#[derive(Debug, Default)]
pub struct Prompt {
    buffer: Option<String>,
}

impl Prompt {
    /// Text typed so far while the prompt is open.
    pub fn text(&self) -> Option<&str> {
        self.buffer.as_deref()
    }

    /// Handles one key event.
    pub fn on_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Action::Run(Command::Quit));
        }
        match self.buffer.as_mut() {
            Some(buffer) => match key.code {
                KeyCode::Char(c) => {
                    buffer.push(c);
                    None
                }
                KeyCode::Backspace => {
                    if buffer.pop().is_none() {
                        self.buffer = None;
                    }
                    None
                }
                KeyCode::Esc => {
                    self.buffer = None;
                    None
                }
                KeyCode::Enter => {
                    let line = self.buffer.take().unwrap_or_default();
                    match Command::parse(&line) {
                        Ok(command) => command.map(Action::Run),
                        Err(e) => Some(Action::Invalid(e)),
                    }
                }
                _ => None,
            },
            None => self.navigate(key.code),
        }
    }

    fn navigate(&mut self, code: KeyCode) -> Option<Action> {
        let action = match code {
            KeyCode::Char('q') => Action::Run(Command::Quit),
            KeyCode::Char('r') => Action::Run(Command::Refresh),
            KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
                Action::Run(Command::NextPage)
            }
            KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => Action::Run(Command::PrevPage),
            KeyCode::Char('f') => Action::Run(Command::ToggleFlagged),
            KeyCode::Char('b') | KeyCode::Esc => Action::Run(Command::Back),
            KeyCode::Up | KeyCode::Char('k') => Action::Select(-1),
            KeyCode::Down | KeyCode::Char('j') => Action::Select(1),
            KeyCode::Enter => Action::OpenSelected,
            KeyCode::Tab => Action::NextView,
            KeyCode::Char(':') => {
                self.buffer = Some(String::new());
                return None;
            }
            // Commands that take an argument open the prompt pre-filled.
            KeyCode::Char(c @ ('o' | 'i' | 's' | 'd' | 'v')) => {
                self.buffer = Some(format!("{c} "));
                return None;
            }
            _ => return None,
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailguard_core::{EmailId, ProcessingStatus};

    fn press(prompt: &mut Prompt, code: KeyCode) -> Option<Action> {
        prompt.on_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_line(prompt: &mut Prompt, text: &str) -> Option<Action> {
        for c in text.chars() {
            assert_eq!(press(prompt, KeyCode::Char(c)), None);
        }
        press(prompt, KeyCode::Enter)
    }

    #[test]
    fn test_single_keys() {
        let mut prompt = Prompt::default();
        assert_eq!(press(&mut prompt, KeyCode::Char('q')), Some(Action::Run(Command::Quit)));
        assert_eq!(press(&mut prompt, KeyCode::Char('n')), Some(Action::Run(Command::NextPage)));
        assert_eq!(press(&mut prompt, KeyCode::Esc), Some(Action::Run(Command::Back)));
        assert_eq!(press(&mut prompt, KeyCode::Down), Some(Action::Select(1)));
        assert_eq!(press(&mut prompt, KeyCode::Enter), Some(Action::OpenSelected));
        assert_eq!(press(&mut prompt, KeyCode::Tab), Some(Action::NextView));
        assert_eq!(
            prompt.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Run(Command::Quit))
        );
        assert_eq!(prompt.text(), None);
    }

    #[test]
    fn test_prefilled_prompt() {
        let mut prompt = Prompt::default();
        assert_eq!(press(&mut prompt, KeyCode::Char('s')), None);
        assert_eq!(prompt.text(), Some("s "));
        assert_eq!(
            type_line(&mut prompt, "quarantined"),
            Some(Action::Run(Command::StatusFilter(Some(ProcessingStatus::Quarantined))))
        );
        assert_eq!(prompt.text(), None);

        press(&mut prompt, KeyCode::Char('o'));
        assert_eq!(type_line(&mut prompt, "#12"), Some(Action::Run(Command::Open(EmailId(12)))));
    }

    #[test]
    fn test_colon_prompt_errors_and_cancel() {
        let mut prompt = Prompt::default();
        press(&mut prompt, KeyCode::Char(':'));
        assert_eq!(
            type_line(&mut prompt, "zap"),
            Some(Action::Invalid("Unknown command: zap".into()))
        );

        press(&mut prompt, KeyCode::Char(':'));
        assert_eq!(press(&mut prompt, KeyCode::Char('q')), None);
        assert_eq!(press(&mut prompt, KeyCode::Esc), None);
        assert_eq!(prompt.text(), None);

        press(&mut prompt, KeyCode::Char(':'));
        assert_eq!(press(&mut prompt, KeyCode::Enter), None);
    }

    #[test]
    fn test_backspace_on_empty_prompt_closes_it() {
        let mut prompt = Prompt::default();
        press(&mut prompt, KeyCode::Char(':'));
        press(&mut prompt, KeyCode::Char('r'));
        press(&mut prompt, KeyCode::Backspace);
        assert_eq!(prompt.text(), Some(""));
        press(&mut prompt, KeyCode::Backspace);
        assert_eq!(prompt.text(), None);
    }
}
