use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Which key table applies, derived from the active screen.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KeyScope {
    Browse,
    Logs,
    CommandLine,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    Dismiss,
    Back,
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Enter,
    OpenLogs,
    OpenExec,
    OpenFiles,
    Refresh,
    SelectNamespace,
    SelectContext,
    ToggleFollow,
    TogglePause,
    NextContainer,
    ToggleFocus,
    Backspace,
    ClearInput,
    InputChar(char),
    Resize { width: u16, height: u16 },
}

pub fn map_key(scope: KeyScope, key: KeyEvent) -> Option<Action> {
    if is_ctrl_c(key) {
        return Some(Action::Quit);
    }

    match scope {
        KeyScope::Browse => map_browse_key(key),
        KeyScope::Logs => map_logs_key(key),
        KeyScope::CommandLine => map_command_line_key(key),
        KeyScope::Help => match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => Some(Action::Quit),
            _ => Some(Action::Dismiss),
        },
    }
}

fn is_ctrl_c(key: KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

fn map_navigation_key(key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('?') => Some(Action::Help),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Char('j') if !ctrl => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if !ctrl => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char('d') if ctrl => Some(Action::PageDown),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Char('u') if ctrl => Some(Action::PageUp),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        _ => None,
    }
}

fn map_browse_key(key: KeyEvent) -> Option<Action> {
    if let Some(action) = map_navigation_key(key) {
        return Some(action);
    }

    match key.code {
        KeyCode::Enter => Some(Action::Enter),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Tab => Some(Action::ToggleFocus),
        KeyCode::Char('l') => Some(Action::OpenLogs),
        KeyCode::Char('e') => Some(Action::OpenExec),
        KeyCode::Char('f') => Some(Action::OpenFiles),
        KeyCode::Char('n') => Some(Action::SelectNamespace),
        KeyCode::Char('c') => Some(Action::SelectContext),
        _ => None,
    }
}

fn map_logs_key(key: KeyEvent) -> Option<Action> {
    if let Some(action) = map_navigation_key(key) {
        return Some(action);
    }

    match key.code {
        KeyCode::Char('f') | KeyCode::Char('F') => Some(Action::ToggleFollow),
        KeyCode::Char(' ') => Some(Action::PageDown),
        KeyCode::Char('p') => Some(Action::TogglePause),
        KeyCode::Tab => Some(Action::NextContainer),
        _ => None,
    }
}

fn map_command_line_key(key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Enter => Some(Action::Enter),
        KeyCode::Char('m') | KeyCode::Char('j') if ctrl => Some(Action::Enter),
        KeyCode::Char('u') if ctrl => Some(Action::ClearInput),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Tab => Some(Action::ToggleFocus),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Down => Some(Action::Down),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::F(1) => Some(Action::Help),
        KeyCode::Char(c) if !ctrl && !alt => Some(Action::InputChar(c)),
        _ => None,
    }
}
