use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::Page;

#[derive(Debug, Clone)]
pub enum AppAction {
    Quit,
    GoTo(Page),
    NextPage,
    CyclePeriod,
    Refresh,
    ScrollUp,
    ScrollDown,
    MoreVideos,
    FewerVideos,
    ShowHelp,
    HideHelp,
}

pub fn handle_key_event(key: KeyEvent, show_help: bool) -> Option<AppAction> {
    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => Some(AppAction::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),

        (KeyCode::Char('1'), _) => Some(AppAction::GoTo(Page::Analytics)),
        (KeyCode::Char('2'), _) => Some(AppAction::GoTo(Page::Videos)),
        (KeyCode::Char('3'), _) => Some(AppAction::GoTo(Page::ArchitectureOverview)),
        (KeyCode::Char('4'), _) => Some(AppAction::GoTo(Page::ArchitectureDeepdive)),
        (KeyCode::Tab, _) => Some(AppAction::NextPage),

        (KeyCode::Char('p'), _) => Some(AppAction::CyclePeriod),
        (KeyCode::Char('r'), _) => Some(AppAction::Refresh),

        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::ScrollDown),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::ScrollUp),

        (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => Some(AppAction::MoreVideos),
        (KeyCode::Char('-'), _) => Some(AppAction::FewerVideos),

        (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),

        _ => None,
    }
}
