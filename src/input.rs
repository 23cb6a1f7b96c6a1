use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

/// Step size, in scene units, for moving a dragged entity with the arrows.
pub(crate) const NUDGE: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum HostAction {
    CycleSelection,
    ToggleDrag,
    Nudge(f32, f32),
    PlaceNextItem,
    OpenCashIn,
    AcceptCashIn,
    DeclineCashIn,
    Quit,
}

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

pub(crate) fn collect_input_nonblocking() -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();
    while event::poll(Duration::ZERO)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

/// While the cash-in prompt is up only its answers (and quit) are live.
pub(crate) fn map_event_to_action(confirming: bool, ev: InputEvent) -> Option<HostAction> {
    if matches!(ev.key, KeyCode::Char('c') | KeyCode::Char('C'))
        && ev.mods.contains(KeyModifiers::CONTROL)
    {
        return Some(HostAction::Quit);
    }
    if matches!(ev.key, KeyCode::Char('q') | KeyCode::Char('Q')) {
        return Some(HostAction::Quit);
    }

    if confirming {
        return match ev.key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                Some(HostAction::AcceptCashIn)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                Some(HostAction::DeclineCashIn)
            }
            _ => None,
        };
    }

    match ev.key {
        KeyCode::Tab => Some(HostAction::CycleSelection),
        KeyCode::Char(' ') => Some(HostAction::ToggleDrag),
        KeyCode::Left => Some(HostAction::Nudge(-NUDGE, 0.0)),
        KeyCode::Right => Some(HostAction::Nudge(NUDGE, 0.0)),
        KeyCode::Up => Some(HostAction::Nudge(0.0, -NUDGE)),
        KeyCode::Down => Some(HostAction::Nudge(0.0, NUDGE)),
        KeyCode::Char('b') | KeyCode::Char('B') => Some(HostAction::PlaceNextItem),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(HostAction::OpenCashIn),
        _ => None,
    }
}
