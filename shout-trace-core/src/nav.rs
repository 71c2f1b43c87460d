use serde::{Deserialize, Serialize};

use crate::reader::LineWindow;

/// Offset meaning "from the end of the file" for both read directions.
pub const END_OF_FILE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavAction {
    First,
    Prev,
    Next,
    Last,
    Play,
    Pause,
}

impl NavAction {
    pub fn label(self) -> &'static str {
        match self {
            NavAction::First => "|<",
            NavAction::Prev => "<<",
            NavAction::Next => ">>",
            NavAction::Last => ">|",
            NavAction::Play => "=>",
            NavAction::Pause => "||",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            NavAction::First => "First",
            NavAction::Prev => "Prev",
            NavAction::Next => "Next",
            NavAction::Last => "Last",
            NavAction::Play => "Play",
            NavAction::Pause => "Pause",
        }
    }
}

/// Where a navigation control leads: the offset to request next, whether
/// that read goes backward, and whether auto-refresh is on afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavTarget {
    pub action: NavAction,
    pub offset: i64,
    pub backward: bool,
    pub play: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub first: NavTarget,
    pub prev: NavTarget,
    pub next: NavTarget,
    pub last: NavTarget,
    /// `Pause` while playing, `Play` otherwise.
    pub toggle: NavTarget,
}

impl Navigation {
    pub fn for_window(window: &LineWindow, playing: bool) -> Self {
        Self {
            first: first(playing),
            prev: prev(window, playing),
            next: next(window, playing),
            last: last(playing),
            toggle: toggle_play(window, playing),
        }
    }

    /// Controls in display order.
    pub fn targets(&self) -> [NavTarget; 5] {
        [self.first, self.prev, self.next, self.last, self.toggle]
    }
}

pub fn first(playing: bool) -> NavTarget {
    NavTarget {
        action: NavAction::First,
        offset: 0,
        backward: false,
        play: playing,
    }
}

/// The previous page ends where this one starts.
pub fn prev(window: &LineWindow, playing: bool) -> NavTarget {
    NavTarget {
        action: NavAction::Prev,
        offset: window.start_offset as i64,
        backward: true,
        play: playing,
    }
}

/// Continues three quarters into the window so pages overlap.
pub fn next(window: &LineWindow, playing: bool) -> NavTarget {
    let offset = window
        .lines
        .get(window.lines.len() * 3 / 4)
        .map_or(END_OF_FILE, |line| line.offset as i64);
    NavTarget {
        action: NavAction::Next,
        offset,
        backward: false,
        play: playing,
    }
}

pub fn last(playing: bool) -> NavTarget {
    NavTarget {
        action: NavAction::Last,
        offset: END_OF_FILE,
        backward: true,
        play: playing,
    }
}

pub fn toggle_play(window: &LineWindow, playing: bool) -> NavTarget {
    NavTarget {
        action: if playing {
            NavAction::Pause
        } else {
            NavAction::Play
        },
        offset: window.start_offset as i64,
        backward: false,
        play: !playing,
    }
}
