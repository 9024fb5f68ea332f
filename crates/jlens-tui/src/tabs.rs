//! Roving-focus state machine for the project tab strip.
//!
//! Exactly one tab is reachable by sequential navigation at a time: the
//! focused tab if any, else the selected one, else the first. Arrow keys
//! move focus circularly; Enter/Space select the focused tab. Selection
//! made from the keyboard moves focus to the detail region once — tracked
//! by comparing the current against the previously selected id, so a
//! re-render with an unchanged selection never steals focus.

/// Focus position within the tab strip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabStrip {
    focus: Option<usize>,
}

impl TabStrip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<usize> {
        self.focus
    }

    /// Clamps focus after the tab list changed length.
    pub fn sync(&mut self, len: usize) {
        match self.focus {
            Some(_) if len == 0 => self.focus = None,
            Some(idx) if idx >= len => self.focus = Some(len - 1),
            _ => {}
        }
    }

    pub fn clear(&mut self) {
        self.focus = None;
    }

    pub fn set_focus(&mut self, focus: Option<usize>) {
        self.focus = focus;
    }

    /// Moves focus one tab right, wrapping at the end.
    pub fn focus_next(&mut self, len: usize) {
        if len == 0 {
            self.focus = None;
            return;
        }
        self.focus = Some(match self.focus {
            Some(idx) => (idx + 1) % len,
            None => 0,
        });
    }

    /// Moves focus one tab left, wrapping at the start.
    pub fn focus_prev(&mut self, len: usize) {
        if len == 0 {
            self.focus = None;
            return;
        }
        self.focus = Some(match self.focus {
            Some(0) | None => len - 1,
            Some(idx) => idx - 1,
        });
    }

    /// The single tab reachable by sequential navigation.
    pub fn reachable(&self, selected_idx: Option<usize>, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        self.focus.or(selected_idx).or(Some(0))
    }
}

/// Where focus lands after a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    None,
    Detail,
    Tab(usize),
}

/// Focus policy applied after every render: a keyboard-originated change
/// of selection focuses the detail region exactly once; otherwise a
/// keyboard interaction keeps focus on the selected tab.
pub fn resolve_focus_after_render(
    keyboard: bool,
    selected_id: Option<&str>,
    last_selected_id: Option<&str>,
    selected_idx: Option<usize>,
) -> FocusTarget {
    if !keyboard {
        return FocusTarget::None;
    }
    if selected_id.is_some() && selected_id != last_selected_id {
        return FocusTarget::Detail;
    }
    match selected_idx {
        Some(idx) => FocusTarget::Tab(idx),
        None => FocusTarget::None,
    }
}
