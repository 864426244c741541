//! Zoom limit tracking with a sticky preferred direction.

/// Which way the next default zoom step goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZoomDirection {
    /// Zoom in.
    #[default]
    Bigger,
    /// Zoom out.
    Smaller,
}

/// Per-session zoom state derived from the engine's limit signals.
///
/// The preferred direction only flips when the limit in that direction is
/// hit: zooming bigger until `can_zoom_in` becomes false (and out becomes
/// possible) flips to [`ZoomDirection::Smaller`], and the mirror transition
/// flips back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoomHysteresis {
    /// Engine reports room to zoom in.
    pub can_zoom_in: bool,
    /// Engine reports room to zoom out.
    pub can_zoom_out: bool,
    /// Preferred direction.
    pub direction: ZoomDirection,
}

impl Default for ZoomHysteresis {
    fn default() -> Self {
        Self {
            can_zoom_in: true,
            can_zoom_out: false,
            direction: ZoomDirection::Bigger,
        }
    }
}

impl ZoomHysteresis {
    /// Back to the fully zoomed out state used after a new layout.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record new limit flags. Returns true if the preferred direction flipped.
    pub fn observe(&mut self, can_in: bool, can_out: bool) -> bool {
        let changed = can_in != self.can_zoom_in || can_out != self.can_zoom_out;
        self.can_zoom_in = can_in;
        self.can_zoom_out = can_out;
        if !changed {
            return false;
        }
        let next = match self.direction {
            ZoomDirection::Bigger if !can_in && can_out => ZoomDirection::Smaller,
            ZoomDirection::Smaller if can_in && !can_out => ZoomDirection::Bigger,
            d => d,
        };
        let flipped = next != self.direction;
        self.direction = next;
        flipped
    }

    /// Default zoom step for the preferred direction.
    pub fn step(&self) -> i32 {
        match self.direction {
            ZoomDirection::Bigger => 1,
            ZoomDirection::Smaller => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zoomed_out_preferring_bigger() {
        let z = ZoomHysteresis::default();
        assert!(z.can_zoom_in);
        assert!(!z.can_zoom_out);
        assert_eq!(z.direction, ZoomDirection::Bigger);
        assert_eq!(z.step(), 1);
    }

    #[test]
    fn hitting_max_flips_to_smaller_and_back() {
        let mut z = ZoomHysteresis::default();
        // somewhere in the middle: both possible, no flip
        assert!(!z.observe(true, true));
        assert_eq!(z.direction, ZoomDirection::Bigger);
        // hit the zoom-in limit
        assert!(z.observe(false, true));
        assert_eq!(z.direction, ZoomDirection::Smaller);
        assert_eq!(z.step(), -1);
        // back to the middle keeps Smaller
        assert!(!z.observe(true, true));
        assert_eq!(z.direction, ZoomDirection::Smaller);
        // fully out again
        assert!(z.observe(true, false));
        assert_eq!(z.direction, ZoomDirection::Bigger);
    }

    #[test]
    fn unchanged_or_unrelated_states_never_flip() {
        let mut z = ZoomHysteresis::default();
        assert!(!z.observe(true, false));
        assert!(!z.observe(false, false));
        assert_eq!(z.direction, ZoomDirection::Bigger);
        assert!(!z.observe(true, false));
        assert_eq!(z.direction, ZoomDirection::Bigger);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut z = ZoomHysteresis::default();
        z.observe(false, true);
        z.reset();
        assert_eq!(z, ZoomHysteresis::default());
    }
}
