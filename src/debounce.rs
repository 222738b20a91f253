//! Debounced digital inputs.
//!
//! A [`Debouncer`] samples an [`InputPin`] from the periodic task and only reports a
//! change after two consecutive samples agree on the new level. A single-sample glitch
//! goes back to the previous stable state without an edge.
//!
//! ```text
//!        high          low            low
//!   Up ───────▶ Up ─────────▶ Falling ─────────▶ Down   (Edge::Falling)
//!                               │ high
//!                               ▼
//!                               Up
//! ```
//!
//! The released (high) level is `Up`, matching pull-up buttons that read low when pressed.

use embedded_hal::digital::InputPin;

/// Debouncer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum DebounceState {
    /// Stable high.
    #[default]
    Up,
    /// Stable low.
    Down,
    /// Was high, one low sample seen.
    Falling,
    /// Was low, one high sample seen.
    Rising,
}

/// A confirmed level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Edge {
    /// Low to high.
    Rising,
    /// High to low.
    Falling,
}

/// Two-sample debouncer over one input pin.
#[derive(Debug)]
pub struct Debouncer<P> {
    /// The sampled pin.
    pub pin: P,
    state: DebounceState,
}

impl<P: InputPin> Debouncer<P> {
    /// Creates a debouncer that assumes the input starts released (high).
    pub const fn new(pin: P) -> Self {
        Self {
            pin,
            state: DebounceState::Up,
        }
    }

    /// Reads the pin once and advances the state machine.
    ///
    /// # Returns
    /// * `Ok(Some(edge))` when a new level has been confirmed
    /// * `Ok(None)` otherwise
    /// * `Err(e)` if the pin could not be read; the state is unchanged
    pub fn sample(&mut self) -> Result<Option<Edge>, P::Error> {
        let high = self.pin.is_high()?;
        let (next, edge) = match (self.state, high) {
            (DebounceState::Up, false) => (DebounceState::Falling, None),
            (DebounceState::Down, true) => (DebounceState::Rising, None),
            (DebounceState::Falling, false) => (DebounceState::Down, Some(Edge::Falling)),
            (DebounceState::Falling, true) => (DebounceState::Up, None),
            (DebounceState::Rising, true) => (DebounceState::Up, Some(Edge::Rising)),
            (DebounceState::Rising, false) => (DebounceState::Down, None),
            (state, _) => (state, None),
        };
        self.state = next;
        Ok(edge)
    }

    /// Current state.
    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Last confirmed level.
    pub fn is_high(&self) -> bool {
        matches!(self.state, DebounceState::Up | DebounceState::Falling)
    }
}
