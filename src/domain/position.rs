//! Position tracking and signal-to-action translation.
//!
//! The tracker enforces a single open position: a signal only produces an
//! action when its direction differs from the position currently held.
//! Actions are attached to the row following the one that produced the
//! signal, so a sequence of `n` signals yields `n - 1` actions.

use std::fmt;

use super::signal::Signal;

/// Net position held by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Short => write!(f, "short"),
            Position::Flat => write!(f, "flat"),
            Position::Long => write!(f, "long"),
        }
    }
}

/// Side of an order sent to the execution sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Position-change instruction derived from a signal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    OpenLong,
    OpenShort,
    #[default]
    Hold,
}

impl Action {
    /// Order direction for actions that trade; `None` for `Hold`.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Action::OpenLong => Some(Direction::Long),
            Action::OpenShort => Some(Direction::Short),
            Action::Hold => None,
        }
    }

    pub fn is_trade(self) -> bool {
        self != Action::Hold
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::OpenLong => "OPEN_LONG",
            Action::OpenShort => "OPEN_SHORT",
            Action::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateful reduction of signal sequences into action sequences.
///
/// The position persists across calls to [`PositionTracker::translate`];
/// only [`PositionTracker::reset`] returns it to flat.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    position: Position,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(position: Position) -> Self {
        Self { position }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Translate a single signal against the held position.
    pub fn step(&mut self, signal: Signal) -> Action {
        match signal {
            Signal::Long if self.position != Position::Long => {
                self.position = Position::Long;
                Action::OpenLong
            }
            Signal::Short if self.position != Position::Short => {
                self.position = Position::Short;
                Action::OpenShort
            }
            _ => Action::Hold,
        }
    }

    /// Translate `signals[1..]` into actions. The leading signal has no row
    /// to act on and is skipped; empty and single-element input yields no
    /// actions.
    pub fn translate(&mut self, signals: &[Signal]) -> Vec<Action> {
        signals.iter().skip(1).map(|&s| self.step(s)).collect()
    }

    pub fn reset(&mut self) {
        self.position = Position::Flat;
    }
}
