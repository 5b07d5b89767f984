//! Agent components.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

/// Stamina. Moving drains it; resting restores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Energy(pub f32);

impl Energy {
    pub const MAX: f32 = 100.0;
}

impl Default for Energy {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

/// Marker for agents that ran out of energy and stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resting;

/// Per-tick context handed to every reporting system.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub tick: u64,
    pub dt: f32,
}
