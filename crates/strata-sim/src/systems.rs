//! Read-only reporting systems run after each tick's mutations.

use strata_ecs::Registry;
use strata_tick::System;

use crate::components::{Clock, Energy, Position, Resting, Velocity};

/// Counts moving and resting agents.
#[derive(Debug, Default)]
pub struct Census {
    pub moving: usize,
    pub resting: usize,
    pub peak_resting: usize,
}

impl System<Clock> for Census {
    fn update(&mut self, registry: &Registry, clock: &Clock) {
        self.moving = registry
            .view::<(Position, Velocity)>()
            .exclude::<(Resting,)>()
            .count();
        self.resting = registry.view::<(Resting,)>().count();
        self.peak_resting = self.peak_resting.max(self.resting);

        tracing::debug!(
            tick = clock.tick,
            moving = self.moving,
            resting = self.resting,
            "census"
        );
    }
}

/// Tracks the bounding box of every agent.
#[derive(Debug, Default)]
pub struct Extent {
    pub min: Position,
    pub max: Position,
}

impl System<Clock> for Extent {
    fn update(&mut self, registry: &Registry, clock: &Clock) {
        let mut min = Position {
            x: f32::INFINITY,
            y: f32::INFINITY,
        };
        let mut max = Position {
            x: f32::NEG_INFINITY,
            y: f32::NEG_INFINITY,
        };

        registry.view::<(Position,)>().for_each(|_, (pos,)| {
            min.x = min.x.min(pos.x);
            min.y = min.y.min(pos.y);
            max.x = max.x.max(pos.x);
            max.y = max.y.max(pos.y);
        });

        self.min = min;
        self.max = max;

        tracing::trace!(tick = clock.tick, ?min, ?max, "extent");
    }
}

/// Mean energy of all agents.
#[derive(Debug, Default)]
pub struct EnergyGauge {
    pub mean: f32,
}

impl System<Clock> for EnergyGauge {
    fn update(&mut self, registry: &Registry, _: &Clock) {
        let rows = registry.view::<(Energy,)>().collect();
        if rows.is_empty() {
            self.mean = 0.0;
            return;
        }
        let total: f32 = rows.iter().map(|row| row.components().0.0).sum();
        self.mean = total / rows.len() as f32;
    }
}

/// Verifies the storage invariants of every archetype.
#[derive(Debug, Default)]
pub struct Audit {
    pub violations: usize,
}

impl System<Clock> for Audit {
    fn update(&mut self, registry: &Registry, clock: &Clock) {
        for archetype in registry.archetypes().iter() {
            if !archetype.is_consistent() {
                self.violations += 1;
                tracing::error!(tick = clock.tick, ?archetype, "ragged archetype");
            }
        }
    }
}
