//! Agent simulation on a strata registry.
//!
//! Each tick:
//! 1. Moving agents advance and burn energy
//! 2. Exhausted agents swap `Velocity` for `Resting`; rested ones swap back
//! 3. A few agents expire and new ones arrive
//! 4. The reporting systems read the registry through a `SystemGroup`
//!
//! Configuration comes from the environment:
//! - `SIM_AGENTS` - initial agent count (default 1000)
//! - `SIM_TICKS` - ticks to run (default 200)
//! - `SIM_SEED` - RNG seed (default 7)

mod components;
mod systems;

use rand::{Rng, SeedableRng, rngs::StdRng};
use strata_ecs::{Entity, Registry, RegistryConfig};
use strata_tick::{System, SystemGroup};
use tracing::info;

use crate::{
    components::{Clock, Energy, Position, Resting, Velocity},
    systems::{Audit, Census, EnergyGauge, Extent},
};

const DT: f32 = 0.1;
const DRAIN_PER_SECOND: f32 = 40.0;
const REST_PER_SECOND: f32 = 25.0;
const TURNOVER: f64 = 0.02;

struct SimConfig {
    agents: usize,
    ticks: u64,
    seed: u64,
}

impl SimConfig {
    fn from_env() -> Self {
        Self {
            agents: env_or("SIM_AGENTS", 1000),
            ticks: env_or("SIM_TICKS", 200),
            seed: env_or("SIM_SEED", 7),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn random_velocity(rng: &mut StdRng) -> Velocity {
    Velocity {
        dx: rng.gen_range(-1.0..1.0),
        dy: rng.gen_range(-1.0..1.0),
    }
}

fn spawn_agent(registry: &mut Registry, rng: &mut StdRng) -> Entity {
    let position = Position {
        x: rng.gen_range(-50.0..50.0),
        y: rng.gen_range(-50.0..50.0),
    };
    let energy = Energy(rng.gen_range(10.0..Energy::MAX));
    registry.spawn((position, random_velocity(rng), energy))
}

/// Apply one tick of movement and state changes.
fn step(registry: &mut Registry, rng: &mut StdRng) {
    registry
        .view_mut::<(Position, Velocity, Energy)>()
        .exclude::<(Resting,)>()
        .for_each(|_, (pos, vel, energy)| {
            pos.x += vel.dx * DT;
            pos.y += vel.dy * DT;
            energy.0 -= DRAIN_PER_SECOND * DT * vel.dx.hypot(vel.dy);
        });

    registry
        .view_mut::<(Energy, Resting)>()
        .for_each(|_, (energy, _)| energy.0 = (energy.0 + REST_PER_SECOND * DT).min(Energy::MAX));

    let exhausted: Vec<Entity> = registry
        .view::<(Energy, Velocity)>()
        .collect()
        .into_iter()
        .filter(|row| row.components().0.0 <= 0.0)
        .map(Entity::from)
        .collect();

    for entity in exhausted {
        registry.detach::<(Velocity,)>(entity);
        registry.attach_default::<Resting>(entity);
    }

    let rested: Vec<Entity> = registry
        .view::<(Energy, Resting)>()
        .collect()
        .into_iter()
        .filter(|row| row.components().0.0 >= Energy::MAX)
        .map(Entity::from)
        .collect();

    for entity in rested {
        registry.detach::<(Resting,)>(entity);
        registry.attach(entity, random_velocity(rng));
    }

    let expiring: Vec<Entity> = registry
        .entities()
        .filter(|_| rng.gen_bool(TURNOVER))
        .collect();

    for entity in &expiring {
        registry.destroy(*entity);
    }
    for _ in &expiring {
        spawn_agent(registry, rng);
    }
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strata_sim=info".parse()?)
                .add_directive("strata_ecs=warn".parse()?)
                .add_directive("strata_tick=warn".parse()?),
        )
        .init();

    let config = SimConfig::from_env();
    info!(
        agents = config.agents,
        ticks = config.ticks,
        seed = config.seed,
        "starting simulation"
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut registry = Registry::with_config(
        RegistryConfig::default()
            .with_name_prefix("agent_")
            .with_entity_capacity(config.agents),
    );

    for _ in 0..config.agents {
        spawn_agent(&mut registry, &mut rng);
    }

    let mut diagnostics: SystemGroup<Clock> = SystemGroup::new();
    diagnostics.attach(0, Audit::default());
    diagnostics.attach(1, EnergyGauge::default());

    let mut reports: SystemGroup<Clock> = SystemGroup::new();
    reports.attach(0, Census::default());
    reports.attach(10, Extent::default());
    reports.attach(20, diagnostics);

    for tick in 0..config.ticks {
        step(&mut registry, &mut rng);
        reports.update(&registry, &Clock { tick, dt: DT });
    }

    let census = reports
        .find::<Census>()
        .ok_or_else(|| eyre::eyre!("census system missing"))?;
    let diagnostics = reports
        .find::<SystemGroup<Clock>>()
        .ok_or_else(|| eyre::eyre!("diagnostics group missing"))?;
    let violations = diagnostics.find::<Audit>().map_or(0, |audit| audit.violations);
    let mean_energy = diagnostics.find::<EnergyGauge>().map_or(0.0, |gauge| gauge.mean);

    if let Some(extent) = reports.find::<Extent>() {
        info!(min = ?extent.min, max = ?extent.max, "final extent");
    }

    info!(
        entities = registry.len(),
        archetypes = registry.archetypes().len(),
        component_types = strata_ecs::registered_count(),
        moving = census.moving,
        resting = census.resting,
        peak_resting = census.peak_resting,
        mean_energy,
        "simulation finished"
    );

    if violations > 0 {
        eyre::bail!("{violations} storage invariant violations");
    }

    Ok(())
}
