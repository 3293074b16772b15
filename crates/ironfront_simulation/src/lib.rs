//! IRONFRONT Simulation Core
//!
//! Headless combat-resolution core RTS симуляции на Bevy 0.16 ECS:
//! - spatial: QuadField + generic spatial queries (filter × aggregator)
//! - combat: взрывы, falloff урона/impulse, deferred damage ring
//! - targeting: priority scoring целей для оружия
//!
//! Весь state — в World (components/resources), детерминизм — через
//! fixed timestep и единственный seeded RNG (`DeterministicRng`).

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod combat;
pub mod components;
pub mod config;
pub mod logger;
pub mod shared;
pub mod spatial;
pub mod targeting;

// Re-export базовых типов для удобства
pub use combat::{
    advance_frame, insert_combat_resources, resolve_explosion, CombatPlugin, DamageArray, DamageDealt, Dead,
    EntityDied, ExplosionOccurred, ExplosionParams, ExplosionRequested, WeaponDef, WeaponDefId, WeaponDefs,
};
pub use components::*;
pub use config::{load_combat_config, CombatConfig, GAME_SPEED, SQUARE_SIZE};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, log_with_level, set_log_level, set_logger,
    set_logger_if_needed, LogLevel, LogPrinter,
};
pub use shared::{AllyTeams, SimClock, SimContext, Terrain};
pub use spatial::{bugger_off, unit_error_pos, QuadField};
pub use targeting::select_targets;

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep: один step = один симуляционный кадр
            .insert_resource(Time::<Fixed>::from_hz(GAME_SPEED as f64))
            // Детерминистичный RNG (seed по умолчанию)
            .insert_resource(DeterministicRng::new(42))
            .add_plugins(CombatPlugin)
            .add_systems(Startup, (load_combat_config, combat::rebuild_quad_field).chain());
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .add_plugins(SimulationPlugin)
        .insert_resource(DeterministicRng::new(seed));

    app
}

/// Голый World со всеми combat ресурсами (без App и расписания)
///
/// Системы вызываются руками: `refresh_quad_field(&mut world)` и т.д.
pub fn create_combat_world(seed: u64) -> World {
    let mut world = World::new();
    insert_combat_resources(&mut world);
    world.insert_resource(DeterministicRng::new(seed));
    world
}

/// Snapshot combat state для сравнения детерминизма
///
/// Health, ResidualImpulse, UnitState и цели оружия всех юнитов/features в
/// порядке Entity index, плюс номер кадра и число ожидающих deferred records.
pub fn state_snapshot(world: &mut World) -> Vec<u8> {
    let mut snapshot = Vec::new();

    if let Some(clock) = world.get_resource::<SimClock>() {
        snapshot.extend_from_slice(&clock.frame.to_le_bytes());
    }
    if let Some(queue) = world.get_resource::<combat::DeferredDamageQueue>() {
        snapshot.extend_from_slice(&(queue.pending() as u64).to_le_bytes());
    }

    let mut query = world.query::<(Entity, &Health, &ResidualImpulse, Option<&UnitState>, Option<&Weapons>)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, ..)| entity.index());

    for (entity, health, impulse, state, weapons) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(&health.current.to_le_bytes());
        for axis in impulse.0.to_array() {
            snapshot.extend_from_slice(&axis.to_le_bytes());
        }
        if let Some(state) = state {
            snapshot.extend_from_slice(&state.paralyze_damage.to_le_bytes());
        }
        if let Some(weapons) = weapons {
            for weapon in &weapons.slots {
                let target = weapon.target.map_or(u32::MAX, |target| target.index());
                snapshot.extend_from_slice(&target.to_le_bytes());
            }
        }
    }

    snapshot
}
