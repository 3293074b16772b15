//! Combat resolution module
//!
//! ECS ответственность:
//! - Explosions: falloff урона/impulse, кратеры, gfx/notification events
//! - Deferred damage: 128-слотовый ring задержки распространения взрыва
//! - Damage application: armor, paralyzer, смерть (Dead + EntityDied)
//! - Weapon defs и scripting hooks
//!
//! Внешние collaborators (map damage, gfx, physics) получают только events
//! и ExternalImpulse.

use bevy::prelude::*;
use crate::config::CombatConfig;
use crate::shared::{tick_sim_clock, AllyTeams, SimClock, Terrain};
use crate::spatial::{refresh_quad_field, BuggerOffRequested, QuadField};
use crate::targeting::update_weapon_targets;

pub mod damage;
pub mod deferred;
pub mod explosion;
pub mod scripts;
pub mod weapon_defs;

#[cfg(test)]
mod explosion_tests;

// Re-export основных типов
pub use damage::{apply_feature_damage, apply_unit_damage, record_piece_hit, DamageArray, DamageDealt, Dead, EntityDied};
pub use deferred::{
    advance_frame, drain_deferred_damage, DeferredDamage, DeferredDamageQueue, DEFERRED_DAMAGE_MARGIN,
    DEFERRED_DAMAGE_SLOTS,
};
pub use explosion::{
    crater_effect, edge_falloff, feature_explosion_effect, plan_explosion, process_explosion_requests,
    resolve_explosion, unit_explosion_effect, Delivery, ExplosionOccurred, ExplosionParams, ExplosionPlan,
    ExplosionRequested, ExplosionVisualRequested, FeatureExplosionEffect, MapDamageRequested, PlannedHit, MIN_FALLOFF,
    UnitDamageTarget, UnitExplosionEffect,
};
pub use scripts::{CombatScript, CombatScripts, TargetDecision};
pub use weapon_defs::{WeaponDef, WeaponDefId, WeaponDefs};

/// Combat Plugin
///
/// Регистрирует combat системы в FixedUpdate (один fixed step = один кадр).
///
/// Порядок выполнения:
/// 1. refresh_quad_field — индекс догоняет Transform'ы
/// 2. drain_deferred_damage — слот текущего кадра
/// 3. process_explosion_requests — ExplosionRequested → resolve_explosion
/// 4. update_weapon_targets — перевыбор целей (раз в slow_update_rate кадров)
/// 5. tick_sim_clock — следующий кадр
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        // Регистрация событий
        app.add_event::<ExplosionRequested>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .add_event::<MapDamageRequested>()
            .add_event::<ExplosionVisualRequested>()
            .add_event::<ExplosionOccurred>()
            .add_event::<BuggerOffRequested>();

        app.init_resource::<CombatConfig>()
            .init_resource::<AllyTeams>()
            .init_resource::<SimClock>()
            .init_resource::<Terrain>()
            .init_resource::<QuadField>()
            .init_resource::<WeaponDefs>()
            .init_resource::<DeferredDamageQueue>()
            .init_resource::<CombatScripts>();

        app.add_systems(
            FixedUpdate,
            (
                refresh_quad_field,
                drain_deferred_damage,
                process_explosion_requests,
                update_weapon_targets,
                tick_sim_clock,
            )
                .chain(), // Последовательное выполнение
        );
    }
}

/// Те же ресурсы и event queues, что регистрирует CombatPlugin, но в голом World
///
/// Для тестов и хостов без App. Уже вставленные ресурсы не перезаписываются.
pub fn insert_combat_resources(world: &mut World) {
    world.init_resource::<CombatConfig>();
    world.init_resource::<AllyTeams>();
    world.init_resource::<SimClock>();
    world.init_resource::<Terrain>();
    world.init_resource::<QuadField>();
    world.init_resource::<WeaponDefs>();
    world.init_resource::<DeferredDamageQueue>();
    world.init_resource::<CombatScripts>();

    world.init_resource::<Events<ExplosionRequested>>();
    world.init_resource::<Events<DamageDealt>>();
    world.init_resource::<Events<EntityDied>>();
    world.init_resource::<Events<MapDamageRequested>>();
    world.init_resource::<Events<ExplosionVisualRequested>>();
    world.init_resource::<Events<ExplosionOccurred>>();
    world.init_resource::<Events<BuggerOffRequested>>();
}

/// Startup: пересоздаёт QuadField под размер карты из загруженного конфига
pub fn rebuild_quad_field(world: &mut World) {
    let quad_field = QuadField::from_world(world);
    world.insert_resource(quad_field);
}
