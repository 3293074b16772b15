//! Generic spatial query engine + готовые entry points
//!
//! `query_units` — единственный обход QuadField: ячейки (row-major) →
//! allyteam'ы по возрастанию (`include_team`) → юниты в порядке вставки
//! (`include_unit`) → `aggregator.visit`. Повторы между перекрывающимися
//! ячейками отсекаются call-local `EntityHashSet`: вложенные и параллельные
//! queries друг другу не мешают.

use bevy::ecs::entity::EntityHashSet;
use bevy::prelude::*;
use crate::combat::Dead;
use crate::components::{
    CollisionVolume, Feature, Health, LosStatus, Unit, UnitState, LOS_INLOS, LOS_INRADAR, LOS_PREVLOS,
};
use crate::config::{CombatConfig, SQUARE_SIZE};
use crate::shared::{sq_distance_2d, AllyTeams, SimContext};
use super::{
    AllUnitIds, ClosestUnit, ClosestUnitInLos, ClosestUnitInLosCylinder, PositionMode, TargetPredicate,
    UnitAggregator, UnitFilter, UnitsExact,
};

/// Read-only срез компонентов юнита, который видят filters и aggregators
#[derive(Clone, Copy)]
pub struct UnitView<'w> {
    pub entity: Entity,
    pub unit: &'w Unit,
    pub transform: &'w Transform,
    pub health: &'w Health,
    pub state: &'w UnitState,
    pub los: &'w LosStatus,
    pub volume: &'w CollisionVolume,
}

impl<'w> UnitView<'w> {
    /// None — entity despawned или не юнит
    pub fn fetch(world: &'w World, entity: Entity) -> Option<Self> {
        let entity_ref = world.get_entity(entity).ok()?;

        Some(Self {
            entity,
            unit: entity_ref.get::<Unit>()?,
            transform: entity_ref.get::<Transform>()?,
            health: entity_ref.get::<Health>()?,
            state: entity_ref.get::<UnitState>()?,
            los: entity_ref.get::<LosStatus>()?,
            volume: entity_ref.get::<CollisionVolume>()?,
        })
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    pub fn mid_pos(&self) -> Vec3 {
        self.unit.mid_pos(self.transform)
    }
}

/// Один обход индекса с заданными filter и aggregator
///
/// Юниты с `Dead` пропускаются (ждут удаления из индекса).
pub fn query_units<A: UnitAggregator>(ctx: &SimContext, filter: &UnitFilter, aggregator: &mut A) {
    let mut visited = EntityHashSet::default();
    let cells = ctx
        .quad_field
        .cells_overlapping(aggregator.center(), aggregator.search_radius());

    for cell in cells {
        for allyteam in 0..ctx.quad_field.allyteams_in_cell(cell) {
            if !filter.include_team(ctx.teams, allyteam) {
                continue;
            }

            for &entity in ctx.quad_field.units_in_cell(cell, allyteam) {
                if !visited.insert(entity) {
                    continue;
                }
                if ctx.world.get::<Dead>(entity).is_some() {
                    continue;
                }
                let Some(view) = UnitView::fetch(ctx.world, entity) else {
                    continue;
                };
                if filter.include_unit(&view) {
                    aggregator.visit(&view);
                }
            }
        }
    }
}

/// Позиция юнита глазами allyteam `viewer` (с ошибкой радара)
///
/// Без ошибки: союзник, в LOS, или статичное здание-"призрак" (PREVLOS).
/// На радаре — ошибка × radar error allyteam, вне радара — × base × 2.
pub fn perceived_position(unit: &UnitView, teams: &AllyTeams, config: &CombatConfig, viewer: usize) -> Vec3 {
    let mid_pos = unit.mid_pos();
    let los = unit.los.get(viewer);

    if teams.ally(viewer, unit.unit.allyteam) || los & LOS_INLOS != 0 {
        return mid_pos;
    }
    if config.ghosted_buildings && los & LOS_PREVLOS != 0 && !unit.unit.mobile {
        return mid_pos;
    }

    let error = unit.state.pos_error_vector;
    if los & LOS_INRADAR != 0 {
        mid_pos + error * teams.radar_error_size(viewer)
    } else {
        mid_pos + error * config.base_radar_error_size * 2.0
    }
}

/// `perceived_position` по entity (None — не юнит)
pub fn unit_error_pos(ctx: &SimContext, unit: Entity, allyteam: usize) -> Option<Vec3> {
    let view = UnitView::fetch(ctx.world, unit)?;
    Some(perceived_position(&view, ctx.teams, ctx.config, allyteam))
}

// ============================================================================
// Closest-unit queries
// ============================================================================

/// Ближайший юнит любой allyteam глазами `viewer` (враги — только видимые)
///
/// `full_view` (spectator) видит всех без ошибки радара.
pub fn closest_unit(ctx: &SimContext, pos: Vec3, radius: f32, viewer: usize, full_view: bool) -> Option<Entity> {
    let mode = if full_view {
        PositionMode::Exact
    } else {
        PositionMode::Perceived {
            teams: ctx.teams,
            config: ctx.config,
            viewer,
        }
    };
    let mut aggregator = ClosestUnit::with_mode(pos, radius, mode);
    query_units(ctx, &UnitFilter::AllPlusEnemyInLos { viewer, full_view }, &mut aggregator);
    aggregator.closest()
}

pub fn closest_friendly_unit(ctx: &SimContext, pos: Vec3, radius: f32, allyteam: usize) -> Option<Entity> {
    let mut aggregator = ClosestUnit::new(pos, radius);
    query_units(ctx, &UnitFilter::Friendly { allyteam }, &mut aggregator);
    aggregator.closest()
}

/// Ближайший враг в LOS или на радаре
pub fn closest_enemy_unit(ctx: &SimContext, pos: Vec3, radius: f32, allyteam: usize) -> Option<Entity> {
    let mut aggregator = ClosestUnit::new(pos, radius);
    query_units(ctx, &UnitFilter::EnemyInLos { allyteam }, &mut aggregator);
    aggregator.closest()
}

/// Ближайший видимый враг, прошедший caller-defined проверку (no-chase и т.п.)
pub fn closest_valid_target(
    ctx: &SimContext,
    pos: Vec3,
    radius: f32,
    allyteam: usize,
    is_valid: TargetPredicate,
) -> Option<Entity> {
    let mut aggregator = ClosestUnit::new(pos, radius);
    query_units(ctx, &UnitFilter::EnemyValidTarget { allyteam, is_valid }, &mut aggregator);
    aggregator.closest()
}

/// Ближайший враг без проверки видимости для нас; сам враг должен видеть `pos`
///
/// `sphere` — 3D дистанция до поверхности цели, иначе 2D цилиндр.
pub fn closest_enemy_unit_no_los_test(
    ctx: &SimContext,
    pos: Vec3,
    radius: f32,
    allyteam: usize,
    sphere: bool,
    can_be_blind: bool,
) -> Option<Entity> {
    let filter = UnitFilter::Enemy { allyteam };

    if sphere {
        let mut aggregator = ClosestUnitInLos::new(
            pos,
            radius,
            ctx.quad_field.max_unit_radius(),
            can_be_blind,
            ctx.config.los_div,
        );
        query_units(ctx, &filter, &mut aggregator);
        aggregator.closest()
    } else {
        let mut aggregator = ClosestUnitInLosCylinder::new(pos, radius, can_be_blind, ctx.config.los_div);
        query_units(ctx, &filter, &mut aggregator);
        aggregator.closest()
    }
}

pub fn closest_enemy_aircraft(ctx: &SimContext, pos: Vec3, radius: f32, allyteam: usize) -> Option<Entity> {
    let mut aggregator = ClosestUnit::new(pos, radius);
    query_units(ctx, &UnitFilter::EnemyAircraft { allyteam }, &mut aggregator);
    aggregator.closest()
}

// ============================================================================
// Collect queries
// ============================================================================

/// Все видимые (LOS/радар) враги в 2D круге
pub fn enemy_units(ctx: &SimContext, pos: Vec3, radius: f32, allyteam: usize) -> Vec<Entity> {
    let mut aggregator = AllUnitIds::new(pos, radius);
    query_units(ctx, &UnitFilter::EnemyInLos { allyteam }, &mut aggregator);
    aggregator.into_found()
}

pub fn enemy_units_no_los_test(ctx: &SimContext, pos: Vec3, radius: f32, allyteam: usize) -> Vec<Entity> {
    let mut aggregator = AllUnitIds::new(pos, radius);
    query_units(ctx, &UnitFilter::Enemy { allyteam }, &mut aggregator);
    aggregator.into_found()
}

/// Юниты всех allyteam, чей footprint пересекает сферу/цилиндр
pub fn units_exact(ctx: &SimContext, pos: Vec3, radius: f32, spherical: bool) -> Vec<Entity> {
    let mut aggregator = UnitsExact::new(pos, radius, spherical);
    query_units(ctx, &UnitFilter::All, &mut aggregator);
    aggregator.into_found()
}

/// Features, чей footprint пересекает сферу/цилиндр (без фильтрации по команде)
pub fn features_exact(ctx: &SimContext, pos: Vec3, radius: f32, spherical: bool) -> Vec<Entity> {
    let mut visited = EntityHashSet::default();
    let mut found = Vec::new();

    for cell in ctx.quad_field.cells_overlapping(pos, radius) {
        for &entity in ctx.quad_field.features_in_cell(cell) {
            if !visited.insert(entity) {
                continue;
            }
            let (Some(feature), Some(transform)) =
                (ctx.world.get::<Feature>(entity), ctx.world.get::<Transform>(entity))
            else {
                continue;
            };

            let mid_pos = feature.mid_pos(transform);
            let total_radius = radius + feature.radius;
            let sq_dist = if spherical {
                (pos - mid_pos).length_squared()
            } else {
                sq_distance_2d(pos, mid_pos)
            };

            if sq_dist < total_radius * total_radius {
                found.push(entity);
            }
        }
    }

    found
}

// ============================================================================
// Bugger-off
// ============================================================================

/// Просьба к юниту освободить область (потребляется command/AI слоем)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct BuggerOffRequested {
    pub unit: Entity,
    pub position: Vec3,
    pub radius: f32,
}

/// Союзники `team` в области (radius + SQUARE_SIZE), которым нужно отойти
///
/// Союзничество проверяется в обе стороны. Push-resistant юниты
/// пропускаются, если запрос не `forced`.
pub fn bugger_off_targets(
    ctx: &SimContext,
    pos: Vec3,
    radius: f32,
    spherical: bool,
    forced: bool,
    team: usize,
    exclude: Option<Entity>,
) -> Vec<BuggerOffRequested> {
    let allyteam = ctx.teams.allyteam_of(team);
    let area = radius + SQUARE_SIZE;

    units_exact(ctx, pos, area, spherical)
        .into_iter()
        .filter(|&entity| Some(entity) != exclude)
        .filter_map(|entity| {
            let unit = ctx.world.get::<Unit>(entity)?;
            let allied = ctx.teams.ally(unit.allyteam, allyteam) || ctx.teams.ally(allyteam, unit.allyteam);

            (allied && (!unit.push_resistant || forced)).then_some(BuggerOffRequested {
                unit: entity,
                position: pos,
                radius: area,
            })
        })
        .collect()
}

/// Рассылает `BuggerOffRequested` (exclusive доступ к миру нужен только для events)
pub fn bugger_off(
    world: &mut World,
    pos: Vec3,
    radius: f32,
    spherical: bool,
    forced: bool,
    team: usize,
    exclude: Option<Entity>,
) {
    let requests = {
        let Some(ctx) = SimContext::from_world(world) else {
            crate::log_error("bugger_off: combat resources missing");
            return;
        };
        bugger_off_targets(&ctx, pos, radius, spherical, forced, team, exclude)
    };

    for request in requests {
        world.send_event(request);
    }
}
