//! Explosion damage resolver
//!
//! Двухфазный: `plan_explosion` читает мир (`&World`) и считает эффекты для
//! всех задетых entity, `resolve_explosion` применяет план (`&mut World`).
//!
//! Falloff (edge effectiveness e, радиус R, дистанция d):
//!   mod = max(0.01, (R − d) / (R − d·e))
//! Для юнитов считается дважды: по capped center дистанции (impulse) и по
//! дистанции до поверхности volume (урон).

use bevy::prelude::*;
use crate::components::{CollisionVolume, Feature, PieceHit};
use crate::config::{CombatConfig, SQUARE_SIZE};
use crate::shared::{local_to_world, SimContext, MIN_DIVISOR_DISTANCE};
use crate::spatial::{features_exact, units_exact, UnitView};
use super::{
    apply_feature_damage, apply_unit_damage, record_piece_hit, CombatScripts, DamageArray, DeferredDamage,
    DeferredDamageQueue, WeaponDef, WeaponDefId,
};

/// Нижняя граница edge falloff multiplier'а
pub const MIN_FALLOFF: f32 = 0.01;

/// Множитель raw impulse для юнитов
pub const UNIT_IMPULSE_SCALE: f32 = 3.2;

/// Цели ближе `explosion_speed × 4` (от поверхности) получают урон сразу
pub const IMMEDIATE_DELIVERY_SPEED_FACTOR: f32 = 4.0;

/// Ниже этой высоты над землёй взрыв кратер не оставляет
const MIN_CRATER_ALTITUDE: f32 = -1.0;

/// Параметры одного взрыва (живут только на время resolve)
#[derive(Debug, Clone)]
pub struct ExplosionParams {
    pub position: Vec3,
    pub direction: Vec3,
    pub damages: DamageArray,
    /// None — взрыв не от оружия (обломки и т.п.)
    pub weapon_def: Option<WeaponDefId>,
    pub damage_area_of_effect: f32,
    pub crater_area_of_effect: f32,
    pub edge_effectiveness: f32,
    pub explosion_speed: f32,
    pub gfx_mod: f32,
    pub owner: Option<Entity>,
    pub hit_unit: Option<Entity>,
    pub hit_feature: Option<Entity>,
    /// Piece hit_unit'а, в который попал снаряд (кадр проставится при resolve)
    pub hit_piece: Option<PieceHit>,
    pub impact_only: bool,
    pub ignore_owner: bool,
    pub damage_ground: bool,
}

impl ExplosionParams {
    pub fn new(position: Vec3, damages: DamageArray, area_of_effect: f32) -> Self {
        Self {
            position,
            direction: Vec3::ZERO,
            damages,
            weapon_def: None,
            damage_area_of_effect: area_of_effect,
            crater_area_of_effect: area_of_effect,
            edge_effectiveness: 0.0,
            explosion_speed: 8.0,
            gfx_mod: 1.0,
            owner: None,
            hit_unit: None,
            hit_feature: None,
            hit_piece: None,
            impact_only: false,
            ignore_owner: false,
            damage_ground: true,
        }
    }

    /// Взрыв снаряда оружия `def`
    pub fn from_weapon(def: &WeaponDef, position: Vec3, direction: Vec3, owner: Option<Entity>) -> Self {
        Self {
            position,
            direction,
            damages: def.damages.clone(),
            weapon_def: Some(def.id),
            damage_area_of_effect: def.area_of_effect,
            crater_area_of_effect: def.crater_area_of_effect,
            edge_effectiveness: def.edge_effectiveness,
            explosion_speed: def.explosion_speed,
            gfx_mod: 1.0,
            owner,
            hit_unit: None,
            hit_feature: None,
            hit_piece: None,
            impact_only: def.impact_only,
            ignore_owner: def.no_self_damage,
            damage_ground: def.damage_ground,
        }
    }

    pub fn with_hit_unit(mut self, unit: Entity) -> Self {
        self.hit_unit = Some(unit);
        self
    }

    pub fn with_hit_feature(mut self, feature: Entity) -> Self {
        self.hit_feature = Some(feature);
        self
    }

    /// Радиус урона (не меньше 1)
    pub fn damage_radius(&self) -> f32 {
        self.damage_area_of_effect.max(1.0)
    }

    /// Радиус кратера (не меньше 1)
    pub fn crater_radius(&self) -> f32 {
        self.crater_area_of_effect.max(1.0)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Входящий запрос: взорвать (обрабатывается `process_explosion_requests`)
#[derive(Event, Debug, Clone)]
pub struct ExplosionRequested(pub ExplosionParams);

/// Деформация terrain (внешний map damage collaborator)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct MapDamageRequested {
    pub position: Vec3,
    pub strength: f32,
    pub radius: f32,
}

/// Визуальный эффект взрыва (fire-and-forget)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ExplosionVisualRequested {
    /// Generator оружия; None — стандартный
    pub generator: Option<String>,
    pub position: Vec3,
    pub damage: f32,
    pub radius: f32,
    pub direction: Vec3,
    pub gfx_mod: f32,
    pub owner: Option<Entity>,
    pub hit_unit: Option<Entity>,
}

/// Взрыв произошёл (для внешних listener'ов)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ExplosionOccurred {
    pub position: Vec3,
    pub damage: f32,
    pub radius: f32,
    pub weapon_def: Option<WeaponDefId>,
}

// ============================================================================
// Pure damage math
// ============================================================================

/// Edge-effectiveness falloff на дистанции `distance` от центра
pub fn edge_falloff(radius: f32, distance: f32, edge_effectiveness: f32) -> f32 {
    let falloff = (radius - distance) / (radius - distance * edge_effectiveness);
    // NaN (0/0 при e = 1 на краю) тоже уходит в минимум
    falloff.max(MIN_FALLOFF)
}

/// Damage-bearing точка юнита: центр volume + его bounding radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDamageTarget {
    pub center: Vec3,
    pub bounding_radius: f32,
    pub under_water: bool,
}

impl UnitDamageTarget {
    /// Piece volume, если piece hit записан в кадре `frame` и юнит их использует,
    /// иначе volume всего юнита вокруг mid-point
    pub fn from_view(view: &UnitView, frame: u32) -> Self {
        let piece = view
            .state
            .piece_hit_at(frame)
            .filter(|_| view.unit.use_piece_volumes);

        match piece {
            Some(hit) => Self {
                center: local_to_world(view.transform, hit.position + hit.volume.offsets),
                bounding_radius: hit.volume.bounding_radius,
                under_water: view.state.under_water,
            },
            None => Self {
                center: view.mid_pos() + view.volume.offsets,
                bounding_radius: view.volume.bounding_radius,
                under_water: view.state.under_water,
            },
        }
    }
}

/// Как доставить урон юниту
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delivery {
    Immediate,
    /// Задержка распространения взрыва в кадрах
    Deferred { delay_frames: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitExplosionEffect {
    pub damages: DamageArray,
    pub impulse: Vec3,
    /// Дистанция от поверхности volume до центра (после штрафа под водой)
    pub edge_distance: f32,
    /// Falloff урона
    pub damage_falloff: f32,
    pub delivery: Delivery,
}

/// Эффект взрыва на юнит; None — юнит вне радиуса
pub fn unit_explosion_effect(
    params: &ExplosionParams,
    target: &UnitDamageTarget,
    config: &CombatConfig,
) -> Option<UnitExplosionEffect> {
    let radius = params.damage_radius();
    let diff = target.center - params.position;
    let volume_radius = target.bounding_radius;

    let center_distance = diff.length().max(volume_radius + MIN_DIVISOR_DISTANCE);
    let mut edge_distance = center_distance - volume_radius;
    let capped_distance = center_distance.min(radius);

    if edge_distance > radius {
        return None;
    }

    // Подводную цель надводным взрывом задеть сложнее
    if target.under_water && params.position.y > -1.0 {
        edge_distance = (edge_distance + volume_radius).min(radius);
    }

    let impulse_falloff = edge_falloff(radius, capped_distance, params.edge_effectiveness);
    let damage_falloff = edge_falloff(radius, edge_distance, params.edge_effectiveness);

    let mut direction = diff / center_distance;
    direction.y += config.impulse_upward_bias;

    let damages = &params.damages;
    let raw_strength = damages.impulse_factor
        * impulse_falloff
        * (damages.default_damage() + damages.impulse_boost)
        * UNIT_IMPULSE_SCALE;
    let max_impulse = config.max_explosion_impulse;
    let strength = raw_strength.clamp(-max_impulse, max_impulse);
    let impulse = (direction * strength).clamp_length_max(max_impulse);

    let speed = params.explosion_speed;
    let delivery = if speed <= f32::EPSILON || edge_distance < speed * IMMEDIATE_DELIVERY_SPEED_FACTOR {
        Delivery::Immediate
    } else {
        Delivery::Deferred {
            delay_frames: (edge_distance / speed) as u32,
        }
    };

    Some(UnitExplosionEffect {
        damages: damages.scaled(damage_falloff).clamped(config.max_explosion_damage),
        impulse,
        edge_distance,
        damage_falloff,
        delivery,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureExplosionEffect {
    pub damages: DamageArray,
    pub impulse: Vec3,
    pub falloff: f32,
}

/// Эффект взрыва на feature; None — нет эффекта
///
/// Линейный falloff. Крупные обломки рядом с центром получают минимум 10%
/// (иначе их не берёт ничего, кроме прямого попадания).
pub fn feature_explosion_effect(
    params: &ExplosionParams,
    mid_pos: Vec3,
    volume: &CollisionVolume,
    config: &CombatConfig,
) -> Option<FeatureExplosionEffect> {
    let radius = params.damage_radius();
    let diff = (mid_pos + volume.offsets) - params.position;
    let distance = diff.length().max(MIN_DIVISOR_DISTANCE);

    let mut falloff = (radius - distance) / radius;
    if radius > SQUARE_SIZE && distance < volume.bounding_radius * 1.1 && falloff < 0.1 {
        falloff = 0.1;
    }
    if falloff <= 0.0 {
        return None;
    }

    let damages = &params.damages;
    let scale = damages.default_damage() + damages.impulse_boost;
    let impulse = (diff * (damages.impulse_factor * falloff / distance * scale))
        .clamp_length_max(config.max_explosion_impulse);

    Some(FeatureExplosionEffect {
        damages: damages.scaled(falloff).clamped(config.max_explosion_damage),
        impulse,
        falloff,
    })
}

/// Кратер; None — взрыв слишком высоко / под землёй / кратеры выключены
pub fn crater_effect(params: &ExplosionParams, ground_height: f32, config: &CombatConfig) -> Option<MapDamageRequested> {
    let crater_radius = params.crater_radius();
    let altitude = params.position.y - ground_height;
    let damages = &params.damages;

    let touches_ground = altitude >= MIN_CRATER_ALTITUDE && crater_radius > altitude;
    if !touches_ground || !params.damage_ground || config.map_damage_disabled || damages.crater_mult <= 0.0 {
        return None;
    }

    let crater_depth = damages.default_damage() * (1.0 - altitude / crater_radius);
    let damage_depth = crater_depth.min(crater_radius * 10.0);

    Some(MapDamageRequested {
        position: params.position,
        strength: (damage_depth + damages.crater_boost) * damages.crater_mult,
        radius: crater_radius - altitude,
    })
}

// ============================================================================
// Plan / apply
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedHit {
    Unit {
        target: Entity,
        effect: UnitExplosionEffect,
    },
    Feature {
        target: Entity,
        effect: FeatureExplosionEffect,
    },
}

/// Всё, что взрыв сделает с миром
#[derive(Debug, Clone, PartialEq)]
pub struct ExplosionPlan {
    pub hits: Vec<PlannedHit>,
    pub crater: Option<MapDamageRequested>,
    pub visual: Option<ExplosionVisualRequested>,
    pub occurred: ExplosionOccurred,
}

fn plan_unit_hit(ctx: &SimContext, params: &ExplosionParams, unit: Entity) -> Option<PlannedHit> {
    if params.ignore_owner && params.owner == Some(unit) {
        return None;
    }

    let view = UnitView::fetch(ctx.world, unit)?;
    let target = UnitDamageTarget::from_view(&view, ctx.frame);
    let effect = unit_explosion_effect(params, &target, ctx.config)?;

    Some(PlannedHit::Unit { target: unit, effect })
}

fn plan_feature_hit(ctx: &SimContext, params: &ExplosionParams, feature: Entity) -> Option<PlannedHit> {
    let world = ctx.world;
    // Feature без collision volume иммунна
    let volume = world.get::<CollisionVolume>(feature)?;
    let mid_pos = world.get::<Feature>(feature)?.mid_pos(world.get::<Transform>(feature)?);
    let effect = feature_explosion_effect(params, mid_pos, volume, ctx.config)?;

    Some(PlannedHit::Feature {
        target: feature,
        effect,
    })
}

/// Фаза 1: считает эффекты взрыва, ничего не меняя
pub fn plan_explosion(
    ctx: &SimContext,
    params: &ExplosionParams,
    gfx_suppressed: bool,
    generator: Option<String>,
) -> ExplosionPlan {
    let radius = params.damage_radius();
    let mut hits = Vec::new();
    let mut crater = None;

    if params.impact_only {
        if let Some(unit) = params.hit_unit {
            hits.extend(plan_unit_hit(ctx, params, unit));
        } else if let Some(feature) = params.hit_feature {
            hits.extend(plan_feature_hit(ctx, params, feature));
        }
    } else {
        let mut units = units_exact(ctx, params.position, radius, true);
        // Юнит со смещённым volume мог не попасть в круг quad field'а
        if let Some(hit_unit) = params.hit_unit {
            if !units.contains(&hit_unit) {
                units.push(hit_unit);
            }
        }
        hits.extend(units.into_iter().filter_map(|unit| plan_unit_hit(ctx, params, unit)));

        let mut features = features_exact(ctx, params.position, radius, true);
        if let Some(hit_feature) = params.hit_feature {
            if !features.contains(&hit_feature) {
                features.push(hit_feature);
            }
        }
        hits.extend(
            features
                .into_iter()
                .filter_map(|feature| plan_feature_hit(ctx, params, feature)),
        );

        let ground_height = ctx.terrain.height_at(params.position.x, params.position.z);
        crater = crater_effect(params, ground_height, ctx.config);
    }

    let damage = params.damages.default_damage();
    let visual = (!gfx_suppressed).then(|| ExplosionVisualRequested {
        generator,
        position: params.position,
        damage,
        radius,
        direction: params.direction,
        gfx_mod: params.gfx_mod,
        owner: params.owner,
        hit_unit: params.hit_unit,
    });

    ExplosionPlan {
        hits,
        crater,
        visual,
        occurred: ExplosionOccurred {
            position: params.position,
            damage,
            radius,
            weapon_def: params.weapon_def,
        },
    }
}

/// Фаза 2: применяет план
pub fn apply_explosion_plan(world: &mut World, params: &ExplosionParams, plan: ExplosionPlan, frame: u32) {
    for hit in plan.hits {
        match hit {
            PlannedHit::Unit { target, effect } => match effect.delivery {
                Delivery::Immediate => {
                    apply_unit_damage(
                        world,
                        target,
                        &effect.damages,
                        effect.impulse,
                        params.owner,
                        params.weapon_def,
                    );
                }
                Delivery::Deferred { delay_frames } => {
                    let Some(mut queue) = world.get_resource_mut::<DeferredDamageQueue>() else {
                        crate::log_error("apply_explosion_plan: DeferredDamageQueue missing");
                        continue;
                    };
                    queue.schedule(
                        frame,
                        delay_frames,
                        DeferredDamage {
                            attacker: params.owner,
                            target,
                            damages: effect.damages,
                            impulse: effect.impulse,
                            weapon_def: params.weapon_def,
                        },
                    );
                }
            },
            PlannedHit::Feature { target, effect } => {
                // Урон features идёт без атакующего
                apply_feature_damage(world, target, &effect.damages, effect.impulse, None, params.weapon_def);
            }
        }
    }

    if let Some(crater) = plan.crater {
        world.send_event(crater);
    }
    if let Some(visual) = plan.visual {
        world.send_event(visual);
    }
    world.send_event(plan.occurred);
}

/// Полный взрыв: уведомление скриптов → plan → apply
pub fn resolve_explosion(world: &mut World, params: &ExplosionParams) {
    let frame = world.get_resource::<crate::shared::SimClock>().map_or(0, |clock| clock.frame);

    if let (Some(unit), Some(piece)) = (params.hit_unit, params.hit_piece) {
        record_piece_hit(world, unit, PieceHit { frame, ..piece });
    }

    let gfx_suppressed = world
        .get_resource::<CombatScripts>()
        .is_some_and(|scripts| scripts.explosion(params.weapon_def, params.position, params.owner));

    let generator = params.weapon_def.and_then(|id| {
        world
            .get_resource::<super::WeaponDefs>()
            .and_then(|defs| defs.get(id))
            .and_then(|def| def.explosion_generator.clone())
    });

    let plan = {
        let Some(ctx) = SimContext::from_world(world) else {
            crate::log_error("resolve_explosion: combat resources missing");
            return;
        };
        plan_explosion(&ctx, params, gfx_suppressed, generator)
    };

    apply_explosion_plan(world, params, plan, frame);
}

/// Exclusive system: обрабатывает все `ExplosionRequested` этого кадра
pub fn process_explosion_requests(world: &mut World) {
    let requests: Vec<ExplosionParams> = match world.get_resource_mut::<Events<ExplosionRequested>>() {
        Some(mut events) => events.drain().map(|request| request.0).collect(),
        None => return,
    };

    for params in &requests {
        resolve_explosion(world, params);
    }
}
