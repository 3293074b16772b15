//! Weapon target selection
//!
//! `select_targets` оценивает всех врагов в досягаемости оружия и возвращает
//! список `(priority, target)` по возрастанию priority (меньше = важнее).
//! Равные priority сохраняют порядок обхода quad field'а.
//!
//! Priority цели:
//!   (dist2D × proximity + modRange × 0.4 + 100)
//!   × (secDamage + health)          — цель в LOS
//!   × (secDamage + 10000) × 10      — только радар
//! плюс модификаторы (прошлая цель, паралич, target weight) и нормализация
//! по ценности цели, если её когда-либо видели.

use bevy::prelude::*;
use rand::Rng;
use crate::combat::{CombatScripts, Dead, TargetDecision, WeaponDef, WeaponDefs};
use crate::components::{TargetInfo, Unit, Weapon, Weapons, LOS_INLOS, LOS_INRADAR, LOS_PREVLOS};
use crate::config::GAME_SPEED;
use crate::shared::{distance_2d, sq_distance_2d, SimClock, SimContext};
use crate::spatial::{query_units, UnitAggregator, UnitFilter, UnitView};
use crate::DeterministicRng;


/// Штраф за неточность позиции (цель только на радаре)
pub const RADAR_ONLY_PENALTY: f32 = 10.0;
/// Добавка к secDamage для целей только на радаре
pub const RADAR_ONLY_HEALTH: f32 = 10_000.0;
/// Множитель для прошлой цели: avoid_target / обычное оружие
pub const LAST_TARGET_AVOID: f32 = 10.0;
pub const LAST_TARGET_PREFER: f32 = 0.4;
/// Paralyzer не тратится на уже парализованные цели
pub const PARALYZED_PENALTY: f32 = 4.0;
pub const BAD_CATEGORY_PENALTY: f32 = 100.0;
pub const CRASHING_PENALTY: f32 = 1000.0;

/// Нижняя граница делителя нормализации (оружие без урона по броне цели)
const MIN_VALUE_DIVISOR: f32 = 1e-3;

/// Стрелок и оружие, для которых идёт оценка
struct Shooter<'a> {
    entity: Entity,
    allyteam: usize,
    position: Vec3,
    weapon_index: usize,
    weapon: &'a Weapon,
    def: &'a WeaponDef,
    /// Высота оружия (world Y)
    weapon_height: f32,
    /// Урон оружия за секунду
    sec_damage: f32,
}

/// Aggregator: priority для каждого врага в досягаемости
struct TargetScorer<'a, R: Rng> {
    shooter: Shooter<'a>,
    search_radius: f32,
    paralyze_on_max_health: bool,
    radar_error_size: f32,
    scripts: Option<&'a CombatScripts>,
    rng: &'a mut R,
    targets: Vec<(f32, Entity)>,
}

impl<R: Rng> TargetScorer<'_, R> {
    /// None — цель отбрасывается
    fn score(&mut self, target: &UnitView) -> Option<f32> {
        let shooter = &self.shooter;
        let weapon = shooter.weapon;

        if target.state.under_water && !shooter.def.water_weapon {
            return None;
        }
        if !target.health.is_alive() {
            return None;
        }

        let mut priority = 1.0;
        let los = target.los.get(shooter.allyteam);
        let target_pos = if los & LOS_INLOS != 0 {
            target.mid_pos()
        } else if los & LOS_INRADAR != 0 {
            priority *= RADAR_ONLY_PENALTY;
            target.mid_pos() + target.state.pos_error_vector * self.radar_error_size
        } else {
            return None;
        };

        let mod_range = weapon.range + (shooter.weapon_height - target_pos.y) * weapon.height_mod;
        if sq_distance_2d(shooter.position, target_pos) > mod_range * mod_range {
            return None;
        }

        let dist_2d = distance_2d(shooter.position, target_pos);
        priority *= dist_2d * shooter.def.proximity_priority + mod_range * 0.4 + 100.0;

        if los & LOS_INLOS != 0 {
            priority *= shooter.sec_damage + target.health.current;

            if weapon.target == Some(target.entity) {
                priority *= if weapon.avoid_target { LAST_TARGET_AVOID } else { LAST_TARGET_PREFER };
            }

            if shooter.def.is_paralyzer() && target.state.is_paralyzed(target.health, self.paralyze_on_max_health) {
                priority *= PARALYZED_PENALTY;
            }

            if let Some(target_weight) = weapon.target_weight {
                priority *= target_weight(&TargetInfo {
                    entity: target.entity,
                    category: target.unit.category,
                    can_fly: target.unit.can_fly,
                    health: target.health.current,
                    max_health: target.health.max,
                    distance_2d: dist_2d,
                });
            }
        } else {
            priority *= shooter.sec_damage + RADAR_ONLY_HEALTH;
        }

        if los & LOS_PREVLOS != 0 {
            let damage_mul = shooter.def.damages.get(target.unit.armor_class) * target.unit.armor_multiplier;
            let jitter = 0.7 + self.rng.gen::<f32>() * 0.6;
            priority /= (damage_mul * target.unit.power * jitter).max(MIN_VALUE_DIVISOR);

            if target.unit.category & weapon.bad_target_category != 0 {
                priority *= BAD_CATEGORY_PENALTY;
            }
            if target.state.crashing {
                priority *= CRASHING_PENALTY;
            }
        }

        Some(priority)
    }
}

impl<R: Rng> UnitAggregator for TargetScorer<'_, R> {
    fn center(&self) -> Vec3 {
        self.shooter.position
    }

    fn search_radius(&self) -> f32 {
        self.search_radius
    }

    fn visit(&mut self, target: &UnitView) {
        if target.unit.category & self.shooter.weapon.only_target_category == 0 {
            return;
        }

        let decision = self.scripts.and_then(|scripts| {
            scripts.allow_weapon_target(
                self.shooter.entity,
                target.entity,
                self.shooter.weapon_index,
                self.shooter.def.id,
            )
        });

        match decision {
            Some(TargetDecision::Allow { priority }) => self.targets.push((priority, target.entity)),
            Some(TargetDecision::Deny) => {}
            None => {
                if let Some(priority) = self.score(target) {
                    self.targets.push((priority, target.entity));
                }
            }
        }
    }
}

/// Кандидаты в цели для оружия `weapon_index` юнита `shooter`
pub fn generate_weapon_targets<R: Rng>(
    ctx: &SimContext,
    rng: &mut R,
    shooter: Entity,
    weapon_index: usize,
) -> Vec<(f32, Entity)> {
    let world = ctx.world;
    let (Some(unit), Some(transform), Some(weapons), Some(defs)) = (
        world.get::<Unit>(shooter),
        world.get::<Transform>(shooter),
        world.get::<Weapons>(shooter),
        world.get_resource::<WeaponDefs>(),
    ) else {
        return Vec::new();
    };
    let Some(weapon) = weapons.slots.get(weapon_index) else {
        return Vec::new();
    };
    let Some(def) = defs.get(weapon.def) else {
        crate::log_warning(&format!("generate_weapon_targets: unknown weapon def {:?}", weapon.def));
        return Vec::new();
    };

    let weapon_height = weapon.world_position(transform).y;
    let sec_damage =
        def.damages.default_damage() * weapon.salvo_size as f32 / weapon.reload_frames.max(1) as f32 * GAME_SPEED as f32;
    let height_slack = (weapon_height - ctx.terrain.initial_min_height().max(0.0)) * weapon.height_mod;

    let mut scorer = TargetScorer {
        shooter: Shooter {
            entity: shooter,
            allyteam: unit.allyteam,
            position: transform.translation,
            weapon_index,
            weapon,
            def,
            weapon_height,
            sec_damage,
        },
        search_radius: weapon.range + height_slack,
        paralyze_on_max_health: ctx.config.paralyze_on_max_health,
        radar_error_size: ctx.teams.radar_error_size(unit.allyteam),
        scripts: world.get_resource::<CombatScripts>(),
        rng,
        targets: Vec::new(),
    };

    query_units(ctx, &UnitFilter::Enemy { allyteam: unit.allyteam }, &mut scorer);

    let mut targets = scorer.targets;
    // Stable sort: равные priority остаются в порядке обхода
    targets.sort_by(|a, b| a.0.total_cmp(&b.0));
    targets
}

/// Кандидаты в цели (по возрастанию priority), jitter из DeterministicRng
pub fn select_targets(world: &mut World, shooter: Entity, weapon_index: usize) -> Vec<(f32, Entity)> {
    let result = world.try_resource_scope(|world, mut rng: Mut<DeterministicRng>| {
        let Some(ctx) = SimContext::from_world(world) else {
            crate::log_error("select_targets: combat resources missing");
            return Vec::new();
        };
        generate_weapon_targets(&ctx, &mut rng.rng, shooter, weapon_index)
    });

    result.unwrap_or_else(|| {
        crate::log_error("select_targets: DeterministicRng resource missing");
        Vec::new()
    })
}

/// Exclusive system: раз в `slow_update_rate` кадров каждое оружие берёт лучшую цель
pub fn update_weapon_targets(world: &mut World) {
    let (Some(frame), Some(rate)) = (
        world.get_resource::<SimClock>().map(|clock| clock.frame),
        world
            .get_resource::<crate::config::CombatConfig>()
            .map(|config| config.slow_update_rate.max(1)),
    ) else {
        return;
    };
    if frame % rate != 0 {
        return;
    }

    let shooters: Vec<(Entity, usize)> = {
        let mut query = world.query_filtered::<(Entity, &Weapons), (With<Unit>, Without<Dead>)>();
        query
            .iter(world)
            .map(|(entity, weapons)| (entity, weapons.slots.len()))
            .collect()
    };

    for (shooter, weapon_count) in shooters {
        for weapon_index in 0..weapon_count {
            let best = select_targets(world, shooter, weapon_index)
                .first()
                .map(|&(_, target)| target);

            if let Some(mut weapons) = world.get_mut::<Weapons>(shooter) {
                if let Some(weapon) = weapons.slots.get_mut(weapon_index) {
                    weapon.target = best;
                }
            }
        }
    }
}
