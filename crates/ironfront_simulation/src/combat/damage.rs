//! Damage vectors и применение урона к юнитам/features
//!
//! Урон считается по armor class цели: `damages[armor_class] × armor_multiplier`.
//! Paralyzer урон (paralyze_time > 0) копится в `UnitState::paralyze_damage`
//! и health не трогает.

use bevy::ecs::world::EntityWorldMut;
use bevy::prelude::*;
use bevy_rapier3d::prelude::ExternalImpulse;
use crate::components::{Health, PieceHit, ResidualImpulse, Unit, UnitState};
use super::WeaponDefId;

/// Урон по armor class'ам + скалярные модификаторы
///
/// Immutable value: `scaled` / `clamped` возвращают новый экземпляр.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageArray {
    /// Урон по armor class; [0] — default damage
    pub damages: Vec<f32>,
    pub impulse_factor: f32,
    pub impulse_boost: f32,
    /// Длительность паралича (кадры); > 0 — paralyzer
    pub paralyze_time: u32,
    pub crater_mult: f32,
    pub crater_boost: f32,
}

impl Default for DamageArray {
    fn default() -> Self {
        Self::uniform(1.0, 1)
    }
}

impl DamageArray {
    pub fn new(damages: Vec<f32>) -> Self {
        Self {
            damages,
            impulse_factor: 1.0,
            impulse_boost: 0.0,
            paralyze_time: 0,
            crater_mult: 1.0,
            crater_boost: 0.0,
        }
    }

    /// Одинаковый урон для `armor_classes` классов
    pub fn uniform(amount: f32, armor_classes: usize) -> Self {
        Self::new(vec![amount; armor_classes.max(1)])
    }

    pub fn default_damage(&self) -> f32 {
        self.damages.first().copied().unwrap_or(0.0)
    }

    /// Урон по armor class (неизвестный класс → default)
    pub fn get(&self, armor_class: usize) -> f32 {
        self.damages
            .get(armor_class)
            .copied()
            .unwrap_or_else(|| self.default_damage())
    }

    pub fn scaled(&self, multiplier: f32) -> Self {
        Self {
            damages: self.damages.iter().map(|d| d * multiplier).collect(),
            ..self.clone()
        }
    }

    /// Каждый элемент в [-max, max]
    pub fn clamped(&self, max: f32) -> Self {
        Self {
            damages: self.damages.iter().map(|d| d.clamp(-max, max)).collect(),
            ..self.clone()
        }
    }
}

/// Компонент-маркер: entity мертв (Health <= 0)
///
/// Мёртвые юниты не участвуют в spatial queries и не получают урон.
#[derive(Component, Debug)]
pub struct Dead;

/// Событие: урон нанесен
///
/// Генерируется на каждое применение урона (прямое или deferred).
#[derive(Event, Debug, Clone, PartialEq)]
pub struct DamageDealt {
    pub attacker: Option<Entity>,
    pub target: Entity,
    /// Итоговый урон (после armor)
    pub damage: f32,
    pub impulse: Vec3,
    pub weapon_def: Option<WeaponDefId>,
    pub paralyzer: bool,
    pub target_died: bool,
}

/// Событие: entity умер (health <= 0)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Добавляет impulse в ResidualImpulse и (если есть) в rapier ExternalImpulse
fn push_impulse(entity: &mut EntityWorldMut, impulse: Vec3) {
    if impulse == Vec3::ZERO {
        return;
    }
    if let Some(mut residual) = entity.get_mut::<ResidualImpulse>() {
        residual.0 += impulse;
    }
    if let Some(mut external) = entity.get_mut::<ExternalImpulse>() {
        external.impulse += impulse;
    }
}

/// Применяет урон и impulse к юниту
///
/// Возвращает false, если цель не существует, не юнит или уже мертва.
pub fn apply_unit_damage(
    world: &mut World,
    target: Entity,
    damages: &DamageArray,
    impulse: Vec3,
    attacker: Option<Entity>,
    weapon_def: Option<WeaponDefId>,
) -> bool {
    let (damage, paralyzer, target_died) = {
        let Ok(mut entity) = world.get_entity_mut(target) else {
            return false;
        };
        if entity.contains::<Dead>() {
            return false;
        }
        let Some(unit) = entity.get::<Unit>() else {
            crate::log_warning(&format!("apply_unit_damage: {:?} is not a unit", target));
            return false;
        };

        let damage = damages.get(unit.armor_class) * unit.armor_multiplier;
        let paralyzer = damages.paralyze_time > 0;

        push_impulse(&mut entity, impulse);

        let mut target_died = false;
        if paralyzer {
            if let Some(mut state) = entity.get_mut::<UnitState>() {
                state.paralyze_damage = (state.paralyze_damage + damage).max(0.0);
            }
        } else if let Some(mut health) = entity.get_mut::<Health>() {
            let was_alive = health.is_alive();
            health.take_damage(damage);
            target_died = was_alive && !health.is_alive();
        }

        if target_died {
            entity.insert(Dead);
        }
        (damage, paralyzer, target_died)
    };

    world.send_event(DamageDealt {
        attacker,
        target,
        damage,
        impulse,
        weapon_def,
        paralyzer,
        target_died,
    });

    if target_died {
        crate::log(&format!("Unit {:?} destroyed by {:?}", target, attacker));
        world.send_event(EntityDied {
            entity: target,
            killer: attacker,
        });
    }

    true
}

/// Применяет default damage и impulse к feature
pub fn apply_feature_damage(
    world: &mut World,
    target: Entity,
    damages: &DamageArray,
    impulse: Vec3,
    attacker: Option<Entity>,
    weapon_def: Option<WeaponDefId>,
) -> bool {
    let (damage, target_died) = {
        let Ok(mut entity) = world.get_entity_mut(target) else {
            return false;
        };
        if entity.contains::<Dead>() {
            return false;
        }

        let damage = damages.default_damage();
        push_impulse(&mut entity, impulse);

        let Some(mut health) = entity.get_mut::<Health>() else {
            return false;
        };
        let was_alive = health.is_alive();
        health.take_damage(damage);
        let target_died = was_alive && !health.is_alive();

        if target_died {
            entity.insert(Dead);
        }
        (damage, target_died)
    };

    world.send_event(DamageDealt {
        attacker,
        target,
        damage,
        impulse,
        weapon_def,
        paralyzer: false,
        target_died,
    });

    if target_died {
        world.send_event(EntityDied {
            entity: target,
            killer: attacker,
        });
    }

    true
}

/// Запоминает piece, в который только что попал снаряд (валиден один кадр)
pub fn record_piece_hit(world: &mut World, unit: Entity, hit: PieceHit) {
    if let Some(mut state) = world.get_mut::<UnitState>(unit) {
        state.last_attacked_piece = Some(hit);
    }
}
