//! Weapon slots юнита
//!
//! Статика оружия (урон, AOE, edge effectiveness) — в `WeaponDef`
//! (crate::combat::WeaponDefs), здесь только per-instance параметры.

use bevy::prelude::*;
use crate::combat::WeaponDefId;

/// Данные о кандидате, которые видит weapon-specific target weight hook
#[derive(Debug, Clone, Copy)]
pub struct TargetInfo {
    pub entity: Entity,
    pub category: u32,
    pub can_fly: bool,
    pub health: f32,
    pub max_health: f32,
    pub distance_2d: f32,
}

/// Weapon-specific множитель приоритета (меньше = предпочтительнее)
pub type TargetWeightFn = fn(&TargetInfo) -> f32;

#[derive(Debug, Clone)]
pub struct Weapon {
    pub def: WeaponDefId,
    /// Дальность (world units)
    pub range: f32,
    /// Насколько высота стрелка над целью увеличивает дальность
    pub height_mod: f32,
    /// Точка крепления в локальном фрейме юнита
    pub mount_offset: Vec3,
    pub salvo_size: u32,
    /// Перезарядка в кадрах
    pub reload_frames: u32,
    /// Цель должна иметь хотя бы один бит из маски
    pub only_target_category: u32,
    /// Нежелательные цели (×100 к priority)
    pub bad_target_category: u32,
    /// true — избегать повторного выбора текущей цели
    pub avoid_target: bool,
    pub target_weight: Option<TargetWeightFn>,
    /// Текущая цель (обновляется update_weapon_targets)
    pub target: Option<Entity>,
}

impl Weapon {
    pub fn new(def: WeaponDefId, range: f32) -> Self {
        Self {
            def,
            range,
            height_mod: 0.2,
            mount_offset: Vec3::ZERO,
            salvo_size: 1,
            reload_frames: 30,
            only_target_category: u32::MAX,
            bad_target_category: 0,
            avoid_target: false,
            target_weight: None,
            target: None,
        }
    }

    /// Позиция оружия в world space
    pub fn world_position(&self, transform: &Transform) -> Vec3 {
        crate::shared::local_to_world(transform, self.mount_offset)
    }
}

#[derive(Component, Debug, Clone, Default)]
pub struct Weapons {
    pub slots: Vec<Weapon>,
}

impl Weapons {
    pub fn single(weapon: Weapon) -> Self {
        Self {
            slots: vec![weapon],
        }
    }
}
