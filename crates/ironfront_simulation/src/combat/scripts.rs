//! Scripting hooks (game rules override)
//!
//! Хост регистрирует `CombatScript` реализации в `CombatScripts`. Без
//! зарегистрированных скриптов combat core работает по дефолтным правилам.

use bevy::prelude::*;
use super::WeaponDefId;

/// Решение скрипта по кандидату в цели
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetDecision {
    /// Цель исключается
    Deny,
    /// Цель принимается с заданным priority (дефолтный scoring пропускается)
    Allow { priority: f32 },
}

pub trait CombatScript: Send + Sync {
    /// Уведомление перед взрывом; true — подавить визуальный эффект
    fn explosion(&self, _weapon_def: Option<WeaponDefId>, _position: Vec3, _owner: Option<Entity>) -> bool {
        false
    }

    /// None — скрипт не вмешивается, работает дефолтный scoring
    fn allow_weapon_target(
        &self,
        _attacker: Entity,
        _target: Entity,
        _weapon_index: usize,
        _weapon_def: WeaponDefId,
    ) -> Option<TargetDecision> {
        None
    }
}

#[derive(Resource, Default)]
pub struct CombatScripts {
    scripts: Vec<Box<dyn CombatScript>>,
}

impl CombatScripts {
    pub fn add(&mut self, script: impl CombatScript + 'static) {
        self.scripts.push(Box::new(script));
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Уведомляет все скрипты; gfx подавлен, если хотя бы один попросил
    pub fn explosion(&self, weapon_def: Option<WeaponDefId>, position: Vec3, owner: Option<Entity>) -> bool {
        self.scripts
            .iter()
            .fold(false, |suppress, script| script.explosion(weapon_def, position, owner) || suppress)
    }

    /// Первое решение в порядке регистрации
    pub fn allow_weapon_target(
        &self,
        attacker: Entity,
        target: Entity,
        weapon_index: usize,
        weapon_def: WeaponDefId,
    ) -> Option<TargetDecision> {
        self.scripts
            .iter()
            .find_map(|script| script.allow_weapon_target(attacker, target, weapon_index, weapon_def))
    }
}
