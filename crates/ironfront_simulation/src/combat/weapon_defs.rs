//! Статические определения оружия
//!
//! `WeaponDef` неизменяем после регистрации; юниты ссылаются на него через
//! `WeaponDefId` (индекс в `WeaponDefs`).

use bevy::prelude::*;
use super::DamageArray;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct WeaponDefId(pub u32);

#[derive(Debug, Clone)]
pub struct WeaponDef {
    pub id: WeaponDefId,
    pub name: String,
    pub damages: DamageArray,
    /// Радиус урона взрыва
    pub area_of_effect: f32,
    /// Радиус кратера (обычно = area_of_effect)
    pub crater_area_of_effect: f32,
    /// 0..1, доля полного урона на краю взрыва
    pub edge_effectiveness: f32,
    /// Скорость распространения взрыва (world units / кадр)
    pub explosion_speed: f32,
    /// Вес дистанции в target priority
    pub proximity_priority: f32,
    /// Может стрелять по подводным целям
    pub water_weapon: bool,
    /// Урон только по цели попадания
    pub impact_only: bool,
    /// Взрыв не задевает владельца
    pub no_self_damage: bool,
    pub damage_ground: bool,
    /// Имя explosion generator'а (None — стандартный)
    pub explosion_generator: Option<String>,
}

impl WeaponDef {
    /// Id назначается при регистрации в `WeaponDefs`
    pub fn new(name: impl Into<String>, damages: DamageArray, area_of_effect: f32) -> Self {
        Self {
            id: WeaponDefId(0),
            name: name.into(),
            damages,
            area_of_effect,
            crater_area_of_effect: area_of_effect,
            edge_effectiveness: 0.0,
            explosion_speed: 8.0,
            proximity_priority: 1.0,
            water_weapon: false,
            impact_only: false,
            no_self_damage: false,
            damage_ground: true,
            explosion_generator: None,
        }
    }

    pub fn is_paralyzer(&self) -> bool {
        self.damages.paralyze_time > 0
    }
}

/// Таблица weapon defs
#[derive(Resource, Debug, Clone, Default)]
pub struct WeaponDefs {
    defs: Vec<WeaponDef>,
}

impl WeaponDefs {
    pub fn add(&mut self, mut def: WeaponDef) -> WeaponDefId {
        let id = WeaponDefId(self.defs.len() as u32);
        def.id = id;
        self.defs.push(def);
        id
    }

    pub fn get(&self, id: WeaponDefId) -> Option<&WeaponDef> {
        self.defs.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
