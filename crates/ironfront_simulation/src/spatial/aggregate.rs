//! UnitAggregator — что делать с каждым прошедшим фильтр юнитом
//!
//! Область поиска, которую задаёт aggregator, приблизительна (ячейки grid'а);
//! точную круговую проверку каждый aggregator делает сам в `visit`.

use bevy::prelude::*;
use crate::config::CombatConfig;
use crate::shared::{sq_distance_2d, AllyTeams};
use super::{perceived_position, UnitView};

pub trait UnitAggregator {
    /// Центр области поиска
    fn center(&self) -> Vec3;
    /// Радиус области поиска (для выбора ячеек)
    fn search_radius(&self) -> f32;
    /// Вызывается ровно один раз на юнит за query
    fn visit(&mut self, unit: &UnitView);
}

/// Откуда брать позицию юнита при сравнении дистанций
#[derive(Clone, Copy)]
pub enum PositionMode<'w> {
    /// Реальный mid-point
    Exact,
    /// Позиция с ошибкой радара, как её видит `viewer`
    Perceived {
        teams: &'w AllyTeams,
        config: &'w CombatConfig,
        viewer: usize,
    },
}

/// Ближайший юнит по 2D дистанции до mid-point
pub struct ClosestUnit<'w> {
    position: Vec3,
    radius: f32,
    close_sq_dist: f32,
    closest: Option<Entity>,
    mode: PositionMode<'w>,
}

impl<'w> ClosestUnit<'w> {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self::with_mode(position, radius, PositionMode::Exact)
    }

    pub fn with_mode(position: Vec3, radius: f32, mode: PositionMode<'w>) -> Self {
        Self {
            position,
            radius,
            close_sq_dist: radius * radius,
            closest: None,
            mode,
        }
    }

    pub fn closest(&self) -> Option<Entity> {
        self.closest
    }
}

impl UnitAggregator for ClosestUnit<'_> {
    fn center(&self) -> Vec3 {
        self.position
    }

    fn search_radius(&self) -> f32 {
        self.radius
    }

    fn visit(&mut self, unit: &UnitView) {
        let unit_pos = match self.mode {
            PositionMode::Exact => unit.mid_pos(),
            PositionMode::Perceived { teams, config, viewer } => {
                perceived_position(unit, teams, config, viewer)
            }
        };

        let sq_dist = sq_distance_2d(self.position, unit_pos);
        if sq_dist <= self.close_sq_dist {
            self.close_sq_dist = sq_dist;
            self.closest = Some(unit.entity);
        }
    }
}

/// Ближайший юнит (3D), который потенциально видит точку поиска
///
/// Сфера: дистанция считается до поверхности footprint'а юнита, поэтому
/// область поиска расширена на max unit radius. `can_be_blind` отключает
/// проверку LOS радиуса.
pub struct ClosestUnitInLos {
    position: Vec3,
    radius: f32,
    close_dist: f32,
    closest: Option<Entity>,
    can_be_blind: bool,
    los_div: f32,
}

impl ClosestUnitInLos {
    /// `max_unit_radius` — `QuadField::max_unit_radius()`; с 0 крупные юниты
    /// у края области поиска не найдутся
    pub fn new(position: Vec3, radius: f32, max_unit_radius: f32, can_be_blind: bool, los_div: f32) -> Self {
        Self {
            position,
            radius: radius + max_unit_radius,
            close_dist: radius,
            closest: None,
            can_be_blind,
            los_div,
        }
    }

    pub fn closest(&self) -> Option<Entity> {
        self.closest
    }
}

impl UnitAggregator for ClosestUnitInLos {
    fn center(&self) -> Vec3 {
        self.position
    }

    fn search_radius(&self) -> f32 {
        self.radius
    }

    fn visit(&mut self, unit: &UnitView) {
        let dist = (self.position - unit.mid_pos()).length() - unit.unit.radius;

        if dist <= self.close_dist && (self.can_be_blind || unit.unit.los_radius * self.los_div > dist) {
            self.close_dist = dist;
            self.closest = Some(unit.entity);
        }
    }
}

/// Ближайший юнит (2D цилиндр, без радиуса цели), который потенциально видит точку
pub struct ClosestUnitInLosCylinder {
    position: Vec3,
    radius: f32,
    close_sq_dist: f32,
    closest: Option<Entity>,
    can_be_blind: bool,
    los_div: f32,
}

impl ClosestUnitInLosCylinder {
    pub fn new(position: Vec3, radius: f32, can_be_blind: bool, los_div: f32) -> Self {
        Self {
            position,
            radius,
            close_sq_dist: radius * radius,
            closest: None,
            can_be_blind,
            los_div,
        }
    }

    pub fn closest(&self) -> Option<Entity> {
        self.closest
    }
}

impl UnitAggregator for ClosestUnitInLosCylinder {
    fn center(&self) -> Vec3 {
        self.position
    }

    fn search_radius(&self) -> f32 {
        self.radius
    }

    fn visit(&mut self, unit: &UnitView) {
        let sq_dist = sq_distance_2d(self.position, unit.mid_pos());
        let los_range = unit.unit.los_radius * self.los_div;

        if sq_dist <= self.close_sq_dist && (self.can_be_blind || los_range * los_range > sq_dist) {
            self.close_sq_dist = sq_dist;
            self.closest = Some(unit.entity);
        }
    }
}

/// Все юниты, чей mid-point внутри 2D круга поиска
pub struct AllUnitIds {
    position: Vec3,
    radius: f32,
    found: Vec<Entity>,
}

impl AllUnitIds {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            radius,
            found: Vec::new(),
        }
    }

    pub fn into_found(self) -> Vec<Entity> {
        self.found
    }
}

impl UnitAggregator for AllUnitIds {
    fn center(&self) -> Vec3 {
        self.position
    }

    fn search_radius(&self) -> f32 {
        self.radius
    }

    fn visit(&mut self, unit: &UnitView) {
        if sq_distance_2d(self.position, unit.mid_pos()) <= self.radius * self.radius {
            self.found.push(unit.entity);
        }
    }
}

/// Юниты, чей footprint пересекает сферу (или цилиндр) поиска
pub struct UnitsExact {
    position: Vec3,
    radius: f32,
    spherical: bool,
    found: Vec<Entity>,
}

impl UnitsExact {
    pub fn new(position: Vec3, radius: f32, spherical: bool) -> Self {
        Self {
            position,
            radius,
            spherical,
            found: Vec::new(),
        }
    }

    pub fn into_found(self) -> Vec<Entity> {
        self.found
    }
}

impl UnitAggregator for UnitsExact {
    fn center(&self) -> Vec3 {
        self.position
    }

    fn search_radius(&self) -> f32 {
        self.radius
    }

    fn visit(&mut self, unit: &UnitView) {
        let total_radius = self.radius + unit.unit.radius;
        let sq_dist = if self.spherical {
            (self.position - unit.mid_pos()).length_squared()
        } else {
            sq_distance_2d(self.position, unit.mid_pos())
        };

        if sq_dist < total_radius * total_radius {
            self.found.push(unit.entity);
        }
    }
}
