//! Spatial index + generic spatial query engine
//!
//! Архитектура:
//! - QuadField: uniform grid, в каждой ячейке юниты разложены по allyteam
//!   (+ отдельный список features). Юнит лежит во всех ячейках, которые
//!   пересекает его footprint (position + radius).
//! - query_units(filter, aggregator): один обход ячеек, поведение задаётся
//!   UnitFilter (кого рассматривать) и UnitAggregator (что делать с каждым).
//! - Мутация QuadField только в `refresh_quad_field` (exclusive system);
//!   queries читают через `&World` и могут идти параллельно.

use bevy::ecs::entity::{EntityHashMap, EntityHashSet};
use bevy::prelude::*;
use crate::components::{Feature, Unit};
use crate::config::CombatConfig;

pub mod aggregate;
pub mod filter;
pub mod query;


pub use aggregate::*;
pub use filter::*;
pub use query::*;

/// Одна ячейка grid'а
#[derive(Debug, Clone, Default)]
pub struct Quad {
    /// team_units[allyteam] — юниты allyteam в порядке вставки
    team_units: Vec<Vec<Entity>>,
    features: Vec<Entity>,
}

/// Где и как entity сейчас зарегистрирован
#[derive(Debug, Clone, PartialEq)]
struct QuadEntry {
    quads: Vec<usize>,
    position: Vec3,
    radius: f32,
    allyteam: usize,
}

#[derive(Resource)]
pub struct QuadField {
    quad_size: f32,
    quads_x: usize,
    quads_z: usize,
    quads: Vec<Quad>,
    units: EntityHashMap<QuadEntry>,
    features: EntityHashMap<QuadEntry>,
    /// Максимальный footprint радиус среди когда-либо вставленных юнитов
    max_unit_radius: f32,
}

impl FromWorld for QuadField {
    fn from_world(world: &mut World) -> Self {
        let config = world.get_resource::<CombatConfig>().cloned().unwrap_or_default();
        Self::new(config.map_width, config.map_depth, config.quad_size)
    }
}

impl QuadField {
    pub fn new(map_width: f32, map_depth: f32, quad_size: f32) -> Self {
        let quad_size = quad_size.max(1.0);
        let quads_x = ((map_width / quad_size).ceil() as usize).max(1);
        let quads_z = ((map_depth / quad_size).ceil() as usize).max(1);

        Self {
            quad_size,
            quads_x,
            quads_z,
            quads: vec![Quad::default(); quads_x * quads_z],
            units: EntityHashMap::default(),
            features: EntityHashMap::default(),
            max_unit_radius: 0.0,
        }
    }

    pub fn quad_size(&self) -> f32 {
        self.quad_size
    }

    pub fn max_unit_radius(&self) -> f32 {
        self.max_unit_radius
    }

    pub fn contains_unit(&self, entity: Entity) -> bool {
        self.units.contains_key(&entity)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    fn clamp_index(coord: f32, quad_size: f32, count: usize) -> usize {
        let index = (coord / quad_size).floor();
        if index <= 0.0 {
            0
        } else {
            (index as usize).min(count - 1)
        }
    }

    /// Индексы ячеек, пересекающих bounding square круга (center, radius)
    ///
    /// Приближение: может включать ячейки вне самого круга. Порядок — row-major
    /// (z, затем x), детерминированный.
    pub fn cells_overlapping(&self, center: Vec3, radius: f32) -> Vec<usize> {
        let radius = radius.max(0.0);
        let min_x = Self::clamp_index(center.x - radius, self.quad_size, self.quads_x);
        let max_x = Self::clamp_index(center.x + radius, self.quad_size, self.quads_x);
        let min_z = Self::clamp_index(center.z - radius, self.quad_size, self.quads_z);
        let max_z = Self::clamp_index(center.z + radius, self.quad_size, self.quads_z);

        let mut cells = Vec::with_capacity((max_x - min_x + 1) * (max_z - min_z + 1));
        for z in min_z..=max_z {
            for x in min_x..=max_x {
                cells.push(z * self.quads_x + x);
            }
        }
        cells
    }

    /// Сколько allyteam bucket'ов заведено в ячейке
    pub fn allyteams_in_cell(&self, cell: usize) -> usize {
        self.quads.get(cell).map_or(0, |quad| quad.team_units.len())
    }

    /// Юниты allyteam в ячейке (в порядке вставки)
    pub fn units_in_cell(&self, cell: usize, allyteam: usize) -> &[Entity] {
        self.quads
            .get(cell)
            .and_then(|quad| quad.team_units.get(allyteam))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn features_in_cell(&self, cell: usize) -> &[Entity] {
        self.quads
            .get(cell)
            .map(|quad| quad.features.as_slice())
            .unwrap_or(&[])
    }

    /// Вставка или перемещение юнита
    pub fn insert_unit(&mut self, entity: Entity, position: Vec3, radius: f32, allyteam: usize) {
        self.remove_unit(entity);

        let quads = self.cells_overlapping(position, radius);
        for &cell in &quads {
            let team_units = &mut self.quads[cell].team_units;
            if team_units.len() <= allyteam {
                team_units.resize_with(allyteam + 1, Vec::new);
            }
            team_units[allyteam].push(entity);
        }

        self.max_unit_radius = self.max_unit_radius.max(radius);
        self.units.insert(
            entity,
            QuadEntry {
                quads,
                position,
                radius,
                allyteam,
            },
        );
    }

    pub fn remove_unit(&mut self, entity: Entity) {
        let Some(entry) = self.units.remove(&entity) else {
            return;
        };

        for cell in entry.quads {
            if let Some(list) = self.quads[cell].team_units.get_mut(entry.allyteam) {
                list.retain(|&e| e != entity);
            }
        }
    }

    pub fn insert_feature(&mut self, entity: Entity, position: Vec3, radius: f32) {
        self.remove_feature(entity);

        let quads = self.cells_overlapping(position, radius);
        for &cell in &quads {
            self.quads[cell].features.push(entity);
        }

        self.features.insert(
            entity,
            QuadEntry {
                quads,
                position,
                radius,
                allyteam: 0,
            },
        );
    }

    pub fn remove_feature(&mut self, entity: Entity) {
        let Some(entry) = self.features.remove(&entity) else {
            return;
        };

        for cell in entry.quads {
            self.quads[cell].features.retain(|&e| e != entity);
        }
    }

    /// Приводит индекс юнитов к переданному списку (entity, position, radius, allyteam)
    fn sync_units(&mut self, live_units: &[(Entity, Vec3, f32, usize)]) {
        let mut live = EntityHashSet::default();

        for &(entity, position, radius, allyteam) in live_units {
            live.insert(entity);

            let unchanged = self.units.get(&entity).is_some_and(|entry| {
                entry.position == position && entry.radius == radius && entry.allyteam == allyteam
            });
            if !unchanged {
                self.insert_unit(entity, position, radius, allyteam);
            }
        }

        let stale: Vec<Entity> = self
            .units
            .keys()
            .filter(|entity| !live.contains(*entity))
            .copied()
            .collect();
        for entity in stale {
            self.remove_unit(entity);
        }
    }

    fn sync_features(&mut self, live_features: &[(Entity, Vec3, f32)]) {
        let mut live = EntityHashSet::default();

        for &(entity, position, radius) in live_features {
            live.insert(entity);

            let unchanged = self
                .features
                .get(&entity)
                .is_some_and(|entry| entry.position == position && entry.radius == radius);
            if !unchanged {
                self.insert_feature(entity, position, radius);
            }
        }

        let stale: Vec<Entity> = self
            .features
            .keys()
            .filter(|entity| !live.contains(*entity))
            .copied()
            .collect();
        for entity in stale {
            self.remove_feature(entity);
        }
    }
}

/// Exclusive system: синхронизирует QuadField с Transform/Unit/Feature
///
/// Переставляет только сдвинувшиеся entity, удаляет despawned.
pub fn refresh_quad_field(world: &mut World) {
    let units: Vec<(Entity, Vec3, f32, usize)> = {
        let mut query = world.query::<(Entity, &Transform, &Unit)>();
        query
            .iter(world)
            .map(|(entity, transform, unit)| (entity, transform.translation, unit.radius, unit.allyteam))
            .collect()
    };

    let features: Vec<(Entity, Vec3, f32)> = {
        let mut query = world.query::<(Entity, &Transform, &Feature)>();
        query
            .iter(world)
            .map(|(entity, transform, feature)| (entity, transform.translation, feature.radius))
            .collect()
    };

    let Some(mut quad_field) = world.get_resource_mut::<QuadField>() else {
        crate::log_error("refresh_quad_field: QuadField resource missing");
        return;
    };

    quad_field.sync_units(&units);
    quad_field.sync_features(&features);
}
