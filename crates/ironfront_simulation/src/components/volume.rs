//! Collision volumes
//!
//! Приближённая bounding geometry для hit/distance тестов. Для distance math
//! используется только bounding sphere (offsets + bounding_radius), поэтому
//! для несферических форм расчёт урона — приближение.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum VolumeShape {
    Sphere,
    Ellipsoid,
    /// Ось цилиндра — локальная Y
    Cylinder,
    Box,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct CollisionVolume {
    pub shape: VolumeShape,
    /// Полные размеры по осям (для сферы все три = диаметр)
    pub scales: Vec3,
    /// Смещение центра volume относительно mid-point владельца
    pub offsets: Vec3,
    /// Радиус минимальной описанной сферы
    pub bounding_radius: f32,
}

impl Default for CollisionVolume {
    fn default() -> Self {
        Self::sphere(1.0)
    }
}

impl CollisionVolume {
    pub fn sphere(radius: f32) -> Self {
        Self {
            shape: VolumeShape::Sphere,
            scales: Vec3::splat(radius * 2.0),
            offsets: Vec3::ZERO,
            bounding_radius: radius,
        }
    }

    pub fn new(shape: VolumeShape, scales: Vec3) -> Self {
        let half = scales * 0.5;
        let bounding_radius = match shape {
            VolumeShape::Sphere => half.x,
            VolumeShape::Ellipsoid => half.max_element(),
            VolumeShape::Cylinder => {
                let radius = half.x.max(half.z);
                (radius * radius + half.y * half.y).sqrt()
            }
            VolumeShape::Box => half.length(),
        };

        Self {
            shape,
            scales,
            offsets: Vec3::ZERO,
            bounding_radius,
        }
    }

    pub fn with_offsets(mut self, offsets: Vec3) -> Self {
        self.offsets = offsets;
        self
    }
}

/// Попадание в конкретный piece модели
///
/// Пишется damage path'ом в `UnitState::last_attacked_piece`; валидно только
/// в кадре `frame` — в следующих кадрах используется volume всего юнита.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct PieceHit {
    /// Volume piece'а
    pub volume: CollisionVolume,
    /// Позиция piece'а в локальном фрейме юнита (right, up, front)
    pub position: Vec3,
    pub frame: u32,
}
