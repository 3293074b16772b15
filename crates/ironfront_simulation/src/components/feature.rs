//! Features — неподвижные объекты карты (обломки, деревья, камни)

use bevy::prelude::*;
use super::{Health, ResidualImpulse};

/// Feature получает урон от взрывов, но не участвует в targeting
///
/// CollisionVolume опционален: feature без volume иммунна к взрывам.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform, Health, ResidualImpulse)]
pub struct Feature {
    /// Footprint радиус (quad field, exact queries)
    pub radius: f32,
    /// Mid-point в локальном фрейме относительно Transform
    pub relative_mid_pos: Vec3,
}

impl Default for Feature {
    fn default() -> Self {
        Self {
            radius: 8.0,
            relative_mid_pos: Vec3::ZERO,
        }
    }
}

impl Feature {
    pub fn mid_pos(&self, transform: &Transform) -> Vec3 {
        crate::shared::local_to_world(transform, self.relative_mid_pos)
    }
}
