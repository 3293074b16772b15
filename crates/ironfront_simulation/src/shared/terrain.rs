//! Terrain heightmap (read-only для combat core)
//!
//! Деформация карты — внешний collaborator: core только отправляет
//! `MapDamageRequested`, сам heightmap здесь не меняется.

use bevy::prelude::*;
use crate::config::{CombatConfig, SQUARE_SIZE};

#[derive(Resource, Debug, Clone)]
pub struct Terrain {
    /// Вершин по X / Z (клеток + 1)
    verts_x: usize,
    verts_z: usize,
    heights: Vec<f32>,
    /// Минимальная высота карты на момент загрузки
    initial_min_height: f32,
}

impl FromWorld for Terrain {
    fn from_world(world: &mut World) -> Self {
        let config = world.get_resource::<CombatConfig>().cloned().unwrap_or_default();
        Self::flat(config.map_width, config.map_depth, 0.0)
    }
}

impl Terrain {
    /// Плоская карта `width × depth` на высоте `height`
    pub fn flat(width: f32, depth: f32, height: f32) -> Self {
        let verts_x = (width.max(SQUARE_SIZE) / SQUARE_SIZE) as usize + 1;
        let verts_z = (depth.max(SQUARE_SIZE) / SQUARE_SIZE) as usize + 1;

        Self {
            verts_x,
            verts_z,
            heights: vec![height; verts_x * verts_z],
            initial_min_height: height,
        }
    }

    /// Устанавливает высоту вершины (x, z) в клетках
    pub fn set_vertex_height(&mut self, x: usize, z: usize, height: f32) {
        if x < self.verts_x && z < self.verts_z {
            self.heights[z * self.verts_x + x] = height;
            self.initial_min_height = self.initial_min_height.min(height);
        }
    }

    pub fn initial_min_height(&self) -> f32 {
        self.initial_min_height
    }

    fn vertex(&self, x: usize, z: usize) -> f32 {
        let x = x.min(self.verts_x - 1);
        let z = z.min(self.verts_z - 1);
        self.heights[z * self.verts_x + x]
    }

    /// Реальная высота поверхности в world-точке (x, z), bilinear
    ///
    /// Точки за пределами карты clamp'ятся к краю.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let max_x = (self.verts_x - 1) as f32;
        let max_z = (self.verts_z - 1) as f32;
        let fx = (x / SQUARE_SIZE).clamp(0.0, max_x);
        let fz = (z / SQUARE_SIZE).clamp(0.0, max_z);

        let x0 = fx.floor() as usize;
        let z0 = fz.floor() as usize;
        let tx = fx - x0 as f32;
        let tz = fz - z0 as f32;

        let h00 = self.vertex(x0, z0);
        let h10 = self.vertex(x0 + 1, z0);
        let h01 = self.vertex(x0, z0 + 1);
        let h11 = self.vertex(x0 + 1, z0 + 1);

        let near = h00 + (h10 - h00) * tx;
        let far = h01 + (h11 - h01) * tx;
        near + (far - near) * tz
    }
}
