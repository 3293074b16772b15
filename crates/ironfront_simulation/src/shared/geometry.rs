//! Geometry helpers
//!
//! Карта лежит в плоскости XZ, Y — высота. "2D" везде означает XZ.

use bevy::prelude::*;

/// Минимальная дистанция для использования в качестве делителя
pub const MIN_DIVISOR_DISTANCE: f32 = 0.1;

#[inline]
pub fn sq_length_2d(v: Vec3) -> f32 {
    v.x * v.x + v.z * v.z
}

#[inline]
pub fn length_2d(v: Vec3) -> f32 {
    sq_length_2d(v).sqrt()
}

#[inline]
pub fn sq_distance_2d(a: Vec3, b: Vec3) -> f32 {
    sq_length_2d(a - b)
}

#[inline]
pub fn distance_2d(a: Vec3, b: Vec3) -> f32 {
    length_2d(a - b)
}

/// Переводит точку из локального фрейма entity (right/up/front) в world space
#[inline]
pub fn local_to_world(transform: &Transform, local: Vec3) -> Vec3 {
    transform.translation + transform.rotation * local
}
