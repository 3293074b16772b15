//! SimContext — явный контекст для core операций
//!
//! Вместо глобальных singleton'ов (quad field, team table, clock) каждая
//! операция получает `SimContext`, собранный из `&World`. Только чтение:
//! несколько контекстов могут жить одновременно, мутация мира идёт отдельной
//! фазой через `&mut World`.

use bevy::prelude::*;
use crate::config::CombatConfig;
use crate::spatial::QuadField;
use super::{AllyTeams, SimClock, Terrain};

#[derive(Clone, Copy)]
pub struct SimContext<'w> {
    pub world: &'w World,
    pub quad_field: &'w QuadField,
    pub teams: &'w AllyTeams,
    pub config: &'w CombatConfig,
    pub terrain: &'w Terrain,
    pub frame: u32,
}

impl<'w> SimContext<'w> {
    /// None — мир не инициализирован combat ресурсами
    pub fn from_world(world: &'w World) -> Option<Self> {
        Some(Self {
            world,
            quad_field: world.get_resource::<QuadField>()?,
            teams: world.get_resource::<AllyTeams>()?,
            config: world.get_resource::<CombatConfig>()?,
            terrain: world.get_resource::<Terrain>()?,
            frame: world.get_resource::<SimClock>()?.frame,
        })
    }
}
