//! Simulation clock
//!
//! Один кадр = один fixed step. Номер кадра индексирует deferred damage ring
//! и piece-hit кэш, поэтому меняется только в `tick_sim_clock`.

use bevy::prelude::*;

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimClock {
    pub frame: u32,
}

impl SimClock {
    pub fn advance(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }
}

/// Система: последний шаг кадра — переход к следующему номеру
pub fn tick_sim_clock(mut clock: ResMut<SimClock>) {
    clock.advance();
}
