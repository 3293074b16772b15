//! Deferred damage ring
//!
//! Взрыв доходит до далёких целей не мгновенно: урон кладётся в слот
//! `(frame + delay − 3) mod 128` и доставляется, когда симуляция дойдёт до
//! этого кадра. Один слот = один кадр, доставка FIFO внутри слота.

use bevy::prelude::*;
use crate::shared::SimClock;
use super::{apply_unit_damage, DamageArray, Dead, WeaponDefId};

/// Размер ring buffer'а (кадры)
pub const DEFERRED_DAMAGE_SLOTS: usize = 128;

/// Запас в кадрах, вычитаемый из задержки при выборе слота
pub const DEFERRED_DAMAGE_MARGIN: u32 = 3;

/// Максимальный offset слота относительно текущего кадра
const MAX_SLOT_OFFSET: u32 = DEFERRED_DAMAGE_SLOTS as u32 - 1;

/// Ожидающий доставки урон
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredDamage {
    pub attacker: Option<Entity>,
    pub target: Entity,
    pub damages: DamageArray,
    pub impulse: Vec3,
    pub weapon_def: Option<WeaponDefId>,
}

#[derive(Resource, Debug, Clone)]
pub struct DeferredDamageQueue {
    slots: Vec<Vec<DeferredDamage>>,
}

impl Default for DeferredDamageQueue {
    fn default() -> Self {
        Self {
            slots: vec![Vec::new(); DEFERRED_DAMAGE_SLOTS],
        }
    }
}

impl DeferredDamageQueue {
    /// Через сколько кадров будет доставлен record с задержкой `delay_frames`
    ///
    /// Результат всегда в [1, 127]: слот текущего кадра уже осушен, а offset ≥ 128
    /// переписал бы более ранний слот.
    pub fn slot_offset(delay_frames: u32) -> u32 {
        delay_frames
            .saturating_sub(DEFERRED_DAMAGE_MARGIN)
            .clamp(1, MAX_SLOT_OFFSET)
    }

    /// Кладёт record в слот; возвращает кадр доставки
    pub fn schedule(&mut self, current_frame: u32, delay_frames: u32, record: DeferredDamage) -> u32 {
        if delay_frames.saturating_sub(DEFERRED_DAMAGE_MARGIN) > MAX_SLOT_OFFSET {
            crate::log_warning(&format!(
                "Deferred damage delay {} exceeds ring capacity, clamped to {} frames",
                delay_frames, MAX_SLOT_OFFSET
            ));
        }

        let due_frame = current_frame.wrapping_add(Self::slot_offset(delay_frames));
        self.slots[due_frame as usize % DEFERRED_DAMAGE_SLOTS].push(record);
        due_frame
    }

    /// Забирает (и очищает) слот кадра `frame`
    pub fn take_due(&mut self, frame: u32) -> Vec<DeferredDamage> {
        std::mem::take(&mut self.slots[frame as usize % DEFERRED_DAMAGE_SLOTS])
    }

    /// Сколько records ждёт доставки
    pub fn pending(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }
}

/// Доставляет слот кадра `frame`
///
/// Исчезнувшие (или мёртвые) цели молча отбрасываются; исчезнувший
/// attacker превращается в None.
pub fn advance_frame(world: &mut World, frame: u32) {
    let due = match world.get_resource_mut::<DeferredDamageQueue>() {
        Some(mut queue) => queue.take_due(frame),
        None => return,
    };

    for record in due {
        let target_alive = world
            .get_entity(record.target)
            .is_ok_and(|entity| !entity.contains::<Dead>());
        if !target_alive {
            continue;
        }

        let attacker = record.attacker.filter(|&attacker| world.get_entity(attacker).is_ok());
        apply_unit_damage(
            world,
            record.target,
            &record.damages,
            record.impulse,
            attacker,
            record.weapon_def,
        );
    }
}

/// Exclusive system: осушает слот текущего кадра
pub fn drain_deferred_damage(world: &mut World) {
    let Some(frame) = world.get_resource::<SimClock>().map(|clock| clock.frame) else {
        return;
    };
    advance_frame(world, frame);
}
