//! Property-based тесты damage math и deferred ring

use bevy::prelude::*;
use ironfront_simulation::combat::{
    edge_falloff, unit_explosion_effect, DamageArray, DeferredDamage, DeferredDamageQueue, ExplosionParams,
    UnitDamageTarget, DEFERRED_DAMAGE_MARGIN, DEFERRED_DAMAGE_SLOTS,
};
use ironfront_simulation::CombatConfig;
use proptest::prelude::*;

proptest! {
    #[test]
    fn falloff_never_increases_with_distance(
        radius in 1.0f32..1000.0,
        edge in 0.0f32..0.9,
        a in 0.0f32..=1.0,
        b in 0.0f32..=1.0,
    ) {
        let (near, far) = if a <= b { (a * radius, b * radius) } else { (b * radius, a * radius) };

        prop_assert!(edge_falloff(radius, near, edge) >= edge_falloff(radius, far, edge) - 1e-5);
    }

    #[test]
    fn no_effect_beyond_radius(
        radius in 1.0f32..500.0,
        volume in 0.5f32..50.0,
        extra in 0.01f32..1000.0,
    ) {
        let config = CombatConfig::default();
        let params = ExplosionParams::new(Vec3::ZERO, DamageArray::uniform(100.0, 1), radius);
        let target = UnitDamageTarget {
            center: Vec3::new(radius + volume + extra, 0.0, 0.0),
            bounding_radius: volume,
            under_water: false,
        };

        prop_assert!(unit_explosion_effect(&params, &target, &config).is_none());
    }

    #[test]
    fn impulse_and_damage_always_clamped(
        damage in -1e6f32..1e6,
        boost in -1e6f32..1e6,
        factor in 0.0f32..100.0,
        distance in 0.0f32..100.0,
        height in -50.0f32..50.0,
    ) {
        let config = CombatConfig::default();
        let mut damages = DamageArray::uniform(damage, 3);
        damages.impulse_boost = boost;
        damages.impulse_factor = factor;
        let params = ExplosionParams::new(Vec3::ZERO, damages, 100.0);
        let target = UnitDamageTarget {
            center: Vec3::new(distance, height, 0.0),
            bounding_radius: 3.0,
            under_water: false,
        };

        if let Some(effect) = unit_explosion_effect(&params, &target, &config) {
            prop_assert!(effect.impulse.length() <= config.max_explosion_impulse * (1.0 + 1e-5));
            for value in &effect.damages.damages {
                prop_assert!(value.abs() <= config.max_explosion_damage);
            }
        }
    }

    #[test]
    fn deferred_record_delivered_exactly_once(
        start in 0u32..10_000,
        delay in (DEFERRED_DAMAGE_MARGIN + 1)..(DEFERRED_DAMAGE_SLOTS as u32 + DEFERRED_DAMAGE_MARGIN - 1),
    ) {
        let mut queue = DeferredDamageQueue::default();
        let due = queue.schedule(start, delay, DeferredDamage {
            attacker: None,
            target: Entity::PLACEHOLDER,
            damages: DamageArray::default(),
            impulse: Vec3::ZERO,
            weapon_def: None,
        });
        prop_assert_eq!(due, start + delay - DEFERRED_DAMAGE_MARGIN);

        let mut deliveries = 0;
        for frame in start + 1..start + 2 * DEFERRED_DAMAGE_SLOTS as u32 {
            let taken = queue.take_due(frame).len();
            if taken > 0 {
                prop_assert_eq!(frame, due);
            }
            deliveries += taken;
        }
        prop_assert_eq!(deliveries, 1);
    }
}
