//! Tests for explosion resolution.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use crate::combat::*;
    use crate::components::{CollisionVolume, Feature, Health, PieceHit, ResidualImpulse, Unit};
    use crate::config::CombatConfig;
    use crate::shared::SimContext;
    use crate::spatial::{refresh_quad_field, UnitView};
    use crate::create_combat_world;

    const CENTER: Vec3 = Vec3::new(500.0, 0.0, 500.0);

    fn sphere_target(center: Vec3, radius: f32) -> UnitDamageTarget {
        UnitDamageTarget {
            center,
            bounding_radius: radius,
            under_water: false,
        }
    }

    fn spawn_unit(world: &mut World, position: Vec3) -> Entity {
        world
            .spawn((Unit::new(1, 1), Transform::from_translation(position), Health::new(100.0)))
            .id()
    }

    fn damage_events(world: &World) -> Vec<DamageDealt> {
        world
            .resource::<Events<DamageDealt>>()
            .iter_current_update_events()
            .cloned()
            .collect()
    }

    #[test]
    fn test_unit_at_half_radius() {
        // R = 100, e = 0, bounding radius 5 на дистанции 50
        let config = CombatConfig::default();
        let params = ExplosionParams::new(Vec3::ZERO, DamageArray::uniform(100.0, 1), 100.0);

        let effect = unit_explosion_effect(&params, &sphere_target(Vec3::new(50.0, 0.0, 0.0), 5.0), &config)
            .expect("unit inside radius");

        assert!(effect.damage_falloff > 0.0 && effect.damage_falloff < 1.0);
        assert!((effect.damage_falloff - 0.55).abs() < 1e-5, "falloff = {}", effect.damage_falloff);
        assert!((effect.damages.default_damage() - 55.0).abs() < 1e-3);

        // Направление от центра + небольшой подъём
        assert!(effect.impulse.x > 0.0);
        assert!(effect.impulse.y > 0.0);
        assert!((effect.impulse.y / effect.impulse.x - config.impulse_upward_bias).abs() < 1e-5);
        assert_eq!(effect.impulse.z, 0.0);

        // 45 ≥ 4 × 8 → deferred, 45 / 8 = 5 кадров
        assert_eq!(effect.delivery, Delivery::Deferred { delay_frames: 5 });
    }

    #[test]
    fn test_unit_beyond_radius_unaffected() {
        let config = CombatConfig::default();
        let params = ExplosionParams::new(Vec3::ZERO, DamageArray::uniform(100.0, 1), 100.0);

        assert!(unit_explosion_effect(&params, &sphere_target(Vec3::new(106.0, 0.0, 0.0), 5.0), &config).is_none());
    }

    #[test]
    fn test_edge_effectiveness_softens_falloff() {
        let hard = edge_falloff(100.0, 50.0, 0.0);
        let soft = edge_falloff(100.0, 50.0, 0.5);

        assert!((hard - 0.5).abs() < 1e-6);
        assert!(soft > hard); // 50 / 75
        assert_eq!(edge_falloff(100.0, 100.0, 0.0), MIN_FALLOFF);
        assert_eq!(edge_falloff(100.0, 100.0, 1.0), MIN_FALLOFF); // 0/0
    }

    #[test]
    fn test_submerged_unit_takes_less_from_surface_burst() {
        let config = CombatConfig::default();
        let params = ExplosionParams::new(Vec3::ZERO, DamageArray::uniform(100.0, 1), 100.0);
        let dry = sphere_target(Vec3::new(50.0, 0.0, 0.0), 5.0);
        let wet = UnitDamageTarget {
            under_water: true,
            ..dry
        };

        let dry_effect = unit_explosion_effect(&params, &dry, &config).expect("dry hit");
        let wet_effect = unit_explosion_effect(&params, &wet, &config).expect("wet hit");

        assert!((wet_effect.damage_falloff - 0.5).abs() < 1e-5);
        assert!(wet_effect.damage_falloff < dry_effect.damage_falloff);
        // Impulse считается по center дистанции и не меняется
        assert_eq!(wet_effect.impulse, dry_effect.impulse);
    }

    #[test]
    fn test_extreme_damage_is_clamped() {
        let config = CombatConfig::default();
        let mut damages = DamageArray::uniform(1e9, 1);
        damages.impulse_boost = 1e9;
        let params = ExplosionParams::new(Vec3::ZERO, damages, 100.0);

        let effect = unit_explosion_effect(&params, &sphere_target(Vec3::new(1.0, 0.0, 0.0), 5.0), &config)
            .expect("point blank");

        assert!(effect.impulse.length() <= config.max_explosion_impulse * 1.0001);
        assert!(effect.damages.default_damage() <= config.max_explosion_damage);
        assert_eq!(effect.delivery, Delivery::Immediate);
    }

    #[test]
    fn test_far_feature_unaffected() {
        // Feature в 1000 от взрыва радиуса 50
        let config = CombatConfig::default();
        let params = ExplosionParams::new(Vec3::ZERO, DamageArray::uniform(100.0, 1), 50.0);

        let effect = feature_explosion_effect(&params, Vec3::new(1000.0, 0.0, 0.0), &CollisionVolume::sphere(10.0), &config);
        assert!(effect.is_none());
    }

    #[test]
    fn test_bulky_feature_gets_minimum_effect() {
        let config = CombatConfig::default();
        let params = ExplosionParams::new(Vec3::ZERO, DamageArray::uniform(100.0, 1), 20.0);

        // dist 19.5 < 19 × 1.1, линейный falloff 0.025 → поднимается до 0.1
        let effect = feature_explosion_effect(&params, Vec3::new(19.5, 0.0, 0.0), &CollisionVolume::sphere(19.0), &config)
            .expect("minimum effect");
        assert!((effect.falloff - 0.1).abs() < 1e-6);
        assert!((effect.damages.default_damage() - 10.0).abs() < 1e-4);
        assert!(effect.impulse.x > 0.0);

        // Маленькая feature на той же дистанции — честный falloff
        let small = feature_explosion_effect(&params, Vec3::new(19.5, 0.0, 0.0), &CollisionVolume::sphere(2.0), &config)
            .expect("linear effect");
        assert!((small.falloff - 0.025).abs() < 1e-5);
    }

    #[test]
    fn test_crater_only_near_ground() {
        let config = CombatConfig::default();
        let mut params = ExplosionParams::new(Vec3::new(100.0, 0.0, 100.0), DamageArray::uniform(100.0, 1), 50.0);

        let crater = crater_effect(&params, 0.0, &config).expect("ground burst");
        assert_eq!(crater.strength, 100.0);
        assert_eq!(crater.radius, 50.0);

        // Воздушный взрыв выше радиуса кратера
        params.position.y = 60.0;
        assert!(crater_effect(&params, 0.0, &config).is_none());

        // Под землёй
        params.position.y = -5.0;
        assert!(crater_effect(&params, 0.0, &config).is_none());

        params.position.y = 0.0;
        let disabled = CombatConfig {
            map_damage_disabled: true,
            ..default()
        };
        assert!(crater_effect(&params, 0.0, &disabled).is_none());
    }

    #[test]
    fn test_resolve_damages_nearby_unit_and_emits_events() {
        let mut world = create_combat_world(7);
        let unit = spawn_unit(&mut world, CENTER + Vec3::new(20.0, 0.0, 0.0));
        refresh_quad_field(&mut world);

        let params = ExplosionParams::new(CENTER, DamageArray::uniform(100.0, 1), 100.0);
        resolve_explosion(&mut world, &params);

        // edge 20 − 1 = 19 → falloff 0.81 → 81 урона
        let health = world.get::<Health>(unit).expect("health");
        assert!((health.current - 19.0).abs() < 1e-3, "health = {}", health.current);
        assert!(world.get::<ResidualImpulse>(unit).expect("impulse").0.x > 0.0);

        let dealt = damage_events(&world);
        assert_eq!(dealt.len(), 1);
        assert_eq!(dealt[0].target, unit);

        assert_eq!(world.resource::<Events<ExplosionOccurred>>().len(), 1);
        assert_eq!(world.resource::<Events<ExplosionVisualRequested>>().len(), 1);
        assert_eq!(world.resource::<Events<MapDamageRequested>>().len(), 1);
    }

    #[test]
    fn test_far_feature_state_unchanged() {
        let mut world = create_combat_world(7);
        let feature = world
            .spawn((
                Feature::default(),
                CollisionVolume::sphere(8.0),
                Transform::from_translation(CENTER + Vec3::new(1000.0, 0.0, 0.0)),
            ))
            .id();
        refresh_quad_field(&mut world);

        let params = ExplosionParams::new(CENTER, DamageArray::uniform(100.0, 1), 50.0);
        resolve_explosion(&mut world, &params);

        assert_eq!(world.get::<Health>(feature), Some(&Health::new(100.0)));
        assert_eq!(world.get::<ResidualImpulse>(feature), Some(&ResidualImpulse(Vec3::ZERO)));
        assert!(damage_events(&world).is_empty());
    }

    #[test]
    fn test_feature_damage_has_no_attacker() {
        let mut world = create_combat_world(7);
        let owner = spawn_unit(&mut world, CENTER + Vec3::new(400.0, 0.0, 0.0));
        let feature = world
            .spawn((
                Feature::default(),
                CollisionVolume::sphere(4.0),
                Transform::from_translation(CENTER + Vec3::new(10.0, 0.0, 0.0)),
            ))
            .id();
        refresh_quad_field(&mut world);

        let mut params = ExplosionParams::new(CENTER, DamageArray::uniform(100.0, 1), 50.0);
        params.owner = Some(owner);
        resolve_explosion(&mut world, &params);

        assert!(world.get::<Health>(feature).is_some_and(|h| h.current < 100.0));
        let events = damage_events(&world);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target, feature);
        assert_eq!(events[0].attacker, None);
    }

    #[test]
    fn test_feature_without_volume_is_immune() {
        let mut world = create_combat_world(7);
        let feature = world
            .spawn((Feature::default(), Transform::from_translation(CENTER + Vec3::new(5.0, 0.0, 0.0))))
            .id();
        refresh_quad_field(&mut world);

        let params = ExplosionParams::new(CENTER, DamageArray::uniform(100.0, 1), 50.0).with_hit_feature(feature);
        resolve_explosion(&mut world, &params);

        assert_eq!(world.get::<Health>(feature).map(|h| h.current), Some(100.0));
    }

    #[test]
    fn test_far_unit_damage_is_deferred() {
        let mut world = create_combat_world(7);
        // edge 60 − 1 = 59 ≥ 32 → delay 7 кадров → слот +4
        let unit = spawn_unit(&mut world, CENTER + Vec3::new(60.0, 0.0, 0.0));
        refresh_quad_field(&mut world);

        let params = ExplosionParams::new(CENTER, DamageArray::uniform(100.0, 1), 100.0);
        resolve_explosion(&mut world, &params);

        assert_eq!(world.get::<Health>(unit).map(|h| h.current), Some(100.0));
        assert_eq!(world.resource::<DeferredDamageQueue>().pending(), 1);

        for frame in 1..4 {
            advance_frame(&mut world, frame);
            assert_eq!(world.get::<Health>(unit).map(|h| h.current), Some(100.0));
        }
        advance_frame(&mut world, 4);

        let health = world.get::<Health>(unit).expect("health").current;
        assert!(health < 100.0);
        assert_eq!(world.resource::<DeferredDamageQueue>().pending(), 0);
    }

    #[test]
    fn test_impact_only_hits_single_unit() {
        let mut world = create_combat_world(7);
        let hit = spawn_unit(&mut world, CENTER + Vec3::new(5.0, 0.0, 0.0));
        let bystander = spawn_unit(&mut world, CENTER + Vec3::new(-5.0, 0.0, 0.0));
        refresh_quad_field(&mut world);

        let mut params = ExplosionParams::new(CENTER, DamageArray::uniform(50.0, 1), 100.0).with_hit_unit(hit);
        params.impact_only = true;
        resolve_explosion(&mut world, &params);

        assert!(world.get::<Health>(hit).expect("health").current < 100.0);
        assert_eq!(world.get::<Health>(bystander).map(|h| h.current), Some(100.0));
        // Impact-only не деформирует terrain
        assert_eq!(world.resource::<Events<MapDamageRequested>>().len(), 0);
    }

    #[test]
    fn test_owner_spared_when_ignore_owner() {
        let mut world = create_combat_world(7);
        let owner = spawn_unit(&mut world, CENTER + Vec3::new(5.0, 0.0, 0.0));
        refresh_quad_field(&mut world);

        let mut params = ExplosionParams::new(CENTER, DamageArray::uniform(50.0, 1), 100.0);
        params.owner = Some(owner);
        params.ignore_owner = true;
        resolve_explosion(&mut world, &params);

        assert_eq!(world.get::<Health>(owner).map(|h| h.current), Some(100.0));
    }

    #[test]
    fn test_hit_unit_with_offset_volume_still_damaged() {
        let mut world = create_combat_world(7);
        // Footprint (radius 5) далеко от взрыва, но огромный volume достаёт до центра
        let unit = world
            .spawn((
                Unit {
                    radius: 5.0,
                    ..Unit::new(1, 1)
                },
                CollisionVolume::sphere(60.0),
                Transform::from_translation(CENTER + Vec3::new(80.0, 0.0, 0.0)),
            ))
            .id();
        refresh_quad_field(&mut world);

        let params = ExplosionParams::new(CENTER, DamageArray::uniform(50.0, 1), 30.0);
        resolve_explosion(&mut world, &params);
        assert_eq!(world.get::<Health>(unit).map(|h| h.current), Some(100.0));

        resolve_explosion(&mut world, &params.clone().with_hit_unit(unit));
        assert!(world.get::<Health>(unit).expect("health").current < 100.0);
    }

    struct NoGfx;

    impl CombatScript for NoGfx {
        fn explosion(&self, _weapon_def: Option<WeaponDefId>, _position: Vec3, _owner: Option<Entity>) -> bool {
            true
        }
    }

    #[test]
    fn test_script_suppresses_gfx_but_not_damage() {
        let mut world = create_combat_world(7);
        world.resource_mut::<CombatScripts>().add(NoGfx);
        let unit = spawn_unit(&mut world, CENTER + Vec3::new(10.0, 0.0, 0.0));
        refresh_quad_field(&mut world);

        resolve_explosion(&mut world, &ExplosionParams::new(CENTER, DamageArray::uniform(50.0, 1), 100.0));

        assert!(world.get::<Health>(unit).expect("health").current < 100.0);
        assert_eq!(world.resource::<Events<ExplosionVisualRequested>>().len(), 0);
        assert_eq!(world.resource::<Events<ExplosionOccurred>>().len(), 1);
    }

    #[test]
    fn test_weapon_generator_used_for_visual() {
        let mut world = create_combat_world(7);
        let mut def = WeaponDef::new("plasma", DamageArray::uniform(30.0, 1), 40.0);
        def.explosion_generator = Some("custom:plasma_burst".to_string());
        let id = world.resource_mut::<WeaponDefs>().add(def.clone());
        def.id = id;

        resolve_explosion(&mut world, &ExplosionParams::from_weapon(&def, CENTER, Vec3::NEG_Y, None));

        let visuals: Vec<_> = world
            .resource::<Events<ExplosionVisualRequested>>()
            .iter_current_update_events()
            .cloned()
            .collect();
        assert_eq!(visuals.len(), 1);
        assert_eq!(visuals[0].generator.as_deref(), Some("custom:plasma_burst"));
        assert_eq!(visuals[0].direction, Vec3::NEG_Y);
    }

    #[test]
    fn test_piece_volume_used_only_in_hit_frame() {
        let mut world = create_combat_world(7);
        let unit = world
            .spawn((
                Unit {
                    use_piece_volumes: true,
                    ..Unit::new(1, 1)
                },
                Transform::from_translation(CENTER),
            ))
            .id();
        record_piece_hit(
            &mut world,
            unit,
            PieceHit {
                volume: CollisionVolume::sphere(2.0),
                position: Vec3::new(0.0, 0.0, 30.0),
                frame: 0,
            },
        );

        let ctx = SimContext::from_world(&world).expect("combat resources");
        let view = UnitView::fetch(&world, unit).expect("unit view");

        let in_frame = UnitDamageTarget::from_view(&view, 0);
        assert!((in_frame.center - (CENTER + Vec3::new(0.0, 0.0, 30.0))).length() < 1e-4);
        assert_eq!(in_frame.bounding_radius, 2.0);

        let next_frame = UnitDamageTarget::from_view(&view, ctx.frame + 1);
        assert_eq!(next_frame.center, CENTER);
        assert_eq!(next_frame.bounding_radius, 1.0);
    }

    #[test]
    fn test_armor_multiplier_and_paralyzer() {
        let mut world = create_combat_world(7);
        let armored = world
            .spawn((
                Unit {
                    armor_class: 1,
                    armor_multiplier: 0.5,
                    ..Unit::new(1, 1)
                },
                Health::new(100.0),
            ))
            .id();

        let damages = DamageArray::new(vec![100.0, 40.0]);
        assert!(apply_unit_damage(&mut world, armored, &damages, Vec3::ZERO, None, None));
        assert_eq!(world.get::<Health>(armored).map(|h| h.current), Some(80.0));

        let mut emp = DamageArray::uniform(300.0, 2);
        emp.paralyze_time = 10;
        apply_unit_damage(&mut world, armored, &emp, Vec3::ZERO, None, None);
        let state = world.get::<crate::components::UnitState>(armored).expect("state");
        assert_eq!(state.paralyze_damage, 150.0);
        assert_eq!(world.get::<Health>(armored).map(|h| h.current), Some(80.0));
    }

    #[test]
    fn test_lethal_damage_marks_dead_once() {
        let mut world = create_combat_world(7);
        let unit = spawn_unit(&mut world, CENTER);
        let attacker = spawn_unit(&mut world, CENTER);

        let lethal = DamageArray::uniform(500.0, 1);
        assert!(apply_unit_damage(&mut world, unit, &lethal, Vec3::ZERO, Some(attacker), None));
        assert!(world.get::<Dead>(unit).is_some());
        // Мёртвый юнит урон больше не получает
        assert!(!apply_unit_damage(&mut world, unit, &lethal, Vec3::ZERO, Some(attacker), None));

        let died: Vec<EntityDied> = world
            .resource::<Events<EntityDied>>()
            .iter_current_update_events()
            .cloned()
            .collect();
        assert_eq!(
            died,
            vec![EntityDied {
                entity: unit,
                killer: Some(attacker)
            }]
        );
    }
}
