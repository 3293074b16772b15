//! Headless симуляция IRONFRONT
//!
//! Короткий skirmish: две линии юнитов, артиллерия каждой стороны раз в
//! секунду бьёт по своей текущей цели. Печатает потери и итоговый snapshot.

use bevy::prelude::*;
use ironfront_simulation::combat::{DamageArray, ExplosionParams, ExplosionRequested, WeaponDef, WeaponDefs};
use ironfront_simulation::{
    create_headless_app, log_info, state_snapshot, Dead, EntityDied, Health, LosStatus, Unit, Weapon, Weapons,
    GAME_SPEED, LOS_INLOS, LOS_PREVLOS,
};

const SEED: u64 = 42;
const UNITS_PER_SIDE: usize = 8;
const FRAMES: u32 = 60 * GAME_SPEED;

fn spawn_side(world: &mut World, allyteam: usize, z: f32, weapon: &Weapon) {
    for i in 0..UNITS_PER_SIDE {
        world.spawn((
            Unit::new(allyteam, allyteam),
            Transform::from_xyz(600.0 + i as f32 * 40.0, 0.0, z),
            Health::new(400.0),
            LosStatus::uniform(2, LOS_INLOS | LOS_PREVLOS),
            Weapons::single(weapon.clone()),
        ));
    }
}

/// Каждая живая артиллерия стреляет по своей цели раз в секунду
fn fire_weapons(world: &mut World, frame: u32) {
    if frame % GAME_SPEED != 0 {
        return;
    }

    let shots: Vec<(Entity, Entity, WeaponDef)> = {
        let Some(defs) = world.get_resource::<WeaponDefs>().cloned() else {
            return;
        };
        let mut query = world.query_filtered::<(Entity, &Weapons), Without<Dead>>();
        query
            .iter(world)
            .filter_map(|(shooter, weapons)| {
                let weapon = weapons.slots.first()?;
                Some((shooter, weapon.target?, defs.get(weapon.def)?.clone()))
            })
            .collect()
    };

    for (shooter, target, def) in shots {
        let Some(target_pos) = world.get::<Transform>(target).map(|t| t.translation) else {
            continue;
        };
        let params = ExplosionParams::from_weapon(&def, target_pos, Vec3::NEG_Y, Some(shooter)).with_hit_unit(target);
        world.send_event(ExplosionRequested(params));
    }
}

fn main() {
    println!("Starting IRONFRONT headless simulation (seed: {})", SEED);

    let mut app = create_headless_app(SEED);
    app.finish();
    app.cleanup();

    let world = app.world_mut();
    world.run_schedule(Startup);

    let shell = {
        let mut damages = DamageArray::uniform(120.0, 1);
        damages.impulse_factor = 0.5;
        let mut def = WeaponDef::new("light_shell", damages, 48.0);
        def.edge_effectiveness = 0.3;
        def.explosion_speed = 6.0;
        world.resource_mut::<WeaponDefs>().add(def)
    };
    let weapon = Weapon::new(shell, 500.0);

    spawn_side(world, 0, 600.0, &weapon);
    spawn_side(world, 1, 900.0, &weapon);

    let mut casualties = 0;
    for frame in 0..FRAMES {
        fire_weapons(world, frame);
        world.run_schedule(FixedUpdate);

        if let Some(mut died) = world.get_resource_mut::<Events<EntityDied>>() {
            casualties += died.drain().count();
        }

        if frame % (10 * GAME_SPEED) == 0 {
            log_info(&format!("Frame {}: {} casualties so far", frame, casualties));
        }
    }

    let snapshot = state_snapshot(world);
    println!(
        "Simulation complete! {} casualties, snapshot {} bytes",
        casualties,
        snapshot.len()
    );
}
