//! ECS Components для combat entities
//!
//! Организация:
//! - unit: Unit, Health, UnitState, LosStatus, ResidualImpulse
//! - feature: Feature (обломки, деревья, камни)
//! - volume: CollisionVolume, PieceHit
//! - weapon: Weapons / Weapon (per-unit weapon slots)

pub mod feature;
pub mod unit;
pub mod volume;
pub mod weapon;

pub use feature::*;
pub use unit::*;
pub use volume::*;
pub use weapon::*;
