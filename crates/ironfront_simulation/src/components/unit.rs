//! Unit компоненты: Unit, Health, UnitState, LosStatus, ResidualImpulse

use bevy::prelude::*;
use super::{CollisionVolume, PieceHit};

/// LOS status bits (per allyteam)
pub const LOS_INLOS: u8 = 1 << 0;
/// Юнит сейчас на радаре
pub const LOS_INRADAR: u8 = 1 << 1;
/// Юнит когда-либо был в LOS (stale memory)
pub const LOS_PREVLOS: u8 = 1 << 2;
/// Юнит непрерывно на радаре с момента последнего LOS
pub const LOS_CONTRADAR: u8 = 1 << 3;

/// Боевой юнит — только поля нужные для damage/targeting math
///
/// Автоматически добавляет Transform, Health, UnitState, LosStatus,
/// CollisionVolume, ResidualImpulse через Required Components.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform, Health, UnitState, LosStatus, CollisionVolume, ResidualImpulse)]
pub struct Unit {
    pub team: usize,
    pub allyteam: usize,
    /// Category bitmask (сравнивается с target category масками оружия)
    pub category: u32,
    /// Индекс в DamageArray
    pub armor_class: usize,
    /// Текущий множитель брони (1.0 = без модификатора)
    pub armor_multiplier: f32,
    /// "Ценность" юнита для target scoring
    pub power: f32,
    /// Footprint радиус (quad field, exact queries)
    pub radius: f32,
    /// Mid-point в локальном фрейме относительно Transform
    pub relative_mid_pos: Vec3,
    /// LOS радиус в LOS-клетках (× los_div = world units)
    pub los_radius: f32,
    pub can_fly: bool,
    /// false — здание (ghosting разрешён)
    pub mobile: bool,
    /// Использовать per-piece volumes для взрывов по попаданию
    pub use_piece_volumes: bool,
    /// Не реагирует на bugger-off (если не forced)
    pub push_resistant: bool,
}

impl Default for Unit {
    fn default() -> Self {
        Self {
            team: 0,
            allyteam: 0,
            category: 1,
            armor_class: 0,
            armor_multiplier: 1.0,
            power: 100.0,
            radius: 10.0,
            relative_mid_pos: Vec3::ZERO,
            los_radius: 20.0,
            can_fly: false,
            mobile: true,
            use_piece_volumes: false,
            push_resistant: false,
        }
    }
}

impl Unit {
    pub fn new(team: usize, allyteam: usize) -> Self {
        Self {
            team,
            allyteam,
            ..default()
        }
    }

    /// Mid-point в world space
    pub fn mid_pos(&self, transform: &Transform) -> Vec3 {
        crate::shared::local_to_world(transform, self.relative_mid_pos)
    }
}

/// Здоровье (units и features)
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Отрицательный amount лечит (clamp к max)
    pub fn take_damage(&mut self, amount: f32) {
        self.current = (self.current - amount).clamp(0.0, self.max);
    }
}

/// Изменяемое состояние юнита, которое читает combat core
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct UnitState {
    /// Самолёт падает (уже не боеспособен)
    pub crashing: bool,
    pub under_water: bool,
    /// Накопленный paralyzer урон (health не трогает)
    pub paralyze_damage: f32,
    /// Нормированный вектор ошибки радара (× radar error size = offset)
    pub pos_error_vector: Vec3,
    /// Последний piece, в который попал снаряд
    pub last_attacked_piece: Option<PieceHit>,
}

impl UnitState {
    /// Порог: max health или текущий health (CombatConfig::paralyze_on_max_health)
    pub fn is_paralyzed(&self, health: &Health, on_max_health: bool) -> bool {
        let threshold = if on_max_health { health.max } else { health.current };
        self.paralyze_damage > threshold
    }

    /// Piece hit, записанный в кадре `frame` (иначе None)
    pub fn piece_hit_at(&self, frame: u32) -> Option<&PieceHit> {
        self.last_attacked_piece.as_ref().filter(|hit| hit.frame == frame)
    }
}

/// Видимость юнита для каждой allyteam (биты LOS_*)
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct LosStatus {
    pub per_allyteam: Vec<u8>,
}

impl LosStatus {
    /// Одинаковый статус для `count` allyteams
    pub fn uniform(count: usize, bits: u8) -> Self {
        Self {
            per_allyteam: vec![bits; count],
        }
    }

    pub fn get(&self, allyteam: usize) -> u8 {
        self.per_allyteam.get(allyteam).copied().unwrap_or(0)
    }

    pub fn set(&mut self, allyteam: usize, bits: u8) {
        if self.per_allyteam.len() <= allyteam {
            self.per_allyteam.resize(allyteam + 1, 0);
        }
        self.per_allyteam[allyteam] = bits;
    }

    pub fn in_los_or_radar(&self, allyteam: usize) -> bool {
        self.get(allyteam) & (LOS_INLOS | LOS_INRADAR) != 0
    }
}

/// Накопленный impulse от взрывов (потребляется movement/physics слоем)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct ResidualImpulse(pub Vec3);
