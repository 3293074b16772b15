//! Runtime combat configuration (`assets/combat.toml`)
//!
//! `CombatConfig` — Bevy Resource с дефолтами из констант ниже.
//! `load_combat_config` (Startup) перезаписывает дефолты значениями из файла;
//! отсутствующие ключи остаются дефолтными (`#[serde(default)]`).

use bevy::prelude::*;
use serde::Deserialize;

/// Размер terrain-клетки в world units (elmo)
pub const SQUARE_SIZE: f32 = 8.0;

/// Симуляционных кадров в секунду (fixed timestep)
pub const GAME_SPEED: u32 = 30;

pub const DEFAULT_MAX_EXPLOSION_IMPULSE: f32 = 10_000.0;
pub const DEFAULT_MAX_EXPLOSION_DAMAGE: f32 = 1_000_000.0;
pub const DEFAULT_QUAD_SIZE: f32 = 256.0;

/// Путь к конфигу относительно рабочей директории
pub const COMBAT_CONFIG_PATH: &str = "assets/combat.toml";

/// Tunable параметры combat core
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // ── Map / spatial index ─────────────────────────────────────────────
    /// Размер карты по X (world units)
    pub map_width: f32,
    /// Размер карты по Z (world units)
    pub map_depth: f32,
    /// Размер ячейки QuadField
    pub quad_size: f32,

    // ── Explosions ──────────────────────────────────────────────────────
    /// Модуль impulse от одного взрыва не превышает это значение
    pub max_explosion_impulse: f32,
    /// Урон по каждому armor class после falloff не превышает это значение
    pub max_explosion_damage: f32,
    /// Добавка к Y нормализованного направления impulse (взрывы подбрасывают)
    pub impulse_upward_bias: f32,
    /// Глобальный запрет деформации terrain
    pub map_damage_disabled: bool,

    // ── Vision / radar ──────────────────────────────────────────────────
    /// LOS radius юнита задан в LOS-клетках; × los_div = world units
    pub los_div: f32,
    /// Базовая ошибка радара (для юнитов вне радара — ×2)
    pub base_radar_error_size: f32,
    /// Статичные здания, однажды увиденные, остаются "призраками" без ошибки
    pub ghosted_buildings: bool,

    // ── Paralyzers / targeting ──────────────────────────────────────────
    /// Порог паралича: max health (true) или текущий health (false)
    pub paralyze_on_max_health: bool,
    /// Период (кадры) автоматического перевыбора целей оружием
    pub slow_update_rate: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            map_width: 2048.0,
            map_depth: 2048.0,
            quad_size: DEFAULT_QUAD_SIZE,

            max_explosion_impulse: DEFAULT_MAX_EXPLOSION_IMPULSE,
            max_explosion_damage: DEFAULT_MAX_EXPLOSION_DAMAGE,
            impulse_upward_bias: 0.12,
            map_damage_disabled: false,

            los_div: 16.0,
            base_radar_error_size: 96.0,
            ghosted_buildings: true,

            paralyze_on_max_health: true,
            slow_update_rate: 16,
        }
    }
}

impl CombatConfig {
    /// Парсит TOML; отсутствующие ключи = дефолты
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<CombatConfig>(contents)
    }
}

/// Startup system: читает `assets/combat.toml` поверх дефолтов
///
/// Ошибка парсинга — warning + дефолты, отсутствие файла — не ошибка.
pub fn load_combat_config(mut config: ResMut<CombatConfig>) {
    let Ok(contents) = std::fs::read_to_string(COMBAT_CONFIG_PATH) else {
        crate::log(&format!("No {} found; using compiled defaults", COMBAT_CONFIG_PATH));
        return;
    };

    match CombatConfig::from_toml_str(&contents) {
        Ok(loaded) => {
            *config = loaded;
            crate::log_info(&format!("Loaded combat config from {}", COMBAT_CONFIG_PATH));
        }
        Err(err) => {
            crate::log_warning(&format!(
                "Failed to parse {}: {}; using defaults",
                COMBAT_CONFIG_PATH, err
            ));
        }
    }
}
