//! UnitFilter — какие allyteam'ы и юниты участвуют в query
//!
//! Закрытый набор вариантов: каждый — пара предикатов
//! (`include_team`, `include_unit`).

use crate::shared::AllyTeams;
use super::UnitView;

/// Caller-defined проверка валидности цели (например, no-chase категории)
pub type TargetPredicate<'a> = &'a dyn Fn(&UnitView) -> bool;

#[derive(Clone, Copy)]
pub enum UnitFilter<'a> {
    /// Все юниты всех allyteam
    All,
    /// Юниты союзных allyteam
    Friendly { allyteam: usize },
    /// Юниты вражеских allyteam, без проверки видимости
    Enemy { allyteam: usize },
    /// Враги в LOS или на радаре у `allyteam`
    EnemyInLos { allyteam: usize },
    /// Видимые вражеские самолёты, которые не падают
    EnemyAircraft { allyteam: usize },
    /// Видимые враги, прошедшие caller-defined проверку
    EnemyValidTarget {
        allyteam: usize,
        is_valid: TargetPredicate<'a>,
    },
    /// Все свои + видимые враги (full_view — без ограничений, spectator)
    AllPlusEnemyInLos { viewer: usize, full_view: bool },
}

impl UnitFilter<'_> {
    /// Спускаться ли в bucket allyteam
    pub fn include_team(&self, teams: &AllyTeams, allyteam: usize) -> bool {
        match *self {
            UnitFilter::All | UnitFilter::AllPlusEnemyInLos { .. } => true,
            UnitFilter::Friendly { allyteam: searcher } => teams.ally(searcher, allyteam),
            UnitFilter::Enemy { allyteam: searcher }
            | UnitFilter::EnemyInLos { allyteam: searcher }
            | UnitFilter::EnemyAircraft { allyteam: searcher }
            | UnitFilter::EnemyValidTarget { allyteam: searcher, .. } => !teams.ally(searcher, allyteam),
        }
    }

    /// Проходит ли конкретный юнит
    pub fn include_unit(&self, unit: &UnitView) -> bool {
        match *self {
            UnitFilter::All | UnitFilter::Friendly { .. } | UnitFilter::Enemy { .. } => true,
            UnitFilter::EnemyInLos { allyteam } => unit.los.in_los_or_radar(allyteam),
            UnitFilter::EnemyAircraft { allyteam } => {
                unit.unit.can_fly && !unit.state.crashing && unit.los.in_los_or_radar(allyteam)
            }
            UnitFilter::EnemyValidTarget { allyteam, is_valid } => {
                unit.los.in_los_or_radar(allyteam) && is_valid(unit)
            }
            UnitFilter::AllPlusEnemyInLos { viewer, full_view } => {
                unit.unit.allyteam == viewer || unit.los.in_los_or_radar(viewer) || full_view
            }
        }
    }
}
