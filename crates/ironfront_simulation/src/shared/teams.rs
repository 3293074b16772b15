//! Team / allyteam таблица
//!
//! Team — игрок (или AI), allyteam — группа команд с общим зрением и
//! взаимной "дружбой". Отношение союзничества задаётся матрицей и
//! не обязано быть симметричным.

use bevy::prelude::*;

#[derive(Resource, Debug, Clone)]
pub struct AllyTeams {
    /// allies[a][b] — считает ли allyteam `a` allyteam `b` союзником
    allies: Vec<Vec<bool>>,
    /// team index → allyteam index
    team_allyteam: Vec<usize>,
    /// Масштаб ошибки радара для каждой allyteam
    radar_error_size: Vec<f32>,
}

impl Default for AllyTeams {
    fn default() -> Self {
        // Две стороны, по одной команде: минимальный skirmish
        Self::new(2, 96.0)
    }
}

impl AllyTeams {
    /// `count` allyteams, team i ∈ allyteam i, каждая союзна только себе
    pub fn new(count: usize, radar_error_size: f32) -> Self {
        let allies = (0..count)
            .map(|a| (0..count).map(|b| a == b).collect())
            .collect();

        Self {
            allies,
            team_allyteam: (0..count).collect(),
            radar_error_size: vec![radar_error_size; count],
        }
    }

    pub fn count(&self) -> usize {
        self.allies.len()
    }

    /// Союзник ли `b` для `a` (вне таблицы — нет)
    pub fn ally(&self, a: usize, b: usize) -> bool {
        self.allies
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_ally(&mut self, a: usize, b: usize, allied: bool) {
        if let Some(cell) = self.allies.get_mut(a).and_then(|row| row.get_mut(b)) {
            *cell = allied;
        }
    }

    /// Allyteam команды; неизвестная команда → своя собственная "allyteam"
    pub fn allyteam_of(&self, team: usize) -> usize {
        self.team_allyteam.get(team).copied().unwrap_or(team)
    }

    /// Назначает команде allyteam (таблица растёт при необходимости)
    pub fn assign_team(&mut self, team: usize, allyteam: usize) {
        if self.team_allyteam.len() <= team {
            let start = self.team_allyteam.len();
            self.team_allyteam.extend(start..=team);
        }
        self.team_allyteam[team] = allyteam;
    }

    pub fn radar_error_size(&self, allyteam: usize) -> f32 {
        self.radar_error_size.get(allyteam).copied().unwrap_or(0.0)
    }

    pub fn set_radar_error_size(&mut self, allyteam: usize, size: f32) {
        if let Some(slot) = self.radar_error_size.get_mut(allyteam) {
            *slot = size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allyteams_self_allied_only() {
        let teams = AllyTeams::new(3, 96.0);

        assert!(teams.ally(1, 1));
        assert!(!teams.ally(0, 1));
        assert!(!teams.ally(0, 7)); // вне таблицы
    }

    #[test]
    fn test_alliance_can_be_one_sided() {
        let mut teams = AllyTeams::new(2, 96.0);
        teams.set_ally(0, 1, true);

        assert!(teams.ally(0, 1));
        assert!(!teams.ally(1, 0));
    }

    #[test]
    fn test_assign_team_grows_table() {
        let mut teams = AllyTeams::new(2, 96.0);
        teams.assign_team(4, 1);

        assert_eq!(teams.allyteam_of(4), 1);
        assert_eq!(teams.allyteam_of(3), 3);
        assert_eq!(teams.allyteam_of(0), 0);
    }
}
