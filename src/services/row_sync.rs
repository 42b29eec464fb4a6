use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use tracing::{debug, info, warn};

use crate::models::{
    ContestOracle, Problem, Section, Team, TeamStatus, opt_label_for_position,
};
use crate::services::rank_tier::classify;
use crate::services::rows::{
    Balloon, IndicatorState, ProblemColumn, Row, RowId, RowRecord, RowRenderer,
};

/// Team order before and after a sync, used to animate moved rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReorder {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

impl RowReorder {
    /// `(team_id, from_index, to_index)` for every row whose index changed.
    pub fn moves(&self) -> Vec<(&str, usize, usize)> {
        let before_map: HashMap<&str, usize> = self
            .before
            .iter()
            .enumerate()
            .map(|(idx, team_id)| (team_id.as_str(), idx))
            .collect();

        self.after
            .iter()
            .enumerate()
            .filter_map(|(new_index, team_id)| {
                let old_index = before_map.get(team_id.as_str()).copied()?;
                (old_index != new_index).then_some((team_id.as_str(), old_index, new_index))
            })
            .collect()
    }
}

/// Owns the displayed rows and keeps them in ranked order.
#[derive(Debug)]
pub struct RowSynchronizer<H> {
    rows: Vec<Row<H>>,
    next_row_id: u64,
}

impl<H> Default for RowSynchronizer<H> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_row_id: 0,
        }
    }
}

/// CP columns (first 8 problems) and Opt columns (next 2, labelled A/B).
pub fn problem_columns(problems: &[Problem]) -> (Vec<ProblemColumn>, Vec<ProblemColumn>) {
    let mut cp = Vec::new();
    let mut opt = Vec::new();
    for (position, problem) in problems.iter().enumerate() {
        let column = ProblemColumn {
            id: problem.id.clone(),
            name: problem.name.clone(),
            label: opt_label_for_position(position),
        };
        match Section::for_position(position) {
            Some(Section::Cp) => cp.push(column),
            Some(Section::Opt) => opt.push(column),
            None => break,
        }
    }
    (cp, opt)
}

pub fn build_record(
    team: &Team,
    status: &TeamStatus,
    total_teams: NonZeroUsize,
    hide_identity: bool,
    columns: &(Vec<ProblemColumn>, Vec<ProblemColumn>),
) -> RowRecord {
    let (name, group) = if hide_identity {
        (format!("Team {}", team.id), String::new())
    } else {
        (team.name.clone(), team.group().to_string())
    };

    RowRecord {
        team_id: team.id.clone(),
        rank: status.rank(),
        tier: classify(status.rank(), total_teams),
        name,
        group,
        cp_score: status.section_points(Section::Cp),
        opt_score: status.section_points(Section::Opt),
        time: status.section_penalty(Section::Cp),
        problems: columns.0.clone(),
        opt_problems: columns.1.clone(),
    }
}

/// Refreshes one row from the team's current status. Unknown teams are skipped.
pub fn update_team_status<H, O: ContestOracle>(
    row: &mut Row<H>,
    oracle: &O,
    total_teams: NonZeroUsize,
) {
    let Some(status) = oracle.team_status(row.team_id()) else {
        debug!("No status for team {}, row left as is", row.team_id());
        return;
    };

    row.cp_score = status.section_points(Section::Cp);
    row.opt_score = status.section_points(Section::Opt);
    row.time = status.section_penalty(Section::Cp);
    row.rank = status.rank();
    row.tier = classify(row.rank, total_teams);

    for indicator in &mut row.indicators {
        let Some(problem) = oracle.problem(&indicator.problem_id) else {
            continue;
        };
        let problem_status = status.problem_status(problem);
        indicator.state = if problem_status.is_accepted() {
            IndicatorState::Solved
        } else if problem_status.is_pending() {
            IndicatorState::Pending
        } else if problem_status.is_failed() {
            IndicatorState::Failed
        } else {
            IndicatorState::Neutral
        };
    }

    for indicator in &mut row.opt_indicators {
        let Some(problem) = oracle.problem(&indicator.problem_id) else {
            continue;
        };
        indicator.has_score = status.problem_status(problem).highest_score() > 0.0;
    }

    let accepted: Vec<&Problem> = oracle
        .problems()
        .iter()
        .filter(|problem| status.problem_status(problem).is_accepted())
        .collect();

    row.balloons
        .retain(|balloon| accepted.iter().any(|problem| problem.id == balloon.problem_id));
    for problem in &accepted {
        if !row
            .balloons
            .iter()
            .any(|balloon| balloon.problem_id == problem.id)
        {
            row.balloons.push(Balloon {
                problem_id: problem.id.clone(),
                tooltip: problem.to_string(),
            });
        }
    }

    if row.solved_count != accepted.len() {
        debug!(
            "Team {} solved count {} -> {}",
            row.team_id(),
            row.solved_count,
            accepted.len()
        );
        row.solved_count = accepted.len();
    }
}

impl<H> RowSynchronizer<H> {
    pub fn rows(&self) -> &[Row<H>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row<H>] {
        &mut self.rows
    }

    pub fn row(&self, team_id: &str) -> Option<&Row<H>> {
        self.rows.iter().find(|row| row.team_id() == team_id)
    }

    pub fn row_mut(&mut self, team_id: &str) -> Option<&mut Row<H>> {
        self.rows.iter_mut().find(|row| row.team_id() == team_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows created since the session started.
    pub fn created_count(&self) -> u64 {
        self.next_row_id
    }

    /// Replaces every row with a freshly rendered one per ranked, non-excluded team.
    pub fn rebuild<O, R>(&mut self, oracle: &O, renderer: &mut R, hide_identity: bool) -> usize
    where
        O: ContestOracle,
        R: RowRenderer<Handle = H>,
    {
        self.rows.clear();

        let ranked = oracle.ranked_team_statuses();
        let Some(total_teams) = NonZeroUsize::new(ranked.len()) else {
            info!("Ranked list is empty, nothing to draw");
            return 0;
        };

        let columns = problem_columns(oracle.problems());
        let mut seen: HashSet<&str> = HashSet::with_capacity(ranked.len());
        for status in ranked {
            let Some(team) = oracle.team(&status.team_id) else {
                warn!("Ranked status for unknown team {}", status.team_id);
                continue;
            };
            if oracle.is_team_excluded(team) {
                debug!("Team {} excluded from the board", team.id);
                continue;
            }
            if !seen.insert(team.id.as_str()) {
                warn!("Team {} ranked twice, keeping the first entry", team.id);
                continue;
            }

            let record = build_record(team, status, total_teams, hide_identity, &columns);
            let handle = renderer.render(&record);
            let id = RowId(self.next_row_id);
            self.next_row_id += 1;
            self.rows.push(Row::new(id, &record, handle));
        }

        info!("Rebuilt scoreboard with {} rows", self.rows.len());
        self.rows.len()
    }

    /// Puts existing rows into ranked order and refreshes their contents.
    ///
    /// Teams without a row are skipped. Rows whose team left the ranked list
    /// keep their relative order ahead of the re-inserted rows.
    pub fn sync<O: ContestOracle>(&mut self, oracle: &O) -> Option<RowReorder> {
        let ranked = oracle.ranked_team_statuses();
        let total_teams = NonZeroUsize::new(ranked.len())?;

        let before: Vec<String> = self
            .rows
            .iter()
            .map(|row| row.team_id().to_string())
            .collect();
        let positions: HashMap<&str, usize> = before
            .iter()
            .enumerate()
            .map(|(idx, team_id)| (team_id.as_str(), idx))
            .collect();

        let mut slots: Vec<Option<Row<H>>> =
            std::mem::take(&mut self.rows).into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(slots.len());
        for status in ranked {
            let Some(&idx) = positions.get(status.team_id.as_str()) else {
                continue;
            };
            let Some(mut row) = slots[idx].take() else {
                continue;
            };
            update_team_status(&mut row, oracle, total_teams);
            ordered.push(row);
        }

        self.rows = slots.into_iter().flatten().chain(ordered).collect();

        let after: Vec<String> = self
            .rows
            .iter()
            .map(|row| row.team_id().to_string())
            .collect();
        if before == after {
            None
        } else {
            debug!("Row order changed for {} rows", self.rows.len());
            Some(RowReorder { before, after })
        }
    }
}
