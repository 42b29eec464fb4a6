use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Number of leading problems scored as classic accept/reject problems.
pub const CP_PROBLEM_COUNT: usize = 8;
/// Number of scored optimization problems following the CP block.
pub const OPT_PROBLEM_COUNT: usize = 2;
const OPT_LABELS: [&str; OPT_PROBLEM_COUNT] = ["A", "B"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "CP")]
    Cp,
    #[serde(rename = "Opt")]
    Opt,
}

impl Section {
    pub fn name(self) -> &'static str {
        match self {
            Section::Cp => "CP",
            Section::Opt => "Opt",
        }
    }

    /// Section owning the problem at `position` in the ordered problem list.
    pub fn for_position(position: usize) -> Option<Self> {
        if position < CP_PROBLEM_COUNT {
            Some(Section::Cp)
        } else if position < CP_PROBLEM_COUNT + OPT_PROBLEM_COUNT {
            Some(Section::Opt)
        } else {
            None
        }
    }
}

/// Short label shown for an optimization problem ("A", "B").
pub fn opt_label_for_position(position: usize) -> Option<&'static str> {
    position
        .checked_sub(CP_PROBLEM_COUNT)
        .and_then(|offset| OPT_LABELS.get(offset).copied())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContestInfo {
    pub title: String,
    #[serde(default)]
    pub system_name: String,
    #[serde(default)]
    pub system_version: String,
    #[serde(default)]
    pub start_time: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
}

impl Team {
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub name: String,
    /// Balloon color name, used to pick the balloon image.
    #[serde(default)]
    pub color: Option<String>,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryState {
    Accepted,
    Pending,
    Failed,
    #[default]
    Untouched,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProblemStatus {
    Binary { state: BinaryState },
    Scored { highest_score: f64 },
}

impl ProblemStatus {
    pub const UNTOUCHED: ProblemStatus = ProblemStatus::Binary {
        state: BinaryState::Untouched,
    };

    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            ProblemStatus::Binary {
                state: BinaryState::Accepted
            }
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ProblemStatus::Binary {
                state: BinaryState::Pending
            }
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            ProblemStatus::Binary {
                state: BinaryState::Failed
            }
        )
    }

    /// Accepted binary problems count as one point.
    pub fn highest_score(&self) -> f64 {
        match self {
            ProblemStatus::Binary { state } => {
                if *state == BinaryState::Accepted {
                    1.0
                } else {
                    0.0
                }
            }
            ProblemStatus::Scored { highest_score } => *highest_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatus {
    pub team_id: String,
    pub rank: u32,
    #[serde(default)]
    pub section_points: HashMap<Section, f64>,
    #[serde(default)]
    pub section_penalty: HashMap<Section, i64>,
    #[serde(default)]
    pub problem_statuses: HashMap<String, ProblemStatus>,
}

impl TeamStatus {
    pub fn new(team_id: impl Into<String>, rank: u32) -> Self {
        Self {
            team_id: team_id.into(),
            rank,
            section_points: HashMap::new(),
            section_penalty: HashMap::new(),
            problem_statuses: HashMap::new(),
        }
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn section_points(&self, section: Section) -> f64 {
        self.section_points.get(&section).copied().unwrap_or(0.0)
    }

    pub fn section_penalty(&self, section: Section) -> i64 {
        self.section_penalty.get(&section).copied().unwrap_or(0)
    }

    pub fn problem_status(&self, problem: &Problem) -> ProblemStatus {
        self.problem_statuses
            .get(&problem.id)
            .copied()
            .unwrap_or(ProblemStatus::UNTOUCHED)
    }
}

pub trait HasId {
    fn id(&self) -> &str;
}

impl HasId for Team {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for Problem {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for TeamStatus {
    fn id(&self) -> &str {
        &self.team_id
    }
}

/// Read-only view of the contest consumed by the scoreboard engine.
///
/// Rankings, scores and exclusion rules all come from here; the engine never
/// computes them itself.
pub trait ContestOracle {
    fn contest(&self) -> &ContestInfo;
    fn teams(&self) -> &[Team];
    /// Problems in ordinal order. Position decides section and gradient stop.
    fn problems(&self) -> &[Problem];
    /// Team statuses already sorted and tie-broken.
    fn ranked_team_statuses(&self) -> &[TeamStatus];
    fn team(&self, team_id: &str) -> Option<&Team>;
    fn team_status(&self, team_id: &str) -> Option<&TeamStatus>;
    fn problem(&self, problem_id: &str) -> Option<&Problem>;
    fn is_team_excluded(&self, team: &Team) -> bool;
}

#[derive(Debug, Clone, Deserialize)]
struct SnapshotFile {
    contest: ContestInfo,
    #[serde(default)]
    teams: Vec<Team>,
    #[serde(default)]
    problems: Vec<Problem>,
    #[serde(default)]
    ranking: Vec<TeamStatus>,
    #[serde(default)]
    excluded_team_ids: Vec<String>,
}

/// A complete contest state as published by the judge backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "SnapshotFile")]
pub struct ContestSnapshot {
    contest: ContestInfo,
    teams: Vec<Team>,
    problems: Vec<Problem>,
    ranking: Vec<TeamStatus>,
    excluded_team_ids: Vec<String>,
    team_index: HashMap<String, usize>,
    problem_index: HashMap<String, usize>,
    status_index: HashMap<String, usize>,
}

impl From<SnapshotFile> for ContestSnapshot {
    fn from(file: SnapshotFile) -> Self {
        ContestSnapshot::new(
            file.contest,
            file.teams,
            file.problems,
            file.ranking,
            file.excluded_team_ids,
        )
    }
}

fn index_by_id<T: HasId>(items: &[T]) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| (item.id().to_string(), idx))
        .collect()
}

impl ContestSnapshot {
    pub fn new(
        contest: ContestInfo,
        teams: Vec<Team>,
        problems: Vec<Problem>,
        ranking: Vec<TeamStatus>,
        excluded_team_ids: Vec<String>,
    ) -> Self {
        let team_index = index_by_id(&teams);
        let problem_index = index_by_id(&problems);
        let status_index = index_by_id(&ranking);
        Self {
            contest,
            teams,
            problems,
            ranking,
            excluded_team_ids,
            team_index,
            problem_index,
            status_index,
        }
    }
}

impl ContestOracle for ContestSnapshot {
    fn contest(&self) -> &ContestInfo {
        &self.contest
    }

    fn teams(&self) -> &[Team] {
        &self.teams
    }

    fn problems(&self) -> &[Problem] {
        &self.problems
    }

    fn ranked_team_statuses(&self) -> &[TeamStatus] {
        &self.ranking
    }

    fn team(&self, team_id: &str) -> Option<&Team> {
        self.team_index.get(team_id).map(|&idx| &self.teams[idx])
    }

    fn team_status(&self, team_id: &str) -> Option<&TeamStatus> {
        self.status_index.get(team_id).map(|&idx| &self.ranking[idx])
    }

    fn problem(&self, problem_id: &str) -> Option<&Problem> {
        self.problem_index
            .get(problem_id)
            .map(|&idx| &self.problems[idx])
    }

    fn is_team_excluded(&self, team: &Team) -> bool {
        self.excluded_team_ids.iter().any(|id| *id == team.id)
    }
}
