use crate::services::rank_tier::RankTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndicatorState {
    Solved,
    Pending,
    Failed,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProblemColumn {
    pub id: String,
    pub name: String,
    pub label: Option<&'static str>,
}

/// Plain display data handed to the renderer when a row is first created.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    pub team_id: String,
    pub rank: u32,
    pub tier: RankTier,
    pub name: String,
    pub group: String,
    pub cp_score: f64,
    pub opt_score: f64,
    pub time: i64,
    pub problems: Vec<ProblemColumn>,
    pub opt_problems: Vec<ProblemColumn>,
}

/// Turns a record into whatever the UI keeps per row.
///
/// Called once per team on a full rebuild, never during incremental refresh.
pub trait RowRenderer {
    type Handle;

    fn render(&mut self, record: &RowRecord) -> Self::Handle;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProblemIndicator {
    pub problem_id: String,
    pub state: IndicatorState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptIndicator {
    pub problem_id: String,
    pub has_score: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Balloon {
    pub problem_id: String,
    pub tooltip: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowVisibility {
    pub hidden: bool,
    pub beyond_page_prev: bool,
    pub beyond_page_next: bool,
    pub visible_first: bool,
}

impl RowVisibility {
    pub fn is_visible(&self) -> bool {
        !(self.hidden || self.beyond_page_prev || self.beyond_page_next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketMarks {
    pub first: bool,
    pub last: bool,
    /// Solved-count text shown on the first row of a bucket.
    pub label: Option<String>,
}

#[derive(Debug)]
pub struct Row<H> {
    id: RowId,
    team_id: String,
    handle: H,
    pub rank: u32,
    pub tier: RankTier,
    pub cp_score: f64,
    pub opt_score: f64,
    pub time: i64,
    pub indicators: Vec<ProblemIndicator>,
    pub opt_indicators: Vec<OptIndicator>,
    pub solved_count: usize,
    pub balloons: Vec<Balloon>,
    pub visibility: RowVisibility,
    pub bucket: BucketMarks,
}

impl<H> Row<H> {
    pub fn new(id: RowId, record: &RowRecord, handle: H) -> Self {
        Self {
            id,
            team_id: record.team_id.clone(),
            handle,
            rank: record.rank,
            tier: record.tier,
            cp_score: record.cp_score,
            opt_score: record.opt_score,
            time: record.time,
            indicators: record
                .problems
                .iter()
                .map(|problem| ProblemIndicator {
                    problem_id: problem.id.clone(),
                    state: IndicatorState::Neutral,
                })
                .collect(),
            opt_indicators: record
                .opt_problems
                .iter()
                .map(|problem| OptIndicator {
                    problem_id: problem.id.clone(),
                    has_score: false,
                })
                .collect(),
            solved_count: 0,
            balloons: Vec::new(),
            visibility: RowVisibility::default(),
            bucket: BucketMarks::default(),
        }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }
}
