use std::num::NonZeroUsize;
use std::sync::mpsc::Receiver;

use tracing::{debug, info};

use crate::models::ContestOracle;
use crate::services::boundary_marker::mark_boundaries;
use crate::services::config_loader::BoardConfig;
use crate::services::notifier::{BoardEvent, Notifier};
use crate::services::palette::{Rgb, solved_count_palette};
use crate::services::row_sync::{RowReorder, RowSynchronizer};
use crate::services::rows::{Row, RowRenderer};
use crate::services::visibility::{VisibilityEngine, VisibilityState};

/// Board-wide display switches taken from the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardFlags {
    pub show_team_group: bool,
    pub animation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestHeader {
    pub title: String,
    pub system: String,
    pub version: Option<String>,
}

pub fn contest_header<O: ContestOracle>(
    oracle: &O,
    version: Option<&str>,
    environment: &str,
) -> ContestHeader {
    let contest = oracle.contest();
    let version = version.filter(|v| !v.is_empty()).map(|v| {
        if environment == "develop" {
            format!("v{v}-devel")
        } else {
            format!("v{v}")
        }
    });

    ContestHeader {
        title: contest.title.clone(),
        system: format!("{} {}", contest.system_name, contest.system_version)
            .trim()
            .to_string(),
        version,
    }
}

/// Live scoreboard: rows in ranked order plus search, paging and bucket marks.
#[derive(Debug)]
pub struct Scoreboard<H> {
    flags: BoardFlags,
    hide_identity: bool,
    rows: RowSynchronizer<H>,
    visibility: VisibilityEngine,
    notifier: Notifier,
    problem_count: usize,
}

impl<H> Scoreboard<H> {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            flags: BoardFlags {
                show_team_group: config.show_team_group,
                animation: config.animation,
            },
            hide_identity: config.hides_team_identity(),
            rows: RowSynchronizer::default(),
            visibility: VisibilityEngine::new(
                config.presentation.rows_per_page,
                config.presentation.page_bounds,
            ),
            notifier: Notifier::default(),
            problem_count: 0,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<BoardEvent> {
        self.notifier.subscribe()
    }

    pub fn flags(&self) -> BoardFlags {
        self.flags
    }

    pub fn rows(&self) -> &[Row<H>] {
        self.rows.rows()
    }

    pub fn row(&self, team_id: &str) -> Option<&Row<H>> {
        self.rows.row(team_id)
    }

    pub fn row_mut(&mut self, team_id: &str) -> Option<&mut Row<H>> {
        self.rows.row_mut(team_id)
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Row<H>> {
        self.rows.rows().iter().filter(|row| row.is_visible())
    }

    pub fn created_row_count(&self) -> u64 {
        self.rows.created_count()
    }

    pub fn visibility_state(&self) -> &VisibilityState {
        self.visibility.state()
    }

    pub fn current_page(&self) -> i64 {
        self.visibility.current_page()
    }

    pub fn page_count(&self) -> i64 {
        self.visibility.page_count()
    }

    pub fn problem_count(&self) -> usize {
        self.problem_count
    }

    /// Solved-count badge colors, one per bucket `0..=problem_count`.
    pub fn palette(&self) -> Vec<Rgb> {
        NonZeroUsize::new(self.problem_count)
            .map(solved_count_palette)
            .unwrap_or_default()
    }

    /// Drops the search filter and both page counters.
    pub fn reset_session(&mut self) {
        self.visibility.reset();
    }

    /// Recreates every row from the ranked list, then runs a normal refresh.
    pub fn draw_scoreboard<O, R>(&mut self, oracle: &O, renderer: &mut R) -> Option<RowReorder>
    where
        O: ContestOracle,
        R: RowRenderer<Handle = H>,
    {
        let drawn = self.rows.rebuild(oracle, renderer, self.hide_identity);
        info!("Drew scoreboard with {} rows", drawn);
        let reorder = self.refresh_scoreboard(oracle);
        self.notifier.emit(BoardEvent::Drew);
        reorder
    }

    /// Reorders and updates the existing rows without re-rendering them.
    pub fn refresh_scoreboard<O: ContestOracle>(&mut self, oracle: &O) -> Option<RowReorder> {
        self.problem_count = oracle.problems().len();
        let reorder = self.rows.sync(oracle);
        self.update_visibility(oracle);
        self.notifier.emit(BoardEvent::TeamPositionUpdated);
        reorder
    }

    /// Team ids of the rows currently on the board, top to bottom.
    pub fn visible_order(&self) -> Vec<String> {
        self.visible_rows()
            .map(|row| row.team_id().to_string())
            .collect()
    }

    /// Runs `refresh_scoreboard` and reports the reorder in on-board slots,
    /// the positions visible rows are actually laid out at.
    pub fn refresh_visible_slots<O: ContestOracle>(&mut self, oracle: &O) -> Option<RowReorder> {
        let before = self.visible_order();
        self.refresh_scoreboard(oracle)?;
        let after = self.visible_order();
        (before != after).then_some(RowReorder { before, after })
    }

    pub fn update_visibility<O: ContestOracle>(&mut self, oracle: &O) {
        self.visibility
            .update_visibility(self.rows.rows_mut(), oracle);
        mark_boundaries(self.rows.rows_mut(), self.problem_count);
        self.notifier.emit(BoardEvent::VisibilityUpdated);
    }

    pub fn set_search_filter<O: ContestOracle>(&mut self, oracle: &O, text: &str) {
        self.visibility.set_filter(text);
        self.update_visibility(oracle);
    }

    pub fn paginate<O: ContestOracle>(&mut self, oracle: &O, delta: i64) {
        if !self.visibility.paginate(delta) {
            debug!("Ignoring zero pagination step");
            return;
        }
        self.update_visibility(oracle);
    }
}
