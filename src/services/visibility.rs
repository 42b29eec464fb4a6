use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::ContestOracle;
use crate::services::rows::{Row, RowVisibility};

/// What `paginate` does when the counter would leave the available pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageBounds {
    /// The counter moves freely; an out-of-range page shows no rows.
    #[default]
    Unchecked,
    Clamp,
    Wrap,
}

/// Search filter and the two page counters of one scoreboard session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityState {
    pub filter: String,
    pub page: i64,
    pub search_page: i64,
}

impl VisibilityState {
    pub fn is_searching(&self) -> bool {
        !self.filter.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Pattern(Regex),
    Literal(String),
}

impl Matcher {
    fn new(filter: &str) -> Self {
        let compiled = RegexBuilder::new(filter)
            .case_insensitive(true)
            .build()
            .or_else(|err| {
                warn!("Search filter is not a valid pattern ({err}), matching literally");
                RegexBuilder::new(&regex::escape(filter))
                    .case_insensitive(true)
                    .build()
            });
        match compiled {
            Ok(regex) => Matcher::Pattern(regex),
            Err(_) => Matcher::Literal(filter.to_lowercase()),
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Pattern(regex) => regex.is_match(text),
            Matcher::Literal(needle) => text.to_lowercase().contains(needle.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisibilityEngine {
    state: VisibilityState,
    matcher: Option<Matcher>,
    rows_per_page: usize,
    bounds: PageBounds,
    /// Rows passing the filter at the last recomputation.
    candidate_count: usize,
}

impl VisibilityEngine {
    /// `rows_per_page == 0` disables windowing.
    pub fn new(rows_per_page: usize, bounds: PageBounds) -> Self {
        Self {
            state: VisibilityState::default(),
            matcher: None,
            rows_per_page,
            bounds,
            candidate_count: 0,
        }
    }

    pub fn state(&self) -> &VisibilityState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = VisibilityState::default();
        self.matcher = None;
        self.candidate_count = 0;
    }

    pub fn set_filter(&mut self, text: &str) {
        self.state.filter = text.to_string();
        self.state.search_page = 0;
        self.matcher = (!text.is_empty()).then(|| Matcher::new(text));
        debug!("Search filter set to {:?}", text);
    }

    pub fn current_page(&self) -> i64 {
        if self.state.is_searching() {
            self.state.search_page
        } else {
            self.state.page
        }
    }

    pub fn page_count(&self) -> i64 {
        if self.rows_per_page == 0 {
            return 1;
        }
        (self.candidate_count.div_ceil(self.rows_per_page)).max(1) as i64
    }

    /// Moves the page counter of the active mode. Returns false for a zero delta.
    pub fn paginate(&mut self, delta: i64) -> bool {
        if delta == 0 {
            return false;
        }

        let page = self.bounded(self.current_page().saturating_add(delta));
        *self.active_counter() = page;
        debug!("Paginated by {} to page {}", delta, self.current_page());
        true
    }

    fn active_counter(&mut self) -> &mut i64 {
        if self.state.is_searching() {
            &mut self.state.search_page
        } else {
            &mut self.state.page
        }
    }

    fn bounded(&self, page: i64) -> i64 {
        let pages = self.page_count();
        match self.bounds {
            PageBounds::Unchecked => page,
            PageBounds::Clamp => page.clamp(0, pages - 1),
            PageBounds::Wrap => page.rem_euclid(pages),
        }
    }

    fn matches_filter<O: ContestOracle>(&self, oracle: &O, team_id: &str) -> bool {
        let Some(matcher) = &self.matcher else {
            return true;
        };
        oracle
            .team(team_id)
            .is_some_and(|team| matcher.is_match(&team.name) || matcher.is_match(team.group()))
    }

    /// Recomputes hidden and page flags for every row, keeping row order.
    pub fn update_visibility<H, O: ContestOracle>(&mut self, rows: &mut [Row<H>], oracle: &O) {
        let mut candidates = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter_mut().enumerate() {
            let hidden = !self.matches_filter(oracle, row.team_id());
            row.visibility = RowVisibility {
                hidden,
                ..RowVisibility::default()
            };
            if !hidden {
                candidates.push(idx);
            }
        }
        self.candidate_count = candidates.len();
        let page = self.bounded(self.current_page());
        if page != self.current_page() {
            debug!("Page {} left the board, moving to {}", self.current_page(), page);
            *self.active_counter() = page;
        }

        let (start, end) = if self.rows_per_page == 0 {
            (0, i64::MAX)
        } else {
            let per_page = self.rows_per_page as i64;
            let start = self.current_page().saturating_mul(per_page);
            (start, start.saturating_add(per_page))
        };

        let mut first_marked = false;
        for (position, &idx) in candidates.iter().enumerate() {
            let position = position as i64;
            let visibility = &mut rows[idx].visibility;
            if position < start {
                visibility.beyond_page_prev = true;
            } else if position >= end {
                visibility.beyond_page_next = true;
            } else if !first_marked {
                visibility.visible_first = true;
                first_marked = true;
            }
        }

        debug!(
            "Visibility updated: {} of {} rows match, page {}",
            self.candidate_count,
            rows.len(),
            self.current_page()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContestInfo, ContestSnapshot, Team, TeamStatus};
    use crate::services::rank_tier::RankTier;
    use crate::services::rows::{RowId, RowRecord};

    fn board() -> (ContestSnapshot, Vec<Row<()>>) {
        let teams = vec![
            ("1", "Alpha Wolves", Some("North")),
            ("2", "Beta Cats", Some("ALPHA Institute")),
            ("3", "Gamma Rays", None),
            ("4", "Delta Force", Some("South")),
            ("5", "alphabet soup", Some("East")),
        ];
        let teams: Vec<Team> = teams
            .into_iter()
            .map(|(id, name, group)| Team {
                id: id.to_string(),
                name: name.to_string(),
                group: group.map(str::to_string),
            })
            .collect();
        let ranking = teams
            .iter()
            .enumerate()
            .map(|(idx, team)| TeamStatus::new(team.id.clone(), idx as u32 + 1))
            .collect();
        let rows = teams
            .iter()
            .enumerate()
            .map(|(idx, team)| {
                let record = RowRecord {
                    team_id: team.id.clone(),
                    rank: idx as u32 + 1,
                    tier: RankTier::Low,
                    name: team.name.clone(),
                    group: team.group().to_string(),
                    cp_score: 0.0,
                    opt_score: 0.0,
                    time: 0,
                    problems: vec![],
                    opt_problems: vec![],
                };
                Row::new(RowId(idx as u64), &record, ())
            })
            .collect();
        let snapshot = ContestSnapshot::new(ContestInfo::default(), teams, vec![], ranking, vec![]);
        (snapshot, rows)
    }

    fn visible(rows: &[Row<()>]) -> Vec<&str> {
        rows.iter()
            .filter(|row| row.is_visible())
            .map(|row| row.team_id())
            .collect()
    }

    #[test]
    fn filter_matches_name_or_group_case_insensitively() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(0, PageBounds::Unchecked);

        engine.set_filter("alpha");
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(visible(&rows), vec!["1", "2", "5"]);
        assert!(rows[2].visibility.hidden);
        assert!(rows[3].visibility.hidden);

        engine.set_filter("");
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(visible(&rows).len(), 5);
        assert_eq!(engine.state().search_page, 0);
    }

    #[test]
    fn filter_is_a_pattern() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(0, PageBounds::Unchecked);
        engine.set_filter("^(gamma|delta)");
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(visible(&rows), vec!["3", "4"]);
    }

    #[test]
    fn invalid_pattern_matches_literally() {
        let (_, mut rows) = board();
        let oracle = ContestSnapshot::new(
            ContestInfo::default(),
            vec![Team {
                id: "1".to_string(),
                name: "C++ (fans".to_string(),
                group: None,
            }],
            vec![],
            vec![TeamStatus::new("1", 1)],
            vec![],
        );
        rows.truncate(1);
        let mut engine = VisibilityEngine::new(0, PageBounds::Unchecked);
        engine.set_filter("c++ (");
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(visible(&rows), vec!["1"]);
    }

    #[test]
    fn setting_a_filter_resets_search_page_only() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Unchecked);
        engine.update_visibility(&mut rows, &oracle);
        assert!(engine.paginate(1));

        engine.set_filter("a");
        assert!(engine.paginate(1));
        assert_eq!(engine.state().search_page, 1);

        engine.set_filter("alpha");
        assert_eq!(engine.state().search_page, 0);
        assert_eq!(engine.state().page, 1);
    }

    #[test]
    fn counters_are_independent() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Unchecked);
        engine.update_visibility(&mut rows, &oracle);

        engine.paginate(1);
        assert_eq!(engine.state().page, 1);
        assert_eq!(engine.state().search_page, 0);

        engine.set_filter("a");
        engine.paginate(2);
        assert_eq!(engine.state().page, 1);
        assert_eq!(engine.state().search_page, 2);

        engine.set_filter("");
        engine.paginate(-1);
        assert_eq!(engine.state().page, 0);
        assert_eq!(engine.state().search_page, 0);
    }

    #[test]
    fn zero_delta_is_ignored() {
        let mut engine = VisibilityEngine::new(2, PageBounds::Clamp);
        assert!(!engine.paginate(0));
        assert_eq!(engine.state(), &VisibilityState::default());
    }

    #[test]
    fn window_flags_rows_around_the_page() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Unchecked);
        engine.paginate(1);
        engine.update_visibility(&mut rows, &oracle);

        assert_eq!(visible(&rows), vec!["3", "4"]);
        assert!(rows[0].visibility.beyond_page_prev);
        assert!(rows[1].visibility.beyond_page_prev);
        assert!(rows[2].visibility.visible_first);
        assert!(!rows[3].visibility.visible_first);
        assert!(rows[4].visibility.beyond_page_next);
    }

    #[test]
    fn window_applies_to_filtered_rows_in_search_mode() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Unchecked);
        engine.set_filter("alpha");
        engine.paginate(1);
        engine.update_visibility(&mut rows, &oracle);

        assert_eq!(visible(&rows), vec!["5"]);
        assert!(rows[4].visibility.visible_first);
        assert!(rows[0].visibility.beyond_page_prev);
        assert!(rows[2].visibility.hidden);
        assert!(!rows[2].visibility.beyond_page_prev);
    }

    #[test]
    fn unchecked_pages_can_leave_the_board() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Unchecked);
        engine.paginate(-1);
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(engine.current_page(), -1);
        assert!(visible(&rows).is_empty());
        assert!(rows.iter().all(|row| row.visibility.beyond_page_next));

        engine.paginate(10);
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(engine.current_page(), 9);
        assert!(visible(&rows).is_empty());
    }

    #[test]
    fn clamped_pages_stay_on_the_board() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Clamp);
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(engine.page_count(), 3);

        engine.paginate(-1);
        assert_eq!(engine.current_page(), 0);
        engine.paginate(7);
        assert_eq!(engine.current_page(), 2);
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(visible(&rows), vec!["5"]);
    }

    #[test]
    fn clamped_page_follows_a_shrinking_board() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Clamp);
        engine.update_visibility(&mut rows, &oracle);
        engine.paginate(2);
        assert_eq!(engine.current_page(), 2);

        rows.truncate(2);
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(engine.page_count(), 1);
        assert_eq!(engine.current_page(), 0);
        assert_eq!(visible(&rows), vec!["1", "2"]);
    }

    #[test]
    fn wrapped_page_follows_a_shrinking_board() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Wrap);
        engine.update_visibility(&mut rows, &oracle);
        engine.paginate(2);

        rows.truncate(3);
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(engine.current_page(), 0);
        assert_eq!(visible(&rows), vec!["1", "2"]);
    }

    #[test]
    fn unchecked_page_is_kept_when_the_board_shrinks() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Unchecked);
        engine.paginate(2);
        rows.truncate(2);
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(engine.current_page(), 2);
        assert!(visible(&rows).is_empty());
    }

    #[test]
    fn wrapped_pages_cycle() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Wrap);
        engine.update_visibility(&mut rows, &oracle);

        engine.paginate(-1);
        assert_eq!(engine.current_page(), 2);
        engine.paginate(1);
        assert_eq!(engine.current_page(), 0);
        engine.paginate(4);
        assert_eq!(engine.current_page(), 1);
    }

    #[test]
    fn reset_starts_a_fresh_session() {
        let (oracle, mut rows) = board();
        let mut engine = VisibilityEngine::new(2, PageBounds::Unchecked);
        engine.paginate(3);
        engine.set_filter("beta");
        engine.paginate(1);
        engine.reset();
        engine.update_visibility(&mut rows, &oracle);
        assert_eq!(engine.state(), &VisibilityState::default());
        assert_eq!(visible(&rows), vec!["1", "2"]);
    }
}
