use std::fmt;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankTier {
    Top,
    High,
    Mid,
    Low,
}

impl RankTier {
    pub fn as_str(self) -> &'static str {
        match self {
            RankTier::Top => "top",
            RankTier::High => "high",
            RankTier::Mid => "mid",
            RankTier::Low => "low",
        }
    }
}

impl fmt::Display for RankTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentile bands, upper bound inclusive.
pub fn classify(rank: u32, total_teams: NonZeroUsize) -> RankTier {
    let percentile = f64::from(rank) / total_teams.get() as f64;
    if percentile <= 0.1 {
        RankTier::Top
    } else if percentile <= 0.33 {
        RankTier::High
    } else if percentile <= 0.66 {
        RankTier::Mid
    } else {
        RankTier::Low
    }
}
