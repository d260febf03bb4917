//! Performance grading from per-person meeting counts.
//!
//! Two step functions over integer counts, summed into a score and a
//! percentage. The offline bands overlap at a count of 8: the `>= 8` branch
//! is evaluated first and wins, so 8 meetings score 4, not 2. That ordering
//! is part of the contract and must not be "normalized".

use serde::Serialize;

use crate::stats::PersonCounts;

/// Score for online meeting counts: 30-40 -> 4, 27-29 -> 3, 24-26 -> 2.2,
/// 21-23 -> 1.4, 18-20 -> 0.8, everything else 0.
pub fn online_score(meetings: usize) -> f64 {
    match meetings {
        30..=40 => 4.0,
        27..=29 => 3.0,
        24..=26 => 2.2,
        21..=23 => 1.4,
        18..=20 => 0.8,
        _ => 0.0,
    }
}

/// Score for offline meeting counts. The `>= 8` check comes first.
pub fn offline_score(meetings: usize) -> f64 {
    if meetings >= 8 {
        return 4.0;
    }
    if (5..=8).contains(&meetings) {
        return 2.0;
    }
    0.0
}

/// A person's graded performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performance {
    pub offline_score: f64,
    pub online_score: f64,
    pub total_score: f64,
    pub percentage: f64,
}

impl Performance {
    /// Percentage rendered the way the report expects, e.g. "30.0%".
    pub fn formatted_percentage(&self) -> String {
        format!("{:.1}%", self.percentage * 100.0)
    }
}

pub fn score_performance(offline_meetings: usize, online_meetings: usize) -> Performance {
    let offline = offline_score(offline_meetings);
    let online = online_score(online_meetings);
    let total = offline + online;
    Performance {
        offline_score: offline,
        online_score: online,
        total_score: total,
        percentage: total * 0.05,
    }
}

/// A ranking entry with its grade attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPerson {
    #[serde(flatten)]
    pub counts: PersonCounts,
    #[serde(flatten)]
    pub performance: Performance,
}

/// Grades every person in a ranking and re-sorts descending by performance
/// percentage.
pub fn scored_ranking(ranking: &[PersonCounts]) -> Vec<ScoredPerson> {
    let mut scored: Vec<ScoredPerson> = ranking
        .iter()
        .map(|counts| ScoredPerson {
            counts: counts.clone(),
            performance: score_performance(counts.offline_yes, counts.online_no),
        })
        .collect();
    scored.sort_by(|a, b| {
        b.performance
            .percentage
            .total_cmp(&a.performance.percentage)
    });
    scored
}
