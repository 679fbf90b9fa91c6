//! Read side of a brief: papers joined with their associations, bucketed,
//! filtered and sorted for display.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::db::{association_repo, Database, DatabaseError};
use crate::models::{Association, Paper};

/// A paper as it appears in one brief.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BriefPaper {
    pub paper: Paper,
    pub association: Association,
}

impl BriefPaper {
    pub fn score(&self) -> Option<u8> {
        self.association.relevancy_score
    }

    pub fn bucket(&self) -> RelevancyBucket {
        RelevancyBucket::for_score(self.score())
    }
}

/// Fixed score ranges used for filtering, plus papers without a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum RelevancyBucket {
    /// 0-19
    NotRelevant,
    /// 20-39
    Slightly,
    /// 40-59
    Moderately,
    /// 60-79
    Highly,
    /// 80-100
    Extremely,
    Unscored,
}

impl RelevancyBucket {
    pub const SCORED: [RelevancyBucket; 5] = [
        RelevancyBucket::NotRelevant,
        RelevancyBucket::Slightly,
        RelevancyBucket::Moderately,
        RelevancyBucket::Highly,
        RelevancyBucket::Extremely,
    ];

    pub fn for_score(score: Option<u8>) -> Self {
        match score {
            None => RelevancyBucket::Unscored,
            Some(0..=19) => RelevancyBucket::NotRelevant,
            Some(20..=39) => RelevancyBucket::Slightly,
            Some(40..=59) => RelevancyBucket::Moderately,
            Some(60..=79) => RelevancyBucket::Highly,
            Some(_) => RelevancyBucket::Extremely,
        }
    }

    /// Lowest score in the bucket; `None` for `Unscored`.
    pub fn min_score(&self) -> Option<u8> {
        match self {
            RelevancyBucket::NotRelevant => Some(0),
            RelevancyBucket::Slightly => Some(20),
            RelevancyBucket::Moderately => Some(40),
            RelevancyBucket::Highly => Some(60),
            RelevancyBucket::Extremely => Some(80),
            RelevancyBucket::Unscored => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Relevancy,
    Year,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Loads every paper associated with `brief_id`, in association order.
pub fn load_brief_papers(db: &Database, brief_id: &str) -> Result<Vec<BriefPaper>, DatabaseError> {
    Ok(association_repo::list_papers_for_brief(db, brief_id)?
        .into_iter()
        .map(|(paper, association)| BriefPaper { paper, association })
        .collect())
}

/// Count per bucket, in bucket order, including `Unscored`.
pub fn bucket_counts(papers: &[BriefPaper]) -> Vec<(RelevancyBucket, usize)> {
    let mut counts: Vec<(RelevancyBucket, usize)> = RelevancyBucket::SCORED
        .iter()
        .chain(std::iter::once(&RelevancyBucket::Unscored))
        .map(|b| (*b, 0))
        .collect();
    for paper in papers {
        if let Some(entry) = counts.iter_mut().find(|(b, _)| *b == paper.bucket()) {
            entry.1 += 1;
        }
    }
    counts
}

/// Keeps papers scoring at least `min_score`. Unscored papers always pass.
pub fn filter_min_relevancy(papers: &[BriefPaper], min_score: u8) -> Vec<&BriefPaper> {
    papers
        .iter()
        .filter(|p| p.score().is_none_or(|s| s >= min_score))
        .collect()
}

/// Keeps papers whose selection flag equals `selected`.
pub fn filter_selected(papers: &[BriefPaper], selected: bool) -> Vec<&BriefPaper> {
    papers
        .iter()
        .filter(|p| p.association.is_selected == selected)
        .collect()
}

/// Stable sort. Unscored papers (for relevancy) and papers without a year
/// (for year) go last in either direction.
pub fn sort_papers<P: AsRef<BriefPaper>>(papers: &mut [P], key: SortKey, direction: SortDirection) {
    papers.sort_by(|a, b| {
        let (a, b) = (a.as_ref(), b.as_ref());
        match key {
            SortKey::Relevancy => compare_missing_last(a.score(), b.score(), direction),
            SortKey::Year => compare_missing_last(a.paper.year, b.paper.year, direction),
        }
    });
}

fn compare_missing_last<T: Ord>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Ascending => a.cmp(&b),
            SortDirection::Descending => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl AsRef<BriefPaper> for BriefPaper {
    fn as_ref(&self) -> &BriefPaper {
        self
    }
}

/// Persists a user's selection toggle. Returns false if the paper is not in the brief.
pub fn set_selected(
    db: &Database,
    brief_id: &str,
    paper_id: i64,
    selected: bool,
) -> Result<bool, DatabaseError> {
    association_repo::set_selected(db, brief_id, paper_id, selected)
}
