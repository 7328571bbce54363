use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use chrono::Datelike;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use rand_distr::{Distribution, Normal};
use tracing::warn;

use crate::history::RevisionHistory;
use crate::revision::RevisionId;

const MAX_DRAWS_PER_REVISION: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum SamplingMethod {
    Uniform,
    HalfNormal,
    Normal,
    PerYear,
    Specific(Vec<String>),
    Latest,
}

impl SamplingMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::HalfNormal => "half_normal",
            Self::Normal => "normal",
            Self::PerYear => "per_year",
            Self::Specific(_) => "specific",
            Self::Latest => "latest",
        }
    }

    pub fn sample(
        &self,
        pool: &[RevisionId],
        history: &dyn RevisionHistory,
        count: usize,
        seed: u64,
    ) -> Result<Sample> {
        match self {
            Self::Uniform => Ok(sample_uniform(pool, count, seed)),
            Self::HalfNormal => sample_indexed(pool, count, seed, IndexShape::HalfNormal),
            Self::Normal => sample_indexed(pool, count, seed, IndexShape::Normal),
            Self::PerYear => Ok(sample_per_year(pool, history, count, seed)),
            Self::Specific(names) => Ok(sample_specific(names, history)),
            Self::Latest => Ok(sample_latest(pool)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub revisions: Vec<RevisionId>,
    pub requested: usize,
    pub unresolved: Vec<String>,
}

impl Sample {
    fn full_pool(pool: &[RevisionId], requested: usize) -> Self {
        Self {
            revisions: pool.to_vec(),
            requested,
            unresolved: Vec::new(),
        }
    }

    fn from_indices(pool: &[RevisionId], indices: &[usize], requested: usize) -> Self {
        Self {
            revisions: indices.iter().map(|&index| pool[index].clone()).collect(),
            requested,
            unresolved: Vec::new(),
        }
    }

    pub fn is_under_fulfilled(&self) -> bool {
        self.revisions.len() < self.requested
    }
}

#[derive(Debug, Clone, Copy)]
enum IndexShape {
    HalfNormal,
    Normal,
}

fn sample_uniform(pool: &[RevisionId], count: usize, seed: u64) -> Sample {
    if count >= pool.len() {
        return Sample::full_pool(pool, count);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, pool.len(), count).into_vec();
    picked.sort_unstable();

    Sample::from_indices(pool, &picked, count)
}

fn sample_indexed(pool: &[RevisionId], count: usize, seed: u64, shape: IndexShape) -> Result<Sample> {
    let total = pool.len();
    if count >= total {
        return Ok(Sample::full_pool(pool, count));
    }

    let distribution = match shape {
        IndexShape::HalfNormal => Normal::new(0.0, total as f64 / 4.0),
        IndexShape::Normal => Normal::new((total as f64 - 1.0) / 2.0, total as f64 / 6.0),
    }
    .context("failed to build index distribution")?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = HashSet::new();
    let budget = count.saturating_mul(MAX_DRAWS_PER_REVISION);
    let mut draws = 0_usize;

    while picked.len() < count && draws < budget {
        draws += 1;
        let value = distribution.sample(&mut rng);
        let raw = match shape {
            IndexShape::HalfNormal => (total as f64 - 1.0) - value.abs(),
            IndexShape::Normal => value,
        };
        picked.insert(raw.round().clamp(0.0, total as f64 - 1.0) as usize);
    }

    let mut indices: Vec<usize> = picked.into_iter().collect();
    indices.sort_unstable();

    Ok(Sample::from_indices(pool, &indices, count))
}

fn sample_per_year(
    pool: &[RevisionId],
    history: &dyn RevisionHistory,
    per_year: usize,
    seed: u64,
) -> Sample {
    let mut buckets: BTreeMap<i32, Vec<RevisionId>> = BTreeMap::new();
    let mut undated = 0_usize;

    for revision in pool {
        match history.commit_date(revision) {
            Some(date) => buckets.entry(date.year()).or_default().push(revision.clone()),
            None => undated += 1,
        }
    }

    if undated > 0 {
        warn!(
            count = undated,
            "skipping revisions without commit dates in per-year sampling"
        );
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut revisions = Vec::new();

    for bucket in buckets.values() {
        if per_year >= bucket.len() {
            revisions.extend(bucket.iter().cloned());
            continue;
        }

        let mut picked = index::sample(&mut rng, bucket.len(), per_year).into_vec();
        picked.sort_unstable();
        revisions.extend(picked.into_iter().map(|index| bucket[index].clone()));
    }

    revisions.sort_by_key(|revision| revision.sequence);
    let requested = revisions.len();

    Sample {
        revisions,
        requested,
        unresolved: Vec::new(),
    }
}

fn sample_specific(names: &[String], history: &dyn RevisionHistory) -> Sample {
    let mut revisions: Vec<RevisionId> = Vec::new();
    let mut unresolved = Vec::new();

    for name in names {
        match history.resolve(name) {
            Some(revision) => {
                if !revisions.contains(&revision) {
                    revisions.push(revision);
                }
            }
            None => unresolved.push(name.clone()),
        }
    }

    revisions.sort_by_key(|revision| revision.sequence);
    let requested = revisions.len() + unresolved.len();

    Sample {
        revisions,
        requested,
        unresolved,
    }
}

fn sample_latest(pool: &[RevisionId]) -> Sample {
    Sample {
        revisions: pool.last().cloned().into_iter().collect(),
        requested: 1,
        unresolved: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use crate::history::CommitMap;

    use super::*;

    fn hash_for(index: u32) -> String {
        format!("{index:04x}").repeat(10)
    }

    fn plain_history(count: u32) -> CommitMap {
        let lines: String = (0..count)
            .map(|index| format!("{}, {}\n", index, hash_for(index)))
            .collect();
        CommitMap::from_lines(&lines).unwrap()
    }

    fn dated_history(years: &[(i32, u32)]) -> CommitMap {
        let mut lines = String::new();
        let mut sequence = 0;
        for &(year, count) in years {
            for month in 0..count {
                lines.push_str(&format!(
                    "{}, {}, {}-{:02}-01T00:00:00+00:00\n",
                    sequence,
                    hash_for(sequence),
                    year,
                    month % 12 + 1
                ));
                sequence += 1;
            }
        }
        CommitMap::from_lines(&lines).unwrap()
    }

    fn assert_distinct_subset(sample: &Sample, history: &CommitMap) {
        let pool: HashSet<&str> = history
            .list_revisions()
            .iter()
            .map(|revision| revision.hash.as_str())
            .collect();
        let mut seen = HashSet::new();

        for revision in &sample.revisions {
            assert!(pool.contains(revision.hash.as_str()));
            assert!(seen.insert(revision.hash.as_str()));
        }
    }

    #[test]
    fn uniform_sampling_is_deterministic_per_seed() {
        let history = plain_history(500);
        let method = SamplingMethod::Uniform;

        let first = method
            .sample(history.list_revisions(), &history, 10, 42)
            .unwrap();
        let second = method
            .sample(history.list_revisions(), &history, 10, 42)
            .unwrap();

        assert_eq!(first.revisions.len(), 10);
        assert_eq!(first.revisions, second.revisions);
        assert!(!first.is_under_fulfilled());
        assert_distinct_subset(&first, &history);
    }

    #[test]
    fn requesting_more_than_history_returns_everything() {
        let history = plain_history(8);

        for method in [
            SamplingMethod::Uniform,
            SamplingMethod::HalfNormal,
            SamplingMethod::Normal,
        ] {
            let sample = method
                .sample(history.list_revisions(), &history, 20, 7)
                .unwrap();
            assert_eq!(sample.revisions.len(), 8);
            assert_eq!(sample.requested, 20);
            assert!(sample.is_under_fulfilled());
        }
    }

    #[test]
    fn normal_shapes_return_exactly_the_requested_count() {
        let history = plain_history(120);

        for method in [SamplingMethod::HalfNormal, SamplingMethod::Normal] {
            let first = method
                .sample(history.list_revisions(), &history, 15, 3)
                .unwrap();
            let second = method
                .sample(history.list_revisions(), &history, 15, 3)
                .unwrap();

            assert_eq!(first.revisions.len(), 15);
            assert_eq!(first.revisions, second.revisions);
            assert_distinct_subset(&first, &history);
        }
    }

    #[test]
    fn per_year_sampling_caps_each_bucket() {
        let history = dated_history(&[(2018, 5), (2019, 2), (2020, 4)]);
        let method = SamplingMethod::PerYear;

        let sample = method
            .sample(history.list_revisions(), &history, 3, 11)
            .unwrap();
        let repeat = method
            .sample(history.list_revisions(), &history, 3, 11)
            .unwrap();

        assert_eq!(sample.revisions.len(), 3 + 2 + 3);
        assert_eq!(sample.revisions, repeat.revisions);
        assert!(!sample.is_under_fulfilled());
        assert_distinct_subset(&sample, &history);
    }

    #[test]
    fn per_year_sampling_skips_undated_revisions() {
        let mut lines = String::new();
        lines.push_str(&format!("0, {}, 2020-01-01T00:00:00+00:00\n", hash_for(0)));
        lines.push_str(&format!("1, {}\n", hash_for(1)));
        let history = CommitMap::from_lines(&lines).unwrap();

        let sample = SamplingMethod::PerYear
            .sample(history.list_revisions(), &history, 5, 0)
            .unwrap();

        assert_eq!(sample.revisions.len(), 1);
        assert_eq!(sample.revisions[0].sequence, 0);
    }

    #[test]
    fn specific_sampling_reports_unresolvable_names() {
        let history = plain_history(6);
        let names = vec![
            hash_for(2)[..12].to_string(),
            "feedfeedfeed".to_string(),
            hash_for(4),
        ];

        let sample = SamplingMethod::Specific(names)
            .sample(history.list_revisions(), &history, 0, 0)
            .unwrap();

        assert_eq!(sample.revisions.len(), 2);
        assert_eq!(sample.unresolved, vec!["feedfeedfeed".to_string()]);
        assert!(sample.is_under_fulfilled());
    }

    #[test]
    fn duplicate_specific_names_collapse_without_under_fulfillment() {
        let history = plain_history(6);
        let names = vec![hash_for(3), hash_for(3)[..16].to_string()];

        let sample = SamplingMethod::Specific(names)
            .sample(history.list_revisions(), &history, 0, 0)
            .unwrap();

        assert_eq!(sample.revisions.len(), 1);
        assert!(!sample.is_under_fulfilled());
    }

    #[test]
    fn latest_picks_the_newest_revision_only() {
        let history = plain_history(9);
        let sample = SamplingMethod::Latest
            .sample(history.list_revisions(), &history, 0, 0)
            .unwrap();

        assert_eq!(sample.revisions.len(), 1);
        assert_eq!(sample.revisions[0].sequence, 8);

        let empty = plain_history(0);
        let missing = SamplingMethod::Latest
            .sample(empty.list_revisions(), &empty, 0, 0)
            .unwrap();
        assert!(missing.revisions.is_empty());
        assert!(missing.is_under_fulfilled());
    }

    #[test]
    fn seeds_change_uniform_selections() {
        let history = plain_history(300);
        let method = SamplingMethod::Uniform;

        let first = method
            .sample(history.list_revisions(), &history, 20, 1)
            .unwrap();
        let second = method
            .sample(history.list_revisions(), &history, 20, 2)
            .unwrap();

        assert_ne!(first.revisions, second.revisions);
    }
}
