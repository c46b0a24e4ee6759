//! Work distribution.
//!
//! Round-robin assignment of job ordinals to workers: job `i` goes to
//! worker `i mod worker_count`. Pure and deterministic, so every worker in
//! the pool derives the identical assignment from the shared job enumeration
//! without any runtime coordination.

/// Mapping from worker index to its ordered share of job ordinals.
/// Computed once per batch launch; purely derived, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    shares: Vec<Vec<usize>>,
}

impl Assignment {
    /// This worker's ordered share. Workers with ordinal beyond the job
    /// count simply get an empty slice.
    pub fn share(&self, worker_index: usize) -> &[usize] {
        self.shares
            .get(worker_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn worker_count(&self) -> usize {
        self.shares.len()
    }
}

/// Compute the round-robin assignment.
///
/// `worker_count` must be at least 1; that is validated during setup, before
/// any batch work begins.
pub fn assign(job_count: usize, worker_count: usize) -> Assignment {
    debug_assert!(worker_count >= 1);
    let worker_count = worker_count.max(1);

    let mut shares = vec![Vec::new(); worker_count];
    for job in 0..job_count {
        shares[job % worker_count].push(job);
    }

    Assignment { shares }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_every_job_exactly_once_with_balanced_shares() {
        for job_count in 0..25 {
            for worker_count in 1..=6 {
                let assignment = assign(job_count, worker_count);

                let mut seen: Vec<usize> = (0..worker_count)
                    .flat_map(|w| assignment.share(w).iter().copied())
                    .collect();
                seen.sort_unstable();
                assert_eq!(seen, (0..job_count).collect::<Vec<_>>());

                let sizes: Vec<usize> =
                    (0..worker_count).map(|w| assignment.share(w).len()).collect();
                let max = sizes.iter().copied().max().unwrap_or(0);
                let min = sizes.iter().copied().min().unwrap_or(0);
                assert!(max - min <= 1, "unbalanced shares: {sizes:?}");
            }
        }
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(assign(17, 4), assign(17, 4));
    }

    #[test]
    fn ten_jobs_three_workers_scenario() {
        let assignment = assign(10, 3);
        assert_eq!(assignment.share(0), &[0, 3, 6, 9]);
        assert_eq!(assignment.share(1), &[1, 4, 7]);
        assert_eq!(assignment.share(2), &[2, 5, 8]);
    }

    #[test]
    fn surplus_workers_get_empty_shares() {
        let assignment = assign(2, 5);
        assert_eq!(assignment.share(0), &[0]);
        assert_eq!(assignment.share(1), &[1]);
        for w in 2..5 {
            assert!(assignment.share(w).is_empty());
        }
        // Out-of-range lookups are empty too, not a panic.
        assert!(assignment.share(99).is_empty());
    }

    #[test]
    fn zero_jobs_means_every_share_is_empty() {
        let assignment = assign(0, 3);
        for w in 0..3 {
            assert!(assignment.share(w).is_empty());
        }
    }
}
