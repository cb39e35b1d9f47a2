//! Banker's algorithm: safety check and resource-request handling.
//!
//! Matrices are indexed `[process][resource]`. Process identities in
//! reports are row indices.

use tracing::{debug, info, warn};

use ossim_core::BankerError;

/// One allocability check made during a safety search.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafetyStep {
    /// Pass number, starting at 1.
    pub pass: usize,
    /// Process row tested.
    pub process: usize,
    /// Work vector the need was compared against.
    pub work: Vec<u32>,
    /// The process's remaining need.
    pub need: Vec<u32>,
    /// Whether `need <= work` held.
    pub granted: bool,
}

/// Outcome of a safety search.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafetyReport {
    /// Whether every process can finish.
    pub is_safe: bool,
    /// Order in which processes finished. Complete iff `is_safe`.
    pub sequence: Vec<usize>,
    /// Every check in the order it was made: pass by pass, process-index
    /// order within a pass.
    pub steps: Vec<SafetyStep>,
}

/// Outcome of [`BankerState::request`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestOutcome {
    /// Granted; the state is safe afterwards.
    Granted(SafetyReport),
    /// Not enough available right now; the state is unchanged.
    MustWait,
    /// Granting would be unsafe; the tentative grant was rolled back.
    Denied(SafetyReport),
}

impl RequestOutcome {
    /// Whether the request was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Validated Banker's matrices.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BankerState {
    allocation: Vec<Vec<u32>>,
    max: Vec<Vec<u32>>,
    available: Vec<u32>,
}

impl BankerState {
    /// Validate and take ownership of the matrices.
    ///
    /// # Errors
    ///
    /// [`BankerError::Empty`] without processes or resource types,
    /// [`BankerError::DimensionMismatch`] for ragged input, and
    /// [`BankerError::MaxBelowAllocation`] if any need would be negative,
    /// and [`BankerError::Overflow`] if a resource's total instance count
    /// does not fit in a `u32`.
    pub fn new(
        allocation: Vec<Vec<u32>>,
        max: Vec<Vec<u32>>,
        available: Vec<u32>,
    ) -> Result<Self, BankerError> {
        validate(&allocation, &max, &available)?;
        Ok(Self {
            allocation,
            max,
            available,
        })
    }

    /// Number of processes.
    pub fn processes(&self) -> usize {
        self.allocation.len()
    }

    /// Number of resource types.
    pub fn resources(&self) -> usize {
        self.available.len()
    }

    /// Allocation matrix.
    pub fn allocation(&self) -> &[Vec<u32>] {
        &self.allocation
    }

    /// Max (declared claim) matrix.
    pub fn max(&self) -> &[Vec<u32>] {
        &self.max
    }

    /// Available vector.
    pub fn available(&self) -> &[u32] {
        &self.available
    }

    /// `max - allocation`, entrywise.
    pub fn need(&self) -> Vec<Vec<u32>> {
        (0..self.processes()).map(|i| self.need_of(i)).collect()
    }

    fn need_of(&self, process: usize) -> Vec<u32> {
        self.max[process]
            .iter()
            .zip(&self.allocation[process])
            .map(|(m, a)| m - a)
            .collect()
    }

    /// Run the safety search on the current state.
    pub fn check_safety(&self) -> SafetyReport {
        let need = self.need();
        let n = self.processes();
        let mut work = self.available.clone();
        let mut finished = vec![false; n];
        let mut report = SafetyReport {
            is_safe: false,
            sequence: Vec::with_capacity(n),
            steps: Vec::new(),
        };
        let max_passes = (n * n).max(1);

        for pass in 1..=max_passes {
            let mut progressed = false;
            for i in 0..n {
                if finished[i] {
                    continue;
                }
                let granted = fits(&need[i], &work);
                report.steps.push(SafetyStep {
                    pass,
                    process: i,
                    work: work.clone(),
                    need: need[i].clone(),
                    granted,
                });
                if granted {
                    for (w, a) in work.iter_mut().zip(&self.allocation[i]) {
                        *w += a;
                    }
                    finished[i] = true;
                    report.sequence.push(i);
                    progressed = true;
                    debug!(pass, process = i, "safety check passed");
                }
            }
            if report.sequence.len() == n || !progressed {
                break;
            }
            if pass == max_passes {
                warn!(max_passes, "safety search hit its pass limit");
            }
        }

        report.is_safe = report.sequence.len() == n;
        report
    }

    /// Resource-request algorithm.
    ///
    /// # Errors
    ///
    /// Fails on an unknown process, a wrongly sized request, or a request
    /// beyond the process's remaining need.
    pub fn request(&mut self, process: usize, request: &[u32]) -> Result<RequestOutcome, BankerError> {
        self.check_vector(process, request)?;
        let need = self.need_of(process);
        for (j, (&r, &nd)) in request.iter().zip(&need).enumerate() {
            if r > nd {
                return Err(BankerError::RequestExceedsNeed {
                    process,
                    resource: j,
                    requested: r,
                    need: nd,
                });
            }
        }
        if !fits(request, &self.available) {
            debug!(process, ?request, "request must wait");
            return Ok(RequestOutcome::MustWait);
        }

        self.apply(process, request);
        let report = self.check_safety();
        if report.is_safe {
            info!(process, ?request, "request granted");
            Ok(RequestOutcome::Granted(report))
        } else {
            self.unapply(process, request);
            info!(process, ?request, "request denied, state would be unsafe");
            Ok(RequestOutcome::Denied(report))
        }
    }

    /// Return resources from `process` to the pool.
    ///
    /// # Errors
    ///
    /// Fails on an unknown process, a wrongly sized vector, or a release
    /// larger than what the process holds.
    pub fn release(&mut self, process: usize, release: &[u32]) -> Result<(), BankerError> {
        self.check_vector(process, release)?;
        for (j, (&r, &held)) in release.iter().zip(&self.allocation[process]).enumerate() {
            if r > held {
                return Err(BankerError::ReleaseExceedsAllocation {
                    process,
                    resource: j,
                    released: r,
                    held,
                });
            }
        }
        self.unapply(process, release);
        debug!(process, ?release, "release");
        Ok(())
    }

    fn check_vector(&self, process: usize, vector: &[u32]) -> Result<(), BankerError> {
        if process >= self.processes() {
            return Err(BankerError::UnknownProcess { index: process });
        }
        if vector.len() != self.resources() {
            return Err(BankerError::DimensionMismatch {
                what: "request",
                expected: self.resources(),
                found: vector.len(),
            });
        }
        Ok(())
    }

    fn apply(&mut self, process: usize, amounts: &[u32]) {
        for (j, &r) in amounts.iter().enumerate() {
            self.available[j] -= r;
            self.allocation[process][j] += r;
        }
    }

    fn unapply(&mut self, process: usize, amounts: &[u32]) {
        for (j, &r) in amounts.iter().enumerate() {
            self.available[j] += r;
            self.allocation[process][j] -= r;
        }
    }
}

/// One-shot safety check on borrowed matrices.
///
/// Pure: equal inputs always give equal reports.
pub fn check_safety(
    allocation: &[Vec<u32>],
    max: &[Vec<u32>],
    available: &[u32],
) -> Result<SafetyReport, BankerError> {
    let state = BankerState::new(allocation.to_vec(), max.to_vec(), available.to_vec())?;
    Ok(state.check_safety())
}

fn fits(need: &[u32], work: &[u32]) -> bool {
    need.iter().zip(work).all(|(n, w)| n <= w)
}

fn validate(allocation: &[Vec<u32>], max: &[Vec<u32>], available: &[u32]) -> Result<(), BankerError> {
    let processes = allocation.len();
    let resources = available.len();
    if processes == 0 || resources == 0 {
        return Err(BankerError::Empty);
    }
    if max.len() != processes {
        return Err(BankerError::DimensionMismatch {
            what: "max rows",
            expected: processes,
            found: max.len(),
        });
    }
    for (i, (alloc_row, max_row)) in allocation.iter().zip(max).enumerate() {
        if alloc_row.len() != resources {
            return Err(BankerError::DimensionMismatch {
                what: "allocation row",
                expected: resources,
                found: alloc_row.len(),
            });
        }
        if max_row.len() != resources {
            return Err(BankerError::DimensionMismatch {
                what: "max row",
                expected: resources,
                found: max_row.len(),
            });
        }
        if let Some(j) = (0..resources).find(|&j| max_row[j] < alloc_row[j]) {
            return Err(BankerError::MaxBelowAllocation {
                process: i,
                resource: j,
            });
        }
    }
    // Work, releases and rollbacks never exceed this total.
    for (j, &avail) in available.iter().enumerate() {
        allocation
            .iter()
            .try_fold(avail, |total, row| total.checked_add(row[j]))
            .ok_or(BankerError::Overflow { resource: j })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn textbook() -> BankerState {
        BankerState::new(
            vec![
                vec![0, 1, 0],
                vec![2, 0, 0],
                vec![3, 0, 2],
                vec![2, 1, 1],
                vec![0, 0, 2],
            ],
            vec![
                vec![7, 5, 3],
                vec![3, 2, 2],
                vec![9, 0, 2],
                vec![2, 2, 2],
                vec![4, 3, 3],
            ],
            vec![3, 3, 2],
        )
        .unwrap()
    }

    #[test]
    fn textbook_is_safe() {
        let report = textbook().check_safety();
        assert!(report.is_safe);
        assert_eq!(report.sequence, vec![1, 3, 4, 0, 2]);
        // Pass 1 tries all five, pass 2 the two left over.
        assert_eq!(report.steps.len(), 7);
        let granted: Vec<_> = report.steps.iter().map(|s| s.granted).collect();
        assert_eq!(granted, vec![false, true, false, true, true, true, true]);
        assert_eq!(report.steps[1].work, vec![3, 3, 2]);
        assert_eq!(report.steps[1].need, vec![1, 2, 2]);
        assert_eq!(report.steps[5].pass, 2);
    }

    #[test]
    fn single_resource_unsafe() {
        let report = check_safety(&[vec![5], vec![4], vec![3]], &[vec![9], vec![7], vec![6]], &[0]).unwrap();
        assert!(!report.is_safe);
        assert!(report.sequence.is_empty());
        assert_eq!(report.steps.len(), 3);
        assert!(report.steps.iter().all(|s| !s.granted && s.pass == 1));
    }

    #[test]
    fn validation() {
        assert_eq!(check_safety(&[], &[], &[]), Err(BankerError::Empty));
        assert_eq!(
            check_safety(&[vec![1]], &[vec![0]], &[0]),
            Err(BankerError::MaxBelowAllocation {
                process: 0,
                resource: 0
            })
        );
        assert!(matches!(
            check_safety(&[vec![1, 0]], &[vec![1]], &[0, 0]),
            Err(BankerError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn totals_beyond_u32_are_rejected() {
        assert_eq!(
            check_safety(&[vec![1], vec![0]], &[vec![1], vec![0]], &[u32::MAX]),
            Err(BankerError::Overflow { resource: 0 })
        );
        assert_eq!(
            check_safety(&[vec![0, 2]], &[vec![0, 2]], &[1, u32::MAX - 1]),
            Err(BankerError::Overflow { resource: 1 })
        );
    }

    #[test]
    fn full_u32_range_is_usable() {
        let mut state = BankerState::new(vec![vec![1], vec![0]], vec![vec![1], vec![1]], vec![u32::MAX - 1]).unwrap();
        let report = state.check_safety();
        assert!(report.is_safe);
        assert_eq!(report.sequence, vec![0, 1]);
        assert_eq!(report.steps[1].work, vec![u32::MAX]);

        assert!(state.request(1, &[1]).unwrap().is_granted());
        state.release(0, &[1]).unwrap();
        state.release(1, &[1]).unwrap();
        assert_eq!(state.available(), &[u32::MAX]);
    }

    #[test]
    fn request_granted_when_safe() {
        let mut state = textbook();
        let outcome = state.request(1, &[1, 0, 2]).unwrap();
        assert!(outcome.is_granted());
        assert_eq!(state.available(), &[2, 3, 0]);
        assert_eq!(state.allocation()[1], vec![3, 0, 2]);
    }

    #[test]
    fn request_must_wait_or_is_denied() {
        let mut state = textbook();
        state.request(1, &[1, 0, 2]).unwrap();
        // P4 asks for 3,3,0: more than available (2,3,0).
        assert_eq!(state.request(4, &[3, 3, 0]).unwrap(), RequestOutcome::MustWait);
        // P0 asks for 0,2,0: fits, but leaves the system unsafe.
        let before = state.clone();
        let outcome = state.request(0, &[0, 2, 0]).unwrap();
        assert!(matches!(outcome, RequestOutcome::Denied(ref r) if !r.is_safe));
        assert_eq!(state, before);
    }

    #[test]
    fn request_beyond_need_is_an_error() {
        let mut state = textbook();
        assert_eq!(
            state.request(3, &[1, 0, 0]),
            Err(BankerError::RequestExceedsNeed {
                process: 3,
                resource: 0,
                requested: 1,
                need: 0
            })
        );
        assert_eq!(
            state.request(9, &[0, 0, 0]),
            Err(BankerError::UnknownProcess { index: 9 })
        );
    }

    #[test]
    fn release_returns_resources() {
        let mut state = textbook();
        state.release(2, &[3, 0, 0]).unwrap();
        assert_eq!(state.available(), &[6, 3, 2]);
        assert!(matches!(
            state.release(2, &[1, 0, 0]),
            Err(BankerError::ReleaseExceedsAllocation { held: 0, .. })
        ));
    }

    fn systems() -> impl Strategy<Value = (Vec<Vec<u32>>, Vec<Vec<u32>>, Vec<u32>)> {
        (1usize..6, 1usize..4).prop_flat_map(|(p, r)| {
            (
                prop::collection::vec(prop::collection::vec((0u32..5, 0u32..5), r), p),
                prop::collection::vec(0u32..6, r),
            )
                .prop_map(|(cells, available)| {
                    let allocation = cells.iter().map(|row| row.iter().map(|c| c.0).collect()).collect();
                    let max = cells.iter().map(|row| row.iter().map(|c| c.0 + c.1).collect()).collect();
                    (allocation, max, available)
                })
        })
    }

    proptest! {
        #[test]
        fn safe_sequence_is_replayable((allocation, max, available) in systems()) {
            let report = check_safety(&allocation, &max, &available).unwrap();
            prop_assert_eq!(&report, &check_safety(&allocation, &max, &available).unwrap());

            // Replaying the sequence never needs more than is on hand.
            let mut work = available.clone();
            for &i in &report.sequence {
                for j in 0..work.len() {
                    prop_assert!(max[i][j] - allocation[i][j] <= work[j]);
                    work[j] += allocation[i][j];
                }
            }
            prop_assert_eq!(report.is_safe, report.sequence.len() == allocation.len());
            prop_assert_eq!(
                report.steps.iter().filter(|s| s.granted).count(),
                report.sequence.len()
            );
        }
    }
}
