//! Disk-arm scheduling policies.
//!
//! The sweeping policies travel to a disk edge (SCAN, C-SCAN) only when
//! requests remain on the other side of the head; C-SCAN and C-LOOK count
//! the return seek as head movement.

use std::fmt;

use tracing::debug;

use ossim_core::ConfigError;

/// Disk-arm scheduling policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiskPolicy {
    /// Arrival order.
    #[default]
    Fcfs,
    /// Shortest seek time first; ties go to the lower cylinder.
    Sstf,
    /// Elevator: sweep to the edge, then reverse.
    Scan,
    /// Circular SCAN: sweep to the edge, return to the opposite edge.
    CScan,
    /// SCAN that reverses at the last request instead of the edge.
    Look,
    /// C-SCAN that jumps between the extreme requests.
    CLook,
}

impl fmt::Display for DiskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fcfs => "FCFS",
            Self::Sstf => "SSTF",
            Self::Scan => "SCAN",
            Self::CScan => "C-SCAN",
            Self::Look => "LOOK",
            Self::CLook => "C-LOOK",
        })
    }
}

/// Initial direction of head travel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Toward higher cylinder numbers.
    #[default]
    Up,
    /// Toward cylinder zero.
    Down,
}

/// Pending requests and head state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskQueue {
    /// Number of cylinders; valid positions are `0..cylinders`.
    pub cylinders: u32,
    /// Starting head position.
    pub head: u32,
    /// Initial travel direction (ignored by FCFS and SSTF).
    pub direction: Direction,
    /// Requested cylinders in arrival order.
    pub requests: Vec<u32>,
}

impl DiskQueue {
    /// Queue with the head moving [`Direction::Up`].
    pub fn new(cylinders: u32, head: u32, requests: Vec<u32>) -> Self {
        Self {
            cylinders,
            head,
            direction: Direction::Up,
            requests,
        }
    }

    /// Set the initial direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Check geometry and request bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cylinders == 0 {
            return Err(ConfigError::ZeroCapacity { name: "cylinders" });
        }
        std::iter::once(&self.head)
            .chain(&self.requests)
            .find(|&&c| c >= self.cylinders)
            .map_or(Ok(()), |&cylinder| {
                Err(ConfigError::CylinderOutOfRange {
                    cylinder,
                    cylinders: self.cylinders,
                })
            })
    }
}

/// Result of [`schedule_disk`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskSchedule {
    /// Policy used.
    pub policy: DiskPolicy,
    /// Requests in service order.
    pub serviced: Vec<u32>,
    /// Every position the head moves to, starting with its initial
    /// position and including disk edges the policy travels to.
    pub path: Vec<u32>,
    /// Sum of seek distances along `path`.
    pub total_movement: u64,
    /// `total_movement / requests`, zero for an empty queue.
    pub average_movement: f64,
}

/// Schedule `queue` under `policy`.
///
/// # Errors
///
/// Returns `Err` if the disk has no cylinders or the head or a request
/// lies outside it.
pub fn schedule_disk(policy: DiskPolicy, queue: &DiskQueue) -> Result<DiskSchedule, ConfigError> {
    queue.validate()?;
    let mut path = vec![queue.head];
    let serviced = match policy {
        DiskPolicy::Fcfs => queue.requests.clone(),
        DiskPolicy::Sstf => shortest_seek_order(queue.head, &queue.requests),
        DiskPolicy::Scan | DiskPolicy::CScan | DiskPolicy::Look | DiskPolicy::CLook => {
            sweep(policy, queue, &mut path)
        }
    };
    if matches!(policy, DiskPolicy::Fcfs | DiskPolicy::Sstf) {
        path.extend(&serviced);
    }

    let total_movement: u64 = path
        .windows(2)
        .map(|w| u64::from(w[0].abs_diff(w[1])))
        .sum();
    let average_movement = match serviced.len() {
        0 => 0.0,
        n => total_movement as f64 / n as f64,
    };
    debug!(%policy, head = queue.head, requests = serviced.len(), total_movement, "disk scheduled");
    Ok(DiskSchedule {
        policy,
        serviced,
        path,
        total_movement,
        average_movement,
    })
}

fn shortest_seek_order(head: u32, requests: &[u32]) -> Vec<u32> {
    let mut pending = requests.to_vec();
    let mut order = Vec::with_capacity(pending.len());
    let mut at = head;
    while let Some(index) = pending
        .iter()
        .enumerate()
        .min_by_key(|&(_, &c)| (c.abs_diff(at), c))
        .map(|(i, _)| i)
    {
        at = pending.swap_remove(index);
        order.push(at);
    }
    order
}

/// SCAN-family sweep. Appends head positions to `path` and returns the
/// service order.
fn sweep(policy: DiskPolicy, queue: &DiskQueue, path: &mut Vec<u32>) -> Vec<u32> {
    let head = queue.head;
    let mut sorted = queue.requests.clone();
    sorted.sort_unstable();

    let (lowest_edge, highest_edge) = (0, queue.cylinders - 1);
    // `ahead` in travel order; `behind` nearest-to-head first.
    let (ahead, mut behind, near_edge, far_edge): (Vec<u32>, Vec<u32>, u32, u32) =
        match queue.direction {
            Direction::Up => {
                let split = sorted.partition_point(|&c| c < head);
                let behind: Vec<u32> = sorted[..split].iter().rev().copied().collect();
                (sorted[split..].to_vec(), behind, highest_edge, lowest_edge)
            }
            Direction::Down => {
                let split = sorted.partition_point(|&c| c <= head);
                let ahead: Vec<u32> = sorted[..split].iter().rev().copied().collect();
                (ahead, sorted[split..].to_vec(), lowest_edge, highest_edge)
            }
        };

    let mut order = ahead;
    path.extend(&order);
    if behind.is_empty() {
        return order;
    }
    match policy {
        DiskPolicy::Scan => {
            push_stop(path, near_edge);
        }
        DiskPolicy::CScan => {
            push_stop(path, near_edge);
            push_stop(path, far_edge);
            behind.reverse();
        }
        DiskPolicy::CLook => behind.reverse(),
        _ => {}
    }
    path.extend(&behind);
    order.extend(behind);
    order
}

fn push_stop(path: &mut Vec<u32>, cylinder: u32) {
    if path.last() != Some(&cylinder) {
        path.push(cylinder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textbook() -> DiskQueue {
        DiskQueue::new(200, 53, vec![98, 183, 37, 122, 14, 124, 65, 67])
    }

    fn total(policy: DiskPolicy, queue: &DiskQueue) -> u64 {
        schedule_disk(policy, queue).unwrap().total_movement
    }

    #[test]
    fn fcfs_follows_arrival_order() {
        let s = schedule_disk(DiskPolicy::Fcfs, &textbook()).unwrap();
        assert_eq!(s.total_movement, 640);
        assert_eq!(s.serviced, textbook().requests);
        assert_eq!(s.average_movement, 80.0);
    }

    #[test]
    fn sstf_picks_nearest() {
        let s = schedule_disk(DiskPolicy::Sstf, &textbook()).unwrap();
        assert_eq!(s.serviced, vec![65, 67, 37, 14, 98, 122, 124, 183]);
        assert_eq!(s.total_movement, 236);
    }

    #[test]
    fn scan_travels_to_the_edge() {
        let down = textbook().with_direction(Direction::Down);
        let s = schedule_disk(DiskPolicy::Scan, &down).unwrap();
        assert_eq!(s.path, vec![53, 37, 14, 0, 65, 67, 98, 122, 124, 183]);
        assert_eq!(s.total_movement, 236);
        assert_eq!(total(DiskPolicy::Scan, &textbook()), 331);
    }

    #[test]
    fn circular_policies_count_the_return_seek() {
        let s = schedule_disk(DiskPolicy::CScan, &textbook()).unwrap();
        assert_eq!(s.serviced, vec![65, 67, 98, 122, 124, 183, 14, 37]);
        assert_eq!(&s.path[6..9], &[183, 199, 0]);
        assert_eq!(s.total_movement, 382);
        assert_eq!(total(DiskPolicy::CLook, &textbook()), 322);
    }

    #[test]
    fn look_reverses_at_last_request() {
        assert_eq!(total(DiskPolicy::Look, &textbook()), 299);
        let s = schedule_disk(DiskPolicy::Look, &textbook()).unwrap();
        assert!(!s.path.contains(&199));
    }

    #[test]
    fn one_sided_queue_never_visits_an_edge() {
        let q = DiskQueue::new(100, 10, vec![40, 20, 30]);
        for policy in [DiskPolicy::Scan, DiskPolicy::CScan] {
            let s = schedule_disk(policy, &q).unwrap();
            assert_eq!(s.path, vec![10, 20, 30, 40]);
            assert_eq!(s.total_movement, 30);
        }
    }

    #[test]
    fn empty_queue_and_bad_geometry() {
        let s = schedule_disk(DiskPolicy::Sstf, &DiskQueue::new(10, 5, vec![])).unwrap();
        assert_eq!((s.total_movement, s.average_movement), (0, 0.0));
        assert_eq!(
            schedule_disk(DiskPolicy::Fcfs, &DiskQueue::new(0, 0, vec![])),
            Err(ConfigError::ZeroCapacity { name: "cylinders" })
        );
        assert_eq!(
            schedule_disk(DiskPolicy::Look, &DiskQueue::new(50, 10, vec![5, 50])),
            Err(ConfigError::CylinderOutOfRange {
                cylinder: 50,
                cylinders: 50
            })
        );
    }
}
