//! Random peer-review assignment between groups.
//!
//! Groups are shuffled into a ring and `k` distinct offsets are drawn from
//! `1..N`. For every offset, the group at position `i` reviews the group at
//! `(i + offset) mod N`. Distinct non-zero offsets guarantee nobody reviews
//! themselves and nobody reviews the same group twice.

use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::groups::Group;

/// The groups one group must review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAssignment {
    /// The group doing the reviewing.
    pub reviewer: Group,
    /// Groups whose work `reviewer` reviews, one per drawn offset.
    pub reviewees: Vec<Group>,
}

/// All review assignments for one assessment, in shuffled ring order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerReviewAssignments {
    assignments: Vec<ReviewAssignment>,
}

impl PeerReviewAssignments {
    /// Assigns `reviews_per_group` reviews to each group.
    ///
    /// Returns `None` when there is nothing to assign: zero reviews were
    /// requested or there is at most one group. A request for as many
    /// reviews as there are other groups (or more) is clamped.
    pub fn assign<R: Rng + ?Sized>(groups: &[Group], reviews_per_group: u32, rng: &mut R) -> Option<Self> {
        let n = groups.len();
        if reviews_per_group == 0 {
            return None;
        }
        if n < 2 {
            warn!(groups = n, "not enough groups for peer review; skipping");
            return None;
        }

        let mut k = reviews_per_group as usize;
        if k > n - 1 {
            warn!(requested = k, available = n - 1, "fewer groups than requested reviews; clamping");
            k = n - 1;
        }

        let mut ring = groups.to_vec();
        ring.shuffle(rng);
        let offsets: Vec<usize> = index::sample(rng, n - 1, k).into_iter().map(|i| i + 1).collect();

        let assignments = ring
            .iter()
            .enumerate()
            .map(|(i, reviewer)| ReviewAssignment {
                reviewer: reviewer.clone(),
                reviewees: offsets.iter().map(|offset| ring[(i + offset) % n].clone()).collect(),
            })
            .collect();
        Some(Self { assignments })
    }

    /// Iterates over assignments.
    pub fn iter(&self) -> impl Iterator<Item = &ReviewAssignment> {
        self.assignments.iter()
    }

    /// Groups assigned to review `group`.
    pub fn reviewers_of<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a Group> + 'a {
        self.assignments
            .iter()
            .filter(move |a| a.reviewees.contains(group))
            .map(|a| &a.reviewer)
    }

    /// Number of reviewing groups.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Returns `true` if no assignments were made.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
