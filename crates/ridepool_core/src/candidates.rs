//! Lazy enumeration of insertion positions.
//!
//! For a route of `n` stops with `lock` stops already served, every `(p, d)` with
//! `lock <= p <= d <= n` is produced exactly once, in lexicographic order. Existing stops
//! keep their relative order.

use std::sync::Arc;

use crate::request::Request;
use crate::route::{Candidate, Route, TimingContext};

/// Restartable iterator over `(pickup_pos, dropoff_pos)` pairs; clone it to start over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionPositions {
    len: usize,
    next: Option<(usize, usize)>,
}

impl InsertionPositions {
    pub fn new(lock: usize, len: usize) -> Self {
        Self {
            len,
            next: (lock <= len).then_some((lock, lock)),
        }
    }
}

impl Iterator for InsertionPositions {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (p, d) = self.next?;
        self.next = if d < self.len {
            Some((p, d + 1))
        } else if p < self.len {
            Some((p + 1, p + 1))
        } else {
            None
        };
        Some((p, d))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next {
            None => 0,
            Some((p, d)) => {
                let rows_after = self.len - p;
                (self.len - d + 1) + rows_after * (rows_after + 1) / 2
            }
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for InsertionPositions {}

/// Candidates for one request on one route, built on demand.
#[derive(Debug, Clone)]
pub struct CandidateGenerator<'a> {
    route: &'a Route,
    request: Arc<Request>,
    timing: TimingContext<'a>,
    positions: InsertionPositions,
}

impl<'a> CandidateGenerator<'a> {
    /// Positions start after the stops already served at `timing.now_ms`.
    pub fn new(route: &'a Route, request: Arc<Request>, timing: TimingContext<'a>) -> Self {
        let positions = InsertionPositions::new(route.locked_len(timing.now_ms), route.len());
        Self {
            route,
            request,
            timing,
            positions,
        }
    }
}

impl Iterator for CandidateGenerator<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        let (p, d) = self.positions.next()?;
        Some(
            self.route
                .with_insertion(p, d, Arc::clone(&self.request), &self.timing),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.positions.size_hint()
    }
}

impl ExactSizeIterator for CandidateGenerator<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{line_cell, test_request_between, test_travel, test_vehicle};

    #[test]
    fn empty_route_has_single_position() {
        let positions: Vec<_> = InsertionPositions::new(0, 0).collect();
        assert_eq!(positions, vec![(0, 0)]);
    }

    #[test]
    fn positions_are_lexicographic_and_counted() {
        let positions = InsertionPositions::new(0, 2);
        assert_eq!(positions.len(), 6);
        let all: Vec<_> = positions.collect();
        assert_eq!(all, vec![(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn lock_skips_served_prefix() {
        let all: Vec<_> = InsertionPositions::new(2, 4).collect();
        assert_eq!(all, vec![(2, 2), (2, 3), (2, 4), (3, 3), (3, 4), (4, 4)]);
        assert!(all.iter().all(|&(p, d)| p >= 2 && p <= d && d <= 4));
    }

    #[test]
    fn size_hint_tracks_progress() {
        let mut positions = InsertionPositions::new(0, 3);
        let total = positions.len();
        assert_eq!(total, 10);
        positions.next();
        positions.next();
        assert_eq!(positions.len(), total - 2);
    }

    #[test]
    fn clone_restarts_enumeration() {
        let travel = test_travel();
        let mut route = Route::new(test_vehicle(1, 4, line_cell(0)));
        let timing = TimingContext {
            travel: &travel,
            dwell_ms: 0,
            now_ms: 0,
        };
        let first = test_request_between(1, line_cell(1), line_cell(5), 0);
        let seed = route.with_insertion(0, 0, first, &timing);
        route.commit(seed).expect("commit");

        let request = test_request_between(2, line_cell(2), line_cell(4), 0);
        let generator = CandidateGenerator::new(&route, request, timing);
        let again = generator.clone();

        let positions: Vec<_> = generator
            .map(|candidate| (candidate.pickup_pos, candidate.dropoff_pos))
            .collect();
        assert_eq!(positions.len(), 6);
        assert_eq!(again.count(), positions.len());
    }
}
