//! Nearest-candidate search within a radius.

use bevy::prelude::*;

/// Tracks the nearest candidate to a reference point.
///
/// A candidate is kept only if it is strictly closer than both the search
/// radius and the best candidate so far, so the first of several equidistant
/// candidates wins and anything at exactly the radius is rejected.
///
/// One finder answers one query; build a new one for the next search.
#[derive(Debug, Clone)]
pub struct ClosestEntityFinder<T> {
    reference: Vec3,
    max_distance: f32,
    closest: Option<T>,
    closest_distance: f32,
}

impl<T> ClosestEntityFinder<T> {
    /// Creates a finder around `reference`. `None` means unbounded.
    pub fn new(reference: Vec3, max_distance: Option<f32>) -> Self {
        Self {
            reference,
            max_distance: max_distance.unwrap_or(f32::INFINITY),
            closest: None,
            closest_distance: f32::INFINITY,
        }
    }

    /// Offers a candidate located at `position`. Returns `true` if it became the closest.
    pub fn consider(&mut self, candidate: T, position: Vec3) -> bool {
        let distance = self.reference.distance(position);
        if distance < self.max_distance && distance < self.closest_distance {
            self.closest = Some(candidate);
            self.closest_distance = distance;
            true
        } else {
            false
        }
    }

    pub fn closest(&self) -> Option<&T> {
        self.closest.as_ref()
    }

    /// Distance to the current best candidate, if any.
    pub fn closest_distance(&self) -> Option<f32> {
        self.closest.as_ref().map(|_| self.closest_distance)
    }

    pub fn into_closest(self) -> Option<T> {
        self.closest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_nearest_candidate() {
        let mut finder = ClosestEntityFinder::new(Vec3::ZERO, None);
        finder.consider("far", Vec3::new(5.0, 0.0, 0.0));
        finder.consider("near", Vec3::new(0.0, 0.0, 2.0));
        finder.consider("middle", Vec3::new(0.0, 3.0, 0.0));

        assert_eq!(finder.closest(), Some(&"near"));
        assert_eq!(finder.closest_distance(), Some(2.0));
    }

    #[test]
    fn first_candidate_wins_ties() {
        let mut finder = ClosestEntityFinder::new(Vec3::ZERO, Some(10.0));
        assert!(finder.consider(1, Vec3::new(3.0, 0.0, 0.0)));
        assert!(!finder.consider(2, Vec3::new(-3.0, 0.0, 0.0)));
        assert!(!finder.consider(3, Vec3::new(0.0, 0.0, 3.0)));

        assert_eq!(finder.into_closest(), Some(1));
    }

    #[test]
    fn radius_bound_is_strict() {
        let mut finder = ClosestEntityFinder::new(Vec3::ZERO, Some(10.0));
        finder.consider("edge", Vec3::new(10.0, 0.0, 0.0));
        finder.consider("outside", Vec3::new(0.0, 0.0, 12.0));

        assert!(finder.closest().is_none());
        assert!(finder.closest_distance().is_none());
    }

    #[test]
    fn unbounded_finder_accepts_any_distance() {
        let mut finder = ClosestEntityFinder::new(Vec3::ONE, None);
        finder.consider('a', Vec3::splat(1.0e6));

        assert_eq!(finder.closest(), Some(&'a'));
    }
}
