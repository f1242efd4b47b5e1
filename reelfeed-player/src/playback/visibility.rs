//! Visibility hysteresis
//!
//! Converts sampled viewport intersection ratios into a level-triggered
//! boolean per feed row. Only threshold crossings emit; ratio movement on
//! one side of the threshold is silent.

/// Per-row visibility state
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    threshold: f32,
    in_view: bool,
}

impl VisibilityTracker {
    /// Tracker starting out of view (every row but the first)
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            in_view: false,
        }
    }

    /// Tracker that reports in view before the first measurement arrives.
    ///
    /// Used for the first row of a freshly rendered feed to avoid a
    /// cold-start flicker.
    pub fn with_initial_in_view(threshold: f32) -> Self {
        Self {
            threshold,
            in_view: true,
        }
    }

    /// Feed one intersection sample; returns the new level only when it
    /// crossed the threshold.
    pub fn observe(&mut self, ratio: f32) -> Option<bool> {
        let level = ratio >= self.threshold;
        if level == self.in_view {
            return None;
        }
        self.in_view = level;
        Some(level)
    }

    /// Current level
    pub fn in_view(&self) -> bool {
        self.in_view
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_crossing_emits_once() {
        let mut tracker = VisibilityTracker::new(0.7);
        assert!(!tracker.in_view());

        // Below threshold from a false baseline: silent
        assert_eq!(tracker.observe(0.3), None);
        assert_eq!(tracker.observe(0.69), None);

        // Crossing emits exactly once
        assert_eq!(tracker.observe(0.7), Some(true));
        assert_eq!(tracker.observe(0.9), None);
        assert_eq!(tracker.observe(1.0), None);

        // Dropping back emits the false level once
        assert_eq!(tracker.observe(0.5), Some(false));
        assert_eq!(tracker.observe(0.1), None);
    }

    #[test]
    fn test_initial_in_view() {
        let mut tracker = VisibilityTracker::with_initial_in_view(0.7);
        assert!(tracker.in_view());

        // Confirming measurement is a no-op
        assert_eq!(tracker.observe(0.8), None);

        // Leaving view still emits
        assert_eq!(tracker.observe(0.2), Some(false));
    }

    #[test]
    fn test_exact_threshold_counts_as_in_view() {
        let mut tracker = VisibilityTracker::new(0.5);
        assert_eq!(tracker.observe(0.5), Some(true));
    }
}
