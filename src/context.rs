//! Finder Context Cache
//!
//! Holds the latest observed "is the target app frontmost, and what is
//! selected in it" pair. Snapshots are immutable and replaced wholesale by
//! each successful probe; a failed probe never touches the cache.
//!
//! ## Ordering
//!
//! `observed_at` never goes backwards. A probe result stamped earlier than the
//! current snapshot (a slow probe overtaken by a faster one) is discarded as
//! stale instead of overwriting newer state.
//!
//! ## Change detection
//!
//! `apply` compares the incoming `(finder_active, selection)` value against the
//! snapshot captured *before* replacement and reports whether it changed.
//! Consumers re-evaluate only on `ApplyOutcome::Changed`.

use std::fmt;
use std::time::Instant;

/// Substrings of a Finder "kind" string that mark an archive. The AppleScript
/// `contains` test they feed ignores case.
///
/// Best-effort and locale dependent; an unmatched archive is simply treated
/// as a plain file.
pub const ARCHIVE_KIND_MARKERS: &[&str] = &["Archive", "ZIP", "RAR", "tar", "gz"];

/// What is selected in the target app (first item of the selection only)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionDescriptor {
    #[default]
    None,
    File(String),
    Folder(String),
    Archive(String),
}

impl SelectionDescriptor {
    /// Folders and archives get the custom preview; plain files keep Quick Look
    pub fn is_previewable(&self) -> bool {
        matches!(self, Self::Folder(_) | Self::Archive(_))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::File(name) | Self::Folder(name) | Self::Archive(name) => Some(name),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::File(_) => "file",
            Self::Folder(_) => "folder",
            Self::Archive(_) => "archive",
        }
    }
}

impl fmt::Display for SelectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}:{}", self.kind_str(), name),
            None => f.write_str("none"),
        }
    }
}

/// One successful probe reply, before it is stamped into a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextObservation {
    pub finder_active: bool,
    pub selection: SelectionDescriptor,
}

impl ContextObservation {
    pub fn new(finder_active: bool, selection: SelectionDescriptor) -> Self {
        Self {
            finder_active,
            selection,
        }
    }
}

/// Immutable, timestamped context record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub finder_active: bool,
    pub selection: SelectionDescriptor,
    pub observed_at: Instant,
}

impl ContextSnapshot {
    /// Value equality on `(finder_active, selection)`, ignoring the timestamp
    pub fn same_context(&self, observation: &ContextObservation) -> bool {
        self.finder_active == observation.finder_active && self.selection == observation.selection
    }
}

/// Result of offering a probe observation to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Value differs from the previous snapshot
    Changed { previous: ContextSnapshot },
    /// Snapshot replaced (fresher timestamp) but value is identical
    Unchanged,
    /// Observation predates the current snapshot and was dropped
    Stale,
}

/// Latest-snapshot holder. Owned by the coordinator; never shared across threads.
#[derive(Debug, Clone)]
pub struct ContextCache {
    current: ContextSnapshot,
}

impl ContextCache {
    /// Start from "target not frontmost, nothing selected"
    pub fn new(started_at: Instant) -> Self {
        Self {
            current: ContextSnapshot {
                finder_active: false,
                selection: SelectionDescriptor::None,
                observed_at: started_at,
            },
        }
    }

    pub fn current(&self) -> &ContextSnapshot {
        &self.current
    }

    pub fn finder_active(&self) -> bool {
        self.current.finder_active
    }

    pub fn selection(&self) -> &SelectionDescriptor {
        &self.current.selection
    }

    /// Replace the snapshot with `observation` stamped at `observed_at`.
    pub fn apply(&mut self, observation: ContextObservation, observed_at: Instant) -> ApplyOutcome {
        if observed_at < self.current.observed_at {
            return ApplyOutcome::Stale;
        }

        let changed = !self.current.same_context(&observation);
        let next = ContextSnapshot {
            finder_active: observation.finder_active,
            selection: observation.selection,
            observed_at,
        };
        let previous = std::mem::replace(&mut self.current, next);

        if changed {
            ApplyOutcome::Changed { previous }
        } else {
            ApplyOutcome::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn folder(name: &str) -> SelectionDescriptor {
        SelectionDescriptor::Folder(name.to_string())
    }

    #[test]
    fn test_previewable_kinds() {
        assert!(folder("X").is_previewable());
        assert!(SelectionDescriptor::Archive("a.zip".to_string()).is_previewable());
        assert!(!SelectionDescriptor::File("a.txt".to_string()).is_previewable());
        assert!(!SelectionDescriptor::None.is_previewable());
    }

    #[test]
    fn test_display() {
        assert_eq!(folder("Docs").to_string(), "folder:Docs");
        assert_eq!(SelectionDescriptor::None.to_string(), "none");
    }

    #[test]
    fn test_initial_state_matches_inactive_probe() {
        let t0 = Instant::now();
        let mut cache = ContextCache::new(t0);
        let outcome = cache.apply(ContextObservation::default(), t0 + Duration::from_millis(150));
        assert_eq!(outcome, ApplyOutcome::Unchanged);
        assert!(!cache.finder_active());
    }

    #[test]
    fn test_change_reports_previous_snapshot() {
        let t0 = Instant::now();
        let mut cache = ContextCache::new(t0);
        let t1 = t0 + Duration::from_millis(150);

        let outcome = cache.apply(ContextObservation::new(true, folder("X")), t1);
        match outcome {
            ApplyOutcome::Changed { previous } => {
                assert!(!previous.finder_active);
                assert_eq!(previous.selection, SelectionDescriptor::None);
                assert_eq!(previous.observed_at, t0);
            }
            other => panic!("expected change, got {:?}", other),
        }
        assert_eq!(cache.selection(), &folder("X"));
        assert_eq!(cache.current().observed_at, t1);
    }

    #[test]
    fn test_same_value_refreshes_timestamp_only() {
        let t0 = Instant::now();
        let mut cache = ContextCache::new(t0);
        let t1 = t0 + Duration::from_millis(150);
        let t2 = t1 + Duration::from_millis(150);

        cache.apply(ContextObservation::new(true, folder("X")), t1);
        let outcome = cache.apply(ContextObservation::new(true, folder("X")), t2);
        assert_eq!(outcome, ApplyOutcome::Unchanged);
        assert_eq!(cache.current().observed_at, t2);
    }

    #[test]
    fn test_stale_observation_is_dropped() {
        let t0 = Instant::now();
        let mut cache = ContextCache::new(t0);
        let t2 = t0 + Duration::from_millis(300);
        let t1 = t0 + Duration::from_millis(150);

        cache.apply(ContextObservation::new(true, folder("New")), t2);
        let outcome = cache.apply(ContextObservation::new(true, folder("Old")), t1);

        assert_eq!(outcome, ApplyOutcome::Stale);
        assert_eq!(cache.selection(), &folder("New"));
        assert_eq!(cache.current().observed_at, t2);
    }

    #[test]
    fn test_observed_at_is_monotonic() {
        let t0 = Instant::now();
        let mut cache = ContextCache::new(t0);
        let stamps = [40u64, 10, 80, 80, 20, 200];
        let mut last = cache.current().observed_at;
        for (i, ms) in stamps.iter().enumerate() {
            let sel = if i % 2 == 0 {
                folder("A")
            } else {
                SelectionDescriptor::File("b".to_string())
            };
            cache.apply(
                ContextObservation::new(true, sel),
                t0 + Duration::from_millis(*ms),
            );
            assert!(cache.current().observed_at >= last);
            last = cache.current().observed_at;
        }
    }
}
