//! Incremental build planner: per-entry skip/rebuild decisions.
//!
//! The policy is a truth table over three independent conditions — cache
//! disabled, source hash changed, publisher status changed under a forced
//! update — expressed as a single exhaustive match so the policy stays
//! auditable.

use crate::registry::PublisherRegistry;

/// Why an entry is being rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    /// No existing latest record (or it was unreadable).
    New,
    /// Caller disabled the cache.
    CacheDisabled,
    /// The definition bytes changed.
    SourceChanged,
    /// Forced publisher update and the verified flag differs from the
    /// stored one.
    PublisherChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Rebuild(RebuildReason),
}

impl Decision {
    pub fn is_rebuild(&self) -> bool {
        matches!(self, Decision::Rebuild(_))
    }
}

/// Decides, per entry, whether the existing record can be reused.
pub struct BuildPlanner<'a> {
    registry: &'a PublisherRegistry,
    use_cache: bool,
    force_publisher_update: bool,
}

impl<'a> BuildPlanner<'a> {
    pub fn new(
        registry: &'a PublisherRegistry,
        use_cache: bool,
        force_publisher_update: bool,
    ) -> Self {
        Self {
            registry,
            use_cache,
            force_publisher_update,
        }
    }

    /// Decide skip/rebuild for one entry.
    ///
    /// `cached_hash` and `cached_verified` come from the store's latest
    /// record; None means absent-or-corrupt and always forces a rebuild.
    pub fn decide(
        &self,
        action_id: &str,
        new_hash: &str,
        cached_hash: Option<&str>,
        cached_verified: Option<bool>,
    ) -> Decision {
        let cached_hash = match cached_hash {
            Some(h) => h,
            None => return Decision::Rebuild(RebuildReason::New),
        };

        let hash_changed = cached_hash != new_hash;
        let publisher_changed = self.force_publisher_update
            && self.publisher_verification_changed(action_id, cached_verified);

        match (self.use_cache, hash_changed, publisher_changed) {
            (false, _, _) => Decision::Rebuild(RebuildReason::CacheDisabled),
            (true, true, _) => Decision::Rebuild(RebuildReason::SourceChanged),
            (true, false, true) => Decision::Rebuild(RebuildReason::PublisherChanged),
            (true, false, false) => Decision::Skip,
        }
    }

    /// Whether the registry's current verified flag for this entry's
    /// publisher differs from the value stored at last rebuild. Only
    /// marketplace ids carry a publisher; everything else never changes.
    pub fn publisher_verification_changed(
        &self,
        action_id: &str,
        cached_verified: Option<bool>,
    ) -> bool {
        let publisher = match marketplace_publisher(action_id) {
            Some(p) => p,
            None => return false,
        };
        let current = self.registry.lookup(publisher);
        Some(current) != cached_verified
    }
}

/// Extract the publisher segment from a `marketplace/<publisher>/<name>` id.
pub fn marketplace_publisher(action_id: &str) -> Option<&str> {
    let mut parts = action_id.split('/');
    match (parts.next(), parts.next()) {
        (Some("marketplace"), Some(publisher)) => Some(publisher),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "aaaa";
    const HASH_B: &str = "bbbb";

    fn registry() -> PublisherRegistry {
        PublisherRegistry::from_pairs(&[("actions", true), ("acme", false)])
    }

    #[test]
    fn no_existing_record_rebuilds() {
        let reg = registry();
        let planner = BuildPlanner::new(&reg, true, false);
        assert_eq!(
            planner.decide("internal/a", HASH_A, None, None),
            Decision::Rebuild(RebuildReason::New)
        );
    }

    #[test]
    fn cache_disabled_always_rebuilds() {
        let reg = registry();
        let planner = BuildPlanner::new(&reg, false, false);
        assert_eq!(
            planner.decide("internal/a", HASH_A, Some(HASH_A), Some(false)),
            Decision::Rebuild(RebuildReason::CacheDisabled)
        );
    }

    #[test]
    fn hash_changed_rebuilds_regardless_of_flags() {
        let reg = registry();
        let planner = BuildPlanner::new(&reg, true, true);
        assert_eq!(
            planner.decide(
                "marketplace/actions/checkout",
                HASH_B,
                Some(HASH_A),
                Some(true)
            ),
            Decision::Rebuild(RebuildReason::SourceChanged)
        );
    }

    #[test]
    fn unchanged_hash_skips_without_force() {
        let reg = registry();
        let planner = BuildPlanner::new(&reg, true, false);
        // Stored verified disagrees with registry, but force is off.
        assert_eq!(
            planner.decide(
                "marketplace/actions/checkout",
                HASH_A,
                Some(HASH_A),
                Some(false)
            ),
            Decision::Skip
        );
    }

    #[test]
    fn forced_publisher_change_rebuilds_only_on_difference() {
        let reg = registry();
        let planner = BuildPlanner::new(&reg, true, true);

        // Registry says verified, stored record says not: rebuild.
        assert_eq!(
            planner.decide(
                "marketplace/actions/checkout",
                HASH_A,
                Some(HASH_A),
                Some(false)
            ),
            Decision::Rebuild(RebuildReason::PublisherChanged)
        );

        // Registry agrees with stored record: skip.
        assert_eq!(
            planner.decide(
                "marketplace/actions/checkout",
                HASH_A,
                Some(HASH_A),
                Some(true)
            ),
            Decision::Skip
        );

        // Internal ids carry no publisher and never trip the force path.
        assert_eq!(
            planner.decide("internal/a", HASH_A, Some(HASH_A), Some(false)),
            Decision::Skip
        );
    }

    #[test]
    fn unknown_publisher_defaults_to_unverified() {
        let reg = registry();
        let planner = BuildPlanner::new(&reg, true, true);
        // Stored true, registry has no record (-> false): changed.
        assert_eq!(
            planner.decide(
                "marketplace/ghost/tool",
                HASH_A,
                Some(HASH_A),
                Some(true)
            ),
            Decision::Rebuild(RebuildReason::PublisherChanged)
        );
    }

    #[test]
    fn marketplace_publisher_extraction() {
        assert_eq!(
            marketplace_publisher("marketplace/actions/checkout"),
            Some("actions")
        );
        assert_eq!(
            marketplace_publisher("internal/platform/.github/actions/x"),
            None
        );
        assert_eq!(marketplace_publisher("marketplace"), None);
    }
}
