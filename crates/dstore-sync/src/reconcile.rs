use std::collections::HashMap;

use dstore_types::TypedValue;

/// First-contact merge of a local cache and a remote store.
///
/// The cache wins every conflict: remote-only keys are adopted by the
/// cache, and cache-only or diverged keys are pushed to the remote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Remote entries the cache does not have.
    pub adopt_into_cache: HashMap<String, TypedValue>,
    /// Cache entries the remote lacks or holds a different value for.
    pub push_to_remote: HashMap<String, TypedValue>,
}

impl ReconcilePlan {
    pub fn compute(
        cached: &HashMap<String, TypedValue>,
        synced: &HashMap<String, TypedValue>,
    ) -> Self {
        let adopt_into_cache = synced
            .iter()
            .filter(|(k, _)| !cached.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let push_to_remote = cached
            .iter()
            .filter(|(k, v)| synced.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            adopt_into_cache,
            push_to_remote,
        }
    }

    /// Both sides already agree.
    pub fn is_converged(&self) -> bool {
        self.adopt_into_cache.is_empty() && self.push_to_remote.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, i32)]) -> HashMap<String, TypedValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), TypedValue::Int(*v)))
            .collect()
    }

    #[test]
    fn cache_wins_conflicts() {
        let plan = ReconcilePlan::compute(&map(&[("a", 1), ("b", 2)]), &map(&[("b", 3), ("c", 4)]));
        assert_eq!(plan.adopt_into_cache, map(&[("c", 4)]));
        assert_eq!(plan.push_to_remote, map(&[("a", 1), ("b", 2)]));
    }

    #[test]
    fn identical_sides_converged() {
        let both = map(&[("a", 1), ("b", 2)]);
        assert!(ReconcilePlan::compute(&both, &both).is_converged());
        assert!(ReconcilePlan::compute(&HashMap::new(), &HashMap::new()).is_converged());
    }

    #[test]
    fn kind_change_counts_as_divergence() {
        let cached = HashMap::from([("k".to_string(), TypedValue::Float(1.0))]);
        let synced = HashMap::from([("k".to_string(), TypedValue::Int(1))]);
        let plan = ReconcilePlan::compute(&cached, &synced);
        assert!(plan.adopt_into_cache.is_empty());
        assert_eq!(plan.push_to_remote, cached);
    }

    #[test]
    fn empty_cache_adopts_everything() {
        let synced = map(&[("x", 1), ("y", 2)]);
        let plan = ReconcilePlan::compute(&HashMap::new(), &synced);
        assert_eq!(plan.adopt_into_cache, synced);
        assert!(plan.push_to_remote.is_empty());
    }
}
