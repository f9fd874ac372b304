use dashmap::DashMap;
use tracing::debug;

/// Maps an isolated (sandboxed) uid to the uid of its host app.
pub trait HostUidResolver {
    /// Returns the host uid of `uid`, or `uid` itself if it is not isolated.
    fn host_uid_or_self(&self, uid: i32) -> i32;
}

impl<F> HostUidResolver for F
where
    F: Fn(i32) -> i32,
{
    fn host_uid_or_self(&self, uid: i32) -> i32 {
        self(uid)
    }
}

/// Concurrent isolated uid -> host uid table.
///
/// Entries can be assigned and removed while other threads resolve uids.
#[derive(Debug, Default)]
pub struct IsolatedUidMap {
    isolated_to_host: DashMap<i32, i32>,
}

impl IsolatedUidMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `isolated_uid` runs on behalf of `host_uid`.
    pub fn assign_isolated_uid(&self, isolated_uid: i32, host_uid: i32) {
        self.isolated_to_host.insert(isolated_uid, host_uid);
    }

    /// Forgets a single isolated uid. Returns its host uid, if it was known.
    pub fn remove_isolated_uid(&self, isolated_uid: i32) -> Option<i32> {
        self.isolated_to_host
            .remove(&isolated_uid)
            .map(|(_, host)| host)
    }

    /// Forgets every isolated uid attached to `host_uid`, e.g. when the host
    /// app is uninstalled. Returns how many entries were dropped.
    pub fn remove_host_uid(&self, host_uid: i32) -> usize {
        let before = self.isolated_to_host.len();
        self.isolated_to_host.retain(|_, host| *host != host_uid);
        let removed = before - self.isolated_to_host.len();
        if removed > 0 {
            debug!(host_uid, removed, "dropped isolated uids of host");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.isolated_to_host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.isolated_to_host.is_empty()
    }
}

impl HostUidResolver for IsolatedUidMap {
    fn host_uid_or_self(&self, uid: i32) -> i32 {
        self.isolated_to_host
            .get(&uid)
            .map(|host| *host)
            .unwrap_or(uid)
    }
}

impl FromIterator<(i32, i32)> for IsolatedUidMap {
    fn from_iter<I: IntoIterator<Item = (i32, i32)>>(iter: I) -> Self {
        let map = Self::new();
        for (isolated, host) in iter {
            map.assign_isolated_uid(isolated, host);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_unknown_uid_resolves_to_self() {
        let map = IsolatedUidMap::new();
        assert!(map.is_empty());
        assert_eq!(map.host_uid_or_self(10_123), 10_123);
    }

    #[test]
    fn test_assign_and_remove_isolated_uid() {
        let map = IsolatedUidMap::new();
        map.assign_isolated_uid(99_001, 10_005);
        assert_eq!(map.host_uid_or_self(99_001), 10_005);
        assert_eq!(map.len(), 1);

        assert_eq!(map.remove_isolated_uid(99_001), Some(10_005));
        assert_eq!(map.remove_isolated_uid(99_001), None);
        assert_eq!(map.host_uid_or_self(99_001), 99_001);
    }

    #[test]
    fn test_remove_host_uid_drops_all_isolated() {
        let map: IsolatedUidMap = [(1, 100), (2, 100), (3, 200)].into_iter().collect();
        assert_eq!(map.remove_host_uid(100), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.host_uid_or_self(1), 1);
        assert_eq!(map.host_uid_or_self(3), 200);
        assert_eq!(map.remove_host_uid(100), 0);
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |uid: i32| if uid >= 99_000 { uid - 99_000 } else { uid };
        assert_eq!(resolver.host_uid_or_self(99_007), 7);
        assert_eq!(resolver.host_uid_or_self(7), 7);
    }

    #[test]
    fn test_concurrent_assign_and_resolve() {
        let map = Arc::new(IsolatedUidMap::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let map = Arc::clone(&map);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let isolated = 90_000 + t * 100 + i;
                        map.assign_isolated_uid(isolated, t);
                        assert_eq!(map.host_uid_or_self(isolated), t);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("worker panicked");
        }
        assert_eq!(map.len(), 400);
    }
}
