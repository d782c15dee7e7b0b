//! Offline response cache.
//!
//! An ordered table of resource-class rules decides, per resource key, how
//! a fetch interacts with the cache. Remote reads are network-first with a
//! short timeout and a fresh-enough fallback; the application shell is
//! cache-first with a background refresh. Each class owns its own bounded
//! cache so eviction pressure in one class cannot starve another. The cache
//! lives for the process; rules are fixed configuration, not user-editable.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thresholdvault_core::ClientError;

/// Clock seam so freshness and eviction are testable.
pub trait TimeSource: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now(&self) -> u64;
}

/// Wall-clock time source.
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Performs the live fetch for a resource key.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the resource's response bytes.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, ClientError>;
}

/// How a resource class interacts with its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Try the live call under a bounded timeout; on failure fall back to a
    /// cached entry within its max-age, else fail.
    NetworkFirst,
    /// Serve the cached entry immediately regardless of freshness and
    /// refresh it in the background; fetch live only on a cache miss.
    CacheFirstThenRefresh,
}

/// Substring matcher over resource keys.
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    needles: Vec<String>,
}

impl RuleMatcher {
    /// Match keys containing any of the given substrings.
    #[must_use]
    pub fn containing(needles: &[&str]) -> Self {
        Self {
            needles: needles.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn matches(&self, key: &str) -> bool {
        self.needles.iter().any(|n| key.contains(n.as_str()))
    }
}

/// One resource-class rule.
#[derive(Debug, Clone)]
pub struct CacheRule {
    /// Cache name, used in log events.
    pub name: &'static str,
    /// Which resource keys this class covers.
    pub matcher: RuleMatcher,
    /// Strategy for the class.
    pub strategy: CacheStrategy,
    /// Oldest age at which a cached entry may still be served as fallback.
    pub max_age: Duration,
    /// Entry bound; the oldest entries are evicted first.
    pub max_entries: usize,
    /// Live-call bound for [`CacheStrategy::NetworkFirst`].
    pub network_timeout: Duration,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    bytes: Vec<u8>,
    inserted_at: u64,
}

struct RuleClass {
    rule: CacheRule,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl RuleClass {
    fn lookup(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().get(key).cloned()
    }

    fn store(&self, key: &str, bytes: Vec<u8>, now: u64) {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) && entries.len() >= self.rule.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(cache = self.rule.name, key = %oldest, "evicting oldest entry");
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                bytes,
                inserted_at: now,
            },
        );
    }
}

/// The default rule table, mirroring the deployed runtime-caching config.
#[must_use]
pub fn default_rules() -> Vec<CacheRule> {
    vec![
        CacheRule {
            name: "thresholdvault-canister-cache",
            matcher: RuleMatcher::containing(&[".ic0.app/", ".icp0.io/"]),
            strategy: CacheStrategy::NetworkFirst,
            max_age: Duration::from_secs(30 * 60),
            max_entries: 50,
            network_timeout: Duration::from_secs(5),
        },
        CacheRule {
            name: "thresholdvault-read-model",
            matcher: RuleMatcher::containing(&[
                "/api/vaults",
                "/api/guardians",
                "/api/heartbeat",
                "/api/transactions",
            ]),
            strategy: CacheStrategy::NetworkFirst,
            max_age: Duration::from_secs(60 * 60),
            max_entries: 60,
            network_timeout: Duration::from_secs(3),
        },
        CacheRule {
            name: "thresholdvault-shell",
            matcher: RuleMatcher::containing(&[".html", ".js", ".css"]),
            strategy: CacheStrategy::CacheFirstThenRefresh,
            max_age: Duration::from_secs(24 * 60 * 60),
            max_entries: 40,
            network_timeout: Duration::from_secs(5),
        },
    ]
}

/// Response cache with per-class freshness rules.
pub struct OfflineCache {
    classes: Vec<Arc<RuleClass>>,
    fetcher: Arc<dyn ResourceFetcher>,
    time: Arc<dyn TimeSource>,
    offline_signal: Mutex<Option<Arc<dyn Fn(bool) + Send + Sync>>>,
}

impl OfflineCache {
    /// Create a cache over a rule table, live fetcher and clock.
    pub fn new(
        rules: Vec<CacheRule>,
        fetcher: Arc<dyn ResourceFetcher>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            classes: rules
                .into_iter()
                .map(|rule| {
                    Arc::new(RuleClass {
                        rule,
                        entries: Mutex::new(HashMap::new()),
                    })
                })
                .collect(),
            fetcher,
            time,
            offline_signal: Mutex::new(None),
        }
    }

    /// Install the connectivity callback.
    ///
    /// Invoked with `true` whenever a network-first call falls back to a
    /// cached entry, and with `false` on any successful live fetch.
    pub fn set_offline_signal(&self, signal: Arc<dyn Fn(bool) + Send + Sync>) {
        *self.offline_signal.lock() = Some(signal);
    }

    fn signal_offline(&self, offline: bool) {
        if let Some(signal) = self.offline_signal.lock().clone() {
            signal(offline);
        }
    }

    /// Fetch a resource through its class rule. Keys matched by no rule are
    /// fetched live and never cached.
    pub async fn fetch(&self, key: &str) -> Result<Vec<u8>, ClientError> {
        let Some(class) = self
            .classes
            .iter()
            .find(|c| c.rule.matcher.matches(key))
        else {
            let bytes = self.fetcher.fetch(key).await?;
            self.signal_offline(false);
            return Ok(bytes);
        };
        match class.rule.strategy {
            CacheStrategy::NetworkFirst => self.network_first(class, key).await,
            CacheStrategy::CacheFirstThenRefresh => self.cache_first(class, key).await,
        }
    }

    async fn network_first(&self, class: &Arc<RuleClass>, key: &str) -> Result<Vec<u8>, ClientError> {
        let live = tokio::time::timeout(class.rule.network_timeout, self.fetcher.fetch(key)).await;
        let failure = match live {
            Ok(Ok(bytes)) => {
                class.store(key, bytes.clone(), self.time.now());
                self.signal_offline(false);
                return Ok(bytes);
            }
            Ok(Err(e)) => e,
            Err(_) => ClientError::remote(format!(
                "fetch of {key} timed out after {}ms",
                class.rule.network_timeout.as_millis()
            )),
        };
        let now = self.time.now();
        match class.lookup(key) {
            Some(entry) if now.saturating_sub(entry.inserted_at) <= class.rule.max_age.as_secs() => {
                tracing::warn!(
                    cache = class.rule.name,
                    key,
                    error = %failure,
                    "live fetch failed; serving cached response"
                );
                self.signal_offline(true);
                Ok(entry.bytes)
            }
            // A stale entry past its max-age is as good as absent.
            _ => Err(failure),
        }
    }

    async fn cache_first(&self, class: &Arc<RuleClass>, key: &str) -> Result<Vec<u8>, ClientError> {
        if let Some(entry) = class.lookup(key) {
            self.spawn_refresh(class, key);
            return Ok(entry.bytes);
        }
        let bytes = self.fetcher.fetch(key).await?;
        class.store(key, bytes.clone(), self.time.now());
        self.signal_offline(false);
        Ok(bytes)
    }

    fn spawn_refresh(&self, class: &Arc<RuleClass>, key: &str) {
        let class = Arc::clone(class);
        let fetcher = Arc::clone(&self.fetcher);
        let time = Arc::clone(&self.time);
        let signal = self.offline_signal.lock().clone();
        let key = key.to_string();
        tokio::spawn(async move {
            match fetcher.fetch(&key).await {
                Ok(bytes) => {
                    class.store(&key, bytes, time.now());
                    if let Some(signal) = signal {
                        signal(false);
                    }
                }
                Err(e) => {
                    tracing::debug!(cache = class.rule.name, key = %key, error = %e, "background refresh failed");
                }
            }
        });
    }

    /// Entry count for the named cache class; absent classes count zero.
    #[must_use]
    pub fn entry_count(&self, name: &str) -> usize {
        self.classes
            .iter()
            .find(|c| c.rule.name == name)
            .map_or(0, |c| c.entries.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeTime(Mutex<u64>);

    impl FakeTime {
        fn new(start: u64) -> Self {
            Self(Mutex::new(start))
        }

        fn advance(&self, seconds: u64) {
            *self.0.lock() += seconds;
        }
    }

    impl TimeSource for FakeTime {
        fn now(&self) -> u64 {
            *self.0.lock()
        }
    }

    /// Serves scripted responses per call, in order; repeats the last.
    struct ScriptedFetcher {
        calls: AtomicUsize,
        responses: Mutex<Vec<Result<Vec<u8>, ClientError>>>,
        stall: Option<Duration>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<Vec<u8>, ClientError>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses),
                stall: None,
            }
        }

        fn stalled(stall: Duration) -> Self {
            Self {
                stall: Some(stall),
                ..Self::new(vec![Ok(b"late".to_vec())])
            }
        }
    }

    #[async_trait]
    impl ResourceFetcher for ScriptedFetcher {
        async fn fetch(&self, _key: &str) -> Result<Vec<u8>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            let mut responses = self.responses.lock();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses
                    .first()
                    .cloned()
                    .unwrap_or_else(|| Err(ClientError::remote("script exhausted")))
            }
        }
    }

    fn read_rule(max_age: Duration) -> CacheRule {
        CacheRule {
            name: "thresholdvault-read-model",
            matcher: RuleMatcher::containing(&["/api/vaults"]),
            strategy: CacheStrategy::NetworkFirst,
            max_age,
            max_entries: 3,
            network_timeout: Duration::from_millis(50),
        }
    }

    fn shell_rule() -> CacheRule {
        CacheRule {
            name: "thresholdvault-shell",
            matcher: RuleMatcher::containing(&[".js"]),
            strategy: CacheStrategy::CacheFirstThenRefresh,
            max_age: Duration::from_secs(86_400),
            max_entries: 3,
            network_timeout: Duration::from_millis(50),
        }
    }

    fn cache(
        rules: Vec<CacheRule>,
        fetcher: Arc<ScriptedFetcher>,
        time: Arc<FakeTime>,
    ) -> Arc<OfflineCache> {
        Arc::new(OfflineCache::new(rules, fetcher, time))
    }

    #[tokio::test]
    async fn network_first_serves_live_and_falls_back_when_fresh() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(b"live".to_vec()),
            Err(ClientError::remote("network unreachable")),
        ]));
        let time = Arc::new(FakeTime::new(1_000));
        let cache = cache(vec![read_rule(Duration::from_secs(3_600))], fetcher, time.clone());

        let offline = Arc::new(AtomicBool::new(false));
        let flag = offline.clone();
        cache.set_offline_signal(Arc::new(move |o| flag.store(o, Ordering::SeqCst)));

        assert_eq!(cache.fetch("/api/vaults").await.unwrap(), b"live".to_vec());
        assert!(!offline.load(Ordering::SeqCst));

        time.advance(600);
        assert_eq!(cache.fetch("/api/vaults").await.unwrap(), b"live".to_vec());
        assert!(offline.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stale_entry_past_max_age_fails_instead_of_serving() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(b"live".to_vec()),
            Err(ClientError::remote("network unreachable")),
        ]));
        let time = Arc::new(FakeTime::new(1_000));
        let cache = cache(vec![read_rule(Duration::from_secs(300))], fetcher, time.clone());

        cache.fetch("/api/vaults").await.unwrap();

        // At exactly the freshness bound the entry still serves.
        time.advance(300);
        assert_eq!(cache.fetch("/api/vaults").await.unwrap(), b"live".to_vec());

        // One second past the bound it does not.
        time.advance(1);
        let err = cache.fetch("/api/vaults").await.unwrap_err();
        assert_eq!(err, ClientError::remote("network unreachable"));
    }

    #[tokio::test]
    async fn network_first_timeout_without_cache_fails() {
        let fetcher = Arc::new(ScriptedFetcher::stalled(Duration::from_secs(60)));
        let time = Arc::new(FakeTime::new(1_000));
        let cache = cache(vec![read_rule(Duration::from_secs(300))], fetcher, time);

        let err = cache.fetch("/api/vaults").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn cache_first_serves_stale_and_refreshes_in_background() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(b"v1".to_vec()),
            Ok(b"v2".to_vec()),
        ]));
        let time = Arc::new(FakeTime::new(1_000));
        let cache = cache(vec![shell_rule()], fetcher.clone(), time);

        assert_eq!(cache.fetch("/app.js").await.unwrap(), b"v1".to_vec());
        // Second read serves the cached copy immediately.
        assert_eq!(cache.fetch("/app.js").await.unwrap(), b"v1".to_vec());

        // Give the spawned refresh a chance to land.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.fetch("/app.js").await.unwrap(), b"v2".to_vec());
    }

    #[tokio::test]
    async fn eviction_removes_the_oldest_entry_first() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(b"ok".to_vec())]));
        let time = Arc::new(FakeTime::new(1_000));
        let mut rule = read_rule(Duration::from_secs(3_600));
        rule.max_entries = 2;
        rule.matcher = RuleMatcher::containing(&["/api/vaults"]);
        let cache = cache(vec![rule], fetcher, time.clone());

        cache.fetch("/api/vaults/1").await.unwrap();
        time.advance(1);
        cache.fetch("/api/vaults/2").await.unwrap();
        time.advance(1);
        cache.fetch("/api/vaults/3").await.unwrap();
        assert_eq!(cache.entry_count("thresholdvault-read-model"), 2);

        let class = &cache.classes[0];
        assert!(class.lookup("/api/vaults/1").is_none());
        assert!(class.lookup("/api/vaults/2").is_some());
    }

    #[tokio::test]
    async fn unmatched_keys_bypass_the_cache() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(b"raw".to_vec())]));
        let time = Arc::new(FakeTime::new(1_000));
        let cache = cache(vec![read_rule(Duration::from_secs(300))], fetcher, time);

        assert_eq!(cache.fetch("/metrics").await.unwrap(), b"raw".to_vec());
        assert_eq!(cache.entry_count("thresholdvault-read-model"), 0);
    }

    #[test]
    fn default_rules_cover_the_three_classes_in_order() {
        let rules = default_rules();
        assert_eq!(rules.len(), 3);
        assert!(rules[0].matcher.matches("https://gw.ic0.app/api/v2/query"));
        assert!(rules[1].matcher.matches("/api/vaults?owner=x"));
        assert!(rules[2].matcher.matches("/static/app.js"));
        assert_eq!(rules[2].strategy, CacheStrategy::CacheFirstThenRefresh);
    }
}
