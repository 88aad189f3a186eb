//! Single-flight behavior under concurrent access.

use rolodex_cache::{CacheConfig, CacheError, ResultCache, TtlClass};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("upstream unavailable")]
struct UpstreamError;

#[tokio::test(start_paused = true)]
async fn concurrent_identical_keys_compute_once() {
    let cache = Arc::new(ResultCache::new(CacheConfig::default()));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute(TtlClass::DirectorySearch, "ahmed", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, UpstreamError>(vec!["ahmed@co.com".to_string()])
                })
                .await
        }));
    }

    for handle in handles {
        let cached = handle.await.unwrap().unwrap();
        assert_eq!(cached.value, vec!["ahmed@co.com".to_string()]);
        // Leader and waiters all computed/shared; nobody saw a stored entry.
        assert!(!cached.hit);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn distinct_keys_never_serialized() {
    let cache = Arc::new(ResultCache::new(CacheConfig::default()));
    let barrier = Arc::new(tokio::sync::Barrier::new(2));

    let mut handles = Vec::new();
    for key in ["alpha", "beta"] {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute(TtlClass::Contacts, key, || async move {
                    // Both computes must be in flight at once for the barrier
                    // to release; a per-key flight that serialized unrelated
                    // keys would trip the timeout below.
                    barrier.wait().await;
                    Ok::<_, UpstreamError>(key.to_string())
                })
                .await
        }));
    }

    let joined = tokio::time::timeout(Duration::from_secs(5), async {
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    })
    .await;
    assert!(joined.is_ok(), "distinct keys contended with each other");
}

#[tokio::test(start_paused = true)]
async fn leader_failure_reaches_every_waiter() {
    let cache = Arc::new(ResultCache::new(CacheConfig::default()));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..3 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute::<u32, _, _, _>(TtlClass::Contacts, "down", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err(UpstreamError)
                })
                .await
        }));
    }

    let mut compute_errors = 0;
    let mut shared_errors = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Err(CacheError::Compute(_)) => compute_errors += 1,
            Err(CacheError::Shared(message)) => {
                assert!(message.contains("upstream unavailable"));
                shared_errors += 1;
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(compute_errors, 1);
    assert_eq!(shared_errors, 2);
    // No poisoned entry left behind.
    assert_eq!(cache.stats().entries, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_leader_releases_waiters() {
    let cache = Arc::new(ResultCache::new(CacheConfig::default()));

    let leader = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_compute::<u32, _, _, _>(TtlClass::Contacts, "stuck", || async {
                    std::future::pending::<Result<u32, UpstreamError>>().await
                })
                .await
        })
    };
    // Let the leader claim the flight before the waiter joins.
    tokio::task::yield_now().await;

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_compute::<u32, _, _, _>(TtlClass::Contacts, "stuck", || async {
                    Ok::<_, UpstreamError>(1)
                })
                .await
        })
    };
    tokio::task::yield_now().await;

    leader.abort();
    let outcome = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("waiter hung after leader cancellation")
        .unwrap();
    assert!(matches!(outcome, Err(CacheError::LeaderVanished)));
}
