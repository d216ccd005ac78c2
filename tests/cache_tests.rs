use civic_portal::{
    CacheCoordinator, EpochClock, FetchError, HttpError, MockTransport, Tag, TransportState,
    api::tags,
};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

// --- Helper Functions ---

fn issues_tag() -> Vec<Tag> {
    vec![Tag::from(tags::ISSUES)]
}

fn coordinator(transport: &Arc<MockTransport>) -> (CacheCoordinator, Arc<EpochClock>) {
    let clock = Arc::new(EpochClock::new());
    let cache = CacheCoordinator::new(transport.clone() as TransportState, clock.clone());
    (cache, clock)
}

/// Drives a future one step, so a test can hold one caller suspended while
/// the world changes around it.
fn poll_once<F: Future>(future: Pin<&mut F>) -> Poll<F::Output> {
    let mut cx = Context::from_waker(Waker::noop());
    future.poll(&mut cx)
}

// --- Tests ---

#[cfg(test)]
mod read_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_read_fetches_and_caches() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([{ "title": "Pothole" }]));
        let (cache, _clock) = coordinator(&transport);

        let result = cache.read("issues", &Value::Null, &issues_tag()).await;

        assert_eq!(result.unwrap(), json!([{ "title": "Pothole" }]));
        assert_eq!(transport.fetch_count(), 1);
        assert_eq!(cache.freshness("issues", &Value::Null), Some(true));
    }

    #[tokio::test]
    async fn test_second_identical_read_is_served_from_cache() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([1, 2, 3]));
        let (cache, _clock) = coordinator(&transport);

        let first = cache
            .read("issues", &Value::Null, &issues_tag())
            .await
            .unwrap();
        let second = cache
            .read("issues", &Value::Null, &issues_tag())
            .await
            .unwrap();

        assert_eq!(first, second);
        // The second read never touched the network.
        assert_eq!(transport.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_params_are_canonical_regardless_of_field_order() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([]));
        let (cache, _clock) = coordinator(&transport);

        let a = json!({ "category": "roads", "page": 1 });
        let b = json!({ "page": 1, "category": "roads" });

        cache.read("issues", &a, &issues_tag()).await.unwrap();
        cache.read("issues", &b, &issues_tag()).await.unwrap();

        // Same effective parameters, same entry.
        assert_eq!(transport.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_distinct_params_are_distinct_entries() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([]));
        let (cache, _clock) = coordinator(&transport);

        cache
            .read("issues", &json!({ "page": 1 }), &issues_tag())
            .await
            .unwrap();
        cache
            .read("issues", &json!({ "page": 2 }), &issues_tag())
            .await
            .unwrap();

        assert_eq!(transport.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_identical_reads_share_one_fetch() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([{ "id": 7 }]));
        let gate = transport.hold();
        let (cache, _clock) = coordinator(&transport);

        let params = Value::Null;
        let tags = issues_tag();
        let read_a = cache.read("issues", &params, &tags);
        let read_b = cache.read("issues", &params, &tags);

        let controller = async {
            // Wait until the shared fetch is parked on the gate, then let it
            // resolve.
            while transport.fetch_count() == 0 {
                tokio::task::yield_now().await;
            }
            gate.release(1);
        };

        let (a, b, _) = tokio::join!(read_a, read_b, controller);

        assert_eq!(a.unwrap(), json!([{ "id": 7 }]));
        assert_eq!(b.unwrap(), json!([{ "id": 7 }]));
        assert_eq!(transport.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_coalesced_callers_share_the_same_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_fetches(HttpError::Timeout {
            endpoint: "issues".to_string(),
        });
        let gate = transport.hold();
        let (cache, _clock) = coordinator(&transport);

        let params = Value::Null;
        let tags = issues_tag();
        let read_a = cache.read("issues", &params, &tags);
        let read_b = cache.read("issues", &params, &tags);

        let controller = async {
            while transport.fetch_count() == 0 {
                tokio::task::yield_now().await;
            }
            gate.release(1);
        };

        let (a, b, _) = tokio::join!(read_a, read_b, controller);

        assert_eq!(
            a,
            Err(FetchError::Http(HttpError::Timeout {
                endpoint: "issues".to_string()
            }))
        );
        assert_eq!(a, b);
        assert_eq!(transport.fetch_count(), 1);

        // The failed flight is retired; the next read retries the network.
        transport.recover();
        transport.on_fetch("issues", json!([]));
        gate.release(1);

        let retried = cache.read("issues", &Value::Null, &issues_tag()).await;
        assert_eq!(retried.unwrap(), json!([]));
        assert_eq!(transport.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_value_peekable() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([{ "id": 1 }]));
        let (cache, _clock) = coordinator(&transport);

        cache
            .read("issues", &Value::Null, &issues_tag())
            .await
            .unwrap();
        cache.invalidate(&issues_tag());

        transport.fail_fetches(HttpError::Connect {
            endpoint: "issues".to_string(),
            message: "connection refused".to_string(),
        });

        let refresh = cache.read("issues", &Value::Null, &issues_tag()).await;
        assert!(refresh.is_err());

        // The stale value is still there for optimistic display.
        assert_eq!(cache.peek("issues", &Value::Null), Some(json!([{ "id": 1 }])));
        assert_eq!(cache.freshness("issues", &Value::Null), Some(false));

        // Recovery read refetches and goes fresh again.
        transport.recover();
        transport.on_fetch("issues", json!([{ "id": 1 }, { "id": 2 }]));

        let recovered = cache.read("issues", &Value::Null, &issues_tag()).await;
        assert_eq!(recovered.unwrap(), json!([{ "id": 1 }, { "id": 2 }]));
        assert_eq!(cache.freshness("issues", &Value::Null), Some(true));
    }
}

#[cfg(test)]
mod invalidation_tests {
    use super::*;
    use civic_portal::WriteMethod;

    #[tokio::test]
    async fn test_write_marks_every_intersecting_entry_stale() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([]));
        let (cache, _clock) = coordinator(&transport);

        // Two differently filtered lists, both providing "Issues".
        let page1 = json!({ "page": 1 });
        let page2 = json!({ "page": 2 });
        cache.read("issues", &page1, &issues_tag()).await.unwrap();
        cache.read("issues", &page2, &issues_tag()).await.unwrap();
        assert_eq!(transport.fetch_count(), 2);

        let written = cache
            .write(
                WriteMethod::Post,
                "issues",
                &json!({ "title": "New" }),
                &issues_tag(),
            )
            .await;
        assert!(written.is_ok());

        // Both entries went stale, values retained.
        assert_eq!(cache.freshness("issues", &page1), Some(false));
        assert_eq!(cache.freshness("issues", &page2), Some(false));
        assert_eq!(cache.peek("issues", &page1), Some(json!([])));

        // The next read of either refetches.
        cache.read("issues", &page1, &issues_tag()).await.unwrap();
        assert_eq!(transport.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_write_leaves_unrelated_tags_fresh() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([]));
        transport.on_fetch("me", json!({ "email": "a@b.c" }));
        let (cache, _clock) = coordinator(&transport);

        cache
            .read("issues", &Value::Null, &issues_tag())
            .await
            .unwrap();
        cache
            .read("me", &Value::Null, &[Tag::from(tags::USER)])
            .await
            .unwrap();

        cache
            .write(WriteMethod::Post, "issues", &json!({}), &issues_tag())
            .await
            .unwrap();

        assert_eq!(cache.freshness("issues", &Value::Null), Some(false));
        assert_eq!(cache.freshness("me", &Value::Null), Some(true));
    }

    #[tokio::test]
    async fn test_failed_write_touches_nothing() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([]));
        let (cache, _clock) = coordinator(&transport);

        cache
            .read("issues", &Value::Null, &issues_tag())
            .await
            .unwrap();

        transport.fail_submits(HttpError::Status {
            endpoint: "issues".to_string(),
            status: 500,
            message: "boom".to_string(),
        });

        let written = cache
            .write(WriteMethod::Post, "issues", &json!({}), &issues_tag())
            .await;

        assert!(written.is_err());
        assert_eq!(cache.freshness("issues", &Value::Null), Some(true));
    }

    #[tokio::test]
    async fn test_late_coalesced_completion_keeps_a_write_invalidation() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([{ "id": 1 }]));
        let gate = transport.hold();
        let (cache, _clock) = coordinator(&transport);

        let params = Value::Null;
        let tags = issues_tag();
        let mut read_a = pin!(cache.read("issues", &params, &tags));
        let mut read_b = pin!(cache.read("issues", &params, &tags));

        // Park both callers on the same fetch, then let it resolve.
        assert!(poll_once(read_a.as_mut()).is_pending());
        assert!(poll_once(read_b.as_mut()).is_pending());
        assert_eq!(transport.fetch_count(), 1);
        gate.release(1);

        // The first caller completes and stores the entry fresh.
        let Poll::Ready(a) = poll_once(read_a.as_mut()) else {
            panic!("read_a should complete once the gate opens");
        };
        assert_eq!(a.unwrap(), json!([{ "id": 1 }]));
        assert_eq!(cache.freshness("issues", &Value::Null), Some(true));

        // A write lands before the second caller gets to complete.
        cache
            .write(
                WriteMethod::Post,
                "issues",
                &json!({ "title": "New" }),
                &issues_tag(),
            )
            .await
            .unwrap();
        assert_eq!(cache.freshness("issues", &Value::Null), Some(false));

        // The second caller still receives the shared value, but the entry
        // it coalesced onto stays stale.
        let Poll::Ready(b) = poll_once(read_b.as_mut()) else {
            panic!("read_b should complete from the settled cell");
        };
        assert_eq!(b.unwrap(), json!([{ "id": 1 }]));
        assert_eq!(cache.freshness("issues", &Value::Null), Some(false));

        // The next read sees the stale entry and goes back to the network.
        gate.release(1);
        cache
            .read("issues", &Value::Null, &issues_tag())
            .await
            .unwrap();
        assert_eq!(transport.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_manual_invalidate_reports_marked_count() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([]));
        let (cache, _clock) = coordinator(&transport);

        cache
            .read("issues", &json!({ "page": 1 }), &issues_tag())
            .await
            .unwrap();
        cache
            .read("issues", &json!({ "page": 2 }), &issues_tag())
            .await
            .unwrap();

        assert_eq!(cache.invalidate(&issues_tag()), 2);
        // Already stale entries do not count twice.
        assert_eq!(cache.invalidate(&issues_tag()), 0);
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_navigation_discards_in_flight_read() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([]));
        let gate = transport.hold();
        let (cache, clock) = coordinator(&transport);

        let params = Value::Null;
        let tags = issues_tag();
        let read = cache.read("issues", &params, &tags);

        let controller = async {
            while transport.fetch_count() == 0 {
                tokio::task::yield_now().await;
            }
            // The user navigates away while the fetch is in flight.
            clock.advance();
            gate.release(1);
        };

        let (result, _) = tokio::join!(read, controller);

        assert_eq!(result, Err(FetchError::Superseded));
        // The late result never touched the cache.
        assert_eq!(cache.peek("issues", &Value::Null), None);
    }

    #[tokio::test]
    async fn test_clear_empties_the_index() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!([1]));
        let (cache, _clock) = coordinator(&transport);

        cache
            .read("issues", &Value::Null, &issues_tag())
            .await
            .unwrap();
        assert!(cache.peek("issues", &Value::Null).is_some());

        cache.clear();

        assert_eq!(cache.peek("issues", &Value::Null), None);
        assert_eq!(cache.freshness("issues", &Value::Null), None);

        // Reads after the wipe go back to the network.
        cache
            .read("issues", &Value::Null, &issues_tag())
            .await
            .unwrap();
        assert_eq!(transport.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_clear_discards_results_from_older_flights() {
        let transport = Arc::new(MockTransport::new());
        transport.on_fetch("issues", json!(["pre-clear"]));
        let gate = transport.hold();
        let (cache, _clock) = coordinator(&transport);

        let params = Value::Null;
        let tags = issues_tag();
        let read = cache.read("issues", &params, &tags);

        let controller = async {
            while transport.fetch_count() == 0 {
                tokio::task::yield_now().await;
            }
            // Sign-out wipes the cache while the fetch is still in flight.
            cache.clear();
            gate.release(1);
        };

        let (result, _) = tokio::join!(read, controller);

        // The pre-clear flight must not repopulate the wiped index.
        assert_eq!(result, Err(FetchError::Superseded));
        assert_eq!(cache.peek("issues", &Value::Null), None);
    }
}
