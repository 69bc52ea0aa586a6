mod common;

use std::sync::Arc;

use tokio::sync::Semaphore;

use common::{channel_path, ids, service, MockBackend, BASE_PATH};
use kolibri_search_provider::{
    core::{ProviderError, ResultMeta},
    service::{MethodCall, MethodReply},
};

fn initial(terms: &[&str]) -> MethodCall {
    MethodCall::GetInitialResultSet { terms: ids(terms) }
}

fn item_ids(reply: Result<MethodReply, ProviderError>) -> Vec<String> {
    match reply {
        Ok(MethodReply::ItemIds(ids)) => ids,
        other => panic!("expected item ids, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_endpoints_share_one_search() {
    let backend =
        MockBackend::default().with_result("maths", ids(&["t/abc?c1", "t/c1?c1", "t/xyz?c2"]));
    let (service, backend, _) = service(backend);

    let c1_path = channel_path("c1");
    let c3_path = channel_path("c3");
    let (default, c1, c3) = tokio::join!(
        service.handle_call(BASE_PATH, initial(&["maths"])),
        service.handle_call(&c1_path, initial(&["maths"])),
        service.handle_call(&c3_path, initial(&["maths"])),
    );

    assert_eq!(item_ids(default), ids(&["t/xyz?c2"]));
    assert_eq!(item_ids(c1), ids(&["t/abc?c1"]));
    assert!(item_ids(c3).is_empty());
    assert_eq!(backend.search_calls(), 1);
}

#[tokio::test]
async fn test_terms_are_joined_into_one_query() {
    let backend = MockBackend::default();
    let (service, backend, _) = service(backend);

    let reply = service
        .handle_call(BASE_PATH, initial(&["long", "division"]))
        .await;
    assert!(item_ids(reply).is_empty());
    assert_eq!(backend.queries(), ids(&["long division"]));
}

#[tokio::test]
async fn test_lone_default_endpoint_passes_everything_through() {
    let raw = ids(&["t/abc?c1", "t/c1?c1", "garbage", "t/xyz?c2", "t/xyz?c2"]);
    let backend = MockBackend::default().with_result("maths", raw.clone());
    let (service, _, _) = service(backend);

    let reply = service.handle_call(BASE_PATH, initial(&["maths"])).await;
    assert_eq!(item_ids(reply), raw);
}

#[tokio::test]
async fn test_lone_channel_endpoint_drops_root_and_malformed_ids() {
    let backend = MockBackend::default().with_result(
        "maths",
        ids(&["t/c1?c1", "garbage", "t/abc?c1", "t/xyz?c2", "c/def?c1"]),
    );
    let (service, _, _) = service(backend);

    let reply = service
        .handle_call(&channel_path("c1"), initial(&["maths"]))
        .await;
    assert_eq!(item_ids(reply), ids(&["t/abc?c1", "c/def?c1"]));
}

#[tokio::test]
async fn test_subsearch_runs_a_fresh_search() {
    let backend = MockBackend::default().with_result("fractions", ids(&["t/abc?c1"]));
    let (service, backend, _) = service(backend);

    let reply = service
        .handle_call(
            &channel_path("c1"),
            MethodCall::GetSubsearchResultSet {
                previous_results: ids(&["t/zzz?c1"]),
                terms: ids(&["fractions"]),
            },
        )
        .await;
    assert_eq!(item_ids(reply), ids(&["t/abc?c1"]));
    assert_eq!(backend.search_calls(), 1);
}

#[tokio::test]
async fn test_backend_failure_reaches_every_endpoint() {
    let backend = MockBackend::default().with_failure("maths", "daemon not running");
    let (service, _, _) = service(backend);

    let c1_path = channel_path("c1");
    let (default, c1) = tokio::join!(
        service.handle_call(BASE_PATH, initial(&["maths"])),
        service.handle_call(&c1_path, initial(&["maths"])),
    );

    for reply in [default, c1] {
        match reply {
            Err(ProviderError::Backend(msg)) => assert_eq!(msg, "daemon not running"),
            other => panic!("expected backend error, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_newer_query_cancels_pending_search() {
    let gate = Arc::new(Semaphore::new(0));
    let backend = MockBackend::default()
        .with_gate(gate.clone())
        .with_result("fractions", ids(&["t/abc?c1"]));
    let (service, backend, _) = service(backend);

    let first = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.handle_call(BASE_PATH, initial(&["fract"])).await })
    };
    backend.wait_for_searches(1).await;

    let second = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.handle_call(BASE_PATH, initial(&["fractions"])).await })
    };

    assert!(matches!(
        first.await.expect("first search task"),
        Err(ProviderError::Cancelled)
    ));

    backend.wait_for_searches(2).await;
    gate.add_permits(2);
    assert_eq!(
        item_ids(second.await.expect("second search task")),
        ids(&["t/abc?c1"])
    );
    assert_eq!(backend.queries(), ids(&["fract", "fractions"]));
}

#[tokio::test]
async fn test_result_metas_bypass_the_multiplexer() {
    let meta = ResultMeta {
        id: "t/abc?c1".to_string(),
        name: Some("Fractions".to_string()),
        ..Default::default()
    };
    let backend = MockBackend::default().with_metas(vec![meta.clone()]);
    let (service, backend, _) = service(backend);

    let reply = service
        .handle_call(
            &channel_path("c1"),
            MethodCall::GetResultMetas {
                item_ids: ids(&["t/abc?c1", "t/missing?c1"]),
            },
        )
        .await
        .unwrap();

    assert_eq!(reply, MethodReply::Metas(vec![meta]));
    assert_eq!(backend.meta_calls(), 1);
    assert_eq!(backend.search_calls(), 0);
    assert!(!service.provider().multiplexer().is_pending());
}

#[tokio::test]
async fn test_activate_result_launches_channel_uri() {
    let (service, backend, launcher) = service(MockBackend::default());

    let reply = service
        .handle_call(
            &channel_path("c1"),
            MethodCall::ActivateResult {
                item_id: "t/abc?c1".to_string(),
                terms: ids(&["fractions"]),
                timestamp: 0,
            },
        )
        .await
        .unwrap();

    assert_eq!(reply, MethodReply::Empty);
    assert_eq!(
        launcher.uris(),
        ids(&["x-kolibri-dispatch://c1/t/abc?search=fractions"])
    );
    assert_eq!(backend.search_calls(), 0);
}

#[tokio::test]
async fn test_activate_result_from_another_channel_is_rejected() {
    let (service, _, launcher) = service(MockBackend::default());

    let reply = service
        .handle_call(
            &channel_path("c1"),
            MethodCall::ActivateResult {
                item_id: "t/abc?c2".to_string(),
                terms: Vec::new(),
                timestamp: 0,
            },
        )
        .await;

    assert!(matches!(reply, Err(ProviderError::WrongChannel { .. })));
    assert!(launcher.uris().is_empty());
}

#[tokio::test]
async fn test_launch_search_from_default_endpoint() {
    let (service, _, launcher) = service(MockBackend::default());

    service
        .handle_call(
            BASE_PATH,
            MethodCall::LaunchSearch {
                terms: ids(&["long", "division"]),
                timestamp: 42,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        launcher.uris(),
        ids(&["x-kolibri-dispatch://?search=long+division"])
    );
}

#[tokio::test]
async fn test_unknown_object_path_is_not_found() {
    let (service, backend, _) = service(MockBackend::default());

    for path in ["/org/example/Other", "/org/learningequality/Kolibri/SearchProvider/a/b"] {
        let reply = service.handle_call(path, initial(&["maths"])).await;
        assert!(matches!(reply, Err(ProviderError::NotFound(_))), "{path}");
    }
    assert_eq!(backend.search_calls(), 0);
}
