use std::time::Duration;

use feed_relay::{
    ClientConfig, ClientError, EventId, EventPoller, FeedApi, Subscription,
    client::spawn_poller,
};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn events(ids: &[u64]) -> Value {
    Value::Array(ids.iter().map(|id| json!({ "id": id.to_string(), "type": "PushEvent" })).collect())
}

async fn mount_page(server: &MockServer, route: &str, ids: &[u64], next: Option<&str>) {
    let mut response = ResponseTemplate::new(200)
        .set_body_json(events(ids))
        .insert_header("X-RateLimit-Limit", "5000")
        .insert_header("X-RateLimit-Remaining", "4321");
    if let Some(next) = next {
        response = response.insert_header(
            "Link",
            format!(r#"<{}{next}>; rel="next", <{}/events/page/99>; rel="last""#, server.uri(), server.uri()),
        );
    }

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn poller_for(server: &MockServer) -> EventPoller<FeedApi> {
    let config = ClientConfig::new(format!("{}/events", server.uri()), "test-token")
        .with_interval(Duration::from_millis(50));
    let api = FeedApi::new(config.clone()).unwrap();
    EventPoller::new(api, config.feed_url, config.polling)
}

fn drained_ids(subscription: &mut Subscription) -> Vec<EventId> {
    subscription.drain().into_iter().map(|e| e.id).collect()
}

fn ids(raw: &[u64]) -> Vec<EventId> {
    raw.iter().map(|&id| EventId::from(id)).collect()
}

#[tokio::test]
async fn walks_linked_pages_and_stops_at_overlap() {
    let server = MockServer::start().await;
    mount_page(&server, "/events", &[6, 5, 4], Some("/events/page/2")).await;
    mount_page(&server, "/events/page/2", &[3, 2, 1], None).await;

    let mut poller = poller_for(&server);
    let mut subscription = poller.subscribe();

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(report.rate_limit.and_then(|r| r.remaining), Some(4321));
    assert_eq!(drained_ids(&mut subscription), ids(&[1, 2, 3, 4, 5, 6]));

    // Same feed again: overlap on the first page, so page two is not requested.
    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.pages, 1);
    assert_eq!(report.published, 0);
    assert!(drained_ids(&mut subscription).is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn rate_limited_cycle_leaves_baseline_for_next_cycle() {
    let server = MockServer::start().await;
    mount_page(&server, "/events", &[2, 1], None).await;

    let mut poller = poller_for(&server);
    let mut subscription = poller.subscribe();
    poller.poll_once().await.unwrap();
    assert_eq!(drained_ids(&mut subscription), ids(&[1, 2]));

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Limit", "60")
                .insert_header("X-RateLimit-Remaining", "0"),
        )
        .mount(&server)
        .await;

    let err = poller.poll_once().await.unwrap_err();
    assert!(matches!(err, ClientError::RateLimited(_)));
    assert_eq!(poller.cache().len(), 2);

    server.reset().await;
    mount_page(&server, "/events", &[4, 3, 2], None).await;

    poller.poll_once().await.unwrap();
    assert_eq!(drained_ids(&mut subscription), ids(&[3, 4]));
}

#[tokio::test]
async fn background_poller_delivers_and_shuts_down() {
    let server = MockServer::start().await;
    mount_page(&server, "/events", &[10, 9], None).await;

    let poller = poller_for(&server);
    let mut subscription = poller.subscribe();
    let (handle, shutdown) = spawn_poller(poller);

    let first = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, EventId::from(9u64));

    shutdown.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    // Publisher is gone with the poller; the subscription ends after what was queued.
    let rest: Vec<_> = std::iter::from_fn(|| subscription.try_recv()).collect();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id, EventId::from(10u64));
    assert!(subscription.recv().await.is_none());
}
