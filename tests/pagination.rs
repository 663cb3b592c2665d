//! Link-header pagination against a wiremock server.

use std::time::Duration;

use bcapi::{
    BasecampClient, CallOptions, CancellationToken, ClientConfig, ErrorKind, OperationDescriptor,
    PageLimits, RetryPolicy,
};
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST_PATH: &str = "/42/items.json";

fn client(server: &MockServer) -> BasecampClient {
    let config = ClientConfig {
        retry: RetryPolicy::default().base_delay(Duration::from_millis(5)),
        max_jitter: Duration::ZERO,
        ..ClientConfig::default()
    };
    BasecampClient::builder("test-token", "42")
        .base_url(server.uri())
        .config(config)
        .build()
        .unwrap()
}

fn list_op() -> OperationDescriptor {
    OperationDescriptor::new("Items", "List", Method::GET)
}

fn items(range: std::ops::Range<u64>) -> Value {
    Value::Array(range.map(|id| json!({ "id": id })).collect())
}

fn next_link(target: &str) -> String {
    format!("<{target}>; rel=\"next\"")
}

async fn mount_page(server: &MockServer, page: Option<&str>, body: Value, link: Option<String>) {
    let mut response = ResponseTemplate::new(200).set_body_json(body);
    if let Some(link) = link {
        response = response.insert_header("Link", link.as_str());
    }
    let mock = Mock::given(method("GET")).and(path(LIST_PATH));
    match page {
        Some(page) => mock.and(query_param("page", page)).respond_with(response),
        None => mock.and(query_param_is_missing("page")).respond_with(response),
    }
    .mount(server)
    .await;
}

#[tokio::test]
async fn test_pages_are_concatenated_in_order() {
    let server = MockServer::start().await;
    let page2 = format!("{}{LIST_PATH}?page=2", server.uri());

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", next_link(&page2).as_str())
                .insert_header("X-Total-Count", "5")
                .set_body_json(items(0..3)),
        )
        .mount(&server)
        .await;
    mount_page(&server, Some("2"), items(3..5), None).await;

    let client = client(&server);
    let result = client
        .get_all::<Value>(&list_op(), "items.json", &CallOptions::default())
        .await
        .unwrap();

    let ids: Vec<u64> = result.items.iter().map(|v| v["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    assert_eq!(result.total_count, Some(5));
    assert_eq!(result.pages_fetched, 2);
    assert!(!result.truncated);
    assert!(result.partial_error.is_none());
}

#[tokio::test]
async fn test_relative_link_resolves_against_current_page() {
    let server = MockServer::start().await;

    mount_page(&server, None, items(0..2), Some(next_link("items.json?page=2"))).await;
    mount_page(&server, Some("2"), items(2..3), None).await;

    let result = client(&server)
        .get_all::<Value>(&list_op(), "items.json", &CallOptions::default())
        .await
        .unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result.pages_fetched, 2);
}

#[tokio::test]
async fn test_cross_origin_link_is_refused() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        None,
        items(0..2),
        Some(next_link("https://evil.example.com/42/items.json?page=2")),
    )
    .await;

    let err = client(&server)
        .get_all::<Value>(&list_op(), "items.json", &CallOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PaginationOrigin);
    assert!(err.to_string().contains("evil.example.com"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_item_cap_truncates_without_fetching_more() {
    let server = MockServer::start().await;
    let page2 = format!("{}{LIST_PATH}?page=2", server.uri());

    mount_page(&server, None, items(0..10), Some(next_link(&page2))).await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(10..20)))
        .expect(0)
        .mount(&server)
        .await;

    let limits = PageLimits::default().max_items(5);
    let result = client(&server)
        .get_all_with::<Value>(&list_op(), "items.json", &limits, &CallOptions::default())
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    assert!(result.truncated);
    assert_eq!(result.pages_fetched, 1);
}

#[tokio::test]
async fn test_item_cap_exactly_met_on_last_page() {
    let server = MockServer::start().await;

    mount_page(&server, None, items(0..5), None).await;

    let limits = PageLimits::default().max_items(5);
    let result = client(&server)
        .get_all_with::<Value>(&list_op(), "items.json", &limits, &CallOptions::default())
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    assert!(!result.truncated);
}

#[tokio::test]
async fn test_page_cap_marks_result_truncated() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        None,
        items(0..2),
        Some(next_link(&format!("{base}{LIST_PATH}?page=2"))),
    )
    .await;
    mount_page(
        &server,
        Some("2"),
        items(2..4),
        Some(next_link(&format!("{base}{LIST_PATH}?page=3"))),
    )
    .await;

    let limits = PageLimits::default().max_pages(2);
    let result = client(&server)
        .get_all_with::<Value>(&list_op(), "items.json", &limits, &CallOptions::default())
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(result.pages_fetched, 2);
    assert!(result.truncated);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failure_after_first_page_can_return_partial_results() {
    let server = MockServer::start().await;
    let page2 = format!("{}{LIST_PATH}?page=2", server.uri());

    mount_page(&server, None, items(0..3), Some(next_link(&page2))).await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server);
    let opts = CallOptions::default();

    let err = client
        .get_all::<Value>(&list_op(), "items.json", &opts)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));

    let limits = PageLimits::default().allow_partial(true);
    let result = client
        .get_all_with::<Value>(&list_op(), "items.json", &limits, &opts)
        .await
        .unwrap();
    assert_eq!(result.len(), 3);
    assert!(result.truncated);
    assert_eq!(result.partial_error.as_ref().and_then(|e| e.status()), Some(500));
}

async fn mount_slow_second_page(server: &MockServer) {
    let page2 = format!("{}{LIST_PATH}?page=2", server.uri());
    mount_page(server, None, items(0..2), Some(next_link(&page2))).await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(items(2..4)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cancelled_walk_fails_even_with_partial_results_allowed() {
    let server = MockServer::start().await;
    mount_slow_second_page(&server).await;

    let token = CancellationToken::new();
    let opts = CallOptions::default().cancel(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let limits = PageLimits::default().allow_partial(true);
    let err = client(&server)
        .get_all_with::<Value>(&list_op(), "items.json", &limits, &opts)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_expired_deadline_fails_even_with_partial_results_allowed() {
    let server = MockServer::start().await;
    mount_slow_second_page(&server).await;

    let opts = CallOptions::default().deadline(Duration::from_millis(300));
    let limits = PageLimits::default().allow_partial(true);
    let err = client(&server)
        .get_all_with::<Value>(&list_op(), "items.json", &limits, &opts)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_first_page_failure_is_never_partial() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let limits = PageLimits::default().allow_partial(true);
    let err = client(&server)
        .get_all_with::<Value>(&list_op(), "items.json", &limits, &CallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_pages_are_retried_individually() {
    let server = MockServer::start().await;
    let page2 = format!("{}{LIST_PATH}?page=2", server.uri());

    mount_page(&server, None, items(0..2), Some(next_link(&page2))).await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, Some("2"), items(2..4), None).await;

    let result = client(&server)
        .get_all::<Value>(&list_op(), "items.json", &CallOptions::default())
        .await
        .unwrap();
    assert_eq!(result.len(), 4);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_single_page_exposes_next_link() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        None,
        items(0..2),
        Some(next_link("items.json?page=2")),
    )
    .await;

    let page = client(&server)
        .get_page::<Value>(&list_op(), "items.json", &CallOptions::default())
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
    assert!(page.has_more());
    assert_eq!(
        page.next.as_ref().map(|u| u.as_str().to_string()),
        Some(format!("{}{LIST_PATH}?page=2", server.uri()))
    );
}

#[tokio::test]
async fn test_single_page_refuses_cross_origin_next() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        None,
        items(0..2),
        Some(next_link("https://evil.example.com/42/items.json?page=2")),
    )
    .await;

    let err = client(&server)
        .get_page::<Value>(&list_op(), "items.json", &CallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaginationOrigin);
}
