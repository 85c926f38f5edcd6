use std::time::Duration;

use stockscraper_api::{Client, FetchError, ProxyConfig, RetryPolicy};
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, max_retries: u32) -> Client {
    Client::with_base_url(&server.uri())
        .unwrap()
        .with_policy(RetryPolicy::immediate(max_retries))
}

#[tokio::test]
async fn fetch_success_returns_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/equities/nike"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 3);
    let doc = client.fetch(&client.quote_url("nike")).await.unwrap();
    assert_eq!(doc.body, "<html>ok</html>");
    assert!(doc.url.ends_with("/equities/nike"));
}

#[tokio::test]
async fn always_failing_target_makes_max_retries_plus_one_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/equities/nike"))
        .respond_with(ResponseTemplate::new(503).set_body_string("blocked"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 3);
    let err = client.fetch(&client.quote_url("nike")).await.unwrap_err();
    match err {
        FetchError::Exhausted {
            attempts,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 4);
            assert!(last_error.contains("503"));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_with_overrides_retry_budget() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 5);
    let result = client
        .fetch_with(&client.quote_url("nike"), 1, Duration::from_millis(1))
        .await;
    assert!(matches!(
        result,
        Err(FetchError::Exhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn recovers_after_transient_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/equities/nike"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/equities/nike"))
        .respond_with(ResponseTemplate::new(200).set_body_string("third time"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 3);
    let doc = client.fetch(&client.quote_url("nike")).await.unwrap();
    assert_eq!(doc.body, "third time");
}

#[tokio::test]
async fn zero_retries_means_single_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 0);
    let result = client.fetch(&client.quote_url("missing")).await;
    assert!(matches!(
        result,
        Err(FetchError::Exhausted { attempts: 1, .. })
    ));
}

#[tokio::test]
async fn unreachable_target_surfaces_as_exhausted() {
    // Nothing listens on port 9 of the loopback interface.
    let client = Client::with_base_url("http://127.0.0.1:9")
        .unwrap()
        .with_policy(RetryPolicy::immediate(1));
    let result = client.fetch(&client.quote_url("nike")).await;
    assert!(matches!(
        result,
        Err(FetchError::Exhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn proxy_receives_api_key_and_target() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("api_key", "k-123"))
        .and(query_param("url", "https://www.investing.com/equities/nike"))
        .respond_with(ResponseTemplate::new(200).set_body_string("via proxy"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let proxy = ProxyConfig::new("k-123").with_endpoint(&format!("{}/", mock_server.uri()));
    let client = Client::new()
        .unwrap()
        .with_policy(RetryPolicy::immediate(0))
        .with_proxy(Some(proxy));
    let doc = client.fetch(&client.quote_url("nike")).await.unwrap();
    assert_eq!(doc.body, "via proxy");
}

#[tokio::test]
async fn invalid_target_makes_no_request() {
    let client = Client::with_base_url("http://127.0.0.1:9")
        .unwrap()
        .with_policy(RetryPolicy::immediate(3));
    let result = client.fetch("::not a url::").await;
    assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
}
