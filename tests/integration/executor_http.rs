//! Executor behaviour over real HTTP

use super::mock_server::{executor, MockServerFixture};
use ads_lib_rust::platforms::{LinkedInAdapter, MetaAdapter, TikTokAdapter};
use ads_lib_rust::{CancellationToken, Error};
use mockito::Matcher;
use reqwest::Method;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let mut fx = MockServerFixture::new().await;
    let failing = fx
        .server
        .mock("GET", "/rest/adAccounts")
        .with_status(503)
        .with_body("<html>upstream unavailable</html>")
        .expect(2)
        .create_async()
        .await;
    let ok = fx
        .server
        .mock("GET", "/rest/adAccounts")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"elements":[{"id":1}]}"#)
        .expect(1)
        .create_async()
        .await;

    let adapter = fx.adapter(LinkedInAdapter::default(), "/rest/", 3);
    let (exec, observer) = executor();
    let request = adapter.authorize(adapter.request("list_accounts", Method::GET, "adAccounts").unwrap(), "tok");

    let resp = exec.execute_json(&adapter, request).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.attempts, 3);
    assert_eq!(resp.payload["elements"][0]["id"], 1);
    assert_eq!(observer.failures().len(), 2);

    failing.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let mut fx = MockServerFixture::new().await;
    let mock = fx
        .server
        .mock("GET", "/rest/adCampaigns")
        .with_status(422)
        .with_body(r#"{"status":422,"serviceErrorCode":100,"message":"Invalid field"}"#)
        .expect(1)
        .create_async()
        .await;

    let adapter = fx.adapter(LinkedInAdapter::default(), "/rest/", 5);
    let (exec, _) = executor();
    let request = adapter.request("list_campaigns", Method::GET, "adCampaigns").unwrap();

    let err = exec.execute_json(&adapter, request).await.unwrap_err();
    let classified = err.classified().unwrap();
    assert_eq!(classified.http_status, Some(422));
    assert_eq!(classified.message, "Invalid field");
    assert!(!err.is_retryable());
    mock.assert_async().await;
}

#[tokio::test]
async fn rate_limit_honours_retry_after_and_notifies_hook() {
    let mut fx = MockServerFixture::new().await;
    let _throttled = fx
        .server
        .mock("GET", "/rest/adAnalytics")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("retry-after", "1")
        .with_body(r#"{"status":429,"message":"Resource level throttle limit for calls to this resource is reached."}"#)
        .expect(1)
        .create_async()
        .await;
    let _ok = fx
        .server
        .mock("GET", "/rest/adAnalytics")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"elements":[]}"#)
        .create_async()
        .await;

    let adapter = fx.adapter(LinkedInAdapter::default(), "/rest/", 3);
    let (exec, _) = executor();
    let hinted = Arc::new(AtomicU64::new(0));
    let seen = hinted.clone();
    let request = adapter
        .request("analytics", Method::GET, "adAnalytics")
        .unwrap()
        .query("q", "analytics")
        .on_rate_limit_hit(move |d| seen.store(d.as_millis() as u64, Ordering::SeqCst));

    let resp = exec.execute_json(&adapter, request).await.unwrap();
    assert_eq!(resp.attempts, 2);
    // One second requested, clamped to the 50ms cap.
    assert_eq!(hinted.load(Ordering::SeqCst), 50);
}

#[tokio::test]
async fn tiktok_http_200_failure_is_retried() {
    let mut fx = MockServerFixture::new().await;
    let _limited = fx
        .server
        .mock("GET", "/open_api/v1.3/campaign/get/")
        .match_query(Matcher::UrlEncoded("advertiser_id".into(), "7001".into()))
        .match_header("access-token", "tt-token")
        .with_status(200)
        .with_body(r#"{"code":40100,"message":"Too many requests","request_id":"r-1"}"#)
        .expect(1)
        .create_async()
        .await;
    let _ok = fx
        .server
        .mock("GET", "/open_api/v1.3/campaign/get/")
        .match_query(Matcher::UrlEncoded("advertiser_id".into(), "7001".into()))
        .with_status(200)
        .with_body(r#"{"code":0,"message":"OK","data":{"list":[{"campaign_id":"c1"}]}}"#)
        .create_async()
        .await;

    let adapter = fx.adapter(TikTokAdapter::default(), "/open_api/v1.3/", 3);
    let (exec, observer) = executor();
    let request = adapter
        .request("list_campaigns", Method::GET, "campaign/get/")
        .unwrap()
        .query("advertiser_id", "7001");
    let request = adapter.authorize(request, "tt-token");

    let resp = exec.execute_json(&adapter, request).await.unwrap();
    assert_eq!(resp.payload["data"]["list"][0]["campaign_id"], "c1");
    assert_eq!(resp.attempts, 2);

    let first = &observer.records()[0];
    assert_eq!(first.status_code, Some(200));
    assert_eq!(first.error.as_ref().unwrap()["provider_error_code"], "40100");
    assert_eq!(first.error.as_ref().unwrap()["request_id"], "r-1");
}

#[tokio::test]
async fn correlation_header_is_sent() {
    let mut fx = MockServerFixture::new().await;
    let mock = fx
        .server
        .mock("GET", "/rest/me")
        .match_header(
            "x-ads-request-id",
            Matcher::Regex(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}$".into()),
        )
        .match_header("linkedin-version", "202401")
        .match_header("x-restli-protocol-version", "2.0.0")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let adapter = fx.adapter(LinkedInAdapter::default(), "/rest/", 1);
    let (exec, _) = executor();
    let resp = exec
        .execute_json(&adapter, adapter.request("me", Method::GET, "me").unwrap())
        .await
        .unwrap();
    assert_eq!(resp.client_request_id.len(), 36);
    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_host_surfaces_transport_error() {
    let (exec, observer) = executor();
    let adapter = ads_lib_rust::AdapterConfig::builder(Arc::new(LinkedInAdapter::default()))
        .base_url("http://127.0.0.1:9/rest/")
        .retry(super::mock_server::fast_retry(2))
        .build()
        .unwrap();

    let err = exec
        .execute_json(&adapter, adapter.request("me", Method::GET, "me").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_retryable());
    assert_eq!(observer.len(), 2);
}

#[tokio::test]
async fn network_failure_records_hide_query_token() {
    let (exec, observer) = executor();
    let adapter = ads_lib_rust::AdapterConfig::builder(Arc::new(MetaAdapter::default()))
        .base_url("http://127.0.0.1:9/v19.0/")
        .retry(super::mock_server::fast_retry(2))
        .build()
        .unwrap();
    let request = adapter.authorize(adapter.request("me", Method::GET, "me").unwrap(), "EAAsecret42");

    let err = exec.execute_json(&adapter, request).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));

    let records = observer.records();
    assert_eq!(records.len(), 2);
    for record in &records {
        let error = record.error.as_ref().unwrap().to_string();
        assert!(!error.contains("EAAsecret42"), "{error}");
        assert!(!record.url.contains("EAAsecret42"), "{}", record.url);
    }
}

#[tokio::test]
async fn deadline_and_cancellation_stop_retries() {
    let mut fx = MockServerFixture::new().await;
    let _down = fx
        .server
        .mock("GET", "/rest/adAccounts")
        .with_status(500)
        .with_body("{}")
        .create_async()
        .await;

    let adapter = ads_lib_rust::AdapterConfig::builder(Arc::new(LinkedInAdapter::default()))
        .base_url(format!("{}/rest/", fx.base_url))
        .retry(ads_lib_rust::RetryConfig::new(50, 200, 1_000, 0.0))
        .build()
        .unwrap();
    let (exec, _) = executor();

    let request = adapter
        .request("list", Method::GET, "adAccounts")
        .unwrap()
        .deadline(Duration::from_millis(300));
    let err = exec.execute_json(&adapter, request).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded { .. }));

    let token = CancellationToken::new();
    let request = adapter
        .request("list", Method::GET, "adAccounts")
        .unwrap()
        .cancel_token(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });
    let err = exec.execute_json(&adapter, request).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    canceller.await.unwrap();
}
