//! Platform adapters end to end: auth refresh, redaction and pagination

use super::mock_server::{executor, MockServerFixture};
use ads_lib_rust::executor::{AuthRefresh, AuthRefresher};
use ads_lib_rust::pagination::collect_pages;
use ads_lib_rust::platforms::{meta::appsecret_proof, GoogleAdsAdapter, MetaAdapter, TikTokAdapter};
use ads_lib_rust::{AttemptOutcome, ClassifiedError};
use async_trait::async_trait;
use mockito::Matcher;
use reqwest::Method;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct StaticRefresher {
    token: &'static str,
    calls: AtomicU32,
}

#[async_trait]
impl AuthRefresher for StaticRefresher {
    async fn refresh(&self, error: &ClassifiedError) -> AuthRefresh {
        assert!(error.is_auth_error);
        self.calls.fetch_add(1, Ordering::SeqCst);
        AuthRefresh::retry_with(self.token)
    }
}

#[tokio::test]
async fn meta_refresh_rewrites_query_token_and_proof() {
    let mut fx = MockServerFixture::new().await;
    let expired = fx
        .server
        .mock("GET", "/v19.0/act_42/campaigns")
        .match_query(Matcher::UrlEncoded("access_token".into(), "stale".into()))
        .with_status(400)
        .with_header("x-fb-trace-id", "trace-1")
        .with_body(r#"{"error":{"message":"Error validating access token: Session has expired","type":"OAuthException","code":190,"error_subcode":463}}"#)
        .expect(1)
        .create_async()
        .await;
    let fresh = fx
        .server
        .mock("GET", "/v19.0/act_42/campaigns")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("access_token".into(), "fresh".into()),
            Matcher::UrlEncoded("appsecret_proof".into(), appsecret_proof("app-secret", "fresh").unwrap()),
            Matcher::UrlEncoded("fields".into(), "id,name".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"data":[{"id":"c1","name":"Spring"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let adapter = fx.adapter(MetaAdapter::new("v19.0", Some("app-secret".into())), "/v19.0/", 3);
    let (exec, observer) = executor();
    let refresher = Arc::new(StaticRefresher {
        token: "fresh",
        calls: AtomicU32::new(0),
    });
    let request = adapter
        .request("list_campaigns", Method::GET, "act_42/campaigns")
        .unwrap()
        .query("fields", "id,name")
        .on_auth_error(refresher.clone());
    let request = adapter.authorize(request, "stale");

    let resp = exec.execute_json(&adapter, request).await.unwrap();
    assert_eq!(resp.payload["data"][0]["id"], "c1");
    assert_eq!(resp.auth_refreshes, 1);
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    expired.assert_async().await;
    fresh.assert_async().await;

    let records = observer.records();
    assert_eq!(records[0].outcome, AttemptOutcome::AuthRefreshed);
    assert_eq!(records[0].error.as_ref().unwrap()["request_id"], "trace-1");
    for record in &records {
        assert!(!record.url.contains("stale"), "{}", record.url);
        assert!(!record.url.contains("fresh"), "{}", record.url);
        assert!(record.url.contains("access_token=[REDACTED]"));
    }
}

#[tokio::test]
async fn meta_second_auth_failure_is_terminal() {
    let mut fx = MockServerFixture::new().await;
    let rejected = fx
        .server
        .mock("GET", "/v19.0/me")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"error":{"message":"Invalid OAuth access token.","code":190}}"#)
        .expect(2)
        .create_async()
        .await;

    let adapter = fx.adapter(MetaAdapter::default(), "/v19.0/", 3);
    let (exec, _) = executor();
    let refresher = Arc::new(StaticRefresher {
        token: "also-bad",
        calls: AtomicU32::new(0),
    });
    let request = adapter
        .authorize(adapter.request("me", Method::GET, "me").unwrap(), "bad")
        .on_auth_error(refresher.clone());

    let err = exec.execute_json(&adapter, request).await.unwrap_err();
    assert!(err.is_auth_error());
    assert_eq!(err.classified().unwrap().provider_error_code.as_deref(), Some("190"));
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    rejected.assert_async().await;
}

#[tokio::test]
async fn google_ads_search_pages_through_body_token() {
    let mut fx = MockServerFixture::new().await;
    let query = "SELECT campaign.id FROM campaign";
    let first = fx
        .server
        .mock("POST", "/v16/customers/123/googleAds:search")
        .match_header("developer-token", "dev")
        .match_header("authorization", "Bearer ya29")
        .match_body(Matcher::Json(json!({ "query": query })))
        .with_status(200)
        .with_body(r#"{"results":[{"campaign":{"id":"1"}},{"campaign":{"id":"2"}}],"nextPageToken":"CAE"}"#)
        .expect(1)
        .create_async()
        .await;
    let second = fx
        .server
        .mock("POST", "/v16/customers/123/googleAds:search")
        .match_body(Matcher::Json(json!({ "query": query, "pageToken": "CAE" })))
        .with_status(200)
        .with_body(r#"{"results":[{"campaign":{"id":"3"}}]}"#)
        .expect(1)
        .create_async()
        .await;

    let adapter = fx.adapter(GoogleAdsAdapter::new("v16", Some("dev".into()), None), "/v16/", 2);
    let (exec, _) = executor();
    let request = adapter
        .request("search", Method::POST, "customers/123/googleAds:search")
        .unwrap()
        .json(json!({ "query": query }));
    let request = adapter.authorize(request, "ya29");

    let pages = collect_pages(&exec, &adapter, request, 10).await.unwrap();
    assert_eq!(pages.pages.len(), 2);
    assert!(!pages.truncated);
    assert_eq!(pages.attempts, 2);
    let ids: Vec<String> = pages
        .items("/results")
        .iter()
        .map(|r| r["campaign"]["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn page_cap_truncates() {
    let mut fx = MockServerFixture::new().await;
    let _pages = fx
        .server
        .mock("GET", "/open_api/v1.3/ad/get/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"code":0,"data":{"list":[{"ad_id":"a"}],"page_info":{"page":1,"total_page":9}}}"#)
        .create_async()
        .await;

    let adapter = fx.adapter(TikTokAdapter::default(), "/open_api/v1.3/", 1);
    let (exec, _) = executor();
    let request = adapter
        .request("list_ads", Method::GET, "ad/get/")
        .unwrap()
        .query("page", "1");

    let pages = collect_pages(&exec, &adapter, request, 3).await.unwrap();
    assert_eq!(pages.pages.len(), 3);
    assert!(pages.truncated);
}
