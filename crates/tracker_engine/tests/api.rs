use std::time::Duration;

use pretty_assertions::assert_eq;
use tracker_engine::{ApiSettings, FailureKind, PreviewResponse, ReqwestApi, TrackerApi};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn json(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json")
}

fn api_for(server: &MockServer) -> ReqwestApi {
    ReqwestApi::new(ApiSettings {
        base_url: server.uri(),
        xsrf_token: Some("tok".to_string()),
        ..ApiSettings::default()
    })
    .expect("api client")
}

#[tokio::test]
async fn preview_posts_url_with_xsrf_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/preview"))
        .and(body_string_contains("url=http%3A%2F%2Fexample.com%2Fx.jpg"))
        .and(body_string_contains("_xsrf=tok"))
        .and(header("cookie", "_xsrf=tok"))
        .respond_with(json(
            r#"{"fileid": "abc123", "expected_size": 2000000, "content_type": "image/jpeg"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let reply = api_for(&server)
        .preview("http://example.com/x.jpg")
        .await
        .expect("preview ok");

    assert_eq!(
        reply,
        PreviewResponse {
            error: None,
            file_id: Some("abc123".to_string()),
            expected_size: Some(2_000_000),
            content_type: Some("image/jpeg".to_string()),
        }
    );
}

#[tokio::test]
async fn preview_business_error_is_not_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/preview"))
        .respond_with(json(r#"{"error": "bad url"}"#))
        .mount(&server)
        .await;

    let reply = api_for(&server).preview("ftp://nope").await.expect("body parsed");
    assert_eq!(reply.error.as_deref(), Some("bad url"));
    assert_eq!(reply.file_id, None);
}

#[tokio::test]
async fn progress_sends_file_id_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .and(query_param("fileid", "abc123"))
        .respond_with(json(r#"{"done": 500000, "expected": 2000000, "left": 1500000}"#))
        .mount(&server)
        .await;

    let progress = api_for(&server).progress("abc123").await.expect("progress ok");
    assert_eq!(progress.done, 500_000);
}

#[tokio::test]
async fn commit_failure_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .and(body_string_contains("fileid=abc123"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = api_for(&server).commit("abc123").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert_eq!(err.message, "500 Internal Server Error");
    assert_eq!(err.body.as_deref(), Some("boom"));
}

#[tokio::test]
async fn commit_returns_result_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(json(r#"{"url": "/abc123/result"}"#))
        .mount(&server)
        .await;

    let reply = api_for(&server).commit("abc123").await.expect("commit ok");
    assert_eq!(reply.url.as_deref(), Some("/abc123/result"));
    assert_eq!(reply.error, None);
    assert_eq!(reply.email, None);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = api_for(&server).progress("abc123").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
    assert_eq!(err.body.as_deref(), Some("<html>login</html>"));
}

#[tokio::test]
async fn preload_list_uses_path_template() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/preload/abc123/"))
        .respond_with(json(r#"{"urls": ["/tiles/abc123/256/1/0,0.jpg", "/tiles/abc123/256/1/0,1.jpg"]}"#))
        .mount(&server)
        .await;

    let urls = api_for(&server).preload_urls("abc123").await.expect("list ok");
    assert_eq!(
        urls,
        vec![
            "/tiles/abc123/256/1/0,0.jpg".to_string(),
            "/tiles/abc123/256/1/0,1.jpg".to_string(),
        ]
    );
}

#[tokio::test]
async fn load_tile_resolves_relative_url_and_counts_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tiles/abc123/256/1/0,0.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 4096], "image/jpeg"))
        .mount(&server)
        .await;

    let bytes = api_for(&server)
        .load_tile("/tiles/abc123/256/1/0,0.jpg")
        .await
        .expect("tile ok");
    assert_eq!(bytes, 4096);
}

#[tokio::test]
async fn hit_posts_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hit"))
        .and(body_string_contains("_xsrf=tok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    api_for(&server).hit().await.expect("hit ok");
}

#[tokio::test]
async fn slow_request_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .respond_with(json(r#"{"done": 1}"#).set_delay(Duration::from_millis(250)))
        .mount(&server)
        .await;

    let api = ReqwestApi::new(ApiSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ApiSettings::default()
    })
    .expect("api client");

    let err = api.progress("abc123").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = ReqwestApi::new(ApiSettings {
        base_url: "not a url".to_string(),
        ..ApiSettings::default()
    })
    .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
