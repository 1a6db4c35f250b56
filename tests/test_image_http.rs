use std::time::Duration;

use campaign_director::client::image::{ImageClient, ImageRequest};
use campaign_director::client::{ApiEndpoints, ReferenceImage};
use campaign_director::error::JobError;
use httpmock::Method::POST;
use httpmock::MockServer;
use httpmock::prelude::HttpMockRequest;
use serde_json::{Value, json};

fn endpoints(server: &MockServer) -> ApiEndpoints {
    ApiEndpoints::new(&server.base_url(), &server.base_url()).unwrap()
}

fn client(server: &MockServer) -> ImageClient {
    ImageClient::new(reqwest::Client::new(), &endpoints(server), "test-key")
}

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn image_response(data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"parts": [
                {"text": "Here you go"},
                {"inlineData": {"mimeType": "image/png", "data": data}}
            ]}
        }]
    })
}

fn body_has_no_image_config(req: &HttpMockRequest) -> bool {
    req.body
        .as_ref()
        .map(|b| !std::str::from_utf8(b).unwrap_or_default().contains("imageConfig"))
        .unwrap_or(true)
}

#[tokio::test]
async fn generates_and_decodes_inline_image() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/img-a:generateContent")
            .header("x-goog-api-key", "test-key")
            .body_contains("a gold ring")
            .body_contains("\"mimeType\":\"image/jpeg\"");
        then.status(200).json_body(image_response("AQID"));
    });

    let client = client(&server);
    let mut session = client.session(&models(&["img-a"]));
    let mut request = ImageRequest::new("a gold ring");
    request
        .references
        .push(ReferenceImage::from_bytes(b"jpeg", "image/jpeg"));

    let asset = session.generate(&request).await.unwrap();
    mock.assert();
    assert_eq!(asset.bytes, vec![1, 2, 3]);
    assert_eq!(asset.mime_type, "image/png");
    assert_eq!(session.resolved_model(), Some("img-a"));
}

#[tokio::test]
async fn overloaded_model_falls_back_and_is_remembered() {
    let server = MockServer::start_async().await;
    let busy = server.mock(|when, then| {
        when.method(POST).path("/v1beta/models/img-a:generateContent");
        then.status(503).body("overloaded");
    });
    let spare = server.mock(|when, then| {
        when.method(POST).path("/v1beta/models/img-b:generateContent");
        then.status(200).json_body(image_response("AA=="));
    });

    let client = client(&server);
    let mut session = client.session(&models(&["img-a", "img-b"]));
    let request = ImageRequest::new("scene");

    session.generate(&request).await.unwrap();
    session.generate(&request).await.unwrap();

    assert_eq!(busy.hits(), 1);
    assert_eq!(spare.hits(), 2);
    assert_eq!(session.resolved_model(), Some("img-b"));
}

#[tokio::test]
async fn not_found_stops_and_clears_selection() {
    let server = MockServer::start_async().await;
    let missing = server.mock(|when, then| {
        when.method(POST).path("/v1beta/models/img-a:generateContent");
        then.status(404).body("no such model");
    });
    let spare = server.mock(|when, then| {
        when.method(POST).path("/v1beta/models/img-b:generateContent");
        then.status(200).json_body(image_response("AA=="));
    });

    let client = client(&server);
    let mut session = client.session(&models(&["img-a", "img-b"]));

    let err = session.generate(&ImageRequest::new("scene")).await.unwrap_err();
    assert!(matches!(err, JobError::NotFound(_)));
    assert_eq!(session.resolved_model(), None);
    missing.assert();
    assert_eq!(spare.hits(), 0);
}

#[tokio::test]
async fn every_model_overloaded() {
    let server = MockServer::start_async().await;
    let busy = server.mock(|when, then| {
        when.method(POST);
        then.status(429).body("slow down");
    });

    let client = client(&server);
    let mut session = client.session(&models(&["img-a", "img-b"]));

    let err = session.generate(&ImageRequest::new("scene")).await.unwrap_err();
    assert!(matches!(err, JobError::Overloaded(_)));
    assert_eq!(busy.hits(), 2);
}

#[tokio::test]
async fn rejected_image_config_is_stripped_once() {
    let server = MockServer::start_async().await;
    let with_config = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/img-a:generateContent")
            .body_contains("\"aspectRatio\":\"21:9\"");
        then.status(400).body("unsupported aspect ratio");
    });
    let without_config = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/img-a:generateContent")
            .matches(body_has_no_image_config);
        then.status(200).json_body(image_response("AA=="));
    });

    let client = client(&server);
    let mut session = client.session(&models(&["img-a"]));
    let mut request = ImageRequest::new("scene");
    request.aspect_ratio = Some("21:9".to_string());

    session.generate(&request).await.unwrap();
    with_config.assert();
    without_config.assert();
}

#[tokio::test]
async fn timeout_retries_at_reduced_size() {
    let server = MockServer::start_async().await;
    let slow = server.mock(|when, then| {
        when.method(POST).body_contains("\"imageSize\":\"4K\"");
        then.status(200)
            .delay(Duration::from_secs(3))
            .json_body(image_response("AA=="));
    });
    let fast = server.mock(|when, then| {
        when.method(POST).body_contains("\"imageSize\":\"1K\"");
        then.status(200).json_body(image_response("AQID"));
    });

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let client = ImageClient::new(http, &endpoints(&server), "test-key");
    let mut session = client.session(&models(&["img-a"]));
    let mut request = ImageRequest::new("scene");
    request.image_size = Some("4K".to_string());

    let asset = session.generate(&request).await.unwrap();
    assert_eq!(asset.bytes, vec![1, 2, 3]);
    slow.assert();
    fast.assert();
}
