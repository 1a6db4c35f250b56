use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose;
use campaign_director::client::ApiEndpoints;
use campaign_director::client::video::{
    HttpJobTransport, JobRunner, PollSettings, VideoParameters, VideoRequest,
    run_async_job_with_endpoints,
};
use campaign_director::error::JobError;
use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use httpmock::prelude::HttpMockRequest;
use serde_json::json;

fn endpoints(server: &MockServer) -> ApiEndpoints {
    ApiEndpoints::new(&server.base_url(), &server.base_url()).unwrap()
}

fn runner_with(server: &MockServer, settings: PollSettings) -> JobRunner<HttpJobTransport> {
    let transport = HttpJobTransport::new(reqwest::Client::new(), &endpoints(server), "veo-key");
    JobRunner::new(transport, settings)
}

fn runner(server: &MockServer) -> JobRunner<HttpJobTransport> {
    runner_with(
        server,
        PollSettings {
            interval: Duration::from_millis(20),
            max_wait: Duration::from_secs(5),
        },
    )
}

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn body_has_no_parameters(req: &HttpMockRequest) -> bool {
    req.body
        .as_ref()
        .map(|b| !std::str::from_utf8(b).unwrap_or_default().contains("parameters"))
        .unwrap_or(true)
}

#[tokio::test]
async fn falls_back_past_missing_model_and_decodes_inline_video() {
    let server = MockServer::start_async().await;
    let missing = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/model-a:predictLongRunning");
        then.status(404).body("model not found");
    });
    let accepted = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/model-b:predictLongRunning")
            .header("x-goog-api-key", "veo-key")
            .body_contains("\"prompt\":\"a walk on the beach\"");
        then.status(200)
            .json_body(json!({"name": "models/model-b/operations/op1"}));
    });
    let fixture = b"\x00\x00\x00\x18ftypmp42 fake video".to_vec();
    let encoded = general_purpose::STANDARD.encode(&fixture);
    let status = server.mock(|when, then| {
        when.method(GET).path("/v1beta/models/model-b/operations/op1");
        then.status(200).json_body(json!({
            "name": "models/model-b/operations/op1",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"bytesBase64Encoded": encoded, "mimeType": "video/mp4"}}
            ]}}
        }));
    });

    let runner = runner(&server);
    let request = VideoRequest::new("a walk on the beach");
    let candidates = models(&["model-a", "model-b"]);

    let job = runner.submit_with_fallback(&request, &candidates).await.unwrap();
    assert_eq!(job.model, "model-b");

    let asset = runner.wait_for(&job, |_| {}).await.unwrap();
    assert_eq!(asset.bytes, fixture);
    assert_eq!(asset.mime_type, "video/mp4");
    missing.assert();
    accepted.assert();
    status.assert();
}

#[tokio::test]
async fn uri_result_is_fetched_with_key() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1beta/models/veo:predictLongRunning");
        then.status(200).json_body(json!({"name": "models/veo/operations/op2"}));
    });
    let download_url = server.url("/files/op2:download?alt=media");
    server.mock(|when, then| {
        when.method(GET).path("/v1beta/models/veo/operations/op2");
        then.status(200).json_body(json!({
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"uri": download_url}}
            ]}}
        }));
    });
    let download = server.mock(|when, then| {
        when.method(GET)
            .path("/files/op2:download")
            .query_param("alt", "media")
            .header("x-goog-api-key", "veo-key");
        then.status(200).body("video-bytes");
    });

    let asset = runner(&server)
        .run(&VideoRequest::new("p"), &models(&["veo"]), |_| {})
        .await
        .unwrap();

    download.assert();
    assert_eq!(asset.bytes, b"video-bytes".to_vec());
    assert_eq!(asset.mime_type, "video/mp4");
}

#[tokio::test]
async fn service_error_is_reported_without_retry() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1beta/models/veo:predictLongRunning");
        then.status(200).json_body(json!({"name": "models/veo/operations/bad"}));
    });
    let status = server.mock(|when, then| {
        when.method(GET).path("/v1beta/models/veo/operations/bad");
        then.status(200).json_body(json!({
            "done": true,
            "error": {"code": 8, "message": "Resource exhausted"}
        }));
    });

    let err = runner(&server)
        .run(&VideoRequest::new("p"), &models(&["veo"]), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Service { code: Some(8), .. }));
    assert_eq!(status.hits(), 1);
}

#[tokio::test]
async fn overloaded_everywhere_never_polls() {
    let server = MockServer::start_async().await;
    let submit = server.mock(|when, then| {
        when.method(POST);
        then.status(503).body("overloaded");
    });
    let poll = server.mock(|when, then| {
        when.method(GET);
        then.status(200).json_body(json!({"done": false}));
    });

    let err = runner(&server)
        .run(&VideoRequest::new("p"), &models(&["a", "b", "c"]), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::NoModelAvailable));
    assert_eq!(submit.hits(), 3);
    assert_eq!(poll.hits(), 0);
}

#[tokio::test]
async fn rejected_parameters_are_dropped() {
    let server = MockServer::start_async().await;
    let with_params = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/veo:predictLongRunning")
            .body_contains("\"aspectRatio\":\"9:16\"");
        then.status(400).body("aspectRatio is not supported");
    });
    let without_params = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/veo:predictLongRunning")
            .matches(body_has_no_parameters);
        then.status(200).json_body(json!({"name": "models/veo/operations/op3"}));
    });

    let mut request = VideoRequest::new("p");
    request.parameters = Some(VideoParameters {
        aspect_ratio: Some("9:16".to_string()),
        ..Default::default()
    });

    let job = runner(&server)
        .submit_with_fallback(&request, &models(&["veo"]))
        .await
        .unwrap();

    assert_eq!(job.handle.0, "models/veo/operations/op3");
    with_params.assert();
    without_params.assert();
}

#[tokio::test]
async fn run_async_job_returns_video_bytes() {
    let server = MockServer::start_async().await;
    let submit = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/veo:predictLongRunning")
            .header("x-goog-api-key", "veo-key")
            .body_contains("\"prompt\":\"city lights\"");
        then.status(200).json_body(json!({"name": "models/veo/operations/op4"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1beta/models/veo/operations/op4");
        then.status(200).json_body(json!({
            "done": true,
            "response": {"videos": [{"bytesBase64Encoded": "AQID"}]}
        }));
    });

    let bytes = run_async_job_with_endpoints(
        &endpoints(&server),
        "city lights",
        "veo-key",
        &models(&["veo"]),
        Duration::from_millis(20),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(bytes, vec![1, 2, 3]);
    submit.assert();
}

#[tokio::test]
async fn times_out_after_three_pending_polls() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1beta/models/veo:predictLongRunning");
        then.status(200).json_body(json!({"name": "models/veo/operations/slow"}));
    });
    let pending = server.mock(|when, then| {
        when.method(GET).path("/v1beta/models/veo/operations/slow");
        then.status(200).json_body(json!({"done": false}));
    });

    let settings = PollSettings {
        interval: Duration::from_millis(500),
        max_wait: Duration::from_millis(1900),
    };
    let started = std::time::Instant::now();
    let err = runner_with(&server, settings)
        .run(&VideoRequest::new("p"), &models(&["veo"]), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Timeout));
    assert_eq!(pending.hits(), 3);
    assert!(started.elapsed() <= Duration::from_millis(1900));
}

#[tokio::test]
async fn server_error_while_polling_is_not_fatal() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1beta/models/veo:predictLongRunning");
        then.status(200).json_body(json!({"name": "models/veo/operations/flaky"}));
    });
    let mut failing = server.mock(|when, then| {
        when.method(GET).path("/v1beta/models/veo/operations/flaky");
        then.status(500).body("backend unavailable");
    });

    let settings = PollSettings {
        interval: Duration::from_millis(200),
        max_wait: Duration::from_secs(10),
    };
    let job = tokio::spawn({
        let runner = runner_with(&server, settings);
        async move {
            runner
                .run(&VideoRequest::new("p"), &models(&["veo"]), |_| {})
                .await
        }
    });

    while failing.hits_async().await == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    failing.delete_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/v1beta/models/veo/operations/flaky");
        then.status(200).json_body(json!({
            "done": true,
            "response": {"videos": [{"bytesBase64Encoded": "BAUG", "mimeType": "video/mp4"}]}
        }));
    });

    let asset = job.await.unwrap().unwrap();
    assert_eq!(asset.bytes, vec![4, 5, 6]);
}
