// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    body_json, completion, create_test_app, create_test_app_with_options, png_bytes,
    sample_analysis, upload_request, FormPart, TestAppOptions,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use errsnap::infrastructure::database::entities::image_analysis;
use sea_orm::EntityTrait;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

/// 正常上传：返回规范化记录并写入数据库
#[tokio::test]
async fn test_png_upload_returns_analysis() {
    let app = create_test_app().await;
    app.mock_vision_reply(&sample_analysis().to_string()).await;

    let response = app
        .upload("screenshot.png", "image/png", &png_bytes(2 * 1024))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["error_title"], "Connection refused");
    assert_eq!(body["error_code"], "ECONNREFUSED");
    assert_eq!(body["probable_cause"], "network_error");
    assert_eq!(body["severity"], "high");
    assert_eq!(body["confidence"], 0.9);
    assert_eq!(body["environment"], json!({ "os": "macOS 14.2" }));
    assert_eq!(
        body["key_text_blocks"][0]["bbox"],
        json!([12.0, 40.0, 300.0, 18.0])
    );
    assert!(body["created_at"].is_string());
    let analysis_id = body["analysis_id"].as_str().unwrap().to_string();
    assert_eq!(analysis_id.len(), 36);

    let rows = image_analysis::Entity::find()
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].analysis_id.to_string(), analysis_id);
    assert_eq!(rows[0].image_filename, "screenshot.png");
    assert_eq!(rows[0].image_size_bytes, 2048);
    assert_eq!(rows[0].requester_ip, "203.0.113.9");
    assert_eq!(rows[0].user_agent, "errsnap-tests/1.0");
}

/// 发给视觉模型的请求携带鉴权头和 base64 图片
#[tokio::test]
async fn test_vision_request_carries_image_data_url() {
    let app = create_test_app().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-vision-key"))
        .respond_with(completion(&sample_analysis().to_string()))
        .expect(1)
        .mount(&app.vision)
        .await;

    let response = app.upload("shot.jpg", "image/jpeg", b"hi").await;
    assert_eq!(response.status(), StatusCode::OK);

    let requests = app.vision.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let payload: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(payload["model"], "gpt-4o-mini");
    assert_eq!(payload["max_tokens"], 1500);
    let content = &payload["messages"][1]["content"];
    assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,aGk=");
}

/// 不支持的类型在调用模型之前被拒绝
#[tokio::test]
async fn test_unsupported_type_rejected_without_vision_call() {
    let app = create_test_app().await;
    app.mock_vision_reply(&sample_analysis().to_string()).await;

    let response = app.upload("anim.gif", "image/gif", b"GIF89a").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(
        body["reason"],
        "Invalid file type: image/gif. Only PNG and JPEG are supported."
    );
    assert_eq!(app.vision_calls().await, 0);
}

/// 超过 15 MiB 的文件被拒绝
#[tokio::test]
async fn test_oversized_upload_rejected_without_vision_call() {
    let app = create_test_app().await;
    app.mock_vision_reply(&sample_analysis().to_string()).await;

    let response = app
        .upload("huge.png", "image/png", &png_bytes(16 * 1024 * 1024))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["reason"], "File size 16.00 MB exceeds maximum of 15 MB");
    assert_eq!(app.vision_calls().await, 0);

    let rows = image_analysis::Entity::find()
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

/// 没有 file 字段
#[tokio::test]
async fn test_missing_file_field() {
    let app = create_test_app().await;

    let response = app
        .send(upload_request(&[FormPart::Text {
            name: "note",
            value: "nothing attached",
        }]))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["reason"], "No file provided");
    assert_eq!(body["error"], "Missing required field: file");
    assert_eq!(app.vision_calls().await, 0);
}

/// 非 multipart 请求体
#[tokio::test]
async fn test_non_multipart_body_is_malformed() {
    let app = create_test_app().await;

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/analyze-image")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"file":"x"}"#))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["reason"], "Malformed upload");
}

/// 代码块包裹的回复与裸 JSON 解析结果相同
#[tokio::test]
async fn test_fenced_reply_is_parsed() {
    let app = create_test_app().await;
    let reply = format!("Here you go:\n```json\n{}\n```", sample_analysis());
    app.mock_vision_reply(&reply).await;

    let response = app.upload("shot.png", "image/png", &png_bytes(64)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["error_title"], "Connection refused");
    assert_eq!(body["follow_up_questions"], json!(["Is the database running?"]));
}

/// 回复不是 JSON 时返回原文，且不写入数据库
#[tokio::test]
async fn test_unparseable_reply_returns_raw_content() {
    let app = create_test_app().await;
    let reply = "I could not read this screenshot, sorry.";
    app.mock_vision_reply(reply).await;

    let response = app.upload("shot.png", "image/png", &png_bytes(64)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["reason"], "Failed to parse AI response");
    assert_eq!(body["raw_content"], reply);

    let rows = image_analysis::Entity::find()
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

/// 合法 JSON 但不是对象的回复同样视为解析失败
#[tokio::test]
async fn test_non_object_json_reply_returns_raw_content() {
    for reply in ["[]", "[1,2,3]", "\"str\"", "42"] {
        let app = create_test_app().await;
        app.mock_vision_reply(reply).await;

        let response = app.upload("shot.png", "image/png", &png_bytes(64)).await;
        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "{}",
            reply
        );

        let body = body_json(response).await;
        assert_eq!(body["status"], "failed", "{}", reply);
        assert_eq!(body["reason"], "Failed to parse AI response", "{}", reply);
        assert_eq!(body["raw_content"], reply);

        let rows = image_analysis::Entity::find()
            .all(app.db.as_ref())
            .await
            .unwrap();
        assert!(rows.is_empty(), "{} should not be stored", reply);
    }
}

/// 缺失字段使用默认值
#[tokio::test]
async fn test_sparse_reply_is_normalized() {
    let app = create_test_app().await;
    app.mock_vision_reply(r#"{"probable_cause": "cosmic_rays", "confidence": 7}"#)
        .await;

    let response = app.upload("shot.png", "image/png", &png_bytes(64)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["error_title"], "Unknown Error");
    assert_eq!(body["probable_cause"], "unknown");
    assert_eq!(body["severity"], "medium");
    assert_eq!(body["confidence"], 1.0);
    assert_eq!(body["error_code"], json!(null));
    assert_eq!(body["key_text_blocks"], json!([]));
    assert_eq!(body["follow_up_questions"], json!([]));
}

/// 相同的图片两次上传得到不同的 analysis_id
#[tokio::test]
async fn test_identical_uploads_get_distinct_ids() {
    let app = create_test_app().await;
    app.mock_vision_reply(&sample_analysis().to_string()).await;

    let data = png_bytes(128);
    let first = body_json(app.upload("same.png", "image/png", &data).await).await;
    let second = body_json(app.upload("same.png", "image/png", &data).await).await;

    assert_ne!(first["analysis_id"], second["analysis_id"]);
    assert_eq!(app.vision_calls().await, 2);

    let rows = image_analysis::Entity::find()
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

/// 存储失败时仍然返回分析结果
#[tokio::test]
async fn test_store_failure_still_returns_record() {
    let app = create_test_app_with_options(TestAppOptions {
        failing_store: true,
        ..TestAppOptions::default()
    })
    .await;
    app.mock_vision_reply(&sample_analysis().to_string()).await;

    let response = app.upload("shot.png", "image/png", &png_bytes(64)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["error_title"], "Connection refused");
    assert!(body.get("created_at").is_none());
}

/// 视觉模型返回错误状态
#[tokio::test]
async fn test_vision_error_status_is_reported() {
    let app = create_test_app().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-vision-key"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&app.vision)
        .await;

    let response = app.upload("shot.png", "image/png", &png_bytes(64)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["reason"], "Vision API error");
    assert_eq!(body["error"], "API returned 500");
}

/// 回复缺少 choices 内容
#[tokio::test]
async fn test_vision_reply_without_content() {
    let app = create_test_app().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&app.vision)
        .await;

    let response = app.upload("shot.png", "image/png", &png_bytes(64)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["reason"], "Vision API error");
}

/// 未配置 API 密钥
#[tokio::test]
async fn test_missing_api_key_is_internal_error() {
    let app = create_test_app_with_options(TestAppOptions {
        api_key: None,
        ..TestAppOptions::default()
    })
    .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("{}"))
        .expect(0)
        .mount(&app.vision)
        .await;

    let response = app.upload("shot.png", "image/png", &png_bytes(64)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["reason"], "Internal server error");
}

/// 2 KB PNG，模型回复登录失败
#[tokio::test]
async fn test_login_failure_screenshot_end_to_end() {
    let app = create_test_app().await;
    let reply = json!({
        "error_title": "Login failed",
        "probable_cause": "authentication_error",
        "severity": "high",
        "confidence": 0.9,
        "suggested_fix": "Reset credentials",
        "follow_up_questions": []
    });
    app.mock_vision_reply(&reply.to_string()).await;

    let response = app.upload("login.png", "image/png", &png_bytes(2048)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["error_title"], "Login failed");
    assert_eq!(body["probable_cause"], "authentication_error");
    assert_eq!(body["error_code"], json!(null));
    assert_eq!(body["product"], json!(null));
    assert_eq!(body["environment"], json!(null));
    assert_eq!(body["key_text_blocks"], json!([]));
    assert_eq!(body["follow_up_questions"], json!([]));
    assert_eq!(app.vision_calls().await, 1);
}
