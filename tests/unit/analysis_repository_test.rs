// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use errsnap::config::settings::DatabaseSettings;
use errsnap::domain::models::analysis::{
    AnalysisRecord, AnalysisStatus, BoundingBox, ImageMetadata, KeyTextBlock, ProbableCause,
    Severity,
};
use errsnap::domain::repositories::analysis_repository::AnalysisRepository;
use errsnap::infrastructure::database::connection;
use errsnap::infrastructure::repositories::analysis_repo_impl::AnalysisRepositoryImpl;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

async fn setup_repo() -> AnalysisRepositoryImpl {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: None,
        min_connections: None,
        connect_timeout: None,
        idle_timeout: None,
    };
    let db = connection::connect_and_migrate(&settings).await.unwrap();
    AnalysisRepositoryImpl::new(Arc::new(db))
}

fn record(title: &str) -> AnalysisRecord {
    let mut environment = Map::new();
    environment.insert("browser".to_string(), Value::from("Firefox 128"));

    AnalysisRecord {
        analysis_id: Uuid::new_v4(),
        error_title: title.to_string(),
        error_code: Some("403".to_string()),
        product: Some("Billing Portal".to_string()),
        environment: Some(environment),
        key_text_blocks: vec![KeyTextBlock {
            text: "403 Forbidden".to_string(),
            bbox: BoundingBox {
                x: 10.0,
                y: 20.0,
                w: 120.0,
                h: 16.0,
            },
            confidence: 0.8,
        }],
        probable_cause: ProbableCause::PermissionDenied,
        suggested_fix: "Ask an admin to grant billing access.".to_string(),
        severity: Severity::Low,
        confidence: 0.75,
        follow_up_questions: vec!["Which role do you have?".to_string()],
        status: AnalysisStatus::Ok,
        created_at: None,
    }
}

fn metadata() -> ImageMetadata {
    ImageMetadata {
        filename: "forbidden.png".to_string(),
        size_bytes: 4096,
        requester_ip: "198.51.100.20".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
    }
}

#[tokio::test]
async fn test_create_assigns_created_at() {
    let repo = setup_repo().await;
    let original = record("Access denied");

    let stored = repo.create(&original, &metadata()).await.unwrap();

    assert!(stored.created_at.is_some());
    assert_eq!(stored.analysis_id, original.analysis_id);
    assert_eq!(stored.error_title, "Access denied");
}

#[tokio::test]
async fn test_list_recent_restores_full_record() {
    let repo = setup_repo().await;
    let original = record("Access denied");
    repo.create(&original, &metadata()).await.unwrap();

    let listed = repo.list_recent(10).await.unwrap();

    assert_eq!(listed.len(), 1);
    let restored = &listed[0];
    assert_eq!(restored.analysis_id, original.analysis_id);
    assert_eq!(restored.error_code.as_deref(), Some("403"));
    assert_eq!(restored.probable_cause, ProbableCause::PermissionDenied);
    assert_eq!(restored.severity, Severity::Low);
    assert_eq!(restored.status, AnalysisStatus::Ok);
    assert_eq!(restored.key_text_blocks, original.key_text_blocks);
    assert_eq!(restored.follow_up_questions, original.follow_up_questions);
    assert_eq!(
        serde_json::to_value(&restored.environment).unwrap(),
        json!({ "browser": "Firefox 128" })
    );
}

#[tokio::test]
async fn test_list_recent_orders_and_limits() {
    let repo = setup_repo().await;
    let mut ids = Vec::new();
    for title in ["first", "second", "third"] {
        let stored = repo.create(&record(title), &metadata()).await.unwrap();
        ids.push(stored.analysis_id);
    }

    let listed = repo.list_recent(2).await.unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].analysis_id, ids[2]);
    assert_eq!(listed[1].analysis_id, ids[1]);
}

#[tokio::test]
async fn test_optional_fields_stay_absent() {
    let repo = setup_repo().await;
    let sparse = AnalysisRecord {
        error_code: None,
        product: None,
        environment: None,
        key_text_blocks: Vec::new(),
        follow_up_questions: Vec::new(),
        ..record("Unknown Error")
    };
    repo.create(&sparse, &metadata()).await.unwrap();

    let listed = repo.list_recent(1).await.unwrap();

    assert!(listed[0].error_code.is_none());
    assert!(listed[0].product.is_none());
    assert!(listed[0].environment.is_none());
    assert!(listed[0].key_text_blocks.is_empty());
}
