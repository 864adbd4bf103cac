use httpmock::{Method::GET, Method::POST, MockServer};
use memory::{InsertRow, MilvusConfig, MilvusInsert, MilvusPipeline, MilvusQuery, PipelineError};
use pipeline::AppStatus;
use serde_json::json;

#[tokio::test]
async fn insert_rows() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/milvus/insert").json_body(json!({
                "collection_name": "chat",
                "texts": [{"id": 1, "text": "I like tea", "subject": "user"}],
                "drop_if_exists": true
            }));
            then.status(200).json_body(json!({"insert_count": 1, "ids": [1]}));
        })
        .await;

    let milvus = MilvusPipeline::new(&MilvusConfig::new(server.base_url())).unwrap();
    let result = milvus
        .insert(&MilvusInsert {
            collection_name: "chat".into(),
            texts: vec![InsertRow {
                id: 1,
                text: "I like tea".into(),
                subject: "user".into(),
            }],
            drop_if_exists: true,
        })
        .await
        .unwrap();
    assert_eq!(result.insert_count, 1);
    assert_eq!(result.ids, vec![1]);
    mock.assert_async().await;
}

#[tokio::test]
async fn search_hits() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/milvus/search")
                .json_body_partial(r#"{"query": "what drink?", "limit": 2}"#);
            then.status(200).json_body(json!({
                "result": [[
                    {"id": 1, "distance": 0.91, "entity": {"text": "I like tea", "subject": "user"}},
                    {"id": 7, "distance": 0.40, "entity": {"text": "It rains", "subject": "user"}}
                ]]
            }));
        })
        .await;

    let milvus = MilvusPipeline::new(&MilvusConfig::new(server.base_url())).unwrap();
    let hits = milvus
        .search(&MilvusQuery::new("chat", "what drink?").limit(2))
        .await
        .unwrap();
    assert_eq!(hits.result[0].len(), 2);
    assert_eq!(hits.result[0][0].field("text"), Some("I like tea"));
}

#[tokio::test]
async fn server_error_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/milvus/search");
            then.status(500).body("collection not loaded");
        })
        .await;

    let milvus = MilvusPipeline::new(&MilvusConfig::new(server.base_url())).unwrap();
    let err = milvus.search(&MilvusQuery::new("chat", "x")).await.unwrap_err();
    assert!(matches!(err, PipelineError::Http { status: 500, .. }));
}

#[tokio::test]
async fn state() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/milvus/state");
            then.status(200).json_body(json!({"state": "running", "msg": ""}));
        })
        .await;

    let milvus = MilvusPipeline::new(&MilvusConfig::new(server.base_url())).unwrap();
    assert_eq!(milvus.check_state().await.state, AppStatus::Running);
}
