use std::io::Write;

use asr::{f32_samples_to_bytes, AsrConfig, AsrPipeline, AsrQuery, AsrStreamQuery};
use futures_util::StreamExt;
use httpmock::{Method::GET, Method::POST, MockServer};
use pipeline::PipelineError;
use serde_json::json;

#[tokio::test]
async fn local_recording_is_uploaded() {
    let mut wav = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
    wav.write_all(b"RIFF\x24\x00\x00\x00WAVEfmt samples").unwrap();

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/asr/predict")
                .body_contains("name=\"audio\"")
                .body_contains("name=\"json\"")
                .body_contains("\"sample_rate\":16000")
                .body_contains("WAVEfmt samples");
            then.status(200).json_body(json!({"transcript": "hello there"}));
        })
        .await;

    let asr = AsrPipeline::new(&AsrConfig::new(server.base_url())).unwrap();
    let out = asr
        .predict(&AsrQuery::new(wav.path().to_string_lossy()))
        .await
        .unwrap();
    assert_eq!(out.transcript, "hello there");
    mock.assert_async().await;
}

#[tokio::test]
async fn stream_sends_inline_audio_once() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/asr/stream-predict")
                .body_contains("name=\"audio\"")
                .body_contains("\"audio_data\":\"\"")
                .body_contains("\"is_final\":true");
            then.status(200)
                .body("{\"transcript\":\"hel\"}\n{\"transcript\":\"hello\"}\n");
        })
        .await;

    let config = AsrConfig::new(server.base_url());
    let asr = AsrPipeline::new(&config).unwrap();
    let audio = f32_samples_to_bytes(&[0.0, 0.25, -0.25, 0.5]);
    let mut stream = asr
        .stream_predict(&AsrStreamQuery::new(&config, audio, true))
        .await
        .unwrap();

    let mut transcripts = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        transcripts.push((chunk.seq, chunk.is_final, chunk.payload.transcript));
    }
    assert_eq!(
        transcripts,
        vec![(0, false, "hel".to_string()), (1, true, "hello".to_string())]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn empty_audio_is_rejected_before_sending() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|_, then| {
            then.status(200);
        })
        .await;

    let config = AsrConfig::new(server.base_url());
    let asr = AsrPipeline::new(&config).unwrap();
    let err = asr
        .stream_predict(&AsrStreamQuery::new(&config, Vec::new(), false))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PipelineError::InvalidQuery(_)));
    assert_eq!(any.hits_async().await, 0);
}

#[test]
fn disabled_asr_cannot_be_built() {
    let mut config = AsrConfig::default();
    config.enable = false;
    assert!(matches!(AsrPipeline::new(&config).err(), Some(PipelineError::Config(_))));
}
