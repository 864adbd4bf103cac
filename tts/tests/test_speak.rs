use httpmock::{Method::POST, MockServer};
use pipeline::AudioFormat;
use tts::{PipelineError, TtsConfig, TtsPipeline, TtsQuery};

mod mock_tts_server;
use mock_tts_server::spawn_mock_tts;

const WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt \x10\x00\x00\x00";
const OGG: &[u8] = b"OggS\x00\x02\x00\x00\x00\x00";

#[tokio::test]
async fn predict_sniffs_wav() {
    let (url, shutdown) = spawn_mock_tts(WAV, vec![]).await;
    let tts = TtsPipeline::new(&TtsConfig::new(&url)).unwrap();
    let out = tts.predict(&TtsQuery::new("hello", "refs/a.wav")).await.unwrap();
    assert_eq!(out.audio_type, AudioFormat::Wav);
    assert_eq!(out.wave_data, WAV);
    let _ = shutdown.send(()).await;
}

#[tokio::test]
async fn every_streamed_segment_is_sniffed() {
    let (url, shutdown) = spawn_mock_tts(WAV, vec![WAV, OGG]).await;
    let tts = TtsPipeline::new(&TtsConfig::new(&url)).unwrap();
    let segments = tts
        .synthesize_all(&TtsQuery::new("one. two.", "refs/a.wav"))
        .await
        .unwrap();
    let formats: Vec<_> = segments.iter().map(|s| s.audio_type).collect();
    assert_eq!(formats, vec![AudioFormat::Wav, AudioFormat::Ogg]);
    let _ = shutdown.send(()).await;
}

#[tokio::test]
async fn unknown_container_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/tts/predict");
            then.status(200).body(b"ID3\x04\x00mp3 frames".as_slice());
        })
        .await;

    let tts = TtsPipeline::new(&TtsConfig::new(server.base_url())).unwrap();
    let err = tts.predict(&TtsQuery::new("hello", "refs/a.wav")).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn request_is_json() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/tts/predict")
                .header("content-type", "application/json")
                .json_body_partial(
                    r#"{"text": "hello", "refer_wav_path": "refs/a.wav", "text_language": "en"}"#,
                );
            then.status(200).body(OGG);
        })
        .await;

    let tts = TtsPipeline::new(&TtsConfig::new(server.base_url())).unwrap();
    let out = tts
        .predict(&TtsQuery::new("hello", "refs/a.wav").language("en"))
        .await
        .unwrap();
    assert_eq!(out.audio_type, AudioFormat::Ogg);
    mock.assert_async().await;
}

#[tokio::test]
async fn local_reference_is_sent_absolute() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("speaker.wav");
    std::fs::write(&wav, b"RIFF\0\0\0\0WAVE").unwrap();
    let absolute = std::fs::canonicalize(&wav).unwrap();

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/tts/predict")
                .json_body_partial(
                    serde_json::json!({ "refer_wav_path": absolute.to_string_lossy() })
                        .to_string(),
                );
            then.status(200).body(OGG);
        })
        .await;

    let tts = TtsPipeline::new(&TtsConfig::new(server.base_url())).unwrap();
    let query = TtsQuery::new("hello", wav.to_string_lossy());
    tts.predict(&query).await.unwrap();
    mock.assert_async().await;
}
