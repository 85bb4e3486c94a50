mod common;

use serde_json::{json, Value};

use common::{base64_wav, setup_test_server, setup_test_server_with, speech_like_wav, TestServer};

const VCTK: &str = "tts_models/en/vctk/vits";
const LJSPEECH: &str = "tts_models/en/ljspeech/vits";
const XTTS: &str = "tts_models/multilingual/multi-dataset/xtts_v1";

async fn all_models_server() -> Result<TestServer, Box<dyn std::error::Error>> {
    setup_test_server_with(|config| {
        config.service.tts.preload_models = format!("{LJSPEECH},{XTTS}");
    })
    .await
}

async fn post_tts(server: &TestServer, body: Value) -> Result<reqwest::Response, reqwest::Error> {
    server
        .client
        .post(format!("{}/tts/tts", server.base_url))
        .json(&body)
        .send()
        .await
}

#[tokio::test]
async fn only_configured_models_are_listed() -> Result<(), Box<dyn std::error::Error>> {
    let server = setup_test_server().await?;
    let models: Vec<String> = server
        .client
        .get(format!("{}/tts/models", server.base_url))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(models, vec![VCTK.to_string()]);

    let server = all_models_server().await?;
    let models: Vec<String> = server
        .client
        .get(format!("{}/tts/models", server.base_url))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(models.len(), 3);
    Ok(())
}

#[tokio::test]
async fn languages_and_speakers_follow_the_model() -> Result<(), Box<dyn std::error::Error>> {
    let server = all_models_server().await?;

    let speakers: Vec<String> = server
        .client
        .get(format!("{}/tts/speakers", server.base_url))
        .send()
        .await?
        .json()
        .await?;
    assert!(speakers.contains(&"p225".to_string()));

    let languages: Vec<String> = server
        .client
        .get(format!("{}/tts/languages?model={XTTS}", server.base_url))
        .send()
        .await?
        .json()
        .await?;
    assert!(languages.contains(&"fr".to_string()));

    let languages: Vec<String> = server
        .client
        .get(format!("{}/tts/languages?model={LJSPEECH}", server.base_url))
        .send()
        .await?
        .json()
        .await?;
    assert!(languages.is_empty());

    let response = server
        .client
        .get(format!("{}/tts/speakers?model=tts_models/xx/none", server.base_url))
        .send()
        .await?;
    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
async fn synthesizes_wav_audio() -> Result<(), Box<dyn std::error::Error>> {
    let server = setup_test_server().await?;

    let response = post_tts(&server, json!({ "text": "hello there", "speaker": "p226" })).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("audio/wav")
    );
    let bytes = response.bytes().await?;
    assert_eq!(&bytes[..4], b"RIFF");
    assert!(bytes.len() > 44);
    Ok(())
}

#[tokio::test]
async fn speaker_and_language_rules_are_enforced() -> Result<(), Box<dyn std::error::Error>> {
    let server = all_models_server().await?;

    let response = post_tts(&server, json!({ "text": "hi" })).await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Model is multi-speaker"));

    let response = post_tts(
        &server,
        json!({ "text": "hi", "model": LJSPEECH, "speaker": "p225" }),
    )
    .await?;
    assert_eq!(response.status(), 400);

    let response = post_tts(&server, json!({ "text": "hi", "model": LJSPEECH, "language": "en" })).await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(
        body["error"],
        "Model is not multi-lingual, you should not pass in language."
    );

    let response = post_tts(&server, json!({ "text": "hi", "speaker": "nobody" })).await?;
    assert_eq!(response.status(), 400);

    let response = post_tts(&server, json!({ "text": "hi", "model": "tts_models/xx/none" })).await?;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Model tts_models/xx/none not loaded.");

    let response = post_tts(&server, json!({ "text": "", "model": LJSPEECH })).await?;
    assert_eq!(response.status(), 400);
    Ok(())
}

#[tokio::test]
async fn voice_cloning_needs_a_reference() -> Result<(), Box<dyn std::error::Error>> {
    let server = all_models_server().await?;

    let response = post_tts(
        &server,
        json!({ "text": "bonjour", "model": XTTS, "language": "fr" }),
    )
    .await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Speaker wav file is not provided."));

    let response = post_tts(
        &server,
        json!({
            "text": "bonjour",
            "model": XTTS,
            "language": "fr",
            "speaker_wav": base64_wav(&speech_like_wav(1, 0.1))
        }),
    )
    .await?;
    assert_eq!(response.status(), 200);
    assert_eq!(&response.bytes().await?[..4], b"RIFF");
    Ok(())
}
