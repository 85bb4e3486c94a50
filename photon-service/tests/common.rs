#![allow(dead_code)]

use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

use photon_configuration::AppConfig;
use photon_setup::Application;

pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    _output_root: TempDir,
}

pub async fn setup_test_server() -> Result<TestServer, Box<dyn std::error::Error>> {
    setup_test_server_with(|_| {}).await
}

pub async fn setup_test_server_with(
    configure: impl FnOnce(&mut AppConfig),
) -> Result<TestServer, Box<dyn std::error::Error>> {
    let output_root = tempfile::tempdir()?;
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.service.whisperx.output_root = output_root.path().display().to_string();
    configure(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let app = Application::new(config).await?;
    tokio::spawn(async move {
        let _ = app.serve(listener).await;
    });

    Ok(TestServer {
        base_url,
        client: Client::new(),
        _output_root: output_root,
    })
}

/// 16 kHz mono PCM: `bursts` half-second 440 Hz tones, each followed by `gap_secs` of silence.
pub fn speech_like_wav(bursts: usize, gap_secs: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for _ in 0..bursts {
            for i in 0..8_000 {
                let value = (i as f32 * 440.0 * std::f32::consts::TAU / 16_000.0).sin() * 0.5;
                writer
                    .write_sample((value * i16::MAX as f32) as i16)
                    .expect("sample");
            }
            for _ in 0..(16_000.0 * gap_secs) as usize {
                writer.write_sample(0i16).expect("sample");
            }
        }
        writer.finalize().expect("finalize");
    }
    cursor.into_inner()
}

pub fn base64_wav(bytes: &[u8]) -> String {
    format!(
        "data:audio/wav;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

pub fn base64_text(text: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
}

/// Polls `/whisperx/status` until the job leaves `pending`.
pub async fn wait_for_job(
    server: &TestServer,
    task_id: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    for _ in 0..100 {
        let body: Value = server
            .client
            .get(format!("{}/whisperx/status?task_id={task_id}", server.base_url))
            .send()
            .await?
            .json()
            .await?;
        let status = body["status"].as_str().unwrap_or_default().to_string();
        if status != "pending" {
            return Ok(status);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err("job never finished".into())
}

/// A PDF with one line of Courier text per page.
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

pub fn base64_bytes(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
