use std::net::SocketAddr;
use std::time::Duration;

use dispatch::{DispatchConfig, Dispatcher};
use serde_json::json;

async fn start_server() -> SocketAddr {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = DispatchConfig::default().with_recordings_dir(tmp.into_path());
    let app = dispatch::router(Dispatcher::new(config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

#[tokio::test]
async fn liveness_route_responds() {
    let addr = start_server().await;
    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "I work uwu");
}

#[tokio::test]
async fn create_session_then_get_active_sessions() {
    let addr = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{addr}/create_session"))
        .query(&[("session_id", "alpha")])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    let resp = client
        .get(format!("http://{addr}/get_active_sessions"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["active_sessions"], json!(["alpha"]));
}

#[tokio::test]
async fn create_session_without_id_is_bad_request() {
    let addr = start_server().await;
    let resp = reqwest::get(format!("http://{addr}/create_session")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_session_on_end_session_is_not_found() {
    let addr = start_server().await;
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/end_session"))
        .query(&[("session_id", "missing")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

fn sine_wave_wav(sample_rate: u32, seconds: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).unwrap();
        let frames = (sample_rate as f32 * seconds) as u32;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let sample = (t * 440.0 * std::f32::consts::TAU).sin() * 8_000.0;
            writer.write_sample(sample as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf.into_inner()
}

#[tokio::test]
async fn submit_audio_file_rejects_wrong_sample_rate() {
    let addr = start_server().await;
    let client = reqwest::Client::new();

    let wav = sine_wave_wav(8_000, 0.1);
    let part = reqwest::multipart::Part::bytes(wav).file_name("clip.wav");
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = client
        .post(format!("http://{addr}/submit_audio_file"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submit_audio_file_accepts_16khz_wav() {
    let addr = start_server().await;
    let client = reqwest::Client::new();

    let wav = sine_wave_wav(16_000, 0.2);
    let part = reqwest::multipart::Part::bytes(wav).file_name("clip.wav");
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = client
        .post(format!("http://{addr}/submit_audio_file"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["session_id"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn submit_audio_chunk_then_read_back_text_chunk_versions() {
    let addr = start_server().await;
    let client = reqwest::Client::new();

    client
        .get(format!("http://{addr}/create_session"))
        .query(&[("session_id", "beta")])
        .send()
        .await
        .unwrap();

    let chunk: serde_json::Value = json!({"0": 1000, "1": -500});
    let resp = client
        .post(format!("http://{addr}/submit_audio_chunk"))
        .query(&[("session_id", "beta")])
        .json(&json!({"timestamp": 0, "chunk": chunk}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let resp = client
        .get(format!("http://{addr}/get_latest_text_chunk_versions"))
        .query(&[("session_id", "beta"), ("language", "cs")])
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["versions"], json!({}));
}
