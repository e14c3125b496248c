use std::time::Duration;

use crate::fixtures::test_app::{TestApp, file_part};
use futures::StreamExt;
use reqwest::multipart::Form;
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[tokio::test]
async fn observers_receive_job_logs_and_progress() {
    let app = TestApp::spawn().await;

    let (mut socket, _) = connect_async(app.ws_url("/ws/logs")).await.unwrap();
    app.wait_for_observers(1).await;

    let form = Form::new().part("file", file_part("talk.mp3", b"audio"));
    let resp = app.post_form("/api/transcribe", form).await;
    assert_eq!(resp.status().as_u16(), 200);

    let mut events = Vec::new();
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for hub events")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            let event: Value = serde_json::from_str(text.as_str()).unwrap();
            let done = event["message"] == "Transcription complete: talk.mp3";
            events.push(event);
            if done {
                break;
            }
        }
    }

    assert_eq!(events[0]["type"], "status");
    assert_eq!(events[0]["state"], "received");
    assert!(events.iter().any(|e| e["message"] == "Received: talk.mp3"));
    let progress: Vec<&Value> = events.iter().filter(|e| e["type"] == "progress").collect();
    let (last, earlier) = progress.split_last().expect("no progress events");
    assert_eq!(last["percent"], 100);
    assert!(earlier.iter().all(|e| e["percent"].as_u64().unwrap() < 100));
    assert!(
        progress
            .windows(2)
            .all(|w| w[0]["current"].as_f64().unwrap() <= w[1]["current"].as_f64().unwrap())
    );
    assert!(events.iter().any(|e| e["type"] == "status" && e["state"] == "succeeded"));
    assert_eq!(events.last().unwrap()["color"], "green");
}

#[tokio::test]
async fn batch_progress_completes_after_the_last_file() {
    let app = TestApp::spawn().await;

    let (mut socket, _) = connect_async(app.ws_url("/ws/logs")).await.unwrap();
    app.wait_for_observers(1).await;

    let form = Form::new()
        .part("files", file_part("one.mp3", b"1"))
        .part("files", file_part("two.wav", b"2"));
    let resp = app.post_form("/api/transcribe-batch", form).await;
    assert_eq!(resp.status().as_u16(), 200);

    let mut progress = Vec::new();
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for hub events")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            let event: Value = serde_json::from_str(text.as_str()).unwrap();
            if event["type"] == "progress" {
                progress.push((event["current"].as_f64().unwrap(), event["percent"].as_u64().unwrap()));
            }
            if event["message"].as_str().is_some_and(|m| m.starts_with("Done.")) {
                break;
            }
        }
    }

    assert_eq!(progress, vec![(0.0, 0), (1.0, 50), (2.0, 100)]);
}

#[tokio::test]
async fn disconnected_observer_is_dropped() {
    let app = TestApp::spawn().await;

    let (socket, _) = connect_async(app.ws_url("/ws/logs")).await.unwrap();
    app.wait_for_observers(1).await;
    drop(socket);

    for _ in 0..200 {
        if app.state.hub.subscriber_count() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("observer was never removed");
}
