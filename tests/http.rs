// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
mod common;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{http::header, test, web, App};
use anyhow::anyhow;
use common::*;
use nearmiss_rs::input::FrameSource;
use nearmiss_rs::server::{configure, path_source_factory, spawn_session, AppState};
use nearmiss_rs::stream::{StreamingPipeline, CONTENT_TYPE};

fn state(source: PathBuf, recorder: &Recorder) -> AppState {
    let backend = Scripted::repeating(output(vec![row(20.0, 20.0, 10.0, 10.0, 0.9, 1)]));
    AppState {
        sources: path_source_factory(source),
        ctx: context(backend, recorder),
    }
}

#[actix_web::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(dir.path().to_path_buf(), &Recorder::default())))
            .configure(configure),
    )
    .await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert!(resp.status().is_success());
    assert_eq!(test::read_body(resp).await, "ok");
}

#[actix_web::test]
async fn video_feed_streams_multipart_until_source_ends() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), 2);
    let recorder = Recorder::default();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(dir.path().to_path_buf(), &recorder)))
            .configure(configure),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/video_feed").to_request()).await;
    assert!(resp.status().is_success());
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), CONTENT_TYPE);
    assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");

    let body = test::read_body(resp).await;
    assert_eq!(payloads(&body).len(), 2);
    assert_eq!(recorder.frames.lock().unwrap().len(), 2);
}

#[actix_web::test]
async fn each_request_gets_a_fresh_source() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), 1);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(dir.path().to_path_buf(), &Recorder::default())))
            .configure(configure),
    )
    .await;

    for _ in 0..2 {
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/video_feed").to_request()).await;
        let body = test::read_body(resp).await;
        assert_eq!(payloads(&body).len(), 1);
    }
}

#[actix_web::test]
async fn unavailable_source_is_a_service_error() {
    let recorder = Recorder::default();
    let mut st = state(PathBuf::from("unused"), &recorder);
    st.sources = Arc::new(|| -> anyhow::Result<Box<dyn FrameSource>> {
        Err(anyhow!("camera unplugged"))
    });
    let app = test::init_service(App::new().app_data(web::Data::new(st)).configure(configure)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/video_feed").to_request()).await;
    assert_eq!(resp.status().as_u16(), 503);
}

#[actix_web::test]
async fn session_error_just_ends_the_body() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), 3);
    let recorder = Recorder::default();
    let good = output(vec![row(20.0, 20.0, 10.0, 10.0, 0.9, 1)]);
    let backend = Scripted::repeating(good.clone())
        .then(good)
        .then(output(vec![vec![f32::NAN; 5 + CLASSES]]));
    let st = AppState {
        sources: path_source_factory(dir.path().to_path_buf()),
        ctx: context(backend, &recorder),
    };
    let app = test::init_service(App::new().app_data(web::Data::new(st)).configure(configure)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/video_feed").to_request()).await;
    let body = test::read_body(resp).await;
    assert_eq!(payloads(&body).len(), 1);
}

#[::core::prelude::v1::test]
fn client_disconnect_releases_the_source() {
    let (source, released) = Endless::new();
    let recorder = Recorder::default();
    let backend = Scripted::repeating(output(vec![row(20.0, 20.0, 10.0, 10.0, 0.9, 1)]));
    let pipeline = StreamingPipeline::new(Box::new(source), context(backend, &recorder));

    let mut rx = spawn_session(pipeline).unwrap();
    let first = rx.blocking_recv().unwrap().unwrap();
    assert_eq!(payloads(&first).len(), 1);
    assert!(!released.load(Ordering::SeqCst));

    drop(rx);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !released.load(Ordering::SeqCst) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(released.load(Ordering::SeqCst), "source still held after disconnect");
}
