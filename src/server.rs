// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! HTTP 推流服务
//!
//! `GET /video_feed` 为每个客户端启动独立会话: 新的帧来源 + 独立状态,
//! 推理后端全局共享。会话在专用线程上运行, 经容量为 1 的通道把分帧
//! 交给响应流; 客户端断开后通道关闭, 线程退出并释放帧来源。

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{
    http::header,
    web::{self, Bytes},
    App, HttpResponse, HttpServer,
};
use anyhow::{Context, Result};
use async_stream::stream;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::input::{open_source, FrameSource};
use crate::stream::{StreamContext, StreamingPipeline, CONTENT_TYPE};

/// Opens a fresh frame source for each stream session.
pub type SourceFactory = Arc<dyn Fn() -> Result<Box<dyn FrameSource>> + Send + Sync>;

pub fn path_source_factory(path: PathBuf) -> SourceFactory {
    Arc::new(move || open_source(&path))
}

/// Shared state behind the handlers.
#[derive(Clone)]
pub struct AppState {
    pub sources: SourceFactory,
    pub ctx: StreamContext,
}

/// Route table, shared by [`run`] and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/video_feed", web::get().to(video_feed))
        .route("/health", web::get().to(health));
}

/// Serve until the process is stopped.
pub fn run(state: AppState, bind: IpAddr, port: u16) -> Result<()> {
    let data = web::Data::new(state);
    actix_web::rt::System::new()
        .block_on(async move {
            let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
                .bind((bind, port))?
                .run();
            info!(%bind, port, "serving /video_feed");
            server.await
        })
        .with_context(|| format!("HTTP server on {}:{} failed", bind, port))
}

type Part = Result<Vec<u8>>;

/// Drive one pipeline on its own thread. Returns the receiving end of the
/// capacity-1 part channel; dropping it stops the session.
pub fn spawn_session(pipeline: StreamingPipeline) -> Result<mpsc::Receiver<Part>> {
    let (tx, rx) = mpsc::channel::<Part>(1);
    std::thread::Builder::new()
        .name(String::from("stream-session"))
        .spawn(move || {
            let mut pipeline = pipeline;
            let mut sent = 0u64;
            for item in pipeline.by_ref() {
                let failed = item.is_err();
                if tx.blocking_send(item).is_err() {
                    info!(frames = sent, "client disconnected");
                    break;
                }
                sent += 1;
                if failed {
                    break;
                }
            }
            pipeline.close();
        })
        .context("failed to spawn stream session thread")?;
    Ok(rx)
}

async fn video_feed(state: web::Data<AppState>) -> HttpResponse {
    // directory scans and decoder start-up block; keep them off the worker
    let sources = state.sources.clone();
    let source = match web::block(move || sources()).await {
        Ok(Ok(source)) => source,
        Ok(Err(e)) => {
            error!(error = %e, "cannot open frame source");
            return HttpResponse::ServiceUnavailable().body(format!("frame source unavailable: {:#}", e));
        }
        Err(e) => {
            error!(error = %e, "frame source task failed");
            return HttpResponse::InternalServerError().finish();
        }
    };
    let pipeline = StreamingPipeline::new(source, state.ctx.clone());
    let mut rx = match spawn_session(pipeline) {
        Ok(rx) => rx,
        Err(e) => {
            error!(error = %e, "cannot start stream session");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let body = stream! {
        while let Some(item) = rx.recv().await {
            match item {
                Ok(part) => yield Ok::<Bytes, actix_web::Error>(Bytes::from(part)),
                Err(e) => {
                    // the multipart body just ends; no error part on the wire
                    warn!(error = %format!("{:#}", e), "stream session ended with an error");
                    break;
                }
            }
        }
    };

    HttpResponse::Ok()
        .append_header((header::CACHE_CONTROL, "no-cache"))
        .content_type(CONTENT_TYPE)
        .streaming(body)
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("ok")
}
