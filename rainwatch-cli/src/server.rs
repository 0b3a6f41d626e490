use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use rainwatch_core::{FileStore, UpdateOutcome, Updater};
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{error, info};

const ATOM_CONTENT_TYPE: &str = "application/atom+xml; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    // Only one update cycle may touch the store at a time.
    updater: Arc<Mutex<Updater>>,
    store: FileStore,
}

impl AppState {
    pub fn new(updater: Updater) -> Self {
        let store = updater.store().clone();
        Self {
            updater: Arc::new(Mutex::new(updater)),
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(feed))
        .route("/update", get(update))
        .with_state(state)
}

pub async fn serve(updater: Updater, addr: SocketAddr, every: Option<u64>) -> anyhow::Result<()> {
    let state = AppState::new(updater);

    if let Some(secs) = every {
        tokio::spawn(periodic(state.clone(), Duration::from_secs(secs.max(1))));
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn periodic(state: AppState, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let updater = state.updater.lock().await;
        if let Err(err) = updater.run(Utc::now(), false).await {
            error!("scheduled update failed: {err:#}");
        }
    }
}

async fn feed(State(state): State<AppState>) -> Response {
    match state.store.load_feed() {
        Ok(Some(document)) => {
            ([(header::CONTENT_TYPE, ATOM_CONTENT_TYPE)], document).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "no feed published yet").into_response(),
        Err(err) => {
            error!("reading feed failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn update(State(state): State<AppState>) -> Response {
    let updater = state.updater.lock().await;
    match updater.run(Utc::now(), false).await {
        Ok(UpdateOutcome::Closed(hours)) => hours.into_response(),
        Ok(UpdateOutcome::Skipped(_)) => "skipped".into_response(),
        Ok(UpdateOutcome::Published(_)) => "updated".into_response(),
        Err(err) => {
            error!("update failed: {err:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use rainwatch_core::{Config, RainProvider, RawReading, ServiceWindow};
    use tower::ServiceExt;

    #[derive(Debug)]
    struct DryProvider;

    #[async_trait]
    impl RainProvider for DryProvider {
        async fn fetch(&self) -> anyhow::Result<Vec<RawReading>> {
            Ok(vec![RawReading {
                kind: "observation".into(),
                timestamp: Some(Utc::now().timestamp()),
                rainfall: Some(0.0),
            }])
        }
    }

    fn state(dir: &std::path::Path) -> AppState {
        // Window covering the whole day so the test does not depend on the clock.
        let config = Config {
            window: ServiceWindow {
                open_hour: 0,
                close_hour: 23,
                ..ServiceWindow::default()
            },
            ..Config::default()
        };
        AppState::new(Updater::new(Box::new(DryProvider), FileStore::new(dir), config))
    }

    async fn request(app: Router, uri: &str) -> (StatusCode, String) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn feed_is_missing_before_first_update() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = request(router(state(dir.path())), "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_then_feed() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path()));

        let (status, body) = request(app.clone(), "/update").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "updated");

        let (status, body) = request(app.clone(), "/update").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "skipped");

        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], ATOM_CONTENT_TYPE);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("it is not currently raining"));
    }
}
