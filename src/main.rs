mod common;
mod config;
mod pixelize_service;
mod result_store;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path as UrlPath, Query},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use common::{error_response, ErrorResponse};
use palettize::{
    buffer,
    catalog::{Catalog, Filter, Summary},
    kernel::parse_dithering,
    Kernel, OutputFormat,
};
use pixelize_service::{PixelizeService, PixelizeServiceHandle, RunEvent, RunRequest};
use result_store::ResultStore;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::config::{Config, PixelizeConfig};

struct State {
    catalog: Catalog,
    defaults: PixelizeConfig,
    pixelize_service: PixelizeServiceHandle,
    results: ResultStore,
    /// Held while a run is submitted and its result generation taken, so that generations follow
    /// the order runs supersede each other in.
    submissions: Mutex<()>,
}

impl State {
    /// Submits a run and revokes the results of the previous one. Returns the generation the new
    /// run's results have to be stored under.
    async fn start_run(
        &self,
        request: RunRequest,
    ) -> Result<(u64, mpsc::UnboundedReceiver<RunEvent>), pixelize_service::Error> {
        let _guard = self.submissions.lock().await;
        let events = self.pixelize_service.submit(request).await?;
        Ok((self.results.begin_run(), events))
    }
}

#[derive(Deserialize)]
struct PaletteQuery {
    min_colors: Option<usize>,
    max_colors: Option<usize>,
    name: Option<String>,
}

async fn list_palettes(
    state: Arc<State>,
    Query(query): Query<PaletteQuery>,
) -> Json<Vec<Summary>> {
    let filter = Filter {
        min_colors: query.min_colors,
        max_colors: query.max_colors,
        name: query.name,
    };
    Json(state.catalog.filter(&filter).map(|e| e.summary()).collect())
}

async fn list_kernels() -> Json<Vec<&'static str>> {
    Json(
        std::iter::once("none")
            .chain(Kernel::ALL.iter().map(|k| k.name()))
            .collect(),
    )
}

#[derive(Deserialize)]
struct PixelizeQuery {
    /// Comma-separated palette slugs or names.
    palettes: String,
    kernel: Option<String>,
    factor: Option<u32>,
    upscale: Option<bool>,
    format: Option<String>,
}

#[derive(Serialize)]
struct RunResponse {
    elapsed_secs: f64,
    results: Vec<ResultEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ResultEntry {
    palette: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn service_error(error: pixelize_service::Error) -> ErrorResponse {
    let status = if error.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else if matches!(error, pixelize_service::Error::Superseded) {
        StatusCode::CONFLICT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_response(status, error)
}

async fn pixelize(
    state: Arc<State>,
    Query(query): Query<PixelizeQuery>,
    body: Bytes,
) -> Result<Json<RunResponse>, ErrorResponse> {
    let palettes = state
        .catalog
        .resolve(
            query
                .palettes
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty()),
        )
        .map_err(|e| error_response(StatusCode::NOT_FOUND, e))?;
    let kernel = parse_dithering(query.kernel.as_deref().unwrap_or_default())
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?;
    let format = match query.format.as_deref() {
        Some(format) => format
            .parse::<OutputFormat>()
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?,
        None => state.defaults.default_format,
    };

    let image = tokio::task::spawn_blocking(move || buffer::decode(&body))
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?;
    tracing::debug!(
        "pixelizing {}x{} image with {} palettes",
        image.width(),
        image.height(),
        palettes.len()
    );

    let request = RunRequest {
        image,
        palettes,
        kernel,
        factor: query.factor.unwrap_or(state.defaults.default_factor),
        upscale: query.upscale.unwrap_or(false),
        format,
    };
    let (generation, events) = state.start_run(request).await.map_err(service_error)?;
    let report = pixelize_service::collect(events)
        .await
        .map_err(service_error)?;

    let results = report
        .outcomes
        .into_iter()
        .map(|outcome| {
            let palette = outcome.palette.name().to_owned();
            match outcome.result {
                Ok(encoded) => {
                    let (width, height) = (encoded.width, encoded.height);
                    match state.results.insert(generation, encoded) {
                        Some(id) => ResultEntry {
                            palette,
                            width: Some(width),
                            height: Some(height),
                            url: Some(format!("/results/{id}")),
                            error: None,
                        },
                        None => ResultEntry {
                            palette,
                            width: Some(width),
                            height: Some(height),
                            url: None,
                            error: Some("Result was revoked by a newer run".to_owned()),
                        },
                    }
                }
                Err(error) => ResultEntry {
                    palette,
                    width: None,
                    height: None,
                    url: None,
                    error: Some(error.to_string()),
                },
            }
        })
        .collect();
    tracing::debug!("{} results stored", state.results.len());

    Ok(Json(RunResponse {
        elapsed_secs: report.elapsed.as_secs_f64(),
        results,
        error: report.failure.map(|e| e.to_string()),
    }))
}

async fn get_result(
    state: Arc<State>,
    UrlPath(id): UrlPath<String>,
) -> Result<Response, ErrorResponse> {
    let encoded = state.results.get(&id).ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            "No such result (it may have been replaced by a newer run)",
        )
    })?;

    let mut response = encoded.bytes.clone().into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(encoded.format.mime_type()),
    );
    Ok(response)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    tracing::debug!("loading config from {}", config::PATH);
    let config = std::fs::read_to_string(config::PATH).expect("failed to load config file");
    let config: Config = toml::from_str(&config).expect("config TOML deserialization error");

    let catalog = Catalog::load(&config.catalog.path).expect("cannot load palette catalog");
    tracing::info!(
        "loaded {} palettes from {:?}",
        catalog.len(),
        config.catalog.path
    );

    let pixelize_service = PixelizeService::spawn().expect("cannot start pixelize worker");

    let state = Arc::new(State {
        catalog,
        defaults: config.pixelize,
        pixelize_service,
        results: ResultStore::default(),
        submissions: Mutex::new(()),
    });

    let app = Router::new()
        .route(
            "/palettes",
            get({
                let state = Arc::clone(&state);
                move |query| list_palettes(state, query)
            }),
        )
        .route("/kernels", get(list_kernels))
        .route(
            "/pixelize",
            post({
                let state = Arc::clone(&state);
                move |query, body| pixelize(state, query, body)
            }),
        )
        .route(
            "/results/:id",
            get({
                let state = Arc::clone(&state);
                move |id| get_result(state, id)
            }),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("listening on {addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .expect("failed to start server");
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use palettize::Palette;

    use super::*;

    fn request(palette_count: usize) -> RunRequest {
        let palette = Arc::new(
            Palette::new("bw", vec![[0, 0, 0].into(), [255, 255, 255].into()]).unwrap(),
        );
        RunRequest {
            image: RgbaImage::from_fn(32, 32, |x, y| Rgba([(x * 8) as u8, (y * 8) as u8, 0, 255])),
            palettes: vec![palette; palette_count],
            kernel: Some(Kernel::FloydSteinberg),
            factor: 1,
            upscale: false,
            format: OutputFormat::Png,
        }
    }

    #[tokio::test]
    async fn concurrent_runs_store_under_the_newest_generation() {
        let state = State {
            catalog: Catalog::default(),
            defaults: PixelizeConfig::default(),
            pixelize_service: PixelizeService::spawn().unwrap(),
            results: ResultStore::default(),
            submissions: Mutex::new(()),
        };

        let (a, b) = tokio::join!(state.start_run(request(10)), state.start_run(request(10)));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.0, b.0);
        let ((older, older_events), (newer, newer_events)) = if a.0 < b.0 { (a, b) } else { (b, a) };

        let report = pixelize_service::collect(newer_events).await.unwrap();
        assert_eq!(report.outcomes.len(), 10);
        for outcome in report.outcomes {
            assert!(state.results.insert(newer, outcome.result.unwrap()).is_some());
        }
        assert_eq!(state.results.len(), 10);

        // The older run was either superseded or, if it got to finish, its results are refused.
        if let Ok(report) = pixelize_service::collect(older_events).await {
            for outcome in report.outcomes {
                assert!(state.results.insert(older, outcome.result.unwrap()).is_none());
            }
        }
        assert_eq!(state.results.len(), 10);
    }
}
