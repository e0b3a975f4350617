//! The HTTP request router: an async entry point binding a `TcpListener`, an `axum::Router` built
//! from a small set of routes, and an `AppState` cloned into every handler.

mod handlers;
mod state;

pub use state::AppState;

use crate::cli::ServeArgs;
use anyhow::{Context, Result};
use axum::error_handling::HandleErrorLayer;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{BoxError, Router};
use floodtiles_core::Config;
use floodtiles_store::{DecompressedArrayCache, TileTree};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower::limit::ConcurrencyLimitLayer;
use tower::load_shed::LoadShedLayer;
use tower::timeout::TimeoutLayer;
use tower_http::catch_panic::CatchPanicLayer;

pub fn run(args: &ServeArgs) -> Result<()> {
	let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
	rt.block_on(run_async(args))
}

async fn run_async(args: &ServeArgs) -> Result<()> {
	let config = build_config(args)?;
	let addr = bind_addr(&config, args)?;

	let state = AppState {
		cache: Arc::new(DecompressedArrayCache::new(
			config.cache_budget_bytes,
			config.source_dir.clone(),
			config.dem_version,
			config.preload_workers,
		)),
		tile_tree: Arc::new(TileTree::new(config.tile_root.clone())),
		config: Arc::new(config),
	};

	let router = build_router(state);
	let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
	log::info!("listening on http://{addr}");

	axum::serve(listener, router)
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("serving")
}

fn build_config(args: &ServeArgs) -> Result<Config> {
	let mut config = Config::load(args.config.as_deref())?;
	if let Some(dir) = &args.source_dir {
		config.source_dir = dir.clone();
	}
	if let Some(dir) = &args.tile_root {
		config.tile_root = dir.clone();
	}
	if args.write_through {
		config.write_through = true;
	}
	Ok(config)
}

fn bind_addr(config: &Config, args: &ServeArgs) -> Result<SocketAddr> {
	if args.ip.is_none() && args.port.is_none() {
		return config.bind_addr.parse().with_context(|| format!("parsing bind_addr '{}'", config.bind_addr));
	}
	let configured: SocketAddr = config.bind_addr.parse().with_context(|| format!("parsing bind_addr '{}'", config.bind_addr))?;
	let ip = match &args.ip {
		Some(ip) => ip.parse().with_context(|| format!("parsing --ip '{ip}'"))?,
		None => configured.ip(),
	};
	let port = args.port.unwrap_or_else(|| configured.port());
	Ok(SocketAddr::new(ip, port))
}

/// Builds the router and its protection stack (innermost to outermost: `LoadShed` ->
/// `ConcurrencyLimit` -> `Timeout` -> `CatchPanic` -> `HandleError`). The concurrency cap reuses
/// `config.max_tasks_inflight` rather than a second hardcoded constant, since the same number
/// already bounds the generator's in-flight work — resource ceilings apply uniformly across both
/// tools.
fn build_router(state: AppState) -> Router {
	let request_timeout = Duration::from_secs(state.config.request_timeout_secs);
	let concurrency_limit = state.config.max_tasks_inflight;

	let overload_handler = HandleErrorLayer::new(|_err: BoxError| async move {
		let mut response = (StatusCode::SERVICE_UNAVAILABLE, "tile server overloaded, try later").into_response();
		response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from_static("2"));
		Ok::<_, std::convert::Infallible>(response)
	});

	let protection = ServiceBuilder::new()
		.layer(overload_handler)
		.layer(CatchPanicLayer::new())
		.layer(TimeoutLayer::new(request_timeout))
		.layer(ConcurrencyLimitLayer::new(concurrency_limit))
		.layer(LoadShedLayer::new());

	Router::new()
		.route("/tiles/elevation/{z}/{x}/{yfile}", get(handlers::get_tile))
		.with_state(state)
		.layer(protection)
}

async fn shutdown_signal() {
	let ctrl_c = async {
		tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
			.expect("failed to install SIGTERM handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
	log::info!("shutting down");
}

#[cfg(test)]
mod router_tests {
	use super::*;
	use axum::body::{Body, to_bytes};
	use axum::http::Request;
	use tower::ServiceExt;

	fn test_state(source_dir: std::path::PathBuf, tile_root: std::path::PathBuf) -> AppState {
		let mut config = Config::default();
		config.source_dir = source_dir.clone();
		config.tile_root = tile_root.clone();
		config.request_timeout_secs = 5;
		AppState {
			cache: Arc::new(DecompressedArrayCache::new(
				config.cache_budget_bytes,
				source_dir,
				config.dem_version,
				config.preload_workers,
			)),
			tile_tree: Arc::new(TileTree::new(tile_root)),
			config: Arc::new(config),
		}
	}

	#[tokio::test]
	async fn out_of_range_tile_is_rejected_with_400() {
		let source = tempfile::tempdir().unwrap();
		let tiles = tempfile::tempdir().unwrap();
		let router = build_router(test_state(source.path().to_path_buf(), tiles.path().to_path_buf()));

		let response = router
			.oneshot(Request::builder().uri("/tiles/elevation/30/0/0.u16").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn ocean_tile_with_no_dem_coverage_returns_all_nodata_tile() {
		let source = tempfile::tempdir().unwrap();
		let tiles = tempfile::tempdir().unwrap();
		let router = build_router(test_state(source.path().to_path_buf(), tiles.path().to_path_buf()));

		let response = router
			.oneshot(Request::builder().uri("/tiles/elevation/8/0/0.u16").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		assert_eq!(body.len(), 256 * 256 * 2);
	}

	#[tokio::test]
	async fn precomputed_tile_is_served_with_immutable_cache_control() {
		let source = tempfile::tempdir().unwrap();
		let tiles = tempfile::tempdir().unwrap();
		let state = test_state(source.path().to_path_buf(), tiles.path().to_path_buf());
		state.tile_tree.write_variant(9, 150, 200, floodtiles_core::TileCompression::Uncompressed, &[0u8; 256 * 256 * 2]).unwrap();
		let router = build_router(state);

		let response = router
			.oneshot(Request::builder().uri("/tiles/elevation/9/150/200.u16").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let cache_control = response.headers().get(header::CACHE_CONTROL).unwrap().to_str().unwrap();
		assert!(cache_control.contains("immutable"));
	}

	#[tokio::test]
	async fn malformed_y_component_is_rejected() {
		let source = tempfile::tempdir().unwrap();
		let tiles = tempfile::tempdir().unwrap();
		let router = build_router(test_state(source.path().to_path_buf(), tiles.path().to_path_buf()));

		let response = router
			.oneshot(Request::builder().uri("/tiles/elevation/9/150/not-a-number.u16").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use floodtiles_core::Config;

	#[test]
	fn explicit_ip_overrides_configured_port() {
		let mut config = Config::default();
		config.bind_addr = "0.0.0.0:8080".to_string();
		let args = ServeArgs {
			config: None,
			ip: Some("127.0.0.1".to_string()),
			port: None,
			source_dir: None,
			tile_root: None,
			write_through: false,
		};
		let addr = bind_addr(&config, &args).unwrap();
		assert_eq!(addr.to_string(), "127.0.0.1:8080");
	}

	#[test]
	fn explicit_port_overrides_configured_ip() {
		let mut config = Config::default();
		config.bind_addr = "0.0.0.0:8080".to_string();
		let args = ServeArgs {
			config: None,
			ip: None,
			port: Some(9090),
			source_dir: None,
			tile_root: None,
			write_through: false,
		};
		let addr = bind_addr(&config, &args).unwrap();
		assert_eq!(addr.to_string(), "0.0.0.0:9090");
	}

	#[test]
	fn no_overrides_uses_configured_bind_addr() {
		let mut config = Config::default();
		config.bind_addr = "0.0.0.0:8080".to_string();
		let args = ServeArgs {
			config: None,
			ip: None,
			port: None,
			source_dir: None,
			tile_root: None,
			write_through: false,
		};
		let addr = bind_addr(&config, &args).unwrap();
		assert_eq!(addr.to_string(), "0.0.0.0:8080");
	}
}
