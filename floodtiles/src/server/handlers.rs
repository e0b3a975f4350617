//! The request router's single route: serves precomputed bytes with content negotiation, falling
//! back to runtime mosaicking when no precomputed variant exists.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use floodtiles_core::{MAX_ZOOM, TargetCompression, TileCompression, TileError, TileId, quantize_raster};
use floodtiles_mosaic::mosaic_tile;
use serde_json::json;

use super::state::AppState;

/// `GET /tiles/elevation/{z}/{x}/{yfile}`, where `yfile` is `{y}.u16` — the compression variant is
/// negotiated from `Accept-Encoding`, not the URL, so the same URL serves every client.
pub async fn get_tile(State(state): State<AppState>, Path((z, x, yfile)): Path<(u8, u32, String)>, headers: HeaderMap) -> Response {
	let Some(y) = parse_yfile(&yfile) else {
		return invalid_request("y component must look like `{y}.u16`");
	};

	let tile_id = TileId::new(z, x, y);
	if z > MAX_ZOOM || !tile_id.is_valid() {
		return invalid_request(&format!("tile z={z} x={x} y={y} is out of range"));
	}

	let accept_encoding = headers.get(header::ACCEPT_ENCODING).and_then(|v| v.to_str().ok()).unwrap_or("");
	let target = TargetCompression::from_accept_encoding(accept_encoding);
	let allowed: Vec<TileCompression> = target.compressions.iter().collect();

	if let Some((bytes, compression)) = state.tile_tree.read_best(z, x, y, &allowed) {
		return precomputed_response(bytes, compression);
	}

	let deadline = Duration::from_secs(state.config.request_timeout_secs);
	let mosaic = match tokio::time::timeout(deadline, mosaic_tile(&state.cache, &state.config.source_dir, state.config.dem_version, z, x, y)).await {
		Ok(mosaic) => mosaic,
		Err(_) => return deadline_exceeded(),
	};

	let payload = quantize_raster(&mosaic.samples);

	if state.config.write_through {
		let tile_tree = Arc::clone(&state.tile_tree);
		let payload_for_write = payload.clone();
		tokio::spawn(async move {
			if let Err(err) = tokio::task::spawn_blocking(move || tile_tree.write_variant(z, x, y, TileCompression::Uncompressed, &payload_for_write)).await {
				log::warn!("write-through task for z={z} x={x} y={y} panicked: {err}");
			}
		});
	}

	runtime_response(payload, target.best_available())
}

fn parse_yfile(yfile: &str) -> Option<u32> {
	yfile.strip_suffix(".u16")?.parse().ok()
}

fn precomputed_response(bytes: Vec<u8>, compression: TileCompression) -> Response {
	let mut response = (StatusCode::OK, bytes).into_response();
	apply_encoding_headers(response.headers_mut(), compression);
	response.headers_mut().insert(
		header::CACHE_CONTROL,
		HeaderValue::from_static("public, max-age=31536000, immutable"),
	);
	response
}

/// Freshly mosaiced tiles get a short TTL rather than the immutable one precomputed tiles carry:
/// the generator may fill this tile in later with a result from a more complete DEM corpus.
fn runtime_response(payload: Vec<u8>, compression: TileCompression) -> Response {
	let encoded = match compression {
		TileCompression::Brotli => floodtiles_core::compress_brotli(&payload.into()),
		TileCompression::Gzip => floodtiles_core::compress_gzip(&payload.into()),
		TileCompression::Uncompressed => Ok(payload.into()),
	};
	let Ok(blob) = encoded else {
		return internal_error("failed to encode tile response");
	};
	let mut response = (StatusCode::OK, blob.into_vec()).into_response();
	apply_encoding_headers(response.headers_mut(), compression);
	response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=60"));
	response
}

fn apply_encoding_headers(headers: &mut HeaderMap, compression: TileCompression) {
	headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
	headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
	if let Some(encoding) = compression.content_encoding() {
		headers.insert(header::CONTENT_ENCODING, HeaderValue::from_str(encoding).unwrap());
	}
}

fn invalid_request(message: &str) -> Response {
	error_response(TileError::InvalidRequest(message.to_string()))
}

fn internal_error(message: &str) -> Response {
	error_response(TileError::IoFailure(message.to_string()))
}

fn deadline_exceeded() -> Response {
	let err = TileError::DeadlineExceeded;
	let mut response = error_response(err);
	response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from_static("5"));
	response
}

fn error_response(err: TileError) -> Response {
	let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
	(status, Json(json!({ "code": err.status_code(), "message": err.to_string() }))).into_response()
}
