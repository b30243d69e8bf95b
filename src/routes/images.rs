use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt as _;
use sha2::{Digest, Sha256};

use super::AppState;
use crate::auth::Auth;
use crate::error::ApiError;
use crate::storage::ImageStoreError;

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ImageUploadResponse {
    pub hash: String,
    pub mime: String,
    pub size: usize,
    pub duplicate: bool, // same bytes were already stored
}

const IMAGE_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[utoipa::path(
    post,
    path = "/api/images/",
    responses(
        (status = 201, description = "Image stored", body = ImageUploadResponse),
        (status = 200, description = "Image already stored", body = ImageUploadResponse),
        (status = 400, description = "No `file` field"),
        (status = 413, description = "Larger than 10 MB"),
        (status = 415, description = "Not an image")
    )
)]
pub async fn upload_image(auth: Auth, data: web::Data<AppState>, mut payload: Multipart) -> Result<HttpResponse, ApiError> {
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::warn!("multipart error: {e}");
        ApiError::BadRequest
    })? {
        if field.content_disposition().get_name() != Some("file") {
            continue;
        }
        let mut bytes: Vec<u8> = Vec::new();
        let mut hasher = Sha256::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::warn!("multipart read error: {e}");
            ApiError::BadRequest
        })? {
            if bytes.len() + chunk.len() > IMAGE_SIZE_LIMIT {
                return Err(ApiError::PayloadTooLarge);
            }
            hasher.update(&chunk);
            bytes.extend_from_slice(&chunk);
        }
        let hash = format!("{:x}", hasher.finalize());
        let mime = infer::get(&bytes).map(|t| t.mime_type()).unwrap_or("application/octet-stream");
        if !ALLOWED_MIME.contains(&mime) {
            return Err(ApiError::UnsupportedMediaType);
        }
        let (status, duplicate) = match data.image_store.save(&hash, mime, &bytes).await {
            Ok(()) => (StatusCode::CREATED, false),
            Err(ImageStoreError::Duplicate) => (StatusCode::OK, true),
            Err(e) => {
                log::error!("image store save failed: {e}");
                return Err(ApiError::Internal);
            }
        };
        log::info!("user {} uploaded image {hash} ({mime}, {} bytes)", auth.user_id, bytes.len());
        let resp = ImageUploadResponse { hash, mime: mime.to_string(), size: bytes.len(), duplicate };
        return Ok(HttpResponse::build(status).json(resp));
    }
    Err(ApiError::field("file", "No file was submitted."))
}

#[utoipa::path(
    get,
    path = "/images/{hash}",
    params(("hash" = String, Path, description = "SHA-256 of the image bytes")),
    responses(
        (status = 200, description = "Raw image bytes"),
        (status = 404, description = "Unknown hash")
    )
)]
pub async fn get_image(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    match data.image_store.load(&path.into_inner()).await {
        Ok((bytes, mime)) => Ok(HttpResponse::Ok().insert_header(("Content-Type", mime)).body(bytes)),
        Err(ImageStoreError::NotFound) => Err(ApiError::NotFound),
        Err(e) => {
            log::error!("image store load failed: {e}");
            Err(ApiError::Internal)
        }
    }
}
