use actix_web::{HttpResponse, web};

use crate::{
    dtos::{self, UploadResponse, UploadZipUrlRequest},
    models::TaskParams,
    validation::{self, UrlPolicy},
};

use super::AppState;
use super::response::{created_task, enqueue, run_detached, sync_outcome, validation_error_response};

/// Validate the request and build the task input, or the 400 response.
fn prepare(state: &AppState, body: &UploadZipUrlRequest) -> Result<(TaskParams, String), HttpResponse> {
    let mut errors = validation::validate_message_fields(&body.fields(), &state.config.platform.name)
        .err()
        .unwrap_or_default();
    let policy = UrlPolicy::from(&state.config.download);
    let url = match validation::validate_archive_url(&body.zip_url, &policy) {
        Ok(url) => Some(url),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let filename = url.as_ref().map(validation::archive_filename);
    match filename {
        Some(filename) if errors.is_empty() => {
            Ok((TaskParams::UploadZipFile(body.to_params(filename.clone())), filename))
        }
        _ => Err(validation_error_response(
            &errors,
            &body.message,
            filename.as_deref(),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/upload-zip-url",
    summary = "Upload an archive from a URL in the background",
    description = "Validates the URL, creates an `upload_zip_file` task and queues it. The archive is downloaded when the task starts. The file name is the last URL path segment when it ends in `.zip`, `downloaded_file.zip` otherwise.",
    request_body = dtos::UploadZipUrlRequest,
    responses(
        (status = 202, description = "Task accepted", body = dtos::UploadResponse),
        (status = 400, description = "Validation failed, no task created", body = dtos::RejectedRequest),
        (status = 429, description = "Work queue full, the task was failed", body = dtos::UploadResponse),
    ),
    tag = "uploads"
)]
/// Upload an archive without waiting for it
pub async fn upload_zip_url(
    state: web::Data<AppState>,
    body: web::Json<UploadZipUrlRequest>,
) -> actix_web::Result<HttpResponse> {
    let (params, filename) = match prepare(&state, &body) {
        Ok(prepared) => prepared,
        Err(rejected) => return Ok(rejected),
    };

    let id = state.manager.create(params);
    let queued = enqueue(&state, id);

    let task = created_task(&state, id)?;
    let mut response = if queued {
        HttpResponse::Accepted()
    } else {
        sync_outcome(&task)
    };
    Ok(response.json(UploadResponse::from_task(&task, &body, &filename)))
}

#[utoipa::path(
    post,
    path = "/upload-zip-url-sync",
    summary = "Upload an archive from a URL and wait for the outcome",
    description = "Downloads the archive, attaches it and sends the message within the request. Failures answer 500 with the error, the echoed message and the file name.",
    request_body = dtos::UploadZipUrlRequest,
    responses(
        (status = 200, description = "Archive uploaded", body = dtos::UploadResponse),
        (status = 400, description = "Validation failed, no task created", body = dtos::RejectedRequest),
        (status = 429, description = "Concurrency cap reached", body = dtos::UploadResponse),
        (status = 500, description = "Execution failed", body = dtos::UploadResponse),
    ),
    tag = "uploads"
)]
/// Upload an archive and wait for it
pub async fn upload_zip_url_sync(
    state: web::Data<AppState>,
    body: web::Json<UploadZipUrlRequest>,
) -> actix_web::Result<HttpResponse> {
    let (params, filename) = match prepare(&state, &body) {
        Ok(prepared) => prepared,
        Err(rejected) => return Ok(rejected),
    };

    let id = state.manager.create(params);
    run_detached(&state, id).await;

    let task = created_task(&state, id)?;
    Ok(sync_outcome(&task).json(UploadResponse::from_task(&task, &body, &filename)))
}
