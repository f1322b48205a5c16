//! # Multipart photo forms
//!
//! Turns a `multipart/form-data` body into a [`PhotoInput`]. The image is
//! buffered chunk by chunk and abandoned as soon as it crosses the
//! configured limit; text fields are passed through untouched for the
//! metadata normalizer.

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use bytes::BytesMut;
use domains::{ImageUpload, UploadPolicy, ValidationErrors, IMAGE_FIELD};
use mime::Mime;
use serde_json::{Map, Value};
use services::metadata::METADATA_FIELD;
use services::PhotoInput;
use tracing::debug;

use crate::error::ApiError;

pub async fn read_photo_form(
    mut multipart: Multipart,
    policy: &UploadPolicy,
) -> Result<PhotoInput, ApiError> {
    let mut input = PhotoInput::default();
    let on_stream_error = |e| ApiError::from_multipart(e, policy.max_bytes);

    while let Some(field) = multipart.next_field().await.map_err(on_stream_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            if input.image.is_some() {
                let err = ValidationErrors::single(IMAGE_FIELD, "only one image may be uploaded");
                return Err(err.into());
            }
            input.image = Some(read_image(field, policy).await?);
            continue;
        }

        let text = field.text().await.map_err(on_stream_error)?;
        if name == METADATA_FIELD {
            input.metadata = Some(text);
        } else {
            push_text(&mut input.fields, name, text);
        }
    }
    Ok(input)
}

/// Repeated text fields collect into an array, which the normalizer
/// understands for `tags`.
fn push_text(fields: &mut Map<String, Value>, name: String, text: String) {
    match fields.get_mut(&name) {
        Some(Value::Array(values)) => values.push(Value::String(text)),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(text)]);
        }
        None => {
            fields.insert(name, Value::String(text));
        }
    }
}

/// A declared type wins unless it is the generic octet-stream, in which case
/// the file name is consulted.
fn declared_type(field: &Field<'_>) -> Option<String> {
    let declared = field
        .content_type()
        .filter(|ct| !ct.starts_with(mime::APPLICATION_OCTET_STREAM.essence_str()));
    match declared {
        Some(ct) => Some(ct.to_string()),
        None => field
            .file_name()
            .and_then(|name| mime_guess::from_path(name).first())
            .map(|m: Mime| m.essence_str().to_string()),
    }
}

async fn read_image(mut field: Field<'_>, policy: &UploadPolicy) -> Result<ImageUpload, ApiError> {
    let content_type = policy.accept_content_type(declared_type(&field).as_deref())?;
    let original_name = field.file_name().map(str::to_string);

    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::from_multipart(e, policy.max_bytes))?
    {
        policy.check_size(buf.len() + chunk.len())?;
        buf.extend_from_slice(&chunk);
    }
    if buf.is_empty() {
        return Err(ValidationErrors::single(IMAGE_FIELD, "image is empty").into());
    }

    debug!(bytes = buf.len(), content_type = %content_type, "image buffered");
    Ok(ImageUpload {
        bytes: buf.freeze(),
        content_type,
        original_name,
    })
}
