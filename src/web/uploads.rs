use std::path::Path;

use axum::extract::{Multipart, multipart::Field};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::warn;
use uuid::Uuid;

use crate::verification::{SelectedFile, SelectionError};

/// Multipart field carrying the certificate.
pub const CERTIFICATE_FIELD: &str = "certificate";

/// Streams the certificate part of `multipart` into `dest_dir`.
///
/// Bytes are counted as they arrive; once the count passes `max_bytes` reading stops,
/// the partial file is removed and the upload is rejected as too large. Other parts
/// of the form are ignored.
pub async fn receive_certificate(
    mut multipart: Multipart,
    dest_dir: &Path,
    max_bytes: u64,
) -> Result<SelectedFile, SelectionError> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|err| SelectionError::Unreadable(format!("cannot create upload dir: {err}")))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| SelectionError::Unreadable(err.to_string()))?
    {
        if field.name() != Some(CERTIFICATE_FIELD) || field.file_name().is_none() {
            continue;
        }
        return store_field(field, dest_dir, max_bytes).await;
    }

    Err(SelectionError::Missing)
}

async fn store_field(
    mut field: Field<'_>,
    dest_dir: &Path,
    max_bytes: u64,
) -> Result<SelectedFile, SelectionError> {
    let original_name = field.file_name().unwrap_or("certificate").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let stored_path = dest_dir.join(stored_file_name(&original_name));

    let mut file = File::create(&stored_path)
        .await
        .map_err(|err| SelectionError::Unreadable(format!("cannot store upload: {err}")))?;

    let mut total_bytes: u64 = 0;
    let outcome = loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break Ok(()),
            Err(err) => break Err(SelectionError::Unreadable(err.to_string())),
        };
        total_bytes += chunk.len() as u64;
        if total_bytes > max_bytes {
            break Err(SelectionError::TooLarge { size: total_bytes });
        }
        if let Err(err) = file.write_all(&chunk).await {
            break Err(SelectionError::Unreadable(err.to_string()));
        }
    };

    let outcome = match outcome {
        Ok(()) => file
            .flush()
            .await
            .map_err(|err| SelectionError::Unreadable(err.to_string())),
        Err(err) => Err(err),
    };
    drop(file);

    if let Err(err) = outcome {
        discard_partial(&stored_path).await;
        return Err(err);
    }

    Ok(SelectedFile {
        name: original_name,
        size: total_bytes,
        content_type,
        stored_path,
    })
}

async fn discard_partial(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        warn!(?err, path = %path.display(), "failed to remove rejected upload");
    }
}

/// Unique on-disk name that keeps the sanitized original name readable.
pub fn stored_file_name(original: &str) -> String {
    let mut sanitized = sanitize_filename::sanitize(original);
    if sanitized.trim().is_empty() {
        sanitized = "certificate".to_string();
    }
    format!("{}_{}", Uuid::new_v4().simple(), sanitized)
}
