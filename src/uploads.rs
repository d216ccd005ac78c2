use async_trait::async_trait;
use std::sync::Mutex;

/// PhotoUpload
///
/// One file as handed over by the browser: original name, declared MIME
/// type, raw bytes.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// UploadSink
///
/// Defines the abstract contract for storing issue photos. The portal core
/// only stages and validates uploads; where the bytes actually land (direct
/// upload, presigned URL flow) is the sink's concern.
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Stores one photo and returns the key under which it can later be
    /// referenced in an issue payload.
    async fn put(&self, photo: &PhotoUpload) -> Result<String, String>;
}

/// sanitize_file_name
///
/// Utility function to prevent path traversal attacks: drops directory
/// navigation components (e.g., `..`, `.`) and keeps only the final path
/// segment of a client-supplied name.
fn sanitize_file_name(name: &str) -> String {
    name.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .next_back()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// stage_photos
///
/// Validates a batch of photos and hands them to the sink, returning the
/// stored keys in input order. The whole batch is checked before anything is
/// uploaded, so a bad file never leaves a half-stored issue behind.
pub async fn stage_photos(
    mut photos: Vec<PhotoUpload>,
    sink: &dyn UploadSink,
) -> Result<Vec<String>, String> {
    for photo in &mut photos {
        if !photo.content_type.starts_with("image/") {
            return Err(format!(
                "{} is not an image (got {})",
                photo.file_name, photo.content_type
            ));
        }

        if photo.bytes.is_empty() {
            return Err(format!("{} is empty", photo.file_name));
        }

        let sanitized = sanitize_file_name(&photo.file_name);
        if sanitized.is_empty() {
            return Err(format!("{:?} is not a usable file name", photo.file_name));
        }

        photo.file_name = sanitized;
    }

    let mut keys = Vec::with_capacity(photos.len());
    for photo in &photos {
        keys.push(sink.put(photo).await?);
    }

    Ok(keys)
}

/// MockUploadSink
///
/// A mock implementation of `UploadSink` used exclusively for testing the
/// staging logic without any storage backend.
#[derive(Default)]
pub struct MockUploadSink {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    received: Mutex<Vec<(String, String, usize)>>,
}

impl MockUploadSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// The (name, content type, byte length) of every stored photo, in
    /// arrival order.
    pub fn received(&self) -> Vec<(String, String, usize)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadSink for MockUploadSink {
    async fn put(&self, photo: &PhotoUpload) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock upload error: simulation requested".to_string());
        }

        self.received.lock().unwrap().push((
            photo.file_name.clone(),
            photo.content_type.clone(),
            photo.bytes.len(),
        ));

        // Deterministic key for mock assertions.
        Ok(format!("uploads/{}", photo.file_name))
    }
}
