//! Hand-framed `multipart/form-data` bodies.

use chrono::Utc;

/// Ticks (100ns units) between 0001-01-01 and the Unix epoch.
const TICKS_AT_UNIX_EPOCH: i64 = 621_355_968_000_000_000;

/// A single raw file sent as the whole request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// A pre-built form with text fields and file parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        });
        self
    }

    pub fn file(mut self, name: impl Into<String>, upload: FileUpload) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file_name: Some(upload.file_name),
            content_type: Some(upload.content_type),
            data: upload.data,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(file_name) = &part.file_name {
                disposition.push_str(&format!("; filename=\"{file_name}\""));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }
}

/// Boundary derived from the current time, as lowercase hex ticks.
pub fn timestamp_boundary() -> String {
    let now = Utc::now();
    let hundred_nanos = now
        .timestamp_nanos_opt()
        .map(|nanos| nanos / 100)
        .unwrap_or_else(|| now.timestamp_micros() * 10);
    format!("{:x}", hundred_nanos + TICKS_AT_UNIX_EPOCH)
}

pub fn content_type_for(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Frame one file as a single-part body.
pub fn frame_single_file(upload: &FileUpload, boundary: &str) -> Vec<u8> {
    let header = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        upload.file_name, upload.content_type
    );
    let trailer = format!("\r\n--{boundary}--\r\n");
    let mut body = Vec::with_capacity(header.len() + upload.data.len() + trailer.len());
    body.extend_from_slice(header.as_bytes());
    body.extend_from_slice(&upload.data);
    body.extend_from_slice(trailer.as_bytes());
    body
}
