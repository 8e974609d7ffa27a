//! # Execution Context & Attachments
//!
//! Per-request state that travels alongside an invocation: the streamed request
//! attachments the resource may read, and the sink for attachments it wants to stream
//! back with the response.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A single streamed attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }
}

/// Reader over the attachments that arrived with the request.
///
/// Clones share the same cursor, so an attachment is handed out at most once.
#[derive(Debug, Clone, Default)]
pub struct RequestAttachmentReader {
    pending: Arc<Mutex<VecDeque<Attachment>>>,
}

impl RequestAttachmentReader {
    pub fn new(attachments: impl IntoIterator<Item = Attachment>) -> Self {
        Self {
            pending: Arc::new(Mutex::new(attachments.into_iter().collect())),
        }
    }

    /// Takes the next unread attachment.
    pub fn next_attachment(&self) -> Option<Attachment> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Sink for attachments streamed back with the response. Clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct ResponseAttachments {
    written: Arc<Mutex<Vec<Attachment>>>,
}

impl ResponseAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, attachment: Attachment) {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(attachment);
    }

    pub fn len(&self) -> usize {
        self.written.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of everything appended so far.
    pub fn snapshot(&self) -> Vec<Attachment> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Per-request carrier owned by the request's lifetime.
#[derive(Debug)]
pub struct ExecutionContext {
    request_id: u64,
    request_attachments: Option<RequestAttachmentReader>,
    response_attachments: ResponseAttachments,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            request_id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            request_attachments: None,
            response_attachments: ResponseAttachments::new(),
        }
    }

    pub fn with_request_attachments(mut self, reader: RequestAttachmentReader) -> Self {
        self.request_attachments = Some(reader);
        self
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn request_attachments(&self) -> Option<&RequestAttachmentReader> {
        self.request_attachments.as_ref()
    }

    pub fn response_attachments(&self) -> &ResponseAttachments {
        &self.response_attachments
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
