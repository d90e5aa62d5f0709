//! Files staged for the next outgoing message.

use crate::types::{AttachmentInfo, AttachmentKind};
use crate::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ============================================================================
// Preview Handles
// ============================================================================

/// Tracks the preview handles currently alive in a session.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<String>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle for an attachment id.
    pub fn acquire(&self, id: &str) -> PreviewHandle {
        let url = format!("blob:askai/{}", id);
        self.with_live(|live| live.insert(url.clone()));
        PreviewHandle {
            url,
            registry: self.clone(),
        }
    }

    /// Number of handles not yet released.
    pub fn live(&self) -> usize {
        self.with_live(|live| live.len())
    }

    fn release(&self, url: &str) {
        let removed = self.with_live(|live| live.remove(url));
        if removed {
            tracing::trace!("Released preview handle {}", url);
        }
    }

    fn with_live<R>(&self, f: impl FnOnce(&mut HashSet<String>) -> R) -> R {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut live)
    }
}

/// Display handle for an attachment preview. Released when dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    url: String,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Release the handle now instead of at end of scope.
    pub fn release(self) {}
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(&self.url);
    }
}

// ============================================================================
// Attachments
// ============================================================================

/// A file picked by the user, before it is staged.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub content: Arc<[u8]>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: content.len() as u64,
            content: content.into(),
        }
    }

    /// Read a file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let metadata = fs::metadata(path)
            .map_err(|e| Error::Attachment(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(Error::Attachment(format!(
                "{}: not a regular file",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Attachment(format!("{}: no file name", path.display())))?;
        let content = fs::read(path)
            .map_err(|e| Error::Attachment(format!("{}: {}", path.display(), e)))?;

        Ok(Self::new(name, content))
    }
}

/// A staged file. Owns its content and its preview handle.
#[derive(Debug)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub kind: AttachmentKind,
    pub content: Arc<[u8]>,
    preview: PreviewHandle,
}

impl Attachment {
    pub fn preview_url(&self) -> &str {
        self.preview.url()
    }

    /// Metadata recorded on the outgoing message.
    pub fn info(&self) -> AttachmentInfo {
        AttachmentInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            size: self.size,
            kind: self.kind,
        }
    }
}

/// Pending attachments for the next message, in insertion order.
#[derive(Debug, Default)]
pub struct AttachmentStore {
    items: Vec<Attachment>,
    previews: PreviewRegistry,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that allocates handles from a shared registry.
    pub fn with_registry(previews: PreviewRegistry) -> Self {
        Self {
            items: Vec::new(),
            previews,
        }
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Stage a file and return the new attachment.
    pub fn add(&mut self, file: FileDescriptor) -> &Attachment {
        let id = Uuid::new_v4().to_string();
        let preview = self.previews.acquire(&id);

        tracing::debug!("Staged attachment {} ({}, {} bytes)", id, file.name, file.size);

        self.items.push(Attachment {
            id,
            name: file.name,
            size: file.size,
            kind: AttachmentKind::File,
            content: file.content,
            preview,
        });
        &self.items[self.items.len() - 1]
    }

    /// Remove an attachment by id, releasing its preview handle. Returns
    /// whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.items.iter().position(|a| a.id == id) {
            Some(idx) => {
                let removed = self.items.remove(idx);
                tracing::debug!("Removed attachment {}", removed.id);
                true
            }
            None => false,
        }
    }

    /// Take every pending attachment, leaving the store empty. Handles move
    /// to the caller.
    pub fn drain(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.items)
    }

    /// Drop every pending attachment, releasing their handles.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Attachment> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
