//! Single-owner stash of reusable buffers.

use crate::buffer::Buffer;

/// A LIFO stack of buffers owned by one thread.
///
/// Unlike [`BufferPool`](crate::BufferPool) this type is not synchronized and
/// has no upper bound; it suits a single task that wants to keep a few warm
/// buffers around without paying for cross-thread coordination. The most
/// recently pushed buffer is handed out first, which keeps its storage hot in
/// cache.
#[derive(Debug, Default)]
pub struct BufferQueue {
    buffers: Vec<Buffer>,
}

impl BufferQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffers: Vec::new(),
        }
    }

    /// Returns the number of stashed buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns `true` if no buffer is stashed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Resets `buffer` and stashes it.
    pub fn push(&mut self, mut buffer: Buffer) {
        buffer.reset();
        self.buffers.push(buffer);
    }

    /// Takes the most recently pushed buffer.
    pub fn pop(&mut self) -> Option<Buffer> {
        self.buffers.pop()
    }
}
