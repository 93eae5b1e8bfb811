//! Stream registry: opaque handles bound to host I/O channels.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::{Error, Result};

/// The standard channels a guest may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

impl StreamKind {
    fn index(self) -> usize {
        match self {
            Self::Stdin => 0,
            Self::Stdout => 1,
            Self::Stderr => 2,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        })
    }
}

/// Opaque stream identifier handed to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(u32);

impl StreamHandle {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Guests never read, so the input channel holds no reader.
enum Channel {
    Input,
    Output(Box<dyn Write + Send>),
}

struct Entry {
    kind: StreamKind,
    channel: Channel,
    active: bool,
}

/// Maps stream handles to host-owned channels.
///
/// Handles are assigned once at construction and never reassigned, so a
/// handle resolves to the same channel for the registry's lifetime.
/// Releasing a handle only marks it inactive; the channel stays open.
pub struct StreamRegistry {
    entries: Vec<Entry>,
}

impl StreamRegistry {
    /// Bind the output handles to the given channels. The stdin handle is
    /// bound too, but nothing can be read or written through it.
    pub fn new(
        stdout: impl Write + Send + 'static,
        stderr: impl Write + Send + 'static,
    ) -> Self {
        Self::from_boxed(Box::new(stdout), Box::new(stderr))
    }

    pub(crate) fn from_boxed(
        stdout: Box<dyn Write + Send>,
        stderr: Box<dyn Write + Send>,
    ) -> Self {
        let entry = |kind, channel| Entry {
            kind,
            channel,
            active: true,
        };
        Self {
            entries: vec![
                entry(StreamKind::Stdin, Channel::Input),
                entry(StreamKind::Stdout, Channel::Output(stdout)),
                entry(StreamKind::Stderr, Channel::Output(stderr)),
            ],
        }
    }

    /// The handle for a standard channel. Always succeeds.
    pub fn resolve(&self, kind: StreamKind) -> StreamHandle {
        StreamHandle(kind.index() as u32)
    }

    /// The channel a handle is bound to, if it is a known handle.
    pub fn kind(&self, handle: StreamHandle) -> Option<StreamKind> {
        self.entries.get(handle.0 as usize).map(|entry| entry.kind)
    }

    pub fn is_active(&self, handle: StreamHandle) -> bool {
        self.entries
            .get(handle.0 as usize)
            .is_some_and(|entry| entry.active)
    }

    /// Write the whole buffer to the handle's channel.
    ///
    /// Returns the number of bytes written, always `buf.len()` on success.
    pub fn write(&mut self, handle: StreamHandle, buf: &[u8]) -> Result<u64> {
        let entry = self
            .entries
            .get_mut(handle.0 as usize)
            .ok_or_else(|| Error::Stream(format!("unknown stream handle {}", handle.0)))?;

        if !entry.active {
            warn!(stream = %entry.kind, "write to a released stream");
        }

        let Channel::Output(writer) = &mut entry.channel else {
            return Err(Error::Stream(format!("{} is not writable", entry.kind)));
        };

        writer
            .write_all(buf)
            .and_then(|()| writer.flush())
            .map_err(|e| Error::Stream(format!("write to {} failed: {e}", entry.kind)))?;

        debug!(stream = %entry.kind, bytes = buf.len(), "guest write");
        Ok(buf.len() as u64)
    }

    /// Same as [`write`](Self::write); writes are always synchronous.
    pub fn blocking_write(&mut self, handle: StreamHandle, buf: &[u8]) -> Result<u64> {
        self.write(handle, buf)
    }

    /// Mark a handle inactive. Unknown handles are ignored.
    pub fn release(&mut self, handle: StreamHandle) {
        if let Some(entry) = self.entries.get_mut(handle.0 as usize) {
            debug!(stream = %entry.kind, "stream released");
            entry.active = false;
        }
    }
}

impl fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.kind, e.active)))
            .finish()
    }
}

/// An in-memory output channel whose contents can be read back.
///
/// Clones share the same buffer, so one clone can be handed to the
/// registry while another is kept to inspect what the guest wrote.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().map(|buf| buf.clone()).unwrap_or_default()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::other("shared buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
