//! Capability groups and their default implementations.
//!
//! Each group is a trait behind which the provider holds one boxed
//! implementation. The defaults grant randomness and nothing else; only
//! randomness can be swapped for another source when building a provider.

use std::io;

use capability::CapabilityKind;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::warn;
use wasmtime::component::{ComponentType, Lift, Lower};

use crate::streams::StreamHandle;
use crate::{Error, Result};

/// Bytes drawn from the OS per fill call.
const RANDOM_CHUNK: usize = 64 * 1024;

/// Opaque filesystem descriptor supplied by the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor(pub u32);

/// Kind of object a descriptor refers to.
#[derive(ComponentType, Lift, Lower, Debug, Clone, Copy, PartialEq, Eq)]
#[component(enum)]
#[repr(u8)]
pub enum DescriptorType {
    #[component(name = "unknown")]
    Unknown,
    #[component(name = "directory")]
    Directory,
    #[component(name = "regular-file")]
    RegularFile,
}

/// Source of random bytes.
pub trait Random: Send {
    /// Exactly `len` random bytes.
    fn get_bytes(&mut self, len: u64) -> Result<Vec<u8>>;
}

/// Environment variables visible to the guest.
pub trait Environment: Send {
    fn list(&self) -> Vec<(String, String)>;
}

/// Directories pre-opened for the guest.
pub trait Preopens: Send {
    fn list_directories(&self) -> Vec<(Descriptor, String)>;
}

/// Descriptor-scoped filesystem operations.
pub trait Filesystem: Send {
    fn open_write_stream(&mut self, descriptor: Descriptor, offset: u64) -> Result<StreamHandle>;
    fn open_append_stream(&mut self, descriptor: Descriptor) -> Result<StreamHandle>;
    fn get_type(&self, descriptor: Descriptor) -> Result<DescriptorType>;
    fn release(&mut self, descriptor: Descriptor) -> Result<()>;
}

/// Operating-system randomness.
#[derive(Debug, Default)]
pub struct OsRandom;

impl Random for OsRandom {
    fn get_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        let len = usize::try_from(len).map_err(io::Error::other)?;
        let mut buf = vec![0u8; len];
        for chunk in buf.chunks_mut(RANDOM_CHUNK) {
            OsRng.try_fill_bytes(chunk).map_err(io::Error::other)?;
        }
        Ok(buf)
    }
}

/// Randomness revoked.
#[derive(Debug, Default)]
pub struct DeniedRandom;

impl Random for DeniedRandom {
    fn get_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        warn!(len, "denied random bytes");
        Err(Error::CapabilityNotGranted(CapabilityKind::Random))
    }
}

/// An environment with no variables.
#[derive(Debug, Default)]
pub struct EmptyEnvironment;

impl Environment for EmptyEnvironment {
    fn list(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

#[derive(Debug, Default)]
pub struct NoPreopens;

impl Preopens for NoPreopens {
    fn list_directories(&self) -> Vec<(Descriptor, String)> {
        Vec::new()
    }
}

/// A filesystem that refuses every operation.
///
/// With no preopened directories the guest cannot hold a valid
/// descriptor, so every call is refused the same way.
#[derive(Debug, Default)]
pub struct DeniedFilesystem;

impl DeniedFilesystem {
    fn deny<T>(&self, operation: &str, descriptor: Descriptor) -> Result<T> {
        warn!(operation, descriptor = descriptor.0, "denied filesystem access");
        Err(Error::CapabilityNotGranted(CapabilityKind::Filesystem))
    }
}

impl Filesystem for DeniedFilesystem {
    fn open_write_stream(&mut self, descriptor: Descriptor, _offset: u64) -> Result<StreamHandle> {
        self.deny("write-via-stream", descriptor)
    }

    fn open_append_stream(&mut self, descriptor: Descriptor) -> Result<StreamHandle> {
        self.deny("append-via-stream", descriptor)
    }

    fn get_type(&self, descriptor: Descriptor) -> Result<DescriptorType> {
        self.deny("get-type", descriptor)
    }

    fn release(&mut self, descriptor: Descriptor) -> Result<()> {
        self.deny("drop-descriptor", descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_random_returns_requested_length() {
        let mut random = OsRandom;
        for len in [0u64, 1, 16, 33, 4096] {
            assert_eq!(random.get_bytes(len).unwrap().len() as u64, len);
        }
    }

    #[test]
    fn os_random_is_not_constant() {
        let mut random = OsRandom;
        let a = random.get_bytes(32).unwrap();
        let b = random.get_bytes(32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn os_random_serves_large_requests_in_full() {
        let len = 2 * 1024 * 1024 + 7;
        let bytes = OsRandom.get_bytes(len).unwrap();
        assert_eq!(bytes.len() as u64, len);
        // Every chunk is filled, including the short tail.
        let tail = &bytes[bytes.len() - 4096..];
        assert!(tail.iter().any(|&b| b != 0));
    }

    #[test]
    fn denied_random_reports_the_capability() {
        let err = DeniedRandom.get_bytes(8).unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityNotGranted(CapabilityKind::Random)
        ));
    }

    #[test]
    fn denied_filesystem_refuses_everything() {
        let mut fs = DeniedFilesystem;
        let d = Descriptor(3);
        assert!(fs.open_write_stream(d, 0).is_err());
        assert!(fs.open_append_stream(d).is_err());
        assert!(fs.get_type(d).is_err());
        assert!(fs.release(d).is_err());
    }
}
