//! The capability provider: everything a guest may reach on the host.

use std::io::{self, Write};

use capability::{CapabilityKind, Grants};
use tracing::{debug, info};

use crate::Result;
use crate::capabilities::{
    DeniedFilesystem, DeniedRandom, Descriptor, DescriptorType, EmptyEnvironment, Environment,
    Filesystem, NoPreopens, OsRandom, Preopens, Random,
};
use crate::streams::{StreamHandle, StreamKind, StreamRegistry};

/// Owns the stream registry and one implementation per capability group.
///
/// A provider is built once, moved into the guest's store, and never
/// shared. Nothing it exposes is looked up from process globals after
/// construction.
pub struct CapabilityProvider {
    streams: StreamRegistry,
    random: Box<dyn Random>,
    environment: Box<dyn Environment>,
    preopens: Box<dyn Preopens>,
    filesystem: Box<dyn Filesystem>,
}

impl CapabilityProvider {
    /// Inherited stdio, OS randomness, and nothing else.
    pub fn least_privilege() -> Self {
        Self::builder().build()
    }

    /// Least privilege, further narrowed by `grants`.
    pub fn from_grants(grants: &Grants) -> Self {
        Self::builder().grants(grants.clone()).build()
    }

    pub fn builder() -> CapabilityProviderBuilder {
        CapabilityProviderBuilder::default()
    }

    pub fn streams(&self) -> &StreamRegistry {
        &self.streams
    }

    pub fn get_random_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        self.random.get_bytes(len)
    }

    pub fn get_stream(&self, kind: StreamKind) -> StreamHandle {
        self.streams.resolve(kind)
    }

    pub fn write(&mut self, handle: StreamHandle, buf: &[u8]) -> Result<u64> {
        self.streams.write(handle, buf)
    }

    pub fn blocking_write(&mut self, handle: StreamHandle, buf: &[u8]) -> Result<u64> {
        self.streams.blocking_write(handle, buf)
    }

    pub fn release_stream(&mut self, handle: StreamHandle) {
        self.streams.release(handle);
    }

    pub fn environment(&self) -> Vec<(String, String)> {
        self.environment.list()
    }

    pub fn preopened_directories(&self) -> Vec<(Descriptor, String)> {
        self.preopens.list_directories()
    }

    pub fn open_write_stream(&mut self, descriptor: Descriptor, offset: u64) -> Result<StreamHandle> {
        self.filesystem.open_write_stream(descriptor, offset)
    }

    pub fn open_append_stream(&mut self, descriptor: Descriptor) -> Result<StreamHandle> {
        self.filesystem.open_append_stream(descriptor)
    }

    pub fn descriptor_type(&self, descriptor: Descriptor) -> Result<DescriptorType> {
        self.filesystem.get_type(descriptor)
    }

    pub fn release_descriptor(&mut self, descriptor: Descriptor) -> Result<()> {
        self.filesystem.release(descriptor)
    }
}

impl std::fmt::Debug for CapabilityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProvider")
            .field("streams", &self.streams)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CapabilityProvider`].
///
/// Unset groups fall back to the least-privilege defaults. Grants are
/// applied last, so a revoked capability stays revoked whatever
/// implementation was supplied for it. Environment, preopens and the
/// filesystem cannot be granted, so they always get the withholding
/// defaults and have no setter.
#[derive(Default)]
pub struct CapabilityProviderBuilder {
    stdout: Option<Box<dyn Write + Send>>,
    stderr: Option<Box<dyn Write + Send>>,
    random: Option<Box<dyn Random>>,
    grants: Grants,
}

impl CapabilityProviderBuilder {
    pub fn stdout(mut self, writer: impl Write + Send + 'static) -> Self {
        self.stdout = Some(Box::new(writer));
        self
    }

    pub fn stderr(mut self, writer: impl Write + Send + 'static) -> Self {
        self.stderr = Some(Box::new(writer));
        self
    }

    pub fn random(mut self, random: impl Random + 'static) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    pub fn grants(mut self, grants: Grants) -> Self {
        self.grants = grants;
        self
    }

    pub fn build(self) -> CapabilityProvider {
        let grants = self.grants;
        let granted = |kind: CapabilityKind| {
            let decision = grants.check(kind);
            if let capability::Decision::Deny { reason } = &decision {
                debug!(capability = %kind, reason = %reason, "capability withheld");
            }
            decision.is_allowed()
        };

        let stdout: Box<dyn Write + Send> = match self.stdout {
            _ if !granted(CapabilityKind::Stdout) => Box::new(io::sink()),
            Some(writer) => writer,
            None => Box::new(io::stdout()),
        };
        let stderr: Box<dyn Write + Send> = match self.stderr {
            _ if !granted(CapabilityKind::Stderr) => Box::new(io::sink()),
            Some(writer) => writer,
            None => Box::new(io::stderr()),
        };
        let random: Box<dyn Random> = match self.random {
            _ if !granted(CapabilityKind::Random) => Box::new(DeniedRandom),
            Some(random) => random,
            None => Box::new(OsRandom),
        };

        // The stdin handle is never readable, so its grant only shows up here.
        info!(
            random = granted(CapabilityKind::Random),
            stdin = granted(CapabilityKind::Stdin),
            stdout = granted(CapabilityKind::Stdout),
            stderr = granted(CapabilityKind::Stderr),
            environment = granted(CapabilityKind::Environment),
            preopens = granted(CapabilityKind::Preopens),
            filesystem = granted(CapabilityKind::Filesystem),
            "capability provider ready"
        );

        CapabilityProvider {
            streams: StreamRegistry::from_boxed(stdout, stderr),
            random,
            environment: Box::new(EmptyEnvironment),
            preopens: Box::new(NoPreopens),
            filesystem: Box::new(DeniedFilesystem),
        }
    }
}
