//! Binds a [`CapabilityProvider`] to the guest's imported interfaces.
//!
//! Each interface gets its own registration function; `add_to_linker`
//! installs all of them. Stream and descriptor handles cross the boundary
//! as plain `u32` values.

use tracing::warn;
use wasmtime::StoreContextMut;
use wasmtime::component::{ComponentType, Lift, Linker, Lower};

use crate::capabilities::{Descriptor, DescriptorType};
use crate::streams::{StreamHandle, StreamKind};
use crate::{CapabilityProvider, Error};

pub const RANDOM: &str = "wasi:random/random";
pub const STDIN: &str = "wasi:cli/stdin";
pub const STDOUT: &str = "wasi:cli/stdout";
pub const STDERR: &str = "wasi:cli/stderr";
pub const STREAMS: &str = "wasi:io/streams";
pub const ENVIRONMENT: &str = "wasi:cli/environment";
pub const PREOPENS: &str = "wasi:filesystem/preopens";
pub const FILESYSTEM: &str = "wasi:filesystem/types";

/// Guest-visible stream failure.
#[derive(ComponentType, Lift, Lower, Debug, Clone, Copy, PartialEq, Eq)]
#[component(enum)]
#[repr(u8)]
pub enum StreamError {
    #[component(name = "closed")]
    Closed,
    #[component(name = "io")]
    Io,
}

/// Guest-visible filesystem failure.
#[derive(ComponentType, Lift, Lower, Debug, Clone, Copy, PartialEq, Eq)]
#[component(enum)]
#[repr(u8)]
pub enum ErrorCode {
    #[component(name = "not-granted")]
    NotGranted,
    #[component(name = "bad-descriptor")]
    BadDescriptor,
    #[component(name = "io")]
    Io,
}

impl From<&Error> for ErrorCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::CapabilityNotGranted(_) => ErrorCode::NotGranted,
            Error::Io(_) | Error::Stream(_) => ErrorCode::Io,
            _ => ErrorCode::BadDescriptor,
        }
    }
}

type Store<'a> = StoreContextMut<'a, CapabilityProvider>;

/// Install every interface the provider implements.
pub fn add_to_linker(linker: &mut Linker<CapabilityProvider>) -> wasmtime::Result<()> {
    add_random(linker)?;
    add_stdio(linker)?;
    add_streams(linker)?;
    add_environment(linker)?;
    add_preopens(linker)?;
    add_filesystem(linker)?;
    Ok(())
}

fn add_random(linker: &mut Linker<CapabilityProvider>) -> wasmtime::Result<()> {
    let mut random = linker.instance(RANDOM)?;
    // No error channel in the signature: a refused request traps.
    random.func_wrap("get-random-bytes", |mut store: Store<'_>, (len,): (u64,)| {
        let bytes = store.data_mut().get_random_bytes(len)?;
        Ok((bytes,))
    })?;
    Ok(())
}

fn add_stdio(linker: &mut Linker<CapabilityProvider>) -> wasmtime::Result<()> {
    for (interface, function, kind) in [
        (STDIN, "get-stdin", StreamKind::Stdin),
        (STDOUT, "get-stdout", StreamKind::Stdout),
        (STDERR, "get-stderr", StreamKind::Stderr),
    ] {
        linker
            .instance(interface)?
            .func_wrap(function, move |store: Store<'_>, (): ()| {
                Ok((store.data().get_stream(kind).as_raw(),))
            })?;
    }
    Ok(())
}

fn add_streams(linker: &mut Linker<CapabilityProvider>) -> wasmtime::Result<()> {
    let mut streams = linker.instance(STREAMS)?;
    streams.func_wrap(
        "write",
        |mut store: Store<'_>, (this, buf): (u32, Vec<u8>)| {
            Ok((write_stream(store.data_mut(), this, &buf, false),))
        },
    )?;
    streams.func_wrap(
        "blocking-write",
        |mut store: Store<'_>, (this, buf): (u32, Vec<u8>)| {
            Ok((write_stream(store.data_mut(), this, &buf, true),))
        },
    )?;
    for function in ["drop-output-stream", "drop-input-stream"] {
        streams.func_wrap(function, |mut store: Store<'_>, (this,): (u32,)| {
            store.data_mut().release_stream(StreamHandle::from_raw(this));
            Ok(())
        })?;
    }
    Ok(())
}

fn add_environment(linker: &mut Linker<CapabilityProvider>) -> wasmtime::Result<()> {
    linker
        .instance(ENVIRONMENT)?
        .func_wrap("get-environment", |store: Store<'_>, (): ()| {
            Ok((store.data().environment(),))
        })?;
    Ok(())
}

fn add_preopens(linker: &mut Linker<CapabilityProvider>) -> wasmtime::Result<()> {
    linker
        .instance(PREOPENS)?
        .func_wrap("get-directories", |store: Store<'_>, (): ()| {
            let directories: Vec<(u32, String)> = store
                .data()
                .preopened_directories()
                .into_iter()
                .map(|(descriptor, path)| (descriptor.0, path))
                .collect();
            Ok((directories,))
        })?;
    Ok(())
}

fn add_filesystem(linker: &mut Linker<CapabilityProvider>) -> wasmtime::Result<()> {
    let mut types = linker.instance(FILESYSTEM)?;
    types.func_wrap(
        "write-via-stream",
        |mut store: Store<'_>, (this, offset): (u32, u64)| {
            let opened = store
                .data_mut()
                .open_write_stream(Descriptor(this), offset)
                .map(StreamHandle::as_raw);
            Ok((lower_fs_result(opened),))
        },
    )?;
    types.func_wrap(
        "append-via-stream",
        |mut store: Store<'_>, (this,): (u32,)| {
            let opened = store
                .data_mut()
                .open_append_stream(Descriptor(this))
                .map(StreamHandle::as_raw);
            Ok((lower_fs_result(opened),))
        },
    )?;
    types.func_wrap("get-type", |store: Store<'_>, (this,): (u32,)| {
        let ty: crate::Result<DescriptorType> = store.data().descriptor_type(Descriptor(this));
        Ok((lower_fs_result(ty),))
    })?;
    types.func_wrap(
        "drop-descriptor",
        |mut store: Store<'_>, (this,): (u32,)| {
            let released = store.data_mut().release_descriptor(Descriptor(this));
            Ok((lower_fs_result(released),))
        },
    )?;
    Ok(())
}

fn write_stream(
    provider: &mut CapabilityProvider,
    this: u32,
    buf: &[u8],
    blocking: bool,
) -> Result<u64, StreamError> {
    let handle = StreamHandle::from_raw(this);
    if !matches!(
        provider.streams().kind(handle),
        Some(StreamKind::Stdout | StreamKind::Stderr)
    ) {
        warn!(handle = this, "write to a handle that is not an output stream");
        return Err(StreamError::Closed);
    }
    let written = if blocking {
        provider.blocking_write(handle, buf)
    } else {
        provider.write(handle, buf)
    };
    written.map_err(|error| {
        warn!(%error, "guest stream write failed");
        StreamError::Io
    })
}

fn lower_fs_result<T>(result: crate::Result<T>) -> Result<T, ErrorCode> {
    result.map_err(|error| ErrorCode::from(&error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::CapabilityKind;

    #[test]
    fn filesystem_denial_lowers_to_not_granted() {
        let denied = Error::CapabilityNotGranted(CapabilityKind::Filesystem);
        assert_eq!(ErrorCode::from(&denied), ErrorCode::NotGranted);
        assert_eq!(
            lower_fs_result::<u32>(Err(denied)),
            Err(ErrorCode::NotGranted)
        );
    }

    #[test]
    fn writes_to_non_output_handles_are_closed() {
        let mut provider = CapabilityProvider::builder()
            .stdout(std::io::sink())
            .stderr(std::io::sink())
            .build();
        let stdin = provider.get_stream(StreamKind::Stdin).as_raw();
        assert_eq!(write_stream(&mut provider, stdin, b"x", false), Err(StreamError::Closed));
        assert_eq!(write_stream(&mut provider, 77, b"x", true), Err(StreamError::Closed));

        let stdout = provider.get_stream(StreamKind::Stdout).as_raw();
        assert_eq!(write_stream(&mut provider, stdout, b"abc", false), Ok(3));
    }

    #[test]
    fn every_interface_links() {
        let engine = crate::component::engine().unwrap();
        let mut linker = Linker::new(&engine);
        add_to_linker(&mut linker).unwrap();
    }

    #[test]
    fn contract_imports_match_linked_interfaces() {
        let wit = include_str!("../../../wit/host.wit");
        for interface in [
            RANDOM,
            STDIN,
            STDOUT,
            STDERR,
            STREAMS,
            ENVIRONMENT,
            PREOPENS,
            FILESYSTEM,
        ] {
            assert!(
                wit.contains(&format!("import {interface};")),
                "host.wit does not import {interface}"
            );
        }
    }
}
