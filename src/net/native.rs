//! Native I/O layer seam.
//!
//! # Responsibilities
//! - Dial a remote endpoint and surface the resulting resource
//! - Release a connection resource, reporting the kernel's verdict
//! - Report the kernel's view of a resource's local endpoint
//!
//! # Design Decisions
//! - A trait seam: the state machine in conn.rs is exercised against
//!   recording doubles, and only this module touches raw descriptors
//! - Release goes through close(2) directly; dropping an owned descriptor
//!   would swallow the error the release contract has to report

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{BorrowedFd, IntoRawFd};
use std::time::Duration;

use socket2::SockRef;

use crate::net::conn::{ConnectionResource, EndpointPair};

/// Primitives the connection core consumes from the native socket layer.
///
/// Implementations must not leave a resource behind on a failed `connect`;
/// a `release` failure still means the descriptor is gone.
pub trait NativeIo: Send + Sync + std::fmt::Debug {
    /// Dial `remote`, optionally bounded by `timeout`.
    fn connect(
        &self,
        remote: SocketAddr,
        timeout: Option<Duration>,
    ) -> io::Result<(ConnectionResource, EndpointPair)>;

    /// Release the resource. Consumes it: there is no way to retry.
    fn release(&self, resource: ConnectionResource) -> io::Result<()>;

    /// The kernel's view of the resource's local endpoint.
    fn local_endpoint(&self, resource: &ConnectionResource) -> io::Result<SocketAddr>;
}

/// Real platform layer over the std/socket2 socket stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformNative;

impl NativeIo for PlatformNative {
    fn connect(
        &self,
        remote: SocketAddr,
        timeout: Option<Duration>,
    ) -> io::Result<(ConnectionResource, EndpointPair)> {
        let stream = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&remote, timeout)?,
            None => TcpStream::connect(remote)?,
        };
        let local = stream.local_addr()?;
        Ok((
            ConnectionResource::from_raw(stream.into_raw_fd()),
            EndpointPair {
                local: Some(local),
                remote,
            },
        ))
    }

    fn release(&self, resource: ConnectionResource) -> io::Result<()> {
        // SAFETY: the resource wraps a descriptor this layer produced, and
        // the single-owner contract guarantees nobody else closes it.
        let rc = unsafe { libc::close(resource.into_raw()) };
        if rc == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn local_endpoint(&self, resource: &ConnectionResource) -> io::Result<SocketAddr> {
        // SAFETY: the descriptor stays owned by the caller for the duration
        // of this borrow.
        let fd = unsafe { BorrowedFd::borrow_raw(resource.as_raw()) };
        SockRef::from(&fd)
            .local_addr()?
            .as_socket()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "non-IP local endpoint"))
    }
}
