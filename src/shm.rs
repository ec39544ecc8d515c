//! Anonymous shared-memory pools for pixel buffers
//!
//! A pool is an unlinked, exactly-sized memory object shared with the
//! compositor by descriptor. Allocation prefers `memfd_create` and falls
//! back to a named-then-unlinked POSIX shared-memory object, retrying the
//! name with a monotonically incremented suffix on collision.
//!
//! The descriptor and the mapping have independent lifetimes: once the
//! compositor-side pool object has been created from the descriptor, the
//! descriptor can be closed and the mapping stays valid until unmapped.
//! `into_mapping` encodes that hand-off.

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, FromRawFd, OwnedFd};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use memmap2::{MmapMut, MmapOptions};

use crate::error::ClientError;

/// Bounded retry count for shared-memory name collisions.
const NAME_RETRY_LIMIT: u32 = 16;

/// Process-wide suffix so concurrent allocations never race on a name.
static SHM_NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An anonymous shared-memory region of fixed size, mapped read/write.
#[derive(Debug)]
pub struct ShmPool {
    file: File,
    map: MmapMut,
    size: usize,
}

impl ShmPool {
    /// Allocate an anonymous memory object of exactly `size` bytes and map
    /// it into the process.
    pub fn create(size: usize) -> Result<Self, ClientError> {
        let fd = allocate_fd(size).map_err(ClientError::AllocationFailed)?;
        let file = File::from(fd);

        // The descriptor must be closed even when the mapping fails, which
        // dropping `file` on the error path takes care of.
        let map = unsafe { MmapOptions::new().len(size).map_mut(&file) }
            .map_err(ClientError::MapFailed)?;

        Ok(Self { file, map, size })
    }

    /// Size of the region in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Descriptor to hand to the compositor's pool-creation request.
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }

    /// Mutable byte view of the mapped region.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }

    /// Close the descriptor and keep only the mapping. The compositor-side
    /// pool object must already exist; after this the mapping is the sole
    /// surviving handle on the memory.
    pub fn into_mapping(self) -> MmapMut {
        drop(self.file);
        self.map
    }
}

/// Produce a sealed-size anonymous descriptor: memfd when the kernel has
/// it, an unlinked POSIX shm object otherwise.
fn allocate_fd(size: usize) -> io::Result<OwnedFd> {
    let fd = match create_memfd() {
        Ok(fd) => fd,
        Err(e) => {
            debug!("memfd_create unavailable ({e}), falling back to shm_open");
            create_unlinked_shm()?
        }
    };
    ftruncate_exact(fd.as_fd(), size as libc::off_t)?;
    Ok(fd)
}

fn create_memfd() -> io::Result<OwnedFd> {
    let name = CString::new("lumen-shm").expect("static name has no NUL");
    let fd = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Open a named shared-memory object and immediately unlink it so no other
/// process can ever observe it via the filesystem. Name collisions retry
/// with the next counter value, bounded by `NAME_RETRY_LIMIT`.
fn create_unlinked_shm() -> io::Result<OwnedFd> {
    let pid = std::process::id();
    for _ in 0..NAME_RETRY_LIMIT {
        let suffix = SHM_NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = CString::new(format!("/lumen-shm-{pid}-{suffix}"))
            .expect("shm name has no NUL");

        let fd = unsafe {
            libc::shm_open(
                name.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                0o600,
            )
        };
        if fd >= 0 {
            unsafe { libc::shm_unlink(name.as_ptr()) };
            return Ok(unsafe { OwnedFd::from_raw_fd(fd) });
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EEXIST) {
            warn!("shm name collision on {name:?}, retrying");
            continue;
        }
        return Err(err);
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "exhausted shared-memory name retries",
    ))
}

fn ftruncate_exact(fd: BorrowedFd<'_>, size: libc::off_t) -> io::Result<()> {
    use std::os::fd::AsRawFd;
    loop {
        let ret = unsafe { libc::ftruncate(fd.as_raw_fd(), size) };
        if ret == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err);
        }
    }
}
