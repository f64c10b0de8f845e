//! Memory-mapped register window
//!
//! Maps the calculator registers out of `/dev/mem` (or a UIO node) with
//! `rustix` and performs volatile 32-bit accesses. The only unsafe code in
//! the driver lives here.

use crate::config::MapConfig;
use crate::error::{CalcError, Result};
use crate::transport::{RegisterTransport, TransportKind};
use hftcalc_chip::regs;
use rustix::fd::{AsFd, OwnedFd};
use rustix::fs::{Mode, OFlags};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::path::PathBuf;
use std::ptr::NonNull;

/// Register window backed by a shared mapping of a device node.
#[derive(Debug)]
pub struct MmapTransport {
    ptr: NonNull<u8>,
    size: usize,
    register_offset: usize,
    _fd: OwnedFd,
    device: PathBuf,
}

impl MmapTransport {
    /// Map the region described by `map`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the register window does not fit inside the mapped span
    /// - the device node cannot be opened (usually: not root)
    /// - mmap fails
    pub fn open(map: &MapConfig) -> Result<Self> {
        let window_end = map.register_offset.checked_add(regs::WINDOW_BYTES);
        if window_end.map_or(true, |end| end > map.map_span) {
            return Err(CalcError::map_failed(format!(
                "register window at {:#x} does not fit in a {:#x}-byte mapping",
                map.register_offset, map.map_span
            )));
        }

        tracing::debug!(
            "Mapping {} at {:#x} ({:#x} bytes, sync={})",
            map.device.display(),
            map.map_offset,
            map.map_span,
            map.sync
        );

        let mut flags = OFlags::RDWR | OFlags::CLOEXEC;
        if map.sync {
            flags |= OFlags::SYNC;
        }
        let fd = rustix::fs::open(&map.device, flags, Mode::empty()).map_err(|e| {
            CalcError::map_failed(format!(
                "Cannot open {}: {e}. Are you running as root?",
                map.device.display()
            ))
        })?;

        // SAFETY: mmap is unsafe but we validate all preconditions:
        // - fd is valid (just opened) and kept alive in the struct
        // - map_span is non-zero (it holds the register window, checked above)
        // - PROT_READ|PROT_WRITE and MAP_SHARED are what device memory needs
        // - the returned address is only dereferenced inside [0, map_span)
        // - we unmap in Drop with the same length
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                map.map_span,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                fd.as_fd(),
                map.map_offset,
            )
        }
        .map_err(|e| CalcError::map_failed(format!("mmap failed: {e}")))?;

        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| CalcError::map_failed("mmap returned a null mapping"))?;

        tracing::info!(
            "Mapped {} (phys {:#x}, registers at +{:#x})",
            map.device.display(),
            map.map_offset,
            map.register_offset
        );

        Ok(Self {
            ptr,
            size: map.map_span,
            register_offset: map.register_offset,
            _fd: fd,
            device: map.device.clone(),
        })
    }

    /// Device node backing the mapping.
    pub fn device(&self) -> &std::path::Path {
        &self.device
    }

    /// Byte offset into the mapping, if a 4-byte access at register
    /// `offset` stays inside it.
    fn locate(&self, offset: usize) -> Option<usize> {
        let at = self.register_offset.checked_add(offset)?;
        (at.checked_add(regs::WORD_BYTES)? <= self.size && at % regs::WORD_BYTES == 0).then_some(at)
    }
}

impl RegisterTransport for MmapTransport {
    fn read32(&self, offset: usize) -> u32 {
        let Some(at) = self.locate(offset) else {
            tracing::error!("Out of bounds read at register offset {offset:#x}");
            return 0;
        };

        // SAFETY: volatile read from the mapped register window.
        // - `locate` checked at + 4 <= size and 4-byte alignment
        // - ptr is valid for `size` bytes until Drop
        // - volatile keeps the compiler from eliding or merging register reads
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.ptr.as_ptr().add(at).cast::<u32>().read_volatile()
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        let Some(at) = self.locate(offset) else {
            tracing::error!("Out of bounds write at register offset {offset:#x}");
            return;
        };

        // SAFETY: volatile write to the mapped register window.
        // - `locate` checked at + 4 <= size and 4-byte alignment
        // - ptr is valid for `size` bytes until Drop
        // - volatile keeps the write ordered and observable by the IP
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.ptr.as_ptr().add(at).cast::<u32>().write_volatile(value);
        }
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Mmap
    }
}

impl Drop for MmapTransport {
    fn drop(&mut self) {
        tracing::debug!("Unmapping {} ({:#x} bytes)", self.device.display(), self.size);

        // SAFETY: munmap requires the pointer and length from mmap:
        // - self.ptr and self.size were produced together in open()
        // - no references into the mapping outlive self
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}

// SAFETY: the mapping is owned exclusively by this value and stays valid
// until Drop; moving it to another thread does not invalidate it.
unsafe impl Send for MmapTransport {}

// SAFETY: writes need &mut self; concurrent &self reads are volatile word
// reads of device memory, which the bus serializes.
unsafe impl Sync for MmapTransport {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_must_fit_mapping() {
        let mut map = MapConfig::uio("/dev/null");
        map.register_offset = 0x10;
        let err = MmapTransport::open(&map).unwrap_err();
        assert!(matches!(err, CalcError::MapFailed { .. }));
    }

    #[test]
    fn missing_device_node() {
        let map = MapConfig::uio("/nonexistent/uio-calculator");
        let err = MmapTransport::open(&map).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/uio-calculator"));
    }
}
