//! Error types for calculator driver operations

use hftcalc_chip::Operation;
use thiserror::Error;

/// Result type alias for calculator operations
pub type Result<T> = std::result::Result<T, CalcError>;

/// Errors that can occur while driving the calculator
#[derive(Debug, Error)]
pub enum CalcError {
    /// Operation attempted before `init` or after `cleanup`
    #[error("Calculator not initialized")]
    NotInitialized,

    /// A previous command timed out; hardware state is unknown until `resync`
    #[error("Calculator desynchronized after timeout; call resync() before reuse")]
    Desynchronized,

    /// Register offset outside the IP's register window
    #[error("Register offset {offset:#04x} out of range (max {max:#04x})")]
    OffsetOutOfRange {
        /// Requested offset
        offset: usize,
        /// Highest valid offset
        max: usize,
    },

    /// Raw opcode outside the declared enumeration
    #[error("Invalid operation code {code:#x}")]
    UnknownOpcode {
        /// Rejected code
        code: u32,
    },

    /// Valid opcode not accepted by this entry point
    #[error("Operation {op} not allowed here: {reason}")]
    InvalidOperation {
        /// Rejected operation
        op: Operation,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Windowed statistic requested with fewer prices than the window
    #[error("Window of {window} prices requested but buffer holds {fill_count}")]
    InsufficientData {
        /// Configured window size
        window: u16,
        /// Prices currently buffered
        fill_count: u16,
    },

    /// Price buffer already holds `capacity` entries
    #[error("Price buffer full ({capacity} entries)")]
    BufferFull {
        /// Buffer capacity
        capacity: u16,
    },

    /// Raw write to a register owned by the buffer manager
    #[error("Register {register} is managed by the buffer API; raw writes are refused")]
    BufferManaged {
        /// Register mnemonic
        register: &'static str,
    },

    /// Window size outside `1..=capacity`
    #[error("Invalid window size {size} (must be 1..={capacity})")]
    InvalidWindow {
        /// Rejected size
        size: u32,
        /// Buffer capacity
        capacity: u16,
    },

    /// EMA smoothing factor outside `0.0..=1.0`
    #[error("Invalid EMA alpha {alpha} (must be 0.0..=1.0)")]
    InvalidAlpha {
        /// Rejected value
        alpha: f32,
    },

    /// Host mirror of the fill count disagrees with `BUFFER_COUNT`
    #[error("Buffer mirror out of sync: driver={mirror}, hardware={hardware}")]
    BufferDesync {
        /// Driver-side fill count
        mirror: u16,
        /// Fill count reported by hardware
        hardware: u32,
    },

    /// Hardware did not complete within the polling budget
    #[error("Operation timeout after {polls} polls")]
    Timeout {
        /// Status reads performed
        polls: u32,
    },

    /// Hardware set the error flag
    #[error("Hardware error (code {code:#010x})")]
    Hardware {
        /// Contents of `ERROR_CODE`, uninterpreted
        code: u32,
    },

    /// Nothing answers at the configured address
    #[error("No calculator present (VERSION reads {version:#010x})")]
    DeviceNotPresent {
        /// Raw `VERSION` word
        version: u32,
    },

    /// IP revision differs from the one configured
    #[error("IP version {found:#010x} does not match expected {expected:#010x}")]
    VersionMismatch {
        /// Raw `VERSION` word read
        found: u32,
        /// Configured expectation
        expected: u32,
    },

    /// Register window could not be mapped
    #[error("Failed to map registers: {reason}")]
    MapFailed {
        /// Reason for failure
        reason: String,
    },

    /// I/O error opening the device node
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl CalcError {
    /// Create a map failed error
    pub fn map_failed(reason: impl Into<String>) -> Self {
        Self::MapFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid operation error
    pub const fn invalid_operation(op: Operation, reason: &'static str) -> Self {
        Self::InvalidOperation { op, reason }
    }

    /// Detected in software before any hardware access; the caller can fix
    /// its inputs and retry.
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::OffsetOutOfRange { .. }
                | Self::UnknownOpcode { .. }
                | Self::InvalidOperation { .. }
                | Self::InsufficientData { .. }
                | Self::BufferFull { .. }
                | Self::InvalidWindow { .. }
                | Self::InvalidAlpha { .. }
                | Self::BufferManaged { .. }
        )
    }

    /// Hardware state is unknown; `resync` is required before reuse.
    pub const fn is_liveness(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Reported by the IP through the status error flag.
    pub const fn hardware_code(&self) -> Option<u32> {
        match self {
            Self::Hardware { code } => Some(*code),
            _ => None,
        }
    }

    /// Driver used outside its `init`..`cleanup` lifetime, or while
    /// desynchronized.
    pub const fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::Desynchronized
                | Self::DeviceNotPresent { .. }
                | Self::VersionMismatch { .. }
        )
    }
}

impl From<hftcalc_chip::UnknownOpcode> for CalcError {
    fn from(e: hftcalc_chip::UnknownOpcode) -> Self {
        Self::UnknownOpcode { code: e.0 }
    }
}
