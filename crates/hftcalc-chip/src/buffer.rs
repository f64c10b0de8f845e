//! Hardware circular price buffer.
//!
//! The IP keeps the most recent prices in on-chip RAM and exposes only the
//! fill count. Pushes beyond capacity are not accepted by the driver; the
//! host must reset the buffer before loading a new series.

/// Number of prices the buffer holds.
pub const CAPACITY: u16 = 256;

/// Smallest usable window.
pub const MIN_WINDOW: u16 = 1;

/// Largest usable window.
pub const MAX_WINDOW: u16 = CAPACITY;

/// Window size accepted by `BUFFER_CTRL`.
pub const fn is_valid_window(size: u16, capacity: u16) -> bool {
    size >= MIN_WINDOW && size <= capacity
}

/// Smoothing factor accepted by `EMA_ALPHA`. NaN is rejected.
pub fn is_valid_alpha(alpha: f32) -> bool {
    (0.0..=1.0).contains(&alpha)
}

/// Conventional EMA smoothing factor for an `n`-period average, `2 / (n + 1)`.
pub fn alpha_for_period(n: u16) -> f32 {
    2.0 / (f32::from(n) + 1.0)
}
