/// Number of DMA buffers in the circular descriptor chain.
pub const BUFFER_COUNT: usize = 8;

/// Length of one DMA buffer, in 32-bit stereo frames.
pub const BUFFER_LEN: usize = 64;

/// Base frequency of the transmit clock tree in Hz, before division.
pub const BASE_FREQUENCY: u32 = 160_000_000;

/// Sample rate programmed by [`begin()`](crate::I2sOutput::begin) until the
/// caller overrides it.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Width mask of one hardware clock-divider bit field (6 bits).
pub const DIVIDER_MASK: u8 = 0x3F;
