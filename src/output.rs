//! DMA-driven stereo output engine.
//!
//! [`I2sOutput`] owns the buffer ring, the free queue, and the write
//! cursor, and orchestrates the platform layer through its lifecycle:
//!
//! ```text
//! application context                        interrupt context
//! ┌─────────────────┐   pop (masked)   ┌──────────────────────────┐
//! │ write_sample()  │◄─────────────────│ isr(): zero-fill finished│
//! │  fills current  │    FreeQueue     │  buffer, queue its index │
//! │  buffer         │                  └──────────▲───────────────┘
//! └───────┬─────────┘                             │ end-of-frame event
//!         ▼ buffer full                           │
//!   DMA engine walks the descriptor ring and drains buffers ──►  I2S TX
//! ```
//!
//! The DMA engine keeps transmitting regardless of the application: a
//! buffer the application failed to refill in time goes out as silence,
//! because the interrupt handler zero-fills every buffer the moment the
//! hardware finishes it.
//!
//! ## Usage
//!
//! ```ignore
//! let mut audio = I2sOutput::new(Esp8266Platform::take());
//! audio.begin();
//! audio.set_rate(22_050);
//!
//! // In the application loop:
//! audio.write_lr(left, right);
//!
//! // In the DMA completion vector:
//! audio.isr();
//! ```
//!
//! The integrator shares the engine between the two contexts with the
//! runtime's own discipline (an RTIC resource, a `critical_section`
//! mutex, a `static` the vector steals). Lifecycle calls must not race
//! streaming calls: calling `end()` while a `write_sample()` is in
//! progress is undefined ordering and is not guarded internally.

use crate::clock::ClockDividers;
use crate::constants::{BASE_FREQUENCY, BUFFER_COUNT, BUFFER_LEN, DEFAULT_SAMPLE_RATE};
use crate::free_queue::FreeQueue;
use crate::platform::Platform;
use crate::ring::DescriptorRing;
use crate::writer::{pack_frame, WriteCursor};

/// DMA ring-buffer audio output engine.
///
/// One engine per streaming session; create it once and drive it through
/// [`begin()`](Self::begin)/[`end()`](Self::end). Buffer and descriptor
/// storage is inline, so the engine must not be moved in memory between
/// `begin()` and `end()` — the descriptor chain holds its addresses.
pub struct I2sOutput<P: Platform> {
    platform: P,
    ring: DescriptorRing,
    free: FreeQueue,
    cursor: WriteCursor,
    callback: Option<fn()>,
    sample_rate: u32,
    dividers: Option<ClockDividers>,
    underruns: u32,
}

impl<P: Platform> I2sOutput<P> {
    /// Create an engine over the given platform. No hardware is touched
    /// until [`begin()`](Self::begin).
    pub const fn new(platform: P) -> Self {
        I2sOutput {
            platform,
            ring: DescriptorRing::new(),
            free: FreeQueue::new(),
            cursor: WriteCursor::new(),
            callback: None,
            sample_rate: 0,
            dividers: None,
            underruns: 0,
        }
    }

    /// Bring up the stream: link the descriptor ring, arm the DMA engine
    /// and its interrupt, route pins and clocks to the peripheral, program
    /// the default 44.1 kHz rate, and start transmission.
    ///
    /// The engine transmits silence until the first buffers are filled.
    pub fn begin(&mut self) {
        self.sample_rate = 0;
        self.underruns = 0;
        self.free.reset();
        self.cursor.reset();

        self.ring.link();
        self.platform.arm_dma(self.ring.first_descriptor());

        self.platform.configure_pins();
        self.platform.enable_peripheral_clock();
        self.platform.reset_peripheral();
        self.platform.set_frame_format();
        self.platform.enable_dma_mode();
        self.set_rate(DEFAULT_SAMPLE_RATE);
        self.platform.start_transmission();

        #[cfg(feature = "defmt")]
        defmt::trace!("i2s output started");
    }

    /// Tear the stream down. The hardware is fully quiesced — transmission
    /// stopped, peripheral reset, interrupt disarmed — before any buffer
    /// state is released.
    pub fn end(&mut self) {
        self.platform.stop_transmission();
        self.platform.reset_peripheral();
        self.platform.release_pins();
        self.platform.disarm_dma();

        self.ring.unlink();
        self.free.reset();
        self.cursor.reset();

        #[cfg(feature = "defmt")]
        defmt::trace!("i2s output stopped");
    }

    /// Interrupt-context entry point; call from the DMA completion vector.
    ///
    /// Acknowledges the pending event, zero-fills the buffer the hardware
    /// just finished (so an underrun replays silence, never stale audio),
    /// queues its index for the writer, and invokes the user callback.
    /// Never blocks, never allocates.
    pub fn isr(&mut self) {
        if !self.platform.acknowledge_interrupt() {
            return;
        }
        self.platform.mask_interrupt_source();
        let finished = self.platform.finished_descriptor();
        if let Some(index) = self.ring.index_of(finished) {
            self.ring.clear_buffer(index);
            if self.free.push_evicting(index as u8) {
                // Queue already held a full rotation's worth: the writer has
                // underrun. Oldest entry dropped in favor of the newest.
                self.underruns = self.underruns.saturating_add(1);
            }
            if let Some(callback) = self.callback {
                callback();
            }
        }
        self.platform.unmask_interrupt_source();
    }

    /// Append one 32-bit frame, waiting for a free buffer if none has room.
    ///
    /// The wait is a cooperative spin on [`Platform::yield_now`] with no
    /// timeout: it relies on the DMA engine continuing to complete buffers.
    /// Call at (on average) at least the programmed sample rate to avoid
    /// dropouts.
    pub fn write_sample(&mut self, frame: u32) {
        if self.cursor.exhausted() {
            // Safe to poll unmasked: the interrupt only ever adds entries,
            // so a non-empty observation stays true until our own pop.
            while self.free.is_empty() {
                self.platform.yield_now();
            }
            self.refill();
        }
        self.store(frame);
    }

    /// Append one 32-bit frame without waiting.
    ///
    /// Returns `Err(frame)` — ownership of the frame back to the caller —
    /// when the current buffer is exhausted and no free buffer is queued.
    /// The write cursor is untouched on rejection; nothing is partially
    /// written.
    pub fn write_sample_nb(&mut self, frame: u32) -> Result<(), u32> {
        if self.cursor.exhausted() {
            if self.free.is_empty() {
                return Err(frame);
            }
            self.refill();
        }
        self.store(frame);
        Ok(())
    }

    /// Append one stereo frame, blocking. Right channel lands in the high
    /// 16 bits of the transmitted word, left in the low 16 bits.
    pub fn write_lr(&mut self, left: i16, right: i16) {
        self.write_sample(pack_frame(left, right));
    }

    /// No room for a frame right now: the current buffer is exhausted (or
    /// absent) and the free queue holds nothing to refill from.
    pub fn is_full(&self) -> bool {
        self.cursor.exhausted() && self.free.is_empty()
    }

    /// The stream has drained: every buffer except the one in flight has
    /// been handed back unfilled. Indicates sustained underrun.
    pub fn is_empty(&self) -> bool {
        self.free.len() >= BUFFER_COUNT - 1
    }

    /// Estimate of the frame capacity currently writable.
    pub fn available(&self) -> i16 {
        ((BUFFER_COUNT - self.free.len()) * BUFFER_LEN) as i16
    }

    /// Number of buffer completions dropped on the floor because the writer
    /// had not consumed anything for a full ring rotation. Reset by
    /// [`begin()`](Self::begin).
    pub fn underruns(&self) -> u32 {
        self.underruns
    }

    /// Program the clock dividers approximating `rate` Hz. Calling with the
    /// rate already in effect is a no-op, leaving the hardware untouched.
    pub fn set_rate(&mut self, rate: u32) {
        if rate == self.sample_rate {
            return;
        }
        self.sample_rate = rate;
        let dividers = ClockDividers::closest(BASE_FREQUENCY, rate);
        #[cfg(feature = "defmt")]
        defmt::trace!("rate {} Hz -> dividers {}", rate, dividers);
        self.program(dividers);
    }

    /// Program an explicit divider pair, bypassing the search. Values wrap
    /// to the hardware's 6-bit fields.
    pub fn set_dividers(&mut self, div1: u8, div2: u8) {
        self.program(ClockDividers::masked(div1, div2));
    }

    /// The sample rate actually produced by the last programmed dividers,
    /// or `0.0` before any rate has been programmed.
    pub fn real_rate(&self) -> f32 {
        match self.dividers {
            Some(dividers) => dividers.real_rate(BASE_FREQUENCY),
            None => 0.0,
        }
    }

    /// Install a function invoked from the interrupt context on every
    /// buffer completion. It runs with the interrupt source masked and must
    /// not block; set flags and process later.
    pub fn set_callback(&mut self, callback: fn()) {
        self.callback = Some(callback);
    }

    /// Remove the completion callback.
    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// Borrow the underlying platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutably borrow the underlying platform.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Consume the engine and return the platform. Only meaningful after
    /// [`end()`](Self::end).
    pub fn free(self) -> P {
        self.platform
    }

    /// Pop the oldest free buffer and point the cursor at it. The pop races
    /// the interrupt's push over the same queue storage, so it runs under a
    /// masked interrupt source.
    fn refill(&mut self) {
        self.platform.mask_interrupt_source();
        let index = self.free.pop();
        self.platform.unmask_interrupt_source();
        if let Some(index) = index {
            self.cursor.start(index);
        }
    }

    fn store(&mut self, frame: u32) {
        let (index, pos) = self.cursor.slot();
        self.ring.buffer_mut(index)[pos] = frame;
        self.cursor.bump();
    }

    fn program(&mut self, dividers: ClockDividers) {
        self.dividers = Some(dividers);
        self.platform.program_dividers(dividers.div1, dividers.div2);
    }
}

#[cfg(test)]
impl<P: Platform> I2sOutput<P> {
    pub(crate) fn buffer(&self, index: usize) -> &[u32; BUFFER_LEN] {
        self.ring.buffer(index)
    }

    pub(crate) fn free_len(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn cursor_position(&self) -> Option<(u8, usize)> {
        self.cursor.position()
    }
}
