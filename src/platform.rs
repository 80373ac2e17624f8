//! Hardware abstraction boundary.
//!
//! Everything register-shaped lives behind [`Platform`]: pin multiplexing,
//! clock gating, interrupt masking, and the DMA/transmit peripheral's
//! control surface. The engine calls these as opaque semantic operations;
//! a port implements them against the target silicon's register layout.
//!
//! # Context Contract
//!
//! - [`mask_interrupt_source`](Platform::mask_interrupt_source) /
//!   [`unmask_interrupt_source`](Platform::unmask_interrupt_source) bracket
//!   every access to shared queue state from the application context, and
//!   the handler's own critical section from the interrupt context. They
//!   stand in for a lock; on targets with real threads a mutex or critical
//!   section implements them.
//! - [`yield_now`](Platform::yield_now) is the blocking writer's suspension
//!   point. It must allow other cooperative work (and the interrupt) to
//!   make progress; it must not sleep the interrupt context.

/// Semantic hardware operations the engine needs from the target.
pub trait Platform {
    /// Route the word-select, data, and bit-clock pins to the serial audio
    /// peripheral.
    fn configure_pins(&mut self);

    /// Return the audio pins to general-purpose I/O.
    fn release_pins(&mut self);

    /// Open the peripheral's clock gate.
    fn enable_peripheral_clock(&mut self);

    /// Disable delivery of the transfer-complete interrupt source.
    fn mask_interrupt_source(&mut self);

    /// Re-enable delivery of the transfer-complete interrupt source.
    fn unmask_interrupt_source(&mut self);

    /// Read and clear the pending interrupt condition. Returns `true` when
    /// a transfer-complete (end-of-frame) event was pending.
    fn acknowledge_interrupt(&mut self) -> bool;

    /// Reset the DMA engine, program it with the descriptor chain starting
    /// at `first_descriptor`, clear and enable the transfer-complete
    /// interrupt, and start the link engine.
    fn arm_dma(&mut self, first_descriptor: usize);

    /// Mask and clear the transfer-complete interrupt and detach the
    /// descriptor chain from the DMA engine.
    fn disarm_dma(&mut self);

    /// Address of the descriptor the DMA engine most recently finished.
    fn finished_descriptor(&mut self) -> usize;

    /// Pulse the serial audio peripheral's reset, clearing any pending
    /// peripheral interrupts.
    fn reset_peripheral(&mut self);

    /// Select the 16-bit, dual-channel frame format.
    fn set_frame_format(&mut self);

    /// Switch the transmit FIFO from programmed I/O to DMA feed.
    fn enable_dma_mode(&mut self);

    /// Program the two transmit clock dividers.
    fn program_dividers(&mut self, div1: u8, div2: u8);

    /// Start driving frames out of the transmit FIFO.
    fn start_transmission(&mut self);

    /// Stop the transmit FIFO.
    fn stop_transmission(&mut self);

    /// Yield application-context scheduling priority while the blocking
    /// writer waits for a free buffer.
    fn yield_now(&mut self);
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Platform;
    use crate::constants::BUFFER_COUNT;
    use crate::ring::Descriptor;

    const LOG_CAPACITY: usize = 32;

    /// Scripted stand-in for the hardware, driven by the test suite.
    ///
    /// Simulates the DMA engine one buffer completion at a time via
    /// [`complete_buffer()`](Self::complete_buffer), records the order of
    /// lifecycle calls, counts divider programming, and tracks interrupt
    /// mask depth (panicking on an unmask without a matching mask).
    pub(crate) struct MockPlatform {
        pub first_descriptor: usize,
        pub next_index: usize,
        pub finished: usize,
        pub pending_eof: bool,
        pub mask_depth: i32,
        pub program_dividers_calls: u32,
        pub last_dividers: Option<(u8, u8)>,
        pub yields: u32,
        pub dma_armed: bool,
        pub transmitting: bool,
        pub pins_configured: bool,
        pub clock_enabled: bool,
        pub resets: u32,
        log: [&'static str; LOG_CAPACITY],
        log_len: usize,
    }

    impl MockPlatform {
        pub(crate) fn new() -> Self {
            MockPlatform {
                first_descriptor: 0,
                next_index: 0,
                finished: 0,
                pending_eof: false,
                mask_depth: 0,
                program_dividers_calls: 0,
                last_dividers: None,
                yields: 0,
                dma_armed: false,
                transmitting: false,
                pins_configured: false,
                clock_enabled: false,
                resets: 0,
                log: [""; LOG_CAPACITY],
                log_len: 0,
            }
        }

        fn record(&mut self, op: &'static str) {
            assert!(self.log_len < LOG_CAPACITY, "mock call log overflow");
            self.log[self.log_len] = op;
            self.log_len += 1;
        }

        /// Position of `op` in the call log, if it was recorded.
        pub(crate) fn call_position(&self, op: &str) -> Option<usize> {
            self.log[..self.log_len]
                .iter()
                .position(|&recorded| recorded == op)
        }

        /// Simulate the DMA engine finishing its current buffer: latch the
        /// finished-descriptor address and raise the end-of-frame event.
        ///
        /// Descriptors live in one contiguous array, so descriptor `i` sits
        /// at `first_descriptor + i * size_of::<Descriptor>()`. The engine's
        /// `isr()` must be called afterwards, as the hardware vector would be.
        pub(crate) fn complete_buffer(&mut self) {
            assert!(self.dma_armed, "completion with DMA not armed");
            self.finished =
                self.first_descriptor + self.next_index * core::mem::size_of::<Descriptor>();
            self.next_index = (self.next_index + 1) % BUFFER_COUNT;
            self.pending_eof = true;
        }
    }

    impl Platform for MockPlatform {
        fn configure_pins(&mut self) {
            self.pins_configured = true;
            self.record("configure_pins");
        }

        fn release_pins(&mut self) {
            self.pins_configured = false;
            self.record("release_pins");
        }

        fn enable_peripheral_clock(&mut self) {
            self.clock_enabled = true;
            self.record("enable_peripheral_clock");
        }

        fn mask_interrupt_source(&mut self) {
            self.mask_depth += 1;
        }

        fn unmask_interrupt_source(&mut self) {
            self.mask_depth -= 1;
            assert!(self.mask_depth >= 0, "unmask without matching mask");
        }

        fn acknowledge_interrupt(&mut self) -> bool {
            let pending = self.pending_eof;
            self.pending_eof = false;
            pending
        }

        fn arm_dma(&mut self, first_descriptor: usize) {
            self.first_descriptor = first_descriptor;
            self.next_index = 0;
            self.dma_armed = true;
            self.record("arm_dma");
        }

        fn disarm_dma(&mut self) {
            self.dma_armed = false;
            self.record("disarm_dma");
        }

        fn finished_descriptor(&mut self) -> usize {
            self.finished
        }

        fn reset_peripheral(&mut self) {
            self.resets += 1;
            self.record("reset_peripheral");
        }

        fn set_frame_format(&mut self) {
            self.record("set_frame_format");
        }

        fn enable_dma_mode(&mut self) {
            self.record("enable_dma_mode");
        }

        fn program_dividers(&mut self, div1: u8, div2: u8) {
            self.program_dividers_calls += 1;
            self.last_dividers = Some((div1, div2));
        }

        fn start_transmission(&mut self) {
            self.transmitting = true;
            self.record("start_transmission");
        }

        fn stop_transmission(&mut self) {
            self.transmitting = false;
            self.record("stop_transmission");
        }

        fn yield_now(&mut self) {
            self.yields += 1;
            assert!(
                self.yields < 10_000,
                "blocking write spinning with no simulated DMA progress"
            );
        }
    }
}
