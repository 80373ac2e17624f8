//! # i2s-audio-out
//!
//! A `no_std`, zero-allocation DMA ring-buffer engine for streaming stereo
//! audio out of a microcontroller's serial audio (I2S) peripheral, written
//! in pure Rust. Application code pushes 32-bit frames at its own pace; the
//! hardware DMA engine drains fixed-size buffers at the programmed sample
//! clock, transmitting silence whenever the application falls behind.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Memory | [`ring`] | Buffer pool + circular DMA descriptor chain |
//! | Handoff | `free_queue` | Bounded FIFO from interrupt to writer context |
//! | API | [`output`] | [`I2sOutput`] engine: lifecycle, writer, ISR |
//! | Clocking | [`clock`] | Divider-pair search for a target sample rate |
//! | HAL | [`platform`] | [`Platform`] trait hiding the register layer |
//!
//! ## Data flow
//!
//! ```text
//! write_sample() ──► current buffer ──► descriptor ring ──DMA──► I2S TX
//!       ▲                                    │
//!       └────────── FreeQueue ◄── isr() ◄────┘ (buffer finished:
//!                                               zero-fill + hand back)
//! ```
//!
//! The hard part is the handoff between the two execution contexts. The
//! interrupt handler is the sole producer of the free queue and the writer
//! its sole consumer; every access from the writer side runs with the
//! interrupt source masked, so the DMA engine never reads a buffer that is
//! simultaneously being written.
//!
//! ## Quick start
//!
//! ```ignore
//! use i2s_audio_out::I2sOutput;
//!
//! let mut audio = I2sOutput::new(platform);
//! audio.begin();                  // defaults to 44.1 kHz
//!
//! loop {
//!     let (left, right) = synth.next_frame();
//!     audio.write_lr(left, right);   // blocks when all buffers are full
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `defmt` | no | `defmt::Format` on public types, trace points |
//!
//! ## Stream parameters
//!
//! - **Buffers:** 8 × 64 frames ([`constants::BUFFER_COUNT`], [`constants::BUFFER_LEN`])
//! - **Frame format:** `u32`, two packed `i16` channels (right high, left low)
//! - **Default rate:** 44 100 Hz ([`constants::DEFAULT_SAMPLE_RATE`])

#![no_std]

pub mod constants;
pub mod clock;
mod free_queue;
pub mod ring;
pub mod writer;
pub mod platform;
pub mod output;

pub use clock::ClockDividers;
pub use output::I2sOutput;
pub use platform::Platform;
pub use ring::Descriptor;
pub use writer::pack_frame;
