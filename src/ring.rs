//! DMA buffer pool and descriptor ring.
//!
//! The DMA engine transmits from a circular chain of descriptors, one per
//! buffer, each naming its buffer's address and the address of the next
//! descriptor. The hardware walks the chain autonomously; software only
//! rewrites buffer *contents*, never the chain itself.
//!
//! ```text
//! descriptor[0] ──► descriptor[1] ──► ... ──► descriptor[N-1] ─┐
//!      ▲   │buf_ptr       │buf_ptr                │buf_ptr     │
//!      │   ▼              ▼                       ▼            │
//!      │ buffer[0]      buffer[1]             buffer[N-1]      │
//!      └───────────────────────────────────────────────────────┘
//! ```
//!
//! Every buffer is always transmitted in full (with silence when the
//! application underruns), so the owner and end-of-frame flags are linked
//! once and never change.

use crate::constants::{BUFFER_COUNT, BUFFER_LEN};

/// One DMA transfer descriptor.
///
/// Field meanings follow the transfer engine's descriptor format, with the
/// silicon's bit packing left to the platform layer. `buf_ptr` and `next`
/// are plain addresses; the hardware reads them directly.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Descriptor {
    /// Capacity of the attached buffer, in bytes.
    pub block_size: u32,
    /// Bytes to transmit from the attached buffer.
    pub data_len: u32,
    /// Hardware ownership flag; always set while the ring is linked.
    pub owner: bool,
    /// End-of-frame flag; always set, so every buffer completion raises the
    /// transfer-complete interrupt.
    pub eof: bool,
    /// Address of this descriptor's buffer.
    pub buf_ptr: usize,
    /// Address of the next descriptor in the ring.
    pub next: usize,
}

impl Descriptor {
    const fn empty() -> Self {
        Descriptor {
            block_size: 0,
            data_len: 0,
            owner: false,
            eof: false,
            buf_ptr: 0,
            next: 0,
        }
    }
}

/// The fixed set of DMA buffers and their descriptor chain.
///
/// Storage lives inline, so the ring exists for the whole life of the
/// engine and buffer "allocation" cannot fail. [`link()`](Self::link)
/// captures the current addresses; the owner must therefore keep the ring
/// in place between linking and hardware shutdown.
pub(crate) struct DescriptorRing {
    buffers: [[u32; BUFFER_LEN]; BUFFER_COUNT],
    descriptors: [Descriptor; BUFFER_COUNT],
}

impl DescriptorRing {
    pub(crate) const fn new() -> Self {
        DescriptorRing {
            buffers: [[0; BUFFER_LEN]; BUFFER_COUNT],
            descriptors: [Descriptor::empty(); BUFFER_COUNT],
        }
    }

    /// Zero-fill every buffer and write the descriptor chain.
    ///
    /// Descriptor `i` points at buffer `i` and at descriptor
    /// `(i + 1) % BUFFER_COUNT`, closing the ring. Runs on every `begin()`
    /// so the captured addresses match wherever the ring currently lives.
    pub(crate) fn link(&mut self) {
        for buffer in self.buffers.iter_mut() {
            buffer.fill(0);
        }
        for index in 0..BUFFER_COUNT {
            let buf_ptr = self.buffers[index].as_ptr() as usize;
            let next = self.descriptor_addr((index + 1) % BUFFER_COUNT);
            let descriptor = &mut self.descriptors[index];
            descriptor.block_size = (BUFFER_LEN * 4) as u32;
            descriptor.data_len = (BUFFER_LEN * 4) as u32;
            descriptor.owner = true;
            descriptor.eof = true;
            descriptor.buf_ptr = buf_ptr;
            descriptor.next = next;
        }
    }

    /// Clear the descriptor chain. Only valid once the DMA engine has been
    /// detached from the ring.
    pub(crate) fn unlink(&mut self) {
        for descriptor in self.descriptors.iter_mut() {
            *descriptor = Descriptor::empty();
        }
    }

    /// Address of descriptor `index`, as the hardware sees it.
    pub(crate) fn descriptor_addr(&self, index: usize) -> usize {
        &self.descriptors[index] as *const Descriptor as usize
    }

    /// Address of the chain's head, handed to the DMA engine at start-up.
    pub(crate) fn first_descriptor(&self) -> usize {
        self.descriptor_addr(0)
    }

    /// Map a descriptor address reported by the hardware back to its buffer
    /// index. `None` for an address outside the ring.
    pub(crate) fn index_of(&self, addr: usize) -> Option<usize> {
        (0..BUFFER_COUNT).find(|&index| self.descriptor_addr(index) == addr)
    }

    /// Zero-fill one buffer.
    pub(crate) fn clear_buffer(&mut self, index: usize) {
        self.buffers[index].fill(0);
    }

    pub(crate) fn buffer(&self, index: usize) -> &[u32; BUFFER_LEN] {
        &self.buffers[index]
    }

    pub(crate) fn buffer_mut(&mut self, index: usize) -> &mut [u32; BUFFER_LEN] {
        &mut self.buffers[index]
    }

    #[cfg(test)]
    pub(crate) fn descriptor(&self, index: usize) -> &Descriptor {
        &self.descriptors[index]
    }
}
