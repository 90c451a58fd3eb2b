//! Initiator SPI allocation

use rand::RngCore;

/// Source of candidate initiator SPIs
///
/// The manager rejects zero and SPIs already in its table and asks again,
/// so implementations need not track what they handed out.
pub trait SpiAllocator: Send + Sync {
    /// Draw a candidate SPI
    fn allocate_initiator_spi(&self) -> u64;
}

/// Random SPIs from the thread-local, OS-seeded RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSpiAllocator;

impl SpiAllocator for RandomSpiAllocator {
    fn allocate_initiator_spi(&self) -> u64 {
        rand::thread_rng().next_u64()
    }
}

impl<F> SpiAllocator for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn allocate_initiator_spi(&self) -> u64 {
        self()
    }
}
