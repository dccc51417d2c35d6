/// Logical memory regions of the unified address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryRegion {
    /// Fixed code/data image loaded before execution.
    Program,
    /// Growable region starting right after the program image.
    Stack,
}

/// Decodes which region an address belongs to, given the program length.
///
/// Returns the region and the index within it.
#[must_use]
pub const fn decode_memory_region(address: usize, program_len: usize) -> (MemoryRegion, usize) {
    if address < program_len {
        (MemoryRegion::Program, address)
    } else {
        (MemoryRegion::Stack, address - program_len)
    }
}
