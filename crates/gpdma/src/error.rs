//! Allocator error types.

/// Error returned by a claim when no channel in the candidate set is free.
///
/// This is an expected, recoverable outcome: the caller decides whether to
/// retry later, fall back to a CPU-driven transfer, or give up. The
/// allocator never queues the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllocError {
    /// Every channel in the requested candidate set is already owned.
    NoChannelAvailable,
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoChannelAvailable => write!(f, "no DMA channel available in candidate set"),
        }
    }
}

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

#[cfg(feature = "std")]
impl std::error::Error for OutOfRangeError {}

impl core::fmt::Display for OutOfRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "value {} outside valid range {}..={}",
            self.value, self.min, self.max
        )
    }
}
