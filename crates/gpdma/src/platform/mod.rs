//! Static channel tables for supported parts.
//!
//! A platform table lists, for every GPDMA channel, its register block and
//! NVIC vector, and groups the channels into clock domains (one per
//! controller). The allocator treats the table as fixed configuration data.

pub mod stm32h5;
