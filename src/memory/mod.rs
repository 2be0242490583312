//! Memory substrate for compiler data.
//!
//! -   `Arena`: a block-based bump allocator.
//!     Blocks are requested from the system as needed and are only returned
//!     wholesale (`free_all`); `clear_all` rewinds them for reuse.
//!     Released spans go on a free list and are reused first-fit.
//! -   `BucketArray`: an append-only sequence of fixed-size records,
//!     allocated one bucket at a time from an arena.
//!     Growing never moves existing records.
//!
//! Both are single-owner structures. Sharing an arena between several
//! bucket arrays goes through a `RefCell`, so it stays on one thread.

mod arena;
mod bucket_array;

pub use arena::{
    Arena, ArenaSlice, ArenaStats, BlockId, DEFAULT_BLOCK_SIZE, FREE_ENTRY_ALIGN, FREE_ENTRY_SIZE,
};
pub use bucket_array::{BucketArray, Element, Slots};
