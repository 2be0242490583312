//! Block-based bump allocator.
//!
//! The arena owns a chain of fixed-size blocks. Allocations bump a cursor in
//! the current block; released spans go on a free list and are handed out
//! again first-fit.
//!
//! Blocks never move once created: the chain order is kept separately
//! (as a list of block IDs), so reordering the chain does not invalidate
//! any `ArenaSlice` that was handed out.

/// Capacity of a block when the request does not need a bigger one.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024;

/// Smallest span the free list will track:
/// a link, an offset and a size, as the record would be laid out in the span itself.
pub const FREE_ENTRY_SIZE: u32 = 16;
pub const FREE_ENTRY_ALIGN: u32 = 8;

/// Stable identifier of a block within one arena.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A handle to a span of bytes allocated from an `Arena`.
///
/// The handle is only meaningful for the arena that produced it,
/// and only until that arena is released with `free_all`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ArenaSlice {
    pub(crate) block: BlockId,
    pub(crate) offset: u32,
    pub(crate) len: u32,
}

impl ArenaSlice {
    /// The zero-length slice. It resolves to `&[]` in any arena.
    pub const EMPTY: ArenaSlice = ArenaSlice {
        block: BlockId(0),
        offset: 0,
        len: 0,
    };

    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Offset of the first byte within its block.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A sub-span of this slice.
    pub fn slice(&self, start: usize, len: usize) -> ArenaSlice {
        assert!(
            start + len <= self.len(),
            "sub-slice {}+{} out of range for slice of {} bytes",
            start,
            len,
            self.len
        );
        if len == 0 {
            return ArenaSlice::EMPTY;
        }
        ArenaSlice {
            block: self.block,
            offset: self.offset + start as u32,
            len: len as u32,
        }
    }

    fn end(&self) -> u32 {
        self.offset + self.len
    }
}

struct Block {
    data: Box<[u8]>,
    /// Bump cursor: everything below this offset has been handed out.
    offset: u32,
    /// Bytes left above the cursor.
    space: u32,
}

impl Block {
    fn new(capacity: u32) -> Self {
        Block {
            data: vec![0u8; capacity as usize].into_boxed_slice(),
            offset: 0,
            space: capacity,
        }
    }

    /// Can a bump allocation of this size and alignment land here?
    fn fits(&self, size: u32, alignment: u32) -> bool {
        let padding = align_up(self.offset, alignment) - self.offset as u64;
        self.space as u64 >= padding + size as u64
    }
}

/// A released span, waiting to be reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct FreeEntry {
    block: BlockId,
    offset: u32,
    size: u32,
}

/// Usage summary of an arena.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArenaStats {
    pub blocks: usize,
    /// Total capacity of all blocks.
    pub bytes_reserved: usize,
    /// Bytes below the bump cursors, including padding and freed spans.
    pub bytes_used: usize,
    pub free_entries: usize,
}

/// Single-owner region allocator.
pub struct Arena {
    blocks: Vec<Block>,
    /// Block order. Blocks after `current` have been reset and are waiting for reuse.
    chain: Vec<BlockId>,
    /// Index into `chain` of the block that bump allocations land in.
    current: Option<usize>,
    /// LIFO: the most recently freed span is at the end.
    free_list: Vec<FreeEntry>,
    block_size: u32,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("stats", &self.stats())
            .field("chain", &self.chain)
            .field("current", &self.current)
            .finish()
    }
}

/// Round `offset` up to the next multiple of `alignment` (a power of two).
fn align_up(offset: u32, alignment: u32) -> u64 {
    let mask = alignment as u64 - 1;
    (offset as u64 + mask) & !mask
}

impl Arena {
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    /// Create an arena whose blocks hold (at least) `block_size` bytes.
    pub fn with_block_size(block_size: usize) -> Self {
        assert!(
            block_size > 0 && block_size <= u32::MAX as usize,
            "invalid arena block size {}",
            block_size
        );
        Arena {
            blocks: Vec::new(),
            chain: Vec::new(),
            current: None,
            free_list: Vec::new(),
            block_size: block_size as u32,
        }
    }

    /// Allocate `size` bytes at an offset that is a multiple of `alignment`.
    ///
    /// The returned bytes are not cleared: they may hold data from an earlier
    /// allocation that was freed or reset. Use `allocate_zeroed` when that matters.
    pub fn allocate(&mut self, size: usize, alignment: usize) -> ArenaSlice {
        assert!(
            size > 0 && size <= u32::MAX as usize,
            "invalid allocation size {}",
            size
        );
        assert!(
            alignment.is_power_of_two() && alignment <= 1 << 31,
            "alignment {} is not a power of two",
            alignment
        );
        let size = size as u32;
        let alignment = alignment as u32;

        if let Some(slice) = self.take_free(size, alignment) {
            return slice;
        }

        let target = match self.current {
            Some(current) if self.blocks[self.chain[current].idx()].fits(size, alignment) => {
                current
            }
            _ => self.select_block(size, alignment),
        };
        self.bump(target, size, alignment)
    }

    /// Allocate and clear `size` bytes.
    pub fn allocate_zeroed(&mut self, size: usize, alignment: usize) -> ArenaSlice {
        let slice = self.allocate(size, alignment);
        self.get_mut(slice).fill(0);
        slice
    }

    /// Copy `bytes` into the arena.
    pub fn allocate_bytes(&mut self, bytes: &[u8]) -> ArenaSlice {
        if bytes.is_empty() {
            return ArenaSlice::EMPTY;
        }
        let slice = self.allocate(bytes.len(), 1);
        self.get_mut(slice).copy_from_slice(bytes);
        slice
    }

    /// First fit over the free list, newest entry first.
    fn take_free(&mut self, size: u32, alignment: u32) -> Option<ArenaSlice> {
        let (idx, start) = self.free_list.iter().enumerate().rev().find_map(|(i, entry)| {
            let start = align_up(entry.offset, alignment);
            let end = entry.offset as u64 + entry.size as u64;
            (start + size as u64 <= end).then_some((i, start as u32))
        })?;

        let entry = self.free_list.remove(idx);
        let slice = ArenaSlice {
            block: entry.block,
            offset: start,
            len: size,
        };
        let remainder = entry.offset + entry.size - slice.end();
        if remainder > 0 {
            self.record_free(entry.block, slice.end(), remainder);
        }
        Some(slice)
    }

    /// Find or create a block that can hold the request; returns its chain index.
    fn select_block(&mut self, size: u32, alignment: u32) -> usize {
        let Some(current) = self.current else {
            return self.push_block(size);
        };

        let found = (current + 1..self.chain.len())
            .find(|&i| self.blocks[self.chain[i].idx()].fits(size, alignment));
        let Some(found) = found else {
            return self.push_block(size);
        };

        let id = self.chain.remove(found);
        let current_space = self.blocks[self.chain[current].idx()].space;
        if self.blocks[id.idx()].space > current_space {
            // Promote: the reused block becomes the bump target from now on.
            self.chain.insert(current + 1, id);
            self.current = Some(current + 1);
            current + 1
        } else {
            // Keep the fuller block closest to retirement, ahead of current.
            self.chain.insert(current, id);
            self.current = Some(current + 1);
            current
        }
    }

    /// Get a fresh block from the system and make it current.
    fn push_block(&mut self, size: u32) -> usize {
        let capacity = size.max(self.block_size);
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(capacity));

        let position = self.current.map_or(0, |current| current + 1);
        self.chain.insert(position, id);
        self.current = Some(position);
        tracing::trace!(
            "arena: new block {:?} of {} bytes ({} blocks)",
            id,
            capacity,
            self.blocks.len()
        );
        position
    }

    fn bump(&mut self, chain_index: usize, size: u32, alignment: u32) -> ArenaSlice {
        let id = self.chain[chain_index];
        let block = &mut self.blocks[id.idx()];
        debug_assert!(block.fits(size, alignment));

        let start = align_up(block.offset, alignment) as u32;
        let advancement = start - block.offset + size;
        block.offset += advancement;
        block.space -= advancement;

        ArenaSlice {
            block: id,
            offset: start,
            len: size,
        }
    }

    /// Return a span for reuse.
    ///
    /// Spans too small to be tracked are dropped until the arena is reset.
    /// Adjacent free spans are never coalesced.
    pub fn free(&mut self, slice: ArenaSlice) {
        if slice.is_empty() {
            return;
        }
        let block = self
            .blocks
            .get(slice.block.idx())
            .unwrap_or_else(|| panic!("freed slice {:?} is not from this arena", slice));
        assert!(
            slice.end() <= block.offset,
            "freed slice {:?} is outside the used region of its block",
            slice
        );
        self.record_free(slice.block, slice.offset, slice.len);
    }

    fn record_free(&mut self, block: BlockId, offset: u32, size: u32) {
        let padding = align_up(offset, FREE_ENTRY_ALIGN) - offset as u64;
        if size as u64 >= padding + FREE_ENTRY_SIZE as u64 {
            self.free_list.push(FreeEntry {
                block,
                offset,
                size,
            });
        } else {
            tracing::trace!(
                "arena: dropping {} free bytes at {:?}+{}",
                size,
                block,
                offset
            );
        }
    }

    /// Rewind every block, keeping them for reuse. The free list is discarded.
    pub fn clear_all(&mut self) {
        for block in self.blocks.iter_mut() {
            block.space += block.offset;
            block.offset = 0;
        }
        self.free_list.clear();
        self.current = if self.chain.is_empty() { None } else { Some(0) };
        tracing::trace!("arena: cleared {} blocks", self.blocks.len());
    }

    /// Return every block to the system.
    pub fn free_all(&mut self) {
        tracing::trace!("arena: releasing {} blocks", self.blocks.len());
        self.blocks.clear();
        self.chain.clear();
        self.free_list.clear();
        self.current = None;
    }

    /// True if nothing has been allocated since creation or the last reset.
    pub fn is_cleared(&self) -> bool {
        self.current.unwrap_or(0) == 0 && self.blocks.iter().all(|block| block.offset == 0)
    }

    pub fn get(&self, slice: ArenaSlice) -> &[u8] {
        if slice.is_empty() {
            return &[];
        }
        let start = slice.offset as usize;
        &self.blocks[slice.block.idx()].data[start..start + slice.len()]
    }

    pub fn get_mut(&mut self, slice: ArenaSlice) -> &mut [u8] {
        if slice.is_empty() {
            return &mut [];
        }
        let start = slice.offset as usize;
        &mut self.blocks[slice.block.idx()].data[start..start + slice.len()]
    }

    /// Copy the contents of `src` into `dst`. The spans may live in any blocks.
    pub fn copy(&mut self, src: ArenaSlice, dst: ArenaSlice) {
        assert_eq!(src.len, dst.len, "copy between slices of different sizes");
        if src.is_empty() {
            return;
        }
        let (a, b) = (src.block.idx(), dst.block.idx());
        let src_range = src.offset as usize..src.end() as usize;
        let dst_range = dst.offset as usize..dst.end() as usize;

        if a == b {
            self.blocks[a].data.copy_within(src_range, dst.offset as usize);
        } else if a < b {
            let (low, high) = self.blocks.split_at_mut(b);
            high[0].data[dst_range].copy_from_slice(&low[a].data[src_range]);
        } else {
            let (low, high) = self.blocks.split_at_mut(a);
            low[b].data[dst_range].copy_from_slice(&high[0].data[src_range]);
        }
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            blocks: self.blocks.len(),
            bytes_reserved: self.blocks.iter().map(|b| b.data.len()).sum(),
            bytes_used: self.blocks.iter().map(|b| b.offset as usize).sum(),
            free_entries: self.free_list.len(),
        }
    }
}
