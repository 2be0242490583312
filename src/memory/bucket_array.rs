//! Chunked, append-only sequences backed by an arena.
//!
//! A bucket array grows one fixed-capacity bucket at a time, so appending
//! never moves existing elements. Buckets live as long as the arena.

use core::cell::RefCell;
use core::marker::PhantomData;

use super::arena::{Arena, ArenaSlice, BlockId};
use crate::text::{TextInterval, TextPosition};

/// Alignment of every bucket (and of flattened buffers).
const BUCKET_ALIGN: usize = 8;

/// A fixed-size record that can be stored in arena bytes.
pub trait Element: Sized {
    /// Encoded size in bytes. Must be nonzero.
    const SIZE: usize;

    /// Write the encoding into `bytes`, which is exactly `SIZE` long.
    fn store(&self, bytes: &mut [u8]);

    /// Read an encoding produced by `store`.
    fn load(bytes: &[u8]) -> Self;
}

macro_rules! le_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const SIZE: usize = core::mem::size_of::<$t>();

                fn store(&self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }

                fn load(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; core::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

le_element!(u8, u16, u32, u64, i64, f64);

/// Store a sequence of u32 fields.
fn store_words(bytes: &mut [u8], words: &[u32]) {
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
        word.store(chunk);
    }
}

/// Load the `n`th u32 field.
fn load_word(bytes: &[u8], n: usize) -> u32 {
    u32::load(&bytes[n * 4..n * 4 + 4])
}

impl Element for ArenaSlice {
    const SIZE: usize = 12;

    fn store(&self, bytes: &mut [u8]) {
        store_words(bytes, &[self.block.0, self.offset, self.len]);
    }

    fn load(bytes: &[u8]) -> Self {
        ArenaSlice {
            block: BlockId(load_word(bytes, 0)),
            offset: load_word(bytes, 1),
            len: load_word(bytes, 2),
        }
    }
}

impl Element for TextPosition {
    const SIZE: usize = 16;

    fn store(&self, bytes: &mut [u8]) {
        store_words(
            bytes,
            &[self.file_id, self.offset_to_line, self.line, self.column],
        );
    }

    fn load(bytes: &[u8]) -> Self {
        TextPosition {
            file_id: load_word(bytes, 0),
            offset_to_line: load_word(bytes, 1),
            line: load_word(bytes, 2),
            column: load_word(bytes, 3),
        }
    }
}

impl Element for TextInterval {
    const SIZE: usize = TextPosition::SIZE + 4;

    fn store(&self, bytes: &mut [u8]) {
        let (position, size) = bytes.split_at_mut(TextPosition::SIZE);
        self.position.store(position);
        self.size.store(size);
    }

    fn load(bytes: &[u8]) -> Self {
        let (position, size) = bytes.split_at(TextPosition::SIZE);
        TextInterval {
            position: TextPosition::load(position),
            size: u32::load(size),
        }
    }
}

/// An append-only sequence of `T`, stored in buckets of `bucket_size` elements.
pub struct BucketArray<'a, T> {
    arena: &'a RefCell<Arena>,
    bucket_size: usize,

    /// Every bucket allocated so far, in order.
    /// The bucket after `current` (if any) is the forward link followed on overflow.
    buckets: Vec<ArenaSlice>,
    /// Index of the bucket being filled.
    current: usize,
    /// Elements in the current bucket.
    current_len: usize,

    _element: PhantomData<T>,
}

impl<'a, T: Element> BucketArray<'a, T> {
    pub fn new(arena: &'a RefCell<Arena>, bucket_size: usize) -> Self {
        assert!(bucket_size > 0, "bucket arrays need a nonzero bucket size");
        assert!(T::SIZE > 0, "bucket array elements must have a nonzero size");
        BucketArray {
            arena,
            bucket_size,
            buckets: Vec::new(),
            current: 0,
            current_len: 0,
            _element: PhantomData,
        }
    }

    /// Reserve the next slot and return it.
    ///
    /// A slot in a freshly allocated bucket reads as zeroes;
    /// a slot in a bucket reused after `clear` holds whatever was there before.
    pub fn append_element(&mut self) -> ArenaSlice {
        if self.buckets.is_empty() || self.current_len == self.bucket_size {
            if self.current + 1 < self.buckets.len() {
                self.current += 1;
            } else {
                let bucket = self
                    .arena
                    .borrow_mut()
                    .allocate_zeroed(self.bucket_size * T::SIZE, BUCKET_ALIGN);
                self.buckets.push(bucket);
                self.current = self.buckets.len() - 1;
                tracing::trace!(
                    "bucket array: allocated bucket {} ({} elements of {} bytes)",
                    self.current,
                    self.bucket_size,
                    T::SIZE
                );
            }
            self.current_len = 0;
        }

        let slot = self.buckets[self.current].slice(self.current_len * T::SIZE, T::SIZE);
        self.current_len += 1;
        slot
    }

    /// Append a value to the end of the sequence.
    pub fn push(&mut self, value: T) {
        let slot = self.append_element();
        value.store(self.arena.borrow_mut().get_mut(slot));
    }

    pub fn element_count(&self) -> usize {
        if self.buckets.is_empty() {
            return 0;
        }
        self.current * self.bucket_size + self.current_len
    }

    pub fn is_empty(&self) -> bool {
        self.element_count() == 0
    }

    /// Number of buckets allocated so far (including ones waiting for reuse).
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn slot_at(&self, index: usize) -> Option<ArenaSlice> {
        if index >= self.element_count() {
            return None;
        }
        let bucket = self.buckets[index / self.bucket_size];
        Some(bucket.slice((index % self.bucket_size) * T::SIZE, T::SIZE))
    }

    pub fn element_at(&self, index: usize) -> Option<T> {
        let slot = self.slot_at(index)?;
        Some(T::load(self.arena.borrow().get(slot)))
    }

    /// Copy every element, in order, into one contiguous buffer in `dest`.
    ///
    /// `dest` may be the array's own arena.
    pub fn flatten_content(&self, dest: &RefCell<Arena>) -> ArenaSlice {
        let count = self.element_count();
        if count == 0 {
            return ArenaSlice::EMPTY;
        }

        let result = dest
            .borrow_mut()
            .allocate(count * T::SIZE, BUCKET_ALIGN);
        let same_arena = core::ptr::eq(dest, self.arena);

        let mut cursor = 0;
        for (i, bucket) in self.buckets[..=self.current].iter().enumerate() {
            let live = if i == self.current {
                self.current_len
            } else {
                self.bucket_size
            } * T::SIZE;
            let src = bucket.slice(0, live);
            let dst = result.slice(cursor, live);

            if same_arena {
                dest.borrow_mut().copy(src, dst);
            } else {
                let source = self.arena.borrow();
                dest.borrow_mut().get_mut(dst).copy_from_slice(source.get(src));
            }
            cursor += live;
        }
        result
    }

    /// Iterate over the element slots, in insertion order.
    pub fn slots(&self) -> Slots<'_, 'a, T> {
        Slots {
            array: self,
            index: 0,
            bucket: 0,
            in_bucket: 0,
        }
    }

    /// Iterate over the elements, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.slots()
            .map(move |slot| T::load(self.arena.borrow().get(slot)))
    }

    /// Forget all elements. Buckets are kept and refilled in order.
    pub fn clear(&mut self) {
        tracing::trace!(
            "bucket array: clearing {} elements, keeping {} buckets",
            self.element_count(),
            self.buckets.len()
        );
        self.current = 0;
        self.current_len = 0;
    }
}

/// Forward-only iterator over the slots of a `BucketArray`.
///
/// Holding the iterator borrows the array, so no element can be appended mid-iteration.
pub struct Slots<'b, 'a, T> {
    array: &'b BucketArray<'a, T>,
    index: usize,
    bucket: usize,
    in_bucket: usize,
}

impl<T: Element> Iterator for Slots<'_, '_, T> {
    type Item = ArenaSlice;

    fn next(&mut self) -> Option<ArenaSlice> {
        if self.index >= self.array.element_count() {
            return None;
        }
        let slot = self.array.buckets[self.bucket].slice(self.in_bucket * T::SIZE, T::SIZE);

        self.index += 1;
        self.in_bucket += 1;
        if self.in_bucket == self.array.bucket_size {
            // Follow the link to the next bucket.
            self.bucket += 1;
            self.in_bucket = 0;
        }
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.element_count() - self.index;
        (remaining, Some(remaining))
    }
}

impl<T: Element> ExactSizeIterator for Slots<'_, '_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_tracks_appends() {
        let arena = RefCell::new(Arena::new());
        let mut array = BucketArray::<u32>::new(&arena, 4);
        assert_eq!(array.element_count(), 0);
        assert!(array.is_empty());

        for n in 1..=21u32 {
            array.push(n);
            assert_eq!(array.element_count(), n as usize, "after {} appends", n);
        }
        assert_eq!(array.bucket_count(), 6);
    }

    #[test]
    fn iterate_in_order() {
        let arena = RefCell::new(Arena::new());
        let mut array = BucketArray::<u64>::new(&arena, 3);
        let want: Vec<u64> = (0..10).map(|i| i * 1000 + 7).collect();
        for &v in want.iter() {
            array.push(v);
        }

        let got: Vec<u64> = array.iter().collect();
        assert_eq!(got, want);
        assert_eq!(array.slots().len(), want.len());
        assert_eq!(array.element_at(4), Some(4007));
        assert_eq!(array.element_at(10), None);
    }

    #[test]
    fn iterate_exact_bucket_multiple() {
        let arena = RefCell::new(Arena::new());
        let mut array = BucketArray::<u8>::new(&arena, 4);
        for b in b"abcdefgh" {
            array.push(*b);
        }
        let got: Vec<u8> = array.iter().collect();
        assert_eq!(&got, b"abcdefgh");
    }

    #[test]
    fn flatten_into_same_arena() {
        let arena = RefCell::new(Arena::with_block_size(64));
        let mut array = BucketArray::<u32>::new(&arena, 5);
        for v in 0..23u32 {
            array.push(v * v);
        }

        let flat = array.flatten_content(&arena);
        assert_eq!(flat.len(), 23 * 4);
        let arena = arena.borrow();
        let got: Vec<u32> = arena.get(flat).chunks_exact(4).map(u32::load).collect();
        let want: Vec<u32> = (0..23u32).map(|v| v * v).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn flatten_into_other_arena() {
        let arena = RefCell::new(Arena::new());
        let scratch = RefCell::new(Arena::new());
        let mut array = BucketArray::<TextInterval>::new(&arena, 2);
        let intervals: Vec<TextInterval> = (0..5)
            .map(|i| TextInterval {
                position: TextPosition {
                    file_id: 1,
                    offset_to_line: i * 10,
                    line: i,
                    column: i + 1,
                },
                size: 3,
            })
            .collect();
        for interval in intervals.iter() {
            array.push(*interval);
        }

        let flat = array.flatten_content(&scratch);
        let scratch = scratch.borrow();
        let got: Vec<TextInterval> = scratch
            .get(flat)
            .chunks_exact(TextInterval::SIZE)
            .map(TextInterval::load)
            .collect();
        assert_eq!(got, intervals);
    }

    #[test]
    fn flatten_empty() {
        let arena = RefCell::new(Arena::new());
        let array = BucketArray::<u32>::new(&arena, 8);
        assert_eq!(array.flatten_content(&arena), ArenaSlice::EMPTY);
        assert!(arena.borrow().is_cleared());
    }

    #[test]
    fn fresh_slots_are_zeroed() {
        let arena = RefCell::new(Arena::new());
        arena.borrow_mut().allocate_bytes(&[0xff; 64]);
        arena.borrow_mut().clear_all();

        let mut array = BucketArray::<u64>::new(&arena, 4);
        let slot = array.append_element();
        assert_eq!(arena.borrow().get(slot), &[0u8; 8]);
    }

    #[test]
    fn clear_reuses_buckets() {
        let arena = RefCell::new(Arena::new());
        let mut array = BucketArray::<u16>::new(&arena, 4);
        for v in 0..10u16 {
            array.push(v);
        }
        let before = arena.borrow().stats();

        array.clear();
        assert_eq!(array.element_count(), 0);
        assert_eq!(array.iter().count(), 0);
        for v in 100..110u16 {
            array.push(v);
        }

        assert_eq!(arena.borrow().stats(), before);
        assert_eq!(array.bucket_count(), 3);
        let got: Vec<u16> = array.iter().collect();
        let want: Vec<u16> = (100..110).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn arrays_share_an_arena() {
        let arena = RefCell::new(Arena::new());
        let mut names = BucketArray::<ArenaSlice>::new(&arena, 2);
        let mut lengths = BucketArray::<u32>::new(&arena, 2);

        for name in ["alpha", "beta", "gamma"] {
            let slice = arena.borrow_mut().allocate_bytes(name.as_bytes());
            names.push(slice);
            lengths.push(name.len() as u32);
        }

        let got: Vec<Vec<u8>> = names
            .iter()
            .map(|s| arena.borrow().get(s).to_vec())
            .collect();
        assert_eq!(got, vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()]);
        assert_eq!(lengths.iter().collect::<Vec<_>>(), vec![5, 4, 5]);
    }
}
