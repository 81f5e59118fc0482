use {
    static_assertions::{assert_eq_size, const_assert, const_assert_eq},
    std::mem::{align_of, size_of, MaybeUninit},
};

/// Amount of memory available for inline target storage in a [`Function`]:
/// three pointer widths.
///
/// x86: 12b
/// x64: 24b
///
/// [`Function`]: struct.Function.html
pub const INLINE_CAPACITY: usize = 3 * size_of::<usize>();

/// Alignment of the inline target storage in a [`Function`].
///
/// Matches the maximum natural alignment on the mainstream 64-bit targets.
///
/// [`Function`]: struct.Function.html
pub const INLINE_ALIGN: usize = 16;

/// Raw byte buffer used to store the target, if it fits in `INLINE_CAPACITY` bytes.
#[repr(C, align(16))] // Kept in sync with `INLINE_ALIGN`.
#[derive(Clone, Copy)] // `Copy` needed for union storage.
pub(crate) struct InlineStorage(MaybeUninit<[u8; INLINE_CAPACITY]>);

const_assert_eq!(align_of::<InlineStorage>(), INLINE_ALIGN);
const_assert!(size_of::<InlineStorage>() >= INLINE_CAPACITY);

impl InlineStorage {
    /// Creates the storage without initializing anything in it.
    pub(crate) fn new() -> Self {
        InlineStorage(MaybeUninit::uninit())
    }

    /// Returns `true` if a value of type `T` may be written into the storage.
    pub(crate) const fn fits<T>() -> bool {
        size_of::<T>() <= INLINE_CAPACITY && align_of::<T>() <= INLINE_ALIGN
    }

    /// Address of the first byte of the storage.
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr().cast()
    }

    /// Mutable address of the first byte of the storage.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.as_mut_ptr().cast()
    }

    /// Returns the potentially uninitialized value of type `T` in the storage.
    ///
    /// The caller is responsible for the value being initialized before it is read.
    ///
    /// # Panics
    ///
    /// Panics if `T` does not [`fit`](#method.fits).
    pub(crate) fn as_mut<T>(&mut self) -> &mut MaybeUninit<T> {
        // Can't be a const assertion, it would be evaluated for heap-resident types too.
        assert!(Self::fits::<T>(), "type does not fit the inline storage");

        // Size and alignment checked above.
        unsafe { &mut *self.0.as_mut_ptr().cast() }
    }
}

/// Owning pointer to a boxed target, if it does not fit in `INLINE_CAPACITY` bytes.
///
/// Comes from `Box::into_raw`; the concrete type is only known to the table.
pub(crate) type HeapStorage = *mut u8;

/// Target storage.
/// Inline or heap.
/// Tag/discriminant is encoded separately, in the target's table.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) union StorageUnion {
    pub(crate) inline: InlineStorage,
    pub(crate) heap: HeapStorage,
}

impl Default for StorageUnion {
    fn default() -> Self {
        Self {
            inline: InlineStorage::new(),
        }
    }
}

assert_eq_size!(StorageUnion, InlineStorage);

/// Explicit storage union tag, encoded separately.
#[derive(Clone, Copy, Eq, Debug, PartialEq)]
pub(crate) enum Residence {
    /// The target lives in `StorageUnion::inline`.
    Inline,
    /// `StorageUnion::heap` owns the boxed target.
    Heap,
}

impl Residence {
    /// Storage placement of a target of type `T`.
    ///
    /// Moves in Rust are infallible bitwise copies, so relocating an inline target never fails
    /// and size / alignment is the only criterion.
    pub(crate) const fn of<T>() -> Self {
        if InlineStorage::fits::<T>() {
            Residence::Inline
        } else {
            Residence::Heap
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity() {
        assert_eq!(INLINE_CAPACITY, size_of::<[usize; 3]>());
        assert_eq!(align_of::<StorageUnion>(), INLINE_ALIGN);
    }

    #[test]
    fn residence() {
        assert_eq!(Residence::of::<()>(), Residence::Inline);
        assert_eq!(Residence::of::<u8>(), Residence::Inline);
        assert_eq!(Residence::of::<[usize; 3]>(), Residence::Inline);
        assert_eq!(Residence::of::<(u64, u64)>(), Residence::Inline);

        assert_eq!(Residence::of::<[usize; 4]>(), Residence::Heap);
        assert_eq!(Residence::of::<[u8; INLINE_CAPACITY + 1]>(), Residence::Heap);

        #[repr(align(32))]
        struct OverAligned(u8);

        assert_eq!(Residence::of::<OverAligned>(), Residence::Heap);
        assert_eq!(OverAligned(1).0, 1);
    }

    #[test]
    fn write_read() {
        let mut storage = InlineStorage::new();

        storage.as_mut::<[u32; 2]>().write([7, 9]);

        assert_eq!(unsafe { storage.as_ptr().cast::<[u32; 2]>().read() }, [7, 9]);
        assert_eq!(storage.as_ptr(), storage.as_mut_ptr() as *const u8);
    }

    #[test]
    #[should_panic(expected = "type does not fit the inline storage")]
    fn write_too_large() {
        let mut storage = InlineStorage::new();

        storage.as_mut::<[u8; INLINE_CAPACITY + 1]>();
    }
}
