use {
    crate::{
        signature::{Invoke, Signature},
        storage::{InlineStorage, Residence, StorageUnion},
    },
    std::{
        any::type_name,
        marker::PhantomData,
        mem::{align_of, size_of, ManuallyDrop, MaybeUninit},
        ptr,
    },
    tracing::trace,
};

/// Static function which
/// 1) casts the target pointer to the concrete target type,
/// 2) moves the type-erased argument tuple out of the argument pointer, into the target's parameters,
/// 3) writes the target's result, converted to the declared result type, to the result pointer.
///
/// Argument and result are passed by pointer so borrowed parameters of any lifetime
/// go through the same table.
type Invoker = unsafe fn(*mut u8, *mut u8, *mut u8);

/// Static function which clones the target into a new box and returns the owning pointer.
type HeapCloner = unsafe fn(*const u8) -> *mut u8;

/// Static function which clones the target into the passed inline storage.
type InlineCloner = unsafe fn(*const u8, &mut InlineStorage);

/// Static function which moves the target out of its current location into the passed inline storage.
/// Never fails.
type Relocator = unsafe fn(*mut u8, &mut InlineStorage);

/// Static function which releases the target.
type Releaser = unsafe fn(*mut u8);

/// Vtable struct for a concrete target type
/// which knows
/// 1) how to call the target;
/// 2) how to clone it, into a box or into inline storage;
/// 3) how to relocate it into inline storage;
/// 4) how to drop it, in place or together with its box;
/// 5) whether the target is stored inline or boxed.
/// A static reference to this is stored in the [`Function`].
///
/// All target pointers point to the value itself, wherever it lives.
///
/// [`Function`]: struct.Function.html
pub(crate) struct FunctionVTable<S: Signature> {
    signature: PhantomData<fn() -> S>,
    residence: Residence,
    invoke: Invoker,
    clone_to_heap: HeapCloner,
    clone_to_inline: InlineCloner,
    move_to_inline: Relocator,
    drop_inline: Releaser,
    drop_heap: Releaser,
}

impl<S: Signature> FunctionVTable<S> {
    pub(crate) fn residence(&self) -> Residence {
        self.residence
    }

    /// # Safety
    ///
    /// `target` points to a live value of the type this table was generated for.
    pub(crate) unsafe fn invoke(&self, target: *mut u8, args: S::Args<'_>) -> S::Output {
        // Moved out by the invoker, also when the target panics.
        let mut args = ManuallyDrop::new(args);
        let mut result = MaybeUninit::<S::Output>::uninit();

        (self.invoke)(
            target,
            (&mut *args as *mut S::Args<'_>).cast(),
            result.as_mut_ptr().cast(),
        );

        result.assume_init()
    }

    /// # Safety
    ///
    /// `target` points to a live value of the type this table was generated for.
    pub(crate) unsafe fn clone_to_heap(&self, target: *const u8) -> *mut u8 {
        (self.clone_to_heap)(target)
    }

    /// # Safety
    ///
    /// `target` points to a live value of the type this table was generated for;
    /// the table is for an inline-resident type; `dest` holds no live value.
    pub(crate) unsafe fn clone_to_inline(&self, target: *const u8, dest: &mut InlineStorage) {
        debug_assert_eq!(self.residence, Residence::Inline);
        (self.clone_to_inline)(target, dest)
    }

    /// The value behind `target` is moved out and must not be used or dropped afterwards.
    ///
    /// # Safety
    ///
    /// `target` points to a live value of the type this table was generated for;
    /// the table is for an inline-resident type; `dest` holds no live value.
    pub(crate) unsafe fn move_to_inline(&self, target: *mut u8, dest: &mut InlineStorage) {
        debug_assert_eq!(self.residence, Residence::Inline);
        (self.move_to_inline)(target, dest)
    }

    /// Drops the target, and frees its box if it is heap-resident.
    ///
    /// # Safety
    ///
    /// `target` points to a live value of the type this table was generated for,
    /// in the storage named by the table's residence. It is not used afterwards.
    pub(crate) unsafe fn release(&self, target: *mut u8) {
        match self.residence {
            Residence::Inline => (self.drop_inline)(target),
            Residence::Heap => (self.drop_heap)(target),
        }
    }
}

/// Generates the [`FunctionVTable`] for the target type `F` called with the signature `S`.
///
/// `M` is the natural return type of `F`, see [`Invoke`].
pub(crate) struct Adapter<S, F, M>(PhantomData<(fn() -> S, fn() -> F, fn() -> M)>);

impl<S, F, M> Adapter<S, F, M>
where
    S: Signature,
    F: Invoke<S, M> + Clone + 'static,
{
    const VTABLE: &'static FunctionVTable<S> = &FunctionVTable {
        signature: PhantomData,
        residence: Residence::of::<F>(),
        invoke: Self::invoke,
        clone_to_heap: Self::clone_to_heap,
        clone_to_inline: Self::clone_to_inline,
        move_to_inline: Self::move_to_inline,
        drop_inline: Self::drop_inline,
        drop_heap: Self::drop_heap,
    };

    pub(crate) fn vtable() -> &'static FunctionVTable<S> {
        Self::VTABLE
    }

    #[cfg(test)]
    fn vtable_of(_: &F) -> &'static FunctionVTable<S> {
        Self::vtable()
    }

    /// Places the target in new storage, inline if it fits, boxed otherwise.
    pub(crate) fn store(f: F) -> StorageUnion {
        let mut storage = StorageUnion::default();

        match Residence::of::<F>() {
            Residence::Inline => unsafe {
                storage.inline.as_mut::<F>().write(f);
            },
            Residence::Heap => {
                trace!(
                    callable = type_name::<F>(),
                    size = size_of::<F>(),
                    align = align_of::<F>(),
                    "callable does not fit inline storage, boxing"
                );

                storage.heap = Box::into_raw(Box::new(f)).cast();
            }
        }

        storage
    }

    unsafe fn invoke(target: *mut u8, args: *mut u8, result: *mut u8) {
        let args = ptr::read(args.cast::<S::Args<'_>>());
        let output = Invoke::<S, M>::invoke(&mut *target.cast::<F>(), args);

        result.cast::<S::Output>().write(output);
    }

    unsafe fn clone_to_heap(target: *const u8) -> *mut u8 {
        trace!(
            callable = type_name::<F>(),
            size = size_of::<F>(),
            align = align_of::<F>(),
            "cloning boxed callable"
        );

        // Clone first, so a panicking `clone` allocates nothing.
        let f = (*target.cast::<F>()).clone();

        Box::into_raw(Box::new(f)).cast()
    }

    unsafe fn clone_to_inline(target: *const u8, dest: &mut InlineStorage) {
        let f = (*target.cast::<F>()).clone();

        dest.as_mut::<F>().write(f);
    }

    unsafe fn move_to_inline(target: *mut u8, dest: &mut InlineStorage) {
        // Check the destination before the value is read out.
        let dest = dest.as_mut::<F>();

        dest.write(ptr::read(target.cast::<F>()));
    }

    unsafe fn drop_inline(target: *mut u8) {
        ptr::drop_in_place(target.cast::<F>());
    }

    unsafe fn drop_heap(target: *mut u8) {
        drop(Box::from_raw(target.cast::<F>()));
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{cell::Cell, rc::Rc},
    };

    type Nullary = fn() -> usize;

    /// Counts how many of its clones were dropped.
    #[derive(Clone)]
    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    unsafe fn inline_ptr(storage: &mut StorageUnion) -> *mut u8 {
        storage.inline.as_mut_ptr()
    }

    #[test]
    fn inline_lifecycle() {
        let drops = Rc::new(Cell::new(0));
        let counter = DropCounter(drops.clone());
        let x = 100usize;

        let f = move || {
            let _ = &counter;
            x
        };

        let vtable = Adapter::<Nullary, _, _>::vtable_of(&f);
        assert_eq!(vtable.residence(), Residence::Inline);

        let mut storage = Adapter::<Nullary, _, _>::store(f);

        unsafe {
            let target = inline_ptr(&mut storage);
            assert_eq!(vtable.invoke(target, ()), 100);

            // Clone.
            let mut cloned = StorageUnion::default();
            vtable.clone_to_inline(target, &mut cloned.inline);
            assert_eq!(vtable.invoke(inline_ptr(&mut cloned), ()), 100);

            // Relocate the original; its old location is dead now.
            let mut moved = StorageUnion::default();
            vtable.move_to_inline(target, &mut moved.inline);
            assert_eq!(vtable.invoke(inline_ptr(&mut moved), ()), 100);

            assert_eq!(drops.get(), 0);

            vtable.release(inline_ptr(&mut cloned));
            assert_eq!(drops.get(), 1);

            vtable.release(inline_ptr(&mut moved));
            assert_eq!(drops.get(), 2);
        }
    }

    #[test]
    fn heap_lifecycle() {
        let drops = Rc::new(Cell::new(0));
        let counter = DropCounter(drops.clone());
        let payload = [9u8; 128];

        let f = move || {
            let _ = &counter;
            payload.len()
        };

        let vtable = Adapter::<Nullary, _, _>::vtable_of(&f);
        assert_eq!(vtable.residence(), Residence::Heap);

        let storage = Adapter::<Nullary, _, _>::store(f);

        unsafe {
            let target = storage.heap;
            assert_eq!(vtable.invoke(target, ()), 128);

            let cloned = vtable.clone_to_heap(target);
            assert_ne!(cloned, target);
            assert_eq!(vtable.invoke(cloned, ()), 128);

            vtable.release(target);
            assert_eq!(drops.get(), 1);

            // The clone is independent of the released original.
            assert_eq!(vtable.invoke(cloned, ()), 128);

            vtable.release(cloned);
            assert_eq!(drops.get(), 2);
        }
    }

    #[test]
    fn mutable_target() {
        let mut calls = 0usize;
        let f = move || {
            calls += 1;
            calls
        };

        let vtable = Adapter::<Nullary, _, _>::vtable_of(&f);
        let mut storage = Adapter::<Nullary, _, _>::store(f);

        unsafe {
            let target = inline_ptr(&mut storage);

            assert_eq!(vtable.invoke(target, ()), 1);
            assert_eq!(vtable.invoke(target, ()), 2);

            // The clone carries the state at the time of cloning.
            let mut cloned = StorageUnion::default();
            vtable.clone_to_inline(target, &mut cloned.inline);
            assert_eq!(vtable.invoke(inline_ptr(&mut cloned), ()), 3);
            assert_eq!(vtable.invoke(target, ()), 3);

            vtable.release(inline_ptr(&mut cloned));
            vtable.release(target);
        }
    }
}
