use {
    crate::{
        error::EmptyCallError,
        signature::{Invoke, Signature},
        storage::{InlineStorage, Residence, StorageUnion},
        vtable::{Adapter, FunctionVTable},
    },
    static_assertions::{assert_eq_size, assert_not_impl_any},
    std::{any::type_name, fmt, marker::PhantomData, mem},
};

/// The empty sentinel.
///
/// Converts into an empty [`Function`] of any signature and compares equal to every empty one.
///
/// ```
/// # use minifunction::{Empty, Function};
/// let mut f: Function<fn() -> u32> = Function::new(|| 7u32);
/// assert!(f != Empty);
///
/// f = Empty.into();
/// assert!(f == Empty);
/// ```
///
/// [`Function`]: struct.Function.html
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Empty;

/// Type-erased, clonable wrapper for a callable with the declared signature `S`.
///
/// `S` is spelled as a function pointer type, e.g. `Function<fn(i32, i32) -> i32>`.
/// Any `FnMut` closure or function whose parameters match and whose result converts
/// [`Into`] the declared result type may be wrapped, as long as it is `Clone + 'static`.
///
/// Internally uses the small buffer optimization, providing [`INLINE_CAPACITY`] bytes
/// (three pointer widths) of target storage. Targets larger than that, or aligned to more than
/// [`INLINE_ALIGN`], are stored on the heap. See [`fits`].
///
/// Clones never share storage. The wrapper never stores its own address, so it may be moved
/// freely, including by containers relocating their elements.
///
/// Not thread safe: a `Function` is neither `Send` nor `Sync`, whatever the target.
///
/// ```
/// use minifunction::{Empty, Function};
///
/// let mut add: Function<fn(i32, i32) -> i32> = Function::new(|a: i32, b: i32| a + b);
/// assert!(add.is_valid());
/// assert_eq!(add.call((2, 3)), Ok(5));
///
/// // The target's result is converted to the declared result type.
/// let mut wide: Function<fn() -> f64> = Function::new(|| 42i32);
/// assert_eq!(wide.call(()), Ok(42.0));
///
/// // Moving out leaves the source empty.
/// let mut taken = add.take();
/// assert_eq!(taken.call((2, 3)), Ok(5));
/// assert!(add == Empty);
/// assert!(add.call((2, 3)).is_err());
///
/// // Parameters may be borrowed.
/// let mut push: Function<fn(&mut Vec<i32>, i32)> = Function::new(|v: &mut Vec<i32>, x: i32| v.push(x));
/// let mut v = Vec::new();
/// push.call((&mut v, 1)).unwrap();
/// assert_eq!(v, [1]);
/// ```
///
/// Callables with a mismatching signature are rejected at compile time:
///
/// ```compile_fail
/// # use minifunction::Function;
/// let f: Function<fn(i32) -> usize> = Function::new(|s: &'static str| s.len());
/// ```
///
/// ```compile_fail
/// # use minifunction::Function;
/// // `u32` does not convert into `u8`.
/// let f: Function<fn() -> u8> = Function::new(|| 1000u32);
/// ```
///
/// A `Function` does not wrap another `Function`, nor the [`Empty`] sentinel:
///
/// ```compile_fail
/// # use minifunction::Function;
/// let inner: Function<fn() -> i32> = Function::new(|| 1);
/// let outer: Function<fn() -> i32> = Function::new(inner);
/// ```
///
/// [`INLINE_CAPACITY`]: constant.INLINE_CAPACITY.html
/// [`INLINE_ALIGN`]: constant.INLINE_ALIGN.html
/// [`fits`]: #method.fits
/// [`Empty`]: struct.Empty.html
pub struct Function<S: Signature> {
    /// `None` if empty; otherwise names the target's type and residence.
    vtable: Option<&'static FunctionVTable<S>>,
    storage: StorageUnion,
    unsend: PhantomData<*mut u8>,
}

assert_not_impl_any!(Function<fn()>: Send, Sync);
assert_eq_size!(Option<&'static FunctionVTable<fn()>>, usize);

impl<S: Signature> Function<S> {
    /// Creates an empty [`Function`].
    ///
    /// [`Function`]: struct.Function.html
    pub fn empty() -> Self {
        Function {
            vtable: None,
            storage: StorageUnion::default(),
            unsend: PhantomData,
        }
    }

    /// Returns `true` if the target type `F` is stored inline, without allocation.
    /// If `true`, then [`new`] is guaranteed to not allocate for `F`.
    ///
    /// ```
    /// # use minifunction::Function;
    /// assert!(Function::<fn()>::fits::<[usize; 3]>());
    /// assert!(!Function::<fn()>::fits::<[usize; 4]>());
    /// ```
    ///
    /// [`new`]: #method.new
    pub const fn fits<F>() -> bool {
        InlineStorage::fits::<F>()
    }

    /// Creates a [`Function`] which holds the target `f`.
    ///
    /// `f` is stored inline if it [`fits`], boxed otherwise.
    ///
    /// `M` is the natural result type of `f` and is always inferred.
    ///
    /// [`Function`]: struct.Function.html
    /// [`fits`]: #method.fits
    pub fn new<F, M>(f: F) -> Self
    where
        F: Invoke<S, M> + Clone + 'static,
    {
        Function {
            vtable: Some(Adapter::<S, F, M>::vtable()),
            storage: Adapter::<S, F, M>::store(f),
            unsend: PhantomData,
        }
    }

    /// Replaces the held target, if any, with `f`.
    pub fn set<F, M>(&mut self, f: F)
    where
        F: Invoke<S, M> + Clone + 'static,
    {
        *self = Self::new(f);
    }

    /// Drops the held target, if any; frees its heap storage, if necessary.
    ///
    /// The [`Function`] is empty afterwards.
    ///
    /// [`Function`]: struct.Function.html
    pub fn clear(&mut self) {
        if let Some(vtable) = self.vtable.take() {
            let target = self.target_mut(vtable);

            unsafe {
                vtable.release(target);
            }
        }
    }

    /// Moves the held target, if any, into a new [`Function`], leaving `self` empty.
    ///
    /// Move-assignment is `*dst = src.take()`: the old target of `dst` is dropped,
    /// `src` is left empty. `f = f.take()` leaves `f` holding its own target.
    ///
    /// [`Function`]: struct.Function.html
    pub fn take(&mut self) -> Self {
        let mut result = Self::empty();

        if let Some(vtable) = self.vtable.take() {
            let target = self.target_mut(vtable);

            match vtable.residence() {
                Residence::Inline => unsafe {
                    vtable.move_to_inline(target, &mut result.storage.inline);
                },
                // Only the owning pointer changes hands.
                Residence::Heap => result.storage.heap = target,
            }

            result.vtable = Some(vtable);
        }

        result
    }

    /// Exchanges the targets of two [`Function`]s.
    ///
    /// [`Function`]: struct.Function.html
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Calls the held target with the argument tuple `args`.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyCallError`] if the [`Function`] is empty.
    ///
    /// [`Function`]: struct.Function.html
    /// [`EmptyCallError`]: struct.EmptyCallError.html
    pub fn call(&mut self, args: S::Args<'_>) -> Result<S::Output, EmptyCallError> {
        let vtable = self.vtable.ok_or(EmptyCallError)?;
        let target = self.target_mut(vtable);

        Ok(unsafe { vtable.invoke(target, args) })
    }

    /// If the [`Function`] holds a target, returns `true`; otherwise returns `false`.
    ///
    /// [`Function`]: struct.Function.html
    pub fn is_valid(&self) -> bool {
        self.vtable.is_some()
    }

    /// If the [`Function`] holds no target, returns `true`; otherwise returns `false`.
    ///
    /// [`Function`]: struct.Function.html
    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    /// If the [`Function`] holds a target stored inline, returns `true`; otherwise returns `false`.
    ///
    /// [`Function`]: struct.Function.html
    pub fn is_inline(&self) -> bool {
        self.residence() == Some(Residence::Inline)
    }

    fn residence(&self) -> Option<Residence> {
        self.vtable.map(FunctionVTable::residence)
    }

    /// Address of the target, recomputed from `self` on every access.
    fn target(&self, vtable: &FunctionVTable<S>) -> *const u8 {
        match vtable.residence() {
            Residence::Inline => unsafe { self.storage.inline.as_ptr() },
            Residence::Heap => unsafe { self.storage.heap },
        }
    }

    fn target_mut(&mut self, vtable: &FunctionVTable<S>) -> *mut u8 {
        match vtable.residence() {
            Residence::Inline => unsafe { self.storage.inline.as_mut_ptr() },
            Residence::Heap => unsafe { self.storage.heap },
        }
    }
}

impl<S: Signature> Clone for Function<S> {
    fn clone(&self) -> Self {
        let mut result = Self::empty();

        if let Some(vtable) = self.vtable {
            let target = self.target(vtable);

            match vtable.residence() {
                Residence::Inline => unsafe {
                    vtable.clone_to_inline(target, &mut result.storage.inline);
                },
                Residence::Heap => result.storage.heap = unsafe { vtable.clone_to_heap(target) },
            }

            // Only adopt the table once the target is fully built;
            // a panicking `clone` leaves `result` empty.
            result.vtable = Some(vtable);
        }

        result
    }

    /// Clones into a temporary and swaps, so `self` is unmodified if the target's `clone` panics.
    fn clone_from(&mut self, source: &Self) {
        let mut temp = source.clone();
        self.swap(&mut temp);
    }
}

impl<S: Signature> Drop for Function<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<S: Signature> Default for Function<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: Signature> From<Empty> for Function<S> {
    fn from(_: Empty) -> Self {
        Self::empty()
    }
}

impl<S: Signature> PartialEq<Empty> for Function<S> {
    fn eq(&self, _: &Empty) -> bool {
        self.is_empty()
    }
}

impl<S: Signature> PartialEq<Function<S>> for Empty {
    fn eq(&self, other: &Function<S>) -> bool {
        other.is_empty()
    }
}

impl<S: Signature> fmt::Debug for Function<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.residence() {
            None => "empty",
            Some(Residence::Inline) => "inline",
            Some(Residence::Heap) => "heap",
        };

        f.debug_struct("Function")
            .field("signature", &format_args!("{}", type_name::<S>()))
            .field("state", &format_args!("{}", state))
            .finish()
    }
}
