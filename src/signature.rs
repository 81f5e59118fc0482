// A value parameter `fn(T)` and a borrowed one `fn(&T)` (i.e. `for<'a> fn(&'a T)`) are distinct
// types, but the overlap check reports them as "previously accepted" overlapping impls.
#![allow(coherence_leak_check)]

/// Declared call signature of a [`Function`], spelled as a function pointer type.
///
/// Implemented for `fn(P1, ..., Pn) -> R` with up to eight parameters.
/// Each of the first four parameters may be taken by value (`T`), by shared reference (`&T`)
/// or by unique reference (`&mut T`); signatures with five to eight parameters take them by value.
/// Borrowed parameters may have any lifetime. The parameter types themselves (`T`) and
/// the result type must be `'static`, and the result may not borrow from the parameters.
///
/// ```
/// # use minifunction::Signature;
/// fn args_of<S: Signature>() -> &'static str {
///     std::any::type_name::<S::Args<'static>>()
/// }
///
/// assert_eq!(args_of::<fn(u8, bool) -> u32>(), "(u8, bool)");
/// ```
///
/// [`Function`]: struct.Function.html
pub trait Signature: 'static {
    /// Parameter types, as a tuple, with borrowed parameters living for `'a`.
    type Args<'a>;
    /// Declared result type.
    type Output;
}

/// A callable compatible with the declared signature `S`.
///
/// Blanket-implemented for every `FnMut(P1, ..., Pn) -> O` where `O: Into<R>`.
/// `M` is the callable's natural return type `O`; it only exists to keep the blanket
/// implementations coherent and is always inferred.
///
/// The conversion from `O` to the declared `R` is part of this implementation, so it is fixed
/// once per wrapped type, not looked up per call.
pub trait Invoke<S: Signature, M> {
    /// Calls the target with the argument tuple, converting the result to the declared type.
    fn invoke(&mut self, args: S::Args<'_>) -> S::Output;
}

/// Each parameter is described as
/// `name: Type [bounds] [binder lifetime] [parameter type] [argument tuple element]`.
macro_rules! impl_signature {
    (@emit $($arg:ident: $ty:ident [$($bound:tt)*] [$($hr:lifetime)?] [$($param:tt)*] [$($elem:tt)*],)*) => {
        impl<R: 'static, $($ty: $($bound)*,)*> Signature for for<$($($hr,)?)*> fn($($($param)*),*) -> R {
            type Args<'a> = ($($($elem)*,)*);
            type Output = R;
        }

        impl<F, O, R: 'static, $($ty: $($bound)*,)*> Invoke<for<$($($hr,)?)*> fn($($($param)*),*) -> R, O> for F
        where
            F: for<$($($hr,)?)*> FnMut($($($param)*),*) -> O,
            O: Into<R>,
        {
            #[inline]
            fn invoke(
                &mut self,
                args: <for<$($($hr,)?)*> fn($($($param)*),*) -> R as Signature>::Args<'_>,
            ) -> R {
                let ($($arg,)*) = args;
                (*self)($($arg),*).into()
            }
        }
    };

    // Every parameter is classified.
    (@split [$($done:tt)*]) => {
        impl_signature!(@emit $($done)*);
    };

    // Passes the next parameter by value, by shared and by unique reference.
    (@split [$($done:tt)*] $arg:ident: $ty:ident $lt:lifetime $(, $rest_arg:ident: $rest_ty:ident $rest_lt:lifetime)*) => {
        impl_signature!(
            @split [$($done)* $arg: $ty ['static] [] [$ty] [$ty],]
            $($rest_arg: $rest_ty $rest_lt),*
        );
        impl_signature!(
            @split [$($done)* $arg: $ty [?Sized + 'static] [$lt] [&$lt $ty] [&'a $ty],]
            $($rest_arg: $rest_ty $rest_lt),*
        );
        impl_signature!(
            @split [$($done)* $arg: $ty [?Sized + 'static] [$lt] [&$lt mut $ty] [&'a mut $ty],]
            $($rest_arg: $rest_ty $rest_lt),*
        );
    };

    // By value only.
    (@values $($arg:ident: $ty:ident),*) => {
        impl_signature!(@emit $($arg: $ty ['static] [] [$ty] [$ty],)*);
    };

    ($($arg:ident: $ty:ident $lt:lifetime),*) => {
        impl_signature!(@split [] $($arg: $ty $lt),*);
    };
}

impl_signature!();
impl_signature!(a1: A1 'a1);
impl_signature!(a1: A1 'a1, a2: A2 'a2);
impl_signature!(a1: A1 'a1, a2: A2 'a2, a3: A3 'a3);
impl_signature!(a1: A1 'a1, a2: A2 'a2, a3: A3 'a3, a4: A4 'a4);
impl_signature!(@values a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
impl_signature!(@values a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
impl_signature!(@values a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);
impl_signature!(@values a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7, a8: A8);
