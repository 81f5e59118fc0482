use thiserror::Error;

/// Returned by [`Function::call`] when the [`Function`] holds no target.
///
/// [`Function`]: struct.Function.html
/// [`Function::call`]: struct.Function.html#method.call
#[derive(Clone, Copy, Debug, Default, Eq, Error, PartialEq)]
#[error("tried to call an empty `Function`")]
pub struct EmptyCallError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(EmptyCallError.to_string(), "tried to call an empty `Function`");
    }

    #[test]
    fn boxed() {
        let err: Box<dyn std::error::Error> = EmptyCallError.into();

        assert!(err.source().is_none());
        assert!(err.downcast_ref::<EmptyCallError>().is_some());
    }
}
