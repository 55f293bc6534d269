use std::fmt;

#[derive(Clone, PartialEq, Eq, Debug, Hash)]
/// Coalesced call error.
pub enum Error<E> {
    /// The producer failed, every caller joined on the invocation receives the same value
    Producer(E),
    /// The producer never settled, it panicked or was dropped by the runtime
    Abandoned,
}

impl<E> Error<E> {
    /// Take the producer's own failure out of this error, if there is one
    pub fn into_producer(self) -> Option<E> {
        match self {
            Error::Producer(error) => Some(error),
            Error::Abandoned => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Producer(error) => write!(f, "{error}"),
            Error::Abandoned => write!(f, "Producer was abandoned before it settled"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}
