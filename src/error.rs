use std::error;
use std::fmt;

/// Errors returned by [`Pool`] construction and submission.
///
/// [`Pool`]: crate::Pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The requested configuration cannot be represented internally (currently: a worker
    /// count that would overflow the pool's ring indexing).
    InvalidConfig,
    /// [`Pool::invoke`](crate::Pool::invoke) was called after [`Pool::terminate`](crate::Pool::terminate).
    PoolTerminated,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidConfig => write!(f, "invalid pool configuration"),
            PoolError::PoolTerminated => write!(f, "pool has been terminated"),
        }
    }
}

impl error::Error for PoolError {}

/// Errors returned by [`Fork::fork`](crate::Fork::fork).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkError {
    /// The calling thread is not currently attached to any pool.
    NotInPool,
    /// `fork` was already called once on this task.
    AlreadyForked,
}

impl fmt::Display for ForkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkError::NotInPool => write!(f, "fork() called outside of any pool"),
            ForkError::AlreadyForked => write!(f, "task has already been forked"),
        }
    }
}

impl error::Error for ForkError {}

/// Errors returned by [`Fork::join`](crate::Fork::join).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// The calling thread is not currently attached to any pool.
    NotInPool,
    /// `join` was called before a matching `fork`.
    NotForked,
    /// `join` was called while attached to a different pool than the one `fork` ran in.
    WrongPool,
    /// `join` was already called once on this task.
    AlreadyJoined,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::NotInPool => write!(f, "join() called outside of any pool"),
            JoinError::NotForked => write!(f, "join() called before fork()"),
            JoinError::WrongPool => {
                write!(f, "join() called while attached to a different pool than fork()")
            }
            JoinError::AlreadyJoined => write!(f, "task has already been joined"),
        }
    }
}

impl error::Error for JoinError {}
