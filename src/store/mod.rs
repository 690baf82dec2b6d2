//! Client-side state stores.
//!
//! Each store pairs a plain state struct with a `Mutation` enum and a pure
//! [`Reducer::reduce`] that turns a state snapshot plus one mutation into the
//! next snapshot. Async actions live on the store types ([`AuthStore`],
//! [`ApplicationsStore`], [`GitHubStore`]); they call the API and commit
//! mutations, never touching state directly.
//!
//! State sits in a [`StateCell`]. The lock is only held for the duration of
//! one commit or read, never across an `.await`, so concurrent actions
//! interleave and the last response to be committed wins.

mod applications;
mod auth;
mod github;

use std::sync::Arc;

use parking_lot::RwLock;

pub use applications::*;
pub use auth::*;
pub use github::*;

/// State that evolves through mutations.
pub trait Reducer: Clone {
    type Mutation;

    /// Apply one mutation, returning the next snapshot.
    fn reduce(self, mutation: Self::Mutation) -> Self;
}

/// Shared, lock-protected store state.
#[derive(Debug)]
pub struct StateCell<S> {
    inner: Arc<RwLock<S>>,
}

impl<S> Clone for StateCell<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Reducer> StateCell<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Replace the current snapshot with `reduce(current, mutation)`.
    pub fn commit(&self, mutation: S::Mutation) {
        let mut state = self.inner.write();
        let next = state.clone().reduce(mutation);
        *state = next;
    }

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> S {
        self.inner.read().clone()
    }

    /// Read from the current snapshot without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.read())
    }
}
