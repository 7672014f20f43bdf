//! Checkout/return pool of reusable outbound clients
//!
//! `acquire` never waits: an idle client is reused when one exists,
//! otherwise a new one is built by the pool's factory. The returned
//! [`PooledClient`] puts the client back when dropped, so every exit path
//! (early `?` returns and panics included) releases exactly once.

use crate::error::Result;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type Factory<C> = Box<dyn Fn() -> Result<C> + Send + Sync>;

/// Pool of clients shared by concurrent attempts
pub struct ClientPool<C> {
    idle: Mutex<Vec<C>>,
    factory: Factory<C>,
    max_idle: usize,
    outstanding: AtomicUsize,
    created: AtomicUsize,
}

impl<C: Send> ClientPool<C> {
    /// Create a pool that builds clients with `factory`
    ///
    /// At most `max_idle` returned clients are retained for reuse.
    pub fn new<F>(max_idle: usize, factory: F) -> Self
    where
        F: Fn() -> Result<C> + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            max_idle,
            outstanding: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
        }
    }

    /// Check out a client, reusing an idle one or building a new one
    pub fn acquire(&self) -> Result<PooledClient<'_, C>> {
        let reused = self.lock_idle().pop();
        let client = match reused {
            Some(client) => client,
            None => {
                let client = (self.factory)()?;
                self.created.fetch_add(1, Ordering::SeqCst);
                tracing::trace!("client pool: built new client");
                client
            }
        };

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(PooledClient {
            pool: self,
            client: Some(client),
        })
    }

    /// Clients currently checked out
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Clients waiting for reuse
    pub fn idle(&self) -> usize {
        self.lock_idle().len()
    }

    /// Clients built over the pool's lifetime
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn release(&self, client: C) {
        {
            let mut idle = self.lock_idle();
            if idle.len() < self.max_idle {
                idle.push(client);
            }
        }
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    fn lock_idle(&self) -> std::sync::MutexGuard<'_, Vec<C>> {
        // The idle list stays consistent even if a holder panicked
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<C> fmt::Debug for ClientPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPool")
            .field("max_idle", &self.max_idle)
            .field("outstanding", &self.outstanding.load(Ordering::SeqCst))
            .field("created", &self.created.load(Ordering::SeqCst))
            .finish()
    }
}

/// A checked-out client; returned to its pool on drop
pub struct PooledClient<'a, C: Send> {
    pool: &'a ClientPool<C>,
    client: Option<C>,
}

impl<C: Send> Deref for PooledClient<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        // Only `drop` takes the client out
        self.client.as_ref().expect("pooled client already released")
    }
}

impl<C: Send> DerefMut for PooledClient<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.client.as_mut().expect("pooled client already released")
    }
}

impl<C: Send> Drop for PooledClient<'_, C> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(client);
        }
    }
}
