use crate::core::DnsqError;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Trait used by a client pool for creating new client instances when needed.
///
/// Implementations are expected to retain any required configuration for client
/// instances beyond the identifier for an instance (usually a server address).
pub trait ClientFactory<K, V> {
    /// Create a new client instance based on its ID.
    fn make(&self, key: &K) -> impl Future<Output = Result<V, DnsqError>> + Send + Sync;
}

/// Policy deciding when a pooled client may be handed out again.
pub trait PoolStrategy<K, V> {
    /// Return true if an idle client may be used for another request. Clients
    /// that aren't reusable are dropped when they're found in the pool.
    fn is_reusable(&self, client: &PooledClient<K, V>) -> bool;

    /// Return true if a client that failed with `err` may go back into the pool.
    fn handle_error(&self, client: &PooledClient<K, V>, err: &DnsqError) -> bool;
}

#[derive(Debug, Clone)]
pub struct ClientPoolConfig {
    pub name: String,
    pub max_idle: u64,
}

/// Idle clients grouped by key, created on demand by a `ClientFactory`.
///
/// Clients are owned by the caller between `acquire` and `release` so there's no
/// shared state for a client that is in use.
#[derive(Debug)]
pub struct ClientPool<K, V, F, S>
where
    K: Eq + Hash + Clone + fmt::Display,
    F: ClientFactory<K, V> + Send + Sync,
    S: PoolStrategy<K, V>,
{
    clients: Mutex<HashMap<K, Vec<PooledClient<K, V>>>>,
    config: ClientPoolConfig,
    factory: F,
    strategy: S,
}

impl<K, V, F, S> ClientPool<K, V, F, S>
where
    K: Eq + Hash + Clone + fmt::Display,
    F: ClientFactory<K, V> + Send + Sync,
    S: PoolStrategy<K, V>,
{
    pub fn new(config: ClientPoolConfig, factory: F, strategy: S) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            config,
            factory,
            strategy,
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub async fn acquire(&self, key: &K) -> Result<PooledClient<K, V>, DnsqError> {
        // Lock the clients HashMap and try to get an existing client in a limited scope
        // so that we don't hold the lock while trying to connect if there are no existing
        // clients.
        let client = {
            let mut clients = self.clients.lock().await;
            let mut found = None;

            if let Some(entries) = clients.get_mut(key) {
                while let Some(c) = entries.pop() {
                    if self.strategy.is_reusable(&c) {
                        found = Some(c);
                        break;
                    }

                    tracing::trace!(message = "discarding expired client", pool = self.config.name, server = %key);
                }
            }

            found
        };

        match client {
            Some(c) => {
                tracing::trace!(message = "using existing client", pool = self.config.name, server = %key);
                Ok(c)
            }
            None => {
                tracing::trace!(message = "creating new client", pool = self.config.name, server = %key);
                let inner = self.factory.make(key).await?;
                Ok(PooledClient {
                    key: key.clone(),
                    inner,
                    released: Instant::now(),
                })
            }
        }
    }

    /// Return a client to the pool after a successful request.
    pub async fn release(&self, mut client: PooledClient<K, V>) {
        client.released = Instant::now();

        let mut clients = self.clients.lock().await;
        let entries = clients.entry(client.key.clone()).or_default();
        if (entries.len() as u64) < self.config.max_idle {
            entries.push(client);
        }
    }

    /// Return a client to the pool after a failed request if the strategy allows
    /// it, otherwise drop (close) it.
    pub async fn release_err(&self, client: PooledClient<K, V>, err: &DnsqError) {
        if self.strategy.handle_error(&client, err) {
            self.release(client).await;
        } else {
            tracing::trace!(message = "discarding client after error", pool = self.config.name, server = %client.key, err = %err);
        }
    }

    /// Number of idle clients for `key`.
    pub async fn idle(&self, key: &K) -> usize {
        let clients = self.clients.lock().await;
        clients.get(key).map(|v| v.len()).unwrap_or(0)
    }
}

/// Wrapper for a client that belongs to a pool and must be returned
/// to the pool when complete.
#[derive(Debug)]
pub struct PooledClient<K, V> {
    key: K,
    inner: V,
    released: Instant,
}

impl<K, V> PooledClient<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    /// When this client was last returned to the pool, or created if it never was.
    pub fn released(&self) -> Instant {
        self.released
    }
}

impl<K, V> Deref for PooledClient<K, V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<K, V> DerefMut for PooledClient<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
