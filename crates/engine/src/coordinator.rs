//! Scope manager
//!
//! [`Coordinator`] is the public entry point: it hands out the [`Router`] and
//! runs units of work inside transactional scopes.
//!
//! ## Scope Sequence
//!
//! ```text
//! 1. check nesting depth               (fail: nothing touched)
//! 2. driver.begin(options)             (fail: nothing touched)
//! 3. install handle, run unit of work  (bounded by the time budget)
//! 4. handle uninstalled                (before anything below runs)
//! 5. Ok  -> commit
//!    Err -> rollback, return the unit of work's error
//!    timeout -> rollback, return TransactionTimeout
//! ```
//!
//! If the scope future is dropped during step 3, the task-local guard
//! uninstalls the handle and the driver rolls the transaction back when its
//! last reference goes away.
//!
//! Nested scopes open an independent driver transaction each. Whether the
//! driver maps that onto savepoints is up to the driver.
//!
//! The coordinator owns its driver and the [`SourceKey`] its router reads
//! from. Neither is handed out: transactions are only begun here, and only
//! installed here.

use crate::config::{duration_ms, CoordinatorConfig};
use crate::metrics::{Counters, Exit, ScopeMetrics};
use crate::router::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use txscope_concurrency::context::{self, SourceKey};
use txscope_core::{Driver, Error, Handle, Transaction, TransactionOptions};

/// Entry point: router plus transactional scopes over one driver
pub struct Coordinator<D: Driver> {
    driver: Arc<D>,
    key: Arc<SourceKey>,
    router: Router,
    config: CoordinatorConfig,
    counters: Arc<Counters>,
}

impl<D: Driver> Clone for Coordinator<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            key: Arc::clone(&self.key),
            router: self.router.clone(),
            config: self.config.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

enum Outcome<T, E> {
    Finished(std::result::Result<T, E>),
    TimedOut(Duration),
}

impl<D: Driver> Coordinator<D> {
    /// Create a coordinator with default configuration
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, CoordinatorConfig::default())
    }

    pub(crate) fn with_config(driver: D, config: CoordinatorConfig) -> Self {
        let key = SourceKey::new();
        let router = Router::new(key.source(), driver.default_handle());
        tracing::debug!(source = %key.source(), ?config, "coordinator created");
        Self {
            driver: Arc::new(driver),
            key: Arc::new(key),
            router,
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    /// The router
    ///
    /// Always the same router; clones of it route identically.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Active configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Scope counters
    pub fn metrics(&self) -> ScopeMetrics {
        self.counters.snapshot()
    }

    /// Options used by [`Coordinator::run_in_transaction`]
    pub fn default_options(&self) -> TransactionOptions {
        TransactionOptions {
            timeout: self.config.default_timeout(),
            read_only: self.config.read_only_default,
            label: None,
        }
    }

    /// Run `work` inside a new transactional scope with default options
    ///
    /// Every operation issued through [`Coordinator::router`] from within
    /// `work`, including from helpers it calls and tasks it spawns through
    /// [`txscope_concurrency::spawn`], runs on the scope's transaction. The
    /// transaction commits if `work` returns `Ok` and rolls back otherwise.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let total = coordinator
    ///     .run_in_transaction(|_tx| async {
    ///         router.put("order:1", Value::Int(30)).await?;
    ///         charge(&router, 30).await
    ///     })
    ///     .await?;
    /// ```
    pub async fn run_in_transaction<F, Fut, T, E>(&self, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce(Handle) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        self.run_in_transaction_with(self.default_options(), work)
            .await
    }

    /// Run `work` inside a new transactional scope with explicit options
    ///
    /// A missing `options.timeout` falls back to the configured default.
    pub async fn run_in_transaction_with<F, Fut, T, E>(
        &self,
        mut options: TransactionOptions,
        work: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(Handle) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        let source = self.router.source();
        let depth = context::depth(source) + 1;
        if depth > self.config.max_nesting_depth {
            return Err(Error::NestingTooDeep {
                depth,
                limit: self.config.max_nesting_depth,
            }
            .into());
        }
        if options.timeout.is_none() {
            options.timeout = self.config.default_timeout();
        }

        let tx = Arc::new(self.driver.begin(&options).await?);
        let handle = Handle::new(Arc::clone(&tx));
        let scope = self.counters.open();

        let span = tracing::debug_span!(
            "tx_scope",
            handle = %handle.id(),
            depth,
            call_graph = ?context::call_graph_id(),
            label = options.label.as_deref(),
        );
        tracing::debug!(parent: &span, "scope opened");

        let scoped = context::with_handle(&self.key, handle.clone(), async move {
            work(handle).await
        });
        let outcome = match options.timeout {
            Some(budget) => match tokio::time::timeout(budget, scoped)
                .instrument(span.clone())
                .await
            {
                Ok(result) => Outcome::Finished(result),
                Err(_) => Outcome::TimedOut(budget),
            },
            None => Outcome::Finished(scoped.instrument(span.clone()).await),
        };

        match outcome {
            Outcome::Finished(Ok(value)) => match tx.commit().await {
                Ok(()) => {
                    tracing::debug!(parent: &span, "scope committed");
                    scope.finish(Exit::Committed);
                    Ok(value)
                }
                Err(e) => {
                    tracing::debug!(parent: &span, error = %e, "commit failed");
                    scope.finish(Exit::RolledBack);
                    Err(e.into())
                }
            },
            Outcome::Finished(Err(err)) => {
                Self::rollback(tx.as_ref(), &span).await;
                tracing::debug!(parent: &span, "scope rolled back");
                scope.finish(Exit::RolledBack);
                Err(err)
            }
            Outcome::TimedOut(budget) => {
                let duration_ms = duration_ms(budget);
                tracing::warn!(parent: &span, duration_ms, "scope timed out, rolling back");
                Self::rollback(tx.as_ref(), &span).await;
                scope.finish(Exit::TimedOut);
                Err(Error::TransactionTimeout { duration_ms }.into())
            }
        }
    }

    /// Roll back, logging instead of returning a failure
    ///
    /// The caller is already returning a more relevant error.
    async fn rollback(tx: &D::Transaction, span: &tracing::Span) {
        if let Err(e) = tx.rollback().await {
            tracing::error!(parent: span, handle = %tx.id(), error = %e, "rollback failed");
        }
    }
}

impl<D: Driver + std::fmt::Debug> std::fmt::Debug for Coordinator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("driver", &self.driver)
            .field("router", &self.router)
            .field("config", &self.config)
            .finish()
    }
}
