// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-kind verb bindings.
//!
//! A resource kind supplies up to four async functions that talk to the
//! controller. Read is mandatory; an unbound create, update or delete turns
//! that operation into a no-op.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// Arguments shared by every verb call.
pub struct VerbCall<C> {
    pub cancel: CancellationToken,
    pub client: Arc<C>,
    pub site: String,
}

impl<C> Clone for VerbCall<C> {
    fn clone(&self) -> Self {
        Self {
            cancel: self.cancel.clone(),
            client: self.client.clone(),
            site: self.site.clone(),
        }
    }
}

pub type VerbFuture<T> = BoxFuture<'static, Result<T, ApiError>>;

/// Fetch by id.
pub type ReadFn<C, D> = Arc<dyn Fn(VerbCall<C>, String) -> VerbFuture<D> + Send + Sync>;
/// Create or update. `Ok(None)` means the controller returned no object.
pub type WriteFn<C, D> = Arc<dyn Fn(VerbCall<C>, D) -> VerbFuture<Option<D>> + Send + Sync>;
/// Delete by id.
pub type DeleteFn<C> = Arc<dyn Fn(VerbCall<C>, String) -> VerbFuture<()> + Send + Sync>;

/// Verb functions for one resource kind, generic over the client type `C`
/// and the domain object `D`.
pub struct VerbBindings<C, D> {
    pub(crate) read: Option<ReadFn<C, D>>,
    pub(crate) create: Option<WriteFn<C, D>>,
    pub(crate) update: Option<WriteFn<C, D>>,
    pub(crate) delete: Option<DeleteFn<C>>,
}

impl<C, D> Default for VerbBindings<C, D> {
    fn default() -> Self {
        Self {
            read: None,
            create: None,
            update: None,
            delete: None,
        }
    }
}

impl<C, D> Clone for VerbBindings<C, D> {
    fn clone(&self) -> Self {
        Self {
            read: self.read.clone(),
            create: self.create.clone(),
            update: self.update.clone(),
            delete: self.delete.clone(),
        }
    }
}

impl<C, D> VerbBindings<C, D>
where
    C: Send + Sync + 'static,
    D: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(VerbCall<C>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<D, ApiError>> + Send + 'static,
    {
        let verb: ReadFn<C, D> = Arc::new(move |call: VerbCall<C>, id: String| -> VerbFuture<D> {
            Box::pin(f(call, id))
        });
        self.read = Some(verb);
        self
    }

    pub fn create<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(VerbCall<C>, D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<D>, ApiError>> + Send + 'static,
    {
        self.create = Some(write_fn(f));
        self
    }

    pub fn update<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(VerbCall<C>, D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<D>, ApiError>> + Send + 'static,
    {
        self.update = Some(write_fn(f));
        self
    }

    pub fn delete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(VerbCall<C>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        let verb: DeleteFn<C> = Arc::new(move |call: VerbCall<C>, id: String| -> VerbFuture<()> {
            Box::pin(f(call, id))
        });
        self.delete = Some(verb);
        self
    }

    pub fn has_read(&self) -> bool {
        self.read.is_some()
    }

    pub fn has_create(&self) -> bool {
        self.create.is_some()
    }

    pub fn has_update(&self) -> bool {
        self.update.is_some()
    }

    pub fn has_delete(&self) -> bool {
        self.delete.is_some()
    }
}

fn write_fn<C, D, F, Fut>(f: F) -> WriteFn<C, D>
where
    C: Send + Sync + 'static,
    D: Send + 'static,
    F: Fn(VerbCall<C>, D) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<D>, ApiError>> + Send + 'static,
{
    Arc::new(move |call: VerbCall<C>, body: D| -> VerbFuture<Option<D>> { Box::pin(f(call, body)) })
}
