//! API Call Scope - Per-Run Context
//!
//! Values seeded for one pipeline run travel as an explicit [`ScopedContext`].
//! Entering an [`ApiCallScope`] hands out a [`ScopeGuard`]; dropping the guard
//! is the only way out, so every entry gets exactly one exit, including on
//! early returns and unwinding.

use std::cell::Cell;
use std::sync::Arc;
use thiserror::Error;

use crate::bidi::EffectiveDirection;
use crate::msgs::MessageBundle;
use crate::options::BackendOptions;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("API call scope entered twice without exiting")]
    AlreadyEntered,
}

/// Values available to stage collaborators for one run.
#[derive(Debug, Clone, Copy)]
pub struct ScopedContext<'a> {
    options: &'a BackendOptions,
    direction: EffectiveDirection,
    bundle: Option<&'a MessageBundle>,
}

impl<'a> ScopedContext<'a> {
    pub fn new(
        options: &'a BackendOptions,
        direction: EffectiveDirection,
        bundle: Option<&'a MessageBundle>,
    ) -> Self {
        Self { options, direction, bundle }
    }

    pub fn options(&self) -> &'a BackendOptions {
        self.options
    }

    pub fn direction(&self) -> EffectiveDirection {
        self.direction
    }

    pub fn bundle(&self) -> Option<&'a MessageBundle> {
        self.bundle
    }

    pub fn locale(&self) -> Option<&'a str> {
        self.bundle.map(MessageBundle::locale)
    }
}

/// Hook for watching scope lifetime.
pub trait ScopeObserver: Send + Sync {
    fn on_enter(&self, _ctx: &ScopedContext<'_>) {}
    fn on_exit(&self) {}
}

/// Non-reentrant scope. One instance per pipeline run.
pub struct ApiCallScope {
    active: Cell<bool>,
    observer: Option<Arc<dyn ScopeObserver>>,
}

impl ApiCallScope {
    pub fn new() -> Self {
        Self {
            active: Cell::new(false),
            observer: None,
        }
    }

    pub fn with_observer(observer: Arc<dyn ScopeObserver>) -> Self {
        Self {
            active: Cell::new(false),
            observer: Some(observer),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Seed the scope and enter it.
    pub fn enter<'s, 'a>(
        &'s self,
        seed: ScopedContext<'a>,
    ) -> Result<ScopeGuard<'s, 'a>, ScopeError> {
        if self.active.replace(true) {
            return Err(ScopeError::AlreadyEntered);
        }
        tracing::trace!(direction = ?seed.direction(), locale = ?seed.locale(), "enter api call scope");
        if let Some(observer) = &self.observer {
            observer.on_enter(&seed);
        }
        Ok(ScopeGuard { scope: self, ctx: seed })
    }
}

impl Default for ApiCallScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Live scope. Dereferences to the seeded context; exits on drop.
pub struct ScopeGuard<'s, 'a> {
    scope: &'s ApiCallScope,
    ctx: ScopedContext<'a>,
}

impl<'a> std::ops::Deref for ScopeGuard<'_, 'a> {
    type Target = ScopedContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

impl Drop for ScopeGuard<'_, '_> {
    fn drop(&mut self) {
        self.scope.active.set(false);
        tracing::trace!("exit api call scope");
        if let Some(observer) = &self.scope.observer {
            observer.on_exit();
        }
    }
}
