//! Code Generation Pipeline - Single Entry Point
//!
//! CRITICAL: message insertion runs for every tree before any scope exists,
//! and the scope is always exited exactly once once it has been entered.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::bidi::DirectionResolver;
use crate::emit::PhpEmitter;
use crate::msgs::MessageBundle;
use crate::options::BackendOptions;
use crate::passes::{InsertMsgs, OptimizeBidi, SimplifyTree};
use crate::scope::{ApiCallScope, ScopeError, ScopeObserver, ScopedContext};
use crate::tree::TemplateFile;

/// Failure raised by a stage collaborator. Passed through unchanged.
pub type StageError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    InsertMessages,
    OptimizeBidi,
    Simplify,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InsertMessages => "message insertion",
            Self::OptimizeBidi => "bidi optimization",
            Self::Simplify => "simplification",
            Self::Emit => "emission",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructKind {
    Plural,
    Select,
}

/// A message whose text branches at runtime. This backend cannot express it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} message '{msg_id}' is not supported by this backend")]
pub struct UnsupportedConstruct {
    pub msg_id: String,
    pub kind: ConstructKind,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(#[from] UnsupportedConstruct),

    #[error("{stage} failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),
}

impl PipelineError {
    fn stage(stage: Stage) -> impl FnOnce(StageError) -> Self {
        move |source| Self::Collaborator { stage, source }
    }
}

/// Replaces message placeholders with translated or source text.
pub trait MessageInserter<T> {
    fn insert(&self, tree: &mut T, bundle: Option<&MessageBundle>) -> Result<(), UnsupportedConstruct>;
}

/// Folds direction-dependent branches the scope already decides.
pub trait BidiOptimizer<T> {
    fn optimize(&self, tree: &mut T, ctx: &ScopedContext<'_>) -> Result<(), StageError>;
}

pub trait Simplifier<T> {
    fn simplify(&self, tree: &mut T, ctx: &ScopedContext<'_>) -> Result<(), StageError>;
}

/// Produces the source text for one tree.
pub trait Emitter<T> {
    fn emit(&self, tree: &T, ctx: &ScopedContext<'_>) -> Result<String, StageError>;
}

/// The code generation pipeline - one instance can serve many runs.
///
/// Each run gets its own scope, so independent runs never share state beyond
/// the collaborators themselves.
pub struct CodegenPipeline<T> {
    inserter: Box<dyn MessageInserter<T> + Send + Sync>,
    optimizer: Box<dyn BidiOptimizer<T> + Send + Sync>,
    simplifier: Box<dyn Simplifier<T> + Send + Sync>,
    emitter: Box<dyn Emitter<T> + Send + Sync>,
    resolver: DirectionResolver,
    observer: Option<Arc<dyn ScopeObserver>>,
}

impl<T> CodegenPipeline<T> {
    pub fn new(
        inserter: impl MessageInserter<T> + Send + Sync + 'static,
        optimizer: impl BidiOptimizer<T> + Send + Sync + 'static,
        simplifier: impl Simplifier<T> + Send + Sync + 'static,
        emitter: impl Emitter<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inserter: Box::new(inserter),
            optimizer: Box::new(optimizer),
            simplifier: Box::new(simplifier),
            emitter: Box::new(emitter),
            resolver: DirectionResolver::default(),
            observer: None,
        }
    }

    pub fn with_resolver(mut self, resolver: DirectionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScopeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Generate source text for each tree, in input order.
    ///
    /// Any plural/select message aborts the whole batch before a scope is
    /// entered. Failures in later stages are returned after the scope exits.
    #[tracing::instrument(skip_all, fields(file_count = trees.len(), has_bundle = bundle.is_some()))]
    pub fn generate(
        &self,
        mut trees: Vec<T>,
        options: &BackendOptions,
        bundle: Option<&MessageBundle>,
    ) -> Result<Vec<String>, PipelineError> {
        for tree in &mut trees {
            self.inserter.insert(tree, bundle)?;
        }
        tracing::debug!(stage = %Stage::InsertMessages, "stage complete");

        let direction = self.resolver.resolve(options, bundle.map(MessageBundle::locale));
        let scope = match &self.observer {
            Some(observer) => ApiCallScope::with_observer(observer.clone()),
            None => ApiCallScope::new(),
        };
        let ctx = scope.enter(ScopedContext::new(options, direction, bundle))?;

        for tree in &mut trees {
            self.optimizer
                .optimize(tree, &ctx)
                .map_err(PipelineError::stage(Stage::OptimizeBidi))?;
        }
        tracing::debug!(stage = %Stage::OptimizeBidi, ?direction, "stage complete");

        for tree in &mut trees {
            self.simplifier
                .simplify(tree, &ctx)
                .map_err(PipelineError::stage(Stage::Simplify))?;
        }
        tracing::debug!(stage = %Stage::Simplify, "stage complete");

        let outputs = trees
            .iter()
            .map(|tree| self.emitter.emit(tree, &ctx))
            .collect::<Result<Vec<_>, _>>()
            .map_err(PipelineError::stage(Stage::Emit))?;
        tracing::debug!(stage = %Stage::Emit, output_count = outputs.len(), "stage complete");

        Ok(outputs)
    }
}

impl CodegenPipeline<TemplateFile> {
    /// Pipeline wired with the built-in passes and the PHP emitter.
    pub fn php() -> Self {
        Self::new(InsertMsgs, OptimizeBidi, SimplifyTree, PhpEmitter::new())
    }
}

impl Default for CodegenPipeline<TemplateFile> {
    fn default() -> Self {
        Self::php()
    }
}
