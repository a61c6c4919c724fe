//! Template Compiler Core - PHP Source Backend
//!
//! # Pipeline
//! 1. Insert messages (no scope yet; plural/select rejected)
//! 2. Enter the API call scope with options, direction, bundle
//! 3. Fold direction-dependent branches
//! 4. Simplify
//! 5. Emit one source file per input tree
//! 6. Exit the scope, always

pub mod options;
pub mod bidi;
pub mod msgs;
pub mod scope;
pub mod tree;
pub mod passes;
pub mod emit;
pub mod output;
pub mod pipeline;

pub use options::{BackendOptions, ConfigurationError, OptionsLoadError, StaticDirection};
pub use bidi::{locale_direction, resolve, Direction, DirectionResolver, EffectiveDirection};
pub use msgs::{BundleLoadError, MessageBundle};
pub use scope::{ApiCallScope, ScopeError, ScopeGuard, ScopeObserver, ScopedContext};
pub use tree::{MsgBody, MsgCase, MsgNode, Node, Template, TemplateFile};
pub use passes::{InsertMsgs, OptimizeBidi, SimplifyTree};
pub use emit::{EmitError, PhpEmitter, RUNTIME_IS_RTL};
pub use output::{plan_outputs, source_digest, write_outputs, OutputError, OutputRecord, PlannedOutput};
pub use pipeline::{
    BidiOptimizer, CodegenPipeline, ConstructKind, Emitter, MessageInserter, PipelineError,
    Simplifier, Stage, StageError, UnsupportedConstruct,
};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
