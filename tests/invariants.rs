//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use templc_core::{
    plan_outputs, resolve, BackendOptions, BidiOptimizer, CodegenPipeline, ConfigurationError,
    ConstructKind, Direction, EffectiveDirection, Emitter, MessageBundle, MessageInserter, MsgBody,
    MsgCase, MsgNode, Node, OutputError, PipelineError, ScopeObserver, ScopedContext, Simplifier,
    Stage, StageError, StaticDirection, TemplateFile, UnsupportedConstruct,
};

#[derive(Default)]
struct ScopeCounter {
    enters: AtomicU32,
    exits: AtomicU32,
}

impl ScopeObserver for ScopeCounter {
    fn on_enter(&self, _ctx: &ScopedContext<'_>) {
        self.enters.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exit(&self) {
        self.exits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Identity on trees, stringify on emit. Optionally fails at one stage.
struct Identity {
    fail_at: Option<Stage>,
}

impl Identity {
    fn check(&self, stage: Stage) -> Result<(), StageError> {
        if self.fail_at == Some(stage) {
            return Err(format!("{} exploded", stage).into());
        }
        Ok(())
    }
}

impl MessageInserter<u32> for Identity {
    fn insert(&self, tree: &mut u32, _bundle: Option<&MessageBundle>) -> Result<(), UnsupportedConstruct> {
        if *tree == 0 {
            return Err(UnsupportedConstruct { msg_id: "zero".into(), kind: ConstructKind::Select });
        }
        Ok(())
    }
}

impl BidiOptimizer<u32> for Identity {
    fn optimize(&self, _tree: &mut u32, _ctx: &ScopedContext<'_>) -> Result<(), StageError> {
        self.check(Stage::OptimizeBidi)
    }
}

impl Simplifier<u32> for Identity {
    fn simplify(&self, _tree: &mut u32, _ctx: &ScopedContext<'_>) -> Result<(), StageError> {
        self.check(Stage::Simplify)
    }
}

impl Emitter<u32> for Identity {
    fn emit(&self, tree: &u32, _ctx: &ScopedContext<'_>) -> Result<String, StageError> {
        self.check(Stage::Emit)?;
        Ok(tree.to_string())
    }
}

fn identity_pipeline(fail_at: Option<Stage>, counter: &Arc<ScopeCounter>) -> CodegenPipeline<u32> {
    CodegenPipeline::new(
        Identity { fail_at },
        Identity { fail_at },
        Identity { fail_at },
        Identity { fail_at },
    )
    .with_observer(counter.clone())
}

fn plural_msg() -> Node {
    Node::Msg(MsgNode {
        id: "items".to_string(),
        body: MsgBody::Plural {
            var: "count".to_string(),
            cases: vec![
                MsgCase { key: "one".to_string(), text: "One item".to_string() },
                MsgCase { key: "other".to_string(), text: "Many items".to_string() },
            ],
        },
    })
}

#[test]
fn invariant_static_direction_range() {
    let mut options = BackendOptions::new();
    for bad in [2, -2, 100] {
        let before = options.duplicate();
        assert_eq!(
            options.set_static_direction(bad),
            Err(ConfigurationError::InvalidStaticDirection(bad))
        );
        assert_eq!(options, before);
    }
    for good in [1, -1, 0] {
        options.set_static_direction(good).unwrap();
        assert_eq!(options.static_direction().as_i32(), good);
    }
}

#[test]
fn invariant_runtime_detection_requires_msg_defs() {
    let mut options = BackendOptions::new();
    assert_eq!(
        options.set_use_runtime_direction_detection(true),
        Err(ConfigurationError::RuntimeDirectionWithoutMsgDefs)
    );
    assert!(!options.use_runtime_direction_detection());

    options.set_generates_message_defs(true).unwrap();
    options.set_use_runtime_direction_detection(true).unwrap();
    assert!(options.use_runtime_direction_detection());
}

#[test]
fn invariant_direction_sources_exclusive_in_either_order() {
    // Static first, then runtime.
    let mut options = BackendOptions::new();
    options.set_generates_message_defs(true).unwrap();
    options.set_static_direction_value(StaticDirection::Rtl).unwrap();
    assert_eq!(
        options.set_use_runtime_direction_detection(true),
        Err(ConfigurationError::ConflictingDirectionSources)
    );
    assert!(!options.use_runtime_direction_detection());

    // Runtime first, then static.
    let mut options = BackendOptions::new();
    options.set_generates_message_defs(true).unwrap();
    options.set_use_runtime_direction_detection(true).unwrap();
    for dir in [1, -1] {
        assert_eq!(
            options.set_static_direction(dir),
            Err(ConfigurationError::ConflictingDirectionSources)
        );
    }
    assert_eq!(options.static_direction(), StaticDirection::Unspecified);

    // Unspecified never conflicts.
    options.set_static_direction(0).unwrap();
}

#[test]
fn invariant_duplicate_is_independent() {
    let mut original = BackendOptions::new();
    original.set_uses_injected_data(true).unwrap();

    let mut copy = original.duplicate();
    assert_eq!(copy, original);

    copy.set_uses_injected_data(false).unwrap();
    copy.set_generates_message_defs(true).unwrap();
    copy.set_messages_are_external(true).unwrap();
    copy.set_use_runtime_direction_detection(true).unwrap();

    assert!(original.uses_injected_data());
    assert!(!original.generates_message_defs());
    assert!(!original.messages_are_external());
    assert!(!original.use_runtime_direction_detection());
    assert_eq!(original.static_direction(), StaticDirection::Unspecified);
}

#[test]
fn invariant_resolve_direction() {
    let options = BackendOptions::new();
    assert_eq!(resolve(&options, Some("ar")), EffectiveDirection::Fixed(Direction::Rtl));
    assert_eq!(resolve(&options, Some("en")), EffectiveDirection::Fixed(Direction::Ltr));
    assert_eq!(resolve(&options, None), EffectiveDirection::Fixed(Direction::Ltr));

    let mut rtl = BackendOptions::new();
    rtl.set_static_direction(-1).unwrap();
    for locale in [Some("ar"), Some("en"), None] {
        assert_eq!(resolve(&rtl, locale), EffectiveDirection::Fixed(Direction::Rtl));
    }
}

#[test]
fn invariant_output_matches_input_order() {
    let counter = Arc::new(ScopeCounter::default());
    let pipeline = identity_pipeline(None, &counter);

    let out = pipeline
        .generate(vec![3, 1, 4, 1, 5], &BackendOptions::new(), None)
        .unwrap();
    assert_eq!(out, vec!["3", "1", "4", "1", "5"]);
    assert_eq!(counter.enters.load(Ordering::SeqCst), 1);
    assert_eq!(counter.exits.load(Ordering::SeqCst), 1);
}

#[test]
fn invariant_empty_batch_yields_empty_output() {
    let counter = Arc::new(ScopeCounter::default());
    let out = identity_pipeline(None, &counter)
        .generate(vec![], &BackendOptions::new(), None)
        .unwrap();
    assert!(out.is_empty());
}

#[test]
fn invariant_unsupported_construct_skips_scope() {
    let counter = Arc::new(ScopeCounter::default());
    let pipeline = identity_pipeline(None, &counter);

    let err = pipeline
        .generate(vec![7, 8, 0, 9], &BackendOptions::new(), None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedConstruct(_)));
    assert_eq!(counter.enters.load(Ordering::SeqCst), 0);
    assert_eq!(counter.exits.load(Ordering::SeqCst), 0);
}

#[test]
fn invariant_scope_exits_once_when_stage_fails() {
    for stage in [Stage::OptimizeBidi, Stage::Simplify, Stage::Emit] {
        let counter = Arc::new(ScopeCounter::default());
        let pipeline = identity_pipeline(Some(stage), &counter);

        let err = pipeline
            .generate(vec![1, 2], &BackendOptions::new(), None)
            .unwrap_err();
        match err {
            PipelineError::Collaborator { stage: failed, source } => {
                assert_eq!(failed, stage);
                assert_eq!(source.to_string(), format!("{} exploded", stage));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(counter.enters.load(Ordering::SeqCst), 1);
        assert_eq!(counter.exits.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn invariant_plural_message_rejects_whole_batch() {
    let clean = TemplateFile::new("clean.tpl", "app.clean")
        .with_template("main", vec![Node::raw("fine")]);
    let plural = TemplateFile::new("plural.tpl", "app.plural")
        .with_template("main", vec![plural_msg()]);

    let err = CodegenPipeline::php()
        .generate(vec![clean, plural], &BackendOptions::new(), None)
        .unwrap_err();
    match err {
        PipelineError::UnsupportedConstruct(e) => {
            assert_eq!(e.msg_id, "items");
            assert_eq!(e.kind, ConstructKind::Plural);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn invariant_php_generation_end_to_end() {
    let file = TemplateFile::new("page.tpl", "app.page").with_template(
        "title",
        vec![
            Node::raw("<h1 dir=\""),
            Node::bidi_dir("ltr", "rtl"),
            Node::raw("\">"),
            Node::msg("title", "Welcome"),
            Node::raw("</h1>"),
        ],
    );
    let bundle = MessageBundle::new("he").with_message("title", "ברוכים הבאים");

    let out = CodegenPipeline::php()
        .generate(vec![file], &BackendOptions::new(), Some(&bundle))
        .unwrap();
    assert_eq!(out.len(), 1);

    // Direction folded to rtl from the bundle locale and merged with the
    // surrounding text.
    assert!(out[0].contains("$output .= '<h1 dir=\"rtl\">';"));
    assert!(out[0].contains("$output .= 'ברוכים הבאים';"));
    assert!(out[0].contains("function app_page_title(array $data = array())"));
}

#[test]
fn invariant_runtime_direction_survives_to_output() {
    let file = TemplateFile::new("page.tpl", "app.page")
        .with_template("dir", vec![Node::bidi_dir("ltr", "rtl")]);

    let mut options = BackendOptions::new();
    options.set_generates_message_defs(true).unwrap();
    options.set_use_runtime_direction_detection(true).unwrap();
    let bundle = MessageBundle::new("ar");

    let out = CodegenPipeline::php()
        .generate(vec![file], &options, Some(&bundle))
        .unwrap();
    assert!(out[0].contains("(Bidi::isRtl() ? 'rtl' : 'ltr')"));
}

#[test]
fn invariant_emitter_failure_is_collaborator_failure() {
    let file = TemplateFile::new("a.tpl", "ns").with_template(
        "t",
        vec![Node::Print { expr: "user".to_string(), injected: true }],
    );

    let err = CodegenPipeline::php()
        .generate(vec![file], &BackendOptions::new(), None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Collaborator { stage: Stage::Emit, .. }));
}

#[test]
fn invariant_concurrent_runs_are_independent() {
    let pipeline = Arc::new(CodegenPipeline::php());

    let handles: Vec<_> = ["ar", "en"]
        .into_iter()
        .map(|locale| {
            let pipeline = pipeline.clone();
            std::thread::spawn(move || {
                let file = TemplateFile::new("d.tpl", "ns")
                    .with_template("d", vec![Node::bidi_dir("L", "R")]);
                let bundle = MessageBundle::new(locale);
                pipeline
                    .generate(vec![file], &BackendOptions::new(), Some(&bundle))
                    .unwrap()
                    .remove(0)
            })
        })
        .collect();

    let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(outputs[0].contains("$output .= 'R';"));
    assert!(outputs[1].contains("$output .= 'L';"));
}

#[test]
fn invariant_one_input_per_output_file() {
    let files = vec![
        PathBuf::from("admin/page.json"),
        PathBuf::from("site/nav.json"),
        PathBuf::from("site/page.json"),
    ];
    let err = plan_outputs(&files, Some(Path::new("out"))).unwrap_err();
    assert!(matches!(err, OutputError::DuplicateTarget { .. }));
    assert!(err.to_string().contains("admin/page.json"));
    assert!(err.to_string().contains("site/page.json"));
}
