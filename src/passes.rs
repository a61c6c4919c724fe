//! Tree Passes - Message Insertion, Bidi Folding, Simplification
//!
//! Each pass mutates a [`TemplateFile`] in place.

use crate::bidi::Direction;
use crate::msgs::MessageBundle;
use crate::pipeline::{
    BidiOptimizer, ConstructKind, MessageInserter, Simplifier, StageError, UnsupportedConstruct,
};
use crate::scope::ScopedContext;
use crate::tree::{MsgBody, MsgNode, Node, TemplateFile};

/// Swaps each message for its translation, falling back to the source text.
///
/// The whole file is checked for plural/select messages before anything is
/// rewritten, so a rejected file comes back unmodified.
pub struct InsertMsgs;

impl MessageInserter<TemplateFile> for InsertMsgs {
    fn insert(
        &self,
        tree: &mut TemplateFile,
        bundle: Option<&MessageBundle>,
    ) -> Result<(), UnsupportedConstruct> {
        for node in tree.nodes() {
            if let Node::Msg(msg) = node {
                let kind = match msg.body {
                    MsgBody::Text { .. } => continue,
                    MsgBody::Plural { .. } => ConstructKind::Plural,
                    MsgBody::Select { .. } => ConstructKind::Select,
                };
                return Err(UnsupportedConstruct { msg_id: msg.id.clone(), kind });
            }
        }

        for node in tree.nodes_mut() {
            let inserted = match &*node {
                Node::Msg(MsgNode { id, body: MsgBody::Text { text } }) => Node::MsgText {
                    id: id.clone(),
                    text: bundle.and_then(|b| b.get(id)).unwrap_or(text.as_str()).to_string(),
                },
                _ => continue,
            };
            *node = inserted;
        }
        Ok(())
    }
}

/// Folds `BidiDir` nodes when the direction is fixed for this run.
pub struct OptimizeBidi;

impl BidiOptimizer<TemplateFile> for OptimizeBidi {
    fn optimize(&self, tree: &mut TemplateFile, ctx: &ScopedContext<'_>) -> Result<(), StageError> {
        let Some(dir) = ctx.direction().fixed() else {
            return Ok(());
        };
        for node in tree.nodes_mut() {
            let text = match &mut *node {
                Node::BidiDir { ltr, rtl } => match dir {
                    Direction::Ltr => std::mem::take(ltr),
                    Direction::Rtl => std::mem::take(rtl),
                },
                _ => continue,
            };
            *node = Node::RawText { text };
        }
        Ok(())
    }
}

/// Merges adjacent raw text and drops empty text nodes.
pub struct SimplifyTree;

impl Simplifier<TemplateFile> for SimplifyTree {
    fn simplify(&self, tree: &mut TemplateFile, _ctx: &ScopedContext<'_>) -> Result<(), StageError> {
        for template in &mut tree.templates {
            let mut merged: Vec<Node> = Vec::with_capacity(template.body.len());
            for node in template.body.drain(..) {
                if let Node::RawText { text } = &node {
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(Node::RawText { text: prev }) = merged.last_mut() {
                        prev.push_str(text);
                        continue;
                    }
                }
                merged.push(node);
            }
            template.body = merged;
        }
        Ok(())
    }
}
