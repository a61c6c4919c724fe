//! Template Tree - Parsed Template Files
//!
//! The parser lives elsewhere; this is the shape it hands over, serialized as
//! JSON at the CLI boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFile {
    /// Source path, used in the generated header.
    pub path: String,
    pub namespace: String,
    #[serde(default)]
    pub templates: Vec<Template>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    RawText { text: String },
    /// Prints a data value; `injected` reads from `$ij` instead of `$data`.
    Print {
        expr: String,
        #[serde(default)]
        injected: bool,
    },
    Msg(MsgNode),
    /// Message after translation was inserted.
    MsgText { id: String, text: String },
    /// Text that depends on the global direction.
    BidiDir { ltr: String, rtl: String },
}

impl Node {
    pub fn raw(text: impl Into<String>) -> Self {
        Self::RawText { text: text.into() }
    }

    pub fn print(expr: impl Into<String>) -> Self {
        Self::Print { expr: expr.into(), injected: false }
    }

    pub fn msg(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Msg(MsgNode {
            id: id.into(),
            body: MsgBody::Text { text: text.into() },
        })
    }

    pub fn bidi_dir(ltr: impl Into<String>, rtl: impl Into<String>) -> Self {
        Self::BidiDir { ltr: ltr.into(), rtl: rtl.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgNode {
    pub id: String,
    pub body: MsgBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MsgBody {
    Text { text: String },
    Plural { var: String, cases: Vec<MsgCase> },
    Select { var: String, cases: Vec<MsgCase> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCase {
    pub key: String,
    pub text: String,
}

impl TemplateFile {
    pub fn new(path: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
            templates: vec![],
        }
    }

    pub fn with_template(mut self, name: impl Into<String>, body: Vec<Node>) -> Self {
        self.templates.push(Template { name: name.into(), body });
        self
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.templates.iter().flat_map(|t| t.body.iter())
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.templates.iter_mut().flat_map(|t| t.body.iter_mut())
    }
}
