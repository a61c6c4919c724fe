//! PHP Source Emitter
//!
//! Turns one simplified [`TemplateFile`] into one PHP source file. Each
//! template becomes a function that appends to `$output` and returns it.

use thiserror::Error;

use crate::bidi::{Direction, EffectiveDirection};
use crate::options::BackendOptions;
use crate::pipeline::{Emitter, StageError};
use crate::scope::ScopedContext;
use crate::tree::{Node, Template, TemplateFile};

/// Expression the generated code evaluates when direction is left to runtime.
pub const RUNTIME_IS_RTL: &str = "Bidi::isRtl()";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("Template '{template}' reads injected data '{expr}' but injected data is disabled")]
    InjectedDataDisabled { template: String, expr: String },

    #[error("Message '{0}' reached emission untranslated")]
    UninsertedMessage(String),

    #[error("Invalid data expression '{0}'")]
    InvalidExpression(String),

    #[error("External message '{0}' is defined with two different texts")]
    ConflictingMessageText(String),
}

/// A buffer for building indented source text.
#[derive(Debug, Default)]
pub struct SourceBuffer {
    buffer: String,
    indent_level: usize,
    indent_str: &'static str,
}

impl SourceBuffer {
    pub fn new(indent_str: &'static str) -> Self {
        Self {
            buffer: String::new(),
            indent_level: 0,
            indent_str,
        }
    }

    /// Write a line with current indentation
    pub fn line(&mut self, s: &str) {
        for _ in 0..self.indent_level {
            self.buffer.push_str(self.indent_str);
        }
        self.buffer.push_str(s);
        self.buffer.push('\n');
    }

    pub fn blank_line(&mut self) {
        self.buffer.push('\n');
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// Write a block with braces
    pub fn block<F>(&mut self, header: &str, f: F) -> Result<(), EmitError>
    where
        F: FnOnce(&mut Self) -> Result<(), EmitError>,
    {
        self.line(&format!("{} {{", header));
        self.indent();
        let result = f(self);
        self.dedent();
        self.line("}");
        result
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Emits PHP, 4-space indented.
#[derive(Debug, Clone)]
pub struct PhpEmitter {
    indent_str: &'static str,
}

impl PhpEmitter {
    pub fn new() -> Self {
        Self { indent_str: "    " }
    }

    fn emit_file(&self, file: &TemplateFile, ctx: &ScopedContext<'_>) -> Result<String, EmitError> {
        let mut out = SourceBuffer::new(self.indent_str);
        out.line("<?php");
        out.line(&format!("// This file was automatically generated from {}.", file.path));
        out.line("// Please don't edit this file by hand.");

        let mut unnamed = 0usize;
        for template in &file.templates {
            out.blank_line();
            self.emit_template(&mut out, file, template, ctx, &mut unnamed)?;
        }
        Ok(out.finish())
    }

    fn emit_template(
        &self,
        out: &mut SourceBuffer,
        file: &TemplateFile,
        template: &Template,
        ctx: &ScopedContext<'_>,
        unnamed: &mut usize,
    ) -> Result<(), EmitError> {
        let options = ctx.options();
        let params = if options.uses_injected_data() {
            "array $data = array(), array $ij = array()"
        } else {
            "array $data = array()"
        };
        let name = function_name(&file.namespace, &template.name);

        out.block(&format!("function {}({})", name, params), |out| {
            out.line("$output = '';");

            // Message definitions precede their uses. External names are
            // shared by every use of an id; unnamed ones are one per use.
            let external = options.messages_are_external_effective();
            let mut msg_vars: Vec<(String, &str)> = vec![];
            if options.generates_message_defs() {
                for node in &template.body {
                    let Node::MsgText { id, text } = node else { continue };
                    let var = msg_var_name(options, id, unnamed);
                    if external {
                        if let Some((_, defined)) = msg_vars.iter().find(|(v, _)| *v == var) {
                            if *defined != text.as_str() {
                                return Err(EmitError::ConflictingMessageText(id.clone()));
                            }
                            continue;
                        }
                    }
                    out.line(&format!("{} = {};", var, php_string(text)));
                    msg_vars.push((var, text.as_str()));
                }
            }

            let mut defs = msg_vars.iter();
            for node in &template.body {
                let expr = match node {
                    Node::RawText { text } => php_string(text),
                    Node::Print { expr, injected } => {
                        if *injected && !options.uses_injected_data() {
                            return Err(EmitError::InjectedDataDisabled {
                                template: name.clone(),
                                expr: expr.clone(),
                            });
                        }
                        let root = if *injected { "$ij" } else { "$data" };
                        format!("htmlspecialchars({})", data_access(root, expr)?)
                    }
                    Node::MsgText { id, text } if options.generates_message_defs() => {
                        let var = if external {
                            Some(external_msg_var(id))
                        } else {
                            defs.next().map(|(v, _)| v.clone())
                        };
                        var.unwrap_or_else(|| php_string(text))
                    }
                    Node::MsgText { text, .. } => php_string(text),
                    Node::BidiDir { ltr, rtl } => bidi_expr(ctx.direction(), ltr, rtl),
                    Node::Msg(msg) => return Err(EmitError::UninsertedMessage(msg.id.clone())),
                };
                out.line(&format!("$output .= {};", expr));
            }
            out.line("return $output;");
            Ok(())
        })
    }
}

impl Default for PhpEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter<TemplateFile> for PhpEmitter {
    fn emit(&self, tree: &TemplateFile, ctx: &ScopedContext<'_>) -> Result<String, StageError> {
        Ok(self.emit_file(tree, ctx)?)
    }
}

fn function_name(namespace: &str, template: &str) -> String {
    let mut name = String::new();
    for part in namespace.split('.').chain(std::iter::once(template)) {
        if part.is_empty() {
            continue;
        }
        if !name.is_empty() {
            name.push('_');
        }
        name.push_str(&identifier(part));
    }
    name
}

fn msg_var_name(options: &BackendOptions, id: &str, unnamed: &mut usize) -> String {
    if options.messages_are_external_effective() {
        external_msg_var(id)
    } else {
        *unnamed += 1;
        format!("$MSG_UNNAMED_{}", unnamed)
    }
}

/// `$MSG_EXTERNAL_<id>` with every non-alphanumeric character written as
/// `_<hex codepoint>_`. `_` is escaped too, so distinct ids never share a name.
fn external_msg_var(id: &str) -> String {
    let mut var = String::from("$MSG_EXTERNAL_");
    for c in id.chars() {
        if c.is_ascii_alphanumeric() {
            var.push(c);
        } else {
            var.push_str(&format!("_{:x}_", c as u32));
        }
    }
    var
}

fn identifier(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// `user.name` reads `$data['user']['name']`.
fn data_access(root: &str, expr: &str) -> Result<String, EmitError> {
    let mut access = root.to_string();
    for key in expr.split('.') {
        if key.is_empty() {
            return Err(EmitError::InvalidExpression(expr.to_string()));
        }
        access.push_str(&format!("[{}]", php_string(key)));
    }
    Ok(access)
}

fn bidi_expr(direction: EffectiveDirection, ltr: &str, rtl: &str) -> String {
    match direction {
        EffectiveDirection::Fixed(Direction::Ltr) => php_string(ltr),
        EffectiveDirection::Fixed(Direction::Rtl) => php_string(rtl),
        EffectiveDirection::DeferToRuntime => {
            format!("({} ? {} : {})", RUNTIME_IS_RTL, php_string(rtl), php_string(ltr))
        }
    }
}

/// Single-quoted PHP literal.
fn php_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}
