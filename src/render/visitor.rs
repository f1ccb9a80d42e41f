use super::RenderNode;
use crate::computed::Action;
use crate::value::format_number;
use serde::Serialize;

const INDENT: &str = "  ";
const FORCES_REPLACEMENT: &str = "forces replacement";
const WHITESPACE_CHANGES: &str = "whitespace changes";

/// A warning positioned on a 1-based line of rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderWarning {
    pub line: usize,
    pub message: String,
}

/// The text of one side of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedText {
    pub text: String,
    pub warnings: Vec<RenderWarning>,
}

/// Accumulates HCL-like text and tracks line positions for warnings.
///
/// Trailing comments (such as `# forces replacement`) are queued with
/// [`HclWriter::note`] and written when the current line ends, so they land
/// after any separator the enclosing container adds.
#[derive(Debug, Default)]
pub struct HclWriter {
    buf: String,
    depth: usize,
    newlines: usize,
    notes: Vec<&'static str>,
    warnings: Vec<RenderWarning>,
}

impl HclWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, text: &str) {
        self.newlines += text.matches('\n').count();
        self.buf.push_str(text);
    }

    pub fn start_line(&mut self) {
        for _ in 0..self.depth {
            self.buf.push_str(INDENT);
        }
    }

    pub fn end_line(&mut self) {
        self.flush_notes();
        self.write("\n");
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn note(&mut self, note: &'static str) {
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    /// Records a warning against the line currently being written.
    pub fn warn(&mut self, message: &str) {
        self.warnings.push(RenderWarning {
            line: self.newlines + 1,
            message: message.to_string(),
        });
    }

    fn flush_notes(&mut self) {
        if !self.notes.is_empty() {
            let notes = std::mem::take(&mut self.notes).join(", ");
            self.buf.push_str(" # ");
            self.buf.push_str(&notes);
        }
    }

    pub fn finish(mut self) -> RenderedText {
        if !self.buf.is_empty() || !self.notes.is_empty() {
            self.end_line();
        }
        RenderedText {
            text: self.buf,
            warnings: self.warnings,
        }
    }
}

/// Walks a render tree from one side of the change.
///
/// Structural nodes are handled the same way on both sides. Implementors
/// decide which actions are invisible on their side, where warnings belong,
/// and how side-dependent nodes render.
pub trait Visitor {
    fn writer(&mut self) -> &mut HclWriter;

    /// True when nodes with this action do not exist on this side.
    fn skips(&self, action: Action) -> bool;

    fn attaches_warnings(&self, action: Action) -> bool;

    fn visit_primitive(&mut self, node: &RenderNode, before: &RenderNode, after: &RenderNode);

    fn visit_unknown(&mut self, node: &RenderNode, before: Option<&RenderNode>);

    fn visit_type_change(&mut self, node: &RenderNode, before: &RenderNode, after: &RenderNode);

    fn visit_sensitive(&mut self, node: &RenderNode, before_sensitive: bool, after_sensitive: bool);

    fn visit_json_string(&mut self, node: &RenderNode, inner: &RenderNode, whitespace_only: bool);

    fn attach_warnings(&mut self, node: &RenderNode) {
        if node.warnings.is_empty() || !self.attaches_warnings(node.action) {
            return;
        }
        for warning in &node.warnings {
            self.writer().warn(warning);
        }
    }

    fn note_replace(&mut self, node: &RenderNode) {
        if node.replace {
            self.writer().note(FORCES_REPLACEMENT);
        }
    }

    fn visit_block(&mut self, node: &RenderNode, attributes: &[RenderNode], blocks: &[RenderNode]) {
        self.attach_warnings(node);
        let visible: Vec<&RenderNode> = attributes
            .iter()
            .chain(blocks)
            .filter(|child| !self.skips(child.action))
            .collect();
        self.write_container(node, ("{", "}"), "", &visible);
    }

    fn visit_nested_block(&mut self, node: &RenderNode, name: &str, labels: &[String], body: &RenderNode) {
        self.attach_warnings(node);
        let mut header = name.to_string();
        for label in labels {
            header.push(' ');
            header.push_str(&quote(label));
        }
        header.push(' ');
        self.writer().write(&header);
        body.accept(self);
    }

    fn visit_json_object(&mut self, node: &RenderNode, entries: &[RenderNode]) {
        self.attach_warnings(node);
        let visible: Vec<&RenderNode> = entries.iter().filter(|e| !self.skips(e.action)).collect();
        self.write_container(node, ("{", "}"), "", &visible);
    }

    fn visit_json_array(&mut self, node: &RenderNode, elements: &[RenderNode]) {
        self.attach_warnings(node);
        let visible: Vec<&RenderNode> = elements.iter().filter(|e| !self.skips(e.action)).collect();
        self.write_container(node, ("[", "]"), ",", &visible);
    }

    /// Writes `open`, one child per line, then `close`; or `open close`
    /// glued together when nothing is visible.
    fn write_container(
        &mut self,
        node: &RenderNode,
        (open, close): (&str, &str),
        separator: &str,
        children: &[&RenderNode],
    ) {
        if children.is_empty() {
            self.writer().write(open);
            self.writer().write(close);
            self.note_replace(node);
            return;
        }

        self.writer().write(open);
        self.note_replace(node);
        self.writer().end_line();
        self.writer().indent();
        for child in children {
            self.writer().start_line();
            child.accept(self);
            self.writer().write(separator);
            self.writer().end_line();
        }
        self.writer().dedent();
        self.writer().start_line();
        self.writer().write(close);
    }

    fn visit_key_value(&mut self, node: &RenderNode, key: &str, width: usize, value: &RenderNode) {
        self.attach_warnings(node);
        self.writer().write(&format!("{key:<width$} = "));
        value.accept(self);
    }

    fn visit_sensitive_block(&mut self, node: &RenderNode) {
        self.attach_warnings(node);
        self.writer().write("{");
        self.note_replace(node);
        self.writer().end_line();
        self.writer().indent();
        self.writer().start_line();
        self.writer().write("# (sensitive block)");
        self.writer().end_line();
        self.writer().dedent();
        self.writer().start_line();
        self.writer().write("}");
    }

    /// Multiline strings become heredocs.
    fn visit_string(&mut self, node: &RenderNode, value: &str) {
        self.attach_warnings(node);
        if value.contains('\n') {
            self.writer().write("<<-EOT");
            self.writer().end_line();
            self.writer().indent();
            for line in value.trim_end_matches('\n').split('\n') {
                if !line.is_empty() {
                    self.writer().start_line();
                    self.writer().write(line);
                }
                self.writer().end_line();
            }
            self.writer().dedent();
            self.writer().start_line();
            self.writer().write("EOT");
        } else {
            self.writer().write(&quote(value));
        }
        self.note_replace(node);
    }

    fn visit_number(&mut self, node: &RenderNode, value: f64) {
        self.attach_warnings(node);
        self.writer().write(&format_number(value));
        self.note_replace(node);
    }

    fn visit_bool(&mut self, node: &RenderNode, value: bool) {
        self.attach_warnings(node);
        self.writer().write(if value { "true" } else { "false" });
        self.note_replace(node);
    }

    fn visit_null(&mut self, node: &RenderNode) {
        self.attach_warnings(node);
        self.writer().write("null");
        self.note_replace(node);
    }
}

/// Renders the state before the change. Created nodes are invisible.
#[derive(Debug, Default)]
pub struct BeforeVisitor {
    writer: HclWriter,
}

impl BeforeVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> RenderedText {
        self.writer.finish()
    }
}

impl Visitor for BeforeVisitor {
    fn writer(&mut self) -> &mut HclWriter {
        &mut self.writer
    }

    fn skips(&self, action: Action) -> bool {
        action == Action::Create
    }

    // Warnings are only counted once, on the after side, unless there is
    // no after side.
    fn attaches_warnings(&self, action: Action) -> bool {
        action == Action::Delete
    }

    fn visit_primitive(&mut self, node: &RenderNode, before: &RenderNode, _after: &RenderNode) {
        self.attach_warnings(node);
        before.accept(self);
    }

    fn visit_unknown(&mut self, node: &RenderNode, before: Option<&RenderNode>) {
        self.attach_warnings(node);
        match before {
            Some(before) => before.accept(self),
            None => self.writer.write("null"),
        }
    }

    fn visit_type_change(&mut self, node: &RenderNode, before: &RenderNode, _after: &RenderNode) {
        self.attach_warnings(node);
        before.accept(self);
    }

    fn visit_sensitive(&mut self, node: &RenderNode, before_sensitive: bool, _after_sensitive: bool) {
        self.attach_warnings(node);
        let label = match (node.action == Action::Update, before_sensitive) {
            (true, true) => "(old sensitive value)",
            (true, false) => "(old value)",
            (false, true) => "(sensitive value)",
            (false, false) => "(value)",
        };
        self.writer.write(label);
        self.note_replace(node);
    }

    fn visit_json_string(&mut self, node: &RenderNode, inner: &RenderNode, _whitespace_only: bool) {
        self.attach_warnings(node);
        self.writer.write("jsonencode(");
        inner.accept(self);
        self.writer.write(")");
        self.note_replace(node);
    }
}

/// Renders the state after the change. Deleted nodes are invisible.
#[derive(Debug, Default)]
pub struct AfterVisitor {
    writer: HclWriter,
}

impl AfterVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> RenderedText {
        self.writer.finish()
    }
}

impl Visitor for AfterVisitor {
    fn writer(&mut self) -> &mut HclWriter {
        &mut self.writer
    }

    fn skips(&self, action: Action) -> bool {
        action == Action::Delete
    }

    fn attaches_warnings(&self, action: Action) -> bool {
        action != Action::Delete
    }

    fn visit_primitive(&mut self, node: &RenderNode, _before: &RenderNode, after: &RenderNode) {
        self.attach_warnings(node);
        after.accept(self);
    }

    fn visit_unknown(&mut self, node: &RenderNode, _before: Option<&RenderNode>) {
        self.attach_warnings(node);
        self.writer.write("(known after apply)");
        self.note_replace(node);
    }

    fn visit_type_change(&mut self, node: &RenderNode, _before: &RenderNode, after: &RenderNode) {
        self.attach_warnings(node);
        after.accept(self);
    }

    fn visit_sensitive(&mut self, node: &RenderNode, _before_sensitive: bool, after_sensitive: bool) {
        self.attach_warnings(node);
        self.writer.write(if after_sensitive {
            "(sensitive value)"
        } else {
            "(value)"
        });
        self.note_replace(node);
    }

    fn visit_json_string(&mut self, node: &RenderNode, inner: &RenderNode, whitespace_only: bool) {
        self.attach_warnings(node);
        self.writer.write("jsonencode(");
        inner.accept(self);
        self.writer.write(")");
        if whitespace_only {
            self.writer.note(WHITESPACE_CHANGES);
        }
        self.note_replace(node);
    }
}

/// Renders the before side of a tree; empty when the root did not exist.
pub fn render_before(node: &RenderNode) -> RenderedText {
    let mut visitor = BeforeVisitor::new();
    if !visitor.skips(node.action) {
        node.accept(&mut visitor);
    }
    visitor.finish()
}

/// Renders the after side of a tree; empty when the root is removed.
pub fn render_after(node: &RenderNode) -> RenderedText {
    let mut visitor = AfterVisitor::new();
    if !visitor.skips(node.action) {
        node.accept(&mut visitor);
    }
    visitor.finish()
}

/// Quotes a string as an HCL/JSON literal.
pub(crate) fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}
