//! Stack-based emitter: normalised JATS tree → MyST (mdast) tree.
//!
//! ## Stack discipline
//!
//! The emitter owns a `Vec<Node>` initialised with one `root`. Opening a
//! node pushes it; closing pops it and appends it to the new top. The root
//! is never popped by [`Emitter::close_node`], and [`Emitter::finish`]
//! closes whatever is still open, so the result is always a single
//! well-formed root.
//!
//! Adjacent text coalesces into one `text` node.
//!
//! ## Dispatch
//!
//! Element names are classified into [`JatsTag`] and handled by one
//! exhaustive `match`. Names outside the table land in
//! [`JatsTag::Other`]; they are recorded as unhandled and skipped, so a
//! partial tree is still produced.

use crate::error::Diagnostics;
use crate::pipeline::input::to_xml;
use crate::pipeline::math::MathmlToLatex;
use crate::tree::{normalize_label, Attrs, Node};
use serde_json::Value;

// ── Element classification ───────────────────────────────────────────────

/// JATS (and normaliser-produced) element types the emitter understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JatsTag {
    Body,
    Text,
    P,
    Heading,
    Block,
    Title,
    DispQuote,
    List,
    ListItem,
    Hr,
    InlineFormula,
    DispFormula,
    Bold,
    Italic,
    Underline,
    Monospace,
    Sub,
    Sup,
    Strike,
    Sc,
    ExtLink,
    Uri,
    Media,
    BoxedText,
    AdmonitionTitle,
    FigGroup,
    Graphic,
    Fig,
    TableWrap,
    Table,
    Thead,
    Tbody,
    Tfoot,
    Tr,
    Th,
    Td,
    TableWrapFoot,
    Break,
    NamedContent,
    FnGroup,
    SupplementaryMaterial,
    Caption,
    Fn,
    Label,
    Comment,
    ObjectId,
    Xref,
    Code,
    Other(String),
}

impl From<&str> for JatsTag {
    fn from(kind: &str) -> Self {
        match kind {
            "body" => Self::Body,
            "text" => Self::Text,
            "p" => Self::P,
            "heading" => Self::Heading,
            "block" => Self::Block,
            "title" => Self::Title,
            "disp-quote" => Self::DispQuote,
            "list" => Self::List,
            "list-item" => Self::ListItem,
            "hr" => Self::Hr,
            "inline-formula" => Self::InlineFormula,
            "disp-formula" => Self::DispFormula,
            "bold" => Self::Bold,
            "italic" => Self::Italic,
            "underline" => Self::Underline,
            "monospace" => Self::Monospace,
            "sub" => Self::Sub,
            "sup" => Self::Sup,
            "strike" => Self::Strike,
            "sc" => Self::Sc,
            "ext-link" => Self::ExtLink,
            "uri" => Self::Uri,
            "media" => Self::Media,
            "boxed-text" => Self::BoxedText,
            "admonitionTitle" => Self::AdmonitionTitle,
            "fig-group" => Self::FigGroup,
            "graphic" | "inline-graphic" => Self::Graphic,
            "fig" => Self::Fig,
            "table-wrap" => Self::TableWrap,
            "table" => Self::Table,
            "thead" => Self::Thead,
            "tbody" => Self::Tbody,
            "tfoot" => Self::Tfoot,
            "tr" => Self::Tr,
            "th" => Self::Th,
            "td" => Self::Td,
            "table-wrap-foot" => Self::TableWrapFoot,
            "break" => Self::Break,
            "named-content" => Self::NamedContent,
            "fn-group" => Self::FnGroup,
            "supplementary-material" => Self::SupplementaryMaterial,
            "caption" => Self::Caption,
            "fn" => Self::Fn,
            "label" => Self::Label,
            "comment" => Self::Comment,
            "object-id" => Self::ObjectId,
            "xref" => Self::Xref,
            "code" | "preformat" => Self::Code,
            other => Self::Other(other.to_string()),
        }
    }
}

/// `ref-type` of an `xref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefType {
    Bibr,
    Sec,
    Fig,
    DispFormula,
    Table,
    Fn,
    Other(String),
}

impl From<&str> for RefType {
    fn from(kind: &str) -> Self {
        match kind {
            "bibr" | "ref" => Self::Bibr,
            "sec" => Self::Sec,
            "fig" => Self::Fig,
            "disp-formula" => Self::DispFormula,
            "table" => Self::Table,
            "fn" | "table-fn" => Self::Fn,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Attribute map from optional pairs; `None` values are left out.
fn attrs<const N: usize>(pairs: [(&str, Option<Value>); N]) -> Attrs {
    pairs
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
        .collect()
}

/// `label` / `identifier` attributes normalised from an element id.
fn label_attrs(id: Option<&str>) -> [(&'static str, Option<Value>); 2] {
    let (label, identifier) = id.and_then(normalize_label).unzip();
    [
        ("label", label.map(Value::from)),
        ("identifier", identifier.map(Value::from)),
    ]
}

fn number_attr(node: &Node, key: &str) -> Option<Value> {
    node.attr_str(key)
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Value::from)
}

fn str_attr(node: &Node, key: &str) -> Option<Value> {
    node.attr_str(key).map(Value::from)
}

/// Remove the first descendant of `kind` (pre-order).
fn remove_first(node: &mut Node, kind: &str) -> bool {
    let Some(children) = node.children.as_mut() else {
        return false;
    };
    if let Some(i) = children.iter().position(|c| c.is(kind)) {
        children.remove(i);
        return true;
    }
    children.iter_mut().any(|c| remove_first(c, kind))
}

// ── Emitter ──────────────────────────────────────────────────────────────

/// Incremental MyST tree builder.
pub struct Emitter<'a> {
    stack: Vec<Node>,
    in_container: bool,
    diagnostics: &'a mut Diagnostics,
    math: &'a dyn MathmlToLatex,
}

impl<'a> Emitter<'a> {
    pub fn new(diagnostics: &'a mut Diagnostics, math: &'a dyn MathmlToLatex) -> Self {
        Self {
            stack: vec![Node::element("root")],
            in_container: false,
            diagnostics,
            math,
        }
    }

    /// Number of open nodes, the root included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn open_node(&mut self, kind: &str, attrs: Attrs, is_leaf: bool) {
        let mut node = if is_leaf {
            Node::leaf(kind)
        } else {
            Node::element(kind)
        };
        node.attrs = attrs;
        self.stack.push(node);
    }

    /// Pop the top node into its parent. A no-op at the root.
    pub fn close_node(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        if let Some(node) = self.stack.pop() {
            self.append(node);
        }
    }

    pub fn add_leaf(&mut self, kind: &str, attrs: Attrs) {
        self.open_node(kind, attrs, true);
        self.close_node();
    }

    /// Append a finished node to the current top.
    fn append(&mut self, node: Node) {
        if let Some(top) = self.stack.last_mut() {
            top.children_mut().push(node);
        }
    }

    /// Append text, merging into a trailing text node.
    pub fn text(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        let children = top.children_mut();
        match children.last_mut() {
            Some(last) if last.is_text() => {
                last.value.get_or_insert_with(String::new).push_str(value);
            }
            _ => children.push(Node::text(value)),
        }
    }

    pub fn render_children(&mut self, node: &Node) {
        for child in node.children() {
            self.render(child);
        }
    }

    /// Open `kind`, render `node`'s content into it, close it.
    fn render_inline(&mut self, node: &Node, kind: &str, attrs: Attrs) {
        self.open_node(kind, attrs, false);
        if node.children.is_some() {
            self.render_children(node);
        } else if let Some(value) = &node.value {
            self.text(value);
        }
        self.close_node();
    }

    /// Close everything and return the root.
    pub fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close_node();
        }
        self.stack.pop().unwrap_or_else(|| Node::element("root"))
    }

    // ── Handlers ─────────────────────────────────────────────────────────

    pub fn render(&mut self, node: &Node) {
        match JatsTag::from(node.kind.as_str()) {
            JatsTag::Body
            | JatsTag::Thead
            | JatsTag::Tbody
            | JatsTag::Tfoot
            | JatsTag::NamedContent
            | JatsTag::FnGroup
            | JatsTag::SupplementaryMaterial
            | JatsTag::Caption => self.render_children(node),
            JatsTag::Text => {
                if let Some(value) = &node.value {
                    self.text(value);
                }
            }
            JatsTag::P => self.render_inline(node, "paragraph", Attrs::new()),
            JatsTag::Heading => {
                let [label, identifier] = label_attrs(node.attr_str("id"));
                let a = attrs([
                    ("enumerated", Some(Value::Bool(true))),
                    label,
                    identifier,
                    ("depth", node.attr("depth").cloned()),
                ]);
                self.render_inline(node, "heading", a);
            }
            JatsTag::Block => {
                let part = node
                    .attr("part")
                    .or_else(|| node.attr("sec-type"))
                    .cloned()
                    .map(|p| serde_json::json!({ "part": p }));
                self.render_inline(node, "block", attrs([("data", part)]));
            }
            JatsTag::Title => {
                self.open_node("paragraph", Attrs::new(), false);
                self.render_inline(node, "strong", Attrs::new());
                self.close_node();
            }
            JatsTag::DispQuote => {
                let a = attrs([("kind", str_attr(node, "content-type"))]);
                self.render_inline(node, "blockquote", a);
            }
            JatsTag::List => {
                let ordered = node.attr_str("list-type") == Some("ordered");
                self.render_inline(node, "list", attrs([("ordered", Some(Value::Bool(ordered)))]));
            }
            JatsTag::ListItem => self.render_inline(node, "listItem", Attrs::new()),
            JatsTag::Hr => {
                if !self.in_container {
                    self.add_leaf("thematicBreak", Attrs::new());
                }
            }
            JatsTag::InlineFormula => self.formula(node, "inlineMath"),
            JatsTag::DispFormula => self.formula(node, "math"),
            JatsTag::Bold => self.render_inline(node, "strong", Attrs::new()),
            JatsTag::Italic => self.render_inline(node, "emphasis", Attrs::new()),
            JatsTag::Underline => self.render_inline(node, "underline", Attrs::new()),
            JatsTag::Monospace => self.render_inline(node, "inlineCode", Attrs::new()),
            JatsTag::Sub => self.render_inline(node, "subscript", Attrs::new()),
            JatsTag::Sup => self.render_inline(node, "superscript", Attrs::new()),
            JatsTag::Strike => self.render_inline(node, "delete", Attrs::new()),
            JatsTag::Sc => self.render_inline(node, "smallcaps", Attrs::new()),
            JatsTag::ExtLink | JatsTag::Uri | JatsTag::Media => {
                let a = attrs([("url", str_attr(node, "xlink:href"))]);
                self.render_inline(node, "link", a);
            }
            JatsTag::BoxedText => {
                let a = attrs([("kind", Some(Value::from("info")))]);
                self.render_inline(node, "admonition", a);
            }
            JatsTag::AdmonitionTitle => self.render_inline(node, "admonitionTitle", Attrs::new()),
            JatsTag::FigGroup => self.fig_group(node),
            JatsTag::Graphic => {
                self.add_leaf("image", attrs([("url", str_attr(node, "xlink:href"))]));
            }
            JatsTag::Fig => self.fig(node),
            JatsTag::TableWrap => self.table_wrap(node),
            JatsTag::Table => self.render_inline(node, "table", Attrs::new()),
            JatsTag::Tr => self.render_inline(node, "tableRow", Attrs::new()),
            JatsTag::Th | JatsTag::Td => {
                let header = node.is("th");
                let a = attrs([
                    ("header", header.then_some(Value::Bool(true))),
                    ("align", str_attr(node, "align")),
                    ("colspan", number_attr(node, "colspan")),
                    ("rowspan", number_attr(node, "rowspan")),
                ]);
                self.render_inline(node, "tableCell", a);
            }
            JatsTag::TableWrapFoot => self.render_inline(node, "legend", Attrs::new()),
            JatsTag::Break => self.add_leaf("break", Attrs::new()),
            JatsTag::Fn => {
                let a = attrs(label_attrs(node.attr_str("id")));
                self.render_inline(node, "footnoteDefinition", a);
            }
            JatsTag::Label | JatsTag::Comment | JatsTag::ObjectId => {}
            JatsTag::Xref => self.xref(node),
            JatsTag::Code => {
                let code = Node::leaf("code")
                    .with_value(node.to_text())
                    .with_opt_attr("lang", node.attr_str("language"));
                self.append(code);
            }
            JatsTag::Other(kind) => self.diagnostics.unhandled(&kind),
        }
    }

    fn formula(&mut self, node: &Node, kind: &str) {
        match self.tex_math(node) {
            Some(tex) => {
                let [label, identifier] = label_attrs(node.attr_str("id"));
                let mut leaf = Node::leaf(kind).with_value(tex);
                leaf.attrs = attrs([label, identifier]);
                self.append(leaf);
            }
            None => self.render_children(node),
        }
    }

    /// LaTeX for a formula: a `tex-math` payload, else converted MathML.
    fn tex_math(&self, node: &Node) -> Option<String> {
        if let Some(tex) = node.find_kind("tex-math") {
            let value = tex
                .first_child()
                .and_then(|c| c.value.clone())
                .unwrap_or_else(|| tex.to_text());
            let value = value.trim();
            return (!value.is_empty()).then(|| value.to_string());
        }
        let mut copy = node.clone();
        copy.walk_mut(&mut |n: &mut Node| {
            if let Some(local) = n.kind.strip_prefix("mml:") {
                n.kind = local.to_string();
            }
        });
        let math = copy.find_kind("math")?;
        let xml = to_xml(&Node::parent("root", vec![math.clone()]));
        self.math.convert(&xml)
    }

    fn fig_group(&mut self, node: &Node) {
        self.open_node("tabSet", Attrs::new(), false);
        for child in node.children() {
            let sync = child.find_kind("label").map(|l| l.to_text().trim().to_string());
            let a = attrs([
                ("title", sync.clone().map(Value::from)),
                ("sync", sync.map(Value::from)),
            ]);
            self.open_node("tabItem", a, false);
            self.render(child);
            self.close_node();
        }
        self.close_node();
    }

    fn container_attrs(node: &Node, kind: &str) -> Attrs {
        let [label, identifier] = label_attrs(node.attr_str("id"));
        attrs([label, identifier, ("kind", Some(Value::from(kind)))])
    }

    /// Bold paragraph holding the children of a title.
    fn caption_title(&mut self, title: &Node) {
        self.open_node("paragraph", Attrs::new(), false);
        self.render_inline(title, "strong", Attrs::new());
        self.close_node();
    }

    fn fig(&mut self, node: &Node) {
        let was_in_container = std::mem::replace(&mut self.in_container, true);
        self.open_node("container", Self::container_attrs(node, "figure"), false);
        if let Some(href) = node
            .find_kind("graphic")
            .and_then(|g| g.attr_str("xlink:href"))
        {
            self.add_leaf("image", attrs([("url", Some(Value::from(href)))]));
        }
        let title = node.find_kind("title");
        let caption = node.find_kind("caption");
        if title.is_some() || caption.is_some() {
            self.open_node("caption", Attrs::new(), false);
            if let Some(title) = title {
                self.caption_title(title);
            }
            if let Some(caption) = caption {
                self.render_children(caption);
            }
            self.close_node();
        }
        self.close_node();
        self.in_container = was_in_container;
    }

    fn table_wrap(&mut self, node: &Node) {
        let was_in_container = std::mem::replace(&mut self.in_container, true);
        self.open_node("container", Self::container_attrs(node, "table"), false);
        let title = node.find_kind("title");
        let caption = node.find_kind("caption");
        let label = node.find_kind("label");
        if title.is_some() || caption.is_some() || label.is_some() {
            self.open_node("caption", Attrs::new(), false);
            if let Some(title) = title {
                self.caption_title(title);
            }
            match (caption, label) {
                (Some(caption), _) => self.render_children(caption),
                (None, Some(label)) => self.render_inline(label, "paragraph", Attrs::new()),
                (None, None) => {}
            }
            self.close_node();
        }
        let mut rest = node.clone();
        for kind in ["title", "caption", "label"] {
            remove_first(&mut rest, kind);
        }
        self.render_children(&rest);
        self.close_node();
        self.in_container = was_in_container;
    }

    fn xref(&mut self, node: &Node) {
        let rid = node.attr_str("rid");
        let [label, identifier] = label_attrs(rid);
        let ref_type = RefType::from(node.attr_str("ref-type").unwrap_or_default());
        let cross_ref = |kind: &str| {
            attrs([
                label.clone(),
                identifier.clone(),
                ("kind", Some(Value::from(kind))),
            ])
        };
        match ref_type {
            RefType::Bibr => {
                let a = attrs([
                    label.clone(),
                    identifier.clone(),
                    ("kind", Some(Value::from("narrative"))),
                ]);
                self.render_inline(node, "cite", a);
            }
            RefType::Sec => self.render_inline(node, "crossReference", cross_ref("heading")),
            RefType::Fig => self.render_inline(node, "crossReference", cross_ref("figure")),
            RefType::DispFormula => {
                self.render_inline(node, "crossReference", cross_ref("equation"))
            }
            RefType::Table => self.render_inline(node, "crossReference", cross_ref("table")),
            RefType::Fn => {
                self.add_leaf("footnoteReference", attrs([label.clone(), identifier.clone()]))
            }
            RefType::Other(other) => {
                self.diagnostics.warn(
                    format!("Unknown ref-type of {other}"),
                    Some("xref"),
                    Some("xref"),
                );
                let a = attrs([("identifier", rid.map(Value::from))]);
                self.render_inline(node, "crossReference", a);
            }
        }
    }
}

/// Emit the children of `tree` into a new MyST `root`.
pub fn emit(tree: &Node, diagnostics: &mut Diagnostics, math: &dyn MathmlToLatex) -> Node {
    let mut emitter = Emitter::new(diagnostics, math);
    emitter.render_children(tree);
    emitter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::parse_xml;
    use crate::pipeline::math::BasicMathml;
    use serde_json::json;

    fn emit_xml(xml: &str) -> (Node, Diagnostics) {
        let tree = parse_xml(xml).unwrap().elements.remove(0);
        let mut diagnostics = Diagnostics::new();
        let root = emit(&tree, &mut diagnostics, &BasicMathml);
        (root, diagnostics)
    }

    #[test]
    fn test_text_merges_and_stack_balances() {
        let mut diagnostics = Diagnostics::new();
        let mut e = Emitter::new(&mut diagnostics, &BasicMathml);
        e.close_node();
        assert_eq!(e.depth(), 1, "closing at the root is a no-op");
        e.open_node("paragraph", Attrs::new(), false);
        e.text("a");
        e.text("");
        e.text("b");
        e.open_node("strong", Attrs::new(), false);
        let root = e.finish();
        let para = &root.children()[0];
        assert_eq!(para.children()[0], Node::text("ab"));
        assert_eq!(para.children()[1].kind, "strong");
    }

    #[test]
    fn test_inline_formatting() {
        let (root, d) = emit_xml("<body><p>a <bold>b</bold> <italic>c</italic><sup>2</sup></p></body>");
        assert!(d.is_empty());
        let kinds: Vec<_> = root.children()[0]
            .children()
            .iter()
            .map(|n| n.kind.as_str())
            .collect();
        assert_eq!(kinds, vec!["text", "strong", "text", "emphasis", "superscript"]);
    }

    #[test]
    fn test_heading_and_block() {
        let tree = Node::parent(
            "body",
            vec![Node::parent(
                "block",
                vec![Node::parent("heading", vec![Node::text("Intro")])
                    .with_attr("id", "S1")
                    .with_attr("depth", 1)],
            )
            .with_attr("part", "acknowledgments")],
        );
        let mut d = Diagnostics::new();
        let root = emit(&tree, &mut d, &BasicMathml);
        let block = &root.children()[0];
        assert_eq!(block.attr("data"), Some(&json!({"part": "acknowledgments"})));
        let heading = &block.children()[0];
        assert_eq!(heading.attr_str("label"), Some("S1"));
        assert_eq!(heading.attr_str("identifier"), Some("s1"));
        assert_eq!(heading.attr("depth"), Some(&json!(1)));
        assert!(heading.attr_bool("enumerated"));
    }

    #[test]
    fn test_xref_dispatch() {
        let (root, d) = emit_xml(
            r#"<body><p><xref ref-type="bibr" rid="B1">1</xref><xref ref-type="fig" rid="F1">Fig 1</xref><xref ref-type="fn" rid="fn1">a</xref><xref ref-type="mystery" rid="M">m</xref></p></body>"#,
        );
        let p = &root.children()[0];
        assert_eq!(p.children()[0].kind, "cite");
        assert_eq!(p.children()[0].attr_str("kind"), Some("narrative"));
        assert_eq!(p.children()[0].attr_str("identifier"), Some("b1"));
        assert_eq!(p.children()[1].attr_str("kind"), Some("figure"));
        assert_eq!(p.children()[2].kind, "footnoteReference");
        assert!(p.children()[2].children.is_none());
        assert_eq!(p.children()[3].kind, "crossReference");
        assert_eq!(p.children()[3].attr_str("identifier"), Some("M"));
        assert_eq!(d.len(), 1);
        assert!(d.messages[0].message.contains("Unknown ref-type of mystery"));
    }

    #[test]
    fn test_unhandled_recorded_and_skipped() {
        let (root, d) = emit_xml("<body><p>x</p><def-list><def>y</def></def-list></body>");
        assert_eq!(root.children().len(), 1);
        assert!(d.unhandled.contains("def-list"));
    }

    #[test]
    fn test_figure_container() {
        let (root, _) = emit_xml(
            r#"<body><fig id="F1"><title>Growth</title><label>Figure 1</label><caption><p>Curves.</p></caption><graphic xlink:href="f1.png"/></fig></body>"#,
        );
        let fig = &root.children()[0];
        assert_eq!(fig.kind, "container");
        assert_eq!(fig.attr_str("kind"), Some("figure"));
        assert_eq!(fig.attr_str("identifier"), Some("f1"));
        assert_eq!(fig.children()[0].kind, "image");
        assert_eq!(fig.children()[0].attr_str("url"), Some("f1.png"));
        let caption = &fig.children()[1];
        assert_eq!(caption.kind, "caption");
        assert_eq!(caption.children()[0].children()[0].kind, "strong");
        assert_eq!(caption.to_text(), "GrowthCurves.");
    }

    #[test]
    fn test_table_container() {
        let (root, d) = emit_xml(
            r#"<body><table-wrap id="T1"><label>Table 1</label><caption><p>Data.</p></caption>
               <table><thead><tr><th align="left">A</th></tr></thead><tbody><tr><td colspan="2">1</td></tr></tbody></table>
               <table-wrap-foot><fn id="tf1"><p>note</p></fn></table-wrap-foot><hr/></table-wrap></body>"#,
        );
        assert!(d.is_empty(), "got: {:?}", d.messages);
        let table = &root.children()[0];
        let kinds: Vec<_> = table.children().iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["caption", "table", "legend"]);
        let th = table.find_kind("tableCell").unwrap();
        assert!(th.attr_bool("header"));
        assert_eq!(th.attr_str("align"), Some("left"));
        let td = table.find(|n| n.is("tableCell") && !n.attr_bool("header")).unwrap();
        assert_eq!(td.attr("colspan"), Some(&json!(2)));
        assert!(table.find_kind("footnoteDefinition").is_some());
    }

    #[test]
    fn test_formulas() {
        let (root, _) = emit_xml(
            r#"<body><p><inline-formula id="E1"><alternatives><tex-math><![CDATA[ x^2 ]]></tex-math></alternatives></inline-formula></p>
               <disp-formula><mml:math><mml:mfrac><mml:mi>a</mml:mi><mml:mi>b</mml:mi></mml:mfrac></mml:math></disp-formula></body>"#,
        );
        let inline = root.find_kind("inlineMath").unwrap();
        assert_eq!(inline.value.as_deref(), Some("x^2"));
        assert_eq!(inline.attr_str("identifier"), Some("e1"));
        let display = root.find_kind("math").unwrap();
        assert_eq!(display.value.as_deref(), Some("\\frac{a}{b}"));
    }

    #[test]
    fn test_fig_group_tabs() {
        let (root, _) = emit_xml(
            r#"<body><fig-group><fig id="a"><label>A</label></fig><fig id="b"><label>B</label></fig></fig-group></body>"#,
        );
        let tabs = &root.children()[0];
        assert_eq!(tabs.kind, "tabSet");
        assert_eq!(tabs.children()[1].attr_str("sync"), Some("B"));
        assert_eq!(tabs.children()[1].children()[0].kind, "container");
    }

    #[test]
    fn test_hr_outside_container() {
        let (root, _) = emit_xml("<body><hr/><p>x</p></body>");
        assert_eq!(root.children()[0].kind, "thematicBreak");
    }
}
