//! MathML → LaTeX conversion.
//!
//! The emitter prefers a pre-rendered `tex-math` payload. When only MathML
//! is present it hands the serialised `<math>` element to a
//! [`MathmlToLatex`] implementation. [`BasicMathml`] covers the
//! presentation-MathML subset found in typical journal articles; callers
//! with a full converter plug their own in through the configuration.

use crate::pipeline::input::parse_xml;
use crate::tree::Node;

/// Pluggable MathML → LaTeX converter.
pub trait MathmlToLatex: Send + Sync {
    /// LaTeX for a serialised `<math>` element, or `None` when it cannot be
    /// converted.
    fn convert(&self, mathml: &str) -> Option<String>;
}

/// Built-in converter for common presentation MathML.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicMathml;

impl MathmlToLatex for BasicMathml {
    fn convert(&self, mathml: &str) -> Option<String> {
        let parsed = parse_xml(mathml).ok()?;
        let root = parsed.elements.first()?;
        let math = if local_name(root) == "math" {
            root
        } else {
            root.find(|n| local_name(n) == "math")?
        };
        let tex = render_all(math.children()).trim().to_string();
        (!tex.is_empty()).then_some(tex)
    }
}

fn local_name(node: &Node) -> &str {
    node.kind.rsplit(':').next().unwrap_or(&node.kind)
}

// ── Symbol tables ────────────────────────────────────────────────────────

const GREEK: &[(char, &str)] = &[
    ('α', "\\alpha"),
    ('β', "\\beta"),
    ('γ', "\\gamma"),
    ('δ', "\\delta"),
    ('ε', "\\epsilon"),
    ('ζ', "\\zeta"),
    ('η', "\\eta"),
    ('θ', "\\theta"),
    ('ι', "\\iota"),
    ('κ', "\\kappa"),
    ('λ', "\\lambda"),
    ('μ', "\\mu"),
    ('ν', "\\nu"),
    ('ξ', "\\xi"),
    ('π', "\\pi"),
    ('ρ', "\\rho"),
    ('σ', "\\sigma"),
    ('τ', "\\tau"),
    ('υ', "\\upsilon"),
    ('φ', "\\phi"),
    ('χ', "\\chi"),
    ('ψ', "\\psi"),
    ('ω', "\\omega"),
    ('Γ', "\\Gamma"),
    ('Δ', "\\Delta"),
    ('Θ', "\\Theta"),
    ('Λ', "\\Lambda"),
    ('Ξ', "\\Xi"),
    ('Π', "\\Pi"),
    ('Σ', "\\Sigma"),
    ('Φ', "\\Phi"),
    ('Ψ', "\\Psi"),
    ('Ω', "\\Omega"),
];

const OPERATORS: &[(&str, &str)] = &[
    ("×", "\\times"),
    ("·", "\\cdot"),
    ("⋅", "\\cdot"),
    ("±", "\\pm"),
    ("∓", "\\mp"),
    ("−", "-"),
    ("≤", "\\leq"),
    ("≥", "\\geq"),
    ("≠", "\\neq"),
    ("≈", "\\approx"),
    ("∼", "\\sim"),
    ("≡", "\\equiv"),
    ("∝", "\\propto"),
    ("∞", "\\infty"),
    ("→", "\\rightarrow"),
    ("←", "\\leftarrow"),
    ("⇒", "\\Rightarrow"),
    ("↔", "\\leftrightarrow"),
    ("∈", "\\in"),
    ("∉", "\\notin"),
    ("⊂", "\\subset"),
    ("∪", "\\cup"),
    ("∩", "\\cap"),
    ("∂", "\\partial"),
    ("∇", "\\nabla"),
    ("∑", "\\sum"),
    ("∏", "\\prod"),
    ("∫", "\\int"),
    ("…", "\\ldots"),
    ("⋯", "\\cdots"),
    ("°", "^{\\circ}"),
    ("{", "\\{"),
    ("}", "\\}"),
    ("%", "\\%"),
    ("&", "\\&"),
    ("#", "\\#"),
];

const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "log", "ln", "exp", "min", "max", "lim", "det", "sup", "inf",
];

const ACCENTS: &[(&str, &str)] = &[
    ("¯", "\\overline"),
    ("‾", "\\overline"),
    ("^", "\\hat"),
    ("ˆ", "\\hat"),
    ("~", "\\tilde"),
    ("˜", "\\tilde"),
    ("→", "\\vec"),
    ("˙", "\\dot"),
    ("¨", "\\ddot"),
];

fn symbol(text: &str) -> String {
    if let Some((_, tex)) = OPERATORS.iter().find(|(op, _)| *op == text) {
        return (*tex).to_string();
    }
    text.chars()
        .map(|c| match GREEK.iter().find(|(g, _)| *g == c) {
            Some((_, tex)) => format!("{tex} "),
            None => c.to_string(),
        })
        .collect::<String>()
        .trim_end()
        .to_string()
}

// ── Rendering ────────────────────────────────────────────────────────────

fn render_all(nodes: &[Node]) -> String {
    nodes.iter().map(render).collect::<Vec<_>>().join("")
}

fn arg(nodes: &[Node], i: usize) -> String {
    nodes.get(i).map(render).unwrap_or_default()
}

fn render(node: &Node) -> String {
    let c = node.children();
    match local_name(node) {
        "text" | "cdata" => node.value.as_deref().map(symbol).unwrap_or_default(),
        "mi" => {
            let text = node.to_text();
            let text = text.trim();
            if FUNCTIONS.contains(&text) {
                format!("\\{text}")
            } else if text.chars().count() > 1 && text.chars().all(char::is_alphabetic) {
                format!("\\mathrm{{{text}}}")
            } else {
                symbol(text)
            }
        }
        "mn" | "mo" => symbol(node.to_text().trim()),
        "mtext" => {
            let text = node.to_text();
            if text.trim().is_empty() {
                "\\ ".to_string()
            } else {
                format!("\\text{{{text}}}")
            }
        }
        "mspace" => "\\ ".to_string(),
        "msup" => format!("{{{}}}^{{{}}}", arg(c, 0), arg(c, 1)),
        "msub" => format!("{{{}}}_{{{}}}", arg(c, 0), arg(c, 1)),
        "msubsup" | "munderover" => {
            format!("{{{}}}_{{{}}}^{{{}}}", arg(c, 0), arg(c, 1), arg(c, 2))
        }
        "mfrac" => format!("\\frac{{{}}}{{{}}}", arg(c, 0), arg(c, 1)),
        "msqrt" => format!("\\sqrt{{{}}}", render_all(c)),
        "mroot" => format!("\\sqrt[{}]{{{}}}", arg(c, 1), arg(c, 0)),
        "mover" => {
            let over = c.get(1).map(|n| n.to_text()).unwrap_or_default();
            match ACCENTS.iter().find(|(a, _)| *a == over.trim()) {
                Some((_, cmd)) => format!("{cmd}{{{}}}", arg(c, 0)),
                None => format!("\\overset{{{}}}{{{}}}", arg(c, 1), arg(c, 0)),
            }
        }
        "munder" => format!("\\underset{{{}}}{{{}}}", arg(c, 1), arg(c, 0)),
        "mfenced" => {
            let open = node.attr_str("open").unwrap_or("(");
            let close = node.attr_str("close").unwrap_or(")");
            let sep = node.attr_str("separators").unwrap_or(",");
            let inner = c.iter().map(render).collect::<Vec<_>>().join(sep);
            format!("\\left{}{inner}\\right{}", fence(open), fence(close))
        }
        "mtable" => {
            let rows = c
                .iter()
                .map(|row| {
                    row.children()
                        .iter()
                        .map(render)
                        .collect::<Vec<_>>()
                        .join(" & ")
                })
                .collect::<Vec<_>>()
                .join(" \\\\ ");
            format!("\\begin{{matrix}}{rows}\\end{{matrix}}")
        }
        "semantics" => arg(c, 0),
        "annotation" | "annotation-xml" | "comment" => String::new(),
        _ => render_all(c),
    }
}

fn fence(delim: &str) -> &str {
    match delim {
        "" => ".",
        "{" => "\\{",
        "}" => "\\}",
        "‖" => "\\|",
        other => other,
    }
}
