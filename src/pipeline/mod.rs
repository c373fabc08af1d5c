//! Pipeline stages for JATS-to-MyST conversion.
//!
//! Each submodule implements one transformation step over the generic
//! [`Node`](crate::tree::Node) tree. Stages only talk to each other through
//! the tree and explicit return values, so each one is testable on a
//! hand-built fragment.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ references ──▶ backmatter ──▶ abstracts/sections/normalize
//! (XML)     (ref-list)     (back → body)   (JATS → JATS)
//!
//!       ──▶ emit ──▶ citations ──▶ abbreviations ──▶ postprocess
//!          (→ MyST)  (citeGroup)   (→ frontmatter)   (cleanup)
//! ```
//!
//! 1. [`input`]: XML text to tree (and back, for MathML)
//! 2. [`references`]: classify every back-matter `ref` into DOI citations,
//!    bibliography keys and footnotes; produce the lookup used later to
//!    rewrite in-text citations
//! 3. [`backmatter`]: copy footnotes, sections and appendices from `back`
//!    onto the end of the body; move floating supplementary material last
//! 4. [`abstracts`], [`sections`], [`normalize`]: reshape JATS in place
//!    (headings, flat block nesting, admonitions, caption titles,
//!    typography, journal-specific fixes)
//! 5. [`emit`]: the visitor that turns JATS elements into MyST nodes, using
//!    [`math`] for MathML that has no TeX alternative
//! 6. [`citations`]: group, range-expand and clean up in-text citations
//!    until nothing changes
//! 7. [`abbreviations`]: lift abbreviation sections and footnotes into the
//!    frontmatter
//! 8. [`postprocess`]: legend footnotes and text-node cleanup

pub mod abbreviations;
pub mod abstracts;
pub mod backmatter;
pub mod citations;
pub mod emit;
pub mod input;
pub mod math;
pub mod normalize;
pub mod postprocess;
pub mod references;
pub mod sections;
