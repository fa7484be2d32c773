//! Path selector grammar
//!
//! A path is a `/`-separated list of steps:
//!
//! ```text
//! step     := tag-spec? ('#' id)? ('@' xref)? ('{' value '}')? ('[' index? ']')?
//! tag-spec := TAG | '(' TAG ('|' TAG)* ')'
//! ```
//!
//! `[i]` picks the i-th match, `[]` asks for every match (last step only),
//! and no index at all requires the step to match at most one node.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{SelectorError, SelectorResult};
use crate::models::{NodeId, Tree};

static STEP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^(?:(?P<tag>[A-Za-z0-9_]+)|\((?P<alt>[A-Za-z0-9_]+(?:\|[A-Za-z0-9_]+)*)\))?(?:#(?P<id>[^@{}\[\]/]+))?(?:@(?P<xref>[^{}\[\]/]+))?(?:\{(?P<value>.*)\})?(?:\[(?P<index>[0-9]*)\])?$",
    )
    .expect("step grammar is a valid regex")
});

/// How many of a step's matches are selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepIndex {
    /// No index: at most one node may match
    Unique,
    /// `[i]`: the i-th match
    At(usize),
    /// `[]`: every match
    All,
}

/// One parsed path step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Source text of the step, for error messages
    pub text: String,
    /// Accepted tags; empty accepts any tag
    pub tags: Vec<String>,
    pub id: Option<String>,
    pub xref: Option<String>,
    pub value: Option<String>,
    pub index: StepIndex,
}

impl Step {
    /// Does `node` pass every filter of this step?
    pub fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|t| t == tree.tag(node)) {
            return false;
        }
        if let Some(ref id) = self.id {
            if tree.id_of(node) != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(ref xref) = self.xref {
            if tree.xref_of(node) != Some(xref.as_str()) {
                return false;
            }
        }
        if let Some(ref value) = self.value {
            if tree.value(node) != Some(value.as_str()) {
                return false;
            }
        }
        true
    }

    /// Children of `parent` passing this step's filters, in order
    pub fn candidates(&self, tree: &Tree, parent: NodeId) -> Vec<NodeId> {
        tree.children(parent)
            .iter()
            .copied()
            .filter(|c| self.matches(tree, *c))
            .collect()
    }
}

/// A parsed, reusable path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    path: String,
    steps: Vec<Step>,
}

impl Selector {
    /// Parse and validate a whole path before any traversal.
    pub fn parse(path: &str) -> SelectorResult<Self> {
        let texts = split_steps(path);
        let mut steps = Vec::with_capacity(texts.len());
        for text in texts {
            steps.push(parse_step(path, text)?);
        }

        let last = steps.len() - 1;
        if steps[..last].iter().any(|s| s.index == StepIndex::All) {
            return Err(SelectorError::ListMarker { path: path.to_string() });
        }

        Ok(Self {
            path: path.to_string(),
            steps,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether the last step carries `[]`
    pub fn is_list(&self) -> bool {
        self.last_step().index == StepIndex::All
    }

    pub(crate) fn last_step(&self) -> &Step {
        // parse guarantees at least one step
        &self.steps[self.steps.len() - 1]
    }

    pub(crate) fn ambiguous(&self, step: &Step, count: usize) -> SelectorError {
        SelectorError::Ambiguous {
            path: self.path.clone(),
            step: step.text.clone(),
            count,
        }
    }

    pub(crate) fn malformed(&self, step: &Step, reason: &str) -> SelectorError {
        SelectorError::Malformed {
            path: self.path.clone(),
            step: step.text.clone(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Split on `/`, leaving slashes inside `{value}` filters alone.
///
/// A `}` closes a value only when followed by `/`, `[` or the end of the path.
fn split_steps(path: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = path.char_indices().collect();
    let mut steps = Vec::new();
    let mut start = 0;
    let mut in_value = false;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        match c {
            '{' if !in_value => in_value = true,
            '}' if in_value => {
                let next = chars.get(i + 1).map(|&(_, n)| n);
                if matches!(next, None | Some('/') | Some('[')) {
                    in_value = false;
                }
            }
            '/' if !in_value => {
                steps.push(&path[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    steps.push(&path[start..]);
    steps
}

fn parse_step(path: &str, text: &str) -> SelectorResult<Step> {
    let malformed = |reason: &str| SelectorError::Malformed {
        path: path.to_string(),
        step: text.to_string(),
        reason: reason.to_string(),
    };

    if text.is_empty() {
        return Err(malformed("empty step"));
    }

    let caps = STEP_RE
        .captures(text)
        .ok_or_else(|| malformed("does not match tag#id@xref{value}[index]"))?;

    let tags: Vec<String> = if let Some(tag) = caps.name("tag") {
        vec![tag.as_str().to_string()]
    } else if let Some(alt) = caps.name("alt") {
        alt.as_str().split('|').map(String::from).collect()
    } else {
        Vec::new()
    };

    let id = caps.name("id").map(|m| m.as_str().to_string());
    let xref = caps.name("xref").map(|m| m.as_str().to_string());
    if id.is_some() && xref.is_some() {
        return Err(malformed("a node cannot carry both an id and an xref"));
    }

    let index = match caps.name("index") {
        None => StepIndex::Unique,
        Some(m) if m.as_str().is_empty() => StepIndex::All,
        Some(m) => StepIndex::At(
            m.as_str()
                .parse::<usize>()
                .map_err(|_| malformed("index out of range"))?,
        ),
    };

    Ok(Step {
        text: text.to_string(),
        tags,
        id,
        xref,
        value: caps.name("value").map(|m| m.as_str().to_string()),
        index,
    })
}
