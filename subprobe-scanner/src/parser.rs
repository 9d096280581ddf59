//! Bounded, failure-tolerant JavaScript parsing.
//!
//! Parsing runs on the blocking pool and races a fixed deadline. Whatever
//! happens (oversized input, syntax errors, a hung parse) the caller gets a
//! [`Node::Program`] back, possibly the empty one.

use crate::ast::{Node, lower_tree};
use crate::config::ScanConfig;
use crate::error::Result;
use regex::Regex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tree_sitter::{Language, Parser};

static SOURCE_MAP_COMMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"//[#@]\s*sourceMappingURL=[^\r\n]*").ok());

/// Grammars tried in order. JavaScript covers both script and module
/// syntax; TypeScript is the fallback for bundles shipping typed modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    JavaScript,
    TypeScript,
}

const GRAMMARS: [Grammar; 2] = [Grammar::JavaScript, Grammar::TypeScript];

impl Grammar {
    fn language(self) -> Language {
        match self {
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

pub struct ScriptParser {
    max_bytes: usize,
    deadline: Duration,
    timeouts: AtomicUsize,
}

/// Cuts `source` to at most `max_bytes` on a char boundary and drops
/// source-map reference comments.
pub fn prepare_source(source: &str, max_bytes: usize) -> String {
    let mut end = source.len().min(max_bytes);
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &source[..end];

    match SOURCE_MAP_COMMENT.as_ref() {
        Some(pattern) => pattern.replace_all(truncated, "").into_owned(),
        None => truncated.to_string(),
    }
}

fn parse_with_grammars(source: &str, budget: Duration, cancel: &AtomicBool) -> Node {
    let started = Instant::now();

    for grammar in GRAMMARS {
        if cancel.load(Ordering::Relaxed) {
            return Node::empty_program();
        }
        let remaining = budget.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            break;
        }

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&grammar.language()) {
            warn!("{:?} grammar unavailable: {}", grammar, e);
            continue;
        }
        parser.set_timeout_micros(u64::try_from(remaining.as_micros()).unwrap_or(u64::MAX));

        let Some(tree) = parser.parse(source, None) else {
            debug!("{:?} parse ran out of time", grammar);
            break;
        };
        if tree.root_node().has_error() {
            debug!("{:?} grammar rejected script", grammar);
            continue;
        }

        return lower_tree(&tree, source, cancel).unwrap_or_else(Node::empty_program);
    }

    Node::empty_program()
}

impl ScriptParser {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let mut probe = Parser::new();
        for grammar in GRAMMARS {
            probe.set_language(&grammar.language())?;
        }

        Ok(Self {
            max_bytes: config.max_script_bytes,
            deadline: config.parse_deadline,
            timeouts: AtomicUsize::new(0),
        })
    }

    /// Number of parses abandoned at the deadline so far.
    pub fn timeout_count(&self) -> usize {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Parses script text into a typed AST. Absent, malformed or too-slow
    /// input yields the empty program.
    pub async fn parse(&self, source: Option<&str>) -> Node {
        let Some(source) = source.filter(|s| !s.trim().is_empty()) else {
            return Node::empty_program();
        };

        let prepared = prepare_source(source, self.max_bytes);
        let budget = self.deadline;
        self.run_bounded(move |cancel| parse_with_grammars(&prepared, budget, cancel))
            .await
    }

    /// Runs `work` on the blocking pool under the parse deadline. On expiry
    /// the cancellation flag handed to `work` is raised and the empty
    /// program is returned without waiting for it.
    async fn run_bounded<F>(&self, work: F) -> Node
    where
        F: FnOnce(&AtomicBool) -> Node + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let task_cancel = Arc::clone(&cancel);
        let task = tokio::task::spawn_blocking(move || work(&task_cancel));

        match tokio::time::timeout(self.deadline, task).await {
            Ok(Ok(ast)) => ast,
            Ok(Err(e)) => {
                warn!("Parse task failed: {}", e);
                Node::empty_program()
            }
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                let total = self.timeouts.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Parse exceeded {:?} ({} timeouts so far)", self.deadline, total);
                Node::empty_program()
            }
        }
    }
}
