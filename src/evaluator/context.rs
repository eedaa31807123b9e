//! Mutable interpreter state threaded through evaluation

use crate::config::RunConfig;
use crate::namespace::Namespace;

/// One active function call, kept for error attribution
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Function name
    pub name: String,
    /// Source text of the arguments collected so far
    pub arg_texts: Vec<String>,
}

/// State of one run: namespace, call stack and diagnostic position
#[derive(Debug)]
pub struct EvaluatorContext {
    /// The variable store
    pub namespace: Namespace,
    /// Run configuration
    pub config: RunConfig,
    /// Section currently executing
    pub section: String,
    /// Row of the rule currently executing
    pub rule_row: usize,
    frames: Vec<Frame>,
}

impl EvaluatorContext {
    /// Create a context over the given namespace
    pub fn new(namespace: Namespace, config: RunConfig) -> Self {
        Self {
            namespace,
            config,
            section: String::new(),
            rule_row: 0,
            frames: Vec::new(),
        }
    }

    /// Reset the call stack and record the position of the next rule
    pub fn begin_rule(&mut self, section: &str, row: usize) {
        if self.section != section {
            self.section = section.to_string();
        }
        self.rule_row = row;
        self.frames.clear();
    }

    /// Number of active calls
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Iterator slot owned by the innermost active call
    pub fn iterator_depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Innermost active call
    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub(crate) fn push_frame(&mut self, name: &str) {
        self.frames.push(Frame {
            name: name.to_string(),
            arg_texts: Vec::new(),
        });
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub(crate) fn record_arg_text(&mut self, text: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.arg_texts.push(text.to_string());
        }
    }
}

impl Default for EvaluatorContext {
    fn default() -> Self {
        Self::new(Namespace::new(), RunConfig::default())
    }
}
