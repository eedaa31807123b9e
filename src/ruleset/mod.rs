//! Rule files, their sections and section execution

mod overlay;

pub use overlay::{CustomRule, apply_overlays, load_overlays};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ast::Rule;
use crate::evaluator::{
    ConfigurationError, EvaluationError, EvaluationResult, Evaluator, EvaluatorContext,
    report_rule_error,
};
use crate::model::pretty_json;
use crate::parser::normalize;

/// Name of the section used when no rule file is given
pub const DEFAULT_SECTION: &str = "processing";

const OPTIONAL_TYPE: &str = "optional";

/// A named, ordered group of rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Name used to select the section for execution
    pub name: String,
    /// Rules in execution order
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// `optional` sections only run when asked for by name
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub section_type: Option<String>,
}

impl Section {
    /// Create an empty section
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            section_type: None,
        }
    }

    /// Whether the section is skipped unless requested
    pub fn is_optional(&self) -> bool {
        self.section_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(OPTIONAL_TYPE))
    }

    /// Evaluate every rule in order, discarding results.
    ///
    /// Rule errors are logged and skipped. Configuration errors, `exit()`
    /// and internal errors stop the section and are returned.
    pub fn run(&self, engine: &Evaluator, context: &mut EvaluatorContext) -> EvaluationResult<()> {
        log::info!("Running section \"{}\" ({} rules)", self.name, self.rules.len());
        for (row, rule) in self.rules.iter().enumerate() {
            context.begin_rule(&self.name, row);
            match engine.evaluate(rule, context) {
                Ok(_) => {}
                Err(EvaluationError::Execution(err)) => report_rule_error(context, &err),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

/// Contents of a rule file.
///
/// `sections` may also be spelled `rulesets`. Other top level keys are kept
/// so that saving a file round-trips them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    /// Sections in document order
    #[serde(alias = "rulesets")]
    pub sections: Vec<Section>,
    /// Keys this interpreter does not use
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for RuleFile {
    fn default() -> Self {
        Self {
            sections: vec![Section::new(DEFAULT_SECTION)],
            extra: serde_json::Map::new(),
        }
    }
}

impl RuleFile {
    /// Parse rule file JSON. Rules are kept as written.
    pub fn from_json_str(text: &str, source_name: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(text).map_err(|err| ConfigurationError::RuleFile {
            source_name: source_name.to_string(),
            message: err.to_string(),
        })
    }

    /// Read a rule file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let source_name = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|err| ConfigurationError::RuleFile {
            source_name: source_name.clone(),
            message: err.to_string(),
        })?;
        let file = Self::from_json_str(&text, &source_name)?;
        log::info!(
            "Loaded {} rule sections from {source_name}",
            file.sections.len()
        );
        Ok(file)
    }

    /// Rewrite every rule into prefix form. Run once, after overlays.
    pub fn normalize(&mut self) {
        for section in &mut self.sections {
            section.rules = std::mem::take(&mut section.rules)
                .into_iter()
                .map(normalize)
                .collect();
        }
    }

    /// Look up a section by name
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub(crate) fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|section| section.name == name)
    }

    /// Sections to execute, in document order.
    ///
    /// An empty request selects every section that isn't optional. Every
    /// requested name has to exist.
    pub fn selected(&self, execute: &[String]) -> Result<Vec<&Section>, ConfigurationError> {
        if execute.is_empty() {
            return Ok(self.sections.iter().filter(|s| !s.is_optional()).collect());
        }
        if let Some(missing) = execute.iter().find(|name| self.section(name).is_none()) {
            return Err(ConfigurationError::UnknownSection {
                name: missing.clone(),
            });
        }
        Ok(self
            .sections
            .iter()
            .filter(|section| execute.contains(&section.name))
            .collect())
    }

    /// Run one section by name
    pub fn run_section(
        &self,
        name: &str,
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<()> {
        let section = self
            .section(name)
            .ok_or_else(|| ConfigurationError::UnknownSection {
                name: name.to_string(),
            })?;
        section.run(engine, context)
    }

    /// Run the requested sections (see [`RuleFile::selected`])
    pub fn run(
        &self,
        execute: &[String],
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<()> {
        let sections = self.selected(execute)?;
        log::info!(
            "Executing: {:?} from {:?}",
            sections.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            self.sections.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
        );
        for section in sections {
            section.run(engine, context)?;
        }
        Ok(())
    }

    /// Pretty printed JSON, keys sorted
    pub fn to_json_string(&self) -> Result<String, ConfigurationError> {
        let to_error = |err: serde_json::Error| ConfigurationError::RuleFile {
            source_name: "ruleset".to_string(),
            message: err.to_string(),
        };
        // Through serde_json::Value so keys come out sorted
        let value = serde_json::to_value(self).map_err(to_error)?;
        pretty_json(&value).map_err(to_error)
    }

    /// Write the ruleset to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigurationError> {
        let text = self.to_json_string()?;
        fs::write(path, text).map_err(|err| ConfigurationError::RuleFile {
            source_name: path.display().to_string(),
            message: err.to_string(),
        })?;
        log::info!("Saved rules to {}", path.display());
        Ok(())
    }
}
