//! One interpreter run, from namespace setup to the exit code

use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{InputFile, RunConfig};
use crate::evaluator::{
    ConfigurationError, EvaluationError, Evaluator, EvaluatorContext, ExecutionError,
    ExecutionResult,
};
use crate::model::{NAME_KEY, VALUE_KEY, Value, ValueMap, pretty_json};
use crate::namespace::{ITERATOR_ROOT, Namespace};
use crate::registry::builtins::{FAIL_STATUS, JOB_LOCATION};
use crate::registry::create_standard_registry;
use crate::registry::extensions::{FILES_ROOT, REPORT_HTML_ROOT};
use crate::registry::functions::render_page;
use crate::ruleset::{RuleFile, apply_overlays, load_overlays};

/// Namespace section the JSON report is made from
pub const REPORT_ROOT: &str = "report";
/// Namespace section indexing input files by name
pub const FILE_NAMES_ROOT: &str = "file_names";
/// Title given to every new report
pub const REPORT_TITLE: &str = "Report Calc";
/// Format of `report/date`
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Status written by `exit(2)`
pub const RETRY_STATUS: &str = "RETRY";
/// Exit code of a failed job
pub const FAIL_EXIT_CODE: i32 = 1;
/// Exit code asking the workflow to retry the job
pub const RETRY_EXIT_CODE: i32 = 2;

const FAIL_MESSAGE: &str = "This job quality report triggered a workflow fail signal!";
const RETRY_MESSAGE: &str = "This job quality report triggered a workflow retry signal!";
const HTML_REPORT_TITLE: &str = "Report Summary";
const TYPE_KEY: &str = "type";

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Process exit code: 0 normal, 1 fail, 2 retry
    pub exit_code: i32,
    /// Last message added to `report/job/message`, if any
    pub message: Option<String>,
}

impl RunOutcome {
    /// Whether the workflow should carry on
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The namespace every run starts from
pub fn initial_namespace(started: DateTime<Utc>) -> Namespace {
    let mut report = ValueMap::new();
    report.insert("title".to_string(), Value::from(REPORT_TITLE));
    report.insert(
        "tool_version".to_string(),
        Value::from(env!("CARGO_PKG_VERSION")),
    );
    report.insert(
        "date".to_string(),
        Value::from(started.format(DATE_FORMAT).to_string()),
    );
    report.insert("job".to_string(), status_map());
    report.insert("quality_control".to_string(), status_map());

    let mut root = ValueMap::new();
    root.insert(REPORT_ROOT.to_string(), Value::Map(report));
    root.insert(FILES_ROOT.to_string(), Value::List(Vec::new()));
    root.insert(FILE_NAMES_ROOT.to_string(), Value::Map(ValueMap::new()));
    root.insert(ITERATOR_ROOT.to_string(), Value::Map(ValueMap::new()));
    root.insert(REPORT_HTML_ROOT.to_string(), Value::from(""));
    Namespace::from_map(root)
}

fn status_map() -> Value {
    let mut map = ValueMap::new();
    map.insert("status".to_string(), Value::from("ok"));
    Value::Map(map)
}

/// Interpreter state for one run
pub struct Session {
    engine: Evaluator,
    context: EvaluatorContext,
    started: Instant,
}

impl Session {
    /// Set up the initial namespace and an evaluator with every built-in
    /// function
    pub fn new(config: RunConfig) -> Self {
        let now = Utc::now();
        log::info!("Generating report ... {}", now.format(DATE_FORMAT));
        let engine =
            Evaluator::new(Arc::new(create_standard_registry())).with_max_depth(config.max_depth);
        Self {
            engine,
            context: EvaluatorContext::new(initial_namespace(now), config),
            started: Instant::now(),
        }
    }

    /// The evaluator rules run on
    pub fn engine(&self) -> &Evaluator {
        &self.engine
    }

    /// Interpreter state
    pub fn context(&self) -> &EvaluatorContext {
        &self.context
    }

    /// Interpreter state, mutably
    pub fn context_mut(&mut self) -> &mut EvaluatorContext {
        &mut self.context
    }

    /// Read a namespace value, e.g. `report/job/status`
    pub fn read_value(&mut self, name: &str) -> Value {
        self.context.namespace.read_value(name)
    }

    /// Load the configured ruleset.
    ///
    /// Without a rule file a single empty `processing` section is used.
    /// Custom rule overlays are applied and the result saved, when asked
    /// for, before the rules are normalized.
    pub fn load_rules(&self) -> Result<RuleFile, ConfigurationError> {
        let config = &self.context.config;
        let mut rules = match &config.rules_file {
            Some(path) => RuleFile::load(path)?,
            None => RuleFile::default(),
        };
        if let Some(path) = &config.custom_rules {
            let overlays = load_overlays(path)?;
            log::info!("Applying {} custom rule overlays", overlays.len());
            apply_overlays(&mut rules, &overlays)?;
        }
        if let Some(path) = &config.save_rules {
            rules.save(path)?;
        }
        rules.normalize();
        Ok(rules)
    }

    /// Add input files to `files` and index them by name in `file_names`.
    ///
    /// Each becomes a row `{name, value: path, type}` so that file rows can
    /// be handed to functions expecting row dictionaries.
    pub fn register_input_files(&mut self, files: &[InputFile]) -> ExecutionResult<()> {
        let namespace = &mut self.context.namespace;
        let mut registered = match namespace.read_value(FILES_ROOT) {
            Value::List(items) => items,
            _ => Vec::new(),
        };
        let mut by_name = match namespace.read_value(FILE_NAMES_ROOT) {
            Value::Map(map) => map,
            _ => ValueMap::new(),
        };

        for file in files {
            let mut row = ValueMap::new();
            row.insert(NAME_KEY.to_string(), Value::from(file.name.as_str()));
            row.insert(
                VALUE_KEY.to_string(),
                Value::from(file.path.display().to_string()),
            );
            row.insert(TYPE_KEY.to_string(), Value::from(file.file_type.as_str()));
            log::debug!("Registered input file {} ({})", file.name, file.path.display());

            by_name.insert(file.name.clone(), Value::Map(row.clone()));
            registered.push(Value::Map(row));
        }

        namespace.store(FILES_ROOT, Value::List(registered))?;
        namespace.store(FILE_NAMES_ROOT, Value::Map(by_name))
    }

    /// Run the configured sections of `rules`, then finalize: status and
    /// messages are settled and the reports written.
    pub fn run(&mut self, rules: &RuleFile) -> RunOutcome {
        let execute = self.context.config.execute.clone();
        let ended = rules.run(&execute, &self.engine, &mut self.context).err();
        self.finalize(ended)
    }

    /// Settle the job status after the rules stopped, for whatever reason,
    /// and write the reports.
    ///
    /// `exit(1)` marks the job `FAIL` and `exit(2)` marks it `RETRY`. The
    /// final `report/job/status` then decides the exit code.
    pub fn finalize(&mut self, ended: Option<EvaluationError>) -> RunOutcome {
        let (mut exit_code, mut messages) = match ended {
            None => (0, Vec::new()),
            Some(EvaluationError::Exit { code, message }) => {
                log::info!("Exit requested with code {code}");
                (code, non_empty(message))
            }
            Some(err) => {
                log::error!("{err}");
                (FAIL_EXIT_CODE, vec![err.to_string()])
            }
        };

        let status_path = format!("{JOB_LOCATION}/status");
        let forced_status = match exit_code {
            FAIL_EXIT_CODE => Some(FAIL_STATUS),
            RETRY_EXIT_CODE => Some(RETRY_STATUS),
            _ => None,
        };
        if let Some(status) = forced_status {
            self.store_or_log(&status_path, Value::from(status));
        }

        let status = self.context.namespace.read_value(&status_path);
        match status.as_str().map(str::to_lowercase).as_deref() {
            Some("fail") => {
                exit_code = FAIL_EXIT_CODE;
                messages.push(FAIL_MESSAGE.to_string());
            }
            Some("retry") => {
                exit_code = RETRY_EXIT_CODE;
                messages.push(RETRY_MESSAGE.to_string());
            }
            _ => {}
        }

        if !messages.is_empty() {
            let values = messages.iter().map(|m| Value::from(m.as_str())).collect();
            let message_path = format!("{JOB_LOCATION}/message");
            if let Err(err) = self.context.namespace.append(&message_path, values) {
                log::error!("Unable to record job messages: {err}");
            }
        }

        if let Err(err) = self.write_reports() {
            log::error!("{err}");
            if exit_code == 0 {
                exit_code = FAIL_EXIT_CODE;
            }
            messages.push(err.to_string());
        }

        let elapsed = self.started.elapsed();
        log::info!(
            "Completed in {}.{:06} seconds.",
            elapsed.as_secs(),
            elapsed.subsec_micros()
        );
        RunOutcome {
            exit_code,
            message: messages.pop(),
        }
    }

    fn store_or_log(&mut self, path: &str, value: Value) {
        if let Err(err) = self.context.namespace.store(path, value) {
            log::error!("Unable to set {path}: {err}");
        }
    }

    /// The `report` subtree as pretty printed JSON, keys sorted
    pub fn report_json(&self) -> String {
        let report = self.context.namespace.section_json(REPORT_ROOT);
        pretty_json(&report).unwrap_or_else(|_| report.to_string())
    }

    /// Write whichever reports the configuration asks for
    pub fn write_reports(&mut self) -> ExecutionResult<()> {
        if let Some(path) = self.context.config.output_json.clone() {
            self.write_json_report(&path)?;
        }
        if let Some(path) = self.context.config.output_html.clone() {
            self.write_html_report(&path)?;
        }
        Ok(())
    }

    fn write_json_report(&self, path: &Path) -> ExecutionResult<()> {
        let json = self.report_json();
        if RunConfig::is_stdout(path) {
            let mut stdout = std::io::stdout().lock();
            return writeln!(stdout, "{json}").map_err(|err| ExecutionError::io("stdout", err));
        }
        fs::write(path, json).map_err(|err| ExecutionError::io(path, err))?;
        log::info!("Wrote JSON report to {}", path.display());
        Ok(())
    }

    fn write_html_report(&mut self, path: &Path) -> ExecutionResult<()> {
        let body = self.context.namespace.read_value(REPORT_HTML_ROOT);
        let body = match body {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let content = format!(
            "<p>Output folder: {}</p>\n\n{body}",
            self.context.config.output_folder.display()
        );
        self.context
            .namespace
            .store(REPORT_HTML_ROOT, Value::from(content.as_str()))?;
        fs::write(path, render_page(&content, HTML_REPORT_TITLE))
            .map_err(|err| ExecutionError::io(path, err))?;
        log::info!("Wrote HTML report to {}", path.display());
        Ok(())
    }
}

fn non_empty(message: String) -> Vec<String> {
    if message.is_empty() {
        Vec::new()
    } else {
        vec![message]
    }
}

/// Run everything `config` describes: load rules, register input files,
/// execute and report.
pub fn execute(config: RunConfig) -> RunOutcome {
    let mut session = Session::new(config);
    let rules = match session.load_rules() {
        Ok(rules) => rules,
        Err(err) => return session.finalize(Some(err.into())),
    };
    let input_files = session.context.config.input_files.clone();
    if let Err(err) = session.register_input_files(&input_files) {
        return session.finalize(Some(err.into()));
    }
    session.run(&rules)
}
