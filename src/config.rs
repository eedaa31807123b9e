//! Run configuration

use std::path::{Path, PathBuf};

use crate::evaluator::{ConfigurationError, DEFAULT_MAX_DEPTH};

/// Path that stands for standard output in report targets
pub const STDOUT_TARGET: &str = "-";

/// One input file a ruleset can refer to by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// File system path
    pub path: PathBuf,
    /// Label rules use to find the file
    pub name: String,
    /// File type, e.g. `json`, `txt` or `tabular`
    pub file_type: String,
}

impl InputFile {
    /// Create an input file entry
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            file_type: file_type.into(),
        }
    }

    /// Parse one `path:name:type` entry
    pub fn parse(spec: &str) -> Result<Self, ConfigurationError> {
        let parts: Vec<&str> = spec.trim().split(':').map(str::trim).collect();
        match parts.as_slice() {
            [path, name, file_type] if !path.is_empty() && !name.is_empty() => {
                Ok(Self::new(*path, *name, *file_type))
            }
            _ => Err(ConfigurationError::InputFile {
                spec: spec.to_string(),
            }),
        }
    }

    /// Parse a comma separated list of `path:name:type` entries
    pub fn parse_list(list: &str) -> Result<Vec<Self>, ConfigurationError> {
        list.split(',')
            .filter(|item| !item.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// Everything one run needs to know besides the ruleset itself
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Rule file; without one a single empty `processing` section is used
    pub rules_file: Option<PathBuf>,
    /// Sections to run; empty means every non-optional section
    pub execute: Vec<String>,
    /// Input files registered before any rule runs
    pub input_files: Vec<InputFile>,
    /// JSON report target (`-` for stdout)
    pub output_json: Option<PathBuf>,
    /// HTML report target
    pub output_html: Option<PathBuf>,
    /// Folder `writeFile()` writes into
    pub output_folder: PathBuf,
    /// File holding custom rule overlays
    pub custom_rules: Option<PathBuf>,
    /// Where to save the ruleset after overlays are applied
    pub save_rules: Option<PathBuf>,
    /// Verbose rule tracing
    pub debug: bool,
    /// Maximum nesting depth of function calls
    pub max_depth: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            rules_file: None,
            execute: Vec::new(),
            input_files: Vec::new(),
            output_json: None,
            output_html: None,
            output_folder: PathBuf::from("."),
            custom_rules: None,
            save_rules: None,
            debug: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RunConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rule file
    pub fn with_rules_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_file = Some(path.into());
        self
    }

    /// Set the sections to execute
    pub fn with_execute<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute = sections.into_iter().map(Into::into).collect();
        self
    }

    /// Add an input file
    pub fn with_input_file(mut self, file: InputFile) -> Self {
        self.input_files.push(file);
        self
    }

    /// Set the JSON report target
    pub fn with_output_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_json = Some(path.into());
        self
    }

    /// Set the HTML report target
    pub fn with_output_html(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_html = Some(path.into());
        self
    }

    /// Set the output folder
    pub fn with_output_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_folder = path.into();
        self
    }

    /// Set the custom rule overlay file
    pub fn with_custom_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.custom_rules = Some(path.into());
        self
    }

    /// Save the ruleset after overlays are applied
    pub fn with_save_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_rules = Some(path.into());
        self
    }

    /// Enable debug tracing
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the maximum call nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve a file name inside the output folder
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_folder.join(file_name)
    }

    /// Whether a report target means standard output
    pub fn is_stdout(path: &Path) -> bool {
        path.as_os_str() == STDOUT_TARGET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_input_file_list() {
        let files = InputFile::parse_list("/tmp/a.json:stats:json, /tmp/b.txt:log:txt").unwrap();
        assert_eq!(
            files,
            vec![
                InputFile::new("/tmp/a.json", "stats", "json"),
                InputFile::new("/tmp/b.txt", "log", "txt"),
            ]
        );
    }

    #[test]
    fn test_bad_input_file_spec() {
        let err = InputFile::parse_list("/tmp/a.json:stats").unwrap_err();
        assert!(matches!(err, ConfigurationError::InputFile { .. }));
    }

    #[test]
    fn test_builder() {
        let config = RunConfig::new()
            .with_execute(["a", "b"])
            .with_output_folder("/tmp/out")
            .with_max_depth(8);
        assert_eq!(config.execute, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(config.output_path("x.txt"), PathBuf::from("/tmp/out/x.txt"));
        assert_eq!(config.max_depth, 8);
        assert!(RunConfig::is_stdout(Path::new("-")));
    }
}
