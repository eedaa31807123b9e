//! Input file lookup, file reading and report file output

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Lines};
use std::sync::LazyLock;

use crate::evaluator::{
    EvaluationResult, Evaluator, EvaluatorContext, ExecutionError, ExecutionResult,
};
use crate::model::{NAME_KEY, ROW_KEY, Row, RowStream, Value};
use crate::registry::function::{EngineFunction, Invocation};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// Namespace entry listing registered input files
pub const FILES_ROOT: &str = "files";
/// Namespace entry collecting links to written files for the HTML report
pub const REPORT_HTML_ROOT: &str = "report_html";

/// Registered input files whose name matches the glob `pattern`
fn matching_files(
    context: &mut EvaluatorContext,
    function: &str,
    pattern: &str,
) -> ExecutionResult<Vec<Row>> {
    let matcher = glob::Pattern::new(pattern).map_err(|err| {
        ExecutionError::invalid_argument(function, format!("bad file name pattern {pattern}: {err}"))
    })?;

    let files = if context.namespace.exists(FILES_ROOT) {
        context.namespace.read_value(FILES_ROOT)
    } else {
        Value::Null
    };
    let entries: Vec<Row> = match files {
        Value::List(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Map(map) => Some(Row::from(map)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let names: Vec<String> = entries
        .iter()
        .filter_map(|entry| entry.get(NAME_KEY).map(Value::to_string))
        .collect();
    let matched: Vec<Row> = entries
        .into_iter()
        .filter(|entry| {
            entry
                .get(NAME_KEY)
                .and_then(Value::as_str)
                .is_some_and(|name| matcher.matches(name))
        })
        .collect();

    if matched.is_empty() {
        return Err(ExecutionError::invalid_argument(
            function,
            format!(
                "unable to open any input file named like \"{pattern}\". Input file list is: {}",
                names.join(", ")
            ),
        ));
    }
    Ok(matched)
}

/// The file system path of an input file row
fn file_path(function: &str, file: &Row) -> ExecutionResult<String> {
    match file.value() {
        Some(Value::String(path)) => Ok(path.clone()),
        _ => Err(ExecutionError::invalid_argument(
            function,
            format!("file entry has no path: {file}"),
        )),
    }
}

fn file_name_signature(name: &str) -> FunctionSignature {
    FunctionSignature::new(name, vec![ParameterInfo::required("file_name")])
}

/// iterFiles(file_name)
pub struct IterFilesFunction;

impl EngineFunction for IterFilesFunction {
    fn name(&self) -> &str {
        "iterFiles"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| file_name_signature("iterFiles"));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Iterate over the input files whose name matches file_name. Wildcards * and ? are accepted."
    }

    fn call(
        &self,
        invocation: Invocation,
        _engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let pattern = invocation.text(0).unwrap_or_default();
        let files = matching_files(context, "iterFiles", &pattern)?;
        Ok(Value::Rows(RowStream::from_rows(files)))
    }
}

/// loadFileByName(file_name)
pub struct LoadFileByNameFunction;

impl EngineFunction for LoadFileByNameFunction {
    fn name(&self) -> &str {
        "loadFileByName"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| file_name_signature("loadFileByName"));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Load the whole content of each input file matching file_name. Files of type json are parsed."
    }

    fn call(
        &self,
        invocation: Invocation,
        _engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let pattern = invocation.text(0).unwrap_or_default();
        let files = matching_files(context, "loadFileByName", &pattern)?;

        let rows = files.into_iter().enumerate().map(|(ptr, file)| {
            let path = file_path("loadFileByName", &file)?;
            let content = fs::read_to_string(&path).map_err(|err| ExecutionError::io(&path, err))?;
            let name = file.get(NAME_KEY).cloned().unwrap_or_default();
            log::info!("Loaded {name}: {} characters", content.len());

            let is_json = file.get("type").and_then(Value::as_str) == Some("json");
            let value = if is_json {
                let json: serde_json::Value = serde_json::from_str(&content).map_err(|err| {
                    ExecutionError::invalid_argument(
                        "loadFileByName",
                        format!("{path} is not valid JSON: {err}"),
                    )
                })?;
                Value::from(json)
            } else {
                Value::String(content)
            };
            Ok(Row::with_value(value).field(ROW_KEY, ptr).field(NAME_KEY, name))
        });
        Ok(Value::Rows(RowStream::new(rows)))
    }
}

/// Line rows over a list of files. Each file is opened when reached and
/// closed once its lines run out or the stream is dropped.
struct LineRows {
    files: std::vec::IntoIter<Row>,
    current: Option<(Value, Lines<BufReader<File>>)>,
    ptr: usize,
}

impl LineRows {
    fn new(files: Vec<Row>) -> Self {
        Self {
            files: files.into_iter(),
            current: None,
            ptr: 0,
        }
    }
}

impl Iterator for LineRows {
    type Item = ExecutionResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((name, lines)) = &mut self.current {
                match lines.next() {
                    Some(Ok(line)) => {
                        let row = Row::with_value(line)
                            .field(ROW_KEY, self.ptr)
                            .field(NAME_KEY, name.clone());
                        self.ptr += 1;
                        return Some(Ok(row));
                    }
                    Some(Err(err)) => {
                        let name = name.to_string();
                        self.current = None;
                        return Some(Err(ExecutionError::io(name, err)));
                    }
                    None => self.current = None,
                }
            }

            let file = self.files.next()?;
            let path = match file_path("readFileByName", &file) {
                Ok(path) => path,
                Err(err) => return Some(Err(err)),
            };
            match File::open(&path) {
                Ok(handle) => {
                    log::debug!("Reading lines of {path}");
                    let name = file.get(NAME_KEY).cloned().unwrap_or(Value::String(path));
                    self.current = Some((name, BufReader::new(handle).lines()));
                    self.ptr = 0;
                }
                Err(err) => return Some(Err(ExecutionError::io(&path, err))),
            }
        }
    }
}

/// readFileByName(entity)
pub struct ReadFileByNameFunction;

impl EngineFunction for ReadFileByNameFunction {
    fn name(&self) -> &str {
        "readFileByName"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("readFileByName", vec![ParameterInfo::required("entity")])
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Read the lines of input files one at a time. entity is a file name pattern, a file dictionary, or rows of file dictionaries."
    }

    fn call(
        &self,
        mut invocation: Invocation,
        _engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let files = match invocation.take(0) {
            Value::String(pattern) => matching_files(context, "readFileByName", &pattern)?,
            Value::Map(map) => vec![Row::from(map)],
            other => other
                .into_rows("readFileByName")?
                .collect::<ExecutionResult<Vec<Row>>>()?,
        };
        Ok(Value::Rows(RowStream::new(LineRows::new(files))))
    }
}

/// Render content the way it lands in an output file
fn file_content(content: &Value) -> ExecutionResult<String> {
    Ok(match content {
        Value::Map(map) => map
            .iter()
            .map(|(key, value)| format!("{key}\t{value}\n"))
            .collect(),
        Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::Map(map) => map.get("value").map(Value::to_string).unwrap_or_default(),
                other => other.to_string(),
            })
            .collect(),
        Value::Rows(rows) => {
            let mut out = String::new();
            for row in rows.clone() {
                if let Some(value) = row?.value() {
                    out.push_str(&value.to_string());
                }
            }
            out
        }
        scalar => scalar.to_string(),
    })
}

/// Write content into the output folder and link it from the HTML report
fn write_output_file(
    function: &str,
    context: &mut EvaluatorContext,
    content: &str,
    file_name: &str,
) -> ExecutionResult<Value> {
    if file_name.is_empty() {
        return Err(ExecutionError::invalid_argument(function, "file_name is empty"));
    }

    let mut report_html = if context.namespace.exists(REPORT_HTML_ROOT) {
        context.namespace.read_value(REPORT_HTML_ROOT).to_string()
    } else {
        String::new()
    };
    report_html.push_str(&format!(
        "<li><a href=\"{file_name}\">{file_name}</a></li><br/>\n"
    ));
    context.namespace.store(REPORT_HTML_ROOT, report_html)?;

    let folder = context.config.output_folder.clone();
    if !folder.as_os_str().is_empty() && !folder.exists() {
        fs::create_dir_all(&folder).map_err(|err| ExecutionError::io(&folder, err))?;
    }
    let path = context.config.output_path(file_name);
    fs::write(&path, content).map_err(|err| ExecutionError::io(&path, err))?;
    log::info!("Wrote {}", path.display());
    Ok(Value::String(path.display().to_string()))
}

fn write_signature(name: &str) -> FunctionSignature {
    FunctionSignature::new(
        name,
        vec![
            ParameterInfo::required("content"),
            ParameterInfo::required("file_name"),
        ],
    )
}

/// writeFile(content, file_name)
pub struct WriteFileFunction;

impl EngineFunction for WriteFileFunction {
    fn name(&self) -> &str {
        "writeFile"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| write_signature("writeFile"));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Write content to file_name in the output folder. A dictionary is written as tab separated key value lines."
    }

    fn call(
        &self,
        invocation: Invocation,
        _engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let content = file_content(&invocation.arg(0))?;
        let file_name = invocation.text(1).unwrap_or_default();
        Ok(write_output_file("writeFile", context, &content, &file_name)?)
    }
}

/// writeJsonFile(content, file_name)
pub struct WriteJsonFileFunction;

impl EngineFunction for WriteJsonFileFunction {
    fn name(&self) -> &str {
        "writeJsonFile"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| write_signature("writeJsonFile"));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Write content as pretty printed JSON with sorted keys to file_name in the output folder."
    }

    fn call(
        &self,
        invocation: Invocation,
        _engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let content = invocation.arg(0).to_pretty_json().map_err(|err| {
            ExecutionError::invalid_argument("writeJsonFile", err.to_string())
        })?;
        let file_name = invocation.text(1).unwrap_or_default();
        Ok(write_output_file("writeJsonFile", context, &content, &file_name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::namespace::Namespace;
    use crate::rule;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn context_with_files(dir: &TempDir) -> EvaluatorContext {
        let lines = dir.path().join("lines.txt");
        let data = dir.path().join("data.json");
        fs::write(&lines, "first\nsecond\n").unwrap();
        fs::write(&data, r#"{"reads": 12}"#).unwrap();

        let mut namespace = Namespace::new();
        namespace
            .store(
                FILES_ROOT,
                Value::from(json!([
                    {"name": "lines", "value": lines.display().to_string(), "type": "txt"},
                    {"name": "data", "value": data.display().to_string(), "type": "json"}
                ])),
            )
            .unwrap();
        let config = RunConfig::new().with_output_folder(dir.path().join("out"));
        EvaluatorContext::new(namespace, config)
    }

    #[test]
    fn test_read_file_by_name_yields_line_rows() {
        let dir = TempDir::new().unwrap();
        let mut context = context_with_files(&dir);
        let value = Evaluator::default()
            .evaluate(&rule!(["readFileByName", "\"lin*\""]), &mut context)
            .unwrap();
        let rows: Vec<Row> = value
            .into_rows("test")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].value(), Some(&Value::from("second")));
        assert_eq!(rows[1].get(ROW_KEY), Some(&Value::Integer(1)));
        assert_eq!(rows[1].get(NAME_KEY), Some(&Value::from("lines")));
    }

    #[test]
    fn test_load_file_by_name_parses_json() {
        let dir = TempDir::new().unwrap();
        let mut context = context_with_files(&dir);
        Evaluator::default()
            .evaluate(
                &rule!(["store", ["loadFileByName", "\"data\""], "report/loaded"]),
                &mut context,
            )
            .unwrap();
        assert_eq!(
            context.namespace.read_value("report/loaded/reads"),
            Value::Integer(12)
        );
    }

    #[test]
    fn test_unknown_file_name_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let mut context = context_with_files(&dir);
        let value = Evaluator::default()
            .evaluate(&rule!(["iterFiles", "\"missing\""]), &mut context)
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_write_file_links_report() {
        let dir = TempDir::new().unwrap();
        let mut context = context_with_files(&dir);
        context.namespace.store("counts/a", 1).unwrap();
        context.namespace.store("counts/b", 2).unwrap();
        Evaluator::default()
            .evaluate(&rule!(["writeFile", "counts", "\"counts.tsv\""]), &mut context)
            .unwrap();

        let written = fs::read_to_string(dir.path().join("out").join("counts.tsv")).unwrap();
        assert_eq!(written, "a\t1\nb\t2\n");
        assert_eq!(
            context.namespace.read_value(REPORT_HTML_ROOT),
            Value::from("<li><a href=\"counts.tsv\">counts.tsv</a></li><br/>\n")
        );
    }

    #[test]
    fn test_write_json_file_sorts_keys() {
        let dir = TempDir::new().unwrap();
        let mut context = context_with_files(&dir);
        context.namespace.store("summary/z", 1).unwrap();
        context.namespace.store("summary/a", "x").unwrap();
        Evaluator::default()
            .evaluate(&rule!(["writeJsonFile", "summary", "\"summary.json\""]), &mut context)
            .unwrap();

        let written = fs::read_to_string(dir.path().join("out").join("summary.json")).unwrap();
        assert_eq!(written, "{\n    \"a\": \"x\",\n    \"z\": 1\n}");
    }
}
