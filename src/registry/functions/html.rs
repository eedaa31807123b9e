//! getHtml() and pageHtml(): HTML report rendering

use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::int_arg;
use crate::evaluator::ExecutionResult;
use crate::model::{Value, ValueMap};
use crate::registry::function::{FunctionResult, RuleFunction};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// CSS class every rendered table carries
pub const TABLE_CLASS: &str = "ReportCalc";

const PAGE_STYLE: &str = r#"			body {font:1rem arial}
			table.ReportCalc {border:1px solid silver; min-width:300px; border-collapse: collapse;
				display:inline-block;}
			table.ReportCalc td {padding:3px 3px 3px 5px}
			table.ReportCalc table td {padding-left:25px}
			table.ReportCalc td.numeric {text-align:right}
			table.ReportCalc caption {background-color: #BBB; display:block;
				text-align:left; padding:3px 3px 3px 5px; cursor:pointer;}

			table.ReportCalc tr td {border-bottom:1px solid silver}
			table.depth_0 caption {background-color: #EEE; font-size:1.3rem}
			table.depth_1 caption {background-color: #DDD; font-size:1.2rem}
			table.depth_2 caption {background-color: #CCC; font-size:1.1rem}

			@media screen {
				table.ReportCalc.depth_1 table {max-height:1.7rem;	display:block;overflow-y:scroll;}
				table.ReportCalc.depth_1 *:hover > table  {
					animation-fill-mode: forwards;
					animation-name: expand;
					animation-duration: .5s;
					animation-delay: .3s;
				}
				@keyframes expand { from {max-height:1.7rem} to {max-height:600px} }
			}"#;

fn numeric_class(value: &Value) -> &'static str {
    if matches!(value, Value::String(_)) {
        ""
    } else {
        " class=\"numeric\""
    }
}

/// A list renders as a grid when every item is a mapping with the same keys
fn is_table(items: &[Value]) -> bool {
    let mut key_set: Option<BTreeSet<&String>> = None;
    for item in items {
        let Value::Map(map) = item else {
            return false;
        };
        let keys: BTreeSet<&String> = map.keys().collect();
        match &key_set {
            None => key_set = Some(keys),
            Some(first) if *first != keys => return false,
            Some(_) => {}
        }
    }
    key_set.is_some()
}

fn table_rows(items: &[Value]) -> (String, String) {
    let Some(Value::Map(first)) = items.first() else {
        return (String::new(), String::new());
    };
    let keys: Vec<&String> = first.keys().collect();
    let head = format!(
        "<tr><td>{}</td></tr>\n",
        keys.iter().map(|k| k.as_str()).collect::<Vec<_>>().join("</td><td>")
    );

    let mut body = String::new();
    for item in items {
        let Value::Map(map) = item else {
            continue;
        };
        body.push_str("<tr>");
        for key in &keys {
            let value = map.get(*key).cloned().unwrap_or_default();
            body.push_str(&format!("<td{}>{value}</td>", numeric_class(&value)));
        }
        body.push_str("</tr>\n");
    }
    (head, body)
}

fn sorted_entries(map: &ValueMap) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by_key(|(_, value)| matches!(value, Value::List(_) | Value::Map(_)));
    entries
}

/// Render `content` as nested HTML tables, `depth` levels deep.
///
/// Mapping entries are listed scalars first. A list of same-keyed
/// mappings becomes a grid with a header row. A scalar is a two cell row.
pub fn render_html(content: &Value, title: &str, depth: usize) -> String {
    let (head, body) = match content {
        Value::Map(map) => (
            String::new(),
            sorted_entries(map)
                .into_iter()
                .map(|(key, value)| render_html(value, key, depth + 1))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Value::List(items) if is_table(items) => table_rows(items),
        Value::List(items) => (
            String::new(),
            items
                .iter()
                .enumerate()
                .map(|(ptr, item)| render_html(item, &ptr.to_string(), depth + 1))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        scalar => {
            return format!(
                "<tr><td>{title}</td><td{}>{scalar}</td></tr>",
                numeric_class(scalar)
            );
        }
    };

    let tabs = "\t".repeat(depth);
    let (prefix, suffix) = if depth > 0 {
        ("<tr><td colspan=\"2\">", "</td></tr>")
    } else {
        ("", "")
    };
    format!(
        "\n{tabs}{prefix}<table class=\"{TABLE_CLASS} depth_{depth}\">\n\
         {tabs}\t<caption>{title}</caption>\n\
         {tabs}\t<thead>{head}</thead>\n\
         {tabs}\t<tbody>{body}</tbody>\n\
         {tabs}\t<tfoot></tfoot>\n\
         {tabs}</table>{suffix}\n"
    )
}

/// Wrap body HTML in a bare html5 page with the report styles
pub fn render_page(content: &str, title: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n\t<head>\n\t\t<meta charset=\"utf-8\">\n\t\t<title>{title}</title>\n\t\t<style>\n{PAGE_STYLE}\n\t\t</style>\n\t</head>\n\t<body>\n\t{content}\n\t</body>\n</html>"
    )
}

fn materialize(value: Value) -> ExecutionResult<Value> {
    match value {
        Value::Rows(rows) => Ok(Value::List(
            rows.map(|row| row.map(Value::from))
                .collect::<ExecutionResult<Vec<_>>>()?,
        )),
        other => Ok(other),
    }
}

fn text_arg(args: &[Value], index: usize, default: &str) -> String {
    match args.get(index) {
        None | Some(Value::Null) => default.to_string(),
        Some(value) => value.to_string(),
    }
}

/// getHtml(content, title='', depth=0)
pub struct GetHtmlFunction;

impl RuleFunction for GetHtmlFunction {
    fn name(&self) -> &str {
        "getHtml"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "getHtml",
                vec![
                    ParameterInfo::required("content"),
                    ParameterInfo::optional("title", "''"),
                    ParameterInfo::optional("depth", "0"),
                ],
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns content as HTML tables, indented by the given depth."
    }

    fn evaluate(&self, args: Vec<Value>) -> FunctionResult<Value> {
        let title = text_arg(&args, 1, "");
        let depth = usize::try_from(int_arg("getHtml", &args, 2, 0)?).unwrap_or(0);
        let content = materialize(args.into_iter().next().unwrap_or_default())?;
        Ok(Value::String(render_html(&content, &title, depth)))
    }
}

/// pageHtml(html_content, title="Data")
pub struct PageHtmlFunction;

impl RuleFunction for PageHtmlFunction {
    fn name(&self) -> &str {
        "pageHtml"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "pageHtml",
                vec![
                    ParameterInfo::required("html_content"),
                    ParameterInfo::optional("title", "Data"),
                ],
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Wraps html_content in a bare html5 page."
    }

    fn evaluate(&self, args: Vec<Value>) -> FunctionResult<Value> {
        let title = text_arg(&args, 1, "Data");
        let content = text_arg(&args, 0, "");
        Ok(Value::String(render_page(&content, &title)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_scalar_cells() {
        assert_eq!(
            render_html(&Value::from(12), "reads", 1),
            "<tr><td>reads</td><td class=\"numeric\">12</td></tr>"
        );
        assert_eq!(
            render_html(&Value::from("ok"), "status", 1),
            "<tr><td>status</td><td>ok</td></tr>"
        );
    }

    #[test]
    fn test_mapping_lists_scalars_first() {
        let html = render_html(
            &Value::from(json!({"files": ["a"], "status": "ok"})),
            "job",
            0,
        );
        let status = html.find("status").unwrap();
        let files = html.find("<caption>files").unwrap();
        assert!(status < files);
        assert!(html.starts_with("\n<table class=\"ReportCalc depth_0\">"));
        assert!(html.contains("\t<tr><td colspan=\"2\"><table class=\"ReportCalc depth_1\">"));
    }

    #[test]
    fn test_same_keyed_list_renders_grid() {
        let html = render_html(
            &Value::from(json!([{"name": "a", "count": 1}, {"name": "b", "count": 2}])),
            "samples",
            0,
        );
        assert!(html.contains("<thead><tr><td>count</td><td>name</td></tr>\n</thead>"));
        assert!(html.contains("<tr><td class=\"numeric\">2</td><td>b</td></tr>\n"));
    }

    #[test]
    fn test_page_wraps_content() {
        let page = PageHtmlFunction
            .evaluate(vec![Value::from("<p>hi</p>")])
            .unwrap();
        let Value::String(page) = page else {
            panic!("expected text");
        };
        assert!(page.starts_with("<!doctype html>"));
        assert!(page.contains("<title>Data</title>"));
        assert!(page.contains("\t<p>hi</p>\n\t</body>"));
    }
}
