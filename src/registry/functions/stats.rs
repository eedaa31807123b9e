//! statisticN(): N50-style assembly statistics

use std::sync::LazyLock;

use super::number_arg;
use crate::evaluator::{ExecutionError, ExecutionResult};
use crate::model::{Value, ValueMap};
use crate::registry::function::{FunctionResult, RuleFunction};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// statisticN(numlist, split=50, genome_length=0)
///
/// N50 is the length of the smallest contig in the fewest, largest contigs
/// whose combined length covers at least 50% of the assembly. `split`
/// picks another percentage. With a reference `genome_length` the NG
/// variants measure coverage of the genome instead of the assembly.
pub struct StatisticNFunction;

/// Walk `sorted` (descending) until the running total reaches `target`.
/// Returns the contig length reached and its index.
fn threshold(sorted: &[(f64, Value)], target: f64) -> (Value, usize) {
    let mut cumulative = 0.0;
    for (ptr, (length, value)) in sorted.iter().enumerate() {
        cumulative += length;
        if cumulative >= target {
            return (value.clone(), ptr);
        }
    }
    let last = sorted.len().saturating_sub(1);
    (sorted.last().map(|(_, v)| v.clone()).unwrap_or_default(), last)
}

fn contig_lengths(value: Value) -> ExecutionResult<Vec<(f64, Value)>> {
    let items = match value {
        Value::List(items) => items,
        Value::Rows(rows) => rows
            .map(|row| row.map(|mut row| row.take_value().unwrap_or_default()))
            .collect::<ExecutionResult<Vec<_>>>()?,
        other => {
            return Err(ExecutionError::invalid_argument(
                "statisticN",
                format!("didn't get a list of numbers to work on, got {}", other.type_name()),
            ));
        }
    };
    items
        .into_iter()
        .map(|item| Ok((number_arg("statisticN", &item)?, item)))
        .collect()
}

impl RuleFunction for StatisticNFunction {
    fn name(&self) -> &str {
        "statisticN"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "statisticN",
                vec![
                    ParameterInfo::required("numeric_array"),
                    ParameterInfo::optional("split", "50"),
                    ParameterInfo::optional("genome_length", "0"),
                ],
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "By default the N50 statistic of an array of contig lengths, as contig_N50 and contig_L50. A reference genome_length adds contig_NG50 and contig_LG50."
    }

    fn evaluate(&self, args: Vec<Value>) -> FunctionResult<Value> {
        let mut args = args.into_iter();
        let mut contigs = contig_lengths(args.next().unwrap_or_default())?;
        if contigs.is_empty() {
            return Err(ExecutionError::invalid_argument(
                "statisticN",
                "didn't get any contig lengths to work on",
            ));
        }
        let split = match args.next() {
            None | Some(Value::Null) => Value::Integer(50),
            Some(split) => split,
        };
        let split_fraction = number_arg("statisticN", &split)? / 100.0;
        let genome_length = match args.next() {
            None | Some(Value::Null) => 0.0,
            Some(length) => number_arg("statisticN", &length)?,
        };

        contigs.sort_by(|a, b| b.0.total_cmp(&a.0));
        let assembly_length: f64 = contigs.iter().map(|(length, _)| length).sum();
        let label = split.to_string();

        let mut data = ValueMap::new();
        let (n_value, l_index) = threshold(&contigs, assembly_length * split_fraction);
        data.insert(format!("contig_N{label}"), n_value);
        if genome_length > 0.0 {
            let (ng_value, lg_index) = threshold(&contigs, genome_length * split_fraction);
            data.insert(format!("contig_NG{label}"), ng_value);
            data.insert(format!("contig_L{label}"), Value::from(l_index));
            data.insert(format!("contig_LG{label}"), Value::from(lg_index));
        } else {
            data.insert(format!("contig_L{label}"), Value::from(l_index));
        }
        Ok(Value::Map(data))
    }
}
