//! Result logging and aggregation.
//!
//! Every solve appends one record to `{problem}.csv` with the columns
//! `Instance,Status,Objective,Gap,Time,Model`. The aggregation side reads
//! such a file back, groups records by the parameter configuration encoded
//! in the instance name and summarizes how each configuration fared:
//! solved to optimality, stopped at the limit with an incumbent, or left
//! without any solution.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::model::{SolveResult, SolverStatus};

/// One row of a results CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRecord {
    #[serde(rename = "Instance")]
    pub instance: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Objective")]
    pub objective: f64,
    #[serde(rename = "Gap")]
    pub gap: f64,
    #[serde(rename = "Time")]
    pub time: f64,
    #[serde(rename = "Model")]
    pub model: String,
}

impl SolveRecord {
    pub fn new(instance: &str, model: &str, result: &SolveResult) -> Self {
        SolveRecord {
            instance: instance.to_string(),
            status: result.status.as_keyword().to_string(),
            objective: result.objective,
            gap: result.gap,
            time: result.runtime,
            model: model.to_string(),
        }
    }
}

/// Appends a record to `{results_dir}/{problem}.csv`, creating the file
/// (with header) and parent directories on first use.
pub fn log_result(
    results_dir: &Path,
    problem: &str,
    record: &SolveRecord,
) -> Result<PathBuf, String> {
    std::fs::create_dir_all(results_dir)
        .map_err(|e| format!("cannot create {}: {}", results_dir.display(), e))?;
    let path = results_dir.join(format!("{}.csv", problem.to_uppercase()));
    let existed = path.exists();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut writer = csv::WriterBuilder::new().has_headers(!existed).from_writer(file);
    writer.serialize(record).map_err(|e| format!("cannot write record: {}", e))?;
    writer.flush().map_err(|e| format!("cannot flush {}: {}", path.display(), e))?;
    Ok(path)
}

/// Reads a results CSV back into records.
pub fn read_records(path: &Path) -> Result<Vec<SolveRecord>, String> {
    let file = File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record.map_err(|e| format!("invalid record in {}: {}", path.display(), e))?);
    }
    Ok(records)
}

/// Parameter-configuration prefix of an instance name: the name without
/// its trailing per-configuration instance number (and extension), e.g.
/// `PDPT-R5-K2-T1-Q100` for `PDPT-R5-K2-T1-Q100-6.txt`.
pub fn params_of(instance: &str) -> &str {
    let name = instance.strip_suffix(".txt").unwrap_or(instance);
    name.rsplit_once('-').map(|(prefix, _)| prefix).unwrap_or(name)
}

/// Per-configuration aggregate of a batch of solves.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    /// Parameter configuration, e.g. `PDPT-R5-K2-T1-Q100`.
    pub params: String,
    /// Instances solved to proven optimality.
    pub opt: usize,
    /// Instances that hit the time limit with an incumbent solution.
    pub lim: usize,
    /// Instances that hit the time limit with no solution at all.
    pub no: usize,
    /// Mean optimality gap over the `lim` instances.
    pub mean_gap: f64,
    /// Mean runtime over the `opt` instances.
    pub mean_time: f64,
}

/// Groups records by parameter configuration and summarizes each group,
/// optionally restricted to a single formulation.
pub fn summarize(records: &[SolveRecord], model: Option<&str>) -> Vec<ConfigSummary> {
    let mut groups: Vec<(&str, Vec<&SolveRecord>)> = Vec::new();
    for record in records {
        if let Some(model) = model {
            if record.model != model {
                continue;
            }
        }
        let params = params_of(&record.instance);
        match groups.iter_mut().find(|(p, _)| *p == params) {
            Some((_, members)) => members.push(record),
            None => groups.push((params, vec![record])),
        }
    }
    groups.sort_by(|(p1, _), (p2, _)| p1.cmp(p2));

    groups
        .into_iter()
        .map(|(params, members)| {
            let optimal = SolverStatus::Optimal.as_keyword();
            let time_limit = SolverStatus::TimeLimit.as_keyword();

            let opt: Vec<_> = members.iter().filter(|r| r.status == optimal).collect();
            let lim: Vec<_> = members
                .iter()
                .filter(|r| r.status == time_limit && r.objective.is_finite())
                .collect();
            let no = members
                .iter()
                .filter(|r| r.status == time_limit && !r.objective.is_finite())
                .count();

            let mean = |values: &[f64]| {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            };
            let gaps: Vec<f64> = lim.iter().map(|r| r.gap).collect();
            let times: Vec<f64> = opt.iter().map(|r| r.time).collect();

            ConfigSummary {
                params: params.to_string(),
                opt: opt.len(),
                lim: lim.len(),
                no,
                mean_gap: mean(&gaps),
                mean_time: mean(&times),
            }
        })
        .collect()
}

/// Picks `k` instance names around the runtime median of a record set.
/// Useful for selecting representative instances for longer experiments.
pub fn median_instances(records: &[SolveRecord], k: usize) -> Vec<String> {
    if records.is_empty() || k == 0 {
        return Vec::new();
    }
    let mut sorted: Vec<&SolveRecord> = records.iter().collect();
    sorted.sort_by_key(|r| OrderedFloat(r.time));

    let k = k.min(sorted.len());
    let mid = sorted.len() / 2;
    let lo = mid.saturating_sub(k.div_ceil(2));
    sorted[lo..(lo + k).min(sorted.len())]
        .iter()
        .map(|r| r.instance.clone())
        .collect()
}

/// Renders summaries as an aligned text table.
pub fn render_summary_table(summaries: &[ConfigSummary]) -> String {
    let mut table = String::new();
    table.push_str(&format!(
        "{:<25} {:>5} {:>5} {:>5} {:>10} {:>10}\n",
        "Params", "opt", "lim", "no", "gap", "t"
    ));
    table.push_str(&"-".repeat(65));
    table.push('\n');
    for s in summaries {
        table.push_str(&format!(
            "{:<25} {:>5} {:>5} {:>5} {:>10.4} {:>10.2}\n",
            s.params, s.opt, s.lim, s.no, s.mean_gap, s.mean_time
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(instance: &str, status: &str, objective: f64, gap: f64, time: f64) -> SolveRecord {
        SolveRecord {
            instance: instance.to_string(),
            status: status.to_string(),
            objective,
            gap,
            time,
            model: "Lyu".to_string(),
        }
    }

    #[test]
    fn test_params_of() {
        assert_eq!(params_of("PDPT-R5-K2-T1-Q100-6.txt"), "PDPT-R5-K2-T1-Q100");
        assert_eq!(params_of("PDPT-R5-K2-T1-Q100-6"), "PDPT-R5-K2-T1-Q100");
        assert_eq!(params_of("5R-2K-1T-8L-3"), "5R-2K-1T-8L");
    }

    #[test]
    fn test_summarize_classification() {
        let records = vec![
            record("PDPT-R5-K2-T1-Q100-0", "OPTIMAL", 100.0, 0.0, 12.0),
            record("PDPT-R5-K2-T1-Q100-1", "OPTIMAL", 90.0, 0.0, 18.0),
            record("PDPT-R5-K2-T1-Q100-2", "TIME_LIMIT", 120.0, 0.25, 3600.0),
            record("PDPT-R5-K2-T1-Q100-3", "TIME_LIMIT", f64::INFINITY, f64::INFINITY, 3600.0),
            record("PDPT-R7-K2-T1-Q100-0", "OPTIMAL", 150.0, 0.0, 40.0),
        ];

        let summaries = summarize(&records, Some("Lyu"));
        assert_eq!(summaries.len(), 2);

        let first = &summaries[0];
        assert_eq!(first.params, "PDPT-R5-K2-T1-Q100");
        assert_eq!(first.opt, 2);
        assert_eq!(first.lim, 1);
        assert_eq!(first.no, 1);
        assert!((first.mean_gap - 0.25).abs() < 1e-10);
        assert!((first.mean_time - 15.0).abs() < 1e-10);

        assert_eq!(summaries[1].opt, 1);
    }

    #[test]
    fn test_summarize_filters_by_model() {
        let mut other = record("PDPT-R5-K2-T1-Q100-0", "OPTIMAL", 100.0, 0.0, 12.0);
        other.model = "Rais".to_string();
        let records =
            vec![other, record("PDPT-R5-K2-T1-Q100-1", "OPTIMAL", 90.0, 0.0, 18.0)];

        let summaries = summarize(&records, Some("Rais"));
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].opt, 1);
    }

    #[test]
    fn test_median_instances() {
        let records: Vec<SolveRecord> = (0..10)
            .map(|i| {
                record(&format!("PDPT-R5-K2-T1-Q100-{}", i), "OPTIMAL", 100.0, 0.0, i as f64)
            })
            .collect();

        let picked = median_instances(&records, 2);
        assert_eq!(picked.len(), 2);
        // runtimes 4 and 5 sit around the median
        assert!(picked.contains(&"PDPT-R5-K2-T1-Q100-4".to_string()));
        assert!(picked.contains(&"PDPT-R5-K2-T1-Q100-5".to_string()));
    }

    #[test]
    fn test_log_and_read_round_trip() {
        let dir = std::env::temp_dir().join(format!("pdpt-report-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let first = record("PDPT-R5-K2-T1-Q100-0", "OPTIMAL", 100.0, 0.0, 12.0);
        let second = record("PDPT-R5-K2-T1-Q100-1", "TIME_LIMIT", 120.0, 0.3, 3600.0);
        let path = log_result(&dir, "pdpt", &first).unwrap();
        log_result(&dir, "pdpt", &second).unwrap();

        assert_eq!(path.file_name().unwrap(), "PDPT.csv");
        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].instance, first.instance);
        assert_eq!(records[1].status, "TIME_LIMIT");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
