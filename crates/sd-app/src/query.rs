//! Value extraction for plotting and reports.

use std::path::{Path, PathBuf};

use sd_core::SimId;
use sd_index::Simdex;
use sd_record::{Decoder, RecordError, Simulation};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// One file's series of a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub id: SimId,
    pub path: PathBuf,
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

/// Values of a name across an index.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    /// The parameter's value row, entry 0 belonging to the placeholder
    /// column.
    Parameter(Vec<f64>),
    /// One trace per file that has the variable.
    Variable(Vec<Trace>),
}

/// Row of a file listing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRow {
    pub id: SimId,
    pub path: PathBuf,
}

/// Row of a parameter report; `value` is `None` when the file lacks the
/// parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRow {
    pub id: SimId,
    pub value: Option<f64>,
    pub path: PathBuf,
}

/// Values of parameter or variable `name`.
///
/// Parameters come straight from the index. Variable series are not kept in
/// the index, so every file holding the variable is decoded again.
pub fn get_values(
    index: &Simdex,
    name: &str,
    decoder: &dyn Decoder,
    time_coordinate: Option<&str>,
) -> AppResult<Values> {
    if index.has_parameter(name) {
        return Ok(Values::Parameter(index.get_parameter(name)?));
    }
    if !index.has_variable(name) {
        return Err(AppError::NotFound(format!(
            "'{}' is neither a parameter nor a variable of the index",
            name
        )));
    }

    let mut traces = Vec::new();
    for id in index.files_with_variable(name)? {
        let path = index.path(id)?;
        traces.push(extract_trace(id, path, name, decoder, time_coordinate)?);
    }
    debug!(variable = name, traces = traces.len(), "series extracted");
    Ok(Values::Variable(traces))
}

fn extract_trace(
    id: SimId,
    path: &Path,
    name: &str,
    decoder: &dyn Decoder,
    time_coordinate: Option<&str>,
) -> AppResult<Trace> {
    let simulation = Simulation::open(path, decoder)?;
    let time = simulation.time(time_coordinate)?;
    let values = simulation
        .get_value(name)?
        .into_series()
        .ok_or_else(|| RecordError::Malformed {
            what: format!("'{}' is not a variable in {}", name, path.display()),
        })?;
    if values.len() != time.len() {
        warn!(
            path = %path.display(),
            variable = name,
            "series has {} samples, time has {}",
            values.len(),
            time.len()
        );
    }
    Ok(Trace {
        id,
        path: path.to_path_buf(),
        time,
        values,
    })
}

/// Every file of the index.
pub fn list_files(index: &Simdex) -> Vec<FileRow> {
    index
        .files_listing()
        .into_iter()
        .map(|(id, path)| FileRow {
            id,
            path: path.to_path_buf(),
        })
        .collect()
}

/// Every file with its value of parameter `name`.
pub fn parameter_report(index: &Simdex, name: &str) -> AppResult<Vec<ParameterRow>> {
    Ok(index
        .parameter_listing(name)?
        .into_iter()
        .map(|(id, value, path)| ParameterRow {
            id,
            value,
            path: path.to_path_buf(),
        })
        .collect())
}

/// Traces as CSV: `sim_id,path,time_s,value`, one line per sample.
pub fn traces_to_csv(traces: &[Trace]) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["sim_id", "path", "time_s", "value"])?;
    for trace in traces {
        let id = trace.id.to_string();
        let path = trace.path.display().to_string();
        for (t, v) in trace.time.iter().zip(&trace.values) {
            writer.write_record([id.clone(), path.clone(), t.to_string(), v.to_string()])?;
        }
    }
    finish_csv(writer)
}

/// Parameter report as CSV: `sim_id,path,value`, files lacking the parameter
/// left out.
pub fn parameter_report_to_csv(rows: &[ParameterRow]) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["sim_id", "path", "value"])?;
    for row in rows {
        if let Some(value) = row.value {
            writer.write_record([
                row.id.to_string(),
                row.path.display().to_string(),
                value.to_string(),
            ])?;
        }
    }
    finish_csv(writer)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> AppResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Csv(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::Csv(e.to_string()))
}
