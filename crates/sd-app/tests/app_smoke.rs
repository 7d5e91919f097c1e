//! Integration tests for the service layer: build, persist, update, query.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sd_app::*;
use sd_record::{FileRecord, SignalInfo, ValueStore, write_record};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

/// Time 0, 1, 2 s; pressure `p` scaled by `gain`, which is also a parameter.
fn run(gain: f64, with_flow: bool) -> FileRecord {
    let mut record = FileRecord {
        names: vec!["Time".to_string(), "gain".to_string(), "p".to_string()],
        signals: vec![
            SignalInfo::abscissa(1),
            SignalInfo::parameter(1),
            SignalInfo::timeseries(2),
        ],
        parameter_store: ValueStore::new(vec![vec![gain, gain]]),
        timeseries_store: ValueStore::new(vec![
            vec![0.0, 1.0, 2.0, 2.0],
            vec![gain, 2.0 * gain, 3.0 * gain, 3.0 * gain],
        ]),
    };
    if with_flow {
        record.names.push("m_dot".to_string());
        record.signals.push(SignalInfo::timeseries(2).negated());
    }
    record
}

fn write(dir: &Path, name: &str, record: &FileRecord) {
    write_record(&dir.join(name), record).expect("failed to write record");
}

#[test]
fn build_save_load_and_summarize() {
    let dir = unique_temp_dir("sd_app_build");
    write(&dir, "a.json", &run(1.0, false));
    write(&dir, "b.json", &run(2.0, true));

    let dirs = vec![dir.clone()];
    let mut events = Vec::new();
    let index = build_index(
        &IndexRequest::new(&dirs),
        Some(&mut |event: &ScanProgressEvent| events.push(event.stage.clone())),
    )
    .expect("index should build");
    assert_eq!(index.file_count(), 2);
    assert!(events.iter().any(|s| matches!(s, ScanStage::Indexed(_))));
    assert!(matches!(events.last(), Some(ScanStage::Completed)));

    let filtered = index.filter(&Filter::new().exact("gain", 2.0));
    let path = dir.join("filtered.simdex");
    save_index(&path, &filtered).unwrap();
    let loaded = load_index(&path).unwrap();
    assert_eq!(loaded, filtered);

    let summary = summarize(&loaded);
    assert_eq!(summary.file_count, 1);
    assert_eq!(summary.parameter_count, 1);
    assert_eq!(summary.variable_count, 3);
    assert_eq!(summary.filters, vec![("gain".to_string(), "2".to_string())]);
}

#[test]
fn build_requires_a_directory() {
    let dirs: Vec<PathBuf> = Vec::new();
    assert!(matches!(
        build_index(&IndexRequest::new(&dirs), None),
        Err(AppError::InvalidInput(_))
    ));
}

#[test]
fn update_picks_up_new_files() {
    let dir = unique_temp_dir("sd_app_update");
    write(&dir, "a.json", &run(1.0, false));
    let dirs = vec![dir.clone()];
    let base = build_index(&IndexRequest::new(&dirs), None).unwrap();

    write(&dir, "b.json", &run(3.0, true));
    let updated = update_index(&base, &IndexRequest::new(&dirs), None).unwrap();
    assert_eq!(base.file_count(), 1);
    assert_eq!(updated.file_count(), 2);
    assert_eq!(updated.variables().len(), 3);
}

#[test]
fn values_of_parameters_and_variables() {
    let dir = unique_temp_dir("sd_app_values");
    write(&dir, "a.json", &run(1.0, false));
    write(&dir, "b.json", &run(2.0, true));
    let dirs = vec![dir.clone()];
    let index = build_index(&IndexRequest::new(&dirs), None).unwrap();

    assert_eq!(
        get_values(&index, "gain", &JsonDecoder, None).unwrap(),
        Values::Parameter(vec![0.0, 1.0, 2.0])
    );

    let Values::Variable(traces) = get_values(&index, "m_dot", &JsonDecoder, None).unwrap() else {
        panic!("m_dot should be a variable");
    };
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].id.column(), 2);
    assert_eq!(traces[0].time, vec![0.0, 1.0, 2.0]);
    assert_eq!(traces[0].values, vec![-2.0, -4.0, -6.0]);

    let Values::Variable(traces) = get_values(&index, "p", &JsonDecoder, None).unwrap() else {
        panic!("p should be a variable");
    };
    assert_eq!(traces.len(), 2);
    let csv = traces_to_csv(&traces).unwrap();
    assert!(csv.starts_with("sim_id,path,time_s,value\n"));
    assert_eq!(csv.lines().count(), 7);

    assert!(matches!(
        get_values(&index, "nope", &JsonDecoder, None),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn csv_quotes_paths_with_commas() {
    let dir = unique_temp_dir("sd_app_csv").join("runs,batch \"2\"");
    fs::create_dir_all(&dir).unwrap();
    write(&dir, "case,a.json", &run(1.5, false));
    let dirs = vec![dir.clone()];
    let index = build_index(&IndexRequest::new(&dirs), None).unwrap();

    let Values::Variable(traces) = get_values(&index, "p", &JsonDecoder, None).unwrap() else {
        panic!("p should be a variable");
    };
    let text = traces_to_csv(&traces).unwrap();
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.len(), 4);
        assert_eq!(&row[0], "1");
        assert!(row[1].ends_with("runs,batch \"2\"/case,a.json"));
    }
    assert_eq!(&rows[2][2], "2");
    assert_eq!(&rows[2][3], "4.5");

    let report = parameter_report(&index, "gain").unwrap();
    let text = parameter_report_to_csv(&report).unwrap();
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers: Vec<&str> = reader.headers().unwrap().iter().collect();
    assert_eq!(headers, vec!["sim_id", "path", "value"]);
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0][1].ends_with("case,a.json"));
    assert_eq!(&rows[0][2], "1.5");
}

#[test]
fn reports() {
    let dir = unique_temp_dir("sd_app_reports");
    write(&dir, "a.json", &run(1.0, false));
    write(&dir, "b.json", &run(2.0, true));
    let dirs = vec![dir.clone()];
    let index = build_index(&IndexRequest::new(&dirs), None).unwrap();

    let files = list_files(&index);
    assert_eq!(files.len(), 2);
    assert!(files[0].path.ends_with("a.json"));

    let rows = parameter_report(&index, "gain").unwrap();
    assert_eq!(rows.iter().map(|r| r.value).collect::<Vec<_>>(), vec![Some(1.0), Some(2.0)]);
    assert!(matches!(
        parameter_report(&index, "nope"),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn options_from_yaml() {
    let dir = unique_temp_dir("sd_app_config");
    let path = dir.join("scan.yaml");
    fs::write(&path, "extension: mat\nrecursive: true\n").unwrap();

    let options = load_options(&path).unwrap();
    assert_eq!(options.extension, "mat");
    assert!(options.recursive);
    assert!(options.parallel_decode);
    assert_eq!(options.time_coordinate, None);

    let copy = dir.join("copy.yaml");
    save_options(&copy, &options).unwrap();
    assert_eq!(load_options(&copy).unwrap(), options);

    fs::write(&path, "extension: ''\n").unwrap();
    assert!(matches!(load_options(&path), Err(AppError::Config(_))));
    assert!(matches!(
        load_options(&dir.join("missing.yaml")),
        Err(AppError::ConfigFileRead { .. })
    ));
}
