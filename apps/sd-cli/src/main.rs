use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use sd_app::{
    AppResult, Filter, FilterValue, IndexRequest, JsonDecoder, NameKind, ScanOptions,
    ScanProgressEvent, ScanStage, SimId, Simdex, SkipReason, TimeWindow, Values, config,
    index_service, query,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simdex")]
#[command(about = "Simdex - index and select simulation result files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// YAML file with scan options
    #[arg(long)]
    config: Option<PathBuf>,
    /// Descend into sub-directories
    #[arg(short, long)]
    recursive: bool,
    /// Extension of result files
    #[arg(long)]
    extension: Option<String>,
    /// Name of the time signal
    #[arg(long)]
    time: Option<String>,
    /// Decode files one at a time
    #[arg(long)]
    sequential: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from directories of result files
    Index {
        /// Directories to scan
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
        /// Index file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Ask before accepting the reference file's time window
        #[arg(long)]
        confirm: bool,
        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Show an index and its files
    List {
        /// Index file
        index: PathBuf,
    },
    /// Search parameter and variable names
    Exist {
        /// Index file
        index: PathBuf,
        /// Case-insensitive regular expression
        pattern: String,
        #[arg(long, value_enum, default_value_t = KindArg::Both)]
        kind: KindArg,
    },
    /// Show the value of a parameter in every file
    Param {
        /// Index file
        index: PathBuf,
        /// Parameter name
        name: String,
    },
    /// Find file ids by path
    Simid {
        /// Index file
        index: PathBuf,
        /// Case-insensitive regular expression
        pattern: String,
    },
    /// Keep the files whose parameters match
    Filter {
        /// Index file
        index: PathBuf,
        /// NAME=VALUE, or NAME=* for "any value"
        #[arg(short, long = "param", required = true, value_parser = parse_filter)]
        params: Vec<(String, FilterValue)>,
        /// Index file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Keep the files with the same parameter set as one file
    Identical {
        /// Index file
        index: PathBuf,
        /// Reference file id
        id: SimId,
        /// Index file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Drop one file from an index
    Remove {
        /// Index file
        index: PathBuf,
        /// File id
        id: SimId,
        /// Index file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Add new files of directories to an index, over its time window
    Update {
        /// Index file
        index: PathBuf,
        /// Directories to scan
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
        /// Index file to write (defaults to the input index)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Export the values of a parameter or variable
    Series {
        /// Index file
        index: PathBuf,
        /// Parameter or variable name
        name: String,
        /// Name of the time signal
        #[arg(long)]
        time: Option<String>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Parameters,
    Variables,
    Both,
}

impl From<KindArg> for NameKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Parameters => NameKind::Parameters,
            KindArg::Variables => NameKind::Variables,
            KindArg::Both => NameKind::Both,
        }
    }
}

fn parse_filter(arg: &str) -> Result<(String, FilterValue), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE or NAME=*, got '{}'", arg))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", arg));
    }
    let value = value
        .trim()
        .parse::<FilterValue>()
        .map_err(|e| format!("invalid value in '{}': {}", arg, e))?;
    Ok((name.to_string(), value))
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index {
            dirs,
            output,
            confirm,
            scan,
        } => cmd_index(&dirs, &output, confirm, &scan),
        Commands::List { index } => cmd_list(&index),
        Commands::Exist {
            index,
            pattern,
            kind,
        } => cmd_exist(&index, &pattern, kind.into()),
        Commands::Param { index, name } => cmd_param(&index, &name),
        Commands::Simid { index, pattern } => cmd_simid(&index, &pattern),
        Commands::Filter {
            index,
            params,
            output,
        } => cmd_filter(&index, params, &output),
        Commands::Identical { index, id, output } => {
            select_and_save(&index, &output, |simdex| Ok(simdex.get_identical(id)?))
        }
        Commands::Remove { index, id, output } => {
            select_and_save(&index, &output, |simdex| Ok(simdex.remove(id)?))
        }
        Commands::Update {
            index,
            dirs,
            output,
            scan,
        } => cmd_update(&index, &dirs, output.as_deref(), &scan),
        Commands::Series {
            index,
            name,
            time,
            output,
        } => cmd_series(&index, &name, time.as_deref(), output.as_deref()),
    }
}

fn scan_options(scan: &ScanArgs) -> AppResult<ScanOptions> {
    let mut options = match &scan.config {
        Some(path) => config::load_options(path)?,
        None => ScanOptions::default(),
    };
    if scan.recursive {
        options.recursive = true;
    }
    if let Some(extension) = &scan.extension {
        options.extension = extension.clone();
    }
    if let Some(time) = &scan.time {
        options.time_coordinate = Some(time.clone());
    }
    if scan.sequential {
        options.parallel_decode = false;
    }
    Ok(options)
}

fn ask_window(path: &Path, window: TimeWindow) -> bool {
    ProgressRenderer::clear_line();
    print!(
        "Reference file {} runs from {}. Index files over this window? [y/N] ",
        path.display(),
        window
    );
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn cmd_index(dirs: &[PathBuf], output: &Path, confirm: bool, scan: &ScanArgs) -> AppResult<()> {
    let mut request = IndexRequest::new(dirs);
    request.options = scan_options(scan)?;
    if confirm {
        request.policy = &ask_window;
    }

    let mut renderer = ProgressRenderer::new();
    let index = index_service::build_index(
        &request,
        Some(&mut |event: &ScanProgressEvent| renderer.render(event)),
    )?;
    renderer.finish();

    index_service::save_index(output, &index)?;
    println!(
        "✓ Indexed {} files ({} skipped) into {}",
        index.file_count(),
        renderer.skipped,
        output.display()
    );
    print_summary(&index);
    Ok(())
}

fn cmd_update(
    index_path: &Path,
    dirs: &[PathBuf],
    output: Option<&Path>,
    scan: &ScanArgs,
) -> AppResult<()> {
    let base = index_service::load_index(index_path)?;
    let mut request = IndexRequest::new(dirs);
    request.options = scan_options(scan)?;

    let mut renderer = ProgressRenderer::new();
    let index = index_service::update_index(
        &base,
        &request,
        Some(&mut |event: &ScanProgressEvent| renderer.render(event)),
    )?;
    renderer.finish();

    let output = output.unwrap_or(index_path);
    index_service::save_index(output, &index)?;
    println!(
        "✓ Added {} files ({} skipped) into {}",
        index.file_count() - base.file_count(),
        renderer.skipped,
        output.display()
    );
    Ok(())
}

fn cmd_list(index_path: &Path) -> AppResult<()> {
    let index = index_service::load_index(index_path)?;
    print_summary(&index);
    println!("\nFiles:");
    for row in query::list_files(&index) {
        println!("  {:>5}  {}", row.id, row.path.display());
    }
    Ok(())
}

fn cmd_exist(index_path: &Path, pattern: &str, kind: NameKind) -> AppResult<()> {
    let index = index_service::load_index(index_path)?;
    let matches = index.exist(pattern, kind)?;

    if matches!(kind, NameKind::Parameters | NameKind::Both) {
        println!("Parameters ({}):", matches.parameters.len());
        for name in &matches.parameters {
            println!("  {}", name);
        }
    }
    if matches!(kind, NameKind::Variables | NameKind::Both) {
        println!("Variables ({}):", matches.variables.len());
        for name in &matches.variables {
            println!("  {}", name);
        }
    }
    Ok(())
}

fn cmd_param(index_path: &Path, name: &str) -> AppResult<()> {
    let index = index_service::load_index(index_path)?;
    let rows = query::parameter_report(&index, name)?;

    println!("{}:", name);
    for row in rows {
        let value = row
            .value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:>5}  {:>14}  {}", row.id, value, row.path.display());
    }
    Ok(())
}

fn cmd_simid(index_path: &Path, pattern: &str) -> AppResult<()> {
    let index = index_service::load_index(index_path)?;
    let ids = index.get_simid(pattern)?;

    if ids.is_empty() {
        println!("No file matches '{}'", pattern);
    }
    for id in ids {
        println!("  {:>5}  {}", id, index.path(id)?.display());
    }
    Ok(())
}

fn cmd_filter(
    index_path: &Path,
    params: Vec<(String, FilterValue)>,
    output: &Path,
) -> AppResult<()> {
    let filter: Filter = params.into_iter().collect();
    select_and_save(index_path, output, |index| Ok(index.filter(&filter)))
}

fn select_and_save(
    index_path: &Path,
    output: &Path,
    select: impl FnOnce(&Simdex) -> AppResult<Simdex>,
) -> AppResult<()> {
    let index = index_service::load_index(index_path)?;
    let selected = select(&index)?;
    index_service::save_index(output, &selected)?;
    println!(
        "✓ Kept {} of {} files in {}",
        selected.file_count(),
        index.file_count(),
        output.display()
    );
    Ok(())
}

fn cmd_series(
    index_path: &Path,
    name: &str,
    time: Option<&str>,
    output: Option<&Path>,
) -> AppResult<()> {
    let index = index_service::load_index(index_path)?;

    let csv = match query::get_values(&index, name, &JsonDecoder, time)? {
        Values::Parameter(_) => {
            query::parameter_report_to_csv(&query::parameter_report(&index, name)?)?
        }
        Values::Variable(traces) => query::traces_to_csv(&traces)?,
    };

    if let Some(path) = output {
        std::fs::write(path, &csv)?;
        println!(
            "✓ Exported {} rows to {}",
            csv.lines().count().saturating_sub(1),
            path.display()
        );
    } else {
        print!("{}", csv);
    }
    Ok(())
}

fn print_summary(index: &Simdex) {
    let summary = index_service::summarize(index);
    println!("\nIndex summary:");
    println!("  Files: {}", summary.file_count);
    println!("  Time window: {}", summary.time_window);
    println!("  Parameters: {}", summary.parameter_count);
    println!("  Variables: {}", summary.variable_count);
    if !summary.filters.is_empty() {
        println!("  Filters:");
        for (name, value) in &summary.filters {
            println!("    {} = {}", name, value);
        }
    }
}

struct ProgressRenderer {
    started: Instant,
    last_emit: Instant,
    skipped: usize,
}

impl ProgressRenderer {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            last_emit: Instant::now(),
            skipped: 0,
        }
    }

    fn render(&mut self, event: &ScanProgressEvent) {
        let mut force = false;
        if let ScanStage::Skipped(reason) = &event.stage {
            if !matches!(reason, SkipReason::AlreadyIndexed) {
                self.skipped += 1;
            }
            force = true;
        }
        if !force
            && matches!(event.stage, ScanStage::Indexed(_))
            && self.last_emit.elapsed().as_millis() < 100
        {
            return;
        }

        let spinner = ['|', '/', '-', '\\'];
        let elapsed = self.started.elapsed().as_secs_f64();
        let spin_idx = ((elapsed * 10.0) as usize) % spinner.len();
        let mut line = format!("\r{} {}", spinner[spin_idx], event.stage.label());
        if event.total > 0 {
            line.push_str(&format!("  {}/{}", event.processed, event.total));
        }
        line.push_str(&format!("  elapsed={:.2}s", elapsed));
        if let Some(path) = &event.path {
            line.push_str(&format!("  {}", path.display()));
        }
        print!("{:<180}", line);
        let _ = io::stdout().flush();
        self.last_emit = Instant::now();
    }

    fn finish(&self) {
        Self::clear_line();
    }

    fn clear_line() {
        print!("\r{}\r", " ".repeat(180));
        let _ = io::stdout().flush();
    }
}
