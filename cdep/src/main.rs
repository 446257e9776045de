//! # cdep
//!
//! Conservative include dependency generator for C and C++ sources.
//!
//! ## Overview
//!
//! cdep is built on top of cdeplib. It scans source files for `#include`
//! directives without preprocessing them, resolves each reference against
//! the including file's directory and a search path, and prints the
//! transitive closure as make rules, a plain list, size statistics, or JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Make rules (with empty rules for each header) for one source
//! cdep -Iinclude src/main.c
//!
//! # Plain make rules, objects placed under build/
//! cdep -M -o build/ src/main.c
//!
//! # Direct includes only, one per line
//! cdep -1 -n src/main.c
//!
//! # Statistics for every source under src/, comma separated
//! cdep -S,FnS src
//!
//! # Print which of the listed paths exist as files
//! cdep --existing-from candidates.txt
//!
//! # Read roots and -I lines from a file, report unresolved includes
//! cdep -w -f sources.txt
//! ```

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use cdeplib::{
    existing_files, expand_roots, read_include_dirs, read_path_list, read_source_list, render,
    scan_files, DepPath, Diagnostic, FilterConfig, ObjectName, OutputFormat, OutputOptions,
    ScanDepth, ScanOptions, StatsFields,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use console::Style;

const FORMAT_ARGS: [&str; 5] = ["make", "make-plus", "list", "stats", "json"];

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("cdep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Conservative C/C++ include dependency generator")
        .after_help(
            "Default output mode is --make-plus. \
             The stats fields may be attached to -S, as in -S,FnS.",
        )
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .action(ArgAction::Append)
                .value_parser(value_parser!(OsString))
                .help("Source files to scan; directories are searched for sources"),
        )
        .arg(
            Arg::new("include-dir")
                .short('I')
                .long("include-dir")
                .value_name("DIR")
                .action(ArgAction::Append)
                .value_parser(value_parser!(OsString))
                .help("Add DIR to the include search path"),
        )
        .arg(
            Arg::new("files-from")
                .short('f')
                .long("files-from")
                .value_name("FILE")
                .action(ArgAction::Append)
                .value_parser(value_parser!(OsString))
                .help("Read file names or -I<dir> lines from FILE"),
        )
        .arg(
            Arg::new("include-dirs-from")
                .short('i')
                .long("include-dirs-from")
                .value_name("FILE")
                .action(ArgAction::Append)
                .value_parser(value_parser!(OsString))
                .help("Read include directories from FILE, one per line"),
        )
        .arg(
            Arg::new("object")
                .short('o')
                .long("object")
                .value_name("OBJ")
                .help("Object name for the left side of make rules (trailing '/' means a directory)"),
        )
        .arg(
            Arg::new("make")
                .short('M')
                .long("make")
                .action(ArgAction::SetTrue)
                .overrides_with_all(others(&FORMAT_ARGS, "make"))
                .help("Output dependency lines in make format"),
        )
        .arg(
            Arg::new("make-plus")
                .long("make-plus")
                .action(ArgAction::SetTrue)
                .overrides_with_all(others(&FORMAT_ARGS, "make-plus"))
                .help("Like --make, plus an empty rule for each included file"),
        )
        .arg(
            Arg::new("list")
                .short('1')
                .long("list")
                .action(ArgAction::SetTrue)
                .overrides_with_all(others(&FORMAT_ARGS, "list"))
                .help("Output a simple list of included files"),
        )
        .arg(
            Arg::new("stats")
                .short('S')
                .long("stats")
                .value_name("FIELDS")
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("")
                .overrides_with_all(others(&FORMAT_ARGS, "stats"))
                .help(
                    "Output statistics: optional separator then field letters \
                     F B L S n b l s (default FBLnbls)",
                ),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .overrides_with_all(others(&FORMAT_ARGS, "json"))
                .help("Output results as JSON"),
        )
        .arg(
            Arg::new("warn")
                .short('w')
                .long("warn")
                .action(ArgAction::SetTrue)
                .help("Report unresolved and computed includes"),
        )
        .arg(
            Arg::new("no-recurse")
                .short('n')
                .long("no-recurse")
                .action(ArgAction::SetTrue)
                .overrides_with("no-resolve")
                .help("Do not recurse into included files"),
        )
        .arg(
            Arg::new("no-resolve")
                .long("no-resolve")
                .action(ArgAction::SetTrue)
                .overrides_with("no-recurse")
                .help("Print include directives without resolving them"),
        )
        .arg(
            Arg::new("existing")
                .long("existing")
                .value_name("PATH")
                .action(ArgAction::Append)
                .value_parser(value_parser!(OsString))
                .help("Print PATH if it names an existing file"),
        )
        .arg(
            Arg::new("existing-from")
                .long("existing-from")
                .value_name("FILE")
                .action(ArgAction::Append)
                .value_parser(value_parser!(OsString))
                .help("Print the paths listed in FILE that name existing files"),
        )
        .arg(
            Arg::new("strip-path")
                .short('s')
                .long("strip-path")
                .action(ArgAction::SetTrue)
                .help("Strip the directory from object names"),
        )
        .arg(
            Arg::new("match")
                .long("match")
                .value_name("GLOB")
                .action(ArgAction::Append)
                .help("Only scan discovered sources matching the glob pattern"),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .value_name("GLOB")
                .action(ArgAction::Append)
                .help("Skip discovered sources matching the glob pattern"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log cache and filesystem activity"),
        )
}

fn others(ids: &[&'static str], id: &str) -> Vec<&'static str> {
    ids.iter().copied().filter(|other| *other != id).collect()
}

/// Rewrite `-S<fields>` to `--stats=<fields>`.
///
/// clap only takes an optional short value after `=`, but the fields are
/// usually written attached to `-S`. Arguments after `--` are left alone.
fn expand_attached_stats<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut done = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if done {
                return arg;
            }
            if arg == "--" {
                done = true;
                return arg;
            }
            match arg.to_str().and_then(|text| text.strip_prefix("-S")) {
                Some(fields) if !fields.is_empty() && !fields.starts_with('=') => {
                    OsString::from(format!("--stats={fields}"))
                }
                _ => arg,
            }
        })
        .collect()
}

/// Values of an argument paired with their command-line positions
fn indexed_values<'a, T>(matches: &'a ArgMatches, id: &str) -> Vec<(usize, &'a T)>
where
    T: Clone + Send + Sync + 'static,
{
    match (matches.get_many::<T>(id), matches.indices_of(id)) {
        (Some(values), Some(indices)) => indices.zip(values).collect(),
        _ => Vec::new(),
    }
}

/// Build filter config from matches
fn build_filter(matches: &ArgMatches) -> Result<FilterConfig, anyhow::Error> {
    let mut filter = FilterConfig::new();

    if let Some(includes) = matches.get_many::<String>("match") {
        for pattern in includes {
            filter = filter.include(pattern)?;
        }
    }

    if let Some(excludes) = matches.get_many::<String>("exclude") {
        for pattern in excludes {
            filter = filter.exclude(pattern)?;
        }
    }

    Ok(filter)
}

/// Roots and search directories in command-line order.
struct Inputs {
    roots: Vec<DepPath>,
    include_dirs: Vec<DepPath>,
}

fn collect_inputs(matches: &ArgMatches) -> Result<Inputs, anyhow::Error> {
    let mut roots: Vec<(usize, Vec<DepPath>)> = Vec::new();
    let mut dirs: Vec<(usize, Vec<DepPath>)> = Vec::new();

    for (index, file) in indexed_values::<OsString>(matches, "files") {
        roots.push((index, vec![DepPath::from(file.as_os_str())]));
    }
    for (index, dir) in indexed_values::<OsString>(matches, "include-dir") {
        dirs.push((index, vec![DepPath::from(dir.as_os_str())]));
    }
    for (index, path) in indexed_values::<OsString>(matches, "files-from") {
        let list = read_source_list(path)?;
        roots.push((index, list.files));
        dirs.push((index, list.include_dirs));
    }
    for (index, path) in indexed_values::<OsString>(matches, "include-dirs-from") {
        dirs.push((index, read_include_dirs(path)?));
    }

    roots.sort_by_key(|(index, _)| *index);
    dirs.sort_by_key(|(index, _)| *index);

    let filter = build_filter(matches)?;
    let roots = expand_roots(roots.into_iter().flat_map(|(_, files)| files), &filter)?;

    Ok(Inputs {
        roots,
        include_dirs: dirs.into_iter().flat_map(|(_, dirs)| dirs).collect(),
    })
}

/// Paths from `--existing` and `--existing-from` that name files, in
/// command-line order.
fn existing_paths(matches: &ArgMatches) -> Result<Vec<DepPath>, anyhow::Error> {
    let mut candidates: Vec<(usize, Vec<DepPath>)> = Vec::new();
    for (index, path) in indexed_values::<OsString>(matches, "existing") {
        candidates.push((index, vec![DepPath::from(path.as_os_str())]));
    }
    for (index, path) in indexed_values::<OsString>(matches, "existing-from") {
        candidates.push((index, read_path_list(path)?));
    }
    candidates.sort_by_key(|(index, _)| *index);
    Ok(existing_files(candidates.into_iter().flat_map(|(_, paths)| paths)))
}

fn scan_depth(matches: &ArgMatches) -> ScanDepth {
    if matches.get_flag("no-resolve") {
        ScanDepth::Unresolved
    } else if matches.get_flag("no-recurse") {
        ScanDepth::Immediate
    } else {
        ScanDepth::Full
    }
}

fn output_format(matches: &ArgMatches) -> OutputFormat {
    if matches.get_flag("json") {
        OutputFormat::Json
    } else if let Some(fields) = matches.get_one::<String>("stats") {
        OutputFormat::Stats(fields.parse().unwrap_or_else(|e| match e {}))
    } else if matches.get_flag("list") {
        OutputFormat::List
    } else if matches.get_flag("make") {
        OutputFormat::Make
    } else {
        OutputFormat::MakePlus
    }
}

fn output_options(matches: &ArgMatches) -> OutputOptions {
    let object = matches
        .get_one::<String>("object")
        .map(|obj| ObjectName::parse(obj))
        .unwrap_or_default();

    OutputOptions::new()
        .format(output_format(matches))
        .object(object)
        .strip_path(matches.get_flag("strip-path"))
}

fn warn_style() -> Style {
    Style::new().yellow().for_stderr()
}

fn report_unknown_fields(fields: &StatsFields) {
    for c in &fields.unknown {
        eprintln!(
            "{}",
            warn_style().apply_to(format!("cdep: unknown stats field '{c}' ignored"))
        );
    }
}

fn report(diagnostic: &Diagnostic) {
    eprintln!("{}", warn_style().apply_to(diagnostic));
}

fn run(matches: &ArgMatches) -> Result<(), anyhow::Error> {
    let existing = existing_paths(matches)?;
    let inputs = collect_inputs(matches)?;
    let scan_options = ScanOptions::new()
        .include_dirs(inputs.include_dirs)
        .depth(scan_depth(matches))
        .warn(matches.get_flag("warn"));
    let output = output_options(matches);

    if let OutputFormat::Stats(fields) = &output.format {
        report_unknown_fields(fields);
    }

    let result = scan_files(&inputs.roots, scan_options)?;
    log::debug!(
        "scanned {} roots: {} files read, {} file checks, {} search cache hits",
        result.files.len(),
        result.counters.scans,
        result.counters.file_checks,
        result.counters.search_hits
    );

    let rendered = render(&result, &output)?;
    for diagnostic in &result.diagnostics {
        report(diagnostic);
    }

    let mut stdout = io::stdout().lock();
    for path in &existing {
        stdout.write_all(path.as_bytes())?;
        stdout.write_all(b"\n")?;
    }
    stdout.write_all(&rendered)?;
    stdout.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    if std::env::args_os().len() <= 1 {
        eprintln!("cdep: nothing to do; try --help");
        return ExitCode::SUCCESS;
    }

    let matches = build_command().get_matches_from(expand_attached_stats(std::env::args_os()));

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if matches.get_flag("verbose") {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
