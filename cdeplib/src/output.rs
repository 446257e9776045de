//! Output formatting: turn scan results into bytes.
//!
//! Everything here is pure presentation. Paths are written exactly as they
//! were scanned, so the output is bytes rather than text. Rendering happens
//! only after a whole scan succeeded, so a failed run prints nothing.

use crate::options::{ObjectName, OutputFormat, OutputOptions, StatsField, StatsFields};
use crate::path::{split_file, DepPath};
use crate::scan::{FileDeps, ScanResult};
use crate::score::DepStats;
use crate::Result;

/// Object file name used on the left side of make rules for `file`.
pub fn object_name(file: &DepPath, options: &OutputOptions) -> DepPath {
    let object = match &options.object {
        ObjectName::Source => file.clone(),
        ObjectName::File(name) => DepPath::from(name),
        ObjectName::Dir(prefix) => {
            let name = split_file(file.as_bytes());
            let stem = name
                .iter()
                .rposition(|&b| b == b'.')
                .map_or(name, |dot| &name[..dot]);
            let mut object = prefix.as_bytes().to_vec();
            object.extend_from_slice(stem);
            object.extend_from_slice(b".o");
            DepPath::new(object)
        }
    };

    if options.strip_path {
        DepPath::from(split_file(object.as_bytes()))
    } else {
        object
    }
}

fn rule(out: &mut Vec<u8>, target: &DepPath, prerequisite: Option<&DepPath>) {
    out.extend_from_slice(target.as_bytes());
    out.push(b':');
    if let Some(prerequisite) = prerequisite {
        out.push(b' ');
        out.extend_from_slice(prerequisite.as_bytes());
    }
    out.push(b'\n');
}

/// Make rules for one root.
///
/// With `empty_rules`, each dependency first gets a rule with no
/// prerequisites so make does not fail when a stale dependency file names a
/// header that no longer exists.
pub fn render_make(entry: &FileDeps, options: &OutputOptions, empty_rules: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let object = object_name(&entry.file, options);

    if empty_rules {
        for dep in &entry.deps {
            rule(&mut out, dep, None);
        }
    }
    if object != entry.file {
        rule(&mut out, &object, Some(&entry.file));
    }
    for dep in &entry.deps {
        rule(&mut out, &object, Some(dep));
    }
    out
}

/// Dependencies of one root, one per line.
pub fn render_list(entry: &FileDeps) -> Vec<u8> {
    let mut out = Vec::new();
    for dep in &entry.deps {
        out.extend_from_slice(dep.as_bytes());
        out.push(b'\n');
    }
    out
}

/// One statistics line.
pub fn render_stats(stats: &DepStats, fields: &StatsFields) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0; 4];
    let delimiter = fields.delimiter.encode_utf8(&mut buf).as_bytes();

    for (i, field) in fields.fields.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(delimiter);
        }
        let number = match field {
            StatsField::File => {
                out.extend_from_slice(stats.file.as_bytes());
                continue;
            }
            StatsField::Bytes => stats.own.bytes,
            StatsField::Lines => stats.own.lines,
            StatsField::Score => stats.own.code,
            StatsField::Count => stats.count,
            StatsField::TotalBytes => stats.total.bytes,
            StatsField::TotalLines => stats.total.lines,
            StatsField::TotalScore => stats.total.code,
        };
        out.extend_from_slice(number.to_string().as_bytes());
    }
    out.push(b'\n');
    out
}

/// Render a whole scan result in the configured format.
///
/// Statistics output scores the files it needs, so it can fail on read
/// errors.
pub fn render(result: &ScanResult, options: &OutputOptions) -> Result<Vec<u8>> {
    let out = match &options.format {
        OutputFormat::Make => result
            .files
            .iter()
            .flat_map(|entry| render_make(entry, options, false))
            .collect(),
        OutputFormat::MakePlus => result
            .files
            .iter()
            .flat_map(|entry| render_make(entry, options, true))
            .collect(),
        OutputFormat::List => result.files.iter().flat_map(render_list).collect(),
        OutputFormat::Stats(fields) => result
            .stats()?
            .iter()
            .flat_map(|stats| render_stats(stats, fields))
            .collect(),
        OutputFormat::Json => {
            let mut json = serde_json::to_vec_pretty(result)?;
            json.push(b'\n');
            json
        }
    };
    Ok(out)
}
