// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subcommand implementations.

use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use axum::Router;
use clap::ValueEnum;
use ifc_takeoff_core::IfcModel;
use ifc_takeoff_processing::{
    extract_from_path, list_properties, summarize, write_csv, ElementRecord, ModelSummary,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Output format of `extract`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtractFormat {
    Json,
    Csv,
}

/// Summarize a model and save the summary as `<data_dir>/<stem>.json`.
pub fn process_file(path: &Path, data_dir: &Path) -> Result<(ModelSummary, PathBuf)> {
    let model = IfcModel::open(path)
        .with_context(|| format!("Failed to open IFC model {}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded IFC model");

    let summary = summarize(&model)?;

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("model");
    let json_path = data_dir.join(format!("{}.json", stem));
    fs::write(&json_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    tracing::info!(
        path = %json_path.display(),
        elements = summary.building_elements.len(),
        property_sets = summary.properties.len(),
        "Saved model summary"
    );
    Ok((summary, json_path))
}

/// Most recently modified `*.json` in `data_dir`.
pub fn latest_summary(data_dir: &Path) -> Result<Option<PathBuf>> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;

    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        if latest.as_ref().map_or(true, |(t, _)| modified > *t) {
            latest = Some((modified, path));
        }
    }

    Ok(latest.map(|(_, path)| path))
}

fn try_available_properties(file: Option<&Path>, data_dir: &Path) -> Result<Vec<String>> {
    let summary = match file.filter(|f| f.exists()) {
        Some(file) => process_file(file, data_dir)?.0,
        None => {
            let Some(json_path) = latest_summary(data_dir)? else {
                return Ok(Vec::new());
            };
            tracing::debug!(path = %json_path.display(), "Reading saved summary");
            let content = fs::read_to_string(&json_path)?;
            serde_json::from_str(&content)?
        }
    };
    Ok(list_properties(&summary))
}

/// `Pset.Property` names of a model, or of the newest saved summary.
///
/// Any failure is logged and yields an empty list.
pub fn available_properties(file: Option<&Path>, data_dir: &Path) -> Vec<String> {
    try_available_properties(file, data_dir).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to list properties");
        Vec::new()
    })
}

/// Write records in the requested format.
pub fn write_records<W: Write>(
    mut writer: W,
    records: &[ElementRecord],
    format: ExtractFormat,
) -> Result<()> {
    match format {
        ExtractFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records)?;
            writeln!(writer)?;
        }
        ExtractFormat::Csv => write_csv(&mut writer, records)?,
    }
    writer.flush()?;
    Ok(())
}

/// Extract the takeoff of a model to a file or stdout.
pub fn extract(path: &Path, format: ExtractFormat, output: Option<&Path>) -> Result<()> {
    let records = extract_from_path(path)?;

    match output {
        Some(output) => {
            let file = fs::File::create(output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            write_records(std::io::BufWriter::new(file), &records, format)?;
            tracing::info!(path = %output.display(), rows = records.len(), "Wrote takeoff");
        }
        None => write_records(std::io::stdout().lock(), &records, format)?,
    }
    Ok(())
}

/// Serve a directory over HTTP until interrupted.
pub async fn serve(port: u16, dir: PathBuf) -> Result<()> {
    let app = Router::new()
        .fallback_service(ServeDir::new(&dir))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(dir = %dir.display(), "Serving on http://localhost:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../../rust/core/tests/fixtures/two_members.ifc");

    fn fixture(dir: &Path) -> PathBuf {
        let path = dir.join("two_members.ifc");
        fs::write(&path, FIXTURE).unwrap();
        path
    }

    #[test]
    fn test_process_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let (summary, json_path) = process_file(&fixture(dir.path()), &data_dir).unwrap();
        assert_eq!(json_path, data_dir.join("two_members.json"));
        assert_eq!(summary.project_info.name, "Sample Project");

        let saved = fs::read_to_string(&json_path).unwrap();
        assert!(saved.contains("SN490B"));
        assert!(saved.contains("重量"));
        assert!(saved.contains("\n  \"project_info\""));
    }

    #[test]
    fn test_properties_from_latest_summary() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let model = fixture(dir.path());

        let direct = available_properties(Some(&model), &data_dir);
        assert!(direct.contains(&"Pset_BeamCommon.ProfileSize".to_string()));

        let saved = available_properties(None, &data_dir);
        assert_eq!(saved, direct);

        let missing = available_properties(Some(&dir.path().join("nope.ifc")), &data_dir);
        assert_eq!(missing, direct);
    }

    #[test]
    fn test_properties_errors_give_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        assert!(available_properties(None, &dir.path().join("absent")).is_empty());
        assert!(available_properties(None, dir.path()).is_empty());

        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        assert!(available_properties(None, dir.path()).is_empty());
    }

    #[test]
    fn test_extract_csv_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");

        extract(&fixture(dir.path()), ExtractFormat::Csv, Some(&output)).unwrap();

        let csv = fs::read_to_string(&output).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "type,name,description,size,weight,length");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Beam,B-1,"));
        assert!(lines[2].starts_with("Column,C-1,"));
    }

    #[test]
    fn test_extract_json_records() {
        let records = vec![ElementRecord::undefined(ifc_takeoff_processing::MemberKind::Beam)];
        let mut out = Vec::new();
        write_records(&mut out, &records, ExtractFormat::Json).unwrap();

        let parsed: Vec<ElementRecord> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, records);
    }
}
