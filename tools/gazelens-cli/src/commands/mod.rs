pub mod aoi;
pub mod detect;
pub mod info;

use std::path::{Path, PathBuf};

use gazelens_common::error::GazelensError;
use gazelens_gaze_model::sample::{read_records, SampleRecord};

/// Read every complete record from a sample file.
pub fn load_records(path: &Path) -> anyhow::Result<Vec<SampleRecord>> {
    if !path.exists() {
        return Err(GazelensError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    let file = std::fs::File::open(path)?;
    let records = read_records(std::io::BufReader::new(file))?;
    tracing::debug!(path = %path.display(), records = records.len(), "Loaded sample records");
    Ok(records)
}

/// Write pretty JSON to a file, or to stdout when no path is given.
pub fn write_json<T: serde::Serialize>(value: &T, output: Option<&PathBuf>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
