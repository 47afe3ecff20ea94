//! Summarize a binary sample recording.

use std::path::PathBuf;

use gazelens_gaze_model::sample::samples_from_records;
use gazelens_gaze_model::settings::EyeSelection;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let records = super::load_records(&path)?;

    println!("Recording: {}", path.display());
    println!("  Records: {}", records.len());

    if records.is_empty() {
        println!("  No complete records.");
        return Ok(());
    }

    let samples = samples_from_records(&records, EyeSelection::Average);
    if let (Some(first), Some(last)) = (samples.first(), samples.last()) {
        let duration = last.time_sec - first.time_sec;
        println!("  Duration: {duration:.3}s");
        if duration > 0.0 {
            println!(
                "  Estimated rate: {:.1} Hz",
                (samples.len() - 1) as f64 / duration
            );
        }
    }
    let dropped = records.len() - samples.len();
    if dropped > 0 {
        println!("  Out-of-order timestamps dropped: {dropped}");
    }
    println!();

    println!("Validity:");
    for eye in [EyeSelection::Left, EyeSelection::Right, EyeSelection::Average] {
        let samples = samples_from_records(&records, eye);
        let valid = samples.iter().filter(|s| s.is_usable()).count();
        let closed = samples.iter().filter(|s| !s.eyelid_open_valid).count();
        let ratio = if samples.is_empty() {
            0.0
        } else {
            valid as f64 / samples.len() as f64 * 100.0
        };
        println!(
            "  {eye:?}: {valid}/{} valid ({ratio:.1}%), {closed} eyelid-closed",
            samples.len()
        );
    }

    let distances: Vec<f64> = records
        .iter()
        .map(|r| r.eye_distance_m() as f64)
        .filter(|d| *d > 0.0)
        .collect();
    if !distances.is_empty() {
        let mean = distances.iter().sum::<f64>() / distances.len() as f64;
        println!();
        println!("Mean eye distance: {:.0} mm", mean * 1000.0);
    }

    Ok(())
}
