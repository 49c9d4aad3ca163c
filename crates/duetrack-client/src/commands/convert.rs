//! `duetrack convert`: rewrite a deadline file in another format.

use std::path::Path;

use duetrack_core::{LoadReport, StoreFormat, load_path, save_path};
use tracing::warn;

use crate::error::{ClientError, ClientResult};

/// Loads `input` and saves its deadlines to `output`.
///
/// Both formats come from the file extensions. Invalid input records are
/// skipped; an input without any valid record is an error and `output` is
/// not written.
pub fn convert(input: &Path, output: &Path) -> ClientResult<LoadReport> {
    let from = StoreFormat::from_path(input)?;
    let to = StoreFormat::from_path(output)?;
    if from == to {
        warn!(%from, "Input and output use the same format");
    }

    let report = load_path(input)?;
    if !report.is_success() {
        return Err(ClientError::Input(format!(
            "{} holds no valid deadline",
            input.display()
        )));
    }
    save_path(output, &report.registry)?;
    Ok(report)
}

pub fn run(input: &Path, output: &Path) -> ClientResult<()> {
    let report = convert(input, output)?;
    println!(
        "Converted {} deadlines from {} to {}",
        report.loaded(),
        input.display(),
        output.display()
    );
    for reason in report.skipped() {
        eprintln!("skipped: {reason}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use duetrack_core::StoreError;

    const CSV: &str = "course,assignment,month,day,year,hour,minute,status,link\n\
        Data Structures,HW3,4,26,2019,23,59,LATE SUBMIT,\n\
        Calculus II,Quiz 2,4,20,2019,12,0\n\
        Broken,Row,4,26\n";

    #[test]
    fn csv_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.json");
        std::fs::write(&input, CSV).unwrap();

        let report = convert(&input, &output).unwrap();
        assert_eq!(report.loaded(), 2);
        assert_eq!(report.skipped_count(), 1);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["Data Structures"]["HW3"]["day"], 26);
        assert_eq!(json["Data Structures"]["HW3"]["status"], "LATE SUBMIT");
        assert_eq!(json["Calculus II"]["Quiz 2"]["hour"], 12);
    }

    #[test]
    fn nothing_valid_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, r#"{"Data Structures": {"HW3": {"month": 4}}}"#).unwrap();

        assert!(matches!(convert(&input, &output), Err(ClientError::Input(_))));
        assert!(!output.exists());
    }

    #[test]
    fn calendar_output_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        std::fs::write(&input, CSV).unwrap();
        assert!(matches!(
            convert(&input, &dir.path().join("out.ics")),
            Err(ClientError::Store(StoreError::Unsupported(StoreFormat::Ics)))
        ));
    }
}
