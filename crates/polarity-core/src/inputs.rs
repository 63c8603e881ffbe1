use crate::{load_csv_file, PolarityError, ProbeTable};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Resolves a file-or-directory argument to the CSV files it names. A
/// directory contributes its direct `*.csv` children, sorted by file name.
pub fn resolve_inputs(path: &Path) -> Result<Vec<PathBuf>, PolarityError> {
    if path.is_file() && has_csv_extension(path) {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(PolarityError::InvalidInputPath(path.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && has_csv_extension(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(PolarityError::NoInputFiles(path.to_path_buf()));
    }
    Ok(files)
}

/// Loads and concatenates every file, skipping the ones that fail to parse.
pub fn load_tables(paths: &[PathBuf]) -> Result<ProbeTable, PolarityError> {
    let mut table = ProbeTable::default();
    let mut loaded = 0usize;
    for path in paths {
        match load_csv_file(path) {
            Ok(part) => {
                info!(file = %path.display(), rows = part.len(), "loaded results file");
                table.concat(part);
                loaded += 1;
            }
            Err(err) => warn!(file = %path.display(), error = %err, "skipping results file"),
        }
    }
    if loaded == 0 {
        return Err(PolarityError::NoDataLoaded);
    }
    Ok(table)
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;

    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "polarity_inputs_{}_{}_{}",
            tag,
            std::process::id(),
            Utc::now().timestamp_micros()
        ));
        fs::create_dir_all(&root).expect("temp dir");
        root
    }

    #[test]
    fn directory_inputs_are_sorted_and_filtered() {
        let root = temp_root("dir");
        fs::write(root.join("b.csv"), "statement,temperature\nx,0.0\n").expect("b");
        fs::write(root.join("a.csv"), "statement,temperature\ny,0.3\n").expect("a");
        fs::write(root.join("manifest.json"), "{}").expect("json");
        let files = resolve_inputs(&root).expect("resolve");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn empty_directory_and_bad_paths_are_distinguished() {
        let root = temp_root("empty");
        assert!(matches!(
            resolve_inputs(&root),
            Err(PolarityError::NoInputFiles(_))
        ));
        assert!(matches!(
            resolve_inputs(&root.join("nope.csv")),
            Err(PolarityError::InvalidInputPath(_))
        ));
        fs::write(root.join("notes.txt"), "hi").expect("txt");
        assert!(matches!(
            resolve_inputs(&root.join("notes.txt")),
            Err(PolarityError::InvalidInputPath(_))
        ));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn broken_files_are_skipped_but_total_failure_is_fatal() {
        let root = temp_root("load");
        let good = root.join("good.csv");
        let bad = root.join("bad.csv");
        fs::write(&good, "statement,temperature,bearish\nx,0.0,risky\n").expect("good");
        fs::write(&bad, "bearish\nrisky\n").expect("bad");

        let table = load_tables(&[bad.clone(), good]).expect("one file loads");
        assert_eq!(table.len(), 1);

        let err = load_tables(&[bad]).expect_err("nothing loads");
        assert!(matches!(err, PolarityError::NoDataLoaded));
        let _ = fs::remove_dir_all(root);
    }
}
