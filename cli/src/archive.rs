use crate::error::Error;
use crate::workflow::Workflow;
use eyre::{eyre, WrapErr};
use glob::{MatchOptions, Pattern};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deflate at its slowest and smallest
const COMPRESSION_LEVEL: i64 = 9;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Split comma separated glob patterns, empty segments are dropped
pub fn parse_ignore_patterns(ignore: &str) -> Vec<String> {
    let patterns = ignore
        .split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(String::from)
        .collect::<Vec<_>>();

    log::info!("Source ignore pattern: \"{patterns:?}\"");
    patterns
}

/// Compiled exclusion patterns, matched against paths relative to the source root
#[derive(Debug, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,

    // "dir/**" excludes the directory itself as well
    dir_patterns: Vec<Pattern>,
}

impl IgnoreSet {
    pub fn new(patterns: &[String]) -> eyre::Result<Self> {
        let compile = |pattern: &str| {
            Pattern::new(pattern).wrap_err(Error::new(
                &format!("Invalid exclude pattern: \"{pattern}\""),
                Some("Check the glob syntax of the \"exclude\" input."),
            ))
        };

        let mut set = IgnoreSet::default();

        for pattern in patterns {
            set.patterns.push(compile(pattern)?);

            if let Some(dir) = pattern.strip_suffix("/**").filter(|dir| !dir.is_empty()) {
                set.dir_patterns.push(compile(dir)?);
            }
        }

        Ok(set)
    }

    pub fn is_ignored(&self, relative: &str, is_dir: bool) -> bool {
        let matches = |patterns: &[Pattern]| {
            patterns
                .iter()
                .any(|p| p.matches_with(relative, MATCH_OPTIONS))
        };

        matches(&self.patterns) || self.is_pruned(relative, is_dir)
    }

    /// Only "dir/**" keeps the walk out of a directory, other matches skip the entry alone
    fn is_pruned(&self, relative: &str, is_dir: bool) -> bool {
        is_dir
            && self
                .dir_patterns
                .iter()
                .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }
}

/// Zip the source directory into memory
///
/// Hidden entries are included, paths are stored relative to the source root.
pub async fn zip_directory(
    workflow: &dyn Workflow,
    source: &str,
    source_ignore: &str,
) -> eyre::Result<Vec<u8>> {
    let _group = workflow.group("ZipDirectory");

    let root = if source.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(source)
    };

    if !root.is_dir() {
        return Err(Error::new(
            &format!("Source directory not found: \"{}\"", root.display()),
            Some("Check the \"source\" input, it is relative to the workspace."),
        )
        .into());
    }

    let ignore = IgnoreSet::new(&parse_ignore_patterns(source_ignore))?;
    log::info!("Archive initialize");

    // Zip crate doesn't have async support, so we have to use a blocking task here
    let (buffer, entries) = tokio::task::spawn_blocking(move || write_archive(&root, &ignore))
        .await
        .wrap_err("Failed to spawn the blocking task")?
        .wrap_err("Failed to create a Zip archive")?;

    log::info!("Archive finalized ({entries} entries)");

    if buffer.is_empty() {
        return Err(eyre!("Failed to initialize Buffer"));
    }

    log::info!("Buffer object created");
    Ok(buffer)
}

fn file_options(metadata: &std::fs::Metadata) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .large_file(metadata.len() >= u32::MAX as u64);

    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(metadata.permissions().mode())
    };

    options
}

/// Write the archive, returns the bytes and the number of entries
fn write_archive(root: &Path, ignore: &IgnoreSet) -> eyre::Result<(Vec<u8>, usize)> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = 0;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !ignore.is_pruned(&relative_name(root, entry), entry.file_type().is_dir())
        });

    for entry in walker {
        let entry = entry.wrap_err("Failed to read the source directory")?;
        let name = relative_name(root, &entry);

        if ignore.is_ignored(&name, entry.file_type().is_dir()) {
            log::debug!("Excluding \"{name}\"");
            continue;
        }

        // Links are not followed while walking, a link to a file is stored as that file
        let metadata = match std::fs::metadata(entry.path()) {
            Ok(metadata) => metadata,
            Err(e) if entry.path_is_symlink() => {
                log::warn!("Skipping broken link \"{name}\": {e}");
                continue;
            }
            Err(e) => return Err(e).wrap_err(format!("Could not read metadata of \"{name}\"")),
        };

        let options = file_options(&metadata);

        if entry.file_type().is_dir() {
            zip.add_directory(name.as_str(), options)
                .wrap_err(format!("Could not add directory \"{name}\""))?;
        } else if metadata.is_file() {
            let content = std::fs::read(entry.path())
                .wrap_err(format!("Could not open the file \"{name}\""))?;

            zip.start_file(name.as_str(), options)
                .wrap_err("Could not open ZIP file")?;

            zip.write_all(&content)
                .wrap_err("Could not write to ZIP file")?;
        } else {
            log::debug!("Skipping \"{name}\", neither a file nor a directory");
            continue;
        }

        entries += 1;
    }

    if entries == 0 {
        return Err(eyre!("No files to archive in \"{}\"", root.display()));
    }

    let buffer = zip
        .finish()
        .wrap_err("Could not close ZIP file")?
        .into_inner();

    Ok((buffer, entries))
}

/// Forward slash separated path of the entry below the root
fn relative_name(root: &Path, entry: &DirEntry) -> String {
    entry
        .path()
        .strip_prefix(root)
        .unwrap_or(entry.path())
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::RecordingWorkflow;
    use std::io::Read;
    use zip::ZipArchive;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        std::fs::write(root.join("index.js"), "exports.handler = () => 1;").unwrap();
        std::fs::write(root.join(".env"), "A=1").unwrap();
        std::fs::write(root.join("README.md"), "# readme").unwrap();
        std::fs::write(root.join("src/util.js"), "module.exports = {};").unwrap();
        std::fs::write(root.join("src/nested/notes.md"), "notes").unwrap();
        std::fs::write(root.join("node_modules/lib/index.js"), "lib").unwrap();
        dir
    }

    fn names(buffer: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(buffer)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn empty_ignore_string_yields_no_patterns() {
        assert!(parse_ignore_patterns("").is_empty());
        assert!(parse_ignore_patterns("   ").is_empty());
        assert!(parse_ignore_patterns(",, ,").is_empty());
    }

    #[test]
    fn ignore_patterns_keep_order() {
        assert_eq!(parse_ignore_patterns("a/*,,b/**"), vec!["a/*", "b/**"]);
    }

    #[test]
    fn ignore_set_matching() {
        let set = IgnoreSet::new(&parse_ignore_patterns("*.md,build/**,**/*.log")).unwrap();

        assert!(set.is_ignored("README.md", false));
        assert!(!set.is_ignored("docs/README.md", false));
        assert!(set.is_ignored("build", true));
        assert!(set.is_pruned("build", true));
        assert!(!set.is_pruned("README.md", false));
        assert!(set.is_ignored("build/out/app.js", false));
        assert!(set.is_ignored("debug.log", false));
        assert!(set.is_ignored("logs/today/debug.log", false));
        assert!(!set.is_ignored("src/index.js", false));
    }

    #[test]
    fn invalid_pattern_fails() {
        let error = IgnoreSet::new(&["[".to_string()]).unwrap_err();
        assert_eq!(
            crate::error::failure_message(&error),
            "Invalid exclude pattern: \"[\""
        );
    }

    #[tokio::test]
    async fn archives_everything_without_patterns() {
        let dir = fixture();
        let workflow = RecordingWorkflow::default();

        let buffer = zip_directory(&workflow, dir.path().to_str().unwrap(), "")
            .await
            .unwrap();

        assert_eq!(
            names(&buffer),
            vec![
                ".env",
                "README.md",
                "index.js",
                "node_modules/",
                "node_modules/lib/",
                "node_modules/lib/index.js",
                "src/",
                "src/nested/",
                "src/nested/notes.md",
                "src/util.js",
            ]
        );

        assert_eq!(workflow.events(), vec!["group:ZipDirectory", "endgroup"]);
    }

    #[tokio::test]
    async fn excluded_entries_are_skipped() {
        let dir = fixture();
        let workflow = RecordingWorkflow::default();

        let buffer = zip_directory(
            &workflow,
            dir.path().to_str().unwrap(),
            "node_modules/**,,*.md",
        )
        .await
        .unwrap();

        assert_eq!(
            names(&buffer),
            vec![
                ".env",
                "index.js",
                "src/",
                "src/nested/",
                "src/nested/notes.md",
                "src/util.js",
            ]
        );
    }

    #[tokio::test]
    async fn entries_are_deflated_with_content() {
        let dir = fixture();
        let workflow = RecordingWorkflow::default();

        let buffer = zip_directory(&workflow, dir.path().to_str().unwrap(), "")
            .await
            .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(buffer)).unwrap();
        let mut file = archive.by_name("src/util.js").unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();

        assert_eq!(file.compression(), CompressionMethod::Deflated);
        assert_eq!(content, "module.exports = {};");
    }

    #[tokio::test]
    async fn matched_directory_keeps_its_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tests")).unwrap();
        std::fs::write(dir.path().join("index.js"), "index").unwrap();
        std::fs::write(dir.path().join("test.js"), "test").unwrap();
        std::fs::write(dir.path().join("tests/keep.js"), "keep").unwrap();

        let workflow = RecordingWorkflow::default();
        let buffer = zip_directory(&workflow, dir.path().to_str().unwrap(), "test*")
            .await
            .unwrap();

        // "tests" matches, "tests/keep.js" does not
        assert_eq!(names(&buffer), vec!["index.js", "tests/keep.js"]);
    }

    #[tokio::test]
    async fn entries_use_best_compression() {
        let dir = tempfile::tempdir().unwrap();
        let content = (0..4000)
            .map(|i| format!("line {i}: {}\n", (i * 7919) % 1013))
            .collect::<String>();
        std::fs::write(dir.path().join("data.txt"), &content).unwrap();

        let workflow = RecordingWorkflow::default();
        let buffer = zip_directory(&workflow, dir.path().to_str().unwrap(), "")
            .await
            .unwrap();

        let mut reference = ZipWriter::new(Cursor::new(Vec::new()));
        reference
            .start_file(
                "data.txt",
                SimpleFileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .compression_level(Some(9)),
            )
            .unwrap();
        reference.write_all(content.as_bytes()).unwrap();
        let reference = reference.finish().unwrap().into_inner();

        let mut archive = ZipArchive::new(Cursor::new(buffer)).unwrap();
        let mut reference = ZipArchive::new(Cursor::new(reference)).unwrap();
        let stored = archive.by_name("data.txt").unwrap();
        let expected = reference.by_name("data.txt").unwrap();

        assert!(stored.compressed_size() < stored.size());
        assert_eq!(stored.compressed_size(), expected.compressed_size());
    }

    #[tokio::test]
    async fn everything_excluded_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "# readme").unwrap();
        std::fs::write(dir.path().join("CHANGELOG.md"), "changes").unwrap();
        let workflow = RecordingWorkflow::default();

        let error = zip_directory(&workflow, dir.path().to_str().unwrap(), "*.md")
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Failed to create a Zip archive");
        assert!(format!("{error:?}").contains("No files to archive"));

        // The group is closed on the error path too
        assert_eq!(workflow.events(), vec!["group:ZipDirectory", "endgroup"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn linked_files_are_stored_and_broken_links_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.js"), "real").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.js"), dir.path().join("alias.js")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.js"), dir.path().join("broken.js")).unwrap();

        let workflow = RecordingWorkflow::default();
        let buffer = zip_directory(&workflow, dir.path().to_str().unwrap(), "")
            .await
            .unwrap();

        assert_eq!(names(&buffer), vec!["alias.js", "real.js"]);
    }

    #[tokio::test]
    async fn missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let workflow = RecordingWorkflow::default();

        let error = zip_directory(&workflow, missing.to_str().unwrap(), "")
            .await
            .unwrap_err();

        assert!(crate::error::failure_message(&error).starts_with("Source directory not found"));
    }
}
