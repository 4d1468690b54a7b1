use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Path next to a content file with its extension replaced
    // @params: path, extension (including the leading dot)
    pub fn sibling_path<P: AsRef<Path>>(path: P, extension: &str) -> Option<PathBuf> {
        let path = path.as_ref();
        let stem = path.file_stem()?;
        let mut name = stem.to_string_lossy().to_string();
        name.push_str(extension);
        Some(path.with_file_name(name))
    }

    /// Find files whose path relative to `root` matches `pattern`, sorted.
    ///
    /// Relative paths use `/` separators. Hidden directories such as `.git` are skipped.
    pub fn find_content_files<P: AsRef<Path>>(root: P, pattern: &Regex) -> Result<Vec<PathBuf>> {
        let root = root.as_ref();
        let mut result = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if pattern.is_match(&Self::relative_path(root, path)) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Path of `path` relative to `root` with `/` separators
    pub fn relative_path(root: &Path, path: &Path) -> String {
        let relative = path.strip_prefix(root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file, replacing it
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_siblingPath_shouldReplaceExtension() {
        let path = FileManager::sibling_path("content/eng/eng57-0212.at", ".subtitle_markers.csv").unwrap();
        assert_eq!(path, PathBuf::from("content/eng/eng57-0212.subtitle_markers.csv"));
    }

    #[test]
    fn test_findContentFiles_shouldMatchRelativePaths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        FileManager::write_to_file(root.join("content/eng/eng57-0212.at"), "@a").unwrap();
        FileManager::write_to_file(root.join("content/eng/notes.at"), "@b").unwrap();
        FileManager::write_to_file(root.join("other/eng57-0213.at"), "@c").unwrap();
        FileManager::write_to_file(root.join(".git/content/x-0001.at"), "@d").unwrap();

        let pattern = Regex::new(r"^content/.+\d{4}\.at$").unwrap();
        let found = FileManager::find_content_files(root, &pattern).unwrap();

        assert_eq!(found, vec![root.join("content/eng/eng57-0212.at")]);
    }
}
