use crate::error::{ConversionError, Result};
use globset::{GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Extension of MILXLY documents
pub const DEFAULT_EXTENSION: &str = "milxly";

/// Async discovery of input documents
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// File extensions to include, compared case-insensitively (e.g. ["milxly"])
    extensions: Vec<String>,
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
    /// Maximum depth for directory traversal (0 = only the given directory, None = unlimited)
    max_depth: Option<usize>,
    follow_symlinks: bool,
}

impl FileDiscovery {
    /// Non-recursive discovery of `.milxly` files
    pub fn new() -> Self {
        Self {
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            include_set: None,
            exclude_set: None,
            max_depth: Some(0),
            follow_symlinks: false,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.include_set = build_glob_set(patterns, "include")?;
        Ok(self)
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.exclude_set = build_glob_set(patterns, "exclude")?;
        Ok(self)
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Discover files in the given path (file or directory), sorted by path
    pub async fn discover_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let (files, _) = self.discover(path).await?;
        Ok(files)
    }

    async fn discover(&self, path: &Path) -> Result<(Vec<PathBuf>, usize)> {
        let metadata = fs::metadata(path).await?;

        if metadata.is_file() {
            let files = if self.should_process(path) {
                vec![path.to_path_buf()]
            } else {
                Vec::new()
            };
            return Ok((files, 0));
        }

        if !metadata.is_dir() {
            return Err(ConversionError::FileSystemTraversal {
                path: path.to_path_buf(),
                reason: "not a regular file or directory".to_string(),
            });
        }

        let mut files = Vec::new();
        let mut errors = 0;

        let mut read_dir = fs::read_dir(path).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let entry_path = entry.path();

            if entry_path.is_symlink() && !self.follow_symlinks {
                continue;
            }

            if let Err(e) = self
                .discover_files_recursive(&entry_path, 0, &mut files, &mut errors)
                .await
            {
                errors += 1;
                log::warn!("Error processing {}: {}", entry_path.display(), e);
            }
        }

        files.sort();
        Ok((files, errors))
    }

    fn discover_files_recursive<'a>(
        &'a self,
        path: &'a Path,
        depth: usize,
        files: &'a mut Vec<PathBuf>,
        errors: &'a mut usize,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(max_depth) = self.max_depth
                && depth > max_depth
            {
                return Ok(());
            }

            let metadata = fs::metadata(path).await?;

            if metadata.is_file() {
                if self.should_process(path) {
                    files.push(path.to_path_buf());
                }
            } else if metadata.is_dir() {
                // Entries of this directory would sit one level deeper
                if let Some(max_depth) = self.max_depth
                    && depth >= max_depth
                {
                    return Ok(());
                }

                let mut read_dir = fs::read_dir(path).await?;
                while let Some(entry) = read_dir.next_entry().await? {
                    let entry_path = entry.path();

                    if entry_path.is_symlink() && !self.follow_symlinks {
                        continue;
                    }

                    if let Err(e) = self
                        .discover_files_recursive(&entry_path, depth + 1, files, errors)
                        .await
                    {
                        *errors += 1;
                        log::warn!("Error processing {}: {}", entry_path.display(), e);
                    }
                }
            }

            Ok(())
        })
    }

    /// Check if a file should be processed based on extensions and patterns
    pub fn should_process(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(extension) if self.extensions.contains(&extension.to_lowercase()) => {}
            _ => return false,
        }

        if let Some(exclude_set) = &self.exclude_set
            && exclude_set.is_match(path)
        {
            return false;
        }

        // When include patterns are given, at least one must match
        if let Some(include_set) = &self.include_set {
            return include_set.is_match(path);
        }

        true
    }

    pub async fn get_discovery_stats(&self, root: &Path) -> Result<DiscoveryStats> {
        let (files, errors) = self.discover(root).await?;
        Ok(DiscoveryStats {
            files_found: files.len(),
            errors,
        })
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

fn build_glob_set(patterns: Vec<String>, kind: &str) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                ConversionError::Config(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
        builder.add(glob);
    }

    let set = builder.build().map_err(|e| {
        ConversionError::Config(format!("Failed to build {} glob set: {}", kind, e))
    })?;
    Ok(Some(set))
}

/// Statistics about file discovery operation
#[derive(Debug, Default, Clone)]
pub struct DiscoveryStats {
    pub files_found: usize,
    /// Entries that could not be inspected
    pub errors: usize,
}
