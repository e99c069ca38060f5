//! Asset discovery.
//!
//! Resolves the configured paths into an ordered, deduplicated list of
//! files to upload. Ordering is by file name within each directory so that
//! repeated scans of an unchanged tree yield the same list; later stages
//! address remote slots by position in it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::Asset;

/// Files above this size get a one-off warning; they upload fine but the
/// platform may struggle to process them.
pub const LARGE_FILE_THRESHOLD: u64 = 256 * 1024 * 1024;

/// Content type used when nothing better is known.
pub const FALLBACK_MIME: &str = "image/jpeg";

// Accepted without a mime override. Other formats (DICOM, WSI) need one.
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".tif", ".tiff", ".bmp"];

// Never images, even when a mime override widens what is accepted.
const DENY_LIST: &[&str] = &[
    ".yaml", ".yml", ".json", ".txt", ".csv", ".tsv", ".xls", ".xlsx", ".ini", ".zip", ".tar",
    ".gz", ".7z", ".db", ".ds_store", ".dll", ".sys", ".exe",
];

/// Options controlling how paths are expanded.
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// Expand directories over their whole subtree instead of one level.
    pub recursive: bool,
    /// Content type forced onto every asset; also lifts the image allow-list.
    pub mime_override: Option<String>,
}

/// Result of a scan.
#[derive(Debug, Default)]
pub struct Discovery {
    pub assets: Vec<Asset>,
    pub total_size: u64,
    /// Included assets above [`LARGE_FILE_THRESHOLD`].
    pub large_files: usize,
    /// Large-file warnings emitted; never more than one per scan.
    pub large_file_warnings: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    Include,
    Denied,
    Skip,
}

fn verdict(name: &str, mime_override: Option<&str>) -> Verdict {
    let lower = name.to_lowercase();
    if DENY_LIST.iter().any(|ext| lower.ends_with(ext)) {
        return Verdict::Denied;
    }
    if mime_override.is_some() || IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Verdict::Include
    } else {
        Verdict::Skip
    }
}

/// Content type for a file: the override, else the image type guessed from
/// the extension, else the generic fallback.
pub fn resolve_mime(name: &str, mime_override: Option<&str>) -> String {
    if let Some(mime) = mime_override {
        return mime.to_string();
    }
    mime_guess::from_path(name)
        .iter()
        .find(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

/// Scans `paths` and returns the assets to upload along with their total
/// size in bytes. Missing or unreadable paths are skipped with a log line.
pub fn discover<P: AsRef<Path>>(paths: &[P], options: &DiscoverOptions) -> Discovery {
    let mut scan = Scan {
        options,
        found: Discovery::default(),
        seen: HashSet::new(),
    };

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let depth = if options.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(path)
                .min_depth(1)
                .max_depth(depth)
                .sort_by_file_name();
            for entry in walker {
                match entry {
                    Ok(entry) if entry.path().is_file() => scan.consider(entry.path()),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
                }
            }
        } else if path.is_file() {
            scan.consider(path);
        } else {
            tracing::debug!(path = %path.display(), "skipping path that is not a file or directory");
        }
    }

    scan.found
}

struct Scan<'a> {
    options: &'a DiscoverOptions,
    found: Discovery,
    seen: HashSet<PathBuf>,
}

impl Scan<'_> {
    fn consider(&mut self, path: &Path) {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return;
        };
        let mime_override = self.options.mime_override.as_deref();
        match verdict(&name, mime_override) {
            Verdict::Include => {}
            Verdict::Denied => {
                if mime_override.is_some() {
                    tracing::info!(path = %path.display(), "excluding non-image file");
                }
                return;
            }
            Verdict::Skip => return,
        }

        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !self.seen.insert(key) {
            return;
        }

        let size = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                return;
            }
        };
        if size > LARGE_FILE_THRESHOLD {
            self.found.large_files += 1;
            if self.found.large_file_warnings == 0 {
                self.found.large_file_warnings += 1;
                tracing::warn!(
                    path = %path.display(),
                    size,
                    "files larger than 256 MiB may not process reliably"
                );
            }
        }

        self.found.total_size += size;
        self.found.assets.push(Asset {
            path: path.to_path_buf(),
            mime: resolve_mime(&name, mime_override),
            name,
            size,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(found: &Discovery) -> Vec<&str> {
        found.assets.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn matches_extensions_case_insensitively() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.jpg"), b"A").unwrap();
        fs::write(dir.path().join("b.txt"), b"B").unwrap();
        fs::write(dir.path().join("c.JPG"), b"CC").unwrap();

        let found = discover(&[dir.path()], &DiscoverOptions::default());
        assert_eq!(names(&found), vec!["a.jpg", "c.JPG"]);
        assert_eq!(found.total_size, 3);
        assert!(found.assets.iter().all(|a| a.mime == "image/jpeg"));
    }

    #[test]
    fn deny_list_beats_mime_override() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("scan.wsi"), b"slide").unwrap();
        fs::write(dir.path().join("notes.yaml"), b"a: b").unwrap();

        let options = DiscoverOptions {
            recursive: false,
            mime_override: Some("image/dcm".into()),
        };
        let found = discover(&[dir.path()], &options);
        assert_eq!(names(&found), vec!["scan.wsi"]);
        assert_eq!(found.assets[0].mime, "image/dcm");
    }

    #[test]
    fn one_level_unless_recursive() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("top.png"), b"1").unwrap();
        fs::create_dir_all(root.join("nested").join("deeper")).unwrap();
        fs::write(root.join("nested").join("mid.png"), b"2").unwrap();
        fs::write(root.join("nested").join("deeper").join("low.gif"), b"3").unwrap();
        fs::write(root.join("nested").join("deeper").join("meta.csv"), b"x").unwrap();

        let shallow = discover(&[root], &DiscoverOptions::default());
        assert_eq!(names(&shallow), vec!["top.png"]);

        let options = DiscoverOptions {
            recursive: true,
            mime_override: None,
        };
        let deep = discover(&[root], &options);
        assert_eq!(names(&deep), vec!["low.gif", "mid.png", "top.png"]);
        assert_eq!(deep.assets[0].mime, "image/gif");
    }

    #[test]
    fn ordering_is_stable_across_scans() {
        let dir = TempDir::new().unwrap();
        for name in ["z.png", "m.png", "a.png", "k.tif"] {
            fs::write(dir.path().join(name), b"img").unwrap();
        }
        let first = discover(&[dir.path()], &DiscoverOptions::default());
        let second = discover(&[dir.path()], &DiscoverOptions::default());
        assert_eq!(names(&first), vec!["a.png", "k.tif", "m.png", "z.png"]);
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn duplicates_and_missing_paths_are_skipped() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.png");
        fs::write(&file, b"img").unwrap();
        let missing = dir.path().join("nope.png");

        let paths = vec![file.clone(), dir.path().to_path_buf(), missing];
        let found = discover(&paths, &DiscoverOptions::default());
        assert_eq!(names(&found), vec!["a.png"]);
        assert_eq!(found.assets[0].path, file);
    }

    #[test]
    fn mime_falls_back_to_generic_image() {
        assert_eq!(resolve_mime("x.TIFF", None), "image/tiff");
        assert_eq!(resolve_mime("x.webp", None), "image/webp");
        assert_eq!(resolve_mime("x.unknown", None), FALLBACK_MIME);
        assert_eq!(resolve_mime("notes.pdf", None), FALLBACK_MIME);
        assert_eq!(resolve_mime("x.png", Some("image/svs")), "image/svs");
    }

    #[test]
    fn large_files_are_kept_and_warned_about_once() {
        let dir = TempDir::new().unwrap();
        for name in ["big1.tif", "big2.tif"] {
            let file = fs::File::create(dir.path().join(name)).unwrap();
            file.set_len(LARGE_FILE_THRESHOLD + 1).unwrap();
        }
        fs::write(dir.path().join("small.png"), b"px").unwrap();

        let found = discover(&[dir.path()], &DiscoverOptions::default());
        assert_eq!(names(&found), vec!["big1.tif", "big2.tif", "small.png"]);
        assert_eq!(found.total_size, 2 * (LARGE_FILE_THRESHOLD + 1) + 2);
        assert_eq!(found.large_files, 2);
        assert_eq!(found.large_file_warnings, 1);
    }

    #[test]
    fn threshold_sized_file_is_not_large() {
        let dir = TempDir::new().unwrap();
        let file = fs::File::create(dir.path().join("edge.png")).unwrap();
        file.set_len(LARGE_FILE_THRESHOLD).unwrap();

        let found = discover(&[dir.path()], &DiscoverOptions::default());
        assert_eq!(found.assets.len(), 1);
        assert_eq!(found.large_files, 0);
        assert_eq!(found.large_file_warnings, 0);
    }
}
