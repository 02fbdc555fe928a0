use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

// Result paths

/// Well-known directory build outputs are staged into. The container
/// wrappers bind-mount their context directory at this path.
pub const RESULT_DIR: &str = "/tmp/buildresult";

// Archive paths

/// File name of a downloaded archive: the last path segment of its URL.
pub fn get_archive_name(url: &Url) -> Result<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no file name in url: {}", url))
}

/// Directory an archive extracts into: its name without the tar suffix.
pub fn get_source_tree_name(archive_name: &str) -> String {
    for suffix in [".tar.xz", ".tar.gz", ".tar.bz2", ".tar"] {
        if let Some(stem) = archive_name.strip_suffix(suffix) {
            return stem.to_string();
        }
    }

    archive_name.to_string()
}

pub fn get_partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

// Temp paths

pub fn get_temp_path(prefix: &str) -> PathBuf {
    env::temp_dir().join(format!("{}-{}", prefix, Uuid::now_v7()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_name_from_url() {
        let url =
            Url::parse("https://cdn.kernel.org/pub/linux/kernel/v6.x/linux-6.18.tar.xz").unwrap();
        assert_eq!(get_archive_name(&url).unwrap(), "linux-6.18.tar.xz");
    }

    #[test]
    fn archive_name_requires_file() {
        let url = Url::parse("https://cdn.kernel.org/pub/").unwrap();
        assert!(get_archive_name(&url).is_err());
    }

    #[test]
    fn source_tree_strips_suffix() {
        assert_eq!(get_source_tree_name("linux-6.18.tar.xz"), "linux-6.18");
        assert_eq!(get_source_tree_name("u-boot.tar.gz"), "u-boot");
        assert_eq!(get_source_tree_name("plain"), "plain");
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            get_partial_path(Path::new("/src/linux-6.18.tar.xz")),
            Path::new("/src/linux-6.18.tar.xz.part")
        );
    }

    #[test]
    fn temp_paths_are_unique() {
        let a = get_temp_path("u-boot");
        let b = get_temp_path("u-boot");
        assert_ne!(a, b);
        assert!(a.starts_with(env::temp_dir()));
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("u-boot-"));
    }
}
