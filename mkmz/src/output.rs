//! Output file naming.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// The image file to write: the requested name with everything from its
/// first `.` replaced by `.png`, or `<width>x<height>_maze.png`.
pub fn image_path(requested: Option<&Path>, width: usize, height: usize) -> PathBuf {
    let Some(requested) = requested else {
        return PathBuf::from(format!("{width}x{height}_maze.png"));
    };

    let name = requested.file_name().unwrap_or_default().to_string_lossy();
    let stem = name.split('.').next().unwrap_or_default();
    let stem = if stem.is_empty() { "maze" } else { stem };
    requested.with_file_name(format!("{stem}.png"))
}

/// The log file kept beside `image`.
pub fn log_path(image: &Path) -> PathBuf {
    let mut name = OsString::from(image.as_os_str());
    name.push(".txt");
    PathBuf::from(name)
}

/// `path` itself if nothing exists there yet, otherwise the first of
/// `name (0).ext`, `name (1).ext`, ... that is free.
pub fn versioned(path: &Path) -> PathBuf {
    versioned_with(path, |candidate| candidate.exists())
}

fn versioned_with(path: &Path, exists: impl Fn(&Path) -> bool) -> PathBuf {
    if !exists(path) {
        return path.to_path_buf();
    }

    let name = path.file_name().unwrap_or_default().to_string_lossy();
    let (stem, rest) = name.split_at(name.find('.').unwrap_or(name.len()));

    (0..)
        .map(|version| path.with_file_name(format!("{stem} ({version}){rest}")))
        .find(|candidate| !exists(candidate))
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn default_name_uses_the_dimensions() {
        assert_eq!(image_path(None, 20, 15), PathBuf::from("20x15_maze.png"));
    }

    #[test]
    fn requested_name_gets_a_png_extension() {
        let image = |name: &str| image_path(Some(Path::new(name)), 1, 1);
        assert_eq!(image("labyrinth"), PathBuf::from("labyrinth.png"));
        assert_eq!(image("out/labyrinth.jpeg"), PathBuf::from("out/labyrinth.png"));
        assert_eq!(image("a.tar.gz"), PathBuf::from("a.png"));
    }

    #[test]
    fn log_sits_beside_the_image() {
        assert_eq!(
            log_path(Path::new("out/m (2).png")),
            PathBuf::from("out/m (2).png.txt")
        );
    }

    #[test]
    fn taken_names_are_numbered_from_zero() {
        let taken: HashSet<PathBuf> = ["m.png", "m (0).png", "m (1).png", "m.png.txt"]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let exists = |p: &Path| taken.contains(p);

        assert_eq!(versioned_with(Path::new("free.png"), exists), PathBuf::from("free.png"));
        assert_eq!(versioned_with(Path::new("m.png"), exists), PathBuf::from("m (2).png"));
        assert_eq!(
            versioned_with(Path::new("m.png.txt"), exists),
            PathBuf::from("m (0).png.txt")
        );
    }

    #[test]
    fn versioning_checks_the_file_system() {
        let dir = std::env::temp_dir().join(format!("mkmz-output-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("maze.png");
        std::fs::write(&path, b"").unwrap();

        assert_eq!(versioned(&path), dir.join("maze (0).png"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
