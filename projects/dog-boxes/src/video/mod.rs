pub mod opencv_reader;
pub mod opencv_writer;
pub mod processor;

use std::path::Path;

/// Stream properties read from the input container and mirrored on output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
    /// As reported by the container; may be an estimate.
    pub frame_count: usize,
}

/// FOURCC code for the container implied by `path`'s extension.
pub fn fourcc_for(path: &Path) -> [char; 4] {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "avi" => ['M', 'J', 'P', 'G'],
        "mkv" => ['X', 'V', 'I', 'D'],
        _ => ['m', 'p', '4', 'v'],
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_for_container() {
        assert_eq!(fourcc_for(Path::new("a/clip.mp4")), ['m', 'p', '4', 'v']);
        assert_eq!(fourcc_for(Path::new("clip.MOV")), ['m', 'p', '4', 'v']);
        assert_eq!(fourcc_for(Path::new("clip.avi")), ['M', 'J', 'P', 'G']);
        assert_eq!(fourcc_for(Path::new("clip.mkv")), ['X', 'V', 'I', 'D']);
        assert_eq!(fourcc_for(Path::new("clip")), ['m', 'p', '4', 'v']);
    }
}
