use serde::{Deserialize, Serialize};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "gif", "png"];

/// Public URL of an uploaded file, as stored in a row's data bag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(String);

impl FileRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }

    /// User-facing file name: the last URL segment without the upload
    /// timestamp prefix (`1712345678901_song.mp3` -> `song.mp3`).
    pub fn display_name(&self) -> &str {
        let file_name = self.0.rsplit('/').next().unwrap_or_default();
        match file_name.split_once('_') {
            Some((_, rest)) => rest,
            None => file_name,
        }
    }

    pub fn is_image(&self) -> bool {
        self.0
            .rsplit_once('.')
            .map(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

/// Object-store key for an upload: `{timestamp_ms}_{file_name}`.
/// Directory components in `original_name` are dropped.
pub fn object_path(timestamp_ms: u64, original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    format!("{timestamp_ms}_{base}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_timestamp_prefix() {
        let f = FileRef::new("https://cdn.example/files/1712345678901_my_song.mp3");
        assert_eq!(f.display_name(), "my_song.mp3");
    }

    #[test]
    fn display_name_without_prefix_is_unchanged() {
        let f = FileRef::new("https://cdn.example/files/cover.png");
        assert_eq!(f.display_name(), "cover.png");
    }

    #[test]
    fn image_detection_is_case_insensitive() {
        assert!(FileRef::new("http://x/1_a.PNG").is_image());
        assert!(FileRef::new("http://x/1_a.jpeg").is_image());
        assert!(!FileRef::new("http://x/1_a.mp3").is_image());
        assert!(!FileRef::new("http://x/noext").is_image());
    }

    #[test]
    fn object_path_drops_directories() {
        assert_eq!(object_path(42, "song.mp3"), "42_song.mp3");
        assert_eq!(object_path(42, "../../etc/passwd"), "42_passwd");
        assert_eq!(object_path(7, "C:\\music\\a b.wav"), "7_a b.wav");
    }
}
