//! File-backed recording sink and media library

use super::{MediaLibrary, RecordingError, RecordingSink};
use async_trait::async_trait;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Numbered alternatives tried when a clip name is already taken
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Creates a new file at `path`, or at `<stem>_<n>.<ext>` when taken
async fn create_unique(path: &Path) -> io::Result<(File, PathBuf)> {
    let mut candidate = path.to_path_buf();
    for n in 1..=MAX_NAME_ATTEMPTS {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %candidate.display(), "Clip name taken");
                candidate = numbered(path, n);
            }
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free file name next to {}", path.display()),
    ))
}

fn numbered(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    path.with_file_name(name)
}

/// Opens the movie file at start and closes it on finish.
///
/// The container contents are produced by the capture pipeline; this sink
/// owns the file handle and its lifetime.
#[derive(Debug, Default)]
pub struct FileOutputSink {
    file: Option<(File, PathBuf)>,
}

impl FileOutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

#[async_trait]
impl RecordingSink for FileOutputSink {
    async fn start(&mut self, path: &Path) -> Result<PathBuf, RecordingError> {
        if self.file.is_some() {
            return Err(RecordingError::Sink("output file already open".to_string()));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let (file, opened) = create_unique(path).await?;
        debug!(path = %opened.display(), "Opened recording file");
        self.file = Some((file, opened.clone()));
        Ok(opened)
    }

    async fn finish(&mut self) -> Result<PathBuf, RecordingError> {
        let (mut file, path) = self
            .file
            .take()
            .ok_or_else(|| RecordingError::Sink("no output file open".to_string()))?;

        file.flush().await?;
        file.sync_all().await?;
        debug!(path = %path.display(), "Closed recording file");
        Ok(path)
    }
}

/// Media library backed by a directory
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaLibrary for DirectoryLibrary {
    async fn save_video(&self, path: &Path) -> Result<PathBuf, RecordingError> {
        let name = path
            .file_name()
            .ok_or_else(|| RecordingError::Library(format!("not a file: {}", path.display())))?;

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| RecordingError::Library(e.to_string()))?;

        let mut source = File::open(path)
            .await
            .map_err(|e| RecordingError::Library(format!("{}: {}", path.display(), e)))?;
        let (mut file, dest) = create_unique(&self.root.join(name))
            .await
            .map_err(|e| RecordingError::Library(e.to_string()))?;

        let copied = async {
            tokio::io::copy(&mut source, &mut file).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = copied {
            // leave no half-written clip behind
            let _ = fs::remove_file(&dest).await;
            return Err(RecordingError::Library(format!("{}: {}", dest.display(), e)));
        }

        info!(path = %dest.display(), "Saved clip to library");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_creates_and_finishes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("clip.mov");
        let mut sink = FileOutputSink::new();

        sink.start(&path).await.unwrap();
        assert!(sink.is_open());
        assert!(sink.start(&path).await.is_err());

        let finished = sink.finish().await.unwrap();
        assert_eq!(finished, path);
        assert!(path.exists());
        assert!(!sink.is_open());
    }

    #[tokio::test]
    async fn test_finish_without_start() {
        let mut sink = FileOutputSink::new();
        assert!(matches!(
            sink.finish().await,
            Err(RecordingError::Sink(_))
        ));
    }

    #[tokio::test]
    async fn test_library_copies_clip() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mov");
        std::fs::write(&clip, b"movie").unwrap();
        let library = DirectoryLibrary::new(dir.path().join("library"));

        let saved = library.save_video(&clip).await.unwrap();

        assert_eq!(saved, dir.path().join("library").join("clip.mov"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"movie");
    }

    #[tokio::test]
    async fn test_sink_never_truncates_existing_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        std::fs::write(&path, b"earlier take").unwrap();
        let mut sink = FileOutputSink::new();

        let opened = sink.start(&path).await.unwrap();
        sink.finish().await.unwrap();

        assert_eq!(opened, dir.path().join("clip_1.mov"));
        assert_eq!(std::fs::read(&path).unwrap(), b"earlier take");
    }

    #[tokio::test]
    async fn test_library_keeps_clips_with_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(dir.path().join("library"));
        let first = dir.path().join("a").join("clip.mov");
        let second = dir.path().join("b").join("clip.mov");
        std::fs::create_dir_all(first.parent().unwrap()).unwrap();
        std::fs::create_dir_all(second.parent().unwrap()).unwrap();
        std::fs::write(&first, b"first").unwrap();
        std::fs::write(&second, b"second").unwrap();

        let saved_first = library.save_video(&first).await.unwrap();
        let saved_second = library.save_video(&second).await.unwrap();

        assert_eq!(saved_first, dir.path().join("library").join("clip.mov"));
        assert_eq!(saved_second, dir.path().join("library").join("clip_1.mov"));
        assert_eq!(std::fs::read(&saved_first).unwrap(), b"first");
        assert_eq!(std::fs::read(&saved_second).unwrap(), b"second");
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(
            numbered(Path::new("out/clip.mov"), 2),
            PathBuf::from("out/clip_2.mov")
        );
        assert_eq!(numbered(Path::new("out/clip"), 1), PathBuf::from("out/clip_1"));
    }

    #[tokio::test]
    async fn test_library_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(dir.path().join("library"));

        let result = library.save_video(&dir.path().join("missing.mov")).await;

        assert!(matches!(result, Err(RecordingError::Library(_))));
    }
}
