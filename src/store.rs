//! Purpose: Default on-disk destinations for uploaded files.
//! Exports: `default_upload_dir`; crate-internal `unique_destination`, `write_chunks`.
//! Role: Storage-writer collaborator used when no per-file handler is supplied.
//! Invariants: Destinations stay inside the upload directory; names carry a random suffix.
//! Invariants: Write failures carry the destination path for diagnostics.

use std::path::{Path, PathBuf};

use getrandom::fill as fill_random;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::error::{Error, ErrorKind};
use crate::event::FileChunk;

/// The process-wide default upload directory.
pub fn default_upload_dir() -> PathBuf {
    std::env::temp_dir().join("inbound-uploads")
}

/// A collision-resistant destination for one uploaded file.
///
/// Only the final path component of the original name is kept; the random
/// suffix sits between the stem and the extension.
pub(crate) fn unique_destination(dir: &Path, original: &str) -> Result<PathBuf, Error> {
    let mut bytes = [0u8; 6];
    fill_random(&mut bytes).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to generate storage suffix: {err}"))
    })?;
    let suffix = hex_encode(&bytes);
    let (stem, ext) = split_name(original);
    Ok(dir.join(format!("{stem}-{suffix}{ext}")))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn split_name(original: &str) -> (String, String) {
    let name = Path::new(original)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    match name.rfind('.') {
        Some(dot) if dot > 0 => (name[..dot].to_string(), name[dot..].to_string()),
        _ => (name, String::new()),
    }
}

/// Write a file body arriving over a channel to `path`, creating the parent
/// directory if absent. Returns the number of bytes written.
pub(crate) async fn write_chunks(
    path: &Path,
    mut chunks: mpsc::Receiver<FileChunk>,
) -> Result<u64, Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to create upload directory")
                .with_path(parent)
                .with_source(err)
        })?;
    }
    let mut file = fs::File::create(path).await.map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to create upload destination")
            .with_path(path)
            .with_source(err)
    })?;
    let mut written = 0u64;
    while let Some(chunk) = chunks.recv().await {
        match chunk {
            FileChunk::Data(bytes) => {
                file.write_all(&bytes).await.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write upload chunk")
                        .with_path(path)
                        .with_source(err)
                })?;
                written += bytes.len() as u64;
            }
            // The sender stops shortly after truncation; whatever was
            // written stays on disk and the coordinator drops the file
            // from the result tree.
            FileChunk::Truncated => {}
        }
    }
    file.flush().await.map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush upload destination")
            .with_path(path)
            .with_source(err)
    })?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::{default_upload_dir, split_name, unique_destination, write_chunks};
    use crate::event::FileChunk;
    use bytes::Bytes;
    use tokio::sync::mpsc;

    #[test]
    fn destination_keeps_extension_and_adds_suffix() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = unique_destination(temp.path(), "photo.png").expect("destination");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(path.starts_with(temp.path()));
        assert!(name.starts_with("photo-"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "photo-.png".len() + 12);
    }

    #[test]
    fn destination_strips_directory_components() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = unique_destination(temp.path(), "../../etc/passwd").expect("destination");
        assert_eq!(path.parent(), Some(temp.path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("passwd-"));
    }

    #[test]
    fn split_name_handles_dotfiles_and_plain_names() {
        assert_eq!(split_name("archive.tar.gz").1, ".gz");
        assert_eq!(split_name("README"), ("README".to_string(), String::new()));
        assert_eq!(split_name(".bashrc"), (".bashrc".to_string(), String::new()));
    }

    #[test]
    fn default_dir_lives_under_temp() {
        assert!(default_upload_dir().starts_with(std::env::temp_dir()));
    }

    #[tokio::test]
    async fn write_chunks_persists_data_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("out.bin");
        let (tx, rx) = mpsc::channel(4);
        tx.send(FileChunk::Data(Bytes::from_static(b"hello ")))
            .await
            .expect("send");
        tx.send(FileChunk::Data(Bytes::from_static(b"world")))
            .await
            .expect("send");
        drop(tx);

        let written = write_chunks(&path, rx).await.expect("write");
        assert_eq!(written, 11);
        assert_eq!(std::fs::read(&path).expect("read back"), b"hello world");
    }

    #[tokio::test]
    async fn truncation_marker_is_not_written() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("partial.bin");
        let (tx, rx) = mpsc::channel(4);
        tx.send(FileChunk::Data(Bytes::from_static(b"abc")))
            .await
            .expect("send");
        tx.send(FileChunk::Truncated).await.expect("send");
        drop(tx);

        let written = write_chunks(&path, rx).await.expect("write");
        assert_eq!(written, 3);
        assert_eq!(std::fs::read(&path).expect("read back"), b"abc");
    }
}
