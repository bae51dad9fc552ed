//! Artifact streaming: directories in and out of compressed tar streams.
//!
//! The upload side runs a producer on the blocking pool that walks the
//! file set and writes `tar` → gzip → bounded channel; the consumer (the
//! HTTP upload) reads chunks off the channel as they appear. Archive
//! construction is decoupled from network send speed, memory is bounded
//! by the channel depth, and the archive is never materialized whole.
//!
//! If the producer fails mid-walk it pushes the error down the channel
//! instead of closing cleanly, so the consumer's next read fails rather
//! than seeing a truncated-but-plausible EOF.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::{Stream, StreamExt, TryStreamExt};
use tokio::sync::mpsc;
use tokio::task;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, warn};

use crate::bounded::BoundedWriter;
use crate::connection::ByteStream;
use crate::error::{Error, Result};

/// Upper bound on a single chunk handed to the transport.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Depth of the producer → consumer channel; bounds pipeline memory and
/// gives the producer backpressure when the network is slow.
const PIPE_DEPTH: usize = 16;

/// Which files of a directory go into the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSelection {
    /// Every file under the directory.
    All,
    /// Files git tracks (minus deleted ones), plus untracked files that
    /// are not ignored.
    GitTracked,
}

/// Produce a gzip-compressed tar stream of `dir` without staging it.
///
/// A dedicated blocking task walks the selection and feeds chunks of at
/// most [`DEFAULT_CHUNK_SIZE`] bytes through a bounded channel; the
/// returned stream is the read end. Dropping the stream makes the
/// producer's next write fail with a broken pipe, stopping the walk
/// promptly. Must be called within a tokio runtime.
pub fn archive_stream(dir: impl Into<PathBuf>, selection: FileSelection) -> ByteStream {
    let dir = dir.into();
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(PIPE_DEPTH);

    task::spawn_blocking(move || {
        debug!(dir = %dir.display(), ?selection, "packing artifact");
        let sink = BoundedWriter::new(ChannelWriter { tx: tx.clone() }, DEFAULT_CHUNK_SIZE);

        if let Err(err) = pack_into(&dir, selection, sink) {
            warn!(dir = %dir.display(), %err, "artifact producer failed");
            // Close the pipe with the error; a send failure here means the
            // consumer is already gone, which needs no propagation.
            let _ = tx.blocking_send(Err(err));
        }
    });

    ByteStream::from_stream(ReceiverStream::new(rx).map(|chunk| chunk.map_err(Error::Io)))
}

/// Decompress and un-tar a response byte stream directly into `dest`,
/// creating it if needed. The archive never touches the disk whole.
pub async fn extract<S>(stream: S, dest: impl Into<PathBuf>) -> Result<()>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin + 'static,
{
    let dest = dest.into();
    let reader = StreamReader::new(stream.map_err(io::Error::other));
    let bridge = SyncIoBridge::new(reader);

    task::spawn_blocking(move || -> io::Result<()> {
        std::fs::create_dir_all(&dest)?;
        let mut archive = tar::Archive::new(GzDecoder::new(bridge));
        archive.set_preserve_permissions(true);
        archive.unpack(&dest)
    })
    .await
    .map_err(|e| Error::Transport(format!("extract task failed: {e}")))??;

    Ok(())
}

/// Write end of the producer → consumer pipe. Each write becomes one
/// channel message; `blocking_send` supplies the backpressure.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer dropped"))?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn pack_into(dir: &Path, selection: FileSelection, sink: impl Write) -> io::Result<()> {
    let encoder = GzEncoder::new(sink, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    match selection {
        FileSelection::All => builder.append_dir_all(".", dir)?,
        FileSelection::GitTracked => {
            for relative in git_files(dir)? {
                builder.append_path_with_name(dir.join(&relative), &relative)?;
            }
        }
    }

    // Finish the tar, then the gzip trailer, before the pipe's write end
    // drops; closing the pipe first would truncate the trailer and leave
    // an archive that fails to decompress.
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Tracked files minus deleted ones, plus non-ignored untracked files.
fn git_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let tracked = git_ls_files(dir, &[])?;
    let deleted = git_ls_files(dir, &["--deleted"])?;
    let untracked = git_ls_files(dir, &["--others", "--exclude-standard"])?;

    let mut files: Vec<PathBuf> = tracked
        .into_iter()
        .filter(|path| !deleted.contains(path))
        .collect();
    files.extend(untracked);
    Ok(files)
}

fn git_ls_files(dir: &Path, flags: &[&str]) -> io::Result<Vec<PathBuf>> {
    let output = Command::new("git")
        .arg("ls-files")
        .arg("-z")
        .args(flags)
        .current_dir(dir)
        .output()?;

    if !output.status.success() {
        return Err(io::Error::other(format!(
            "git ls-files failed: {}",
            String::from_utf8_lossy(&output.stderr).trim(),
        )));
    }

    Ok(output
        .stdout
        .split(|byte| *byte == 0)
        .filter(|entry| !entry.is_empty())
        .map(|entry| PathBuf::from(String::from_utf8_lossy(entry).into_owned()))
        .collect())
}
