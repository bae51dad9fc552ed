//! Integration tests for the artifact streaming pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use futures::StreamExt;
use hoist_client::{archive_stream, extract, ByteStream, Client, Error, FileSelection};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Recursively collect relative path → contents for regular files, plus
/// the set of directories, so comparisons catch empty files and empty
/// nested directories alike.
fn snapshot(root: &Path) -> (BTreeMap<String, Vec<u8>>, Vec<String>) {
    let mut files = BTreeMap::new();
    let mut dirs = Vec::new();
    walk(root, root, &mut files, &mut dirs);
    dirs.sort();
    (files, dirs)
}

fn walk(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>, dirs: &mut Vec<String>) {
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
        if path.is_dir() {
            dirs.push(relative);
            walk(root, &path, files, dirs);
        } else {
            files.insert(relative, fs::read(&path).unwrap());
        }
    }
}

fn populate_source(root: &Path) {
    fs::create_dir_all(root.join("nested/deeper")).unwrap();
    fs::create_dir_all(root.join("hollow")).unwrap();
    fs::write(root.join("top.txt"), b"top-level contents").unwrap();
    fs::write(root.join("empty.txt"), b"").unwrap();
    fs::write(root.join("nested/mid.txt"), b"middle").unwrap();
    fs::write(root.join("nested/deeper/leaf.bin"), vec![0u8, 1, 2, 255]).unwrap();
}

/// Incompressible bytes, so gzip output tracks input size.
fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x2545F491_4F6CDD1Du64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect()
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

async fn collect(mut stream: ByteStream) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(bytes)
}

#[tokio::test]
async fn pack_then_extract_reproduces_the_directory_byte_for_byte() {
    let source = tempfile::tempdir().unwrap();
    populate_source(source.path());

    let dest = tempfile::tempdir().unwrap();
    let stream = archive_stream(source.path(), FileSelection::All);
    extract(stream, dest.path()).await.unwrap();

    let (source_files, source_dirs) = snapshot(source.path());
    let (dest_files, dest_dirs) = snapshot(dest.path());

    assert_eq!(source_files, dest_files);
    assert_eq!(source_dirs, dest_dirs);
    // Empty file and empty directory both survived.
    assert_eq!(dest_files.get("empty.txt").map(Vec::len), Some(0));
    assert!(dest_dirs.iter().any(|d| d == "hollow"));
}

#[tokio::test]
async fn archive_is_produced_incrementally_in_bounded_chunks() {
    let source = tempfile::tempdir().unwrap();

    fs::write(source.path().join("big.bin"), noise(512 * 1024)).unwrap();

    let mut stream = archive_stream(source.path(), FileSelection::All);
    let mut chunks = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        assert!(chunk.len() <= hoist_client::DEFAULT_CHUNK_SIZE);
        chunks += 1;
    }
    assert!(chunks > 1, "a half-megabyte archive should span many chunks");
}

#[test]
fn producer_stops_once_the_consumer_is_gone() {
    let source = tempfile::tempdir().unwrap();
    // Far more than the channel can buffer, so the producer must block
    // on backpressure until the receiver drop breaks its pipe.
    fs::write(source.path().join("big.bin"), noise(4 * 1024 * 1024)).unwrap();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let mut stream = archive_stream(source.path(), FileSelection::All);
        stream.next().await.unwrap().unwrap();
        drop(stream);
    });

    // Shutdown joins the blocking pool; it only returns promptly if the
    // producer observed the broken pipe and exited.
    let start = Instant::now();
    runtime.shutdown_timeout(Duration::from_secs(10));
    assert!(
        start.elapsed() < Duration::from_secs(10),
        "producer kept running after its consumer was dropped"
    );
}

#[tokio::test]
async fn git_selection_takes_tracked_minus_deleted_plus_untracked() {
    let source = tempfile::tempdir().unwrap();
    let root = source.path();

    git(root, &["init", "-q"]);
    git(root, &["config", "user.email", "ci@example.com"]);
    git(root, &["config", "user.name", "ci"]);

    fs::write(root.join("tracked.txt"), b"tracked").unwrap();
    fs::write(root.join("doomed.txt"), b"doomed").unwrap();
    fs::write(root.join(".gitignore"), b"ignored.txt\n").unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-qm", "seed"]);

    // Deleted-but-still-tracked, untracked, and ignored files.
    fs::remove_file(root.join("doomed.txt")).unwrap();
    fs::write(root.join("untracked.txt"), b"untracked").unwrap();
    fs::write(root.join("ignored.txt"), b"ignored").unwrap();

    let dest = tempfile::tempdir().unwrap();
    let stream = archive_stream(root, FileSelection::GitTracked);
    extract(stream, dest.path()).await.unwrap();

    let (files, _) = snapshot(dest.path());
    assert!(files.contains_key("tracked.txt"));
    assert!(files.contains_key(".gitignore"));
    assert!(files.contains_key("untracked.txt"));
    assert!(!files.contains_key("doomed.txt"));
    assert!(!files.contains_key("ignored.txt"));
}

#[tokio::test]
async fn producer_failure_reaches_the_consumer_as_an_error() {
    let missing = tempfile::tempdir().unwrap().path().join("never-created");

    let stream = archive_stream(missing, FileSelection::All);
    let err = collect(stream).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)), "got {err:?}");
}

#[tokio::test]
async fn extracting_a_failed_stream_fails_rather_than_truncating() {
    let missing = tempfile::tempdir().unwrap().path().join("never-created");
    let dest = tempfile::tempdir().unwrap();

    let stream = archive_stream(missing, FileSelection::All);
    assert!(extract(stream, dest.path()).await.is_err());
}

#[tokio::test]
async fn upload_streams_the_archive_to_the_server() {
    let source = tempfile::tempdir().unwrap();
    populate_source(source.path());

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/teams/main/artifacts"))
        .and(header("content-type", "application/gzip"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 11, "name": "inputs"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder(server.uri()).unwrap().build().unwrap();
    let artifact = client
        .team("main")
        .create_artifact(source.path(), FileSelection::All)
        .await
        .unwrap();
    assert_eq!(artifact.id, 11);
}

#[tokio::test]
async fn download_unpacks_straight_onto_the_filesystem() {
    let source = tempfile::tempdir().unwrap();
    populate_source(source.path());

    // Serve the packed bytes back as the artifact body.
    let body = collect(archive_stream(source.path(), FileSelection::All))
        .await
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/teams/main/artifacts/11"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/gzip"))
        .mount(&server)
        .await;

    let dest = tempfile::tempdir().unwrap();
    let client = Client::builder(server.uri()).unwrap().build().unwrap();
    client
        .team("main")
        .download_artifact(11, dest.path())
        .await
        .unwrap();

    let (source_files, _) = snapshot(source.path());
    let (dest_files, _) = snapshot(dest.path());
    assert_eq!(source_files, dest_files);
}
