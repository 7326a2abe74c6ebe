//! End-to-end tests driving the real `YtDlpFetcher` through a scripted
//! stand-in for the extraction tool.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use takeout_dl::{Config, TakeoutDownloader};

const ID_1: &str = "aaaaaaaaaa1";
const ID_2: &str = "bbbbbbbbbb2";
const ID_3: &str = "cccccccccc3";

/// Write an executable stub tool script
fn write_stub(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("stub-tool");
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Stub that "downloads" every URL: creates `<id> [<id>].m4a` under the
/// library root and prints its path, like the real tool's filename print.
fn succeeding_stub(library: &Path) -> String {
    format!(
        r#"#!/bin/sh
url=""
for a in "$@"; do url="$a"; done
id="${{url##*v=}}"
out="{lib}/$id [$id].m4a"
mkdir -p "{lib}"
printf 'audio-bytes' > "$out"
printf '%s\n' "$out"
exit 0
"#,
        lib = library.display()
    )
}

/// Stub that fails with a region diagnostic unless invoked with the DE hint
fn region_locked_stub(library: &Path) -> String {
    format!(
        r#"#!/bin/sh
url=""
geo=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--geo-bypass-country" ]; then geo="$a"; fi
  prev="$a"
  url="$a"
done
if [ "$geo" = "DE" ]; then
  id="${{url##*v=}}"
  out="{lib}/$id [$id].m4a"
  mkdir -p "{lib}"
  printf 'audio-bytes' > "$out"
  printf '%s\n' "$out"
  exit 0
fi
echo "ERROR: The uploader has not made this video available in your country (DE, FR)" >&2
exit 1
"#,
        lib = library.display()
    )
}

fn write_playlist_json(dir: &Path, file: &str, name: &str, ids: &[&str]) {
    let tracks: Vec<String> = ids
        .iter()
        .map(|id| format!(r#"{{"title":"Track {id}","videoId":"{id}"}}"#))
        .collect();
    let json = format!(
        r#"{{"type":"playlist","name":"{name}","tracks":[{}]}}"#,
        tracks.join(",")
    );
    fs::write(dir.join(file), json).unwrap();
}

fn config_for(input: &Path, library: &Path, stub: PathBuf) -> Config {
    let mut config = Config::default();
    config.input_root = input.to_path_buf();
    config.download.output_dir = library.to_path_buf();
    config.tools.tool_path = Some(stub);
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn end_to_end_with_skip_and_playlist_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("takeout");
    let library = dir.path().join("library");
    fs::create_dir_all(&input).unwrap();
    fs::create_dir_all(&library).unwrap();

    // Track 2 was materialized by a previous run.
    fs::write(library.join(format!("Track Two [{ID_2}].m4a")), b"old").unwrap();
    write_playlist_json(&input, "mix.json", "Mix", &[ID_1, ID_2, ID_3]);

    let stub = write_stub(dir.path(), &succeeding_stub(&library));
    let mut config = config_for(&input, &library, stub);
    config.download.write_playlist_files = true;

    let mut downloader = TakeoutDownloader::new(config).unwrap();
    let report = downloader.run().await.unwrap();

    assert_eq!(report.downloaded, 2, "tracks 1 and 3 only");
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.exit_code(), 0);
    assert!(library.join(format!("{ID_1} [{ID_1}].m4a")).is_file());
    assert!(library.join(format!("{ID_3} [{ID_3}].m4a")).is_file());

    let artifact = fs::read_to_string(library.join("_playlists/Mix.m3u8")).unwrap();
    let lines: Vec<&str> = artifact.lines().collect();
    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(lines.len(), 4, "marker plus all three paths");
    assert_eq!(lines[1], format!("{ID_1} [{ID_1}].m4a"));
    assert_eq!(lines[2], format!("{ID_3} [{ID_3}].m4a"));
    assert_eq!(lines[3], format!("Track Two [{ID_2}].m4a"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn region_blocked_track_recovers_via_geo_hint() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("takeout");
    let library = dir.path().join("library");
    fs::create_dir_all(&input).unwrap();
    write_playlist_json(&input, "solo.json", "Solo", &[ID_1]);

    let stub = write_stub(dir.path(), &region_locked_stub(&library));
    let mut downloader =
        TakeoutDownloader::new(config_for(&input, &library, stub)).unwrap();
    let report = downloader.run().await.unwrap();

    // First invocation fails region-blocked; the DE hint retry succeeds.
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.failed, 0, "zero net failures");
    assert_eq!(report.exit_code(), 0);
    assert!(library.join(format!("{ID_1} [{ID_1}].m4a")).is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn terminal_failures_produce_the_sidecar_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("takeout");
    let library = dir.path().join("library");
    fs::create_dir_all(&input).unwrap();
    write_playlist_json(&input, "solo.json", "Solo", &[ID_1]);

    let stub = write_stub(
        dir.path(),
        "#!/bin/sh\necho \"ERROR: Video unavailable\" >&2\nexit 1\n",
    );
    let mut downloader =
        TakeoutDownloader::new(config_for(&input, &library, stub)).unwrap();
    let report = downloader.run().await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.exit_code(), 1);
    let sidecar = fs::read_to_string(library.join("failed-downloads.txt")).unwrap();
    assert!(sidecar.contains(ID_1));
}
