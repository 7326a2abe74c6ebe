use std::sync::Arc;

use crate::downloader::TakeoutDownloader;
use crate::downloader::test_helpers::{
    MockFetcher, failure_output, success_into, test_config, track_with_id, vid, watch_url,
};
use crate::types::{Playlist, Track};

const ID_1: &str = "aaaaaaaaaa1";
const ID_2: &str = "bbbbbbbbbb2";
const ID_3: &str = "cccccccccc3";

fn playlist(name: &str, ids: &[&str]) -> Playlist {
    Playlist {
        name: name.to_string(),
        tracks: ids.iter().map(|id| track_with_id(id)).collect(),
    }
}

// -----------------------------------------------------------------------
// partitioning against the dedup index
// -----------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn already_indexed_tracks_are_skipped_with_paths_retained() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("library");
    let fetcher = Arc::new(MockFetcher::always_succeeding(&out));
    let mut downloader =
        TakeoutDownloader::with_fetcher(test_config(dir.path(), &out), fetcher.clone());

    let existing = out.join(format!("Pre [{ID_2}].m4a"));
    assert!(downloader.index.record(vid(ID_2), existing.clone()));

    let summary = downloader
        .process_playlist(&playlist("Mix", &[ID_1, ID_2, ID_3]))
        .await;

    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.files.len(), 3);
    assert!(summary.files.contains(&existing));
    // Executor invoked for tracks 1 and 3 only.
    assert_eq!(fetcher.fetch_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn repeated_identifiers_across_playlists_download_once() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("library");
    let fetcher = Arc::new(MockFetcher::always_succeeding(&out));
    let mut downloader =
        TakeoutDownloader::with_fetcher(test_config(dir.path(), &out), fetcher.clone());

    // 6 tracks across two playlists, 2 identifiers repeated: N - K = 4.
    let first = downloader.process_playlist(&playlist("One", &[ID_1, ID_2, ID_3])).await;
    let second = downloader.process_playlist(&playlist("Two", &[ID_2, ID_3, "dddddddddd4"])).await;

    assert_eq!(first.downloaded, 3);
    assert_eq!(second.downloaded, 1);
    assert_eq!(second.skipped, 2);
    assert_eq!(fetcher.fetch_count(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_identifier_within_a_playlist_is_submitted_once() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("library");
    let fetcher = Arc::new(MockFetcher::always_succeeding(&out));
    let mut downloader =
        TakeoutDownloader::with_fetcher(test_config(dir.path(), &out), fetcher.clone());

    let summary = downloader
        .process_playlist(&playlist("Echo", &[ID_1, ID_1, ID_1]))
        .await;

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(fetcher.fetch_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unresolvable_tracks_are_dropped_silently() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("library");
    let fetcher = Arc::new(MockFetcher::always_succeeding(&out));
    let mut downloader =
        TakeoutDownloader::with_fetcher(test_config(dir.path(), &out), fetcher.clone());

    let mut list = playlist("Holes", &[ID_1]);
    list.tracks.push(Track {
        title: Some("nothing to go on".to_string()),
        url: None,
        video_id: None,
        source: None,
    });

    let summary = downloader.process_playlist(&list).await;
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(fetcher.fetch_count(), 1);
}

// -----------------------------------------------------------------------
// outcome aggregation
// -----------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failures_are_attributed_to_the_original_url() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("library");
    let out_clone = out.clone();
    let bad = watch_url(ID_2);
    let fetcher = Arc::new(MockFetcher::new(move |request| {
        if request.url == bad {
            Ok(failure_output("ERROR: Private video"))
        } else {
            Ok(success_into(&out_clone, &request.url))
        }
    }));
    let mut downloader =
        TakeoutDownloader::with_fetcher(test_config(dir.path(), &out), fetcher.clone());

    let summary = downloader
        .process_playlist(&playlist("Mixed", &[ID_1, ID_2, ID_3]))
        .await;

    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_urls, vec![watch_url(ID_2)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn successful_outcomes_land_in_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("library");
    let fetcher = Arc::new(MockFetcher::always_succeeding(&out));
    let mut downloader =
        TakeoutDownloader::with_fetcher(test_config(dir.path(), &out), fetcher.clone());

    downloader.process_playlist(&playlist("Seed", &[ID_1])).await;
    assert!(downloader.index.contains(&vid(ID_1)));
    assert_eq!(downloader.indexed(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn playlist_reference_lists_every_file_in_filename_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("library");
    std::fs::create_dir_all(&out).unwrap();
    let fetcher = Arc::new(MockFetcher::always_succeeding(&out));
    let mut config = test_config(dir.path(), &out);
    config.download.write_playlist_files = true;
    let mut downloader = TakeoutDownloader::with_fetcher(config, fetcher.clone());

    let existing = out.join(format!("Pre [{ID_2}].m4a"));
    assert!(downloader.index.record(vid(ID_2), existing));

    downloader
        .process_playlist(&playlist("Road Trip", &[ID_1, ID_2, ID_3]))
        .await;

    let artifact = out.join("_playlists/Road Trip.m3u8");
    let content = std::fs::read_to_string(&artifact).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(lines.len(), 4, "marker plus all three paths");
    // Case-insensitive filename order: the two downloads sort before "Pre".
    assert_eq!(lines[1], format!("{ID_1} [{ID_1}].m4a"));
    assert_eq!(lines[2], format!("{ID_3} [{ID_3}].m4a"));
    assert_eq!(lines[3], format!("Pre [{ID_2}].m4a"));
}
