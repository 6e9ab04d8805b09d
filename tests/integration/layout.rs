//! Integration tests for the data folder layout

use nse_data_downloader::fetcher::{Category, ResourceRequest};
use nse_data_downloader::output::DataLayout;
use nse_data_downloader::DateKey;
use tempfile::TempDir;

#[test]
fn test_ensure_creates_all_category_folders() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path().join("NSE-Data"));

    layout.ensure().unwrap();

    for folder in ["stocks", "indices", "ma", "broad"] {
        assert!(dir.path().join("NSE-Data").join(folder).is_dir(), "{folder} missing");
    }
}

#[test]
fn test_ensure_keeps_existing_files() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.ensure().unwrap();

    let existing = dir.path().join("stocks").join("14032024.csv");
    std::fs::write(&existing, b"SYMBOL\n").unwrap();
    layout.ensure().unwrap();

    assert_eq!(std::fs::read(&existing).unwrap(), b"SYMBOL\n");
}

#[tokio::test]
async fn test_concurrent_ensure_calls_all_succeed() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("NSE-Data");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let layout = DataLayout::new(&root);
            tokio::task::spawn_blocking(move || layout.ensure())
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[test]
fn test_destination_matches_category_folder() {
    let layout = DataLayout::new("NSE-Data");
    let date = DateKey::parse("15032024").unwrap();

    for request in ResourceRequest::for_date(&date) {
        let destination = layout.destination(&request);
        assert!(destination.starts_with(layout.category_dir(request.category())));
        assert!(destination.ends_with("15032024.csv"));
    }
    assert_eq!(
        layout.destination(&ResourceRequest::reference()),
        layout.category_dir(Category::Reference).join("nifty50list.csv")
    );
}
