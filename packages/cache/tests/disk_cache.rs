use std::sync::Arc;

use pagekit_cache::{
    CacheError, DiskEngine, FileCache, FileRecord, StorageEngine, DIRECTORY_RECORD,
};

#[tokio::test]
async fn disk_collection_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = DiskEngine::new(tmp.path()).unwrap();
    let files = engine.open("files").await.unwrap();

    files
        .put(FileRecord::new("https://cdn.example.com/a.js", "alert(1)"))
        .await
        .unwrap();
    let record = files.get("https://cdn.example.com/a.js").await.unwrap();
    assert_eq!(record.unwrap().content, "alert(1)");
    assert!(files.get("other").await.unwrap().is_none());

    files.delete("https://cdn.example.com/a.js").await.unwrap();
    files.delete("https://cdn.example.com/a.js").await.unwrap();
    assert!(files
        .get("https://cdn.example.com/a.js")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn cache_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();

    {
        let engine = Arc::new(DiskEngine::new(tmp.path()).unwrap());
        let cache = FileCache::new(engine);
        cache.save("https://a.com/x.css", "p{}", None).await.unwrap();
        cache.save("https://a.com/y.js", "y()", None).await.unwrap();
        cache.flush().await.unwrap();
    }

    let engine = Arc::new(DiskEngine::new(tmp.path()).unwrap());
    let cache = FileCache::new(engine.clone());
    assert_eq!(cache.load("https://a.com/x.css").await.unwrap(), "p{}");
    assert!(cache.contains("https://a.com/y.js"));

    let files = engine.open("files").await.unwrap();
    assert!(files.get(DIRECTORY_RECORD).await.unwrap().is_some());
}

#[tokio::test]
async fn clear_removes_files_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(DiskEngine::new(tmp.path()).unwrap());
    let cache = FileCache::new(engine);

    cache.save("a", "1", None).await.unwrap();
    cache.clear().await.unwrap();
    cache.flush().await.unwrap();

    let err = cache.load("a").await.unwrap_err();
    assert!(matches!(err, CacheError::NotCached(_)));

    let names: Vec<_> = std::fs::read_dir(tmp.path().join("files"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["%5Bdir%5D.json".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_of_one_record_all_land() {
    const URL: &str = "https://a.com/m.js";
    let tmp = tempfile::tempdir().unwrap();
    let engine = DiskEngine::new(tmp.path()).unwrap();
    let files = engine.open("files").await.unwrap();

    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let files = files.clone();
            tokio::spawn(async move { files.put(FileRecord::new(URL, format!("v{}", i))).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let record = files.get(URL).await.unwrap().unwrap();
    assert_eq!(record.name, URL);
    assert!(record.content.starts_with('v'));

    let names: Vec<_> = std::fs::read_dir(tmp.path().join("files"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["https%3A%2F%2Fa.com%2Fm.js.json".to_string()]);
}

#[tokio::test]
async fn long_urls_are_cached() {
    let url = format!("https://cdn.example.com/{}?v=1", "x".repeat(300));
    let tmp = tempfile::tempdir().unwrap();

    {
        let engine = Arc::new(DiskEngine::new(tmp.path()).unwrap());
        let cache = FileCache::new(engine);
        cache.save(&url, "long()", None).await.unwrap();
        cache.flush().await.unwrap();
    }

    let engine = Arc::new(DiskEngine::new(tmp.path()).unwrap());
    let cache = FileCache::new(engine);
    assert_eq!(cache.load(&url).await.unwrap(), "long()");

    for entry in std::fs::read_dir(tmp.path().join("files")).unwrap() {
        assert!(entry.unwrap().file_name().len() < 255);
    }

    cache.delete(&url).await.unwrap();
    cache.flush().await.unwrap();
    let count = std::fs::read_dir(tmp.path().join("files")).unwrap().count();
    assert_eq!(count, 1);
}
