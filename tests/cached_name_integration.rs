use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;

use cached_name::checksum::Checksum;
use cached_name::remote::{CurlHeaderFetcher, HttpHeaderFetcher};
use cached_name::task::MiniTask;
use cached_name::{
    identify, CacheNameError, CacheNamer, FileDescriptor, NamerConfig,
};
use tempdir::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Answers a single HTTP request with `response` and returns a URL on it.
async fn serve_once(response: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });
    format!("http://{}/reads.fq.gz", address)
}

/// Answers every request on every connection with `response`, keeping
/// connections open, and returns the base URL of the server.
fn serve_keep_alive(response: &'static str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => return,
            };
            thread::spawn(move || {
                let mut pending = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    match stream.read(&mut chunk) {
                        Ok(0) | Err(_) => return,
                        Ok(n) => pending.extend_from_slice(&chunk[..n]),
                    }
                    while let Some(end) =
                        pending.windows(4).position(|w| w == b"\r\n\r\n")
                    {
                        pending.drain(..end + 4);
                        if stream.write_all(response.as_bytes()).is_err() {
                            return;
                        }
                    }
                }
            });
        }
    });
    format!("http://{}", address)
}

fn http_namer() -> CacheNamer {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let config = NamerConfig {
        fetch_timeout_secs: 10,
        ..Default::default()
    };
    CacheNamer::with_fetcher(
        &config,
        Arc::new(HttpHeaderFetcher::with_client(client)),
    )
    .unwrap()
}

#[tokio::test]
async fn url_with_etag_is_named_from_url_and_etag() {
    init_logging();
    let url = serve_once(
        "HTTP/1.1 200 OK\r\n\
         Content-Length: 11\r\n\
         Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT\r\n\
         ETag: \"5e8f-1a2b\"\r\n\
         Connection: close\r\n\r\n",
    )
    .await;

    let file = FileDescriptor::url(url.clone());
    let name = http_namer().assign(&file).await.unwrap();

    let expected =
        Checksum::from_bytes(format!("{}-\"5e8f-1a2b\"", url).as_bytes());
    assert_eq!(name.as_str(), format!("url-md5-et-{}", expected));
}

#[test]
fn blocking_assignments_reuse_pooled_connections() {
    init_logging();
    let base = serve_keep_alive(
        "HTTP/1.1 200 OK\r\n\
         ETag: \"v1\"\r\n\
         Content-Length: 0\r\n\r\n",
    );
    let namer = http_namer();

    for path in ["a", "b", "c"] {
        let url = format!("{}/{}", base, path);
        let name = namer.assign_blocking(&FileDescriptor::url(&url)).unwrap();
        let expected =
            Checksum::from_bytes(format!("{}-\"v1\"", url).as_bytes());
        assert_eq!(name.as_str(), format!("url-md5-et-{}", expected));
    }
}

#[tokio::test]
async fn url_with_content_md5_is_named_from_checksum_only() {
    init_logging();
    let url = serve_once(
        "HTTP/1.1 200 OK\r\n\
         ETag: \"5e8f-1a2b\"\r\n\
         Content-MD5: hello\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\r\n",
    )
    .await;

    let name = http_namer()
        .generate(&FileDescriptor::url(url))
        .await
        .unwrap();
    assert_eq!(name.as_str(), format!("url-md5-content-{}", HELLO_MD5));
}

#[tokio::test]
async fn missing_url_is_named_from_url_alone() {
    init_logging();
    let url = serve_once(
        "HTTP/1.1 404 Not Found\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\r\n",
    )
    .await;

    let name = http_namer()
        .generate(&FileDescriptor::url(url.clone()))
        .await
        .unwrap();
    assert_eq!(
        name.as_str(),
        format!("url-md5-url-{}", Checksum::from_bytes(url.as_bytes()))
    );
}

#[tokio::test]
async fn missing_curl_aborts_naming() {
    init_logging();
    let namer = CacheNamer::with_fetcher(
        &NamerConfig::default(),
        Arc::new(CurlHeaderFetcher::new("/nonexistent/bin/curl")),
    )
    .unwrap();
    let file = FileDescriptor::url("https://example.org/reads.fq.gz");

    assert!(matches!(
        namer.assign(&file).await,
        Err(CacheNameError::FetcherUnavailable(_))
    ));
    assert!(matches!(
        identify(&file),
        Err(CacheNameError::NameNotAssigned(_))
    ));
}

#[tokio::test]
async fn file_url_and_local_path_share_content_name() {
    init_logging();
    let dir = TempDir::new("shared-fs").unwrap();
    let path = dir.path().join("ref.fa");
    fs::write(&path, b">chr1\nACGT\n").unwrap();

    let namer = CacheNamer::with_fetcher(
        &NamerConfig::default(),
        Arc::new(CurlHeaderFetcher::new("/nonexistent/bin/curl")),
    )
    .unwrap();
    let by_url = namer
        .generate(&FileDescriptor::url(format!("file://{}", path.display())))
        .await
        .unwrap();
    let by_path = namer
        .generate(&FileDescriptor::local(&path))
        .await
        .unwrap();

    let content = Checksum::from_bytes(b">chr1\nACGT\n");
    assert_eq!(
        by_url.as_str(),
        format!(
            "url-md5-content-{}",
            Checksum::from_bytes(content.as_str().as_bytes())
        )
    );
    assert_eq!(by_path.as_str(), format!("file-md5-{}", content));
}

#[tokio::test]
async fn workflow_inputs_are_named_and_identified() {
    init_logging();
    let dir = TempDir::new("workflow").unwrap();
    let inputs = dir.path().join("inputs");
    fs::create_dir_all(inputs.join("chunks")).unwrap();
    fs::write(inputs.join("chunks/0.txt"), b"alpha").unwrap();
    fs::write(inputs.join("chunks/1.txt"), b"beta").unwrap();
    fs::write(inputs.join("params.txt"), b"hello").unwrap();
    let empty_a = dir.path().join("empty-a");
    let empty_b = dir.path().join("empty-b");
    fs::create_dir(&empty_a).unwrap();
    fs::create_dir(&empty_b).unwrap();

    let unpack = Arc::new(
        MiniTask::new("tar xzf bundle.tgz")
            .with_input("bundle.tgz", inputs.display().to_string())
            .with_output("bundle", "bundle"),
    );

    let files = vec![
        FileDescriptor::local(inputs.join("params.txt")),
        FileDescriptor::buffer("hello"),
        FileDescriptor::local(&inputs),
        FileDescriptor::local(inputs.join("chunks")),
        FileDescriptor::empty_dir(),
        FileDescriptor::empty_dir(),
        FileDescriptor::mini_task(unpack.clone(), "bundle"),
        FileDescriptor::mini_task(unpack, "bundle/README"),
        FileDescriptor::temp(),
        FileDescriptor::temp(),
        FileDescriptor::local(dir.path().join("not-produced-yet.txt")),
    ];

    let config = NamerConfig {
        max_concurrent_names: 3,
        ..Default::default()
    };
    let namer = CacheNamer::with_fetcher(
        &config,
        Arc::new(CurlHeaderFetcher::new("/nonexistent/bin/curl")),
    )
    .unwrap();
    namer.assign_all(&files).await.unwrap();

    let names: Vec<&str> = files
        .iter()
        .map(|file| file.cached_name().unwrap().as_str())
        .collect();

    assert_eq!(names[0], format!("file-md5-{}", HELLO_MD5));
    assert_eq!(names[1], format!("buffer-md5-{}", HELLO_MD5));
    assert!(names[2].starts_with("file-md5-"));
    assert_ne!(names[2], names[3]);
    assert_eq!(names[4], "empty");
    assert_eq!(names[5], "empty");
    assert!(names[6].starts_with("task-md5-"));
    assert_ne!(names[6], names[7]);
    assert!(names[8].starts_with("temp-rnd-"));
    assert_ne!(names[8], names[9]);
    assert!(names[10].starts_with("file-rnd-"));
    assert_eq!(names[10].len(), "file-rnd-".len() + 16);

    assert_eq!(files[2].cached_name().unwrap().total_size(), Some(14));

    // Empty directories share a cache entry but not an identity.
    let ids: HashSet<String> = files
        .iter()
        .map(|file| identify(file).unwrap())
        .collect();
    assert_eq!(ids.len(), files.len() - 1);
}
