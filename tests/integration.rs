use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn hl_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("hl");
    path
}

fn setup_test_env_with_port(port: u16) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Highlight files to upload and import
    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("dune.txt"),
        "Fear is the mind-killer.\n\nThe spice must flow.\n   \nHe who controls the spice controls the universe.\n",
    )
    .unwrap();
    fs::write(files_dir.join("blank.txt"), "\n   \n\n").unwrap();

    let podcast_dir = root.join("backups").join("podcast");
    fs::create_dir_all(&podcast_dir).unwrap();
    fs::write(
        podcast_dir.join("Huberman_Lab_highlights.txt"),
        "Get morning sunlight in your eyes.\nCaffeine timing matters for sleep.\n",
    )
    .unwrap();
    fs::write(
        podcast_dir.join("Tim_Ferriss_Show_highlights.txt"),
        "What would this look like if it were easy?\n",
    )
    .unwrap();
    fs::write(podcast_dir.join("notes.md"), "not imported\n").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/highlights.db"

[server]
bind = "127.0.0.1:{port}"

[retrieval]
random_limit = 3
search_limit = 5

[backup]
dir = "{root}/backups"

[import]
root = "{root}/backups"
"#,
        root = root.display(),
        port = port,
    );

    let config_path = config_dir.join("hl.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn setup_test_env() -> (TempDir, PathBuf) {
    setup_test_env_with_port(8080)
}

fn run_hl(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = hl_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run hl binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn files_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("files")
}

fn add_dune(config_path: &Path) {
    let file = files_dir(config_path).join("dune.txt");
    let (stdout, stderr, success) = run_hl(
        config_path,
        &["add", "--source", "Dune", "--type", "book", file.to_str().unwrap()],
    );
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_hl(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("highlights.db").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_hl(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_hl(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_add_file_writes_highlights_and_backup() {
    let (tmp, config_path) = setup_test_env();

    let file = files_dir(&config_path).join("dune.txt");
    let (stdout, stderr, success) = run_hl(
        &config_path,
        &["add", "--source", "Dune", "--type", "book", file.to_str().unwrap()],
    );
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("highlights written: 3"));

    let backup = tmp
        .path()
        .join("backups")
        .join("book")
        .join("Dune_highlights.txt");
    let content = fs::read_to_string(backup).unwrap();
    assert_eq!(content.lines().count(), 3);

    let (stdout, _, _) = run_hl(&config_path, &["show", "Dune"]);
    assert!(stdout.contains("Fear is the mind-killer."));
    assert!(stdout.contains("--- Dune (3) ---"));
}

#[test]
fn test_add_from_stdin() {
    let (_tmp, config_path) = setup_test_env();

    let mut child = Command::new(hl_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(["add", "--source", "Stdin Book", "--type", "book", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    {
        use std::io::Write;
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"first line\nsecond line\n").unwrap();
    }
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("highlights written: 2"));
}

#[test]
fn test_add_blank_file_errors() {
    let (_tmp, config_path) = setup_test_env();

    let file = files_dir(&config_path).join("blank.txt");
    let (_, stderr, success) = run_hl(
        &config_path,
        &["add", "--source", "Blank", "--type", "book", file.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("no highlights"), "got: {}", stderr);
}

#[test]
fn test_import_folder() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_hl(&config_path, &["import", "podcast"]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files imported: 2"));
    assert!(stdout.contains("files skipped: 1"));
    assert!(stdout.contains("highlights written: 3"));

    let (stdout, _, _) = run_hl(&config_path, &["sources"]);
    assert!(stdout.contains("Huberman Lab"));
    assert!(stdout.contains("Tim Ferriss Show"));
    assert!(stdout.contains("podcast"));
}

#[test]
fn test_import_missing_folder_errors() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_hl(&config_path, &["import", "audiobooks"]);
    assert!(!success);
    assert!(stderr.contains("does not exist"), "got: {}", stderr);
}

#[test]
fn test_search_keyword() {
    let (_tmp, config_path) = setup_test_env();
    add_dune(&config_path);

    let (stdout, stderr, success) = run_hl(&config_path, &["search", "spice"]);
    assert!(success, "search failed: stderr={}", stderr);
    assert!(stdout.contains("1. ["));
    assert!(stdout.contains("Dune"));
    assert!(stdout.contains("[spice]"));
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env();
    add_dune(&config_path);

    let (stdout, _, success) = run_hl(&config_path, &["search", "xyzzyplugh"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_blank_query_errors() {
    let (_tmp, config_path) = setup_test_env();
    add_dune(&config_path);

    let (_, stderr, success) = run_hl(&config_path, &["search", "   "]);
    assert!(!success, "blank search should fail");
    assert!(stderr.contains("empty"), "stderr={}", stderr);
}

#[test]
fn test_search_with_fts_syntax_does_not_fail() {
    let (_tmp, config_path) = setup_test_env();
    add_dune(&config_path);

    let (stdout, stderr, success) = run_hl(&config_path, &["search", "\"spice AND ("]);
    assert!(success, "search failed: stderr={}", stderr);
    assert!(stdout.contains("No results.") || stdout.contains("Dune"));
}

#[test]
fn test_random_respects_limit() {
    let (_tmp, config_path) = setup_test_env();
    add_dune(&config_path);
    run_hl(&config_path, &["import", "podcast"]);

    let (stdout, _, success) = run_hl(&config_path, &["random", "--limit", "2"]);
    assert!(success);
    let entries = stdout.lines().filter(|l| l.starts_with('[')).count();
    assert_eq!(entries, 2);
}

#[test]
fn test_flush_all() {
    let (_tmp, config_path) = setup_test_env();
    add_dune(&config_path);

    let (stdout, stderr, success) = run_hl(&config_path, &["flush", "all"]);
    assert!(success, "flush failed: stderr={}", stderr);
    assert!(stdout.contains("flushed highlights: 3 rows"));
    assert!(stdout.contains("flushed highlights_fts: 3 rows"));

    let (stdout, _, _) = run_hl(&config_path, &["stats"]);
    assert!(stdout.contains("Highlights:  0"));
    assert!(stdout.contains("Indexed:     0"));
}

#[test]
fn test_flush_unknown_table_deletes_nothing() {
    let (_tmp, config_path) = setup_test_env();
    add_dune(&config_path);

    let (_, stderr, success) = run_hl(&config_path, &["flush", "highlights", "sqlite_master"]);
    assert!(!success);
    assert!(stderr.contains("unknown table"), "got: {}", stderr);

    let (stdout, _, _) = run_hl(&config_path, &["stats"]);
    assert!(stdout.contains("Highlights:  3"));
}

#[test]
fn test_flush_requires_a_table() {
    let (_tmp, config_path) = setup_test_env();
    let (_, _, success) = run_hl(&config_path, &["flush"]);
    assert!(!success);
}

// ============ HTTP server ============

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn start_server(config_path: &Path) -> std::process::Child {
    Command::new(hl_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("serve")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to start server: {}", e))
}

/// Wait for the server to be ready by polling the health endpoint.
fn wait_for_server(port: u16) {
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        std::thread::sleep(std::time::Duration::from_millis(100));
        if let Ok(resp) = reqwest::blocking::get(&url) {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

struct TestServer {
    child: std::process::Child,
    base: String,
    _tmp: TempDir,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

fn spawn_server() -> TestServer {
    spawn_server_with(|_| {})
}

/// Like `spawn_server`, but lets the caller edit the config file first.
fn spawn_server_with(customize: impl FnOnce(&Path)) -> TestServer {
    let port = find_free_port();
    let (tmp, config_path) = setup_test_env_with_port(port);
    customize(&config_path);
    run_hl(&config_path, &["init"]);

    let child = start_server(&config_path);
    wait_for_server(port);

    TestServer {
        child,
        base: format!("http://127.0.0.1:{}", port),
        _tmp: tmp,
    }
}

fn upload(server: &TestServer, body: serde_json::Value) -> reqwest::blocking::Response {
    reqwest::blocking::Client::new()
        .post(format!("{}/admin/upload", server.base))
        .json(&body)
        .send()
        .unwrap()
}

#[test]
fn test_server_health() {
    let server = spawn_server();

    let resp = reqwest::blocking::get(format!("{}/health", server.base)).unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[test]
fn test_server_upload_then_browse() {
    let server = spawn_server();

    let resp = upload(
        &server,
        serde_json::json!({
            "source_name": "Meditations",
            "source_type": "book",
            "text": "The impediment to action advances action.\n\nWaste no more time arguing what a good man should be.\n"
        }),
    );
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["source_name"], "Meditations");
    assert!(body["backup_path"]
        .as_str()
        .unwrap()
        .ends_with("Meditations_highlights.txt"));

    let body: serde_json::Value = reqwest::blocking::get(format!("{}/sources", server.base))
        .unwrap()
        .json()
        .unwrap();
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["name"], "Meditations");
    assert_eq!(sources[0]["source_type"], "book");
    assert_eq!(sources[0]["count"], 2);

    let body: serde_json::Value =
        reqwest::blocking::get(format!("{}/source/Meditations", server.base))
            .unwrap()
            .json()
            .unwrap();
    let highlights = body["highlights"].as_array().unwrap();
    assert_eq!(highlights.len(), 2);
    assert_eq!(
        highlights[0]["content"],
        "The impediment to action advances action."
    );
    assert!(highlights[0]["id"].is_i64());

    let body: serde_json::Value = reqwest::blocking::get(format!("{}/random", server.base))
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(body["highlights"].as_array().unwrap().len(), 2);
}

#[test]
fn test_server_source_with_spaces_in_name() {
    let server = spawn_server();
    upload(
        &server,
        serde_json::json!({
            "source_name": "Tim Ferriss Show",
            "source_type": "podcast",
            "text": "What would this look like if it were easy?"
        }),
    );

    let body: serde_json::Value =
        reqwest::blocking::get(format!("{}/source/Tim%20Ferriss%20Show", server.base))
            .unwrap()
            .json()
            .unwrap();
    assert_eq!(body["source"], "Tim Ferriss Show");
    assert_eq!(body["highlights"].as_array().unwrap().len(), 1);
}

#[test]
fn test_server_search() {
    let server = spawn_server();
    upload(
        &server,
        serde_json::json!({
            "source_name": "Dune",
            "source_type": "book",
            "text": "Fear is the mind-killer.\nThe spice must flow.\n"
        }),
    );

    let resp = reqwest::blocking::get(format!("{}/search?q=spice", server.base)).unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["query"], "spice");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);

    let first = &results[0];
    assert_eq!(first["source"], "Dune");
    assert_eq!(first["content"], "The spice must flow.");
    assert!(first["score"].is_f64());
    assert!(first["highlight_id"].is_i64());
    assert!(first["snippet"].as_str().unwrap().contains("[spice]"));
}

#[test]
fn test_server_search_requires_query() {
    let server = spawn_server();

    for url in [
        format!("{}/search", server.base),
        format!("{}/search?q=%20%20", server.base),
    ] {
        let resp = reqwest::blocking::get(&url).unwrap();
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }
}

#[test]
fn test_server_upload_validation() {
    let server = spawn_server();

    let resp = upload(
        &server,
        serde_json::json!({ "source_type": "book", "text": "a line" }),
    );
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("source_name"));

    let resp = upload(
        &server,
        serde_json::json!({ "source_name": "Dune", "source_type": "book", "text": "\n \n" }),
    );
    assert_eq!(resp.status(), 400);

    // Nothing was written by the rejected uploads.
    let body: serde_json::Value = reqwest::blocking::get(format!("{}/sources", server.base))
        .unwrap()
        .json()
        .unwrap();
    assert!(body["sources"].as_array().unwrap().is_empty());
}

fn sources_count(server: &TestServer) -> usize {
    let body: serde_json::Value = reqwest::blocking::get(format!("{}/sources", server.base))
        .unwrap()
        .json()
        .unwrap();
    body["sources"].as_array().unwrap().len()
}

#[test]
fn test_server_blank_source_name_is_bad_request() {
    let server = spawn_server();

    let resp = reqwest::blocking::get(format!("{}/source/", server.base)).unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[test]
fn test_server_malformed_requests_use_error_contract() {
    let server = spawn_server();

    let resp = reqwest::blocking::Client::new()
        .post(format!("{}/admin/upload", server.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp =
        reqwest::blocking::get(format!("{}/search?q=spice&limit=abc", server.base)).unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"].is_string());
}

#[test]
fn test_server_rejects_oversize_upload() {
    let server = spawn_server_with(|config_path| {
        let config = fs::read_to_string(config_path).unwrap();
        let config = config.replace("[server]\n", "[server]\nmax_upload_bytes = 64\n");
        fs::write(config_path, config).unwrap();
    });

    let resp = upload(
        &server,
        serde_json::json!({
            "source_name": "Dune",
            "source_type": "book",
            "text": "The spice must flow. ".repeat(10)
        }),
    );
    assert_eq!(resp.status(), 413);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    assert_eq!(sources_count(&server), 0);

    let resp = upload(
        &server,
        serde_json::json!({ "source_name": "Dune", "source_type": "book", "text": "ok" }),
    );
    assert_eq!(resp.status(), 200);
    assert_eq!(sources_count(&server), 1);
}
