use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct Task {
    id: String,
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct TodayResponse {
    date: String,
    tasks: Vec<Task>,
    completion_percent: u8,
    fasting_today: bool,
    streak: u32,
}

#[derive(Debug, Deserialize)]
struct HeatmapCell {
    date: String,
    value: u8,
    band: u8,
    applicable: bool,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("ramadan_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/today")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_ramadan_companion"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env_remove("REMOTE_STORE_URL")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn today(client: &Client, server: &TestServer) -> TodayResponse {
    client
        .get(format!("{}/api/today", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn toggle(client: &Client, server: &TestServer, task_id: &str) -> TodayResponse {
    let response = client
        .post(format!("{}/api/tasks/toggle", server.base_url))
        .json(&serde_json::json!({ "task_id": task_id }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

fn completed(view: &TodayResponse, task_id: &str) -> bool {
    view.tasks
        .iter()
        .find(|task| task.id == task_id)
        .map(|task| task.completed)
        .expect("missing task")
}

#[tokio::test]
async fn http_toggle_twice_restores_today() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before = today(&client, &server).await;
    assert_eq!(before.tasks.len(), 8);

    let flipped = toggle(&client, &server, "maghrib").await;
    assert_ne!(completed(&flipped, "maghrib"), completed(&before, "maghrib"));
    assert_ne!(flipped.completion_percent, before.completion_percent);

    let restored = toggle(&client, &server, "maghrib").await;
    assert_eq!(completed(&restored, "maghrib"), completed(&before, "maghrib"));
    assert_eq!(restored.completion_percent, before.completion_percent);
    assert_eq!(restored.date, before.date);
}

#[tokio::test]
async fn http_unknown_task_is_ignored() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before = today(&client, &server).await;
    let after = toggle(&client, &server, "siesta").await;
    assert_eq!(after.completion_percent, before.completion_percent);

    let empty = client
        .post(format!("{}/api/tasks/toggle", server.base_url))
        .json(&serde_json::json!({ "task_id": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_fasting_today_starts_streak() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let marked: TodayResponse = client
        .post(format!("{}/api/fasting", server.base_url))
        .json(&serde_json::json!({ "fasted": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(marked.fasting_today);
    assert!(marked.streak >= 1);

    let cleared: TodayResponse = client
        .post(format!("{}/api/fasting", server.base_url))
        .json(&serde_json::json!({ "fasted": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!cleared.fasting_today);

    let bad = client
        .post(format!("{}/api/fasting", server.base_url))
        .json(&serde_json::json!({ "date": "20-02-2026", "fasted": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_heatmap_ends_today_with_live_value() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let view = today(&client, &server).await;
    let cells: Vec<HeatmapCell> = client
        .get(format!("{}/api/heatmap", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(cells.len(), 30);
    let last = cells.last().unwrap();
    assert_eq!(last.date, view.date);
    assert_eq!(last.value, view.completion_percent);
    assert!(cells.iter().all(|cell| cell.applicable));
    assert!(cells.iter().all(|cell| cell.band <= 4));

    let future: Vec<HeatmapCell> = client
        .get(format!("{}/api/heatmap?start=2999-01-01&days=3", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(future.len(), 3);
    assert!(future.iter().all(|cell| !cell.applicable && cell.value == 0));

    let too_many = client
        .get(format!("{}/api/heatmap?days=0", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(too_many.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_bookmark_round_trip_and_validation() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let saved = client
        .put(format!("{}/api/bookmark", server.base_url))
        .json(&serde_json::json!({
            "surahId": 18, "ayahNumber": 10, "surahName": "Al-Kahf", "totalAyahs": 110
        }))
        .send()
        .await
        .unwrap();
    assert!(saved.status().is_success());

    let loaded: serde_json::Value = client
        .get(format!("{}/api/bookmark", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(loaded["surahName"], "Al-Kahf");
    assert_eq!(loaded["ayahNumber"], 10);
    assert_eq!(loaded["progressPercent"], 9);

    let invalid = client
        .put(format!("{}/api/bookmark", server.base_url))
        .json(&serde_json::json!({ "surahId": 200, "ayahNumber": 1, "surahName": "?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_session_requires_remote_store() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/session", server.base_url))
        .json(&serde_json::json!({ "user_id": "someone" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn http_index_lists_checklist() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let html = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Daily Checklist"));
    assert!(html.contains("/tasks/tarawih/toggle"));
}
