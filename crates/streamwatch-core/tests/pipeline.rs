use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use streamwatch_core::{
    CheckError, Delivery, Frame, FrameSampler, HttpChecker, LinkOutcome, LivenessCheck, Monitor,
    MonitorConfig, Notifier, SampleError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIVE_URL: &str = "https://cdn.example.com/live/index.m3u8";
const GONE_URL: &str = "https://cdn.example.com/gone/index.m3u8";
const SLOW_URL: &str = "https://slow.example.com/live.m3u8";
const BLACK_URL: &str = "https://cdn.example.com/black/index.m3u8";
const BROKEN_URL: &str = "https://cdn.example.com/broken/index.m3u8";

enum Answer {
    Status(u16),
    Timeout,
}

struct ScriptedChecker {
    answers: HashMap<&'static str, Answer>,
}

#[async_trait]
impl LivenessCheck for ScriptedChecker {
    async fn fetch_status(&self, url: &str) -> Result<u16, CheckError> {
        match self.answers.get(url) {
            Some(Answer::Status(code)) => Ok(*code),
            Some(Answer::Timeout) => Err(CheckError::Timeout {
                url: url.to_string(),
                reason: "operation timed out".into(),
            }),
            None => panic!("ScriptedChecker: unexpected URL: {}", url),
        }
    }
}

#[derive(Clone, Copy)]
enum Picture {
    Lit,
    Black,
    Undecodable,
}

#[derive(Default)]
struct ScriptedSampler {
    pictures: HashMap<&'static str, Picture>,
    grabs: Mutex<Vec<(String, Duration)>>,
}

#[async_trait]
impl FrameSampler for ScriptedSampler {
    async fn grab(&self, url: &str, position: Duration) -> Result<Frame, SampleError> {
        self.grabs.lock().unwrap().push((url.to_string(), position));
        match self.pictures.get(url).copied() {
            Some(Picture::Lit) => Ok(Frame::from_rgb(8, 8, vec![120; 8 * 8 * 3]).unwrap()),
            Some(Picture::Black) => Ok(Frame::from_rgb(8, 8, vec![0; 8 * 8 * 3]).unwrap()),
            Some(Picture::Undecodable) | None => Err(SampleError::Decode {
                url: url.to_string(),
                reason: "no frame".into(),
            }),
        }
    }
}

#[derive(Default)]
struct Inbox {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl Notifier for Inbox {
    async fn send(&self, message: &str) -> Delivery {
        self.messages.lock().unwrap().push(message.to_string());
        if self.fail {
            Delivery::Failed {
                reason: "chat not found".into(),
            }
        } else {
            Delivery::Sent
        }
    }
}

struct Harness {
    monitor: Monitor,
    sampler: Arc<ScriptedSampler>,
    inbox: Arc<Inbox>,
    _dir: tempfile::TempDir,
    output: std::path::PathBuf,
}

fn harness(inbox: Inbox) -> Harness {
    let checker = ScriptedChecker {
        answers: HashMap::from([
            (LIVE_URL, Answer::Status(200)),
            (GONE_URL, Answer::Status(404)),
            (SLOW_URL, Answer::Timeout),
            (BLACK_URL, Answer::Status(200)),
            (BROKEN_URL, Answer::Status(200)),
        ]),
    };
    let sampler = Arc::new(ScriptedSampler {
        pictures: HashMap::from([
            (LIVE_URL, Picture::Lit),
            (BLACK_URL, Picture::Black),
            (BROKEN_URL, Picture::Undecodable),
        ]),
        ..Default::default()
    });
    let inbox = Arc::new(inbox);
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("screenshot.png");
    let config = MonitorConfig::default()
        .with_frame_position_ms(2000)
        .with_output_path(&output);

    let monitor = Monitor::new(
        Arc::new(checker),
        sampler.clone(),
        inbox.clone(),
        config,
    );
    Harness {
        monitor,
        sampler,
        inbox,
        _dir: dir,
        output,
    }
}

fn messages(h: &Harness) -> Vec<String> {
    h.inbox.messages.lock().unwrap().clone()
}

#[tokio::test]
async fn healthy_link_sends_nothing_and_writes_frame() {
    let h = harness(Inbox::default());
    let report = h.monitor.check_link(LIVE_URL).await;

    assert_eq!(report.outcome, LinkOutcome::Healthy);
    assert!(messages(&h).is_empty());
    assert!(h.output.exists());

    let grabs = h.sampler.grabs.lock().unwrap();
    assert_eq!(grabs.as_slice(), [(LIVE_URL.to_string(), Duration::from_millis(2000))]);
}

#[tokio::test]
async fn not_found_notifies_once_and_skips_capture() {
    let h = harness(Inbox::default());
    let report = h.monitor.check_link(GONE_URL).await;

    assert_eq!(report.outcome, LinkOutcome::BadStatus { status: Some(404) });
    let msgs = messages(&h);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].contains(GONE_URL));
    assert!(msgs[0].contains("404"));
    assert!(h.sampler.grabs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn timeout_is_reported_by_checker_then_as_bad_status() {
    let h = harness(Inbox::default());
    let report = h.monitor.check_link(SLOW_URL).await;

    assert_eq!(report.outcome, LinkOutcome::BadStatus { status: None });
    let msgs = messages(&h);
    let timeouts: Vec<_> = msgs.iter().filter(|m| m.contains("timed out")).collect();
    assert_eq!(timeouts.len(), 1, "{:?}", msgs);
    assert!(timeouts[0].contains(SLOW_URL));
    assert_eq!(msgs.last().unwrap(), &format!("Invalid status code (None) for {}", SLOW_URL));
    assert!(h.sampler.grabs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn black_frame_reports_invalid_image_without_writing() {
    let h = harness(Inbox::default());
    let report = h.monitor.check_link(BLACK_URL).await;

    assert!(matches!(report.outcome, LinkOutcome::InvalidImage { .. }));
    let msgs = messages(&h);
    let invalid: Vec<_> = msgs.iter().filter(|m| m.contains("image is invalid")).collect();
    assert_eq!(invalid.len(), 1, "{:?}", msgs);
    assert!(invalid[0].contains(BLACK_URL));
    assert!(msgs.iter().any(|m| m.contains("empty or black")));
    assert!(!h.output.exists());
}

#[tokio::test]
async fn decode_failure_reports_invalid_image() {
    let h = harness(Inbox::default());
    let report = h.monitor.check_link(BROKEN_URL).await;

    match report.outcome {
        LinkOutcome::InvalidImage { reason } => assert!(reason.contains("no frame"), "{}", reason),
        other => panic!("unexpected outcome {:?}", other),
    }
    let msgs = messages(&h);
    assert_eq!(
        msgs,
        vec![
            format!("Unable to capture a frame for video: {}", BROKEN_URL),
            format!("Link {} is reachable, but the image is invalid.", BROKEN_URL),
        ]
    );
}

#[tokio::test]
async fn run_keeps_playlist_order_and_continues_past_failures() {
    let h = harness(Inbox::default());
    let links = [GONE_URL, LIVE_URL, SLOW_URL, BLACK_URL, LIVE_URL];
    let report = h.monitor.run(&links).await;

    let urls: Vec<&str> = report.links.iter().map(|l| l.url.as_str()).collect();
    assert_eq!(urls, links);
    assert_eq!(report.healthy_count(), 2);
    assert_eq!(report.failed_count(), 3);
    assert!(report.finished_at >= report.started_at);
}

#[tokio::test]
async fn notification_failures_do_not_stop_the_run() {
    let h = harness(Inbox {
        fail: true,
        ..Default::default()
    });
    let report = h.monitor.run(&[GONE_URL, LIVE_URL]).await;

    assert_eq!(report.links.len(), 2);
    assert!(report.links[1].outcome.is_healthy());
    assert_eq!(messages(&h).len(), 1);
}

#[tokio::test]
async fn run_playlist_reads_links_from_file() {
    let h = harness(Inbox::default());
    let dir = tempfile::tempdir().unwrap();
    let playlist = dir.path().join("main.m3u");
    std::fs::write(
        &playlist,
        format!("#EXTM3U\n#EXTINF:-1,Live\n{}\n\n#EXTINF:-1,Gone\n  {}  \n", LIVE_URL, GONE_URL),
    )
    .unwrap();

    let report = h.monitor.run_playlist(&playlist).await.unwrap();
    assert_eq!(report.links.len(), 2);
    assert!(report.links[0].outcome.is_healthy());
    assert_eq!(report.links[1].outcome, LinkOutcome::BadStatus { status: Some(404) });
}

#[tokio::test]
async fn run_playlist_fails_on_missing_file() {
    let h = harness(Inbox::default());
    let dir = tempfile::tempdir().unwrap();
    let err = h
        .monitor
        .run_playlist(&dir.path().join("absent.m3u"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("absent.m3u"));
    assert!(messages(&h).is_empty());
}

#[tokio::test]
async fn report_serializes_outcomes_inline() {
    let h = harness(Inbox::default());
    let report = h.monitor.run(&[GONE_URL]).await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["links"][0]["url"], GONE_URL);
    assert_eq!(json["links"][0]["outcome"], "bad_status");
    assert_eq!(json["links"][0]["status"], 404);
}

#[tokio::test]
async fn redirected_link_is_a_bad_status() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/moved.m3u8"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/live.m3u8", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/live.m3u8"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sampler = Arc::new(ScriptedSampler::default());
    let inbox = Arc::new(Inbox::default());
    let dir = tempfile::tempdir().unwrap();
    let monitor = Monitor::new(
        Arc::new(HttpChecker::new(Duration::from_secs(2))),
        sampler.clone(),
        inbox.clone(),
        MonitorConfig::default().with_output_path(dir.path().join("shot.png")),
    );

    let url = format!("{}/moved.m3u8", server.uri());
    let report = monitor.check_link(&url).await;

    assert_eq!(report.outcome, LinkOutcome::BadStatus { status: Some(302) });
    assert_eq!(
        inbox.messages.lock().unwrap().as_slice(),
        [format!("Invalid status code (302) for {}", url)]
    );
    assert!(sampler.grabs.lock().unwrap().is_empty());
}
