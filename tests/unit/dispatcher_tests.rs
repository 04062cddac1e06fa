//! Unit tests for the primary-stream dispatcher and secondary-stream forwarder.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use dyntask::models::{ChangeCategory, ChangeEntry, ChangeSet};
use dyntask::protocol::request::MAX_LOG_LINES;
use dyntask::protocol::LogLevel;
use dyntask::session::{run_dispatcher, run_forwarder, Session};
use dyntask::sink::LogSink;
use dyntask::transport::{LineReader, LineWriter};

const BUDGET: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingSink {
    fn records(&self) -> Vec<(LogLevel, String)> {
        self.records.lock().unwrap().clone()
    }
}

impl LogSink for RecordingSink {
    fn log(&self, level: LogLevel, message: &str) {
        self.records.lock().unwrap().push((level, message.to_owned()));
    }
}

struct Harness {
    /// Worker's stdout: requests go in here.
    requests: DuplexStream,
    /// Worker's stdin: replies come out here.
    replies: DuplexStream,
    finished: CancellationToken,
    sink: Arc<RecordingSink>,
    task: Option<JoinHandle<dyntask::Result<()>>>,
}

impl Harness {
    fn new() -> Self {
        let (requests, primary) = tokio::io::duplex(4096);
        let (reply_side, replies) = tokio::io::duplex(4096);
        let finished = CancellationToken::new();
        let changes = ChangeSet::new(vec![
            ChangeEntry::new("/w/m1", ChangeCategory::Modified),
            ChangeEntry::new("/w/u1", ChangeCategory::Unchanged),
            ChangeEntry::new("/w/a1", ChangeCategory::Added),
        ]);
        let session = Session::new(
            false,
            PathBuf::from("/w/in"),
            PathBuf::from("/w/out"),
            changes,
            finished.clone(),
        );
        let sink = Arc::new(RecordingSink::default());
        let reader = LineReader::new(primary, finished.clone());
        let writer = LineWriter::new(reply_side);
        Self {
            requests,
            replies,
            finished,
            sink: Arc::clone(&sink),
            task: Some(tokio::spawn(run_dispatcher(session, reader, writer, sink))),
        }
    }

    async fn send(&mut self, raw: &str) {
        self.requests.write_all(raw.as_bytes()).await.unwrap();
    }

    /// Wait for the dispatcher to end and return everything it replied.
    async fn finish(mut self) -> (String, Vec<(LogLevel, String)>) {
        let task = self.task.take().unwrap();
        tokio::time::timeout(BUDGET, task)
            .await
            .expect("dispatcher must end")
            .unwrap()
            .unwrap();
        let mut replies = String::new();
        self.replies.read_to_string(&mut replies).await.unwrap();
        (replies, self.sink.records())
    }

    /// Close the worker's stdout and collect the results.
    async fn close(mut self) -> (String, Vec<(LogLevel, String)>) {
        self.requests.shutdown().await.unwrap();
        self.finish().await
    }
}

#[tokio::test]
async fn data_requests_are_answered_in_arrival_order() {
    let mut harness = Harness::new();
    harness
        .send("next modified\nnext\nall unchanged\nnext removed\n")
        .await;
    let (replies, records) = harness.close().await;

    assert_eq!(replies, "/w/m1\nmod:/w/m1\n/w/u1\n\n");
    assert!(records.is_empty());
}

#[tokio::test]
async fn scenario_c_multi_line_warning_is_one_record() {
    let mut harness = Harness::new();
    harness.send("warn 2\ndisk low\nretrying\n").await;
    let (replies, records) = harness.close().await;

    assert!(replies.is_empty(), "log pushes get no reply");
    assert_eq!(
        records,
        vec![(LogLevel::Warn, "disk low\nretrying".to_owned())]
    );
}

#[tokio::test]
async fn log_block_lines_are_taken_verbatim() {
    let mut harness = Harness::new();
    harness.send("info 3\nnext\n\nall\ntrace\nhello\n").await;
    let (replies, records) = harness.close().await;

    assert!(replies.is_empty(), "request words inside a log block are message text");
    assert_eq!(
        records,
        vec![
            (LogLevel::Info, "next\n\nall".to_owned()),
            (LogLevel::Trace, "hello".to_owned()),
        ]
    );
}

#[tokio::test]
async fn unknown_command_gets_no_reply_and_servicing_continues() {
    let mut harness = Harness::new();
    harness.send("fetch everything\n\nnext added\n").await;
    let (replies, _) = harness.close().await;

    assert_eq!(replies, "/w/a1\n");
}

#[tokio::test]
async fn malformed_line_count_drops_the_push() {
    let mut harness = Harness::new();
    harness.send("error many\nnext added\n").await;
    let (replies, records) = harness.close().await;

    assert_eq!(replies, "/w/a1\n", "the following line is a request again");
    assert!(records.is_empty());
}

#[tokio::test]
async fn oversized_line_count_drops_the_push_and_servicing_continues() {
    let mut harness = Harness::new();
    harness
        .send(&format!(
            "info {}\nhello\ninfo {}\nnext added\n",
            usize::MAX,
            MAX_LOG_LINES + 1
        ))
        .await;
    let (replies, records) = harness.close().await;

    assert_eq!(replies, "/w/a1\n");
    assert!(records.is_empty(), "got {records:?}");
}

#[tokio::test]
async fn truncated_log_block_is_forwarded_partially() {
    let mut harness = Harness::new();
    harness.send("error 3\nonly line\n").await;
    let (_, records) = harness.close().await;

    assert_eq!(records, vec![(LogLevel::Error, "only line".to_owned())]);
}

#[tokio::test]
async fn scenario_d_request_after_worker_exit_is_dropped() {
    let mut harness = Harness::new();
    harness.send("next modified\n").await;
    // Let the first request be served before the exit is signalled.
    let mut first = [0u8; 6];
    harness.replies.read_exact(&mut first).await.unwrap();
    assert_eq!(&first, b"/w/m1\n");

    harness.finished.cancel();
    harness.send("next unchanged\n").await;
    // The worker's stdout stays open; the dispatcher must end on its own.
    let (replies, records) = harness.finish().await;

    assert!(replies.is_empty(), "late request must not be answered");
    assert!(records.is_empty());
}

#[tokio::test]
async fn log_pushes_after_worker_exit_are_still_forwarded() {
    let mut harness = Harness::new();
    harness.send("info\nbye\n").await;
    harness.finished.cancel();
    let (_, records) = harness.close().await;

    assert_eq!(records, vec![(LogLevel::Info, "bye".to_owned())]);
}

#[tokio::test]
async fn forwarder_logs_every_line_at_error_severity() {
    let (mut stderr, secondary) = tokio::io::duplex(256);
    let sink = Arc::new(RecordingSink::default());
    let reader = LineReader::new(secondary, CancellationToken::new());
    let task = tokio::spawn(run_forwarder(reader, Arc::clone(&sink) as Arc<dyn LogSink>));

    stderr
        .write_all(b"Exception in thread main\n\n  at Worker.run\n")
        .await
        .unwrap();
    drop(stderr);
    tokio::time::timeout(BUDGET, task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(
        sink.records(),
        vec![
            (LogLevel::Error, "Exception in thread main".to_owned()),
            (LogLevel::Error, String::new()),
            (LogLevel::Error, "  at Worker.run".to_owned()),
        ]
    );
}
