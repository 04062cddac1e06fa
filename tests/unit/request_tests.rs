//! Unit tests for request decoding and log push encoding.

use dyntask::models::ChangeCategory;
use dyntask::protocol::request::{encode_log, MAX_LOG_LINES};
use dyntask::protocol::{LogLevel, Request, Scope};
use dyntask::AppError;

#[test]
fn full_request_vocabulary_parses() {
    let cases = [
        ("all", Request::All(Scope::Combined)),
        ("all modified", Request::All(Scope::Only(ChangeCategory::Modified))),
        ("all added", Request::All(Scope::Only(ChangeCategory::Added))),
        ("all removed", Request::All(Scope::Only(ChangeCategory::Removed))),
        ("all unchanged", Request::All(Scope::Only(ChangeCategory::Unchanged))),
        ("next", Request::Next(Scope::Combined)),
        ("next modified", Request::Next(Scope::Only(ChangeCategory::Modified))),
        ("next added", Request::Next(Scope::Only(ChangeCategory::Added))),
        ("next removed", Request::Next(Scope::Only(ChangeCategory::Removed))),
        ("next unchanged", Request::Next(Scope::Only(ChangeCategory::Unchanged))),
        ("trace", Request::Log { level: LogLevel::Trace, lines: 1 }),
        ("info 3", Request::Log { level: LogLevel::Info, lines: 3 }),
        ("warn 2", Request::Log { level: LogLevel::Warn, lines: 2 }),
        ("error 1", Request::Log { level: LogLevel::Error, lines: 1 }),
    ];
    for (line, expected) in cases {
        assert_eq!(Request::parse(line).unwrap(), expected, "line: {line}");
        assert_eq!(Request::parse(&expected.to_line()).unwrap(), expected);
    }
}

#[test]
fn unknown_command_is_protocol_error() {
    match Request::parse("fetch added") {
        Err(AppError::Protocol(msg)) => assert!(msg.contains("unknown command"), "got: {msg}"),
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[test]
fn unknown_category_is_protocol_error() {
    match Request::parse("next deleted") {
        Err(AppError::Protocol(msg)) => assert!(msg.contains("unknown category"), "got: {msg}"),
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[test]
fn blank_line_is_protocol_error() {
    assert!(matches!(Request::parse(""), Err(AppError::Protocol(_))));
}

#[test]
fn malformed_line_counts_are_rejected() {
    for line in ["warn two", "info 0", "error -1"] {
        match Request::parse(line) {
            Err(AppError::Protocol(msg)) => {
                assert!(msg.contains("invalid log line count"), "got: {msg}");
            }
            other => panic!("expected protocol error for {line}, got {other:?}"),
        }
    }
}

#[test]
fn line_count_is_bounded() {
    assert_eq!(
        Request::parse(&format!("info {MAX_LOG_LINES}")).unwrap(),
        Request::Log {
            level: LogLevel::Info,
            lines: MAX_LOG_LINES,
        }
    );
    for count in [MAX_LOG_LINES + 1, usize::MAX] {
        assert!(matches!(
            Request::parse(&format!("info {count}")),
            Err(AppError::Protocol(_))
        ));
    }
    assert!(matches!(
        Request::parse("info 99999999999999999999999"),
        Err(AppError::Protocol(_))
    ));
}

#[test]
fn trailing_tokens_are_ignored() {
    assert_eq!(
        Request::parse("next added please").unwrap(),
        Request::Next(Scope::Only(ChangeCategory::Added))
    );
}

#[test]
fn single_line_log_omits_count() {
    assert_eq!(encode_log(LogLevel::Info, "done"), vec!["info", "done"]);
}

#[test]
fn multi_line_log_carries_count_and_blank_lines() {
    assert_eq!(
        encode_log(LogLevel::Warn, "disk low\n\nretrying"),
        vec!["warn 3", "disk low", "", "retrying"]
    );
}
