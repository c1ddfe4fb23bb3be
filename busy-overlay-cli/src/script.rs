//! Request script parsing.
//!
//! A script is a list of timed request events, one per line or separated by
//! commas:
//!
//! ```text
//! # t_ms  source  action    [skip]
//! 0       http    send
//! 600     http    ok
//! 700     ajax    send
//! 900     ajax    complete
//! ```
//!
//! `http` events accept `send`, `ok` and `error`; `ajax` events accept
//! `send` and `complete`. The optional `skip` flag marks the request as
//! excluded from overlay tracking. Everything after `#` is a comment.

use std::fmt;
use std::time::Duration;

use crate::error::CliError;

/// A source/action pair the script accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    HttpSend,
    HttpOk,
    HttpError,
    AjaxSend,
    AjaxComplete,
}

impl EventKind {
    /// Mechanism the event arrives through: `http` or `ajax`.
    pub fn source(self) -> &'static str {
        match self {
            EventKind::HttpSend | EventKind::HttpOk | EventKind::HttpError => "http",
            EventKind::AjaxSend | EventKind::AjaxComplete => "ajax",
        }
    }

    pub fn action(self) -> &'static str {
        match self {
            EventKind::HttpSend | EventKind::AjaxSend => "send",
            EventKind::HttpOk => "ok",
            EventKind::HttpError => "error",
            EventKind::AjaxComplete => "complete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.source(), self.action())
    }
}

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEvent {
    pub at: Duration,
    pub kind: EventKind,
    pub skip: bool,
    /// 1-based line the event was read from.
    pub line: usize,
}

/// Parse a whole script. Events are returned in time order; events sharing
/// a timestamp keep their script order.
pub fn parse_script(text: &str) -> Result<Vec<ScriptEvent>, CliError> {
    let mut events = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or("");

        for entry in content.split(',') {
            if entry.trim().is_empty() {
                continue;
            }
            events.push(parse_event(entry, line)?);
        }
    }

    events.sort_by_key(|event| event.at);
    Ok(events)
}

fn parse_event(entry: &str, line: usize) -> Result<ScriptEvent, CliError> {
    let error = |message: String| CliError::Script { line, message };
    let fields: Vec<&str> = entry.split_whitespace().collect();

    let (at, source, action, flag) = match fields.as_slice() {
        [at, source, action] => (*at, *source, *action, None),
        [at, source, action, flag] => (*at, *source, *action, Some(*flag)),
        _ => {
            return Err(error(format!(
                "expected '<t_ms> <http|ajax> <action> [skip]', got '{}'",
                entry.trim()
            )))
        }
    };

    let at = at
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| error(format!("invalid time '{}'", at)))?;

    let source = source.to_lowercase();
    if !matches!(source.as_str(), "http" | "ajax") {
        return Err(error(format!("unknown source '{}'", source)));
    }

    let kind = match (source.as_str(), action.to_lowercase().as_str()) {
        ("http", "send") => EventKind::HttpSend,
        ("http", "ok") => EventKind::HttpOk,
        ("http", "error") => EventKind::HttpError,
        ("ajax", "send") => EventKind::AjaxSend,
        ("ajax", "complete") => EventKind::AjaxComplete,
        (source, other) => {
            return Err(error(format!("unknown action '{}' for {}", other, source)))
        }
    };

    let skip = match flag {
        None => false,
        Some(flag) if flag.eq_ignore_ascii_case("skip") => true,
        Some(flag) => return Err(error(format!("unknown flag '{}'", flag))),
    };

    Ok(ScriptEvent {
        at,
        kind,
        skip,
        line,
    })
}
