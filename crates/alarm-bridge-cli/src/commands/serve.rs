//! `alarm-bridge serve`: newline-delimited JSON over stdin/stdout.
//!
//! Each input line is `{"id"?, "method", "args"?}`. Each reply echoes `id`
//! and carries `status` (`ok`, `error` or `notImplemented`). Alarm events are
//! interleaved on the same stream as `{"stream": "alarmUpdates", ...event}`.

use std::sync::Arc;
use std::time::Duration;

use alarm_bridge_core::codec::Record;
use alarm_bridge_core::memory::{InMemoryCapability, PromptAnswer};
use alarm_bridge_core::util::excerpt;
use alarm_bridge_core::{
    AlarmCapability, BridgeConfig, CommandDispatcher, ErrorPayload, EventEmitter, Reply,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::error::CliError;

pub const EVENT_STREAM_NAME: &str = "alarmUpdates";

/// How long to keep flushing events after stdin closes.
const EVENT_DRAIN_WINDOW: Duration = Duration::from_millis(50);

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    args: Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome {
    Ok { result: Value },
    Error { error: ErrorPayload },
    NotImplemented,
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Success(result) => Self::Ok { result },
            Reply::Error(error) => Self::Error { error },
            Reply::NotImplemented => Self::NotImplemented,
        }
    }
}

pub async fn run_serve(
    config: BridgeConfig,
    prompt_answer: PromptAnswer,
    with_events: bool,
) -> Result<(), CliError> {
    let capability =
        Arc::new(InMemoryCapability::with_config(&config).with_prompt_answer(prompt_answer));
    tracing::info!(
        "Serving alarm bridge on stdin/stdout ({})",
        capability.platform_version()
    );

    let dispatcher = CommandDispatcher::new(Arc::clone(&capability), config);
    let emitter = EventEmitter::new(Arc::clone(&capability));
    let (event_sender, mut events) = mpsc::unbounded_channel::<Record>();
    if with_events {
        emitter.subscribe(event_sender);
    } else {
        drop(event_sender);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let reply = handle_line(&dispatcher, &line).await;
                write_line(&mut stdout, &serde_json::to_value(reply)?).await?;
            }
            Some(event) = events.recv() => {
                write_line(&mut stdout, &Value::Object(event_line(event))).await?;
            }
        }
    }

    while let Ok(Some(event)) = tokio::time::timeout(EVENT_DRAIN_WINDOW, events.recv()).await {
        write_line(&mut stdout, &Value::Object(event_line(event))).await?;
    }
    tracing::info!("Input closed, stopping alarm bridge");
    Ok(())
}

/// Parse and dispatch one request line.
pub async fn handle_line<C: AlarmCapability>(
    dispatcher: &CommandDispatcher<C>,
    line: &str,
) -> ReplyLine {
    let request = match serde_json::from_str::<Request>(line) {
        Ok(request) => request,
        Err(error) => {
            tracing::warn!("Rejecting malformed request line: {}", error);
            return ReplyLine {
                id: None,
                outcome: Outcome::Error {
                    error: ErrorPayload {
                        code: "BAD_ARGS".to_string(),
                        message: format!("Malformed request '{}': {}", excerpt(line), error),
                    },
                },
            };
        }
    };

    let reply = dispatcher.dispatch(&request.method, &request.args).await;
    ReplyLine {
        id: request.id,
        outcome: reply.into(),
    }
}

/// Tag an encoded alarm event with the stream it belongs to.
pub fn event_line(event: Record) -> Record {
    let mut line = Record::new();
    line.insert("stream".to_string(), Value::from(EVENT_STREAM_NAME));
    line.extend(event);
    line
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, value: &Value) -> Result<(), CliError> {
    let mut payload = serde_json::to_vec(value)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
