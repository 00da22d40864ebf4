use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

use crate::actor::reactor::{self, Command, Event};

/// One line of input, e.g. `{"type":"order_changed","order":[2,0,1]}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum InputMessage {
    Connected,
    OrderChanged {
        order: Vec<usize>,
    },
    CountChanged {
        count: usize,
    },
    AssignOrder {
        names: Vec<String>,
    },
    SetScenePrefix {
        prefix: String,
    },
    SwitchScene {
        scene: String,
    },
    SetTransition {
        name: String,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    CropAllScenes,
    ListSources,
}

impl From<InputMessage> for Event {
    fn from(msg: InputMessage) -> Self {
        match msg {
            InputMessage::Connected => Event::CompositorConnected,
            InputMessage::OrderChanged { order } => Event::OrderChanged(order),
            InputMessage::CountChanged { count } => Event::CountChanged(count),
            InputMessage::AssignOrder { names } => Event::AssignOrder(names),
            InputMessage::SetScenePrefix { prefix } => Event::SetScenePrefix(prefix),
            InputMessage::SwitchScene { scene } => Event::Command(Command::SwitchScene(scene)),
            InputMessage::SetTransition { name, duration_ms } => {
                Event::Command(Command::SetTransition {
                    name,
                    duration: duration_ms.map(Duration::from_millis),
                })
            }
            InputMessage::CropAllScenes => Event::Command(Command::CropAllScenes),
            InputMessage::ListSources => Event::Command(Command::ListSources),
        }
    }
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<InputMessage>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Forwards every well-formed line of `reader` to the reactor until EOF.
/// Malformed lines are logged and skipped. Returns the number of events sent.
pub async fn forward_lines<R>(reader: R, events: &reactor::Sender) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = LinesStream::new(reader.lines());
    let mut forwarded = 0;
    while let Some(line) = lines.next().await {
        let line = line?;
        match parse_line(&line) {
            Ok(Some(msg)) => {
                debug!(?msg, "input");
                events.send(msg.into());
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(%e, %line, "ignoring malformed input line"),
        }
    }
    Ok(forwarded)
}
