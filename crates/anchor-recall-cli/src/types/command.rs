//! One line of an input script.

use serde::Deserialize;

use anchor_recall::{InputEvent, RawHookMessage, ScreenPoint, ScreenRect};

use super::error::{CliError, CliResult};

/// A script command, tagged by `"event"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptCommand {
    Pulse,
    HoldDown,
    HoldUp,
    Raw(RawParams),
    Screen(ScreenParams),
    Cursor { x: i32, y: i32 },
    Wait { ms: u64 },
    Anchors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawKind {
    Mouse,
    Keyboard,
}

/// A raw hook message as recorded by a platform hook.
#[derive(Debug, Clone, Deserialize)]
pub struct RawParams {
    pub kind: RawKind,
    pub msg: u32,
    #[serde(default)]
    pub vk: Option<u32>,
}

impl RawParams {
    pub fn to_message(&self) -> CliResult<RawHookMessage> {
        match (self.kind, self.vk) {
            (RawKind::Mouse, _) => Ok(RawHookMessage::Mouse { msg: self.msg }),
            (RawKind::Keyboard, Some(vk)) => Ok(RawHookMessage::Keyboard { msg: self.msg, vk }),
            (RawKind::Keyboard, None) => Err(CliError::InvalidCommand(
                "'vk' required for keyboard messages".to_string(),
            )),
        }
    }
}

/// Replaces the foreground window the engine sees.
#[derive(Debug, Clone, Deserialize)]
pub struct ScreenParams {
    #[serde(default)]
    pub window: u64,
    /// Defaults to the image size at the screen origin.
    #[serde(default)]
    pub bounds: Option<ScreenRect>,
    pub cursor: ScreenPoint,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
}

impl ScriptCommand {
    /// The input signal this command delivers, if any.
    pub fn input_event(&self) -> CliResult<Option<InputEvent>> {
        Ok(match self {
            ScriptCommand::Pulse => Some(InputEvent::PrimaryPulse),
            ScriptCommand::HoldDown => Some(InputEvent::HoldDown),
            ScriptCommand::HoldUp => Some(InputEvent::HoldUp),
            ScriptCommand::Raw(raw) => raw.to_message()?.classify(),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ScriptCommand {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn test_parse_signals() {
        assert_eq!(
            parse(r#"{"event":"pulse"}"#).input_event().unwrap(),
            Some(InputEvent::PrimaryPulse)
        );
        assert_eq!(
            parse(r#"{"event":"hold_up"}"#).input_event().unwrap(),
            Some(InputEvent::HoldUp)
        );
        assert_eq!(parse(r#"{"event":"anchors"}"#).input_event().unwrap(), None);
    }

    #[test]
    fn test_parse_raw() {
        let cmd = parse(r#"{"event":"raw","kind":"keyboard","msg":256,"vk":20}"#);
        assert_eq!(cmd.input_event().unwrap(), Some(InputEvent::HoldDown));
        let cmd = parse(r#"{"event":"raw","kind":"mouse","msg":512}"#);
        assert_eq!(cmd.input_event().unwrap(), None);
        let cmd = parse(r#"{"event":"raw","kind":"keyboard","msg":256}"#);
        assert!(matches!(cmd.input_event(), Err(CliError::InvalidCommand(_))));
    }

    #[test]
    fn test_parse_screen() {
        let cmd = parse(
            r#"{"event":"screen","window":4,"bounds":{"x":10,"y":20,"width":30,"height":40},"cursor":{"x":15,"y":25},"path":"a.png"}"#,
        );
        match cmd {
            ScriptCommand::Screen(p) => {
                assert_eq!(p.window, 4);
                assert_eq!(p.bounds, Some(ScreenRect::new(10, 20, 30, 40)));
                assert_eq!(p.cursor, ScreenPoint::new(15, 25));
                assert_eq!(p.path.as_deref(), Some("a.png"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
