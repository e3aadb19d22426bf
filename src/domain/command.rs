use serde::{Deserialize, Serialize};
use std::fmt;

/// Directive sent to an agent over its private command channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Halt movement until resumed
    Pause,
    /// Continue along the remaining path
    Resume,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Pause => "pause",
            Command::Resume => "resume",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire envelope: `{"command": "pause" | "resume"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub command: Command,
}

impl From<Command> for CommandMessage {
    fn from(command: Command) -> Self {
        Self { command }
    }
}

/// Name of the private command queue for an agent
pub fn command_queue_name(device_id: &str) -> String {
    format!("{device_id}_commands")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let json = serde_json::to_string(&CommandMessage::from(Command::Pause)).unwrap();
        assert_eq!(json, r#"{"command":"pause"}"#);

        let decoded: CommandMessage = serde_json::from_str(r#"{"command":"resume"}"#).unwrap();
        assert_eq!(decoded.command, Command::Resume);
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<CommandMessage>(r#"{"command":"dance"}"#).is_err());
    }

    #[test]
    fn test_command_queue_name() {
        assert_eq!(command_queue_name("robot7"), "robot7_commands");
    }
}
