use std::fmt;
use std::io;

/// Errors from engine orchestration and the TraCI control channel.
#[derive(Debug)]
pub enum ControlError {
    /// Socket or process I/O failure.
    Io(io::Error),
    /// The engine answered with bytes the codec cannot interpret.
    Protocol(String),
    /// The engine rejected a command (non-OK status with its description).
    Command { command: u8, description: String },
    /// An external tool exited non-zero; stderr is captured.
    Tool { program: String, stderr: String },
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::Io(err) => write!(f, "engine i/o failure: {err}"),
            ControlError::Protocol(message) => write!(f, "traci protocol error: {message}"),
            ControlError::Command {
                command,
                description,
            } => {
                write!(
                    f,
                    "engine rejected command 0x{command:02x}: {description}"
                )
            }
            ControlError::Tool { program, stderr } => {
                write!(f, "{program} exited with failure: {stderr}")
            }
        }
    }
}

impl std::error::Error for ControlError {}

impl From<io::Error> for ControlError {
    fn from(err: io::Error) -> Self {
        ControlError::Io(err)
    }
}
