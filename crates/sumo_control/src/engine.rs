//! SUMO engine subprocess lifecycle.
//!
//! One engine process serves exactly one session. The control port is
//! OS-assigned per launch and travels with the launch description, so two
//! concurrent sessions never contend for a shared port.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::error::ControlError;

/// Ask the OS for a currently-free TCP port on the loopback interface.
///
/// The probe listener is dropped before the engine starts, so another process
/// could grab the port in between; a lost race surfaces as a launch failure
/// for that session only.
pub fn allocate_control_port() -> Result<u16, ControlError> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).map_err(ControlError::Io)?;
    let port = listener.local_addr().map_err(ControlError::Io)?.port();
    Ok(port)
}

/// Locate the `sumo` binary under a SUMO installation root.
pub fn engine_binary(sumo_home: &Path) -> PathBuf {
    sumo_home.join("bin").join("sumo")
}

/// Everything needed to launch one engine run: per-run values, not
/// process-wide constants.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineLaunch {
    pub binary: PathBuf,
    pub config: PathBuf,
    pub control_port: u16,
}

impl EngineLaunch {
    pub fn control_addr(&self) -> (&'static str, u16) {
        ("127.0.0.1", self.control_port)
    }
}

/// A running engine subprocess.
///
/// The child is killed on drop so an aborted session cannot leak an engine.
#[derive(Debug)]
pub struct EngineProcess {
    child: Child,
    control_port: u16,
}

impl EngineProcess {
    pub fn launch(launch: &EngineLaunch) -> Result<Self, ControlError> {
        let child = Command::new(&launch.binary)
            .arg("-c")
            .arg(&launch.config)
            .arg("--remote-port")
            .arg(launch.control_port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(ControlError::Io)?;

        Ok(Self {
            child,
            control_port: launch.control_port,
        })
    }

    pub fn control_port(&self) -> u16 {
        self.control_port
    }

    /// Force-terminate the engine. Used on cleanup paths where the TraCI
    /// close handshake did not happen; after a clean close the engine exits
    /// on its own and this is a no-op error we can ignore.
    pub async fn terminate(&mut self) -> Result<(), ControlError> {
        self.child.kill().await.map_err(ControlError::Io)
    }
}
