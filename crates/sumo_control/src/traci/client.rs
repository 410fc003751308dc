//! Typed TraCI client over a `TcpStream`.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::Instant;

use super::protocol::{self, Reader};
use crate::error::ControlError;

/// How often the startup connect is retried while the engine binds its port.
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Client for one engine control connection.
#[derive(Debug)]
pub struct TraciClient {
    stream: TcpStream,
    api_version: i32,
}

impl TraciClient {
    /// Connect to an engine control port and perform the version handshake.
    ///
    /// A freshly launched engine needs a moment to bind the port, so the TCP
    /// connect is retried within `startup_window`. This is startup handshake
    /// only; established-connection failures are never retried.
    pub async fn connect<A>(addr: A, startup_window: Duration) -> Result<Self, ControlError>
    where
        A: ToSocketAddrs + Clone,
    {
        let deadline = Instant::now() + startup_window;
        let stream = loop {
            match TcpStream::connect(addr.clone()).await {
                Ok(stream) => break stream,
                Err(err) => {
                    if Instant::now() >= deadline {
                        return Err(ControlError::Io(err));
                    }
                    tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
                }
            }
        };

        let mut client = Self {
            stream,
            api_version: 0,
        };
        client.api_version = client.version_handshake().await?;
        Ok(client)
    }

    /// TraCI API version the engine reported during the handshake.
    pub fn api_version(&self) -> i32 {
        self.api_version
    }

    async fn version_handshake(&mut self) -> Result<i32, ControlError> {
        let body = self.exchange(protocol::CMD_GET_VERSION, &[]).await?;
        let mut reader = ok_reader(&body, protocol::CMD_GET_VERSION)?;

        let header = reader.read_command_header()?;
        if header.command != protocol::CMD_GET_VERSION {
            return Err(ControlError::Protocol(format!(
                "expected version response, got command 0x{:02x}",
                header.command
            )));
        }
        let api_version = reader.read_i32()?;
        let _server_version = reader.read_string()?;
        Ok(api_version)
    }

    /// Advance the simulation by one discrete time step.
    pub async fn simulation_step(&mut self) -> Result<(), ControlError> {
        let body = self
            .exchange(protocol::CMD_SIM_STEP, &protocol::sim_step_payload(0.0))
            .await?;
        let mut reader = ok_reader(&body, protocol::CMD_SIM_STEP)?;

        // No subscriptions are registered; drain the (zero) result count.
        let subscription_results = reader.read_i32()?;
        if subscription_results != 0 {
            return Err(ControlError::Protocol(format!(
                "unexpected subscription results: {subscription_results}"
            )));
        }
        Ok(())
    }

    /// Vehicles currently active or still scheduled to depart.
    pub async fn min_expected_vehicles(&mut self) -> Result<i32, ControlError> {
        let reader_body = self
            .get_variable(
                protocol::CMD_GET_SIM_VARIABLE,
                protocol::RESPONSE_GET_SIM_VARIABLE,
                protocol::VAR_MIN_EXPECTED_VEHICLES,
                "",
            )
            .await?;
        reader_body.reader().read_typed_i32()
    }

    /// Identifiers of all currently active vehicles.
    pub async fn vehicle_ids(&mut self) -> Result<Vec<String>, ControlError> {
        let reader_body = self
            .get_variable(
                protocol::CMD_GET_VEHICLE_VARIABLE,
                protocol::RESPONSE_GET_VEHICLE_VARIABLE,
                protocol::VAR_ID_LIST,
                "",
            )
            .await?;
        reader_body.reader().read_typed_string_list()
    }

    /// Current 2D position of one vehicle.
    pub async fn vehicle_position(&mut self, vehicle_id: &str) -> Result<(f64, f64), ControlError> {
        let reader_body = self
            .get_variable(
                protocol::CMD_GET_VEHICLE_VARIABLE,
                protocol::RESPONSE_GET_VEHICLE_VARIABLE,
                protocol::VAR_POSITION,
                vehicle_id,
            )
            .await?;
        reader_body.reader().read_position_2d()
    }

    /// Current heading of one vehicle, in degrees.
    pub async fn vehicle_angle(&mut self, vehicle_id: &str) -> Result<f64, ControlError> {
        let reader_body = self
            .get_variable(
                protocol::CMD_GET_VEHICLE_VARIABLE,
                protocol::RESPONSE_GET_VEHICLE_VARIABLE,
                protocol::VAR_ANGLE,
                vehicle_id,
            )
            .await?;
        reader_body.reader().read_typed_f64()
    }

    /// Type tag of one vehicle.
    pub async fn vehicle_type(&mut self, vehicle_id: &str) -> Result<String, ControlError> {
        let reader_body = self
            .get_variable(
                protocol::CMD_GET_VEHICLE_VARIABLE,
                protocol::RESPONSE_GET_VEHICLE_VARIABLE,
                protocol::VAR_TYPE,
                vehicle_id,
            )
            .await?;
        reader_body.reader().read_typed_string()
    }

    /// Ask the engine to shut down and close the connection.
    pub async fn close(&mut self) -> Result<(), ControlError> {
        let body = self.exchange(protocol::CMD_CLOSE, &[]).await?;
        ok_reader(&body, protocol::CMD_CLOSE)?;
        Ok(())
    }

    async fn get_variable(
        &mut self,
        command: u8,
        response_command: u8,
        variable: u8,
        object_id: &str,
    ) -> Result<VariableBody, ControlError> {
        let payload = protocol::get_variable_payload(variable, object_id);
        let body = self.exchange(command, &payload).await?;

        let value_offset = {
            let mut reader = ok_reader(&body, command)?;
            let header = reader.read_command_header()?;
            if header.command != response_command {
                return Err(ControlError::Protocol(format!(
                    "expected response command 0x{response_command:02x}, got 0x{:02x}",
                    header.command
                )));
            }
            let answered_variable = reader.read_u8()?;
            if answered_variable != variable {
                return Err(ControlError::Protocol(format!(
                    "expected variable 0x{variable:02x}, got 0x{answered_variable:02x}"
                )));
            }
            let _object_id = reader.read_string()?;
            body.len() - reader.remaining()
        };

        Ok(VariableBody { body, value_offset })
    }

    async fn exchange(&mut self, command: u8, payload: &[u8]) -> Result<Vec<u8>, ControlError> {
        let message = protocol::frame_message(&[protocol::encode_command(command, payload)]);
        self.stream.write_all(&message).await?;
        self.read_message().await
    }

    async fn read_message(&mut self) -> Result<Vec<u8>, ControlError> {
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf).await?;
        let total = u32::from_be_bytes(len_buf) as usize;
        if total < 4 {
            return Err(ControlError::Protocol(format!(
                "message claims impossible length {total}"
            )));
        }
        let mut body = vec![0u8; total - 4];
        self.stream.read_exact(&mut body).await?;
        Ok(body)
    }
}

/// Owned response body positioned at a variable's typed value.
struct VariableBody {
    body: Vec<u8>,
    value_offset: usize,
}

impl VariableBody {
    fn reader(&self) -> Reader<'_> {
        Reader::new(&self.body[self.value_offset..])
    }
}

/// Validate the status answer and return a reader positioned after it.
fn ok_reader(body: &[u8], command: u8) -> Result<Reader<'_>, ControlError> {
    let mut reader = Reader::new(body);
    let status = reader.read_status()?;
    if status.command != command {
        return Err(ControlError::Protocol(format!(
            "status answers command 0x{:02x}, expected 0x{command:02x}",
            status.command
        )));
    }
    if status.result != protocol::STATUS_OK {
        return Err(ControlError::Command {
            command,
            description: status.description,
        });
    }
    Ok(reader)
}
