//! TraCI wire codec.
//!
//! All integers are big-endian. A message is a `u32` total length (including
//! the length field itself) followed by one or more commands. A command is a
//! one-byte length (including the length byte and the command id), or the
//! extended form `0x00` + `u32` length when the short form cannot hold it.

use crate::error::ControlError;

// Command identifiers.
pub const CMD_GET_VERSION: u8 = 0x00;
pub const CMD_SIM_STEP: u8 = 0x02;
pub const CMD_CLOSE: u8 = 0x7f;
pub const CMD_GET_VEHICLE_VARIABLE: u8 = 0xa4;
pub const RESPONSE_GET_VEHICLE_VARIABLE: u8 = 0xb4;
pub const CMD_GET_SIM_VARIABLE: u8 = 0xab;
pub const RESPONSE_GET_SIM_VARIABLE: u8 = 0xbb;

// Variable identifiers.
pub const VAR_ID_LIST: u8 = 0x00;
pub const VAR_POSITION: u8 = 0x42;
pub const VAR_ANGLE: u8 = 0x43;
pub const VAR_TYPE: u8 = 0x4f;
pub const VAR_MIN_EXPECTED_VEHICLES: u8 = 0x7d;

// Type identifiers for typed values.
pub const TYPE_POSITION_2D: u8 = 0x01;
pub const TYPE_INTEGER: u8 = 0x09;
pub const TYPE_DOUBLE: u8 = 0x0b;
pub const TYPE_STRING: u8 = 0x0c;
pub const TYPE_STRING_LIST: u8 = 0x0e;

pub const STATUS_OK: u8 = 0x00;

/// Frame a set of encoded commands into one outgoing message.
pub fn frame_message(commands: &[Vec<u8>]) -> Vec<u8> {
    let payload_len: usize = commands.iter().map(Vec::len).sum();
    let total = payload_len + 4;
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(total as u32).to_be_bytes());
    for command in commands {
        out.extend_from_slice(command);
    }
    out
}

/// Encode one command with its length prefix.
pub fn encode_command(command: u8, payload: &[u8]) -> Vec<u8> {
    let short_len = payload.len() + 2;
    if short_len <= u8::MAX as usize {
        let mut out = Vec::with_capacity(short_len);
        out.push(short_len as u8);
        out.push(command);
        out.extend_from_slice(payload);
        out
    } else {
        // Extended form: marker byte, u32 length covering marker + length + id.
        let total = payload.len() + 6;
        let mut out = Vec::with_capacity(total);
        out.push(0);
        out.extend_from_slice(&(total as u32).to_be_bytes());
        out.push(command);
        out.extend_from_slice(payload);
        out
    }
}

/// Append a TraCI string (u32 length + UTF-8 bytes).
pub fn write_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

/// Payload of a get-variable command: variable id + object id.
pub fn get_variable_payload(variable: u8, object_id: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(5 + object_id.len());
    payload.push(variable);
    write_string(&mut payload, object_id);
    payload
}

/// Payload of a simulation-step command; zero means "advance one step".
pub fn sim_step_payload(target_time_s: f64) -> Vec<u8> {
    target_time_s.to_be_bytes().to_vec()
}

/// Decoded command header within a received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub command: u8,
    /// Offset (within the message body) one past the command's last byte.
    pub end: usize,
}

/// Decoded status answer the engine sends for every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub command: u8,
    pub result: u8,
    pub description: String,
}

/// Cursor over a received message body (everything after the length field).
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ControlError> {
        if self.remaining() < len {
            return Err(ControlError::Protocol(format!(
                "message truncated: needed {len} bytes, {} left",
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, ControlError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, ControlError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, ControlError> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64, ControlError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_be_bytes(raw))
    }

    pub fn read_string(&mut self) -> Result<String, ControlError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ControlError::Protocol("string is not valid utf-8".to_string()))
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>, ControlError> {
        let count = self.read_u32()? as usize;
        let mut items = Vec::with_capacity(count.min(self.remaining() / 4));
        for _ in 0..count {
            items.push(self.read_string()?);
        }
        Ok(items)
    }

    /// Consume a command header, handling both length forms.
    pub fn read_command_header(&mut self) -> Result<CommandHeader, ControlError> {
        let start = self.pos;
        let short_len = self.read_u8()? as usize;
        let (length, header_len) = if short_len == 0 {
            (self.read_u32()? as usize, 5)
        } else {
            (short_len, 1)
        };
        if length < header_len + 1 {
            return Err(ControlError::Protocol(format!(
                "command length {length} too small"
            )));
        }
        let command = self.read_u8()?;
        let end = start + length;
        if end > self.buf.len() {
            return Err(ControlError::Protocol(format!(
                "command runs past message end (claims {length} bytes)"
            )));
        }
        Ok(CommandHeader { command, end })
    }

    /// Read the status answer that prefixes every response message.
    pub fn read_status(&mut self) -> Result<Status, ControlError> {
        let header = self.read_command_header()?;
        let result = self.read_u8()?;
        let description = self.read_string()?;
        self.pos = header.end;
        Ok(Status {
            command: header.command,
            result,
            description,
        })
    }

    fn expect_type(&mut self, expected: u8, label: &str) -> Result<(), ControlError> {
        let actual = self.read_u8()?;
        if actual != expected {
            return Err(ControlError::Protocol(format!(
                "expected {label} (type 0x{expected:02x}), got type 0x{actual:02x}"
            )));
        }
        Ok(())
    }

    pub fn read_typed_i32(&mut self) -> Result<i32, ControlError> {
        self.expect_type(TYPE_INTEGER, "integer")?;
        self.read_i32()
    }

    pub fn read_typed_f64(&mut self) -> Result<f64, ControlError> {
        self.expect_type(TYPE_DOUBLE, "double")?;
        self.read_f64()
    }

    pub fn read_typed_string(&mut self) -> Result<String, ControlError> {
        self.expect_type(TYPE_STRING, "string")?;
        self.read_string()
    }

    pub fn read_typed_string_list(&mut self) -> Result<Vec<String>, ControlError> {
        self.expect_type(TYPE_STRING_LIST, "string list")?;
        self.read_string_list()
    }

    pub fn read_position_2d(&mut self) -> Result<(f64, f64), ControlError> {
        self.expect_type(TYPE_POSITION_2D, "2d position")?;
        let x = self.read_f64()?;
        let y = self.read_f64()?;
        Ok((x, y))
    }
}
