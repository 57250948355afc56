/// Reader and writer for JaCoCo execution data (`*.exec`) files.
///
/// The file is a sequence of blocks, each introduced by a one-byte type.
/// All multi-byte numbers are big-endian:
///   0x01 header        u16 magic (0xC0C0), u16 format version (0x1007)
///   0x10 session info  utf id, i64 start millis, i64 dump millis
///   0x11 execution     i64 class id, utf class name, boolean[] probes
///
/// Strings are a u16 byte length followed by Java's modified UTF-8: NUL is
/// `C0 80` and characters outside the BMP are two 3-byte surrogates. Boolean
/// arrays are
/// a var-int length followed by the values packed eight per byte, lowest
/// bit first. Files may be concatenated, so a header can appear again in
/// the middle of a stream.
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};

use chrono::DateTime;

use crate::error::{MinicovError, Result};

pub const BLOCK_HEADER: u8 = 0x01;
pub const BLOCK_SESSIONINFO: u8 = 0x10;
pub const BLOCK_EXECUTIONDATA: u8 = 0x11;

pub const MAGIC_NUMBER: u16 = 0xC0C0;
pub const FORMAT_VERSION: u16 = 0x1007;

/// Probe hits recorded for one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionData {
    /// CRC64 of the class bytes, as computed by the agent.
    pub id: u64,
    pub name: String,
    pub probes: Vec<bool>,
}

impl ExecutionData {
    pub fn new(id: u64, name: impl Into<String>, probes: Vec<bool>) -> Self {
        Self {
            id,
            name: name.into(),
            probes,
        }
    }

    #[must_use]
    pub fn has_hits(&self) -> bool {
        self.probes.iter().any(|&p| p)
    }

    /// OR the probes of `other` into this entry. Both must describe the same
    /// class version.
    pub fn merge(&mut self, other: &ExecutionData) -> Result<()> {
        if self.id != other.id {
            return Err(MinicovError::MalformedInput(format!(
                "Different ids ({:016x} and {:016x}).",
                self.id, other.id
            )));
        }
        if self.name != other.name {
            return Err(MinicovError::MalformedInput(format!(
                "Different class names {} and {} for id {:016x}.",
                self.name, other.name, self.id
            )));
        }
        if self.probes.len() != other.probes.len() {
            return Err(MinicovError::MalformedInput(format!(
                "Incompatible execution data for class {} with id {:016x}.",
                self.name, self.id
            )));
        }
        for (mine, theirs) in self.probes.iter_mut().zip(&other.probes) {
            *mine |= *theirs;
        }
        Ok(())
    }
}

/// Metadata about one recording session of the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    /// Epoch millis when the session started.
    pub start: i64,
    /// Epoch millis when the data was dumped.
    pub dump: i64,
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = |millis: i64| {
            DateTime::from_timestamp_millis(millis)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| millis.to_string())
        };
        write!(
            f,
            "{} ({} .. {})",
            self.id,
            stamp(self.start),
            stamp(self.dump)
        )
    }
}

/// Execution data from any number of exec files, merged per class id.
#[derive(Debug, Clone, Default)]
pub struct ExecutionDataStore {
    entries: BTreeMap<u64, ExecutionData>,
    sessions: Vec<SessionInfo>,
}

impl ExecutionDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `data`, merging it into an existing entry with the same id.
    pub fn put(&mut self, data: ExecutionData) -> Result<()> {
        match self.entries.get_mut(&data.id) {
            Some(existing) => existing.merge(&data),
            None => {
                self.entries.insert(data.id, data);
                Ok(())
            }
        }
    }

    pub fn add_session(&mut self, session: SessionInfo) {
        self.sessions.push(session);
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&ExecutionData> {
        self.entries.get(&id)
    }

    /// All entries, ordered by class id.
    pub fn contents(&self) -> impl Iterator<Item = &ExecutionData> {
        self.entries.values()
    }

    #[must_use]
    pub fn sessions(&self) -> &[SessionInfo] {
        &self.sessions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read every block of an exec stream into `store`. An empty stream is
/// valid and adds nothing.
pub fn read_exec(input: &mut dyn Read, store: &mut ExecutionDataStore) -> Result<()> {
    let mut first_block = true;
    while let Some(block) = read_block_type(input)? {
        if first_block && block != BLOCK_HEADER {
            return Err(invalid("Invalid execution data file."));
        }
        first_block = false;
        match block {
            BLOCK_HEADER => read_header(input)?,
            BLOCK_SESSIONINFO => {
                let session = SessionInfo {
                    id: read_utf(input)?,
                    start: read_i64(input)?,
                    dump: read_i64(input)?,
                };
                tracing::debug!("session {}", session);
                store.add_session(session);
            }
            BLOCK_EXECUTIONDATA => {
                let id = read_i64(input)? as u64;
                let name = read_utf(input)?;
                let probes = read_boolean_array(input)?;
                store.put(ExecutionData { id, name, probes })?;
            }
            other => return Err(invalid(&format!("Unknown block type {other:x}."))),
        }
    }
    Ok(())
}

/// Write `store` as a single exec stream. Classes without any hit probe are
/// left out.
pub fn write_exec(output: &mut dyn Write, store: &ExecutionDataStore) -> Result<()> {
    output.write_all(&[BLOCK_HEADER])?;
    output.write_all(&MAGIC_NUMBER.to_be_bytes())?;
    output.write_all(&FORMAT_VERSION.to_be_bytes())?;

    for session in store.sessions() {
        output.write_all(&[BLOCK_SESSIONINFO])?;
        write_utf(output, &session.id)?;
        output.write_all(&session.start.to_be_bytes())?;
        output.write_all(&session.dump.to_be_bytes())?;
    }

    for data in store.contents().filter(|d| d.has_hits()) {
        output.write_all(&[BLOCK_EXECUTIONDATA])?;
        output.write_all(&(data.id as i64).to_be_bytes())?;
        write_utf(output, &data.name)?;
        write_boolean_array(output, &data.probes)?;
    }
    output.flush()?;
    Ok(())
}

fn invalid(message: &str) -> MinicovError {
    MinicovError::MalformedInput(message.to_string())
}

fn truncated(err: io::Error) -> MinicovError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        invalid("Unexpected end of execution data.")
    } else {
        MinicovError::Io(err)
    }
}

fn read_block_type(input: &mut dyn Read) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MinicovError::Io(e)),
        }
    }
}

fn read_header(input: &mut dyn Read) -> Result<()> {
    if read_u16(input)? != MAGIC_NUMBER {
        return Err(invalid("Invalid execution data file."));
    }
    let version = read_u16(input)?;
    if version != FORMAT_VERSION {
        return Err(invalid(&format!(
            "Cannot read execution data version 0x{version:x}. \
             This version of JaCoCo uses execution data version 0x{FORMAT_VERSION:x}."
        )));
    }
    Ok(())
}

fn read_array<const N: usize>(input: &mut dyn Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf).map_err(truncated)?;
    Ok(buf)
}

fn read_u8(input: &mut dyn Read) -> Result<u8> {
    Ok(read_array::<1>(input)?[0])
}

fn read_u16(input: &mut dyn Read) -> Result<u16> {
    Ok(u16::from_be_bytes(read_array(input)?))
}

fn read_i64(input: &mut dyn Read) -> Result<i64> {
    Ok(i64::from_be_bytes(read_array(input)?))
}

fn read_utf(input: &mut dyn Read) -> Result<String> {
    let len = read_u16(input)? as usize;
    let mut bytes = vec![0u8; len];
    input.read_exact(&mut bytes).map_err(truncated)?;
    decode_modified_utf8(&bytes)
}

/// Decode Java's modified UTF-8: one to three bytes per UTF-16 unit, with
/// supplementary characters stored as surrogate pairs.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let bad = || invalid("Invalid string in execution data.");
    let cont = |b: Option<&u8>| match b {
        Some(&b) if b & 0xC0 == 0x80 => Ok(u16::from(b & 0x3F)),
        _ => Err(bad()),
    };

    let mut units = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter();
    while let Some(&b) = iter.next() {
        let unit = match b {
            0x00..=0x7F => u16::from(b),
            0xC0..=0xDF => (u16::from(b & 0x1F) << 6) | cont(iter.next())?,
            0xE0..=0xEF => {
                let hi = (u16::from(b & 0x0F) << 12) | (cont(iter.next())? << 6);
                hi | cont(iter.next())?
            }
            _ => return Err(bad()),
        };
        units.push(unit);
    }
    String::from_utf16(&units).map_err(|_| bad())
}

fn read_var_int(input: &mut dyn Read) -> Result<u32> {
    let mut value: u32 = 0;
    let mut shift = 0;
    loop {
        let byte = read_u8(input)?;
        if shift >= 32 {
            return Err(invalid("Variable-length integer too long."));
        }
        value |= u32::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn read_boolean_array(input: &mut dyn Read) -> Result<Vec<bool>> {
    let len = read_var_int(input)? as usize;
    let mut probes = Vec::with_capacity(len.min(1 << 16));
    let mut buffer = 0u8;
    for i in 0..len {
        if i % 8 == 0 {
            buffer = read_u8(input)?;
        }
        probes.push(buffer & 0x01 != 0);
        buffer >>= 1;
    }
    Ok(probes)
}

fn write_utf(output: &mut dyn Write, value: &str) -> Result<()> {
    let bytes = encode_modified_utf8(value);
    let len = u16::try_from(bytes.len())
        .map_err(|_| invalid(&format!("String too long for execution data: {value}")))?;
    output.write_all(&len.to_be_bytes())?;
    output.write_all(&bytes)?;
    Ok(())
}

fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => bytes.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                bytes.push(0xC0 | (unit >> 6) as u8);
                bytes.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                bytes.push(0xE0 | (unit >> 12) as u8);
                bytes.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                bytes.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    bytes
}

fn write_var_int(output: &mut dyn Write, mut value: u32) -> Result<()> {
    while value & !0x7F != 0 {
        output.write_all(&[0x80 | (value & 0x7F) as u8])?;
        value >>= 7;
    }
    output.write_all(&[value as u8])?;
    Ok(())
}

fn write_boolean_array(output: &mut dyn Write, values: &[bool]) -> Result<()> {
    let len = u32::try_from(values.len())
        .map_err(|_| invalid("Probe array too long for execution data."))?;
    write_var_int(output, len)?;
    for chunk in values.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |acc, (bit, &hit)| if hit { acc | (1 << bit) } else { acc });
        output.write_all(&[byte])?;
    }
    Ok(())
}
