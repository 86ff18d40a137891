//! Parsing of ELM327-style response lines into service/PID/payload triples.

use thiserror::Error;

/// Errors raised while parsing a response line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("empty response line")]
    Empty,

    /// Interstitial adapter output (`NO DATA`, `SEARCHING...`) rather than a frame.
    #[error("adapter reported no data")]
    NoData,

    #[error("`{0}` is not a hex byte")]
    BadByte(String),

    /// A frame needs at least a service byte and a PID byte.
    #[error("response too short: {0} byte(s)")]
    TooShort(usize),

    #[error("`{0:02X}` is not a positive service response")]
    BadService(u8),

    #[error("frame answers `{got}`, channel expects `{expected}`")]
    CommandMismatch { expected: String, got: String },

    /// Custom sensors have no decode formula; they take values directly.
    #[error("no decode formula for command `{0}`")]
    NoFormula(String),

    #[error("payload too short to decode command `{0}`")]
    ShortPayload(String),
}

/// One parsed diagnostic response.
///
/// `service` holds the raw response byte; positive responses echo the request
/// service plus `0x40`, so `"41 0C 1A F8"` answers command `010C`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObdResponse {
    pub service: u8,
    pub pid: u8,
    pub payload: Vec<u8>,
}

impl ObdResponse {
    /// The request command string this frame answers, e.g. `"010C"`.
    pub fn command(&self) -> String {
        format!("{:02X}{:02X}", self.service - 0x40, self.pid)
    }
}

/// Parse one response line, e.g. `"41 0C 1A F8"`.
pub fn parse_response(line: &str) -> Result<ObdResponse, FrameError> {
    let trimmed = line.trim().trim_end_matches('>').trim();
    if trimmed.is_empty() {
        return Err(FrameError::Empty);
    }

    let upper = trimmed.to_ascii_uppercase();
    if upper.starts_with("NO DATA") || upper.starts_with("SEARCHING") {
        return Err(FrameError::NoData);
    }

    let mut bytes = Vec::new();
    for token in trimmed.split_whitespace() {
        let byte = u8::from_str_radix(token, 16)
            .map_err(|_| FrameError::BadByte(token.to_string()))?;
        bytes.push(byte);
    }

    if bytes.len() < 2 {
        return Err(FrameError::TooShort(bytes.len()));
    }

    let service = bytes[0];
    // Positive responses are 0x40-offset; anything below can't echo a request.
    if service <= 0x40 {
        return Err(FrameError::BadService(service));
    }

    Ok(ObdResponse {
        service,
        pid: bytes[1],
        payload: bytes[2..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rpm_response() {
        let frame = parse_response("41 0C 1A F8").unwrap();
        assert_eq!(frame.service, 0x41);
        assert_eq!(frame.pid, 0x0C);
        assert_eq!(frame.payload, vec![0x1A, 0xF8]);
        assert_eq!(frame.command(), "010C");
    }

    #[test]
    fn trims_prompt_and_whitespace() {
        let frame = parse_response("  41 0D 50 >  ").unwrap();
        assert_eq!(frame.command(), "010D");
        assert_eq!(frame.payload, vec![0x50]);
    }

    #[test]
    fn no_data_is_distinguished_from_garbage() {
        assert_eq!(parse_response("NO DATA"), Err(FrameError::NoData));
        assert_eq!(parse_response("SEARCHING..."), Err(FrameError::NoData));
        assert_eq!(
            parse_response("41 ZZ"),
            Err(FrameError::BadByte("ZZ".to_string()))
        );
    }

    #[test]
    fn rejects_empty_and_short_lines() {
        assert_eq!(parse_response("   "), Err(FrameError::Empty));
        assert_eq!(parse_response("41"), Err(FrameError::TooShort(1)));
    }

    #[test]
    fn rejects_request_echo() {
        // A bare request echo ("01 0C") is not a positive response.
        assert_eq!(parse_response("01 0C"), Err(FrameError::BadService(0x01)));
    }
}
