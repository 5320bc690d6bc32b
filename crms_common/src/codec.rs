//! Length-prefixed frames carrying protocol messages over a byte stream.
//!
//! A frame is one codec tag byte (`J` for JSON, `B` for bincode), a 4-byte
//! big-endian payload length and the payload. The codec travels with every
//! frame, so a gateway can answer in whatever encoding the request used.
use std::io::{ErrorKind, Read, Write};

use bincode::{Decode, Encode};
use clap::ValueEnum;
use serde::Serialize;
use serde::de::DeserializeOwned;
use strum_macros::{Display, EnumString};

use crate::error::GatewayError;
use crate::result::Result;

/// Largest payload accepted in a single frame (16 MiB).
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const FRAME_HEADER_LEN: usize = 5;

/// Payload encoding of a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Display, EnumString)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WireCodec {
    /// Human-readable JSON via `serde_json`.
    #[default]
    Json,
    /// Compact binary via `bincode`.
    Bincode,
}

impl WireCodec {
    /// Tag byte written in front of the payload length.
    pub const fn tag(self) -> u8 {
        match self {
            WireCodec::Json => b'J',
            WireCodec::Bincode => b'B',
        }
    }

    /// Codec announced by a tag byte.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            b'J' => Ok(WireCodec::Json),
            b'B' => Ok(WireCodec::Bincode),
            other => Err(GatewayError::Protocol(format!(
                "unknown codec tag 0x{:02x}",
                other
            ))),
        }
    }

    /// Encode `value` into a payload.
    pub fn encode<T: Serialize + Encode>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            WireCodec::Json => Ok(serde_json::to_vec(value)?),
            WireCodec::Bincode => Ok(bincode::encode_to_vec(value, bincode_config())?),
        }
    }

    /// Decode a payload into `T`.
    pub fn decode<T: DeserializeOwned + Decode<()>>(self, payload: &[u8]) -> Result<T> {
        match self {
            WireCodec::Json => Ok(serde_json::from_slice(payload)?),
            WireCodec::Bincode => {
                let (value, read) =
                    bincode::decode_from_slice(payload, bincode_config())?;
                if read != payload.len() {
                    return Err(GatewayError::Protocol(format!(
                        "{} trailing bytes after bincode payload",
                        payload.len() - read
                    )));
                }
                Ok(value)
            }
        }
    }
}

/// Bincode settings for frame payloads.
///
/// The limit caps every length prefix inside a payload, so a forged
/// collection length fails to decode instead of reserving memory.
pub(crate) fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<MAX_FRAME_LEN>()
}

/// Encode `value` with `codec` and write it as one frame.
pub fn write_frame<W, T>(writer: &mut W, codec: WireCodec, value: &T) -> Result<()>
where
    W: Write,
    T: Serialize + Encode,
{
    let payload = codec.encode(value)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(GatewayError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let mut header = [0u8; FRAME_HEADER_LEN];
    header[0] = codec.tag();
    header[1..].copy_from_slice(&(payload.len() as u32).to_be_bytes());

    writer.write_all(&header)?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame, returning `None` when the stream ends cleanly before a new frame.
pub fn try_read_frame<R, T>(reader: &mut R) -> Result<Option<(WireCodec, T)>>
where
    R: Read,
    T: DeserializeOwned + Decode<()>,
{
    let mut tag = [0u8; 1];
    loop {
        match reader.read(&mut tag) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let codec = WireCodec::from_tag(tag[0])?;

    let mut len = [0u8; 4];
    reader.read_exact(&mut len)?;
    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_FRAME_LEN {
        return Err(GatewayError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    let value = codec.decode(&payload)?;
    Ok(Some((codec, value)))
}

/// Read one frame; a stream that ends before the frame is a protocol error.
pub fn read_frame<R, T>(reader: &mut R) -> Result<(WireCodec, T)>
where
    R: Read,
    T: DeserializeOwned + Decode<()>,
{
    try_read_frame(reader)?
        .ok_or_else(|| GatewayError::Protocol(String::from("connection closed by peer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Credentials, Envelope, Reply, Request};
    use crate::grid::ValueGrid;
    use crate::observations::RetrieveObservations2DCommand;
    use std::io::Cursor;

    fn sample_envelope() -> Envelope {
        let mut command = RetrieveObservations2DCommand::new();
        command
            .add_subject("BHP")
            .add_data_type("CLOSE PRICE")
            .set_date_range("01/01/2018");
        Envelope::new(
            Some(Credentials::new("analyst", "secret")),
            Request::Retrieve(command),
        )
    }

    #[test]
    fn frames_carry_their_codec() {
        for codec in [WireCodec::Json, WireCodec::Bincode] {
            let mut buf = Vec::new();
            write_frame(&mut buf, codec, &sample_envelope()).unwrap();
            assert_eq!(buf[0], codec.tag());

            let (read_codec, envelope): (WireCodec, Envelope) =
                read_frame(&mut Cursor::new(buf)).unwrap();
            assert_eq!(read_codec, codec);
            assert_eq!(envelope, sample_envelope());
        }
    }

    #[test]
    fn two_frames_back_to_back_then_clean_end() {
        let mut buf = Vec::new();
        let first = Reply::LinkTest {
            message: String::from("Link test succeeded: hello"),
        };
        let second = Reply::Rejected {
            reason: String::from("nope"),
        };
        write_frame(&mut buf, WireCodec::Json, &first).unwrap();
        write_frame(&mut buf, WireCodec::Bincode, &second).unwrap();

        let mut cursor = Cursor::new(buf);
        let (_, a): (WireCodec, Reply) = read_frame(&mut cursor).unwrap();
        let (_, b): (WireCodec, Reply) = read_frame(&mut cursor).unwrap();
        assert_eq!(a, first);
        assert_eq!(b, second);

        let end: Option<(WireCodec, Reply)> = try_read_frame(&mut cursor).unwrap();
        assert!(end.is_none());
    }

    #[test]
    fn unknown_tag_is_a_protocol_error() {
        let mut cursor = Cursor::new(vec![b'X', 0, 0, 0, 0]);
        let err = read_frame::<_, Reply>(&mut cursor).unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
    }

    #[test]
    fn oversized_length_is_refused_before_allocation() {
        let mut frame = vec![b'J'];
        frame.extend_from_slice(&u32::MAX.to_be_bytes());
        let err = read_frame::<_, Reply>(&mut Cursor::new(frame)).unwrap_err();
        assert!(matches!(err, GatewayError::FrameTooLarge { .. }));
    }

    #[test]
    fn truncated_payload_is_an_io_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, WireCodec::Json, &sample_envelope()).unwrap();
        buf.truncate(buf.len() - 3);
        let err = read_frame::<_, Envelope>(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, GatewayError::Io(_)));
    }

    #[test]
    fn forged_string_length_fails_to_decode() {
        // No credentials, TestLink, then a u64 varint claiming a 64 TiB message.
        let mut payload = vec![0u8, 0u8, 0xFD];
        payload.extend_from_slice(&(1u64 << 46).to_le_bytes());
        let err = WireCodec::Bincode.decode::<Envelope>(&payload).unwrap_err();
        assert!(matches!(err, GatewayError::BincodeDecode(_)));
    }

    #[test]
    fn ragged_bincode_grid_is_rejected() {
        let ragged: Vec<Vec<String>> = vec![
            vec![String::from("45")],
            vec![String::from("20"), String::from("99"), String::from("x")],
        ];
        let payload = bincode::encode_to_vec(&ragged, bincode_config()).unwrap();
        let err = WireCodec::Bincode.decode::<ValueGrid>(&payload).unwrap_err();
        assert!(matches!(err, GatewayError::BincodeDecode(_)));

        let square: Vec<Vec<String>> = vec![vec![String::from("45")], vec![String::from("20")]];
        let payload = bincode::encode_to_vec(&square, bincode_config()).unwrap();
        let grid = WireCodec::Bincode.decode::<ValueGrid>(&payload).unwrap();
        assert_eq!(grid.shape(), (2, 1));
    }

    #[test]
    fn codec_names_parse_case_insensitively() {
        assert_eq!("BINCODE".parse::<WireCodec>().unwrap(), WireCodec::Bincode);
        assert_eq!(WireCodec::Json.to_string(), "json");
    }
}
