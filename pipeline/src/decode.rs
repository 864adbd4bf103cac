//! Response decoding: status check, JSON predictions, audio sniffing, and
//! stream framing.

use bytes::{Bytes, BytesMut};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Reject any non-2xx status, carrying the body along.
pub fn check_status(status: u16, body: &[u8]) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(PipelineError::Http {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        })
    }
}

/// Decode a JSON body into `P`.
pub fn json<P: DeserializeOwned>(body: &[u8]) -> Result<P> {
    serde_json::from_slice(body).map_err(|e| PipelineError::from_json(e, body))
}

/// Container format of a produced audio buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Ogg,
}

impl AudioFormat {
    /// Classify `bytes` by its leading signature.
    pub fn sniff(bytes: &[u8]) -> Result<Self> {
        if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            Ok(AudioFormat::Wav)
        } else if bytes.starts_with(b"OggS") {
            Ok(AudioFormat::Ogg)
        } else {
            Err(PipelineError::UnsupportedFormat(
                bytes.iter().take(12).copied().collect(),
            ))
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
        }
    }
}

/// Raw audio plus its sniffed container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Audio {
    pub data: Vec<u8>,
    pub format: AudioFormat,
}

/// Sniff and wrap an audio body.
pub fn audio(body: &[u8]) -> Result<Audio> {
    let format = AudioFormat::sniff(body)?;
    Ok(Audio {
        data: body.to_vec(),
        format,
    })
}

/// How a streamed body is cut into elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// A sequence of JSON documents, newline-separated or back to back.
    /// A document split across network chunks is held until complete.
    Json,
    /// Every network chunk is one element.
    Chunks,
}

/// Incremental splitter for streamed bodies.
#[derive(Debug)]
pub struct Framer {
    framing: Framing,
    buf: BytesMut,
}

impl Framer {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buf: BytesMut::new(),
        }
    }

    /// Feed one network chunk, returning any complete elements.
    pub fn push(&mut self, chunk: Bytes) -> Vec<Bytes> {
        match self.framing {
            Framing::Chunks => {
                if chunk.is_empty() {
                    Vec::new()
                } else {
                    vec![chunk]
                }
            }
            Framing::Json => {
                self.buf.extend_from_slice(&chunk);
                let mut out = Vec::new();
                loop {
                    let start = self
                        .buf
                        .iter()
                        .position(|b| !b.is_ascii_whitespace())
                        .unwrap_or(self.buf.len());
                    let _ = self.buf.split_to(start);
                    if self.buf.is_empty() {
                        break;
                    }
                    match next_document(&self.buf) {
                        Document::Complete(end) => out.push(self.buf.split_to(end).freeze()),
                        Document::Partial => break,
                        // Hand the rest to the decoder so the failure carries the body.
                        Document::Malformed => {
                            out.push(self.buf.split().freeze());
                            break;
                        }
                    }
                }
                out
            }
        }
    }

    /// Whatever is left once the body ends.
    pub fn finish(&mut self) -> Option<Bytes> {
        let rest = std::mem::take(&mut self.buf).freeze();
        let trimmed = trim(&rest);
        if trimmed.is_empty() {
            None
        } else {
            Some(rest.slice_ref(trimmed))
        }
    }
}

enum Document {
    /// A whole document ends at this offset.
    Complete(usize),
    /// The buffer ends inside a document.
    Partial,
    Malformed,
}

fn next_document(buf: &[u8]) -> Document {
    let mut docs = serde_json::Deserializer::from_slice(buf).into_iter::<IgnoredAny>();
    match docs.next() {
        Some(Ok(_)) => {
            let end = docs.byte_offset();
            // A number running to the end of the buffer may have more digits coming.
            if end == buf.len() && buf[end - 1].is_ascii_digit() {
                Document::Partial
            } else {
                Document::Complete(end)
            }
        }
        Some(Err(e)) if e.is_eof() => Document::Partial,
        Some(Err(_)) => Document::Malformed,
        None => Document::Partial,
    }
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        response: String,
    }

    #[test]
    fn sniffs_wav_and_ogg() {
        let wav = b"RIFF\x24\x08\x00\x00WAVEfmt ";
        assert_eq!(AudioFormat::sniff(wav).unwrap(), AudioFormat::Wav);
        assert_eq!(AudioFormat::sniff(b"OggS\x00\x02").unwrap(), AudioFormat::Ogg);
        assert!(matches!(
            AudioFormat::sniff(b"ID3\x03mp3 data"),
            Err(PipelineError::UnsupportedFormat(_))
        ));
        assert!(AudioFormat::sniff(b"RIFF").is_err());
    }

    #[test]
    fn non_success_is_http_error() {
        assert!(check_status(204, b"").is_ok());
        match check_status(503, b"busy") {
            Err(PipelineError::Http { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn shape_mismatch_is_validation() {
        let ok: Reply = json(br#"{"response":"hi"}"#).unwrap();
        assert_eq!(ok.response, "hi");
        assert!(matches!(
            json::<Reply>(br#"{"text":"hi"}"#),
            Err(PipelineError::Validation { .. })
        ));
        assert!(matches!(json::<Reply>(b"{\"resp"), Err(PipelineError::Decode { .. })));
    }

    #[test]
    fn malformed_json_is_decode_even_after_a_type_mismatch() {
        assert!(matches!(json::<u32>(b"{oops"), Err(PipelineError::Decode { .. })));
        assert!(matches!(
            json::<Reply>(br#"{"response": 5 garbage"#),
            Err(PipelineError::Decode { .. })
        ));
        assert!(matches!(
            json::<Reply>(br#"{"response": 5}"#),
            Err(PipelineError::Validation { .. })
        ));
    }

    #[test]
    fn documents_survive_arbitrary_splits() {
        let mut framer = Framer::new(Framing::Json);
        assert!(framer.push(Bytes::from_static(b"{\"a\":")).is_empty());
        let out = framer.push(Bytes::from_static(b"1}\n\n{\"a\":2}\n{\"a\""));
        assert_eq!(out, vec![Bytes::from_static(b"{\"a\":1}"), Bytes::from_static(b"{\"a\":2}")]);
        assert_eq!(
            framer.push(Bytes::from_static(b":3}\n")),
            vec![Bytes::from_static(b"{\"a\":3}")]
        );
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn number_split_across_chunks_stays_whole() {
        let mut framer = Framer::new(Framing::Json);
        assert!(framer.push(Bytes::from_static(b"1")).is_empty());
        assert_eq!(framer.push(Bytes::from_static(b"2\n3")), vec![Bytes::from_static(b"12")]);
        assert_eq!(framer.finish(), Some(Bytes::from_static(b"3")));
    }

    #[test]
    fn back_to_back_documents_split() {
        let mut framer = Framer::new(Framing::Json);
        let out = framer.push(Bytes::from_static(
            b"{\"response\":\"Hel\"}{\"response\":\"Hello\"}{\"resp",
        ));
        assert_eq!(
            out,
            vec![
                Bytes::from_static(b"{\"response\":\"Hel\"}"),
                Bytes::from_static(b"{\"response\":\"Hello\"}")
            ]
        );
        assert_eq!(framer.finish(), Some(Bytes::from_static(b"{\"resp")));
    }

    #[test]
    fn garbage_is_handed_on_whole() {
        let mut framer = Framer::new(Framing::Json);
        let out = framer.push(Bytes::from_static(b"{\"a\":1} <html>oops</html>"));
        assert_eq!(
            out,
            vec![Bytes::from_static(b"{\"a\":1}"), Bytes::from_static(b"<html>oops</html>")]
        );
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn chunks_pass_through() {
        let mut framer = Framer::new(Framing::Chunks);
        assert_eq!(framer.push(Bytes::from_static(b"OggS1")).len(), 1);
        assert!(framer.push(Bytes::new()).is_empty());
        assert_eq!(framer.finish(), None);
    }
}
