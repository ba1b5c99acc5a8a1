//! Textual form of a model for the cache
//!
//! The text is a versioned JSON envelope:
//!
//! ```text
//! {"format": 1, "model": {...}}
//! ```

use serde::{Deserialize, Serialize};

use super::SymbolicModel;
use crate::error::CodecError;

/// Envelope version written by [`serialize`]
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format: u32,
    model: &'a SymbolicModel,
}

#[derive(Deserialize)]
struct Header {
    format: u32,
}

#[derive(Deserialize)]
struct Envelope {
    model: SymbolicModel,
}

/// Serialize a model into cache text
pub fn serialize(model: &SymbolicModel) -> Result<String, CodecError> {
    let envelope = EnvelopeRef {
        format: FORMAT_VERSION,
        model,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Deserialize cache text written by [`serialize`]
pub fn deserialize(text: &str) -> Result<SymbolicModel, CodecError> {
    let header: Header = serde_json::from_str(text)?;
    if header.format != FORMAT_VERSION {
        return Err(CodecError::UnsupportedFormat {
            found: header.format,
            expected: FORMAT_VERSION,
        });
    }
    let envelope: Envelope = serde_json::from_str(text)?;
    Ok(envelope.model)
}
