//! Compact byte encoding of unit descriptors
//!
//! Descriptors travel as compact JSON. Decoding always validates, so a
//! successfully decoded descriptor is structurally sound.

use crate::model::FileDescriptor;
use crate::validate::validate_file;
use crate::{Error, Result};
use tracing::trace;

/// Encode a descriptor into its serialized form
pub fn encode(file: &FileDescriptor) -> Result<Vec<u8>> {
    serde_json::to_vec(file).map_err(|e| Error::Encode(e.to_string()))
}

/// Decode and validate a serialized descriptor
pub fn decode(bytes: &[u8]) -> Result<FileDescriptor> {
    let file: FileDescriptor =
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))?;
    validate_file(&file)?;
    trace!(
        "Decoded descriptor {} ({} bytes, {} messages, {} enums)",
        file.name,
        bytes.len(),
        file.messages.len(),
        file.enums.len()
    );
    Ok(file)
}

impl FileDescriptor {
    /// Serialize this descriptor
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Deserialize and validate a descriptor
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDescriptor, FieldKind, MessageDescriptor};

    #[test]
    fn test_decode_hand_written_blob() {
        let bytes = br#"{"name":"a.proto","package":"a","messages":[{"name":"Msg","fields":[{"name":"id","number":1,"kind":"int64"}]}]}"#;
        let file = decode(bytes).unwrap();
        assert_eq!(file.name, "a.proto");
        assert_eq!(file.messages[0].fields[0].kind, FieldKind::Int64);
    }

    #[test]
    fn test_encoding_omits_absent_type_names() {
        let file = FileDescriptor::new("a.proto").with_message(
            MessageDescriptor::new("Msg").with_field(FieldDescriptor::new("id", 1, FieldKind::Bool)),
        );
        let bytes = encode(&file).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(!text.contains("type_name"));
        assert_eq!(decode(&bytes).unwrap(), file);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(decode(b"\x00\x01not json"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_runs_validation() {
        let bytes = br#"{"name":"a.proto","messages":[{"name":"9bad"}]}"#;
        assert!(matches!(
            decode(bytes),
            Err(Error::InvalidIdentifier { .. })
        ));
    }
}
