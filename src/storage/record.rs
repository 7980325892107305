//! Log record types for the durable store
//!
//! Record format:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, includes itself and checksum)
//! +------------------+
//! | Kind             | (u8: 0 = create namespace, 1 = put, 2 = delete)
//! +------------------+
//! | Namespace Id     | (u32 LE)
//! +------------------+
//! | Primary Bytes    | (length-prefixed: namespace name or row key)
//! +------------------+
//! | Secondary Bytes  | (length-prefixed: row value, empty otherwise)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers all bytes except the checksum itself.

use std::io::{self, Read};

use super::checksum::compute_checksum;
use super::NamespaceId;

/// Smallest possible record: length + kind + namespace + two empty fields + checksum.
pub const MIN_RECORD_SIZE: usize = 4 + 1 + 4 + 4 + 4 + 4;

const KIND_CREATE_NAMESPACE: u8 = 0;
const KIND_PUT: u8 = 1;
const KIND_DELETE: u8 = 2;

/// One mutation of the store as persisted in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Namespace `id` was bound to `name`
    CreateNamespace { id: NamespaceId, name: String },
    /// Row written
    Put {
        namespace: NamespaceId,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    /// Row removed
    Delete { namespace: NamespaceId, key: Vec<u8> },
}

impl LogRecord {
    fn kind(&self) -> u8 {
        match self {
            LogRecord::CreateNamespace { .. } => KIND_CREATE_NAMESPACE,
            LogRecord::Put { .. } => KIND_PUT,
            LogRecord::Delete { .. } => KIND_DELETE,
        }
    }

    fn serialize_body(&self) -> Vec<u8> {
        let (namespace, primary, secondary): (NamespaceId, &[u8], &[u8]) = match self {
            LogRecord::CreateNamespace { id, name } => (*id, name.as_bytes(), &[][..]),
            LogRecord::Put {
                namespace,
                key,
                value,
            } => (*namespace, key.as_slice(), value.as_slice()),
            LogRecord::Delete { namespace, key } => (*namespace, key.as_slice(), &[][..]),
        };

        let mut buf = Vec::with_capacity(1 + 4 + 8 + primary.len() + secondary.len());
        buf.push(self.kind());
        buf.extend_from_slice(&namespace.to_le_bytes());
        buf.extend_from_slice(&(primary.len() as u32).to_le_bytes());
        buf.extend_from_slice(primary);
        buf.extend_from_slice(&(secondary.len() as u32).to_le_bytes());
        buf.extend_from_slice(secondary);
        buf
    }

    /// Serialize the complete record to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.serialize_body();
        let record_length = (4 + body.len() + 4) as u32;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&body);
        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        record
    }

    /// Deserialize a record from bytes, verifying checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }
        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = compute_checksum(&data[..checksum_offset]);
        if computed_checksum != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let mut cursor = io::Cursor::new(&data[4..checksum_offset]);

        fn read_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
            let mut len_buf = [0u8; 4];
            reader.read_exact(&mut len_buf)?;
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            Ok(buf)
        }

        let mut kind = [0u8; 1];
        cursor.read_exact(&mut kind)?;
        let mut ns_buf = [0u8; 4];
        cursor.read_exact(&mut ns_buf)?;
        let namespace = u32::from_le_bytes(ns_buf);
        let primary = read_bytes(&mut cursor)?;
        let secondary = read_bytes(&mut cursor)?;

        let record = match kind[0] {
            KIND_CREATE_NAMESPACE => {
                let name = String::from_utf8(primary).map_err(|e| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e))
                })?;
                LogRecord::CreateNamespace {
                    id: namespace,
                    name,
                }
            }
            KIND_PUT => LogRecord::Put {
                namespace,
                key: primary,
                value: secondary,
            },
            KIND_DELETE => LogRecord::Delete {
                namespace,
                key: primary,
            },
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Unknown record kind: {}", other),
                ))
            }
        };

        Ok((record, record_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_put() -> LogRecord {
        LogRecord::Put {
            namespace: 2,
            key: b"\x80\x00\x00\x14:2".to_vec(),
            value: b"2".to_vec(),
        }
    }

    #[test]
    fn test_each_kind_survives_serialization() {
        let records = [
            LogRecord::CreateNamespace {
                id: 0,
                name: "scalar:7".to_string(),
            },
            sample_put(),
            LogRecord::Delete {
                namespace: 2,
                key: b"red:9".to_vec(),
            },
        ];

        for record in records {
            let bytes = record.serialize();
            let (decoded, consumed) = LogRecord::deserialize(&bytes).unwrap();
            assert_eq!(decoded, record);
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut bytes = sample_put().serialize();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;

        let err = LogRecord::deserialize(&bytes).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_truncated_record_rejected() {
        let bytes = sample_put().serialize();
        let err = LogRecord::deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_consecutive_records_consume_exact_length() {
        let first = sample_put().serialize();
        let mut stream = first.clone();
        stream.extend(
            LogRecord::Delete {
                namespace: 1,
                key: b"k".to_vec(),
            }
            .serialize(),
        );

        let (_, consumed) = LogRecord::deserialize(&stream).unwrap();
        assert_eq!(consumed, first.len());
        let (second, _) = LogRecord::deserialize(&stream[consumed..]).unwrap();
        assert!(matches!(second, LogRecord::Delete { namespace: 1, .. }));
    }
}
