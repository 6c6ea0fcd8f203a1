//! Helpers to read and write the field-element encoding used by L2 logs.

use crate::EventDecodeError;
use alloy_primitives::{B256, U256};

/// The amount of bytes packed in a single field element. The leading byte of the field is left
/// empty so the value always fits in the scalar field.
pub const BYTES_PER_FIELD: usize = 31;

/// Returns the field element representation of the provided integer.
pub fn field_from_u64(value: u64) -> B256 {
    B256::left_padding_from(&value.to_be_bytes())
}

/// Packs the bytes into field elements, prefixed by the byte length.
pub fn bytes_to_fields(bytes: &[u8]) -> Vec<B256> {
    let mut fields = Vec::with_capacity(1 + bytes.len().div_ceil(BYTES_PER_FIELD));
    fields.push(field_from_u64(bytes.len() as u64));
    for chunk in bytes.chunks(BYTES_PER_FIELD) {
        let mut field = B256::ZERO;
        field[1..1 + chunk.len()].copy_from_slice(chunk);
        fields.push(field);
    }
    fields
}

/// Unpacks `length` bytes out of the provided fields. Returns [`None`] if the fields do not hold
/// enough data.
pub fn fields_to_bytes(length: usize, fields: &[B256]) -> Option<Vec<u8>> {
    if fields.len() < length.div_ceil(BYTES_PER_FIELD) {
        return None;
    }

    let mut bytes = Vec::with_capacity(length);
    for field in fields {
        let remaining = length - bytes.len();
        if remaining == 0 {
            break;
        }
        let take = remaining.min(BYTES_PER_FIELD);
        bytes.extend_from_slice(&field[1..1 + take]);
    }
    Some(bytes)
}

/// A cursor over a slice of field elements, used by the event decoders.
#[derive(Debug)]
pub struct FieldReader<'a> {
    fields: &'a [B256],
    cursor: usize,
    event: &'static str,
}

impl<'a> FieldReader<'a> {
    /// Returns a new reader over the fields, reporting errors for the named event.
    pub const fn new(fields: &'a [B256], event: &'static str) -> Self {
        Self { fields, cursor: 0, event }
    }

    /// Returns the amount of fields left to read.
    pub const fn remaining(&self) -> usize {
        self.fields.len().saturating_sub(self.cursor)
    }

    /// Reads the next field.
    pub fn read_field(&mut self) -> Result<B256, EventDecodeError> {
        let field = self
            .fields
            .get(self.cursor)
            .copied()
            .ok_or(EventDecodeError::UnexpectedEnd { event: self.event, position: self.cursor })?;
        self.cursor += 1;
        Ok(field)
    }

    /// Reads the next `n` fields.
    pub fn read_fields(&mut self, n: usize) -> Result<Vec<B256>, EventDecodeError> {
        (0..n).map(|_| self.read_field()).collect()
    }

    /// Reads the next field as a [`u64`].
    pub fn read_u64(&mut self) -> Result<u64, EventDecodeError> {
        let position = self.cursor;
        let field = self.read_field()?;
        u64::try_from(U256::from_be_bytes(field.0))
            .map_err(|_| EventDecodeError::FieldOverflow { event: self.event, position })
    }

    /// Reads the next field as a [`u32`].
    pub fn read_u32(&mut self) -> Result<u32, EventDecodeError> {
        let position = self.cursor;
        let value = self.read_u64()?;
        u32::try_from(value)
            .map_err(|_| EventDecodeError::FieldOverflow { event: self.event, position })
    }

    /// Reads length-prefixed packed bytes, see [`bytes_to_fields`].
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, EventDecodeError> {
        let length = self.read_u64()?;
        let invalid = EventDecodeError::InvalidBytesLength { event: self.event, length };
        let length = usize::try_from(length).map_err(|_| invalid.clone())?;
        let count = length.div_ceil(BYTES_PER_FIELD);
        if count > self.remaining() {
            return Err(invalid);
        }
        let fields = self.read_fields(count)?;
        fields_to_bytes(length, &fields).ok_or(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_pack_and_unpack_bytes() {
        let bytes = (0..100u8).collect::<Vec<_>>();
        let fields = bytes_to_fields(&bytes);

        // 1 length prefix + ceil(100 / 31) chunks.
        assert_eq!(fields.len(), 5);
        assert!(fields.iter().skip(1).all(|f| f[0] == 0));

        let mut reader = FieldReader::new(&fields, "test");
        assert_eq!(reader.read_bytes().unwrap(), bytes);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_should_reject_truncated_bytes() {
        let mut fields = bytes_to_fields(&[7u8; 64]);
        fields.pop();

        let mut reader = FieldReader::new(&fields, "test");
        assert_eq!(
            reader.read_bytes(),
            Err(EventDecodeError::InvalidBytesLength { event: "test", length: 64 })
        );
    }

    #[test]
    fn test_should_reject_overflowing_integer() {
        let fields = [B256::repeat_byte(0xff)];
        let mut reader = FieldReader::new(&fields, "test");
        assert_eq!(
            reader.read_u64(),
            Err(EventDecodeError::FieldOverflow { event: "test", position: 0 })
        );
    }

    #[test]
    fn test_should_report_unexpected_end() {
        let fields = [field_from_u64(1)];
        let mut reader = FieldReader::new(&fields, "test");
        assert_eq!(reader.read_u64(), Ok(1));
        assert_eq!(
            reader.read_field(),
            Err(EventDecodeError::UnexpectedEnd { event: "test", position: 1 })
        );
    }
}
