//! RTM and DCB codecs.
//!
//! Grounded on `examples/original_source/lib/serializer.c`
//! (`tbi_serialize_rtm`/`tbi_deserialize_rtm`/`convert_to_diff`/
//! `get_min_bit_repr`/`tbi_serialize_dcb`), translated into safe Rust and
//! built on [`crate::bitio`].
//!
//! A "native record" is a flat `Vec<u8>` of exactly `raw_size` bytes: each
//! field's bytes back-to-back, in declared order, in the host's native byte
//! order. Callers assemble/consume these directly (`schedule` takes one as
//! input; the server's callback receives one); [`encode_native_record`] and
//! [`decode_native_record`] are provided so tests and simple callers don't
//! have to hand-roll the byte layout.

use tbi_proto::FieldTag;

use crate::{bitio, error::TbiError};

/// Pack a slice of field values (one `i64` per field, sign-extended or
/// zero-extended as appropriate) into a native record buffer.
#[must_use]
pub fn encode_native_record(fields: &[FieldTag], values: &[i64]) -> Vec<u8> {
    debug_assert_eq!(fields.len(), values.len());
    let mut out = Vec::with_capacity(fields.iter().map(|f| f.width()).sum());
    for (field, &value) in fields.iter().zip(values) {
        match (field.width(), field.is_signed()) {
            (4, true) => out.extend_from_slice(&(value as i32).to_ne_bytes()),
            (4, false) => out.extend_from_slice(&(value as u32).to_ne_bytes()),
            (2, true) => out.extend_from_slice(&(value as i16).to_ne_bytes()),
            (2, false) => out.extend_from_slice(&(value as u16).to_ne_bytes()),
            (1, true) => out.extend_from_slice(&(value as i8).to_ne_bytes()),
            (1, false) => out.extend_from_slice(&(value as u8).to_ne_bytes()),
            (w, _) => unreachable!("unsupported field width {w}"),
        }
    }
    out
}

/// Unpack a native record buffer into one `i64` per field, sign-extended for
/// signed fields.
///
/// # Panics
///
/// Panics if `record` is shorter than `raw_size(fields)`; every caller in
/// this crate only ever passes a buffer already validated against that
/// length.
#[must_use]
#[allow(clippy::expect_used)]
pub fn decode_native_record(fields: &[FieldTag], record: &[u8]) -> Vec<i64> {
    let mut values = Vec::with_capacity(fields.len());
    let mut offset = 0;
    for field in fields {
        let w = field.width();
        let chunk = &record[offset..offset + w];
        let value: i64 = match (w, field.is_signed()) {
            (4, true) => i32::from_ne_bytes(chunk.try_into().expect("4-byte slice")) as i64,
            (4, false) => u32::from_ne_bytes(chunk.try_into().expect("4-byte slice")) as i64,
            (2, true) => i16::from_ne_bytes(chunk.try_into().expect("2-byte slice")) as i64,
            (2, false) => u16::from_ne_bytes(chunk.try_into().expect("2-byte slice")) as i64,
            (1, true) => chunk[0] as i8 as i64,
            (1, false) => chunk[0] as i64,
            (w, _) => unreachable!("unsupported field width {w}"),
        };
        values.push(value);
        offset += w;
    }
    values
}

fn raw_size(fields: &[FieldTag]) -> usize {
    fields.iter().map(|f| f.width()).sum()
}

/// Serialize one native record as a Real-Time Message payload.
///
/// Output length is `1 + raw_size`: byte 0 is `msgtype` (the caller overlays
/// flags on top, see `tbi_proto::frame::pack_byte0`), followed by each field
/// re-encoded big-endian.
///
/// # Errors
///
/// Returns [`TbiError::Format`] if `record.len() != raw_size(fields)`.
///
/// # Panics
///
/// Does not panic: the length check above guarantees every field's chunk is
/// exactly `field.width()` bytes before the `try_into` conversions below run.
#[allow(clippy::expect_used)]
pub fn serialize_rtm(fields: &[FieldTag], msgtype: u8, record: &[u8]) -> Result<Vec<u8>, TbiError> {
    let expected = raw_size(fields);
    if record.len() != expected {
        return Err(TbiError::Format(format!(
            "record length {} does not match schema raw_size {expected}",
            record.len()
        )));
    }

    let mut out = Vec::with_capacity(1 + expected);
    out.push(msgtype);
    let mut offset = 0;
    for field in fields {
        let w = field.width();
        let chunk = &record[offset..offset + w];
        match w {
            4 => {
                let v = u32::from_ne_bytes(chunk.try_into().expect("4-byte slice"));
                out.extend_from_slice(&v.to_be_bytes());
            },
            2 => {
                let v = u16::from_ne_bytes(chunk.try_into().expect("2-byte slice"));
                out.extend_from_slice(&v.to_be_bytes());
            },
            1 => out.push(chunk[0]),
            other => unreachable!("unsupported field width {other}"),
        }
        offset += w;
    }
    Ok(out)
}

/// Decode a Real-Time Message payload into a native record.
///
/// # Errors
///
/// Returns [`TbiError::Format`] if `frame.len() != 1 + raw_size(fields)`.
///
/// # Panics
///
/// Does not panic: the length check above guarantees each field's slice of
/// `frame` is exactly `field.width()` bytes before the `try_into`
/// conversions below run.
#[allow(clippy::expect_used)]
pub fn deserialize_rtm(fields: &[FieldTag], frame: &[u8]) -> Result<Vec<u8>, TbiError> {
    let expected_len = 1 + raw_size(fields);
    if frame.len() != expected_len {
        return Err(TbiError::Format(format!(
            "RTM frame length {} does not match expected {expected_len}",
            frame.len()
        )));
    }

    let mut record = vec![0u8; raw_size(fields)];
    let mut in_off = 1; // skip msgtype/flags byte
    let mut out_off = 0;
    for field in fields {
        let w = field.width();
        match w {
            4 => {
                let v = u32::from_be_bytes(frame[in_off..in_off + 4].try_into().expect("4 bytes"));
                record[out_off..out_off + 4].copy_from_slice(&v.to_ne_bytes());
            },
            2 => {
                let v = u16::from_be_bytes(frame[in_off..in_off + 2].try_into().expect("2 bytes"));
                record[out_off..out_off + 2].copy_from_slice(&v.to_ne_bytes());
            },
            1 => record[out_off] = frame[in_off],
            other => unreachable!("unsupported field width {other}"),
        }
        in_off += w;
        out_off += w;
    }
    Ok(record)
}

/// `(unsigned magnitude, sign bit)` for `current - previous`, sign bit set
/// (`true`) when `current < previous` (SPEC_FULL §4.4 step 2).
///
/// # Panics
///
/// Does not panic: both operands come from a field no wider than 32 bits, so
/// their difference's magnitude always fits in a `u32`.
#[allow(clippy::expect_used)]
fn diff_field(current: i64, previous: i64) -> (u32, bool) {
    if current < previous {
        (u32::try_from(previous - current).expect("diff fits in u32"), true)
    } else {
        (u32::try_from(current - previous).expect("diff fits in u32"), false)
    }
}

/// Serialize a sequence of native records as a Delta-Compressed Bundle.
///
/// `records[0]` is emitted verbatim as a leading RTM frame; if there's only
/// one record, that's the whole output. Otherwise records 1..N are
/// diffed against their immediate predecessor, and the smallest bit-width
/// that covers every diff for a given field (across the whole bundle) is
/// used uniformly for that field (SPEC_FULL §4.4).
///
/// # Errors
///
/// Returns [`TbiError::Format`] if `records` is empty or any record's length
/// doesn't match `raw_size(fields)`.
pub fn serialize_dcb(
    fields: &[FieldTag],
    msgtype: u8,
    records: &[Vec<u8>],
) -> Result<Vec<u8>, TbiError> {
    if records.is_empty() {
        return Err(TbiError::Format("DCB bundle must have at least one record".to_string()));
    }

    let mut out = serialize_rtm(fields, msgtype, &records[0])?;
    if records.len() == 1 {
        return Ok(out);
    }

    for (idx, record) in records.iter().enumerate() {
        if record.len() != raw_size(fields) {
            return Err(TbiError::Format(format!(
                "record {idx} length {} does not match schema raw_size",
                record.len()
            )));
        }
    }

    let parsed: Vec<Vec<i64>> = records.iter().map(|r| decode_native_record(fields, r)).collect();
    let nfields = fields.len();
    let n_diffs = records.len() - 1;

    // signs[k][f], magnitudes[k][f] for k in 0..n_diffs (record k+1 vs record k)
    let mut signs: Vec<Vec<bool>> = Vec::with_capacity(n_diffs);
    let mut magnitudes: Vec<Vec<u32>> = Vec::with_capacity(n_diffs);
    let mut max_bits = vec![0u32; nfields];

    for k in 0..n_diffs {
        let mut row_signs = Vec::with_capacity(nfields);
        let mut row_mags = Vec::with_capacity(nfields);
        for (f_idx, field) in fields.iter().enumerate() {
            let (mag, sign) = diff_field(parsed[k + 1][f_idx], parsed[k][f_idx]);
            let bits = bitio::min_bits(mag, false, field.width_bits());
            max_bits[f_idx] = max_bits[f_idx].max(bits);
            row_signs.push(sign);
            row_mags.push(mag);
        }
        signs.push(row_signs);
        magnitudes.push(row_mags);
    }

    let header_bits = 8 + 6 * nfields as u32;
    let payload_bits = n_diffs as u32 * (nfields as u32 + max_bits.iter().sum::<u32>());
    let total_bits = header_bits + payload_bits;
    let mut bitbuf = vec![0u8; (total_bits as usize).div_ceil(8)];
    let mut cursor = 0usize;

    bitio::pack(&mut bitbuf, n_diffs as u32, 8, &mut cursor);
    for &bits in &max_bits {
        bitio::pack(&mut bitbuf, bits, 6, &mut cursor);
    }
    for k in 0..n_diffs {
        for &sign in &signs[k] {
            bitio::pack(&mut bitbuf, u32::from(sign), 1, &mut cursor);
        }
        for (f_idx, &mag) in magnitudes[k].iter().enumerate() {
            bitio::pack(&mut bitbuf, mag, max_bits[f_idx], &mut cursor);
        }
    }

    out.extend_from_slice(&bitbuf);
    Ok(out)
}

/// Decode a Delta-Compressed Bundle into its sequence of native records.
///
/// # Errors
///
/// Returns [`TbiError::Format`] if the frame is shorter than the leading RTM
/// prefix, if the leading RTM fails to decode, or if the bit-packed tail is
/// too short for the header it claims.
pub fn deserialize_dcb(fields: &[FieldTag], frame: &[u8]) -> Result<Vec<Vec<u8>>, TbiError> {
    let rtm_len = 1 + raw_size(fields);
    if frame.len() < rtm_len {
        return Err(TbiError::Format(format!(
            "DCB frame length {} shorter than leading RTM prefix {rtm_len}",
            frame.len()
        )));
    }

    let record0 = deserialize_rtm(fields, &frame[..rtm_len])?;
    if frame.len() == rtm_len {
        return Ok(vec![record0]);
    }

    let tail = &frame[rtm_len..];
    let nfields = fields.len();
    let header_bits = 8 + 6 * nfields as u32;
    if (tail.len() as u32) * 8 < header_bits {
        return Err(TbiError::Format("DCB tail too short for header".to_string()));
    }

    let mut cursor = 0usize;
    let n_diffs = bitio::unpack(tail, 8, &mut cursor) as usize;
    let mut max_bits = vec![0u32; nfields];
    for slot in &mut max_bits {
        *slot = bitio::unpack(tail, 6, &mut cursor);
    }

    let payload_bits = n_diffs as u32 * (nfields as u32 + max_bits.iter().sum::<u32>());
    if (tail.len() as u32) * 8 < header_bits + payload_bits {
        return Err(TbiError::Format("DCB tail too short for payload".to_string()));
    }

    let mut records = vec![record0.clone()];
    let mut prev = decode_native_record(fields, &record0);

    for _ in 0..n_diffs {
        let mut row_signs = vec![false; nfields];
        for slot in &mut row_signs {
            *slot = bitio::unpack(tail, 1, &mut cursor) != 0;
        }
        let mut cur = vec![0i64; nfields];
        for (f_idx, slot) in cur.iter_mut().enumerate() {
            let mag = i64::from(bitio::unpack(tail, max_bits[f_idx], &mut cursor));
            *slot = if row_signs[f_idx] { prev[f_idx] - mag } else { prev[f_idx] + mag };
        }
        records.push(encode_native_record(fields, &cur));
        prev = cur;
    }

    Ok(records)
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use tbi_proto::FieldTag;

    fn arb_record(fields: &[FieldTag]) -> impl Strategy<Value = Vec<i64>> + '_ {
        let strategies: Vec<_> = fields
            .iter()
            .map(|field| {
                let w = field.width_bits();
                if field.is_signed() {
                    let half = 1i64 << (w - 1);
                    (-half..half).boxed()
                } else {
                    let max = if w == 32 { u32::MAX as i64 } else { (1i64 << w) - 1 };
                    (0i64..=max).boxed()
                }
            })
            .collect();
        strategies
    }

    proptest! {
        #[test]
        fn rtm_round_trip_property(values in arb_record(&[FieldTag::TimeS, FieldTag::I16, FieldTag::U8])) {
            let fields = [FieldTag::TimeS, FieldTag::I16, FieldTag::U8];
            let record = encode_native_record(&fields, &values);
            let frame = serialize_rtm(&fields, 4, &record).unwrap();
            let decoded = deserialize_rtm(&fields, &frame).unwrap();
            prop_assert_eq!(decoded, record);
        }

        #[test]
        fn dcb_round_trip_property(
            r0 in arb_record(&[FieldTag::U16, FieldTag::I32]),
            r1 in arb_record(&[FieldTag::U16, FieldTag::I32]),
            r2 in arb_record(&[FieldTag::U16, FieldTag::I32]),
        ) {
            let fields = [FieldTag::U16, FieldTag::I32];
            let records = vec![
                encode_native_record(&fields, &r0),
                encode_native_record(&fields, &r1),
                encode_native_record(&fields, &r2),
            ];
            let frame = serialize_dcb(&fields, 5, &records).unwrap();
            let decoded = deserialize_dcb(&fields, &frame).unwrap();
            prop_assert_eq!(decoded, records);
        }
    }
}
