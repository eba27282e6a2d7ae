use crate::error::PipelineError;

/// Bytes per sample for 16-bit PCM.
pub const SAMPLE_WIDTH: usize = 2;

/// Decode a raw little-endian 16-bit mono frame into samples.
pub fn decode_frame(raw: &[u8]) -> Result<Vec<i16>, PipelineError> {
    if raw.len() % SAMPLE_WIDTH != 0 {
        return Err(PipelineError::MalformedFrame { len: raw.len() });
    }

    let mut samples = Vec::with_capacity(raw.len() / SAMPLE_WIDTH);
    samples.extend(
        raw.chunks_exact(SAMPLE_WIDTH)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
    );
    Ok(samples)
}

/// Inverse of [`decode_frame`], used by the capture callback.
pub fn encode_frame(samples: &[i16]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(samples.len() * SAMPLE_WIDTH);
    for sample in samples {
        raw.extend_from_slice(&sample.to_le_bytes());
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_pairs() {
        let raw = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0xff, 0x7f];
        let samples = decode_frame(&raw).unwrap();
        assert_eq!(samples, vec![1, -1, i16::MIN, i16::MAX]);
    }

    #[test]
    fn rejects_odd_length() {
        let err = decode_frame(&[0x00, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedFrame { len: 3 }));
    }

    #[test]
    fn empty_frame_decodes_to_nothing() {
        assert!(decode_frame(&[]).unwrap().is_empty());
    }

    #[test]
    fn encode_matches_decoder_layout() {
        let raw = encode_frame(&[1000, -1000]);
        assert_eq!(raw, vec![0xe8, 0x03, 0x18, 0xfc]);
        assert_eq!(decode_frame(&raw).unwrap(), vec![1000, -1000]);
    }
}
