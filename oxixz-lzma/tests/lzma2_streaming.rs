//! Integration tests for streaming LZMA2 decompression.
//!
//! The fixtures under `tests/data/` are raw LZMA2 streams written by the
//! reference `xz` encoder (`--format=raw --lzma2`), next to the files they
//! decode to.

use oxixz_core::{DecompressStatus, Decompressor, ErrorKind, InOutBuffer};
use oxixz_lzma::{Direct, Growable, Lzma2Decoder, Preallocated, decode_lzma2};

/// 64 KiB
const LOREM_DICT: u8 = 8;
/// 128 KiB
const MIXED_DICT: u8 = 10;

fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("reading {path}: {e}"))
}

/// Drive a decoder with at most `in_step` input bytes and `out_step` output
/// bytes per call.
fn decode_in_steps<D: Decompressor>(
    decoder: &mut D,
    data: &[u8],
    in_step: usize,
    out_step: usize,
) -> Vec<u8> {
    let mut output = Vec::new();
    let mut window = vec![0u8; out_step];
    let mut pos = 0;

    loop {
        let end = (pos + in_step).min(data.len());
        let (consumed, produced, status) = decoder
            .decompress(&data[pos..end], &mut window)
            .expect("Decompress failed");
        pos += consumed;
        output.extend_from_slice(&window[..produced]);

        if status == DecompressStatus::Done {
            break;
        }
        assert!(
            consumed > 0 || produced > 0,
            "no progress at input {pos} of {}",
            data.len()
        );
    }

    assert_eq!(pos, data.len(), "end marker is the last byte");
    output
}

// ============================================================================
// Whole-buffer decoding
// ============================================================================

#[test]
fn test_lorem_one_shot() {
    let decoded = decode_lzma2(&fixture("lorem.lzma2"), LOREM_DICT).expect("decode");
    assert_eq!(decoded, fixture("lorem.txt"));
}

#[test]
fn test_mixed_one_shot() {
    // Mixed text and binary spans two LZMA chunks, the second without a
    // dictionary reset.
    let decoded = decode_lzma2(&fixture("mixed.lzma2"), MIXED_DICT).expect("decode");
    assert_eq!(decoded, fixture("mixed.bin"));
}

#[test]
fn test_random_stored_chunk() {
    let data = fixture("random.lzma2");
    assert_eq!(data[0], 0x01, "incompressible input is stored");
    let decoded = decode_lzma2(&data, 0).expect("decode");
    assert_eq!(decoded, fixture("random.bin"));
}

// ============================================================================
// Suspension
// ============================================================================

#[test]
fn test_lorem_small_input_chunks() {
    let expected = fixture("lorem.txt");
    let data = fixture("lorem.lzma2");

    for in_step in [1, 7, 20, 21, 22, 64] {
        let mut decoder = Lzma2Decoder::new(Growable::new(1 << 20));
        decoder.reset(LOREM_DICT).expect("reset");
        let decoded = decode_in_steps(&mut decoder, &data, in_step, 4096);
        assert_eq!(decoded, expected, "input step {in_step}");
    }
}

#[test]
fn test_lorem_small_output_windows() {
    let expected = fixture("lorem.txt");
    let data = fixture("lorem.lzma2");

    for out_step in [1, 3, 100, 4095] {
        let mut decoder = Lzma2Decoder::new(Growable::new(1 << 20));
        decoder.reset(LOREM_DICT).expect("reset");
        let decoded = decode_in_steps(&mut decoder, &data, data.len(), out_step);
        assert_eq!(decoded, expected, "output step {out_step}");
    }
}

#[test]
fn test_mixed_both_sides_small() {
    let expected = fixture("mixed.bin");
    let data = fixture("mixed.lzma2");

    let mut decoder = Lzma2Decoder::new(Preallocated::new(128 << 10).expect("alloc"));
    decoder.reset(MIXED_DICT).expect("reset");
    let decoded = decode_in_steps(&mut decoder, &data, 13, 257);
    assert_eq!(decoded, expected);
}

#[test]
fn test_random_byte_at_a_time() {
    let expected = fixture("random.bin");
    let data = fixture("random.lzma2");

    let mut decoder = Lzma2Decoder::new(Growable::new(4096));
    decoder.reset(0).expect("reset");
    let decoded = decode_in_steps(&mut decoder, &data, 5, 1);
    assert_eq!(decoded, expected);
}

#[test]
fn test_reset_allows_reuse() {
    let expected = fixture("lorem.txt");
    let data = fixture("lorem.lzma2");

    let mut decoder = Lzma2Decoder::new(Growable::new(1 << 20));
    decoder.reset(LOREM_DICT).expect("reset");
    let first = decode_in_steps(&mut decoder, &data, 1000, 1000);
    assert!(decoder.is_finished());

    decoder.reset(LOREM_DICT).expect("reset");
    let second = decode_in_steps(&mut decoder, &data, 333, 777);
    assert_eq!(first, expected);
    assert_eq!(second, expected);
}

// ============================================================================
// Direct dictionary
// ============================================================================

#[test]
fn test_direct_writes_into_caller_buffer() {
    let expected = fixture("mixed.bin");
    let data = fixture("mixed.lzma2");

    let mut decoder = Lzma2Decoder::new(Direct::new());
    decoder.reset(MIXED_DICT).expect("reset");

    let mut out = vec![0u8; expected.len() + 10];
    let mut buf = InOutBuffer::new(&data, &mut out);
    assert!(decoder.decode(&mut buf).expect("decode"));
    assert_eq!(buf.out_pos(), expected.len());
    assert!(buf.input_exhausted());
    assert_eq!(&out[..expected.len()], &expected[..]);
}

#[test]
fn test_direct_output_too_small() {
    let data = fixture("lorem.lzma2");

    let mut decoder = Lzma2Decoder::new(Direct::new());
    decoder.reset(LOREM_DICT).expect("reset");

    let mut out = vec![0u8; 1000];
    let mut buf = InOutBuffer::new(&data, &mut out);
    assert!(!decoder.decode(&mut buf).expect("decode"));
    assert!(buf.output_full());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_dictionary_larger_than_limit() {
    let mut decoder = Lzma2Decoder::new(Preallocated::new(4096).expect("alloc"));
    let err = decoder.reset(LOREM_DICT).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Options);
}

#[test]
fn test_missing_end_marker() {
    let mut data = fixture("lorem.lzma2");
    assert_eq!(data.pop(), Some(0x00));
    let err = decode_lzma2(&data, LOREM_DICT).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn test_truncated_inside_chunk() {
    let data = fixture("lorem.lzma2");
    let cut = &data[..data.len() / 2];
    let err = decode_lzma2(cut, LOREM_DICT).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn test_first_range_coder_byte_must_be_zero() {
    let mut data = fixture("lorem.lzma2");
    // Control, two size bytes each, props, then the first rc byte.
    assert_eq!(data[6], 0x00);
    data[6] = 0x01;
    let err = decode_lzma2(&data, LOREM_DICT).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
}
