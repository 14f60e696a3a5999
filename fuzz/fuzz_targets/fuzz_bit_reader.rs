//! Fuzz target for the bit reader.
//!
//! Interprets the input as a script of reads against a bit buffer. Every
//! read past the end or with an impossible prefix must return an error.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lmstore_core::BitReader;

#[derive(Debug, Arbitrary)]
enum Op {
    Bits(u8),
    Bit,
    Gamma,
    Delta,
    Float,
    Skip(u16),
    Seek(u32),
}

#[derive(Debug, Arbitrary)]
struct Input {
    bytes: Vec<u8>,
    trailing_bits: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let full = input.bytes.len() as u64 * 8;
    let len = full.saturating_sub(u64::from(input.trailing_bits % 8));
    let mut reader = BitReader::new(&input.bytes, len);

    for op in input.ops {
        let result = match op {
            Op::Bits(width) => reader.read_bits(u32::from(width % 65)).map(drop),
            Op::Bit => reader.read_bit().map(drop),
            Op::Gamma => reader.read_gamma().map(drop),
            Op::Delta => reader.read_delta().map(drop),
            Op::Float => reader.read_f32().map(drop),
            Op::Skip(width) => reader.skip(u64::from(width)),
            Op::Seek(pos) => reader.seek(u64::from(pos)),
        };
        if result.is_err() {
            break;
        }
        assert!(reader.position() <= len);
    }
});
