//! Property-based tests for the scrubbing engine.
//!
//! Uses proptest to check that streaming output does not depend on how the
//! input is chunked, that no configured secret survives, and that cleaning
//! is idempotent when substitutes are inert.

use proptest::prelude::*;
use pwc_clean::{Cleaner, SharedBuffer};
use std::io::Cursor;

/// Reference implementation: scan left to right, longest match first.
fn naive_clean(secrets: &[(Vec<u8>, Vec<u8>)], input: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < input.len() {
        let best = secrets
            .iter()
            .filter(|(p, _)| input[pos..].starts_with(p))
            .max_by_key(|(p, _)| p.len());
        match best {
            Some((p, s)) => {
                out.extend_from_slice(s);
                pos += p.len();
            }
            None => {
                out.push(input[pos]);
                pos += 1;
            }
        }
    }
    out
}

fn build(secrets: &[(Vec<u8>, Vec<u8>)], chunk_size: usize) -> Cleaner {
    let mut cleaner = Cleaner::new(chunk_size);
    for (p, s) in secrets {
        cleaner.add(p, s).unwrap();
    }
    cleaner
}

fn stream(cleaner: &mut Cleaner, input: &[u8]) -> Vec<u8> {
    let out = SharedBuffer::new();
    cleaner
        .bind_io(Cursor::new(input.to_vec()), out.clone())
        .unwrap();
    cleaner.run().unwrap();
    out.take()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Small alphabet so secrets actually occur and overlap.
fn text(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"abcd ".to_vec()), 0..max_len)
}

/// Unique, non-empty patterns over the same alphabet; substitutes never
/// contain pattern bytes.
fn secrets() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    prop::collection::btree_map(
        prop::collection::vec(prop::sample::select(b"abcd".to_vec()), 1..6),
        prop::collection::vec(prop::sample::select(b"XYZ#".to_vec()), 1..4),
        1..5,
    )
    .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Streaming output equals the reference scan.
    #[test]
    fn matches_reference(secrets in secrets(), input in text(200), chunk in 1usize..32) {
        let mut cleaner = build(&secrets, chunk);
        let streamed = stream(&mut cleaner, &input);
        prop_assert_eq!(streamed, naive_clean(&secrets, &input));
    }

    /// Output does not depend on the chunk size.
    #[test]
    fn chunk_size_invariance(
        secrets in secrets(),
        input in text(300),
        a in 1usize..16,
        b in 16usize..128,
    ) {
        let small = stream(&mut build(&secrets, a), &input);
        let large = stream(&mut build(&secrets, b), &input);
        let in_memory = build(&secrets, 0).clean_to_vec(&input).unwrap();
        prop_assert_eq!(&small, &large);
        prop_assert_eq!(&small, &in_memory);
    }

    /// With inert substitutes no secret survives and a second pass is a no-op.
    #[test]
    fn no_leftover_secret_and_idempotent(
        secrets in secrets(),
        input in text(300),
        chunk in 1usize..24,
    ) {
        let mut cleaner = build(&secrets, chunk);
        let once = stream(&mut cleaner, &input);
        for (pattern, _) in &secrets {
            prop_assert!(!contains(&once, pattern));
        }
        let twice = stream(&mut cleaner, &once);
        prop_assert_eq!(once, twice);
    }
}
