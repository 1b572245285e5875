//! Fuzz target for streaming cleaning.
//!
//! Streams arbitrary data through arbitrary secrets with arbitrary read
//! sizes and checks the result against cleaning the whole input at once.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pwc_clean::{source_fn, Cleaner, SharedBuffer};

#[derive(Debug, Arbitrary)]
struct Input {
    secrets: Vec<(Vec<u8>, Vec<u8>)>,
    data: Vec<u8>,
    chunk_size: u8,
    read_steps: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let mut cleaner = Cleaner::new(usize::from(input.chunk_size));
    for (pattern, substitute) in input.secrets.iter().take(8) {
        if pattern.is_empty() {
            continue;
        }
        let pattern = &pattern[..pattern.len().min(32)];
        cleaner.add(pattern, substitute).unwrap();
    }

    let expected = cleaner.clean_to_vec(&input.data).unwrap();

    let data = input.data;
    let steps = input.read_steps;
    let mut pos = 0;
    let mut call = 0;
    let source = source_fn(move |buf: &mut [u8]| {
        let step = steps.get(call % steps.len().max(1)).copied().unwrap_or(0);
        call += 1;
        let n = usize::from(step).max(1).min(buf.len()).min(data.len() - pos);
        buf[..n].copy_from_slice(&data[pos..pos + n]);
        pos += n;
        Ok(n)
    });
    let out = SharedBuffer::new();
    cleaner.bind_io(source, out.clone()).unwrap();
    cleaner.run().unwrap();

    assert_eq!(out.take(), expected);
});
