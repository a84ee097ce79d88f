// Copyright (C) Microsoft Corporation. All rights reserved.

mod sha256_tests;

use test_with_tracing::test;

use super::*;
use crate::error::CryptoError;

/// Known-answer vector
pub struct ShaTestVector {
    pub msg: &'static [u8],
    pub md: &'static str,
}

/// Returns early from a test when the host has no libcrypto; degraded mode
/// is a supported configuration, not a test failure.
macro_rules! require_engine {
    () => {
        if !crate::library::is_available() {
            tracing::warn!("libcrypto not present on this host, skipping");
            return;
        }
    };
}
pub(crate) use require_engine;

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hashes `msg` fed in uneven chunks.
pub fn digest_chunked(algo: DigestAlgo, msg: &[u8]) -> Vec<u8> {
    let chunk_sizes = [1usize, 3, 7, 12, 2, 19, 64, 128];
    let mut context = DigestContext::new(algo).expect("init");
    let mut cursor = 0usize;
    let mut chunk_index = 0usize;

    while cursor < msg.len() {
        let chunk_len = chunk_sizes[chunk_index % chunk_sizes.len()];
        chunk_index += 1;

        let end = (cursor + chunk_len).min(msg.len());
        context.update(&msg[cursor..end]).expect("update");
        cursor = end;
    }

    context.finalize().expect("finalize")
}

pub fn check_vectors(algo: DigestAlgo, vectors: &[ShaTestVector]) {
    for vector in vectors {
        let one_shot = digest(algo, vector.msg).expect("one-shot digest");
        assert_eq!(one_shot.len(), algo.size());
        assert_eq!(to_hex(&one_shot), vector.md, "{algo} one-shot of {:?}", vector.msg);

        let chunked = digest_chunked(algo, vector.msg);
        assert_eq!(to_hex(&chunked), vector.md, "{algo} chunked of {:?}", vector.msg);
    }
}

#[test]
fn test_algo_names() {
    assert_eq!("sha1".parse::<DigestAlgo>(), Ok(DigestAlgo::Sha1));
    assert_eq!("SHA256".parse::<DigestAlgo>(), Ok(DigestAlgo::Sha256));
    assert_eq!(DigestAlgo::Sha256.to_string(), "sha256");
    assert_eq!(DigestAlgo::Sha1.size(), 20);
    assert_eq!(DigestAlgo::Sha256.size(), 32);
}

#[test]
fn test_unsupported_algorithm() {
    for name in ["md5", "sha512", "", "sha-256", "sha1 "] {
        assert_eq!(
            DigestContext::init(name).err(),
            Some(CryptoError::UnsupportedAlgorithm(name.to_string())),
            "{name:?}"
        );
    }
}

#[test]
fn test_init_by_name() {
    require_engine!();

    let context = DigestContext::init("sha256").expect("init");
    assert_eq!(context.algo(), DigestAlgo::Sha256);
    assert_eq!(context.finalize().expect("finalize").len(), 32);
}

#[test]
fn test_abandoned_sessions_are_released() {
    require_engine!();

    for _ in 0..1000 {
        let mut context = DigestContext::new(DigestAlgo::Sha1).expect("init");
        context.update(b"abandoned").expect("update");
        // Dropped here without finalize.
    }
}

#[test]
fn test_chunking_invariance() {
    require_engine!();

    let data: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 251) as u8).collect();
    for algo in [DigestAlgo::Sha1, DigestAlgo::Sha256] {
        let whole = digest(algo, &data).expect("digest");
        assert_eq!(digest_chunked(algo, &data), whole);

        let mut context = DigestContext::new(algo).expect("init");
        for chunk in data.chunks(1000) {
            context.update(chunk).expect("update");
        }
        // Empty updates change nothing.
        context.update(&[]).expect("empty update");
        assert_eq!(context.finalize().expect("finalize"), whole);
    }
}

#[test]
fn test_sessions_are_independent() {
    require_engine!();

    let mut a = DigestContext::new(DigestAlgo::Sha256).expect("init a");
    let mut b = DigestContext::new(DigestAlgo::Sha256).expect("init b");
    a.update(b"a").expect("update a");
    b.update(b"b").expect("update b");

    let a = a.finalize().expect("finalize a");
    let b = b.finalize().expect("finalize b");
    assert_ne!(a, b);
    assert_eq!(a, digest(DigestAlgo::Sha256, b"a").expect("digest"));
}

#[test]
fn test_context_moves_between_threads() {
    require_engine!();

    let mut context = DigestContext::new(DigestAlgo::Sha1).expect("init");
    context.update(b"ab").expect("update");

    let result = std::thread::spawn(move || {
        context.update(b"c").expect("update");
        context.finalize().expect("finalize")
    })
    .join()
    .expect("thread panicked");

    assert_eq!(to_hex(&result), "a9993e364706816aba3e25717850c26c9cd0d89d");
}
