// Copyright (C) Microsoft Corporation. All rights reserved.

use test_with_tracing::test;

use super::*;

const SHA256_VECTORS: &[ShaTestVector] = &[
    ShaTestVector {
        msg: b"",
        md: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
    },
    ShaTestVector {
        msg: b"abc",
        md: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
    },
    ShaTestVector {
        msg: b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq",
        md: "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1",
    },
    ShaTestVector {
        msg: &[1u8; 1024],
        md: "5a648d8015900d89664e00e125df179636301a2d8fa191c1aa2bd9358ea53a69",
    },
];

#[test]
fn test_sha256_known_answers() {
    require_engine!();
    check_vectors(DigestAlgo::Sha256, SHA256_VECTORS);
}

#[test]
fn test_sha256_million_a() {
    require_engine!();

    let block = [b'a'; 1000];
    let mut context = DigestContext::new(DigestAlgo::Sha256).expect("init sha256");
    for _ in 0..1000 {
        context.update(&block).expect("update sha256");
    }
    let out = context.finalize().expect("final sha256");
    assert_eq!(
        to_hex(&out),
        "cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0"
    );
}

#[test]
fn test_sha256_streaming_split() {
    require_engine!();

    const DATA: [u8; 1024] = [1u8; 1024];
    let mut context = DigestContext::new(DigestAlgo::Sha256).expect("init sha256");
    context.update(&DATA[..700]).expect("update sha256 part1");
    context.update(&DATA[700..]).expect("update sha256 part2");
    let out = context.finalize().expect("final sha256");
    assert_eq!(
        out,
        [
            0x5a, 0x64, 0x8d, 0x80, 0x15, 0x90, 0x0d, 0x89, 0x66, 0x4e, 0x00, 0xe1, 0x25, 0xdf,
            0x17, 0x96, 0x36, 0x30, 0x1a, 0x2d, 0x8f, 0xa1, 0x91, 0xc1, 0xaa, 0x2b, 0xd9, 0x35,
            0x8e, 0xa5, 0x3a, 0x69,
        ]
    );
}
