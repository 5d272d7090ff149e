//! RFC 8032 section 7.4 test vectors for Ed448.

use goldilocks448::ed448::{Ed448, ED448_SIGNATURE_BYTES};

fn from_hex<const N: usize>(s: &str) -> [u8; N] {
    hex::decode(s).unwrap().try_into().unwrap()
}

struct Vector {
    secret: &'static str,
    public: &'static str,
    message: &'static str,
    signature: &'static str,
}

// "-----blank" and "1 octet" from RFC 8032 §7.4, empty context.
const VECTORS: &[Vector] = &[
    Vector {
        secret: "6c82a562cb808d10d632be89c8513ebf6c929f34ddfa8c9f63c9960ef6e348a3\
                 528c8a3fcc2f044e39a3fc5b94492f8f032e7549a20098f95b",
        public: "5fd7449b59b461fd2ce787ec616ad46a1da1342485a70e1f8a0ea75d80e96778\
                 edf124769b46c7061bd6783df1e50f6cd1fa1abeafe8256180",
        message: "",
        signature: "533a37f6bbe457251f023c0d88f976ae2dfb504a843e34d2074fd823d41a591f\
                    2b233f034f628281f2fd7a22ddd47d7828c59bd0a21bfd3980ff0d2028d4b18a\
                    9df63e006c5d1c2d345b925d8dc00b4104852db99ac5c7cdda8530a113a0f4db\
                    b61149f05a7363268c71d95808ff2e652600",
    },
    Vector {
        secret: "c4eab05d357007c632f3dbb48489924d552b08fe0c353a0d4a1f00acda2c463a\
                 fbea67c5e8d2877c5e3bc397a659949ef8021e954e0a12274e",
        public: "43ba28f430cdff456ae531545f7ecd0ac834a55d9358c0372bfa0c6c6798c086\
                 6aea01eb00742802b8438ea4cb82169c235160627b4c3a9480",
        message: "03",
        signature: "26b8f91727bd62897af15e41eb43c377efb9c610d48f2335cb0bd0087810f435\
                    2541b143c4b981b7e18f62de8ccdf633fc1bf037ab7cd779805e0dbcc0aae1cb\
                    cee1afb2e027df36bc04dcecbf154336c19f0af7e0a6472905e799f1953d2a0f\
                    f3348ab21aa4adafd1d234441cf807c03a00",
    },
];

#[test]
fn public_key_derivation_matches_vectors() {
    for v in VECTORS {
        let secret = from_hex::<57>(v.secret);
        let public = from_hex::<57>(v.public);
        assert_eq!(Ed448::derive_public_key(&secret), public);
    }
}

#[test]
fn signing_matches_vectors() {
    for v in VECTORS {
        let secret = from_hex::<57>(v.secret);
        let public = from_hex::<57>(v.public);
        let message = hex::decode(v.message).unwrap();
        let signature = from_hex::<ED448_SIGNATURE_BYTES>(v.signature);
        assert_eq!(Ed448::sign(&secret, &public, &message, b""), signature);
    }
}

#[test]
fn verification_accepts_vectors_and_rejects_flips() {
    for v in VECTORS {
        let public = from_hex::<57>(v.public);
        let message = hex::decode(v.message).unwrap();
        let signature = from_hex::<ED448_SIGNATURE_BYTES>(v.signature);
        assert!(Ed448::verify(&signature, &public, &message, b"").is_ok());

        // Any single-bit flip must be rejected.
        for pos in [0, 28, 56, 57, 100, ED448_SIGNATURE_BYTES - 2] {
            let mut bad = signature;
            bad[pos] ^= 1;
            assert!(
                Ed448::verify(&bad, &public, &message, b"").is_err(),
                "accepted a flipped bit at byte {pos}"
            );
        }
        let mut bad_msg = message.clone();
        bad_msg.push(0);
        assert!(Ed448::verify(&signature, &public, &bad_msg, b"").is_err());
    }
}

#[test]
fn prehashed_signatures_round_trip() {
    let secret = from_hex::<57>(VECTORS[0].secret);
    let public = from_hex::<57>(VECTORS[0].public);
    let sig = Ed448::sign_prehash(&secret, &public, b"abc", b"");
    assert!(Ed448::verify_prehash(&sig, &public, b"abc", b"").is_ok());
    assert!(Ed448::verify_prehash(&sig, &public, b"abd", b"").is_err());

    let mut bad = sig;
    bad[3] ^= 0x10;
    assert!(Ed448::verify_prehash(&bad, &public, b"abc", b"").is_err());
}
