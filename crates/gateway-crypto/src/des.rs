//! Single DES per FIPS 46-3.
//!
//! Bit-level implementation over `u64` blocks: initial permutation, 16
//! Feistel rounds with the PC-1/PC-2 key schedule, S-boxes 1..8, the P
//! permutation and the inverse initial permutation. Table positions follow
//! the FIPS numbering convention (bit 1 = most significant).
//!
//! DES alone is not a secure cipher; it exists here purely as the building
//! block for the TDES constructions in [`crate::tdes`].

use crate::errors::CryptoError;

/// Initial permutation.
const IP: [u8; 64] = [
    58, 50, 42, 34, 26, 18, 10, 2, 60, 52, 44, 36, 28, 20, 12, 4, //
    62, 54, 46, 38, 30, 22, 14, 6, 64, 56, 48, 40, 32, 24, 16, 8, //
    57, 49, 41, 33, 25, 17, 9, 1, 59, 51, 43, 35, 27, 19, 11, 3, //
    61, 53, 45, 37, 29, 21, 13, 5, 63, 55, 47, 39, 31, 23, 15, 7,
];

/// Inverse initial permutation.
const FP: [u8; 64] = [
    40, 8, 48, 16, 56, 24, 64, 32, 39, 7, 47, 15, 55, 23, 63, 31, //
    38, 6, 46, 14, 54, 22, 62, 30, 37, 5, 45, 13, 53, 21, 61, 29, //
    36, 4, 44, 12, 52, 20, 60, 28, 35, 3, 43, 11, 51, 19, 59, 27, //
    34, 2, 42, 10, 50, 18, 58, 26, 33, 1, 41, 9, 49, 17, 57, 25,
];

/// Key schedule permuted choice 1 (64 -> 56 bits, parity dropped).
const PC1: [u8; 56] = [
    57, 49, 41, 33, 25, 17, 9, 1, 58, 50, 42, 34, 26, 18, //
    10, 2, 59, 51, 43, 35, 27, 19, 11, 3, 60, 52, 44, 36, //
    63, 55, 47, 39, 31, 23, 15, 7, 62, 54, 46, 38, 30, 22, //
    14, 6, 61, 53, 45, 37, 29, 21, 13, 5, 28, 20, 12, 4,
];

/// Key schedule permuted choice 2 (56 -> 48 bits).
const PC2: [u8; 48] = [
    14, 17, 11, 24, 1, 5, 3, 28, 15, 6, 21, 10, //
    23, 19, 12, 4, 26, 8, 16, 7, 27, 20, 13, 2, //
    41, 52, 31, 37, 47, 55, 30, 40, 51, 45, 33, 48, //
    44, 49, 39, 56, 34, 53, 46, 42, 50, 36, 29, 32,
];

/// Expansion (32 -> 48 bits).
const E: [u8; 48] = [
    32, 1, 2, 3, 4, 5, 4, 5, 6, 7, 8, 9, //
    8, 9, 10, 11, 12, 13, 12, 13, 14, 15, 16, 17, //
    16, 17, 18, 19, 20, 21, 20, 21, 22, 23, 24, 25, //
    24, 25, 26, 27, 28, 29, 28, 29, 30, 31, 32, 1,
];

/// Straight permutation applied after the S-boxes.
const P: [u8; 32] = [
    16, 7, 20, 21, 29, 12, 28, 17, 1, 15, 23, 26, 5, 18, 31, 10, //
    2, 8, 24, 14, 32, 27, 3, 9, 19, 13, 30, 6, 22, 11, 4, 25,
];

/// Left-shift schedule for the 16 rounds.
const SHIFTS: [u8; 16] = [1, 1, 2, 2, 2, 2, 2, 2, 1, 2, 2, 2, 2, 2, 2, 1];

/// S-boxes 1..8, each 4 rows by 16 columns.
#[rustfmt::skip]
const SBOX: [[u8; 64]; 8] = [
    [
        14,  4, 13,  1,  2, 15, 11,  8,  3, 10,  6, 12,  5,  9,  0,  7,
         0, 15,  7,  4, 14,  2, 13,  1, 10,  6, 12, 11,  9,  5,  3,  8,
         4,  1, 14,  8, 13,  6,  2, 11, 15, 12,  9,  7,  3, 10,  5,  0,
        15, 12,  8,  2,  4,  9,  1,  7,  5, 11,  3, 14, 10,  0,  6, 13,
    ],
    [
        15,  1,  8, 14,  6, 11,  3,  4,  9,  7,  2, 13, 12,  0,  5, 10,
         3, 13,  4,  7, 15,  2,  8, 14, 12,  0,  1, 10,  6,  9, 11,  5,
         0, 14,  7, 11, 10,  4, 13,  1,  5,  8, 12,  6,  9,  3,  2, 15,
        13,  8, 10,  1,  3, 15,  4,  2, 11,  6,  7, 12,  0,  5, 14,  9,
    ],
    [
        10,  0,  9, 14,  6,  3, 15,  5,  1, 13, 12,  7, 11,  4,  2,  8,
        13,  7,  0,  9,  3,  4,  6, 10,  2,  8,  5, 14, 12, 11, 15,  1,
        13,  6,  4,  9,  8, 15,  3,  0, 11,  1,  2, 12,  5, 10, 14,  7,
         1, 10, 13,  0,  6,  9,  8,  7,  4, 15, 14,  3, 11,  5,  2, 12,
    ],
    [
         7, 13, 14,  3,  0,  6,  9, 10,  1,  2,  8,  5, 11, 12,  4, 15,
        13,  8, 11,  5,  6, 15,  0,  3,  4,  7,  2, 12,  1, 10, 14,  9,
        10,  6,  9,  0, 12, 11,  7, 13, 15,  1,  3, 14,  5,  2,  8,  4,
         3, 15,  0,  6, 10,  1, 13,  8,  9,  4,  5, 11, 12,  7,  2, 14,
    ],
    [
         2, 12,  4,  1,  7, 10, 11,  6,  8,  5,  3, 15, 13,  0, 14,  9,
        14, 11,  2, 12,  4,  7, 13,  1,  5,  0, 15, 10,  3,  9,  8,  6,
         4,  2,  1, 11, 10, 13,  7,  8, 15,  9, 12,  5,  6,  3,  0, 14,
        11,  8, 12,  7,  1, 14,  2, 13,  6, 15,  0,  9, 10,  4,  5,  3,
    ],
    [
        12,  1, 10, 15,  9,  2,  6,  8,  0, 13,  3,  4, 14,  7,  5, 11,
        10, 15,  4,  2,  7, 12,  9,  5,  6,  1, 13, 14,  0, 11,  3,  8,
         9, 14, 15,  5,  2,  8, 12,  3,  7,  0,  4, 10,  1, 13, 11,  6,
         4,  3,  2, 12,  9,  5, 15, 10, 11, 14,  1,  7,  6,  0,  8, 13,
    ],
    [
         4, 11,  2, 14, 15,  0,  8, 13,  3, 12,  9,  7,  5, 10,  6,  1,
        13,  0, 11,  7,  4,  9,  1, 10, 14,  3,  5, 12,  2, 15,  8,  6,
         1,  4, 11, 13, 12,  3,  7, 14, 10, 15,  6,  8,  0,  5,  9,  2,
         6, 11, 13,  8,  1,  4, 10,  7,  9,  5,  0, 15, 14,  2,  3, 12,
    ],
    [
        13,  2,  8,  4,  6, 15, 11,  1, 10,  9,  3, 14,  5,  0, 12,  7,
         1, 15, 13,  8, 10,  3,  7,  4, 12,  5,  6, 11,  0, 14,  9,  2,
         7, 11,  4,  1,  9, 12, 14,  2,  0,  6, 10, 13, 15,  3,  5,  8,
         2,  1, 14,  7,  4, 10,  8, 13, 15, 12,  9,  0,  3,  5,  6, 11,
    ],
];

/// Apply a FIPS permutation table to `input` of width `width` bits.
fn permute(input: u64, width: u32, table: &[u8]) -> u64 {
    let mut out = 0u64;
    for &pos in table {
        out <<= 1;
        out |= (input >> (width - pos as u32)) & 1;
    }
    out
}

/// Rotate a 28-bit half left by `n` bits.
fn rotl28(half: u32, n: u8) -> u32 {
    ((half << n) | (half >> (28 - n))) & 0x0FFF_FFFF
}

/// Derive the 16 48-bit round subkeys from a 64-bit key.
fn key_schedule(key: u64) -> [u64; 16] {
    let cd = permute(key, 64, &PC1);
    let mut c = ((cd >> 28) & 0x0FFF_FFFF) as u32;
    let mut d = (cd & 0x0FFF_FFFF) as u32;

    let mut subkeys = [0u64; 16];
    for (round, shift) in SHIFTS.iter().enumerate() {
        c = rotl28(c, *shift);
        d = rotl28(d, *shift);
        let merged = ((c as u64) << 28) | d as u64;
        subkeys[round] = permute(merged, 56, &PC2);
    }
    subkeys
}

/// Feistel round function: expand, mix key, S-box substitution, permute.
fn feistel(right: u32, subkey: u64) -> u32 {
    let expanded = permute(right as u64, 32, &E);
    let mixed = expanded ^ subkey;

    let mut substituted = 0u32;
    for box_index in 0..8 {
        let chunk = ((mixed >> (42 - 6 * box_index)) & 0x3F) as u8;
        let row = ((chunk >> 4) & 0b10) | (chunk & 0b01);
        let col = (chunk >> 1) & 0x0F;
        substituted = (substituted << 4) | SBOX[box_index][(row * 16 + col) as usize] as u32;
    }

    permute(substituted as u64, 32, &P) as u32
}

/// Run the 16-round DES core; `decrypt` walks the subkeys in reverse.
fn des_core(block: u64, key: u64, decrypt: bool) -> u64 {
    let subkeys = key_schedule(key);

    let permuted = permute(block, 64, &IP);
    let mut left = (permuted >> 32) as u32;
    let mut right = permuted as u32;

    for round in 0..16 {
        let subkey = if decrypt {
            subkeys[15 - round]
        } else {
            subkeys[round]
        };
        let next_right = left ^ feistel(right, subkey);
        left = right;
        right = next_right;
    }

    // Final 32-bit swap before the inverse permutation.
    let preoutput = ((right as u64) << 32) | left as u64;
    permute(preoutput, 64, &FP)
}

/// Parse exactly 16 hex chars into a u64 block.
fn parse_block16(input: &str) -> Result<u64, CryptoError> {
    if input.len() != 16 {
        return Err(CryptoError::InvalidLength {
            expected: "16 hex chars".to_string(),
            actual: input.len(),
        });
    }
    u64::from_str_radix(input, 16).map_err(|_| CryptoError::InvalidHex(input.to_string()))
}

fn format_block16(block: u64) -> String {
    format!("{block:016X}")
}

/// Encrypt a single 64-bit block (16 hex chars) under a single-DES key.
pub fn des_encrypt(block: &str, key: &str) -> Result<String, CryptoError> {
    let block = parse_block16(block)?;
    let key = parse_block16(key)?;
    Ok(format_block16(des_core(block, key, false)))
}

/// Decrypt a single 64-bit block (16 hex chars) under a single-DES key.
pub fn des_decrypt(block: &str, key: &str) -> Result<String, CryptoError> {
    let block = parse_block16(block)?;
    let key = parse_block16(key)?;
    Ok(format_block16(des_core(block, key, true)))
}
