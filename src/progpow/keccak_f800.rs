// Keccak-f[800]: the Keccak permutation over 25 lanes of 32 bits.

/// Rounds applied by ProgPoW, two short of the full 24.
pub const ROUNDS: usize = 22;

const ROUND_CONSTANTS: [u32; 24] = [
    0x00000001, 0x00008082, 0x0000808a, 0x80008000, 0x0000808b, 0x80000001, 0x80008081, 0x00008009,
    0x0000008a, 0x00000088, 0x80008009, 0x8000000a, 0x8000808b, 0x0000008b, 0x00008089, 0x00008003,
    0x00008002, 0x00000080, 0x0000800a, 0x8000000a, 0x80008081, 0x00008080, 0x80000001, 0x80008008,
];

const ROTATIONS: [u32; 24] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 2, 14, 27, 41, 56, 8, 25, 43, 62, 18, 39, 61, 20, 44,
];

const PI_LANES: [usize; 24] = [
    10, 7, 11, 17, 18, 3, 5, 16, 8, 21, 24, 4, 15, 23, 19, 13, 12, 2, 20, 14, 22, 9, 6, 1,
];

fn round(st: &mut [u32; 25], r: usize) {
    // Theta
    let mut bc = [0u32; 5];
    for (i, c) in bc.iter_mut().enumerate() {
        *c = st[i] ^ st[i + 5] ^ st[i + 10] ^ st[i + 15] ^ st[i + 20];
    }
    for i in 0..5 {
        let t = bc[(i + 4) % 5] ^ bc[(i + 1) % 5].rotate_left(1);
        for j in (0..25).step_by(5) {
            st[j + i] ^= t;
        }
    }

    // Rho Pi
    let mut t = st[1];
    for (&j, &rot) in PI_LANES.iter().zip(ROTATIONS.iter()) {
        let next = st[j];
        st[j] = t.rotate_left(rot % 32);
        t = next;
    }

    // Chi
    for j in (0..25).step_by(5) {
        let row = [st[j], st[j + 1], st[j + 2], st[j + 3], st[j + 4]];
        for i in 0..5 {
            st[j + i] ^= !row[(i + 1) % 5] & row[(i + 2) % 5];
        }
    }

    // Iota
    st[0] ^= ROUND_CONSTANTS[r];
}

/// Apply `ROUNDS` rounds of the permutation in place.
pub fn keccak_f800(st: &mut [u32; 25]) {
    for r in 0..ROUNDS {
        round(st, r);
    }
}
