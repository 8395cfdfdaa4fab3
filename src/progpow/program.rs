use super::kiss99::Kiss99;
use super::{fnv1a, FNV_OFFSET_BASIS, REGS};

/// Integer operation combining two source registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Mul,
    MulHi,
    Min,
    Rotl,
    Rotr,
    And,
    Or,
    Xor,
    Clz,
    PopCnt,
}

impl MathOp {
    pub fn from_selector(selector: u32) -> Self {
        match selector % 11 {
            0 => MathOp::Add,
            1 => MathOp::Mul,
            2 => MathOp::MulHi,
            3 => MathOp::Min,
            4 => MathOp::Rotl,
            5 => MathOp::Rotr,
            6 => MathOp::And,
            7 => MathOp::Or,
            8 => MathOp::Xor,
            9 => MathOp::Clz,
            _ => MathOp::PopCnt,
        }
    }

    pub fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            MathOp::Add => a.wrapping_add(b),
            MathOp::Mul => a.wrapping_mul(b),
            MathOp::MulHi => ((a as u64 * b as u64) >> 32) as u32,
            MathOp::Min => a.min(b),
            MathOp::Rotl => a.rotate_left(b % 32),
            MathOp::Rotr => a.rotate_right(b % 32),
            MathOp::And => a & b,
            MathOp::Or => a | b,
            MathOp::Xor => a ^ b,
            MathOp::Clz => a.leading_zeros() + b.leading_zeros(),
            MathOp::PopCnt => a.count_ones() + b.count_ones(),
        }
    }
}

/// Folds new data into a register. Every variant keeps the entropy of the
/// register even when the data has little.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOp {
    MulAdd,
    XorMul,
    RotlXor(u32),
    RotrXor(u32),
}

impl MergeOp {
    pub fn from_selector(selector: u32) -> Self {
        let shift = (selector >> 16) % 31 + 1;
        match selector % 4 {
            0 => MergeOp::MulAdd,
            1 => MergeOp::XorMul,
            2 => MergeOp::RotlXor(shift),
            _ => MergeOp::RotrXor(shift),
        }
    }

    pub fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            MergeOp::MulAdd => a.wrapping_mul(33).wrapping_add(b),
            MergeOp::XorMul => (a ^ b).wrapping_mul(33),
            MergeOp::RotlXor(n) => a.rotate_left(n) ^ b,
            MergeOp::RotrXor(n) => a.rotate_right(n) ^ b,
        }
    }
}

pub fn math(a: u32, b: u32, selector: u32) -> u32 {
    MathOp::from_selector(selector).apply(a, b)
}

pub fn merge(a: u32, b: u32, selector: u32) -> u32 {
    MergeOp::from_selector(selector).apply(a, b)
}

/// The random stream that drives one program, plus the shuffled register
/// sequences it picks sources and destinations from.
///
/// Each pass over the program starts from a copy of the freshly built state,
/// so the same instructions run in every outer iteration.
#[derive(Debug, Clone)]
pub struct MixRngState {
    rng: Kiss99,
    dst_seq: [u32; REGS],
    src_seq: [u32; REGS],
    dst_counter: usize,
    src_counter: usize,
}

impl MixRngState {
    pub fn new(prog_seed: u64) -> Self {
        let seed_lo = prog_seed as u32;
        let seed_hi = (prog_seed >> 32) as u32;

        let z = fnv1a(FNV_OFFSET_BASIS, seed_lo);
        let w = fnv1a(z, seed_hi);
        let jsr = fnv1a(w, seed_lo);
        let jcong = fnv1a(jsr, seed_hi);
        let mut rng = Kiss99::new(z, w, jsr, jcong);

        let mut dst_seq = [0u32; REGS];
        let mut src_seq = [0u32; REGS];
        for i in 0..REGS {
            dst_seq[i] = i as u32;
            src_seq[i] = i as u32;
        }

        // Fisher-Yates, both sequences drawn from the one stream.
        for i in (2..=REGS).rev() {
            let j = rng.next_u32() as usize % i;
            dst_seq.swap(i - 1, j);
            let j = rng.next_u32() as usize % i;
            src_seq.swap(i - 1, j);
        }

        Self {
            rng,
            dst_seq,
            src_seq,
            dst_counter: 0,
            src_counter: 0,
        }
    }

    pub fn next_dst(&mut self) -> usize {
        let r = self.dst_seq[self.dst_counter % REGS];
        self.dst_counter += 1;
        r as usize
    }

    pub fn next_src(&mut self) -> usize {
        let r = self.src_seq[self.src_counter % REGS];
        self.src_counter += 1;
        r as usize
    }

    pub fn rng(&mut self) -> u32 {
        self.rng.next_u32()
    }

    /// Two distinct registers chosen by a single draw.
    pub fn src_pair(&mut self) -> (usize, usize) {
        let src_rnd = self.rng() as usize % (REGS * (REGS - 1));
        let src1 = src_rnd % REGS;
        let mut src2 = src_rnd / REGS;
        if src2 >= src1 {
            src2 += 1;
        }
        (src1, src2)
    }
}
