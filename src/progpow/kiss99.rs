/// Marsaglia's KISS99 generator.
///
/// Combines a multiply-with-carry pair, a 3-shift register and a linear
/// congruential generator. Not cryptographic; only used to derive the
/// program and the initial lane registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kiss99 {
    z: u32,
    w: u32,
    jsr: u32,
    jcong: u32,
}

impl Kiss99 {
    pub const fn new(z: u32, w: u32, jsr: u32, jcong: u32) -> Self {
        Self { z, w, jsr, jcong }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.z = 36969u32
            .wrapping_mul(self.z & 0xffff)
            .wrapping_add(self.z >> 16);
        self.w = 18000u32
            .wrapping_mul(self.w & 0xffff)
            .wrapping_add(self.w >> 16);
        let mwc = (self.z << 16).wrapping_add(self.w);

        self.jsr ^= self.jsr << 17;
        self.jsr ^= self.jsr >> 13;
        self.jsr ^= self.jsr << 5;

        self.jcong = 69069u32.wrapping_mul(self.jcong).wrapping_add(1234567);

        (mwc ^ self.jcong).wrapping_add(self.jsr)
    }
}

impl Default for Kiss99 {
    /// Marsaglia's published seeds.
    fn default() -> Self {
        Self::new(362436069, 521288629, 123456789, 380116160)
    }
}
