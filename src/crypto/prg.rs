use rand::RngCore;

use crate::config::HashFunction;

/// Counter-mode PRG: block `i` is `H(seed || u32_be(i))`.
///
/// Also usable as an [`RngCore`] so that arkworks sampling can be driven
/// deterministically from a public seed.
#[derive(Clone, Debug)]
pub struct Prg {
    hash: HashFunction,
    seed: Vec<u8>,
    counter: u32,
    block: Vec<u8>,
    position: usize,
}

impl Prg {
    pub fn new(hash: HashFunction, seed: &[u8]) -> Self {
        Self {
            hash,
            seed: seed.to_vec(),
            counter: 0,
            block: Vec::new(),
            position: 0,
        }
    }

    fn refill(&mut self) {
        let mut input = Vec::with_capacity(self.seed.len() + 4);
        input.extend_from_slice(&self.seed);
        input.extend_from_slice(&self.counter.to_be_bytes());
        self.block = self.hash.digest(&input);
        self.counter = self.counter.wrapping_add(1);
        self.position = 0;
    }

    pub fn next_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.fill(&mut out);
        out
    }

    fn fill(&mut self, out: &mut [u8]) {
        let mut written = 0;
        while written < out.len() {
            if self.position == self.block.len() {
                self.refill();
            }
            let take = (self.block.len() - self.position).min(out.len() - written);
            out[written..written + take]
                .copy_from_slice(&self.block[self.position..self.position + take]);
            self.position += take;
            written += take;
        }
    }
}

impl RngCore for Prg {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.fill(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill(dest);
        Ok(())
    }
}
