//! Deterministic random stream shared by every candidate draw.
//!
//! A single 32-bit linear congruential generator seeds one slot per
//! (ant, city) position. Every construction step then jumps all slots ahead
//! by as many generator steps as there are slots, in a single element-wise
//! pass, so slot `i` at step `t` holds the value the generator would reach
//! after `t * len + i + 1` steps and no draw is ever reused. The colony never
//! reseeds per ant, so a run is reproducible from its seed alone.

use rayon::prelude::*;

const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;

/// Scale that maps a raw 32-bit draw into [0, 1).
pub const DRAW_SCALE: f64 = 4_294_967_296.0;

/// One step of the generator, `x' = (1664525 x + 1013904223) mod 2^32`.
#[inline]
pub fn lcg_step(x: u32) -> u32 {
    x.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT)
}

/// Multiplier and increment of `steps` generator steps composed into one,
/// `x -> a_k x + c_k`, by binary decomposition of `steps`.
pub fn lcg_jump(steps: u64) -> (u32, u32) {
    let (mut acc_mult, mut acc_plus) = (1u32, 0u32);
    let (mut cur_mult, mut cur_plus) = (LCG_MULTIPLIER, LCG_INCREMENT);
    let mut remaining = steps;
    while remaining > 0 {
        if remaining & 1 == 1 {
            acc_mult = acc_mult.wrapping_mul(cur_mult);
            acc_plus = acc_plus.wrapping_mul(cur_mult).wrapping_add(cur_plus);
        }
        cur_plus = cur_mult.wrapping_add(1).wrapping_mul(cur_plus);
        cur_mult = cur_mult.wrapping_mul(cur_mult);
        remaining >>= 1;
    }
    (acc_mult, acc_plus)
}

/// Sequential LCG, used to lay out the initial slot values.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Lcg { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = lcg_step(self.state);
        self.state
    }
}

/// Per-position draw slots, indexed by `ant * num_cities + city`.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomStream {
    num_cities: usize,
    slots: Vec<u32>,
    /// `lcg_jump(slots.len())`
    jump: (u32, u32),
}

impl RandomStream {
    pub fn seeded(seed: u32, num_ants: usize, num_cities: usize) -> Self {
        let mut lcg = Lcg::new(seed);
        let len = num_ants * num_cities;
        let slots = (0..len).map(|_| lcg.next_u32()).collect();
        RandomStream { num_cities, slots, jump: lcg_jump(len as u64) }
    }

    #[inline]
    pub fn draw(&self, ant: usize, city: usize) -> u32 {
        self.slots[ant * self.num_cities + city]
    }

    /// Jump every slot past the values the other slots currently hold.
    pub fn advance(&mut self) {
        let (mult, plus) = self.jump;
        self.slots
            .par_iter_mut()
            .for_each(|x| *x = x.wrapping_mul(mult).wrapping_add(plus));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
