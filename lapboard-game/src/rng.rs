//! Deterministic random streams segregated by game domain.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// Independent RNG streams so that drawing dice never shifts board layouts
/// or choice offers, and vice versa.
#[derive(Debug, Clone)]
pub struct RngBundle {
    dice: CountingRng<ChaCha20Rng>,
    board: CountingRng<ChaCha20Rng>,
    offers: CountingRng<ChaCha20Rng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            dice: CountingRng::new(derive_stream_seed(seed, b"dice")),
            board: CountingRng::new(derive_stream_seed(seed, b"board")),
            offers: CountingRng::new(derive_stream_seed(seed, b"offers")),
        }
    }

    /// Streams for a game restored from a snapshot taken at `turn`.
    ///
    /// Restored games diverge from an uninterrupted run but stay reproducible
    /// for the same `(seed, turn)` pair.
    #[must_use]
    pub fn resumed(seed: u64, turn: u32) -> Self {
        if turn == 0 {
            return Self::from_user_seed(seed);
        }
        let tag = |domain: &[u8]| {
            let mut tag = domain.to_vec();
            tag.extend_from_slice(b"@");
            tag.extend_from_slice(&turn.to_le_bytes());
            tag
        };
        Self {
            dice: CountingRng::new(derive_stream_seed(seed, &tag(b"dice"))),
            board: CountingRng::new(derive_stream_seed(seed, &tag(b"board"))),
            offers: CountingRng::new(derive_stream_seed(seed, &tag(b"offers"))),
        }
    }

    /// Stream used for die rolls.
    pub fn dice(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.dice
    }

    /// Stream used for lap effect placement.
    pub fn board(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.board
    }

    /// Stream used for choice-square offers.
    pub fn offers(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.offers
    }

    /// Draw counts per stream as `(dice, board, offers)`.
    #[must_use]
    pub const fn draws(&self) -> (u64, u64, u64) {
        (self.dice.draws(), self.board.draws(), self.offers.draws())
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
