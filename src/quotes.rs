pub const QUOTES: &[&str] = &[
    "The mind is not a vessel to be filled, but a fire to be kindled. - Plutarch",
    "Patience, persistence and perspiration make an unbeatable combination for success. - Napoleon Hill",
    "It's not that I'm so smart, it's just that I stay with problems longer. - Albert Einstein",
    "The best way to predict the future is to create it. - Peter Drucker",
    "The difference between ordinary and extraordinary is that little extra. - Jimmy Johnson",
    "Our greatest weakness lies in giving up. The most certain way to succeed is always to try just one more time. - Thomas Edison",
    "Discipline is the bridge between goals and accomplishment. - Jim Rohn",
    "The beautiful thing about learning is that no one can take it away from you. - B.B. King",
    "Education is the passport to the future, for tomorrow belongs to those who prepare for it today. - Malcolm X",
    "Learning is not attained by chance, it must be sought for with ardor and diligence. - Abigail Adams",
];

/// Cycles through [`QUOTES`], one step per rotation tick.
#[derive(Debug, Clone, Default)]
pub struct QuoteRotation {
    index: usize,
}

impl QuoteRotation {
    /// Start at a position derived from `seed` so launches don't all open on
    /// the same quote.
    pub fn seeded(seed: u64) -> Self {
        Self {
            index: (seed % QUOTES.len() as u64) as usize,
        }
    }

    pub fn current(&self) -> &'static str {
        QUOTES[self.index]
    }

    pub fn advance(&mut self) -> &'static str {
        self.index = (self.index + 1) % QUOTES.len();
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps() {
        let mut quotes = QuoteRotation::seeded(QUOTES.len() as u64 - 1);
        assert_eq!(quotes.current(), QUOTES[QUOTES.len() - 1]);
        assert_eq!(quotes.advance(), QUOTES[0]);
        assert_eq!(quotes.advance(), QUOTES[1]);
    }
}
