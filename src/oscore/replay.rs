/// A sliding anti-replay window over received partial IVs.
///
/// Tracks the highest sequence number accepted so far and which of the
/// `size - 1` numbers below it have been seen too. Anything older than that
/// is rejected outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayWindow {
    size: u32,
    highest: Option<u64>,
    // Bit i set means highest - i was accepted
    seen: u64,
}

impl ReplayWindow {
    /// Creates an empty window tracking `size` sequence numbers.
    ///
    /// The size is clamped to the range 1 to 64.
    pub fn new(size: u32) -> ReplayWindow {
        ReplayWindow {
            size: size.max(1).min(64),
            highest: None,
            seen: 0,
        }
    }

    /// The number of sequence numbers the window tracks.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Whether nothing has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.highest.is_none()
    }

    /// Returns whether a message with this sequence number may be accepted.
    pub fn is_valid(&self, n: u64) -> bool {
        match self.highest {
            None => true,
            Some(highest) if n > highest => true,
            Some(highest) => {
                let age = highest - n;
                age < u64::from(self.size) && self.seen & (1 << age) == 0
            }
        }
    }

    /// Marks the sequence number as accepted, moving the window forward if
    /// necessary.
    ///
    /// Must only be called after `is_valid` returned true for `n` and the
    /// message was successfully verified.
    pub fn strike_out(&mut self, n: u64) {
        match self.highest {
            Some(highest) if n <= highest => {
                let age = highest - n;
                if age < 64 {
                    self.seen |= 1 << age;
                }
            }
            previous => {
                let shift = previous.map_or(64, |highest| n - highest);
                self.seen = if shift >= 64 { 0 } else { self.seen << shift };
                self.seen |= 1;
                self.highest = Some(n);
            }
        }
        self.seen &= self.mask();
    }

    fn mask(&self) -> u64 {
        if self.size >= 64 {
            u64::MAX
        } else {
            (1 << self.size) - 1
        }
    }
}
