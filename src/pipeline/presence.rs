//! Trailing chip presence.
//!
//! Frames are fed newest first, so the frame processed just before the
//! current one is its temporal successor. Three presence vectors are kept,
//! indexed by chip: the current frame, the next frame and the frame after
//! that. [`PresenceTracker::advance`] rotates them once per frame.

#[derive(Debug, Clone)]
pub struct PresenceTracker {
    current: Vec<bool>,
    next: Vec<bool>,
    after_next: Vec<bool>,
    frames_done: usize,
}

impl PresenceTracker {
    pub fn new(chips: usize) -> Self {
        Self {
            current: vec![false; chips],
            next: vec![false; chips],
            after_next: vec![false; chips],
            frames_done: 0,
        }
    }

    /// Record that `chip` has clusters in the current frame.
    pub fn mark(&mut self, chip: u32) {
        if let Some(slot) = self.current.get_mut(chip as usize) {
            *slot = true;
        }
    }

    /// Chip absent from the next frame; `None` when there is no next frame.
    pub fn silent_next(&self, chip: u32) -> Option<bool> {
        (self.frames_done >= 1).then(|| !self.next.get(chip as usize).copied().unwrap_or(false))
    }

    /// Chip absent from the frame two steps later.
    pub fn silent_next2(&self, chip: u32) -> Option<bool> {
        (self.frames_done >= 2)
            .then(|| !self.after_next.get(chip as usize).copied().unwrap_or(false))
    }

    /// Number of chips lit in the next frame that satisfy `pred`.
    pub fn count_next(&self, pred: impl Fn(u32) -> bool) -> Option<u32> {
        if self.frames_done == 0 {
            return None;
        }
        let n = self
            .next
            .iter()
            .enumerate()
            .filter(|&(chip, &lit)| lit && u32::try_from(chip).is_ok_and(&pred))
            .count();
        Some(u32::try_from(n).unwrap_or(u32::MAX))
    }

    /// Close the current frame: after_next <- next, next <- current, clear current.
    pub fn advance(&mut self) {
        std::mem::swap(&mut self.after_next, &mut self.next);
        std::mem::swap(&mut self.next, &mut self.current);
        self.current.fill(false);
        self.frames_done += 1;
    }
}
