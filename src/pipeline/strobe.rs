//! Strobe length derivation.
//!
//! A chunk spans a fixed number of cycles, so the number of readout frames it
//! holds fixes the strobe length: `CYCLE_LENGTH * cycles_per_chunk / frames`.
//! The result is only trusted when it splits the cycle into whole windows.

use super::error::StudyWarning;
use crate::config::StrobeConfig;
use crate::types::CYCLE_LENGTH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrobeDerivation {
    pub length: u16,
    /// Set when the fallback length was used.
    pub warning: Option<StudyWarning>,
}

pub fn derive_strobe_length(frame_count: usize, config: &StrobeConfig) -> StrobeDerivation {
    let cycle = u64::from(CYCLE_LENGTH);
    let span = cycle * u64::from(config.cycles_per_chunk);

    let derived = u64::try_from(frame_count)
        .ok()
        .filter(|&n| n > 0 && span % n == 0)
        .map(|n| span / n)
        .filter(|&len| len > 0 && len <= cycle && cycle % len == 0)
        .and_then(|len| u16::try_from(len).ok());

    match derived {
        Some(length) => StrobeDerivation {
            length,
            warning: None,
        },
        None => StrobeDerivation {
            length: config.fallback_length,
            warning: Some(StudyWarning::UnexpectedChunkShape {
                frames: frame_count,
                fallback: config.fallback_length,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> StrobeConfig {
        StrobeConfig {
            fallback_length: 594,
            cycles_per_chunk: 32,
        }
    }

    #[test]
    fn test_six_frames_per_cycle() {
        let d = derive_strobe_length(6 * 32, &cfg());
        assert_eq!(d.length, 594);
        assert!(d.warning.is_none());
    }

    #[test]
    fn test_continuous_readout_layouts() {
        assert_eq!(derive_strobe_length(18 * 32, &cfg()).length, 198);
        assert_eq!(derive_strobe_length(32, &cfg()).length, 3564);
    }

    #[test]
    fn test_odd_frame_count_falls_back() {
        let d = derive_strobe_length(191, &cfg());
        assert_eq!(d.length, 594);
        assert_eq!(
            d.warning,
            Some(StudyWarning::UnexpectedChunkShape {
                frames: 191,
                fallback: 594
            })
        );
    }

    #[test]
    fn test_fewer_frames_than_cycles_falls_back() {
        // 16 frames over 32 cycles would need a strobe longer than a cycle.
        let d = derive_strobe_length(16, &cfg());
        assert!(d.warning.is_some());
    }

    #[test]
    fn test_empty_chunk_falls_back() {
        let d = derive_strobe_length(0, &cfg());
        assert_eq!(d.length, 594);
        assert!(d.warning.is_some());
    }
}
