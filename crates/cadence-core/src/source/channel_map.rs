//! Output channel layouts and default source-to-speaker gain matrices
//!
//! A channel map is a row-major `num_input × num_output` matrix of gains:
//! entry `in * num_output + out` is the gain from input channel `in` to
//! output channel `out`.

use std::f32::consts::FRAC_1_SQRT_2;

use serde::{Deserialize, Serialize};

/// Speaker position of one output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    FrontLeft,
    FrontRight,
    FrontCenter,
    LowFrequency,
    BackLeft,
    BackRight,
    SideLeft,
    SideRight,
}

/// Ordered list of output speakers; position in the list is the device channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelLayout {
    speakers: Vec<Speaker>,
}

impl ChannelLayout {
    pub fn new(speakers: Vec<Speaker>) -> Self {
        Self { speakers }
    }

    pub fn mono() -> Self {
        Self::new(vec![Speaker::FrontCenter])
    }

    pub fn stereo() -> Self {
        Self::new(vec![Speaker::FrontLeft, Speaker::FrontRight])
    }

    pub fn quad() -> Self {
        use Speaker::*;
        Self::new(vec![FrontLeft, FrontRight, BackLeft, BackRight])
    }

    pub fn surround_5_1() -> Self {
        use Speaker::*;
        Self::new(vec![FrontLeft, FrontRight, FrontCenter, LowFrequency, BackLeft, BackRight])
    }

    pub fn surround_7_1() -> Self {
        use Speaker::*;
        Self::new(vec![
            FrontLeft,
            FrontRight,
            FrontCenter,
            LowFrequency,
            BackLeft,
            BackRight,
            SideLeft,
            SideRight,
        ])
    }

    /// Layout for a plain channel count (used when a device reports no layout)
    pub fn for_channel_count(num_channels: usize) -> Self {
        match num_channels {
            1 => Self::mono(),
            2 => Self::stereo(),
            4 => Self::quad(),
            6 => Self::surround_5_1(),
            8 => Self::surround_7_1(),
            n => {
                let mut speakers = Self::surround_7_1().speakers;
                speakers.truncate(n.max(1));
                Self::new(speakers)
            }
        }
    }

    pub fn num_channels(&self) -> usize {
        self.speakers.len()
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    /// Device channel carrying `speaker`, if present
    pub fn index_of(&self, speaker: Speaker) -> Option<usize> {
        self.speakers.iter().position(|&s| s == speaker)
    }

    /// Indices of the front left/right pair (falls back to channels 0 and 1)
    fn front_pair(&self) -> (usize, usize) {
        let left = self.index_of(Speaker::FrontLeft).unwrap_or(0);
        let right = self.index_of(Speaker::FrontRight).unwrap_or(1);
        (left, right)
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::stereo()
    }
}

/// Default gain matrix for a source of `num_input` channels
///
/// - mono: -3dB into front left and right (unity on a mono device)
/// - stereo: left to front left, right to front right (folded at half gain
///   on a mono device)
/// - anything wider: channel `n` to device channel `n`; extra inputs are
///   dropped
pub fn default_channel_map(num_input: usize, layout: &ChannelLayout) -> Vec<f32> {
    let num_output = layout.num_channels();
    let mut map = vec![0.0; num_input * num_output];

    match (num_input, num_output) {
        (1, 1) => map[0] = 1.0,
        (1, _) => {
            let (left, right) = layout.front_pair();
            map[left] = FRAC_1_SQRT_2;
            map[right] = FRAC_1_SQRT_2;
        }
        (2, 1) => {
            map[0] = 0.5;
            map[1] = 0.5;
        }
        (2, _) => {
            let (left, right) = layout.front_pair();
            map[left] = 1.0;
            map[num_output + right] = 1.0;
        }
        _ => {
            for channel in 0..num_input.min(num_output) {
                map[channel * num_output + channel] = 1.0;
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_to_stereo() {
        let map = default_channel_map(1, &ChannelLayout::stereo());
        assert_eq!(map, vec![FRAC_1_SQRT_2, FRAC_1_SQRT_2]);
    }

    #[test]
    fn test_mono_to_mono() {
        assert_eq!(default_channel_map(1, &ChannelLayout::mono()), vec![1.0]);
    }

    #[test]
    fn test_stereo_to_surround() {
        let layout = ChannelLayout::surround_5_1();
        let map = default_channel_map(2, &layout);

        assert_eq!(map.len(), 12);
        assert_eq!(map[0], 1.0); // L -> FL
        assert_eq!(map[6 + 1], 1.0); // R -> FR
        assert_eq!(map.iter().filter(|&&g| g != 0.0).count(), 2);
    }

    #[test]
    fn test_stereo_fold_to_mono() {
        assert_eq!(default_channel_map(2, &ChannelLayout::mono()), vec![0.5, 0.5]);
    }

    #[test]
    fn test_wide_source_identity() {
        let map = default_channel_map(6, &ChannelLayout::stereo());
        assert_eq!(map.len(), 12);
        assert_eq!(map[0], 1.0);
        assert_eq!(map[2 + 1], 1.0);
        assert!(map[4..].iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_layout_yaml() {
        let layout: ChannelLayout = serde_yaml::from_str("[front_left, front_right]").unwrap();
        assert_eq!(layout, ChannelLayout::stereo());
        assert_eq!(ChannelLayout::for_channel_count(3).num_channels(), 3);
    }
}
