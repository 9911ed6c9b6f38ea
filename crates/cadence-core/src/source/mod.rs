//! Source voices
//!
//! PCM data, the collaborators that produce and spatialize it, the
//! render-side [`SourceManager`] and the game-side [`SourceVoice`] handle.

mod atomics;
mod channel_map;
mod decoder;
mod error;
mod manager;
mod pcm;
mod spatial;
mod voice;

pub use atomics::SourceAtomics;
pub use channel_map::{default_channel_map, ChannelLayout, Speaker};
pub use decoder::{Decoder, PcmDecoder, SineDecoder};
pub use error::{SourceError, SourceResult};
pub use manager::{SourceInit, SourceManager, MAX_QUEUED_BUFFERS};
pub use pcm::{PcmBuffer, PcmData, SampleFormat};
pub use spatial::{EqualPowerPanner, SpatializationParams, Spatializer};
pub use voice::{SourceVoice, VoiceParams};
