//! Ordered effect chain owned by a submix

use basedrop::Owned;
use thiserror::Error;

use super::Effect;
use crate::types::AudioBuffer;

/// Maximum number of effects in a single submix chain
pub const MAX_SUBMIX_EFFECTS: usize = 8;

/// An effect instance whose drop is deferred to the collector thread
///
/// Effects are removed on the render thread; wrapping them in `Owned` keeps
/// their delay lines and tables from being freed there.
pub type EffectSlot = Owned<Box<dyn Effect>>;

/// Error type for effect chain edits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectChainError {
    #[error("effect chain already holds the maximum of {max} effects")]
    ChainFull { max: usize },

    #[error("effect index {index} out of bounds (chain has {len} effects)")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Effects applied in order to a submix's wet path
pub struct EffectChain {
    effects: Vec<EffectSlot>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self {
            effects: Vec::with_capacity(MAX_SUBMIX_EFFECTS),
        }
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Append an effect, returning its index
    ///
    /// Never reallocates: the chain is pre-sized to [`MAX_SUBMIX_EFFECTS`].
    pub fn push(&mut self, effect: EffectSlot) -> Result<usize, EffectChainError> {
        if self.effects.len() >= MAX_SUBMIX_EFFECTS {
            return Err(EffectChainError::ChainFull {
                max: MAX_SUBMIX_EFFECTS,
            });
        }
        self.effects.push(effect);
        Ok(self.effects.len() - 1)
    }

    /// Remove the effect at `index`; later effects shift down by one
    pub fn remove(&mut self, index: usize) -> Result<EffectSlot, EffectChainError> {
        if index >= self.effects.len() {
            return Err(EffectChainError::IndexOutOfBounds {
                index,
                len: self.effects.len(),
            });
        }
        Ok(self.effects.remove(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut (dyn Effect + 'static), EffectChainError> {
        let len = self.effects.len();
        self.effects
            .get_mut(index)
            .map(|slot| &mut ***slot)
            .ok_or(EffectChainError::IndexOutOfBounds { index, len })
    }

    pub fn set_param(
        &mut self,
        index: usize,
        param_index: usize,
        value: f32,
    ) -> Result<(), EffectChainError> {
        self.get_mut(index)?.set_param(param_index, value);
        Ok(())
    }

    pub fn set_bypass(&mut self, index: usize, bypass: bool) -> Result<(), EffectChainError> {
        self.get_mut(index)?.set_bypass(bypass);
        Ok(())
    }

    /// Names of the effects in processing order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.effects.iter().map(|slot| slot.info().name.as_str())
    }

    /// Run every effect over `buffer` in order (bypassed effects skip themselves)
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        for effect in self.effects.iter_mut() {
            effect.process(buffer);
        }
    }

    pub fn reset(&mut self) {
        for effect in self.effects.iter_mut() {
            effect.reset();
        }
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new()
    }
}
