//! Construction-time tuning for `LinearHashMap`.

use crate::error::ConfigError;

/// Modulus a fresh table starts from; also the floor it shrinks back to.
pub const INITIAL_MODULUS: usize = 2;

/// Bucket capacity is reclaimed once it exceeds this many times the bucket
/// array length.
pub const SHRINK_FACTOR: usize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Options {
    pub(crate) initial_modulus: usize,
    pub(crate) shrink_factor: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            initial_modulus: INITIAL_MODULUS,
            shrink_factor: SHRINK_FACTOR,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_modulus(mut self, modulus: usize) -> Self {
        self.initial_modulus = modulus;
        self
    }

    pub fn shrink_factor(mut self, factor: usize) -> Self {
        self.shrink_factor = factor;
        self
    }

    pub fn get_initial_modulus(&self) -> usize {
        self.initial_modulus
    }

    pub fn get_shrink_factor(&self) -> usize {
        self.shrink_factor
    }

    pub(crate) fn validate(self) -> Result<Self, ConfigError> {
        if self.initial_modulus == 0 {
            return Err(ConfigError::ZeroModulus);
        }
        if self.shrink_factor < 2 {
            return Err(ConfigError::ShrinkFactorTooSmall(self.shrink_factor));
        }
        Ok(self)
    }
}
