//! Top-level configuration for [`crate::cache::HeightFieldCache`].
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::height::HeightParams;
use crate::terrain::contour::SamplingConfig;
use crate::terrain::packed::PackLimits;
use crate::tiles::lod::LodConfig;

/// Everything the height field cache needs besides its device.
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct CacheConfig {
    /// Value far away from every contour, until a definition says otherwise.
    pub default_depth: f32,
    pub sampling: SamplingConfig,
    pub height: HeightParams,
    pub pack_limits: PackLimits,
    pub lod: LodConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_depth: -10.0,
            sampling: SamplingConfig::default(),
            height: HeightParams::default(),
            pack_limits: PackLimits::default(),
            lod: LodConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_depth(mut self, default_depth: f32) -> Self {
        self.default_depth = default_depth;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_height(mut self, height: HeightParams) -> Self {
        self.height = height;
        self
    }

    pub fn with_pack_limits(mut self, pack_limits: PackLimits) -> Self {
        self.pack_limits = pack_limits;
        self
    }

    pub fn with_lod(mut self, lod: LodConfig) -> Self {
        self.lod = lod;
        self
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        if !self.default_depth.is_finite() {
            return Err(crate::error::Error::InvalidConfig(
                "default_depth must be finite".into(),
            ));
        }
        self.sampling.validate()?;
        self.height.validate()?;
        self.lod.validate()?;
        Ok(())
    }

    /// Parse a configuration from RON text; missing fields take their defaults.
    #[cfg(feature = "ron")]
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| crate::error::Error::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::lod::LodLevel;

    #[test]
    fn default_is_valid() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn nested_sections_are_validated() {
        let bad_sampling = CacheConfig::new().with_sampling(SamplingConfig::new(0));
        assert!(bad_sampling.validate().is_err());

        let bad_height =
            CacheConfig::new().with_height(HeightParams::default().with_min_distance(-1.0));
        assert!(bad_height.validate().is_err());

        let bad_lod = CacheConfig::new().with_lod(LodConfig::new(vec![
            LodLevel::new(10.0, 4, 0.0),
            LodLevel::new(20.0, 4, 0.0),
        ]));
        assert!(bad_lod.validate().is_err());

        assert!(CacheConfig::new()
            .with_default_depth(f32::NAN)
            .validate()
            .is_err());
    }

    #[cfg(feature = "ron")]
    #[test]
    fn ron_fills_missing_fields_with_defaults() {
        let config = CacheConfig::from_ron_str("(default_depth: -3.5)").expect("parses");
        assert_eq!(config.default_depth, -3.5);
        assert_eq!(config.lod, LodConfig::default());
    }
}
