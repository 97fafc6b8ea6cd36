use serde::{Deserialize, Serialize};

/// Policy deciding when an object's movement is significant enough to bump the
/// revision of the tile it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebouncePolicy {
    /// Smallest change (world units) of the tile-clipped accumulated object bounds
    /// that counts as significant. Zero means any change counts.
    pub min_bounds_change: f32,
}

impl DebouncePolicy {
    pub fn new(min_bounds_change: f32) -> Self {
        Self { min_bounds_change }
    }

    /// Check whether a bounds change of `difference` world units is significant
    pub fn is_significant(&self, difference: f32) -> bool {
        difference > self.min_bounds_change
    }
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self {
            min_bounds_change: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySettings {
    /// Factor converting world units into navigation mesh units
    pub recast_scale_factor: f32,
    pub debounce: DebouncePolicy,
}

impl GeometrySettings {
    pub fn new(recast_scale_factor: f32) -> Self {
        GeometrySettings {
            recast_scale_factor,
            debounce: DebouncePolicy::default(),
        }
    }

    pub fn with_recast_scale_factor(mut self, recast_scale_factor: f32) -> Self {
        self.recast_scale_factor = recast_scale_factor;
        self
    }

    pub fn with_debounce(mut self, debounce: DebouncePolicy) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_min_bounds_change(mut self, min_bounds_change: f32) -> Self {
        self.debounce.min_bounds_change = min_bounds_change;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.recast_scale_factor.is_finite() || self.recast_scale_factor <= 0.0 {
            return Err("Recast scale factor must be positive and finite".to_string());
        }
        if !self.debounce.min_bounds_change.is_finite() || self.debounce.min_bounds_change < 0.0 {
            return Err("Minimum bounds change cannot be negative".to_string());
        }
        Ok(())
    }
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self::new(0.029411764705882353)
    }
}
