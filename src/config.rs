//! Runtime knobs of the rasterizer: view size and resource-pool limits.
//!
//! The limits are chosen by the caller (CLI flag, menu option …); the core
//! only enforces them.

/// Widest view the projection tables are built for.
pub const MAX_SCREENWIDTH: usize = 2048;
/// Tallest view; visplane extents are stored as `u16` so this is far below
/// the real ceiling.
pub const MAX_SCREENHEIGHT: usize = 1200;

/// Reference width the original limits and sky scale were tuned for.
pub const SCREENWIDTH: usize = 320;
pub const SCREENHEIGHT: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitProfile {
    /// Reproduces the historical crash thresholds (as a clean abort).
    Vanilla,
    /// Generous limits for detailed maps.
    Raised,
}

/// Capacities of the three per-frame pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderLimits {
    pub max_visplanes: usize,
    pub max_drawsegs: usize,
    /// Opening cells (one `i16` per column per reserved array).
    pub max_openings: usize,
}

impl RenderLimits {
    pub const fn vanilla() -> Self {
        Self {
            max_visplanes: 128,
            max_drawsegs: 256,
            max_openings: SCREENWIDTH * 64,
        }
    }

    pub const fn raised() -> Self {
        Self {
            max_visplanes: 1024,
            max_drawsegs: 2048,
            max_openings: 1 << 20,
        }
    }

    pub const fn for_profile(profile: LimitProfile) -> Self {
        match profile {
            LimitProfile::Vanilla => Self::vanilla(),
            LimitProfile::Raised => Self::raised(),
        }
    }
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self::raised()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("view width {0} outside 1..={max}", max = MAX_SCREENWIDTH)]
    BadWidth(usize),

    #[error("view height {0} outside 1..={max}", max = MAX_SCREENHEIGHT)]
    BadHeight(usize),

    #[error("limit `{0}` must be non-zero")]
    ZeroLimit(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub limits: RenderLimits,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: SCREENWIDTH,
            height: SCREENHEIGHT,
            limits: RenderLimits::default(),
        }
    }
}

impl RenderConfig {
    pub fn new(width: usize, height: usize, limits: RenderLimits) -> Result<Self, ConfigError> {
        let cfg = Self {
            width,
            height,
            limits,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SCREENWIDTH).contains(&self.width) {
            return Err(ConfigError::BadWidth(self.width));
        }
        if !(1..=MAX_SCREENHEIGHT).contains(&self.height) {
            return Err(ConfigError::BadHeight(self.height));
        }
        let l = &self.limits;
        if l.max_visplanes == 0 {
            return Err(ConfigError::ZeroLimit("max_visplanes"));
        }
        if l.max_drawsegs == 0 {
            return Err(ConfigError::ZeroLimit("max_drawsegs"));
        }
        if l.max_openings == 0 {
            return Err(ConfigError::ZeroLimit("max_openings"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_pick_their_limits() {
        assert_eq!(RenderLimits::for_profile(LimitProfile::Vanilla).max_visplanes, 128);
        assert_eq!(RenderLimits::for_profile(LimitProfile::Raised).max_drawsegs, 2048);
        assert_eq!(RenderLimits::default(), RenderLimits::raised());
    }

    #[test]
    fn rejects_degenerate_views_and_limits() {
        assert_eq!(
            RenderConfig::new(0, 200, RenderLimits::vanilla()),
            Err(ConfigError::BadWidth(0))
        );
        assert_eq!(
            RenderConfig::new(320, 5000, RenderLimits::vanilla()),
            Err(ConfigError::BadHeight(5000))
        );
        let limits = RenderLimits {
            max_drawsegs: 0,
            ..RenderLimits::vanilla()
        };
        assert_eq!(
            RenderConfig::new(320, 200, limits),
            Err(ConfigError::ZeroLimit("max_drawsegs"))
        );
        assert!(RenderConfig::new(640, 400, RenderLimits::raised()).is_ok());
    }
}
