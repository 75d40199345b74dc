//! Process-wide kernel configuration.
//!
//! Resolved once, on first use, from Cargo features and the environment:
//!
//! | source                          | effect                               |
//! |---------------------------------|--------------------------------------|
//! | feature `native` off            | no native kernel is ever registered  |
//! | `STRIDED_NATIVE=0\|false\|off`  | same, at runtime                     |
//! | feature `simd`                  | pulp dispatch for long unit-stride runs |

use std::sync::OnceLock;

use tracing::debug;

/// Environment variable that can disable native kernels.
pub const NATIVE_ENV: &str = "STRIDED_NATIVE";

/// Whether native kernels may be registered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NativeStatus {
    Enabled,
    /// Built without the `native` feature.
    DisabledByFeature,
    /// Switched off through [`NATIVE_ENV`].
    DisabledByEnv,
}

impl NativeStatus {
    #[inline]
    pub fn is_enabled(self) -> bool {
        self == NativeStatus::Enabled
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KernelConfig {
    pub native: NativeStatus,
    /// Compiled with the `simd` feature.
    pub simd: bool,
}

impl KernelConfig {
    /// The configuration every dispatch table is built against.
    pub fn global() -> &'static KernelConfig {
        static CONFIG: OnceLock<KernelConfig> = OnceLock::new();
        CONFIG.get_or_init(|| {
            let config = KernelConfig::from_env();
            debug!(
                native = ?config.native,
                simd = config.simd,
                "strided kernel configuration resolved"
            );
            config
        })
    }

    /// Resolve from the current environment without caching.
    pub fn from_env() -> Self {
        Self::from_setting(std::env::var(NATIVE_ENV).ok().as_deref())
    }

    /// Resolve from an explicit value of [`NATIVE_ENV`].
    pub fn from_setting(setting: Option<&str>) -> Self {
        let native = if !cfg!(feature = "native") {
            NativeStatus::DisabledByFeature
        } else if matches!(
            setting.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
            Some("0" | "false" | "off")
        ) {
            NativeStatus::DisabledByEnv
        } else {
            NativeStatus::Enabled
        };
        KernelConfig {
            native,
            simd: cfg!(feature = "simd"),
        }
    }

    #[inline]
    pub fn natives_enabled(&self) -> bool {
        self.native.is_enabled()
    }
}

/// Native kernel availability for this process.
pub fn native_status() -> NativeStatus {
    KernelConfig::global().native
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_values_disable() {
        for value in ["0", "false", "OFF", " off "] {
            let config = KernelConfig::from_setting(Some(value));
            assert!(!config.natives_enabled(), "{value}");
        }
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_default_enabled() {
        assert_eq!(KernelConfig::from_setting(None).native, NativeStatus::Enabled);
        assert_eq!(
            KernelConfig::from_setting(Some("1")).native,
            NativeStatus::Enabled
        );
        assert_eq!(
            KernelConfig::from_setting(Some("0")).native,
            NativeStatus::DisabledByEnv
        );
    }

    #[cfg(not(feature = "native"))]
    #[test]
    fn test_feature_off_wins() {
        assert_eq!(
            KernelConfig::from_setting(None).native,
            NativeStatus::DisabledByFeature
        );
    }
}
