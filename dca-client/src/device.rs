//! Device targeting
//!
//! The original interface used an empty device string to mean "whichever
//! single device is connected". That sentinel is replaced by an explicit
//! selector so an empty identifier can be rejected instead of silently
//! meaning something else.

/// Selects which paired device a request targets
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    /// Use the one connected device; fails if there are zero or several.
    /// Resolution happens at send time, not when the selector is built.
    #[default]
    Auto,

    /// Target the device with this address
    Address(String),
}

impl DeviceSelector {
    /// Selector for an explicit device address
    pub fn address(addr: impl Into<String>) -> Self {
        DeviceSelector::Address(addr.into())
    }
}

impl From<&str> for DeviceSelector {
    /// Empty string maps to `Auto`, mirroring the original call convention
    /// for callers porting from it.
    fn from(value: &str) -> Self {
        if value.is_empty() {
            DeviceSelector::Auto
        } else {
            DeviceSelector::Address(value.to_string())
        }
    }
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSelector::Auto => write!(f, "<auto>"),
            DeviceSelector::Address(addr) => write!(f, "{}", addr),
        }
    }
}
