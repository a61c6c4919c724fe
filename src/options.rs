//! Backend Options - Validated Settings
//!
//! Every setter checks the full invariant set against a candidate copy and
//! commits only when it holds. A rejected call leaves the options untouched.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Static direction must be 1 (ltr), -1 (rtl) or 0 (unspecified), got {0}")]
    InvalidStaticDirection(i32),

    #[error("Must not specify both a static direction and runtime direction detection")]
    ConflictingDirectionSources,

    #[error("Runtime direction detection requires message definitions to be generated")]
    RuntimeDirectionWithoutMsgDefs,
}

#[derive(Debug, Error)]
pub enum OptionsLoadError {
    #[error("Failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid options: {0}")]
    Invalid(#[from] ConfigurationError),
}

/// Global text direction fixed at compile time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticDirection {
    Ltr,
    Rtl,
    #[default]
    Unspecified,
}

impl StaticDirection {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Ltr => 1,
            Self::Rtl => -1,
            Self::Unspecified => 0,
        }
    }

    pub fn is_specified(self) -> bool {
        self != Self::Unspecified
    }
}

impl TryFrom<i32> for StaticDirection {
    type Error = ConfigurationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ltr),
            -1 => Ok(Self::Rtl),
            0 => Ok(Self::Unspecified),
            other => Err(ConfigurationError::InvalidStaticDirection(other)),
        }
    }
}

/// Compilation options for the PHP source backend.
///
/// Construct with [`BackendOptions::new`] (all flags off, direction
/// unspecified) and mutate through the setters. Use [`duplicate`](Self::duplicate)
/// before changing an instance that a running pipeline still borrows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendOptions {
    uses_injected_data: bool,
    generates_message_defs: bool,
    messages_are_external: bool,
    static_direction: StaticDirection,
    use_runtime_direction_detection: bool,
}

impl BackendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file. Keys are camelCase and all optional.
    pub fn load(path: &Path) -> Result<Self, OptionsLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, OptionsLoadError> {
        let file: OptionsFile = serde_json::from_str(json)?;
        Ok(file.into_options()?)
    }

    pub fn uses_injected_data(&self) -> bool {
        self.uses_injected_data
    }

    /// Sets whether templates may read injected data (`$ij`).
    pub fn set_uses_injected_data(&mut self, value: bool) -> Result<(), ConfigurationError> {
        self.apply(|o| o.uses_injected_data = value)
    }

    pub fn generates_message_defs(&self) -> bool {
        self.generates_message_defs
    }

    /// Sets whether messages are emitted as named definitions instead of inline text.
    ///
    /// Turning this off while runtime direction detection is on is rejected.
    pub fn set_generates_message_defs(&mut self, value: bool) -> Result<(), ConfigurationError> {
        self.apply(|o| o.generates_message_defs = value)
    }

    pub fn messages_are_external(&self) -> bool {
        self.messages_are_external
    }

    /// Sets whether message definitions are named `MSG_EXTERNAL_<id>` rather
    /// than `MSG_UNNAMED_<n>`. Inert unless message definitions are generated.
    pub fn set_messages_are_external(&mut self, value: bool) -> Result<(), ConfigurationError> {
        self.apply(|o| o.messages_are_external = value)
    }

    /// The external flag as it actually affects emission.
    pub fn messages_are_external_effective(&self) -> bool {
        self.generates_message_defs && self.messages_are_external
    }

    pub fn static_direction(&self) -> StaticDirection {
        self.static_direction
    }

    /// Sets the static direction from its integer form: 1 ltr, -1 rtl, 0 unspecified.
    pub fn set_static_direction(&mut self, value: i32) -> Result<(), ConfigurationError> {
        let direction = StaticDirection::try_from(value)?;
        self.set_static_direction_value(direction)
    }

    pub fn set_static_direction_value(
        &mut self,
        direction: StaticDirection,
    ) -> Result<(), ConfigurationError> {
        self.apply(|o| o.static_direction = direction)
    }

    pub fn use_runtime_direction_detection(&self) -> bool {
        self.use_runtime_direction_detection
    }

    /// Sets whether the emitted code decides direction at runtime.
    ///
    /// Requires message definitions and excludes a static direction.
    pub fn set_use_runtime_direction_detection(
        &mut self,
        value: bool,
    ) -> Result<(), ConfigurationError> {
        self.apply(|o| o.use_runtime_direction_detection = value)
    }

    /// Independent copy with identical field values.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    fn apply(&mut self, change: impl FnOnce(&mut Self)) -> Result<(), ConfigurationError> {
        let mut candidate = self.clone();
        change(&mut candidate);
        candidate.check_invariants()?;
        *self = candidate;
        Ok(())
    }

    fn check_invariants(&self) -> Result<(), ConfigurationError> {
        if self.use_runtime_direction_detection && self.static_direction.is_specified() {
            return Err(ConfigurationError::ConflictingDirectionSources);
        }
        if self.use_runtime_direction_detection && !self.generates_message_defs {
            return Err(ConfigurationError::RuntimeDirectionWithoutMsgDefs);
        }
        Ok(())
    }
}

/// On-disk shape of [`BackendOptions`]. Applied through the setters so a file
/// can never yield an invalid instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct OptionsFile {
    #[serde(default)]
    uses_injected_data: bool,
    #[serde(default)]
    generates_message_defs: bool,
    #[serde(default)]
    messages_are_external: bool,
    #[serde(default)]
    static_direction: i32,
    #[serde(default)]
    use_runtime_direction_detection: bool,
}

impl OptionsFile {
    fn into_options(self) -> Result<BackendOptions, ConfigurationError> {
        let mut options = BackendOptions::new();
        options.set_uses_injected_data(self.uses_injected_data)?;
        options.set_generates_message_defs(self.generates_message_defs)?;
        options.set_messages_are_external(self.messages_are_external)?;
        options.set_static_direction(self.static_direction)?;
        options.set_use_runtime_direction_detection(self.use_runtime_direction_detection)?;
        Ok(options)
    }
}
