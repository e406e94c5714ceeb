//! Configuration for one SDK graph construction pass.

use serde::{Deserialize, Serialize};

/// Options controlling resolution, propagation and example binding.
///
/// Deserializes from the kebab-case keys an emitter passes through its own config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SdkContextOptions {
    /// Emitter package name; its suffix selects the client-name scope.
    pub emitter_name: String,
    /// Flatten unions of enums/unions of literals into a single enum.
    pub flatten_union_as_enum: bool,
    pub generate_convenience_methods: bool,
    pub generate_protocol_methods: bool,
    /// Do not push usage/access from a model onto its non-discriminated base.
    pub disable_usage_access_propagation_to_base: bool,
    /// Pinned API version; `None` or `"latest"` selects the newest.
    pub api_version: Option<String>,
    /// Elevate `subscriptionId` parameters onto the client.
    pub arm: bool,
    /// Explicitly configured examples directory.
    pub examples_dir: Option<String>,
}

impl Default for SdkContextOptions {
    fn default() -> Self {
        Self {
            emitter_name: String::new(),
            flatten_union_as_enum: true,
            generate_convenience_methods: true,
            generate_protocol_methods: true,
            disable_usage_access_propagation_to_base: false,
            api_version: None,
            arm: false,
            examples_dir: None,
        }
    }
}

impl SdkContextOptions {
    /// Create options for an emitter with all defaults.
    pub fn new(emitter_name: impl Into<String>) -> Self {
        Self {
            emitter_name: emitter_name.into(),
            ..Self::default()
        }
    }

    /// Parse options from an emitter configuration object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn flatten_union_as_enum(mut self, flatten: bool) -> Self {
        self.flatten_union_as_enum = flatten;
        self
    }

    pub fn generate_convenience_methods(mut self, generate: bool) -> Self {
        self.generate_convenience_methods = generate;
        self
    }

    pub fn generate_protocol_methods(mut self, generate: bool) -> Self {
        self.generate_protocol_methods = generate;
        self
    }

    pub fn disable_usage_access_propagation_to_base(mut self, disable: bool) -> Self {
        self.disable_usage_access_propagation_to_base = disable;
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn arm(mut self, arm: bool) -> Self {
        self.arm = arm;
        self
    }

    pub fn examples_dir(mut self, dir: impl Into<String>) -> Self {
        self.examples_dir = Some(dir.into());
        self
    }

    /// Language scope used to pick client-name overrides.
    ///
    /// `@scope/typespec-python` and `typespec-python` both map to `python`.
    pub fn language_scope(&self) -> &str {
        let name = self
            .emitter_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.emitter_name);
        name.strip_prefix("typespec-").unwrap_or(name)
    }

    /// The pinned version, unless it is the `latest` alias.
    pub fn pinned_api_version(&self) -> Option<&str> {
        self.api_version
            .as_deref()
            .filter(|v| !v.eq_ignore_ascii_case("latest"))
    }
}
