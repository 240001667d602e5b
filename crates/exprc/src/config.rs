//! Compiler-wide configuration: a builder-constructed struct, matching
//! this codebase's preference for
//! builders over public struct literals in its compiler-shaped crates.

/// The three knobs a [`crate::Compiler`] is configured with. All default to
/// their safe values — a `Compiler::new(CompilerConfig::default())` behaves
/// exactly like one built with `CompilerConfig::builder().build()`.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    direct_emitter_enabled: bool,
    debug_can_emit: bool,
    persist_generated_classes: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            direct_emitter_enabled: true,
            debug_can_emit: false,
            persist_generated_classes: false,
        }
    }
}

impl CompilerConfig {
    /// Start building a config away from the defaults.
    pub fn builder() -> CompilerConfigBuilder {
        CompilerConfigBuilder::default()
    }

    /// Whether the direct emitter (component C) is tried before falling
    /// back to the host compiler. Disabling this forces every request
    /// through the fallback path — useful for exercising component D in
    /// isolation without starving component C's own test coverage.
    pub fn direct_emitter_enabled(&self) -> bool {
        self.direct_emitter_enabled
    }

    /// Whether `can_emit`'s rejection reason (when the direct emitter
    /// declines a tree) is logged at `tracing::debug!` before falling back.
    pub fn debug_can_emit(&self) -> bool {
        self.debug_can_emit
    }

    /// Whether generated class bytes are retained on [`crate::Compiler`]
    /// alongside the registry entry, for a caller that wants to persist
    /// them (to a jar, to disk) after the fact. The registry itself always
    /// keeps the bytes for its own lifetime regardless of this flag; this
    /// only controls whether `Compiler::compile` additionally hands them
    /// back to the caller.
    pub fn persist_generated_classes(&self) -> bool {
        self.persist_generated_classes
    }
}

/// Builder for [`CompilerConfig`].
#[derive(Debug, Clone, Default)]
pub struct CompilerConfigBuilder {
    config: CompilerConfig,
}

impl CompilerConfigBuilder {
    /// Enable or disable the direct emitter path entirely.
    pub fn direct_emitter_enabled(mut self, enabled: bool) -> Self {
        self.config.direct_emitter_enabled = enabled;
        self
    }

    /// Enable or disable `can_emit` rejection-reason logging.
    pub fn debug_can_emit(mut self, enabled: bool) -> Self {
        self.config.debug_can_emit = enabled;
        self
    }

    /// Enable or disable returning generated class bytes to the caller.
    pub fn persist_generated_classes(mut self, enabled: bool) -> Self {
        self.config.persist_generated_classes = enabled;
        self
    }

    /// Finish building.
    pub fn build(self) -> CompilerConfig {
        self.config
    }
}
