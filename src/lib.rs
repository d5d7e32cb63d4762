pub mod api;
pub mod chat_management;
pub mod commands;
pub mod config;
pub mod engagement;
pub mod error;
pub mod events;
pub mod io;
pub mod logging;

// Re-export the main error types for convenience
pub use api::control_surface::PlatformError;
pub use config::ConfigError;
pub use engagement::ValidationError;
pub use error::{EmceeError, EmceeResult};
pub use io::FeedError;

// Re-export the core types
pub use api::{ControlSurface, HelixClient, ScriptedSurface};
pub use chat_management::{ExemptChatters, ShoutoutTracker};
pub use commands::{CommandOutcome, InvocationContext, Orchestrator, OrchestratorSettings};
pub use engagement::EngagementSession;
pub use events::ChatEvent;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        assert!(std::any::type_name::<Orchestrator>().contains("Orchestrator"));
        assert!(std::any::type_name::<api::helix::HelixClient>().contains("HelixClient"));
    }

    #[test]
    fn test_error_types_re_exported() {
        let platform: EmceeError = PlatformError::other("boom").into();
        assert!(platform.to_string().contains("boom"));

        let validation: EmceeError = ValidationError::NoActivePrediction.into();
        assert!(matches!(validation, EmceeError::Validation(_)));

        let general: EmceeError = anyhow::anyhow!("something else").into();
        assert_eq!(general.to_string(), "something else");
    }
}
