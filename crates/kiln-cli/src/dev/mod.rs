//! Development server module.
//!
//! Provides the development server bootstrap:
//! - Lifecycle phases with stop requests honored in every phase
//! - Public directory serving under the base path
//! - Module resolution through the plugin pipeline

pub mod resolver;
pub mod server;
pub mod state;

// Re-exports
pub use resolver::{
    determine_content_type, ModuleResolver, PipelineResolver, ResolveError, ResolvedModule,
};
pub use server::{DevServer, ServerHandle, DEFAULT_GRACE_PERIOD};
pub use state::{ServerController, ServerPhase};
