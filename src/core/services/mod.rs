pub mod env_resolver;
pub mod pipeline;
pub mod template_resolver;
pub mod token_resolver;
