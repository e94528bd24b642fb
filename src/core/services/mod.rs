pub mod generation_service;
pub mod template_service;

pub use generation_service::{GenerationReport, GenerationService, SkippedTemplate};
pub use template_service::{NewTemplate, TemplateService};
