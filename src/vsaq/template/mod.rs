// SPDX-License-Identifier: MIT

pub mod loader;
pub mod registry;
pub mod types;

pub use loader::{TemplateFormat, TemplateLoader};
pub use registry::{ItemParser, ParserRegistry};
pub use types::{ItemDescriptor, TemplateDocument};
