// SPDX-License-Identifier: MIT

pub mod config;
pub mod questionnaire;
pub mod server;
pub mod template;
