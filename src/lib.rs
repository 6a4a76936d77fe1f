#![allow(clippy::collapsible_if)]

pub mod diagnostics;
pub mod hir;
pub mod language;
