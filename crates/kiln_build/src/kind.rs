//! Build kind classification.

use serde::Serialize;

/// Virtual path prefix under which unmapped extensions classify as
/// [`BuildKind::Theme`].
pub const THEME_PREFIX: &str = "/themes/";

/// How an identifier is classified, driving provider selection and batching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildKind {
    /// A markup page served directly to requests (`.page`).
    Page,
    /// A non-page component: fragment, service stub, or layout
    /// (`.frag`, `.svc`, `.layout`). Compiled components become implicit
    /// references for all later builds.
    Component,
    /// The application entry file (`.app`).
    AppEntry,
    /// A themed directory compiled as one unit.
    Theme,
    /// An out-of-band target named by an on-disk real path.
    Synthetic,
    /// Anything the extension table does not cover.
    Unknown,
}

impl BuildKind {
    /// Looks up the fixed extension table (case-insensitive).
    pub fn from_extension(extension: &str) -> Option<BuildKind> {
        match extension.to_ascii_lowercase().as_str() {
            "page" => Some(BuildKind::Page),
            "app" => Some(BuildKind::AppEntry),
            "frag" | "svc" | "layout" => Some(BuildKind::Component),
            _ => None,
        }
    }

    /// Whether this kind participates in sibling enumeration and batching.
    ///
    /// Theme and application-entry builds always compile alone, and synthetic
    /// targets bypass enumeration entirely.
    pub fn batches(self) -> bool {
        matches!(
            self,
            BuildKind::Page | BuildKind::Component | BuildKind::Unknown
        )
    }

    /// Stable lowercase name, as used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            BuildKind::Page => "page",
            BuildKind::Component => "component",
            BuildKind::AppEntry => "app-entry",
            BuildKind::Theme => "theme",
            BuildKind::Synthetic => "synthetic",
            BuildKind::Unknown => "unknown",
        }
    }
}
