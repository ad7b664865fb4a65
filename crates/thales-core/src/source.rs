//! Request locations and serialization styles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The request location a parameter binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// A path-template placeholder.
    Path,
    /// The query string.
    Query,
    /// A request header.
    Header,
    /// A cookie.
    Cookie,
    /// The JSON body.
    Body,
    /// A value computed by a dependency callable.
    Dependency,
}

impl Source {
    /// Every location that carries raw request data, in canonical order.
    pub const REQUEST: [Source; 5] = [
        Source::Path,
        Source::Query,
        Source::Header,
        Source::Cookie,
        Source::Body,
    ];

    /// Returns the lowercase name used in `loc` paths and OpenAPI `in`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "body",
            Self::Dependency => "dependency",
        }
    }

    /// Default style when none is declared.
    pub const fn default_style(self) -> Style {
        match self {
            Self::Path | Self::Header => Style::Simple,
            _ => Style::Form,
        }
    }

    /// Default explode flag when none is declared.
    pub const fn default_explode(self) -> bool {
        matches!(self, Self::Query | Self::Cookie)
    }

    /// Whether `style` may be declared for this location.
    pub const fn allows_style(self, style: Style) -> bool {
        match self {
            Self::Path | Self::Header => matches!(style, Style::Simple),
            Self::Query => !matches!(style, Style::Simple),
            Self::Cookie => matches!(style, Style::Form),
            Self::Body | Self::Dependency => false,
        }
    }

    /// True for the four OpenAPI parameter locations.
    pub const fn is_parameter(self) -> bool {
        matches!(self, Self::Path | Self::Query | Self::Header | Self::Cookie)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenAPI parameter serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    /// Comma separated, used by path and header parameters.
    Simple,
    /// Comma separated, used by query and cookie parameters.
    Form,
    /// Space separated arrays.
    SpaceDelimited,
    /// Pipe separated arrays.
    PipeDelimited,
}

impl Style {
    /// Non-exploded styles in documentation order.
    pub const ALL: [Style; 4] = [
        Style::Form,
        Style::Simple,
        Style::SpaceDelimited,
        Style::PipeDelimited,
    ];

    /// Delimiter used when a value is not exploded.
    pub const fn delimiter(self) -> char {
        match self {
            Self::Simple | Self::Form => ',',
            Self::SpaceDelimited => ' ',
            Self::PipeDelimited => '|',
        }
    }

    /// The OpenAPI name of the style.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Form => "form",
            Self::SpaceDelimited => "spaceDelimited",
            Self::PipeDelimited => "pipeDelimited",
        }
    }

    /// Looks a style up by its OpenAPI name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.as_str() == name)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
