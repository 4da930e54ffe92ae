//! HTML transform pipeline.
//!
//! Two stateless operations, both accepting plain text or a brotli stream
//! read straight from an artifact file:
//!
//! - [`HtmlTransformer::compress`] minifies markup.
//! - [`HtmlTransformer::optimize`] removes browser-only markup and, when
//!   asked for a full pass, normalizes images and interactive elements for
//!   crawlers.
//!
//! Both are gated by [`TransformConfig`]; `force` overrides the disable
//! switches but never the lowest power level.

pub mod codec;
pub mod dom;
pub mod rules;

use std::fmt;
use std::str::FromStr;
use std::string::FromUtf8Error;

use thiserror::Error;
use tracing::trace;

use dom::SerializeOptions;
use rules::StripLevel;

/// Errors from the transform pipeline.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The input claimed to be brotli but did not decode.
    #[error("brotli decode failed: {0}")]
    Decode(#[source] std::io::Error),

    /// The decoded bytes are not UTF-8.
    #[error("decoded html is not valid utf-8: {0}")]
    Encoding(#[from] FromUtf8Error),
}

/// Input to a transform: text, or the raw bytes of a `.br` artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlSource {
    Text(String),
    Brotli(Vec<u8>),
}

impl HtmlSource {
    /// Decodes to text; an empty brotli payload is an empty document.
    pub fn into_text(self) -> Result<String, TransformError> {
        match self {
            HtmlSource::Text(text) => Ok(text),
            HtmlSource::Brotli(bytes) if bytes.is_empty() => Ok(String::new()),
            HtmlSource::Brotli(bytes) => codec::decode(&bytes),
        }
    }
}

impl From<String> for HtmlSource {
    fn from(text: String) -> Self {
        HtmlSource::Text(text)
    }
}

impl From<&str> for HtmlSource {
    fn from(text: &str) -> Self {
        HtmlSource::Text(text.to_string())
    }
}

/// Deployment power level. Level one disables minification and deep
/// optimization regardless of `force`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PowerLevel {
    One,
    Two,
    #[default]
    Three,
}

impl FromStr for PowerLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(PowerLevel::One),
            "2" => Ok(PowerLevel::Two),
            "3" => Ok(PowerLevel::Three),
            other => Err(format!("expected 1, 2 or 3, got '{other}'")),
        }
    }
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            PowerLevel::One => 1,
            PowerLevel::Two => 2,
            PowerLevel::Three => 3,
        };
        write!(f, "{level}")
    }
}

/// Runtime environment. Minification is skipped in development.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuntimeEnv {
    Development,
    #[default]
    Production,
}

impl FromStr for RuntimeEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RuntimeEnv::Development),
            "production" | "prod" => Ok(RuntimeEnv::Production),
            other => Err(format!("expected 'development' or 'production', got '{other}'")),
        }
    }
}

impl fmt::Display for RuntimeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeEnv::Development => write!(f, "development"),
            RuntimeEnv::Production => write!(f, "production"),
        }
    }
}

/// Switches that gate the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformConfig {
    pub disable_compress: bool,
    pub disable_optimize: bool,
    pub disable_deep_optimize: bool,
    pub power_level: PowerLevel,
    pub environment: RuntimeEnv,
}

/// Applies compress and optimize under a fixed [`TransformConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTransformer {
    config: TransformConfig,
}

impl HtmlTransformer {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Minifies `input`.
    ///
    /// Returns the decoded text untouched when compression is disabled and
    /// not forced, at power level one, or in development.
    pub fn compress(
        &self,
        input: impl Into<HtmlSource>,
        force: bool,
    ) -> Result<String, TransformError> {
        let html = input.into().into_text()?;
        if html.is_empty() {
            return Ok(html);
        }

        if (self.config.disable_compress && !force) || self.config.power_level == PowerLevel::One
        {
            return Ok(html);
        }
        if self.config.environment == RuntimeEnv::Development {
            return Ok(html);
        }

        let minified = dom::serialize(&dom::parse(&html), SerializeOptions { minify: true });
        trace!(before = html.len(), after = minified.len(), "Compressed html");
        Ok(minified)
    }

    /// Removes browser-only markup from `input`.
    ///
    /// Tracker scripts and script preload hints are always stripped unless
    /// optimization is disabled and not forced. When `full` is set and deep
    /// optimization is allowed, every executable script is dropped and the
    /// element rules in [`rules`] run.
    pub fn optimize(
        &self,
        input: impl Into<HtmlSource>,
        full: bool,
        force: bool,
    ) -> Result<String, TransformError> {
        let html = input.into().into_text()?;
        if html.is_empty() {
            return Ok(html);
        }
        if self.config.disable_optimize && !force {
            return Ok(html);
        }

        let mut nodes = dom::parse(&html);
        nodes = rules::strip(nodes, StripLevel::ScriptBlocks);
        nodes = rules::strip(nodes, StripLevel::Normal);

        let deep_allowed = !(self.config.disable_deep_optimize && !force)
            && self.config.power_level != PowerLevel::One;
        if deep_allowed && full {
            nodes = rules::strip(nodes, StripLevel::Hardly);
            nodes = rules::full_optimize(nodes);
        }

        let optimized = dom::serialize(&nodes, SerializeOptions::default());
        trace!(before = html.len(), after = optimized.len(), full, "Optimized html");
        Ok(optimized)
    }
}
