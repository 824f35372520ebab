//! Image reference extraction from Dockerfiles and pipeline definitions.
//!
//! Dockerfiles are read directive by directive (`ARG` then `FROM`); pipeline
//! files are matched against a list of named [`ExtractionRule`]s so new file
//! dialects only need a new rule.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use regex::Regex;

use crate::domain::ImageReference;
use crate::error::Result;

/// Cross-compilation stage markers; such `FROM` lines carry no image identity.
pub const BUILD_PLATFORM_TOKENS: [&str; 2] =
    ["--platform=$BUILDPLATFORM", "--platform=${BUILDPLATFORM}"];

/// Stage names conventionally reused across multi-stage builds.
pub const STAGE_ALIASES: [&str; 4] = ["base", "build", "final", "builder"];

const ARG_PATTERN: &str = r"(?m)^[ \t]*(?i:ARG)[ \t]+([A-Z_][A-Z0-9_]*)=(\S+)";
const FROM_PATTERN: &str = r"(?m)^[ \t]*(?i:FROM)[ \t]+(\S+)";

/// Build argument values declared in a single Dockerfile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentTable {
    values: BTreeMap<String, String>,
}

impl ArgumentTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an argument; later declarations replace earlier ones.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up an argument value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of declared arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no arguments were declared.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every `${NAME}` with its declared value; unknown names stay intact.
    pub fn substitute(&self, raw: &str) -> String {
        let mut resolved = raw.to_string();
        for (name, value) in &self.values {
            resolved = resolved.replace(&format!("${{{name}}}"), value);
        }
        resolved
    }
}

impl FromIterator<(String, String)> for ArgumentTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, value) in iter {
            table.insert(name, value);
        }
        table
    }
}

/// Resolve a raw reference into full and short image names.
///
/// `registry.io/team/${APP}:1.0` with `APP=api` becomes full name `api:1.0`
/// and short name `api`.
pub fn resolve_reference(raw: &str, args: &ArgumentTable) -> ImageReference {
    let cleaned = trim_quotes(raw.trim());
    let substituted = if cleaned.contains("${") {
        args.substitute(cleaned)
    } else {
        cleaned.to_string()
    };
    let full_name = substituted
        .rsplit('/')
        .next()
        .unwrap_or(substituted.as_str())
        .to_string();
    let undigested = full_name.split('@').next().unwrap_or(full_name.as_str());
    let short_name = match undigested.rfind(':') {
        Some(index) => undigested[..index].to_string(),
        None => undigested.to_string(),
    };
    ImageReference {
        full_name,
        short_name,
    }
}

/// Whether a short name is a conventional multi-stage alias.
pub fn is_stage_alias(short_name: &str) -> bool {
    STAGE_ALIASES.contains(&short_name)
}

fn is_build_platform_stage(raw: &str) -> bool {
    BUILD_PLATFORM_TOKENS
        .iter()
        .any(|token| raw.contains(token))
}

fn trim_quotes(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

/// Extracts base image references from Dockerfile contents.
#[derive(Debug, Clone)]
pub struct DockerfileExtractor {
    arg_pattern: Regex,
    from_pattern: Regex,
}

impl DockerfileExtractor {
    /// Compile the directive patterns.
    pub fn new() -> Result<Self> {
        Ok(Self {
            arg_pattern: Regex::new(ARG_PATTERN)?,
            from_pattern: Regex::new(FROM_PATTERN)?,
        })
    }

    /// Collect `ARG NAME=value` declarations.
    pub fn arguments(&self, contents: &str) -> ArgumentTable {
        self.arg_pattern
            .captures_iter(contents)
            .map(|caps| {
                (
                    caps[1].to_string(),
                    trim_quotes(&caps[2]).to_string(),
                )
            })
            .collect()
    }

    /// Raw `FROM` operands in file order.
    pub fn from_references<'a>(&self, contents: &'a str) -> Vec<&'a str> {
        self.from_pattern
            .captures_iter(contents)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Resolve the images a Dockerfile builds from.
    ///
    /// Stage aliases are kept once per file; references left with an unbound
    /// `${...}` placeholder are dropped.
    pub fn extract(&self, contents: &str) -> Vec<ImageReference> {
        let args = self.arguments(contents);
        let mut seen_stages = HashSet::new();
        let mut images = Vec::new();

        for raw in self.from_references(contents) {
            if is_build_platform_stage(raw) {
                debug!("skipping build-platform stage {raw}");
                continue;
            }
            let image = resolve_reference(raw, &args);
            if is_stage_alias(&image.short_name) {
                if seen_stages.insert(image.short_name.clone()) {
                    images.push(image);
                }
            } else if image.full_name.contains("${") {
                debug!("discarding unresolved image reference {raw}");
            } else {
                images.push(image);
            }
        }

        images
    }
}

/// A named pattern whose first capture group is an image reference.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    name: String,
    pattern: Regex,
}

impl ExtractionRule {
    /// Compile a rule.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
        })
    }

    /// Rule identifier used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Captured references in match order.
    pub fn matches<'a>(&self, contents: &'a str) -> Vec<&'a str> {
        self.pattern
            .captures_iter(contents)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }
}

/// Built-in pipeline rules as `(name, pattern)` pairs.
pub const DEFAULT_PIPELINE_RULES: [(&str, &str); 4] = [
    ("image", r"(?i)\bimage:[ \t]*(\S+)"),
    ("service-name", r"(?i)\bservices:\s*-[ \t]*name:[ \t]*(\S+)"),
    ("repository", r"(?i)\brepository:[ \t]*(\S+)"),
    (
        "resource-type-repository",
        r"(?i)\bresource_types:\s*-[ \t]*name:[^\n]*\n(?:[ \t]+[^\n]*\n)*?[ \t]+source:\s*repository:[ \t]*(\S+)",
    ),
];

/// Extracts image references from compose, CI and pipeline files.
#[derive(Debug, Clone)]
pub struct PipelineExtractor {
    rules: Vec<ExtractionRule>,
}

impl PipelineExtractor {
    /// Extractor with the built-in rules.
    pub fn new() -> Result<Self> {
        let rules = DEFAULT_PIPELINE_RULES
            .iter()
            .map(|(name, pattern)| ExtractionRule::new(*name, pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Append a rule evaluated after the existing ones.
    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Active rules in evaluation order.
    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    /// Every match of every rule, resolved without argument substitution.
    pub fn extract(&self, contents: &str) -> Vec<ImageReference> {
        let args = ArgumentTable::new();
        let mut images = Vec::new();
        for rule in &self.rules {
            for raw in rule.matches(contents) {
                debug!("rule {} matched {raw}", rule.name());
                images.push(resolve_reference(raw, &args));
            }
        }
        images
    }
}
