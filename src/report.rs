use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

pub const FILENAME_GRAMMAR_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Success,
    Failed,
    CompileError,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::CompileError => "cerror",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "cerror" => Some(Self::CompileError),
            _ => None,
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::CompileError)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDescriptor {
    pub report_kind: String,
    pub project: String,
    pub revision: String,
    pub config_id: Option<u32>,
    pub run_id: String,
    pub status: FileStatus,
    pub extension: String,
}

impl ReportDescriptor {
    pub fn file_name(&self) -> String {
        let config = match self.config_id {
            Some(config_id) => format!("_config-{config_id}"),
            None => String::new(),
        };

        format!(
            "{}-{}-{}{}_{}_{}.{}",
            self.report_kind,
            self.project,
            self.revision,
            config,
            self.run_id,
            self.status.as_str(),
            self.extension
        )
    }

    pub fn matches_revision_of(&self, full_hash: &str) -> bool {
        full_hash.starts_with(&self.revision)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFileName {
    Report(ReportDescriptor),
    Unrecognized(String),
}

#[derive(Debug)]
pub struct FileNameParser {
    pattern: Regex,
}

impl FileNameParser {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(
            r"(?x)
            ^
            # lazy segment repetition: the shortest kind that still lets the
            # rest of the name match wins, so a hex revision followed by a
            # config segment can never be folded into the kind or project
            (?P<kind>[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*?)
            -
            (?P<project>[A-Za-z0-9_]+)
            -
            (?P<revision>[0-9a-fA-F]+)
            (?:_config-(?P<config>[0-9]+))?
            _
            (?P<run>[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})
            _
            (?P<status>success|failed|cerror)
            \.
            (?P<extension>[A-Za-z0-9]+(?:\.[A-Za-z0-9]+)*)
            $
            ",
        )
        .context("failed to compile report filename regex")?;

        debug!(
            grammar_version = FILENAME_GRAMMAR_VERSION,
            "compiled report filename grammar"
        );
        Ok(Self { pattern })
    }

    pub fn parse(&self, file_name: &str) -> ParsedFileName {
        let Some(captures) = self.pattern.captures(file_name) else {
            return ParsedFileName::Unrecognized(file_name.to_string());
        };

        let config_id = match captures.name("config") {
            Some(config) => match config.as_str().parse::<u32>() {
                Ok(config_id) => Some(config_id),
                Err(_) => return ParsedFileName::Unrecognized(file_name.to_string()),
            },
            None => None,
        };

        let status = captures
            .name("status")
            .and_then(|status| FileStatus::from_tag(status.as_str()));
        let Some(status) = status else {
            return ParsedFileName::Unrecognized(file_name.to_string());
        };

        let field = |name: &str| {
            captures
                .name(name)
                .map(|capture| capture.as_str().to_string())
                .unwrap_or_default()
        };

        ParsedFileName::Report(ReportDescriptor {
            report_kind: field("kind"),
            project: field("project"),
            revision: field("revision").to_ascii_lowercase(),
            config_id,
            run_id: field("run").to_ascii_lowercase(),
            status,
            extension: field("extension"),
        })
    }
}
