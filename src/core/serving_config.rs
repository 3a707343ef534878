// src/core/serving_config.rs

//! Parsing, serialization, and CRC32-guarded writes for the serving
//! engine's text-format config file.
//!
//! The file is a small, fixed-shape protobuf text format (one
//! `model_config_list` message containing repeated `config` entries). Since
//! this system only ever produces files of this exact shape, parsing is a
//! small hand-rolled recursive-descent reader over the brace/colon grammar
//! rather than a pull in of a full protobuf text-format implementation.

use crate::core::errors::{CoreError, CoreResult};
use crc::{Crc, CRC_32_ISO_HDLC};
use std::path::Path;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn crc32(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelVersionPolicy {
    /// `latest { num_versions: K }`
    Latest { num_versions: u32 },
    /// `specific { versions: [v0, v1, ...] }`
    Specific { versions: Vec<u64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub name: String,
    pub base_path: String,
    pub model_platform: String,
    pub model_version_policy: ModelVersionPolicy,
}

impl ConfigEntry {
    pub fn latest_one(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        ConfigEntry {
            name: name.into(),
            base_path: base_path.into(),
            model_platform: "tensorflow".to_string(),
            model_version_policy: ModelVersionPolicy::Latest { num_versions: 1 },
        }
    }

    pub fn priority(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        ConfigEntry {
            name: name.into(),
            base_path: base_path.into(),
            model_platform: "tensorflow".to_string(),
            model_version_policy: ModelVersionPolicy::Specific { versions: vec![0] },
        }
    }

    pub fn is_priority(&self) -> bool {
        matches!(&self.model_version_policy, ModelVersionPolicy::Specific { versions } if versions.contains(&0))
    }
}

/// Serializes a list of entries to the config file's text shape. An empty
/// list serializes to the literal `model_config_list {\n\n}\n`.
pub fn serialize(entries: &[ConfigEntry]) -> String {
    if entries.is_empty() {
        return "model_config_list {\n\n}\n".to_string();
    }
    let mut out = String::from("model_config_list {\n");
    for entry in entries {
        out.push_str("  config {\n");
        out.push_str(&format!("    name: \"{}\"\n", entry.name));
        out.push_str(&format!("    base_path: \"{}\"\n", entry.base_path));
        out.push_str(&format!("    model_platform: \"{}\"\n", entry.model_platform));
        out.push_str("    model_version_policy {\n");
        match &entry.model_version_policy {
            ModelVersionPolicy::Latest { num_versions } => {
                out.push_str("      latest {\n");
                out.push_str(&format!("        num_versions: {num_versions}\n"));
                out.push_str("      }\n");
            }
            ModelVersionPolicy::Specific { versions } => {
                out.push_str("      specific {\n");
                for v in versions {
                    out.push_str(&format!("        versions: {v}\n"));
                }
                out.push_str("      }\n");
            }
        }
        out.push_str("    }\n");
        out.push_str("  }\n");
    }
    out.push_str("}\n");
    out
}

/// Parses the config file's text shape back into its entries, preserving
/// order.
pub fn parse(text: &str) -> CoreResult<Vec<ConfigEntry>> {
    let mut tokens = Tokenizer::new(text);
    tokens.expect_ident("model_config_list")?;
    tokens.expect_punct('{')?;
    let mut entries = Vec::new();
    while tokens.peek_punct() != Some('}') {
        tokens.expect_ident("config")?;
        tokens.expect_punct('{')?;
        entries.push(parse_entry(&mut tokens)?);
        tokens.expect_punct('}')?;
    }
    tokens.expect_punct('}')?;
    Ok(entries)
}

fn parse_entry(tokens: &mut Tokenizer) -> CoreResult<ConfigEntry> {
    let mut name = None;
    let mut base_path = None;
    let mut model_platform = "tensorflow".to_string();
    let mut policy = None;

    while tokens.peek_punct() != Some('}') {
        let field = tokens.expect_any_ident()?;
        match field.as_str() {
            "name" => {
                tokens.expect_punct(':')?;
                name = Some(tokens.expect_string()?);
            }
            "base_path" => {
                tokens.expect_punct(':')?;
                base_path = Some(tokens.expect_string()?);
            }
            "model_platform" => {
                tokens.expect_punct(':')?;
                model_platform = tokens.expect_string()?;
            }
            "model_version_policy" => {
                tokens.expect_punct('{')?;
                policy = Some(parse_policy(tokens)?);
                tokens.expect_punct('}')?;
            }
            other => {
                return Err(CoreError::BadRequest(format!(
                    "unexpected field '{other}' in config entry"
                )));
            }
        }
    }

    Ok(ConfigEntry {
        name: name.ok_or_else(|| CoreError::BadRequest("config entry missing name".into()))?,
        base_path: base_path
            .ok_or_else(|| CoreError::BadRequest("config entry missing base_path".into()))?,
        model_platform,
        model_version_policy: policy
            .ok_or_else(|| CoreError::BadRequest("config entry missing model_version_policy".into()))?,
    })
}

fn parse_policy(tokens: &mut Tokenizer) -> CoreResult<ModelVersionPolicy> {
    let kind = tokens.expect_any_ident()?;
    tokens.expect_punct('{')?;
    let policy = match kind.as_str() {
        "latest" => {
            tokens.expect_ident("num_versions")?;
            tokens.expect_punct(':')?;
            let n = tokens.expect_int()?;
            ModelVersionPolicy::Latest {
                num_versions: n as u32,
            }
        }
        "specific" => {
            let mut versions = Vec::new();
            while tokens.peek_punct() != Some('}') {
                tokens.expect_ident("versions")?;
                tokens.expect_punct(':')?;
                versions.push(tokens.expect_int()? as u64);
            }
            ModelVersionPolicy::Specific { versions }
        }
        other => {
            return Err(CoreError::BadRequest(format!(
                "unknown model_version_policy kind '{other}'"
            )));
        }
    };
    tokens.expect_punct('}')?;
    Ok(policy)
}

/// Reads the config file, returning its parsed entries and the CRC32 of the
/// raw bytes observed at read time.
pub async fn read_config(path: &Path) -> CoreResult<(Vec<ConfigEntry>, u32)> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok((Vec::new(), crc32(b"")));
        }
        Err(e) => return Err(e.into()),
    };
    let crc = crc32(&bytes);
    let text = String::from_utf8_lossy(&bytes);
    let entries = parse(&text)?;
    Ok((entries, crc))
}

/// Writes `entries` to `path`, but only if the file's current on-disk bytes
/// still hash to `expected_crc` (the CRC observed at the last read). On
/// mismatch, refuses the write with [`CoreError::ConfigConflict`] and
/// leaves the file untouched.
pub async fn write_config_guarded(
    path: &Path,
    expected_crc: u32,
    entries: &[ConfigEntry],
) -> CoreResult<()> {
    let current_bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    if crc32(&current_bytes) != expected_crc {
        return Err(CoreError::ConfigConflict);
    }
    let text = serialize(entries);
    tokio::fs::write(path, text.as_bytes()).await?;
    Ok(())
}

struct Tokenizer<'a> {
    rest: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Tokenizer {
            rest: text.chars().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(&c) = self.rest.peek() {
            if c.is_whitespace() {
                self.rest.next();
            } else {
                break;
            }
        }
    }

    fn peek_punct(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest.peek().copied().filter(|c| matches!(c, '{' | '}' | ':'))
    }

    fn expect_punct(&mut self, expected: char) -> CoreResult<()> {
        self.skip_ws();
        match self.rest.next() {
            Some(c) if c == expected => Ok(()),
            other => Err(CoreError::BadRequest(format!(
                "expected '{expected}', found {other:?}"
            ))),
        }
    }

    fn read_ident(&mut self) -> CoreResult<String> {
        self.skip_ws();
        let mut ident = String::new();
        while let Some(&c) = self.rest.peek() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                self.rest.next();
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(CoreError::BadRequest("expected identifier".into()));
        }
        Ok(ident)
    }

    fn expect_any_ident(&mut self) -> CoreResult<String> {
        self.read_ident()
    }

    fn expect_ident(&mut self, expected: &str) -> CoreResult<()> {
        let found = self.read_ident()?;
        if found == expected {
            Ok(())
        } else {
            Err(CoreError::BadRequest(format!(
                "expected identifier '{expected}', found '{found}'"
            )))
        }
    }

    fn expect_string(&mut self) -> CoreResult<String> {
        self.skip_ws();
        self.expect_punct('"')?;
        let mut s = String::new();
        loop {
            match self.rest.next() {
                Some('"') => break,
                Some(c) => s.push(c),
                None => return Err(CoreError::BadRequest("unterminated string literal".into())),
            }
        }
        Ok(s)
    }

    fn expect_int(&mut self) -> CoreResult<i64> {
        self.skip_ws();
        let mut s = String::new();
        if self.rest.peek() == Some(&'-') {
            s.push('-');
            self.rest.next();
        }
        while let Some(&c) = self.rest.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.rest.next();
            } else {
                break;
            }
        }
        s.parse::<i64>()
            .map_err(|_| CoreError::BadRequest(format!("expected integer, found '{s}'")))
    }
}
