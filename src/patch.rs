//! Writers that add a deployment target to the settings text.
//!
//! [`LinePatcher`] inserts the new entry's lines into the
//! `deployment_targets` section and leaves every other byte of
//! the document alone, so comments, ordering, and blank lines
//! survive. [`Reserializer`] parses and re-emits the whole
//! document, dropping comments and layout; it is never chosen
//! implicitly and has to be plugged in with
//! [`SettingsFile::with_writer`](crate::settings::SettingsFile::with_writer).

use serde_yaml::{Mapping, Value};

use crate::error::{DeployError, DeployResult};
use crate::settings::{DeploymentTarget, Settings};

const SECTION: &str = "deployment_targets";
const DEFAULT_INDENT: usize = 2;

/// Produces a new settings document containing one more
/// deployment target.
pub trait SettingsWriter {
    /// Return `document` with `tag` added under
    /// `deployment_targets`.
    fn append_target(
        &self,
        document: &str,
        tag: &str,
        target: &DeploymentTarget,
    ) -> DeployResult<String>;
}

/// Format-preserving, line-based insertion.
///
/// ```
/// use totoro::patch::{LinePatcher, SettingsWriter};
/// use totoro::settings::DeploymentTarget;
///
/// let doc = "hosts:\n  default: 1.2.3.4\ndeployment_targets:\n  main:\n    host: default\n    engine: master\n    env_file: .env\nprofiles: [all]\n";
/// let target = DeploymentTarget {
///     host: "default".into(),
///     engine: "master".into(),
///     env_file: ".env".into(),
/// };
///
/// let patched = LinePatcher.append_target(doc, "dev", &target).unwrap();
///
/// assert!(patched.contains("    env_file: .env\n  dev:\n    host: default\n"));
/// assert!(patched.ends_with("profiles: [all]\n"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LinePatcher;

/// Whole-document rewrite through `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reserializer;

impl SettingsWriter for LinePatcher {
    fn append_target(
        &self,
        document: &str,
        tag: &str,
        target: &DeploymentTarget,
    ) -> DeployResult<String> {
        reject_existing(document, tag)?;

        let eol = if document.contains("\r\n") { "\r\n" } else { "\n" };
        let mut lines: Vec<String> = document.split_inclusive('\n').map(str::to_string).collect();

        let Some(header) = lines.iter().position(|l| is_section_header(l)) else {
            terminate_last_line(&mut lines, eol);
            lines.push(format!("{SECTION}:{eol}"));
            lines.extend(entry_lines(tag, target, DEFAULT_INDENT, eol)?);
            return Ok(lines.concat());
        };

        match inline_value(&lines[header]) {
            "" => {}
            "{}" | "~" | "null" => lines[header] = format!("{SECTION}:{eol}"),
            other => {
                return Err(DeployError::SettingsPatch(format!(
                    "`{SECTION}` is written inline as `{other}`; \
                     convert `{SECTION}` to block style and retry"
                )));
            }
        }

        let boundary = lines[header + 1..]
            .iter()
            .position(|l| ends_section(l))
            .map_or(lines.len(), |offset| header + 1 + offset);

        let mut insert_at = boundary;
        while insert_at > header + 1 && is_trailing_filler(&lines[insert_at - 1]) {
            insert_at -= 1;
        }

        let unit = lines[header + 1..boundary]
            .iter()
            .find(|l| is_content(l))
            .map_or(DEFAULT_INDENT, |l| indent_of(l))
            .max(1);

        if insert_at == lines.len() {
            terminate_last_line(&mut lines, eol);
        }

        let entry = entry_lines(tag, target, unit, eol)?;
        lines.splice(insert_at..insert_at, entry);
        Ok(lines.concat())
    }
}

impl SettingsWriter for Reserializer {
    fn append_target(
        &self,
        document: &str,
        tag: &str,
        target: &DeploymentTarget,
    ) -> DeployResult<String> {
        reject_existing(document, tag)?;

        let mut root: Value = serde_yaml::from_str(document)?;
        if root.is_null() {
            root = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(root_map) = &mut root else {
            return Err(DeployError::SettingsPatch(
                "settings document is not a mapping".into(),
            ));
        };

        let section = root_map
            .entry(Value::String(SECTION.into()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if section.is_null() {
            *section = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(targets) = section else {
            return Err(DeployError::SettingsPatch(format!(
                "`{SECTION}` is not a mapping"
            )));
        };
        targets.insert(Value::String(tag.into()), serde_yaml::to_value(target)?);

        Ok(serde_yaml::to_string(&root)?)
    }
}

fn reject_existing(document: &str, tag: &str) -> DeployResult<()> {
    if document.trim().is_empty() {
        return Ok(());
    }
    // Typed lookup, so `1:` and `'1':` are the same tag.
    if Settings::from_yaml(document)?.deployment_target(tag).is_some() {
        return Err(DeployError::Other(format!(
            "deployment target '{tag}' already exists"
        )));
    }
    Ok(())
}

fn entry_lines(
    tag: &str,
    target: &DeploymentTarget,
    unit: usize,
    eol: &str,
) -> DeployResult<Vec<String>> {
    let outer = " ".repeat(unit);
    let inner = " ".repeat(unit * 2);
    Ok(vec![
        format!("{outer}{}:{eol}", scalar(tag)?),
        format!("{inner}host: {}{eol}", scalar(&target.host)?),
        format!("{inner}engine: {}{eol}", scalar(&target.engine)?),
        format!("{inner}env_file: {}{eol}", scalar(&target.env_file)?),
    ])
}

/// Render a string as a YAML scalar, quoted only when needed.
fn scalar(value: &str) -> DeployResult<String> {
    Ok(serde_yaml::to_string(value)?.trim_end().to_string())
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_blank(line: &str) -> bool {
    strip_eol(line).trim().is_empty()
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_content(line: &str) -> bool {
    !is_blank(line) && !is_comment(line)
}

fn is_section_header(line: &str) -> bool {
    line.strip_prefix(SECTION)
        .and_then(|rest| rest.strip_prefix(':'))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t', '\r', '\n', '#']))
}

/// Text after `deployment_targets:` with any trailing comment
/// removed.
fn inline_value(header: &str) -> &str {
    let rest = &strip_eol(header)[SECTION.len() + 1..];
    let rest = rest.split(" #").next().unwrap_or(rest);
    let rest = if rest.trim_start().starts_with('#') { "" } else { rest };
    rest.trim()
}

/// A key at top level ends the section; so does a document
/// marker.
fn ends_section(line: &str) -> bool {
    is_content(line) && indent_of(line) == 0 && !line.starts_with(['\t', '-'])
        || strip_eol(line) == "---"
        || strip_eol(line) == "..."
}

/// Blank lines and top-level comments directly above the next key
/// belong to that key, not to the section being extended.
fn is_trailing_filler(line: &str) -> bool {
    is_blank(line) || (is_comment(line) && indent_of(line) == 0)
}

fn terminate_last_line(lines: &mut [String], eol: &str) {
    if let Some(last) = lines.last_mut() {
        if !last.ends_with('\n') {
            last.push_str(eol);
        }
    }
}
