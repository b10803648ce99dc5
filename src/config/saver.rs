use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CHECKPOINT_DIRECTORY: &str = "~/apex_checkpoints/";
pub const DEFAULT_CHECKPOINT_BASENAME: &str = "model.ckpt";
pub const DEFAULT_MAX_CHECKPOINTS: u64 = 5;
pub const DEFAULT_CHECKPOINT_SAVE_SECS: u64 = 600;

pub const DEFAULT_SUMMARY_DIRECTORY: &str = "~/apex_summaries/";
pub const DEFAULT_SUMMARY_SAVE_SECS: u64 = 120;

/// Expand a leading `~` against `$HOME`; other paths are returned as given
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) => match env::var_os("HOME") {
            Some(home) => {
                let mut expanded = PathBuf::from(home);
                let rest = rest.trim_start_matches('/');
                if !rest.is_empty() {
                    expanded.push(rest);
                }
                expanded
            }
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

/// `saver_spec`: model checkpointing. Frequency is time based (`save_secs`) or step based
/// (`save_steps`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct SaverSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_basename: Option<String>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub max_checkpoints: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub save_secs: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub save_steps: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SaverSpec {
    pub fn directory(&self) -> PathBuf {
        expand_home(self.directory.as_deref().unwrap_or(DEFAULT_CHECKPOINT_DIRECTORY))
    }

    pub fn checkpoint_basename(&self) -> &str {
        self.checkpoint_basename
            .as_deref()
            .unwrap_or(DEFAULT_CHECKPOINT_BASENAME)
    }

    pub fn max_checkpoints(&self) -> u64 {
        self.max_checkpoints.unwrap_or(DEFAULT_MAX_CHECKPOINTS)
    }

    /// Fill absent fields. `save_secs` is filled even when `save_steps` is set, and the
    /// consumer saves on whichever comes first.
    pub fn apply_defaults(&mut self) {
        self.directory
            .get_or_insert_with(|| DEFAULT_CHECKPOINT_DIRECTORY.to_string());
        self.checkpoint_basename
            .get_or_insert_with(|| DEFAULT_CHECKPOINT_BASENAME.to_string());
        self.max_checkpoints.get_or_insert(DEFAULT_MAX_CHECKPOINTS);
        self.save_secs.get_or_insert(DEFAULT_CHECKPOINT_SAVE_SECS);
    }
}

/// `summary_spec`: training summaries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct SummarySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Only summaries whose scope matches this pattern are written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summaries_regexp: Option<String>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub save_secs: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub save_steps: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SummarySpec {
    pub fn directory(&self) -> PathBuf {
        expand_home(self.directory.as_deref().unwrap_or(DEFAULT_SUMMARY_DIRECTORY))
    }

    pub fn summaries_regexp(&self) -> &str {
        self.summaries_regexp.as_deref().unwrap_or("")
    }

    pub fn apply_defaults(&mut self) {
        self.directory
            .get_or_insert_with(|| DEFAULT_SUMMARY_DIRECTORY.to_string());
        self.summaries_regexp.get_or_insert_with(String::new);
        self.save_secs.get_or_insert(DEFAULT_SUMMARY_SAVE_SECS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/ckpt"), PathBuf::from("/tmp/ckpt"));
        if let Some(home) = env::var_os("HOME") {
            assert_eq!(expand_home("~/ckpt"), PathBuf::from(home).join("ckpt"));
        }
    }

    #[test]
    fn test_save_secs_filled_alongside_save_steps() {
        let mut saver = SaverSpec {
            save_steps: Some(1000),
            ..Default::default()
        };
        saver.apply_defaults();
        assert_eq!(saver.save_steps, Some(1000));
        assert_eq!(saver.save_secs, Some(DEFAULT_CHECKPOINT_SAVE_SECS));
        assert_eq!(saver.max_checkpoints(), DEFAULT_MAX_CHECKPOINTS);

        let mut summary = SummarySpec {
            save_steps: Some(50),
            ..Default::default()
        };
        summary.apply_defaults();
        assert_eq!(summary.save_secs, Some(DEFAULT_SUMMARY_SAVE_SECS));
        assert_eq!(summary.summaries_regexp(), "");

        let mut timed = SaverSpec {
            save_secs: Some(30),
            ..Default::default()
        };
        timed.apply_defaults();
        assert_eq!(timed.save_secs, Some(30));
        assert_eq!(timed.save_steps, None);
    }
}
