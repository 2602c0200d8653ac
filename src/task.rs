use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::Result;

/// A unit of work with a stable textual form.
///
/// Equal tasks must serialize identically, and different ones
/// differently.
pub trait CanonicalTask: Debug + Send + Sync {
    fn canonical_form(&self) -> Result<String>;
}

/// A small command executed on a worker to produce one of its inputs.
///
/// Inputs, outputs and environment are kept in ordered maps, so the order in
/// which they were declared never shows in the canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniTask {
    /// Shell command line
    pub command: String,
    /// Remote name in the sandbox to the source it is drawn from
    pub inputs: BTreeMap<String, String>,
    /// Remote name in the sandbox to the name it is extracted as
    pub outputs: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
    pub category: Option<String>,
}

impl MiniTask {
    pub fn new<S: Into<String>>(command: S) -> Self {
        MiniTask {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_input<R: Into<String>, S: Into<String>>(
        mut self,
        remote_name: R,
        source: S,
    ) -> Self {
        self.inputs.insert(remote_name.into(), source.into());
        self
    }

    pub fn with_output<R: Into<String>, S: Into<String>>(
        mut self,
        remote_name: R,
        local_name: S,
    ) -> Self {
        self.outputs
            .insert(remote_name.into(), local_name.into());
        self
    }

    pub fn with_env<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl CanonicalTask for MiniTask {
    fn canonical_form(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Checksum naming the file `output` extracted from running `task`.
///
/// The same command may produce several outputs, so the output path takes
/// part in the hash. Nothing is assumed about the command being pure.
pub fn mini_task_checksum(
    task: &dyn CanonicalTask,
    output: &str,
) -> Result<Checksum> {
    let canonical = task.canonical_form()?;
    log::trace!("mini task {} extracting {}", canonical, output);
    Ok(Checksum::from_bytes(
        format!("{}:{}", canonical, output).as_bytes(),
    ))
}
