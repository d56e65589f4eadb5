//! JSON rendering of loaded plugin records.

use std::io::Write;

use pulse_control::{LoadedPlugin, PluginType};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use crate::errors::AppError;

/// One line of `load` output describing a plugin that reached `loaded`.
#[derive(Debug, Serialize)]
pub(crate) struct PluginSummary<'a> {
    name: Option<&'a str>,
    version: Option<u32>,
    #[serde(rename = "type")]
    plugin_type: Option<PluginType>,
    path: String,
    token: Option<&'a str>,
    state: &'static str,
    loaded_time: Option<String>,
}

impl<'a> PluginSummary<'a> {
    pub(crate) fn from_plugin(plugin: &'a LoadedPlugin) -> Result<Self, AppError> {
        let loaded_time = plugin
            .loaded_time()
            .map(|time| time.format(&Rfc3339))
            .transpose()?;
        Ok(Self {
            name: plugin.name(),
            version: plugin.meta().map(|meta| meta.version()),
            plugin_type: plugin.plugin_type(),
            path: plugin.path().display().to_string(),
            token: plugin.token(),
            state: plugin.state().as_str(),
            loaded_time,
        })
    }

    /// Writes the summary as a single JSON line.
    pub(crate) fn emit<W: Write>(&self, out: &mut W) -> Result<(), AppError> {
        let line = serde_json::to_string(self)?;
        writeln!(out, "{line}")?;
        Ok(())
    }
}
