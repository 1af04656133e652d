use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;

use super::embedded::embedded_templates;
use super::manifest::{ParamDef, TemplateManifest};
use crate::export::payload::ExportPayload;

pub struct LoadedTemplate {
    pub manifest: TemplateManifest,
    pub script: String,
}

/// User templates live in `<config dir>/stemotion/templates/<name>/manifest.json`
/// and shadow built-in templates of the same name.
pub fn user_templates_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stemotion").join("templates"))
}

pub fn list_templates() -> Result<Vec<String>> {
    let mut names: Vec<String> = embedded_templates()
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();

    if let Some(dir) = user_templates_dir().filter(|d| d.exists()) {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() && entry.path().join("manifest.json").exists() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
    }

    names.sort();
    names.dedup();
    Ok(names)
}

pub fn load_template(name: &str) -> Result<LoadedTemplate> {
    if let Some(dir) = user_templates_dir().map(|d| d.join(name)).filter(|d| d.exists()) {
        let manifest_path = dir.join("manifest.json");
        let manifest_str = std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read manifest: {}", manifest_path.display()))?;
        let manifest: TemplateManifest = serde_json::from_str(&manifest_str)
            .with_context(|| format!("Failed to parse manifest: {}", manifest_path.display()))?;
        manifest
            .validate()
            .with_context(|| format!("Invalid manifest: {}", manifest_path.display()))?;
        let script_path = dir.join(&manifest.script);
        let script = std::fs::read_to_string(&script_path)
            .with_context(|| format!("Failed to read script: {}", script_path.display()))?;
        log::info!("Using user template '{}' from {}", name, dir.display());
        return Ok(LoadedTemplate { manifest, script });
    }

    let (_, embedded) = embedded_templates()
        .iter()
        .find(|(n, _)| *n == name)
        .with_context(|| {
            format!(
                "Template '{}' not found. Available templates: {:?}",
                name,
                list_templates().unwrap_or_default()
            )
        })?;

    let manifest: TemplateManifest = serde_json::from_str(embedded.manifest_json)
        .with_context(|| format!("Failed to parse built-in manifest for '{}'", name))?;
    manifest
        .validate()
        .with_context(|| format!("Invalid built-in manifest for '{}'", name))?;

    Ok(LoadedTemplate {
        manifest,
        script: embedded.script.to_string(),
    })
}

/// Fill the script placeholders with the export payload and parameter values.
pub fn render(
    template: &LoadedTemplate,
    payload: &ExportPayload,
    overrides: &HashMap<String, String>,
) -> Result<String> {
    let data_json = serde_json::to_string(payload).context("Failed to serialize payload for script")?;
    let ids: Vec<&String> = payload.channels.keys().collect();
    let channel_ids = serde_json::to_string(&ids)?;

    let mut out = template
        .script
        .replace("{{GENERATOR}}", &payload.meta.generator_tag)
        .replace("{{FPS}}", &payload.meta.fps.to_string())
        .replace("{{BPM}}", &payload.meta.bpm.to_string())
        .replace("{{DURATION_FRAMES}}", &payload.meta.duration_frames.to_string())
        .replace("{{CHANNEL_IDS}}", &channel_ids);

    for (name, value) in param_values(&template.manifest, overrides) {
        out = out.replace(&format!("{{{{PARAM_{}}}}}", name.to_uppercase()), &value);
    }

    for key in overrides.keys() {
        if !template.manifest.parameters.contains_key(key) {
            log::warn!("Template '{}' has no parameter '{}'", template.manifest.name, key);
        }
    }

    // Data last so payload text is never scanned for placeholders
    Ok(out.replace("{{DATA_JSON}}", &data_json))
}

/// Literal text for every manifest parameter: the override if it parses,
/// else the manifest default.
fn param_values(manifest: &TemplateManifest, overrides: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut values = Vec::with_capacity(manifest.parameters.len());

    for (name, def) in &manifest.parameters {
        let value = overrides.get(name.as_str());

        let literal = match def.param_type.as_str() {
            "int" => {
                let v: i64 = value
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| def.default.as_i64().unwrap_or(0));
                bounded(v as f64, def, name).to_string()
            }
            "float" => {
                let v: f64 = value
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| def.default.as_f64().unwrap_or(0.0));
                format!("{:.6}", bounded(v, def, name))
            }
            "bool" => {
                let v: bool = value
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or_else(|| def.default.as_bool().unwrap_or(false));
                v.to_string()
            }
            "string" => {
                let v = value
                    .cloned()
                    .unwrap_or_else(|| def.default.as_str().unwrap_or_default().to_string());
                escape_string(&v)
            }
            _ => {
                log::warn!("Unknown parameter type '{}' for '{}'", def.param_type, name);
                continue;
            }
        };
        values.push((name.clone(), literal));
    }

    values
}

fn bounded(v: f64, def: &ParamDef, name: &str) -> f64 {
    let min = def.min.as_ref().and_then(|m| m.as_f64()).unwrap_or(f64::NEG_INFINITY);
    let max = def.max.as_ref().and_then(|m| m.as_f64()).unwrap_or(f64::INFINITY);
    if v < min || v > max {
        log::warn!("Parameter '{}' = {} clamped to [{}, {}]", name, v, min, max);
    }
    // min > max only reaches here from a manifest that skipped validate()
    v.max(min).min(max)
}

/// JSON string escaping without the surrounding quotes; valid inside both
/// Python and JavaScript double-quoted literals.
fn escape_string(s: &str) -> String {
    let quoted = serde_json::Value::String(s.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
