use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct TemplateManifest {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Script file next to the manifest.
    pub script: String,
    /// Extension of the rendered script, without the dot.
    pub extension: String,
    #[serde(default)]
    pub parameters: HashMap<String, ParamDef>,
}

#[derive(Debug, Deserialize)]
pub struct ParamDef {
    #[serde(rename = "type")]
    pub param_type: String,
    pub default: serde_json::Value,
    #[serde(default)]
    pub min: Option<serde_json::Value>,
    #[serde(default)]
    pub max: Option<serde_json::Value>,
}

impl TemplateManifest {
    /// Numeric bounds must be numbers with `min <= max`.
    pub fn validate(&self) -> Result<()> {
        for (name, def) in &self.parameters {
            let bound = |v: &Option<serde_json::Value>, which: &str| -> Result<Option<f64>> {
                match v {
                    None => Ok(None),
                    Some(v) => match v.as_f64() {
                        Some(n) => Ok(Some(n)),
                        None => anyhow::bail!("Parameter '{}': {} must be a number, got {}", name, which, v),
                    },
                }
            };
            if let (Some(min), Some(max)) = (bound(&def.min, "min")?, bound(&def.max, "max")?) {
                if min > max {
                    anyhow::bail!("Parameter '{}': min {} is greater than max {}", name, min, max);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(params: &str) -> TemplateManifest {
        serde_json::from_str(&format!(
            r#"{{"name":"t","display_name":"T","script":"t.py","extension":"py","parameters":{}}}"#,
            params
        ))
        .unwrap()
    }

    #[test]
    fn accepts_ordered_bounds() {
        manifest(r#"{"scale":{"type":"float","default":1.0,"min":0.0,"max":10.0}}"#)
            .validate()
            .unwrap();
        manifest(r#"{"scale":{"type":"float","default":1.0,"min":2.0}}"#)
            .validate()
            .unwrap();
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = manifest(r#"{"scale":{"type":"float","default":1.0,"min":5.0,"max":1.0}}"#)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("scale"));
    }

    #[test]
    fn rejects_non_numeric_bound() {
        assert!(manifest(r#"{"scale":{"type":"float","default":1.0,"max":"big"}}"#)
            .validate()
            .is_err());
    }
}
