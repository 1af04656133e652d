pub struct EmbeddedTemplate {
    pub manifest_json: &'static str,
    pub script: &'static str,
}

pub fn embedded_templates() -> &'static [(&'static str, EmbeddedTemplate)] {
    &[
        (
            "after_effects",
            EmbeddedTemplate {
                manifest_json: include_str!("../../templates/after_effects/manifest.json"),
                script: include_str!("../../templates/after_effects/import_channels.jsx"),
            },
        ),
        (
            "blender",
            EmbeddedTemplate {
                manifest_json: include_str!("../../templates/blender/manifest.json"),
                script: include_str!("../../templates/blender/import_channels.py"),
            },
        ),
    ]
}
