//! Reference documents served as MCP resources

use crate::templates::{all_templates, template_documentation};
use minecraft_mcp_server::Catalog;
use minecraft_mcp_server::mcp::{Resource, ResourceTemplate};

const MARKDOWN: &str = "text/markdown";
const JSON: &str = "application/json";

/// (name, uri, text) of the fixed documents
const DOCUMENTS: &[(&str, &str, &str)] = &[
    (
        "minecraft-commands",
        "minecraft://commands",
        include_str!("../docs/resources/minecraft-commands.md"),
    ),
    (
        "building-patterns",
        "minecraft://building-patterns",
        include_str!("../docs/resources/building-patterns.md"),
    ),
    (
        "server-config",
        "minecraft://server-config",
        include_str!("../docs/resources/server-config.md"),
    ),
    (
        "block-reference",
        "minecraft://block-reference",
        include_str!("../docs/resources/block-reference.md"),
    ),
];

pub fn template_uri(name: &str) -> String {
    format!("minecraft://template/{}", urlencoding::encode(name))
}

/// `Basic House Foundation` -> `template-basic-house-foundation`
fn template_resource_name(name: &str) -> String {
    let words: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
    format!("template-{}", words.join("-"))
}

fn resource(name: &str, uri: &str, mime_type: &str) -> Resource {
    Resource {
        uri: uri.to_string(),
        name: name.to_string(),
        description: None,
        mime_type: mime_type.to_string(),
    }
}

/// Register the documents, the template guide and one JSON resource per
/// template
pub fn register_resources(catalog: &mut Catalog) {
    for (name, uri, text) in DOCUMENTS {
        catalog.add_resource(resource(name, uri, MARKDOWN), *text);
    }

    catalog.add_resource(
        resource(
            "resource-templates",
            "minecraft://resource-templates",
            MARKDOWN,
        ),
        template_documentation(),
    );

    for template in all_templates() {
        let uri = template_uri(&template.name);
        let text = match serde_json::to_string_pretty(template) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping template {}: {}", template.name, e);
                continue;
            }
        };
        catalog.add_resource(
            resource(&template_resource_name(&template.name), &uri, JSON),
            text,
        );
        catalog.add_resource_template(ResourceTemplate {
            uri_template: uri,
            name: template.name.clone(),
            description: template.description.clone(),
            mime_type: JSON.to_string(),
        });
    }

    tracing::debug!("MCP resources registered");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::Template;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        register_resources(&mut catalog);
        catalog
    }

    #[test]
    fn test_resource_listing() {
        let catalog = catalog();
        let resources = catalog.resources();
        assert_eq!(resources.len(), 4 + 1 + all_templates().len());
        assert_eq!(resources[0].uri, "minecraft://commands");
        assert_eq!(resources[4].name, "resource-templates");
        assert_eq!(resources[5].name, "template-basic-house-foundation");
        assert_eq!(
            resources[5].uri,
            "minecraft://template/Basic%20House%20Foundation"
        );
        assert_eq!(catalog.resource_templates().len(), all_templates().len());
    }

    #[test]
    fn test_documents_are_markdown() {
        let catalog = catalog();
        for (_, uri, _) in DOCUMENTS {
            let contents = catalog.read(uri).unwrap();
            assert_eq!(contents.mime_type, "text/markdown");
            assert!(contents.text.starts_with("# "));
        }
    }

    #[test]
    fn test_template_resource_is_pretty_json() {
        let catalog = catalog();
        let contents = catalog.read("minecraft://template/Pond with Bridge").unwrap();
        assert_eq!(contents.mime_type, "application/json");
        assert!(contents.text.contains("\n  \"name\": \"Pond with Bridge\""));

        let template: Template = serde_json::from_str(&contents.text).unwrap();
        assert_eq!(template.materials.len(), 4);
    }
}
