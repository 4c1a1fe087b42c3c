//! Pre-built structure templates
//!
//! Each template is a command sequence relative to the caller's position,
//! served both as one markdown document and as individual JSON resources.

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::LazyLock;

/// A named command sequence that builds something
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub description: String,
    pub category: String,
    pub commands: Vec<String>,
    pub materials: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
}

fn template(
    name: &str,
    description: &str,
    category: &str,
    commands: &[&str],
    materials: &[&str],
    dimensions: Option<&str>,
    notes: &[&str],
) -> Template {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    Template {
        name: name.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        commands: owned(commands),
        materials: owned(materials),
        dimensions: dimensions.map(str::to_string),
        notes: (!notes.is_empty()).then(|| owned(notes)),
    }
}

static TEMPLATES: LazyLock<Vec<Template>> = LazyLock::new(|| {
    vec![
        // Buildings
        template(
            "Basic House Foundation",
            "Standard 15x15 stone foundation with reinforcement",
            "foundation",
            &[
                "/fill ~-7 ~-1 ~-7 ~7 ~-1 ~7 stone",
                "/fill ~-7 ~-2 ~-7 ~7 ~-2 ~7 cobblestone",
                "/fill ~-6 ~-1 ~-6 ~6 ~-1 ~6 stone_bricks",
            ],
            &["stone", "cobblestone", "stone_bricks"],
            Some("15x15x2"),
            &["Place on level ground", "Includes drainage layer"],
        ),
        template(
            "Medieval Castle Wall",
            "Stone brick defensive wall with battlements",
            "walls",
            &[
                "/fill ~0 ~0 ~0 ~20 ~8 ~2 stone_bricks",
                "/fill ~0 ~9 ~0 ~20 ~10 ~2 stone_brick_stairs[facing=south]",
                "/fill ~1 ~9 ~1 ~19 ~9 ~1 air",
            ],
            &["stone_bricks", "stone_brick_stairs"],
            Some("20x8x2"),
            &["Crenellated top", "Hollow interior for walkway"],
        ),
        template(
            "Modern Glass Tower",
            "Contemporary glass and steel structure",
            "modern",
            &[
                "/fill ~0 ~0 ~0 ~10 ~20 ~10 glass",
                "/fill ~0 ~0 ~0 ~0 ~20 ~10 iron_block",
                "/fill ~10 ~0 ~0 ~10 ~20 ~10 iron_block",
                "/fill ~0 ~0 ~0 ~10 ~20 ~0 iron_block",
                "/fill ~0 ~0 ~10 ~10 ~20 ~10 iron_block",
            ],
            &["glass", "iron_block"],
            Some("10x20x10"),
            &["Steel frame construction", "Floor every 4 blocks"],
        ),
        // Redstone
        template(
            "Simple Door Lock",
            "Basic combination lock for iron doors",
            "security",
            &[
                "/setblock ~0 ~0 ~0 iron_door[half=lower]",
                "/setblock ~0 ~1 ~0 iron_door[half=upper]",
                "/setblock ~-1 ~0 ~-1 lever[face=wall,facing=north]",
                "/setblock ~-1 ~0 ~0 redstone_wire",
            ],
            &["iron_door", "lever", "redstone_wire"],
            None,
            &[
                "Connect lever to door with redstone",
                "Add pressure plate for auto-close",
            ],
        ),
        template(
            "Automatic Farm",
            "Water-based crop harvesting system",
            "automation",
            &[
                "/fill ~0 ~0 ~0 ~8 ~0 ~8 farmland",
                "/fill ~1 ~1 ~1 ~7 ~1 ~7 water",
                "/setblock ~4 ~0 ~4 water",
                "/fill ~0 ~-1 ~0 ~8 ~-1 ~8 dirt",
            ],
            &["farmland", "water", "dirt", "seeds"],
            Some("9x9x2"),
            &["Central water source", "Plant crops in farmland"],
        ),
        // Landscape
        template(
            "Garden Path",
            "Decorative stone path with lighting",
            "decoration",
            &[
                "/fill ~0 ~0 ~0 ~2 ~0 ~20 stone_brick_slab[type=top]",
                "/fill ~-1 ~0 ~0 ~3 ~0 ~20 grass_path",
                "/setblock ~0 ~1 ~2 lantern[hanging=false]",
                "/setblock ~2 ~1 ~6 lantern[hanging=false]",
            ],
            &["stone_brick_slab", "grass_path", "lantern"],
            Some("4x1x20"),
            &["Alternating lantern placement", "Blend with natural terrain"],
        ),
        template(
            "Pond with Bridge",
            "Natural water feature with wooden bridge",
            "water",
            &[
                "/fill ~0 ~-2 ~0 ~8 ~-1 ~8 water",
                "/fill ~-1 ~-2 ~-1 ~9 ~-3 ~9 dirt",
                "/fill ~3 ~0 ~-1 ~5 ~0 ~9 oak_planks",
                "/fill ~3 ~1 ~0 ~5 ~2 ~0 oak_fence",
            ],
            &["water", "dirt", "oak_planks", "oak_fence"],
            Some("10x3x10"),
            &["Natural shoreline shape", "Add lily pads for detail"],
        ),
    ]
});

pub fn all_templates() -> &'static [Template] {
    &TEMPLATES
}

/// Case-insensitive lookup by name, optionally within a category
pub fn get_template(name: &str, category: Option<&str>) -> Option<&'static Template> {
    all_templates().iter().find(|t| {
        t.name.to_lowercase() == name.to_lowercase()
            && category.is_none_or(|c| t.category == c)
    })
}

pub fn templates_by_category(category: &str) -> Vec<&'static Template> {
    all_templates()
        .iter()
        .filter(|t| t.category == category)
        .collect()
}

/// Categories in first-seen order
pub fn template_categories() -> Vec<&'static str> {
    let mut categories: Vec<&'static str> = Vec::new();
    for t in all_templates() {
        if !categories.contains(&t.category.as_str()) {
            categories.push(&t.category);
        }
    }
    categories
}

/// Templates whose name, description, category or materials mention `keyword`
pub fn search_templates(keyword: &str) -> Vec<&'static Template> {
    let term = keyword.to_lowercase();
    all_templates()
        .iter()
        .filter(|t| {
            t.name.to_lowercase().contains(&term)
                || t.description.to_lowercase().contains(&term)
                || t.category.to_lowercase().contains(&term)
                || t.materials.iter().any(|m| m.to_lowercase().contains(&term))
        })
        .collect()
}

/// The template as a commented command script
pub fn export_commands(name: &str) -> Option<Vec<String>> {
    let t = get_template(name, None)?;
    let mut lines = vec![format!("# {} - {}", t.name, t.description)];
    lines.extend(t.commands.iter().cloned());
    lines.push(format!("# Materials needed: {}", t.materials.join(", ")));
    if let Some(notes) = &t.notes {
        lines.extend(notes.iter().map(|n| format!("# Note: {}", n)));
    }
    Some(lines)
}

/// Structural problems with a template; empty when valid
pub fn validate_template(template: &Template) -> Vec<String> {
    let mut errors = Vec::new();
    if template.name.trim().is_empty() {
        errors.push("Template name is required".to_string());
    }
    if template.description.trim().is_empty() {
        errors.push("Template description is required".to_string());
    }
    if template.category.trim().is_empty() {
        errors.push("Template category is required".to_string());
    }
    if template.commands.is_empty() {
        errors.push("Template must have at least one command".to_string());
    }
    if template.materials.is_empty() {
        errors.push("Template must specify required materials".to_string());
    }
    for (i, command) in template.commands.iter().enumerate() {
        if !command.starts_with('/') {
            errors.push(format!("Command {} should start with /", i + 1));
        }
    }
    errors
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_template_doc(doc: &mut String, t: &Template) {
    // Writing to a String cannot fail
    let _ = writeln!(doc, "### {}", t.name);
    let _ = write!(doc, "**Description:** {}\n\n", t.description);
    if let Some(dimensions) = &t.dimensions {
        let _ = write!(doc, "**Dimensions:** {}\n\n", dimensions);
    }
    doc.push_str("**Commands:**\n```\n");
    for command in &t.commands {
        let _ = writeln!(doc, "{}", command);
    }
    doc.push_str("```\n\n");
    let _ = write!(doc, "**Required Materials:** {}\n\n", t.materials.join(", "));
    if let Some(notes) = t.notes.as_ref().filter(|n| !n.is_empty()) {
        doc.push_str("**Notes:**\n");
        for note in notes {
            let _ = writeln!(doc, "- {}", note);
        }
        doc.push('\n');
    }
    doc.push_str("---\n\n");
}

/// Markdown document of every template, grouped by category
pub fn template_documentation() -> String {
    let mut doc = String::from("# Minecraft Resource Templates\n\n");
    doc.push_str(
        "This document contains pre-built templates for common Minecraft structures and contraptions.\n\n",
    );
    for category in template_categories() {
        let _ = write!(doc, "## {} Templates\n\n", capitalize(category));
        for t in templates_by_category(category) {
            write_template_doc(&mut doc, t);
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_are_valid() {
        assert_eq!(all_templates().len(), 7);
        for t in all_templates() {
            assert!(validate_template(t).is_empty(), "{} is invalid", t.name);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let t = get_template("garden path", None).unwrap();
        assert_eq!(t.category, "decoration");
        assert!(get_template("Garden Path", Some("water")).is_none());
        assert!(get_template("Garden Path", Some("decoration")).is_some());
    }

    #[test]
    fn test_categories_keep_first_seen_order() {
        assert_eq!(
            template_categories(),
            vec![
                "foundation",
                "walls",
                "modern",
                "security",
                "automation",
                "decoration",
                "water"
            ]
        );
    }

    #[test]
    fn test_search_matches_materials() {
        let names: Vec<_> = search_templates("OAK")
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["Pond with Bridge"]);
        assert_eq!(search_templates("water").len(), 2);
    }

    #[test]
    fn test_export_commands() {
        let lines = export_commands("Simple Door Lock").unwrap();
        assert_eq!(lines[0], "# Simple Door Lock - Basic combination lock for iron doors");
        assert_eq!(lines[5], "# Materials needed: iron_door, lever, redstone_wire");
        assert_eq!(lines[6], "# Note: Connect lever to door with redstone");
        assert!(export_commands("Skyscraper").is_none());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let broken = Template {
            name: " ".into(),
            description: String::new(),
            category: "misc".into(),
            commands: vec!["fill ~ ~ ~ ~1 ~1 ~1 stone".into()],
            materials: vec![],
            dimensions: None,
            notes: None,
        };
        assert_eq!(
            validate_template(&broken),
            vec![
                "Template name is required",
                "Template description is required",
                "Template must specify required materials",
                "Command 1 should start with /",
            ]
        );
    }

    #[test]
    fn test_documentation_layout() {
        let doc = template_documentation();
        assert!(doc.starts_with("# Minecraft Resource Templates\n\n"));
        assert!(doc.contains("## Foundation Templates\n\n### Basic House Foundation\n"));
        // No dimensions line for the door lock
        assert!(doc.contains(
            "### Simple Door Lock\n**Description:** Basic combination lock for iron doors\n\n**Commands:**"
        ));
        assert!(doc.ends_with("---\n\n"));
    }

    #[test]
    fn test_json_omits_missing_dimensions() {
        let json = serde_json::to_value(get_template("Simple Door Lock", None).unwrap()).unwrap();
        assert!(json.get("dimensions").is_none());
        assert_eq!(json["notes"].as_array().unwrap().len(), 2);
    }
}
