//! Scraping values out of command feedback
//!
//! Vanilla commands answer RCON with human-readable text, with NBT printed as
//! SNBT (`{Slot: 0b, id: "minecraft:dirt", count: 64}`).

use crate::bot::{EntityInfo, ItemStack};
use minecraft_mcp_core::Vec3;
use regex_lite::Regex;
use std::sync::LazyLock;

static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ANSI_RE should compile"));
static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"§.").expect("SECTION_RE should compile"));
static POS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(-?[0-9.]+(?:E-?[0-9]+)?)d, (-?[0-9.]+(?:E-?[0-9]+)?)d, (-?[0-9.]+(?:E-?[0-9]+)?)d\]")
        .expect("POS_RE should compile")
});
static INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data: (-?[0-9]+)[bsL]?\s*$").expect("INT_RE should compile"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?) has the following entity data: ").expect("ENTITY_RE should compile")
});
static SLOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Slot:\s*(-?[0-9]+)b").expect("SLOT_RE should compile"));
static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"id:\s*"(?:minecraft:)?([^"]+)""#).expect("ID_RE should compile")
});
static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[Cc]ount:\s*([0-9]+)").expect("COUNT_RE should compile"));

/// Remove ANSI escapes and `§` formatting codes
pub fn strip_formatting(text: &str) -> String {
    let text = ANSI_RE.replace_all(text, "");
    SECTION_RE.replace_all(&text, "").trim().to_string()
}

/// Names from `list` output
pub fn parse_player_list(reply: &str) -> Vec<String> {
    reply
        .split_once(':')
        .map(|(_, names)| {
            names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A `[x d, y d, z d]` position list
pub fn parse_position(reply: &str) -> Option<Vec3> {
    let caps = POS_RE.captures(reply)?;
    let coord = |i: usize| caps.get(i)?.as_str().parse::<f64>().ok();
    Some(Vec3::new(coord(1)?, coord(2)?, coord(3)?))
}

/// A single numeric tag such as `playerGameType`
pub fn parse_int(reply: &str) -> Option<i64> {
    INT_RE.captures(reply.trim())?.get(1)?.as_str().parse().ok()
}

/// Display name and position of an entity's `Pos` query
pub fn parse_entity(reply: &str) -> Option<EntityInfo> {
    let name = ENTITY_RE.captures(reply)?.get(1)?.as_str().to_string();
    Some(EntityInfo {
        name,
        position: parse_position(reply)?,
    })
}

/// Item stacks of an `Inventory`/`Items` list or a single item compound
pub fn parse_items(reply: &str) -> Vec<ItemStack> {
    let Some((_, data)) = reply.split_once("data: ") else {
        return Vec::new();
    };
    let data = data.trim();
    let list = if data.starts_with('{') {
        format!("[{}]", data)
    } else {
        data.to_string()
    };

    top_level_compounds(&list)
        .iter()
        .filter_map(|compound| {
            let name = ID_RE.captures(compound)?.get(1)?.as_str().to_string();
            let slot = SLOT_RE
                .captures(compound)
                .and_then(|c| c.get(1)?.as_str().parse().ok())
                .unwrap_or(0);
            let count = COUNT_RE
                .captures(compound)
                .and_then(|c| c.get(1)?.as_str().parse().ok())
                .unwrap_or(1);
            Some(ItemStack { slot, name, count })
        })
        .collect()
}

/// Text of each compound directly inside the outer list, with anything
/// nested deeper (components, enchantment lists) left out
fn top_level_compounds(list: &str) -> Vec<String> {
    let mut compounds = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in list.chars() {
        if let Some(q) = quote {
            if depth == 2 {
                current.push(c);
            }
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                if depth == 2 {
                    current.push(c);
                }
            }
            '{' | '[' => {
                depth += 1;
            }
            '}' | ']' => {
                if depth == 2 && c == '}' {
                    compounds.push(std::mem::take(&mut current));
                }
                depth = depth.saturating_sub(1);
            }
            _ if depth == 2 => current.push(c),
            _ => {}
        }
    }

    compounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_formatting() {
        assert_eq!(
            strip_formatting("\u{1b}[0;32mSet the time to 1000\u{1b}[0m\n"),
            "Set the time to 1000"
        );
        assert_eq!(strip_formatting("§cUnknown command§r"), "Unknown command");
    }

    #[test]
    fn test_player_list() {
        assert_eq!(
            parse_player_list("There are 2 of a max of 20 players online: LLMBot, Steve"),
            vec!["LLMBot", "Steve"]
        );
        assert!(parse_player_list("There are 0 of a max of 20 players online: ").is_empty());
    }

    #[test]
    fn test_position_and_game_type() {
        let pos = parse_position("LLMBot has the following entity data: [12.5d, 64.0d, -3.25d]")
            .unwrap();
        assert_eq!(pos, Vec3::new(12.5, 64.0, -3.25));

        assert_eq!(parse_int("LLMBot has the following entity data: 1"), Some(1));
        assert_eq!(parse_int("No entity was found"), None);
    }

    #[test]
    fn test_entity_reply() {
        let entity =
            parse_entity("Zombie has the following entity data: [3.5d, 63.0d, 1.2E-4d]").unwrap();
        assert_eq!(entity.name, "Zombie");
        assert_eq!(entity.position.block().x, 3);
        assert!(parse_entity("No entity was found").is_none());
    }

    #[test]
    fn test_inventory_skips_nested_items() {
        let reply = concat!(
            "LLMBot has the following entity data: [",
            r#"{count: 64, Slot: 0b, id: "minecraft:dirt"}, "#,
            r#"{Slot: 1b, id: "minecraft:diamond_sword", count: 1, components: {"minecraft:damage": 5}}, "#,
            r#"{Slot: 9b, id: "minecraft:shulker_box", count: 1, components: {"minecraft:container": [{slot: 0, item: {id: "minecraft:stone", count: 3}}]}}, "#,
            r#"{Slot: -106b, id: "minecraft:shield", count: 1, components: {"minecraft:custom_name": '{"text":"Big}{"}'}}"#,
            "]"
        );

        let items = parse_items(reply);
        assert_eq!(
            items,
            vec![
                ItemStack { slot: 0, name: "dirt".into(), count: 64 },
                ItemStack { slot: 1, name: "diamond_sword".into(), count: 1 },
                ItemStack { slot: 9, name: "shulker_box".into(), count: 1 },
                ItemStack { slot: -106, name: "shield".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_single_item_and_empty_lists() {
        let held = parse_items(r#"LLMBot has the following entity data: {count: 12, id: "minecraft:oak_planks"}"#);
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].name, "oak_planks");
        assert_eq!(held[0].count, 12);

        assert!(parse_items("LLMBot has the following entity data: []").is_empty());
        assert!(parse_items("Found no elements matching SelectedItem").is_empty());
    }
}
