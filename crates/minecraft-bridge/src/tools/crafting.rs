use crate::bot::BotProvider;
use crate::recipes::{Recipe, all_recipes, recipes_for};
use minecraft_mcp_core::ToolResponse;
use minecraft_mcp_server::Dispatcher;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListRecipes {
    #[serde(default)]
    output_item: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipeQuery {
    item_name: String,
}

fn item_name_schema(description: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "itemName": { "type": "string", "description": description }
        },
        "required": ["itemName"]
    })
}

pub(super) fn register(dispatcher: &mut Dispatcher, bots: &Arc<dyn BotProvider>) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "list-recipes",
        "List all available crafting recipes the bot can make with current inventory",
        json!({
            "type": "object",
            "properties": {
                "outputItem": {
                    "type": "string",
                    "description": "Optional: filter recipes by output item name"
                }
            }
        }),
        move |p: ListRecipes| {
            let provider = provider.clone();
            async move {
                let inventory = provider.bot()?.inventory().await?;
                let candidates: Vec<&Recipe> = match &p.output_item {
                    Some(filter) => recipes_for(filter),
                    None => all_recipes().iter().collect(),
                };
                let craftable: Vec<_> = candidates
                    .into_iter()
                    .filter(|r| r.craftable_from(&inventory))
                    .collect();

                if craftable.is_empty() {
                    let scope = p
                        .output_item
                        .map(|filter| format!(" for {}", filter))
                        .unwrap_or_default();
                    return Ok(ToolResponse::text(format!(
                        "No craftable recipes found{} with current inventory",
                        scope
                    )));
                }

                let mut output = format!("Found {} craftable recipe(s):\n\n", craftable.len());
                for (index, recipe) in craftable.iter().enumerate() {
                    let _ = writeln!(output, "{}. {} (x{})", index + 1, recipe.output, recipe.count);
                    let _ = writeln!(output, "   Ingredients: {}\n", recipe.ingredient_list());
                }
                Ok(ToolResponse::text(output))
            }
        },
    );

    dispatcher.register_typed(
        "get-recipe",
        "Get detailed information about a specific recipe",
        item_name_schema("Name of the item to get recipe for"),
        move |p: RecipeQuery| async move {
            let matching = recipes_for(&p.item_name);
            if matching.is_empty() {
                return Ok(ToolResponse::text(format!(
                    "No recipes found for {}",
                    p.item_name
                )));
            }

            let mut output = format!("Recipe(s) for {}:\n\n", p.item_name);
            for (index, recipe) in matching.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "{}. Output: {} (x{})",
                    index + 1,
                    recipe.output,
                    recipe.count
                );
                output.push_str("   Ingredients:\n");
                for (name, count) in recipe.ingredients {
                    let _ = writeln!(output, "   - {} x{}", name, count);
                }
                output.push('\n');
            }
            Ok(ToolResponse::text(output))
        },
    );

    let provider = bots.clone();
    dispatcher.register_typed(
        "can-craft",
        "Check if the bot can craft a specific item with current inventory",
        item_name_schema("Name of the item to check"),
        move |p: RecipeQuery| {
            let provider = provider.clone();
            async move {
                let Some(recipe) = recipes_for(&p.item_name).into_iter().next() else {
                    return Ok(ToolResponse::text(format!(
                        "No recipe found for {}",
                        p.item_name
                    )));
                };

                let inventory = provider.bot()?.inventory().await?;
                let missing = recipe.missing(&inventory);
                if missing.is_empty() {
                    return Ok(ToolResponse::text(format!(
                        "Yes, can craft {}. Have all required ingredients.",
                        recipe.output
                    )));
                }

                let mut output = format!("Cannot craft {}. Missing:\n", recipe.output);
                for (name, count) in missing {
                    let _ = writeln!(output, "- {} x{}", name, count);
                }
                Ok(ToolResponse::text(output))
            }
        },
    );
}
