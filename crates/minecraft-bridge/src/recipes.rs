//! Crafting recipes for common items
//!
//! The server console cannot be asked for recipes, so a fixed table of the
//! everyday vanilla ones is carried here instead.

use crate::bot::ItemStack;

/// One crafting recipe with its ingredients totalled per item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipe {
    pub output: &'static str,
    pub count: u32,
    pub ingredients: &'static [(&'static str, u32)],
}

const fn recipe(
    output: &'static str,
    count: u32,
    ingredients: &'static [(&'static str, u32)],
) -> Recipe {
    Recipe {
        output,
        count,
        ingredients,
    }
}

static RECIPES: &[Recipe] = &[
    // Wood
    recipe("oak_planks", 4, &[("oak_log", 1)]),
    recipe("spruce_planks", 4, &[("spruce_log", 1)]),
    recipe("birch_planks", 4, &[("birch_log", 1)]),
    recipe("stick", 4, &[("oak_planks", 2)]),
    recipe("crafting_table", 1, &[("oak_planks", 4)]),
    recipe("chest", 1, &[("oak_planks", 8)]),
    recipe("oak_door", 3, &[("oak_planks", 6)]),
    recipe("oak_fence", 3, &[("oak_planks", 4), ("stick", 2)]),
    recipe("ladder", 3, &[("stick", 7)]),
    recipe("bowl", 4, &[("oak_planks", 3)]),
    // Tools
    recipe("wooden_pickaxe", 1, &[("oak_planks", 3), ("stick", 2)]),
    recipe("wooden_axe", 1, &[("oak_planks", 3), ("stick", 2)]),
    recipe("wooden_shovel", 1, &[("oak_planks", 1), ("stick", 2)]),
    recipe("wooden_sword", 1, &[("oak_planks", 2), ("stick", 1)]),
    recipe("stone_pickaxe", 1, &[("cobblestone", 3), ("stick", 2)]),
    recipe("stone_axe", 1, &[("cobblestone", 3), ("stick", 2)]),
    recipe("stone_shovel", 1, &[("cobblestone", 1), ("stick", 2)]),
    recipe("stone_sword", 1, &[("cobblestone", 2), ("stick", 1)]),
    recipe("iron_pickaxe", 1, &[("iron_ingot", 3), ("stick", 2)]),
    recipe("iron_axe", 1, &[("iron_ingot", 3), ("stick", 2)]),
    recipe("iron_shovel", 1, &[("iron_ingot", 1), ("stick", 2)]),
    recipe("iron_sword", 1, &[("iron_ingot", 2), ("stick", 1)]),
    recipe("diamond_pickaxe", 1, &[("diamond", 3), ("stick", 2)]),
    recipe("diamond_sword", 1, &[("diamond", 2), ("stick", 1)]),
    recipe("shears", 1, &[("iron_ingot", 2)]),
    recipe("bucket", 1, &[("iron_ingot", 3)]),
    // Armor
    recipe("iron_helmet", 1, &[("iron_ingot", 5)]),
    recipe("iron_chestplate", 1, &[("iron_ingot", 8)]),
    recipe("iron_leggings", 1, &[("iron_ingot", 7)]),
    recipe("iron_boots", 1, &[("iron_ingot", 4)]),
    // Utility
    recipe("furnace", 1, &[("cobblestone", 8)]),
    recipe("torch", 4, &[("coal", 1), ("stick", 1)]),
    recipe("stone_bricks", 4, &[("stone", 4)]),
    recipe("iron_block", 1, &[("iron_ingot", 9)]),
    recipe("iron_ingot", 9, &[("iron_block", 1)]),
    recipe("bread", 1, &[("wheat", 3)]),
];

/// Every recipe in the table
pub fn all_recipes() -> &'static [Recipe] {
    RECIPES
}

/// Recipes whose output contains `pattern`, ignoring case
pub fn recipes_for(pattern: &str) -> Vec<&'static Recipe> {
    let pattern = pattern.to_lowercase();
    RECIPES
        .iter()
        .filter(|r| r.output.contains(&pattern))
        .collect()
}

impl Recipe {
    /// Ingredients short in `inventory`, with how many more are needed
    ///
    /// Stacks of the same item in different slots count together.
    pub fn missing(&self, inventory: &[ItemStack]) -> Vec<(&'static str, u32)> {
        self.ingredients
            .iter()
            .filter_map(|&(name, needed)| {
                let have: u32 = inventory
                    .iter()
                    .filter(|stack| stack.name == name)
                    .map(|stack| stack.count)
                    .sum();
                (have < needed).then_some((name, needed - have))
            })
            .collect()
    }

    pub fn craftable_from(&self, inventory: &[ItemStack]) -> bool {
        self.missing(inventory).is_empty()
    }

    /// `name xN, name xN`
    pub fn ingredient_list(&self) -> String {
        self.ingredients
            .iter()
            .map(|(name, count)| format!("{} x{}", name, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
