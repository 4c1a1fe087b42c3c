//! Guided conversations served as MCP prompts
//!
//! Each prompt is a user question followed by an assistant answer that
//! seeds the conversation.

use minecraft_mcp_server::Catalog;
use minecraft_mcp_server::mcp::{Prompt, PromptMessage, Role};

struct Script {
    name: &'static str,
    description: &'static str,
    question: &'static str,
    answer: &'static str,
}

const SCRIPTS: &[Script] = &[
    Script {
        name: "build-house",
        description: "Guide for building a complete house in Minecraft",
        question: "I want to build a house in Minecraft. Can you help me create a step-by-step plan?",
        answer: include_str!("../docs/prompts/build-house.md"),
    },
    Script {
        name: "terraform-landscape",
        description: "Guide for terraforming and landscape modification",
        question: "How can I modify the landscape around my build to make it look more natural?",
        answer: include_str!("../docs/prompts/terraform-landscape.md"),
    },
    Script {
        name: "redstone-automation",
        description: "Guide for creating redstone contraptions and automation",
        question: "I want to learn about redstone automation. Can you teach me some basic contraptions?",
        answer: include_str!("../docs/prompts/redstone-automation.md"),
    },
    Script {
        name: "command-optimization",
        description: "Guide for efficient use of Minecraft commands",
        question: "What are the best practices for using Minecraft commands efficiently?",
        answer: include_str!("../docs/prompts/command-optimization.md"),
    },
    Script {
        name: "debug-issues",
        description: "Guide for troubleshooting common Minecraft server issues",
        question: "My Minecraft commands are not working as expected. How can I debug what's wrong?",
        answer: include_str!("../docs/prompts/debug-issues.md"),
    },
    Script {
        name: "creative-projects",
        description: "Ideas and guidance for creative Minecraft building projects",
        question: "I'm looking for creative building project ideas. What are some interesting things to build?",
        answer: include_str!("../docs/prompts/creative-projects.md"),
    },
];

pub fn register_prompts(catalog: &mut Catalog) {
    for script in SCRIPTS {
        catalog.add_prompt(
            Prompt {
                name: script.name.to_string(),
                description: script.description.to_string(),
            },
            vec![
                PromptMessage::text(Role::User, script.question),
                PromptMessage::text(Role::Assistant, script.answer.trim()),
            ],
        );
    }
    tracing::debug!("MCP prompts registered");
}

#[cfg(test)]
mod tests {
    use super::*;
    use minecraft_mcp_core::Content;

    #[test]
    fn test_prompts_are_question_and_answer() {
        let mut catalog = Catalog::new();
        register_prompts(&mut catalog);
        assert_eq!(catalog.prompts().len(), 6);

        let prompt = catalog.prompt("debug-issues").unwrap();
        assert_eq!(
            prompt.description,
            "Guide for troubleshooting common Minecraft server issues"
        );
        assert_eq!(prompt.messages.len(), 2);
        assert_eq!(prompt.messages[0].role, Role::User);
        assert_eq!(prompt.messages[1].role, Role::Assistant);

        let Content::Text { text } = &prompt.messages[1].content;
        assert!(!text.ends_with('\n'));
        assert!(catalog.prompt("build-castle").is_none());
    }
}
