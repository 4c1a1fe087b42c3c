//! Static resources and prompts served alongside the tools

use crate::mcp::{
    GetPromptResult, Prompt, PromptMessage, Resource, ResourceContents, ResourceTemplate,
};

struct StaticResource {
    meta: Resource,
    text: String,
}

struct StaticPrompt {
    meta: Prompt,
    messages: Vec<PromptMessage>,
}

/// Read-only documents and prompt scripts
#[derive(Default)]
pub struct Catalog {
    resources: Vec<StaticResource>,
    templates: Vec<ResourceTemplate>,
    prompts: Vec<StaticPrompt>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&mut self, meta: Resource, text: impl Into<String>) {
        self.resources.push(StaticResource {
            meta,
            text: text.into(),
        });
    }

    pub fn add_resource_template(&mut self, template: ResourceTemplate) {
        self.templates.push(template);
    }

    pub fn add_prompt(&mut self, meta: Prompt, messages: Vec<PromptMessage>) {
        self.prompts.push(StaticPrompt { meta, messages });
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.resources.iter().map(|r| r.meta.clone()).collect()
    }

    pub fn resource_templates(&self) -> Vec<ResourceTemplate> {
        self.templates.clone()
    }

    /// Contents of `uri`; a percent-encoded and a plain URI both match
    pub fn read(&self, uri: &str) -> Option<ResourceContents> {
        let decoded = urlencoding::decode(uri).ok();
        self.resources
            .iter()
            .find(|r| {
                r.meta.uri == uri
                    || urlencoding::decode(&r.meta.uri).ok().as_deref() == decoded.as_deref()
            })
            .map(|r| ResourceContents {
                uri: r.meta.uri.clone(),
                mime_type: r.meta.mime_type.clone(),
                text: r.text.clone(),
            })
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.iter().map(|p| p.meta.clone()).collect()
    }

    pub fn prompt(&self, name: &str) -> Option<GetPromptResult> {
        self.prompts
            .iter()
            .find(|p| p.meta.name == name)
            .map(|p| GetPromptResult {
                description: p.meta.description.clone(),
                messages: p.messages.clone(),
            })
    }
}
