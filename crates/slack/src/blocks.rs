use serde::Serialize;

use skillbot_core::routing::{BuiltinRegistry, CallbackToken, InteractionHandler, RouteResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Context { block_id: String, elements: Vec<TextObject> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    /// Actions block whose `block_id` carries `token`, so clicks route back to its target.
    pub fn callback_actions<F>(self, token: &CallbackToken, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        self.actions(token.encode(), build)
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub fn help_message(builtins: &BuiltinRegistry) -> MessageTemplate {
    let lines = builtins
        .list()
        .iter()
        .map(|skill| format!("• `{}` {}", skill.name(), skill.usage()))
        .collect::<Vec<_>>()
        .join("\n");

    MessageBuilder::new("Skillbot help")
        .section("skillbot.help.summary.v1", |section| {
            section.mrkdwn(format!("*Built-in skills*\n{lines}"));
        })
        .build()
}

/// Reply for a directed message whose skill name did not resolve.
pub fn unmatched_skill_message(result: &RouteResult) -> MessageTemplate {
    let summary = if result.skill_name.is_empty() {
        "I didn't catch a skill name.".to_owned()
    } else {
        format!("I don't know a skill named `{}`.", result.skill_name)
    };

    MessageBuilder::new(summary.clone())
        .section("skillbot.unmatched.summary.v1", |section| {
            section.mrkdwn(summary);
        })
        .callback_actions(&CallbackToken::for_skill("help"), |actions| {
            actions.button(ButtonElement::new("skillbot.help.v1", "Show Help"));
        })
        .build()
}

/// Confirm/cancel prompt whose buttons route back to `handler`.
pub fn confirmation_message(
    handler: &dyn InteractionHandler,
    prompt: &str,
    context: Option<&str>,
) -> MessageTemplate {
    let token = match context {
        Some(context) => handler.callback_token().with_context(context),
        None => handler.callback_token(),
    };

    MessageBuilder::new(prompt.to_owned())
        .section("skillbot.confirm.prompt.v1", |section| {
            section.mrkdwn(prompt);
        })
        .callback_actions(&token, |actions| {
            actions
                .button(
                    ButtonElement::new("skillbot.confirm.v1", "Confirm")
                        .style(ButtonStyle::Primary)
                        .value("confirm"),
                )
                .button(
                    ButtonElement::new("skillbot.cancel.v1", "Cancel")
                        .style(ButtonStyle::Danger)
                        .value("cancel"),
                );
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("skillbot.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("skillbot.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}
