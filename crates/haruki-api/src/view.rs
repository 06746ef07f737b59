//! Transport-neutral view model
//!
//! A `View` describes an edit of one chat message. `None` fields leave the
//! corresponding part of the message untouched, an empty list clears it.

use serde::{Deserialize, Serialize};

use crate::ComponentId;

pub const COLOR_RED: u32 = 0xff0000;
pub const COLOR_YELLOW: u32 = 0xf1c40f;

/// Maximum options a select control may carry
pub const MAX_SELECT_OPTIONS: usize = 25;

/// Maximum characters in a select option label
pub const MAX_LABEL_LEN: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Card>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<ActionRow>>,
}

impl View {
    /// A single card with the given controls; clears any text content
    pub fn screen(card: Card, rows: Vec<ActionRow>) -> Self {
        Self {
            content: Some(String::new()),
            cards: Some(vec![card]),
            rows: Some(rows),
        }
    }

    /// A single card with every control removed
    pub fn terminal(card: Card) -> Self {
        Self::screen(card, Vec::new())
    }

    /// Several cards and no controls
    pub fn stack(cards: Vec<Card>) -> Self {
        Self {
            content: Some(String::new()),
            cards: Some(cards),
            rows: Some(Vec::new()),
        }
    }

    /// Text only; cards and controls stay as they are
    pub fn notice(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            cards: None,
            rows: None,
        }
    }

    /// Text with every control removed
    pub fn closing_notice(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            cards: None,
            rows: Some(Vec::new()),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// True when the edit leaves no interactive controls behind
    pub fn clears_controls(&self) -> bool {
        matches!(&self.rows, Some(rows) if rows.is_empty())
    }

    pub fn first_card(&self) -> Option<&Card> {
        self.cards.as_ref().and_then(|cards| cards.first())
    }

    /// Iterate all controls across rows
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.rows.iter().flatten().flat_map(|row| row.controls.iter())
    }

    pub fn has_control(&self, id: ComponentId) -> bool {
        self.controls().any(|c| c.component_id() == id)
    }

    /// Options of the select control with the given id
    pub fn select_options(&self, id: ComponentId) -> Option<&[SelectOption]> {
        self.controls().find_map(|c| match c {
            Control::Select { component_id, options, .. } if *component_id == id => {
                Some(options.as_slice())
            }
            _ => None,
        })
    }
}

/// Embedded rich card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Card {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Replace a field's value, appending the field if it is missing
    pub fn upsert_field(&mut self, name: &str, value: impl Into<String>, inline: bool) {
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field {
                name: name.to_string(),
                value,
                inline,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRow {
    pub controls: Vec<Control>,
}

impl ActionRow {
    pub fn new(controls: Vec<Control>) -> Self {
        Self { controls }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Control {
    Select {
        component_id: ComponentId,
        placeholder: String,
        options: Vec<SelectOption>,
    },
    Button {
        component_id: ComponentId,
        label: String,
        style: ButtonStyle,
    },
}

impl Control {
    pub fn select(id: ComponentId, placeholder: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::Select {
            component_id: id,
            placeholder: placeholder.into(),
            options,
        }
    }

    pub fn button(id: ComponentId, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self::Button {
            component_id: id,
            label: label.into(),
            style,
        }
    }

    pub fn component_id(&self) -> ComponentId {
        match self {
            Self::Select { component_id, .. } | Self::Button { component_id, .. } => *component_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    /// Secondary line under the label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub default: bool,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
            default: false,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn selected(mut self, default: bool) -> Self {
        self.default = default;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

/// What a bridge should do in answer to an interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// Apply this edit to the interaction's message
    Render { view: View },
    /// Show a message to the caller only; no session exists
    Ephemeral { message: String },
    /// Acknowledge and change nothing
    Silent,
}

impl Reply {
    pub fn render(view: View) -> Self {
        Self::Render { view }
    }

    pub fn ephemeral(message: impl Into<String>) -> Self {
        Self::Ephemeral {
            message: message.into(),
        }
    }

    pub fn view(&self) -> Option<&View> {
        match self {
            Self::Render { view } => Some(view),
            _ => None,
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Silent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_view_clears_controls() {
        let view = View::terminal(Card::new("Aborted", "Request session aborted."));
        assert!(view.clears_controls());
        assert_eq!(view.first_card().unwrap().title, "Aborted");
    }

    #[test]
    fn stack_carries_every_card() {
        let view = View::stack(vec![Card::new("One", ""), Card::new("Two", "")]);
        assert!(view.clears_controls());
        assert_eq!(view.cards.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn notice_leaves_cards_and_controls_alone() {
        let view = View::notice("Search failed");
        assert!(view.cards.is_none());
        assert!(view.rows.is_none());
        assert!(!view.clears_controls());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("cards").is_none());
    }

    #[test]
    fn select_lookup() {
        let view = View::screen(
            Card::new("Select Media", "Page 1 of 1"),
            vec![
                ActionRow::new(vec![Control::select(
                    ComponentId::RemedySelectMedia,
                    "Select Media",
                    vec![SelectOption::new("Foo", "1")],
                )]),
                ActionRow::new(vec![Control::button(
                    ComponentId::RemedyAbort,
                    "Abort",
                    ButtonStyle::Danger,
                )]),
            ],
        );

        assert!(view.has_control(ComponentId::RemedyAbort));
        assert!(!view.has_control(ComponentId::RemedyMediaNext));
        assert_eq!(view.select_options(ComponentId::RemedySelectMedia).unwrap().len(), 1);
    }

    #[test]
    fn upsert_field_replaces_or_appends() {
        let mut card = Card::new("t", "d").field("Total Requests", "1", true);
        card.upsert_field("Total Requests", "4", true);
        card.upsert_field("Reported By", "bob", true);

        assert_eq!(card.field_value("Total Requests"), Some("4"));
        assert_eq!(card.fields.len(), 2);
    }

    #[test]
    fn reply_tagging() {
        let json = serde_json::to_value(Reply::ephemeral("nope")).unwrap();
        assert_eq!(json["kind"], "ephemeral");
        assert_eq!(json["message"], "nope");
    }
}
