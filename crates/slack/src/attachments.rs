use serde::Serialize;

pub const BRAND_COLOR: &str = "#ff8700";
pub const ERROR_COLOR: &str = "#ff0000";
pub const FOOTER: &str = "Powered by <https://t3extensions.org|t3extensions.org>";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Visible only to the user who ran the command.
    Ephemeral,
    InChannel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub value: String,
    pub short: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
    pub color: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    pub footer: String,
}

/// Body of a slash-command response using Slack's legacy attachment schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlackMessage {
    pub response_type: ResponseType,
    pub attachments: Vec<Attachment>,
}

impl SlackMessage {
    pub fn new(response_type: ResponseType, attachment: Attachment) -> Self {
        Self { response_type, attachments: vec![attachment] }
    }

    pub fn is_ephemeral(&self) -> bool {
        self.response_type == ResponseType::Ephemeral
    }

    pub fn field(&self, title: &str) -> Option<&Field> {
        self.attachments
            .iter()
            .flat_map(|attachment| attachment.fields.iter())
            .find(|field| field.title.as_deref() == Some(title))
    }
}

pub struct AttachmentBuilder {
    attachment: Attachment,
}

impl AttachmentBuilder {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            attachment: Attachment {
                title: None,
                pretext: None,
                text: None,
                fallback: None,
                mrkdwn_in: Vec::new(),
                color: color.into(),
                fields: Vec::new(),
                thumb_url: None,
                footer: FOOTER.to_owned(),
            },
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.attachment.title = Some(title.into());
        self
    }

    pub fn fallback(mut self, fallback: impl Into<String>) -> Self {
        self.attachment.fallback = Some(fallback.into());
        self
    }

    /// Sets `text` and marks it for mrkdwn rendering.
    pub fn markdown_text(mut self, text: impl Into<String>) -> Self {
        self.attachment.text = Some(text.into());
        if !self.attachment.mrkdwn_in.iter().any(|field| field == "text") {
            self.attachment.mrkdwn_in.push("text".to_owned());
        }
        self
    }

    pub fn thumb_url(mut self, url: impl Into<String>) -> Self {
        self.attachment.thumb_url = Some(url.into());
        self
    }

    pub fn short_field(self, title: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_field(Some(title.into()), value.into(), true)
    }

    pub fn long_field(self, title: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_field(Some(title.into()), value.into(), false)
    }

    pub fn untitled_field(self, value: impl Into<String>) -> Self {
        self.push_field(None, value.into(), false)
    }

    /// Applies `build` only when `value` is present.
    pub fn maybe<T, F>(self, value: Option<T>, build: F) -> Self
    where
        F: FnOnce(Self, T) -> Self,
    {
        match value {
            Some(value) => build(self, value),
            None => self,
        }
    }

    pub fn build(self) -> Attachment {
        self.attachment
    }

    fn push_field(mut self, title: Option<String>, value: String, short: bool) -> Self {
        self.attachment.fields.push(Field { title, value, short });
        self
    }
}
