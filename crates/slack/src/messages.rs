use chrono::{DateTime, Utc};

use t3ext_core::domain::extension::{ExtensionKey, ExtensionRecord};

use crate::attachments::{AttachmentBuilder, ResponseType, SlackMessage, BRAND_COLOR, ERROR_COLOR};
use crate::format;

pub const ERROR_HEADLINE: &str = "*Oops, an error occurred.* :dizzy_face:";

/// Caller-only failure message carrying one user-facing sentence.
pub fn error_message(message: &str) -> SlackMessage {
    SlackMessage::new(
        ResponseType::Ephemeral,
        AttachmentBuilder::new(ERROR_COLOR).markdown_text(ERROR_HEADLINE).untitled_field(message).build(),
    )
}

/// Channel-wide details card for a found extension.
pub fn extension_details(
    record: &ExtensionRecord,
    key: &ExtensionKey,
    details_base_url: &str,
    now: DateTime<Utc>,
) -> SlackMessage {
    let title = or_unavailable(&record.title);
    let version = or_unavailable(&record.version);
    let downloads = Some(format::downloads(&record.downloads)).filter(|links| !links.is_empty());
    let compatibility = Some(format::compatibility(&record.compatibility))
        .filter(|summary| !summary.is_empty())
        .map(|summary| format!("TYPO3 {summary}"));
    let description =
        Some(format::collapse_whitespace(&record.description)).filter(|text| !text.is_empty());
    let author = record.author.as_ref().filter(|author| !author.name.trim().is_empty());

    let attachment = AttachmentBuilder::new(BRAND_COLOR)
        .title(format!("{title} :black_small_square: EXT:{key}"))
        .fallback(title)
        .maybe(author, |builder, author| builder.markdown_text(format!("Author(s): {}", author.name)))
        .maybe(author.and_then(|author| author.valid_email()), |builder, email| {
            builder.thumb_url(format::gravatar_url(email))
        })
        .short_field("Latest version", version)
        .short_field("Last update", format::last_update(record.last_updated, now))
        .maybe(downloads, |builder, links| builder.short_field("Download", links))
        .maybe(record.repository_url.as_deref(), |builder, url| {
            builder.short_field("Code Insight", format::repository_link(url))
        })
        .maybe(compatibility, |builder, summary| builder.short_field("Compatibility", summary))
        .short_field("Further details", further_details_link(details_base_url, key))
        .maybe(description, |builder, text| builder.long_field("Description", text))
        .build();

    SlackMessage::new(ResponseType::InChannel, attachment)
}

fn or_unavailable(value: &str) -> &str {
    if value.trim().is_empty() {
        "n/a"
    } else {
        value
    }
}

fn further_details_link(base_url: &str, key: &ExtensionKey) -> String {
    format!("<{}/{key}|TYPO3 Extension Repository>", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use t3ext_core::domain::extension::{Author, DownloadLinks, ExtensionKey, ExtensionRecord};

    use super::{error_message, extension_details, ERROR_HEADLINE};

    const BASE: &str = "https://extensions.typo3.org/extension/";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).single().expect("valid instant")
    }

    fn titles(message: &super::SlackMessage) -> Vec<String> {
        message.attachments[0].fields.iter().filter_map(|field| field.title.clone()).collect()
    }

    #[test]
    fn full_record_renders_every_field_in_order() {
        let key = ExtensionKey::normalize("news").expect("key");
        let record = ExtensionRecord {
            key: "news".to_owned(),
            title: "News system".to_owned(),
            version: "12.1.0".to_owned(),
            author: Some(Author {
                name: "Georg Ringer".to_owned(),
                email: Some("mail@ringer.it".to_owned()),
            }),
            last_updated: Some(now().timestamp() - 3 * 86_400),
            description: "Versatile\n   news system".to_owned(),
            compatibility: vec!["11".to_owned(), "12".to_owned()],
            downloads: DownloadLinks { zip: Some("https://ter/news.zip".to_owned()), ..DownloadLinks::default() },
            repository_url: Some("https://github.com/georgringer/news".to_owned()),
        };

        let message = extension_details(&record, &key, BASE, now());
        let attachment = &message.attachments[0];

        assert!(!message.is_ephemeral());
        assert_eq!(attachment.title.as_deref(), Some("News system :black_small_square: EXT:news"));
        assert_eq!(attachment.fallback.as_deref(), Some("News system"));
        assert_eq!(attachment.color, "#ff8700");
        assert_eq!(attachment.text.as_deref(), Some("Author(s): Georg Ringer"));
        assert_eq!(attachment.mrkdwn_in, vec!["text".to_owned()]);
        assert!(attachment
            .thumb_url
            .as_deref()
            .is_some_and(|url| url.starts_with("https://www.gravatar.com/avatar/")));
        assert_eq!(
            titles(&message),
            [
                "Latest version",
                "Last update",
                "Download",
                "Code Insight",
                "Compatibility",
                "Further details",
                "Description"
            ]
        );
        assert_eq!(message.field("Last update").map(|f| f.value.as_str()), Some("12/Mar/2024 (3 days ago)"));
        assert_eq!(message.field("Download").map(|f| f.value.as_str()), Some("<https://ter/news.zip|ZIP>"));
        assert_eq!(message.field("Compatibility").map(|f| f.value.as_str()), Some("TYPO3 v11 and v12"));
        assert_eq!(
            message.field("Further details").map(|f| f.value.as_str()),
            Some("<https://extensions.typo3.org/extension/news|TYPO3 Extension Repository>")
        );
        let description = message.field("Description").expect("description");
        assert_eq!(description.value, "Versatile news system");
        assert!(!description.short);
    }

    #[test]
    fn sparse_record_keeps_only_mandatory_fields() {
        let key = ExtensionKey::normalize("bare_ext").expect("key");
        let record = ExtensionRecord { key: "bare_ext".to_owned(), ..ExtensionRecord::default() };

        let message = extension_details(&record, &key, BASE, now());
        let attachment = &message.attachments[0];

        assert_eq!(attachment.title.as_deref(), Some("n/a :black_small_square: EXT:bare_ext"));
        assert_eq!(attachment.fallback.as_deref(), Some("n/a"));
        assert_eq!(titles(&message), ["Latest version", "Last update", "Further details"]);
        assert_eq!(message.field("Latest version").map(|f| f.value.as_str()), Some("n/a"));
        assert_eq!(message.field("Last update").map(|f| f.value.as_str()), Some("unknown"));
        assert_eq!(attachment.text, None);
        assert_eq!(attachment.thumb_url, None);
    }

    #[test]
    fn invalid_author_email_gets_no_avatar() {
        let key = ExtensionKey::normalize("news").expect("key");
        let record = ExtensionRecord {
            title: "News".to_owned(),
            author: Some(Author { name: "Someone".to_owned(), email: Some("not an email".to_owned()) }),
            ..ExtensionRecord::default()
        };

        let attachment = &extension_details(&record, &key, BASE, now()).attachments[0];
        assert_eq!(attachment.text.as_deref(), Some("Author(s): Someone"));
        assert_eq!(attachment.thumb_url, None);
    }

    #[test]
    fn error_message_is_ephemeral_with_single_untitled_field() {
        let message = error_message("Invalid extension key.");
        let attachment = &message.attachments[0];

        assert!(message.is_ephemeral());
        assert_eq!(attachment.text.as_deref(), Some(ERROR_HEADLINE));
        assert_eq!(attachment.color, "#ff0000");
        assert_eq!(attachment.fields.len(), 1);
        assert_eq!(attachment.fields[0].title, None);
        assert_eq!(attachment.fields[0].value, "Invalid extension key.");
        assert!(!attachment.fields[0].short);
    }
}
