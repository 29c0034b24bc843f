//! Slack surface for the `/extension` slash command.
//!
//! - **Commands** (`commands`) - form payload and the lookup pipeline
//! - **Messages** (`messages`) - details card and error card
//! - **Attachments** (`attachments`) - legacy attachment schema and builder
//! - **Format** (`format`) - dates, links and version summaries
//!
//! ```text
//! form POST → ExtensionCommandHandler → ExtensionSource → messages → JSON
//!                      ↓
//!                 AuditLogger (best effort)
//! ```

pub mod attachments;
pub mod commands;
pub mod format;
pub mod messages;

pub use attachments::{Attachment, AttachmentBuilder, Field, ResponseType, SlackMessage};
pub use commands::{ExtensionCommandHandler, SlashCommandPayload};
