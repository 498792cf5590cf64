// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `add`, `get`, `list`, `rm`, and the `category` and `tag` subcommands.

use std::io::BufRead;

use clap::{Args, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use zeroize::Zeroizing;

use keyward_core::{Category, Credential, KeywardError, RecordSummary, Tag};
use keyward_vault::mask_secret;
use keyward_vault::prompt::prompt_secret;

use crate::app::{App, SecondFactor};
use crate::output::Output;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Record id. A random UUID when omitted.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub title: String,

    /// Category id (`login`, `card`, `note`, or one added with `category add`).
    #[arg(long, default_value = "login")]
    pub category: String,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Tag name; repeat for several. Unknown tags are created.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Read the secret from the first line of stdin instead of prompting.
    #[arg(long)]
    pub secret_stdin: bool,
}

#[derive(Subcommand, Debug)]
pub enum LabelCommand {
    /// List all entries.
    List,
    /// Create an entry from a display name.
    Add { name: String },
}

#[derive(Debug, Serialize)]
struct Stored {
    id: String,
}

#[derive(Debug, Serialize)]
struct Shown {
    id: String,
    #[serde(flatten)]
    credential: Credential,
}

#[derive(Debug, Serialize)]
struct Removed {
    id: String,
    existed: bool,
}

pub async fn add(
    app: &App,
    args: AddArgs,
    factor: &SecondFactor,
    out: &Output,
) -> Result<(), KeywardError> {
    let unlocked = app.unlock(factor).await?;
    let secret = if args.secret_stdin {
        read_stdin_secret()?
    } else {
        prompt_secret("Secret: ")?
    };

    let mut tags = Vec::with_capacity(args.tags.len());
    for name in &args.tags {
        tags.push(app.vault.add_tag(name).await?.id);
    }

    let id = args
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let credential = Credential {
        title: args.title,
        username: args.username,
        secret: secret.expose_secret().to_string(),
        url: args.url,
        notes: args.notes,
        tags,
    };
    app.vault
        .put_credential(&unlocked.session, &id, Some(&args.category), &credential)
        .await?;

    let report = Stored { id };
    out.emit(&report, |out| out.ok(&format!("stored `{}`", report.id)));
    Ok(())
}

pub async fn get(
    app: &App,
    id: &str,
    reveal: bool,
    factor: &SecondFactor,
    out: &Output,
) -> Result<(), KeywardError> {
    let unlocked = app.unlock(factor).await?;
    let mut credential = app
        .vault
        .get_credential(&unlocked.session, id)
        .await?
        .ok_or_else(|| KeywardError::NotFound(id.to_string()))?;
    if !reveal {
        credential.secret = mask_secret(&credential.secret);
    }

    let shown = Shown {
        id: id.to_string(),
        credential,
    };
    out.emit(&shown, |out| {
        let c = &shown.credential;
        out.field("title", &c.title);
        if let Some(username) = &c.username {
            out.field("username", username);
        }
        out.field("secret", &c.secret);
        if let Some(url) = &c.url {
            out.field("url", url);
        }
        if let Some(notes) = &c.notes {
            out.field("notes", notes);
        }
        if !c.tags.is_empty() {
            out.field("tags", &c.tags.join(", "));
        }
    });
    Ok(())
}

/// Cleartext index only. Needs no password.
pub async fn list(app: &App, out: &Output) -> Result<(), KeywardError> {
    let records: Vec<RecordSummary> = app.vault.list_records().await?;
    out.emit(&records, |_| {
        if records.is_empty() {
            println!("no records");
        }
        for record in &records {
            println!(
                "{:<38} {:<10} {}",
                record.id,
                record.category.as_deref().unwrap_or("-"),
                record.updated_at.format("%Y-%m-%d %H:%M")
            );
        }
    });
    Ok(())
}

pub async fn remove(
    app: &App,
    id: &str,
    factor: &SecondFactor,
    out: &Output,
) -> Result<(), KeywardError> {
    let unlocked = app.unlock(factor).await?;
    let existed = app.vault.delete_record(&unlocked.session, id).await?;
    if !existed {
        return Err(KeywardError::NotFound(id.to_string()));
    }
    let report = Removed {
        id: id.to_string(),
        existed,
    };
    out.emit(&report, |out| out.ok(&format!("removed `{}`", report.id)));
    Ok(())
}

pub async fn category(app: &App, command: LabelCommand, out: &Output) -> Result<(), KeywardError> {
    match command {
        LabelCommand::List => {
            let categories: Vec<Category> = app.vault.list_categories().await?;
            out.emit(&categories, |_| {
                for c in &categories {
                    let marker = if c.is_default { " (default)" } else { "" };
                    println!("{:<16} {}{marker}", c.id, c.name);
                }
            });
        }
        LabelCommand::Add { name } => {
            let category = app.vault.add_category(&name).await?;
            out.emit(&category, |out| out.ok(&format!("category `{}` added", category.id)));
        }
    }
    Ok(())
}

pub async fn tag(app: &App, command: LabelCommand, out: &Output) -> Result<(), KeywardError> {
    match command {
        LabelCommand::List => {
            let tags: Vec<Tag> = app.vault.list_tags().await?;
            out.emit(&tags, |_| {
                for t in &tags {
                    println!("{:<16} {}", t.id, t.name);
                }
            });
        }
        LabelCommand::Add { name } => {
            let tag = app.vault.add_tag(&name).await?;
            out.emit(&tag, |out| out.ok(&format!("tag `{}` added", tag.id)));
        }
    }
    Ok(())
}

fn read_stdin_secret() -> Result<SecretString, KeywardError> {
    let mut line = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut *line)
        .map_err(|e| KeywardError::Internal(format!("failed to read secret from stdin: {e}")))?;
    let secret = line.trim_end_matches(['\r', '\n']);
    if secret.is_empty() {
        return Err(KeywardError::Config("empty value not allowed".to_string()));
    }
    Ok(SecretString::from(secret.to_string()))
}
