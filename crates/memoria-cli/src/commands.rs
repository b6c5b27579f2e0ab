//! Subcommand execution against the journal facade.
//!
//! Every command yields a JSON value; `main` wraps it in an `ApiResponse`.

use chrono::{NaiveDate, TimeZone, Utc};
use memoria_core::{
    normalize_mime_type, DateRange, EntryPatch, EntryView, Error, JournalConfig, NewEntry, Result,
    SearchFilter,
};
use memoria_store::{generate_secure_password, password_strength, Journal};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::Commands;

const MAX_ECHO_COUNT: usize = 1000;

/// Run one command. `password`, when given, unlocks the journal first.
pub async fn execute(journal: &Journal, command: Commands, password: Option<&str>) -> Result<Value> {
    if let Some(password) = password.filter(|_| command.unlocks_with_password()) {
        if !journal.verify_master_password(password).await? {
            return Err(Error::AuthenticationFailed);
        }
    }

    match command {
        Commands::Init => {
            let config = journal.config();
            Ok(json!({
                "dataDir": config.data_dir,
                "hasMasterPassword": journal.has_master_password().await,
                "recovery": journal.recovery_report().await,
            }))
        }
        Commands::SetPassword { new_password } => {
            journal.set_master_password(&new_password).await?;
            Ok(json!({ "hasMasterPassword": true }))
        }
        Commands::UnlockCheck { candidate } => {
            let valid = journal.verify_master_password(&candidate).await?;
            Ok(json!({ "valid": valid }))
        }
        Commands::Strength { candidate } => Ok(strength_json(journal.config(), &candidate)),
        Commands::GenPassword { length } => {
            if length == 0 {
                return Err(Error::InvalidInput("length must be positive".to_string()));
            }
            let password = generate_secure_password(length);
            let mut value = strength_json(journal.config(), &password);
            value["password"] = json!(password);
            Ok(value)
        }
        Commands::Add {
            title,
            content,
            memory_type,
            emotions,
            tags,
            encrypt,
        } => {
            let mut new = NewEntry::new(title, content, memory_type).with_emotion_tags(emotions);
            if !tags.is_empty() {
                new = new.with_tags(tags);
            }
            let entry = journal.create_entry(new, encrypt).await?;
            to_value(EntryView::from(entry))
        }
        Commands::List => {
            let entries = journal.get_all_entries().await?;
            to_value(entries.iter().map(EntryView::from).collect::<Vec<_>>())
        }
        Commands::Show { id } => to_value(EntryView::from(journal.get_entry(&id).await?)),
        Commands::Edit {
            id,
            title,
            content,
            memory_type,
            emotions,
            tags,
            encrypt,
        } => {
            let patch = EntryPatch {
                title,
                content,
                memory_type,
                emotion_tags: non_empty(emotions),
                tags: non_empty(tags),
                encrypt,
            };
            to_value(EntryView::from(journal.update_entry(&id, patch).await?))
        }
        Commands::Delete { id } => {
            journal.delete_entry(&id).await?;
            Ok(json!({ "deleted": id }))
        }
        Commands::Search {
            keyword,
            memory_type,
            emotions,
            tags,
            from,
            to,
        } => {
            let filter = SearchFilter {
                keyword,
                memory_type,
                emotion_tags: non_empty(emotions),
                date_range: date_range(from, to)?,
                tags: non_empty(tags),
            };
            let entries = journal.search_entries(&filter).await?;
            to_value(entries.iter().map(EntryView::from).collect::<Vec<_>>())
        }
        Commands::Stats => to_value(journal.stats().await?),
        Commands::Echo { count } => {
            if count > MAX_ECHO_COUNT {
                return Err(Error::InvalidInput(format!(
                    "count must be at most {MAX_ECHO_COUNT}"
                )));
            }
            let mut recalled = Vec::new();
            for _ in 0..count {
                match journal.get_random_entry().await? {
                    Some(entry) => recalled.push(EntryView::from(entry)),
                    None => break,
                }
            }
            debug!(subsystem = "cli", op = "echo", entry_count = recalled.len(), "Recalled entries");
            to_value(recalled)
        }
        Commands::ChangePassword { old, new } => {
            journal.change_password(&old, &new).await?;
            Ok(json!({ "changed": true }))
        }
        Commands::Attach {
            id,
            file,
            file_type,
        } => {
            let data = tokio::fs::read(&file).await?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let file_type = normalize_mime_type(file_type.as_deref().unwrap_or_default());
            let attachment = journal
                .add_attachment(&id, &file_name, &file_type, &data)
                .await?;
            to_value(memoria_core::AttachmentView::from(&attachment))
        }
        Commands::Extract {
            id,
            attachment,
            output,
        } => {
            let (meta, data) = journal.read_attachment(&id, &attachment).await?;
            tokio::fs::write(&output, &data).await?;
            Ok(json!({
                "attachment": memoria_core::AttachmentView::from(&meta),
                "output": output,
                "byteLen": data.len(),
            }))
        }
        Commands::Detach { id, attachment } => {
            journal.remove_attachment(&id, &attachment).await?;
            Ok(json!({ "removed": attachment }))
        }
        Commands::Backup { dest } => to_value(journal.backup(&dest).await?),
    }
}

fn strength_json(config: &JournalConfig, password: &str) -> Value {
    let score = password_strength(password);
    json!({
        "score": score,
        "required": config.min_password_score,
        "acceptable": score >= config.min_password_score,
    })
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    (!values.is_empty()).then_some(values)
}

/// Whole-day range from `from` to `to`, either end open.
fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Option<DateRange>> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    let start = match from {
        Some(day) => day.and_hms_opt(0, 0, 0),
        None => NaiveDate::MIN.and_hms_opt(0, 0, 0),
    };
    let end = match to {
        Some(day) => day.and_hms_milli_opt(23, 59, 59, 999),
        None => NaiveDate::MAX.and_hms_milli_opt(23, 59, 59, 999),
    };
    let (Some(start), Some(end)) = (start, end) else {
        return Err(Error::InvalidInput("invalid date range".to_string()));
    };
    if start > end {
        return Err(Error::InvalidInput("--from is after --to".to_string()));
    }
    Ok(Some(DateRange {
        start: Utc.from_utc_datetime(&start),
        end: Utc.from_utc_datetime(&end),
    }))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
