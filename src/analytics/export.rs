use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

use super::dates::{format_date, DateRange};
use crate::{
    chat_users::repo_types::ChatUser,
    error::{AppError, AppResult},
    interactions::repo_types::Interaction,
    knowledge::repo_types::DataFile,
};

const CLOCK_FORMAT: &[FormatItem<'static>] = format_description!("[hour][minute][second]");

const CHAT_USER_HEADER: [&str; 5] = ["ID", "Age", "Gender", "Occupation", "Location"];
const INTERACTION_HEADER: [&str; 3] = ["ID", "User Chat ID", "Context Interaction Amount"];
const FILE_HEADER: [&str; 5] = ["ID", "Filename", "S3 Key", "User ID", "User Email"];

fn csv_error(err: impl std::fmt::Display) -> AppError {
    AppError::Unexpected(format!("write csv: {err}"))
}

fn section<I>(header: &[&str], rows: I) -> AppResult<Vec<u8>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(header).map_err(csv_error)?;
    for row in rows {
        writer.write_record(&row).map_err(csv_error)?;
    }
    writer.into_inner().map_err(csv_error)
}

/// Three header-led sections (chat users, interactions, files) separated by
/// one blank line.
pub fn render(
    chat_users: &[ChatUser],
    interactions: &[Interaction],
    files: &[DataFile],
) -> AppResult<Vec<u8>> {
    let users = section(
        &CHAT_USER_HEADER,
        chat_users.iter().map(|u| {
            vec![
                u.id.clone(),
                u.age.map(|a| a.to_string()).unwrap_or_default(),
                u.gender.clone().unwrap_or_default(),
                u.occupation.clone().unwrap_or_default(),
                u.location.clone().unwrap_or_default(),
            ]
        }),
    )?;
    let interactions = section(
        &INTERACTION_HEADER,
        interactions.iter().map(|i| {
            vec![
                i.id.to_string(),
                i.user_chat_id.clone(),
                i.context_interaction.len().to_string(),
            ]
        }),
    )?;
    let files = section(
        &FILE_HEADER,
        files.iter().map(|f| {
            vec![
                f.id.to_string(),
                f.filename.clone(),
                f.s3_key.clone(),
                f.user_id.map(|id| id.to_string()).unwrap_or_default(),
                f.user_email.clone().unwrap_or_default(),
            ]
        }),
    )?;

    Ok([users, interactions, files].join(&b'\n'))
}

pub fn object_key(range: Option<&DateRange>, now: OffsetDateTime) -> String {
    let scope = match range {
        Some(r) => format!("{}_to_{}", format_date(r.start_date()), format_date(r.end_date())),
        None => "complete".to_string(),
    };
    let clock = now.format(CLOCK_FORMAT).unwrap_or_else(|_| "000000".into());
    format!("exports/database_export_{scope}_{clock}.csv")
}
