//! Task ID generation
//!
//! All IDs use the format: `{16-char-hex}-task-{slug}`
//! Example: `0193f2a41b7c8d3e-task-cricket`

/// Generate a task ID from the job's hashtag
///
/// The hex prefix comes from a UUIDv7, so IDs sort roughly by creation
/// time and carry enough randomness to avoid collision under concurrent
/// submission. The store still checks for duplicates defensively.
pub fn generate_task_id(hashtag: &str) -> String {
    let uuid = uuid::Uuid::now_v7();
    let hex_prefix = &uuid.simple().to_string()[..16];
    format!("{}-task-{}", hex_prefix, slugify(hashtag))
}

/// Slugify a hashtag for use in IDs
fn slugify(hashtag: &str) -> String {
    hashtag
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
