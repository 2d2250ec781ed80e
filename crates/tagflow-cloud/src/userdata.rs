//! User-data rendering
//!
//! Scripts are concatenated in declaration order and then formatted with
//! three positional slots:
//!
//! | Slot  | Value                                   |
//! |-------|-----------------------------------------|
//! | `{0}` | profile (account/region alias)          |
//! | `{1}` | instance name, lower-cased              |
//! | `{2}` | `/16` network block of the private IP   |
//!
//! Literal braces are written `{{` and `}}`.

use crate::error::{CloudError, Result};
use std::path::{Path, PathBuf};

/// Directory holding user-data scripts
#[derive(Debug, Clone)]
pub struct UserDataSource {
    dir: PathBuf,
}

impl UserDataSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Concatenate `files` and fill in the positional slots
    pub async fn render(
        &self,
        files: &[String],
        profile: &str,
        instance_name: &str,
        network_block: &str,
    ) -> Result<String> {
        let mut script = String::new();
        for file in files {
            let path = self.dir.join(file);
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                CloudError::UserData(format!("cannot read {}: {}", path.display(), e))
            })?;
            script.push_str(&content);
        }
        format_positional(
            &script,
            &[profile, &instance_name.to_lowercase(), network_block],
        )
    }
}

/// Replace `{N}` with `args[N]` and unescape doubled braces
pub fn format_positional(template: &str, args: &[&str]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => {
                            return Err(CloudError::UserData(
                                "unterminated '{' in user-data".to_string(),
                            ));
                        }
                    }
                }
                let arg = field
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| args.get(i))
                    .ok_or_else(|| {
                        CloudError::UserData(format!("unknown user-data slot '{{{field}}}'"))
                    })?;
                out.push_str(arg);
            }
            '}' => {
                return Err(CloudError::UserData(
                    "single '}' in user-data, write '}}'".to_string(),
                ));
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}
