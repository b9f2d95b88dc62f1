//! Windows resource-script generation.
//!
//! Before an executable is linked on Windows, a `.rc` file describing its
//! version information is produced from a template by replacing `@KEY@`
//! tokens:
//!
//! | Token           | Value                                        |
//! |-----------------|----------------------------------------------|
//! | `@EXECUTABLE@`  | file name of the executable being linked     |
//! | `@VERSION@`     | the version string as given                  |
//! | `@GIT_COMMIT@`  | commit identifier                            |
//! | `@WIN_VERSION@` | [`win_version_string`] of the version        |

use std::path::{Path, PathBuf};

use crate::error::{GypError, Result};

/// Turn a version such as `"1.1"` or `"v2.0.3-rc1"` into the four
/// comma-separated components `FILEVERSION` / `PRODUCTVERSION` expect.
///
/// Everything except digits and dots is dropped, missing components are
/// filled with `0`, and components past the fourth are discarded.
///
/// ```
/// use gyp_rs::winres::win_version_string;
///
/// assert_eq!(win_version_string("1.1"), "1,1,0,0");
/// assert_eq!(win_version_string("2.0.3.4.5"), "2,0,3,4");
/// ```
pub fn win_version_string(version: &str) -> String {
    let numeric: String = version
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut parts: Vec<&str> = numeric.split('.').collect();
    if parts.len() < 4 {
        parts.resize(4, "0");
    }
    parts[..4].join(",")
}

/// Substitution values for one executable's resource script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScript {
    pub executable: String,
    pub version: String,
    pub git_commit: String,
}

impl ResourceScript {
    /// `executable` may be a path; only its file name is kept.
    pub fn new(
        executable: impl AsRef<Path>,
        version: impl Into<String>,
        git_commit: impl Into<String>,
    ) -> Self {
        let executable = executable.as_ref();
        let executable = executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| executable.to_string_lossy().into_owned());
        Self {
            executable,
            version: version.into(),
            git_commit: git_commit.into(),
        }
    }

    /// Value for a template key, if it is one of the known tokens.
    pub fn value(&self, key: &str) -> Option<String> {
        match key {
            "EXECUTABLE" => Some(self.executable.clone()),
            "VERSION" => Some(self.version.clone()),
            "GIT_COMMIT" => Some(self.git_commit.clone()),
            "WIN_VERSION" => Some(win_version_string(&self.version)),
            _ => None,
        }
    }

    /// Name of the generated script: the executable's stem plus `.rc`.
    pub fn file_name(&self) -> String {
        let stem = Path::new(&self.executable)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{stem}.rc")
    }

    /// Replace every `@KEY@` token in `template`.
    ///
    /// A `@` that does not open a `@word@` token is copied through
    /// unchanged. A well-formed token naming an unknown key is an error.
    pub fn render(&self, template: &str) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('@') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            let key_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());

            if key_len > 0 && after[key_len..].starts_with('@') {
                let key = &after[..key_len];
                let value = self
                    .value(key)
                    .ok_or_else(|| GypError::UnknownTemplateKey(key.to_string()))?;
                out.push_str(&value);
                rest = &after[key_len + 1..];
            } else {
                out.push('@');
                rest = after;
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Render the template at `template_path` into
    /// `output_dir/<file_name()>` and return the written path.
    pub fn write_from_template(
        &self,
        template_path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let template_path = template_path.as_ref();
        let template = std::fs::read_to_string(template_path)
            .map_err(|e| GypError::io(template_path, e))?;
        let rendered = self.render(&template)?;

        let output = output_dir.as_ref().join(self.file_name());
        std::fs::write(&output, rendered).map_err(|e| GypError::io(&output, e))?;
        log::debug!("wrote resource script {}", output.display());
        Ok(output)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
