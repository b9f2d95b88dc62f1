//! Resolver configuration: platform mapping, condition bindings and
//! filtering options.

use std::collections::HashMap;

use crate::error::{GypError, Result};
use crate::resolve::Resolver;

/// Variable bindings visible to condition expressions.
pub type Bindings = HashMap<String, String>;

/// Binding name for the platform token.
pub const OS_BINDING: &str = "OS";
/// Binding name for the kind of library being built.
pub const LIBRARY_BINDING: &str = "library";
/// Default value of the `library` binding.
pub const DEFAULT_LIBRARY_KIND: &str = "static_library";

pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp"];
pub const DEFAULT_LIBRARY_PREFIX: &str = "-l";
pub const DEFAULT_MAX_ROUNDS: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
//  Platform
// ═══════════════════════════════════════════════════════════════════════════════

/// Desktop OS family a configuration is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Windows,
    Mac,
}

impl Platform {
    /// Map the build tool's destination-OS identifier (`linux`, `win32`,
    /// `darwin`) to a platform.
    pub fn from_dest_os(dest_os: &str) -> Result<Self> {
        match dest_os {
            "linux" => Ok(Platform::Linux),
            "win32" => Ok(Platform::Windows),
            "darwin" => Ok(Platform::Mac),
            other => Err(GypError::UnknownOs(other.to_string())),
        }
    }

    /// The platform this crate was compiled for, if it is one of the three
    /// supported families.
    pub fn host() -> Option<Self> {
        if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else if cfg!(target_os = "windows") {
            Some(Platform::Windows)
        } else if cfg!(target_os = "macos") {
            Some(Platform::Mac)
        } else {
            None
        }
    }

    /// The value bound to `OS` in condition expressions.
    pub fn token(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "win",
            Platform::Mac => "mac",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Options
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything a [`Resolver`] needs besides the document itself.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub bindings: Bindings,
    /// Source-file extensions (without the dot) kept in `sources`.
    pub source_extensions: Vec<String>,
    /// Link-flag prefix stripped from every `libraries` entry.
    pub library_prefix: String,
    /// Upper bound on nested-`conditions` rounds per condition list.
    pub max_rounds: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        let mut bindings = Bindings::new();
        bindings.insert(LIBRARY_BINDING.to_string(), DEFAULT_LIBRARY_KIND.to_string());
        Self {
            bindings,
            source_extensions: DEFAULT_SOURCE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            library_prefix: DEFAULT_LIBRARY_PREFIX.to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl ResolveOptions {
    /// `true` when `path` ends in one of the allowed source extensions.
    pub fn is_source_file(&self, path: &str) -> bool {
        std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.source_extensions.iter().any(|allowed| allowed == ext))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ResolverBuilder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for a [`Resolver`].
///
/// Starts from [`ResolveOptions::default`]: `library` bound to
/// `static_library`, no `OS` binding, `.c`/`.cc`/`.cpp` sources and the
/// `-l` library prefix.
///
/// # Example
/// ```
/// use gyp_rs::ResolverBuilder;
///
/// let resolver = ResolverBuilder::new()
///     .dest_os("win32")
///     .unwrap()
///     .library_kind("static_library")
///     .build();
/// assert_eq!(resolver.options().bindings["OS"], "win");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResolverBuilder {
    options: ResolveOptions,
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `OS` to the platform's token.
    pub fn platform(mut self, platform: Platform) -> Self {
        self.options
            .bindings
            .insert(OS_BINDING.to_string(), platform.token().to_string());
        self
    }

    /// Bind `OS` from a build-tool destination-OS identifier.
    ///
    /// Fails with [`GypError::UnknownOs`] for identifiers outside
    /// `linux` / `win32` / `darwin`.
    pub fn dest_os(self, dest_os: &str) -> Result<Self> {
        Ok(self.platform(Platform::from_dest_os(dest_os)?))
    }

    /// Bind `OS` to the compile host, failing on unsupported hosts.
    pub fn host_platform(self) -> Result<Self> {
        let platform = Platform::host()
            .ok_or_else(|| GypError::UnknownOs(std::env::consts::OS.to_string()))?;
        Ok(self.platform(platform))
    }

    /// Bind `library` (e.g. `static_library`, `shared_library`).
    pub fn library_kind(self, kind: impl Into<String>) -> Self {
        self.binding(LIBRARY_BINDING, kind)
    }

    /// Set a single binding.
    pub fn binding(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.bindings.insert(key.into(), value.into());
        self
    }

    /// Merge a whole binding map. Later calls override earlier values.
    pub fn bindings(mut self, vars: Bindings) -> Self {
        self.options.bindings.extend(vars);
        self
    }

    /// Replace the allowed source extensions (given without the dot).
    pub fn source_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.source_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn library_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.library_prefix = prefix.into();
        self
    }

    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.options.max_rounds = rounds;
        self
    }

    pub fn build(self) -> Resolver {
        Resolver::new(self.options)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dest_os_mapping() {
        assert_eq!(Platform::from_dest_os("linux").unwrap(), Platform::Linux);
        assert_eq!(Platform::from_dest_os("win32").unwrap(), Platform::Windows);
        assert_eq!(Platform::from_dest_os("darwin").unwrap(), Platform::Mac);
        assert_eq!(Platform::Windows.token(), "win");
        assert_eq!(Platform::Mac.to_string(), "mac");
    }

    #[test]
    fn unknown_dest_os_is_lookup_error() {
        let err = Platform::from_dest_os("freebsd").unwrap_err();
        assert!(matches!(err, GypError::UnknownOs(ref os) if os == "freebsd"));
        assert_eq!(err.kind(), crate::error::ErrorKind::Lookup);
        assert!(ResolverBuilder::new().dest_os("haiku").is_err());
    }

    #[test]
    fn host_platform_binds_compile_host() {
        let expected = if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else if cfg!(target_os = "windows") {
            Some(Platform::Windows)
        } else if cfg!(target_os = "macos") {
            Some(Platform::Mac)
        } else {
            None
        };
        assert_eq!(Platform::host(), expected);

        match (ResolverBuilder::new().host_platform(), expected) {
            (Ok(builder), Some(platform)) => {
                assert_eq!(builder.build().options().bindings["OS"], platform.token());
            }
            (Err(err), None) => assert!(matches!(err, GypError::UnknownOs(_))),
            (result, expected) => panic!("host {expected:?} gave {result:?}"),
        }
    }

    #[test]
    fn default_options() {
        let options = ResolveOptions::default();
        assert_eq!(options.bindings.get("library").map(String::as_str), Some("static_library"));
        assert!(!options.bindings.contains_key("OS"));
        assert_eq!(options.library_prefix, "-l");
        assert!(options.is_source_file("src/unix/core.c"));
        assert!(options.is_source_file("x.cc"));
        assert!(options.is_source_file("x.cpp"));
        assert!(!options.is_source_file("include/uv.h"));
        assert!(!options.is_source_file("uv.gyp"));
        assert!(!options.is_source_file("Makefile"));
    }

    #[test]
    fn builder_sets_bindings_and_options() {
        let mut extra = Bindings::new();
        extra.insert("uv_use_dtrace".into(), "false".into());

        let resolver = ResolverBuilder::new()
            .platform(Platform::Mac)
            .library_kind("shared_library")
            .binding("component", "static")
            .bindings(extra)
            .source_extensions(["c", "m"])
            .library_prefix("-framework ")
            .max_rounds(3)
            .build();

        let options = resolver.options();
        assert_eq!(options.bindings["OS"], "mac");
        assert_eq!(options.bindings["library"], "shared_library");
        assert_eq!(options.bindings["component"], "static");
        assert_eq!(options.bindings["uv_use_dtrace"], "false");
        assert!(options.is_source_file("darwin.m"));
        assert!(!options.is_source_file("x.cpp"));
        assert_eq!(options.library_prefix, "-framework ");
        assert_eq!(options.max_rounds, 3);
    }
}
