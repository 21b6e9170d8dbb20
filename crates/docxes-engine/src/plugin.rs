//! Plugin hook pipeline.
//!
//! A plugin is a name plus any number of hooks, each bound to one lifecycle
//! stage:
//!
//! | stage            | input                  |
//! |------------------|------------------------|
//! | `before_parse`   | raw source             |
//! | `after_parse`    | [`ParsedDocument`]     |
//! | `before_compile` | content to compile     |
//! | `after_render`   | compiled artifact      |
//!
//! Hooks run strictly in plugin list order, each consuming the previous
//! output. A plugin without a hook for a stage leaves the value untouched.
//!
//! # Example
//!
//! ```
//! use docxes_engine::{Plugin, PluginPipeline};
//!
//! let shout = Plugin::new("shout").before_compile(|content| content.to_uppercase());
//! let pipeline = PluginPipeline::new(vec![shout]);
//!
//! assert_eq!(pipeline.apply_before_compile("hi".to_owned()), "HI");
//! assert_eq!(pipeline.names(), vec!["shout"]);
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::EngineError;
use crate::pipeline::ParsedDocument;

static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Name of the built-in plugin that converts CRLF and CR line endings to LF.
pub const NORMALIZE_LINE_ENDINGS: &str = "normalize-line-endings";
/// Name of the built-in plugin that removes `<!-- ... -->` comments.
pub const STRIP_HTML_COMMENTS: &str = "strip-html-comments";

type TextHook = Arc<dyn Fn(String) -> String + Send + Sync>;
type DocumentHook = Arc<dyn Fn(ParsedDocument) -> ParsedDocument + Send + Sync>;

/// A hook bound to its lifecycle stage.
#[derive(Clone)]
pub enum Hook {
    BeforeParse(TextHook),
    AfterParse(DocumentHook),
    BeforeCompile(TextHook),
    AfterRender(TextHook),
}

/// Named set of hooks.
#[derive(Clone)]
pub struct Plugin {
    name: String,
    hooks: Vec<Hook>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn before_parse(mut self, hook: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.hooks.push(Hook::BeforeParse(Arc::new(hook)));
        self
    }

    #[must_use]
    pub fn after_parse(
        mut self,
        hook: impl Fn(ParsedDocument) -> ParsedDocument + Send + Sync + 'static,
    ) -> Self {
        self.hooks.push(Hook::AfterParse(Arc::new(hook)));
        self
    }

    #[must_use]
    pub fn before_compile(
        mut self,
        hook: impl Fn(String) -> String + Send + Sync + 'static,
    ) -> Self {
        self.hooks.push(Hook::BeforeCompile(Arc::new(hook)));
        self
    }

    #[must_use]
    pub fn after_render(mut self, hook: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.hooks.push(Hook::AfterRender(Arc::new(hook)));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a built-in plugin by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            NORMALIZE_LINE_ENDINGS => Some(Self::new(name).before_parse(|source| {
                source.replace("\r\n", "\n").replace('\r', "\n")
            })),
            STRIP_HTML_COMMENTS => Some(Self::new(name).before_parse(|source| {
                HTML_COMMENT.replace_all(&source, "").into_owned()
            })),
            _ => None,
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Ordered plugin list applied by sequential fold per stage.
#[derive(Clone, Debug, Default)]
pub struct PluginPipeline {
    plugins: Vec<Plugin>,
}

impl PluginPipeline {
    #[must_use]
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self { plugins }
    }

    /// Build a pipeline from built-in plugin names.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownPlugin`] for a name with no built-in.
    pub fn from_names(names: &[String]) -> Result<Self, EngineError> {
        let plugins = names
            .iter()
            .map(|name| Plugin::builtin(name).ok_or_else(|| EngineError::UnknownPlugin(name.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { plugins })
    }

    /// Append a plugin after the existing ones.
    pub fn push(&mut self, plugin: Plugin) {
        self.plugins.push(plugin);
    }

    /// Active plugin names in order. Hashed into content cache keys.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(Plugin::name).collect()
    }

    fn hooks(&self) -> impl Iterator<Item = &Hook> {
        self.plugins.iter().flat_map(|plugin| plugin.hooks.iter())
    }

    #[must_use]
    pub fn apply_before_parse(&self, source: String) -> String {
        self.hooks().fold(source, |acc, hook| match hook {
            Hook::BeforeParse(f) => f(acc),
            _ => acc,
        })
    }

    #[must_use]
    pub fn apply_after_parse(&self, document: ParsedDocument) -> ParsedDocument {
        self.hooks().fold(document, |acc, hook| match hook {
            Hook::AfterParse(f) => f(acc),
            _ => acc,
        })
    }

    #[must_use]
    pub fn apply_before_compile(&self, content: String) -> String {
        self.hooks().fold(content, |acc, hook| match hook {
            Hook::BeforeCompile(f) => f(acc),
            _ => acc,
        })
    }

    #[must_use]
    pub fn apply_after_render(&self, compiled: String) -> String {
        self.hooks().fold(compiled, |acc, hook| match hook {
            Hook::AfterRender(f) => f(acc),
            _ => acc,
        })
    }
}
