//! Rendering scenario scripts for the blockchain client
//!
//! Templates live in `<templates_dir>/<name>.template.js` and use `$key` or
//! `${key}` placeholders (`$$` is a literal dollar sign). Every rendered
//! script starts with a shared preamble that unlocks the test accounts and
//! defines the helper functions the templates rely on.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::evaluator::RESULT_MARKER;

/// Passphrase protecting every account the harness creates
pub const ACCOUNT_PASSPHRASE: &str = "Write here a good, randomly generated, passphrase!";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write script {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("template '{template}' references '${key}' but no substitution was given")]
    MissingSubstitution { template: String, key: String },

    #[error("template '{template}' has an invalid placeholder at byte {offset}")]
    InvalidPlaceholder { template: String, offset: usize },

    #[error("failed to encode substitution '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// Values substituted into a template, keyed by placeholder name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitutions(BTreeMap<String, String>);

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitute `value` verbatim using its `Display` form
    pub fn set(&mut self, key: &str, value: impl Display) -> &mut Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    /// Substitute `value` encoded as a JSON literal (ABIs, arrays, strings)
    pub fn set_json<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<&mut Self, TemplateError> {
        let encoded = serde_json::to_string(value).map_err(|source| TemplateError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.0.insert(key.to_string(), encoded);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// JS shared by every generated script.
///
/// Unlocks up to `accounts_num` accounts (the bootstrap script runs before
/// they all exist) and defines `checkWork`, `bigDiff`, `addToTest` and
/// `testResults`.
pub fn preamble(accounts_num: usize) -> String {
    format!(
        r#"console.log("unlocking accounts");
var accountPassphrase = "{passphrase}";
var unlockCount = Math.min({accounts_num}, eth.accounts.length);
for (var u = 0; u < unlockCount; u++) {{
    personal.unlockAccount(eth.accounts[u], accountPassphrase);
}}
// keep mining rewards away from the service provider and the proposal creator
if (unlockCount > 2) {{
    web3.miner.setEtherbase(eth.accounts[unlockCount - 1]);
}}

var serviceProvider = eth.accounts[0];
var proposalCreator = eth.accounts[1];
var testMap = {{}};

function checkWork() {{
    miner.start(1);
    admin.sleepBlocks(3);
    miner.stop(0);
}}

function bigDiff(astr, bstr) {{
    return Math.round((new BigNumber(astr)).minus(new BigNumber(bstr)));
}}

function addToTest(name, value) {{
    testMap[name] = value;
    console.log("'" + name + "' = " + value);
}}

function testResults() {{
    console.log("{marker}" + JSON.stringify(testMap));
}}

"#,
        passphrase = ACCOUNT_PASSPHRASE,
        accounts_num = accounts_num,
        marker = RESULT_MARKER,
    )
}

/// Loads templates, fills them in and writes the resulting scripts
pub struct ScriptGenerator {
    templates_dir: PathBuf,
    output_dir: PathBuf,
    accounts_num: usize,
    placeholder_regex: Regex,
}

impl ScriptGenerator {
    pub fn new(
        templates_dir: PathBuf,
        output_dir: PathBuf,
        accounts_num: usize,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            templates_dir,
            output_dir,
            accounts_num,
            placeholder_regex: Regex::new(
                r"(?i)\$(?:(\$)|([_a-z][_a-z0-9]*)|\{([_a-z][_a-z0-9]*)\}|())",
            )?,
        })
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.template.js", name))
    }

    pub fn script_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.js", name))
    }

    /// Fill `template` in with `subs`.
    ///
    /// Keys in `subs` the template never mentions are ignored; a placeholder
    /// without a matching key is an error.
    pub fn render(
        &self,
        name: &str,
        template: &str,
        subs: &Substitutions,
    ) -> Result<String, TemplateError> {
        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;

        for caps in self.placeholder_regex.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            rendered.push_str(&template[last..whole.start()]);
            last = whole.end();

            if caps.get(1).is_some() {
                rendered.push('$');
                continue;
            }
            let Some(key) = caps.get(2).or_else(|| caps.get(3)) else {
                return Err(TemplateError::InvalidPlaceholder {
                    template: name.to_string(),
                    offset: whole.start(),
                });
            };
            let value = subs
                .get(key.as_str())
                .ok_or_else(|| TemplateError::MissingSubstitution {
                    template: name.to_string(),
                    key: key.as_str().to_string(),
                })?;
            rendered.push_str(value);
        }
        rendered.push_str(&template[last..]);
        Ok(rendered)
    }

    /// Produce the full script text for template `name`
    pub fn generate(&self, name: &str, subs: &Substitutions) -> Result<String, TemplateError> {
        self.generate_with(name, subs.clone(), |_| {})
    }

    /// Like [`generate`](Self::generate), but lets `hook` adjust the
    /// substitutions right before rendering. Time-relative values are
    /// computed there so they are measured from generation time.
    pub fn generate_with<F>(
        &self,
        name: &str,
        mut subs: Substitutions,
        hook: F,
    ) -> Result<String, TemplateError>
    where
        F: FnOnce(&mut Substitutions),
    {
        let path = self.template_path(name);
        let template = std::fs::read_to_string(&path)
            .map_err(|source| TemplateError::Read { path, source })?;

        hook(&mut subs);
        let body = self.render(name, &template, &subs)?;
        Ok(preamble(self.accounts_num) + &body)
    }

    /// Generate the script for template `name` and write it next to the
    /// other harness artifacts, returning its path
    pub fn write(&self, name: &str, subs: &Substitutions) -> Result<PathBuf, TemplateError> {
        self.write_with(name, subs.clone(), |_| {})
    }

    pub fn write_with<F>(
        &self,
        name: &str,
        subs: Substitutions,
        hook: F,
    ) -> Result<PathBuf, TemplateError>
    where
        F: FnOnce(&mut Substitutions),
    {
        self.write_as(name, name, subs, hook)
    }

    /// Render template `template` into the script `<output_dir>/<script>.js`
    pub fn write_as<F>(
        &self,
        template: &str,
        script: &str,
        subs: Substitutions,
        hook: F,
    ) -> Result<PathBuf, TemplateError>
    where
        F: FnOnce(&mut Substitutions),
    {
        let text = self.generate_with(template, subs, hook)?;
        let path = self.script_path(script);
        write_script(&path, &text)?;
        debug!("Wrote {} ({} bytes)", path.display(), text.len());
        Ok(path)
    }
}

fn write_script(path: &Path, script: &str) -> Result<(), TemplateError> {
    std::fs::write(path, script).map_err(|source| TemplateError::Write {
        path: path.to_path_buf(),
        source,
    })
}
