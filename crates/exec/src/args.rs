//! Typed argument lists.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// One typed token of a command argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// A literal option such as `--porcelain` or `-z`.
    Flag(&'static str),
    /// A `-c key=value` configuration override.
    Config(String, String),
    /// A bare parameter: revision, branch name, format string, message.
    Param(String),
    /// A filesystem path operand.
    Path(PathBuf),
    /// The `--` separator ending option parsing.
    NoMoreOptions,
}

/// An ordered, immutable-after-build argument list for one git invocation.
///
/// Serialization is deterministic: global options and `-c` configuration
/// pairs are emitted first (git requires them before the subcommand), then
/// the subcommand, then the remaining tokens in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitArgs {
    subcommand: &'static str,
    globals: Vec<&'static str>,
    configs: Vec<(String, String)>,
    args: Vec<Arg>,
}

impl GitArgs {
    pub fn new(subcommand: &'static str) -> Self {
        Self {
            subcommand,
            globals: Vec::new(),
            configs: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn subcommand(&self) -> &str {
        self.subcommand
    }

    /// A global option placed before the subcommand, such as
    /// `--no-optional-locks`.
    pub fn global_flag(mut self, flag: &'static str) -> Self {
        self.globals.push(flag);
        self
    }

    pub fn config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configs.push((key.into(), value.into()));
        self
    }

    pub fn flag(mut self, flag: &'static str) -> Self {
        self.args.push(Arg::Flag(flag));
        self
    }

    pub fn flag_if(self, condition: bool, flag: &'static str) -> Self {
        if condition { self.flag(flag) } else { self }
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.args.push(Arg::Param(param.into()));
        self
    }

    pub fn param_opt(self, param: Option<impl Into<String>>) -> Self {
        match param {
            Some(p) => self.param(p),
            None => self,
        }
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.args.push(Arg::Path(path.as_ref().to_path_buf()));
        self
    }

    pub fn no_more_options(mut self) -> Self {
        self.args.push(Arg::NoMoreOptions);
        self
    }

    /// Serialize to a process argument vector.
    pub fn to_argv(&self) -> Vec<OsString> {
        let mut argv =
            Vec::with_capacity(self.globals.len() + 2 * self.configs.len() + self.args.len() + 1);
        for flag in &self.globals {
            argv.push(OsString::from(*flag));
        }
        for (key, value) in &self.configs {
            argv.push(OsString::from("-c"));
            argv.push(OsString::from(format!("{key}={value}")));
        }
        argv.push(OsString::from(self.subcommand));
        for arg in &self.args {
            match arg {
                Arg::Flag(f) => argv.push(OsString::from(*f)),
                Arg::Config(key, value) => {
                    argv.push(OsString::from("-c"));
                    argv.push(OsString::from(format!("{key}={value}")));
                }
                Arg::Param(p) => argv.push(OsString::from(p)),
                Arg::Path(p) => argv.push(p.as_os_str().to_os_string()),
                Arg::NoMoreOptions => argv.push(OsString::from("--")),
            }
        }
        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(args: &GitArgs) -> Vec<String> {
        args.to_argv()
            .into_iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn globals_and_configs_precede_subcommand() {
        let args = GitArgs::new("diff")
            .global_flag("--no-optional-locks")
            .config("core.quotepath", "false")
            .flag("--cached")
            .no_more_options()
            .path("src/main.rs");
        assert_eq!(
            rendered(&args),
            vec![
                "--no-optional-locks",
                "-c",
                "core.quotepath=false",
                "diff",
                "--cached",
                "--",
                "src/main.rs"
            ]
        );
    }

    #[test]
    fn serialization_is_deterministic() {
        let args = GitArgs::new("log").flag("-z").param("HEAD");
        assert_eq!(args.to_argv(), args.to_argv());
    }

    #[test]
    fn optional_params() {
        let args = GitArgs::new("branch")
            .param_opt(Some("feature"))
            .param_opt(None::<String>);
        assert_eq!(rendered(&args), vec!["branch", "feature"]);
    }
}
