//! Command-line plumbing shared with the `e2e` test target
//!
//! `cargo test` forwards its own flags and test-name filters to every test
//! binary, including the `harness = false` one. They are dropped here before
//! the harness arguments are parsed.

use std::path::Path;

/// libtest flags without a value
const LIBTEST_FLAGS: &[&str] = &[
    "--nocapture",
    "--quiet",
    "-q",
    "--exact",
    "--ignored",
    "--include-ignored",
    "--show-output",
    "--list",
    "--bench",
    "--test",
];

/// libtest options taking a value, either `--opt=value` or `--opt value`
const LIBTEST_OPTIONS: &[&str] = &["--test-threads", "--format", "--color", "--skip", "--logfile", "-Z"];

/// Drop libtest flags and options, keeping everything else in order
pub fn strip_libtest_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut kept = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let (name, inline_value) = match arg.split_once('=') {
            Some((name, _)) => (name, true),
            None => (arg.as_str(), false),
        };
        if LIBTEST_FLAGS.contains(&name) {
            continue;
        }
        if LIBTEST_OPTIONS.contains(&name) {
            if !inline_value {
                args.next();
            }
            continue;
        }
        kept.push(arg);
    }
    kept
}

/// Whether there is a platform to run against: a settings file or an
/// environment override naming the server
pub fn platform_configured(config: &Path, server_from_env: bool) -> bool {
    config.exists() || server_from_env
}
