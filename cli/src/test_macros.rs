//! Declarative macros for command tests.
//!
//! Parsing tests take an argv without the binary name. Execution tests run the
//! command against the seeded `test_page` table from `db::test_utils`.

/// Parses `recordkit <argv...>`.
#[cfg(test)]
pub(crate) fn parse_argv(argv: &[&str]) -> Result<crate::cli::Args, clap::Error> {
    use clap::Parser;
    crate::cli::Args::try_parse_from(std::iter::once("recordkit").chain(argv.iter().copied()))
}

/// Parses an argv and checks fields of the selected command.
///
/// # Example
///
/// ```ignore
/// parse_test! {
///     test_name: test_select_defaults,
///     argv: ["select", "page"],
///     variant: Select,
///     fields: { limit: None },
/// }
/// ```
#[macro_export]
macro_rules! parse_test {
    (
        test_name: $test_name:ident,
        argv: [$($arg:literal),+ $(,)?],
        variant: $variant:ident,
        fields: {
            $($field:ident : $expected:expr),* $(,)?
        } $(,)?
    ) => {
        #[rstest::rstest]
        fn $test_name() {
            let args = $crate::test_macros::parse_argv(&[$($arg),+]).unwrap();
            match args.command {
                $crate::commands::Command::$variant(cmd) => {
                    $(
                        assert_eq!(cmd.$field, $expected,
                            concat!("field ", stringify!($field), " after parsing"));
                    )*
                }
                other => panic!(concat!("expected ", stringify!($variant), ", got {:?}"), other),
            }
        }
    };
}

/// Checks that an argv is rejected, optionally naming the offending argument.
#[macro_export]
macro_rules! rejected_argv_test {
    (
        test_name: $test_name:ident,
        argv: [$($arg:literal),+ $(,)?]
        $(, mentions: $mention:literal)? $(,)?
    ) => {
        #[rstest::rstest]
        fn $test_name() {
            let result = $crate::test_macros::parse_argv(&[$($arg),+]);
            assert!(result.is_err(), "argv should be rejected");
            $(
                let message = result.err().map(|e| e.to_string()).unwrap_or_default();
                assert!(
                    message.contains($mention),
                    concat!("error should mention ", $mention, ": {}"),
                    message
                );
            )?
        }
    };
}

/// Runs a command against the seeded table and checks its rendered output.
///
/// `expected:` compares the whole rendering; `contains:` looks for a fragment.
#[macro_export]
macro_rules! seeded_output_test {
    (
        test_name: $test_name:ident,
        cmd: $cmd:expr,
        format: $format:ident,
        expected: $expected:expr $(,)?
    ) => {
        #[rstest::rstest]
        fn $test_name() {
            use $crate::commands::Execute;
            use $crate::output::{OutputFormat, Outputable};
            let (_file, mut db) = db::test_utils::seeded_sqlite();
            let output = $cmd.execute(&mut db).unwrap();
            assert_eq!(output.format(OutputFormat::$format), $expected);
        }
    };
    (
        test_name: $test_name:ident,
        cmd: $cmd:expr,
        format: $format:ident,
        contains: $fragment:expr $(,)?
    ) => {
        #[rstest::rstest]
        fn $test_name() {
            use $crate::commands::Execute;
            use $crate::output::{OutputFormat, Outputable};
            let (_file, mut db) = db::test_utils::seeded_sqlite();
            let rendered = $cmd.execute(&mut db).unwrap().format(OutputFormat::$format);
            assert!(rendered.contains($fragment), "{}", rendered);
        }
    };
}

/// Runs a command against the seeded table and checks that it fails.
#[macro_export]
macro_rules! seeded_failure_test {
    (
        test_name: $test_name:ident,
        cmd: $cmd:expr,
        message: $message:expr $(,)?
    ) => {
        #[rstest::rstest]
        fn $test_name() {
            use $crate::commands::Execute;
            let (_file, mut db) = db::test_utils::seeded_sqlite();
            let cmd = $cmd;
            let err = match cmd.execute(&mut db) {
                Ok(_) => panic!("command should fail"),
                Err(err) => err,
            };
            assert!(err.to_string().contains($message), "{}", err);
        }
    };
}
