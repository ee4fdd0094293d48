use std::error::Error;
use std::io::Write;
use std::path::Path;

use crate::{config::Settings, csv_utils::read_csv, dto::Operation, Engine};

/// Runs the engine on the given operations file and writes the balance table to the provided writer.
///
/// # Arguments
/// * `settings` - Where the durable state lives and how it behaves
/// * `input_path` - Path to the input CSV file containing operations
/// * `writer` - Where to write the balances (e.g. stdout)
///
/// # Errors
/// Returns an error if:
/// * The stored state cannot be opened or saved
/// * The input file cannot be read
/// * The CSV is malformed
/// * Writing to the output fails
pub fn run<P, W>(
    settings: &Settings,
    input_path: P,
    writer: W,
) -> Result<(), Box<dyn Error + Send + Sync>>
where
    P: AsRef<Path>,
    W: Write,
{
    let mut engine = Engine::open(settings)?;

    let operations = read_csv::<Operation, _>(input_path)?;
    for operation in operations {
        // CSV parsing errors are critical - propagate them
        let operation = operation?;
        super::apply(&mut engine, operation);
    }

    super::finish(&mut engine, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlayerId, RelationshipGraph};

    #[test]
    fn test_example_operations() -> Result<(), Box<dyn Error + Send + Sync>> {
        let dir = tempfile::tempdir()?;
        let settings = Settings::with_data_dir(dir.path());
        let mut output = Vec::new();
        run(&settings, "data/example_operations.csv", &mut output)?;

        let expected = "player,balance,display
00000000-0000-0000-0000-000000000001,2500,2.5k
00000000-0000-0000-0000-000000000003,2000,2.0k
00000000-0000-0000-0000-000000000002,750,750
";
        assert_eq!(String::from_utf8(output)?, expected);

        let mut graph = RelationshipGraph::open(settings.friends_dir(), &settings.friends)?;
        let (alice, bob) = (PlayerId::from_u128(1), PlayerId::from_u128(2));
        assert!(graph.are_friends(alice, bob)?);
        assert!(graph.are_friends(bob, alice)?);
        Ok(())
    }

    #[test]
    fn test_state_carries_over_between_runs() -> Result<(), Box<dyn Error + Send + Sync>> {
        let dir = tempfile::tempdir()?;
        let settings = Settings::with_data_dir(dir.path());
        run(&settings, "data/example_operations.csv", std::io::sink())?;

        let mut output = Vec::new();
        run(&settings, "data/example_operations.csv", &mut output)?;

        // Second pass: alice 2500 + 1500, bob 750 - 250 (negative deposit still rejected),
        // carol is set to 2000 again after her 5000 withdrawal is refused.
        let expected = "player,balance,display
00000000-0000-0000-0000-000000000001,4000,4.0k
00000000-0000-0000-0000-000000000003,2000,2.0k
00000000-0000-0000-0000-000000000002,500,500
";
        assert_eq!(String::from_utf8(output)?, expected);
        Ok(())
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path());
        assert!(run(&settings, "data/does_not_exist.csv", std::io::sink()).is_err());
    }
}
