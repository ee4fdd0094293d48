//! This example generates a CSV file with a number of operations (configurable through the constants)
//! for a number of players supplied as a command-line argument.
//!
//! The CSV file can then be fed to the `onous-core` binary or the async runner.
//!
//! Example (100 players):
//! ```bash
//! cargo run --example generator 100 > data/100_players.csv
//! ```
//! ### Maths
//! Player `i` has id `00000000-0000-0000-0000-{i:012x}` and starts at the default
//! balance S = 1000.
//!
//! Let D = NUM_DEPOSITS, W = NUM_WITHDRAWALS, A_d = BASE_DEPOSIT_AMOUNT and
//! A_w = BASE_WITHDRAWAL_AMOUNT.
//!
//! **Step 1: Deposits & Withdrawals**
//! Deposits add D·A_d·i and withdrawals subtract W·A_w·i. With our constants:
//! 70·10·i – 20·20·i = 300·i, so the balance is S + 300·i. Deposits come first,
//! so no withdrawal is ever refused.
//!
//! **Step 2: Final Operation**
//! - Odd i tries to withdraw `1t`, which is refused for insufficient funds.
//! - Even i has its balance set to `{i}k`, i.e. 1000·i.
//!
//! **Step 3: Friends**
//! Every i < N sends a request to i + 1. Odd i + 1 denies it, even i + 1 accepts,
//! so odd i ends up friends with i + 1 and even i has no friends except i - 1.
//!
//! **Final State for player i:**
//! - **Odd i:** balance = 1000 + 300·i
//! - **Even i:** balance = 1000·i
//!

use csv::Writer;
use onous_core::{Operation, OperationType, PlayerId};
use std::{env, error::Error};

fn main() -> Result<(), Box<dyn Error>> {
    // Get command-line arguments
    let args: Vec<String> = env::args().collect();

    // Ensure we have the correct number of arguments
    if args.len() != 2 {
        eprintln!("Usage: cargo run --example generator <num_players>");
        std::process::exit(1);
    }

    // Parse NUM_PLAYERS from the first argument
    let num_players: u32 = match args[1].parse() {
        Ok(n) if n > 0 => n,
        _ => {
            eprintln!("Error: <num_players> must be a positive integer.");
            std::process::exit(1);
        }
    };

    // Configuration constants.
    const NUM_DEPOSITS: usize = 70;
    const NUM_WITHDRAWALS: usize = 20;
    // Final balance operation, then the friend request and its answer.
    const TOTAL_ROUNDS: usize = NUM_DEPOSITS + NUM_WITHDRAWALS + 3;

    // Base amounts; these will be scaled by the player number.
    const BASE_DEPOSIT_AMOUNT: u64 = 10;
    const BASE_WITHDRAWAL_AMOUNT: u64 = 20;

    let player = |i: u32| PlayerId::from_u128(u128::from(i));
    let mut wtr = Writer::from_writer(std::io::stdout());

    // Process operations round by round.
    // In each round, every player produces its next operation in its internal order.
    for round in 0..TOTAL_ROUNDS {
        for i in 1..=num_players {
            let scale = u64::from(i);
            let operation = if round < NUM_DEPOSITS {
                Operation {
                    op_type: OperationType::Deposit,
                    player: player(i),
                    target: None,
                    amount: Some((BASE_DEPOSIT_AMOUNT * scale).to_string()),
                }
            } else if round < NUM_DEPOSITS + NUM_WITHDRAWALS {
                Operation {
                    op_type: OperationType::Withdraw,
                    player: player(i),
                    target: None,
                    amount: Some((BASE_WITHDRAWAL_AMOUNT * scale).to_string()),
                }
            } else if round == NUM_DEPOSITS + NUM_WITHDRAWALS {
                if i % 2 == 0 {
                    Operation {
                        op_type: OperationType::Set,
                        player: player(i),
                        target: None,
                        amount: Some(format!("{}k", i)),
                    }
                } else {
                    Operation {
                        op_type: OperationType::Withdraw,
                        player: player(i),
                        target: None,
                        amount: Some("1t".to_string()),
                    }
                }
            } else if round == NUM_DEPOSITS + NUM_WITHDRAWALS + 1 {
                if i == num_players {
                    continue;
                }
                Operation {
                    op_type: OperationType::FriendRequest,
                    player: player(i),
                    target: Some(player(i + 1)),
                    amount: None,
                }
            } else {
                // The receiver answers the request sent by the previous player.
                if i == 1 {
                    continue;
                }
                let op_type = if i % 2 == 0 {
                    OperationType::FriendAccept
                } else {
                    OperationType::FriendDeny
                };
                Operation {
                    op_type,
                    player: player(i),
                    target: Some(player(i - 1)),
                    amount: None,
                }
            };
            wtr.serialize(operation)?;
        }
    }
    wtr.flush()?;
    Ok(())
}
