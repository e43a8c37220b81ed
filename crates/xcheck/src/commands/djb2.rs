//! djb2 command.

use crate::cli::EXIT_SUCCESS;

/// Handle the `djb2` command.
pub fn cmd_djb2(input: &str) -> i32 {
    let value = xcheck::djb2_u64(input);
    println!("{value} 0x{value:08x}");
    EXIT_SUCCESS
}
